pub mod permission;

pub use permission::{is_allowed, require_permission, CurrentUser};
