use std::fmt;

use super::SheetError;

/// A1 notation range restricted to what the app uses: `Sheet!A2:K`,
/// `Sheet!A5:K5`. Columns are zero-based, rows one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start_col: usize,
    pub start_row: usize,
    pub end_col: usize,
    pub end_row: Option<usize>,
}

impl A1Range {
    pub fn parse(input: &str) -> Result<Self, SheetError> {
        let bad = || SheetError::Range(input.to_string());

        let (sheet, cells) = input.split_once('!').ok_or_else(bad)?;
        let sheet = sheet.trim_matches('\'');
        if sheet.is_empty() {
            return Err(bad());
        }

        let (start, end) = cells.split_once(':').ok_or_else(bad)?;
        let (start_col, start_row) = split_cell(start).ok_or_else(bad)?;
        let (end_col, end_row) = split_cell(end).ok_or_else(bad)?;
        let start_row = start_row.ok_or_else(bad)?;

        if end_col < start_col || end_row.map_or(false, |end| end < start_row) {
            return Err(bad());
        }

        Ok(Self {
            sheet: sheet.to_string(),
            start_col,
            start_row,
            end_col,
            end_row,
        })
    }

    /// Range covering exactly one row of this range's columns.
    pub fn single_row(&self, row: usize) -> Self {
        Self {
            start_row: row,
            end_row: Some(row),
            ..self.clone()
        }
    }

    pub fn width(&self) -> usize {
        self.end_col - self.start_col + 1
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}!{}{}:{}",
            self.sheet,
            column_letter(self.start_col),
            self.start_row,
            column_letter(self.end_col)
        )?;
        if let Some(row) = self.end_row {
            write!(f, "{}", row)?;
        }
        Ok(())
    }
}

fn split_cell(cell: &str) -> Option<(usize, Option<usize>)> {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    let col = column_index(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<usize>().ok().filter(|row| *row > 0)?)
    };
    Some((col, row))
}

/// `A` -> 0, `Z` -> 25, `AA` -> 26.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    Some(index - 1)
}

pub fn column_letter(index: usize) -> String {
    let mut name = String::new();
    let mut n = index + 1;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}
