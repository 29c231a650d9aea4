use rust_xlsxwriter::{Format, Workbook, XlsxError};

use super::{ExportTable, ExportValue};

/// Single-sheet workbook: title, summary block, then the detail table.
pub fn render(table: &ExportTable) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let title_format = Format::new().set_bold().set_font_size(14);
    let money = Format::new().set_num_format("#,##0.00");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&table.title))?;
    worksheet.write_string_with_format(0, 0, &table.title, &title_format)?;

    let mut row: u32 = 2;
    for (label, value) in &table.summary {
        worksheet.write_string_with_format(row, 0, label, &bold)?;
        write_value(worksheet, row, 1, value, &money)?;
        row += 1;
    }

    row += 1;
    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(row, col as u16, name, &bold)?;
        worksheet.set_column_width(col as u16, column_width(table, col))?;
    }

    for record in &table.rows {
        row += 1;
        for (col, value) in record.iter().enumerate() {
            write_value(worksheet, row, col as u16, value, &money)?;
        }
    }

    workbook.save_to_buffer()
}

fn write_value(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    value: &ExportValue,
    money: &Format,
) -> Result<(), XlsxError> {
    match value {
        ExportValue::Text(text) => {
            worksheet.write_string(row, col, text)?;
        }
        ExportValue::Money(_) => {
            let number = value.as_number().unwrap_or(0.0);
            worksheet.write_number_with_format(row, col, number, money)?;
        }
        ExportValue::Integer(_) | ExportValue::Percent(_) => {
            worksheet.write_number(row, col, value.as_number().unwrap_or(0.0))?;
        }
    }
    Ok(())
}

/// Worksheet names are capped at 31 characters and may not contain `[]:*?/\`.
fn sheet_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.trim().is_empty() {
        "Report".to_string()
    } else {
        cleaned
    }
}

fn column_width(table: &ExportTable, col: usize) -> f64 {
    let widest = table
        .rows
        .iter()
        .filter_map(|row| row.get(col))
        .map(|value| value.to_string().chars().count())
        .chain(std::iter::once(table.columns[col].chars().count()))
        .max()
        .unwrap_or(8);
    (widest.clamp(8, 40) + 2) as f64
}
