//! Scoped workbook sessions and table extraction.

use akl_core::{CellRange, Error, Result, RoundingSpec, TabularData};
use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// A worksheet, addressed by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetRef {
    /// 0-based position in the workbook.
    Index(usize),
    /// Sheet name as shown on the tab.
    Name(String),
}

impl Default for SheetRef {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{}", i),
            Self::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// How a grid read from a sheet is turned into table data.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Use the first row of the grid as the table header.
    pub first_row_as_header: bool,

    /// Columns (0-based, relative to the grid) whose values are rounded.
    pub rounding: RoundingSpec,
}

/// An open workbook. The file is released when the session is dropped,
/// on every exit path.
pub struct WorkbookSession {
    path: PathBuf,
    workbook: Sheets<BufReader<File>>,
}

impl WorkbookSession {
    /// Open a workbook (xlsx, xlsm, xlsb, xls or ods).
    pub fn open(path: &Path) -> Result<Self> {
        let workbook = open_workbook_auto(path).map_err(|e| {
            Error::SpreadsheetError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        log::debug!("Opened workbook {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            workbook,
        })
    }

    /// Path the session was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of all worksheets, in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    fn sheet_range(&mut self, sheet: &SheetRef) -> Result<Range<Data>> {
        let range = match sheet {
            SheetRef::Index(i) => self.workbook.worksheet_range_at(*i).ok_or_else(|| {
                Error::SpreadsheetError(format!(
                    "{} has no sheet {}",
                    self.path.display(),
                    sheet
                ))
            })?,
            SheetRef::Name(name) => self.workbook.worksheet_range(name),
        };
        range.map_err(|e| {
            Error::SpreadsheetError(format!(
                "Failed to read sheet {} of {}: {}",
                sheet,
                self.path.display(),
                e
            ))
        })
    }

    /// The used range of a sheet: every row from the first to the last
    /// non-empty cell.
    pub fn used_range(&mut self, sheet: &SheetRef, options: &ReadOptions) -> Result<TabularData> {
        let range = self.sheet_range(sheet)?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        log::debug!(
            "Read used range of sheet {} ({} rows) from {}",
            sheet,
            rows.len(),
            self.path.display()
        );
        Ok(into_table(rows, options))
    }

    /// An explicit rectangle of a sheet. Cells outside the sheet's data read
    /// as empty text.
    pub fn read_range(
        &mut self,
        sheet: &SheetRef,
        cells: &CellRange,
        options: &ReadOptions,
    ) -> Result<TabularData> {
        let range = self.sheet_range(sheet)?;
        let rows: Vec<Vec<String>> = (cells.first_row..=cells.last_row)
            .map(|row| {
                (cells.first_col..=cells.last_col)
                    .map(|col| range.get_value((row, col)).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect();

        log::debug!(
            "Read {}x{} cells of sheet {} from {}",
            cells.height(),
            cells.width(),
            sheet,
            self.path.display()
        );
        Ok(into_table(rows, options))
    }
}

impl Drop for WorkbookSession {
    fn drop(&mut self) {
        log::debug!("Closing workbook {}", self.path.display());
    }
}

/// Open a workbook, run `f` on it and close it again, whatever `f` returns.
pub fn with_workbook<T>(
    path: &Path,
    f: impl FnOnce(&mut WorkbookSession) -> Result<T>,
) -> Result<T> {
    let mut session = WorkbookSession::open(path)?;
    f(&mut session)
}

/// Text of a cell as it is written into a table.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn into_table(mut rows: Vec<Vec<String>>, options: &ReadOptions) -> TabularData {
    let mut table = if options.first_row_as_header && !rows.is_empty() {
        let header = rows.remove(0);
        TabularData::with_header(header, rows)
    } else {
        TabularData::new(rows)
    };
    table.apply_rounding(&options.rounding);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn write_workbook(dir: &Path) -> PathBuf {
        let path = dir.join("daten.xlsx");
        let mut workbook = Workbook::new();

        let sheet = workbook.add_worksheet();
        sheet.set_name("Übersicht").unwrap();
        sheet.write_string(0, 0, "Artikel").unwrap();
        sheet.write_string(0, 1, "Anteil").unwrap();
        sheet.write_string(0, 2, "Menge").unwrap();
        sheet.write_string(1, 0, "A-100").unwrap();
        sheet.write_number(1, 1, 0.4567).unwrap();
        sheet.write_number(1, 2, 1234.6).unwrap();
        sheet.write_string(2, 0, "B-200").unwrap();
        sheet.write_string(2, 1, "n/a").unwrap();
        sheet.write_number(2, 2, 7.0).unwrap();

        let second = workbook.add_worksheet();
        second.set_name("Detail").unwrap();
        second.write_string(3, 2, "C4").unwrap();

        workbook.save(&path).unwrap();
        path
    }

    #[test]
    fn test_used_range_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let table = with_workbook(&path, |wb| {
            assert_eq!(wb.sheet_names(), vec!["Übersicht", "Detail"]);
            wb.used_range(&SheetRef::Index(0), &ReadOptions::default())
        })
        .unwrap();

        assert!(table.header.is_none());
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0], vec!["Artikel", "Anteil", "Menge"]);
        assert_eq!(table.rows[1], vec!["A-100", "0.4567", "1234.6"]);
        assert_eq!(table.rows[2], vec!["B-200", "n/a", "7"]);
    }

    #[test]
    fn test_used_range_with_header_and_rounding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let options = ReadOptions {
            first_row_as_header: true,
            rounding: RoundingSpec::columns([1, 2]),
        };
        let table = with_workbook(&path, |wb| {
            wb.used_range(&SheetRef::Name("Übersicht".into()), &options)
        })
        .unwrap();

        assert_eq!(table.header.unwrap(), vec!["Artikel", "Anteil", "Menge"]);
        assert_eq!(table.rows[0], vec!["A-100", "0.46", "1235"]);
        // Non-numeric values in a rounded column pass through.
        assert_eq!(table.rows[1], vec!["B-200", "n/a", "7"]);
    }

    #[test]
    fn test_read_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let cells = CellRange::parse("A2", "B3").unwrap();
        let table = with_workbook(&path, |wb| {
            wb.read_range(&SheetRef::Index(0), &cells, &ReadOptions::default())
        })
        .unwrap();
        assert_eq!(table.rows, vec![vec!["A-100", "0.4567"], vec!["B-200", "n/a"]]);

        // Absolute addressing, also past the data of a sparse sheet.
        let cells = CellRange::parse_a1("B3:D5").unwrap();
        let table = with_workbook(&path, |wb| {
            wb.read_range(&SheetRef::Index(1), &cells, &ReadOptions::default())
        })
        .unwrap();
        assert_eq!(
            table.rows,
            vec![vec!["", "", ""], vec!["", "C4", ""], vec!["", "", ""]]
        );
    }

    #[test]
    fn test_missing_sheet_and_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_workbook(dir.path());

        let err = with_workbook(&path, |wb| {
            wb.used_range(&SheetRef::Index(5), &ReadOptions::default())
        })
        .unwrap_err();
        assert!(matches!(err, Error::SpreadsheetError(_)));

        let err = WorkbookSession::open(&dir.path().join("missing.xlsx")).err().unwrap();
        assert!(matches!(err, Error::SpreadsheetError(_)));
    }

    #[test]
    fn test_sheet_ref_display() {
        assert_eq!(SheetRef::default(), SheetRef::Index(0));
        assert_eq!(SheetRef::Index(2).to_string(), "#2");
        assert_eq!(SheetRef::Name("Detail".into()).to_string(), "'Detail'");
    }
}
