//! Spreadsheet data adapter.
//!
//! Reads tables from Excel workbooks through calamine, and defines the
//! bridge to desktop spreadsheet applications used for chart export.

pub mod desktop;
pub mod session;

pub use desktop::{DesktopBridge, NoDesktopSession};
pub use session::{with_workbook, ReadOptions, SheetRef, WorkbookSession};
