//! Bridge to desktop spreadsheet applications.
//!
//! Rendering a live chart requires the spreadsheet application itself:
//! copying a chart goes through the clipboard and the active window of a
//! running desktop session. Implementations of [`DesktopBridge`] therefore
//! exist only where such a session is available; the portable build uses
//! [`NoDesktopSession`], which refuses every request.

use akl_core::{Error, Result};
use std::path::{Path, PathBuf};

use crate::session::SheetRef;

/// Access to charts of a workbook opened in a desktop application.
///
/// Calls hold the application and the clipboard for their whole duration
/// and must not overlap; callers take `&mut self` to serialize them.
pub trait DesktopBridge {
    /// Export every chart of `sheet` as `<chart name>.png` into `out_dir`
    /// and return the written paths.
    fn export_charts(
        &mut self,
        workbook: &Path,
        sheet: &SheetRef,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>>;

    /// Copy the chart named `chart` and return the pasted picture as PNG data.
    fn copy_chart(&mut self, workbook: &Path, sheet: &SheetRef, chart: &str) -> Result<Vec<u8>>;
}

/// Bridge used when no interactive desktop session is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDesktopSession;

impl DesktopBridge for NoDesktopSession {
    fn export_charts(
        &mut self,
        workbook: &Path,
        sheet: &SheetRef,
        _out_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        log::warn!(
            "Cannot export charts of sheet {} in {}: no desktop session",
            sheet,
            workbook.display()
        );
        Err(Error::DesktopSessionRequired("export charts".to_string()))
    }

    fn copy_chart(&mut self, workbook: &Path, _sheet: &SheetRef, chart: &str) -> Result<Vec<u8>> {
        log::warn!(
            "Cannot copy chart '{}' from {}: no desktop session",
            chart,
            workbook.display()
        );
        Err(Error::DesktopSessionRequired("copy chart".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_desktop_session_refuses() {
        let mut bridge = NoDesktopSession;
        let err = bridge
            .export_charts(Path::new("a.xlsx"), &SheetRef::default(), Path::new("."))
            .unwrap_err();
        assert!(matches!(err, Error::DesktopSessionRequired(_)));

        let err = bridge
            .copy_chart(Path::new("a.xlsx"), &SheetRef::default(), "Diagramm 1")
            .unwrap_err();
        assert!(matches!(err, Error::DesktopSessionRequired(_)));
    }
}
