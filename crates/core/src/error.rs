//! Error types for report generation.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while populating the report template.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// The PPTX package is missing a required part or is structurally broken.
    #[error("PPTX structure error: {0}")]
    PptxParseError(String),

    /// The slide number does not address a slide of the presentation.
    #[error("Slide index {index} is not valid (presentation has {count} slides)")]
    InvalidSlideIndex { index: usize, count: usize },

    /// No shape with the given name exists on the slide.
    #[error("Shape '{name}' not found on slide {slide}")]
    ShapeNotFound { slide: usize, name: String },

    /// The shape exists but cannot hold the requested content.
    #[error("Shape '{name}' does not support {capability}")]
    ShapeCapability { name: String, capability: &'static str },

    /// A cell reference did not have the letters-then-digits form.
    #[error("Invalid cell reference: '{0}'")]
    InvalidCellReference(String),

    /// A LIKE pattern could not be turned into a regular expression.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The spreadsheet bridge failed to open or read a workbook.
    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(String),

    /// Failed to encode or decode JSON (shape index, job files).
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A configuration value or job file entry is invalid.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The operation drives desktop applications and needs an interactive session.
    #[error("Operation '{0}' requires an interactive desktop session")]
    DesktopSessionRequired(String),
}
