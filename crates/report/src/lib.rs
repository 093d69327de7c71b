//! Fills the "Datenanalyse AKL" presentation template for one customer.
//!
//! A [`ReportSession`] owns the presentation and its shape index. Every
//! edit replaces a named placeholder shape, reconciles the index of the
//! touched slide and, depending on the save mode, writes the presentation.

pub mod assets;
pub mod job;
pub mod session;

pub use assets::{default_template_dir, find_logo, template_path, TEMPLATE_FILE_NAME};
pub use job::{Job, Step};
pub use session::{ImageOptions, ReportSession, SessionConfig, ShapeRef, ELEMENTS_FILE_NAME};
