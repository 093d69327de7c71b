//! PPTX (Office Open XML) editing backend.
//!
//! A .pptx file is a ZIP archive of XML parts. The document keeps every part
//! in memory, parses the shape tree of each slide and serializes the edited
//! trees back when the presentation is saved.

pub mod document;
pub mod media;
pub mod package;
pub mod shapes;
pub mod slide;
mod xml;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;

pub use document::PptxDocument;
pub use media::ImageFormat;
pub use package::{Package, Relationships};
pub use shapes::{ShapeInfo, ShapeKind};
pub use slide::Slide;
