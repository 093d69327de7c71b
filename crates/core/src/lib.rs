//! Core domain types, the shape index cache, cell-reference parsing and
//! numeric rounding rules for populating the AKL report template.

pub mod cellref;
pub mod error;
pub mod pattern;
pub mod rounding;
pub mod shape_index;
pub mod types;

pub use cellref::{
    column_index, column_letters, parse_cell_ref, CellRange, CellRef, MAX_COLUMN_INDEX,
};
pub use error::{Error, Result};
pub use pattern::like_operator;
pub use rounding::{round_cell, RoundingSpec};
pub use shape_index::ShapeIndex;
pub use types::{CustomerContext, Geometry, SaveMode, TabularData, ZOrder};
