//! Domain types shared by the presentation and spreadsheet backends.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;
use crate::rounding::{round_cell, RoundingSpec};

/// Position and size of a shape, in EMU (English Metric Units).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    /// Distance from the left slide edge.
    pub left: i64,

    /// Distance from the top slide edge.
    pub top: i64,

    /// Shape width.
    pub width: i64,

    /// Shape height.
    pub height: i64,
}

impl Geometry {
    /// Create a geometry from its four components.
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Where a newly inserted shape lands in the slide's drawing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZOrder {
    /// Appended after every other shape, drawn on top.
    Front,
    /// Inserted directly after the shape tree header, below the annotation overlays.
    #[default]
    Back,
}

/// When the in-memory document is written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Save after every mutation.
    #[default]
    EachEdit,
    /// Save once, when the session is finished.
    OnFinish,
}

impl FromStr for SaveMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "each" | "each-edit" | "each_edit" => Ok(Self::EachEdit),
            "end" | "on-finish" | "on_finish" => Ok(Self::OnFinish),
            other => Err(Error::ConfigError(format!(
                "unknown save mode '{}' (expected 'each' or 'end')",
                other
            ))),
        }
    }
}

/// Output file name prefix shared by the template and every generated report.
pub const REPORT_TITLE: &str = "Datenanalyse_AKL";

/// Who the report is generated for, and where it goes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerContext {
    /// Customer name, used verbatim in the output file name.
    pub name: String,

    /// Directory that receives the generated presentation.
    pub target_dir: PathBuf,

    /// Date stamped into the output file name.
    pub date: NaiveDate,
}

impl CustomerContext {
    /// Create a context dated today (local time).
    pub fn today(name: impl Into<String>, target_dir: impl Into<PathBuf>) -> Self {
        Self::with_date(name, target_dir, Local::now().date_naive())
    }

    /// Create a context with an explicit date.
    pub fn with_date(name: impl Into<String>, target_dir: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            target_dir: target_dir.into(),
            date,
        }
    }

    /// File name of the generated presentation, e.g.
    /// `2024-03-01_Datenanalyse_AKL_Acme.pptx`.
    pub fn output_file_name(&self) -> String {
        format!(
            "{}_{}_{}.pptx",
            self.date.format("%Y-%m-%d"),
            REPORT_TITLE,
            self.name
        )
    }

    /// Full path of the generated presentation.
    pub fn output_path(&self) -> PathBuf {
        self.target_dir.join(self.output_file_name())
    }
}

/// A two-dimensional grid of cell texts with an optional header row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularData {
    /// Column titles, rendered as the first table row.
    pub header: Option<Vec<String>>,

    /// Data rows in order.
    pub rows: Vec<Vec<String>>,
}

impl TabularData {
    /// Create a grid without header.
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { header: None, rows }
    }

    /// Create a grid with a header row.
    pub fn with_header(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            header: Some(header),
            rows,
        }
    }

    /// Number of columns: the widest of the header and all rows.
    pub fn column_count(&self) -> usize {
        let header = self.header.as_ref().map_or(0, Vec::len);
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(header)
    }

    /// Number of table rows, counting the header row if present.
    pub fn table_row_count(&self) -> usize {
        self.rows.len() + usize::from(self.header.is_some())
    }

    /// Whether the grid has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.table_row_count() == 0 || self.column_count() == 0
    }

    /// All table rows, header first, each padded to `column_count()`.
    pub fn table_rows(&self) -> Vec<Vec<&str>> {
        let cols = self.column_count();
        self.header
            .iter()
            .chain(self.rows.iter())
            .map(|row| {
                (0..cols)
                    .map(|c| row.get(c).map(String::as_str).unwrap_or(""))
                    .collect()
            })
            .collect()
    }

    /// Apply per-column rounding to the data rows (the header is left alone).
    pub fn apply_rounding(&mut self, spec: &RoundingSpec) {
        if spec.is_empty() {
            return;
        }
        for row in &mut self.rows {
            for (col, value) in row.iter_mut().enumerate() {
                if spec.applies_to(col) {
                    *value = round_cell(value);
                }
            }
        }
    }
}
