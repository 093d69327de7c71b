//! Spreadsheet cell references such as `C4` and rectangular ranges built
//! from two of them.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// One or more column letters followed by one or more row digits.
static CELL_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").unwrap());

/// Largest 0-based column index a worksheet has (`XFD`).
pub const MAX_COLUMN_INDEX: u32 = 16_383;

/// A parsed cell reference: column letters and 1-based row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRef {
    /// Column letters, uppercased (`"C"`, `"AA"`).
    pub column: String,

    /// 1-based row number as written in the reference.
    pub row: u32,
}

impl CellRef {
    /// 0-based column index (`A` = 0, `Z` = 25, `AA` = 26).
    pub fn column_index(&self) -> u32 {
        column_index(&self.column)
    }

    /// 0-based row index.
    pub fn row_index(&self) -> u32 {
        self.row.saturating_sub(1)
    }
}

/// Split a reference like `"C4"` into `("C", 4)`.
///
/// Anything other than letters followed by digits is rejected, as are
/// columns beyond `XFD`.
pub fn parse_cell_ref(reference: &str) -> Result<CellRef> {
    let caps = CELL_REF_REGEX
        .captures(reference.trim())
        .ok_or_else(|| Error::InvalidCellReference(reference.to_string()))?;

    let row: u32 = caps[2]
        .parse()
        .map_err(|_| Error::InvalidCellReference(reference.to_string()))?;
    if row == 0 || column_index(&caps[1]) > MAX_COLUMN_INDEX {
        return Err(Error::InvalidCellReference(reference.to_string()));
    }

    Ok(CellRef {
        column: caps[1].to_ascii_uppercase(),
        row,
    })
}

/// Convert column letters to a 0-based index using base-26 digits.
///
/// Saturates at `u32::MAX` for absurdly long inputs.
pub fn column_index(letters: &str) -> u32 {
    letters
        .bytes()
        .filter(u8::is_ascii_alphabetic)
        .map(|b| u32::from(b.to_ascii_uppercase() - b'A') + 1)
        .fold(0u32, |acc, digit| acc.saturating_mul(26).saturating_add(digit))
        .saturating_sub(1)
}

/// Convert a 0-based column index back to letters (`26` → `"AA"`).
pub fn column_letters(index: u32) -> String {
    let mut n = u64::from(index) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// An inclusive rectangle of cells, stored as 0-based bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    /// First row (0-based).
    pub first_row: u32,
    /// Last row (0-based, inclusive).
    pub last_row: u32,
    /// First column (0-based).
    pub first_col: u32,
    /// Last column (0-based, inclusive).
    pub last_col: u32,
}

impl CellRange {
    /// Build a range from its top-left and bottom-right references.
    ///
    /// The corners may be given in either order.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let a = parse_cell_ref(start)?;
        let b = parse_cell_ref(end)?;
        let (r1, r2) = (a.row_index(), b.row_index());
        let (c1, c2) = (a.column_index(), b.column_index());
        Ok(Self {
            first_row: r1.min(r2),
            last_row: r1.max(r2),
            first_col: c1.min(c2),
            last_col: c1.max(c2),
        })
    }

    /// Parse the `"B2:D5"` notation.
    pub fn parse_a1(range: &str) -> Result<Self> {
        let (start, end) = range
            .split_once(':')
            .ok_or_else(|| Error::InvalidCellReference(range.to_string()))?;
        Self::parse(start, end)
    }

    /// Number of rows covered.
    pub fn height(&self) -> usize {
        (self.last_row - self.first_row + 1) as usize
    }

    /// Number of columns covered.
    pub fn width(&self) -> usize {
        (self.last_col - self.first_col + 1) as usize
    }
}
