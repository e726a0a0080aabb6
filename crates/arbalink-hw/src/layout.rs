//! Pixel to LED wiring order.
//!
//! The strip runs through the table in its own order, so a display
//! coordinate `(row, col)` has to be translated into the index of the LED
//! physically wired at that spot before the frame goes on the wire.

use crate::{Error, Result};
use std::str::FromStr;

/// Translates a display coordinate into a physical LED index.
///
/// Implementations must be deterministic and injective over the grid.
pub trait PixelMapping {
    fn led_index(&self, row: usize, col: usize) -> usize;
}

impl<F> PixelMapping for F
where
    F: Fn(usize, usize) -> usize,
{
    fn led_index(&self, row: usize, col: usize) -> usize {
        self(row, col)
    }
}

/// Named wiring patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutKind {
    /// LED index equals the row-major cell index.
    RowMajor,
    /// Rows alternate direction, starting left to right.
    #[default]
    Serpentine,
    /// Columns alternate direction, starting top to bottom.
    ColumnSerpentine,
    /// Explicit per-cell table.
    Table,
}

impl FromStr for LayoutKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "row-major" | "row_major" => Ok(LayoutKind::RowMajor),
            "serpentine" => Ok(LayoutKind::Serpentine),
            "column-serpentine" | "column_serpentine" => Ok(LayoutKind::ColumnSerpentine),
            "table" => Ok(LayoutKind::Table),
            _ => Err(Error::InvalidLayout(s.to_string())),
        }
    }
}

impl std::fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutKind::RowMajor => write!(f, "row-major"),
            LayoutKind::Serpentine => write!(f, "serpentine"),
            LayoutKind::ColumnSerpentine => write!(f, "column-serpentine"),
            LayoutKind::Table => write!(f, "table"),
        }
    }
}

/// Concrete wiring for a grid of known size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedLayout {
    RowMajor { width: usize },
    Serpentine { width: usize },
    ColumnSerpentine { height: usize },
    /// `table[row][col]` is the LED index.
    Table(Vec<Vec<usize>>),
}

impl LedLayout {
    /// Builds and validates a layout for a `width x height` grid.
    pub fn new(
        kind: LayoutKind,
        width: usize,
        height: usize,
        table: Option<Vec<Vec<usize>>>,
    ) -> Result<Self> {
        let layout = match kind {
            LayoutKind::RowMajor => LedLayout::RowMajor { width },
            LayoutKind::Serpentine => LedLayout::Serpentine { width },
            LayoutKind::ColumnSerpentine => LedLayout::ColumnSerpentine { height },
            LayoutKind::Table => LedLayout::Table(table.ok_or_else(|| {
                Error::InvalidLayout("table layout requires a mapping table".to_string())
            })?),
        };
        validate_mapping(&layout, width, height)?;
        Ok(layout)
    }

    /// Returns the pattern name of this layout.
    pub fn kind(&self) -> LayoutKind {
        match self {
            LedLayout::RowMajor { .. } => LayoutKind::RowMajor,
            LedLayout::Serpentine { .. } => LayoutKind::Serpentine,
            LedLayout::ColumnSerpentine { .. } => LayoutKind::ColumnSerpentine,
            LedLayout::Table(_) => LayoutKind::Table,
        }
    }
}

impl PixelMapping for LedLayout {
    fn led_index(&self, row: usize, col: usize) -> usize {
        match self {
            LedLayout::RowMajor { width } => row * width + col,
            LedLayout::Serpentine { width } => {
                if row % 2 == 0 {
                    row * width + col
                } else {
                    row * width + (width - 1 - col)
                }
            }
            LedLayout::ColumnSerpentine { height } => {
                if col % 2 == 0 {
                    col * height + row
                } else {
                    col * height + (height - 1 - row)
                }
            }
            // Missing entries map out of range so validation rejects them.
            LedLayout::Table(table) => table
                .get(row)
                .and_then(|r| r.get(col))
                .copied()
                .unwrap_or(usize::MAX),
        }
    }
}

/// Checks that `mapping` sends every cell of the grid to a distinct LED in
/// `[0, width * height)`.
pub fn validate_mapping<M>(mapping: &M, width: usize, height: usize) -> Result<()>
where
    M: PixelMapping + ?Sized,
{
    let cells = width * height;
    let mut seen = vec![false; cells];

    for row in 0..height {
        for col in 0..width {
            let index = mapping.led_index(row, col);
            match seen.get_mut(index) {
                None => {
                    return Err(Error::InvalidLayout(format!(
                        "({}, {}) maps to LED {} outside 0..{}",
                        row, col, index, cells
                    )))
                }
                Some(true) => {
                    return Err(Error::InvalidLayout(format!(
                        "LED {} is mapped twice (again at ({}, {}))",
                        index, row, col
                    )))
                }
                Some(slot) => *slot = true,
            }
        }
    }

    Ok(())
}
