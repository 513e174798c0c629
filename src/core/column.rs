//! A column of cells plus its feed-forward segment.

use crate::core::cell::Cell;
use crate::core::segment::{Segment, SegmentKind};

/// One column of a region's 2D grid.
///
/// The proximal segment mirrors the column's feed-forward connections into the
/// region's input space; the cells mirror the temporal algorithm's state.
/// Columns and their cells are allocated at initialization and never removed.
#[derive(Clone, Debug)]
pub struct Column {
    /// Grid column.
    pub x: usize,
    /// Grid row.
    pub y: usize,
    /// The single feed-forward segment, always present.
    pub proximal_segment: Segment,
    /// Cells in depth order, fixed at initialization.
    pub cells: Vec<Cell>,
}

impl Column {
    /// Creates a column at grid position (x, y) whose cells take the global
    /// indices `flat_index * cells_per_column ..` in depth order.
    pub fn new(
        x: usize,
        y: usize,
        flat_index: usize,
        cells_per_column: usize,
        window: usize,
    ) -> Self {
        let cells = (0..cells_per_column)
            .map(|z| Cell::new(flat_index * cells_per_column + z, z, window))
            .collect();
        Column {
            x,
            y,
            proximal_segment: Segment::new(SegmentKind::Proximal, window),
            cells,
        }
    }

    /// Ages the proximal segment and every cell by one step.
    pub fn next_step(&mut self) {
        self.proximal_segment.next_step();
        for cell in &mut self.cells {
            cell.next_step();
        }
    }
}
