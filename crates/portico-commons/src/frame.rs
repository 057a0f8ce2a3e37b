//! Result frames: bounded pages of rows streamed from server-held cursors.

use serde::{Deserialize, Serialize};

use crate::errors::{MetaError, Result};
use crate::typed_value::TypedValue;

/// One page of result rows. `offset` is the zero-based row index of the
/// first row in the frame; `done` is true iff no further rows remain in
/// the cursor this frame was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub offset: u64,
    pub done: bool,
    pub rows: Vec<Vec<TypedValue>>,
}

impl Frame {
    pub fn new(offset: u64, done: bool, rows: Vec<Vec<TypedValue>>) -> Self {
        Self { offset, done, rows }
    }

    /// A frame with no rows, used for empty results and zero row limits.
    pub fn empty(offset: u64, done: bool) -> Self {
        Self::new(offset, done, Vec::new())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Verifies every row is aligned to the column signature width.
    pub fn check_width(&self, column_count: usize) -> Result<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != column_count {
                return Err(MetaError::Internal(format!(
                    "frame row {} has {} value(s), signature has {} column(s)",
                    i,
                    row.len(),
                    column_count
                )));
            }
        }
        Ok(())
    }
}
