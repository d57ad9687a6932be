//! Grouping canonical rows into homogeneous batches

use std::collections::HashMap;

use super::CanonicalRow;

/// Rows that populate exactly the same set of columns
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Sorted column names shared by every row
    pub columns: Vec<String>,
    pub rows: Vec<CanonicalRow>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Routes rows into batches keyed by their populated column set
#[derive(Debug, Default)]
pub struct BatchGrouper {
    batches: Vec<Batch>,
    index: HashMap<Vec<String>, usize>,
}

impl BatchGrouper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: CanonicalRow) {
        let key = row.columns();
        match self.index.get(&key) {
            Some(&i) => self.batches[i].rows.push(row),
            None => {
                self.index.insert(key.clone(), self.batches.len());
                self.batches.push(Batch {
                    columns: key,
                    rows: vec![row],
                });
            }
        }
    }

    /// Number of rows across all batches
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Batches in first-seen order
    pub fn into_batches(self) -> Vec<Batch> {
        self.batches
    }
}
