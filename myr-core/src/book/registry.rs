//! Instrument → published-book rendezvous
//!
//! Market-data threads and strategy threads find each other through a
//! concurrent map of `SecurityId` to [`BookCell`]; no global lock is
//! taken on the tick path once a cell exists.

use std::sync::Arc;

use dashmap::DashMap;

use crate::core::types::SecurityId;

use super::publish::BookCell;

/// Concurrent registry of per-instrument book cells
#[derive(Debug, Default)]
pub struct BookRegistry {
    cells: DashMap<SecurityId, Arc<BookCell>>,
}

impl BookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell for `security`, creating an empty one on first use.
    pub fn cell(&self, security: SecurityId) -> Arc<BookCell> {
        self.cells
            .entry(security)
            .or_insert_with(|| Arc::new(BookCell::new()))
            .clone()
    }

    /// Cell for `security` if one has been created.
    pub fn get(&self, security: SecurityId) -> Option<Arc<BookCell>> {
        self.cells.get(&security).map(|cell| cell.clone())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
