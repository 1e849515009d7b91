// src/history.rs
//! Bounded position history shared between the reader and its callers

use crate::gps::Position;
use std::{
    collections::VecDeque,
    sync::{PoisonError, RwLock},
};

/// FIFO buffer of the most recent fixes.
///
/// Appends come from the reader task; any number of callers may read at the
/// same time. Readers get owned copies, never a reference into the buffer.
#[derive(Debug)]
pub struct PositionStore {
    capacity: usize,
    positions: RwLock<VecDeque<Position>>,
}

impl PositionStore {
    /// Create an empty store. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            positions: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Add a fix, evicting the oldest one when full.
    pub fn append(&self, position: Position) {
        let mut positions = self.positions.write().unwrap_or_else(PoisonError::into_inner);
        if positions.len() == self.capacity {
            positions.pop_front();
        }
        positions.push_back(position);
    }

    /// Oldest-first copy of the current contents
    pub fn snapshot(&self) -> Vec<Position> {
        let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
        positions.iter().copied().collect()
    }

    /// Most recently appended fix
    pub fn last(&self) -> Option<Position> {
        let positions = self.positions.read().unwrap_or_else(PoisonError::into_inner);
        positions.back().copied()
    }

    pub fn len(&self) -> usize {
        self.positions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    fn pos(n: i64) -> Position {
        Position::new(n as f64 * 0.001, 0.0, None, n).unwrap()
    }

    #[test]
    fn test_append_past_capacity_evicts_oldest() {
        let store = PositionStore::new(3);
        for n in 0..4 {
            store.append(pos(n));
        }

        let timestamps: Vec<i64> = store.snapshot().iter().map(|p| p.timestamp()).collect();
        assert_eq!(timestamps, vec![1, 2, 3]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.last(), Some(pos(3)));
    }

    #[test]
    fn test_empty_store() {
        let store = PositionStore::new(10);
        assert!(store.is_empty());
        assert_eq!(store.last(), None);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let store = PositionStore::new(0);
        store.append(pos(1));
        store.append(pos(2));
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.snapshot(), vec![pos(2)]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let store = PositionStore::new(5);
        store.append(pos(1));
        let snap = store.snapshot();
        store.append(pos(2));
        assert_eq!(snap.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_concurrent_readers_see_ordered_history() {
        let store = Arc::new(PositionStore::new(50));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for n in 0..1000 {
                    store.append(pos(n));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snap = store.snapshot();
                        assert!(snap.len() <= 50);
                        assert!(snap.windows(2).all(|w| w[1].timestamp() == w[0].timestamp() + 1));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.last().map(|p| p.timestamp()), Some(999));
    }
}
