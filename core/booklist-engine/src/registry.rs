//! FILENAME: core/booklist-engine/src/registry.rs
//! Process-wide builder bookkeeping, shared by reference.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Hands out the ids that name each builder's temporary tables and counts
/// the builders that are still open.
#[derive(Debug, Default)]
pub struct BuilderRegistry {
    next_builder_id: AtomicU32,
    next_flat_id: AtomicU32,
    live_builders: AtomicUsize,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a builder id (from 1) and counts the builder as live.
    pub fn allocate_builder_id(&self) -> u32 {
        self.live_builders.fetch_add(1, Ordering::SeqCst);
        self.next_builder_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Called once per builder when it closes.
    pub fn release_builder(&self) {
        // never below zero, even if a caller releases twice
        let _ = self
            .live_builders
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn allocate_flat_id(&self) -> u32 {
        self.next_flat_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn live_count(&self) -> usize {
        self.live_builders.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_counted() {
        let registry = BuilderRegistry::new();
        assert_eq!(registry.allocate_builder_id(), 1);
        assert_eq!(registry.allocate_builder_id(), 2);
        assert_eq!(registry.live_count(), 2);
        registry.release_builder();
        registry.release_builder();
        registry.release_builder();
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.allocate_builder_id(), 3);
    }

    #[test]
    fn test_flat_ids_are_independent() {
        let registry = BuilderRegistry::new();
        registry.allocate_builder_id();
        assert_eq!(registry.allocate_flat_id(), 1);
        assert_eq!(registry.allocate_flat_id(), 2);
    }
}
