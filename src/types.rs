//! Core identity types shared by every subsystem.
//!
//! `NodeId` and `FileId` are non-zero surrogate identifiers: `Copy`, hashable,
//! serializable, and impossible to accidentally zero-initialize. They are
//! assigned by the cache on first insert and never reused within a process
//! lifetime.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(NonZeroU32);

impl NodeId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl FileId {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn value(&self) -> u32 {
        self.0.get()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

/// A small, immutable, interned-friendly string. We use `Box<str>` rather
/// than `String` throughout the model: these values never grow after
/// extraction and boxing avoids carrying the extra `usize` capacity field
/// across millions of nodes.
pub type CompactString = Box<str>;

pub fn compact_string(s: impl AsRef<str>) -> CompactString {
    s.as_ref().into()
}

/// Monotonic surrogate id allocator, one per cache instance.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: std::sync::atomic::AtomicU32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: std::sync::atomic::AtomicU32::new(1),
        }
    }

    pub fn starting_at(next: u32) -> Self {
        Self {
            next: std::sync::atomic::AtomicU32::new(next.max(1)),
        }
    }

    pub fn alloc_node(&self) -> NodeId {
        let v = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        NodeId::new(v).expect("allocator never yields zero")
    }

    pub fn peek(&self) -> u32 {
        self.next.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Resets the next-id counter, used when restoring a persisted snapshot.
    pub fn reset(&self, next: u32) {
        self.next.store(next.max(1), std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_rejects_zero() {
        assert!(NodeId::new(0).is_none());
        assert_eq!(NodeId::new(5).unwrap().value(), 5);
    }

    #[test]
    fn allocator_is_monotonic_and_never_zero() {
        let alloc = IdAllocator::new();
        let a = alloc.alloc_node();
        let b = alloc.alloc_node();
        assert!(a.value() < b.value());
        assert_ne!(a.value(), 0);
    }
}
