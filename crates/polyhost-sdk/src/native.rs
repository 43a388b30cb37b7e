//! Native memory bridge interface.
//!
//! The boundary engine never touches raw memory. Embedders that bind a native
//! tool library supply a [`NativeBridge`]; [`HeapBridge`] is a heap-backed
//! implementation with a byte budget, useful for tests and for hosts without
//! a native library.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Handle to one native allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(u64);

impl NativeHandle {
    /// Raw handle value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Native bridge failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NativeError {
    /// The allocation does not fit the remaining budget
    #[error("Out of memory: requested {requested} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        requested: usize,
    },

    /// The handle was never allocated or was already freed
    #[error("Invalid native handle {0}")]
    InvalidHandle(u64),
}

/// Operations consumed from the native library
pub trait NativeBridge: Send + Sync {
    /// Allocate `size` bytes
    fn allocate(&self, size: usize) -> Result<NativeHandle, NativeError>;

    /// Release an allocation
    fn free(&self, handle: NativeHandle) -> Result<(), NativeError>;

    /// Byte offset of `field` within `struct_name`, `None` when unknown
    fn lookup_struct_offset(&self, struct_name: &str, field: &str) -> Option<usize>;
}

/// Heap-backed bridge with a fixed byte budget
pub struct HeapBridge {
    budget: usize,
    next_handle: AtomicU64,
    allocations: Mutex<HashMap<u64, usize>>,
    layouts: HashMap<String, Vec<(String, usize)>>,
}

impl HeapBridge {
    /// Create a bridge that allows at most `budget` live bytes
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            next_handle: AtomicU64::new(1),
            allocations: Mutex::new(HashMap::new()),
            layouts: HashMap::new(),
        }
    }

    /// Register a struct layout as `(field, offset)` pairs
    pub fn with_layout(mut self, struct_name: &str, fields: &[(&str, usize)]) -> Self {
        self.layouts.insert(
            struct_name.to_string(),
            fields
                .iter()
                .map(|(name, offset)| (name.to_string(), *offset))
                .collect(),
        );
        self
    }

    /// Bytes currently allocated
    pub fn live_bytes(&self) -> usize {
        self.allocations.lock().values().sum()
    }
}

impl NativeBridge for HeapBridge {
    fn allocate(&self, size: usize) -> Result<NativeHandle, NativeError> {
        let mut allocations = self.allocations.lock();
        let live: usize = allocations.values().sum();
        if live.saturating_add(size) > self.budget {
            return Err(NativeError::OutOfMemory { requested: size });
        }
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        allocations.insert(id, size);
        Ok(NativeHandle(id))
    }

    fn free(&self, handle: NativeHandle) -> Result<(), NativeError> {
        self.allocations
            .lock()
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(NativeError::InvalidHandle(handle.0))
    }

    fn lookup_struct_offset(&self, struct_name: &str, field: &str) -> Option<usize> {
        self.layouts
            .get(struct_name)?
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, offset)| *offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_within_budget() {
        let bridge = HeapBridge::new(64);
        let a = bridge.allocate(32).unwrap();
        let b = bridge.allocate(32).unwrap();
        assert_ne!(a, b);
        assert_eq!(bridge.live_bytes(), 64);
        assert_eq!(
            bridge.allocate(1),
            Err(NativeError::OutOfMemory { requested: 1 })
        );
        bridge.free(a).unwrap();
        assert!(bridge.allocate(16).is_ok());
    }

    #[test]
    fn test_double_free() {
        let bridge = HeapBridge::new(8);
        let h = bridge.allocate(8).unwrap();
        bridge.free(h).unwrap();
        assert_eq!(bridge.free(h), Err(NativeError::InvalidHandle(h.raw())));
    }

    #[test]
    fn test_struct_offsets() {
        let bridge = HeapBridge::new(0).with_layout("point", &[("x", 0), ("y", 8)]);
        assert_eq!(bridge.lookup_struct_offset("point", "y"), Some(8));
        assert_eq!(bridge.lookup_struct_offset("point", "z"), None);
        assert_eq!(bridge.lookup_struct_offset("rect", "x"), None);
    }
}
