use std::sync::{Arc, Mutex};

use crate::error::SequenceError;

/// Durable storage for the sequence counter.
///
/// `load` returns `None` only for a store that has never been written; any
/// unreadable or unparsable value must be an error.
pub trait CounterStore: Send + Sync {
    fn load(&self) -> Result<Option<u64>, SequenceError>;
    fn store(&self, value: u64) -> Result<(), SequenceError>;
}

/// Counter store held in memory. Does not survive restarts.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    value: Mutex<Option<u64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(value: u64) -> Self {
        Self {
            value: Mutex::new(Some(value)),
        }
    }
}

impl CounterStore for MemoryCounterStore {
    fn load(&self) -> Result<Option<u64>, SequenceError> {
        self.value
            .lock()
            .map(|v| *v)
            .map_err(|_| SequenceError::Poisoned)
    }

    fn store(&self, value: u64) -> Result<(), SequenceError> {
        let mut guard = self.value.lock().map_err(|_| SequenceError::Poisoned)?;
        *guard = Some(value);
        Ok(())
    }
}

/// Hands out strictly increasing credential sequence IDs.
///
/// The read-increment-write runs under a mutex, so concurrent callers never
/// observe the same value. The first ID from an empty store is 1.
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
    lock: Mutex<()>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    pub fn next_id(&self) -> Result<u64, SequenceError> {
        let _guard = self.lock.lock().map_err(|_| SequenceError::Poisoned)?;
        let current = self.store.load()?.unwrap_or(0);
        let next = current.checked_add(1).ok_or(SequenceError::Exhausted)?;
        self.store.store(next)?;
        tracing::debug!(sequence_id = next, "sequence id allocated");
        Ok(next)
    }

    /// Last issued ID, if any.
    pub fn current(&self) -> Result<Option<u64>, SequenceError> {
        let _guard = self.lock.lock().map_err(|_| SequenceError::Poisoned)?;
        self.store.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    struct BrokenStore;

    impl CounterStore for BrokenStore {
        fn load(&self) -> Result<Option<u64>, SequenceError> {
            Err(SequenceError::Corrupt("3 bytes".into()))
        }
        fn store(&self, _value: u64) -> Result<(), SequenceError> {
            Ok(())
        }
    }

    #[test]
    fn test_first_id_is_one() {
        let alloc = SequenceAllocator::new(Arc::new(MemoryCounterStore::new()));
        assert_eq!(alloc.current().unwrap(), None);
        assert_eq!(alloc.next_id().unwrap(), 1);
        assert_eq!(alloc.next_id().unwrap(), 2);
        assert_eq!(alloc.current().unwrap(), Some(2));
    }

    #[test]
    fn test_resumes_from_store() {
        let store = Arc::new(MemoryCounterStore::starting_at(41));
        let alloc = SequenceAllocator::new(store.clone());
        assert_eq!(alloc.next_id().unwrap(), 42);
        assert_eq!(store.load().unwrap(), Some(42));
    }

    #[test]
    fn test_corrupt_store_does_not_restart_at_zero() {
        let alloc = SequenceAllocator::new(Arc::new(BrokenStore));
        assert!(matches!(alloc.next_id(), Err(SequenceError::Corrupt(_))));
    }

    #[test]
    fn test_exhausted() {
        let alloc = SequenceAllocator::new(Arc::new(MemoryCounterStore::starting_at(u64::MAX)));
        assert!(matches!(alloc.next_id(), Err(SequenceError::Exhausted)));
    }

    #[test]
    fn test_concurrent_ids_are_unique_and_gap_free() {
        let alloc = Arc::new(SequenceAllocator::new(Arc::new(MemoryCounterStore::new())));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = alloc.clone();
                thread::spawn(move || (0..50).map(|_| alloc.next_id().unwrap()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 400);
        assert_eq!(seen.iter().copied().min(), Some(1));
        assert_eq!(seen.iter().copied().max(), Some(400));
    }
}
