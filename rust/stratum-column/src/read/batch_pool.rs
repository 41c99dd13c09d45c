//! Pooling of output batches with an explicit acquire/release scope.

use std::{
    ops::{Deref, DerefMut},
    sync::Mutex,
};

use stratum_format::schema::BasicTypeDescriptor;
use stratum_sequence::batch::ValueBatch;

/// Owns the output buffers handed to batch consumers.
///
/// In reuse mode, storage recycled through dropped [`BatchGuard`]s is
/// cleared and handed out again, so a long scan allocates a constant number
/// of buffers. In fresh mode every acquisition allocates a new batch and
/// dropped guards discard their storage.
#[derive(Debug)]
pub struct BatchPool {
    type_desc: BasicTypeDescriptor,
    reuse: bool,
    spare: Mutex<Vec<ValueBatch>>,
}

impl BatchPool {
    pub fn new(type_desc: BasicTypeDescriptor, reuse: bool) -> BatchPool {
        BatchPool {
            type_desc,
            reuse,
            spare: Mutex::new(Vec::new()),
        }
    }

    pub fn reuse_enabled(&self) -> bool {
        self.reuse
    }

    /// Acquires an empty batch able to hold `capacity` rows.
    ///
    /// A recycled batch is fully invalidated before it is handed out: its
    /// length is zero and it carries no validity markers from the prior
    /// fill. The guard returns the storage on drop.
    pub fn acquire(&self, capacity: usize) -> BatchGuard<'_> {
        let batch = if self.reuse {
            self.spare.lock().unwrap().pop()
        } else {
            None
        };
        let batch = match batch {
            Some(mut batch) => {
                batch.clear();
                batch
            }
            None => ValueBatch::with_capacity(self.type_desc, capacity),
        };
        BatchGuard { pool: self, batch }
    }

    fn release(&self, mut batch: ValueBatch) {
        if self.reuse {
            batch.clear();
            self.spare.lock().unwrap().push(batch);
        }
    }

    #[cfg(test)]
    fn spare_count(&self) -> usize {
        self.spare.lock().unwrap().len()
    }
}

/// Scoped ownership of one batch acquired from a [`BatchPool`].
///
/// Holding the guard keeps the batch contents alive and untouched; dropping
/// it signals the pool that the consumer is done, allowing the backing
/// storage to be reused for the next batch.
pub struct BatchGuard<'a> {
    pool: &'a BatchPool,
    batch: ValueBatch,
}

impl Deref for BatchGuard<'_> {
    type Target = ValueBatch;

    fn deref(&self) -> &Self::Target {
        &self.batch
    }
}

impl DerefMut for BatchGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.batch
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let batch = std::mem::replace(&mut self.batch, ValueBatch::empty(self.pool.type_desc));
        self.pool.release(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_format::schema::{BasicType, BasicTypeDescriptor};

    fn desc() -> BasicTypeDescriptor {
        BasicTypeDescriptor::new(BasicType::Int64, true)
    }

    #[test]
    fn test_fresh_mode_discards() {
        let pool = BatchPool::new(desc(), false);
        {
            let mut guard = pool.acquire(16);
            guard.push_value(1i64);
        }
        assert_eq!(pool.spare_count(), 0);
    }

    #[test]
    fn test_reuse_mode_recycles_cleared() {
        let pool = BatchPool::new(desc(), true);
        {
            let mut guard = pool.acquire(16);
            guard.push_value(42i64);
            guard.push_null();
            assert_eq!(guard.len(), 2);
        }
        assert_eq!(pool.spare_count(), 1);

        let guard = pool.acquire(16);
        assert!(guard.is_empty());
        assert_eq!(guard.presence.count_nulls(), 0);
        assert_eq!(pool.spare_count(), 0);
    }

    #[test]
    fn test_two_guards_outstanding() {
        let pool = BatchPool::new(desc(), true);
        let a = pool.acquire(8);
        let b = pool.acquire(8);
        drop(a);
        drop(b);
        assert_eq!(pool.spare_count(), 2);
    }
}
