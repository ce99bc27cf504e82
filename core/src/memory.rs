//! Allocation of scratch memory for the codecs.
//!
//! Codec entry points which need temporary planes take an [`Allocator`].
//! [`SystemAllocator`] simply allocates,
//! whereas [`MemoryPool`] keeps released blocks around
//! and hands them out again for requests of the same size.
//! A pool is not `Sync`, so it stays with the thread which created it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Source of zero-initialized scratch vectors.
pub trait Allocator {
    /// Obtain a zeroed byte block of exactly `len` bytes.
    fn bytes(&self, len: usize) -> Vec<u8>;

    /// Give a byte block back.
    fn release_bytes(&self, block: Vec<u8>);

    /// Obtain a zeroed sample block of exactly `len` samples.
    fn samples(&self, len: usize) -> Vec<i32>;

    /// Give a sample block back.
    fn release_samples(&self, block: Vec<i32>);
}

/// Allocator with no reuse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn bytes(&self, len: usize) -> Vec<u8> {
        vec![0; len]
    }

    fn release_bytes(&self, _block: Vec<u8>) {}

    fn samples(&self, len: usize) -> Vec<i32> {
        vec![0; len]
    }

    fn release_samples(&self, _block: Vec<i32>) {}
}

/// Counters describing the activity of a [`MemoryPool`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// blocks requested
    pub requested: usize,
    /// requests served from a pooled block
    pub reused: usize,
    /// blocks given back
    pub released: usize,
    /// bytes currently held by the pool
    pub pooled_bytes: usize,
}

#[derive(Debug)]
struct Slots<T> {
    blocks: VecDeque<Vec<T>>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Slots {
            blocks: VecDeque::new(),
        }
    }
}

impl<T> Slots<T> {
    fn take(&mut self, len: usize) -> Option<Vec<T>> {
        let index = self.blocks.iter().position(|b| b.len() == len)?;
        self.blocks.remove(index)
    }
}

/// A pool of reusable blocks.
///
/// Blocks smaller than the minimum size are not kept,
/// and the oldest blocks are dropped
/// once the pooled total would exceed the maximum size.
#[derive(Debug)]
pub struct MemoryPool {
    min_block_size: usize,
    max_pool_size: usize,
    bytes: RefCell<Slots<u8>>,
    samples: RefCell<Slots<i32>>,
    stats: Cell<PoolStats>,
}

impl Default for MemoryPool {
    fn default() -> Self {
        MemoryPool::new(1024, 16 * 1024 * 1024)
    }
}

impl MemoryPool {
    pub fn new(min_block_size: usize, max_pool_size: usize) -> Self {
        MemoryPool {
            min_block_size,
            max_pool_size,
            bytes: RefCell::new(Slots::default()),
            samples: RefCell::new(Slots::default()),
            stats: Cell::new(PoolStats::default()),
        }
    }

    /// Current counters.
    pub fn stats(&self) -> PoolStats {
        self.stats.get()
    }

    /// Drop every pooled block.
    pub fn flush(&self) {
        self.bytes.borrow_mut().blocks.clear();
        self.samples.borrow_mut().blocks.clear();
        self.update(|s| s.pooled_bytes = 0);
    }

    fn update(&self, f: impl FnOnce(&mut PoolStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn acquire<T: Copy + Default>(&self, slots: &RefCell<Slots<T>>, len: usize) -> Vec<T> {
        let size = len * std::mem::size_of::<T>();
        match slots.borrow_mut().take(len) {
            Some(mut block) => {
                block.iter_mut().for_each(|v| *v = T::default());
                self.update(|s| {
                    s.requested += 1;
                    s.reused += 1;
                    s.pooled_bytes -= size;
                });
                block
            }
            None => {
                self.update(|s| s.requested += 1);
                vec![T::default(); len]
            }
        }
    }

    fn keep<T>(&self, slots: &RefCell<Slots<T>>, block: Vec<T>) {
        let size = block.len() * std::mem::size_of::<T>();
        self.update(|s| s.released += 1);
        if size < self.min_block_size || size > self.max_pool_size {
            return;
        }
        let mut slots = slots.borrow_mut();
        let mut pooled = self.stats.get().pooled_bytes;
        while pooled + size > self.max_pool_size {
            match slots.blocks.pop_front() {
                Some(old) => pooled -= old.len() * std::mem::size_of::<T>(),
                None => break,
            }
        }
        slots.blocks.push_back(block);
        self.update(|s| s.pooled_bytes = pooled + size);
    }
}

impl Allocator for MemoryPool {
    fn bytes(&self, len: usize) -> Vec<u8> {
        self.acquire(&self.bytes, len)
    }

    fn release_bytes(&self, block: Vec<u8>) {
        self.keep(&self.bytes, block)
    }

    fn samples(&self, len: usize) -> Vec<i32> {
        self.acquire(&self.samples, len)
    }

    fn release_samples(&self, block: Vec<i32>) {
        self.keep(&self.samples, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_reuses_same_size_blocks() {
        let pool = MemoryPool::new(16, 1 << 20);
        let mut block = pool.bytes(64);
        block[0] = 0xFF;
        pool.release_bytes(block);
        assert_eq!(pool.stats().pooled_bytes, 64);

        let block = pool.bytes(64);
        assert_eq!(block[0], 0, "reused blocks are zeroed");
        let stats = pool.stats();
        assert_eq!(stats.requested, 2);
        assert_eq!(stats.reused, 1);
        assert_eq!(stats.pooled_bytes, 0);

        // different size: fresh allocation
        let _other = pool.bytes(32);
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn small_blocks_are_not_kept() {
        let pool = MemoryPool::new(128, 1 << 20);
        pool.release_samples(pool.samples(4));
        assert_eq!(pool.stats().pooled_bytes, 0);
        assert_eq!(pool.stats().released, 1);
    }

    #[test]
    fn pool_evicts_oldest_beyond_capacity() {
        let pool = MemoryPool::new(1, 100);
        pool.release_bytes(vec![0; 60]);
        pool.release_bytes(vec![0; 50]);
        assert_eq!(pool.stats().pooled_bytes, 50);
        pool.flush();
        assert_eq!(pool.stats().pooled_bytes, 0);
    }
}
