//! Address-indexed, gap-tolerant storage for image data.
//!
//! A `SparseVector` keeps contiguous runs ("buckets") of values keyed by the
//! address of their first element. HEX and ELF ingestion insert one byte at a
//! time; a write that extends the end of a bucket appends to it, a write into
//! a gap starts a new bucket, and a write to an address that already holds a
//! value is rejected.

use std::collections::BTreeMap;
use std::ops::Index;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SparseError {
    #[error("Address 0x{address:08X} was already specified")]
    Overwrite { address: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseVector<T> {
    buckets: BTreeMap<u32, Vec<T>>,
    len: usize,
}

impl<T> Default for SparseVector<T> {
    fn default() -> Self {
        Self { buckets: BTreeMap::new(), len: 0 }
    }
}

/// Exclusive end address of a bucket, widened so a bucket ending at
/// `u32::MAX` does not wrap.
fn bucket_end<T>(start: u32, values: &[T]) -> u64 {
    start as u64 + values.len() as u64
}

impl<T> SparseVector<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `position`.
    pub fn insert(&mut self, value: T, position: u32) -> Result<(), SparseError> {
        if let Some((&start, bucket)) = self.buckets.range_mut(..=position).next_back() {
            let end = bucket_end(start, bucket);
            if (position as u64) < end {
                return Err(SparseError::Overwrite { address: position });
            }
            if position as u64 == end {
                bucket.push(value);
                self.len += 1;
                return Ok(());
            }
        }

        self.buckets.insert(position, vec![value]);
        self.len += 1;
        Ok(())
    }

    pub fn get(&self, position: u32) -> Option<&T> {
        let (&start, bucket) = self.buckets.range(..=position).next_back()?;
        bucket.get((position - start) as usize)
    }

    /// Element at linear `index` across all buckets in address order,
    /// together with its address.
    pub fn element_at_index(&self, index: usize) -> Option<(u32, &T)> {
        let mut remaining = index;
        for (&start, bucket) in &self.buckets {
            if remaining < bucket.len() {
                return Some((start + remaining as u32, &bucket[remaining]));
            }
            remaining -= bucket.len();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Lowest populated address.
    pub fn start_address(&self) -> Option<u32> {
        self.buckets.keys().next().copied()
    }

    /// One past the highest populated address.
    pub fn end_address(&self) -> Option<u64> {
        self.buckets.iter().next_back().map(|(&start, bucket)| bucket_end(start, bucket))
    }

    /// `(address, value)` pairs in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.buckets.iter().flat_map(|(&start, bucket)| {
            bucket.iter().enumerate().map(move |(i, value)| (start + i as u32, value))
        })
    }

    /// Buckets as `(start, values)` in ascending address order.
    pub fn buckets(&self) -> impl Iterator<Item = (u32, &[T])> + '_ {
        self.buckets.iter().map(|(&start, bucket)| (start, bucket.as_slice()))
    }

    /// Buckets are non-empty, strictly increasing and non-overlapping, and
    /// the cached length matches their total size.
    pub fn invariant_holds(&self) -> bool {
        let mut previous_end: Option<u64> = None;
        let mut total = 0usize;
        for (&start, bucket) in &self.buckets {
            if bucket.is_empty() {
                return false;
            }
            if let Some(end) = previous_end {
                if (start as u64) < end {
                    return false;
                }
            }
            previous_end = Some(bucket_end(start, bucket));
            total += bucket.len();
        }
        total == self.len
    }
}

impl<T: Clone> SparseVector<T> {
    /// Flatten into one buffer spanning the lowest to the highest address,
    /// filling gaps with `fill`. Returns the buffer and its start address.
    pub fn to_contiguous(&self, fill: T) -> (Vec<T>, u32) {
        let Some(start) = self.start_address() else {
            return (Vec::new(), 0);
        };
        let end = self.end_address().unwrap_or(start as u64);
        let mut out = Vec::with_capacity((end - start as u64) as usize);
        for (bucket_start, bucket) in self.buckets() {
            let offset = (bucket_start - start) as usize;
            out.resize(offset, fill.clone());
            out.extend_from_slice(bucket);
        }
        (out, start)
    }

    /// Concatenate all values in address order, dropping gaps.
    pub fn to_packed(&self) -> (Vec<T>, u32) {
        let out = self.iter().map(|(_, v)| v.clone()).collect();
        (out, self.start_address().unwrap_or(0))
    }
}

impl<T> Index<u32> for SparseVector<T> {
    type Output = T;

    fn index(&self, position: u32) -> &T {
        match self.get(position) {
            Some(value) => value,
            None => panic!("no value stored at address 0x{position:08X}"),
        }
    }
}
