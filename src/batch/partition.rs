//! Order-preserving partitioning of slices into fixed-size batches.

use std::ops::Range;

/// Split `items` into contiguous partitions of at most `size` elements.
///
/// Order is preserved across and within partitions, no partition is empty,
/// and the last partition may be shorter than `size`. Concatenating the
/// partitions in order reconstructs `items` exactly. Empty input yields an
/// empty vector.
///
/// # Panics
///
/// Panics if `size == 0` (the batch executor validates this before calling).
pub fn partition<T>(items: &[T], size: usize) -> Vec<&[T]> {
    assert!(size > 0, "partition size must be > 0");
    if items.is_empty() {
        return Vec::new();
    }
    items.chunks(size).collect()
}

/// Index ranges of the partitions of a `len`-element sequence.
pub(crate) fn partition_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(len.div_ceil(size));
    let mut start = 0usize;
    while start < len {
        let end = (start + size).min(len);
        out.push(start..end);
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{partition, partition_ranges};

    #[test]
    fn partitions_are_exhaustive_and_ordered() {
        let items: Vec<i32> = (0..10).collect();
        let parts = partition(&items, 3);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], &[0, 1, 2]);
        assert_eq!(parts[3], &[9]);

        let rebuilt: Vec<i32> = parts.iter().flat_map(|p| p.iter().copied()).collect();
        assert_eq!(rebuilt, items);
    }

    #[test]
    fn exact_multiple_has_no_short_tail() {
        let items: Vec<i32> = (0..9).collect();
        let parts = partition(&items, 3);
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len() == 3));
    }

    #[test]
    fn oversized_batch_yields_single_partition() {
        let items = [1, 2, 3];
        let parts = partition(&items, 100);
        assert_eq!(parts, vec![&items[..]]);
    }

    #[test]
    fn empty_input_yields_no_partitions() {
        let items: [i32; 0] = [];
        assert!(partition(&items, 4).is_empty());
        assert!(partition_ranges(0, 4).is_empty());
    }

    #[test]
    #[should_panic(expected = "partition size must be > 0")]
    fn zero_size_panics() {
        let _ = partition(&[1, 2, 3], 0);
    }

    #[test]
    fn ranges_match_slice_partitions() {
        let items: Vec<i32> = (0..11).collect();
        let parts = partition(&items, 4);
        let ranges = partition_ranges(items.len(), 4);
        assert_eq!(parts.len(), ranges.len());
        for (part, range) in parts.iter().zip(ranges) {
            assert_eq!(*part, &items[range]);
        }
    }
}
