//! Sparse Bitmap for Points-to Sets
//!
//! Sorted vector of object ids with a small unsorted insertion buffer:
//! - Insert: O(log n + b) duplicate check, O(1) append, batched merge
//! - Contains: O(log n + b)
//! - Union / difference: O(n + m) merges over sorted runs
//!
//! Sets only grow during a solve; there is deliberately no `remove`.

use crate::features::points_to::domain::InstanceId;
use std::cmp::Ordering;

/// Merge the pending buffer once it holds this many elements
const PENDING_BUFFER_THRESHOLD: usize = 16;

/// Monotone set of [`InstanceId`]s
#[derive(Debug, Clone, Default)]
pub struct SparseBitmap {
    /// Sorted, deduplicated
    elements: Vec<u32>,
    /// Unsorted, disjoint from `elements`, deduplicated
    pending: Vec<u32>,
}

impl PartialEq for SparseBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for SparseBitmap {}

impl SparseBitmap {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(element: InstanceId) -> Self {
        Self {
            elements: vec![element.0],
            pending: Vec::new(),
        }
    }

    pub fn from_ids(ids: impl IntoIterator<Item = InstanceId>) -> Self {
        let mut elements: Vec<u32> = ids.into_iter().map(|id| id.0).collect();
        elements.sort_unstable();
        elements.dedup();
        Self {
            elements,
            pending: Vec::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internal: Consolidation (Deferred Sorting)
    // ═══════════════════════════════════════════════════════════════════════

    fn consolidate(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        self.pending.sort_unstable();
        let pending = std::mem::take(&mut self.pending);
        if self.elements.is_empty() {
            self.elements = pending;
        } else {
            self.elements = merge_sorted(&self.elements, &pending);
        }
    }

    /// Sorted snapshot including pending elements
    fn sorted(&self) -> Vec<u32> {
        if self.pending.is_empty() {
            return self.elements.clone();
        }
        let mut pending = self.pending.clone();
        pending.sort_unstable();
        merge_sorted(&self.elements, &pending)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Basic Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Insert an element. Returns true if it was not present.
    pub fn insert(&mut self, element: InstanceId) -> bool {
        if self.contains(element) {
            return false;
        }
        self.pending.push(element.0);
        if self.pending.len() >= PENDING_BUFFER_THRESHOLD {
            self.consolidate();
        }
        true
    }

    #[inline]
    pub fn contains(&self, element: InstanceId) -> bool {
        self.pending.contains(&element.0) || self.elements.binary_search(&element.0).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len() + self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.pending.is_empty()
    }

    /// Elements in ascending order
    pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
        let mut pending = self.pending.clone();
        pending.sort_unstable();
        MergedIterator {
            sorted: &self.elements,
            pending,
            i: 0,
            j: 0,
        }
        .map(InstanceId)
    }

    pub fn to_vec(&self) -> Vec<InstanceId> {
        self.sorted().into_iter().map(InstanceId).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Set Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// self = self ∪ other. Returns true if self grew.
    pub fn union_with(&mut self, other: &SparseBitmap) -> bool {
        if other.is_empty() {
            return false;
        }
        self.consolidate();
        let before = self.elements.len();
        self.elements = merge_sorted(&self.elements, &other.sorted());
        self.elements.len() > before
    }

    /// Elements of self not in other
    pub fn difference(&self, other: &SparseBitmap) -> SparseBitmap {
        let other_sorted = other.sorted();
        let mut result = Vec::new();
        let mut j = 0;
        for element in self.sorted() {
            while j < other_sorted.len() && other_sorted[j] < element {
                j += 1;
            }
            if j >= other_sorted.len() || other_sorted[j] != element {
                result.push(element);
            }
        }
        SparseBitmap {
            elements: result,
            pending: Vec::new(),
        }
    }

    pub fn is_subset_of(&self, other: &SparseBitmap) -> bool {
        self.len() <= other.len() && self.iter().all(|element| other.contains(element))
    }
}

/// Merge two sorted, deduplicated slices
fn merge_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

/// Ascending walk over the sorted run and the (disjoint) sorted pending run
struct MergedIterator<'a> {
    sorted: &'a [u32],
    pending: Vec<u32>,
    i: usize,
    j: usize,
}

impl Iterator for MergedIterator<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        match (self.sorted.get(self.i), self.pending.get(self.j)) {
            (Some(&s), Some(&p)) if s < p => {
                self.i += 1;
                Some(s)
            }
            (_, Some(&p)) => {
                self.j += 1;
                Some(p)
            }
            (Some(&s), None) => {
                self.i += 1;
                Some(s)
            }
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u32]) -> Vec<InstanceId> {
        values.iter().copied().map(InstanceId).collect()
    }

    #[test]
    fn test_basic_operations() {
        let mut set = SparseBitmap::new();
        assert!(set.is_empty());

        assert!(set.insert(InstanceId(5)));
        assert!(set.insert(InstanceId(3)));
        assert!(set.insert(InstanceId(7)));
        assert!(!set.insert(InstanceId(5)));

        assert_eq!(set.len(), 3);
        assert!(set.contains(InstanceId(3)));
        assert!(!set.contains(InstanceId(4)));
        assert_eq!(set.to_vec(), ids(&[3, 5, 7]));
    }

    #[test]
    fn test_insert_after_consolidation_detects_duplicates() {
        let mut set = SparseBitmap::new();
        for i in 0..PENDING_BUFFER_THRESHOLD as u32 {
            set.insert(InstanceId(i));
        }
        // first element is now in the sorted run while a new one is pending
        assert!(set.insert(InstanceId(100)));
        assert!(!set.insert(InstanceId(0)));
        assert_eq!(set.len(), PENDING_BUFFER_THRESHOLD + 1);
    }

    #[test]
    fn test_iteration_is_sorted_with_pending() {
        let mut set = SparseBitmap::from_ids(ids(&[10, 20]));
        set.insert(InstanceId(15));
        set.insert(InstanceId(1));
        assert_eq!(set.iter().collect::<Vec<_>>(), ids(&[1, 10, 15, 20]));
    }

    #[test]
    fn test_union_reports_growth() {
        let mut a = SparseBitmap::from_ids(ids(&[1, 3, 5]));
        let b = SparseBitmap::from_ids(ids(&[3, 5]));
        assert!(!a.union_with(&b));
        let c = SparseBitmap::from_ids(ids(&[2]));
        assert!(a.union_with(&c));
        assert_eq!(a.to_vec(), ids(&[1, 2, 3, 5]));
    }

    #[test]
    fn test_difference() {
        let mut a = SparseBitmap::from_ids(ids(&[1, 2, 3, 4, 5]));
        a.insert(InstanceId(9));
        let b = SparseBitmap::from_ids(ids(&[2, 4]));
        assert_eq!(a.difference(&b).to_vec(), ids(&[1, 3, 5, 9]));
        assert!(b.difference(&a).is_empty());
    }

    #[test]
    fn test_equality_ignores_layout() {
        let a = SparseBitmap::from_ids(ids(&[1, 2]));
        let mut b = SparseBitmap::new();
        b.insert(InstanceId(2));
        b.insert(InstanceId(1));
        assert_eq!(a, b);
        assert!(a.is_subset_of(&b));
    }
}
