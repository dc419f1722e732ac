//! Sum tree for proportional sampling.
//!
//! Leaves hold the sampling mass of each slot and every internal node holds
//! the sum of its two children, so the total mass is available at the root
//! and a prefix-sum search takes `O(log N)`.

/// Binary sum tree over `capacity` leaves.
///
/// Nodes are stored 1-indexed: the root is `tree[1]`, node `k` has children
/// `2k` and `2k + 1` and leaf `ix` lives at `tree[n_leaves + ix]`.
#[derive(Debug, Clone)]
pub(super) struct SumTree {
    capacity: usize,
    n_leaves: usize,
    tree: Vec<f64>,
}

impl SumTree {
    pub fn new(capacity: usize) -> Self {
        let n_leaves = capacity.next_power_of_two();
        Self {
            capacity,
            n_leaves,
            tree: vec![0f64; 2 * n_leaves],
        }
    }

    /// Sum of all leaves.
    pub fn total(&self) -> f64 {
        self.tree[1]
    }

    /// Value of leaf `ix`.
    pub fn leaf(&self, ix: usize) -> f64 {
        self.tree[self.n_leaves + ix]
    }

    /// Sets leaf `ix` to `value` and refreshes its ancestors.
    ///
    /// Parents are recomputed from their children instead of being shifted by
    /// the difference, so rounding errors do not accumulate over updates.
    pub fn set(&mut self, ix: usize, value: f64) {
        debug_assert!(ix < self.capacity);
        let mut node = self.n_leaves + ix;
        self.tree[node] = value;
        while node > 1 {
            node /= 2;
            self.tree[node] = self.tree[2 * node] + self.tree[2 * node + 1];
        }
    }

    /// Returns the leaf whose cumulative interval contains `s`.
    ///
    /// `s` is expected in `[0, total)`. The descent never enters a subtree of
    /// zero mass, so the returned leaf always has a positive value as long as
    /// the total is positive, even if rounding pushes `s` past the total.
    pub fn find(&self, mut s: f64) -> usize {
        let mut node = 1;
        while node < self.n_leaves {
            let left = 2 * node;
            let right = left + 1;
            if s < self.tree[left] || self.tree[right] <= 0.0 {
                node = left;
            } else {
                s -= self.tree[left];
                node = right;
            }
        }
        node - self.n_leaves
    }
}
