// Smoother - majority vote over the most recent raw labels
//
// Suppresses single-window misclassifications before they reach the action
// layer. Ties resolve to the smallest label so the output is deterministic.

use std::collections::{BTreeMap, VecDeque};

pub struct Smoother {
    history: VecDeque<i32>,
    capacity: usize,
}

impl Smoother {
    /// Create a smoother over the last `capacity` labels (clamped to at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a raw label and return the current majority label
    ///
    /// There is no warm-up: a single observation is its own majority.
    pub fn observe(&mut self, label: i32) -> i32 {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(label);

        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for &seen in &self.history {
            *counts.entry(seen).or_insert(0) += 1;
        }

        // Ascending iteration + strict comparison keeps the smallest label on ties.
        let mut best = label;
        let mut best_count = 0;
        for (value, count) in counts {
            if count > best_count {
                best = value;
                best_count = count;
            }
        }
        best
    }

    pub fn history(&self) -> impl Iterator<Item = i32> + '_ {
        self.history.iter().copied()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_observation_is_majority() {
        let mut smoother = Smoother::new(3);
        assert_eq!(smoother.observe(5), 5);
    }

    #[test]
    fn test_majority_wins() {
        let mut smoother = Smoother::new(3);
        smoother.observe(1);
        smoother.observe(1);
        assert_eq!(smoother.observe(2), 1);
    }

    #[test]
    fn test_tie_goes_to_smallest_label() {
        let mut smoother = Smoother::new(3);
        smoother.observe(2);
        assert_eq!(smoother.observe(1), 1);

        let mut smoother = Smoother::new(4);
        for label in [7, 2, 7, 2] {
            smoother.observe(label);
        }
        assert_eq!(smoother.history().collect::<Vec<_>>(), vec![7, 2, 7, 2]);
        // History becomes [2, 7, 2, 7]: still a tie.
        assert_eq!(smoother.observe(7), 2);
    }

    #[test]
    fn test_oldest_label_evicted() {
        let mut smoother = Smoother::new(3);
        for label in [1, 1, 2, 2] {
            smoother.observe(label);
        }

        assert_eq!(smoother.history().collect::<Vec<_>>(), vec![1, 2, 2]);
        assert_eq!(smoother.observe(0), 2);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut smoother = Smoother::new(0);
        assert_eq!(smoother.capacity(), 1);
        assert_eq!(smoother.observe(3), 3);
        assert_eq!(smoother.observe(4), 4);
    }
}
