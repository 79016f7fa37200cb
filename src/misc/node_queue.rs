use binary_heap_plus::BinaryHeap;
use compare::Compare;

/// Open node queue of the bounded sub-solve.
///
/// Nodes are first ordered by the comparator used while no incumbent
/// exists (diving), and swapped once to the bound comparator as soon as
/// the search reports a first solution.
pub struct NodeQueue<T, C>
where
    C: Compare<T> + Clone,
{
    queue: BinaryHeap<T, C>,
    did_swap_priority: bool,
    compare_bound: C,
    compare_without_bound: C,
}

impl<T, C> NodeQueue<T, C>
where
    C: Compare<T> + Clone,
{
    /// Create empty queue
    pub fn new(compare_bound: C, compare_without_bound: C) -> Self {
        let heap = BinaryHeap::from_vec_cmp(Vec::new(), compare_without_bound.clone());

        Self {
            queue: heap,
            did_swap_priority: false,
            compare_bound,
            compare_without_bound,
        }
    }

    pub fn now_has_bound(&mut self) {
        // only swap if not previously
        if !self.did_swap_priority {
            self.did_swap_priority = true;
            self.queue.replace_cmp(self.compare_bound.clone());
        }
    }

    pub fn has_bound(&self) -> bool {
        self.did_swap_priority
    }

    pub fn push(&mut self, t: T) {
        self.queue.push(t);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.queue.pop()
    }

    /// Smallest value of `key` over all open nodes
    pub fn lowest_by(&self, key: impl Fn(&T) -> f64) -> Option<f64> {
        self.queue.iter().map(key).min_by(f64::total_cmp)
    }

    /// return number of elements in queue
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[derive(Clone)]
    struct ByKey(bool);

    impl Compare<(u32, u32)> for ByKey {
        // first component while diving, second once bounded
        fn compare(&self, l: &(u32, u32), r: &(u32, u32)) -> Ordering {
            if self.0 { r.1.cmp(&l.1) } else { l.0.cmp(&r.0) }
        }
    }

    #[test]
    fn swaps_order_once() {
        let mut queue = NodeQueue::new(ByKey(true), ByKey(false));
        for item in [(1, 5), (3, 9), (2, 1)] {
            queue.push(item);
        }
        assert_eq!(queue.pop(), Some((3, 9)));

        queue.now_has_bound();
        assert!(queue.has_bound());
        assert_eq!(queue.lowest_by(|i| f64::from(i.1)), Some(1.0));
        assert_eq!(queue.pop(), Some((2, 1)));
        assert_eq!(queue.len(), 1);
    }
}
