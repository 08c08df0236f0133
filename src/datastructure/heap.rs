//! An addressable binary max-heap over variables.
//!
//! Used by elimination-order heuristics, which repeatedly extract the best
//! vertex while the keys of its neighbours change.

use super::VarVec;
use crate::literal::Var;

#[derive(Debug, Default, Clone)]
pub(crate) struct VarHeap<T> {
    /// The key of each variable
    keys: VarVec<T>,
    /// The binary max-heap containing the variables
    heap: Vec<Var>,
    /// The positions of the variables in the heap
    positions: VarVec<Option<usize>>,
}

impl<T> VarHeap<T>
where
    T: Default + Copy + Ord,
{
    pub(crate) fn set_var_count(&mut self, count: usize) {
        self.keys.set_var_count(count);
        self.positions.set_var_count(count);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the variable with the largest key.
    pub(crate) fn peek(&self) -> Option<Var> {
        self.heap.first().copied()
    }

    pub(crate) fn pop(&mut self) -> Option<Var> {
        let var = self.peek()?;
        self.remove(var);
        Some(var)
    }

    pub(crate) fn contains(&self, var: Var) -> bool {
        self.positions[var].is_some()
    }

    /// Inserts `var` with `key`, or moves it if it is already contained.
    pub(crate) fn insert(&mut self, var: Var, key: T) {
        let old = std::mem::replace(&mut self.keys[var], key);
        match self.positions[var] {
            Some(pos) if key >= old => self.sift_up(pos),
            Some(pos) => self.sift_down(pos),
            None => {
                let pos = self.heap.len();
                self.heap.push(var);
                self.positions[var] = Some(pos);
                self.sift_up(pos);
            }
        }
    }

    pub(crate) fn remove(&mut self, var: Var) {
        let Some(pos) = self.positions[var].take() else {
            return;
        };
        self.heap.swap_remove(pos);
        if pos >= self.heap.len() {
            return;
        }
        let moved = self.heap[pos];
        self.positions[moved] = Some(pos);
        self.sift_down(pos);
        self.sift_up(pos);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.keys[self.heap[pos]] <= self.keys[self.heap[parent]] {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let mut largest = pos;
            for child in [2 * pos + 1, 2 * pos + 2] {
                if child < self.heap.len()
                    && self.keys[self.heap[child]] > self.keys[self.heap[largest]]
                {
                    largest = child;
                }
            }
            if largest == pos {
                return;
            }
            self.swap(pos, largest);
            pos = largest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        let (var_a, var_b) = (self.heap[a], self.heap[b]);
        self.heap.swap(a, b);
        self.positions[var_a] = Some(b);
        self.positions[var_b] = Some(a);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cmp::Reverse;

    #[test]
    fn heap() {
        let mut heap = VarHeap::<i32>::default();
        heap.set_var_count(4);
        let vars: Vec<_> = (0..4).map(Var::from_index).collect();
        for &var in &vars {
            heap.insert(var, 0);
        }

        heap.insert(vars[2], 2);
        heap.insert(vars[1], 6);

        assert_eq!(heap.peek(), Some(vars[1]));
        heap.remove(vars[1]);
        assert!(!heap.contains(vars[1]));

        assert_eq!(heap.peek(), Some(vars[2]));

        heap.insert(vars[1], 6);
        assert_eq!(heap.pop(), Some(vars[1]));
        assert_eq!(heap.len(), 3);
    }

    #[test]
    fn min_heap_by_reverse() {
        let mut heap = VarHeap::<Reverse<(usize, u32)>>::default();
        heap.set_var_count(3);
        heap.insert(Var::from_index(0), Reverse((3, 0)));
        heap.insert(Var::from_index(1), Reverse((1, 1)));
        heap.insert(Var::from_index(2), Reverse((1, 2)));
        // lower key wins, ties broken by the second component
        assert_eq!(heap.pop(), Some(Var::from_index(1)));
        heap.insert(Var::from_index(0), Reverse((0, 0)));
        assert_eq!(heap.pop(), Some(Var::from_index(0)));
        assert_eq!(heap.pop(), Some(Var::from_index(2)));
        assert!(heap.is_empty());
    }
}
