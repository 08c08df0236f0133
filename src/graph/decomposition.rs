//! Tree decompositions of the primal graph, computed greedily by min-fill
//! elimination.

use super::PrimalGraph;
use crate::{
    datastructure::{heap::VarHeap, VarVec},
    literal::Var,
};
use std::{cmp::Reverse, collections::HashSet};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeDecomposition {
    width: usize,
    /// elimination order the decomposition was built from, may be empty
    order: Vec<Var>,
    bags: Vec<Vec<Var>>,
    edges: Vec<(usize, usize)>,
}

/// Violation of the tree decomposition properties.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidDecomposition {
    #[error("vertex {0} is not contained in any bag")]
    UncoveredVertex(Var),
    #[error("edge {0} -- {1} is not contained in any bag")]
    UncoveredEdge(Var, Var),
    #[error("the bags containing {0} are not connected")]
    DisconnectedVertex(Var),
    #[error("tree edge refers to unknown bag {0}")]
    UnknownBag(usize),
    #[error("the bags do not form a tree")]
    Cycle,
}

impl TreeDecomposition {
    /// Builds a decomposition from bags and edges, the width is derived from
    /// the largest bag.
    pub(crate) fn from_bags(bags: Vec<Vec<Var>>, edges: Vec<(usize, usize)>) -> Self {
        let width = bags.iter().map(Vec::len).max().unwrap_or(1).saturating_sub(1);
        Self { width, order: Vec::new(), bags, edges }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The elimination order, empty if the decomposition was not computed
    /// by elimination.
    pub fn order(&self) -> &[Var] {
        &self.order
    }

    pub fn bags(&self) -> &[Vec<Var>] {
        &self.bags
    }

    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// Checks that the bags cover every vertex and edge of `graph`, that
    /// the bags containing a vertex are connected, and that the bag graph is
    /// a forest.
    ///
    /// # Errors
    ///
    /// Returns the first violated property.
    pub fn verify(&self, graph: &PrimalGraph) -> Result<(), InvalidDecomposition> {
        let mut forest = UnionFind::new(self.bags.len());
        for &(a, b) in &self.edges {
            if let Some(&bag) = [a, b].iter().find(|&&bag| bag >= self.bags.len()) {
                return Err(InvalidDecomposition::UnknownBag(bag));
            }
            if !forest.union(a, b) {
                return Err(InvalidDecomposition::Cycle);
            }
        }

        let mut bags_of: VarVec<Vec<usize>> = VarVec::with_var_count(graph.var_count());
        for (idx, bag) in self.bags.iter().enumerate() {
            for &var in bag {
                if bags_of.get(var).is_some() {
                    bags_of[var].push(idx);
                }
            }
        }
        for &var in graph.vertices() {
            if bags_of[var].is_empty() {
                return Err(InvalidDecomposition::UncoveredVertex(var));
            }
        }
        for &var in graph.vertices() {
            for &other in graph.neighbours(var) {
                let covered = bags_of[var].iter().any(|&bag| self.bags[bag].contains(&other));
                if var < other && !covered {
                    return Err(InvalidDecomposition::UncoveredEdge(var, other));
                }
            }
        }
        // in a forest the bags of a vertex are connected iff they span
        // exactly one edge less than bags
        for &var in graph.vertices() {
            let bags = &bags_of[var];
            let spanned = self
                .edges
                .iter()
                .filter(|&&(a, b)| bags.contains(&a) && bags.contains(&b))
                .count();
            if spanned + 1 != bags.len() {
                return Err(InvalidDecomposition::DisconnectedVertex(var));
            }
        }
        Ok(())
    }

    /// An elimination order obtained by repeatedly removing a leaf bag and
    /// eliminating the variables it does not share with its neighbour.
    pub fn elimination_order(&self) -> Vec<Var> {
        if !self.order.is_empty() {
            return self.order.clone();
        }
        let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); self.bags.len()];
        for &(a, b) in &self.edges {
            adjacent[a].push(b);
            adjacent[b].push(a);
        }
        let mut degree: Vec<usize> = adjacent.iter().map(Vec::len).collect();
        let mut removed = vec![false; self.bags.len()];
        let mut leaves: Vec<usize> = (0..self.bags.len()).filter(|&bag| degree[bag] <= 1).collect();
        let mut eliminated = HashSet::new();
        let mut order = Vec::new();
        while let Some(bag) = leaves.pop() {
            if std::mem::replace(&mut removed[bag], true) {
                continue;
            }
            let parent = adjacent[bag].iter().copied().find(|&other| !removed[other]);
            for &var in &self.bags[bag] {
                let shared = parent.map_or(false, |parent| self.bags[parent].contains(&var));
                if !shared && eliminated.insert(var) {
                    order.push(var);
                }
            }
            if let Some(parent) = parent {
                degree[parent] -= 1;
                if degree[parent] <= 1 {
                    leaves.push(parent);
                }
            }
        }
        order
    }
}

#[derive(Debug)]
struct UnionFind(Vec<usize>);

impl UnionFind {
    fn new(size: usize) -> Self {
        Self((0..size).collect())
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.0[idx] != idx {
            self.0[idx] = self.0[self.0[idx]];
            idx = self.0[idx];
        }
        idx
    }

    /// Returns `false` if both were in the same set already.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (a, b) = (self.find(a), self.find(b));
        self.0[a] = b;
        a != b
    }
}

/// Number of missing edges among `neighbours`.
fn fill_in(adjacency: &VarVec<Vec<Var>>, neighbours: &[Var]) -> usize {
    let mut missing = 0;
    for (idx, &a) in neighbours.iter().enumerate() {
        for &b in &neighbours[idx + 1..] {
            if adjacency[a].binary_search(&b).is_err() {
                missing += 1;
            }
        }
    }
    missing
}

fn key(adjacency: &VarVec<Vec<Var>>, var: Var) -> Reverse<(usize, usize, usize)> {
    let neighbours = &adjacency[var];
    Reverse((fill_in(adjacency, neighbours), neighbours.len(), var.index()))
}

/// Greedy min-fill elimination, ties broken by degree and then variable.
///
/// Returns `None` as soon as a bag would exceed `width_bound + 1` vertices.
pub fn min_fill(graph: &PrimalGraph, width_bound: usize) -> Option<TreeDecomposition> {
    let mut adjacency: VarVec<Vec<Var>> = VarVec::with_var_count(graph.var_count());
    for &var in graph.vertices() {
        let mut neighbours = graph.neighbours(var).to_vec();
        neighbours.sort_unstable();
        adjacency[var] = neighbours;
    }
    let mut heap = VarHeap::default();
    heap.set_var_count(graph.var_count());
    for &var in graph.vertices() {
        heap.insert(var, key(&adjacency, var));
    }

    let mut width = 0;
    let mut order = Vec::with_capacity(graph.vertices().len());
    let mut bags = Vec::with_capacity(graph.vertices().len());
    while let Some(var) = heap.pop() {
        let neighbours = std::mem::take(&mut adjacency[var]);
        if neighbours.len() > width_bound {
            debug!("min-fill abandoned, width exceeds {width_bound}");
            return None;
        }
        width = width.max(neighbours.len());
        trace!("eliminate {var} with {} neighbours", neighbours.len());

        // make the neighbourhood a clique and remove `var`
        for &a in &neighbours {
            let list = &mut adjacency[a];
            if let Ok(pos) = list.binary_search(&var) {
                list.remove(pos);
            }
            for &b in &neighbours {
                if a != b {
                    if let Err(pos) = adjacency[a].binary_search(&b) {
                        adjacency[a].insert(pos, b);
                    }
                }
            }
        }
        // fill-in values change within distance two
        let mut affected: Vec<Var> = neighbours.clone();
        for &a in &neighbours {
            affected.extend(adjacency[a].iter().copied());
        }
        affected.sort_unstable();
        affected.dedup();
        for other in affected {
            if heap.contains(other) {
                heap.insert(other, key(&adjacency, other));
            }
        }

        let mut bag = neighbours;
        bag.push(var);
        bags.push(bag);
        order.push(var);
    }

    // the parent of a bag is the bag of the neighbour eliminated next
    let mut position = VarVec::<usize>::with_var_count(graph.var_count());
    for (pos, &var) in order.iter().enumerate() {
        position[var] = pos;
    }
    let edges = bags
        .iter()
        .enumerate()
        .filter_map(|(idx, bag)| {
            bag.iter()
                .filter(|&&var| var != order[idx])
                .map(|&var| position[var])
                .min()
                .map(|parent| (idx, parent))
        })
        .collect();
    debug!("min-fill decomposition of width {width}");
    Some(TreeDecomposition { width, order, bags, edges })
}

#[cfg(test)]
mod test {
    use super::*;

    fn var(dimacs: i32) -> Var {
        Var::from_dimacs(dimacs)
    }

    /// A cycle of length `n`, treewidth 2.
    fn cycle(n: i32) -> PrimalGraph {
        let edges: Vec<_> = (1..=n).map(|v| (var(v), var(v % n + 1))).collect();
        PrimalGraph::from_edges(&(1..=n).map(var).collect::<Vec<_>>(), &edges)
    }

    #[test]
    fn cycle_has_width_two() {
        let graph = cycle(6);
        let decomposition = min_fill(&graph, 10).unwrap();
        assert_eq!(decomposition.width(), 2);
        assert_eq!(decomposition.order().len(), 6);
        assert_eq!(decomposition.verify(&graph), Ok(()));
        assert!(min_fill(&graph, 1).is_none());
    }

    #[test]
    fn clique_width() {
        let vertices: Vec<Var> = (1..=4).map(var).collect();
        let mut edges = Vec::new();
        for a in 1..=4 {
            for b in a + 1..=4 {
                edges.push((var(a), var(b)));
            }
        }
        let graph = PrimalGraph::from_edges(&vertices, &edges);
        let decomposition = min_fill(&graph, usize::MAX).unwrap();
        assert_eq!(decomposition.width(), 3);
        assert_eq!(decomposition.verify(&graph), Ok(()));
    }

    #[test]
    fn verify_rejects_violations() {
        let graph = cycle(4);
        let path = |bags: Vec<Vec<i32>>| {
            let bags: Vec<Vec<Var>> =
                bags.into_iter().map(|bag| bag.into_iter().map(var).collect()).collect();
            let edges = (1..bags.len()).map(|idx| (idx - 1, idx)).collect();
            TreeDecomposition::from_bags(bags, edges)
        };
        assert_eq!(path(vec![vec![1, 2, 4], vec![2, 3, 4]]).verify(&graph), Ok(()));
        assert_eq!(
            path(vec![vec![1, 2], vec![2, 3, 4]]).verify(&graph),
            Err(InvalidDecomposition::UncoveredEdge(var(1), var(4)))
        );
        assert_eq!(
            path(vec![vec![1, 2, 4], vec![2, 3], vec![3, 4]]).verify(&graph),
            Err(InvalidDecomposition::DisconnectedVertex(var(4)))
        );
        assert_eq!(
            path(vec![vec![1, 2, 4]]).verify(&graph),
            Err(InvalidDecomposition::UncoveredVertex(var(3)))
        );
        let cyclic = TreeDecomposition::from_bags(
            vec![vec![var(1), var(2), var(3), var(4)]; 3],
            vec![(0, 1), (1, 2), (2, 0)],
        );
        assert_eq!(cyclic.verify(&graph), Err(InvalidDecomposition::Cycle));
    }

    #[test]
    fn elimination_order_from_bags() {
        let bags = vec![vec![var(1), var(2)], vec![var(2), var(3)], vec![var(3), var(4)]];
        let decomposition = TreeDecomposition::from_bags(bags, vec![(0, 1), (1, 2)]);
        assert_eq!(decomposition.width(), 1);
        let mut order = decomposition.elimination_order();
        assert_eq!(order.len(), 4);
        order.sort_unstable();
        order.dedup();
        assert_eq!(order.len(), 4);
    }
}
