//! Elementary cycle enumeration (Johnson's algorithm)
//!
//! Every strongly connected component with at least two nodes is searched
//! from its smallest node. Once all cycles through that node are known it
//! is removed, the remainder is split into components again, and the search
//! repeats. Blocking keeps each search from re-walking dead ends.

use crate::core::graph::PreferenceGraph;
use crate::models::ApplicationId;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeSet, HashMap, HashSet};

/// A cycle as a node sequence; the closing edge back to the first node is implied
pub type Cycle = Vec<ApplicationId>;

type Subgraph = DiGraphMap<ApplicationId, ()>;

/// Enumerate every elementary cycle of `graph`
///
/// Each cycle starts at its smallest node and the list is sorted, so the
/// result is stable across runs. `max_length` drops cycles longer than the
/// given number of nodes.
pub fn elementary_cycles(graph: &PreferenceGraph, max_length: Option<usize>) -> Vec<Cycle> {
    let max_length = max_length.unwrap_or(usize::MAX);
    let mut cycles = Vec::new();
    if max_length < 2 {
        return cycles;
    }

    let mut pending: Vec<BTreeSet<ApplicationId>> = components(graph.inner());

    while let Some(component) = pending.pop() {
        let Some(&start) = component.iter().next() else {
            continue;
        };
        let subgraph = induced(graph.inner(), &component);

        let mut search = CircuitSearch::new(&subgraph, start, max_length);
        search.circuit(start);
        cycles.extend(search.found);

        let mut rest = component;
        rest.remove(&start);
        if rest.len() >= 2 {
            pending.extend(components(&induced(graph.inner(), &rest)));
        }
    }

    cycles.sort();
    cycles
}

/// Non-trivial strongly connected components
fn components(graph: &Subgraph) -> Vec<BTreeSet<ApplicationId>> {
    tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() >= 2)
        .map(|scc| scc.into_iter().collect())
        .collect()
}

fn induced(graph: &Subgraph, nodes: &BTreeSet<ApplicationId>) -> Subgraph {
    let mut sub = DiGraphMap::with_capacity(nodes.len(), 0);
    for &node in nodes {
        sub.add_node(node);
    }
    for &node in nodes {
        for next in graph.neighbors(node) {
            if nodes.contains(&next) {
                sub.add_edge(node, next, ());
            }
        }
    }
    sub
}

struct CircuitSearch<'g> {
    graph: &'g Subgraph,
    start: ApplicationId,
    max_length: usize,
    stack: Vec<ApplicationId>,
    blocked: HashSet<ApplicationId>,
    blocked_by: HashMap<ApplicationId, HashSet<ApplicationId>>,
    found: Vec<Cycle>,
}

impl<'g> CircuitSearch<'g> {
    fn new(graph: &'g Subgraph, start: ApplicationId, max_length: usize) -> Self {
        Self {
            graph,
            start,
            max_length,
            stack: Vec::new(),
            blocked: HashSet::new(),
            blocked_by: HashMap::new(),
            found: Vec::new(),
        }
    }

    /// Returns true when `node` lies on some cycle through `start`, or when
    /// the length cap cut the search short and `node` must stay unblocked.
    fn circuit(&mut self, node: ApplicationId) -> bool {
        let mut closed = false;
        self.stack.push(node);
        self.blocked.insert(node);

        let mut successors: Vec<ApplicationId> = self.graph.neighbors(node).collect();
        successors.sort_unstable();

        for next in successors {
            if next == self.start {
                self.found.push(self.stack.clone());
                closed = true;
            } else if self.stack.len() >= self.max_length {
                // Depth cap: nothing learned about `next`, so do not block on it
                closed = true;
            } else if !self.blocked.contains(&next) && self.circuit(next) {
                closed = true;
            }
        }

        if closed {
            self.unblock(node);
        } else {
            for next in self.graph.neighbors(node) {
                self.blocked_by.entry(next).or_default().insert(node);
            }
        }

        self.stack.pop();
        closed
    }

    fn unblock(&mut self, node: ApplicationId) {
        let mut work = vec![node];
        while let Some(current) = work.pop() {
            if self.blocked.remove(&current) {
                if let Some(waiting) = self.blocked_by.remove(&current) {
                    work.extend(waiting);
                }
            }
        }
    }
}
