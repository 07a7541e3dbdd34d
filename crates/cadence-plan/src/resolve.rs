//! Dependency-aware story ordering.
//!
//! # Overview
//!
//! Produces a total order over a set of stories that respects `blocked_by`
//! edges and prefers higher priority scores among stories whose blockers
//! are all resolved. Edge direction throughout is `blocker → blocked`.
//!
//! # Cycle Tolerance
//!
//! Cycles are non-fatal. Kahn's algorithm drains everything reachable; the
//! unresolvable remainder is appended sorted by priority descending (key
//! ascending on ties), so the output always contains exactly the input's
//! stories. Cycle membership is reported separately for diagnostics via
//! Tarjan SCC — detection never aborts an ordering.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rust_decimal::Decimal;
use tracing::debug;

use cadence_core::model::Story;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A full, deterministic story ordering plus cycle diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    /// Story keys in scheduling order. Always the exact input key set.
    pub order: Vec<String>,
    /// Strongly connected components with more than one member (or a
    /// self-loop), each sorted; empty when the dependency set is a DAG.
    pub cycles: Vec<Vec<String>>,
}

impl ResolvedOrder {
    /// `true` when at least one dependency cycle was detected.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Dependency graph of a story set, for external display.
///
/// Unlike [`order_stories`], declared edges are materialized even when the
/// counterpart key is absent from the set — the missing endpoint becomes a
/// node of its own.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
}

impl DependencyGraph {
    /// Build the display graph from a story set.
    #[must_use]
    pub fn build(stories: &[Story]) -> Self {
        let mut graph = DiGraph::<String, ()>::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();

        let mut node = |graph: &mut DiGraph<String, ()>, key: &str| -> NodeIndex {
            *node_map
                .entry(key.to_string())
                .or_insert_with(|| graph.add_node(key.to_string()))
        };

        for story in stories {
            node(&mut graph, &story.key);
        }
        for story in stories {
            for blocker in &story.blocked_by {
                let from = node(&mut graph, blocker);
                let to = node(&mut graph, &story.key);
                if !graph.contains_edge(from, to) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph }
    }

    /// All node keys, sorted.
    #[must_use]
    pub fn nodes(&self) -> Vec<String> {
        let mut nodes: Vec<String> = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();
        nodes.sort_unstable();
        nodes
    }

    /// All `(blocker, blocked)` pairs, sorted.
    #[must_use]
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some((
                    self.graph.node_weight(from)?.clone(),
                    self.graph.node_weight(to)?.clone(),
                ))
            })
            .collect();
        edges.sort_unstable();
        edges
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Max-heap entry: highest priority score first, then lowest key, so ties
/// pop in lexical key order and the whole ordering is deterministic.
#[derive(Debug, PartialEq, Eq)]
struct Ready {
    score: Decimal,
    key: String,
}

impl Ord for Ready {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.key.cmp(&self.key))
    }
}

impl PartialOrd for Ready {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `true` iff every blocker of `story` is in `completed` (vacuously true
/// with no blockers).
#[must_use]
pub fn can_start(story: &Story, completed: &HashSet<String>) -> bool {
    story
        .blocked_by
        .iter()
        .all(|blocker| completed.contains(blocker))
}

/// Order `stories` by dependency edges with priority tie-breaking.
///
/// Kahn's algorithm: in-degree counts only blockers present in the input
/// set; a priority-ordered ready heap picks among unblocked stories. When
/// a cycle leaves stories unresolved, they are appended sorted by priority
/// descending so the output is always a complete ordering.
#[must_use]
pub fn order_stories(stories: &[Story]) -> ResolvedOrder {
    let by_key: HashMap<&str, &Story> = stories.iter().map(|s| (s.key.as_str(), s)).collect();

    // In-set blockers only: references to stories outside the set impose no
    // ordering constraint here.
    let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(stories.len());
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for story in stories {
        let blockers = story
            .blocked_by
            .iter()
            .filter(|b| by_key.contains_key(b.as_str()))
            .count();
        in_degree.insert(&story.key, blockers);
        for blocker in &story.blocked_by {
            if by_key.contains_key(blocker.as_str()) {
                dependents
                    .entry(blocker.as_str())
                    .or_default()
                    .push(&story.key);
            }
        }
    }

    let mut ready: BinaryHeap<Ready> = stories
        .iter()
        .filter(|s| in_degree.get(s.key.as_str()) == Some(&0))
        .map(|s| Ready {
            score: s.priority_score,
            key: s.key.clone(),
        })
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(stories.len());
    let mut placed: HashSet<String> = HashSet::with_capacity(stories.len());

    while let Some(next) = ready.pop() {
        for &dependent in dependents.get(next.key.as_str()).map_or(&[][..], Vec::as_slice) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    if let Some(story) = by_key.get(dependent) {
                        ready.push(Ready {
                            score: story.priority_score,
                            key: story.key.clone(),
                        });
                    }
                }
            }
        }
        placed.insert(next.key.clone());
        order.push(next.key);
    }

    // Cycle remainder: fall back to plain priority ordering.
    if order.len() < stories.len() {
        let mut remainder: Vec<&Story> = stories
            .iter()
            .filter(|s| !placed.contains(&s.key))
            .collect();
        remainder.sort_by(|a, b| {
            b.priority_score
                .cmp(&a.priority_score)
                .then_with(|| a.key.cmp(&b.key))
        });
        debug!(
            unresolved = remainder.len(),
            "dependency cycle: appending remainder by priority"
        );
        order.extend(remainder.into_iter().map(|s| s.key.clone()));
    }

    ResolvedOrder {
        order,
        cycles: find_cycles(stories),
    }
}

/// Detect dependency cycles among in-set edges.
///
/// Each entry is the sorted member list of one strongly connected component
/// with more than one story (or a self-loop). Diagnostics only — the
/// ordering above already tolerates cycles.
#[must_use]
fn find_cycles(stories: &[Story]) -> Vec<Vec<String>> {
    let keys: HashSet<&str> = stories.iter().map(|s| s.key.as_str()).collect();

    let mut graph = DiGraph::<String, ()>::new();
    let mut node_map: HashMap<&str, NodeIndex> = HashMap::with_capacity(stories.len());
    for story in stories {
        let idx = graph.add_node(story.key.clone());
        node_map.insert(&story.key, idx);
    }
    for story in stories {
        for blocker in &story.blocked_by {
            if !keys.contains(blocker.as_str()) {
                continue;
            }
            let from = node_map[blocker.as_str()];
            let to = node_map[story.key.as_str()];
            if !graph.contains_edge(from, to) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut cycles: Vec<Vec<String>> = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.find_edge(node, node).is_some())
        })
        .map(|component| {
            let mut members: Vec<String> = component
                .into_iter()
                .filter_map(|idx| graph.node_weight(idx).cloned())
                .collect();
            members.sort_unstable();
            members
        })
        .collect();
    cycles.sort_unstable();
    cycles
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
