//! Breadth-first reachability over the hierarchy edge.
//!
//! The slim reducer's descendant marking and the read plane's
//! ancestor/descendant/subtype queries are all the same traversal: the
//! transitive closure of a set of roots over an adjacency map, bounded or
//! unbounded. Keeping it as one function means one set of tests covers
//! every graph walk in the system.

use std::collections::{HashMap, HashSet, VecDeque};

/// Concept ids reachable from `roots` by following `adjacency`, up to
/// `max_depth` hops (`None` for unbounded). The result always contains the
/// roots themselves (depth 0). Cycles are safe: each node is visited once.
pub fn reachable<I>(
    adjacency: &HashMap<String, Vec<String>>,
    roots: I,
    max_depth: Option<usize>,
) -> HashSet<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    for root in roots {
        if seen.insert(root.clone()) {
            queue.push_back((root, 0));
        }
    }

    while let Some((node, depth)) = queue.pop_front() {
        if let Some(limit) = max_depth {
            if depth >= limit {
                continue;
            }
        }
        let Some(next) = adjacency.get(&node) else {
            continue;
        };
        for neighbor in next {
            if seen.insert(neighbor.clone()) {
                queue.push_back((neighbor.clone(), depth + 1));
            }
        }
    }

    seen
}
