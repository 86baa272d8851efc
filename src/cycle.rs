//! Cycle detection for the parent forest and the blocking graph.
//!
//! Both checks are pure: the caller supplies the existing edges through a
//! lookup callback, so the same code runs against SQLite or an in-memory map.
//! Every walk keeps a visited set and terminates even when the stored data
//! already contains a cycle.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

/// Would making `proposed_parent` the parent of `node` create a cycle?
///
/// Walks upward from `proposed_parent` through `parent_of`. Reaching `node`
/// means `node` would become its own ancestor. Revisiting any node means the
/// existing forest is already cyclic, which is also reported as a cycle.
pub fn would_create_parent_cycle<N, E, F>(
    node: N,
    proposed_parent: Option<N>,
    mut parent_of: F,
) -> Result<bool, E>
where
    N: Copy + Eq + Hash,
    F: FnMut(N) -> Result<Option<N>, E>,
{
    let Some(parent) = proposed_parent else {
        return Ok(false);
    };

    let mut visited: HashSet<N> = HashSet::new();
    let mut current = Some(parent);

    while let Some(id) = current {
        if id == node {
            return Ok(true);
        }
        if !visited.insert(id) {
            return Ok(true);
        }
        current = parent_of(id)?;
    }

    Ok(false)
}

/// Would adding the edge `source -> target` close a cycle?
///
/// Breadth-first search from `target` along existing outgoing edges; the new
/// edge closes a cycle exactly when `source` is reachable from `target`.
pub fn would_create_edge_cycle<N, E, F>(source: N, target: N, mut successors_of: F) -> Result<bool, E>
where
    N: Copy + Eq + Hash,
    F: FnMut(N) -> Result<Vec<N>, E>,
{
    let mut visited: HashSet<N> = HashSet::new();
    let mut queue: VecDeque<N> = VecDeque::new();
    queue.push_back(target);

    while let Some(current) = queue.pop_front() {
        if current == source {
            return Ok(true);
        }

        if !visited.insert(current) {
            continue;
        }

        for next in successors_of(current)? {
            if !visited.contains(&next) {
                queue.push_back(next);
            }
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::convert::Infallible;

    fn parents(pairs: &[(u32, u32)]) -> HashMap<u32, u32> {
        pairs.iter().copied().collect()
    }

    fn edges(pairs: &[(u32, u32)]) -> HashMap<u32, Vec<u32>> {
        let mut map: HashMap<u32, Vec<u32>> = HashMap::new();
        for &(from, to) in pairs {
            map.entry(from).or_default().push(to);
        }
        map
    }

    fn parent_cycle(map: &HashMap<u32, u32>, node: u32, parent: Option<u32>) -> bool {
        would_create_parent_cycle(node, parent, |n| Ok::<_, Infallible>(map.get(&n).copied()))
            .unwrap()
    }

    fn edge_cycle(map: &HashMap<u32, Vec<u32>>, source: u32, target: u32) -> bool {
        would_create_edge_cycle(source, target, |n| {
            Ok::<_, Infallible>(map.get(&n).cloned().unwrap_or_default())
        })
        .unwrap()
    }

    #[test]
    fn no_parent_never_cycles() {
        let map = parents(&[(2, 1)]);
        assert!(!parent_cycle(&map, 1, None));
    }

    #[test]
    fn self_parent_is_a_cycle() {
        assert!(parent_cycle(&HashMap::new(), 7, Some(7)));
    }

    #[test]
    fn parent_under_own_subtree_is_a_cycle() {
        // 1 <- 2 <- 3 (3's parent is 2, 2's parent is 1)
        let map = parents(&[(2, 1), (3, 2)]);
        assert!(parent_cycle(&map, 1, Some(3)));
        assert!(parent_cycle(&map, 1, Some(2)));
        assert!(!parent_cycle(&map, 3, Some(1)));
        assert!(!parent_cycle(&map, 4, Some(3)));
    }

    #[test]
    fn corrupted_parent_chain_terminates() {
        // 2 and 3 already point at each other.
        let map = parents(&[(2, 3), (3, 2)]);
        assert!(parent_cycle(&map, 1, Some(2)));
    }

    #[test]
    fn self_edge_is_a_cycle() {
        assert!(edge_cycle(&HashMap::new(), 5, 5));
    }

    #[test]
    fn closing_a_chain_is_a_cycle() {
        let map = edges(&[(1, 2), (2, 3)]);
        assert!(edge_cycle(&map, 3, 1));
        assert!(!edge_cycle(&map, 1, 3));
    }

    #[test]
    fn diamond_graph() {
        let map = edges(&[(1, 2), (1, 3), (2, 4), (3, 5)]);
        assert!(edge_cycle(&map, 4, 1));
        assert!(edge_cycle(&map, 5, 1));
        assert!(!edge_cycle(&map, 4, 5));

        let without_1_2 = edges(&[(1, 3), (2, 4), (3, 5)]);
        assert!(!edge_cycle(&without_1_2, 2, 1));
    }

    #[test]
    fn cyclic_graph_terminates() {
        let map = edges(&[(2, 3), (3, 2)]);
        assert!(!edge_cycle(&map, 1, 2));
        assert!(edge_cycle(&map, 3, 2));
    }

    #[test]
    fn callback_errors_propagate() {
        let result = would_create_edge_cycle(1u32, 2u32, |_| Err::<Vec<u32>, _>("boom"));
        assert_eq!(result, Err("boom"));

        let result = would_create_parent_cycle(1u32, Some(2u32), |_| Err::<Option<u32>, _>("boom"));
        assert_eq!(result, Err("boom"));
    }
}
