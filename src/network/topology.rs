//! Destination selection and road topology per landmass
//!
//! Each landmass connects an anchor (the spawn location or the landmass edge
//! point) to a capped set of its locations. Even-ranked landmasses get a
//! minimum spanning tree, odd-ranked ones a nearest-neighbour chain, so the
//! world mixes branching networks with long single highways.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::TopologyParams;
use crate::geometry::WorldPoint;

use super::locations::PointOfInterest;

/// Priority of well-known locations. Higher is kept first when a landmass
/// has more candidates than its cap.
pub const PRIORITY_TABLE: &[(&str, i32)] = &[
    ("StartTemple", 100),
    ("Eikthyrnir", 95),
    ("GDKing", 94),
    ("Bonemass", 93),
    ("Dragonqueen", 92),
    ("GoblinKing", 91),
    ("Mistlands_DvergrBossEntrance1", 90),
    ("FaderLocation", 89),
    ("Vendor_BlackForest", 85),
    ("Hildir_camp", 84),
    ("BogWitch_Camp", 83),
    ("Crypt2", 60),
    ("Crypt3", 60),
    ("Crypt4", 60),
    ("SunkenCrypt4", 55),
    ("MountainCave02", 50),
    ("TrollCave02", 45),
    ("Mistlands_DvergrTownEntrance1", 45),
    ("Mistlands_DvergrTownEntrance2", 45),
    ("GoblinCamp2", 40),
    ("StoneTowerRuins04", 30),
    ("StoneTowerRuins05", 30),
    ("Runestone_Meadows", 25),
    ("Runestone_BlackForest", 25),
    ("Runestone_Swamps", 25),
    ("Runestone_Mountains", 25),
    ("Runestone_Plains", 25),
    ("WoodHouse1", 20),
    ("WoodVillage1", 20),
];

/// Priority of names missing from the table
pub const DEFAULT_PRIORITY: i32 = 10;

pub fn priority_of(name: &str) -> i32 {
    PRIORITY_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| *p)
        .unwrap_or(DEFAULT_PRIORITY)
}

/// Destination cap for a landmass of `area` square world units.
pub fn destination_cap(area: f32, params: &TopologyParams) -> usize {
    let scaled = (area / 1_000_000.0 * params.destinations_per_sq_km).round();
    let scaled = if scaled.is_finite() && scaled > 0.0 { scaled as usize } else { 0 };
    scaled.clamp(params.min_destinations, params.max_destinations)
}

/// Keep roughly `percentage`% of the candidates, never dropping any at or
/// above `always_keep_priority`.
///
/// One random draw is made per candidate whether or not it is needed, so the
/// outcome for a candidate does not depend on its neighbours' priorities.
pub fn sample_destinations(
    candidates: Vec<PointOfInterest>,
    percentage: u32,
    always_keep_priority: i32,
    rng: &mut ChaCha8Rng,
) -> Vec<PointOfInterest> {
    candidates
        .into_iter()
        .filter(|poi| {
            let roll = rng.gen_range(0..100u32);
            priority_of(&poi.name) >= always_keep_priority || roll < percentage
        })
        .collect()
}

/// Keep the `cap` highest-priority candidates; ties keep input order.
pub fn select_destinations(mut candidates: Vec<PointOfInterest>, cap: usize) -> Vec<PointOfInterest> {
    if candidates.len() > cap {
        candidates.sort_by_key(|poi| std::cmp::Reverse(priority_of(&poi.name)));
        candidates.truncate(cap);
    }
    candidates
}

/// Shape of the road network on one landmass
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    MinimumSpanningTree,
    NearestNeighborChain,
}

impl Topology {
    /// Alternates by landmass rank.
    pub fn for_landmass(rank: usize) -> Self {
        if rank % 2 == 0 {
            Topology::MinimumSpanningTree
        } else {
            Topology::NearestNeighborChain
        }
    }

    /// Edges (from, to) over `nodes`, rooted at node 0.
    pub fn edges(&self, nodes: &[WorldPoint]) -> Vec<(usize, usize)> {
        match self {
            Topology::MinimumSpanningTree => minimum_spanning_tree(nodes),
            Topology::NearestNeighborChain => nearest_neighbor_chain(nodes),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Topology::MinimumSpanningTree => "spanning tree",
            Topology::NearestNeighborChain => "chain",
        }
    }
}

/// Prim's algorithm over the complete graph of `nodes`, O(n²).
///
/// Returns (parent, child) pairs in the order children join the tree. Ties
/// go to the lowest index.
pub fn minimum_spanning_tree(nodes: &[WorldPoint]) -> Vec<(usize, usize)> {
    let n = nodes.len();
    if n < 2 {
        return Vec::new();
    }

    let mut in_tree = vec![false; n];
    let mut best_dist = vec![f32::INFINITY; n];
    let mut parent = vec![0usize; n];
    let mut edges = Vec::with_capacity(n - 1);

    in_tree[0] = true;
    for j in 1..n {
        best_dist[j] = nodes[0].distance_sq(nodes[j]);
    }

    for _ in 1..n {
        let mut next: Option<usize> = None;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            if next.map_or(true, |k| best_dist[j] < best_dist[k]) {
                next = Some(j);
            }
        }
        let Some(next) = next else { break };

        in_tree[next] = true;
        edges.push((parent[next], next));

        for j in 0..n {
            if !in_tree[j] {
                let d = nodes[next].distance_sq(nodes[j]);
                if d < best_dist[j] {
                    best_dist[j] = d;
                    parent[j] = next;
                }
            }
        }
    }

    edges
}

/// Greedy chain from node 0, always stepping to the closest unvisited node.
pub fn nearest_neighbor_chain(nodes: &[WorldPoint]) -> Vec<(usize, usize)> {
    let n = nodes.len();
    if n < 2 {
        return Vec::new();
    }

    let mut visited = vec![false; n];
    let mut edges = Vec::with_capacity(n - 1);
    let mut current = 0;
    visited[0] = true;

    for _ in 1..n {
        let mut next: Option<(usize, f32)> = None;
        for j in 0..n {
            if visited[j] {
                continue;
            }
            let d = nodes[current].distance_sq(nodes[j]);
            if next.map_or(true, |(_, bd)| d < bd) {
                next = Some((j, d));
            }
        }
        let Some((next, _)) = next else { break };
        visited[next] = true;
        edges.push((current, next));
        current = next;
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn poi(name: &str, x: f32) -> PointOfInterest {
        PointOfInterest::new(name, WorldPoint::new(x, 0.0), 10.0)
    }

    #[test]
    fn test_priority_lookup() {
        assert_eq!(priority_of("StartTemple"), 100);
        assert_eq!(priority_of("Eikthyrnir"), 95);
        assert_eq!(priority_of("SomethingElse"), DEFAULT_PRIORITY);
    }

    #[test]
    fn test_cap_scales_with_area_and_clamps() {
        let params = TopologyParams::default();
        assert_eq!(destination_cap(0.0, &params), 2);
        assert_eq!(destination_cap(40_000_000.0, &params), 10);
        assert_eq!(destination_cap(1e12, &params), 48);
    }

    #[test]
    fn test_select_keeps_highest_priority() {
        let candidates = vec![
            poi("Runestone_Meadows", 0.0),
            poi("Eikthyrnir", 1.0),
            poi("Unknown", 2.0),
            poi("Crypt2", 3.0),
            poi("GDKing", 4.0),
        ];
        let selected = select_destinations(candidates.clone(), 3);
        let names: Vec<&str> = selected.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Eikthyrnir", "GDKing", "Crypt2"]);

        assert_eq!(select_destinations(candidates.clone(), 10), candidates);
    }

    #[test]
    fn test_sampling_is_seeded_and_keeps_bosses() {
        let candidates: Vec<PointOfInterest> = (0..40)
            .map(|i| poi(if i % 10 == 0 { "Bonemass" } else { "Crypt3" }, i as f32))
            .collect();

        let a = sample_destinations(candidates.clone(), 30, 80, &mut ChaCha8Rng::seed_from_u64(7));
        let b = sample_destinations(candidates.clone(), 30, 80, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(a, b);
        assert_eq!(a.iter().filter(|p| p.name == "Bonemass").count(), 4);
        assert!(a.len() < candidates.len());

        let all = sample_destinations(candidates.clone(), 100, 80, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(all.len(), candidates.len());
        let bosses = sample_destinations(candidates, 0, 80, &mut ChaCha8Rng::seed_from_u64(7));
        assert_eq!(bosses.len(), 4);
    }

    #[test]
    fn test_mst_on_line() {
        let nodes = vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(30.0, 0.0),
            WorldPoint::new(10.0, 0.0),
            WorldPoint::new(20.0, 0.0),
        ];
        assert_eq!(minimum_spanning_tree(&nodes), vec![(0, 2), (2, 3), (3, 1)]);
    }

    #[test]
    fn test_mst_branches_from_hub() {
        let nodes = vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(10.0, 0.0),
            WorldPoint::new(-10.0, 0.0),
            WorldPoint::new(0.0, 11.0),
        ];
        let edges = minimum_spanning_tree(&nodes);
        assert_eq!(edges.len(), 3);
        // Equal distances resolve to the lower index
        assert_eq!(edges, vec![(0, 1), (0, 2), (0, 3)]);
    }

    #[test]
    fn test_chain_visits_nearest_first() {
        let nodes = vec![
            WorldPoint::new(0.0, 0.0),
            WorldPoint::new(100.0, 0.0),
            WorldPoint::new(-10.0, 0.0),
            WorldPoint::new(50.0, 0.0),
        ];
        assert_eq!(nearest_neighbor_chain(&nodes), vec![(0, 2), (2, 3), (3, 1)]);
    }

    #[test]
    fn test_topology_alternates() {
        assert_eq!(Topology::for_landmass(0), Topology::MinimumSpanningTree);
        assert_eq!(Topology::for_landmass(1), Topology::NearestNeighborChain);
        assert_eq!(Topology::for_landmass(2), Topology::MinimumSpanningTree);
        assert!(Topology::MinimumSpanningTree.edges(&[WorldPoint::ORIGIN]).is_empty());
    }
}
