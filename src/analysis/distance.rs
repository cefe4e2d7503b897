//! Trunk distance from the source bus.

use std::collections::BTreeMap;

use super::{depth_first, DistanceMap};
use crate::network::{Adjacency, BusId, ClassifiedElements};

/// Cumulative distance (km) from `source` to every reachable bus.
///
/// Neighbours are visited downstream elements first, then upstream ones,
/// each in registration order. A bus keeps the first distance it receives.
/// Real lines add their length, every other series element adds
/// `nominal_km`.
pub fn compute_distances(
    adjacency: &Adjacency,
    elements: &ClassifiedElements,
    source: BusId,
    nominal_km: f64,
) -> DistanceMap {
    let mut distances = BTreeMap::new();
    distances.insert(source, 0.0);

    depth_first(
        source,
        |bus| distance_steps(adjacency, elements, bus, nominal_km),
        |from, to, cost| {
            if distances.contains_key(&to) {
                return false;
            }
            let base = distances.get(&from).copied().unwrap_or(0.0);
            distances.insert(to, base + cost);
            true
        },
    );

    distances
}

/// Buses one series element away from `bus`, with the traversal cost.
fn distance_steps(
    adjacency: &Adjacency,
    elements: &ClassifiedElements,
    bus: BusId,
    nominal_km: f64,
) -> Vec<(BusId, f64)> {
    let mut steps = Vec::new();

    for &id in adjacency.downstream(bus) {
        let Some(series) = elements.series(id) else { continue };
        let cost = series.distance_km(nominal_km);
        steps.extend(
            adjacency
                .terminals(id)
                .iter()
                .skip(1)
                .flatten()
                .filter(|&&t| t != bus)
                .map(|&t| (t, cost)),
        );
    }

    for &id in adjacency.upstream(bus) {
        let Some(series) = elements.series(id) else { continue };
        if let Some(origin) = adjacency.terminal(id, 0).filter(|&t| t != bus) {
            steps.push((origin, series.distance_km(nominal_km)));
        }
    }

    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::CaseFile;
    use crate::network::{build_adjacency, CircuitSnapshot, LengthUnit};
    use approx::assert_relative_eq;

    fn distances(text: &str, source: &str) -> (Adjacency, DistanceMap) {
        let case = CaseFile::parse_str(text).unwrap();
        let snapshot = CircuitSnapshot::extract(&case, LengthUnit::Kilometer).unwrap();
        let adjacency = build_adjacency(&snapshot.elements, &snapshot.bus_names);
        let start = adjacency.id(source).unwrap();
        let map = compute_distances(&adjacency, &snapshot.elements, start, 0.001);
        (adjacency, map)
    }

    fn at(adjacency: &Adjacency, map: &DistanceMap, bus: &str) -> f64 {
        map[&adjacency.id(bus).unwrap()]
    }

    #[test]
    fn test_linear_feeder_distances() {
        let (adj, map) = distances(
            "\
line.l1 bus1=a bus2=b length=1.5 units=km
line.sw bus1=b bus2=c switch=true
",
            "a",
        );
        assert_eq!(map.len(), 3);
        assert_eq!(at(&adj, &map, "a"), 0.0);
        assert_relative_eq!(at(&adj, &map, "b"), 1.5);
        assert_relative_eq!(at(&adj, &map, "c"), 1.501, max_relative = 1e-12);
    }

    #[test]
    fn test_distances_walk_reversed_elements() {
        // l2 is declared pointing towards the source
        let (adj, map) = distances(
            "\
line.l1 bus1=a bus2=b length=1000 units=m
line.l2 bus1=c bus2=b length=2 units=km
transformer.t1 buses=[c, d]
",
            "a",
        );
        assert_relative_eq!(at(&adj, &map, "c"), 3.0, max_relative = 1e-12);
        assert_relative_eq!(at(&adj, &map, "d"), 3.001, max_relative = 1e-12);
    }

    #[test]
    fn test_distances_first_path_wins_on_cycle() {
        let (adj, map) = distances(
            "\
line.l1 bus1=a bus2=b length=1
line.l2 bus1=b bus2=c length=1
line.l3 bus1=a bus2=c length=5
",
            "a",
        );
        // Depth first through l1 then l2 reaches c before l3 is tried
        assert_relative_eq!(at(&adj, &map, "c"), 2.0);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_distances_skip_unreachable_and_open_terminals() {
        let (adj, map) = distances(
            "\
line.l1 bus1=a bus2=b length=1
capacitor.c1 bus1=b
line.island bus1=x bus2=y length=1
",
            "a",
        );
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key(&adj.id("x").unwrap()));
    }

    #[test]
    fn test_distances_non_decreasing_and_idempotent() {
        let text = "\
line.l1 bus1=a bus2=b length=0.4
line.l2 bus1=b bus2=c length=0.2
line.l3 bus1=b bus2=d length=0.7
line.l4 bus1=d bus2=e switch=true
";
        let (adj, first) = distances(text, "a");
        let (_, second) = distances(text, "a");
        assert_eq!(first, second);

        for (from, to) in [("a", "b"), ("b", "c"), ("b", "d"), ("d", "e")] {
            assert!(at(&adj, &first, from) <= at(&adj, &first, to));
        }
    }
}
