//! Secondary networks behind transformers.

use std::collections::HashSet;

use super::depth_first;
use crate::network::{Adjacency, BusId, ClassifiedElements, ElementId};

/// Buses of the low-voltage island fed by `transformer`, in discovery order.
///
/// Starts at the transformer's non-origin terminals. Downstream it follows
/// any non-transformer series element whose ends differ; upstream it only
/// follows real lines. Other transformers are never crossed.
pub fn collect_secondary_network(
    transformer: ElementId,
    adjacency: &Adjacency,
    elements: &ClassifiedElements,
) -> Vec<BusId> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();

    for seed in adjacency.terminals(transformer).iter().skip(1).flatten() {
        if !seen.insert(*seed) {
            continue;
        }
        order.push(*seed);
        depth_first(
            *seed,
            |bus| island_steps(adjacency, elements, bus),
            |_, to, ()| {
                if !seen.insert(to) {
                    return false;
                }
                order.push(to);
                true
            },
        );
    }

    order
}

fn island_steps(adjacency: &Adjacency, elements: &ClassifiedElements, bus: BusId) -> Vec<(BusId, ())> {
    let forward = adjacency.downstream(bus).iter().filter_map(|&id| {
        let series = elements.series(id)?;
        let destination = adjacency.terminal(id, 1)?;
        let crosses = !series.is_transformer() && adjacency.terminal(id, 0) != Some(destination);
        crosses.then_some(destination)
    });
    let backward = adjacency.upstream(bus).iter().filter_map(|&id| {
        let series = elements.series(id)?;
        if series.is_real_line() {
            adjacency.terminal(id, 0)
        } else {
            None
        }
    });

    forward.chain(backward).map(|b| (b, ())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::CaseFile;
    use crate::network::{build_adjacency, CircuitSnapshot, LengthUnit};

    const BRANCHING: &str = "\
vsource.src bus1=a
line.l1 bus1=a bus2=b length=1
line.l2 bus1=b bus2=c length=1
transformer.t1 buses=[c, d] kvs=[13.2, 0.48]
line.l3 bus1=d bus2=e length=0.05
line.l4 bus1=b bus2=f length=2
transformer.t2 buses=[e, g] kvs=[0.48, 0.24]
line.l5 bus1=g bus2=h
";

    fn island(text: &str, transformer: &str) -> Vec<String> {
        let case = CaseFile::parse_str(text).unwrap();
        let snapshot = CircuitSnapshot::extract(&case, LengthUnit::Kilometer).unwrap();
        let adjacency = build_adjacency(&snapshot.elements, &snapshot.bus_names);
        let id = snapshot.elements.lookup(transformer).unwrap();
        collect_secondary_network(id, &adjacency, &snapshot.elements)
            .into_iter()
            .map(|bus| adjacency.name(bus).to_string())
            .collect()
    }

    #[test]
    fn test_secondary_network_stops_at_transformers() {
        assert_eq!(island(BRANCHING, "transformer.t1"), vec!["d", "e"]);
        assert_eq!(island(BRANCHING, "transformer.t2"), vec!["g", "h"]);
    }

    #[test]
    fn test_secondary_network_reversed_line() {
        // l3 points back at the transformer; real lines are followed upstream
        let text = "\
transformer.t1 buses=[c, d]
line.l3 bus1=e bus2=d
line.sw bus1=f bus2=d switch=true
";
        assert_eq!(island(text, "transformer.t1"), vec!["d", "e"]);
    }

    #[test]
    fn test_secondary_network_three_windings() {
        let text = "\
transformer.t1 buses=[hv, x, y]
line.lx bus1=x bus2=x1
line.ly bus1=y bus2=y1
";
        assert_eq!(island(text, "transformer.t1"), vec!["x", "x1", "y", "y1"]);
    }
}
