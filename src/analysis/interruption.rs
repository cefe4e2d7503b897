//! Buses de-energized by an opening protection device.

use std::collections::HashSet;

use crate::network::{Adjacency, BusId, ClassifiedElements, ElementId};

/// One pending expansion: the element just crossed and the buses it leads to.
type Step = (ElementId, Vec<Option<BusId>>);

/// Buses cut off when `switched` opens, in discovery order.
///
/// Collection starts at the non-origin terminals of `switched`. Every bus
/// admitted is expanded through its downstream elements (towards their
/// non-origin terminals) and its upstream elements (towards their origin),
/// skipping only the element that led to it.
pub fn find_interrupted_buses(
    switched: ElementId,
    adjacency: &Adjacency,
    elements: &ClassifiedElements,
) -> Vec<BusId> {
    let mut collector = Collector {
        adjacency,
        elements,
        seen: HashSet::new(),
        order: Vec::new(),
    };

    let seeds = adjacency.terminals(switched).iter().skip(1).copied().collect();
    let mut stack = vec![collector.expand(switched, seeds)];

    while let Some(frame) = stack.last_mut() {
        match frame.next() {
            Some((via, seeds)) => {
                let child = collector.expand(via, seeds);
                stack.push(child);
            }
            None => {
                stack.pop();
            }
        }
    }

    collector.order
}

struct Collector<'a> {
    adjacency: &'a Adjacency,
    elements: &'a ClassifiedElements,
    seen: HashSet<BusId>,
    order: Vec<BusId>,
}

impl Collector<'_> {
    /// Admit the new buses among `seeds` and list the steps leaving them.
    fn expand(&mut self, via: ElementId, seeds: Vec<Option<BusId>>) -> std::vec::IntoIter<Step> {
        let admitted: Vec<BusId> = seeds
            .into_iter()
            .flatten()
            .filter(|bus| self.seen.insert(*bus))
            .collect();
        self.order.extend(&admitted);

        let mut steps = Vec::new();
        for bus in admitted {
            for &id in self.adjacency.downstream(bus) {
                if id != via && self.elements.series(id).is_some() {
                    steps.push((id, self.adjacency.terminals(id).iter().skip(1).copied().collect()));
                }
            }
            for &id in self.adjacency.upstream(bus) {
                if id != via && self.elements.series(id).is_some() {
                    steps.push((id, vec![self.adjacency.terminal(id, 0)]));
                }
            }
        }

        steps.into_iter()
    }
}
