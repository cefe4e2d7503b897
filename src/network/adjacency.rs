//! Bus adjacency.
//!
//! For every bus, the elements entering it ("upstream") and the series
//! elements leaving it ("downstream"), each list in element registration
//! order. Buses and element terminals are interned into [`BusId`]s so the
//! propagators work on plain indices.

use std::collections::HashMap;

use super::classify::ClassifiedElements;
use super::elements::ElementKind;
use super::types::{BusId, ElementId};

/// Elements attached to one bus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusLinks {
    /// Elements whose destination (or any non-origin terminal) is this bus,
    /// plus the source and shunt devices sitting at it
    pub upstream: Vec<ElementId>,
    /// Series elements whose origin is this bus
    pub downstream: Vec<ElementId>,
}

/// Bidirectional bus/element adjacency.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    names: Vec<String>,
    index: HashMap<String, BusId>,
    links: Vec<BusLinks>,
    /// Interned terminals per element, empty for non-series elements
    terminals: Vec<Vec<Option<BusId>>>,
    /// Buses created on demand, with the first element that referenced them
    undeclared: Vec<(BusId, ElementId)>,
}

impl Adjacency {
    /// Number of buses.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All bus ids in interning order.
    pub fn buses(&self) -> impl Iterator<Item = BusId> {
        (0..self.names.len()).map(BusId)
    }

    pub fn name(&self, bus: BusId) -> &str {
        &self.names[bus.0]
    }

    /// Bus id by (lowercase) name.
    pub fn id(&self, name: &str) -> Option<BusId> {
        self.index.get(name).copied()
    }

    pub fn links(&self, bus: BusId) -> &BusLinks {
        &self.links[bus.0]
    }

    pub fn upstream(&self, bus: BusId) -> &[ElementId] {
        &self.links[bus.0].upstream
    }

    pub fn downstream(&self, bus: BusId) -> &[ElementId] {
        &self.links[bus.0].downstream
    }

    /// Interned terminals of a series element.
    pub fn terminals(&self, element: ElementId) -> &[Option<BusId>] {
        self.terminals
            .get(element.0)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Terminal `i` of a series element.
    pub fn terminal(&self, element: ElementId, i: usize) -> Option<BusId> {
        self.terminals(element).get(i).copied().flatten()
    }

    /// Buses referenced by elements but missing from the declared bus list.
    pub fn undeclared(&self) -> &[(BusId, ElementId)] {
        &self.undeclared
    }

    fn intern(&mut self, name: &str) -> BusId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = BusId(self.names.len());
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        self.links.push(BusLinks::default());
        id
    }

    /// Intern a terminal bus, recording it when it was never declared.
    fn intern_terminal(&mut self, name: &str, element: ElementId) -> BusId {
        let known = self.index.len();
        let id = self.intern(name);
        if self.index.len() > known {
            log::debug!("Bus '{}' created on demand by element {}", name, element);
            self.undeclared.push((id, element));
        }
        id
    }
}

/// Build the adjacency of a classified circuit.
///
/// Every declared bus and every terminal bus gets an entry, isolated or not.
/// Self-looping series elements (origin equal to the second terminal) carry
/// no topology and are not registered.
pub fn build_adjacency(elements: &ClassifiedElements, bus_names: &[String]) -> Adjacency {
    let mut adjacency = Adjacency {
        terminals: vec![Vec::new(); elements.len()],
        ..Adjacency::default()
    };

    for name in bus_names {
        adjacency.intern(name);
    }

    if let Some(source_id) = elements.source {
        if let Some(bus) = elements.source_element().and_then(|s| s.bus()) {
            let bus = adjacency.intern_terminal(bus, source_id);
            adjacency.links[bus.0].upstream.push(source_id);
        }
    }

    for (id, series) in elements.series_elements() {
        let terminals: Vec<Option<BusId>> = series
            .terminals
            .iter()
            .map(|t| t.as_deref().map(|name| adjacency.intern_terminal(name, id)))
            .collect();

        let self_loop = terminals.first() == terminals.get(1);
        if !self_loop {
            for (i, bus) in terminals.iter().enumerate() {
                let Some(bus) = bus else { continue };
                let links = &mut adjacency.links[bus.0];
                if i == 0 {
                    links.downstream.push(id);
                } else {
                    links.upstream.push(id);
                }
            }
        }
        adjacency.terminals[id.0] = terminals;
    }

    for (element, shunt) in elements.shunts() {
        if let Some(bus) = shunt.bus.as_deref() {
            let bus = adjacency.intern_terminal(bus, element.id);
            adjacency.links[bus.0].upstream.push(element.id);
        }
    }

    log::debug!(
        "Adjacency: {} buses ({} undeclared)",
        adjacency.len(),
        adjacency.undeclared.len()
    );

    adjacency
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casefile::CaseFile;
    use crate::network::{classify, LengthUnit};

    fn build(text: &str, buses: &[&str]) -> (ClassifiedElements, Adjacency) {
        let case = CaseFile::parse_str(text).unwrap();
        let elements = classify(&case, LengthUnit::Kilometer).unwrap();
        let names: Vec<String> = buses.iter().map(|b| b.to_string()).collect();
        let adjacency = build_adjacency(&elements, &names);
        (elements, adjacency)
    }

    #[test]
    fn test_adjacency_links() {
        let (elements, adj) = build(
            "\
vsource.src bus1=a
line.l1 bus1=a bus2=b
line.l2 bus1=b bus2=c
load.ld bus1=c
",
            &["a", "b", "c", "lonely"],
        );
        let l1 = elements.lookup("line.l1").unwrap();
        let l2 = elements.lookup("line.l2").unwrap();
        let src = elements.lookup("vsource.src").unwrap();
        let ld = elements.lookup("load.ld").unwrap();
        let bus = |n: &str| adj.id(n).unwrap();

        assert_eq!(adj.upstream(bus("a")), &[src]);
        assert_eq!(adj.downstream(bus("a")), &[l1]);
        assert_eq!(adj.upstream(bus("b")), &[l1]);
        assert_eq!(adj.downstream(bus("b")), &[l2]);
        assert_eq!(adj.upstream(bus("c")), &[l2, ld]);
        assert_eq!(adj.links(bus("lonely")), &BusLinks::default());
        assert!(adj.undeclared().is_empty());
        assert_eq!(adj.terminal(l2, 1), Some(bus("c")));
        assert!(adj.terminals(src).is_empty());
    }

    #[test]
    fn test_adjacency_self_loop_and_none_terminal() {
        let (elements, adj) = build(
            "\
line.loop bus1=a bus2=a
capacitor.c1 bus1=a
",
            &["a"],
        );
        let cap = elements.lookup("capacitor.c1").unwrap();
        let a = adj.id("a").unwrap();

        // The self-loop is skipped; the open capacitor only leaves `a`
        assert_eq!(adj.downstream(a), &[cap]);
        assert!(adj.upstream(a).is_empty());
        assert_eq!(adj.terminals(cap), &[Some(a), None]);
    }

    #[test]
    fn test_adjacency_undeclared_buses() {
        let (elements, adj) = build(
            "\
line.l1 bus1=a bus2=x
line.l2 bus1=y bus2=y
",
            &["a"],
        );
        assert_eq!(adj.len(), 3);
        let l1 = elements.lookup("line.l1").unwrap();
        let x = adj.id("x").unwrap();
        assert_eq!(adj.upstream(x), &[l1]);

        let undeclared: Vec<&str> = adj.undeclared().iter().map(|(b, _)| adj.name(*b)).collect();
        assert_eq!(undeclared, vec!["x", "y"]);
        // Self-looping bus still exists, isolated
        assert_eq!(adj.links(adj.id("y").unwrap()), &BusLinks::default());
    }

    #[test]
    fn test_adjacency_multi_winding_transformer() {
        let (elements, adj) = build(
            "transformer.t3 buses=[hv, mv, lv] kvs=[115, 13.2, 0.48]\n",
            &[],
        );
        let t3 = elements.lookup("transformer.t3").unwrap();
        assert_eq!(adj.downstream(adj.id("hv").unwrap()), &[t3]);
        assert_eq!(adj.upstream(adj.id("mv").unwrap()), &[t3]);
        assert_eq!(adj.upstream(adj.id("lv").unwrap()), &[t3]);
    }
}
