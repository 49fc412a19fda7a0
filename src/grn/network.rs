//! The [`RegulatoryNetwork`] type: a directed regulator → target graph built
//! from a GRN edge list, and the topology measures used for robustness analysis.

use indexmap::IndexMap;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::NodeIndexable;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;

use crate::error::CisGrnError;
use crate::io::tsv::{build_tsv_writer, TsvRecordIterator};
use crate::io::OutputFile;

/// One inferred regulatory link, as a row of a GRN TSV (`TF`, `target`, `importance`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryEdge {
    #[serde(rename = "TF")]
    pub regulator: String,
    pub target: String,
    pub importance: f64,
}

impl RegulatoryEdge {
    pub fn new(regulator: impl Into<String>, target: impl Into<String>, importance: f64) -> Self {
        Self {
            regulator: regulator.into(),
            target: target.into(),
            importance,
        }
    }
}

/// Read a (possibly gzipped) tab-separated GRN edge list with a header row.
pub fn read_edges(filepath: impl Into<PathBuf>) -> Result<Vec<RegulatoryEdge>, CisGrnError> {
    let iter: TsvRecordIterator<RegulatoryEdge> = TsvRecordIterator::with_delimiter(filepath, b'\t')?;
    iter.collect()
}

/// Write a GRN edge list as TSV, in the given order.
pub fn write_edges(output: &OutputFile, edges: &[RegulatoryEdge]) -> Result<(), CisGrnError> {
    let mut writer = build_tsv_writer(output)?;
    if edges.is_empty() {
        writer.write_record(["TF", "target", "importance"])?;
    }
    for edge in edges {
        writer.serialize(edge)?;
    }
    writer.flush()?;
    Ok(())
}

/// Topology summary of a network.
#[derive(Clone, Debug, PartialEq)]
pub struct NetworkStats {
    pub num_components: usize,
    pub largest_component_size: usize,
    /// Average shortest path length within the largest component, or `None` if
    /// it is not strongly connected (or the network is empty).
    pub avg_path_length: Option<f64>,
}

/// A directed gene regulatory network.
///
/// Nodes are gene names, kept in first-appearance order; edge weights are
/// importances. The graph is a [`StableDiGraph`] so node indices remain valid
/// after removals.
#[derive(Clone, Debug, Default)]
pub struct RegulatoryNetwork {
    graph: StableDiGraph<String, f64>,
    nodes: IndexMap<String, NodeIndex>,
}

impl RegulatoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a network from the edges with importance strictly above `threshold`.
    pub fn from_edges<'a>(
        edges: impl IntoIterator<Item = &'a RegulatoryEdge>,
        threshold: f64,
    ) -> Self {
        let mut network = Self::new();
        for edge in edges {
            if edge.importance > threshold {
                network.add_edge(&edge.regulator, &edge.target, edge.importance);
            }
        }
        network
    }

    /// Get the node for a gene, adding it if needed.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.nodes.get(name) {
            return index;
        }
        let index = self.graph.add_node(name.to_string());
        self.nodes.insert(name.to_string(), index);
        index
    }

    /// Add a regulator → target edge. A repeated pair keeps one edge with the
    /// latest importance.
    pub fn add_edge(&mut self, regulator: &str, target: &str, importance: f64) {
        let source = self.add_node(regulator);
        let target = self.add_node(target);
        self.graph.update_edge(source, target, importance);
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// In-degree plus out-degree. A self-loop counts twice.
    pub fn degree(&self, name: &str) -> Option<usize> {
        let &index = self.nodes.get(name)?;
        Some(self.degree_of(index))
    }

    fn degree_of(&self, index: NodeIndex) -> usize {
        self.graph.edges_directed(index, Direction::Incoming).count()
            + self.graph.edges_directed(index, Direction::Outgoing).count()
    }

    /// All nodes with their degree, highest degree first. Nodes with equal
    /// degree keep their first-appearance order.
    pub fn ranked_by_degree(&self) -> Vec<(String, usize)> {
        let mut ranked: Vec<(String, usize)> = self
            .nodes
            .iter()
            .map(|(name, &index)| (name.clone(), self.degree_of(index)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// A copy of the network with one node (and its edges) removed.
    pub fn without_node(&self, name: &str) -> Self {
        let mut network = self.clone();
        if let Some(index) = network.nodes.shift_remove(name) {
            network.graph.remove_node(index);
        }
        network
    }

    /// Weakly connected components, each in node order, ordered by their
    /// earliest node.
    pub fn weakly_connected_components(&self) -> Vec<Vec<NodeIndex>> {
        let mut sets = UnionFind::<usize>::new(self.graph.node_bound());
        for edge in self.graph.edge_indices() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                sets.union(source.index(), target.index());
            }
        }
        let mut components: IndexMap<usize, Vec<NodeIndex>> = IndexMap::new();
        for &index in self.nodes.values() {
            components
                .entry(sets.find(index.index()))
                .or_default()
                .push(index);
        }
        components.into_values().collect()
    }

    /// The mean directed shortest path length over all ordered pairs of distinct
    /// nodes in `component` (unweighted). A single node has length zero. Returns
    /// `None` if some node cannot reach another.
    pub fn average_shortest_path_length(&self, component: &[NodeIndex]) -> Option<f64> {
        let n = component.len();
        match n {
            0 => return None,
            1 => return Some(0.0),
            _ => {}
        }
        let mut distance = vec![usize::MAX; self.graph.node_bound()];
        let mut queue = VecDeque::new();
        let mut total: u64 = 0;
        for &source in component {
            distance.iter_mut().for_each(|d| *d = usize::MAX);
            distance[source.index()] = 0;
            queue.push_back(source);
            let mut reached = 0;
            while let Some(node) = queue.pop_front() {
                reached += 1;
                let d = distance[node.index()];
                total += d as u64;
                for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                    if distance[next.index()] == usize::MAX {
                        distance[next.index()] = d + 1;
                        queue.push_back(next);
                    }
                }
            }
            if reached != n {
                return None;
            }
        }
        Some(total as f64 / (n * (n - 1)) as f64)
    }

    /// Component count, largest component size, and the average shortest path
    /// length within the (first) largest component.
    pub fn stats(&self) -> NetworkStats {
        let components = self.weakly_connected_components();
        let mut largest: Option<&Vec<NodeIndex>> = None;
        for component in components.iter() {
            if largest.map_or(true, |l| component.len() > l.len()) {
                largest = Some(component);
            }
        }
        NetworkStats {
            num_components: components.len(),
            largest_component_size: largest.map_or(0, |c| c.len()),
            avg_path_length: largest.and_then(|c| self.average_shortest_path_length(c)),
        }
    }

    /// Gene names in first-appearance order.
    pub fn node_names(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }
}
