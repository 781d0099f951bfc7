//! Social networks over population entities.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};

use crate::entity::EntityId;

/// An undirected graph whose vertices are entities.
#[derive(Debug, Clone, Default)]
pub struct SocialNetwork {
    graph: UnGraph<EntityId, ()>,
    nodes: HashMap<EntityId, NodeIndex>,
}

impl SocialNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an edgeless network with one vertex per entity.
    pub fn with_nodes(ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut network = Self::new();
        for id in ids {
            network.add_node(id);
        }
        network
    }

    pub fn add_node(&mut self, id: EntityId) -> NodeIndex {
        *self
            .nodes
            .entry(id)
            .or_insert_with(|| self.graph.add_node(id))
    }

    /// Links two entities. Self loops and parallel edges are ignored.
    ///
    /// Returns true if a new edge was added.
    pub fn add_edge(&mut self, a: EntityId, b: EntityId) -> bool {
        if a == b {
            return false;
        }
        let (na, nb) = (self.add_node(a), self.add_node(b));
        if self.graph.find_edge(na, nb).is_some() {
            return false;
        }
        self.graph.add_edge(na, nb, ());
        true
    }

    pub fn has_edge(&self, a: EntityId, b: EntityId) -> bool {
        match (self.nodes.get(&a), self.nodes.get(&b)) {
            (Some(&na), Some(&nb)) => self.graph.find_edge(na, nb).is_some(),
            _ => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn neighbors(&self, id: EntityId) -> Vec<EntityId> {
        match self.nodes.get(&id) {
            Some(&n) => self.graph.neighbors(n).map(|m| self.graph[m]).collect(),
            None => Vec::new(),
        }
    }

    pub fn degree(&self, id: EntityId) -> usize {
        self.nodes
            .get(&id)
            .map_or(0, |&n| self.graph.neighbors(n).count())
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Entity pairs of every edge.
    pub fn edges(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.graph.edge_indices().filter_map(move |e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            Some((self.graph[a], self.graph[b]))
        })
    }

    /// Underlying petgraph graph.
    pub fn graph(&self) -> &UnGraph<EntityId, ()> {
        &self.graph
    }
}
