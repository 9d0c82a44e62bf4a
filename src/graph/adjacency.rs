//! In-memory adjacency index for one edge type.
//!
//! Rebuilt from scratch when a snapshot is loaded, never persisted itself.
//! Each edge is recorded in both directions so outgoing and incoming
//! lookups are O(1).

use std::collections::{HashMap, HashSet};

pub struct AdjacencyIndex {
    /// src -> {dst}
    outgoing: HashMap<u128, HashSet<u128>>,
    /// dst -> {src}
    incoming: HashMap<u128, HashSet<u128>>,
    edge_count: usize,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self {
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Rebuild from a list of (src, dst) pairs. Duplicates collapse.
    pub fn rebuild<I>(&mut self, edges: I)
    where
        I: IntoIterator<Item = (u128, u128)>,
    {
        self.clear();
        for (src, dst) in edges {
            self.insert(src, dst);
        }
    }

    pub fn clear(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
        self.edge_count = 0;
    }

    /// Add an edge. Returns false if it was already present.
    pub fn insert(&mut self, src: u128, dst: u128) -> bool {
        let inserted = self.outgoing.entry(src).or_default().insert(dst);
        if inserted {
            self.incoming.entry(dst).or_default().insert(src);
            self.edge_count += 1;
        }
        inserted
    }

    /// Remove an edge. Returns false if it was not present.
    pub fn remove(&mut self, src: u128, dst: u128) -> bool {
        let removed = match self.outgoing.get_mut(&src) {
            Some(targets) => {
                let removed = targets.remove(&dst);
                if targets.is_empty() {
                    self.outgoing.remove(&src);
                }
                removed
            }
            None => false,
        };
        if removed {
            if let Some(sources) = self.incoming.get_mut(&dst) {
                sources.remove(&src);
                if sources.is_empty() {
                    self.incoming.remove(&dst);
                }
            }
            self.edge_count -= 1;
        }
        removed
    }

    pub fn contains(&self, src: u128, dst: u128) -> bool {
        self.outgoing
            .get(&src)
            .is_some_and(|targets| targets.contains(&dst))
    }

    pub fn outgoing(&self, src: u128) -> impl Iterator<Item = u128> + '_ {
        self.outgoing.get(&src).into_iter().flatten().copied()
    }

    pub fn incoming(&self, dst: u128) -> impl Iterator<Item = u128> + '_ {
        self.incoming.get(&dst).into_iter().flatten().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u128, u128)> + '_ {
        self.outgoing
            .iter()
            .flat_map(|(src, targets)| targets.iter().map(move |dst| (*src, *dst)))
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

impl Default for AdjacencyIndex {
    fn default() -> Self {
        Self::new()
    }
}
