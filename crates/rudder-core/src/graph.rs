//! The destination arena and its searches.
//!
//! All destination nodes of a navigation tree live in one `Vec` owned by
//! [`NavGraph`]; handles into it are [`NodeIndex`] values and parent links
//! are back-indices. Destruction is strictly top-down from the arena owner;
//! entries and callers only ever hold handles.

use indexmap::IndexMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::destination::{navigator_names, DestinationBuilder, DestinationNode, GraphData};
use crate::saved_state::SavedState;
use crate::{DestinationId, NodeIndex};

/// Chain of nodes from a leaf up to the root (or the reverse).
pub type Hierarchy = SmallVec<[NodeIndex; 4]>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph {0} declares no destinations")]
    EmptyGraph(DestinationId),
    #[error("duplicate destination id {id} under graph {graph}")]
    DuplicateId { graph: DestinationId, id: DestinationId },
    #[error("start destination {start} is not a child of graph {graph}")]
    StartNotFound { graph: DestinationId, start: DestinationId },
    #[error("destination id 0 is reserved")]
    ReservedId,
}

/// An immutable destination tree.
///
/// Built once via [`GraphBuilder`]; the controller resolves every handle it
/// stores against the graph it was attached with, so snapshots taken under
/// one graph are re-resolved by id when a new graph is attached.
#[derive(Debug, Clone)]
pub struct NavGraph {
    nodes: Vec<DestinationNode>,
    root: NodeIndex,
}

impl NavGraph {
    pub fn node(&self, index: NodeIndex) -> &DestinationNode {
        &self.nodes[index.0]
    }

    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn root_node(&self) -> &DestinationNode {
        self.node(self.root)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DestinationNode> {
        self.nodes.iter()
    }

    /// Direct child of `graph` with the given id.
    pub fn find_node(&self, graph: NodeIndex, id: DestinationId) -> Option<NodeIndex> {
        self.node(graph).graph_data().and_then(|data| data.child(id))
    }

    /// First node anywhere in the tree with this route pattern.
    pub fn find_by_route(&self, route: &str) -> Option<NodeIndex> {
        self.nodes
            .iter()
            .find(|node| node.has_route(route))
            .map(|node| node.index)
    }

    /// Searches for `id` starting at `from`: the node itself, then (when
    /// `search_children`) its descendants, then upward through parents,
    /// skipping the subtree already visited on the way up.
    ///
    /// When `matching` is set, only that exact node is an acceptable hit;
    /// structurally equal duplicates in sibling graphs are passed over.
    pub fn find_destination_comprehensive(
        &self,
        id: DestinationId,
        from: NodeIndex,
        search_children: bool,
        matching: Option<NodeIndex>,
    ) -> Option<NodeIndex> {
        let node = self.node(from);
        if node.id == id && matching.map_or(true, |m| m == from) {
            return Some(from);
        }
        let start_graph = if node.is_graph() { from } else { node.parent? };
        self.find_node_comprehensive(start_graph, id, search_children, matching, None)
    }

    fn find_node_comprehensive(
        &self,
        graph: NodeIndex,
        id: DestinationId,
        search_children: bool,
        matching: Option<NodeIndex>,
        last_visited: Option<NodeIndex>,
    ) -> Option<NodeIndex> {
        let node = self.node(graph);
        if node.id == id && matching.map_or(true, |m| m == graph) {
            return Some(graph);
        }
        if let Some(data) = node.graph_data() {
            for (child_id, child_idx) in data.children() {
                if Some(child_idx) == last_visited {
                    continue;
                }
                if child_id == id && matching.map_or(true, |m| m == child_idx) {
                    return Some(child_idx);
                }
                if search_children && self.node(child_idx).is_graph() {
                    if let Some(found) =
                        self.find_node_comprehensive(child_idx, id, true, matching, None)
                    {
                        return Some(found);
                    }
                }
            }
        }
        let parent = node.parent?;
        self.find_node_comprehensive(parent, id, search_children, matching, Some(graph))
    }

    /// Chain from `node` up to the root, inclusive.
    pub fn hierarchy(&self, node: NodeIndex) -> Hierarchy {
        let mut chain = Hierarchy::new();
        let mut current = Some(node);
        while let Some(idx) = current {
            chain.push(idx);
            current = self.node(idx).parent;
        }
        chain
    }

    /// Chain from a graph down through start destinations to the leaf,
    /// inclusive on both ends. For a leaf node, the chain is the node alone.
    pub fn child_hierarchy(&self, node: NodeIndex) -> Hierarchy {
        let mut chain = Hierarchy::new();
        let mut current = node;
        chain.push(current);
        while let Some(data) = self.node(current).graph_data() {
            match data.child(data.start_destination()) {
                Some(next) => {
                    chain.push(next);
                    current = next;
                }
                None => break,
            }
        }
        chain
    }

    /// The leaf reached by following start destinations down from `node`.
    pub fn find_start_destination(&self, node: NodeIndex) -> NodeIndex {
        *self
            .child_hierarchy(node)
            .last()
            .unwrap_or(&node)
    }

    /// Root-to-node id chain, the wire form used by explicit deep links.
    ///
    /// A node that is its parent's start destination is omitted:
    /// navigating to the parent graph already lands on it, and keeping it
    /// in the chain would push a duplicate.
    pub fn build_deep_link_ids(&self, node: NodeIndex) -> Vec<DestinationId> {
        let mut ids: Vec<DestinationId> = Vec::new();
        for idx in self.hierarchy(node).iter().rev() {
            let current = self.node(*idx);
            let is_parent_start = current
                .parent()
                .and_then(|parent| self.node(parent).graph_data())
                .map(|data| data.start_destination() == current.id())
                .unwrap_or(false);
            if !is_parent_start {
                ids.push(current.id());
            }
        }
        ids
    }
}

enum ChildSpec {
    Leaf(DestinationBuilder),
    Nested(GraphBuilder),
}

/// Programmatic graph inflation.
///
/// ```
/// use rudder_core::{DestinationBuilder, DestinationId, GraphBuilder};
///
/// const HOME: DestinationId = DestinationId(1);
/// const DETAIL: DestinationId = DestinationId(2);
///
/// let graph = GraphBuilder::new(DestinationId(100), HOME)
///     .destination(DestinationBuilder::screen(HOME).route("home"))
///     .destination(DestinationBuilder::screen(DETAIL).route("detail"))
///     .build()
///     .unwrap();
/// assert_eq!(graph.root_node().id(), DestinationId(100));
/// ```
pub struct GraphBuilder {
    id: DestinationId,
    route: Option<String>,
    label: Option<String>,
    start_destination: DestinationId,
    default_args: SavedState,
    children: Vec<ChildSpec>,
}

impl GraphBuilder {
    pub fn new(id: DestinationId, start_destination: DestinationId) -> Self {
        Self {
            id,
            route: None,
            label: None,
            start_destination,
            default_args: SavedState::new(),
            children: Vec::new(),
        }
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn default_args(mut self, args: SavedState) -> Self {
        self.default_args = args;
        self
    }

    pub fn destination(mut self, destination: DestinationBuilder) -> Self {
        self.children.push(ChildSpec::Leaf(destination));
        self
    }

    pub fn nested(mut self, graph: GraphBuilder) -> Self {
        self.children.push(ChildSpec::Nested(graph));
        self
    }

    pub fn build(self) -> Result<NavGraph, GraphError> {
        let mut nodes = Vec::new();
        let root = self.build_into(&mut nodes, None)?;
        Ok(NavGraph { nodes, root })
    }

    fn build_into(
        self,
        nodes: &mut Vec<DestinationNode>,
        parent: Option<NodeIndex>,
    ) -> Result<NodeIndex, GraphError> {
        if self.id.0 == 0 {
            return Err(GraphError::ReservedId);
        }
        if self.children.is_empty() {
            return Err(GraphError::EmptyGraph(self.id));
        }
        let index = NodeIndex(nodes.len());
        nodes.push(DestinationNode {
            index,
            id: self.id,
            route: self.route,
            navigator_name: navigator_names::GRAPH.to_owned(),
            label: self.label,
            floating_window: false,
            supporting_pane: false,
            parent,
            default_args: self.default_args,
            deep_links: Vec::new(),
            actions: Default::default(),
            graph: None,
        });

        let mut children: IndexMap<DestinationId, NodeIndex> = IndexMap::new();
        for child in self.children {
            let (child_id, child_idx) = match child {
                ChildSpec::Leaf(builder) => {
                    let id = builder.id;
                    if id.0 == 0 {
                        return Err(GraphError::ReservedId);
                    }
                    let child_idx = NodeIndex(nodes.len());
                    nodes.push(DestinationNode {
                        index: child_idx,
                        id,
                        route: builder.route,
                        navigator_name: builder.navigator_name,
                        label: builder.label,
                        floating_window: builder.floating_window,
                        supporting_pane: builder.supporting_pane,
                        parent: Some(index),
                        default_args: builder.default_args,
                        deep_links: builder.deep_links,
                        actions: builder.actions,
                        graph: None,
                    });
                    (id, child_idx)
                }
                ChildSpec::Nested(builder) => {
                    let id = builder.id;
                    let child_idx = builder.build_into(nodes, Some(index))?;
                    (id, child_idx)
                }
            };
            if children.insert(child_id, child_idx).is_some() {
                return Err(GraphError::DuplicateId {
                    graph: self.id,
                    id: child_id,
                });
            }
        }
        if !children.contains_key(&self.start_destination) {
            return Err(GraphError::StartNotFound {
                graph: self.id,
                start: self.start_destination,
            });
        }
        nodes[index.0].graph = Some(GraphData {
            children,
            start_destination: self.start_destination,
        });
        Ok(index)
    }
}

#[cfg(test)]
#[path = "tests/graph_tests.rs"]
mod graph_tests;
