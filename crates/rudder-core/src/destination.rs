//! Destination nodes and their builders.
//!
//! A destination is one navigable unit: a screen, a dialog, or a graph of
//! further destinations. Nodes live in the arena owned by
//! [`NavGraph`](crate::graph::NavGraph); this module defines the per-node
//! data and the fluent builders the graph builder consumes.

use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::deep_link::DeepLinkSpec;
use crate::options::NavOptions;
use crate::saved_state::SavedState;
use crate::{DestinationId, NodeIndex};

/// Well-known navigator names for the built-in destination kinds.
pub mod navigator_names {
    pub const GRAPH: &str = "graph";
    pub const SCREEN: &str = "screen";
    pub const DIALOG: &str = "dialog";
}

/// Scheme used when deriving a synthetic destination id from a route
/// pattern, so that plain ids and route-derived ids share one id space.
const ROUTE_URI_SCHEME: &str = "rudder-app://navigation/";

/// Derives the stable destination id for a route pattern.
pub fn route_id(route: &str) -> DestinationId {
    let mut hasher = FxHasher::default();
    ROUTE_URI_SCHEME.hash(&mut hasher);
    route.hash(&mut hasher);
    let folded = hasher.finish();
    // Fold to 32 bits and keep clear of the reserved zero id.
    let id = (folded ^ (folded >> 32)) as u32;
    DestinationId(id.max(1))
}

/// Identifier of an action registered on a destination.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActionId(pub u32);

/// A named navigation: an action id resolves, on some destination, to a
/// target destination plus default options and arguments.
#[derive(Debug, Clone)]
pub struct NavAction {
    pub destination: DestinationId,
    pub options: Option<NavOptions>,
    pub default_args: SavedState,
}

impl NavAction {
    pub fn to(destination: DestinationId) -> Self {
        Self {
            destination,
            options: None,
            default_args: SavedState::new(),
        }
    }

    pub fn with_options(mut self, options: NavOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_default_args(mut self, args: SavedState) -> Self {
        self.default_args = args;
        self
    }
}

/// Graph-only payload of a destination node: its children (in insertion
/// order — the order is observable through single-top hierarchy matching)
/// and the designated start child.
#[derive(Debug, Clone)]
pub struct GraphData {
    pub(crate) children: IndexMap<DestinationId, NodeIndex>,
    pub(crate) start_destination: DestinationId,
}

impl GraphData {
    pub fn start_destination(&self) -> DestinationId {
        self.start_destination
    }

    pub fn child(&self, id: DestinationId) -> Option<NodeIndex> {
        self.children.get(&id).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (DestinationId, NodeIndex)> + '_ {
        self.children.iter().map(|(id, idx)| (*id, *idx))
    }
}

/// One node of the destination tree.
///
/// `parent` is a plain back-index into the owning arena; ownership flows
/// strictly graph → children.
#[derive(Debug, Clone)]
pub struct DestinationNode {
    pub(crate) index: NodeIndex,
    pub(crate) id: DestinationId,
    pub(crate) route: Option<String>,
    pub(crate) navigator_name: String,
    pub(crate) label: Option<String>,
    pub(crate) floating_window: bool,
    pub(crate) supporting_pane: bool,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) default_args: SavedState,
    pub(crate) deep_links: Vec<DeepLinkSpec>,
    pub(crate) actions: FxHashMap<ActionId, NavAction>,
    pub(crate) graph: Option<GraphData>,
}

impl DestinationNode {
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    pub fn id(&self) -> DestinationId {
        self.id
    }

    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn navigator_name(&self) -> &str {
        &self.navigator_name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_graph(&self) -> bool {
        self.graph.is_some()
    }

    pub fn is_floating_window(&self) -> bool {
        self.floating_window
    }

    pub fn is_supporting_pane(&self) -> bool {
        self.supporting_pane
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn default_args(&self) -> &SavedState {
        &self.default_args
    }

    pub fn deep_links(&self) -> &[DeepLinkSpec] {
        &self.deep_links
    }

    pub fn graph_data(&self) -> Option<&GraphData> {
        self.graph.as_ref()
    }

    pub fn action(&self, id: ActionId) -> Option<&NavAction> {
        self.actions.get(&id)
    }

    /// True when this node's route pattern matches `route` exactly.
    pub fn has_route(&self, route: &str) -> bool {
        self.route.as_deref() == Some(route)
    }

    /// Layers the node's default arguments under `args`.
    pub fn add_in_default_args(&self, args: Option<&SavedState>) -> SavedState {
        let mut merged = self.default_args.clone();
        if let Some(args) = args {
            merged.merge_from(args);
        }
        merged
    }

    /// Human-oriented name for log messages: label, route, or raw id.
    pub fn display_name(&self) -> String {
        if let Some(label) = &self.label {
            label.clone()
        } else if let Some(route) = &self.route {
            route.clone()
        } else {
            format!("0x{:x}", self.id.0)
        }
    }
}

/// Fluent builder for a leaf destination.
#[derive(Debug, Clone)]
pub struct DestinationBuilder {
    pub(crate) id: DestinationId,
    pub(crate) route: Option<String>,
    pub(crate) navigator_name: String,
    pub(crate) label: Option<String>,
    pub(crate) floating_window: bool,
    pub(crate) supporting_pane: bool,
    pub(crate) default_args: SavedState,
    pub(crate) deep_links: Vec<DeepLinkSpec>,
    pub(crate) actions: FxHashMap<ActionId, NavAction>,
}

impl DestinationBuilder {
    fn with_navigator(id: DestinationId, navigator_name: &str) -> Self {
        Self {
            id,
            route: None,
            navigator_name: navigator_name.to_owned(),
            label: None,
            floating_window: false,
            supporting_pane: false,
            default_args: SavedState::new(),
            deep_links: Vec::new(),
            actions: FxHashMap::default(),
        }
    }

    /// A plain screen destination.
    pub fn screen(id: DestinationId) -> Self {
        Self::with_navigator(id, navigator_names::SCREEN)
    }

    /// A dialog destination: floats above existing content.
    pub fn dialog(id: DestinationId) -> Self {
        let mut builder = Self::with_navigator(id, navigator_names::DIALOG);
        builder.floating_window = true;
        builder
    }

    /// A screen destination addressed by route pattern; the id derives
    /// from the pattern via [`route_id`].
    pub fn screen_route(route: impl Into<String>) -> Self {
        let route = route.into();
        let mut builder = Self::with_navigator(route_id(&route), navigator_names::SCREEN);
        builder.route = Some(route);
        builder
    }

    /// A destination handled by a custom navigator registered under `name`.
    pub fn custom(id: DestinationId, name: impl Into<String>) -> Self {
        Self::with_navigator(id, &name.into())
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn floating_window(mut self) -> Self {
        self.floating_window = true;
        self
    }

    pub fn supporting_pane(mut self) -> Self {
        self.supporting_pane = true;
        self
    }

    pub fn default_args(mut self, args: SavedState) -> Self {
        self.default_args = args;
        self
    }

    pub fn deep_link(mut self, spec: DeepLinkSpec) -> Self {
        self.deep_links.push(spec);
        self
    }

    pub fn action(mut self, id: ActionId, action: NavAction) -> Self {
        self.actions.insert(id, action);
        self
    }
}
