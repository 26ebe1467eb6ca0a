#![doc = r"Destination trees, routes, deep links, and the saved-state parcel for Rudder."]

pub mod deep_link;
pub mod destination;
pub mod graph;
pub mod options;
pub mod saved_state;

pub use deep_link::{DeepLinkMatch, DeepLinkRequest, DeepLinkSpec};
pub use destination::{
    navigator_names, route_id, ActionId, DestinationBuilder, DestinationNode, GraphData, NavAction,
};
pub use graph::{GraphBuilder, GraphError, Hierarchy, NavGraph};
pub use options::{NavOptions, NavOptionsBuilder, PopTarget, Routed};
pub use saved_state::{saved_state, SavedState, StateValue};

use serde::{Deserialize, Serialize};

/// Identifier of a destination within its parent graph.
///
/// Zero is reserved: navigating to id 0 is only meaningful together with a
/// pop-up-to target, and no destination may claim it.
#[derive(
    Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Serialize, Deserialize,
)]
pub struct DestinationId(pub u32);

impl DestinationId {
    pub const NONE: DestinationId = DestinationId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for DestinationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Handle into the destination arena owned by a [`NavGraph`].
///
/// Only ever resolved against the graph it was produced by; attaching a new
/// graph invalidates all previously handed-out handles, which is why
/// persisted snapshots store [`DestinationId`]s instead.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub fn as_usize(self) -> usize {
        self.0
    }
}
