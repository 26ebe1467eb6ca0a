#![doc = r"Back-stack controller runtime for Rudder."]

pub mod controller;
pub mod deep_link_builder;
pub mod entry;
pub mod lifecycle;
pub mod navigator;

pub use controller::{DestinationChangedListener, ListenerId, NavController};
pub use deep_link_builder::DeepLinkBuilder;
pub use entry::{BackStackEntry, EntryId, EntrySnapshot};
pub use lifecycle::Lifecycle;
pub use navigator::{
    DialogNavigator, GraphNavigator, NavigateCtx, Navigator, NavigatorRegistry, PopCtx,
    ScreenNavigator,
};

use thiserror::Error;

use rudder_core::{ActionId, DestinationId};

/// Programmer errors surfaced synchronously by the controller. Pop misses
/// and deep-link failures are deliberate no-ops instead — they depend on
/// runtime stack state and outside input rather than caller correctness.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("no navigation graph has been set on this controller")]
    GraphNotSet,
    #[error("destination {id} cannot be found from the current destination")]
    DestinationNotFound { id: DestinationId },
    #[error("route {route:?} cannot be found in the current graph")]
    RouteNotFound { route: String },
    #[error("action {0:?} cannot be found on the current destination")]
    ActionNotFound(ActionId),
    #[error("destination id 0 can only be used together with a pop-up-to target")]
    MissingPopTarget,
    #[error("no destination with id {id} is on the back stack")]
    EntryNotOnBackStack { id: DestinationId },
    #[error("restoring the back stack failed: destination {id} cannot be resolved")]
    RestoreFailed { id: DestinationId },
    #[error("no navigator is registered under the name {name:?}")]
    NavigatorMissing { name: String },
}
