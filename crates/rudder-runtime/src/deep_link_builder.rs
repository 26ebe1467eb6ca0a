//! Companion builder for explicit deep-link launch parcels.
//!
//! Produces the parcel consumed by
//! [`NavController::handle_deep_link`](crate::NavController::handle_deep_link):
//! an id chain from the graph root to a destination, optional per-step
//! arguments, and global extras merged into every step.

use rudder_core::{DestinationId, NavGraph, SavedState};

use crate::controller::{
    KEY_DEEP_LINK_ARGS, KEY_DEEP_LINK_EXTRAS, KEY_DEEP_LINK_IDS, KEY_DEEP_LINK_NEW_TASK,
};
use crate::NavigationError;

pub struct DeepLinkBuilder<'g> {
    graph: &'g NavGraph,
    ids: Vec<DestinationId>,
    args: Vec<SavedState>,
    extras: SavedState,
    new_task: bool,
}

impl<'g> DeepLinkBuilder<'g> {
    pub fn new(graph: &'g NavGraph) -> Self {
        Self {
            graph,
            ids: Vec::new(),
            args: Vec::new(),
            extras: SavedState::new(),
            new_task: true,
        }
    }

    /// Targets `destination`, replacing any chain built so far with the
    /// full root-to-destination id chain.
    pub fn set_destination(
        mut self,
        destination: DestinationId,
        args: Option<SavedState>,
    ) -> Result<Self, NavigationError> {
        let node = self
            .graph
            .find_destination_comprehensive(destination, self.graph.root(), true, None)
            .ok_or(NavigationError::DestinationNotFound { id: destination })?;
        self.ids = self.graph.build_deep_link_ids(node);
        self.args = vec![SavedState::new(); self.ids.len()];
        if let (Some(step_args), Some(last)) = (args, self.args.last_mut()) {
            *last = step_args;
        }
        Ok(self)
    }

    /// Appends a further destination to the chain, for stacks deeper than
    /// the plain root-to-destination path.
    pub fn add_destination(
        mut self,
        destination: DestinationId,
        args: Option<SavedState>,
    ) -> Result<Self, NavigationError> {
        self.graph
            .find_destination_comprehensive(destination, self.graph.root(), true, None)
            .ok_or(NavigationError::DestinationNotFound { id: destination })?;
        self.ids.push(destination);
        self.args.push(args.unwrap_or_default());
        Ok(self)
    }

    /// Arguments merged into every step of the chain.
    pub fn set_arguments(mut self, extras: SavedState) -> Self {
        self.extras = extras;
        self
    }

    /// Whether the link restarts the task from a cleared stack (the
    /// default) or lands only on the final destination.
    pub fn set_new_task(mut self, new_task: bool) -> Self {
        self.new_task = new_task;
        self
    }

    /// The launch parcel. Feed it to `NavController::handle_deep_link`.
    pub fn build(self) -> SavedState {
        let mut parcel = SavedState::new();
        parcel.put_int_list(
            KEY_DEEP_LINK_IDS,
            self.ids.iter().map(|id| i64::from(id.0)).collect(),
        );
        parcel.put_state_list(KEY_DEEP_LINK_ARGS, self.args);
        if !self.extras.is_empty() {
            parcel.put_state(KEY_DEEP_LINK_EXTRAS, self.extras);
        }
        parcel.put_bool(KEY_DEEP_LINK_NEW_TASK, self.new_task);
        parcel
    }
}
