//! The back-stack controller.
//!
//! `NavController` owns the ordered back queue and runs the pop and
//! navigate engines over it, propagates entry lifecycles, and speaks the
//! persisted-state codec. The model is single-threaded and call-stack
//! synchronous: re-entrant navigation from a destination-changed listener
//! is expected and handled by an explicit pending-event queue drained only
//! by the outermost dispatch.

use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use rudder_core::{
    ActionId, DeepLinkRequest, DestinationId, NavGraph, NavOptions, NodeIndex, PopTarget,
    Routed, SavedState,
};

use crate::entry::{BackStackEntry, EntryId, EntrySnapshot};
use crate::lifecycle::Lifecycle;
use crate::navigator::{
    DialogNavigator, GraphNavigator, NavigateCtx, Navigator, NavigatorRegistry, NavigatorState,
    PopCtx, ScreenNavigator,
};
use crate::NavigationError;

/// Keys of the persisted controller blob.
pub const KEY_NAVIGATOR_STATE: &str = "rudder:controller:navigatorState";
pub const KEY_NAVIGATOR_STATE_NAMES: &str = "rudder:controller:navigatorState:names";
pub const KEY_BACK_STACK: &str = "rudder:controller:backStack";
pub const KEY_BACK_STACK_DEST_IDS: &str = "rudder:controller:backStackDestIds";
pub const KEY_BACK_STACK_IDS: &str = "rudder:controller:backStackIds";
pub const KEY_BACK_STACK_STATES_IDS: &str = "rudder:controller:backStackStates";
pub const KEY_BACK_STACK_STATES_PREFIX: &str = "rudder:controller:backStackStates:";
pub const KEY_DEEP_LINK_HANDLED: &str = "rudder:controller:deepLinkHandled";

/// Keys of the explicit deep-link launch parcel (see
/// [`DeepLinkBuilder`](crate::deep_link_builder::DeepLinkBuilder)).
pub const KEY_DEEP_LINK_IDS: &str = "rudder:controller:deepLinkIds";
pub const KEY_DEEP_LINK_ARGS: &str = "rudder:controller:deepLinkArgs";
pub const KEY_DEEP_LINK_EXTRAS: &str = "rudder:controller:deepLinkExtras";
pub const KEY_DEEP_LINK_URI: &str = "rudder:controller:deepLinkUri";
pub const KEY_DEEP_LINK_NEW_TASK: &str = "rudder:controller:deepLinkNewTask";

/// Identifies a registered destination-changed listener.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub struct ListenerId(u64);

/// Callback invoked after the current destination settles. Receives the
/// controller itself so it may navigate re-entrantly.
pub type DestinationChangedListener = Rc<dyn Fn(&mut NavController, DestinationId, &SavedState)>;

pub struct NavController {
    graph: Option<Rc<NavGraph>>,
    registry: NavigatorRegistry,
    attached_navigators: Vec<String>,
    back_queue: Vec<Rc<BackStackEntry>>,
    navigator_state: FxHashMap<String, NavigatorState>,
    /// destination id -> id of the saved sub-stack a restore-state
    /// navigation to that destination should reconstitute.
    back_stack_map: IndexMap<DestinationId, EntryId>,
    /// saved sub-stack id -> its ordered snapshots, oldest first.
    back_stack_states: IndexMap<EntryId, VecDeque<EntrySnapshot>>,
    child_to_parent: FxHashMap<EntryId, Rc<BackStackEntry>>,
    parent_to_child_count: FxHashMap<EntryId, usize>,
    entry_saved_state: FxHashMap<EntryId, bool>,
    retained: FxHashMap<EntryId, SavedState>,
    listeners: Vec<(ListenerId, DestinationChangedListener)>,
    next_listener_id: u64,
    pending_dispatch: VecDeque<Rc<BackStackEntry>>,
    dispatch_depth: usize,
    deep_link_handled: bool,
    deep_link_save_state: bool,
    navigator_state_to_restore: Option<SavedState>,
    back_stack_to_restore: Option<Vec<EntrySnapshot>>,
}

impl NavController {
    /// A controller with the built-in screen, dialog, and graph navigators
    /// registered. Custom navigators can be added with
    /// [`register_navigator`](Self::register_navigator) before the graph
    /// is set.
    pub fn new() -> Self {
        let mut registry = NavigatorRegistry::new();
        registry.register(Rc::new(GraphNavigator));
        registry.register(Rc::new(ScreenNavigator));
        registry.register(Rc::new(DialogNavigator));
        Self {
            graph: None,
            registry,
            attached_navigators: Vec::new(),
            back_queue: Vec::new(),
            navigator_state: FxHashMap::default(),
            back_stack_map: IndexMap::new(),
            back_stack_states: IndexMap::new(),
            child_to_parent: FxHashMap::default(),
            parent_to_child_count: FxHashMap::default(),
            entry_saved_state: FxHashMap::default(),
            retained: FxHashMap::default(),
            listeners: Vec::new(),
            next_listener_id: 1,
            pending_dispatch: VecDeque::new(),
            dispatch_depth: 0,
            deep_link_handled: false,
            deep_link_save_state: true,
            navigator_state_to_restore: None,
            back_stack_to_restore: None,
        }
    }

    pub fn register_navigator(&mut self, navigator: Rc<dyn Navigator>) {
        self.registry.register(navigator);
    }

    pub fn graph(&self) -> Option<&NavGraph> {
        self.graph.as_deref()
    }

    /// The live back stack, oldest first; the last element is current.
    pub fn back_stack(&self) -> &[Rc<BackStackEntry>] {
        &self.back_queue
    }

    pub fn current_entry(&self) -> Option<&Rc<BackStackEntry>> {
        self.back_queue.last()
    }

    pub fn current_destination(&self) -> Option<DestinationId> {
        self.current_entry().map(|entry| entry.destination_id())
    }

    /// The entry below the current one, skipping graph entries.
    pub fn previous_entry(&self) -> Option<&Rc<BackStackEntry>> {
        let graph = self.graph.as_deref()?;
        self.back_queue
            .iter()
            .rev()
            .skip(1)
            .find(|entry| !graph.node(entry.node()).is_graph())
    }

    /// Topmost entry whose destination has the given id.
    pub fn get_back_stack_entry(
        &self,
        id: DestinationId,
    ) -> Result<Rc<BackStackEntry>, NavigationError> {
        self.back_queue
            .iter()
            .rev()
            .find(|entry| entry.destination_id() == id)
            .cloned()
            .ok_or(NavigationError::EntryNotOnBackStack { id })
    }

    /// Per-entry key-value store cleared when the entry is destroyed.
    /// Survives pops taken with `save_state` and comes back on restore.
    pub fn retained_state(&mut self, entry: EntryId) -> &mut SavedState {
        self.retained.entry(entry).or_default()
    }

    pub fn has_retained_state(&self, entry: EntryId) -> bool {
        self.retained.contains_key(&entry)
    }

    /// Registers a listener and, when a destination is already current,
    /// notifies it immediately.
    pub fn add_on_destination_changed_listener(
        &mut self,
        listener: DestinationChangedListener,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Rc::clone(&listener)));
        if let Some(current) = self.back_queue.last().cloned() {
            listener(self, current.destination_id(), current.args());
        }
        id
    }

    pub fn remove_on_destination_changed_listener(&mut self, id: ListenerId) {
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
    }

    /// When enabled (the default), deep-link chains that switch to a
    /// sibling graph save the state of the graph they leave.
    pub fn set_deep_link_save_state(&mut self, save_state: bool) {
        self.deep_link_save_state = save_state;
    }

    // ------------------------------------------------------------------
    // Graph attachment
    // ------------------------------------------------------------------

    /// Replaces the navigation graph. Any current graph's saved stacks are
    /// cleared and its back stack popped; pending persisted state is then
    /// re-instantiated against the new graph, and if the stack is still
    /// empty the graph's start destination is navigated to.
    pub fn set_graph(
        &mut self,
        graph: NavGraph,
        start_args: Option<SavedState>,
    ) -> Result<(), NavigationError> {
        if let Some(previous) = self.graph.clone() {
            let saved_ids: Vec<DestinationId> = self.back_stack_map.keys().copied().collect();
            for id in saved_ids {
                self.clear_back_stack_internal(id);
            }
            self.pop_back_stack_internal(
                &PopTarget::Id(previous.root_node().id()),
                true,
                false,
            );
        }
        self.graph = Some(Rc::new(graph));
        self.on_graph_created(start_args)
    }

    fn on_graph_created(
        &mut self,
        start_args: Option<SavedState>,
    ) -> Result<(), NavigationError> {
        let graph = self.graph.clone().ok_or(NavigationError::GraphNotSet)?;

        if let Some(navigator_state) = self.navigator_state_to_restore.take() {
            if let Some(names) = navigator_state.get_str_list(KEY_NAVIGATOR_STATE_NAMES) {
                for name in names {
                    match self.registry.get(name) {
                        Some(navigator) => {
                            if let Some(state) = navigator_state.get_state(name) {
                                navigator.on_restore_state(state.clone());
                            }
                        }
                        None => {
                            log::warn!("Dropping persisted state of unknown navigator {name:?}")
                        }
                    }
                }
            }
        }

        if let Some(snapshots) = self.back_stack_to_restore.take() {
            for snapshot in snapshots {
                let node = self
                    .find_destination(snapshot.destination_id)
                    .ok_or(NavigationError::RestoreFailed {
                        id: snapshot.destination_id,
                    })?;
                let entry = BackStackEntry::restored(&snapshot, graph.node(node));
                self.state_for(entry.navigator_name())
                    .back_stack
                    .push(Rc::clone(&entry));
                self.back_queue.push(Rc::clone(&entry));
                if let Some(parent_idx) = graph.node(node).parent() {
                    let parent = self.get_back_stack_entry(graph.node(parent_idx).id())?;
                    self.link_child_to_parent(&entry, &parent);
                }
            }
        }

        let names: Vec<String> = self.registry.names().map(str::to_owned).collect();
        for name in names {
            if !self.attached_navigators.contains(&name) {
                self.attached_navigators.push(name.clone());
                if let Some(navigator) = self.registry.get(&name) {
                    navigator.on_attach();
                }
            }
        }

        if self.back_queue.is_empty() {
            self.navigate_to_node(graph.root(), start_args.as_ref(), None)
        } else {
            self.dispatch_on_destination_changed();
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Destination lookup
    // ------------------------------------------------------------------

    /// Searches for `id` starting at the current destination and walking
    /// up through parents, with the root graph checked first.
    pub fn find_destination(&self, id: DestinationId) -> Option<NodeIndex> {
        let graph = self.graph.as_deref()?;
        if graph.root_node().id() == id {
            return Some(graph.root());
        }
        let from = self
            .back_queue
            .last()
            .map(|entry| entry.node())
            .unwrap_or_else(|| graph.root());
        graph.find_destination_comprehensive(id, from, false, None)
    }

    /// Like [`find_destination`](Self::find_destination) but only accepts
    /// the exact node `matching` — duplicated ids in sibling graphs are
    /// passed over.
    fn find_destination_matching(
        &self,
        id: DestinationId,
        matching: NodeIndex,
    ) -> Option<NodeIndex> {
        let graph = self.graph.as_deref()?;
        if graph.root_node().id() == id
            && matching == graph.root()
            && graph.node(matching).parent().is_none()
        {
            return Some(graph.root());
        }
        let from = self
            .back_queue
            .last()
            .map(|entry| entry.node())
            .unwrap_or_else(|| graph.root());
        graph.find_destination_comprehensive(id, from, false, Some(matching))
    }

    /// The innermost graph the current destination sits in (the root graph
    /// when the stack is empty).
    fn top_graph(&self) -> Option<NodeIndex> {
        let graph = self.graph.as_deref()?;
        let current = match self.back_queue.last() {
            Some(entry) => entry.node(),
            None => return Some(graph.root()),
        };
        if graph.node(current).is_graph() {
            Some(current)
        } else {
            graph.node(current).parent()
        }
    }

    // ------------------------------------------------------------------
    // Pop engine
    // ------------------------------------------------------------------

    /// Pops the current destination off the back stack.
    pub fn pop_back_stack(&mut self) -> bool {
        match self.current_destination() {
            Some(current) => self.pop_back_stack_saving(current, true, false),
            None => {
                // Nothing on the stack; the pop is trivially unsuccessful.
                false
            }
        }
    }

    /// Pops up to the first entry matching `target`, scanning from the
    /// tail. `inclusive` removes the matching entry as well.
    pub fn pop_back_stack_to(&mut self, target: impl Into<PopTarget>, inclusive: bool) -> bool {
        self.pop_back_stack_saving(target, inclusive, false)
    }

    /// Like [`pop_back_stack_to`](Self::pop_back_stack_to), optionally
    /// snapshotting the popped run for a later restore-state navigation.
    pub fn pop_back_stack_saving(
        &mut self,
        target: impl Into<PopTarget>,
        inclusive: bool,
        save_state: bool,
    ) -> bool {
        let popped = self.pop_back_stack_internal(&target.into(), inclusive, save_state);
        popped && self.dispatch_on_destination_changed()
    }

    pub fn pop_back_stack_routed<R: Routed>(&mut self, inclusive: bool, save_state: bool) -> bool {
        self.pop_back_stack_saving(R::destination_id(), inclusive, save_state)
    }

    fn pop_back_stack_internal(
        &mut self,
        target: &PopTarget,
        inclusive: bool,
        save_state: bool,
    ) -> bool {
        if self.back_queue.is_empty() {
            // Nothing to pop if the back stack is empty.
            return false;
        }
        let graph = match self.graph.clone() {
            Some(graph) => graph,
            None => return false,
        };

        let mut pop_count = 0usize;
        let mut found: Option<NodeIndex> = None;
        for entry in self.back_queue.iter().rev() {
            let node = graph.node(entry.node());
            let matched = match target {
                PopTarget::Id(id) => entry.destination_id() == *id,
                PopTarget::Route(route) => node.has_route(route),
            };
            if inclusive || !matched {
                pop_count += 1;
            }
            if matched {
                found = Some(entry.node());
                break;
            }
        }
        let Some(found) = found else {
            // Better to ignore the pop than accidentally unwind the whole
            // stack on a target that is not there.
            log::info!("Ignoring pop to {target:?}: not found on the current back stack");
            return false;
        };
        self.execute_pop_operations(pop_count, found, inclusive, save_state)
    }

    fn execute_pop_operations(
        &mut self,
        pop_count: usize,
        found: NodeIndex,
        inclusive: bool,
        save_state: bool,
    ) -> bool {
        let graph = match self.graph.clone() {
            Some(graph) => graph,
            None => return false,
        };
        let mut popped = false;
        let mut saved: VecDeque<EntrySnapshot> = VecDeque::new();

        for _ in 0..pop_count {
            let Some(top) = self.back_queue.last().cloned() else {
                break;
            };
            let Some(navigator) = self.registry.get(top.navigator_name()) else {
                log::error!(
                    "No navigator registered under {:?}; halting pop",
                    top.navigator_name()
                );
                break;
            };
            let mut ctx = PopCtx::new();
            navigator.pop(&top, save_state, &mut ctx);
            if !ctx.confirmed() {
                // The pop did not complete; stop immediately. Entries
                // already confirmed stay popped.
                break;
            }
            popped = true;
            if ctx.with_transition() {
                self.state_for(top.navigator_name())
                    .transitions_in_progress
                    .push(Rc::clone(&top));
                self.entry_saved_state.insert(top.id(), save_state);
            }
            self.pop_entry_from_back_stack(&top, save_state, &mut saved, ctx.with_transition());
        }

        if save_state {
            if !inclusive {
                // Map the destination actually passed as the pop target
                // (and its parents, while it is their start destination)
                // to the saved run.
                if let Some(first) = saved.front() {
                    let first_id = EntryId(first.entry_id);
                    for node in self.start_parent_chain(&graph, found) {
                        let id = graph.node(node).id();
                        if self.back_stack_map.contains_key(&id) {
                            break;
                        }
                        self.back_stack_map.insert(id, first_id);
                    }
                }
            }
            if let Some(first) = saved.front() {
                let first_id = EntryId(first.entry_id);
                // Whether inclusive or not, the popped destination itself
                // (and its start-destination parents) map to the run.
                if let Some(first_node) = self.find_destination(first.destination_id) {
                    for node in self.start_parent_chain(&graph, first_node) {
                        let id = graph.node(node).id();
                        if self.back_stack_map.contains_key(&id) {
                            break;
                        }
                        self.back_stack_map.insert(id, first_id);
                    }
                }
                if self.back_stack_map.values().any(|id| *id == first_id) {
                    self.back_stack_states.insert(first_id, saved);
                }
            }
        }
        popped
    }

    /// Chain from `node` upward through each parent graph that designates
    /// the previous link as its start destination, `node` first.
    fn start_parent_chain(&self, graph: &NavGraph, node: NodeIndex) -> SmallVec<[NodeIndex; 4]> {
        let mut chain = SmallVec::new();
        chain.push(node);
        let mut current = node;
        while let Some(parent) = graph.node(current).parent() {
            let starts_here = graph
                .node(parent)
                .graph_data()
                .map(|data| data.start_destination() == graph.node(current).id())
                .unwrap_or(false);
            if !starts_here {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    fn pop_entry_from_back_stack(
        &mut self,
        popped: &Rc<BackStackEntry>,
        save_state: bool,
        saved: &mut VecDeque<EntrySnapshot>,
        forced_transition: bool,
    ) {
        debug_assert!(
            self.back_queue
                .last()
                .map(|top| top.id() == popped.id())
                .unwrap_or(false),
            "attempted to pop an entry that is not the top of the back stack"
        );
        self.back_queue.pop();
        self.state_for(popped.navigator_name()).remove_entry(popped.id());

        let transitioning = forced_transition
            || self
                .navigator_state
                .get(popped.navigator_name())
                .map(|state| state.is_transitioning(popped.id()))
                .unwrap_or(false)
            || self.parent_to_child_count.contains_key(&popped.id());

        if popped.max_lifecycle().is_at_least(Lifecycle::Created) {
            if save_state {
                // Move the state down through Created first, then record
                // the snapshot.
                popped.set_max_lifecycle(Lifecycle::Created);
                saved.push_front(popped.snapshot());
            }
            if !transitioning {
                popped.set_max_lifecycle(Lifecycle::Destroyed);
                self.unlink_child_from_parent(popped);
            } else {
                popped.set_max_lifecycle(Lifecycle::Created);
            }
        }
        if !save_state && !transitioning {
            self.retained.remove(&popped.id());
        }
    }

    /// A navigator-initiated pop (e.g. a dialog dismissed by the user):
    /// removes everything above `entry`, then the entry itself, then
    /// dispatches the destination change.
    pub fn pop_back_stack_from_navigator(&mut self, entry: &Rc<BackStackEntry>) {
        let Some(index) = self.back_queue.iter().position(|e| e.id() == entry.id()) else {
            log::info!(
                "Ignoring pop of entry {:?}: not found on the current back stack",
                entry.id()
            );
            return;
        };
        if index + 1 != self.back_queue.len() {
            let above = self.back_queue[index + 1].destination_id();
            self.pop_back_stack_internal(&PopTarget::Id(above), true, false);
        }
        if let Some(top) = self.back_queue.last().cloned() {
            self.pop_entry_from_back_stack(&top, false, &mut VecDeque::new(), false);
        }
        self.dispatch_on_destination_changed();
    }

    /// Drops the saved sub-stack recorded for `target`, if any.
    pub fn clear_back_stack(&mut self, target: impl Into<PopTarget>) -> bool {
        let id = match target.into() {
            PopTarget::Id(id) => Some(id),
            PopTarget::Route(route) => self
                .graph
                .as_deref()
                .and_then(|graph| graph.find_by_route(&route).map(|node| graph.node(node).id())),
        };
        match id {
            Some(id) => self.clear_back_stack_internal(id),
            None => false,
        }
    }

    fn clear_back_stack_internal(&mut self, id: DestinationId) -> bool {
        let Some(stack_id) = self.back_stack_map.get(&id).copied() else {
            return false;
        };
        self.back_stack_map.retain(|_, mapped| *mapped != stack_id);
        if let Some(snapshots) = self.back_stack_states.shift_remove(&stack_id) {
            for snapshot in snapshots {
                self.retained.remove(&EntryId(snapshot.entry_id));
            }
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Navigate engine
    // ------------------------------------------------------------------

    /// Navigates to the destination with the given id, found from the
    /// current destination.
    pub fn navigate(&mut self, target: DestinationId) -> Result<(), NavigationError> {
        self.navigate_with(target, None, None)
    }

    /// Navigates to `target`, which may also name an action registered on
    /// the current destination (actions are resolved first and contribute
    /// their default options and arguments).
    pub fn navigate_with(
        &mut self,
        target: DestinationId,
        args: Option<SavedState>,
        options: Option<NavOptions>,
    ) -> Result<(), NavigationError> {
        let graph = self.graph.clone().ok_or(NavigationError::GraphNotSet)?;
        let current = self
            .back_queue
            .last()
            .map(|entry| entry.node())
            .unwrap_or_else(|| graph.root());

        let mut dest_id = target;
        let mut final_options = options;
        let mut combined_args: Option<SavedState> = None;

        if let Some(action) = self.find_action(&graph, current, ActionId(target.0)) {
            if final_options.is_none() {
                final_options = action.options.clone();
            }
            dest_id = action.destination;
            if !action.default_args.is_empty() {
                combined_args = Some(action.default_args.clone());
            }
        }
        if let Some(args) = args {
            combined_args
                .get_or_insert_with(SavedState::new)
                .merge_from(&args);
        }

        // Navigating to id 0 is purely a pop request.
        if dest_id == DestinationId::NONE {
            if let Some(options) = &final_options {
                if let Some(pop_target) = options.pop_up_to() {
                    let inclusive = options.is_pop_up_to_inclusive();
                    self.pop_back_stack_saving(pop_target.clone(), inclusive, false);
                    return Ok(());
                }
            }
            return Err(NavigationError::MissingPopTarget);
        }

        let node = self
            .find_destination(dest_id)
            .ok_or(NavigationError::DestinationNotFound { id: dest_id })?;
        self.navigate_to_node(node, combined_args.as_ref(), final_options.as_ref())
    }

    /// Navigates via an action registered on the current destination (or
    /// one of its parents). Unlike [`navigate_with`](Self::navigate_with),
    /// a missing action is an error rather than a fallback to plain-id
    /// navigation.
    pub fn navigate_action(
        &mut self,
        action: ActionId,
        args: Option<SavedState>,
        options: Option<NavOptions>,
    ) -> Result<(), NavigationError> {
        let graph = self.graph.clone().ok_or(NavigationError::GraphNotSet)?;
        let current = self
            .back_queue
            .last()
            .map(|entry| entry.node())
            .unwrap_or_else(|| graph.root());
        let resolved = self
            .find_action(&graph, current, action)
            .ok_or(NavigationError::ActionNotFound(action))?;
        let mut combined = resolved.default_args.clone();
        if let Some(args) = args {
            combined.merge_from(&args);
        }
        let final_options = options.or_else(|| resolved.options.clone());
        let node = self
            .find_destination(resolved.destination)
            .ok_or(NavigationError::DestinationNotFound {
                id: resolved.destination,
            })?;
        self.navigate_to_node(node, Some(&combined), final_options.as_ref())
    }

    /// Navigates to the destination whose route pattern is `route`.
    pub fn navigate_route(
        &mut self,
        route: &str,
        args: Option<SavedState>,
        options: Option<NavOptions>,
    ) -> Result<(), NavigationError> {
        let graph = self.graph.clone().ok_or(NavigationError::GraphNotSet)?;
        let node = graph
            .find_by_route(route)
            .ok_or_else(|| NavigationError::RouteNotFound {
                route: route.to_owned(),
            })?;
        self.navigate_to_node(node, args.as_ref(), options.as_ref())
    }

    pub fn navigate_routed<R: Routed>(
        &mut self,
        args: Option<SavedState>,
        options: Option<NavOptions>,
    ) -> Result<(), NavigationError> {
        self.navigate_with(R::destination_id(), args, options)
    }

    /// Actions are looked up on the current destination and then upward
    /// through its parents.
    fn find_action(
        &self,
        graph: &NavGraph,
        from: NodeIndex,
        action: ActionId,
    ) -> Option<rudder_core::NavAction> {
        let mut current = Some(from);
        while let Some(idx) = current {
            if let Some(found) = graph.node(idx).action(action) {
                return Some(found.clone());
            }
            current = graph.node(idx).parent();
        }
        None
    }

    fn navigate_to_node(
        &mut self,
        origin: NodeIndex,
        args: Option<&SavedState>,
        options: Option<&NavOptions>,
    ) -> Result<(), NavigationError> {
        let graph = self.graph.clone().ok_or(NavigationError::GraphNotSet)?;
        for state in self.navigator_state.values_mut() {
            state.is_navigating = true;
        }

        let mut popped = false;
        if let Some(options) = options {
            if let Some(target) = options.pop_up_to() {
                popped = self.pop_back_stack_internal(
                    target,
                    options.is_pop_up_to_inclusive(),
                    options.should_pop_up_to_save_state(),
                );
            }
        }

        let origin_node = graph.node(origin);
        let dest_id = origin_node.id();
        let final_args = origin_node.add_in_default_args(args);

        let mut navigated = false;
        let mut single_top = false;
        let restore_requested = options
            .map(|o| o.should_restore_state())
            .unwrap_or(false);
        if restore_requested && self.back_stack_map.contains_key(&dest_id) {
            navigated = self.restore_state_internal(dest_id, Some(&final_args), options)?;
        }
        if !navigated {
            single_top = options
                .map(|o| o.should_launch_single_top())
                .unwrap_or(false)
                && self.launch_single_top_internal(origin, args)?;
            if !single_top {
                // A graph target resolves through start destinations to
                // its effective leaf; the graph entries themselves are
                // synthesized while the leaf is added.
                let leaf = if origin_node.is_graph() {
                    graph.find_start_destination(origin)
                } else {
                    origin
                };
                let leaf_args = if leaf != origin {
                    graph.node(leaf).add_in_default_args(Some(&final_args))
                } else {
                    final_args.clone()
                };
                let entry = BackStackEntry::create(graph.node(leaf), leaf_args);
                let navigator = self.navigator_for(entry.navigator_name())?;
                let mut ctx = NavigateCtx::new();
                navigator.navigate(&[Rc::clone(&entry)], options, &mut ctx);
                for confirmed in ctx.take_confirmed() {
                    navigated = true;
                    self.state_for(confirmed.navigator_name())
                        .back_stack
                        .push(Rc::clone(&confirmed));
                    self.add_entry_to_back_stack(origin, Some(&final_args), confirmed, &[]);
                }
            }
        }

        for state in self.navigator_state.values_mut() {
            state.is_navigating = false;
        }
        if popped || navigated || single_top {
            self.dispatch_on_destination_changed();
        } else {
            self.update_back_stack_lifecycle();
        }
        Ok(())
    }

    fn launch_single_top_internal(
        &mut self,
        origin: NodeIndex,
        args: Option<&SavedState>,
    ) -> Result<bool, NavigationError> {
        let graph = self.graph.clone().ok_or(NavigationError::GraphNotSet)?;
        let Some(position) = self
            .back_queue
            .iter()
            .rposition(|entry| entry.node() == origin)
        else {
            return Ok(false);
        };
        let origin_node = graph.node(origin);
        if origin_node.is_graph() {
            // A graph target is single-top only when its exact child
            // hierarchy forms the current tail of the stack.
            let child_ids: Vec<DestinationId> = graph
                .child_hierarchy(origin)
                .iter()
                .map(|idx| graph.node(*idx).id())
                .collect();
            if self.back_queue.len() - position != child_ids.len() {
                return Ok(false);
            }
            let queue_ids: Vec<DestinationId> = self.back_queue[position..]
                .iter()
                .map(|entry| entry.destination_id())
                .collect();
            if queue_ids != child_ids {
                return Ok(false);
            }
        } else if Some(origin_node.id()) != self.current_destination() {
            return Ok(false);
        }

        // Renew every entry from the matched position to the tail,
        // preserving identity and stack position but taking fresh
        // arguments.
        let mut renewed: VecDeque<Rc<BackStackEntry>> = VecDeque::new();
        while self.back_queue.len() > position {
            let old = self
                .back_queue
                .pop()
                .unwrap_or_else(|| unreachable!("length checked above"));
            self.unlink_child_from_parent(&old);
            let new_args = graph.node(old.node()).add_in_default_args(args);
            renewed.push_front(BackStackEntry::renewed(&old, new_args));
        }

        for entry in &renewed {
            if let Some(parent_idx) = graph.node(entry.node()).parent() {
                let parent = self.get_back_stack_entry(graph.node(parent_idx).id())?;
                self.link_child_to_parent(entry, &parent);
            }
            self.back_queue.push(Rc::clone(entry));
        }

        // Only after the queue is finalized do the navigators learn about
        // the renewed entries.
        for entry in &renewed {
            self.state_for(entry.navigator_name()).replace_entry(entry);
            let navigator = self.navigator_for(entry.navigator_name())?;
            navigator.on_launch_single_top(entry);
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Restore procedure
    // ------------------------------------------------------------------

    fn restore_state_internal(
        &mut self,
        id: DestinationId,
        args: Option<&SavedState>,
        options: Option<&NavOptions>,
    ) -> Result<bool, NavigationError> {
        let Some(stack_id) = self.back_stack_map.get(&id).copied() else {
            return Ok(false);
        };
        // Clear out the state being restored so it cannot restore twice.
        self.back_stack_map.retain(|_, mapped| *mapped != stack_id);
        let Some(snapshots) = self.back_stack_states.shift_remove(&stack_id) else {
            return Ok(false);
        };
        let entries = self.instantiate_back_stack(&snapshots)?;
        Ok(self.execute_restore_state(&entries, args, options))
    }

    fn instantiate_back_stack(
        &self,
        snapshots: &VecDeque<EntrySnapshot>,
    ) -> Result<Vec<Rc<BackStackEntry>>, NavigationError> {
        let graph = self.graph.as_deref().ok_or(NavigationError::GraphNotSet)?;
        let mut current = self
            .back_queue
            .last()
            .map(|entry| entry.node())
            .unwrap_or_else(|| graph.root());
        let mut entries = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let node = graph
                .find_destination_comprehensive(snapshot.destination_id, current, true, None)
                .ok_or(NavigationError::RestoreFailed {
                    id: snapshot.destination_id,
                })?;
            entries.push(BackStackEntry::restored(snapshot, graph.node(node)));
            current = node;
        }
        Ok(entries)
    }

    fn execute_restore_state(
        &mut self,
        entries: &[Rc<BackStackEntry>],
        args: Option<&SavedState>,
        options: Option<&NavOptions>,
    ) -> bool {
        let graph = match self.graph.clone() {
            Some(graph) => graph,
            None => return false,
        };
        // Group back-to-back entries owned by the same navigator so each
        // group appears atomically; graph entries are re-synthesized by
        // the push path instead.
        let mut groups: Vec<Vec<Rc<BackStackEntry>>> = Vec::new();
        for entry in entries {
            if graph.node(entry.node()).is_graph() {
                continue;
            }
            match groups.last_mut() {
                Some(group)
                    if group
                        .last()
                        .map(|last| last.navigator_name() == entry.navigator_name())
                        .unwrap_or(false) =>
                {
                    group.push(Rc::clone(entry));
                }
                _ => groups.push(vec![Rc::clone(entry)]),
            }
        }

        let mut navigated = false;
        for group in groups {
            let Some(navigator) = self.registry.get(group[0].navigator_name()) else {
                log::error!(
                    "No navigator registered under {:?}; skipping restored group",
                    group[0].navigator_name()
                );
                continue;
            };
            let mut ctx = NavigateCtx::new();
            navigator.navigate(&group, options, &mut ctx);
            let mut last_navigated_index = 0usize;
            for confirmed in ctx.take_confirmed() {
                navigated = true;
                self.state_for(confirmed.navigator_name())
                    .back_stack
                    .push(Rc::clone(&confirmed));
                // Hand every entry between the previously navigated one
                // and this one to the push path so intervening graph
                // entries are restored as well.
                let restored: Vec<Rc<BackStackEntry>> = match entries
                    .iter()
                    .position(|entry| entry.id() == confirmed.id())
                {
                    Some(index) => {
                        let slice = entries[last_navigated_index..=index].to_vec();
                        last_navigated_index = index + 1;
                        slice
                    }
                    None => Vec::new(),
                };
                self.add_entry_to_back_stack(confirmed.node(), args, confirmed, &restored);
            }
        }
        navigated
    }

    // ------------------------------------------------------------------
    // Stack assembly
    // ------------------------------------------------------------------

    fn add_entry_to_back_stack(
        &mut self,
        origin: NodeIndex,
        final_args: Option<&SavedState>,
        entry: Rc<BackStackEntry>,
        restored: &[Rc<BackStackEntry>],
    ) {
        let graph = match self.graph.clone() {
            Some(graph) => graph,
            None => return,
        };
        let new_dest = entry.node();

        if !graph.node(new_dest).is_floating_window() {
            // Floating windows never host navigation beneath them: pop
            // them all off before the new destination lands.
            loop {
                let Some(last) = self.back_queue.last() else {
                    break;
                };
                let last_node = graph.node(last.node());
                if !last_node.is_floating_window() {
                    break;
                }
                let id = last_node.id();
                if !self.pop_back_stack_internal(&PopTarget::Id(id), true, false) {
                    break;
                }
            }
        }

        let mut hierarchy: VecDeque<Rc<BackStackEntry>> = VecDeque::new();
        if graph.node(origin).is_graph() {
            // Navigating to a graph always creates fresh instances of the
            // graph entries between the leaf and the target graph, popping
            // any existing copy at the tail.
            let mut destination = Some(new_dest);
            while let Some(dest) = destination {
                let parent = graph.node(dest).parent();
                if let Some(parent_idx) = parent {
                    let parent_entry = restored
                        .iter()
                        .rev()
                        .find(|candidate| candidate.node() == parent_idx)
                        .cloned()
                        .unwrap_or_else(|| {
                            BackStackEntry::create(
                                graph.node(parent_idx),
                                final_args.cloned().unwrap_or_default(),
                            )
                        });
                    hierarchy.push_front(parent_entry);
                    if let Some(last) = self.back_queue.last().cloned() {
                        if last.node() == parent_idx {
                            self.pop_entry_from_back_stack(
                                &last,
                                false,
                                &mut VecDeque::new(),
                                false,
                            );
                        }
                    }
                }
                destination = parent;
                if destination == Some(origin) {
                    break;
                }
            }
        }

        // Collect every intermediate graph that is not yet referentially
        // reachable; structurally equal duplicates in sibling graphs are
        // not deduplicated.
        let mut destination = hierarchy
            .front()
            .map(|entry| entry.node())
            .unwrap_or(new_dest);
        loop {
            let id = graph.node(destination).id();
            if self.find_destination_matching(id, destination) == Some(destination) {
                break;
            }
            let Some(parent_idx) = graph.node(destination).parent() else {
                break;
            };
            let graph_args = final_args.filter(|args| !args.is_empty());
            let parent_entry = restored
                .iter()
                .rev()
                .find(|candidate| candidate.node() == parent_idx)
                .cloned()
                .unwrap_or_else(|| {
                    let parent_node = graph.node(parent_idx);
                    BackStackEntry::create(
                        parent_node,
                        parent_node.add_in_default_args(graph_args),
                    )
                });
            hierarchy.push_front(parent_entry);
            destination = parent_idx;
        }

        let overlapping = hierarchy
            .front()
            .map(|entry| entry.node())
            .unwrap_or(new_dest);
        let overlapping_id = graph.node(overlapping).id();
        // Pop orphaned graph entries whose node no longer connects to the
        // new hierarchy.
        loop {
            let Some(last) = self.back_queue.last().cloned() else {
                break;
            };
            let last_node = graph.node(last.node());
            let Some(data) = last_node.graph_data() else {
                break;
            };
            if data.child(overlapping_id).is_some() {
                break;
            }
            self.pop_entry_from_back_stack(&last, false, &mut VecDeque::new(), false);
        }

        // The root graph's entry leads the stack whenever it is non-empty.
        let first_node = self
            .back_queue
            .first()
            .or_else(|| hierarchy.front())
            .map(|first| first.node());
        if first_node != Some(graph.root()) {
            let root_entry = restored
                .iter()
                .rev()
                .find(|candidate| candidate.node() == graph.root())
                .cloned()
                .unwrap_or_else(|| {
                    let root_node = graph.root_node();
                    BackStackEntry::create(
                        root_node,
                        root_node.add_in_default_args(final_args),
                    )
                });
            hierarchy.push_front(root_entry);
        }

        for hierarchy_entry in &hierarchy {
            self.state_for(hierarchy_entry.navigator_name())
                .back_stack
                .push(Rc::clone(hierarchy_entry));
        }
        self.back_queue.extend(hierarchy.iter().cloned());
        self.back_queue.push(Rc::clone(&entry));

        // Track how many destinations depend on each parent graph entry.
        for linked in hierarchy.iter().chain(std::iter::once(&entry)) {
            if let Some(parent_idx) = graph.node(linked.node()).parent() {
                if let Ok(parent) = self.get_back_stack_entry(graph.node(parent_idx).id()) {
                    self.link_child_to_parent(linked, &parent);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Child/parent counters
    // ------------------------------------------------------------------

    fn link_child_to_parent(&mut self, child: &Rc<BackStackEntry>, parent: &Rc<BackStackEntry>) {
        self.child_to_parent.insert(child.id(), Rc::clone(parent));
        *self.parent_to_child_count.entry(parent.id()).or_insert(0) += 1;
    }

    fn unlink_child_from_parent(
        &mut self,
        child: &Rc<BackStackEntry>,
    ) -> Option<Rc<BackStackEntry>> {
        let parent = self.child_to_parent.remove(&child.id())?;
        let count = self.parent_to_child_count.get_mut(&parent.id())?;
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.parent_to_child_count.remove(&parent.id());
            let transitioning = self
                .navigator_state
                .get(parent.navigator_name())
                .map(|state| state.is_transitioning(parent.id()))
                .unwrap_or(false);
            if transitioning {
                // The last child is gone; the parent may now finish its
                // own exit.
                self.mark_transition_complete(&parent);
            }
        }
        Some(parent)
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Called by a navigator once an entry's exit (or entrance) animation
    /// settles. Entries no longer on the stack are destroyed here, unless
    /// their state was saved.
    pub fn mark_transition_complete(&mut self, entry: &Rc<BackStackEntry>) {
        let was_saved = self.entry_saved_state.remove(&entry.id()).unwrap_or(false);
        if let Some(state) = self.navigator_state.get_mut(entry.navigator_name()) {
            state.remove_transition(entry.id());
        }
        let on_stack = self.back_queue.iter().any(|e| Rc::ptr_eq(e, entry));
        if !on_stack {
            self.unlink_child_from_parent(entry);
            if entry.max_lifecycle().is_at_least(Lifecycle::Created) {
                entry.set_max_lifecycle(Lifecycle::Destroyed);
            }
            let same_identity_live = self.back_queue.iter().any(|e| e.id() == entry.id());
            if !same_identity_live && !was_saved {
                self.retained.remove(&entry.id());
            }
            self.update_back_stack_lifecycle();
        } else {
            let is_navigating = self
                .navigator_state
                .get(entry.navigator_name())
                .map(|state| state.is_navigating)
                .unwrap_or(false);
            if !is_navigating {
                self.update_back_stack_lifecycle();
            }
            // Otherwise the ongoing navigate call updates lifecycles when
            // it completes.
        }
    }

    /// Pins `entry` at `Started` ahead of a predictive transition.
    pub fn prepare_for_transition(&mut self, entry: &Rc<BackStackEntry>) -> bool {
        if self.back_queue.iter().any(|e| e.id() == entry.id()) {
            entry.set_max_lifecycle(Lifecycle::Started);
            true
        } else {
            log::warn!("Cannot transition an entry that is not on the back stack");
            false
        }
    }

    // ------------------------------------------------------------------
    // Dispatch and lifecycle propagation
    // ------------------------------------------------------------------

    fn dispatch_on_destination_changed(&mut self) -> bool {
        // Graphs never settle at the tail: pop them until a leaf (or
        // nothing) is current.
        loop {
            let Some(last) = self.back_queue.last().cloned() else {
                break;
            };
            let is_graph = self
                .graph
                .as_deref()
                .map(|graph| graph.node(last.node()).is_graph())
                .unwrap_or(false);
            if !is_graph {
                break;
            }
            self.pop_entry_from_back_stack(&last, false, &mut VecDeque::new(), false);
        }

        let last = self.back_queue.last().cloned();
        if let Some(last) = &last {
            self.pending_dispatch.push_back(Rc::clone(last));
        }
        // Guard against re-entrant navigation while lifecycles update:
        // only the outermost dispatch drains the queue.
        self.dispatch_depth += 1;
        self.update_back_stack_lifecycle();
        self.dispatch_depth -= 1;

        if self.dispatch_depth == 0 {
            let to_dispatch: Vec<Rc<BackStackEntry>> = self.pending_dispatch.drain(..).collect();
            for entry in to_dispatch {
                let listeners: Vec<DestinationChangedListener> = self
                    .listeners
                    .iter()
                    .map(|(_, listener)| Rc::clone(listener))
                    .collect();
                for listener in listeners {
                    listener(self, entry.destination_id(), entry.args());
                }
            }
        }
        last.is_some()
    }

    pub(crate) fn update_back_stack_lifecycle(&mut self) {
        // Operate on a copy: applying lifecycle changes may re-enter.
        let back_stack: Vec<Rc<BackStackEntry>> = self.back_queue.clone();
        if back_stack.is_empty() {
            return;
        }
        let graph = match self.graph.clone() {
            Some(graph) => graph,
            None => return,
        };

        // Three layers: Resumed for the interactive top, Started for
        // destinations visible beneath floating windows, Created for the
        // rest.
        let top = back_stack
            .last()
            .unwrap_or_else(|| unreachable!("emptiness checked above"));
        let top_node = graph.node(top.node());
        let mut next_resumed: VecDeque<NodeIndex> = VecDeque::new();
        next_resumed.push_back(top.node());
        if top_node.is_supporting_pane() {
            // A supporting floating window only shares its lifecycle with
            // other floating windows; anything else below it stays at
            // Started.
            let only_floating = top_node.is_floating_window();
            for entry in back_stack.iter().rev().skip(1) {
                let node = graph.node(entry.node());
                if only_floating && !node.is_floating_window() && !node.is_graph() {
                    break;
                }
                next_resumed.push_back(entry.node());
                if !node.is_supporting_pane() && !node.is_graph() {
                    break;
                }
            }
        }

        let mut next_started: VecDeque<NodeIndex> = VecDeque::new();
        let resumed_bottom_floating = next_resumed
            .back()
            .map(|idx| graph.node(*idx).is_floating_window())
            .unwrap_or(false);
        if resumed_bottom_floating {
            // Everything visible beneath the floating windows stays
            // Started, down to and including the first plain screen.
            for entry in back_stack.iter().rev() {
                let node = graph.node(entry.node());
                next_started.push_back(entry.node());
                if !node.is_floating_window() && !node.is_supporting_pane() && !node.is_graph() {
                    break;
                }
            }
        }

        // Downward transitions apply immediately (children pause before
        // their parents); upward transitions are captured and applied in a
        // second top-down pass so parents resume before their children.
        let mut upward: FxHashMap<EntryId, Lifecycle> = FxHashMap::default();
        for entry in back_stack.iter().rev() {
            let current = entry.max_lifecycle();
            let node_idx = entry.node();
            if next_resumed.front() == Some(&node_idx) {
                if current != Lifecycle::Resumed {
                    let transitioning = self
                        .navigator_state
                        .get(entry.navigator_name())
                        .map(|state| state.is_transitioning(entry.id()))
                        .unwrap_or(false);
                    let parent_drained =
                        self.parent_to_child_count.get(&entry.id()) == Some(&0);
                    if !transitioning && !parent_drained {
                        upward.insert(entry.id(), Lifecycle::Resumed);
                    } else {
                        upward.insert(entry.id(), Lifecycle::Started);
                    }
                }
                if next_started.front() == Some(&node_idx) {
                    next_started.pop_front();
                }
                next_resumed.pop_front();
                if let Some(parent) = graph.node(node_idx).parent() {
                    next_resumed.push_back(parent);
                }
            } else if next_started.front() == Some(&node_idx) {
                let started = next_started
                    .pop_front()
                    .unwrap_or_else(|| unreachable!("front checked above"));
                if current == Lifecycle::Resumed {
                    entry.set_max_lifecycle(Lifecycle::Started);
                } else if current != Lifecycle::Started {
                    upward.insert(entry.id(), Lifecycle::Started);
                }
                if let Some(parent) = graph.node(started).parent() {
                    if !next_started.contains(&parent) {
                        next_started.push_back(parent);
                    }
                }
            } else {
                entry.set_max_lifecycle(Lifecycle::Created);
            }
        }
        for entry in &back_stack {
            if let Some(new_state) = upward.get(&entry.id()) {
                entry.set_max_lifecycle(*new_state);
            }
        }
    }

    /// Entries a host should currently be showing: transitioning-out
    /// entries not yet `Started` plus every at-least-`Started` entry of
    /// the stack, graphs excluded.
    pub fn visible_entries(&self) -> Vec<Rc<BackStackEntry>> {
        let mut entries: Vec<Rc<BackStackEntry>> = Vec::new();
        for state in self.navigator_state.values() {
            for entry in &state.transitions_in_progress {
                if !entries.iter().any(|e| e.id() == entry.id())
                    && !entry.max_lifecycle().is_at_least(Lifecycle::Started)
                {
                    entries.push(Rc::clone(entry));
                }
            }
        }
        for entry in &self.back_queue {
            if !entries.iter().any(|e| e.id() == entry.id())
                && entry.max_lifecycle().is_at_least(Lifecycle::Started)
            {
                entries.push(Rc::clone(entry));
            }
        }
        if let Some(graph) = self.graph.as_deref() {
            entries.retain(|entry| !graph.node(entry.node()).is_graph());
        }
        entries
    }

    // ------------------------------------------------------------------
    // Deep links
    // ------------------------------------------------------------------

    /// Matches `request` against the current graph and, on success,
    /// navigates the full root-to-destination chain. Failures degrade to
    /// `false`; requests arrive from outside the app's control.
    pub fn handle_deep_link_request(&mut self, request: &DeepLinkRequest) -> bool {
        let Some(graph) = self.graph.clone() else {
            return false;
        };
        let Some(top_graph) = self.top_graph() else {
            return false;
        };
        let Some(matched) =
            graph.match_deep_link_comprehensive(request, top_graph, true, true, None)
        else {
            return false;
        };
        let ids = graph.build_deep_link_ids(matched.destination);
        let dest_args = graph
            .node(matched.destination)
            .add_in_default_args(Some(&matched.args));
        let args: Vec<SavedState> = ids.iter().map(|_| dest_args.clone()).collect();
        match self.handle_deep_link_chain(&ids, &args, true) {
            Ok(handled) => handled,
            Err(error) => {
                log::warn!("Deep link navigation failed: {error}");
                false
            }
        }
    }

    /// The explicit launch-parcel path: decodes the id chain embedded by
    /// [`DeepLinkBuilder`](crate::deep_link_builder::DeepLinkBuilder) and
    /// navigates it. Undecodable parcels and unknown ids degrade to
    /// `false`.
    pub fn handle_deep_link(&mut self, extras: &SavedState) -> bool {
        let Some(graph) = self.graph.clone() else {
            return false;
        };
        // Undecodable ids map to the reserved zero id, which fails chain
        // validation below instead of silently shortening the chain.
        let mut ids: Vec<DestinationId> = extras
            .get_int_list(KEY_DEEP_LINK_IDS)
            .map(|list| {
                list.iter()
                    .map(|raw| {
                        u32::try_from(*raw)
                            .map(DestinationId)
                            .unwrap_or(DestinationId::NONE)
                    })
                    .collect()
            })
            .unwrap_or_default();
        let mut per_step: Vec<SavedState> = extras
            .get_state_list(KEY_DEEP_LINK_ARGS)
            .map(<[SavedState]>::to_vec)
            .unwrap_or_default();
        let mut global = SavedState::new();
        if let Some(extra_args) = extras.get_state(KEY_DEEP_LINK_EXTRAS) {
            global.merge_from(extra_args);
        }

        if ids.is_empty() {
            // No explicit chain: fall back to matching an embedded uri.
            if let Some(uri) = extras.get_str(KEY_DEEP_LINK_URI) {
                let request = DeepLinkRequest::from_uri(uri);
                if let Some(top_graph) = self.top_graph() {
                    if let Some(matched) =
                        graph.match_deep_link_comprehensive(&request, top_graph, true, true, None)
                    {
                        ids = graph.build_deep_link_ids(matched.destination);
                        per_step.clear();
                        let dest_args = graph
                            .node(matched.destination)
                            .add_in_default_args(Some(&matched.args));
                        global.merge_from(&dest_args);
                    }
                }
            }
        }
        if ids.is_empty() {
            return false;
        }
        if let Some(invalid) = self.find_invalid_destination_in_deep_link(&ids) {
            log::info!(
                "Could not find destination {invalid} in the navigation graph, ignoring the deep link"
            );
            return false;
        }

        let args: Vec<SavedState> = (0..ids.len())
            .map(|index| {
                let mut merged = global.clone();
                if let Some(step) = per_step.get(index) {
                    merged.merge_from(step);
                }
                merged
            })
            .collect();
        let new_task = extras.get_bool(KEY_DEEP_LINK_NEW_TASK).unwrap_or(false);
        match self.handle_deep_link_chain(&ids, &args, new_task) {
            Ok(handled) => handled,
            Err(error) => {
                log::warn!("Deep link navigation failed: {error}");
                false
            }
        }
    }

    fn handle_deep_link_chain(
        &mut self,
        ids: &[DestinationId],
        args: &[SavedState],
        new_task: bool,
    ) -> Result<bool, NavigationError> {
        let graph = self.graph.clone().ok_or(NavigationError::GraphNotSet)?;
        if new_task {
            // Restart from a cleared stack rooted at our own graph.
            if !self.back_queue.is_empty() {
                let root_id = graph.root_node().id();
                self.pop_back_stack_internal(&PopTarget::Id(root_id), true, false);
            }
            for (index, id) in ids.iter().enumerate() {
                let node = self
                    .find_destination(*id)
                    .ok_or(NavigationError::DestinationNotFound { id: *id })?;
                let mut builder = NavOptions::builder();
                let node_is_graph = graph.node(node).is_graph();
                let current_parent = self
                    .back_queue
                    .last()
                    .and_then(|entry| graph.node(entry.node()).parent());
                let changing_graphs = node_is_graph
                    && match current_parent {
                        Some(parent) => !graph.hierarchy(node).contains(&parent),
                        None => true,
                    };
                if changing_graphs && self.deep_link_save_state {
                    // Navigating to a sibling graph: save the state of the
                    // one being left so users can return to it.
                    let start_leaf = graph.find_start_destination(graph.root());
                    let start_id = graph.node(start_leaf).id();
                    builder = builder.pop_up_to(PopTarget::Id(start_id), false, true);
                }
                self.navigate_to_node(node, Some(&args[index]), Some(&builder.build()))?;
            }
            self.deep_link_handled = true;
            return Ok(true);
        }

        // Arriving on someone else's task: only the final destination is
        // shown, atop a freshly rooted stack.
        let mut current_graph = graph.root();
        let last_index = ids.len() - 1;
        for (index, id) in ids.iter().enumerate() {
            let node = if index == 0 {
                Some(graph.root())
            } else {
                graph.find_node(current_graph, *id)
            };
            let Some(node) = node else {
                return Err(NavigationError::DestinationNotFound { id: *id });
            };
            if index != last_index {
                if graph.node(node).is_graph() {
                    current_graph = node;
                    // Descend while the start destination is itself a graph.
                    while let Some(data) = graph.node(current_graph).graph_data() {
                        match data.child(data.start_destination()) {
                            Some(start) if graph.node(start).is_graph() => current_graph = start,
                            _ => break,
                        }
                    }
                }
            } else {
                let options = NavOptions::builder()
                    .pop_up_to(PopTarget::Id(graph.root_node().id()), true, false)
                    .build();
                self.navigate_to_node(node, Some(&args[index]), Some(&options))?;
            }
        }
        self.deep_link_handled = true;
        Ok(true)
    }

    /// Walks the id chain through the graph, returning the first id that
    /// does not resolve, or `None` when the whole chain is valid.
    fn find_invalid_destination_in_deep_link(
        &self,
        ids: &[DestinationId],
    ) -> Option<DestinationId> {
        let graph = self.graph.as_deref()?;
        let mut current_graph = graph.root();
        let last_index = ids.len() - 1;
        for (index, id) in ids.iter().enumerate() {
            let node = if index == 0 {
                if graph.root_node().id() == *id {
                    Some(graph.root())
                } else {
                    None
                }
            } else {
                graph.find_node(current_graph, *id)
            };
            let Some(node) = node else {
                return Some(*id);
            };
            if index != last_index && graph.node(node).is_graph() {
                current_graph = node;
                while let Some(data) = graph.node(current_graph).graph_data() {
                    match data.child(data.start_destination()) {
                        Some(start) if graph.node(start).is_graph() => current_graph = start,
                        _ => break,
                    }
                }
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Save/restore codec
    // ------------------------------------------------------------------

    /// Serializes the controller: navigator sub-states, the live back
    /// stack, the saved-stack tables, and the deep-link flag. `None` when
    /// there is nothing worth persisting.
    pub fn save_state(&self) -> Option<SavedState> {
        let mut blob: Option<SavedState> = None;

        let mut navigator_state = SavedState::new();
        let mut names: Vec<String> = Vec::new();
        for (name, navigator) in self.registry.iter() {
            if let Some(state) = navigator.on_save_state() {
                names.push(name.to_owned());
                navigator_state.put_state(name, state);
            }
        }
        if !names.is_empty() {
            navigator_state.put_str_list(KEY_NAVIGATOR_STATE_NAMES, names);
            blob.get_or_insert_with(SavedState::new)
                .put_state(KEY_NAVIGATOR_STATE, navigator_state);
        }

        if !self.back_queue.is_empty() {
            let snapshots: Vec<SavedState> = self
                .back_queue
                .iter()
                .map(|entry| entry.snapshot().to_saved_state())
                .collect();
            blob.get_or_insert_with(SavedState::new)
                .put_state_list(KEY_BACK_STACK, snapshots);
        }

        if !self.back_stack_map.is_empty() {
            let mut dest_ids: Vec<i64> = Vec::with_capacity(self.back_stack_map.len());
            let mut stack_ids: Vec<i64> = Vec::with_capacity(self.back_stack_map.len());
            for (dest_id, stack_id) in &self.back_stack_map {
                dest_ids.push(i64::from(dest_id.0));
                stack_ids.push(stack_id.0 as i64);
            }
            let blob = blob.get_or_insert_with(SavedState::new);
            blob.put_int_list(KEY_BACK_STACK_DEST_IDS, dest_ids);
            blob.put_int_list(KEY_BACK_STACK_IDS, stack_ids);
        }

        if !self.back_stack_states.is_empty() {
            let mut state_ids: Vec<i64> = Vec::with_capacity(self.back_stack_states.len());
            let blob_ref = blob.get_or_insert_with(SavedState::new);
            for (stack_id, snapshots) in &self.back_stack_states {
                state_ids.push(stack_id.0 as i64);
                let states: Vec<SavedState> = snapshots
                    .iter()
                    .map(EntrySnapshot::to_saved_state)
                    .collect();
                blob_ref.put_state_list(
                    format!("{KEY_BACK_STACK_STATES_PREFIX}{}", stack_id.0),
                    states,
                );
            }
            blob_ref.put_int_list(KEY_BACK_STACK_STATES_IDS, state_ids);
        }

        if self.deep_link_handled {
            blob.get_or_insert_with(SavedState::new)
                .put_bool(KEY_DEEP_LINK_HANDLED, true);
        }
        blob
    }

    /// Reverses [`save_state`](Self::save_state). The live back stack and
    /// navigator sub-states are stowed and re-instantiated when a graph is
    /// next attached: destination nodes must be resolved against the new
    /// graph, not the old one. Saved-stack tables restore eagerly.
    pub fn restore_state(&mut self, blob: &SavedState) {
        self.navigator_state_to_restore = blob.get_state(KEY_NAVIGATOR_STATE).cloned();
        self.back_stack_to_restore = blob.get_state_list(KEY_BACK_STACK).map(|states| {
            states
                .iter()
                .filter_map(EntrySnapshot::from_saved_state)
                .collect()
        });

        self.back_stack_map.clear();
        self.back_stack_states.clear();
        if let (Some(dest_ids), Some(stack_ids)) = (
            blob.get_int_list(KEY_BACK_STACK_DEST_IDS),
            blob.get_int_list(KEY_BACK_STACK_IDS),
        ) {
            for (dest_id, stack_id) in dest_ids.iter().zip(stack_ids.iter()) {
                if let Ok(dest) = u32::try_from(*dest_id) {
                    self.back_stack_map
                        .insert(DestinationId(dest), EntryId(*stack_id as u64));
                }
            }
        }
        if let Some(state_ids) = blob.get_int_list(KEY_BACK_STACK_STATES_IDS) {
            for stack_id in state_ids {
                let key = format!("{KEY_BACK_STACK_STATES_PREFIX}{stack_id}");
                if let Some(states) = blob.get_state_list(&key) {
                    let snapshots: VecDeque<EntrySnapshot> = states
                        .iter()
                        .filter_map(EntrySnapshot::from_saved_state)
                        .collect();
                    for snapshot in &snapshots {
                        EntryId::reserve_through(snapshot.entry_id);
                    }
                    self.back_stack_states
                        .insert(EntryId(*stack_id as u64), snapshots);
                }
            }
        }
        if let Some(snapshots) = &self.back_stack_to_restore {
            for snapshot in snapshots {
                EntryId::reserve_through(snapshot.entry_id);
            }
        }
        self.deep_link_handled = blob.get_bool(KEY_DEEP_LINK_HANDLED).unwrap_or(false);
    }

    pub fn deep_link_handled(&self) -> bool {
        self.deep_link_handled
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn navigator_for(&self, name: &str) -> Result<Rc<dyn Navigator>, NavigationError> {
        self.registry
            .get(name)
            .ok_or_else(|| NavigationError::NavigatorMissing {
                name: name.to_owned(),
            })
    }

    fn state_for(&mut self, name: &str) -> &mut NavigatorState {
        self.navigator_state.entry(name.to_owned()).or_default()
    }
}

impl Default for NavController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod controller_tests;

#[cfg(test)]
#[path = "tests/lifecycle_tests.rs"]
mod lifecycle_tests;

#[cfg(test)]
#[path = "tests/save_restore_tests.rs"]
mod save_restore_tests;

#[cfg(test)]
#[path = "tests/deep_link_tests.rs"]
mod deep_link_tests;
