//! Polymorphic back-stack behavior, keyed by navigator name.
//!
//! Every destination names the navigator that owns entries of its kind.
//! The controller never mutates the back stack on a navigator's behalf
//! without confirmation: a [`Navigator`] receives push/pop requests
//! together with a context sink and must confirm each entry before the
//! engine commits the change. A navigator that confirms nothing leaves the
//! operation pending — the engine halts the sequence at that point without
//! rolling back entries already confirmed, which is how asynchronous exit
//! animations are tolerated.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use rudder_core::{navigator_names, NavOptions, SavedState};

use crate::entry::{BackStackEntry, EntryId};

/// Confirmation sink for a navigate request.
pub struct NavigateCtx {
    confirmed: Vec<Rc<BackStackEntry>>,
}

impl NavigateCtx {
    pub(crate) fn new() -> Self {
        Self {
            confirmed: Vec::new(),
        }
    }

    /// Confirms that `entry` is now shown; the engine adds it to the back
    /// stack once the navigator returns. Order of confirmation is the
    /// order entries are added.
    pub fn confirm(&mut self, entry: &Rc<BackStackEntry>) {
        self.confirmed.push(Rc::clone(entry));
    }

    pub(crate) fn take_confirmed(self) -> Vec<Rc<BackStackEntry>> {
        self.confirmed
    }
}

/// Confirmation sink for a pop request of a single entry.
pub struct PopCtx {
    confirmed: bool,
    with_transition: bool,
}

impl PopCtx {
    pub(crate) fn new() -> Self {
        Self {
            confirmed: false,
            with_transition: false,
        }
    }

    /// Confirms the pop; the entry is removed and destroyed (or saved).
    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    /// Confirms the pop but keeps the entry alive until the navigator
    /// calls `NavController::mark_transition_complete` — for exits that
    /// animate out.
    pub fn confirm_with_transition(&mut self) {
        self.confirmed = true;
        self.with_transition = true;
    }

    pub(crate) fn confirmed(&self) -> bool {
        self.confirmed
    }

    pub(crate) fn with_transition(&self) -> bool {
        self.with_transition
    }
}

/// One back-stack behavior: plain screens, dialogs, nested graphs, or a
/// host-defined custom kind.
pub trait Navigator {
    /// Registry key; destinations reference navigators by this name.
    fn name(&self) -> &str;

    /// Shows `entries` (already instantiated, oldest first). Confirm each
    /// entry that actually became visible.
    fn navigate(
        &self,
        entries: &[Rc<BackStackEntry>],
        options: Option<&NavOptions>,
        ctx: &mut NavigateCtx,
    );

    /// Hides `entry`, the current top of this navigator's slice.
    fn pop(&self, entry: &Rc<BackStackEntry>, save_state: bool, ctx: &mut PopCtx);

    /// A single-top relaunch replaced `entry`'s backing state in place.
    fn on_launch_single_top(&self, _entry: &Rc<BackStackEntry>) {}

    /// Called once when the controller attaches a graph.
    fn on_attach(&self) {}

    /// Navigator-private state to persist alongside the controller's.
    fn on_save_state(&self) -> Option<SavedState> {
        None
    }

    fn on_restore_state(&self, _state: SavedState) {}
}

/// Name-keyed navigator lookup.
pub struct NavigatorRegistry {
    navigators: FxHashMap<String, Rc<dyn Navigator>>,
}

impl NavigatorRegistry {
    pub fn new() -> Self {
        Self {
            navigators: FxHashMap::default(),
        }
    }

    /// Registers `navigator` under its own name, replacing (and logging)
    /// any previous holder of that name.
    pub fn register(&mut self, navigator: Rc<dyn Navigator>) {
        let name = navigator.name().to_owned();
        if self.navigators.insert(name.clone(), navigator).is_some() {
            log::warn!("Navigator {name:?} was already registered; replacing it");
        }
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Navigator>> {
        self.navigators.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.navigators.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<dyn Navigator>)> {
        self.navigators.iter().map(|(name, nav)| (name.as_str(), nav))
    }
}

impl Default for NavigatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-navigator bookkeeping owned by the controller: the navigator's
/// slice of the back stack, entries still animating out, and whether a
/// navigate call is currently executing against it.
#[derive(Default)]
pub(crate) struct NavigatorState {
    pub(crate) back_stack: Vec<Rc<BackStackEntry>>,
    pub(crate) transitions_in_progress: Vec<Rc<BackStackEntry>>,
    pub(crate) is_navigating: bool,
}

impl NavigatorState {
    pub(crate) fn is_transitioning(&self, id: EntryId) -> bool {
        self.transitions_in_progress.iter().any(|e| e.id() == id)
    }

    pub(crate) fn remove_transition(&mut self, id: EntryId) {
        self.transitions_in_progress.retain(|e| e.id() != id);
    }

    pub(crate) fn remove_entry(&mut self, id: EntryId) {
        self.back_stack.retain(|e| e.id() != id);
    }

    pub(crate) fn replace_entry(&mut self, entry: &Rc<BackStackEntry>) {
        for slot in &mut self.back_stack {
            if slot.id() == entry.id() {
                *slot = Rc::clone(entry);
            }
        }
    }
}

/// Handles plain screen destinations; pushes and pops take effect
/// immediately.
pub struct ScreenNavigator;

impl Navigator for ScreenNavigator {
    fn name(&self) -> &str {
        navigator_names::SCREEN
    }

    fn navigate(
        &self,
        entries: &[Rc<BackStackEntry>],
        _options: Option<&NavOptions>,
        ctx: &mut NavigateCtx,
    ) {
        for entry in entries {
            ctx.confirm(entry);
        }
    }

    fn pop(&self, _entry: &Rc<BackStackEntry>, _save_state: bool, ctx: &mut PopCtx) {
        ctx.confirm();
    }
}

/// Handles nested-graph entries. Graph entries are structural: they are
/// synthesized and torn down by the engines, so both directions confirm
/// immediately.
pub struct GraphNavigator;

impl Navigator for GraphNavigator {
    fn name(&self) -> &str {
        navigator_names::GRAPH
    }

    fn navigate(
        &self,
        entries: &[Rc<BackStackEntry>],
        _options: Option<&NavOptions>,
        ctx: &mut NavigateCtx,
    ) {
        for entry in entries {
            ctx.confirm(entry);
        }
    }

    fn pop(&self, _entry: &Rc<BackStackEntry>, _save_state: bool, ctx: &mut PopCtx) {
        ctx.confirm();
    }
}

/// Handles floating-window destinations (dialogs, sheets). The default
/// implementation confirms immediately; hosts that animate dismissal
/// register their own navigator under the same name and confirm with
/// transitions instead.
pub struct DialogNavigator;

impl Navigator for DialogNavigator {
    fn name(&self) -> &str {
        navigator_names::DIALOG
    }

    fn navigate(
        &self,
        entries: &[Rc<BackStackEntry>],
        _options: Option<&NavOptions>,
        ctx: &mut NavigateCtx,
    ) {
        for entry in entries {
            ctx.confirm(entry);
        }
    }

    fn pop(&self, _entry: &Rc<BackStackEntry>, _save_state: bool, ctx: &mut PopCtx) {
        ctx.confirm();
    }
}
