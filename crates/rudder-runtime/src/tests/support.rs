//! Shared fixtures for the controller test suites.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rudder_core::{
    ActionId, DeepLinkSpec, DestinationBuilder, DestinationId, GraphBuilder, NavAction, NavGraph,
    NavOptions, SavedState,
};

use crate::entry::BackStackEntry;
use crate::navigator::{NavigateCtx, Navigator, PopCtx};
use crate::NavController;

pub const ROOT: DestinationId = DestinationId(100);
pub const HOME: DestinationId = DestinationId(1);
pub const DETAIL: DestinationId = DestinationId(2);
pub const EXTRA: DestinationId = DestinationId(3);
pub const SHEET: DestinationId = DestinationId(4);
pub const SIDEBAR: DestinationId = DestinationId(5);
pub const OVERLAY: DestinationId = DestinationId(6);
pub const HOLD: DestinationId = DestinationId(7);
pub const FADE: DestinationId = DestinationId(8);
pub const LIBRARY: DestinationId = DestinationId(200);
pub const SHELF: DestinationId = DestinationId(10);
pub const BOOK: DestinationId = DestinationId(11);
pub const PROFILE: DestinationId = DestinationId(300);
pub const PROFILE_HOME: DestinationId = DestinationId(20);
pub const PROFILE_EDIT: DestinationId = DestinationId(21);

pub const OPEN_DETAIL: ActionId = ActionId(9001);

/// Root graph used across the suites:
///
/// ```text
/// ROOT (start HOME)
/// ├── HOME      "home"            action OPEN_DETAIL -> DETAIL
/// ├── DETAIL    "detail"          app://detail/{item}
/// ├── EXTRA     "extra"
/// ├── SHEET     dialog
/// ├── SIDEBAR   supporting pane
/// ├── OVERLAY   dialog + supporting pane
/// ├── HOLD      custom navigator "holding"
/// ├── FADE      custom navigator "fade"
/// ├── LIBRARY (start SHELF)
/// │   ├── SHELF "library/shelf"
/// │   └── BOOK  "library/book"
/// └── PROFILE (start PROFILE_HOME)
///     ├── PROFILE_HOME "profile"  app://profile/{user}
///     └── PROFILE_EDIT
/// ```
pub fn sample_graph() -> NavGraph {
    GraphBuilder::new(ROOT, HOME)
        .destination(
            DestinationBuilder::screen(HOME)
                .route("home")
                .action(OPEN_DETAIL, NavAction::to(DETAIL)),
        )
        .destination(
            DestinationBuilder::screen(DETAIL)
                .route("detail")
                .deep_link(DeepLinkSpec::from_uri_pattern("app://detail/{item}")),
        )
        .destination(DestinationBuilder::screen(EXTRA).route("extra"))
        .destination(DestinationBuilder::dialog(SHEET))
        .destination(DestinationBuilder::screen(SIDEBAR).supporting_pane())
        .destination(
            DestinationBuilder::dialog(OVERLAY).supporting_pane(),
        )
        .destination(DestinationBuilder::custom(HOLD, "holding"))
        .destination(DestinationBuilder::custom(FADE, "fade"))
        .nested(
            GraphBuilder::new(LIBRARY, SHELF)
                .route("library")
                .destination(DestinationBuilder::screen(SHELF).route("library/shelf"))
                .destination(DestinationBuilder::screen(BOOK).route("library/book")),
        )
        .nested(
            GraphBuilder::new(PROFILE, PROFILE_HOME)
                .route("profile")
                .destination(
                    DestinationBuilder::screen(PROFILE_HOME)
                        .route("profile/home")
                        .deep_link(DeepLinkSpec::from_uri_pattern("app://profile/{user}")),
                )
                .destination(DestinationBuilder::screen(PROFILE_EDIT)),
        )
        .build()
        .expect("fixture graph builds")
}

/// A controller attached to [`sample_graph`] with the extra test
/// navigators registered; stack starts as `[ROOT, HOME]`.
pub fn ready_controller() -> NavController {
    let mut controller = NavController::new();
    controller.register_navigator(Rc::new(HoldingNavigator::default()));
    controller.register_navigator(Rc::new(TransitionNavigator));
    controller
        .set_graph(sample_graph(), None)
        .expect("graph attaches");
    controller
}

pub fn dest_ids(controller: &NavController) -> Vec<DestinationId> {
    controller
        .back_stack()
        .iter()
        .map(|entry| entry.destination_id())
        .collect()
}

/// Withholds pop confirmations while `defer` is set, the way a navigator
/// mid-exit-animation would.
pub struct HoldingNavigator {
    defer: Cell<bool>,
    pending: RefCell<Vec<Rc<BackStackEntry>>>,
}

impl Default for HoldingNavigator {
    fn default() -> Self {
        Self {
            defer: Cell::new(true),
            pending: RefCell::new(Vec::new()),
        }
    }
}

impl HoldingNavigator {
    pub fn set_defer(&self, defer: bool) {
        self.defer.set(defer);
    }

    pub fn pending_pops(&self) -> Vec<Rc<BackStackEntry>> {
        self.pending.borrow().clone()
    }
}

impl Navigator for HoldingNavigator {
    fn name(&self) -> &str {
        "holding"
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

    fn pop(&self, entry: &Rc<BackStackEntry>, _save_state: bool, ctx: &mut PopCtx) {
        if self.defer.get() {
            self.pending.borrow_mut().push(Rc::clone(entry));
        } else {
            ctx.confirm();
        }
    }
}

/// Confirms pops with a transition, holding popped entries alive until
/// `mark_transition_complete`.
pub struct TransitionNavigator;

impl Navigator for TransitionNavigator {
    fn name(&self) -> &str {
        "fade"
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
        ctx.confirm_with_transition();
    }
}

/// Remembers a parcel across save/restore, standing in for a navigator
/// with internal persisted state.
pub struct PersistingNavigator {
    name: String,
    persisted: RefCell<Option<SavedState>>,
    restored: RefCell<Option<SavedState>>,
}

impl PersistingNavigator {
    pub fn new(name: impl Into<String>, persisted: SavedState) -> Self {
        Self {
            name: name.into(),
            persisted: RefCell::new(Some(persisted)),
            restored: RefCell::new(None),
        }
    }

    pub fn restored(&self) -> Option<SavedState> {
        self.restored.borrow().clone()
    }
}

impl Navigator for PersistingNavigator {
    fn name(&self) -> &str {
        &self.name
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

    fn on_save_state(&self) -> Option<SavedState> {
        self.persisted.borrow().clone()
    }

    fn on_restore_state(&self, state: SavedState) {
        *self.restored.borrow_mut() = Some(state);
    }
}
