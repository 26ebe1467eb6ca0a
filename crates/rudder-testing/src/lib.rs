#![doc = r"Test navigators and graph fixtures for Rudder."]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rudder_core::{DestinationId, NavOptions, SavedState};
use rudder_runtime::{BackStackEntry, NavigateCtx, Navigator, PopCtx};

/// One recorded call against a [`TestNavigator`].
#[derive(Debug, Clone, PartialEq)]
pub enum TestOperation {
    Navigate { destinations: Vec<DestinationId> },
    Pop { destination: DestinationId, save_state: bool },
    SingleTop { destination: DestinationId },
    Attach,
}

/// A navigator that records every call and confirms immediately.
///
/// Register it under a built-in name to observe the engine, or under a
/// custom name for destinations built with `DestinationBuilder::custom`.
pub struct TestNavigator {
    name: String,
    operations: RefCell<Vec<TestOperation>>,
    persisted: RefCell<Option<SavedState>>,
    restored: RefCell<Option<SavedState>>,
}

impl TestNavigator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: RefCell::new(Vec::new()),
            persisted: RefCell::new(None),
            restored: RefCell::new(None),
        }
    }

    pub fn operations(&self) -> Vec<TestOperation> {
        self.operations.borrow().clone()
    }

    pub fn clear_operations(&self) {
        self.operations.borrow_mut().clear();
    }

    /// State handed back from `on_save_state`.
    pub fn set_persisted(&self, state: SavedState) {
        *self.persisted.borrow_mut() = Some(state);
    }

    /// State most recently received through `on_restore_state`.
    pub fn restored(&self) -> Option<SavedState> {
        self.restored.borrow().clone()
    }
}

impl Navigator for TestNavigator {
    fn name(&self) -> &str {
        &self.name
    }

    fn navigate(
        &self,
        entries: &[Rc<BackStackEntry>],
        _options: Option<&NavOptions>,
        ctx: &mut NavigateCtx,
    ) {
        self.operations.borrow_mut().push(TestOperation::Navigate {
            destinations: entries.iter().map(|e| e.destination_id()).collect(),
        });
        for entry in entries {
            ctx.confirm(entry);
        }
    }

    fn pop(&self, entry: &Rc<BackStackEntry>, save_state: bool, ctx: &mut PopCtx) {
        self.operations.borrow_mut().push(TestOperation::Pop {
            destination: entry.destination_id(),
            save_state,
        });
        ctx.confirm();
    }

    fn on_launch_single_top(&self, entry: &Rc<BackStackEntry>) {
        self.operations.borrow_mut().push(TestOperation::SingleTop {
            destination: entry.destination_id(),
        });
    }

    fn on_attach(&self) {
        self.operations.borrow_mut().push(TestOperation::Attach);
    }

    fn on_save_state(&self) -> Option<SavedState> {
        self.persisted.borrow().clone()
    }

    fn on_restore_state(&self, state: SavedState) {
        *self.restored.borrow_mut() = Some(state);
    }
}

/// A navigator that can withhold pop confirmations, leaving the operation
/// pending the way an exit animation would. While deferring, pop requests
/// are recorded but not confirmed; the engine halts its pop sequence at
/// the first unconfirmed entry.
pub struct DeferringNavigator {
    name: String,
    defer_pops: Cell<bool>,
    pending: RefCell<Vec<Rc<BackStackEntry>>>,
}

impl DeferringNavigator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defer_pops: Cell::new(true),
            pending: RefCell::new(Vec::new()),
        }
    }

    pub fn set_defer_pops(&self, defer: bool) {
        self.defer_pops.set(defer);
    }

    /// Entries whose pops were requested but never confirmed.
    pub fn pending_pops(&self) -> Vec<Rc<BackStackEntry>> {
        self.pending.borrow().clone()
    }
}

impl Navigator for DeferringNavigator {
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

    fn pop(&self, entry: &Rc<BackStackEntry>, _save_state: bool, ctx: &mut PopCtx) {
        if self.defer_pops.get() {
            self.pending.borrow_mut().push(Rc::clone(entry));
        } else {
            ctx.confirm();
        }
    }
}

/// Canonical graphs shared by the runtime test suites.
pub mod fixtures {
    use rudder_core::{
        DeepLinkSpec, DestinationBuilder, DestinationId, GraphBuilder, NavGraph,
    };

    pub const ROOT: DestinationId = DestinationId(100);
    pub const HOME: DestinationId = DestinationId(1);
    pub const DETAIL: DestinationId = DestinationId(2);
    pub const SHEET: DestinationId = DestinationId(3);
    pub const SIDEBAR: DestinationId = DestinationId(4);
    pub const LIBRARY: DestinationId = DestinationId(200);
    pub const SHELF: DestinationId = DestinationId(10);
    pub const BOOK: DestinationId = DestinationId(11);

    /// A root graph with three plain screens, a dialog, a supporting
    /// pane, and a nested library graph:
    ///
    /// ```text
    /// ROOT (start HOME)
    /// ├── HOME     "home"
    /// ├── DETAIL   "detail"            app://detail/{item}
    /// ├── SHEET    dialog
    /// ├── SIDEBAR  supporting pane
    /// └── LIBRARY (start SHELF)
    ///     ├── SHELF "library/shelf"
    ///     └── BOOK  "library/book"
    /// ```
    pub fn sample_graph() -> NavGraph {
        GraphBuilder::new(ROOT, HOME)
            .destination(DestinationBuilder::screen(HOME).route("home"))
            .destination(
                DestinationBuilder::screen(DETAIL)
                    .route("detail")
                    .deep_link(DeepLinkSpec::from_uri_pattern("app://detail/{item}")),
            )
            .destination(DestinationBuilder::dialog(SHEET))
            .destination(DestinationBuilder::screen(SIDEBAR).supporting_pane())
            .nested(
                GraphBuilder::new(LIBRARY, SHELF)
                    .route("library")
                    .destination(DestinationBuilder::screen(SHELF).route("library/shelf"))
                    .destination(DestinationBuilder::screen(BOOK).route("library/book")),
            )
            .build()
            .expect("fixture graph builds")
    }
}
