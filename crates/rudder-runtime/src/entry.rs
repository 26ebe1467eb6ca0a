//! Back-stack entries and their serialized snapshots.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use rudder_core::{DestinationId, DestinationNode, NodeIndex, SavedState};

use crate::lifecycle::Lifecycle;

/// Stable identity of one instantiated occurrence of a destination.
///
/// Distinct from [`DestinationId`]: the same destination can sit on the
/// stack several times, each occurrence with its own `EntryId`. Ids are
/// minted from a process-wide counter; restoring persisted snapshots
/// reserves past the highest restored id so identities never collide.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntryId(pub u64);

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

impl EntryId {
    fn next() -> Self {
        EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn reserve_through(id: u64) {
        NEXT_ENTRY_ID.fetch_max(id + 1, Ordering::Relaxed);
    }
}

/// One instantiated occurrence of a destination on the back stack.
///
/// Owned by the controller's back queue while active, shared out as
/// `Rc<BackStackEntry>` to listeners and navigators. The lifecycle field
/// is a `Cell`: entries are only ever touched from the single UI thread.
#[derive(Debug)]
pub struct BackStackEntry {
    id: EntryId,
    node: NodeIndex,
    destination_id: DestinationId,
    navigator_name: String,
    args: SavedState,
    max_lifecycle: Cell<Lifecycle>,
}

impl BackStackEntry {
    pub(crate) fn create(node: &DestinationNode, args: SavedState) -> Rc<Self> {
        Rc::new(Self {
            id: EntryId::next(),
            node: node.index(),
            destination_id: node.id(),
            navigator_name: node.navigator_name().to_owned(),
            args,
            max_lifecycle: Cell::new(Lifecycle::Created),
        })
    }

    /// Replacement entry for a single-top relaunch: keeps the identity of
    /// `previous` (so scoped state survives) but takes fresh arguments.
    pub(crate) fn renewed(previous: &BackStackEntry, args: SavedState) -> Rc<Self> {
        Rc::new(Self {
            id: previous.id,
            node: previous.node,
            destination_id: previous.destination_id,
            navigator_name: previous.navigator_name.clone(),
            args,
            max_lifecycle: Cell::new(previous.max_lifecycle.get()),
        })
    }

    /// Re-instantiates a snapshot against a freshly resolved node.
    pub(crate) fn restored(snapshot: &EntrySnapshot, node: &DestinationNode) -> Rc<Self> {
        EntryId::reserve_through(snapshot.entry_id);
        Rc::new(Self {
            id: EntryId(snapshot.entry_id),
            node: node.index(),
            destination_id: node.id(),
            navigator_name: node.navigator_name().to_owned(),
            args: snapshot.args.clone(),
            max_lifecycle: Cell::new(Lifecycle::Created),
        })
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }

    pub fn destination_id(&self) -> DestinationId {
        self.destination_id
    }

    pub fn navigator_name(&self) -> &str {
        &self.navigator_name
    }

    pub fn args(&self) -> &SavedState {
        &self.args
    }

    pub fn max_lifecycle(&self) -> Lifecycle {
        self.max_lifecycle.get()
    }

    pub(crate) fn set_max_lifecycle(&self, lifecycle: Lifecycle) {
        self.max_lifecycle.set(lifecycle);
    }

    pub fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            entry_id: self.id.0,
            destination_id: self.destination_id,
            args: self.args.clone(),
        }
    }
}

const SNAPSHOT_KEY_ID: &str = "id";
const SNAPSHOT_KEY_DEST_ID: &str = "destId";
const SNAPSHOT_KEY_ARGS: &str = "args";

/// Serialized form of a [`BackStackEntry`]: destination id plus arguments,
/// with the entry id preserved so scoped state can be re-associated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    pub entry_id: u64,
    pub destination_id: DestinationId,
    pub args: SavedState,
}

impl EntrySnapshot {
    pub fn to_saved_state(&self) -> SavedState {
        let mut state = SavedState::new();
        state.put_int(SNAPSHOT_KEY_ID, self.entry_id as i64);
        state.put_int(SNAPSHOT_KEY_DEST_ID, i64::from(self.destination_id.0));
        state.put_state(SNAPSHOT_KEY_ARGS, self.args.clone());
        state
    }

    pub fn from_saved_state(state: &SavedState) -> Option<Self> {
        Some(Self {
            entry_id: state.get_int(SNAPSHOT_KEY_ID)? as u64,
            destination_id: DestinationId(u32::try_from(state.get_int(SNAPSHOT_KEY_DEST_ID)?).ok()?),
            args: state.get_state(SNAPSHOT_KEY_ARGS).cloned().unwrap_or_default(),
        })
    }
}
