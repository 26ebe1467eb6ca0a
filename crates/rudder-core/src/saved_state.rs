//! Ordered key-value parcel used for arguments and persisted controller state.
//!
//! `SavedState` plays the role Bundles play on Android: every argument
//! parcel, every serialized back-stack snapshot, and the controller's own
//! persisted blob are all `SavedState` values. Hosts persist the blob with
//! any serde format they like.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single value stored in a [`SavedState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    IntList(Vec<i64>),
    Str(String),
    StrList(Vec<String>),
    State(SavedState),
    StateList(Vec<SavedState>),
}

/// Insertion-ordered key-value parcel.
///
/// Keys keep the order they were first inserted in, which matters for the
/// controller codec: parallel lists written together must read back in the
/// same order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    entries: IndexMap<String, StateValue>,
}

impl SavedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<StateValue> {
        self.entries.shift_remove(key)
    }

    pub fn put(&mut self, key: impl Into<String>, value: StateValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.put(key, StateValue::Bool(value));
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) {
        self.put(key, StateValue::Int(value));
    }

    pub fn put_int_list(&mut self, key: impl Into<String>, value: Vec<i64>) {
        self.put(key, StateValue::IntList(value));
    }

    pub fn put_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.put(key, StateValue::Str(value.into()));
    }

    pub fn put_str_list(&mut self, key: impl Into<String>, value: Vec<String>) {
        self.put(key, StateValue::StrList(value));
    }

    pub fn put_state(&mut self, key: impl Into<String>, value: SavedState) {
        self.put(key, StateValue::State(value));
    }

    pub fn put_state_list(&mut self, key: impl Into<String>, value: Vec<SavedState>) {
        self.put(key, StateValue::StateList(value));
    }

    pub fn get(&self, key: &str) -> Option<&StateValue> {
        self.entries.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key) {
            Some(StateValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(StateValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int_list(&self, key: &str) -> Option<&[i64]> {
        match self.entries.get(key) {
            Some(StateValue::IntList(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(StateValue::Str(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_str_list(&self, key: &str) -> Option<&[String]> {
        match self.entries.get(key) {
            Some(StateValue::StrList(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_state(&self, key: &str) -> Option<&SavedState> {
        match self.entries.get(key) {
            Some(StateValue::State(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_state_list(&self, key: &str) -> Option<&[SavedState]> {
        match self.entries.get(key) {
            Some(StateValue::StateList(v)) => Some(v),
            _ => None,
        }
    }

    /// Copies every entry of `other` into `self`, overwriting on key clash.
    pub fn merge_from(&mut self, other: &SavedState) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Builds a parcel in expression position.
///
/// ```
/// use rudder_core::saved_state;
///
/// let args = saved_state(|s| {
///     s.put_str("user", "aurelia");
///     s.put_int("tab", 2);
/// });
/// assert_eq!(args.get_int("tab"), Some(2));
/// ```
pub fn saved_state(build: impl FnOnce(&mut SavedState)) -> SavedState {
    let mut state = SavedState::new();
    build(&mut state);
    state
}
