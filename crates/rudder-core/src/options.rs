//! Per-navigation options: single-top, state restoration, and pop-up-to.

use crate::destination::route_id;
use crate::DestinationId;

/// Types that carry a route pattern at the type level.
///
/// Implementing this lets a route value stand in for a destination wherever
/// a pop or navigate target is expected; the value lowers to the id derived
/// from its pattern.
pub trait Routed {
    const PATTERN: &'static str;

    fn destination_id() -> DestinationId {
        route_id(Self::PATTERN)
    }
}

/// Target of a pop operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopTarget {
    Id(DestinationId),
    Route(String),
}

impl PopTarget {
    pub fn routed<R: Routed>() -> Self {
        PopTarget::Id(R::destination_id())
    }
}

impl From<DestinationId> for PopTarget {
    fn from(id: DestinationId) -> Self {
        PopTarget::Id(id)
    }
}

impl From<&str> for PopTarget {
    fn from(route: &str) -> Self {
        PopTarget::Route(route.to_owned())
    }
}

impl From<String> for PopTarget {
    fn from(route: String) -> Self {
        PopTarget::Route(route)
    }
}

/// Options applied to a single navigate call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavOptions {
    single_top: bool,
    restore_state: bool,
    pop_up_to: Option<PopTarget>,
    pop_up_to_inclusive: bool,
    pop_up_to_save_state: bool,
}

impl NavOptions {
    pub fn builder() -> NavOptionsBuilder {
        NavOptionsBuilder::default()
    }

    pub fn should_launch_single_top(&self) -> bool {
        self.single_top
    }

    pub fn should_restore_state(&self) -> bool {
        self.restore_state
    }

    pub fn pop_up_to(&self) -> Option<&PopTarget> {
        self.pop_up_to.as_ref()
    }

    pub fn is_pop_up_to_inclusive(&self) -> bool {
        self.pop_up_to_inclusive
    }

    pub fn should_pop_up_to_save_state(&self) -> bool {
        self.pop_up_to_save_state
    }
}

#[derive(Debug, Clone, Default)]
pub struct NavOptionsBuilder {
    options: NavOptions,
}

impl NavOptionsBuilder {
    pub fn launch_single_top(mut self, single_top: bool) -> Self {
        self.options.single_top = single_top;
        self
    }

    pub fn restore_state(mut self, restore_state: bool) -> Self {
        self.options.restore_state = restore_state;
        self
    }

    /// Pop up to `target` before navigating. `inclusive` also removes the
    /// target itself; `save_state` snapshots the popped run for a later
    /// `restore_state` navigation.
    pub fn pop_up_to(
        mut self,
        target: impl Into<PopTarget>,
        inclusive: bool,
        save_state: bool,
    ) -> Self {
        self.options.pop_up_to = Some(target.into());
        self.options.pop_up_to_inclusive = inclusive;
        self.options.pop_up_to_save_state = save_state;
        self
    }

    pub fn build(self) -> NavOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Settings;

    impl Routed for Settings {
        const PATTERN: &'static str = "settings";
    }

    #[test]
    fn routed_targets_lower_to_pattern_ids() {
        assert_eq!(
            PopTarget::routed::<Settings>(),
            PopTarget::Id(route_id("settings"))
        );
    }

    #[test]
    fn builder_defaults_are_off() {
        let options = NavOptions::builder().build();
        assert!(!options.should_launch_single_top());
        assert!(!options.should_restore_state());
        assert!(options.pop_up_to().is_none());
    }
}
