use super::test_support::*;
use super::*;

use std::rc::Rc;

use rudder_core::saved_state;

#[test]
fn popped_substack_round_trips_through_save_and_restore() {
    let mut controller = ready_controller();
    controller
        .navigate_with(DETAIL, Some(saved_state(|s| s.put_str("item", "42"))), None)
        .expect("navigate detail");
    controller
        .navigate_route(
            "library/book",
            Some(saved_state(|s| s.put_str("title", "voyage"))),
            None,
        )
        .expect("navigate book");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL, LIBRARY, BOOK]);

    assert!(controller.pop_back_stack_saving(DETAIL, false, true));
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL]);

    let options = NavOptions::builder().restore_state(true).build();
    controller
        .navigate_with(LIBRARY, None, Some(options))
        .expect("restore library stack");

    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL, LIBRARY, BOOK]);
    let book = controller.current_entry().expect("book entry");
    assert_eq!(book.args().get_str("title"), Some("voyage"));
}

#[test]
fn restore_without_saved_state_falls_through_to_a_push() {
    let mut controller = ready_controller();
    let options = NavOptions::builder().restore_state(true).build();
    controller
        .navigate_with(DETAIL, None, Some(options))
        .expect("navigate detail");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL]);
}

#[test]
fn cleared_back_stacks_cannot_be_restored() {
    let mut controller = ready_controller();
    controller
        .navigate_route("library/book", None, None)
        .expect("navigate book");
    controller.pop_back_stack_saving(HOME, false, true);

    assert!(controller.clear_back_stack(LIBRARY));
    assert!(!controller.clear_back_stack(LIBRARY));

    // With the saved run gone the navigation is a plain push to the
    // graph's start destination.
    let options = NavOptions::builder().restore_state(true).build();
    controller
        .navigate_with(LIBRARY, None, Some(options))
        .expect("navigate library");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, LIBRARY, SHELF]);
}

#[test]
fn controller_state_survives_the_codec() {
    let persisting = Rc::new(PersistingNavigator::new(
        "persist",
        saved_state(|s| s.put_int("cursor", 9)),
    ));
    let mut controller = NavController::new();
    controller.register_navigator(persisting);
    controller.set_graph(sample_graph(), None).expect("graph");

    controller
        .navigate_with(DETAIL, Some(saved_state(|s| s.put_int("page", 7))), None)
        .expect("navigate detail");
    controller
        .navigate_route(
            "library/book",
            Some(saved_state(|s| s.put_str("title", "voyage"))),
            None,
        )
        .expect("navigate book");
    controller.pop_back_stack_saving(DETAIL, false, true);

    let blob = controller.save_state().expect("state to persist");
    assert!(blob.contains(KEY_BACK_STACK));
    assert!(blob.contains(KEY_BACK_STACK_DEST_IDS));
    assert!(blob.contains(KEY_NAVIGATOR_STATE));

    // Hosts persist the blob with any serde format.
    let json = serde_json::to_string(&blob).expect("serialize");
    let blob: rudder_core::SavedState = serde_json::from_str(&json).expect("deserialize");

    let restored_navigator = Rc::new(PersistingNavigator::new("persist", SavedState::new()));
    let mut revived = NavController::new();
    let revived_navigator: Rc<dyn crate::navigator::Navigator> = restored_navigator.clone();
    revived.register_navigator(revived_navigator);
    revived.restore_state(&blob);
    revived.set_graph(sample_graph(), None).expect("graph");

    assert_eq!(dest_ids(&revived), vec![ROOT, HOME, DETAIL]);
    let detail = revived.get_back_stack_entry(DETAIL).expect("detail");
    assert_eq!(detail.args().get_int("page"), Some(7));
    assert_eq!(
        restored_navigator
            .restored()
            .expect("navigator state restored")
            .get_int("cursor"),
        Some(9)
    );

    // The saved library run came through the codec too.
    let options = NavOptions::builder().restore_state(true).build();
    revived
        .navigate_with(LIBRARY, None, Some(options))
        .expect("restore library stack");
    assert_eq!(dest_ids(&revived), vec![ROOT, HOME, DETAIL, LIBRARY, BOOK]);
    let book = revived.current_entry().expect("book");
    assert_eq!(book.args().get_str("title"), Some("voyage"));
}

#[test]
fn fresh_controllers_have_nothing_to_save() {
    let controller = NavController::new();
    assert!(controller.save_state().is_none());
}

#[test]
fn snapshot_parcels_reject_malformed_input() {
    let snapshot = EntrySnapshot {
        entry_id: 12,
        destination_id: DestinationId(7),
        args: saved_state(|s| s.put_bool("flag", true)),
    };
    let parcel = snapshot.to_saved_state();
    assert_eq!(EntrySnapshot::from_saved_state(&parcel), Some(snapshot));

    let empty = SavedState::new();
    assert_eq!(EntrySnapshot::from_saved_state(&empty), None);

    let negative = saved_state(|s| {
        s.put_int("id", 3);
        s.put_int("destId", -4);
    });
    assert_eq!(EntrySnapshot::from_saved_state(&negative), None);
}

#[test]
fn retained_state_follows_entry_destruction_rules() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    let detail_id = controller.current_entry().expect("detail").id();
    controller
        .retained_state(detail_id)
        .put_str("draft", "unsent");

    // Popped with save_state: the retained state survives for restore.
    controller.pop_back_stack_saving(HOME, false, true);
    assert!(controller.has_retained_state(detail_id));

    let options = NavOptions::builder().restore_state(true).build();
    controller
        .navigate_with(DETAIL, None, Some(options))
        .expect("restore detail");
    assert_eq!(controller.current_entry().expect("detail").id(), detail_id);
    assert_eq!(
        controller.retained_state(detail_id).get_str("draft"),
        Some("unsent")
    );

    // Popped for good: the retained state is cleared.
    controller.pop_back_stack();
    assert!(!controller.has_retained_state(detail_id));
}
