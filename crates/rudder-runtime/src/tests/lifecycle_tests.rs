use super::test_support::*;
use super::*;

use std::rc::Rc;

fn lifecycle_of(controller: &NavController, id: DestinationId) -> Lifecycle {
    controller
        .get_back_stack_entry(id)
        .expect("entry on stack")
        .max_lifecycle()
}

#[test]
fn only_the_tail_is_resumed_on_a_plain_stack() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");

    assert_eq!(lifecycle_of(&controller, DETAIL), Lifecycle::Resumed);
    assert_eq!(lifecycle_of(&controller, HOME), Lifecycle::Created);
    // The parent graph entry resumes alongside its active child.
    assert_eq!(lifecycle_of(&controller, ROOT), Lifecycle::Resumed);
}

#[test]
fn floating_windows_cap_the_screen_below_at_started() {
    let mut controller = ready_controller();
    controller.navigate(SHEET).expect("navigate sheet");

    assert_eq!(lifecycle_of(&controller, SHEET), Lifecycle::Resumed);
    assert_eq!(lifecycle_of(&controller, HOME), Lifecycle::Started);
    assert_eq!(lifecycle_of(&controller, ROOT), Lifecycle::Resumed);

    // Dismissing the sheet resumes the screen again.
    controller.pop_back_stack();
    assert_eq!(lifecycle_of(&controller, HOME), Lifecycle::Resumed);
}

#[test]
fn stacked_dialogs_extend_the_started_layer_downward() {
    let mut controller = ready_controller();
    controller.navigate(SHEET).expect("navigate sheet");
    controller.navigate(OVERLAY).expect("navigate overlay");

    // OVERLAY is a supporting floating window: it shares Resumed with the
    // floating SHEET below it, while the plain screen underneath stays
    // Started.
    assert_eq!(lifecycle_of(&controller, OVERLAY), Lifecycle::Resumed);
    assert_eq!(lifecycle_of(&controller, SHEET), Lifecycle::Resumed);
    assert_eq!(lifecycle_of(&controller, HOME), Lifecycle::Started);
}

#[test]
fn supporting_panes_share_resumed_with_the_screen_below() {
    let mut controller = ready_controller();
    controller.navigate(SIDEBAR).expect("navigate sidebar");

    assert_eq!(lifecycle_of(&controller, SIDEBAR), Lifecycle::Resumed);
    assert_eq!(lifecycle_of(&controller, HOME), Lifecycle::Resumed);
}

#[test]
fn supporting_floating_windows_do_not_resume_plain_screens() {
    let mut controller = ready_controller();
    controller.navigate(OVERLAY).expect("navigate overlay");

    // OVERLAY supports only other floating windows; HOME is plain, so the
    // promotion stops and HOME stays Started.
    assert_eq!(lifecycle_of(&controller, OVERLAY), Lifecycle::Resumed);
    assert_eq!(lifecycle_of(&controller, HOME), Lifecycle::Started);
}

#[test]
fn popped_entries_are_destroyed_with_their_graph_entries() {
    let mut controller = ready_controller();
    controller.navigate(LIBRARY).expect("navigate library");
    let shelf = controller.get_back_stack_entry(SHELF).expect("shelf");
    let library = controller.get_back_stack_entry(LIBRARY).expect("library");

    controller.pop_back_stack_to(HOME, false);
    assert_eq!(shelf.max_lifecycle(), Lifecycle::Destroyed);
    assert_eq!(library.max_lifecycle(), Lifecycle::Destroyed);
    assert_eq!(lifecycle_of(&controller, HOME), Lifecycle::Resumed);
}

#[test]
fn transitioning_entries_are_held_at_created_until_completion() {
    let mut controller = ready_controller();
    controller.navigate(FADE).expect("navigate fade");
    let fade = controller.current_entry().expect("fade entry").clone();

    controller.pop_back_stack();
    // Confirmed with a transition: off the stack but not yet destroyed.
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME]);
    assert_eq!(fade.max_lifecycle(), Lifecycle::Created);
    assert!(controller
        .visible_entries()
        .iter()
        .any(|entry| entry.id() == fade.id()));

    controller.mark_transition_complete(&fade);
    assert_eq!(fade.max_lifecycle(), Lifecycle::Destroyed);
    assert!(!controller
        .visible_entries()
        .iter()
        .any(|entry| entry.id() == fade.id()));
}

#[test]
fn visible_entries_exclude_graphs_and_created_entries() {
    let mut controller = ready_controller();
    controller
        .navigate_route("library/book", None, None)
        .expect("navigate book");
    controller.navigate(SHEET).expect("navigate sheet");

    let visible: Vec<DestinationId> = controller
        .visible_entries()
        .iter()
        .map(|entry| entry.destination_id())
        .collect();
    // The sheet floats above BOOK; HOME and the LIBRARY graph entry are
    // neither visible nor listed.
    assert!(visible.contains(&SHEET));
    assert!(visible.contains(&BOOK));
    assert!(!visible.contains(&LIBRARY));
    assert!(!visible.contains(&HOME));
}

#[test]
fn prepare_for_transition_pins_an_entry_at_started() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    let detail = controller.current_entry().expect("detail").clone();

    assert!(controller.prepare_for_transition(&detail));
    assert_eq!(detail.max_lifecycle(), Lifecycle::Started);

    let stray = Rc::clone(&detail);
    controller.pop_back_stack();
    assert!(!controller.prepare_for_transition(&stray));
}
