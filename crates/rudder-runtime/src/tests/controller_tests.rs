use super::test_support::*;
use super::*;

use std::cell::Cell;
use std::rc::Rc;

use rudder_core::saved_state;

#[test]
fn setting_a_graph_lands_on_the_start_destination() {
    let controller = ready_controller();
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME]);
    assert_eq!(controller.current_destination(), Some(HOME));
}

#[test]
fn push_and_pop_walk_the_stack() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    controller.navigate(EXTRA).expect("navigate extra");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL, EXTRA]);

    assert!(controller.pop_back_stack_to(DETAIL, false));
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL]);

    assert!(controller.pop_back_stack_to(DETAIL, true));
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME]);
}

#[test]
fn no_arg_pop_removes_the_current_destination() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    assert!(controller.pop_back_stack());
    assert_eq!(controller.current_destination(), Some(HOME));
}

#[test]
fn popping_a_missing_destination_is_a_no_op() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    let before = dest_ids(&controller);

    assert!(!controller.pop_back_stack_to(DestinationId(999), false));
    assert!(!controller.pop_back_stack_to(DestinationId(999), true));
    assert_eq!(dest_ids(&controller), before);
}

#[test]
fn root_entry_leads_whenever_the_stack_is_nonempty() {
    let mut controller = ready_controller();
    let script: Vec<Box<dyn Fn(&mut NavController)>> = vec![
        Box::new(|c| c.navigate(DETAIL).unwrap()),
        Box::new(|c| c.navigate_route("library/book", None, None).unwrap()),
        Box::new(|c| {
            c.pop_back_stack_to(DETAIL, false);
        }),
        Box::new(|c| c.navigate(SHEET).unwrap()),
        Box::new(|c| {
            c.pop_back_stack();
        }),
        Box::new(|c| c.navigate(PROFILE).unwrap()),
    ];
    for step in script {
        step(&mut controller);
        let stack = controller.back_stack();
        if !stack.is_empty() {
            assert_eq!(stack[0].destination_id(), ROOT);
            assert!(stack
                .last()
                .unwrap()
                .max_lifecycle()
                .is_at_least(Lifecycle::Started));
        }
    }
}

#[test]
fn popping_the_whole_stack_leaves_it_empty() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    controller.pop_back_stack_to(HOME, true);
    assert!(controller.back_stack().is_empty());
    assert_eq!(controller.current_destination(), None);
}

#[test]
fn nested_leaf_synthesizes_its_graph_chain() {
    let mut controller = ready_controller();
    controller
        .navigate_route("library/book", None, None)
        .expect("navigate book");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, LIBRARY, BOOK]);

    // With the start screen popped away, the shape is [root, G, X].
    let mut controller = ready_controller();
    let options = NavOptions::builder().pop_up_to(HOME, true, false).build();
    controller
        .navigate_route("library/book", None, Some(options))
        .expect("navigate book");
    assert_eq!(dest_ids(&controller), vec![ROOT, LIBRARY, BOOK]);
}

#[test]
fn plain_id_navigation_does_not_reach_into_sibling_graphs() {
    // Ids resolve against the current graph chain only; a leaf nested in
    // a sibling graph needs its route (or its graph) instead.
    let mut controller = ready_controller();
    let err = controller.navigate(BOOK).unwrap_err();
    assert_eq!(err, NavigationError::DestinationNotFound { id: BOOK });

    // From inside the library graph the same id resolves fine.
    controller.navigate(LIBRARY).expect("navigate library");
    controller.navigate(BOOK).expect("navigate book");
    assert_eq!(controller.current_destination(), Some(BOOK));
}

#[test]
fn graph_targets_resolve_to_their_start_leaf() {
    let mut controller = ready_controller();
    controller.navigate(LIBRARY).expect("navigate library");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, LIBRARY, SHELF]);
}

#[test]
fn orphaned_graph_entries_are_popped_on_sibling_switch() {
    let mut controller = ready_controller();
    controller.navigate(LIBRARY).expect("navigate library");
    let options = NavOptions::builder().pop_up_to(SHELF, true, false).build();
    controller
        .navigate_with(PROFILE, None, Some(options))
        .expect("navigate profile");
    // The LIBRARY graph entry no longer connects to the new chain and is
    // gone along with its leaf.
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, PROFILE, PROFILE_HOME]);
}

#[test]
fn navigating_past_a_dialog_pops_it_first() {
    let mut controller = ready_controller();
    controller.navigate(SHEET).expect("navigate sheet");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, SHEET]);

    controller.navigate(DETAIL).expect("navigate detail");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL]);
}

#[test]
fn dialogs_stack_on_each_other() {
    let mut controller = ready_controller();
    controller.navigate(SHEET).expect("navigate sheet");
    controller.navigate(OVERLAY).expect("navigate overlay");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, SHEET, OVERLAY]);
}

#[test]
fn single_top_renews_arguments_without_reshaping_the_stack() {
    let mut controller = ready_controller();
    controller
        .navigate_with(DETAIL, Some(saved_state(|s| s.put_int("page", 1))), None)
        .expect("navigate detail");
    let before_id = controller.current_entry().unwrap().id();

    let options = NavOptions::builder().launch_single_top(true).build();
    controller
        .navigate_with(
            DETAIL,
            Some(saved_state(|s| s.put_int("page", 2))),
            Some(options),
        )
        .expect("single top");

    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL]);
    let current = controller.current_entry().unwrap();
    assert_eq!(current.id(), before_id);
    assert_eq!(current.args().get_int("page"), Some(2));
}

#[test]
fn single_top_on_a_graph_requires_the_exact_tail_hierarchy() {
    let mut controller = ready_controller();
    controller.navigate(LIBRARY).expect("navigate library");
    let shelf_id = controller.current_entry().unwrap().id();

    let options = NavOptions::builder().launch_single_top(true).build();
    controller
        .navigate_with(LIBRARY, None, Some(options.clone()))
        .expect("single top library");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, LIBRARY, SHELF]);
    assert_eq!(controller.current_entry().unwrap().id(), shelf_id);

    // With BOOK on top the tail no longer matches the graph's child
    // hierarchy, so a fresh instance is pushed instead.
    controller.navigate(BOOK).expect("navigate book");
    controller
        .navigate_with(LIBRARY, None, Some(options))
        .expect("navigate library again");
    assert_eq!(
        dest_ids(&controller),
        vec![ROOT, HOME, LIBRARY, SHELF, BOOK, LIBRARY, SHELF]
    );
}

#[test]
fn destination_zero_requires_a_pop_target() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");

    let err = controller.navigate(DestinationId::NONE).unwrap_err();
    assert_eq!(err, NavigationError::MissingPopTarget);

    let options = NavOptions::builder().pop_up_to(HOME, false, false).build();
    controller
        .navigate_with(DestinationId::NONE, None, Some(options))
        .expect("pure pop");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME]);
}

#[test]
fn unknown_destinations_are_a_caller_error() {
    let mut controller = ready_controller();
    let err = controller.navigate(DestinationId(999)).unwrap_err();
    assert_eq!(
        err,
        NavigationError::DestinationNotFound {
            id: DestinationId(999)
        }
    );
}

#[test]
fn actions_resolve_to_their_target_destination() {
    let mut controller = ready_controller();
    controller
        .navigate(DestinationId(OPEN_DETAIL.0))
        .expect("navigate via action id");
    assert_eq!(controller.current_destination(), Some(DETAIL));

    let mut controller = ready_controller();
    controller
        .navigate_action(OPEN_DETAIL, None, None)
        .expect("navigate via action");
    assert_eq!(controller.current_destination(), Some(DETAIL));

    let err = controller
        .navigate_action(ActionId(4242), None, None)
        .unwrap_err();
    assert_eq!(err, NavigationError::ActionNotFound(ActionId(4242)));
}

#[test]
fn routes_navigate_and_pop() {
    let mut controller = ready_controller();
    controller
        .navigate_route("detail", None, None)
        .expect("navigate by route");
    controller
        .navigate_route("library/book", None, None)
        .expect("navigate nested route");
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL, LIBRARY, BOOK]);

    assert!(controller.pop_back_stack_to("detail", false));
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL]);

    let err = controller
        .navigate_route("nowhere", None, None)
        .unwrap_err();
    assert_eq!(
        err,
        NavigationError::RouteNotFound {
            route: "nowhere".to_owned()
        }
    );
}

#[test]
fn unconfirmed_pops_halt_the_sequence() {
    let holding = Rc::new(HoldingNavigator::default());
    let mut controller = NavController::new();
    controller.register_navigator(holding.clone());
    controller.register_navigator(Rc::new(TransitionNavigator));
    controller.set_graph(sample_graph(), None).expect("graph");

    controller.navigate(HOLD).expect("navigate hold");
    controller.navigate(DETAIL).expect("navigate detail");

    // DETAIL confirms and pops; HOLD withholds confirmation, so the
    // sequence halts with HOLD still current.
    assert!(controller.pop_back_stack_to(HOME, false));
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, HOLD]);
    assert_eq!(holding.pending_pops().len(), 1);

    holding.set_defer(false);
    assert!(controller.pop_back_stack_to(HOME, false));
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME]);
}

#[test]
fn fully_deferred_pop_changes_nothing() {
    let holding = Rc::new(HoldingNavigator::default());
    let mut controller = NavController::new();
    controller.register_navigator(holding.clone());
    controller.register_navigator(Rc::new(TransitionNavigator));
    controller.set_graph(sample_graph(), None).expect("graph");
    controller.navigate(HOLD).expect("navigate hold");

    assert!(!controller.pop_back_stack_to(HOME, false));
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, HOLD]);
}

#[test]
fn listeners_fire_in_order_and_may_reenter() {
    let mut controller = ready_controller();
    let seen: Rc<std::cell::RefCell<Vec<DestinationId>>> = Rc::default();
    let fired = Rc::new(Cell::new(false));

    let listener: DestinationChangedListener = {
        let seen = Rc::clone(&seen);
        let fired = Rc::clone(&fired);
        Rc::new(move |controller, destination, _args| {
            seen.borrow_mut().push(destination);
            if destination == DETAIL && !fired.get() {
                fired.set(true);
                controller.navigate(EXTRA).expect("reentrant navigate");
            }
        })
    };
    let id = controller.add_on_destination_changed_listener(listener);
    controller.navigate(DETAIL).expect("navigate detail");

    assert_eq!(seen.borrow().as_slice(), &[HOME, DETAIL, EXTRA]);
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME, DETAIL, EXTRA]);

    controller.remove_on_destination_changed_listener(id);
    controller.pop_back_stack();
    assert_eq!(seen.borrow().len(), 3);
}

#[test]
fn back_stack_entry_lookup_and_previous_entry() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    controller
        .navigate_route("library/book", None, None)
        .expect("navigate book");

    let detail = controller.get_back_stack_entry(DETAIL).expect("detail entry");
    assert_eq!(detail.destination_id(), DETAIL);
    assert_eq!(
        controller.get_back_stack_entry(DestinationId(999)).unwrap_err(),
        NavigationError::EntryNotOnBackStack {
            id: DestinationId(999)
        }
    );

    // The previous entry skips the LIBRARY graph entry under BOOK.
    let previous = controller.previous_entry().expect("previous");
    assert_eq!(previous.destination_id(), DETAIL);
}

#[test]
fn navigator_initiated_pops_unwind_everything_above() {
    let mut controller = ready_controller();
    controller.navigate(DETAIL).expect("navigate detail");
    controller.navigate(EXTRA).expect("navigate extra");
    let detail = controller.get_back_stack_entry(DETAIL).expect("detail entry");

    controller.pop_back_stack_from_navigator(&detail);
    assert_eq!(dest_ids(&controller), vec![ROOT, HOME]);
}
