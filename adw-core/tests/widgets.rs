//! Widget Scenarios
//!
//! End to end checks of the four controllers through their host facing
//! surface: attributes in, events and view snapshots out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use adw_core::element::{
    ChangeDetail, Document, ElementOptions, EventContext, Key, PointerInput, Rect, Widget, WidgetEvent,
};
use adw_core::util::{change_with_step, fuzzy_cmp, fuzzy_search, prefix_search};
use adw_core::widgets::{Input, Selector, SelectorOption, Slider, Switch};

fn connect<W: Widget>(widget: &W, attrs: &[(&str, &str)]) -> Document {
    for (name, value) in attrs {
        widget.set_attribute(name, Some(value)).unwrap();
    }
    let document = Document::new();
    widget.connect(&document);
    document
}

fn count_changes<W: Widget>(widget: &W) -> (Arc<AtomicUsize>, adw_core::reactive::Subscription) {
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();
    let sub = widget.on_event(move |ctx: &mut EventContext<'_>| {
        if matches!(ctx.event(), WidgetEvent::Change(_)) {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }
    });
    (count, sub)
}

#[test]
fn fuzzy_results_contain_prefix_results() {
    let lists: [&[&str]; 3] = [
        &["apple", "Apricot", "banana", "grape"],
        &["Alpha", "beta", "ALPHABET", ""],
        &["xaxbxc", "abc", "acb", "cab"],
    ];
    let queries = ["", "a", "AP", "ab", "abc", "zz", "b"];

    for list in lists {
        let list: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        for query in queries {
            let fuzzy = fuzzy_search(&list, query);
            for hit in prefix_search(&list, query) {
                assert!(fuzzy.contains(&hit), "{hit:?} missing from fuzzy results for {query:?}");
            }
        }
    }
}

#[test]
fn fuzzy_cmp_is_ordered_subsequence() {
    assert!(fuzzy_cmp("abc", "xaxbxc"));
    assert!(!fuzzy_cmp("abc", "acb"));
    assert!(fuzzy_cmp("ABC", "xaxbxc"));
}

#[test]
fn step_rounding_is_relative_to_previous_value() {
    assert_eq!(change_with_step(50.0, 53.0, 5.0), 50.0);
    assert_eq!(change_with_step(50.0, 56.0, 5.0), 55.0);
}

#[test]
fn input_offers_prefix_matches_and_reverses_upward() {
    let input = Input::new(ElementOptions::default()).unwrap();
    let _doc = connect(
        &input,
        &[("suggestions", "apple;apricot;banana"), ("value", "ap")],
    );
    assert_eq!(input.options(), vec!["apple", "apricot"]);

    input.set_attribute("suggestionsOrientation", Some("up")).unwrap();
    assert_eq!(input.options(), vec!["apricot", "apple"]);
}

#[test]
fn slider_keyboard_scenario() {
    let slider = Slider::new(ElementOptions::default()).unwrap();
    slider.set_layout(Some(Rect::new(0.0, 0.0, 100.0, 10.0)));
    let doc = connect(&slider, &[("min", "0"), ("max", "10"), ("step", "2"), ("value", "4")]);

    slider.key_down(Key::ArrowRight);
    assert_eq!(slider.value(), 6.0);

    // Drag to 9 with a step of 1, then go back to steps of 2.
    slider.set_attribute("step", Some("1")).unwrap();
    slider.pointer_down(PointerInput::primary(90.0, 5.0));
    doc.pointer_up(PointerInput::primary(90.0, 5.0));
    assert_eq!(slider.value(), 9.0);

    slider.set_attribute("step", Some("2")).unwrap();
    slider.key_down(Key::ArrowRight);
    assert_eq!(slider.value(), 10.0);
}

#[test]
fn slider_drags_stay_in_bounds() {
    let slider = Slider::new(ElementOptions::default()).unwrap();
    slider.set_layout(Some(Rect::new(20.0, 0.0, 200.0, 10.0)));
    let doc = connect(&slider, &[("min", "-5"), ("max", "5"), ("step", "0.5")]);

    slider.pointer_down(PointerInput::primary(25.0, 5.0));
    for x in [-300.0, 0.0, 47.3, 119.0, 221.0, 900.0, 133.3] {
        doc.pointer_move(PointerInput::primary(x, 5.0));
        let value = slider.value();
        assert!((-5.0..=5.0).contains(&value), "{value} escaped the range at x={x}");
    }
    doc.pointer_up(PointerInput::primary(133.3, 5.0));
}

#[test]
fn disabled_switch_never_flips() {
    let switch = Switch::new(ElementOptions::default()).unwrap();
    let _doc = connect(&switch, &[("disabled", "")]);
    let (changes, _sub) = count_changes(&switch);

    for _ in 0..3 {
        switch.click();
        switch.key_down(Key::Space);
    }
    switch.flush();

    assert!(!switch.active());
    assert!(!switch.view().active);
    assert_eq!(changes.load(Ordering::SeqCst), 0);
}

#[test]
fn selector_forced_value_without_match_ends_unset() {
    let selector = Selector::new(ElementOptions::default()).unwrap();
    selector.set_children(vec![
        SelectorOption::new("one", "One").selected(),
        SelectorOption::new("two", "Two"),
    ]);
    let _doc = connect(&selector, &[]);
    assert_eq!(selector.value().as_deref(), Some("one"));

    selector.set_attribute("value", Some("three")).unwrap();
    selector.flush();

    assert_eq!(selector.value(), None);
    assert!(selector.children().iter().all(|o| !o.is_selected()));
    assert_eq!(selector.view().label, None);
}

#[test]
fn selector_reconciliation_is_idempotent() {
    let selector = Selector::new(ElementOptions::default()).unwrap();
    selector.set_children(vec![
        SelectorOption::new("a", "A").selected(),
        SelectorOption::without_value("Group").inert(),
        SelectorOption::new("b", "B").selected(),
    ]);
    let _doc = connect(&selector, &[]);

    let snapshot = |s: &Selector| {
        (
            s.value(),
            s.children().iter().map(SelectorOption::is_selected).collect::<Vec<_>>(),
        )
    };
    selector.reconcile();
    let first = snapshot(&selector);
    selector.reconcile();
    assert_eq!(snapshot(&selector), first);
}

#[test]
fn selector_emits_change_on_option_click() {
    let selector = Selector::new(ElementOptions::default()).unwrap();
    selector.set_children(vec![
        SelectorOption::new("a", "A"),
        SelectorOption::new("b", "B"),
    ]);
    let _doc = connect(&selector, &[]);
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let _sub = selector.on_event(move |ctx: &mut EventContext<'_>| {
        if let WidgetEvent::Change(ChangeDetail::Selector { value }) = ctx.event() {
            seen_clone.lock().push(value.clone());
        }
    });

    selector.click();
    selector.flush();
    let b = selector.children()[1].clone();
    selector.option_click(&b);
    selector.flush();

    assert_eq!(*seen.lock(), vec![Some("b".to_owned())]);
    assert!(!selector.is_open());
    assert_eq!(selector.view().label.as_deref(), Some("B"));
}

#[test]
fn disconnect_releases_document_listeners() {
    let selector = Selector::new(ElementOptions::default()).unwrap();
    selector.set_children(vec![SelectorOption::new("a", "A")]);
    let doc = connect(&selector, &[]);
    selector.click();
    selector.flush();
    assert_eq!(doc.listener_count(), 1);

    let slider = Slider::new(ElementOptions::default()).unwrap();
    slider.connect(&doc);
    assert_eq!(doc.listener_count(), 3);

    selector.disconnect();
    slider.disconnect();
    assert_eq!(doc.listener_count(), 0);
    assert!(!selector.is_open());
}

#[test]
fn immediate_effects_see_the_previous_view_and_deferred_the_new_one() {
    let switch = Switch::new(ElementOptions::default()).unwrap();
    let _doc = connect(&switch, &[]);
    let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

    let store = switch.core().store();
    let (observer, log) = (switch.clone(), seen.clone());
    let _immediate = store
        .immediate_effect(Some(&["active"]), move || {
            log.lock().push(("immediate", observer.view().active));
        })
        .unwrap();
    let (observer, log) = (switch.clone(), seen.clone());
    let _deferred = store
        .effect(Some(&["active"]), move || {
            log.lock().push(("deferred", observer.view().active));
        })
        .unwrap();

    switch.click();
    switch.flush();

    assert_eq!(*seen.lock(), vec![("immediate", false), ("deferred", true)]);
}

#[test]
fn connecting_twice_registers_once() {
    let selector = Selector::new(ElementOptions::default()).unwrap();
    selector.set_children(vec![SelectorOption::new("a", "A")]);
    let doc = connect(&selector, &[]);
    let effects = selector.core().scheduler().effect_count();

    selector.connect(&doc);
    assert_eq!(selector.core().scheduler().effect_count(), effects);

    selector.click();
    selector.flush();
    assert_eq!(doc.listener_count(), 1);
}
