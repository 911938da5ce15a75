//! Slider
//!
//! Maps a bounded number to a thumb position. A primary button press
//! starts a drag that follows document level pointer moves until the
//! pointer is released anywhere, so the drag survives leaving the element.
//! Dragged positions are truncated to `precision` decimals, then moved
//! from the previous value in whole steps. Every committed value is
//! clamped to `[min, max]`.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, trace};

use crate::element::{
    ChangeDetail, Document, ElementCore, ElementOptions, GlobalEvent, GlobalEventKind, Key,
    NativeAction, PointerButton, PointerInput, Widget, WidgetEvent,
};
use crate::error::Result;
use crate::reactive::{Derived, Property, PropertyDescriptor, Subscription};
use crate::util::{change_with_step, clamp, to_precision, MAX_PRECISION};

use super::{install_render, Controller};

pub const DEFAULT_MIN: f64 = 0.0;
pub const DEFAULT_MAX: f64 = 100.0;
pub const DEFAULT_STEP: f64 = 1.0;
pub const DEFAULT_PRECISION: u32 = 4;

static PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::attribute("value", "value"),
    PropertyDescriptor::attribute("min", "min"),
    PropertyDescriptor::attribute("max", "max"),
    PropertyDescriptor::attribute("step", "step"),
    PropertyDescriptor::attribute("precision", "precision"),
    PropertyDescriptor::attribute("disabled", "disabled"),
    PropertyDescriptor::attribute("name", "name"),
    PropertyDescriptor::attribute("form", "form"),
    PropertyDescriptor::state("pressed"),
    PropertyDescriptor::derived("positions"),
];

/// Thumb and progress bar placement, derived from value and bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Positions {
    pub percent: f64,
    /// CSS `right` of the progress bar.
    pub progress_right: String,
    /// CSS `left` of the thumb.
    pub thumb_left: String,
}

impl Positions {
    fn compute(value: f64, min: f64, max: f64) -> Self {
        let span = max - min;
        let percent = if span > 0.0 {
            (value - min) / span * 100.0
        } else {
            0.0
        };
        Self {
            percent,
            progress_right: format!("{}%", 100.0 - percent),
            thumb_left: format!("calc({percent}% - 0.3em)"),
        }
    }
}

/// Hidden range input kept in sync for form submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeMirror {
    pub value: f64,
    pub min: String,
    pub max: String,
    pub step: String,
    pub disabled: bool,
    pub name: Option<String>,
    pub form: Option<String>,
}

/// Render snapshot of a slider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SliderView {
    pub role: &'static str,
    pub disabled: bool,
    pub pressed: bool,
    pub positions: Positions,
    pub aria_valuemin: f64,
    pub aria_valuemax: f64,
    pub aria_valuenow: f64,
    pub range: RangeMirror,
}

struct SliderInner {
    core: ElementCore,
    value: Property<Option<f64>>,
    min: Property<Option<f64>>,
    max: Property<Option<f64>>,
    step: Property<Option<f64>>,
    precision: Property<Option<f64>>,
    disabled: Property<bool>,
    name: Property<Option<String>>,
    form: Property<Option<String>>,
    pressed: Property<bool>,
    positions: Derived<Positions>,
    _clamp: Subscription,
    view: RwLock<SliderView>,
}

fn markup_number(value: f64) -> String {
    value.to_string()
}

impl Controller for SliderInner {
    type View = SliderView;

    fn core(&self) -> &ElementCore {
        &self.core
    }

    fn view_cell(&self) -> &RwLock<SliderView> {
        &self.view
    }

    fn render(&self) -> SliderView {
        let (value, min, max) = (self.current(), self.min(), self.max());
        let disabled = self.disabled.get();
        SliderView {
            role: "slider",
            disabled,
            pressed: self.pressed.get(),
            positions: self.positions.get(),
            aria_valuemin: min,
            aria_valuemax: max,
            aria_valuenow: value,
            range: RangeMirror {
                value,
                min: markup_number(min),
                max: markup_number(max),
                step: markup_number(self.step()),
                disabled,
                name: self.name.get(),
                form: self.form.get(),
            },
        }
    }
}

impl SliderInner {
    fn current(&self) -> f64 {
        self.value.get().unwrap_or(0.0)
    }

    fn min(&self) -> f64 {
        self.min.get().unwrap_or(DEFAULT_MIN)
    }

    fn max(&self) -> f64 {
        self.max.get().unwrap_or(DEFAULT_MAX)
    }

    fn step(&self) -> f64 {
        self.step.get().unwrap_or(DEFAULT_STEP)
    }

    fn precision(&self) -> u32 {
        self.precision
            .get()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .map_or(DEFAULT_PRECISION, |p| p.min(f64::from(MAX_PRECISION)) as u32)
    }

    /// Clamp and commit; emits `change` only when the value moved.
    fn set_value(&self, value: f64) -> bool {
        if !value.is_finite() {
            trace!(value, "ignoring non-finite slider value");
            return false;
        }
        let value = clamp(value, self.min(), self.max());
        if self.value.get() == Some(value) {
            return false;
        }
        self.value.set(Some(value));
        let _ = self.core.emit(WidgetEvent::Change(ChangeDetail::Slider {
            value: self.current(),
        }));
        true
    }

    fn pointer_move(&self, input: &PointerInput) {
        if self.disabled.get() || !self.pressed.get() {
            return;
        }
        let Some(rect) = self.core.layout() else {
            return;
        };
        if rect.width <= 0.0 {
            return;
        }

        let (min, max) = (self.min(), self.max());
        let percent = (input.x - rect.left) / rect.width;
        let target = to_precision(min + percent * (max - min), self.precision());
        let next = change_with_step(self.current(), target, self.step());
        trace!(percent, target, next, "slider drag");
        self.set_value(next);
    }

    fn pointer_up(&self) {
        self.pressed.set(false);
    }
}

/// Range slider widget.
#[derive(Clone)]
pub struct Slider {
    inner: Arc<SliderInner>,
}

impl Slider {
    pub fn new(options: ElementOptions) -> Result<Self> {
        let mut core = ElementCore::new(PROPERTIES, options)?;
        let store = core.store_mut();
        let value: Property<Option<f64>> = store.attribute("value", None)?;
        let min: Property<Option<f64>> = store.attribute("min", None)?;
        let max: Property<Option<f64>> = store.attribute("max", None)?;
        let step = store.attribute("step", None)?;
        let precision = store.attribute("precision", None)?;
        let disabled = store.attribute("disabled", false)?;
        let name = store.attribute("name", None)?;
        let form = store.attribute("form", None)?;
        let pressed = store.state("pressed", false)?;

        let (v, lo, hi) = (value.clone(), min.clone(), max.clone());
        let positions = store.derive("positions", &[&value, &min, &max], move || {
            Positions::compute(
                v.get().unwrap_or(0.0),
                lo.get().unwrap_or(DEFAULT_MIN),
                hi.get().unwrap_or(DEFAULT_MAX),
            )
        })?;

        // Out of range commits are pulled back into bounds.
        let (v, lo, hi) = (value.clone(), min.clone(), max.clone());
        let clamp_listener = value.on_change(move |current| {
            let current = current.unwrap_or(0.0);
            let max = hi.get().unwrap_or(DEFAULT_MAX);
            let min = lo.get().unwrap_or(DEFAULT_MIN);
            if current > max {
                v.set(Some(max));
            } else if current < min {
                v.set(Some(min));
            }
        });

        let inner = Arc::new(SliderInner {
            core,
            value,
            min,
            max,
            step,
            precision,
            disabled,
            name,
            form,
            pressed,
            positions,
            _clamp: clamp_listener,
            view: RwLock::default(),
        });
        install_render(&inner);

        Ok(Self { inner })
    }

    /// The committed value; unset reads as zero.
    pub fn value(&self) -> f64 {
        self.inner.current()
    }

    /// Clamp into bounds and commit. Returns whether the value changed.
    pub fn set_value(&self, value: f64) -> bool {
        self.inner.set_value(value)
    }

    pub fn min(&self) -> f64 {
        self.inner.min()
    }

    pub fn max(&self) -> f64 {
        self.inner.max()
    }

    pub fn step(&self) -> f64 {
        self.inner.step()
    }

    pub fn is_pressed(&self) -> bool {
        self.inner.pressed.get()
    }

    pub fn positions(&self) -> Positions {
        self.inner.positions.get()
    }

    /// Pointer pressed on the slider. Only the primary button starts a
    /// drag, and the press itself already moves the thumb.
    pub fn pointer_down(&self, input: PointerInput) -> NativeAction {
        let _ = self
            .inner
            .core
            .emit(WidgetEvent::PointerDown {
                button: input.button,
                x: input.x,
            })
            .on_commit(|| {
                if input.button == PointerButton::Primary {
                    self.inner.pressed.set(true);
                    self.inner.pointer_move(&input);
                }
            });
        NativeAction::STOP
    }

    pub fn key_down(&self, key: Key) -> NativeAction {
        if self.inner.disabled.get() {
            return NativeAction::NONE;
        }

        let direction = match key {
            Key::ArrowLeft => -1.0,
            Key::ArrowRight => 1.0,
            _ => return NativeAction::NONE,
        };
        let _ = self
            .inner
            .core
            .emit(WidgetEvent::KeyDown { key })
            .on_commit(|| {
                let next = self.inner.current() + direction * self.inner.step();
                self.inner.set_value(next);
            });
        NativeAction::STOP
    }
}

impl Widget for Slider {
    type View = SliderView;

    fn core(&self) -> &ElementCore {
        &self.inner.core
    }

    fn connect(&self, document: &Document) {
        let core = &self.inner.core;
        if core.is_connected() {
            debug!(element = ?core.id(), "already connected");
            return;
        }

        let weak: Weak<SliderInner> = Arc::downgrade(&self.inner);
        core.hold(document.listen(GlobalEventKind::PointerMove, move |event| {
            if let (Some(inner), GlobalEvent::PointerMove(input)) = (weak.upgrade(), event) {
                inner.pointer_move(input);
            }
        }));

        let weak: Weak<SliderInner> = Arc::downgrade(&self.inner);
        core.hold(document.listen(GlobalEventKind::PointerUp, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.pointer_up();
            }
        }));

        core.attach(document);
    }

    fn disconnect(&self) {
        self.inner.pressed.set(false);
        self.inner.core.detach();
    }

    fn view(&self) -> SliderView {
        self.inner.view.read().clone()
    }
}

impl std::fmt::Debug for Slider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slider")
            .field("value", &self.value())
            .field("min", &self.min())
            .field("max", &self.max())
            .field("pressed", &self.is_pressed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{EventContext, Rect};
    use parking_lot::Mutex;

    fn slider(attrs: &[(&str, &str)]) -> (Slider, Document) {
        let slider = Slider::new(ElementOptions::default()).unwrap();
        for (name, value) in attrs {
            slider.set_attribute(name, Some(value)).unwrap();
        }
        slider.set_layout(Some(Rect::new(0.0, 0.0, 100.0, 20.0)));
        let document = Document::new();
        slider.connect(&document);
        (slider, document)
    }

    #[test]
    fn defaults() {
        let (slider, _doc) = slider(&[]);
        assert_eq!(slider.value(), 0.0);
        assert_eq!(slider.min(), 0.0);
        assert_eq!(slider.max(), 100.0);
        assert_eq!(slider.step(), 1.0);
    }

    #[test]
    fn arrow_keys_move_by_step() {
        let (slider, _doc) = slider(&[("min", "0"), ("max", "10"), ("step", "2"), ("value", "4")]);

        assert_eq!(slider.key_down(Key::ArrowRight), NativeAction::STOP);
        assert_eq!(slider.value(), 6.0);
        slider.key_down(Key::ArrowLeft);
        slider.key_down(Key::ArrowLeft);
        assert_eq!(slider.value(), 2.0);
        assert_eq!(slider.key_down(Key::ArrowUp), NativeAction::NONE);
    }

    #[test]
    fn arrow_past_max_clamps() {
        let (slider, _doc) = slider(&[("min", "0"), ("max", "10"), ("step", "2"), ("value", "9")]);
        slider.key_down(Key::ArrowRight);
        assert_eq!(slider.value(), 10.0);
    }

    #[test]
    fn out_of_range_attribute_is_clamped() {
        let (slider, _doc) = slider(&[("max", "10")]);
        slider.set_attribute("value", Some("42")).unwrap();
        assert_eq!(slider.value(), 10.0);
        slider.set_attribute("value", Some("-3")).unwrap();
        assert_eq!(slider.value(), 0.0);
    }

    #[test]
    fn drag_snaps_relative_to_previous_value() {
        let (slider, doc) = slider(&[("step", "5"), ("value", "50")]);

        slider.pointer_down(PointerInput::primary(53.0, 5.0));
        assert!(slider.is_pressed());
        assert_eq!(slider.value(), 50.0);

        doc.pointer_move(PointerInput::primary(61.0, 5.0));
        assert_eq!(slider.value(), 60.0);

        doc.pointer_up(PointerInput::primary(61.0, 5.0));
        assert!(!slider.is_pressed());
        doc.pointer_move(PointerInput::primary(90.0, 5.0));
        assert_eq!(slider.value(), 60.0);
    }

    #[test]
    fn drag_beyond_element_stays_in_bounds() {
        let (slider, doc) = slider(&[]);
        slider.pointer_down(PointerInput::primary(10.0, 5.0));
        doc.pointer_move(PointerInput::primary(400.0, 5.0));
        assert_eq!(slider.value(), 100.0);
        doc.pointer_move(PointerInput::primary(-400.0, 5.0));
        assert_eq!(slider.value(), 0.0);
    }

    #[test]
    fn oversized_precision_still_drags_in_bounds() {
        for precision in ["400", "1e10"] {
            let (slider, doc) = slider(&[("precision", precision)]);
            slider.pointer_down(PointerInput::primary(50.0, 5.0));
            assert_eq!(slider.value(), 50.0, "precision={precision}");
            doc.pointer_move(PointerInput::primary(25.0, 5.0));
            assert_eq!(slider.value(), 25.0, "precision={precision}");
            doc.pointer_up(PointerInput::primary(25.0, 5.0));
        }
    }

    #[test]
    fn connecting_twice_registers_once() {
        let (slider, doc) = slider(&[]);
        slider.connect(&doc);
        assert_eq!(doc.listener_count(), 2);

        slider.pointer_down(PointerInput::primary(10.0, 5.0));
        doc.pointer_move(PointerInput::primary(40.0, 5.0));
        assert_eq!(slider.value(), 40.0);

        slider.disconnect();
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn non_finite_values_are_ignored() {
        let (slider, _doc) = slider(&[("value", "30")]);
        assert!(!slider.set_value(f64::NAN));
        assert!(!slider.set_value(f64::INFINITY));
        assert_eq!(slider.value(), 30.0);
    }

    #[test]
    fn secondary_button_does_not_drag() {
        let (slider, _doc) = slider(&[]);
        let input = PointerInput {
            button: PointerButton::Secondary,
            x: 50.0,
            y: 0.0,
        };
        slider.pointer_down(input);
        assert!(!slider.is_pressed());
        assert_eq!(slider.value(), 0.0);
    }

    #[test]
    fn missing_layout_is_a_no_op() {
        let (slider, _doc) = slider(&[]);
        slider.set_layout(None);
        slider.pointer_down(PointerInput::primary(50.0, 5.0));
        assert_eq!(slider.value(), 0.0);
    }

    #[test]
    fn change_reports_only_real_moves() {
        let (slider, _doc) = slider(&[("value", "10")]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let _sub = slider.on_event(move |ctx: &mut EventContext<'_>| {
            if let WidgetEvent::Change(ChangeDetail::Slider { value }) = ctx.event() {
                seen_clone.lock().push(*value);
            }
        });

        assert!(slider.set_value(20.0));
        assert!(!slider.set_value(20.0));
        assert!(slider.set_value(500.0));
        assert_eq!(*seen.lock(), vec![20.0, 100.0]);
    }

    #[test]
    fn disconnect_releases_window_listeners() {
        let (slider, doc) = slider(&[]);
        assert_eq!(doc.listener_count(), 2);

        slider.disconnect();
        assert_eq!(doc.listener_count(), 0);

        slider.connect(&doc);
        assert_eq!(doc.listener_count(), 2);
    }

    #[test]
    fn view_tracks_positions() {
        let (slider, _doc) = slider(&[("value", "25")]);
        let view = slider.view();
        assert_eq!(view.positions.percent, 25.0);
        assert_eq!(view.positions.progress_right, "75%");
        assert_eq!(view.range.max, "100");
        assert_eq!(view.aria_valuenow, 25.0);
    }
}
