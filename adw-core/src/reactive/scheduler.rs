//! Effect Scheduler
//!
//! The scheduler is the per-widget coordinator that connects property
//! changes to effects and to the widget's render step.
//!
//! # How It Works
//!
//! 1. Effects register with a timing mode and a dependency declaration.
//!
//! 2. When a property changes, the scheduler looks up the effects that
//!    declared it and marks them pending. Marking is idempotent, so any
//!    number of changes within one turn collapse into a single pending
//!    flag per effect.
//!
//! 3. `flush` is the microtask checkpoint. One update pass:
//!    a. Runs pending immediate effects, repeating while they schedule
//!       more immediate work, so their writes fold into this render
//!    b. Calls the render hook
//!    c. Runs pending deferred effects, each at most once
//!
//! 4. If deferred effects changed properties, another pass runs. Passes
//!    are capped; a feedback loop is logged and dropped rather than
//!    spinning forever.
//!
//! # Re-entrancy
//!
//! `flush` called from inside a running effect returns immediately. Writes
//! made by a running effect are picked up by the surrounding flush, never
//! by a nested one, so an effect never re-enters itself synchronously.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use tracing::{trace, warn};

use super::property::{ChangeSink, PropertyId};
use super::subscription::{ListenerId, Subscription};
use crate::config::RuntimeConfig;

/// When an effect runs relative to the render that reflects its trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timing {
    /// Before the render; writes fold into the same render.
    Immediate,
    /// After the render; observes the updated view.
    Deferred,
}

/// What an effect depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deps {
    /// Run when any of these properties change.
    On(SmallVec<[PropertyId; 4]>),
    /// The empty dependency list: run once after mount, never again.
    Mount,
    /// No dependency selector: run on every update pass.
    EveryUpdate,
}

impl Deps {
    pub fn on(ids: impl IntoIterator<Item = PropertyId>) -> Self {
        let ids: SmallVec<[PropertyId; 4]> = ids.into_iter().collect();
        if ids.is_empty() {
            Self::Mount
        } else {
            Self::On(ids)
        }
    }
}

type Callback = Arc<dyn Fn() + Send + Sync>;

struct EffectEntry {
    timing: Timing,
    deps: Deps,
    callback: Callback,
    run_count: Arc<AtomicUsize>,
    /// Mount effects only: already ran.
    fired: bool,
}

#[derive(Default)]
struct SchedulerState {
    effects: IndexMap<ListenerId, EffectEntry>,
    by_property: IndexMap<PropertyId, SmallVec<[ListenerId; 4]>>,
    pending_immediate: IndexSet<ListenerId>,
    pending_deferred: IndexSet<ListenerId>,
    update_requested: bool,
    mounted: bool,
}

impl SchedulerState {
    fn clear_pending(&mut self) {
        self.pending_immediate.clear();
        self.pending_deferred.clear();
        self.update_requested = false;
    }

    fn mark(&mut self, id: ListenerId) {
        if let Some(entry) = self.effects.get(&id) {
            match entry.timing {
                Timing::Immediate => self.pending_immediate.insert(id),
                Timing::Deferred => self.pending_deferred.insert(id),
            };
        }
    }

    /// Drain the pending set for `timing`, adding the effects that run on
    /// every update when `with_every` is set. Mount effects that already
    /// fired are skipped.
    fn take_batch(&mut self, timing: Timing, with_every: bool) -> Vec<(Callback, Arc<AtomicUsize>)> {
        let mut ids = match timing {
            Timing::Immediate => std::mem::take(&mut self.pending_immediate),
            Timing::Deferred => std::mem::take(&mut self.pending_deferred),
        };

        if with_every {
            for (id, entry) in &self.effects {
                if entry.timing == timing && entry.deps == Deps::EveryUpdate {
                    ids.insert(*id);
                }
            }
        }

        let mut batch = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = self.effects.get_mut(&id) {
                if entry.deps == Deps::Mount {
                    if entry.fired {
                        continue;
                    }
                    entry.fired = true;
                }
                batch.push((Arc::clone(&entry.callback), Arc::clone(&entry.run_count)));
            }
        }
        batch
    }
}

struct SchedulerInner {
    state: Mutex<SchedulerState>,
    render: RwLock<Option<Callback>>,
    flushing: AtomicBool,
    renders: AtomicU64,
    max_passes: usize,
    max_immediate_rounds: usize,
}

impl ChangeSink for SchedulerInner {
    fn property_changed(&self, id: PropertyId) {
        let mut state = self.state.lock();
        if !state.mounted {
            return;
        }
        state.update_requested = true;

        let dependents = state.by_property.get(&id).cloned().unwrap_or_default();
        for effect in dependents {
            state.mark(effect);
        }
    }
}

/// Resets the flushing flag even if an effect panics.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a registered effect.
///
/// Dropping the handle cancels the effect.
#[must_use = "dropping an EffectHandle immediately cancels the effect"]
#[derive(Debug)]
pub struct EffectHandle {
    id: ListenerId,
    run_count: Arc<AtomicUsize>,
    subscription: Subscription,
}

impl EffectHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Deregister the effect. Calling it again is a no-op.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Number of times the callback has run.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }
}

impl From<EffectHandle> for Subscription {
    fn from(handle: EffectHandle) -> Self {
        handle.subscription
    }
}

/// Per-widget effect scheduler. Clones share the same state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(SchedulerState::default()),
                render: RwLock::new(None),
                flushing: AtomicBool::new(false),
                renders: AtomicU64::new(0),
                max_passes: config.max_update_passes.max(1),
                max_immediate_rounds: config.max_immediate_rounds.max(1),
            }),
        }
    }

    pub(crate) fn sink(&self) -> Weak<dyn ChangeSink> {
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        weak
    }

    /// Install the render step run between the immediate and deferred
    /// phases of every pass.
    pub fn set_render<F>(&self, render: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.render.write() = Some(Arc::new(render));
    }

    /// Register a deferred effect.
    pub fn effect<F>(&self, deps: Deps, callback: F) -> EffectHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Timing::Deferred, deps, callback)
    }

    /// Register an immediate effect.
    pub fn immediate_effect<F>(&self, deps: Deps, callback: F) -> EffectHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.register(Timing::Immediate, deps, callback)
    }

    pub fn register<F>(&self, timing: Timing, deps: Deps, callback: F) -> EffectHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = ListenerId::new();
        let run_count = Arc::new(AtomicUsize::new(0));

        {
            let mut state = self.inner.state.lock();
            if let Deps::On(ids) = &deps {
                for property in ids {
                    let dependents = state.by_property.entry(*property).or_default();
                    if !dependents.contains(&id) {
                        dependents.push(id);
                    }
                }
            }
            let queue_now = deps == Deps::Mount && state.mounted;
            state.effects.insert(
                id,
                EffectEntry {
                    timing,
                    deps,
                    callback: Arc::new(callback),
                    run_count: Arc::clone(&run_count),
                    fired: false,
                },
            );
            if queue_now {
                state.mark(id);
            }
        }

        let inner = Arc::downgrade(&self.inner);
        let subscription = Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                let mut state = inner.state.lock();
                state.effects.shift_remove(&id);
                state.pending_immediate.shift_remove(&id);
                state.pending_deferred.shift_remove(&id);
                for dependents in state.by_property.values_mut() {
                    dependents.retain(|e| *e != id);
                }
            }
        });

        EffectHandle {
            id,
            run_count,
            subscription,
        }
    }

    /// Attach: discard notifications collected before mount, queue mount
    /// effects and run the first update pass.
    pub fn mount(&self) -> usize {
        {
            let mut state = self.inner.state.lock();
            state.clear_pending();
            state.mounted = true;
            state.update_requested = true;

            let mount_effects: Vec<ListenerId> = state
                .effects
                .iter()
                .filter(|(_, e)| e.deps == Deps::Mount && !e.fired)
                .map(|(id, _)| *id)
                .collect();
            for id in mount_effects {
                state.mark(id);
            }
        }
        self.flush()
    }

    /// Detach: drop pending work. Registered effects stay until cancelled.
    pub fn unmount(&self) {
        let mut state = self.inner.state.lock();
        state.mounted = false;
        state.clear_pending();
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.state.lock().mounted
    }

    /// Ask for an update pass even though no property changed.
    pub fn request_update(&self) {
        let mut state = self.inner.state.lock();
        if state.mounted {
            state.update_requested = true;
        }
    }

    /// Whether a flush would do any work.
    pub fn has_pending(&self) -> bool {
        let state = self.inner.state.lock();
        state.mounted
            && (state.update_requested
                || !state.pending_immediate.is_empty()
                || !state.pending_deferred.is_empty())
    }

    /// Number of registered effects.
    pub fn effect_count(&self) -> usize {
        self.inner.state.lock().effects.len()
    }

    /// Number of renders performed so far.
    pub fn render_count(&self) -> u64 {
        self.inner.renders.load(Ordering::SeqCst)
    }

    /// Run update passes until quiet. Returns the number of passes run.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.swap(true, Ordering::SeqCst) {
            trace!("flush requested while flushing, deferring to the running pass");
            return 0;
        }
        let _guard = FlushGuard(&self.inner.flushing);

        let mut passes = 0;
        while self.has_pending() {
            if passes == self.inner.max_passes {
                warn!(
                    passes,
                    "update passes keep scheduling more work, dropping pending effects"
                );
                self.inner.state.lock().clear_pending();
                break;
            }
            passes += 1;

            self.run_immediate();
            self.inner.state.lock().update_requested = false;
            self.render();
            self.run_deferred();
        }
        passes
    }

    fn run_immediate(&self) {
        for round in 0..self.inner.max_immediate_rounds {
            let batch = self.inner.state.lock().take_batch(Timing::Immediate, round == 0);
            if batch.is_empty() {
                return;
            }
            run_batch(batch);
        }

        let mut state = self.inner.state.lock();
        if !state.pending_immediate.is_empty() {
            warn!("immediate effects keep rescheduling each other, dropping the rest");
            state.pending_immediate.clear();
        }
    }

    fn render(&self) {
        let render = self.inner.render.read().clone();
        self.inner.renders.fetch_add(1, Ordering::SeqCst);
        trace!(render = self.render_count(), "render");
        if let Some(render) = render {
            render();
        }
    }

    fn run_deferred(&self) {
        let batch = self.inner.state.lock().take_batch(Timing::Deferred, true);
        run_batch(batch);
    }
}

fn run_batch(batch: Vec<(Callback, Arc<AtomicUsize>)>) {
    for (callback, run_count) in batch {
        run_count.fetch_add(1, Ordering::SeqCst);
        callback();
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("mounted", &self.is_mounted())
            .field("effect_count", &self.effect_count())
            .field("render_count", &self.render_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
