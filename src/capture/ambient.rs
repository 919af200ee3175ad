//! Ambient (uncaught, out-of-render) failure sources.
//!
//! [`AmbientFailureHub`] is the host's "uncaught error" notification: any
//! thread may [`report`](AmbientFailureHub::report) a failure, and each live
//! [`AmbientSubscription`] buffers it until the control thread drains it.
//! Dropping the subscription unsubscribes.
//!
//! [`PanicHookGuard`] feeds panics into a hub for as long as it lives and
//! restores the previous hook when dropped.

use super::boundary;
use crate::failure::FailurePayload;
use parking_lot::Mutex;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
struct HubState {
    next_listener: u64,
    listeners: Vec<(u64, Vec<FailurePayload>)>,
}

/// Fan-out point for ambient failures.
#[derive(Clone, Default)]
pub struct AmbientFailureHub {
    state: Arc<Mutex<HubState>>,
}

impl AmbientFailureHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every subscriber. Returns `false` when nobody is
    /// listening.
    pub fn report(&self, payload: FailurePayload) -> bool {
        let mut state = self.state.lock();
        if state.listeners.is_empty() {
            log::debug!(target: "capture", "ambient failure with no subscriber: {}", payload);
            return false;
        }
        for (_, buffer) in state.listeners.iter_mut() {
            buffer.push(payload.clone());
        }
        true
    }

    pub fn subscribe(&self) -> AmbientSubscription {
        let mut state = self.state.lock();
        let id = state.next_listener;
        state.next_listener += 1;
        state.listeners.push((id, Vec::new()));
        AmbientSubscription {
            hub: self.clone(),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

/// One subscriber's buffer of ambient failures, in arrival order.
pub struct AmbientSubscription {
    hub: AmbientFailureHub,
    id: u64,
}

impl AmbientSubscription {
    /// Take everything reported since the last drain.
    pub fn drain(&self) -> Vec<FailurePayload> {
        let mut state = self.hub.state.lock();
        state
            .listeners
            .iter_mut()
            .find(|(id, _)| *id == self.id)
            .map(|(_, buffer)| std::mem::take(buffer))
            .unwrap_or_default()
    }
}

impl Drop for AmbientSubscription {
    fn drop(&mut self) {
        self.hub.state.lock().listeners.retain(|(id, _)| *id != self.id);
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Ids of live guards, in install order.
static LIVE_HOOKS: Mutex<Vec<u64>> = Mutex::new(Vec::new());
static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

/// Installed panic hook that reports panics to a hub.
///
/// Panics raised inside a failure boundary are handed to that boundary
/// instead. Other panics are reported and then passed on to the previous hook.
///
/// Guards may be dropped in any order. Only the most recently installed live
/// guard puts the previous hook back; an older guard just stops reporting and
/// stays in the chain as a pass-through.
pub struct PanicHookGuard {
    id: u64,
    active: Arc<AtomicBool>,
    previous: Arc<PanicHook>,
}

impl PanicHookGuard {
    pub fn install(hub: AmbientFailureHub) -> Self {
        let mut live = LIVE_HOOKS.lock();
        let id = NEXT_HOOK_ID.fetch_add(1, Ordering::Relaxed);
        let active = Arc::new(AtomicBool::new(true));
        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());

        let chained = Arc::clone(&previous);
        let reporting = Arc::clone(&active);
        panic::set_hook(Box::new(move |info| {
            if reporting.load(Ordering::Acquire) {
                let payload = FailurePayload::from_panic(info);
                if boundary::inside_boundary() {
                    boundary::record_caught(payload);
                    return;
                }
                hub.report(payload);
            }
            (*chained)(info);
        }));

        live.push(id);
        log::debug!(target: "capture", "panic hook {} installed", id);
        Self {
            id,
            active,
            previous,
        }
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        let mut live = LIVE_HOOKS.lock();
        let is_top = live.last() == Some(&self.id);
        live.retain(|id| *id != self.id);

        // set_hook panics on a panicking thread; leave ours in place then.
        if !is_top || std::thread::panicking() {
            log::debug!(target: "capture", "panic hook {} deactivated, left in the chain", self.id);
            return;
        }
        let previous = Arc::clone(&self.previous);
        let _ = panic::take_hook();
        panic::set_hook(Box::new(move |info| (*previous)(info)));
        log::debug!(target: "capture", "panic hook {} restored previous hook", self.id);
    }
}
