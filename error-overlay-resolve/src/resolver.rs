//! Frame resolution.
//!
//! [`resolve_frame`] is the algorithm: it turns one [`RawFrame`] plus the
//! compiled-mode flag into a [`ResolvedFrameState`], degrading instead of
//! failing when artifacts are missing.
//!
//! [`FrameResolver`] runs that algorithm on a tokio runtime for the frames a
//! view is currently showing. Each request is stamped with a generation; the
//! control thread drains completions with [`FrameResolver::poll`] and applies
//! one only while its generation is still the slot's current one. In-flight
//! work is never aborted, so a superseded fetch still lands in the cache.

use crate::cache::ArtifactCache;
use crate::frame::{RawFrame, Resolution, ResolvedFrameState};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Resolve one frame.
///
/// 1. No file name: the frame's own fields, no content, no fetch.
/// 2. Fetch the file's text; if that fails, same as 1.
/// 3. Look up the file's source map.
/// 4. Original mode with a map, a line and a column: report the mapped
///    location and the original source text.
/// 5. Otherwise the frame's own location with the delivered text.
///
/// The boolean flags always come from the raw frame.
pub async fn resolve_frame(
    cache: &ArtifactCache,
    frame: &RawFrame,
    compiled: bool,
) -> ResolvedFrameState {
    let Some(file_name) = frame.file_name.as_deref() else {
        return ResolvedFrameState::from_raw(frame);
    };
    let Some(text) = cache.get_text(file_name).await else {
        return ResolvedFrameState::from_raw(frame);
    };
    let map = cache.get_position_map(file_name, &text).await;

    if !compiled
        && let Some(map) = map
        && let (Some(line), Some(column)) = (frame.line_number, frame.column_number)
    {
        match map.original_position_for(line, column) {
            Some(position) => {
                let content = cache.get_source_content(&map, &position.source).await;
                return ResolvedFrameState {
                    file_name: Some(position.source),
                    function_name: position.name.or_else(|| frame.function_name.clone()),
                    line_number: Some(position.line),
                    column_number: Some(position.column),
                    content,
                    resolution: Resolution::Original,
                    ..ResolvedFrameState::from_raw(frame)
                };
            }
            None => {
                log::debug!(
                    target: "resolve",
                    "no mapping for {}:{}:{}, showing compiled location",
                    file_name,
                    line,
                    column
                );
            }
        }
    }

    ResolvedFrameState::compiled(frame, text)
}

/// Identifies one displayed frame: the failure it belongs to and its position
/// in that failure's stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey {
    pub failure: u64,
    pub index: usize,
}

impl FrameKey {
    pub fn new(failure: u64, index: usize) -> Self {
        Self { failure, index }
    }
}

struct Completion {
    key: FrameKey,
    generation: u64,
    state: ResolvedFrameState,
}

struct Slot {
    frame: RawFrame,
    compiled: bool,
    generation: u64,
    state: ResolvedFrameState,
    settled: bool,
}

/// Tracks the resolved state of every observed frame and suppresses stale
/// completions.
pub struct FrameResolver {
    runtime: Handle,
    cache: Arc<ArtifactCache>,
    slots: HashMap<FrameKey, Slot>,
    next_generation: u64,
    discarded: u64,
    result_tx: mpsc::UnboundedSender<Completion>,
    result_rx: mpsc::UnboundedReceiver<Completion>,
}

impl FrameResolver {
    pub fn new(runtime: Handle, cache: Arc<ArtifactCache>) -> Self {
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            cache,
            slots: HashMap::new(),
            next_generation: 1,
            discarded: 0,
            result_tx,
            result_rx,
        }
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    /// Ask for `frame` under `compiled` at `key`.
    ///
    /// A no-op when the slot already holds (or is resolving) exactly these
    /// inputs. A mode-only change keeps showing the previous state until the
    /// new one lands; a different frame starts from its raw fields.
    pub fn request(&mut self, key: FrameKey, frame: &RawFrame, compiled: bool) {
        let previous = match self.slots.get(&key) {
            Some(slot) if slot.frame == *frame && slot.compiled == compiled => return,
            Some(slot) if slot.frame == *frame => Some(slot.state.clone()),
            _ => None,
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        if frame.file_name.is_none() {
            self.slots.insert(
                key,
                Slot {
                    frame: frame.clone(),
                    compiled,
                    generation,
                    state: ResolvedFrameState::from_raw(frame),
                    settled: true,
                },
            );
            return;
        }

        self.slots.insert(
            key,
            Slot {
                frame: frame.clone(),
                compiled,
                generation,
                state: previous.unwrap_or_else(|| ResolvedFrameState::from_raw(frame)),
                settled: false,
            },
        );

        log::trace!(
            target: "resolve",
            "request {:?} gen {} compiled={}",
            key,
            generation,
            compiled
        );

        let tx = self.result_tx.clone();
        let cache = Arc::clone(&self.cache);
        let frame = frame.clone();
        self.runtime.spawn(async move {
            let state = resolve_frame(&cache, &frame, compiled).await;
            // Receiver gone means the resolver was dropped; nothing to apply.
            let _ = tx.send(Completion {
                key,
                generation,
                state,
            });
        });
    }

    /// Re-request every tracked frame under a new mode.
    pub fn invalidate_all(&mut self, compiled: bool) {
        let frames: Vec<(FrameKey, RawFrame)> = self
            .slots
            .iter()
            .map(|(key, slot)| (*key, slot.frame.clone()))
            .collect();
        for (key, frame) in frames {
            self.request(key, &frame, compiled);
        }
    }

    /// Drop slots whose key fails `keep`. Their in-flight completions become
    /// stale.
    pub fn retain(&mut self, mut keep: impl FnMut(&FrameKey) -> bool) {
        self.slots.retain(|key, _| keep(key));
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn state(&self, key: &FrameKey) -> Option<&ResolvedFrameState> {
        self.slots.get(key).map(|slot| &slot.state)
    }

    pub fn is_pending(&self, key: &FrameKey) -> bool {
        self.slots.get(key).is_some_and(|slot| !slot.settled)
    }

    pub fn pending_count(&self) -> usize {
        self.slots.values().filter(|slot| !slot.settled).count()
    }

    pub fn tracked_count(&self) -> usize {
        self.slots.len()
    }

    /// Completions thrown away because their slot had moved on.
    pub fn discarded_count(&self) -> u64 {
        self.discarded
    }

    fn apply(&mut self, completion: Completion) -> bool {
        match self.slots.get_mut(&completion.key) {
            Some(slot) if slot.generation == completion.generation => {
                slot.state = completion.state;
                slot.settled = true;
                true
            }
            _ => {
                log::trace!(
                    target: "resolve",
                    "discarding stale result for {:?} gen {}",
                    completion.key,
                    completion.generation
                );
                self.discarded += 1;
                false
            }
        }
    }

    /// Apply every completion that has arrived. Returns how many changed a
    /// slot.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.result_rx.try_recv() {
            if self.apply(completion) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until no slot is pending or `timeout` elapses. Returns whether
    /// everything settled.
    ///
    /// Must be called from outside the runtime, and the runtime must be a
    /// multi-threaded one so its workers keep driving I/O and timers.
    pub fn wait_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.poll();

        while self.pending_count() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let runtime = self.runtime.clone();
            let rx = &mut self.result_rx;
            let received =
                runtime.block_on(async { tokio::time::timeout(remaining, rx.recv()).await });
            match received {
                Ok(Some(completion)) => {
                    self.apply(completion);
                }
                Ok(None) | Err(_) => return false,
            }
        }
        true
    }
}
