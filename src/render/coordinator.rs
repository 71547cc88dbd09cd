use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::engine::bridge::panic_message;
use crate::foundation::error::{LarmError, LarmResult};
use crate::render::request::RenderRequest;

/// Quiet period required before a pending request is dispatched.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Coordinator configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorOpts {
    /// Time a request must stay unsuperseded before it is dispatched.
    pub debounce: Duration,
}

impl Default for CoordinatorOpts {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Observable coordinator state.
///
/// `Running` takes precedence: a request buffered behind an in-flight render still reports
/// `Running` until that render finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoordinatorPhase {
    /// Nothing queued, nothing in flight.
    Idle,
    /// A request is waiting out the debounce window.
    Pending,
    /// An engine call is in flight.
    Running,
}

/// Counters over the coordinator's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Requests accepted by `submit`.
    pub submitted: u64,
    /// Pending requests overwritten before dispatch.
    pub superseded: u64,
    /// Requests handed to the render function.
    pub dispatched: u64,
    /// Renders that produced a published result.
    pub completed: u64,
    /// Renders that returned an error or panicked.
    pub failed: u64,
}

/// A completed render.
#[derive(Debug)]
pub struct Rendered<T> {
    /// Arrival sequence number of the request (1-based, strictly increasing).
    pub seq: u64,
    /// The request that produced `output`.
    pub request: RenderRequest,
    /// Render output.
    pub output: T,
}

/// Single-slot handoff holding the most recent completed render.
pub struct ResultSlot<T> {
    latest: Mutex<Option<Arc<Rendered<T>>>>,
    published: Condvar,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self {
            latest: Mutex::new(None),
            published: Condvar::new(),
        }
    }
}

impl<T> ResultSlot<T> {
    /// Replace the held result. Results older than the held one are dropped.
    pub fn publish(&self, rendered: Rendered<T>) -> bool {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cur) = latest.as_ref()
            && cur.seq >= rendered.seq
        {
            return false;
        }
        *latest = Some(Arc::new(rendered));
        drop(latest);
        self.published.notify_all();
        true
    }

    /// Most recent result, if any.
    pub fn latest(&self) -> Option<Arc<Rendered<T>>> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Block until a result with `seq >= min_seq` is held, or `timeout` elapses.
    pub fn wait_until(&self, min_seq: u64, timeout: Duration) -> Option<Arc<Rendered<T>>> {
        let deadline = Instant::now() + timeout;
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(cur) = latest.as_ref()
                && cur.seq >= min_seq
            {
                return Some(cur.clone());
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            latest = self
                .published
                .wait_timeout(latest, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

struct Queued {
    seq: u64,
    arrived: Instant,
    request: RenderRequest,
}

struct State {
    pending: Option<Queued>,
    running: Option<u64>,
    next_seq: u64,
    shutdown: bool,
    stats: CoordinatorStats,
    last_error: Option<String>,
}

struct StateCell {
    state: Mutex<State>,
    changed: Condvar,
}

impl StateCell {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, State>) -> MutexGuard<'a, State> {
        self.changed
            .wait(guard)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_timeout<'a>(
        &self,
        guard: MutexGuard<'a, State>,
        dur: Duration,
    ) -> MutexGuard<'a, State> {
        self.changed
            .wait_timeout(guard, dur)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }
}

/// Debouncing, coalescing, single-flight dispatcher for render requests.
///
/// Submitted requests overwrite any pending one. A pending request is dispatched once it has
/// gone `debounce` without being superseded and nothing is in flight. A request arriving while a
/// render runs waits for it; the in-flight render is never interrupted and its result is still
/// published, after which the newest pending request goes through the debounce step. The held
/// result therefore always belongs to the most recent request whose render has finished.
///
/// Exactly one worker thread calls the render function, so renders never overlap.
pub struct RenderCoordinator<T> {
    cell: Arc<StateCell>,
    slot: Arc<ResultSlot<T>>,
    opts: CoordinatorOpts,
    worker: Option<JoinHandle<()>>,
}

impl<T> RenderCoordinator<T>
where
    T: Send + Sync + 'static,
{
    /// Start the worker thread.
    pub fn spawn<F>(opts: CoordinatorOpts, render: F) -> LarmResult<Self>
    where
        F: FnMut(&RenderRequest) -> LarmResult<T> + Send + 'static,
    {
        let cell = Arc::new(StateCell {
            state: Mutex::new(State {
                pending: None,
                running: None,
                next_seq: 1,
                shutdown: false,
                stats: CoordinatorStats::default(),
                last_error: None,
            }),
            changed: Condvar::new(),
        });
        let slot = Arc::new(ResultSlot::default());

        let worker = {
            let cell = cell.clone();
            let slot = slot.clone();
            std::thread::Builder::new()
                .name("larm-render".to_string())
                .spawn(move || worker_loop(&cell, &slot, opts.debounce, render))
                .map_err(|e| LarmError::processing(format!("failed to spawn render thread: {e}")))?
        };

        Ok(Self {
            cell,
            slot,
            opts,
            worker: Some(worker),
        })
    }

    /// Queue `request`, superseding any request that has not been dispatched yet.
    ///
    /// Returns the request's sequence number.
    pub fn submit(&self, request: RenderRequest) -> u64 {
        let mut st = self.cell.lock();
        let seq = st.next_seq;
        st.next_seq += 1;
        st.stats.submitted += 1;
        if let Some(old) = st.pending.replace(Queued {
            seq,
            arrived: Instant::now(),
            request,
        }) {
            st.stats.superseded += 1;
            tracing::debug!(superseded = old.seq, by = seq, "pending render superseded");
        }
        drop(st);
        self.cell.changed.notify_all();
        seq
    }

    /// Current phase.
    pub fn phase(&self) -> CoordinatorPhase {
        let st = self.cell.lock();
        if st.running.is_some() {
            CoordinatorPhase::Running
        } else if st.pending.is_some() {
            CoordinatorPhase::Pending
        } else {
            CoordinatorPhase::Idle
        }
    }

    /// Lifetime counters.
    pub fn stats(&self) -> CoordinatorStats {
        self.cell.lock().stats
    }

    /// Message of the most recent failed render, cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.cell.lock().last_error.clone()
    }

    /// Configured debounce window.
    pub fn debounce(&self) -> Duration {
        self.opts.debounce
    }

    /// Most recent published result.
    pub fn latest(&self) -> Option<Arc<Rendered<T>>> {
        self.slot.latest()
    }

    /// Wait until the published result is at least as new as request `seq`.
    ///
    /// A superseded request never gets its own result; the wait then ends with the newer one.
    pub fn wait_for(&self, seq: u64, timeout: Duration) -> Option<Arc<Rendered<T>>> {
        self.slot.wait_until(seq, timeout)
    }

    /// Wait until nothing is pending or running. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut st = self.cell.lock();
        loop {
            if st.pending.is_none() && st.running.is_none() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            st = self.cell.wait_timeout(st, deadline - now);
        }
    }
}

impl<T> Drop for RenderCoordinator<T> {
    fn drop(&mut self) {
        self.cell.lock().shutdown = true;
        self.cell.changed.notify_all();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("render worker thread panicked");
        }
    }
}

fn worker_loop<T, F>(cell: &StateCell, slot: &ResultSlot<T>, debounce: Duration, mut render: F)
where
    F: FnMut(&RenderRequest) -> LarmResult<T>,
{
    while let Some(job) = next_job(cell, debounce) {
        tracing::debug!(seq = job.seq, view = ?job.request.view, "dispatching render");
        let outcome = catch_unwind(AssertUnwindSafe(|| render(&job.request))).unwrap_or_else(
            |payload| {
                Err(LarmError::processing(format!(
                    "render panicked: {}",
                    panic_message(&*payload)
                )))
            },
        );

        match outcome {
            Ok(output) => {
                slot.publish(Rendered {
                    seq: job.seq,
                    request: job.request,
                    output,
                });
                let mut st = cell.lock();
                st.running = None;
                st.stats.completed += 1;
                st.last_error = None;
            }
            Err(e) => {
                tracing::warn!(seq = job.seq, error = %e, "render failed");
                let mut st = cell.lock();
                st.running = None;
                st.stats.failed += 1;
                st.last_error = Some(e.to_string());
            }
        }
        cell.changed.notify_all();
    }
}

fn next_job(cell: &StateCell, debounce: Duration) -> Option<Queued> {
    let mut st = cell.lock();
    loop {
        if st.shutdown {
            return None;
        }
        let Some(arrived) = st.pending.as_ref().map(|q| q.arrived) else {
            st = cell.wait(st);
            continue;
        };
        let ready_at = arrived + debounce;
        let now = Instant::now();
        if now < ready_at {
            st = cell.wait_timeout(st, ready_at - now);
            continue;
        }
        if let Some(job) = st.pending.take() {
            st.running = Some(job.seq);
            st.stats.dispatched += 1;
            return Some(job);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/coordinator.rs"]
mod tests;
