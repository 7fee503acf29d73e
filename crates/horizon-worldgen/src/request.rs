use crate::error::GenerationError;
use crate::workers::WorkerTable;

use horizon_map::{chunk_chessboard_distance, ChunkPos, GenerationStep, LightMode};

use log::{debug, info};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type RequestId = u64;

/// What a completed request did with each chunk of its footprint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GenerationOutcome {
    /// Chunks written to the index.
    pub generated: usize,
    /// Chunks skipped because the index already had data of sufficient fidelity.
    pub merged: usize,
    /// Generated chunks that came from persisted data.
    pub decoded: usize,
    /// Generated chunks that were approximated from noise.
    pub synthesized: usize,
    /// Scheduled ticks dropped because generation was speculative.
    pub suppressed_ticks: usize,
}

impl GenerationOutcome {
    pub fn total(&self) -> usize {
        self.generated + self.merged
    }
}

/// Lifecycle of a request. Every phase after `Running` is terminal.
#[derive(Clone, Debug)]
pub enum Phase {
    Pending,
    Running,
    Completed(GenerationOutcome),
    Failed(GenerationError),
    Cancelled,
    /// The task was dropped without reporting a result.
    Abandoned,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Phase::Pending | Phase::Running)
    }
}

/// Number of requests that reached each terminal phase.
#[derive(Debug, Default)]
pub(crate) struct PhaseCounters {
    pub completed: AtomicU64,
    pub failed: AtomicU64,
    pub cancelled: AtomicU64,
}

impl PhaseCounters {
    fn count(&self, phase: &Phase) {
        let counter = match phase {
            Phase::Completed(_) => &self.completed,
            Phase::Failed(_) | Phase::Abandoned => &self.failed,
            Phase::Cancelled => &self.cancelled,
            Phase::Pending | Phase::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// State shared by a [`GenerationRequest`] handle and the worker running it.
pub(crate) struct RequestState {
    pub id: RequestId,
    pub target: ChunkPos,
    /// Chessboard radius of the footprint, in chunks.
    pub range: i32,
    pub step: GenerationStep,
    pub light_mode: LightMode,
    margin: i32,
    created: Instant,
    /// Nanoseconds after `created`.
    last_progress_ns: AtomicU64,
    cancel: AtomicBool,
    phase: Mutex<Phase>,
    phase_changed: Condvar,
    counters: Arc<PhaseCounters>,
}

impl RequestState {
    pub fn new(
        id: RequestId,
        target: ChunkPos,
        range: i32,
        step: GenerationStep,
        light_mode: LightMode,
        margin: i32,
    ) -> Self {
        Self {
            id,
            target,
            range: range.max(0),
            step,
            light_mode,
            margin,
            created: Instant::now(),
            last_progress_ns: AtomicU64::new(0),
            cancel: AtomicBool::new(false),
            phase: Mutex::new(Phase::Pending),
            phase_changed: Condvar::new(),
            counters: Arc::default(),
        }
    }

    /// Counts this request's terminal phase in `counters`.
    pub fn with_counters(mut self, counters: Arc<PhaseCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Enters a terminal phase. Counted before waiters wake up.
    fn settle(&self, phase: &mut Phase, next: Phase) {
        self.counters.count(&next);
        *phase = next;
        self.phase_changed.notify_all();
    }

    pub fn refresh(&self) {
        let now = self.created.elapsed().as_nanos() as u64;
        self.last_progress_ns.fetch_max(now, Ordering::Relaxed);
    }

    pub fn since_progress(&self) -> Duration {
        self.created
            .elapsed()
            .saturating_sub(Duration::from_nanos(self.last_progress_ns.load(Ordering::Relaxed)))
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> Phase {
        self.phase.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.phase.lock(), Phase::Running)
    }

    /// Moves a pending request to `Running`. Returns false if it was cancelled first.
    pub fn begin(&self) -> bool {
        let mut phase = self.phase.lock();
        if !matches!(*phase, Phase::Pending) {
            return false;
        }
        self.refresh();
        *phase = Phase::Running;
        true
    }

    /// Records the worker's result and returns the terminal phase. A cancellation that was requested while running wins
    /// over a successful result.
    pub fn finish(&self, result: Result<GenerationOutcome, GenerationError>) -> Phase {
        let mut phase = self.phase.lock();
        if !phase.is_terminal() {
            let next = match result {
                _ if self.cancel_requested() => Phase::Cancelled,
                Ok(outcome) => Phase::Completed(outcome),
                Err(GenerationError::Cancelled) => Phase::Cancelled,
                Err(e) => Phase::Failed(e),
            };
            self.settle(&mut phase, next);
        }
        phase.clone()
    }

    /// Marks a request whose task went away without finishing.
    pub fn abandon(&self) {
        let mut phase = self.phase.lock();
        if !phase.is_terminal() {
            self.settle(&mut phase, Phase::Abandoned);
        }
    }

    /// Requests cancellation. Returns true if the request is (or will end up) cancelled; false if it already completed or
    /// failed.
    pub fn request_cancel(&self) -> bool {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::Completed(_) | Phase::Failed(_) | Phase::Abandoned => false,
            Phase::Cancelled => true,
            Phase::Pending => {
                self.cancel.store(true, Ordering::Release);
                self.settle(&mut phase, Phase::Cancelled);
                true
            }
            Phase::Running => {
                // `finish` reads the flag under the same lock.
                self.cancel.store(true, Ordering::Release);
                true
            }
        }
    }

    /// Blocks until the request reaches a terminal phase.
    pub fn wait(&self) -> Phase {
        let mut phase = self.phase.lock();
        while !phase.is_terminal() {
            self.phase_changed.wait(&mut phase);
        }
        phase.clone()
    }

    /// True if the padded footprints of the two requests intersect.
    pub fn too_close(&self, other: &RequestState) -> bool {
        let reach = self.range + other.range + 1 + self.margin.max(other.margin);
        chunk_chessboard_distance(self.target, other.target) < reach
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "request #{} at {} (range {}, {:?})",
            self.id, self.target, self.range, self.step
        )
    }
}

/// Handle to a submitted request.
#[derive(Clone)]
pub struct GenerationRequest {
    pub(crate) state: Arc<RequestState>,
    workers: Arc<WorkerTable>,
}

impl GenerationRequest {
    pub(crate) fn new(state: Arc<RequestState>, workers: Arc<WorkerTable>) -> Self {
        Self { state, workers }
    }

    pub fn id(&self) -> RequestId {
        self.state.id
    }

    pub fn target(&self) -> ChunkPos {
        self.state.target
    }

    pub fn range(&self) -> i32 {
        self.state.range
    }

    pub fn step(&self) -> GenerationStep {
        self.state.step
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// True once the worker reported a result, successful or not. Cancelled requests never complete.
    pub fn is_completed(&self) -> bool {
        matches!(self.state.phase(), Phase::Completed(_) | Phase::Failed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.state.phase(), Phase::Cancelled)
    }

    /// True if the request has made no progress for `timeout`.
    pub fn has_timeout(&self, timeout: Duration) -> bool {
        self.state.since_progress() > timeout
    }

    /// Logs what every worker is doing, then requests cancellation without waiting for it.
    ///
    /// Returns true if the request is now cancelled.
    pub fn terminate(&self) -> bool {
        terminate(&self.state, &self.workers)
    }

    /// Blocks until the request finishes.
    ///
    /// # Panics
    ///
    /// If the task was dropped before reporting a result.
    pub fn join(&self) -> Result<GenerationOutcome, GenerationError> {
        match self.state.wait() {
            Phase::Completed(outcome) => Ok(outcome),
            Phase::Failed(e) => Err(e),
            Phase::Cancelled => Err(GenerationError::Cancelled),
            Phase::Abandoned => panic!("{} was interrupted without reporting a result", self.state),
            Phase::Pending | Phase::Running => unreachable!(),
        }
    }

    /// True if the two requests' padded footprints overlap. Symmetric.
    pub fn too_close(&self, other: &GenerationRequest) -> bool {
        self.state.too_close(&other.state)
    }
}

impl fmt::Display for GenerationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.state)
    }
}

pub(crate) fn terminate(state: &RequestState, workers: &WorkerTable) -> bool {
    info!("Terminating {}", state);
    workers.dump();
    let cancelled = state.request_cancel();
    debug!("{} cancelled: {}", state, cancelled);
    cancelled
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    fn state(id: RequestId, x: i32, z: i32, range: i32) -> RequestState {
        RequestState::new(id, ChunkPos::new(x, z), range, GenerationStep::Features, LightMode::Fancy, 2)
    }

    #[test]
    fn too_close_is_symmetric() {
        let a = state(0, 0, 0, 4);
        for (x, z, range) in [(10, 0, 2), (11, 0, 2), (-3, 9, 0), (20, 20, 20), (0, -8, 1)] {
            let b = state(1, x, z, range);
            assert_eq!(a.too_close(&b), b.too_close(&a), "{} vs {}", a, b);
        }
        // 4 + 2 + 1 + 2 = 9
        assert!(a.too_close(&state(1, 8, 0, 2)));
        assert!(!a.too_close(&state(1, 9, 0, 2)));
    }

    #[test]
    fn cancelling_pending_request_is_terminal() {
        let s = state(0, 0, 0, 0);
        assert!(s.request_cancel());
        assert!(!s.begin());
        assert!(matches!(s.wait(), Phase::Cancelled));
        assert!(matches!(s.finish(Ok(GenerationOutcome::default())), Phase::Cancelled));
    }

    #[test]
    fn terminal_phases_are_counted_once() {
        let counters = Arc::new(PhaseCounters::default());
        let a = state(0, 0, 0, 0).with_counters(counters.clone());
        let b = state(1, 0, 0, 0).with_counters(counters.clone());
        let c = state(2, 0, 0, 0).with_counters(counters.clone());

        assert!(a.begin());
        a.finish(Ok(GenerationOutcome::default()));
        a.abandon();
        assert!(b.request_cancel());
        assert!(b.request_cancel());
        assert!(c.begin());
        c.abandon();

        assert_eq!(counters.completed.load(Ordering::Relaxed), 1);
        assert_eq!(counters.cancelled.load(Ordering::Relaxed), 1);
        assert_eq!(counters.failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn cancel_while_running_beats_success() {
        let s = state(0, 0, 0, 0);
        assert!(s.begin());
        assert!(s.request_cancel());
        assert!(matches!(s.finish(Ok(GenerationOutcome::default())), Phase::Cancelled));
    }

    #[test]
    fn completed_request_cannot_be_cancelled() {
        let s = state(0, 0, 0, 0);
        assert!(s.begin());
        s.finish(Ok(GenerationOutcome::default()));
        assert!(!s.request_cancel());
        assert!(matches!(s.phase(), Phase::Completed(_)));
    }

    #[test]
    fn wait_blocks_until_finished() {
        let s = state(0, 0, 0, 0);
        assert!(s.begin());
        crossbeam::scope(|scope| {
            let waiter = scope.spawn(|_| s.wait());
            std::thread::sleep(Duration::from_millis(20));
            s.finish(Err(GenerationError::Synthesis("boom".into())));
            assert!(matches!(waiter.join().unwrap(), Phase::Failed(GenerationError::Synthesis(_))));
        })
        .unwrap();
    }

    #[test]
    fn progress_refresh_resets_timeout() {
        let s = state(0, 0, 0, 0);
        std::thread::sleep(Duration::from_millis(30));
        assert!(s.since_progress() >= Duration::from_millis(30));
        s.refresh();
        assert!(s.since_progress() < Duration::from_millis(30));
    }
}
