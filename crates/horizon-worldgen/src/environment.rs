use crate::config::GenerationConfig;
use crate::context::GenerationContext;
use crate::error::{EnvironmentError, GenerationError};
use crate::request::{terminate, GenerationOutcome, GenerationRequest, PhaseCounters, RequestId, RequestState};
use crate::summary::ChunkColumns;
use crate::synth::TerrainSynthesizer;
use crate::ticks::TickScheduler;
use crate::workers::{WorkerStatus, WorkerTable, WORKER_NAME_PREFIX};

use horizon_core::work_timer::WorkTimer;
use horizon_core::SmallKeyHashMap;
use horizon_map::{
    chunk_chessboard_distance, ChunkPos, ChunkStorage, GenerationStep, LightMode, LodIndex, NodeKey, SnapshotDecoder,
    TerrainSnapshot, CHUNK_LEVEL,
};

use log::{debug, trace, warn};
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const BACKOFF_POLL: Duration = Duration::from_millis(10);
const CLAIM_POLL: Duration = Duration::from_millis(50);

/// The collaborators every generation task uses.
#[derive(Clone)]
pub struct GenerationServices {
    pub index: Arc<LodIndex>,
    pub storage: Arc<dyn ChunkStorage>,
    pub decoder: Arc<SnapshotDecoder>,
    pub synthesizer: Arc<dyn TerrainSynthesizer>,
    pub ticks: Arc<dyn TickScheduler>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GenerationStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Chunks written to the index.
    pub chunks_generated: u32,
    pub average_chunk_time_us: u32,
}

struct Shared {
    config: GenerationConfig,
    services: GenerationServices,
    in_flight: Mutex<Vec<Arc<RequestState>>>,
    /// Chunks currently being generated, and by which request.
    claims: Mutex<SmallKeyHashMap<ChunkPos, RequestId>>,
    claim_released: Condvar,
    workers: Arc<WorkerTable>,
    submitted: AtomicU64,
    phases: Arc<PhaseCounters>,
    chunk_timer: WorkTimer,
}

/// Runs generation requests on a fixed pool of worker threads.
///
/// Submission never blocks. Requests with overlapping footprints are allowed to run at the same time: a request first waits
/// briefly for earlier overlapping requests, and then every chunk is claimed before it is generated, so a chunk shared by
/// several footprints is generated by at most one of them. The others find it in the index afterwards.
pub struct BatchGenerationEnvironment {
    pool: ThreadPool,
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl BatchGenerationEnvironment {
    pub fn new(config: GenerationConfig, services: GenerationServices) -> Result<Self, EnvironmentError> {
        let num_threads = config.worker_threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("{}{}", WORKER_NAME_PREFIX, i))
            .build()?;
        debug!("Started {} generation workers", num_threads);

        Ok(Self {
            pool,
            shared: Arc::new(Shared {
                config,
                services,
                in_flight: Mutex::new(Vec::new()),
                claims: Mutex::new(SmallKeyHashMap::default()),
                claim_released: Condvar::new(),
                workers: Arc::new(WorkerTable::new(num_threads, config.capture_backtraces)),
                submitted: AtomicU64::new(0),
                phases: Arc::default(),
                chunk_timer: WorkTimer::start(),
            }),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.shared.config
    }

    pub fn services(&self) -> &GenerationServices {
        &self.shared.services
    }

    /// Queues generation of every chunk within `range` (chessboard) of `target`.
    pub fn submit(
        &self,
        target: ChunkPos,
        range: i32,
        step: GenerationStep,
        light_mode: LightMode,
    ) -> GenerationRequest {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(
            RequestState::new(
                id,
                target,
                range,
                step,
                light_mode,
                self.shared.config.required_empty_margin,
            )
            .with_counters(self.shared.phases.clone()),
        );
        {
            let mut in_flight = self.shared.in_flight.lock();
            in_flight.retain(|r| !r.phase().is_terminal());
            in_flight.push(state.clone());
        }
        self.shared.submitted.fetch_add(1, Ordering::Relaxed);
        debug!("Submitted {}", state);

        let task = Task {
            shared: self.shared.clone(),
            state: state.clone(),
        };
        self.pool.spawn(move || task.run());

        GenerationRequest::new(state, self.shared.workers.clone())
    }

    /// Queues generation of the chunks under an LOD node.
    pub fn submit_for_quadrant(&self, key: NodeKey, step: GenerationStep, light_mode: LightMode) -> GenerationRequest {
        if key.level <= CHUNK_LEVEL {
            let chunk = key.ancestor(CHUNK_LEVEL).coordinates;
            return self.submit(ChunkPos::from(chunk), 0, step, light_mode);
        }
        // The square around the center covers the node plus one row and column of neighbors.
        let extent = key.chunk_extent().into_inner();
        let half = extent.shape.x / 2;
        self.submit(ChunkPos::from(extent.minimum + half), half, step, light_mode)
    }

    /// Number of submitted requests that have not finished.
    pub fn in_flight(&self) -> usize {
        self.shared
            .in_flight
            .lock()
            .iter()
            .filter(|r| !r.phase().is_terminal())
            .count()
    }

    /// Terminates every request that made no progress within the configured timeout. Returns how many were terminated.
    pub fn sweep_timeouts(&self) -> usize {
        let timeout = self.shared.config.request_timeout();
        let stale: Vec<_> = self
            .shared
            .in_flight
            .lock()
            .iter()
            .filter(|r| !r.cancel_requested() && !r.phase().is_terminal() && r.since_progress() > timeout)
            .cloned()
            .collect();
        let mut terminated = 0;
        for state in stale {
            warn!("{} made no progress for {:?}", state, state.since_progress());
            if terminate(&state, &self.shared.workers) {
                terminated += 1;
            }
        }
        terminated
    }

    pub fn worker_diagnostics(&self) -> Vec<WorkerStatus> {
        self.shared.workers.snapshot()
    }

    pub fn stats(&self) -> GenerationStats {
        let phases = &self.shared.phases;
        GenerationStats {
            submitted: self.shared.submitted.load(Ordering::Relaxed),
            completed: phases.completed.load(Ordering::Relaxed),
            failed: phases.failed.load(Ordering::Relaxed),
            cancelled: phases.cancelled.load(Ordering::Relaxed),
            chunks_generated: self.shared.chunk_timer.items_completed(),
            average_chunk_time_us: self.shared.chunk_timer.average_cpu_time_us(),
        }
    }
}

/// A request's work as it sits in the pool queue. If it is dropped without reporting a result, the request is marked
/// abandoned so that joining it cannot hang.
struct Task {
    shared: Arc<Shared>,
    state: Arc<RequestState>,
}

impl Task {
    fn run(self) {
        if !self.state.begin() {
            trace!("{} was cancelled before it started", self.state);
            return;
        }
        let result = catch_unwind(AssertUnwindSafe(|| self.shared.generate(&self.state)))
            .unwrap_or_else(|payload| Err(GenerationError::Panicked(panic_message(&*payload))));
        if let Err(e) = &result {
            match e {
                GenerationError::Cancelled => debug!("{} was cancelled", self.state),
                e => warn!("{} failed: {}", self.state, e),
            }
        }
        self.state.finish(result);
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.state.abandon();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Releases a chunk claim when dropped.
struct ClaimGuard<'a> {
    shared: &'a Shared,
    chunk: ChunkPos,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.shared.claims.lock().remove(&self.chunk);
        self.shared.claim_released.notify_all();
    }
}

impl Shared {
    fn generate(&self, state: &RequestState) -> Result<GenerationOutcome, GenerationError> {
        let _worker = self.workers.claim(state);
        let ctx = GenerationContext::for_request(state, &self.workers);

        self.back_off(state, &ctx)?;

        let mut outcome = GenerationOutcome::default();
        let mut deferred = Vec::new();
        for chunk in footprint(state.target, state.range) {
            ctx.checkpoint("generating")?;
            match self.try_claim(chunk, state.id) {
                Some(_claim) => self.generate_chunk(&ctx, state, chunk, &mut outcome)?,
                None => deferred.push(chunk),
            }
        }
        // Chunks that another request was generating. Usually they are in the index by now.
        for chunk in deferred {
            let _claim = self.wait_for_claim(&ctx, chunk, state.id)?;
            self.generate_chunk(&ctx, state, chunk, &mut outcome)?;
        }

        debug!("Finished {}: {:?}", state, outcome);
        Ok(outcome)
    }

    /// Waits up to the configured back-off for earlier, running requests that overlap this one.
    fn back_off(&self, state: &RequestState, ctx: &GenerationContext) -> Result<(), GenerationError> {
        let deadline = Instant::now() + self.config.overlap_backoff();
        loop {
            ctx.checkpoint("waiting for overlapping requests")?;
            let blocked = self
                .in_flight
                .lock()
                .iter()
                .any(|other| other.id < state.id && other.is_running() && other.too_close(state));
            if !blocked {
                return Ok(());
            }
            if Instant::now() >= deadline {
                debug!("{} overlaps a running request; merging", state);
                return Ok(());
            }
            thread::sleep(BACKOFF_POLL);
        }
    }

    fn try_claim(&self, chunk: ChunkPos, id: RequestId) -> Option<ClaimGuard<'_>> {
        let mut claims = self.claims.lock();
        if claims.contains_key(&chunk) {
            return None;
        }
        claims.insert(chunk, id);
        Some(ClaimGuard { shared: self, chunk })
    }

    fn wait_for_claim(
        &self,
        ctx: &GenerationContext,
        chunk: ChunkPos,
        id: RequestId,
    ) -> Result<ClaimGuard<'_>, GenerationError> {
        loop {
            ctx.checkpoint("waiting for claimed chunk")?;
            let mut claims = self.claims.lock();
            if !claims.contains_key(&chunk) {
                claims.insert(chunk, id);
                return Ok(ClaimGuard { shared: self, chunk });
            }
            self.claim_released.wait_for(&mut claims, CLAIM_POLL);
        }
    }

    fn generate_chunk(
        &self,
        ctx: &GenerationContext,
        state: &RequestState,
        chunk: ChunkPos,
        outcome: &mut GenerationOutcome,
    ) -> Result<(), GenerationError> {
        let started = Instant::now();
        let key = NodeKey::chunk(chunk);
        if let Some(existing) = self.services.index.mode_at_key(key) {
            if existing >= state.step.mode() {
                trace!("Chunk {} already has {:?} data", chunk, existing);
                outcome.merged += 1;
                return Ok(());
            }
        }

        ctx.checkpoint("reading")?;
        let columns = match self.load(ctx, state, chunk)? {
            Some(snapshot) => {
                outcome.decoded += 1;
                ChunkColumns::from_snapshot(&snapshot)
            }
            None => {
                ctx.checkpoint("synthesizing")?;
                outcome.synthesized += 1;
                self.services.synthesizer.synthesize(ctx, chunk, state.step)?
            }
        };

        ctx.checkpoint("summarizing")?;
        for tick in columns.ticks.iter().cloned() {
            if !self.services.ticks.schedule(ctx, tick) {
                outcome.suppressed_ticks += 1;
            }
        }
        if !self.services.index.add_and_propagate(columns.summarize()) {
            trace!("Chunk {} did not change the index", chunk);
        }
        outcome.generated += 1;
        self.chunk_timer.complete_item(started.elapsed());
        Ok(())
    }

    /// The persisted chunk, if it exists and is complete enough.
    fn load(
        &self,
        ctx: &GenerationContext,
        state: &RequestState,
        chunk: ChunkPos,
    ) -> Result<Option<TerrainSnapshot>, GenerationError> {
        let payload = match self.services.storage.read_chunk(chunk)? {
            Some(p) => p,
            None => return Ok(None),
        };
        ctx.checkpoint("decoding")?;
        match self
            .services
            .decoder
            .decode(chunk, &payload, state.step, state.light_mode)
        {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                warn!("Failed to decode chunk {}, synthesizing it instead: {}", chunk, e);
                Ok(None)
            }
        }
    }
}

/// Chunks within `range` of `target`, nearest first.
fn footprint(target: ChunkPos, range: i32) -> Vec<ChunkPos> {
    let mut chunks: Vec<_> = (-range..=range)
        .flat_map(|dz| (-range..=range).map(move |dx| ChunkPos::new(target.x() + dx, target.z() + dz)))
        .collect();
    chunks.sort_by_key(|&c| chunk_chessboard_distance(c, target));
    chunks
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
