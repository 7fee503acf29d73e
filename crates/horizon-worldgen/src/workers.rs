use crate::request::{RequestId, RequestState};

use horizon_map::ChunkPos;

use log::info;
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::fmt;
use std::time::{Duration, Instant};

pub(crate) const WORKER_NAME_PREFIX: &str = "horizon-gen-";

/// Stages that can block for long: storage I/O, decoding, synthesis and waits on other requests.
const TRACED_STAGES: [&str; 5] = [
    "reading",
    "decoding",
    "synthesizing",
    "waiting for overlapping requests",
    "waiting for claimed chunk",
];

/// What one pool thread is doing right now.
#[derive(Clone, Debug)]
pub struct WorkerStatus {
    pub thread_name: String,
    pub request: Option<RequestId>,
    pub target: Option<ChunkPos>,
    pub stage: &'static str,
    pub time_in_stage: Duration,
    /// Captured when the worker entered its current stage, if backtraces are enabled and the stage can block for long.
    pub backtrace: Option<String>,
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.request, self.target) {
            (Some(id), Some(target)) => write!(
                f,
                "{}: request #{} at {}, {} for {:?}",
                self.thread_name, id, target, self.stage, self.time_in_stage
            )?,
            _ => write!(f, "{}: idle", self.thread_name)?,
        }
        if let Some(backtrace) = &self.backtrace {
            write!(f, "\n{}", backtrace)?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct WorkerSlot {
    request: Option<(RequestId, ChunkPos)>,
    stage: &'static str,
    stage_started: Option<Instant>,
    // Symbols are resolved only when a snapshot is taken.
    backtrace: Option<Backtrace>,
}

/// One status slot per pool thread, indexed by [`rayon::current_thread_index`].
pub(crate) struct WorkerTable {
    slots: Vec<Mutex<WorkerSlot>>,
    capture_backtraces: bool,
}

impl WorkerTable {
    pub fn new(num_threads: usize, capture_backtraces: bool) -> Self {
        Self {
            slots: (0..num_threads).map(|_| Mutex::default()).collect(),
            capture_backtraces,
        }
    }

    fn current_slot(&self) -> Option<&Mutex<WorkerSlot>> {
        self.slots.get(rayon::current_thread_index()?)
    }

    /// Marks the current pool thread as working on `request` until the guard drops.
    pub fn claim(&self, request: &RequestState) -> WorkerGuard<'_> {
        if let Some(slot) = self.current_slot() {
            let mut slot = slot.lock();
            slot.request = Some((request.id, request.target));
        }
        self.set_stage("starting");
        WorkerGuard { table: self }
    }

    pub fn set_stage(&self, stage: &'static str) {
        let slot = match self.current_slot() {
            Some(s) => s,
            None => return,
        };
        let mut slot = slot.lock();
        if slot.stage == stage && slot.stage_started.is_some() {
            return;
        }
        slot.stage = stage;
        slot.stage_started = Some(Instant::now());
        slot.backtrace = if self.capture_backtraces && TRACED_STAGES.contains(&stage) {
            Some(Backtrace::force_capture())
        } else {
            None
        };
    }

    pub fn snapshot(&self) -> Vec<WorkerStatus> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let slot = slot.lock();
                WorkerStatus {
                    thread_name: format!("{}{}", WORKER_NAME_PREFIX, i),
                    request: slot.request.map(|(id, _)| id),
                    target: slot.request.map(|(_, target)| target),
                    stage: slot.stage,
                    time_in_stage: slot.stage_started.map(|t| t.elapsed()).unwrap_or_default(),
                    backtrace: slot.backtrace.as_ref().map(|b| b.to_string()),
                }
            })
            .collect()
    }

    pub fn dump(&self) {
        for status in self.snapshot() {
            info!("{}", status);
        }
    }
}

/// Clears the worker's slot however the task exits.
pub(crate) struct WorkerGuard<'a> {
    table: &'a WorkerTable,
}

impl Drop for WorkerGuard<'_> {
    fn drop(&mut self) {
        if let Some(slot) = self.table.current_slot() {
            *slot.lock() = WorkerSlot::default();
        }
    }
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
    use horizon_map::{GenerationStep, LightMode};

    #[test]
    fn guard_clears_slot_even_on_panic() {
        let table = WorkerTable::new(1, true);
        let request = RequestState::new(7, ChunkPos::new(1, 2), 0, GenerationStep::Full, LightMode::Fast, 0);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();

        pool.install(|| {
            let _guard = table.claim(&request);
            table.set_stage("decoding");
            let statuses = table.snapshot();
            let status = &statuses[0];
            assert_eq!(status.request, Some(7));
            assert_eq!(status.stage, "decoding");
            assert!(status.backtrace.is_some());
        });
        assert_eq!(table.snapshot()[0].request, None);

        let result = pool.install(|| {
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let _guard = table.claim(&request);
                panic!("worker failure");
            }))
        });
        assert!(result.is_err());
        let statuses = table.snapshot();
        let status = &statuses[0];
        assert_eq!(status.request, None);
        assert_eq!(status.to_string(), "horizon-gen-0: idle");
    }

    #[test]
    fn backtraces_cover_blocking_stages_only() {
        let table = WorkerTable::new(1, true);
        let request = RequestState::new(2, ChunkPos::new(0, 0), 0, GenerationStep::Full, LightMode::Fast, 0);
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();

        pool.install(|| {
            let _guard = table.claim(&request);
            assert!(table.snapshot()[0].backtrace.is_none());

            table.set_stage("synthesizing");
            let status = table.snapshot().remove(0);
            assert!(status.backtrace.is_some());
            assert!(status.to_string().starts_with("horizon-gen-0: request #2 at"));

            // Leaving a traced stage drops its stale backtrace.
            table.set_stage("summarizing");
            assert!(table.snapshot()[0].backtrace.is_none());
        });

        let untraced = WorkerTable::new(1, false);
        pool.install(|| {
            let _guard = untraced.claim(&request);
            untraced.set_stage("decoding");
            assert!(untraced.snapshot()[0].backtrace.is_none());
        });
    }

    #[test]
    fn threads_outside_the_pool_have_no_slot() {
        let table = WorkerTable::new(2, false);
        let request = RequestState::new(1, ChunkPos::new(0, 0), 0, GenerationStep::Full, LightMode::Fast, 0);
        let _guard = table.claim(&request);
        assert!(table.snapshot().iter().all(|s| s.request.is_none()));
    }
}
