use crate::context::GenerationContext;

use horizon_map::ScheduledTick;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Receives block and fluid updates produced while building terrain.
pub trait TickScheduler: Send + Sync {
    /// Returns false if the tick was dropped.
    fn schedule(&self, ctx: &GenerationContext, tick: ScheduledTick) -> bool;
}

/// Queues ticks from live contexts and drops those scheduled while generating speculatively.
#[derive(Default)]
pub struct TickQueue {
    queued: Mutex<Vec<ScheduledTick>>,
    suppressed: AtomicUsize,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<ScheduledTick> {
        std::mem::take(&mut *self.queued.lock())
    }

    pub fn len(&self) -> usize {
        self.queued.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.lock().is_empty()
    }

    /// Number of ticks dropped so far.
    pub fn suppressed(&self) -> usize {
        self.suppressed.load(Ordering::Relaxed)
    }
}

impl TickScheduler for TickQueue {
    fn schedule(&self, ctx: &GenerationContext, tick: ScheduledTick) -> bool {
        if ctx.is_speculative() {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.queued.lock().push(tick);
        true
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
    use crate::request::RequestState;
    use crate::workers::WorkerTable;
    use horizon_map::glam::IVec3;
    use horizon_map::{ChunkPos, GenerationStep, LightMode};

    fn tick() -> ScheduledTick {
        ScheduledTick {
            id: "minecraft:sand".into(),
            pos: IVec3::new(1, 64, 1),
            delay: 2,
            priority: 0,
        }
    }

    #[test]
    fn speculative_ticks_are_suppressed() {
        let queue = TickQueue::new();
        assert!(queue.schedule(&GenerationContext::live(), tick()));

        let workers = WorkerTable::new(1, false);
        let request = RequestState::new(0, ChunkPos::new(0, 0), 0, GenerationStep::Full, LightMode::Fancy, 0);
        let ctx = GenerationContext::for_request(&request, &workers);
        assert!(!queue.schedule(&ctx, tick()));

        assert_eq!(queue.suppressed(), 1);
        assert_eq!(queue.drain(), vec![tick()]);
        assert!(queue.is_empty());
    }
}
