use std::convert::TryInto;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Accumulates the time spent on completed work items. Shared by worker threads.
#[derive(Debug, Default)]
pub struct WorkTimer {
    total_cpu_time_ns: AtomicU64,
    items_completed: AtomicU32,
}

impl WorkTimer {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn total_cpu_time(&self) -> Duration {
        Duration::from_nanos(self.total_cpu_time_ns.load(Ordering::Relaxed))
    }

    pub fn items_completed(&self) -> u32 {
        self.items_completed.load(Ordering::Relaxed)
    }

    pub fn complete_item(&self, d: Duration) {
        let nanos: u64 = d.as_nanos().try_into().unwrap_or(u64::MAX);
        self.total_cpu_time_ns.fetch_add(nanos, Ordering::Relaxed);
        self.items_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn average_cpu_time_us(&self) -> u32 {
        let total_us: u32 = self
            .total_cpu_time()
            .as_micros()
            .try_into()
            .unwrap_or(u32::MAX);

        total_us / self.items_completed().max(1)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
