use crate::error::GenerationError;
use crate::request::{RequestId, RequestState};
use crate::workers::WorkerTable;

/// Passed explicitly to everything that runs on behalf of a generation request.
///
/// Collaborators use [`GenerationContext::is_speculative`] to tell LOD generation apart from the host's real simulation, and
/// call [`GenerationContext::checkpoint`] inside loops so cancellation is noticed promptly.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    request: Option<&'a RequestState>,
    workers: Option<&'a WorkerTable>,
}

impl<'a> GenerationContext<'a> {
    /// Context of the host's own simulation. Never cancelled and not speculative.
    pub fn live() -> GenerationContext<'static> {
        GenerationContext {
            request: None,
            workers: None,
        }
    }

    pub(crate) fn for_request(request: &'a RequestState, workers: &'a WorkerTable) -> Self {
        Self {
            request: Some(request),
            workers: Some(workers),
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        self.request.map(|r| r.id)
    }

    /// True while generating LOD data that will never become part of the real world.
    pub fn is_speculative(&self) -> bool {
        self.request.is_some()
    }

    /// Checks for cancellation without recording progress.
    pub fn is_cancelled(&self) -> bool {
        self.request.map_or(false, |r| r.cancel_requested())
    }

    /// Records progress at `stage`. Returns [`GenerationError::Cancelled`] if cancellation was requested.
    pub fn checkpoint(&self, stage: &'static str) -> Result<(), GenerationError> {
        if let Some(workers) = self.workers {
            workers.set_stage(stage);
        }
        match self.request {
            Some(request) => {
                request.refresh();
                if request.cancel_requested() {
                    Err(GenerationError::Cancelled)
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
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
    use horizon_map::{ChunkPos, GenerationStep, LightMode};

    #[test]
    fn checkpoint_observes_cancellation() {
        let workers = WorkerTable::new(1, false);
        let request = RequestState::new(3, ChunkPos::new(0, 0), 1, GenerationStep::Surface, LightMode::Fancy, 0);
        assert!(request.begin());
        let ctx = GenerationContext::for_request(&request, &workers);
        assert!(ctx.is_speculative());
        assert_eq!(ctx.request_id(), Some(3));
        assert!(ctx.checkpoint("first").is_ok());

        request.request_cancel();
        assert!(matches!(ctx.checkpoint("second"), Err(GenerationError::Cancelled)));
    }

    #[test]
    fn live_context_is_never_cancelled() {
        let ctx = GenerationContext::live();
        assert!(!ctx.is_speculative());
        assert!(ctx.checkpoint("anything").is_ok());
    }
}
