use std::sync::mpsc;
use std::sync::Arc;

use super::{GenerationError, GenerationRequest, GenerationResult, ImageGenerator};

/// Result of a generation request running on a worker thread. The UI loop
/// polls it with [`PendingGeneration::try_take`].
#[derive(Debug)]
pub struct PendingGeneration {
    rx: mpsc::Receiver<GenerationResult<Vec<String>>>,
    finished: bool,
}

pub fn spawn_generation(
    generator: Arc<dyn ImageGenerator>,
    request: GenerationRequest,
) -> PendingGeneration {
    let (tx, rx) = mpsc::channel();
    tracing::debug!(
        prompt = %request.prompt(),
        size = %request.size,
        count = request.num_images,
        "dispatching image generation"
    );
    std::thread::spawn(move || {
        let result = generator.generate(&request);
        let _ = tx.send(result);
    });
    PendingGeneration {
        rx,
        finished: false,
    }
}

impl PendingGeneration {
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `None` while the worker is still running or after the result was taken.
    pub fn try_take(&mut self) -> Option<GenerationResult<Vec<String>>> {
        if self.finished {
            return None;
        }
        match self.rx.try_recv() {
            Ok(result) => {
                self.finished = true;
                Some(result)
            }
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                self.finished = true;
                Some(Err(GenerationError::WorkerDisconnected))
            }
        }
    }

    pub fn wait(self) -> GenerationResult<Vec<String>> {
        if self.finished {
            return Err(GenerationError::WorkerDisconnected);
        }
        self.rx
            .recv()
            .unwrap_or(Err(GenerationError::WorkerDisconnected))
    }
}
