//! Frame pipeline: capture and processing on separate tasks
//!
//! The engine is moved into a single processing task and fed through a
//! bounded queue, so only one ingest is ever in flight. A full queue makes
//! producers wait. The latest confirmed state is always published on a watch
//! channel for renderers that only care about "now".
//!
//! [`FramePipeline::spawn`] publishes state only. [`FramePipeline::spawn_with_outputs`]
//! also streams every per-frame result in order; that stream is lossless, so
//! its receiver must be drained or dropped, otherwise it backs up into
//! [`FramePipeline::submit`].

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::core::StabilityEngine;
use crate::types::{Candidate, ExpressionTag, StateOutput};
use crate::{Result, StabilityError};

/// Handle to a running pipeline
#[derive(Debug)]
pub struct FramePipeline {
    frames: mpsc::Sender<Candidate>,
    state: watch::Receiver<ExpressionTag>,
    task: JoinHandle<StabilityEngine>,
}

impl FramePipeline {
    /// Spawn the processing task publishing confirmed state only
    ///
    /// Must be called inside a tokio runtime.
    pub fn spawn(engine: StabilityEngine, capacity: usize) -> Self {
        Self::start(engine, capacity, None)
    }

    /// Spawn the processing task and stream every frame's result in order
    pub fn spawn_with_outputs(
        engine: StabilityEngine,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<Result<StateOutput>>) {
        let (out_tx, out_rx) = mpsc::channel(capacity.max(1));
        (Self::start(engine, capacity, Some(out_tx)), out_rx)
    }

    fn start(
        mut engine: StabilityEngine,
        capacity: usize,
        out_tx: Option<mpsc::Sender<Result<StateOutput>>>,
    ) -> Self {
        let (frame_tx, mut frame_rx) = mpsc::channel::<Candidate>(capacity.max(1));
        let (state_tx, state_rx) = watch::channel(engine.state().clone());

        let task = tokio::spawn(async move {
            while let Some(candidate) = frame_rx.recv().await {
                let result = engine.update(&candidate);
                match &result {
                    Ok(output) if output.changed => {
                        state_tx.send_replace(output.state.clone());
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "frame rejected"),
                }
                if let Some(out_tx) = &out_tx {
                    // Receiver dropped is fine; keep processing
                    let _ = out_tx.send(result).await;
                }
            }
            debug!(frames = engine.frame_count(), "pipeline drained");
            engine
        });

        Self {
            frames: frame_tx,
            state: state_rx,
            task,
        }
    }

    /// Queue one frame, waiting while the queue is full
    pub async fn submit(&self, candidate: Candidate) -> Result<()> {
        self.frames
            .send(candidate)
            .await
            .map_err(|_| StabilityError::PipelineClosed("processing task has stopped".into()))
    }

    /// Extra producer handle, e.g. for a capture thread
    pub fn sender(&self) -> mpsc::Sender<Candidate> {
        self.frames.clone()
    }

    /// Latest confirmed state
    pub fn current_state(&self) -> ExpressionTag {
        self.state.borrow().clone()
    }

    /// Watch channel for the confirmed state
    pub fn subscribe(&self) -> watch::Receiver<ExpressionTag> {
        self.state.clone()
    }

    /// Stop accepting frames, drain the queue and return the engine
    ///
    /// Waits for every cloned sender to be dropped as well.
    pub async fn shutdown(self) -> Result<StabilityEngine> {
        drop(self.frames);
        self.task
            .await
            .map_err(|e| StabilityError::PipelineClosed(e.to_string()))
    }
}
