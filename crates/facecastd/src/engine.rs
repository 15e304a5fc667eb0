use facecast_core::{FaceAnalyzer, FrameOutcome, FramePipeline, PipelineError};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Frames waiting for the engine before senders start to block.
const ENGINE_QUEUE_DEPTH: usize = 8;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from connection tasks to the engine thread.
enum EngineRequest {
    Frame {
        payload: String,
        reply: oneshot::Sender<Result<FrameOutcome, PipelineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run one data-URI frame through the pipeline and wait for the result.
    pub async fn process(&self, payload: String) -> Result<FrameOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Frame {
                payload,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        Ok(reply_rx.await.map_err(|_| EngineError::ChannelClosed)??)
    }
}

/// Move the pipeline onto a dedicated OS thread and return a handle to it.
///
/// The ONNX sessions are not shared: every frame from every client is
/// processed on this one thread, in arrival order.
pub fn spawn_engine<A>(mut pipeline: FramePipeline<A>) -> std::io::Result<EngineHandle>
where
    A: FaceAnalyzer + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(ENGINE_QUEUE_DEPTH);

    std::thread::Builder::new()
        .name("facecast-engine".into())
        .spawn(move || {
            tracing::info!(known_faces = pipeline.known().len(), "engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Frame { payload, reply } => {
                        let result = pipeline.process_data_uri(&payload);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}
