//! Majordomo request handler backed by the NLU pipeline

use async_trait::async_trait;
use bytes::Bytes;
use majordomo::{MdpError, RequestHandler};
use nlu::Pipeline;
use std::sync::Arc;
use tracing::debug;

/// Runs request text through a shared pipeline and replies with JSON
///
/// Body frames are decoded as UTF-8 and joined with a single space. The
/// reply is one frame holding the merged context as a JSON object.
#[derive(Debug, Clone)]
pub struct NluHandler {
    pipeline: Arc<Pipeline>,
}

impl NluHandler {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl RequestHandler for NluHandler {
    async fn handle(&self, request: Vec<Bytes>) -> majordomo::Result<Vec<Bytes>> {
        let text = request_text(&request)?;
        let context = self
            .pipeline
            .process(&text)
            .map_err(|e| MdpError::handler(e.to_string()))?;
        debug!(chars = text.len(), fields = context.len(), "Processed request");

        let reply = serde_json::to_vec(&context)
            .map_err(|e| MdpError::handler(format!("failed to encode reply: {}", e)))?;
        Ok(vec![Bytes::from(reply)])
    }
}

fn request_text(frames: &[Bytes]) -> majordomo::Result<String> {
    let parts = frames
        .iter()
        .map(|frame| std::str::from_utf8(frame))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| MdpError::handler(format!("request is not valid UTF-8: {}", e)))?;
    Ok(parts.join(" "))
}
