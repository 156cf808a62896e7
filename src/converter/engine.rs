use futures_util::future::LocalBoxFuture;

use crate::{blob::BlobUrl, job::JobId};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("conversion engine is not loaded")]
    Unavailable,
    #[error("no target format selected")]
    MissingTarget,
    #[error("unsupported conversion: {from} -> {to}")]
    Unsupported { from: String, to: String },
    #[error("conversion failed: {0}")]
    Failed(String),
    #[error("engine produced no output")]
    EmptyOutput,
    #[error("engine io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the engine needs for one job.
#[derive(Debug, Clone, Copy)]
pub struct ConversionRequest<'a> {
    pub job_id: JobId,
    pub file_name: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub url: BlobUrl,
    pub output: String,
}

/// The shared conversion engine. Implementations are never called
/// concurrently by the worklist; one request resolves before the next is issued.
pub trait ConversionEngine {
    fn convert<'a>(
        &'a self,
        request: ConversionRequest<'a>,
    ) -> LocalBoxFuture<'a, Result<ConversionOutput, EngineError>>;
}
