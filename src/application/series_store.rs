// Series store trait - Durable append-only sample history
use crate::application::error::PipelineError;
use crate::domain::sample::{Sample, Series};
use async_trait::async_trait;
use std::fmt;

/// Opaque version of the stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub String);

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Read the full series in insertion order.
    async fn read(&self) -> Result<(Series, Revision), PipelineError>;

    /// Read-modify-write append. Fails with `Conflict` when the document
    /// changed between the read and the write; nothing is written then.
    async fn append(&self, sample: Sample) -> Result<Revision, PipelineError>;
}
