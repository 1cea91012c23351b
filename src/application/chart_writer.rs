// Chart writer trait - Publishing the rendered chart artifact
use crate::application::error::PipelineError;
use crate::domain::chart::ChartDocument;
use async_trait::async_trait;

#[async_trait]
pub trait ChartWriter: Send + Sync {
    /// Publish the document. Implementations must not leave a partially
    /// written artifact behind on failure.
    async fn write(&self, document: &ChartDocument) -> Result<(), PipelineError>;
}
