// Sample source trait - Reading the quota from the vendor portal
use crate::application::error::PipelineError;
use crate::domain::sample::Sample;
use async_trait::async_trait;

#[async_trait]
pub trait SampleSource: Send {
    /// Sign into the portal with the configured credentials.
    async fn login(&mut self) -> Result<(), PipelineError>;

    /// Read the current remaining quota, stamped with the current time.
    async fn read_quota(&mut self) -> Result<Sample, PipelineError>;

    /// Release the underlying session. Failures are logged, not returned.
    async fn close(&mut self);
}
