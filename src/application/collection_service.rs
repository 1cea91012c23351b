// Collection service - Scrape one reading and append it to the store
use crate::application::error::PipelineError;
use crate::application::sample_source::SampleSource;
use crate::application::series_store::SeriesStore;
use crate::domain::sample::Sample;
use std::sync::Arc;

pub struct CollectionService {
    source: Box<dyn SampleSource>,
    store: Arc<dyn SeriesStore>,
}

impl CollectionService {
    pub fn new(source: Box<dyn SampleSource>, store: Arc<dyn SeriesStore>) -> Self {
        Self { source, store }
    }

    /// Login, read, append, strictly in that order. The browser session is
    /// closed whatever the outcome.
    pub async fn collect(&mut self) -> Result<Sample, PipelineError> {
        let result = self.scrape().await;
        self.source.close().await;
        let sample = result?;

        let revision = self.store.append(sample.clone()).await?;
        tracing::info!(
            "Stored remaining data {} at {} (revision {})",
            sample.remaining_data,
            sample.date,
            revision
        );

        Ok(sample)
    }

    async fn scrape(&mut self) -> Result<Sample, PipelineError> {
        self.source.login().await?;
        tracing::info!("Logged into the portal");

        let sample = self.source.read_quota().await?;
        tracing::info!("Read remaining data: {}", sample.remaining_data);
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::{InMemorySeriesStore, ScriptedSource};
    use chrono::{TimeZone, Utc};

    fn reading(value: f64) -> Sample {
        Sample::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(), value)
    }

    #[tokio::test]
    async fn test_collect_appends_reading() {
        let existing = vec![Sample::new(Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(), 20.0)];
        let store = Arc::new(InMemorySeriesStore::with_series(existing.clone()));
        let source = ScriptedSource {
            quota: Some(reading(19.5)),
            ..Default::default()
        };

        let mut service = CollectionService::new(Box::new(source.clone()), store.clone());
        let sample = service.collect().await.unwrap();

        assert_eq!(sample, reading(19.5));
        assert_eq!(source.calls(), vec!["login", "read_quota", "close"]);
        assert_eq!(store.snapshot().unwrap(), vec![existing[0].clone(), reading(19.5)]);
    }

    #[tokio::test]
    async fn test_collect_creates_first_entry() {
        let store = Arc::new(InMemorySeriesStore::default());
        let source = ScriptedSource {
            quota: Some(reading(50.0)),
            ..Default::default()
        };

        CollectionService::new(Box::new(source), store.clone()).collect().await.unwrap();

        assert_eq!(store.snapshot().unwrap(), vec![reading(50.0)]);
    }

    #[tokio::test]
    async fn test_rejected_login_stops_the_run() {
        let store = Arc::new(InMemorySeriesStore::with_series(Vec::new()));
        let source = ScriptedSource {
            reject_login: true,
            quota: Some(reading(1.0)),
            ..Default::default()
        };

        let error = CollectionService::new(Box::new(source.clone()), store.clone())
            .collect()
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::Auth(_)));
        assert_eq!(source.calls(), vec!["login", "close"]);
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_quota_element() {
        let store = Arc::new(InMemorySeriesStore::with_series(Vec::new()));
        let source = ScriptedSource::default();

        let error = CollectionService::new(Box::new(source), store.clone())
            .collect()
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::Extraction(_)));
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflicting_append_is_reported() {
        let store = Arc::new(InMemorySeriesStore::with_series(Vec::new()).with_conflicts());
        let source = ScriptedSource {
            quota: Some(reading(3.0)),
            ..Default::default()
        };

        let error = CollectionService::new(Box::new(source), store.clone())
            .collect()
            .await
            .unwrap_err();

        assert!(matches!(error, PipelineError::Conflict { .. }));
        assert!(store.snapshot().unwrap().is_empty());
    }
}
