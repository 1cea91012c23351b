// Chart service - Turn the stored series into the chart document
use crate::application::chart_writer::ChartWriter;
use crate::application::error::PipelineError;
use crate::application::series_processor::filter_hourly;
use crate::application::series_store::SeriesStore;
use crate::domain::chart::{calculate_y_axis_range, ChartDocument};
use crate::domain::timezone::{ChartZone, TimezoneDescriptor};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub title: String,
    pub timezone: TimezoneDescriptor,
    /// Zone used for labels and the date controls.
    pub display_zone: ChartZone,
    /// Zone used for hourly bucketing.
    pub bucket_zone: ChartZone,
}

pub struct ChartService {
    store: Arc<dyn SeriesStore>,
    writer: Arc<dyn ChartWriter>,
    options: ChartOptions,
}

impl ChartService {
    pub fn new(store: Arc<dyn SeriesStore>, writer: Arc<dyn ChartWriter>, options: ChartOptions) -> Self {
        Self {
            store,
            writer,
            options,
        }
    }

    /// Read the full series, down-sample it and publish the chart. Nothing is
    /// written unless every input was assembled.
    pub async fn render(&self, now: DateTime<Utc>) -> Result<ChartDocument, PipelineError> {
        let (series, revision) = self.store.read().await?;
        tracing::info!("Loaded {} samples (revision {})", series.len(), revision);

        let filtered = filter_hourly(&series, &self.options.bucket_zone);
        let max_value = filtered
            .iter()
            .map(|sample| sample.remaining_data)
            .fold(0.0, f64::max);
        let axis = calculate_y_axis_range(max_value);
        tracing::debug!(
            "Filtered to {} hourly samples, y axis {}..{}",
            filtered.len(),
            axis.y_axis_min,
            axis.y_axis_max
        );

        let document = ChartDocument::build(
            self.options.title.clone(),
            &filtered,
            axis,
            &self.options.timezone,
            &self.options.display_zone,
            series.first().map(|sample| sample.date),
            series.last().map(|sample| sample.date),
            now,
        );

        self.writer.write(&document).await?;
        tracing::info!("Chart rendered with {} points", document.points.len());
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::{InMemoryChartWriter, InMemorySeriesStore};
    use crate::domain::sample::Sample;
    use crate::domain::timezone::resolve_timezone;
    use chrono::TimeZone;

    fn options(raw_timezone: Option<&str>) -> ChartOptions {
        let timezone = resolve_timezone(raw_timezone);
        let zone = ChartZone::from_descriptor(&timezone);
        ChartOptions {
            title: "Remaining data".to_string(),
            timezone,
            display_zone: zone,
            bucket_zone: zone,
        }
    }

    #[tokio::test]
    async fn test_render_downsamples_and_publishes() {
        let at = |h, m| Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap();
        let store = Arc::new(InMemorySeriesStore::with_series(vec![
            Sample::new(at(0, 0), 100.0),
            Sample::new(at(0, 30), 90.0),
            Sample::new(at(1, 0), 80.0),
        ]));
        let writer = Arc::new(InMemoryChartWriter::default());
        let service = ChartService::new(store, writer.clone(), options(Some("+9")));

        let document = service.render(at(2, 15)).await.unwrap();

        let xs: Vec<i64> = document.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![at(0, 0).timestamp_millis(), at(1, 0).timestamp_millis()]);
        assert_eq!(document.axis.y_axis_max, 100.0);
        assert_eq!(document.timezone, "Etc/GMT-9");
        assert_eq!(document.bounds.start, "2024-05-01T09:00");
        assert_eq!(document.bounds.end, "2024-05-01T11:15");
        assert_eq!(writer.written.lock().unwrap().as_slice(), &[document]);
    }

    #[tokio::test]
    async fn test_render_empty_series() {
        let store = Arc::new(InMemorySeriesStore::with_series(Vec::new()));
        let writer = Arc::new(InMemoryChartWriter::default());
        let service = ChartService::new(store, writer.clone(), options(None));

        let document = service.render(Utc::now()).await.unwrap();

        assert!(document.points.is_empty());
        assert_eq!(document.axis.y_axis_max, 50.0);
        assert_eq!(writer.written.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_written_when_store_is_missing() {
        let store = Arc::new(InMemorySeriesStore::default());
        let writer = Arc::new(InMemoryChartWriter::default());
        let service = ChartService::new(store, writer.clone(), options(None));

        let error = service.render(Utc::now()).await.unwrap_err();

        assert!(matches!(error, PipelineError::NotFound(_)));
        assert!(writer.written.lock().unwrap().is_empty());
    }
}
