// In-memory collaborators for service tests
use crate::application::chart_writer::ChartWriter;
use crate::application::error::PipelineError;
use crate::application::sample_source::SampleSource;
use crate::application::series_store::{Revision, SeriesStore};
use crate::domain::chart::ChartDocument;
use crate::domain::sample::{Sample, Series};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct InMemorySeriesStore {
    /// `None` models a blob with no files at all.
    state: Mutex<Option<(Series, u64)>>,
    pub conflict_on_append: bool,
}

impl InMemorySeriesStore {
    pub fn with_series(series: Series) -> Self {
        Self {
            state: Mutex::new(Some((series, 1))),
            conflict_on_append: false,
        }
    }

    pub fn with_conflicts(mut self) -> Self {
        self.conflict_on_append = true;
        self
    }

    pub fn snapshot(&self) -> Option<Series> {
        self.state.lock().unwrap().as_ref().map(|(series, _)| series.clone())
    }
}

#[async_trait]
impl SeriesStore for InMemorySeriesStore {
    async fn read(&self) -> Result<(Series, Revision), PipelineError> {
        match self.state.lock().unwrap().as_ref() {
            Some((series, version)) => Ok((series.clone(), Revision(version.to_string()))),
            None => Err(PipelineError::NotFound("no files stored".to_string())),
        }
    }

    async fn append(&self, sample: Sample) -> Result<Revision, PipelineError> {
        let mut state = self.state.lock().unwrap();
        if self.conflict_on_append {
            let current = state.as_ref().map_or(0, |(_, version)| *version);
            return Err(PipelineError::Conflict {
                expected: current.to_string(),
                actual: (current + 1).to_string(),
            });
        }
        let (series, version) = state.get_or_insert_with(|| (Vec::new(), 0));
        series.push(sample);
        *version += 1;
        Ok(Revision(version.to_string()))
    }
}

#[derive(Clone, Default)]
pub struct ScriptedSource {
    pub reject_login: bool,
    pub quota: Option<Sample>,
    pub calls: Arc<Mutex<Vec<&'static str>>>,
}

impl ScriptedSource {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    async fn login(&mut self) -> Result<(), PipelineError> {
        self.calls.lock().unwrap().push("login");
        if self.reject_login {
            return Err(PipelineError::Auth("login rejected".to_string()));
        }
        Ok(())
    }

    async fn read_quota(&mut self) -> Result<Sample, PipelineError> {
        self.calls.lock().unwrap().push("read_quota");
        self.quota
            .clone()
            .ok_or_else(|| PipelineError::Extraction("quota element not found".to_string()))
    }

    async fn close(&mut self) {
        self.calls.lock().unwrap().push("close");
    }
}

#[derive(Default)]
pub struct InMemoryChartWriter {
    pub written: Mutex<Vec<ChartDocument>>,
}

#[async_trait]
impl ChartWriter for InMemoryChartWriter {
    async fn write(&self, document: &ChartDocument) -> Result<(), PipelineError> {
        self.written.lock().unwrap().push(document.clone());
        Ok(())
    }
}
