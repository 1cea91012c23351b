// GitHub Gist series store implementation
use crate::application::error::PipelineError;
use crate::application::series_store::{Revision, SeriesStore};
use crate::domain::sample::{parse_series, serialize_series, Sample, Series};
use crate::infrastructure::config::{require, StoreSettings};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GistSeriesStore {
    client: Client,
    gist_url: String,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct Gist {
    #[serde(default)]
    files: BTreeMap<String, GistFile>,
    #[serde(default)]
    history: Vec<GistHistoryEntry>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GistHistoryEntry {
    version: String,
}

impl GistSeriesStore {
    pub fn new(settings: &StoreSettings) -> Result<Self, PipelineError> {
        let gist_id = require(&settings.gist_id, "QUOTA_STORE__GIST_ID")?;
        let token = require(&settings.token, "QUOTA_STORE__TOKEN")?;

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| PipelineError::Config("QUOTA_STORE__TOKEN is not a valid header value".to_string()))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        headers.insert(USER_AGENT, HeaderValue::from_static(concat!("quota-tracker/", env!("CARGO_PKG_VERSION"))));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            gist_url: format!(
                "{}/gists/{}",
                settings.api_base_url.trim_end_matches('/'),
                urlencoding::encode(gist_id)
            ),
            file_name: settings.file_name.clone(),
        })
    }

    async fn fetch(&self) -> Result<Gist, PipelineError> {
        tracing::debug!("GET {}", self.gist_url);
        let response = self.client.get(&self.gist_url).send().await?;
        let gist = check_status(response).await?.json::<Gist>().await?;
        Ok(gist)
    }

    async fn file_content(&self, name: &str, file: &GistFile) -> Result<String, PipelineError> {
        match (&file.content, &file.raw_url) {
            (Some(content), _) if !file.truncated => Ok(content.clone()),
            (_, Some(raw_url)) => {
                tracing::debug!("{} is truncated, fetching {}", name, raw_url);
                let response = self.client.get(raw_url).send().await?;
                Ok(check_status(response).await?.text().await?)
            }
            (Some(content), None) => Ok(content.clone()),
            (None, None) => Err(PipelineError::StoreFormat(format!("{} has no content", name))),
        }
    }

    async fn write(&self, file_name: &str, content: String) -> Result<Revision, PipelineError> {
        tracing::debug!("PATCH {} ({} bytes)", self.gist_url, content.len());
        let response = self
            .client
            .patch(&self.gist_url)
            .json(&patch_body(file_name, content))
            .send()
            .await?;
        let gist = check_status(response).await?.json::<Gist>().await?;
        Ok(revision_of(&gist))
    }
}

#[async_trait]
impl SeriesStore for GistSeriesStore {
    async fn read(&self) -> Result<(Series, Revision), PipelineError> {
        let gist = self.fetch().await?;
        let (name, file) = select_file(&gist, &self.file_name)
            .ok_or_else(|| PipelineError::NotFound("the gist has no files".to_string()))?;

        let content = self.file_content(name, file).await?;
        let series = parse_series(&content).map_err(PipelineError::StoreFormat)?;
        Ok((series, revision_of(&gist)))
    }

    async fn append(&self, sample: Sample) -> Result<Revision, PipelineError> {
        let gist = self.fetch().await?;
        let expected = revision_of(&gist);

        let existing = match append_target(&gist, &self.file_name) {
            Some(file) => Some(self.file_content(&self.file_name, file).await?),
            None => {
                tracing::info!("{} is not in the gist yet, creating it", self.file_name);
                None
            }
        };
        let (content, count) = appended_content(existing.as_deref(), sample)?;

        // The gist API has no conditional update, so re-check right before
        // writing. A writer sneaking in between this check and the PATCH
        // still wins.
        check_revision(&expected, &revision_of(&self.fetch().await?))?;

        let revision = self.write(&self.file_name, content).await?;
        tracing::info!("Appended sample #{} to {}", count, self.file_name);
        Ok(revision)
    }
}

/// Appends always go to the configured file, never to a fallback.
fn append_target<'a>(gist: &'a Gist, file_name: &str) -> Option<&'a GistFile> {
    gist.files.get(file_name)
}

/// New file content with `sample` at the end, plus the resulting length.
/// Absent or blank content starts a new series.
fn appended_content(existing: Option<&str>, sample: Sample) -> Result<(String, usize), PipelineError> {
    let mut series = match existing.map(str::trim) {
        Some(content) if !content.is_empty() => parse_series(content).map_err(PipelineError::Validation)?,
        _ => Vec::new(),
    };
    series.push(sample);
    Ok((serialize_series(&series)?, series.len()))
}

fn check_revision(expected: &Revision, actual: &Revision) -> Result<(), PipelineError> {
    if actual != expected {
        return Err(PipelineError::Conflict {
            expected: expected.0.clone(),
            actual: actual.0.clone(),
        });
    }
    Ok(())
}

async fn check_status(response: Response) -> Result<Response, PipelineError> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(PipelineError::NotFound(format!("{} returned 404", response.url())));
    }
    match response.error_for_status_ref().err() {
        None => Ok(response),
        Some(error) => {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("GitHub API request failed: {}: {}", error, body);
            Err(error.into())
        }
    }
}

/// The configured file, else the first one in name order. Reads only.
fn select_file<'a>(gist: &'a Gist, file_name: &str) -> Option<(&'a String, &'a GistFile)> {
    if let Some(entry) = gist.files.get_key_value(file_name) {
        return Some(entry);
    }
    let first = gist.files.iter().next();
    if let Some((name, _)) = first {
        tracing::warn!("{} is not in the gist, using {} instead", file_name, name);
    }
    first
}

fn revision_of(gist: &Gist) -> Revision {
    gist.history
        .first()
        .map(|entry| entry.version.clone())
        .or_else(|| gist.updated_at.clone())
        .map(Revision)
        .unwrap_or_else(|| Revision("unknown".to_string()))
}

fn patch_body(file_name: &str, content: String) -> Value {
    let mut files = serde_json::Map::new();
    files.insert(file_name.to_string(), json!({ "content": content }));
    json!({ "files": files })
}
