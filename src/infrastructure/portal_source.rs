// Vendor portal sample source driven through WebDriver
use crate::application::error::PipelineError;
use crate::application::sample_source::SampleSource;
use crate::domain::sample::Sample;
use crate::infrastructure::config::{require, BrowserSettings, PortalSettings};
use crate::infrastructure::diagnostics::{DiagnosticRecord, DiagnosticsWriter};
use crate::infrastructure::webdriver::{ElementId, Session, WebDriverError};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

pub struct PortalSampleSource {
    portal: PortalSettings,
    browser: BrowserSettings,
    diagnostics: DiagnosticsWriter,
    session: Option<Session>,
}

impl PortalSampleSource {
    pub fn new(portal: PortalSettings, browser: BrowserSettings, diagnostics: DiagnosticsWriter) -> Self {
        Self {
            portal,
            browser,
            diagnostics,
            session: None,
        }
    }

    fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.browser.element_timeout_ms)
    }

    fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.browser.navigation_timeout_ms)
    }

    async fn try_login(&mut self) -> Result<(), PipelineError> {
        let username = require(&self.portal.username, "QUOTA_PORTAL__USERNAME")
            .map_err(|e| PipelineError::Auth(e.to_string()))?
            .to_string();
        let password = require(&self.portal.password, "QUOTA_PORTAL__PASSWORD")
            .map_err(|e| PipelineError::Auth(e.to_string()))?
            .to_string();
        let login_url = require(&self.portal.login_url, "QUOTA_PORTAL__LOGIN_URL")?.to_string();

        if self.session.is_none() {
            // Leave headroom over the page load timeout for the HTTP round trip.
            let request_timeout = self.navigation_timeout() + Duration::from_secs(5);
            let session = Session::start(&self.browser.webdriver_url, self.browser.headless, request_timeout)
                .await
                .map_err(browser_error)?;
            session
                .set_page_load_timeout(self.navigation_timeout())
                .await
                .map_err(browser_error)?;
            self.session = Some(session);
        }
        let session = self.session()?;

        session
            .goto(&login_url)
            .await
            .map_err(|e| PipelineError::Auth(format!("could not load the login page: {}", e)))?;

        let selectors = &self.portal.selectors;
        let username_input = self.expect_login_element(&selectors.username).await?;
        let password_input = self.expect_login_element(&selectors.password).await?;
        let submit = self.expect_login_element(&selectors.submit).await?;

        session.send_keys(&username_input, &username).await.map_err(browser_error)?;
        session.send_keys(&password_input, &password).await.map_err(browser_error)?;
        session.click(&submit).await.map_err(browser_error)?;

        let logged_in = session
            .wait_for(&selectors.logged_in, self.navigation_timeout())
            .await
            .map_err(browser_error)?;
        if logged_in.is_none() {
            return Err(PipelineError::Auth(format!(
                "login rejected: {} never appeared after submitting the form",
                selectors.logged_in
            )));
        }
        Ok(())
    }

    async fn try_read_quota(&self) -> Result<Sample, PipelineError> {
        let session = self
            .session()
            .map_err(|_| PipelineError::Extraction("not logged in".to_string()))?;

        if let Some(quota_url) = &self.portal.quota_url {
            session
                .goto(quota_url)
                .await
                .map_err(|e| PipelineError::Extraction(format!("could not load {}: {}", quota_url, e)))?;
        }

        let selector = &self.portal.selectors.quota;
        let element = session
            .wait_for(selector, self.element_timeout())
            .await
            .map_err(browser_error)?
            .ok_or_else(|| {
                PipelineError::Extraction(format!(
                    "{} did not appear within {:?}",
                    selector,
                    self.element_timeout()
                ))
            })?;

        let text = session.text(&element).await.map_err(browser_error)?;
        let value = parse_quota_text(&text)
            .ok_or_else(|| PipelineError::Extraction(format!("no number in quota text {:?}", text)))?;

        Ok(Sample::new(Utc::now(), value))
    }

    async fn expect_login_element(&self, selector: &str) -> Result<ElementId, PipelineError> {
        self.session()?
            .wait_for(selector, self.element_timeout())
            .await
            .map_err(browser_error)?
            .ok_or_else(|| PipelineError::Auth(format!("login form element {} not found", selector)))
    }

    fn session(&self) -> Result<&Session, PipelineError> {
        self.session
            .as_ref()
            .ok_or_else(|| PipelineError::Browser("no browser session".to_string()))
    }

    /// Write the diagnostic record for `error` and hand it back.
    async fn record_failure(&self, error: PipelineError) -> PipelineError {
        if !error.is_portal_failure() {
            return error;
        }

        let (location, page_source) = match &self.session {
            Some(session) => (
                session.current_url().await.unwrap_or_else(|_| "unknown".to_string()),
                session.page_source().await.ok(),
            ),
            None => ("no page loaded".to_string(), None),
        };

        let record = DiagnosticRecord {
            timestamp: Utc::now(),
            message: error.to_string(),
            location,
        };
        self.diagnostics.record(&record, page_source.as_deref()).await;
        error
    }
}

#[async_trait]
impl SampleSource for PortalSampleSource {
    async fn login(&mut self) -> Result<(), PipelineError> {
        match self.try_login().await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.record_failure(e).await),
        }
    }

    async fn read_quota(&mut self) -> Result<Sample, PipelineError> {
        match self.try_read_quota().await {
            Ok(sample) => Ok(sample),
            Err(e) => Err(self.record_failure(e).await),
        }
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.quit().await {
                tracing::warn!("Could not close the browser session: {}", e);
            }
        }
    }
}

fn browser_error(error: WebDriverError) -> PipelineError {
    PipelineError::Browser(error.to_string())
}

/// First decimal number in the element text; commas are thousands separators.
pub fn parse_quota_text(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let number: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();

    number.trim_end_matches('.').parse().ok()
}
