// Minimal W3C WebDriver client over HTTP
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
pub enum WebDriverError {
    #[error("WebDriver {error}: {message}")]
    Protocol { error: String, message: String },

    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected WebDriver response: {0}")]
    Malformed(String),
}

impl WebDriverError {
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, WebDriverError::Protocol { error, .. } if error == "no such element")
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

pub struct Session {
    client: Client,
    /// `{webdriver_url}/session/{id}`
    url: String,
}

impl Session {
    pub async fn start(webdriver_url: &str, headless: bool, request_timeout: Duration) -> Result<Self, WebDriverError> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let base = webdriver_url.trim_end_matches('/').to_string();

        let mut args = vec!["--no-sandbox", "--disable-gpu", "--disable-dev-shm-usage"];
        if headless {
            args.push("--headless=new");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = send(&client, Method::POST, &format!("{}/session", base), Some(capabilities)).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::Malformed("missing sessionId".to_string()))?;

        tracing::debug!("Started WebDriver session {}", session_id);
        Ok(Self {
            client,
            url: format!("{}/session/{}", base, urlencoding::encode(session_id)),
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, WebDriverError> {
        send(&self.client, method, &format!("{}{}", self.url, path), body).await
    }

    pub async fn set_page_load_timeout(&self, timeout: Duration) -> Result<(), WebDriverError> {
        let body = json!({ "pageLoad": timeout.as_millis() as u64, "implicit": 0 });
        self.command(Method::POST, "/timeouts", Some(body)).await?;
        Ok(())
    }

    pub async fn goto(&self, url: &str) -> Result<(), WebDriverError> {
        tracing::debug!("Navigating to {}", url);
        self.command(Method::POST, "/url", Some(json!({ "url": url }))).await?;
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String, WebDriverError> {
        as_string(self.command(Method::GET, "/url", None).await?)
    }

    pub async fn page_source(&self) -> Result<String, WebDriverError> {
        as_string(self.command(Method::GET, "/source", None).await?)
    }

    /// `None` when nothing matches right now.
    pub async fn find(&self, css: &str) -> Result<Option<ElementId>, WebDriverError> {
        let body = json!({ "using": "css selector", "value": css });
        match self.command(Method::POST, "/element", Some(body)).await {
            Ok(value) => value
                .get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| Some(ElementId(id.to_string())))
                .ok_or_else(|| WebDriverError::Malformed(format!("no element reference in {}", value))),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Poll for an element until `timeout` elapses.
    pub async fn wait_for(&self, css: &str, timeout: Duration) -> Result<Option<ElementId>, WebDriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.find(css).await? {
                return Ok(Some(element));
            }
            if Instant::now() >= deadline {
                tracing::debug!("Gave up waiting for {} after {:?}", css, timeout);
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), WebDriverError> {
        let path = format!("/element/{}/value", urlencoding::encode(&element.0));
        self.command(Method::POST, &path, Some(json!({ "text": text }))).await?;
        Ok(())
    }

    pub async fn click(&self, element: &ElementId) -> Result<(), WebDriverError> {
        let path = format!("/element/{}/click", urlencoding::encode(&element.0));
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    pub async fn text(&self, element: &ElementId) -> Result<String, WebDriverError> {
        let path = format!("/element/{}/text", urlencoding::encode(&element.0));
        as_string(self.command(Method::GET, &path, None).await?)
    }

    pub async fn quit(&self) -> Result<(), WebDriverError> {
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }
}

async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, WebDriverError> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status();
    let envelope: Envelope = response.json().await?;

    if !status.is_success() {
        return Err(protocol_error(&envelope.value, status.as_u16()));
    }
    Ok(envelope.value)
}

fn protocol_error(value: &Value, status: u16) -> WebDriverError {
    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
    WebDriverError::Protocol {
        error: field("error").unwrap_or_else(|| format!("HTTP {}", status)),
        message: field("message").unwrap_or_default(),
    }
}

fn as_string(value: Value) -> Result<String, WebDriverError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(WebDriverError::Malformed(format!("expected a string, got {}", other))),
    }
}
