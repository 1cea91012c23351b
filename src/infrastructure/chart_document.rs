// Static HTML chart rendering and publishing
use crate::application::chart_writer::ChartWriter;
use crate::application::error::PipelineError;
use crate::domain::chart::ChartDocument;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

const CHART_TEMPLATE: &str = include_str!("../../templates/chart.html");

#[derive(Debug, Clone)]
pub struct HtmlChartWriter {
    output_path: PathBuf,
}

impl HtmlChartWriter {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }
}

#[async_trait]
impl ChartWriter for HtmlChartWriter {
    async fn write(&self, document: &ChartDocument) -> Result<(), PipelineError> {
        let html = render_html(document)?;

        if let Some(parent) = self.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write next to the target and rename, so readers never see half a page.
        let mut staging = self.output_path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        tokio::fs::write(&staging, html).await?;
        if let Err(e) = tokio::fs::rename(&staging, &self.output_path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }

        tracing::info!("Chart written to {}", self.output_path.display());
        Ok(())
    }
}

pub fn render_html(document: &ChartDocument) -> Result<String, PipelineError> {
    let mut vars = HashMap::new();
    vars.insert("title", escape_html(&document.title));
    vars.insert("timezone_display", escape_html(&document.timezone_display));
    vars.insert("generated_at", escape_html(&document.generated_at));
    vars.insert("start", escape_html(&document.bounds.start));
    vars.insert("end", escape_html(&document.bounds.end));
    vars.insert("min", escape_html(&document.bounds.min));
    vars.insert("max", escape_html(&document.bounds.max));
    vars.insert("chart_data", script_safe_json(&serde_json::to_string(document)?));

    Ok(fill_template(CHART_TEMPLATE, &vars))
}

/// Replace `{{name}}` placeholders in a single pass over the template, so
/// substituted values are never expanded again. Unknown names stay as they are.
fn fill_template(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let value = after
            .find("}}")
            .and_then(|close| vars.get(&after[..close]).map(|value| (close, value)));
        match value {
            Some((close, value)) => {
                result.push_str(value);
                rest = &after[close + 2..];
            }
            None => {
                result.push('{');
                rest = &rest[open + 1..];
            }
        }
    }
    result.push_str(rest);
    result
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// JSON inside `<script>` must not be able to close the element.
fn script_safe_json(json: &str) -> String {
    json.replace('<', "\\u003c").replace('>', "\\u003e").replace('&', "\\u0026")
}
