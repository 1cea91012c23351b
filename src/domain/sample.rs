// Quota sample domain model
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// One timestamped quota reading.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(with = "iso_millis")]
    pub date: DateTime<Utc>,

    /// Accepts both `12.5` and `"12.5"` on read, always written as a number.
    #[serde(rename = "remainingData")]
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub remaining_data: f64,
}

/// Full append-only history, in insertion order.
pub type Series = Vec<Sample>;

impl Sample {
    pub fn new(date: DateTime<Utc>, remaining_data: f64) -> Self {
        Self {
            date,
            remaining_data,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.remaining_data.is_finite() && self.remaining_data >= 0.0
    }
}

/// Parse the stored document into a series, rejecting anything that is not
/// an array of valid samples.
pub fn parse_series(content: &str) -> Result<Series, String> {
    let series: Series = serde_json::from_str(content)
        .map_err(|e| format!("stored content is not a sample array: {}", e))?;

    if let Some(index) = series.iter().position(|s| !s.is_valid()) {
        return Err(format!(
            "sample #{} has an invalid remainingData value: {}",
            index, series[index].remaining_data
        ));
    }

    Ok(series)
}

/// Pretty-printed with a 2-space indent, the layout the store keeps.
pub fn serialize_series(series: &[Sample]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(series)
}

mod iso_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|e| serde::de::Error::custom(format!("invalid date {:?}: {}", raw, e)))
    }
}
