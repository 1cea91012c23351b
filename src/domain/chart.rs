// Chart domain models
use super::sample::Sample;
use super::timezone::{format_local_input_timestamp, ChartZone, TimezoneDescriptor};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisSettings {
    #[serde(rename = "yAxisMin")]
    pub y_axis_min: f64,
    #[serde(rename = "yAxisMax")]
    pub y_axis_max: f64,
}

/// Pick the Y-axis ceiling for the largest plotted value.
///
/// Below 50 the axis tops out at 50, below 100 at 100, and from there it
/// grows in steps of 50. Negative and non-finite input is clamped to 0.
pub fn calculate_y_axis_range(max_value: f64) -> AxisSettings {
    let max_value = if max_value.is_finite() && max_value > 0.0 {
        max_value
    } else {
        0.0
    };

    let y_axis_max = if max_value < 50.0 {
        50.0
    } else if max_value < 100.0 {
        100.0
    } else {
        (max_value / 50.0).ceil() * 50.0
    };

    AxisSettings {
        y_axis_min: 0.0,
        y_axis_max,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Epoch milliseconds.
    pub x: i64,
    pub y: f64,
}

impl From<&Sample> for ChartPoint {
    fn from(sample: &Sample) -> Self {
        Self {
            x: sample.date.timestamp_millis(),
            y: sample.remaining_data,
        }
    }
}

/// Editable window of the chart, as `datetime-local` values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBounds {
    pub start: String,
    pub end: String,
    pub min: String,
    pub max: String,
}

/// Everything the static chart page embeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDocument {
    pub title: String,
    pub points: Vec<ChartPoint>,
    #[serde(flatten)]
    pub axis: AxisSettings,
    pub timezone: String,
    pub timezone_display: String,
    /// Zone the dates were computed in, for `Intl` on the page. `None` for
    /// fixed offsets and the viewer's own clock.
    pub effective_timezone: Option<String>,
    /// Fixed hour offset the dates were computed in.
    pub offset_hours: Option<i32>,
    pub bounds: ChartBounds,
    pub generated_at: String,
}

impl ChartDocument {
    /// `first` and `last` are the instants of the raw series; the default
    /// window is `[first, now]`.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        title: String,
        filtered: &[Sample],
        axis: AxisSettings,
        timezone: &TimezoneDescriptor,
        zone: &ChartZone,
        first: Option<DateTime<Utc>>,
        last: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        let first = first.unwrap_or(now);
        let upper = last.map_or(now, |last| last.max(now));

        Self {
            title,
            points: filtered.iter().map(ChartPoint::from).collect(),
            axis,
            timezone: timezone.timezone.clone(),
            timezone_display: timezone.timezone_display.clone(),
            effective_timezone: zone.iana_name().map(str::to_string),
            offset_hours: zone.fixed_offset_hours(),
            bounds: ChartBounds {
                start: format_local_input_timestamp(first, zone),
                end: format_local_input_timestamp(now, zone),
                min: format_local_input_timestamp(first, zone),
                max: format_local_input_timestamp(upper, zone),
            },
            generated_at: now.to_rfc3339(),
        }
    }
}
