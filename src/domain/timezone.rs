// Timezone resolution for chart labels, date controls and bucketing
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use chrono_tz::Tz;

const KNOWN_ZONE_LABELS: &[(&str, &str)] = &[
    ("Asia/Tokyo", "JST (UTC+9)"),
    ("Asia/Shanghai", "CST (UTC+8)"),
    ("America/New_York", "EST (UTC-5)"),
    ("America/Los_Angeles", "PST (UTC-8)"),
    ("Europe/London", "GMT (UTC+0)"),
    ("Europe/Paris", "CET (UTC+1)"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimezoneDescriptor {
    /// IANA or `Etc/GMT±N` identifier.
    pub timezone: String,
    /// Human label shown next to the chart.
    pub timezone_display: String,
    /// Set when the input was a numeric hour offset that fits an `i64`.
    pub offset_hours: Option<i64>,
}

impl TimezoneDescriptor {
    pub fn utc() -> Self {
        Self {
            timezone: "UTC".to_string(),
            timezone_display: "UTC+0".to_string(),
            offset_hours: None,
        }
    }
}

/// Resolve the configured offset or zone name. Never fails: anything that is
/// not a signed hour offset is taken as an opaque zone identifier.
pub fn resolve_timezone(raw: Option<&str>) -> TimezoneDescriptor {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return TimezoneDescriptor::utc(),
    };

    if let Some((negative, hours)) = parse_signed_hours(raw) {
        let negative = negative && hours != "0";
        let sign = if negative { '-' } else { '+' };
        // The Etc/GMT family inverts the sign: UTC+9 is Etc/GMT-9.
        let inverted = if negative { '+' } else { '-' };
        let offset_hours = hours
            .parse::<i64>()
            .ok()
            .map(|hours| if negative { -hours } else { hours });
        return TimezoneDescriptor {
            timezone: format!("Etc/GMT{}{}", inverted, hours),
            timezone_display: format!("UTC{}{}", sign, hours),
            offset_hours,
        };
    }

    let timezone_display = KNOWN_ZONE_LABELS
        .iter()
        .find(|(name, _)| *name == raw)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| raw.to_string());

    TimezoneDescriptor {
        timezone: raw.to_string(),
        timezone_display,
        offset_hours: None,
    }
}

/// Matches `^[+-]\d+$`, returning the sign and the digits without leading
/// zeros.
fn parse_signed_hours(raw: &str) -> Option<(bool, &str)> {
    let (negative, digits) = match raw.as_bytes().first()? {
        b'+' => (false, &raw[1..]),
        b'-' => (true, &raw[1..]),
        _ => return None,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = digits.trim_start_matches('0');
    Some((negative, if trimmed.is_empty() { "0" } else { trimmed }))
}

/// Calendar used to observe instants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartZone {
    Utc,
    Fixed(FixedOffset),
    Named(Tz),
    /// The clock of the process evaluating the run.
    Local,
}

impl ChartZone {
    pub fn from_descriptor(descriptor: &TimezoneDescriptor) -> Self {
        if let Some(hours) = descriptor.offset_hours {
            let seconds = i32::try_from(hours).ok().and_then(|hours| hours.checked_mul(3600));
            return match seconds.and_then(FixedOffset::east_opt) {
                Some(offset) => ChartZone::Fixed(offset),
                None => {
                    tracing::warn!(
                        "Offset {} is out of range, falling back to UTC",
                        descriptor.timezone_display
                    );
                    ChartZone::Utc
                }
            };
        }

        match descriptor.timezone.parse::<Tz>() {
            Ok(tz) => ChartZone::Named(tz),
            Err(_) => {
                tracing::warn!(
                    "Unknown timezone {:?}, dates will be shown in UTC",
                    descriptor.timezone
                );
                ChartZone::Utc
            }
        }
    }

    /// Zone name the page can hand to `Intl.DateTimeFormat`, if any.
    pub fn iana_name(&self) -> Option<&'static str> {
        match self {
            ChartZone::Named(tz) => Some(tz.name()),
            ChartZone::Utc => Some("UTC"),
            ChartZone::Fixed(_) | ChartZone::Local => None,
        }
    }

    /// Whole-hour offset for fixed zones.
    pub fn fixed_offset_hours(&self) -> Option<i32> {
        match self {
            ChartZone::Fixed(offset) => Some(offset.local_minus_utc() / 3600),
            _ => None,
        }
    }

    /// Wall-clock time of `instant` in this zone.
    pub fn localize(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            ChartZone::Utc => instant.naive_utc(),
            ChartZone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
            ChartZone::Named(tz) => instant.with_timezone(tz).naive_local(),
            ChartZone::Local => instant.with_timezone(&Local).naive_local(),
        }
    }
}

/// `YYYY-MM-DDTHH:mm`, the value format of a `datetime-local` input.
pub fn format_local_input_timestamp(instant: DateTime<Utc>, zone: &ChartZone) -> String {
    zone.localize(instant).format("%Y-%m-%dT%H:%M").to_string()
}
