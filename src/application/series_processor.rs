// Series processor - Hourly down-sampling for the chart
use crate::domain::sample::{Sample, Series};
use crate::domain::timezone::ChartZone;
use chrono::{Datelike, Timelike};

type HourBucket = (i32, u32, u32, u32);

/// Keep the first sample of every `(year, month, day, hour)` bucket, with the
/// bucket observed in `zone`.
///
/// Single pass, no sorting: the input is expected to be in time order. A new
/// sample is emitted whenever its bucket differs from the last emitted one, so
/// an out-of-order series can emit the same bucket twice.
pub fn filter_hourly(series: &[Sample], zone: &ChartZone) -> Series {
    let mut filtered = Vec::new();
    let mut last_bucket: Option<HourBucket> = None;

    for sample in series {
        let bucket = hour_bucket(sample, zone);
        if last_bucket != Some(bucket) {
            filtered.push(sample.clone());
            last_bucket = Some(bucket);
        }
    }

    filtered
}

fn hour_bucket(sample: &Sample, zone: &ChartZone) -> HourBucket {
    let local = zone.localize(sample.date);
    (local.year(), local.month(), local.day(), local.hour())
}
