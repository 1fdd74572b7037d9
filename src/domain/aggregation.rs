// Time aggregation - buckets raw samples into coarser granularities
use crate::domain::sample::Sample;
use chrono::{DateTime, Datelike, Days, Local, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket width for time-axis widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    None,
    Hourly,
    Daily,
    Weekly,
}

/// One averaged bucket derived from a tag series. Never mutated after
/// creation. `average` is `None` when the bucket holds no numeric samples,
/// so a data gap stays distinguishable from a real zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationBucket {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub average: Option<f64>,
    pub sample_count: usize,
}

/// Aggregate a series in the local timezone of evaluation.
pub fn aggregate(series: &[Sample], granularity: Granularity) -> Vec<AggregationBucket> {
    aggregate_in(series, granularity, &Local)
}

/// Timezone-generic aggregation. Buckets truncate to the start of the hour,
/// day, or Sunday-start week in `tz`; within a bucket the arithmetic mean is
/// taken over numeric values only. Output ascends by timestamp.
pub fn aggregate_in<Tz: TimeZone>(
    series: &[Sample],
    granularity: Granularity,
    tz: &Tz,
) -> Vec<AggregationBucket> {
    if series.is_empty() {
        return Vec::new();
    }

    if granularity == Granularity::None {
        return series
            .iter()
            .map(|sample| AggregationBucket {
                key: sample.timestamp.to_rfc3339(),
                timestamp: sample.timestamp,
                average: sample.number(),
                sample_count: 1,
            })
            .collect();
    }

    struct Group {
        key: String,
        numeric_sum: f64,
        numeric_count: usize,
        sample_count: usize,
    }

    let mut groups: BTreeMap<i64, Group> = BTreeMap::new();
    for sample in series {
        let (start, key) = bucket_start(&sample.timestamp, granularity, tz);
        let group = groups.entry(start.timestamp_millis()).or_insert(Group {
            key,
            numeric_sum: 0.0,
            numeric_count: 0,
            sample_count: 0,
        });
        group.sample_count += 1;
        if let Some(value) = sample.number() {
            group.numeric_sum += value;
            group.numeric_count += 1;
        }
    }

    groups
        .into_iter()
        .map(|(start_millis, group)| AggregationBucket {
            key: group.key,
            timestamp: DateTime::from_timestamp_millis(start_millis).unwrap_or_default(),
            average: (group.numeric_count > 0)
                .then(|| group.numeric_sum / group.numeric_count as f64),
            sample_count: group.sample_count,
        })
        .collect()
}

/// Truncate a timestamp to its bucket start in `tz`, returning the start as
/// UTC plus the bucket key string.
fn bucket_start<Tz: TimeZone>(
    timestamp: &DateTime<Utc>,
    granularity: Granularity,
    tz: &Tz,
) -> (DateTime<Utc>, String) {
    let local = timestamp.with_timezone(tz);
    let date = local.date_naive();
    let truncated: Option<NaiveDateTime> = match granularity {
        Granularity::Hourly => date.and_hms_opt(local.hour(), 0, 0),
        Granularity::Daily => date.and_hms_opt(0, 0, 0),
        Granularity::Weekly => date
            .checked_sub_days(Days::new(u64::from(
                local.weekday().num_days_from_sunday(),
            )))
            .and_then(|start| start.and_hms_opt(0, 0, 0)),
        Granularity::None => None,
    };

    match truncated {
        Some(naive) => {
            let start = tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or(*timestamp);
            (start, naive.format("%Y-%m-%d %H:%M").to_string())
        }
        None => (*timestamp, timestamp.to_rfc3339()),
    }
}

/// Axis label for a bucket timestamp, in the local timezone of evaluation.
pub fn bucket_label(timestamp: DateTime<Utc>, granularity: Granularity) -> String {
    bucket_label_in(timestamp, granularity, &Local)
}

/// Hour buckets label as "9:00", day buckets as "1/15", week buckets as
/// "Week N" (Sunday-start week of year). Raw points label as "HH:MM".
/// Plain Gregorian math, no locale.
pub fn bucket_label_in<Tz: TimeZone>(
    timestamp: DateTime<Utc>,
    granularity: Granularity,
    tz: &Tz,
) -> String {
    let local = timestamp.with_timezone(tz);
    match granularity {
        Granularity::None => format!("{:02}:{:02}", local.hour(), local.minute()),
        Granularity::Hourly => format!("{}:00", local.hour()),
        Granularity::Daily => format!("{}/{}", local.month(), local.day()),
        Granularity::Weekly => {
            let week = local
                .date_naive()
                .format("%U")
                .to_string()
                .parse::<u32>()
                .unwrap_or(0);
            format!("Week {week}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{Quality, SampleValue};
    use chrono::TimeZone;

    fn numeric_at(value: f64, iso: &str) -> Sample {
        Sample::numeric(value, iso.parse().unwrap())
    }

    #[test]
    fn test_hourly_average_splits_on_hour_boundary() {
        let series = vec![
            numeric_at(10.0, "2024-03-04T09:10:00Z"),
            numeric_at(20.0, "2024-03-04T09:40:00Z"),
            numeric_at(30.0, "2024-03-04T10:05:00Z"),
        ];

        let buckets = aggregate_in(&series, Granularity::Hourly, &Utc);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].timestamp, "2024-03-04T09:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(buckets[0].average, Some(15.0));
        assert_eq!(buckets[0].sample_count, 2);
        assert_eq!(buckets[1].timestamp, "2024-03-04T10:00:00Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(buckets[1].average, Some(30.0));
    }

    #[test]
    fn test_none_granularity_passes_series_through() {
        let series = vec![
            numeric_at(1.0, "2024-03-04T09:00:00Z"),
            numeric_at(2.0, "2024-03-04T10:00:00Z"),
        ];

        let buckets = aggregate_in(&series, Granularity::None, &Utc);
        assert_eq!(buckets.len(), 2);
        for (bucket, sample) in buckets.iter().zip(&series) {
            assert_eq!(bucket.timestamp, sample.timestamp);
            assert_eq!(bucket.average, sample.number());
            assert_eq!(bucket.sample_count, 1);
        }
    }

    #[test]
    fn test_empty_series_yields_no_buckets() {
        assert!(aggregate_in(&[], Granularity::Hourly, &Utc).is_empty());
    }

    #[test]
    fn test_non_numeric_samples_are_excluded_from_the_mean() {
        let ts = "2024-03-04T09:10:00Z".parse().unwrap();
        let series = vec![
            numeric_at(10.0, "2024-03-04T09:05:00Z"),
            Sample::new(SampleValue::Text("FAULT".into()), Quality::Bad, ts),
            numeric_at(20.0, "2024-03-04T09:55:00Z"),
        ];

        let buckets = aggregate_in(&series, Granularity::Hourly, &Utc);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].average, Some(15.0));
        assert_eq!(buckets[0].sample_count, 3);
    }

    #[test]
    fn test_bucket_with_no_numeric_samples_has_no_average() {
        let ts = "2024-03-04T09:10:00Z".parse().unwrap();
        let series = vec![Sample::new(
            SampleValue::Text("OFFLINE".into()),
            Quality::Bad,
            ts,
        )];

        let buckets = aggregate_in(&series, Granularity::Hourly, &Utc);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].average, None);
        assert_eq!(buckets[0].sample_count, 1);
    }

    #[test]
    fn test_daily_buckets_truncate_to_midnight() {
        let series = vec![
            numeric_at(1.0, "2024-03-04T01:00:00Z"),
            numeric_at(3.0, "2024-03-04T23:00:00Z"),
            numeric_at(5.0, "2024-03-05T00:30:00Z"),
        ];

        let buckets = aggregate_in(&series, Granularity::Daily, &Utc);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].average, Some(2.0));
        assert_eq!(buckets[1].average, Some(5.0));
        assert_eq!(
            buckets[0].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_weekly_buckets_start_on_sunday() {
        // 2024-03-04 is a Monday; 2024-03-09 is the following Saturday.
        // Both belong to the week starting Sunday 2024-03-03.
        let series = vec![
            numeric_at(10.0, "2024-03-04T12:00:00Z"),
            numeric_at(20.0, "2024-03-09T12:00:00Z"),
            numeric_at(40.0, "2024-03-10T12:00:00Z"), // next Sunday, new week
        ];

        let buckets = aggregate_in(&series, Granularity::Weekly, &Utc);
        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets[0].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 3, 0, 0, 0).unwrap()
        );
        assert_eq!(buckets[0].average, Some(15.0));
        assert_eq!(
            buckets[1].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_buckets_ascend_even_from_unordered_input() {
        let series = vec![
            numeric_at(3.0, "2024-03-04T12:00:00Z"),
            numeric_at(1.0, "2024-03-02T12:00:00Z"),
            numeric_at(2.0, "2024-03-03T12:00:00Z"),
        ];

        let buckets = aggregate_in(&series, Granularity::Daily, &Utc);
        let times: Vec<_> = buckets.iter().map(|b| b.timestamp).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }

    #[test]
    fn test_labels() {
        let ts: DateTime<Utc> = "2024-01-15T09:07:00Z".parse().unwrap();
        assert_eq!(bucket_label_in(ts, Granularity::Hourly, &Utc), "9:00");
        assert_eq!(bucket_label_in(ts, Granularity::Daily, &Utc), "1/15");
        assert_eq!(bucket_label_in(ts, Granularity::None, &Utc), "09:07");
        // First Sunday of 2024 is Jan 7, so Jan 14-20 is week 2.
        assert_eq!(bucket_label_in(ts, Granularity::Weekly, &Utc), "Week 2");
    }

    #[test]
    fn test_truncation_respects_the_evaluation_timezone() {
        // 09:30 UTC is 04:30 in UTC-5; the bucket starts at 04:00 local.
        let tz = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
        let series = vec![numeric_at(7.0, "2024-03-04T09:30:00Z")];

        let buckets = aggregate_in(&series, Granularity::Hourly, &tz);
        assert_eq!(
            buckets[0].timestamp,
            "2024-03-04T09:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(bucket_label_in(buckets[0].timestamp, Granularity::Hourly, &tz), "4:00");
    }
}
