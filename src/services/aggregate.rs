// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Derived analytical views over an activity collection.
//!
//! Everything here is a pure function of its inputs: views are recomputed
//! per request, never persisted, and never mutate the collection. Sums run
//! in archive order, so identical inputs reproduce identical values.

use crate::models::Activity;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

/// English short month names, indexed by zero-based month.
pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Sports below this share of the collection are dropped from the breakdown.
const BREAKDOWN_MIN_PERCENT: f64 = 1.0;

/// Filter selection: `None` fields are the "all" sentinel.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub year: Option<i32>,
    pub sports: Option<HashSet<String>>,
}

impl ActivityFilter {
    /// An activity passes only if it matches both predicates.
    pub fn matches(&self, activity: &Activity) -> bool {
        let year_match = match self.year {
            None => true,
            Some(year) => activity.start_year() == Some(year),
        };
        let sport_match = match &self.sports {
            None => true,
            Some(sports) => sports.contains(&activity.activity_type),
        };
        year_match && sport_match
    }

    /// The same selection with the sport predicate removed. The sport
    /// breakdown is computed over the year-filtered collection only.
    pub fn year_only(&self) -> ActivityFilter {
        ActivityFilter {
            year: self.year,
            sports: None,
        }
    }
}

/// Select the activities matching a filter, preserving collection order.
pub fn filter<'a>(activities: &'a [Activity], selection: &ActivityFilter) -> Vec<&'a Activity> {
    activities.iter().filter(|a| selection.matches(a)).collect()
}

// ─── KPI summary ─────────────────────────────────────────────

/// Raw sums over a filtered set, before any formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiTotals {
    pub count: usize,
    pub distance_m: f64,
    pub elevation_m: f64,
    pub moving_time_s: u64,
}

/// Formatted KPI values, ready for display.
#[derive(Debug, Clone, Serialize)]
pub struct KpiSummary {
    pub count: usize,
    pub distance_km: String,
    pub elevation_m: String,
    pub moving_hours: u64,
}

pub fn kpi_totals(activities: &[&Activity]) -> KpiTotals {
    let mut totals = KpiTotals {
        count: activities.len(),
        ..KpiTotals::default()
    };
    for activity in activities {
        totals.distance_m += activity.distance;
        totals.elevation_m += activity.total_elevation_gain;
        totals.moving_time_s += activity.moving_time;
    }
    totals
}

pub fn kpi_summary(totals: &KpiTotals) -> KpiSummary {
    KpiSummary {
        count: totals.count,
        distance_km: format_adaptive_distance(totals.distance_m),
        elevation_m: format_adaptive_elevation(totals.elevation_m),
        moving_hours: totals.moving_time_s / 3600,
    }
}

/// Adaptive distance formatting (input meters, output kilometers):
/// below 1 km two decimals, below 100 km one decimal, otherwise a grouped
/// whole number.
pub fn format_adaptive_distance(meters: f64) -> String {
    let km = meters / 1000.0;
    if km < 1.0 {
        format!("{:.2}", km)
    } else if km < 100.0 {
        format!("{:.1}", km)
    } else {
        group_thousands(km.round() as i64)
    }
}

/// Elevation as a grouped whole number of meters.
pub fn format_adaptive_elevation(meters: f64) -> String {
    group_thousands(meters.round() as i64)
}

fn group_thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    let lead = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && i % 3 == lead % 3 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

// ─── Facets ──────────────────────────────────────────────────

/// Distinct calendar years present, newest first.
pub fn year_facets(activities: &[Activity]) -> Vec<i32> {
    let years: BTreeSet<i32> = activities.iter().filter_map(|a| a.start_year()).collect();
    years.into_iter().rev().collect()
}

/// Distinct sport types present, ascending.
pub fn sport_facets(activities: &[Activity]) -> Vec<String> {
    let sports: BTreeSet<&str> = activities.iter().map(|a| a.activity_type.as_str()).collect();
    sports.into_iter().map(String::from).collect()
}

// ─── Performance series ──────────────────────────────────────

/// One point of the cumulative performance series.
#[derive(Debug, Clone, Serialize)]
pub struct PerformancePoint {
    pub start_date: String,
    pub cumulative_distance_km: f64,
    pub cumulative_elevation_m: f64,
    pub pace_min_per_km: f64,
    pub speed_kmh: f64,
    pub distance_km: f64,
}

/// Cumulative distance/elevation plus per-activity pace and speed for one
/// sport, ordered by start date ascending.
pub fn performance_series(activities: &[&Activity], sport: &str) -> Vec<PerformancePoint> {
    let mut matching: Vec<&Activity> = activities
        .iter()
        .copied()
        .filter(|a| a.activity_type == sport)
        .collect();
    matching.sort_by_key(|a| a.start_instant());

    let mut cumulative_distance_km = 0.0;
    let mut cumulative_elevation_m = 0.0;
    matching
        .into_iter()
        .map(|activity| {
            cumulative_distance_km += activity.distance / 1000.0;
            cumulative_elevation_m += activity.total_elevation_gain;
            let pace_min_per_km = if activity.average_speed > 0.0 {
                (1000.0 / activity.average_speed) / 60.0
            } else {
                0.0
            };
            PerformancePoint {
                start_date: activity.start_date.clone(),
                cumulative_distance_km,
                cumulative_elevation_m,
                pace_min_per_km,
                speed_kmh: activity.average_speed * 3.6,
                distance_km: activity.distance / 1000.0,
            }
        })
        .collect()
}

/// The longest activity of one sport within the filtered set. On equal
/// distances the later activity wins.
pub fn signature_activity<'a>(activities: &[&'a Activity], sport: &str) -> Option<&'a Activity> {
    activities
        .iter()
        .copied()
        .filter(|a| a.activity_type == sport)
        .fold(None, |best: Option<&'a Activity>, candidate| match best {
            Some(current) if current.distance > candidate.distance => Some(current),
            _ => Some(candidate),
        })
}

// ─── Distributions ───────────────────────────────────────────

/// Count and percentage share of one sport.
#[derive(Debug, Clone, Serialize)]
pub struct SportShare {
    pub sport: String,
    pub count: usize,
    pub percent: f64,
}

/// Share of each sport over the given collection, in first-encountered
/// order, dropping sports below a 1% share.
pub fn sport_breakdown(activities: &[&Activity]) -> Vec<SportShare> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for activity in activities {
        let sport = activity.activity_type.as_str();
        if !counts.contains_key(sport) {
            order.push(sport);
        }
        *counts.entry(sport).or_insert(0) += 1;
    }

    let total = activities.len().max(1);
    order
        .into_iter()
        .map(|sport| {
            let count = counts[sport];
            SportShare {
                sport: sport.to_string(),
                count,
                percent: count as f64 / total as f64 * 100.0,
            }
        })
        .filter(|share| share.percent >= BREAKDOWN_MIN_PERCENT)
        .collect()
}

/// Count and rounded percentage of one time-of-day bucket.
#[derive(Debug, Clone, Serialize)]
pub struct TimeBucket {
    pub name: &'static str,
    pub count: usize,
    pub percent: u32,
}

/// Bucket activities by the wall-clock hour of `start_date_local`:
/// Morning [5,12), Afternoon [12,17), Evening otherwise. Activities whose
/// local timestamp does not parse land in Evening.
pub fn time_of_day(activities: &[&Activity]) -> Vec<TimeBucket> {
    let mut counts = [0usize; 3];
    for activity in activities {
        let bucket = match activity.local_hour() {
            Some(hour) if (5..12).contains(&hour) => 0,
            Some(hour) if (12..17).contains(&hour) => 1,
            _ => 2,
        };
        counts[bucket] += 1;
    }

    let total = activities.len().max(1);
    ["Morning", "Afternoon", "Evening"]
        .into_iter()
        .zip(counts)
        .map(|(name, count)| TimeBucket {
            name,
            count,
            percent: (count as f64 / total as f64 * 100.0).round() as u32,
        })
        .collect()
}

/// One cell of the calendar frequency grid.
#[derive(Debug, Clone, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Activity count per calendar day of `today`'s year, from January 1st
/// through `today` inclusive. At most 366 entries. `today` is a parameter
/// so callers (and tests) control the clock.
pub fn frequency_grid(activities: &[&Activity], today: NaiveDate) -> Vec<DayCount> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for activity in activities {
        if let Some(date) = activity.start_date_utc() {
            *per_day.entry(date).or_insert(0) += 1;
        }
    }

    let Some(start) = NaiveDate::from_ymd_opt(today.year(), 1, 1) else {
        return Vec::new();
    };

    let mut grid = Vec::new();
    let mut day = start;
    for _ in 0..366 {
        if day > today {
            break;
        }
        grid.push(DayCount {
            date: day,
            count: per_day.get(&day).copied().unwrap_or(0),
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    grid
}

/// The calendar month with the most activities over the collection.
/// Ties resolve to the earliest month. `None` for an empty collection.
pub fn favorite_month(activities: &[&Activity]) -> Option<(usize, &'static str)> {
    let mut counts = [0usize; 12];
    for activity in activities {
        if let Some(month) = activity.start_month0() {
            counts[month] += 1;
        }
    }

    let mut best: Option<usize> = None;
    for (month, &count) in counts.iter().enumerate() {
        if count > 0 && best.map_or(true, |b| count > counts[b]) {
            best = Some(month);
        }
    }
    best.map(|month| (month, MONTH_NAMES[month]))
}

// ─── Archive recap ───────────────────────────────────────────

/// High-level recap of a collection: the dashboard's narrative panel.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveRecap {
    pub count: usize,
    pub distance_km: String,
    pub elevation_m: String,
    pub longest_km: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_month: Option<&'static str>,
}

pub fn archive_recap(activities: &[&Activity]) -> ArchiveRecap {
    let totals = kpi_totals(activities);
    let longest = activities
        .iter()
        .map(|a| a.distance)
        .fold(0.0f64, f64::max);
    ArchiveRecap {
        count: totals.count,
        distance_km: format_adaptive_distance(totals.distance_m),
        elevation_m: format_adaptive_elevation(totals.elevation_m),
        longest_km: format_adaptive_distance(longest),
        favorite_month: favorite_month(activities).map(|(_, name)| name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(id: u64, sport: &str, date: &str, distance: f64) -> Activity {
        Activity::fixture(id, sport, date, distance)
    }

    fn refs(activities: &[Activity]) -> Vec<&Activity> {
        activities.iter().collect()
    }

    #[test]
    fn test_filter_year_and_sport_are_anded() {
        let activities = vec![
            make(1, "Run", "2023-05-01T08:00:00Z", 5000.0),
            make(2, "Run", "2024-05-01T08:00:00Z", 5000.0),
            make(3, "Ride", "2024-05-01T08:00:00Z", 20000.0),
        ];

        let selection = ActivityFilter {
            year: Some(2024),
            sports: Some(HashSet::from(["Run".to_string()])),
        };
        let selected = filter(&activities, &selection);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, 2);

        // Characterization: every activity passes iff both predicates hold.
        for activity in &activities {
            let expected = activity.start_year() == Some(2024) && activity.activity_type == "Run";
            assert_eq!(selection.matches(activity), expected);
        }
    }

    #[test]
    fn test_filter_all_sentinels_pass_everything() {
        let activities = vec![
            make(1, "Run", "2023-05-01T08:00:00Z", 5000.0),
            make(2, "Kayaking", "2024-05-01T08:00:00Z", 3000.0),
        ];
        let selected = filter(&activities, &ActivityFilter::default());
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_kpi_additivity() {
        let activities = vec![
            make(1, "Run", "2024-01-01T08:00:00Z", 5000.0),
            make(2, "Run", "2024-01-02T08:00:00Z", 7500.0),
            make(3, "Ride", "2024-01-03T08:00:00Z", 31000.0),
        ];
        let selected = refs(&activities);
        let totals = kpi_totals(&selected);

        let expected: f64 = activities.iter().map(|a| a.distance).sum();
        assert_eq!(totals.distance_m, expected);
        assert_eq!(totals.count, 3);
        assert_eq!(totals.moving_time_s, 3 * 3600);

        let summary = kpi_summary(&totals);
        assert_eq!(summary.moving_hours, 3);
    }

    #[test]
    fn test_moving_hours_floor() {
        let mut activity = make(1, "Run", "2024-01-01T08:00:00Z", 5000.0);
        activity.moving_time = 3600 + 3599;
        let binding = [activity];
        let totals = kpi_totals(&refs(&binding));
        assert_eq!(kpi_summary(&totals).moving_hours, 1);
    }

    #[test]
    fn test_adaptive_distance_formatting() {
        assert_eq!(format_adaptive_distance(550.0), "0.55");
        assert_eq!(format_adaptive_distance(10_500.0), "10.5");
        assert_eq!(format_adaptive_distance(509_000.0), "509");
        assert_eq!(format_adaptive_distance(1_234_000.0), "1,234");
    }

    #[test]
    fn test_adaptive_elevation_formatting() {
        assert_eq!(format_adaptive_elevation(12_345.6), "12,346");
        assert_eq!(format_adaptive_elevation(0.4), "0");
        assert_eq!(format_adaptive_elevation(-120.7), "-121");
    }

    #[test]
    fn test_facets_ordering() {
        let activities = vec![
            make(1, "Ride", "2022-05-01T08:00:00Z", 1.0),
            make(2, "Hike", "2024-05-01T08:00:00Z", 1.0),
            make(3, "Run", "2023-05-01T08:00:00Z", 1.0),
            make(4, "Run", "2024-06-01T08:00:00Z", 1.0),
        ];
        assert_eq!(year_facets(&activities), vec![2024, 2023, 2022]);
        assert_eq!(sport_facets(&activities), vec!["Hike", "Ride", "Run"]);
    }

    #[test]
    fn test_performance_series_accumulates_in_date_order() {
        let mut first = make(1, "Run", "2024-02-01T08:00:00Z", 10_000.0);
        first.total_elevation_gain = 100.0;
        first.average_speed = 2.5;
        let mut second = make(2, "Run", "2024-01-01T08:00:00Z", 5_000.0);
        second.total_elevation_gain = 50.0;
        second.average_speed = 0.0;
        let other = make(3, "Ride", "2024-01-15T08:00:00Z", 40_000.0);

        let activities = vec![first, second, other];
        let series = performance_series(&refs(&activities), "Run");

        assert_eq!(series.len(), 2);
        // Sorted ascending by start date, not collection order.
        assert_eq!(series[0].start_date, "2024-01-01T08:00:00Z");
        assert_eq!(series[0].cumulative_distance_km, 5.0);
        assert_eq!(series[1].cumulative_distance_km, 15.0);
        assert_eq!(series[1].cumulative_elevation_m, 150.0);
        // Zero average speed yields zero pace, not a division blowup.
        assert_eq!(series[0].pace_min_per_km, 0.0);
        assert!((series[1].pace_min_per_km - (1000.0 / 2.5) / 60.0).abs() < 1e-9);
        assert!((series[1].speed_kmh - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_signature_activity_later_wins_ties() {
        let activities = vec![
            make(1, "Run", "2024-01-01T08:00:00Z", 10_000.0),
            make(2, "Run", "2024-02-01T08:00:00Z", 10_000.0),
            make(3, "Run", "2024-03-01T08:00:00Z", 8_000.0),
            make(4, "Ride", "2024-03-02T08:00:00Z", 50_000.0),
        ];
        let signature = signature_activity(&refs(&activities), "Run").unwrap();
        assert_eq!(signature.id, 2);

        assert!(signature_activity(&refs(&activities), "Swim").is_none());
    }

    #[test]
    fn test_sport_breakdown_threshold_and_completeness() {
        // 200 activities: 120 Run, 78 Ride, 1 Swim, 1 Kayaking.
        // Swim and Kayaking each sit at 0.5% and get dropped.
        let mut activities = Vec::new();
        for i in 0..120 {
            activities.push(make(i, "Run", "2024-01-01T08:00:00Z", 1.0));
        }
        for i in 120..198 {
            activities.push(make(i, "Ride", "2024-01-01T08:00:00Z", 1.0));
        }
        activities.push(make(198, "Swim", "2024-01-01T08:00:00Z", 1.0));
        activities.push(make(199, "Kayaking", "2024-01-01T08:00:00Z", 1.0));

        let selected = refs(&activities);
        let breakdown = sport_breakdown(&selected);

        let sports: Vec<&str> = breakdown.iter().map(|s| s.sport.as_str()).collect();
        assert_eq!(sports, vec!["Run", "Ride"]);
        assert_eq!(breakdown[0].percent, 60.0);
        assert_eq!(breakdown[1].percent, 39.0);

        // Reported shares plus the excluded tail cover the whole collection.
        let reported: f64 = breakdown.iter().map(|s| s.percent).sum();
        let excluded = 2.0 / 200.0 * 100.0;
        assert!((reported + excluded - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_time_of_day_bucket_edges() {
        let at = |id: u64, hour: u32| {
            let mut a = make(id, "Run", "2024-06-01T00:00:00Z", 1.0);
            a.start_date_local = format!("2024-06-01T{:02}:30:00Z", hour);
            a
        };
        let activities = vec![at(1, 4), at(2, 5), at(3, 11), at(4, 12), at(5, 16), at(6, 17)];
        let buckets = time_of_day(&refs(&activities));

        assert_eq!(buckets[0].name, "Morning");
        assert_eq!(buckets[0].count, 2); // hours 5 and 11
        assert_eq!(buckets[1].name, "Afternoon");
        assert_eq!(buckets[1].count, 2); // hours 12 and 16
        assert_eq!(buckets[2].name, "Evening");
        assert_eq!(buckets[2].count, 2); // hours 4 and 17

        let percents: u32 = buckets.iter().map(|b| b.percent).sum();
        assert_eq!(percents, 99); // 33 + 33 + 33, each rounded
    }

    #[test]
    fn test_frequency_grid_truncates_at_today() {
        let activities = vec![
            make(1, "Run", "2024-01-01T08:00:00Z", 1.0),
            make(2, "Run", "2024-01-01T18:00:00Z", 1.0),
            make(3, "Run", "2024-01-03T08:00:00Z", 1.0),
            // Prior-year activity never lands in the grid.
            make(4, "Run", "2023-12-31T08:00:00Z", 1.0),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let grid = frequency_grid(&refs(&activities), today);

        assert_eq!(grid.len(), 5);
        assert_eq!(grid[0].count, 2);
        assert_eq!(grid[1].count, 0);
        assert_eq!(grid[2].count, 1);
        assert_eq!(grid[4].count, 0);
    }

    #[test]
    fn test_frequency_grid_full_leap_year() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let grid = frequency_grid(&[], today);
        assert_eq!(grid.len(), 366);
    }

    #[test]
    fn test_favorite_month_tie_resolves_to_earliest() {
        let activities = vec![
            make(1, "Run", "2024-03-01T08:00:00Z", 1.0),
            make(2, "Run", "2024-01-15T08:00:00Z", 1.0),
            make(3, "Run", "2024-03-20T08:00:00Z", 1.0),
            make(4, "Run", "2024-01-02T08:00:00Z", 1.0),
        ];
        assert_eq!(favorite_month(&refs(&activities)), Some((0, "Jan")));
        assert_eq!(favorite_month(&[]), None);
    }

    #[test]
    fn test_archive_recap() {
        let activities = vec![
            make(1, "Run", "2024-01-10T08:00:00Z", 12_000.0),
            make(2, "Ride", "2024-02-11T08:00:00Z", 150_000.0),
            make(3, "Run", "2024-02-12T08:00:00Z", 8_000.0),
        ];
        let recap = archive_recap(&refs(&activities));
        assert_eq!(recap.count, 3);
        assert_eq!(recap.distance_km, "170"); // 170 km, grouped integer tier
        assert_eq!(recap.longest_km, "150");
        assert_eq!(recap.favorite_month, Some("Feb"));
    }
}
