//! Utility functions shared by the collectors.
//!
//! This module provides helpers used throughout the application:
//! - Recency windows ("last N days", "last calendar week", recent weekdays)
//! - HTTP client construction and body fetching with a browser-like user agent
//! - URL normalization (absolute resolution, tracking-parameter stripping)
//! - Character-safe truncation for payloads and logs

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use reqwest::Client;
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, instrument};
use url::Url;

/// User agent sent with every collector request.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Timeout applied to every collector HTTP request.
pub const HTTP_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Build the HTTP client a collector owns for one run.
pub fn http_client() -> Result<Client, Box<dyn Error>> {
    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// GET `url` and return the body, treating non-2xx statuses as errors.
#[instrument(level = "debug", skip(client))]
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, Box<dyn Error>> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    debug!(bytes = body.len(), "Fetched body");
    Ok(body)
}

/// The instant before which items count as stale: `now - days`.
pub fn cutoff(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

/// Last completed calendar week, Monday 00:00:00 UTC through Sunday 23:59:59 UTC.
///
/// On any day of the current week this returns the previous Monday–Sunday.
pub fn last_completed_week(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let this_monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let last_monday = this_monday - Duration::days(7);
    let last_sunday = this_monday - Duration::days(1);

    let start = last_monday.and_time(NaiveTime::MIN).and_utc();
    let end = last_sunday
        .and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc())
        .unwrap_or(start + Duration::days(7) - Duration::seconds(1));
    (start, end)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Most recent weekday among `today` and the `lookback_days` days before it.
pub fn latest_weekday(today: NaiveDate, lookback_days: i64) -> Option<NaiveDate> {
    (0..=lookback_days)
        .map(|back| today - Duration::days(back))
        .find(|date| !is_weekend(*date))
}

/// Walk backward from `today` collecting up to `count` weekdays, newest first.
///
/// The walk covers at most `count + lookback_buffer` calendar days so that
/// skipped weekends do not starve the result.
pub fn recent_weekdays(today: NaiveDate, count: usize, lookback_buffer: usize) -> Vec<NaiveDate> {
    (0..(count + lookback_buffer) as i64)
        .map(|back| today - Duration::days(back))
        .filter(|date| !is_weekend(*date))
        .take(count)
        .collect()
}

/// Keep at most `max` characters of `s`. Never splits a UTF-8 sequence.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters and suffixed with the number of
/// bytes dropped.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let kept = truncate_chars(s, max);
    if kept.len() == s.len() {
        kept
    } else {
        format!("{}…(+{} bytes)", kept, s.len() - kept.len())
    }
}

/// Join the text fragments of an element, trimming each and dropping blanks.
pub fn clean_text<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `href` against `base` and drop its query string and fragment.
pub fn absolute_without_query(base: &Url, href: &str) -> Option<Url> {
    let mut resolved = base.join(href).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_query(None);
    resolved.set_fragment(None);
    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cutoff() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(
            cutoff(now, 7),
            Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_last_completed_week_from_midweek() {
        // Wednesday
        let now = Utc.with_ymd_and_hms(2025, 3, 12, 9, 30, 0).unwrap();
        let (start, end) = last_completed_week(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_last_completed_week_from_monday() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 1).unwrap();
        let (start, end) = last_completed_week(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());
        assert_eq!(end.weekday(), Weekday::Sun);
    }

    #[test]
    fn test_latest_weekday_skips_weekend() {
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(
            latest_weekday(sunday, 3),
            NaiveDate::from_ymd_opt(2025, 3, 7)
        );
        let tuesday = NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        assert_eq!(latest_weekday(tuesday, 3), Some(tuesday));
    }

    #[test]
    fn test_recent_weekdays() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let days = recent_weekdays(monday, 3, 7);
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 7).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 6).unwrap(),
            ]
        );
        assert!(days.iter().all(|d| !is_weekend(*d)));
    }

    #[test]
    fn test_truncate_chars_respects_multibyte() {
        assert_eq!(truncate_chars("한국어 뉴스", 3), "한국어");
        assert_eq!(truncate_chars("short", 500), "short");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_clean_text() {
        let parts = ["  Hello ", "\n", "world  "];
        assert_eq!(clean_text(parts.into_iter()), "Hello world");
    }

    #[test]
    fn test_absolute_without_query() {
        let base = Url::parse("https://www.anthropic.com/news").unwrap();
        let url = absolute_without_query(&base, "/news/claude?utm_source=x#top").unwrap();
        assert_eq!(url.as_str(), "https://www.anthropic.com/news/claude");

        assert!(absolute_without_query(&base, "mailto:hi@example.com").is_none());
    }
}
