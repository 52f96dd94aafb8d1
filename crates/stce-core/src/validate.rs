//! # Validate Module
//!
//! Field checks for request bodies.
//!
//! A DTO implements [`Validate`] by running its fields through a [`Check`],
//! which collects every problem before failing so a client sees all of them
//! in one `400` response.

use crate::error::{Result, StceError};
use chrono::{DateTime, NaiveDate, Utc};

/// Implemented by every request body that carries constraints.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Accumulates field problems.
#[derive(Debug, Default)]
pub struct Check {
    problems: Vec<String>,
}

impl Check {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `msg` unless `ok`.
    pub fn ensure(&mut self, ok: bool, msg: impl Into<String>) -> &mut Self {
        if !ok {
            self.problems.push(msg.into());
        }
        self
    }

    /// Length in characters must fall within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        self.ensure(
            (min..=max).contains(&len),
            format!("{field} must be between {min} and {max} characters"),
        )
    }

    /// At most `max` characters; checked only when present.
    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        match value {
            Some(v) => self.ensure(
                v.chars().count() <= max,
                format!("{field} must be at most {max} characters"),
            ),
            None => self,
        }
    }

    /// Not empty after trimming.
    pub fn non_empty(&mut self, field: &str, value: &str) -> &mut Self {
        self.ensure(!value.trim().is_empty(), format!("{field} should not be empty"))
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        self.ensure(is_email(value), format!("{field} must be an email"))
            .max_len(field, Some(value), 255)
    }

    pub fn url(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.ensure(is_url(v), format!("{field} must be a URL address")),
            None => self,
        }
    }

    pub fn at_least(&mut self, field: &str, value: i64, min: i64) -> &mut Self {
        self.ensure(value >= min, format!("{field} must not be less than {min}"))
    }

    /// `Ok(())` when nothing was recorded, otherwise every problem joined.
    pub fn finish(&mut self) -> Result<()> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(StceError::bad_request(self.problems.join("; ")))
        }
    }
}

fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn is_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    rest.is_some_and(|r| {
        let host = r.split(['/', '?', '#']).next().unwrap_or_default();
        !host.is_empty() && !r.chars().any(char::is_whitespace)
    })
}

/// Parse a calendar date given as `YYYY-MM-DD` or as a full RFC 3339
/// timestamp (the date part is kept).
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| StceError::bad_request(format!("{field} must be a valid ISO 8601 date string")))
}

/// Parse an RFC 3339 timestamp. A bare date means midnight UTC.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            StceError::bad_request(format!("{field} must be a valid ISO 8601 date string"))
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn check_collects_every_problem() {
        let err = Check::new()
            .length("username", "ab", 3, 50)
            .non_empty("name", "   ")
            .email("email", "not-an-email")
            .finish()
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("username must be between 3 and 50 characters"));
        assert!(msg.contains("name should not be empty"));
        assert!(msg.contains("email must be an email"));
    }

    #[test]
    fn check_passes_clean_input() {
        assert!(
            Check::new()
                .length("username", "alice", 3, 50)
                .email("email", "alice@example.com")
                .url("link", Some("https://github.com/stce"))
                .at_least("start_year", 2024, 2000)
                .finish()
                .is_ok()
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(Check::new().length("name", "김철수", 1, 3).finish().is_ok());
    }

    #[test]
    fn email_shapes() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("a@b"));
        assert!(!is_email("@b.co"));
        assert!(!is_email("a b@c.de"));
        assert!(!is_email("a@b@c.de"));
    }

    #[test]
    fn url_shapes() {
        assert!(is_url("http://example.com/path?q=1"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("https://"));
    }

    #[test]
    fn dates_accept_plain_and_rfc3339() {
        let plain = parse_date("birth_date", "2000-01-15").unwrap();
        let full = parse_date("birth_date", "2000-01-15T00:00:00.000Z").unwrap();
        assert_eq!(plain, full);
        assert!(parse_date("birth_date", "15/01/2000").is_err());
    }

    #[test]
    fn timestamps_accept_bare_dates() {
        let ts = parse_timestamp("publishAt", "2030-05-01").unwrap();
        assert_eq!(ts.to_rfc3339(), "2030-05-01T00:00:00+00:00");
        assert!(parse_timestamp("publishAt", "soon").is_err());
    }
}
