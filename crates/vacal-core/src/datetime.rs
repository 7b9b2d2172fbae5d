use std::sync::OnceLock;

use chrono::{
  Datelike,
  Months,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::error::CalendarError;

pub const DEFAULT_TIMEZONE: &str =
  "UTC";
const TIMEZONE_ENV_VAR: &str =
  "VACAL_TIMEZONE";
const CALENDAR_DATE_FORMAT: &str =
  "%Y-%m-%d";

/// Zones offered by the timezone picker.
pub const SUGGESTED_TIMEZONES: [&str;
  7] = [
  "UTC",
  "America/New_York",
  "America/Toronto",
  "Europe/London",
  "Asia/Kolkata",
  "Asia/Tokyo",
  "Australia/Sydney"
];

fn calendar_date_regex()
-> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> =
    OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(
      r"^(\d{4}-\d{2}-\d{2})(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$"
    )
    .ok()
  })
  .as_ref()
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// Timestamps such as `2024-01-01T00:00:00Z` are cut down to the calendar
/// date they were written with. No zone conversion happens, so the result
/// does not depend on the process's local timezone.
pub fn parse_calendar_date(
  raw: &str
) -> Result<NaiveDate, CalendarError> {
  let trimmed = raw.trim();
  let date_part = calendar_date_regex()
    .and_then(|re| re.captures(trimmed))
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str())
    .ok_or_else(|| {
      CalendarError::InvalidDate(
        trimmed.to_string()
      )
    })?;

  NaiveDate::parse_from_str(
    date_part,
    CALENDAR_DATE_FORMAT
  )
  .map_err(|_| {
    CalendarError::InvalidDate(
      trimmed.to_string()
    )
  })
}

#[must_use]
pub fn format_calendar_date(
  date: NaiveDate
) -> String {
  date
    .format(CALENDAR_DATE_FORMAT)
    .to_string()
}

pub fn parse_timezone(
  raw: &str
) -> Result<Tz, CalendarError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Ok(chrono_tz::UTC);
  }

  trimmed.parse::<Tz>().map_err(|_| {
    CalendarError::InvalidTimezone(
      trimmed.to_string()
    )
  })
}

/// Picks the session timezone: `VACAL_TIMEZONE`, then the configured
/// value, then UTC.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
  {
    match parse_timezone(&raw) {
      | Ok(tz) => {
        tracing::info!(
          source = TIMEZONE_ENV_VAR,
          timezone = %tz,
          "using timezone from environment"
        );
        return tz;
      }
      | Err(err) => {
        tracing::warn!(
          source = TIMEZONE_ENV_VAR,
          error = %err,
          "ignoring invalid timezone"
        );
      }
    }
  }

  if let Some(raw) = configured {
    match parse_timezone(raw) {
      | Ok(tz) => return tz,
      | Err(err) => {
        tracing::warn!(
          source = "default.timezone",
          error = %err,
          "ignoring invalid timezone"
        );
      }
    }
  }

  chrono_tz::UTC
}

#[must_use]
pub fn today_in(tz: Tz) -> NaiveDate {
  Utc::now()
    .with_timezone(&tz)
    .date_naive()
}

#[must_use]
pub fn first_of_month(
  date: NaiveDate
) -> NaiveDate {
  date
    .with_day(1)
    .unwrap_or(date)
}

pub fn add_months(
  date: NaiveDate,
  months: u32
) -> Result<NaiveDate, CalendarError> {
  date
    .checked_add_months(Months::new(
      months
    ))
    .ok_or(
      CalendarError::DateOutOfRange(
        date
      )
    )
}

/// `"January 2024"` style label.
#[must_use]
pub fn month_label(
  date: NaiveDate
) -> String {
  date.format("%B %Y").to_string()
}

#[must_use]
pub fn same_month(
  a: NaiveDate,
  b: NaiveDate
) -> bool {
  a.year() == b.year()
    && a.month() == b.month()
}

pub fn parse_weekday_name(
  raw: &str
) -> Option<Weekday> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    Weekday
  };

  use super::{
    add_months,
    format_calendar_date,
    month_label,
    parse_calendar_date,
    parse_timezone,
    parse_weekday_name
  };

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn calendar_date_round_trips() {
    let date = ymd(2024, 2, 29);
    let text =
      format_calendar_date(date);
    assert_eq!(text, "2024-02-29");
    assert_eq!(
      parse_calendar_date(&text)
        .expect("parse date"),
      date
    );
  }

  #[test]
  fn timestamps_keep_their_written_date()
  {
    assert_eq!(
      parse_calendar_date(
        "2024-01-01T23:30:00-05:00"
      )
      .expect("parse timestamp"),
      ymd(2024, 1, 1)
    );
    assert_eq!(
      parse_calendar_date(
        "2024-12-31 00:00:00"
      )
      .expect("parse timestamp"),
      ymd(2024, 12, 31)
    );
  }

  #[test]
  fn rejects_malformed_dates() {
    assert!(
      parse_calendar_date("2024-13-01")
        .is_err()
    );
    assert!(
      parse_calendar_date("01/02/2024")
        .is_err()
    );
    assert!(
      parse_calendar_date("").is_err()
    );
  }

  #[test]
  fn rejects_text_after_the_date() {
    for raw in [
      "2024-01-01 garbage",
      "2024-01-01T",
      "2024-01-01T12:00 later",
      "2024-01-01Tnoon"
    ] {
      assert!(
        parse_calendar_date(raw).is_err(),
        "{raw} should be rejected"
      );
    }
    assert_eq!(
      parse_calendar_date(
        "2024-01-01T00:00:00.000Z"
      )
      .expect("parse timestamp"),
      ymd(2024, 1, 1)
    );
  }

  #[test]
  fn parses_iana_zones() {
    assert_eq!(
      parse_timezone("Asia/Kolkata")
        .expect("known zone")
        .name(),
      "Asia/Kolkata"
    );
    assert_eq!(
      parse_timezone("")
        .expect("empty means utc")
        .name(),
      "UTC"
    );
    assert!(
      parse_timezone("Mars/Olympus")
        .is_err()
    );
  }

  #[test]
  fn month_helpers() {
    assert_eq!(
      month_label(ymd(2024, 1, 15)),
      "January 2024"
    );
    assert_eq!(
      add_months(ymd(2024, 1, 31), 1)
        .expect("add month"),
      ymd(2024, 2, 29)
    );
  }

  #[test]
  fn parses_weekday_names() {
    assert_eq!(
      parse_weekday_name("Sunday"),
      Some(Weekday::Sun)
    );
    assert_eq!(
      parse_weekday_name("mon"),
      Some(Weekday::Mon)
    );
    assert_eq!(
      parse_weekday_name("someday"),
      None
    );
  }
}

/// Serde adapter that writes dates as `YYYY-MM-DD` and reads either a plain
/// date or a timestamp, keeping only the calendar date.
pub mod calendar_date_serde {
  use chrono::NaiveDate;
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  pub fn serialize<S>(
    date: &NaiveDate,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    serializer.serialize_str(
      &super::format_calendar_date(
        *date
      )
    )
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<NaiveDate, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw = String::deserialize(
      deserializer
    )?;
    super::parse_calendar_date(&raw)
      .map_err(serde::de::Error::custom)
  }
}
