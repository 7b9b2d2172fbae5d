//! Data-fetch collaborators that supply `CalendarData`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Weekday;
use reqwest::blocking::Client;
use reqwest::{Url, header};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::datetime::format_calendar_date;
use crate::error::SourceError;
use crate::model::{CalendarData, Holiday, QueryParams};
use crate::partition::{annotate_weeks, view_page};

pub trait CalendarSource {
    fn fetch_countries(&self) -> Result<Vec<String>, SourceError>;

    fn fetch_calendar_data(&self, params: &QueryParams) -> Result<CalendarData, SourceError>;

    /// Short label used in logs.
    fn describe(&self) -> String;
}

/// Client for the calendar backend's `/countries` and `/data` endpoints.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for calendar backend")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, SourceError> {
        let url_text = url.to_string();
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .map_err(|err| SourceError::Request {
                url: url_text.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        let body = response.text().map_err(|err| SourceError::Request {
            url: url_text.clone(),
            message: err.to_string(),
        })?;

        if !status.is_success() {
            return Err(SourceError::Status {
                url: url_text,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| SourceError::Decode {
            url: url_text,
            message: err.to_string(),
        })
    }
}

impl CalendarSource for HttpSource {
    fn fetch_countries(&self) -> Result<Vec<String>, SourceError> {
        let raw = self.endpoint("countries");
        let url = Url::parse(&raw).map_err(|err| SourceError::Request {
            url: raw.clone(),
            message: err.to_string(),
        })?;
        self.get_json(url)
    }

    fn fetch_calendar_data(&self, params: &QueryParams) -> Result<CalendarData, SourceError> {
        let raw = self.endpoint("data");
        let start = format_calendar_date(params.start_date);
        let url = Url::parse_with_params(
            &raw,
            [
                ("viewType", params.view.as_str()),
                ("startDate", start.as_str()),
                ("country", params.country.as_str()),
                ("timeZone", params.time_zone.name()),
            ],
        )
        .map_err(|err| SourceError::Request {
            url: raw.clone(),
            message: err.to_string(),
        })?;
        self.get_json(url)
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}

#[derive(Debug, Deserialize)]
struct HolidayFile {
    #[serde(default)]
    countries: BTreeMap<String, CountryHolidays>,
}

#[derive(Debug, Deserialize)]
struct CountryHolidays {
    #[serde(default)]
    holidays: Vec<Holiday>,
}

/// Builds calendar data locally from a TOML holiday file.
///
/// ```toml
/// [countries.USA]
/// holidays = [{ date = "2024-07-04", name = "Independence Day" }]
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    week_start: Weekday,
}

impl FileSource {
    pub fn new(path: &Path, week_start: Weekday) -> Self {
        Self {
            path: path.to_path_buf(),
            week_start,
        }
    }

    fn load(&self) -> Result<HolidayFile, SourceError> {
        let display = self.path.display().to_string();
        let raw = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&raw).map_err(|err| SourceError::Parse {
            path: display,
            message: err.to_string(),
        })
    }
}

impl CalendarSource for FileSource {
    fn fetch_countries(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.load()?.countries.into_keys().collect())
    }

    fn fetch_calendar_data(&self, params: &QueryParams) -> Result<CalendarData, SourceError> {
        let mut file = self.load()?;
        let entry = file
            .countries
            .remove(&params.country)
            .ok_or_else(|| SourceError::UnknownCountry(params.country.clone()))?;

        let (range, weeks) = view_page(params.view, params.start_date, self.week_start)?;
        let covered_start = weeks.first().map_or(range.start(), |w| w.start_date);
        let covered_end = weeks.last().map_or(range.end(), |w| w.end_date);

        let mut holidays: Vec<Holiday> = entry
            .holidays
            .into_iter()
            .filter(|h| covered_start <= h.date && h.date <= covered_end)
            .collect();
        holidays.sort_by_key(|h| h.date);

        debug!(
            country = %params.country,
            weeks = weeks.len(),
            holidays = holidays.len(),
            "built calendar data from holiday file"
        );

        Ok(CalendarData {
            country: params.country.clone(),
            time_zone: params.time_zone.name().to_string(),
            start_date: range.start(),
            end_date: range.end(),
            weeks: annotate_weeks(&weeks, &holidays),
            holidays,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Wraps a source and traces every call.
#[derive(Debug, Clone)]
pub struct LoggingSource<S> {
    inner: S,
}

impl<S: CalendarSource> LoggingSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: CalendarSource> CalendarSource for LoggingSource<S> {
    fn fetch_countries(&self) -> Result<Vec<String>, SourceError> {
        let started = Instant::now();
        info!(source = %self.inner.describe(), "requesting countries");
        let result = self.inner.fetch_countries();
        match &result {
            Ok(countries) => info!(
                count = countries.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "received countries"
            ),
            Err(err) => warn!(error = %err, "country request failed"),
        }
        result
    }

    fn fetch_calendar_data(&self, params: &QueryParams) -> Result<CalendarData, SourceError> {
        let started = Instant::now();
        info!(
            source = %self.inner.describe(),
            view = %params.view,
            start = %params.start_date,
            country = %params.country,
            time_zone = %params.time_zone,
            "requesting calendar data"
        );
        let result = self.inner.fetch_calendar_data(params);
        match &result {
            Ok(data) => info!(
                weeks = data.weeks.len(),
                holidays = data.holidays.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "received calendar data"
            ),
            Err(err) => warn!(error = %err, retryable = err.is_retryable(), "calendar data request failed"),
        }
        result
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::assemble::assemble;
    use crate::model::{CalendarView, HighlightType, ViewType};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn holiday_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("holidays.toml");
        fs::write(&path, contents).expect("write holiday file");
        (dir, path)
    }

    const SAMPLE: &str = r#"
[countries.USA]
holidays = [
  { date = "2024-01-01", name = "New Year's Day" },
  { date = "2024-01-15", name = "Martin Luther King Jr. Day" },
  { date = "2024-07-04", name = "Independence Day" },
]

[countries.CAN]
holidays = [{ date = "2024-07-01", name = "Canada Day" }]
"#;

    fn params(view: ViewType, start: NaiveDate, country: &str) -> QueryParams {
        QueryParams {
            view,
            start_date: start,
            country: country.to_string(),
            time_zone: chrono_tz::UTC,
        }
    }

    #[test]
    fn file_source_lists_countries_sorted() {
        let (_dir, path) = holiday_file(SAMPLE);
        let source = FileSource::new(&path, Weekday::Mon);
        assert_eq!(source.fetch_countries().expect("countries"), ["CAN", "USA"]);
    }

    #[test]
    fn file_source_builds_annotated_month() {
        let (_dir, path) = holiday_file(SAMPLE);
        let source = FileSource::new(&path, Weekday::Mon);
        let data = source
            .fetch_calendar_data(&params(ViewType::Monthly, ymd(2024, 1, 1), "USA"))
            .expect("calendar data");

        assert_eq!(data.start_date, ymd(2024, 1, 1));
        assert_eq!(data.end_date, ymd(2024, 1, 31));
        assert_eq!(data.weeks.len(), 5);
        assert_eq!(data.holidays.len(), 2);
        assert_eq!(data.weeks[0].highlight_type, HighlightType::Lite);
        assert_eq!(data.weeks[1].highlight_type, HighlightType::None);
        assert_eq!(data.weeks[2].highlight_type, HighlightType::Lite);
        assert_eq!(data.time_zone, "UTC");
    }

    #[test]
    fn file_source_weekly_midweek_start_yields_one_week() {
        let (_dir, path) = holiday_file(SAMPLE);
        let source = FileSource::new(&path, Weekday::Mon);
        let data = source
            .fetch_calendar_data(&params(ViewType::Weekly, ymd(2024, 1, 10), "USA"))
            .expect("calendar data");

        assert_eq!(data.start_date, ymd(2024, 1, 8));
        assert_eq!(data.end_date, ymd(2024, 1, 14));
        assert_eq!(data.weeks.len(), 1);
        assert_eq!(data.weeks[0].start_date, ymd(2024, 1, 8));
        assert!(data.holidays.is_empty());
    }

    #[test]
    fn file_source_quarter_from_midweek_first_covers_three_months() {
        let (_dir, path) = holiday_file(SAMPLE);
        let source = FileSource::new(&path, Weekday::Mon);
        let data = source
            .fetch_calendar_data(&params(ViewType::Quarterly, ymd(2024, 3, 1), "USA"))
            .expect("calendar data");
        assert_eq!(data.start_date, ymd(2024, 3, 1));
        assert_eq!(data.end_date, ymd(2024, 5, 31));

        let CalendarView::Quarterly(months) =
            assemble(&data, ViewType::Quarterly).expect("assemble")
        else {
            panic!("expected quarterly view");
        };
        let shape: Vec<_> = months.iter().map(|m| (m.name.as_str(), m.weeks.len())).collect();
        assert_eq!(shape, [("March 2024", 4), ("April 2024", 5), ("May 2024", 4)]);
        let total: usize = months.iter().map(|m| m.weeks.len()).sum();
        assert_eq!(total, data.weeks.len());
    }

    #[test]
    fn file_source_rejects_unknown_country() {
        let (_dir, path) = holiday_file(SAMPLE);
        let source = FileSource::new(&path, Weekday::Mon);
        let err = source
            .fetch_calendar_data(&params(ViewType::Weekly, ymd(2024, 1, 1), "MEX"))
            .expect_err("unknown country");
        assert!(matches!(err, SourceError::UnknownCountry(ref c) if c == "MEX"));
    }

    #[test]
    fn file_source_reports_bad_toml() {
        let (_dir, path) = holiday_file("[countries.USA]\nholidays = [{ date = \"soon\", name = \"x\" }]\n");
        let source = FileSource::new(&path, Weekday::Mon);
        assert!(matches!(source.fetch_countries(), Err(SourceError::Parse { .. })));
    }

    #[test]
    fn logging_source_passes_results_through() {
        let (_dir, path) = holiday_file(SAMPLE);
        let source = LoggingSource::new(FileSource::new(&path, Weekday::Mon));
        let data = source
            .fetch_calendar_data(&params(ViewType::Weekly, ymd(2024, 7, 1), "CAN"))
            .expect("calendar data");
        assert_eq!(data.weeks.len(), 1);
        assert_eq!(data.holidays[0].name, "Canada Day");
        assert_eq!(source.describe(), path.display().to_string());
    }
}
