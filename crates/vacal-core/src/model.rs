use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::datetime::calendar_date_serde;
use crate::error::CalendarError;

/// Inclusive span of calendar dates with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CalendarError> {
        if start > end {
            return Err(CalendarError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of days in the range, both endpoints included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    #[serde(with = "calendar_date_serde")]
    pub date: NaiveDate,
    pub name: String,
}

impl Holiday {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// Holiday density tier of a week.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HighlightType {
    #[default]
    None,
    Lite,
    Dark,
}

impl HighlightType {
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::None,
            1 => Self::Lite,
            _ => Self::Dark,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lite => "lite",
            Self::Dark => "dark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Week {
    #[serde(with = "calendar_date_serde")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date_serde")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub highlight_type: HighlightType,
}

impl Week {
    pub fn span(&self) -> Result<DateRange, CalendarError> {
        DateRange::new(self.start_date, self.end_date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Everything the data source returns for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarData {
    pub country: String,
    pub time_zone: String,
    #[serde(with = "calendar_date_serde")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date_serde")]
    pub end_date: NaiveDate,
    #[serde(default)]
    pub weeks: Vec<Week>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
}

impl ViewType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" | "week" | "w" => Ok(Self::Weekly),
            "monthly" | "month" | "m" => Ok(Self::Monthly),
            "quarterly" | "quarter" | "q" => Ok(Self::Quarterly),
            other => Err(CalendarError::InvalidViewType(other.to_string())),
        }
    }
}

/// One request's worth of user selections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub view: ViewType,
    pub start_date: NaiveDate,
    pub country: String,
    pub time_zone: Tz,
}

impl QueryParams {
    pub fn with_country(&self, country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayEntry {
    #[serde(with = "calendar_date_serde")]
    pub date: NaiveDate,
    pub holiday: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekWithDays {
    pub index: usize,
    #[serde(with = "calendar_date_serde")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date_serde")]
    pub end_date: NaiveDate,
    pub highlight_type: HighlightType,
    pub days: Vec<DayEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    #[serde(with = "calendar_date_serde")]
    pub start_date: NaiveDate,
    #[serde(with = "calendar_date_serde")]
    pub end_date: NaiveDate,
    pub highlight_type: HighlightType,
    pub holidays: Vec<Holiday>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGroup {
    pub name: String,
    #[serde(with = "calendar_date_serde")]
    pub month: NaiveDate,
    pub weeks: Vec<WeekSummary>,
}

/// Display-ready grouping for one view granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "viewType", content = "entries", rename_all = "lowercase")]
pub enum CalendarView {
    Weekly(Vec<WeekWithDays>),
    Monthly(Vec<WeekWithDays>),
    Quarterly(Vec<MonthGroup>),
}

impl CalendarView {
    pub fn view_type(&self) -> ViewType {
        match self {
            Self::Weekly(_) => ViewType::Weekly,
            Self::Monthly(_) => ViewType::Monthly,
            Self::Quarterly(_) => ViewType::Quarterly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let err = DateRange::new(ymd(2024, 1, 14), ymd(2024, 1, 1)).expect_err("inverted");
        assert_eq!(
            err,
            CalendarError::InvalidRange {
                start: ymd(2024, 1, 14),
                end: ymd(2024, 1, 1),
            }
        );

        let single = DateRange::new(ymd(2024, 1, 1), ymd(2024, 1, 1)).expect("single day");
        assert_eq!(single.days(), 1);
        assert!(single.contains(ymd(2024, 1, 1)));
    }

    #[test]
    fn highlight_tiers_are_ordered() {
        assert_eq!(HighlightType::from_count(0), HighlightType::None);
        assert_eq!(HighlightType::from_count(1), HighlightType::Lite);
        assert_eq!(HighlightType::from_count(5), HighlightType::Dark);
        assert!(HighlightType::None < HighlightType::Lite);
        assert!(HighlightType::Lite < HighlightType::Dark);
    }

    #[test]
    fn view_type_parses_loosely() {
        assert_eq!("Weekly".parse::<ViewType>().expect("weekly"), ViewType::Weekly);
        assert_eq!("q".parse::<ViewType>().expect("quarterly"), ViewType::Quarterly);
        assert!("yearly".parse::<ViewType>().is_err());
    }

    #[test]
    fn calendar_data_reads_backend_json() {
        let raw = r#"{
            "country": "USA",
            "timeZone": "America/New_York",
            "startDate": "2024-01-01",
            "endDate": "2024-01-14T00:00:00Z",
            "weeks": [
                {"startDate": "2024-01-01", "endDate": "2024-01-07", "highlightType": "lite"},
                {"startDate": "2024-01-08", "endDate": "2024-01-14"}
            ],
            "holidays": [{"date": "2024-01-01", "name": "New Year's Day"}]
        }"#;

        let data: CalendarData = serde_json::from_str(raw).expect("decode calendar data");
        assert_eq!(data.end_date, ymd(2024, 1, 14));
        assert_eq!(data.weeks.len(), 2);
        assert_eq!(data.weeks[0].highlight_type, HighlightType::Lite);
        assert_eq!(data.weeks[1].highlight_type, HighlightType::None);
        assert_eq!(data.holidays[0].date, ymd(2024, 1, 1));

        let encoded = serde_json::to_value(&data).expect("encode");
        assert_eq!(encoded["endDate"], "2024-01-14");
        assert_eq!(encoded["weeks"][0]["highlightType"], "lite");
    }
}
