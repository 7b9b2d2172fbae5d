//! Week partitioning and holiday-density classification.

use std::iter::FusedIterator;

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::datetime::{add_months, first_of_month, parse_weekday_name};
use crate::error::CalendarError;
use crate::model::{DateRange, HighlightType, Holiday, ViewType, Week};

const WEEK_SPAN_DAYS: u64 = 6;

/// Splits `range` into consecutive seven-day weeks starting at `range.start()`.
///
/// The last week keeps its full width even when it runs past `range.end()`.
pub fn partition_weeks(range: &DateRange) -> Result<Vec<Week>, CalendarError> {
    let mut weeks = Vec::with_capacity((range.days() as usize).div_ceil(7));
    let mut start = range.start();

    while start <= range.end() {
        let end = start
            .checked_add_days(Days::new(WEEK_SPAN_DAYS))
            .ok_or(CalendarError::DateOutOfRange(start))?;
        weeks.push(Week {
            start_date: start,
            end_date: end,
            highlight_type: HighlightType::None,
        });

        match end.succ_opt() {
            Some(next) => start = next,
            None => break,
        }
    }

    tracing::trace!(
        start = %range.start(),
        end = %range.end(),
        weeks = weeks.len(),
        "partitioned range into weeks"
    );
    Ok(weeks)
}

pub fn classify_week(week: &Week, holidays: &[Holiday]) -> HighlightType {
    let count = holidays.iter().filter(|h| week.contains(h.date)).count();
    HighlightType::from_count(count)
}

pub fn holidays_in_week(week: &Week, holidays: &[Holiday]) -> Vec<Holiday> {
    holidays
        .iter()
        .filter(|h| week.contains(h.date))
        .cloned()
        .collect()
}

/// Returns copies of `weeks` with their highlight derived from `holidays`.
pub fn annotate_weeks(weeks: &[Week], holidays: &[Holiday]) -> Vec<Week> {
    weeks
        .iter()
        .map(|week| Week {
            highlight_type: classify_week(week, holidays),
            ..week.clone()
        })
        .collect()
}

pub fn expand_days(week: &Week) -> WeekDays {
    WeekDays {
        next: Some(week.start_date),
        last: week.end_date,
    }
}

/// Dates of a week in order, both endpoints included.
#[derive(Debug, Clone)]
pub struct WeekDays {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for WeekDays {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|d| *d <= self.last)?;
        self.next = current.succ_opt();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .next
            .filter(|d| *d <= self.last)
            .map(|d| (self.last - d).num_days() as usize + 1)
            .unwrap_or(0);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WeekDays {}

impl FusedIterator for WeekDays {}

/// Latest date on or before `date` that falls on `week_start`.
pub fn align_to_week_start(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday()
        - week_start.num_days_from_monday())
        % 7;
    date.checked_sub_days(Days::new(u64::from(offset)))
        .unwrap_or(date)
}

/// Span and weeks of one page of `view` beginning at `start`.
///
/// Weeks start on `week_start`. A weekly page is the single week holding
/// `start`. A monthly page runs from the week holding `start` to one month
/// after `start`. A quarterly page covers the three calendar months from the
/// month of `start`; a week starting before that month is left out, so every
/// week belongs to one of the three months.
pub fn view_page(
    view: ViewType,
    start: NaiveDate,
    week_start: Weekday,
) -> Result<(DateRange, Vec<Week>), CalendarError> {
    let aligned = align_to_week_start(start, week_start);
    let overflow = CalendarError::DateOutOfRange(start);

    let (span, weeks_from) = match view {
        ViewType::Weekly => {
            let end = aligned
                .checked_add_days(Days::new(WEEK_SPAN_DAYS))
                .ok_or(overflow)?;
            (DateRange::new(aligned, end)?, aligned)
        }
        ViewType::Monthly => {
            let end = add_months(start, 1)?.pred_opt().ok_or(overflow)?;
            (DateRange::new(aligned, end)?, aligned)
        }
        ViewType::Quarterly => {
            let first = first_of_month(start);
            let end = add_months(first, 3)?.pred_opt().ok_or(overflow)?;
            (
                DateRange::new(first, end)?,
                align_to_week_start(first, week_start),
            )
        }
    };

    let mut weeks = partition_weeks(&DateRange::new(weeks_from, span.end())?)?;
    if view == ViewType::Quarterly {
        weeks.retain(|w| w.start_date >= span.start());
    }
    Ok((span, weeks))
}

pub fn parse_week_start(raw: &str) -> Result<Weekday, CalendarError> {
    parse_weekday_name(raw).ok_or_else(|| CalendarError::InvalidWeekday(raw.trim().to_string()))
}
