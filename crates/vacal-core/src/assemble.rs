//! Turns supplied calendar data into view-specific groupings.

use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::datetime::{add_months, first_of_month, month_label, same_month};
use crate::error::CalendarError;
use crate::model::{
    CalendarData, CalendarView, DayEntry, HighlightType, Holiday, MonthGroup, ViewType, Week,
    WeekSummary, WeekWithDays,
};
use crate::partition::{classify_week, expand_days, holidays_in_week};

const MAX_WEEK_SPAN_DAYS: i64 = 6;

/// Checks the invariants assembly relies on. Nothing is assembled from data
/// that fails here.
pub fn validate(data: &CalendarData) -> Result<(), CalendarError> {
    if data.start_date > data.end_date {
        return Err(CalendarError::InvalidRange {
            start: data.start_date,
            end: data.end_date,
        });
    }

    for week in &data.weeks {
        let span = (week.end_date - week.start_date).num_days();
        if !(0..=MAX_WEEK_SPAN_DAYS).contains(&span) {
            return Err(CalendarError::InvalidWeek {
                start: week.start_date,
                end: week.end_date,
            });
        }
    }

    Ok(())
}

#[instrument(skip(data), fields(country = %data.country, weeks = data.weeks.len()))]
pub fn assemble(data: &CalendarData, view: ViewType) -> Result<CalendarView, CalendarError> {
    validate(data)?;

    let assembled = match view {
        ViewType::Weekly => CalendarView::Weekly(assemble_weekly(data)),
        ViewType::Monthly => CalendarView::Monthly(assemble_monthly(data)),
        ViewType::Quarterly => CalendarView::Quarterly(assemble_quarterly(data)?),
    };

    debug!(view = %view, "assembled calendar view");
    Ok(assembled)
}

pub fn assemble_weekly(data: &CalendarData) -> Vec<WeekWithDays> {
    weeks_with_days(data)
}

/// Same derivation as the weekly view; only the presentation differs.
pub fn assemble_monthly(data: &CalendarData) -> Vec<WeekWithDays> {
    weeks_with_days(data)
}

pub fn assemble_quarterly(data: &CalendarData) -> Result<Vec<MonthGroup>, CalendarError> {
    let groups = months_in_range(data.start_date, data.end_date)?
        .into_iter()
        .map(|month| MonthGroup {
            name: month_label(month),
            month,
            weeks: data
                .weeks
                .iter()
                .filter(|week| same_month(week.start_date, month))
                .map(|week| summarize(week, &data.holidays))
                .collect(),
        })
        .collect();

    Ok(groups)
}

/// First-of-month dates from the month of `start` through the month of `end`.
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, CalendarError> {
    let mut months = Vec::new();
    let mut current = first_of_month(start);

    while current <= end {
        months.push(current);
        current = add_months(current, 1)?;
    }

    Ok(months)
}

fn weeks_with_days(data: &CalendarData) -> Vec<WeekWithDays> {
    data.weeks
        .iter()
        .enumerate()
        .map(|(i, week)| {
            let highlight_type = derived_highlight(week, &data.holidays);
            let days = expand_days(week)
                .map(|date| DayEntry {
                    date,
                    holiday: holiday_on(date, &data.holidays).map(|h| h.name.clone()),
                })
                .collect();

            WeekWithDays {
                index: i + 1,
                start_date: week.start_date,
                end_date: week.end_date,
                highlight_type,
                days,
            }
        })
        .collect()
}

fn summarize(week: &Week, holidays: &[Holiday]) -> WeekSummary {
    WeekSummary {
        start_date: week.start_date,
        end_date: week.end_date,
        highlight_type: derived_highlight(week, holidays),
        holidays: holidays_in_week(week, holidays),
    }
}

fn derived_highlight(week: &Week, holidays: &[Holiday]) -> HighlightType {
    let derived = classify_week(week, holidays);
    if derived != week.highlight_type {
        debug!(
            start = %week.start_date,
            supplied = week.highlight_type.as_str(),
            derived = derived.as_str(),
            "supplied highlight disagrees with holiday list"
        );
    }
    derived
}

fn holiday_on(date: NaiveDate, holidays: &[Holiday]) -> Option<&Holiday> {
    holidays.iter().find(|h| h.date == date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DateRange;
    use crate::partition::partition_weeks;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn calendar(start: NaiveDate, end: NaiveDate, holidays: Vec<Holiday>) -> CalendarData {
        let range = DateRange::new(start, end).expect("valid range");
        CalendarData {
            country: "USA".to_string(),
            time_zone: "UTC".to_string(),
            start_date: start,
            end_date: end,
            weeks: partition_weeks(&range).expect("partition"),
            holidays,
        }
    }

    #[test]
    fn weekly_view_attaches_holiday_names_per_day() {
        let data = calendar(
            ymd(2024, 1, 1),
            ymd(2024, 1, 14),
            vec![
                Holiday::new(ymd(2024, 1, 1), "New Year's Day"),
                Holiday::new(ymd(2024, 1, 1), "Duplicate"),
            ],
        );

        let weeks = assemble_weekly(&data);
        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].index, 1);
        assert_eq!(weeks[1].index, 2);
        assert_eq!(weeks[0].days.len(), 7);
        assert_eq!(weeks[0].days[0].holiday.as_deref(), Some("New Year's Day"));
        assert!(weeks[0].days[1..].iter().all(|d| d.holiday.is_none()));
        // Both duplicate entries still count toward density.
        assert_eq!(weeks[0].highlight_type, HighlightType::Dark);
        assert_eq!(weeks[1].highlight_type, HighlightType::None);
    }

    #[test]
    fn monthly_view_matches_weekly_derivation() {
        let data = calendar(
            ymd(2024, 5, 1),
            ymd(2024, 5, 31),
            vec![Holiday::new(ymd(2024, 5, 27), "Memorial Day")],
        );
        assert_eq!(assemble_monthly(&data), assemble_weekly(&data));
    }

    #[test]
    fn supplied_highlight_is_rederived() {
        let mut data = calendar(
            ymd(2024, 1, 1),
            ymd(2024, 1, 7),
            vec![Holiday::new(ymd(2024, 1, 1), "New Year")],
        );
        data.weeks[0].highlight_type = HighlightType::Dark;

        let weeks = assemble_weekly(&data);
        assert_eq!(weeks[0].highlight_type, HighlightType::Lite);
    }

    #[test]
    fn quarterly_groups_three_named_months() {
        let data = calendar(
            ymd(2024, 1, 1),
            ymd(2024, 3, 31),
            vec![
                Holiday::new(ymd(2024, 1, 1), "New Year's Day"),
                Holiday::new(ymd(2024, 1, 15), "Martin Luther King Jr. Day"),
                Holiday::new(ymd(2024, 2, 19), "Presidents' Day"),
            ],
        );

        let months = assemble_quarterly(&data).expect("quarterly");
        let names: Vec<_> = months.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["January 2024", "February 2024", "March 2024"]);

        let january = &months[0];
        assert_eq!(january.weeks[0].holidays.len(), 1);
        assert_eq!(january.weeks[0].highlight_type, HighlightType::Lite);
        assert_eq!(january.weeks[2].holidays[0].name, "Martin Luther King Jr. Day");
    }

    #[test]
    fn quarterly_assigns_each_week_to_exactly_one_month() {
        let data = calendar(ymd(2024, 1, 1), ymd(2024, 3, 31), vec![]);

        let months = assemble_quarterly(&data).expect("quarterly");
        let total: usize = months.iter().map(|m| m.weeks.len()).sum();
        assert_eq!(total, data.weeks.len());

        for week in &data.weeks {
            let owners = months
                .iter()
                .filter(|m| m.weeks.iter().any(|w| w.start_date == week.start_date))
                .count();
            assert_eq!(owners, 1);
        }

        // 2024-01-29 .. 2024-02-04 belongs to January only.
        assert!(months[0].weeks.iter().any(|w| w.start_date == ymd(2024, 1, 29)));
        assert!(months[1].weeks.iter().all(|w| w.start_date >= ymd(2024, 2, 1)));
    }

    #[test]
    fn months_without_weeks_are_kept() {
        let mut data = calendar(ymd(2024, 1, 1), ymd(2024, 3, 31), vec![]);
        data.weeks.retain(|w| w.start_date.format("%m").to_string() != "02");

        let months = assemble_quarterly(&data).expect("quarterly");
        assert_eq!(months.len(), 3);
        assert!(months[1].weeks.is_empty());

        data.weeks.clear();
        let months = assemble_quarterly(&data).expect("quarterly");
        assert_eq!(months.len(), 3);
        assert!(months.iter().all(|m| m.weeks.is_empty()));
    }

    #[test]
    fn months_in_range_spans_year_boundary() {
        let months = months_in_range(ymd(2024, 11, 15), ymd(2025, 1, 3)).expect("months");
        assert_eq!(months, [ymd(2024, 11, 1), ymd(2024, 12, 1), ymd(2025, 1, 1)]);
    }

    #[test]
    fn invalid_data_produces_no_view() {
        let mut data = calendar(ymd(2024, 1, 1), ymd(2024, 1, 14), vec![]);
        data.start_date = ymd(2024, 2, 1);
        assert!(matches!(
            assemble(&data, ViewType::Weekly),
            Err(CalendarError::InvalidRange { .. })
        ));

        let mut data = calendar(ymd(2024, 1, 1), ymd(2024, 1, 14), vec![]);
        data.weeks[1].end_date = ymd(2024, 1, 20);
        assert_eq!(
            assemble(&data, ViewType::Quarterly),
            Err(CalendarError::InvalidWeek {
                start: ymd(2024, 1, 8),
                end: ymd(2024, 1, 20),
            })
        );
    }

    #[test]
    fn dispatch_follows_view_type() {
        let data = calendar(ymd(2024, 1, 1), ymd(2024, 1, 31), vec![]);
        for view in [ViewType::Weekly, ViewType::Monthly, ViewType::Quarterly] {
            let assembled = assemble(&data, view).expect("assemble");
            assert_eq!(assembled.view_type(), view);
        }
    }
}
