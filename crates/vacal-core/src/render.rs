use std::io::{self, IsTerminal, Write};

use chrono::Datelike;
use unicode_width::UnicodeWidthStr;

use crate::datetime::format_calendar_date;
use crate::model::{CalendarData, CalendarView, HighlightType, MonthGroup, WeekWithDays};

const HOLIDAY_MARK: char = '*';

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Colors are only emitted when enabled and stdout is a terminal.
    pub fn new(color: bool) -> Self {
        Self {
            color: color && io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all)]
    pub fn print_calendar(&self, data: &CalendarData, view: &CalendarView) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_calendar(&mut out, data, view)
    }

    pub fn write_calendar<W: Write>(
        &self,
        out: &mut W,
        data: &CalendarData,
        view: &CalendarView,
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "{}",
            self.paint(
                &format!("Calendar - {} ({})", data.country, data.time_zone),
                "1"
            )
        )?;
        writeln!(
            out,
            "{} to {}",
            format_calendar_date(data.start_date),
            format_calendar_date(data.end_date)
        )?;
        self.write_legend(out)?;
        writeln!(out)?;

        match view {
            CalendarView::Weekly(weeks) => self.write_weekly(out, weeks),
            CalendarView::Monthly(weeks) => self.write_monthly(out, weeks),
            CalendarView::Quarterly(months) => self.write_quarterly(out, months),
        }
    }

    pub fn print_json(&self, data: &CalendarData, view: &CalendarView) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "country": data.country,
            "timeZone": data.time_zone,
            "startDate": format_calendar_date(data.start_date),
            "endDate": format_calendar_date(data.end_date),
            "view": view,
        });
        let mut out = io::stdout().lock();
        serde_json::to_writer_pretty(&mut out, &payload)?;
        writeln!(out)?;
        Ok(())
    }

    pub fn print_lines<I, S>(&self, lines: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out = io::stdout().lock();
        for line in lines {
            writeln!(out, "{}", line.as_ref())?;
        }
        Ok(())
    }

    fn write_legend<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(
            out,
            "Legend: Regular Week | {} | {} | {} Holiday Date",
            self.tier("1 Holiday Week", HighlightType::Lite),
            self.tier("2+ Holiday Week", HighlightType::Dark),
            self.paint(&HOLIDAY_MARK.to_string(), "36"),
        )?;
        Ok(())
    }

    fn write_weekly<W: Write>(&self, out: &mut W, weeks: &[WeekWithDays]) -> anyhow::Result<()> {
        for week in weeks {
            let header = format!(
                "Week {}  {} - {}",
                week.index,
                format_calendar_date(week.start_date),
                format_calendar_date(week.end_date)
            );
            writeln!(out, "{}", self.tier(&header, week.highlight_type))?;

            for day in &week.days {
                let line = format!(
                    "  {} {:>2}",
                    day.date.weekday(),
                    day.date.day()
                );
                match &day.holiday {
                    Some(name) => writeln!(
                        out,
                        "{} {}",
                        line,
                        self.paint(&format!("{HOLIDAY_MARK} {name}"), "36")
                    )?,
                    None => writeln!(out, "{line}")?,
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_monthly<W: Write>(&self, out: &mut W, weeks: &[WeekWithDays]) -> anyhow::Result<()> {
        let Some(first) = weeks.first() else {
            writeln!(out, "(no weeks)")?;
            return Ok(());
        };

        let header = first
            .days
            .iter()
            .map(|d| format!("{:>4}", d.date.weekday().to_string()))
            .collect::<String>();
        writeln!(out, "{header}")?;

        for week in weeks {
            let row = week
                .days
                .iter()
                .map(|d| {
                    let mark = if d.holiday.is_some() { HOLIDAY_MARK } else { ' ' };
                    format!("{:>3}{mark}", d.date.day())
                })
                .collect::<String>();
            writeln!(out, "{}", self.tier(&row, week.highlight_type))?;
        }

        let holidays: Vec<_> = weeks
            .iter()
            .flat_map(|w| w.days.iter())
            .filter_map(|d| d.holiday.as_ref().map(|name| (d.date, name)))
            .collect();
        if !holidays.is_empty() {
            writeln!(out)?;
            for (date, name) in holidays {
                writeln!(
                    out,
                    "{} {}",
                    format_calendar_date(date),
                    self.paint(name, "36")
                )?;
            }
        }
        Ok(())
    }

    fn write_quarterly<W: Write>(&self, out: &mut W, months: &[MonthGroup]) -> anyhow::Result<()> {
        for month in months {
            writeln!(out, "{}", self.paint(&month.name, "1"))?;
            if month.weeks.is_empty() {
                writeln!(out, "  (no weeks)")?;
                writeln!(out)?;
                continue;
            }

            let rows = month
                .weeks
                .iter()
                .map(|week| {
                    let span = format!(
                        "{} - {}",
                        format_calendar_date(week.start_date),
                        format_calendar_date(week.end_date)
                    );
                    let holidays = week
                        .holidays
                        .iter()
                        .map(|h| format!("{} ({})", h.name, format_calendar_date(h.date)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    vec![
                        self.tier(&span, week.highlight_type),
                        week.highlight_type.as_str().to_string(),
                        holidays,
                    ]
                })
                .collect();

            write_table(
                &mut *out,
                vec!["Week".to_string(), "Tier".to_string(), "Holidays".to_string()],
                rows,
            )?;
            writeln!(out)?;
        }
        Ok(())
    }

    fn tier(&self, text: &str, highlight: HighlightType) -> String {
        match highlight {
            HighlightType::None => text.to_string(),
            HighlightType::Lite => self.paint(text, "33"),
            HighlightType::Dark => self.paint(text, "1;31"),
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    write!(writer, "  ")?;
    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    write!(writer, "  ")?;
    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        write!(writer, "  ")?;
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
