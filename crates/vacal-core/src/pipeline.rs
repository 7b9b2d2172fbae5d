use tracing::{info, instrument, warn};

use crate::assemble::assemble;
use crate::error::SourceError;
use crate::model::{CalendarData, CalendarView, QueryParams};
use crate::source::CalendarSource;

/// Runs one fetch-and-assemble cycle, repeating the whole cycle up to
/// `retries` more times while the failure is retryable.
#[instrument(skip(source, params), fields(view = %params.view, country = %params.country))]
pub fn load_view(
    source: &dyn CalendarSource,
    params: &QueryParams,
    retries: u32,
) -> Result<(CalendarData, CalendarView), SourceError> {
    with_retries(retries, "calendar load", || fetch_and_assemble(source, params))
}

fn fetch_and_assemble(
    source: &dyn CalendarSource,
    params: &QueryParams,
) -> Result<(CalendarData, CalendarView), SourceError> {
    let data = source.fetch_calendar_data(params)?;
    let view = assemble(&data, params.view)?;
    Ok((data, view))
}

fn with_retries<T>(
    retries: u32,
    what: &str,
    mut op: impl FnMut() -> Result<T, SourceError>,
) -> Result<T, SourceError> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!(attempt, retries, error = %err, "retrying {what}");
            }
            Err(err) => return Err(err),
        }
    }
}

/// Picks the country to query. The country list gets the same retry budget
/// as the data load; if it still cannot be fetched, `requested` is kept.
#[instrument(skip(source))]
pub fn choose_country(source: &dyn CalendarSource, requested: &str, retries: u32) -> String {
    match with_retries(retries, "country list", || source.fetch_countries()) {
        Ok(countries) => resolve_country(requested, &countries),
        Err(err) => {
            warn!(error = %err, requested, "country list unavailable; keeping requested country");
            requested.to_string()
        }
    }
}

/// Keeps `requested` when it is offered or when nothing is offered,
/// otherwise falls back to the first available country.
pub fn resolve_country(requested: &str, countries: &[String]) -> String {
    match countries.first() {
        Some(fallback) if !countries.iter().any(|c| c == requested) => {
            info!(requested, fallback = %fallback, "requested country unavailable; using first listed");
            fallback.clone()
        }
        _ => requested.to_string(),
    }
}
