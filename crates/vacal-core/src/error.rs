use chrono::NaiveDate;

/// Errors raised while building or deriving calendar structures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// Range end precedes its start.
    #[error("invalid date range: start ({start}) is after end ({end})")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A supplied week is inverted or wider than seven days.
    #[error("invalid week: {start} - {end}")]
    InvalidWeek { start: NaiveDate, end: NaiveDate },

    #[error("date arithmetic overflowed near {0}")]
    DateOutOfRange(NaiveDate),

    #[error("invalid calendar date: {0}")]
    InvalidDate(String),

    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("invalid view type: {0} (expected weekly, monthly or quarterly)")]
    InvalidViewType(String),

    #[error("invalid weekday: {0}")]
    InvalidWeekday(String),
}

/// Failures of the data-fetch collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("backend returned HTTP {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("country {0} is not available")]
    UnknownCountry(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse holiday file {path}: {message}")]
    Parse { path: String, message: String },

    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

impl SourceError {
    /// Whether re-running the fetch-and-assemble cycle may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
