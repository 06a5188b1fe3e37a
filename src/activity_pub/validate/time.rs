use std::fmt::Display;

use jiff::civil;
use jiff::fmt::temporal::SpanParser;
use jiff::tz::TimeZone;
use jiff::{Span, Timestamp};

static SPAN_PARSER: SpanParser = SpanParser::new();

/// An `xsd:dateTime` value.
///
/// The text is kept as received so re-serialization does not reformat it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTime {
    text: String,
    instant: Timestamp,
}

impl DateTime {
    pub fn parse(text: &str) -> Result<DateTime, String> {
        let instant = match text.parse::<Timestamp>() {
            Ok(instant) => instant,
            // no offset, read as UTC
            Err(_) => text
                .parse::<civil::DateTime>()
                .ok()
                .and_then(|dt| dt.to_zoned(TimeZone::UTC).ok())
                .map(|zoned| zoned.timestamp())
                .ok_or_else(|| format!("{text:?} is not an RFC 3339 date-time"))?,
        };
        Ok(DateTime {
            text: text.to_string(),
            instant,
        })
    }
    /// Current time truncated to whole seconds.
    pub fn now() -> DateTime {
        let now = Timestamp::now();
        let instant = Timestamp::from_second(now.as_second()).unwrap_or(now);
        DateTime::from(instant)
    }
    pub fn instant(&self) -> Timestamp {
        self.instant
    }
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl From<Timestamp> for DateTime {
    fn from(instant: Timestamp) -> Self {
        DateTime {
            text: instant.to_string(),
            instant,
        }
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// An ISO 8601 duration such as `PT2H30M`.
#[derive(Debug, Clone)]
pub struct Duration {
    text: String,
    span: Span,
}

impl Duration {
    pub fn parse(text: &str) -> Result<Duration, String> {
        let span = SPAN_PARSER
            .parse_span(text)
            .map_err(|_| format!("{text:?} is not an ISO 8601 duration"))?;
        Ok(Duration {
            text: text.to_string(),
            span,
        })
    }
    pub fn span(&self) -> Span {
        self.span
    }
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Duration {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Duration {}
