//! Field level checks shared by every document kind.

mod language;
mod media_type;
mod time;

use url::Url;

pub use language::check_language_tag;
pub use media_type::MediaType;
pub use time::{DateTime, Duration};

const UNITS: [&str; 6] = ["cm", "feet", "inches", "km", "m", "miles"];

pub(crate) fn absolute_uri(value: &str) -> Result<(), String> {
    match Url::parse(value) {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("{value:?} is not an absolute URI ({e})")),
    }
}

/// Link relations are single tokens, no whitespace or commas.
pub(crate) fn rel_token(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("empty link relation".to_string());
    }
    if value.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(format!("{value:?} is not a single link relation"));
    }
    Ok(())
}

pub(crate) fn units(value: &str) -> Result<(), String> {
    if UNITS.contains(&value) || Url::parse(value).is_ok() {
        return Ok(());
    }
    Err(format!(
        "{value:?} is neither one of {} nor a URI",
        UNITS.join(", ")
    ))
}

pub(crate) fn in_range(value: f64, min: Option<f64>, max: Option<f64>) -> Result<(), String> {
    match (min, max) {
        (Some(min), Some(max)) if !(min..=max).contains(&value) => {
            Err(format!("{value} is outside [{min}, {max}]"))
        }
        (Some(min), None) if value < min => Err(format!("{value} is below {min}")),
        (None, Some(max)) if value > max => Err(format!("{value} is above {max}")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{absolute_uri, in_range, rel_token, units};

    #[test]
    fn uris() {
        assert!(absolute_uri("https://a.example/users/alice").is_ok());
        assert!(absolute_uri("acct:alice@a.example").is_ok());
        assert!(absolute_uri("/users/alice").is_err());
        assert!(absolute_uri("alice").is_err());
    }

    #[test]
    fn rel_tokens() {
        assert!(rel_token("canonical").is_ok());
        assert!(rel_token("preview").is_ok());
        assert!(rel_token("can onical").is_err());
        assert!(rel_token("a,b").is_err());
        assert!(rel_token("").is_err());
    }

    #[test]
    fn place_units() {
        assert!(units("m").is_ok());
        assert!(units("miles").is_ok());
        assert!(units("http://example.org/units/furlong").is_ok());
        assert!(units("meters").is_err());
    }

    #[test]
    fn ranges() {
        assert!(in_range(100.0, Some(0.0), Some(100.0)).is_ok());
        assert!(in_range(100.5, Some(0.0), Some(100.0)).is_err());
        assert!(in_range(-0.1, Some(0.0), None).is_err());
        assert!(in_range(-1e9, None, None).is_ok());
    }
}
