//! BCP 47 language tags (RFC 5646), checked against the IANA language subtag
//! registry.

use language_tags::LanguageTag;

/// Check that `tag` is well-formed and that every language, script, region
/// and variant subtag in it is registered.
pub fn check_language_tag(tag: &str) -> Result<(), String> {
    let parsed = LanguageTag::parse(tag).map_err(|e| format!("{tag:?}: {e}"))?;
    parsed.validate().map_err(|e| format!("{tag:?}: {e}"))
}
