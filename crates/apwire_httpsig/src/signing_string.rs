use anyhow::{Context, Result, bail};
use http::{HeaderMap, Method};

use crate::SignatureParams;

pub const REQUEST_TARGET: &str = "(request-target)";

/// Build the text that gets signed.
///
/// One `name: value` line per entry of `names`, in that order, joined by `\n`
/// without a trailing newline. `(request-target)` expands to the lowercased
/// method and the path (with query); `(created)` and `(expires)` come from the
/// signature parameters. Repeated header fields are joined with `, `.
pub fn signing_string(
    names: &[String],
    method: &Method,
    path: &str,
    headers: &HeaderMap,
    params: Option<&SignatureParams>,
) -> Result<String> {
    let mut lines = Vec::with_capacity(names.len());
    for name in names {
        let value = match name.as_str() {
            REQUEST_TARGET => format!("{} {path}", method.as_str().to_ascii_lowercase()),
            "(created)" => params
                .and_then(|p| p.created)
                .context("(created) is signed but the created parameter is missing")?
                .to_string(),
            "(expires)" => params
                .and_then(|p| p.expires)
                .context("(expires) is signed but the expires parameter is missing")?
                .to_string(),
            field => {
                let mut values = headers.get_all(field).iter().peekable();
                if values.peek().is_none() {
                    bail!("signed header {field} is absent from the request");
                }
                let values = values
                    .map(|v| v.to_str().map(str::trim))
                    .collect::<Result<Vec<_>, _>>()
                    .with_context(|| format!("signed header {field} is not visible ASCII"))?;
                values.join(", ")
            }
        };
        lines.push(format!("{name}: {value}"));
    }
    Ok(lines.join("\n"))
}
