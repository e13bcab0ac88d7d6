//! Default template file loading and placeholder substitution.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Read a plain-text template. Returns an empty string if the file is
/// missing or unreadable.
pub fn load_template(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("template file {} not found", path.display());
            String::new()
        }
        Err(e) => {
            warn!("failed to read template file {}: {e}", path.display());
            String::new()
        }
    }
}

/// Replace each `{name}` in `template` with its value in one pass, so
/// substituted values are never scanned again. Unknown placeholders are
/// left as-is.
pub fn render_placeholders(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some((before, after)) = rest.split_once('{') {
        out.push_str(before);
        let known = after.split_once('}').and_then(|(name, tail)| {
            vars.iter()
                .find(|(n, _)| *n == name)
                .map(|(_, value)| (*value, tail))
        });
        match known {
            Some((value, tail)) => {
                out.push_str(value);
                rest = tail;
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
