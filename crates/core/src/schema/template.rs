//! `{{ field }}` substitution

use std::collections::BTreeMap;

use crate::error::{Error, Result};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Replace every `{{ field }}` in `source` with its value from `fields`
pub fn render_template(template: &str, source: &str, fields: &BTreeMap<&str, String>) -> Result<String> {
    let error = |message: String| Error::SchemaRender {
        template: template.to_string(),
        message,
    };

    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else {
            let line = source[..source.len() - rest.len() + start].matches('\n').count() + 1;
            return Err(error(format!("unterminated placeholder on line {}", line)));
        };
        let field = after[..end].trim();
        match fields.get(field) {
            Some(value) => out.push_str(value),
            None => return Err(error(format!("unknown field {:?}", field))),
        }
        rest = &after[end + CLOSE.len()..];
    }
    out.push_str(rest);
    Ok(out)
}
