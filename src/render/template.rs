//! `%(key)s` template substitution.
//!
//! `%%` produces a literal `%`; any other `%` not opening a key is copied
//! through. Substituted values are never rescanned.

use crate::error::{Error, Result, TemplateFault};
use indexmap::IndexMap;

/// Substitution source: ordered key → value map.
pub type Substitutions = IndexMap<String, String>;

/// What to do with a `%(key)s` whose key has no substitution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKey {
    /// Leave the placeholder in the output untouched.
    #[default]
    Passthrough,
    Error,
}

/// Expand `template` against `subs`.
pub fn substitute(template: &str, subs: &Substitutions, missing: MissingKey) -> Result<String> {
    let fail = |fault: TemplateFault| Error::Template {
        fault,
        template: template.to_string(),
        substitutions: format!("{:?}", subs),
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('%') {
            out.push('%');
            rest = tail;
            continue;
        }

        let Some(inner) = after.strip_prefix('(') else {
            out.push('%');
            rest = after;
            continue;
        };

        let offset = template.len() - rest.len() + pos;
        let close = inner
            .find(')')
            .ok_or_else(|| fail(TemplateFault::Unterminated { offset }))?;
        let key = &inner[..close];
        let tail = &inner[close + 1..];
        let conversion = tail
            .chars()
            .next()
            .ok_or_else(|| fail(TemplateFault::Unterminated { offset }))?;
        if conversion != 's' {
            return Err(fail(TemplateFault::UnsupportedConversion {
                key: key.to_string(),
                conversion,
            }));
        }

        match subs.get(key) {
            Some(value) => out.push_str(value),
            None if missing == MissingKey::Passthrough => {
                out.push_str("%(");
                out.push_str(key);
                out.push_str(")s");
            }
            None => return Err(fail(TemplateFault::MissingKey(key.to_string()))),
        }
        rest = &tail[conversion.len_utf8()..];
    }
    out.push_str(rest);
    Ok(out)
}
