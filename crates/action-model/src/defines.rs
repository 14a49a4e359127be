//! `@Define` substitution tables.
//!
//! A `@Define` declaration carries a list of `key=value` pairs applied to
//! every expression of the generated class. Keys prefixed with `$` are
//! regular-expression keys; all others substitute literally.

use action_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use indexmap::IndexMap;
use regex::Regex;
use source_span::Span;

/// One raw `key=value` entry with its source location.
#[derive(Debug, Clone)]
pub struct DefineEntry {
    /// The entry text exactly as written.
    pub text: String,
    /// Where the entry appears.
    pub span: Span,
}

/// Literal and regex substitution tables for one generated class.
#[derive(Debug, Default)]
pub struct Defines {
    literal: IndexMap<String, String>,
    regex: IndexMap<String, String>,
    compiled: Vec<(Regex, String)>,
}

impl Defines {
    /// Parses a list of `key=value` entries.
    ///
    /// Splits each entry on the first `=`; entries with no `=` and regex keys
    /// that fail to compile are reported to `sink` and skipped.
    pub fn parse(entries: &[DefineEntry], sink: &mut DiagnosticSink) -> Self {
        let mut defines = Defines::default();

        for entry in entries {
            let Some((key, value)) = entry.text.split_once('=') else {
                sink.report(Diagnostic::new(
                    DiagnosticCode::MalformedDefine,
                    format!("define entry '{}' is missing '='", entry.text),
                    entry.span,
                ));
                continue;
            };

            if let Some(pattern) = key.strip_prefix('$') {
                match Regex::new(pattern) {
                    Ok(re) => {
                        defines
                            .regex
                            .insert(pattern.to_string(), value.to_string());
                        defines.compiled.push((re, value.to_string()));
                    }
                    Err(e) => {
                        sink.report(Diagnostic::new(
                            DiagnosticCode::MalformedDefine,
                            format!("define key '{}' is not a valid pattern: {}", pattern, e),
                            entry.span,
                        ));
                    }
                }
            } else {
                defines.literal.insert(key.to_string(), value.to_string());
            }
        }

        defines
    }

    /// Applies literal substitutions, then regex substitutions, to `text`.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (key, value) in &self.literal {
            out = out.replace(key.as_str(), value);
        }
        for (re, value) in &self.compiled {
            out = re.replace_all(&out, value.as_str()).into_owned();
        }
        out
    }

    /// Looks up a literal define.
    pub fn literal(&self, key: &str) -> Option<&str> {
        self.literal.get(key).map(String::as_str)
    }

    /// Looks up a regex define by its pattern text.
    pub fn regex(&self, pattern: &str) -> Option<&str> {
        self.regex.get(pattern).map(String::as_str)
    }

    /// Returns true if no entries were parsed.
    pub fn is_empty(&self) -> bool {
        self.literal.is_empty() && self.regex.is_empty()
    }
}
