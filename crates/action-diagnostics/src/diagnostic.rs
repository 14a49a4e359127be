//! Diagnostic types.

use source_span::Span;

/// A diagnostic message tied to a source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
    /// The location in the annotated source.
    pub span: Span,
    /// Optional suggestions for fixing the issue.
    pub suggestions: Vec<Suggestion>,
}

impl Diagnostic {
    /// Creates a new diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            span,
            suggestions: Vec::new(),
        }
    }

    /// Adds a suggestion to this diagnostic.
    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A hint or suggestion.
    Hint,
    /// A warning that doesn't block generation.
    Warning,
    /// An error; the element's generated output is withheld.
    Error,
}

/// A suggested fix.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// A description of the fix.
    pub message: String,
    /// The replacement text.
    pub replacement: String,
    /// The span to replace.
    pub span: Span,
}

/// Diagnostic codes for all generation-time checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// `malformed-define`: a `@Define` entry with no `=` separator.
    MalformedDefine,
    /// `unknown-action`: a `$Name(...)` call with no registered holder.
    UnknownAction,
    /// `no-matching-overload`: call arguments match no `init`/`build` overload.
    NoMatchingOverload,
    /// `invalid-event-target`: an event annotation on something that is
    /// neither an executable element nor a recognized Action field.
    InvalidEventTarget,
    /// `dangling-inject`: `$inject`/`$injectItem` not followed by a string
    /// literal to reattach.
    DanglingInject,
    /// `duplicate-listener`: two handlers tried to create distinct listener
    /// blocks for one view field.
    DuplicateListener,
    /// `parse-error`: the source scanner could not read an element.
    ParseError,
}

impl DiagnosticCode {
    /// Returns the default severity for this code.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::MalformedDefine
            | DiagnosticCode::UnknownAction
            | DiagnosticCode::NoMatchingOverload
            | DiagnosticCode::InvalidEventTarget
            | DiagnosticCode::DanglingInject
            | DiagnosticCode::ParseError => Severity::Error,

            DiagnosticCode::DuplicateListener => Severity::Warning,
        }
    }

    /// Returns the diagnostic code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MalformedDefine => "malformed-define",
            DiagnosticCode::UnknownAction => "unknown-action",
            DiagnosticCode::NoMatchingOverload => "no-matching-overload",
            DiagnosticCode::InvalidEventTarget => "invalid-event-target",
            DiagnosticCode::DanglingInject => "dangling-inject",
            DiagnosticCode::DuplicateListener => "duplicate-listener",
            DiagnosticCode::ParseError => "parse-error",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
