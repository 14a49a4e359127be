//! Validation diagnostics for actiongen.
//!
//! Generation-time problems are reported against the originating source
//! element and never abort processing of other elements. This crate provides
//! the diagnostic type, its codes and severities, and the sink the generator
//! threads through validation and synthesis passes.

mod diagnostic;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Suggestion};

/// A collector for diagnostics produced while processing one source file.
///
/// Validation passes append here instead of failing; the orchestrator decides
/// afterwards whether errors were fatal to the file's generated output.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Returns true if any recorded diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Borrows the recorded diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consumes the sink, returning the recorded diagnostics.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source_span::Span;

    #[test]
    fn test_sink_collects_in_order() {
        let mut sink = DiagnosticSink::new();
        sink.report(Diagnostic::new(
            DiagnosticCode::MalformedDefine,
            "missing '='",
            Span::new(0u32, 4u32),
        ));
        sink.report(Diagnostic::new(
            DiagnosticCode::UnknownAction,
            "no holder named Toast",
            Span::new(10u32, 15u32),
        ));

        assert_eq!(sink.diagnostics().len(), 2);
        assert_eq!(sink.diagnostics()[0].code, DiagnosticCode::MalformedDefine);
        assert!(sink.has_errors());
    }
}
