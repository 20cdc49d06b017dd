use codestore_api::{Diagnostic, DiagnosticListener, Severity};
use tracing::{error, info};

/// Collects backend diagnostics, logging each as it arrives.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d.severity, Severity::Warning | Severity::MandatoryWarning))
            .count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl DiagnosticListener for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            error!("{}", diagnostic);
        } else {
            info!("{}", diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }
}
