use std::fmt;

use nih_plug::{nih_log, nih_trace, nih_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Trace,
    Info,
    Warning,
}

/// Where the cascade engine sends its diagnostics. Reporting never changes what the engine does.
pub trait DiagnosticSink {
    fn report(&mut self, severity: Severity, message: fmt::Arguments<'_>);
}

impl DiagnosticSink for () {
    fn report(&mut self, _severity: Severity, _message: fmt::Arguments<'_>) {}
}

/// Forwards to nih_plug's logger, which is allowed to allocate on the audio thread.
#[derive(Default)]
pub struct NihLogSink;

impl DiagnosticSink for NihLogSink {
    fn report(&mut self, severity: Severity, message: fmt::Arguments<'_>) {
        match severity {
            Severity::Trace => nih_trace!("{}", message),
            Severity::Info => nih_log!("{}", message),
            Severity::Warning => nih_warn!("{}", message),
        }
    }
}
