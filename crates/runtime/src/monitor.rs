//! Variable monitoring hook.
//!
//! The live-monitoring surface the editor shows (variable watch tiles) is
//! reached through an injected observer rather than any ambient global; the
//! core never touches process-wide state.

/// Receives variable updates from running scripts.
pub trait VariableSink {
    fn variable_changed(&mut self, name: &str, value: f64);
}

/// Default sink: reports variable updates on the debug log.
#[derive(Debug, Default)]
pub struct LogSink;

impl VariableSink for LogSink {
    fn variable_changed(&mut self, name: &str, value: f64) {
        log::debug!("variable {name} = {value}");
    }
}
