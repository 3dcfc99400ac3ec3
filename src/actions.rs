//! Action registry: patterns may carry an opaque action token, interpreted
//! by whatever external actuator the embedding application wires in. The
//! core never hardcodes what an action does.

use crate::orchestrator::Segmentation;

/// Implemented by the host application to react to a matched pattern's
/// action token. `ndbscu` never interprets the string itself.
pub trait ActionSink {
    fn dispatch(&self, action: &str, context: &Segmentation);
}

/// An `ActionSink` that records every dispatch, useful for tests and for
/// CLI `--trace-actions` output.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub calls: std::sync::Mutex<Vec<(String, usize, usize)>>,
}

impl ActionSink for RecordingSink {
    fn dispatch(&self, action: &str, context: &Segmentation) {
        self.calls.lock().unwrap().push((action.to_string(), context.begin, context.end));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_captures_dispatch_calls() {
        let sink = RecordingSink::default();
        let segmentation = Segmentation {
            pattern: 1,
            begin: 1,
            end: 4,
            display: "ACT_TIME".to_string(),
            action: Some("1".to_string()),
        };
        sink.dispatch("1", &segmentation);
        assert_eq!(sink.calls.lock().unwrap().len(), 1);
    }
}
