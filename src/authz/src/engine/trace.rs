//! Explain-mode event collection

use std::sync::Arc;

use serde_json::Value;

use acx_core::{Clock, DecisionTrace, TraceEvent, TraceEventType};

/// Ordered events for one evaluation; ids are `<traceId>:<n>` starting at 1
pub struct TraceCollector {
    trace_id: String,
    events: Vec<TraceEvent>,
    clock: Arc<dyn Clock>,
}

impl TraceCollector {
    pub fn new(trace_id: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            trace_id: trace_id.into(),
            events: Vec::new(),
            clock,
        }
    }

    pub fn record(
        &mut self,
        event_type: TraceEventType,
        message: impl Into<String>,
        data: Option<Value>,
    ) {
        let event = TraceEvent {
            id: format!("{}:{}", self.trace_id, self.events.len() + 1),
            at: self.clock.now(),
            event_type,
            message: message.into(),
            data,
        };
        self.events.push(event);
    }

    pub fn to_trace(&self) -> DecisionTrace {
        DecisionTrace {
            trace_id: self.trace_id.clone(),
            events: self.events.clone(),
        }
    }
}

/// Record into an optional collector
pub(crate) fn record(
    collector: &mut Option<TraceCollector>,
    event_type: TraceEventType,
    message: impl FnOnce() -> String,
    data: impl FnOnce() -> Option<Value>,
) {
    if let Some(collector) = collector.as_mut() {
        collector.record(event_type, message(), data());
    }
}
