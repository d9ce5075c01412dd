//! Tracing layer that streams user-facing activity events to the UI.
//!
//! Events logged on the [`ACTIVITY_TARGET`] target are captured and
//! forwarded over a tokio channel; the terminal front-end renders them in
//! its status log.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Target that marks an event as user-facing activity.
pub const ACTIVITY_TARGET: &str = "mtchat::activity";

/// Event data sent to the UI.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityEvent {
    /// Log level (INFO, DEBUG, WARN, ERROR)
    pub level: String,
    /// Human-readable message
    pub message: String,
    /// Structured fields from the event
    pub fields: HashMap<String, Value>,
    /// Timestamp
    pub timestamp: String,
}

/// A tracing layer that sends activity events to a channel.
pub struct ActivityLayer {
    sender: mpsc::UnboundedSender<ActivityEvent>,
}

impl ActivityLayer {
    /// Creates the layer and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ActivityEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl<S> Layer<S> for ActivityLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != ACTIVITY_TARGET {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let message = fields
            .remove("message")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let activity = ActivityEvent {
            level: event.metadata().level().to_string(),
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means the UI has shut down.
        let _ = self.sender.send(activity);
    }
}

/// Field visitor that extracts tracing event fields into a HashMap
struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_only_activity_target_is_forwarded() {
        let (layer, mut rx) = ActivityLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("internal detail");
            tracing::info!(target: "mtchat::activity", entity = "e1", "Loaded entity");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.message, "Loaded entity");
        assert_eq!(event.level, "INFO");
        assert_eq!(event.fields["entity"], "e1");
        assert!(rx.try_recv().is_err());
    }
}
