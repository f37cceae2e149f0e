use event_emitter_rs::EventEmitter;

use crate::context::{ChangeState, TrackedChange};

/// Publishes saved changes to registered listeners.
///
/// Each saved record fires `"{set}:{state}"` (for example `"Products:added"`)
/// with the record's JSON text as payload. Listeners run on the emitter's
/// threads; `emit_saved` waits for them before returning.
///
/// ```ignore
/// ctx.on("Products:modified", |record| println!("updated {}", record));
/// ```
pub(crate) struct ChangeEmitter {
    event_emitter: EventEmitter,
}

impl ChangeEmitter {
    pub fn new() -> Self {
        Self {
            event_emitter: EventEmitter::new(),
        }
    }

    pub fn on<F>(&mut self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.event_emitter.on(event, listener);
    }

    /// Emit one event per change. Call this after a successful save.
    pub fn emit_saved(&mut self, changes: &[TrackedChange]) {
        for change in changes {
            let event = event_name(&change.set, change.state);
            let handles = self.event_emitter.emit(&event, change.record.to_string());
            for handle in handles {
                if handle.join().is_err() {
                    tracing::warn!(event = %event, "change listener panicked");
                }
            }
        }
    }
}

impl Default for ChangeEmitter {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn event_name(set: &str, state: ChangeState) -> String {
    format!("{}:{}", set, state.as_str())
}
