// ── Event router ──
//
// Decodes push frames and fans them out to the handlers registered for
// each tag. Unknown tags and malformed payloads never reach a handler and
// never affect the connection.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use strmdeck_api::{EventKind, PushEvent};

type Handler = Box<dyn Fn(&PushEvent) + Send + Sync>;

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Delivered to `handlers` handlers, in registration order.
    Handled { kind: EventKind, handlers: usize },
    /// Recognized tag with nobody listening.
    NoHandler(EventKind),
    /// Unrecognized tag; dropped.
    Ignored(String),
    /// Undecodable frame; dropped.
    Malformed(String),
}

#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `kind`. Handlers for one kind run in
    /// registration order.
    pub fn on<F>(&mut self, kind: EventKind, handler: F) -> &mut Self
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
        self
    }

    /// Decode a text frame and dispatch it.
    pub fn dispatch_text(&self, text: &str) -> Dispatch {
        match PushEvent::parse(text) {
            Ok(event) => self.dispatch(&event),
            Err(e) => {
                warn!(error = %e, "dropping malformed push payload");
                Dispatch::Malformed(e.to_string())
            }
        }
    }

    pub fn dispatch(&self, event: &PushEvent) -> Dispatch {
        let Some(kind) = event.kind() else {
            debug!(tag = event.tag(), "ignoring unknown push event");
            return Dispatch::Ignored(event.tag().to_owned());
        };

        let handlers = self.handlers.get(&kind).map_or(&[][..], Vec::as_slice);
        if handlers.is_empty() {
            trace!(kind = %kind, "no handler registered");
            return Dispatch::NoHandler(kind);
        }
        for handler in handlers {
            handler(event);
        }
        Dispatch::Handled {
            kind,
            handlers: handlers.len(),
        }
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(|k| k.as_ref()).collect();
        kinds.sort_unstable();
        f.debug_struct("EventRouter").field("kinds", &kinds).finish()
    }
}
