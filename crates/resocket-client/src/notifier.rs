// Copyright (c) 2026 Roman Barinov <rbarinov@gmail.com>
// Licensed under the FSL-1.1-NC.

use resocket_core::{Event, EventKind};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, warn};

pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    HandlerPanicked,
    Traced,
    Dropped,
}

/// One handler slot per event kind. Setting a slot replaces its previous handler.
#[derive(Clone)]
pub struct Notifier {
    handlers: Arc<Mutex<HashMap<EventKind, EventHandler>>>,
    debug: bool,
}

impl Notifier {
    pub fn new(debug: bool) -> Self {
        Self {
            handlers: Arc::new(Mutex::new(HashMap::new())),
            debug,
        }
    }

    pub fn set(&self, kind: EventKind, handler: EventHandler) -> Option<EventHandler> {
        self.slots().insert(kind, handler)
    }

    pub fn clear(&self, kind: EventKind) -> bool {
        self.slots().remove(&kind).is_some()
    }

    pub fn clear_all(&self) {
        self.slots().clear();
    }

    pub fn emit(&self, event: &Event) -> Dispatch {
        let kind = event.kind();
        // Released before the call so a handler may re-register itself.
        let handler = self.slots().get(&kind).cloned();

        match handler {
            Some(handler) => match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => Dispatch::Handled,
                Err(panic) => {
                    error!("on{} handler panicked: {}", kind, panic_message(&*panic));
                    Dispatch::HandlerPanicked
                }
            },
            None if kind == EventKind::Error => {
                warn!("on{} not implemented: {}", kind, event.to_json());
                Dispatch::Traced
            }
            None if self.debug => {
                debug!("on{} not implemented: {}", kind, event.to_json());
                Dispatch::Traced
            }
            None => Dispatch::Dropped,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<EventKind, EventHandler>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
