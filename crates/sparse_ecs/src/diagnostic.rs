//! Debug diagnostics. Every report goes to the `log` facade at debug level. While debug mode is
//! on, it is also forwarded to the injected [`DiagnosticSink`], if any.

use std::{cell::RefCell, fmt, panic::{self, AssertUnwindSafe}};

/// Receives `(context, message)` pairs, e.g. `("entity_destroy", "entity 3v1 already destroyed")`.
pub trait DiagnosticSink {
    fn report(&mut self, context: &str, message: &str);
}

impl<F: FnMut(&str, &str)> DiagnosticSink for F {
    #[inline]
    fn report(&mut self, context: &str, message: &str) {
        self(context, message)
    }
}

#[derive(Default)]
pub struct Diagnostics {
    enabled: bool,
    sink: RefCell<Option<Box<dyn DiagnosticSink>>>,
}

impl Diagnostics {
    #[inline]
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            sink: RefCell::new(None),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled
    }

    #[inline]
    pub fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        *self.sink.get_mut() = Some(sink)
    }

    /// A panicking sink is caught and logged, the caller never notices.
    pub fn report(&self, context: &str, message: fmt::Arguments<'_>) {
        log::debug!(target: "sparse_ecs", "{context}: {message}");

        if !self.enabled {
            return;
        }
        let Ok(mut guard) = self.sink.try_borrow_mut() else {
            return;
        };
        let Some(sink) = guard.as_mut() else {
            return;
        };

        let message = message.to_string();
        let result = panic::catch_unwind(AssertUnwindSafe(|| sink.report(context, &message)));
        if result.is_err() {
            log::warn!(target: "sparse_ecs", "diagnostic sink panicked while reporting `{context}`");
        }
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("enabled", &self.enabled)
            .field("sink", &self.sink.borrow().is_some())
            .finish()
    }
}
