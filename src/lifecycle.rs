//! Swap lifecycle events and hooks.

use std::time::Instant;

/// Lifecycle event emitted by an artifact handle.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The current descriptor was due and a newer version was searched for.
    Checked {
        /// Location of the checked descriptor.
        location: String,
        /// Whether a replacement was adopted.
        renewed: bool,
        /// Check time.
        at: Instant,
    },
    /// A newer version replaced the current one.
    Swapped {
        /// Location of the superseded descriptor.
        from: String,
        /// Location of the adopted descriptor.
        to: String,
        /// Number of swaps so far, including this one.
        count: u64,
        /// Swap time.
        at: Instant,
    },
    /// The current artifact was loaded.
    Loaded {
        /// Location of the loaded descriptor.
        location: String,
        /// Load time.
        at: Instant,
    },
    /// Loading the current artifact failed.
    LoadFailed {
        /// Location of the descriptor that failed to load.
        location: String,
        /// Failure time.
        at: Instant,
    },
    /// Artifacts loaded from a descriptor's directory were unloaded.
    Unloaded {
        /// Location of the unloaded descriptor.
        location: String,
        /// Number of registry entries removed.
        removed: usize,
        /// Unload time.
        at: Instant,
    },
}

impl LifecycleEvent {
    /// Get the location the event is about. For swaps this is the adopted one.
    pub fn location(&self) -> &str {
        match self {
            Self::Checked { location, .. } => location,
            Self::Swapped { to, .. } => to,
            Self::Loaded { location, .. } => location,
            Self::LoadFailed { location, .. } => location,
            Self::Unloaded { location, .. } => location,
        }
    }

    /// Get the event timestamp.
    pub fn timestamp(&self) -> Instant {
        match self {
            Self::Checked { at, .. } => *at,
            Self::Swapped { at, .. } => *at,
            Self::Loaded { at, .. } => *at,
            Self::LoadFailed { at, .. } => *at,
            Self::Unloaded { at, .. } => *at,
        }
    }

    /// Get the event name.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Checked { .. } => "checked",
            Self::Swapped { .. } => "swapped",
            Self::Loaded { .. } => "loaded",
            Self::LoadFailed { .. } => "load-failed",
            Self::Unloaded { .. } => "unloaded",
        }
    }
}

/// Hooks for lifecycle events.
pub struct LifecycleHooks {
    handlers: Vec<Box<dyn Fn(&LifecycleEvent) + Send + Sync>>,
}

impl LifecycleHooks {
    /// Create new lifecycle hooks.
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Add a lifecycle event handler.
    pub fn on_event<F>(&mut self, handler: F)
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Get the number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handler is installed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Emit a lifecycle event.
    pub fn emit(&self, event: LifecycleEvent) {
        for handler in &self.handlers {
            handler(&event);
        }
    }

    /// Emit a checked event.
    pub fn emit_checked(&self, location: &str, renewed: bool) {
        self.emit(LifecycleEvent::Checked {
            location: location.to_string(),
            renewed,
            at: Instant::now(),
        });
    }

    /// Emit a swapped event.
    pub fn emit_swapped(&self, from: &str, to: &str, count: u64) {
        self.emit(LifecycleEvent::Swapped {
            from: from.to_string(),
            to: to.to_string(),
            count,
            at: Instant::now(),
        });
    }

    /// Emit a loaded event.
    pub fn emit_loaded(&self, location: &str) {
        self.emit(LifecycleEvent::Loaded {
            location: location.to_string(),
            at: Instant::now(),
        });
    }

    /// Emit a load-failed event.
    pub fn emit_load_failed(&self, location: &str) {
        self.emit(LifecycleEvent::LoadFailed {
            location: location.to_string(),
            at: Instant::now(),
        });
    }

    /// Emit an unloaded event.
    pub fn emit_unloaded(&self, location: &str, removed: usize) {
        self.emit(LifecycleEvent::Unloaded {
            location: location.to_string(),
            removed,
            at: Instant::now(),
        });
    }
}

impl Default for LifecycleHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("handler_count", &self.handlers.len())
            .finish()
    }
}
