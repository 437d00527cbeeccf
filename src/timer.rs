//! Strategies deciding when a descriptor is due for a freshness check.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::descriptor::Descriptor;

/// Decides whether a descriptor is due for a freshness check.
///
/// A timer that answers `true` must also mark the descriptor as
/// check-pending (see [`Descriptor::mark_check_pending`]).
pub trait AgeTimer: Send + Sync {
    /// Tentatively retire the descriptor if it is due for a check.
    fn retire(&self, descriptor: &mut Descriptor) -> bool;
}

/// Retires descriptors once they reach a maximum age.
///
/// Age is measured from [`Descriptor::created_at`]. A negative maximum age
/// makes every descriptor due immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxAge {
    max_age_secs: f64,
}

impl MaxAge {
    /// Two hours.
    pub const TWO_HOURS: MaxAge = MaxAge {
        max_age_secs: 7200.0,
    };

    /// Create a timer from a duration.
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age_secs: max_age.as_secs_f64(),
        }
    }

    /// Create a timer from seconds. Negative values mean "always due".
    pub fn from_secs_f64(max_age_secs: f64) -> Self {
        Self { max_age_secs }
    }

    /// Create a timer for which every descriptor is always due.
    pub fn always() -> Self {
        Self { max_age_secs: -1.0 }
    }

    /// Get the maximum age in seconds.
    pub fn max_age_secs(&self) -> f64 {
        self.max_age_secs
    }

    /// Get the age of a descriptor at `now`.
    pub fn age_at(descriptor: &Descriptor, now: SystemTime) -> Duration {
        now.duration_since(descriptor.created_at())
            .unwrap_or(Duration::ZERO)
    }

    /// Get the age of a descriptor.
    pub fn age(descriptor: &Descriptor) -> Duration {
        Self::age_at(descriptor, SystemTime::now())
    }

    /// Check whether a descriptor is due at `now` without touching it.
    pub fn is_due_at(&self, descriptor: &Descriptor, now: SystemTime) -> bool {
        Self::age_at(descriptor, now).as_secs_f64() >= self.max_age_secs
    }

    /// Retire the descriptor as of `now`.
    pub fn retire_at(&self, descriptor: &mut Descriptor, now: SystemTime) -> bool {
        if self.is_due_at(descriptor, now) {
            descriptor.mark_check_pending();
            return true;
        }
        false
    }
}

impl Default for MaxAge {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl AgeTimer for MaxAge {
    fn retire(&self, descriptor: &mut Descriptor) -> bool {
        self.retire_at(descriptor, SystemTime::now())
    }
}

impl<T: AgeTimer + ?Sized> AgeTimer for Arc<T> {
    fn retire(&self, descriptor: &mut Descriptor) -> bool {
        (**self).retire(descriptor)
    }
}
