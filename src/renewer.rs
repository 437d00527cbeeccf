//! Combines a locator and a timer into a replace-or-keep decision.

use crate::descriptor::Descriptor;
use crate::error::Result;
use crate::locator::VersionLocator;
use crate::timer::AgeTimer;

/// Outcome of one renewal attempt.
#[derive(Debug)]
pub enum RenewOutcome {
    /// The timer did not consider the descriptor due; nothing was searched.
    NotDue,
    /// The descriptor was checked and stays current.
    Kept,
    /// A newer version was found; the old descriptor is superseded.
    Renewed(Descriptor),
}

impl RenewOutcome {
    /// Check if a search for a newer version ran.
    pub fn was_checked(&self) -> bool {
        !matches!(self, Self::NotDue)
    }

    /// Take the renewed descriptor, if any.
    pub fn into_renewed(self) -> Option<Descriptor> {
        match self {
            Self::Renewed(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// Run one renewal attempt and report what happened.
///
/// Only a constructed replacement supersedes `descriptor`. A descriptor that
/// was due but had no replacement is returned to `Current` with its age
/// baseline unchanged, so it is checked again on the next call.
pub fn try_renew(
    descriptor: &mut Descriptor,
    locator: &dyn VersionLocator,
    timer: &dyn AgeTimer,
) -> Result<RenewOutcome> {
    if !timer.retire(descriptor) {
        return Ok(RenewOutcome::NotDue);
    }

    let location = match locator.search(descriptor) {
        Ok(Some(location)) => location,
        Ok(None) => {
            tracing::debug!("No newer version of {}", descriptor.location());
            descriptor.rescind_check();
            return Ok(RenewOutcome::Kept);
        }
        Err(e) => {
            descriptor.rescind_check();
            return Err(e);
        }
    };

    let renewed = match locator.construct(&location) {
        Ok(Some(renewed)) => renewed,
        Ok(None) => {
            tracing::debug!("Candidate {} could not be described", location);
            descriptor.rescind_check();
            return Ok(RenewOutcome::Kept);
        }
        Err(e) => {
            descriptor.rescind_check();
            return Err(e);
        }
    };

    descriptor.supersede();
    tracing::debug!(
        "Renewed {} -> {}",
        descriptor.location(),
        renewed.location()
    );
    Ok(RenewOutcome::Renewed(renewed))
}

/// Possibly replace `descriptor` with a newer version.
///
/// Returns the new descriptor when one was found and could be constructed;
/// `descriptor` is then superseded. In every other case `descriptor` stays
/// current.
pub fn renew(
    descriptor: &mut Descriptor,
    locator: &dyn VersionLocator,
    timer: &dyn AgeTimer,
) -> Result<Option<Descriptor>> {
    try_renew(descriptor, locator, timer).map(RenewOutcome::into_renewed)
}

/// Owns a locator and a timer and applies [`renew`] with them.
pub struct Renewer {
    locator: Box<dyn VersionLocator>,
    timer: Box<dyn AgeTimer>,
}

impl Renewer {
    /// Create a renewer from its strategies.
    pub fn new(locator: impl VersionLocator + 'static, timer: impl AgeTimer + 'static) -> Self {
        Self {
            locator: Box::new(locator),
            timer: Box::new(timer),
        }
    }

    /// Create a renewer from boxed strategies.
    pub fn from_boxed(locator: Box<dyn VersionLocator>, timer: Box<dyn AgeTimer>) -> Self {
        Self { locator, timer }
    }

    /// Get the locator.
    pub fn locator(&self) -> &dyn VersionLocator {
        self.locator.as_ref()
    }

    /// Get the timer.
    pub fn timer(&self) -> &dyn AgeTimer {
        self.timer.as_ref()
    }

    /// Run one renewal attempt and report what happened.
    pub fn check(&self, descriptor: &mut Descriptor) -> Result<RenewOutcome> {
        try_renew(descriptor, self.locator.as_ref(), self.timer.as_ref())
    }

    /// Possibly replace `descriptor` with a newer version.
    pub fn renew(&self, descriptor: &mut Descriptor) -> Result<Option<Descriptor>> {
        renew(descriptor, self.locator.as_ref(), self.timer.as_ref())
    }
}

impl std::fmt::Debug for Renewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renewer").finish_non_exhaustive()
    }
}
