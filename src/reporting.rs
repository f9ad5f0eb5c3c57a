//! # Warning channel
//!
//! Non-fatal conditions (a suspiciously distant scene match, a defaulted time of day, …)
//! are not errors: the pipeline keeps going with a usable result. They are reported
//! through an explicit [`WarningSink`] handed to each component instead of a
//! process-wide facility, so that tests can observe them deterministically.
//!
//! Two sinks are provided:
//!
//! - [`LogSink`] – forwards every warning to the [`log`] facade at `warn` level.
//!   The crate never installs a logger; the embedding application decides where
//!   records go.
//! - [`CollectingSink`] – keeps warnings in memory, in emission order.
//!
//! ```rust
//! use cloudcorr::reporting::{CollectingSink, Warning, WarningSink};
//! use cloudcorr::time::TimeOfDay;
//!
//! let sink = CollectingSink::default();
//! sink.warn(Warning::DefaultTimeOfDay { applied: TimeOfDay::noon(), count: 3 });
//! assert_eq!(sink.warnings().len(), 1);
//! ```
use std::fmt;
use std::sync::Mutex;

use hifitime::Epoch;

use crate::constants::Seconds;
use crate::time::{ObservationKey, TimeOfDay};

/// A non-fatal condition observed by one of the components.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The nearest candidate is further than the configured threshold from the target.
    LargeTimeDelta {
        target: Epoch,
        chosen: Epoch,
        delta_seconds: Seconds,
        handle: String,
    },
    /// No time of day was supplied; `applied` was used for `count` target(s).
    DefaultTimeOfDay { applied: TimeOfDay, count: usize },
    /// The archive returned several scenes for a day expected to hold a single one.
    MultipleCandidates { key: ObservationKey, count: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::LargeTimeDelta {
                target,
                chosen,
                delta_seconds,
                handle,
            } => write!(
                f,
                "nearest observation {handle} at {chosen} is {delta_seconds} s away from target {target}"
            ),
            Warning::DefaultTimeOfDay { applied, count } => write!(
                f,
                "no target time of day set, defaulting to {applied} for {count} target(s)"
            ),
            Warning::MultipleCandidates { key, count } => {
                write!(f, "{count} candidate scenes found for {key}, keeping the nearest")
            }
        }
    }
}

/// Receiver of [`Warning`]s.
///
/// Implementations must be shareable across threads since an orchestrator may process
/// several days concurrently.
pub trait WarningSink: Send + Sync {
    fn warn(&self, warning: Warning);
}

/// Sink forwarding warnings to [`log::warn!`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl WarningSink for LogSink {
    fn warn(&self, warning: Warning) {
        log::warn!("{warning}");
    }
}

/// Sink storing warnings in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    warnings: Mutex<Vec<Warning>>,
}

impl CollectingSink {
    /// Snapshot of the warnings received so far, in emission order.
    pub fn warnings(&self) -> Vec<Warning> {
        match self.warnings.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warnings().is_empty()
    }
}

impl WarningSink for CollectingSink {
    fn warn(&self, warning: Warning) {
        match self.warnings.lock() {
            Ok(mut guard) => guard.push(warning),
            Err(poisoned) => poisoned.into_inner().push(warning),
        }
    }
}
