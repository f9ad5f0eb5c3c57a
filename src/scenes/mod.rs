//! # Nearest scene resolution
//!
//! Archives are sampled irregularly: a station may hold several images for one day, at
//! arbitrary times, and a platform scene is acquired whenever the orbit passes over.
//! This module picks, for a [`TargetInstant`] (or any [`Epoch`]), the candidate closest
//! in time.
//!
//! ## Rules
//!
//! - The whole candidate list is scanned; no ordering by time is assumed.
//! - Ties keep the **first** candidate in input order.
//! - An empty list fails with [`CloudCorrError::NotFound`].
//! - A winner further than the threshold (default [`LARGE_DELTA_SECONDS`]) is still
//!   returned, and a [`Warning::LargeTimeDelta`] is sent to the resolver's sink so the
//!   match can be audited later.
//!
//! ```rust
//! use cloudcorr::reporting::CollectingSink;
//! use cloudcorr::scenes::{CandidateObservation, NearestSceneResolver};
//! use cloudcorr::time::{ObservationKey, TargetInstant, TimeOfDay};
//! use hifitime::Unit;
//!
//! let sink = CollectingSink::default();
//! let key = ObservationKey::new(2020, 100).unwrap();
//! let target = TargetInstant::at(key, TimeOfDay::new(10, 0).unwrap());
//! let t = target.epoch();
//!
//! let candidates = vec![
//!     CandidateObservation::new(t + Unit::Second * 50_i64, "a"),
//!     CandidateObservation::new(t - Unit::Second * 10_i64, "b"),
//! ];
//!
//! let resolver = NearestSceneResolver::new(&sink);
//! let matched = resolver.resolve(&target, &candidates).unwrap();
//! assert_eq!(matched.chosen.source_handle, "b");
//! assert_eq!(matched.delta_seconds, 10);
//! ```
use std::fmt::Debug;

use hifitime::{Duration, Epoch};

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{Seconds, LARGE_DELTA_SECONDS};
use crate::reporting::{Warning, WarningSink};
use crate::time::TargetInstant;

/// One file (or any other opaque handle) found in an archive, with its acquisition time.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateObservation<H> {
    pub timestamp: Epoch,
    pub source_handle: H,
}

impl<H> CandidateObservation<H> {
    pub fn new(timestamp: Epoch, source_handle: H) -> Self {
        CandidateObservation {
            timestamp,
            source_handle,
        }
    }
}

/// Outcome of a resolution.
///
/// `delta_seconds` is `|chosen.timestamp - target|` truncated to whole seconds, the
/// minimum over every candidate considered.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a, H> {
    pub chosen: &'a CandidateObservation<H>,
    pub delta_seconds: Seconds,
    pub target: TargetInstant,
}

/// Running minimum over a scan of candidates.
///
/// The best candidate is only replaced when a strictly smaller delta shows up, which
/// yields first-seen tie-breaking.
#[derive(Debug)]
pub(crate) struct NearestTracker<'a, H> {
    target: Epoch,
    best: Option<(&'a CandidateObservation<H>, Duration)>,
}

impl<'a, H> NearestTracker<'a, H> {
    pub(crate) fn new(target: Epoch) -> Self {
        NearestTracker { target, best: None }
    }

    pub(crate) fn offer(&mut self, candidate: &'a CandidateObservation<H>) {
        let delta = (candidate.timestamp - self.target).abs();
        match self.best {
            Some((_, best_delta)) if delta >= best_delta => {}
            _ => self.best = Some((candidate, delta)),
        }
    }

    pub(crate) fn finish(self) -> Option<(&'a CandidateObservation<H>, Duration)> {
        self.best
    }
}

/// Whole seconds of a duration, truncated.
fn whole_seconds(duration: Duration) -> Seconds {
    duration.to_seconds().trunc() as Seconds
}

/// Picks the candidate nearest in time to a target.
pub struct NearestSceneResolver<'s> {
    sink: &'s dyn WarningSink,
    threshold_seconds: Seconds,
}

impl<'s> NearestSceneResolver<'s> {
    /// Resolver using the default [`LARGE_DELTA_SECONDS`] warning threshold.
    pub fn new(sink: &'s dyn WarningSink) -> Self {
        Self::with_threshold(sink, LARGE_DELTA_SECONDS)
    }

    pub fn with_threshold(sink: &'s dyn WarningSink, threshold_seconds: Seconds) -> Self {
        NearestSceneResolver {
            sink,
            threshold_seconds,
        }
    }

    /// Resolve against the effective instant of `target`.
    ///
    /// Arguments
    /// -----------------
    /// * `target`: requested day and time of day (noon when unset).
    /// * `candidates`: every observation discovered for that day, in archive order.
    ///
    /// Return
    /// ----------
    /// * The nearest candidate, borrowed from `candidates`, and its distance in seconds.
    ///
    /// Errors
    /// ----------
    /// * [`CloudCorrError::NotFound`] when `candidates` is empty.
    pub fn resolve<'a, H: Debug>(
        &self,
        target: &TargetInstant,
        candidates: &'a [CandidateObservation<H>],
    ) -> Result<MatchResult<'a, H>, CloudCorrError> {
        self.resolve_at(target, target.epoch(), candidates)
    }

    /// Resolve against an explicit instant, keeping `target` for the day identity.
    ///
    /// Used when the reference time is known more precisely than the requested one,
    /// e.g. the acquisition time of the matching platform scene.
    pub fn resolve_at<'a, H: Debug>(
        &self,
        target: &TargetInstant,
        instant: Epoch,
        candidates: &'a [CandidateObservation<H>],
    ) -> Result<MatchResult<'a, H>, CloudCorrError> {
        let mut tracker = NearestTracker::new(instant);
        for candidate in candidates {
            tracker.offer(candidate);
        }

        let (chosen, delta) = tracker.finish().ok_or_else(|| CloudCorrError::NotFound {
            key: target.key.to_string(),
            target: instant.to_string(),
        })?;

        let delta_seconds = whole_seconds(delta);
        if delta_seconds > self.threshold_seconds {
            self.sink.warn(Warning::LargeTimeDelta {
                target: instant,
                chosen: chosen.timestamp,
                delta_seconds,
                handle: format!("{:?}", chosen.source_handle),
            });
        }

        Ok(MatchResult {
            chosen,
            delta_seconds,
            target: *target,
        })
    }
}

#[cfg(test)]
mod scenes_test {
    use super::*;
    use hifitime::Unit;
    use crate::reporting::CollectingSink;
    use crate::time::{ObservationKey, TimeOfDay};

    fn target() -> TargetInstant {
        TargetInstant::at(
            ObservationKey::new(2020, 100).unwrap(),
            TimeOfDay::new(10, 30).unwrap(),
        )
    }

    fn offsets(t: Epoch, spec: &[(i64, &'static str)]) -> Vec<CandidateObservation<&'static str>> {
        spec.iter()
            .map(|(s, h)| CandidateObservation::new(t + Unit::Second * *s, *h))
            .collect()
    }

    #[test]
    fn test_picks_global_minimum() {
        let sink = CollectingSink::default();
        let target = target();
        let candidates = offsets(target.epoch(), &[(50, "a"), (-10, "b"), (11, "c")]);

        let res = NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap();
        assert_eq!(res.chosen.source_handle, "b");
        assert_eq!(res.delta_seconds, 10);
        assert_eq!(res.target, target);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let sink = CollectingSink::default();
        let target = target();
        let candidates = offsets(target.epoch(), &[(50, "a"), (-10, "b"), (10, "c")]);
        let res = NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap();
        assert_eq!(res.chosen.source_handle, "b");

        let reversed = offsets(target.epoch(), &[(10, "c"), (-10, "b")]);
        let res = NearestSceneResolver::new(&sink)
            .resolve(&target, &reversed)
            .unwrap();
        assert_eq!(res.chosen.source_handle, "c");
    }

    #[test]
    fn test_no_early_exit_on_non_monotonic_input() {
        let sink = CollectingSink::default();
        let target = target();
        let candidates = offsets(
            target.epoch(),
            &[(-3000, "a"), (-2000, "b"), (5000, "c"), (1, "d"), (900, "e")],
        );
        let res = NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap();
        assert_eq!(res.chosen.source_handle, "d");
    }

    #[test]
    fn test_empty_candidates() {
        let sink = CollectingSink::default();
        let target = target();
        let candidates: Vec<CandidateObservation<&str>> = vec![];
        let err = NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap_err();
        assert!(matches!(err, CloudCorrError::NotFound { ref key, .. } if key == "2020100"));
    }

    #[test]
    fn test_large_delta_warns_but_succeeds() {
        let sink = CollectingSink::default();
        let target = target();
        let candidates = offsets(target.epoch(), &[(7_201, "late"), (-9_000, "early")]);

        let res = NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap();
        assert_eq!(res.chosen.source_handle, "late");
        assert_eq!(res.delta_seconds, 7_201);

        let warnings = sink.warnings();
        assert_eq!(warnings.len(), 1);
        match &warnings[0] {
            Warning::LargeTimeDelta {
                target: t,
                chosen,
                delta_seconds,
                handle,
            } => {
                assert_eq!(*t, target.epoch());
                assert_eq!(*chosen, target.epoch() + Unit::Second * 7_201_i64);
                assert_eq!(*delta_seconds, 7_201);
                assert_eq!(handle, "\"late\"");
            }
            other => panic!("unexpected warning {other:?}"),
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let sink = CollectingSink::default();
        let target = target();
        let candidates = offsets(target.epoch(), &[(7_200, "edge")]);
        NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap();
        assert!(sink.is_empty());

        NearestSceneResolver::with_threshold(&sink, 60)
            .resolve(&target, &candidates)
            .unwrap();
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn test_warning_uses_reported_seconds() {
        let sink = CollectingSink::default();
        let target = target();
        let candidates = vec![CandidateObservation::new(
            target.epoch() + Unit::Millisecond * 7_200_400_i64,
            "edge",
        )];
        let res = NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap();
        assert_eq!(res.delta_seconds, 7_200);
        assert!(sink.is_empty());

        let candidates = vec![CandidateObservation::new(
            target.epoch() - Unit::Millisecond * 7_201_900_i64,
            "early",
        )];
        let res = NearestSceneResolver::new(&sink)
            .resolve(&target, &candidates)
            .unwrap();
        assert_eq!(res.delta_seconds, 7_201);
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn test_resolve_at_explicit_instant() {
        let sink = CollectingSink::default();
        let target = target();
        let reference = target.epoch() + Unit::Hour * 2_i64;
        let candidates = offsets(target.epoch(), &[(0, "noonish"), (7_000, "later")]);
        let res = NearestSceneResolver::new(&sink)
            .resolve_at(&target, reference, &candidates)
            .unwrap();
        assert_eq!(res.chosen.source_handle, "later");
        assert_eq!(res.delta_seconds, 200);
    }
}
