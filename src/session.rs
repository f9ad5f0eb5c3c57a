//! # Correlation session
//!
//! A [`Session`] drives both stations for a batch of days. File discovery and pixel
//! extraction stay outside the crate, behind the [`PlatformArchive`] and
//! [`GroundArchive`] traits.
//!
//! ## Per-day flow
//!
//! ```text
//! key ──► TargetInstant ──► nearest platform scene ──► RawLayers ──► PlatformSceneStats
//!                                                                         │ acquisition time
//!                                                                         ▼
//!                                 GroundSceneSummary ◄── RGB image ◄── nearest ground image
//! ```
//!
//! ## Failure isolation
//!
//! Each day is processed on its own. A failure is recorded against its key, wrapped in
//! [`CloudCorrError::ForKey`], and the batch moves on. Ground processing is driven by
//! the platform acquisition time, so a day whose platform side failed gets no ground
//! entry.
use std::fmt::Debug;

use indexmap::IndexMap;
use nalgebra::DMatrix;

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::{GroundResults, PlatformResults};
use crate::correlation::{correlate, CorrelatedRecord};
use crate::ground::indices::RgbImage;
use crate::ground::GroundSceneSummary;
use crate::platform::{PlatformDescriptor, PlatformSceneStats, RawLayers};
use crate::reporting::{Warning, WarningSink};
use crate::scenes::{CandidateObservation, NearestSceneResolver};
use crate::station::{CorrelationConfig, Station};
use crate::time::{ObservationKey, TargetInstant, TimeOfDay};

/// Per-key outcome of one side of a batch, in request order.
pub type KeyedResults<T> = IndexMap<ObservationKey, Result<T, CloudCorrError>>;

/// Source of orbital platform scenes.
pub trait PlatformArchive {
    type Handle: Debug;

    /// Every scene of `key` covering `station`, with its acquisition time.
    fn scenes(
        &self,
        station: &Station,
        key: &ObservationKey,
    ) -> Result<Vec<CandidateObservation<Self::Handle>>, CloudCorrError>;

    /// Pixel windows around `station` of the sublayers named by `descriptor`, keyed by
    /// abbreviation.
    fn read_layers(
        &self,
        handle: &Self::Handle,
        descriptor: &PlatformDescriptor,
        station: &Station,
    ) -> Result<RawLayers, CloudCorrError>;
}

/// Source of ground station sky photographs.
pub trait GroundArchive {
    type Handle: Debug;

    fn images(
        &self,
        station: &Station,
        key: &ObservationKey,
    ) -> Result<Vec<CandidateObservation<Self::Handle>>, CloudCorrError>;

    fn read_rgb(&self, handle: &Self::Handle) -> Result<RgbImage, CloudCorrError>;

    /// Pixels showing sky (`true`); `None` keeps the whole frame.
    fn sky_mask(&self) -> Option<&DMatrix<bool>> {
        None
    }
}

/// Successful results of a batch, plus the failures that were set aside.
#[derive(Debug, Default)]
pub struct SessionReport {
    pub platform: PlatformResults,
    pub ground: GroundResults,
    /// One entry per failed day and side, each a [`CloudCorrError::ForKey`]
    pub failures: Vec<CloudCorrError>,
}

impl SessionReport {
    /// Split keyed outcomes into successes and failures.
    pub fn from_keyed(
        platform: KeyedResults<PlatformSceneStats>,
        ground: KeyedResults<GroundSceneSummary>,
    ) -> Self {
        let mut report = SessionReport::default();
        for (key, result) in platform {
            match result {
                Ok(stats) => {
                    report.platform.insert(key, stats);
                }
                Err(err) => report.failures.push(err),
            }
        }
        for (key, result) in ground {
            match result {
                Ok(summary) => {
                    report.ground.insert(key, summary);
                }
                Err(err) => report.failures.push(err),
            }
        }
        report
    }

    /// Days processed successfully on both sides, in platform order.
    pub fn correlated(
        &self,
    ) -> IndexMap<ObservationKey, CorrelatedRecord<'_, PlatformSceneStats, GroundSceneSummary>>
    {
        correlate(&self.platform, &self.ground)
    }
}

/// One correlation run over a pair of archives.
pub struct Session<'s, P, G> {
    config: &'s CorrelationConfig,
    platform: P,
    ground: G,
    sink: &'s dyn WarningSink,
}

impl<'s, P, G> Session<'s, P, G>
where
    P: PlatformArchive,
    G: GroundArchive,
{
    pub fn new(
        config: &'s CorrelationConfig,
        platform: P,
        ground: G,
        sink: &'s dyn WarningSink,
    ) -> Self {
        Session {
            config,
            platform,
            ground,
            sink,
        }
    }

    fn resolver(&self) -> NearestSceneResolver<'s> {
        NearestSceneResolver::with_threshold(self.sink, self.config.large_delta_seconds)
    }

    fn target(&self, key: ObservationKey) -> TargetInstant {
        TargetInstant {
            key,
            time_of_day: self.config.default_time_of_day,
        }
    }

    /// Process both stations for `keys` and split the outcomes.
    pub fn run(&self, keys: &[ObservationKey]) -> SessionReport {
        if self.config.default_time_of_day.is_none() && !keys.is_empty() {
            self.sink.warn(Warning::DefaultTimeOfDay {
                applied: TimeOfDay::noon(),
                count: keys.len(),
            });
        }

        let platform = self.platform_results(keys);
        let acquired: PlatformResults = platform
            .iter()
            .filter_map(|(key, result)| result.as_ref().ok().map(|stats| (*key, stats.clone())))
            .collect();
        let ground = self.ground_results(&acquired);

        SessionReport::from_keyed(platform, ground)
    }

    /// Platform statistics of every key; failures stay attached to their key.
    pub fn platform_results(&self, keys: &[ObservationKey]) -> KeyedResults<PlatformSceneStats> {
        keys.iter()
            .map(|key| {
                let result = self.platform_day(*key).map_err(|err| {
                    log::debug!("platform processing of {key} failed: {err}");
                    err.for_key(key)
                });
                (*key, result)
            })
            .collect()
    }

    /// Ground summaries of every day with platform statistics, matched against the
    /// platform acquisition time.
    pub fn ground_results(&self, platform: &PlatformResults) -> KeyedResults<GroundSceneSummary> {
        platform
            .iter()
            .map(|(key, stats)| {
                let result = self.ground_day(*key, stats).map_err(|err| {
                    log::debug!("ground processing of {key} failed: {err}");
                    err.for_key(key)
                });
                (*key, result)
            })
            .collect()
    }

    fn platform_day(&self, key: ObservationKey) -> Result<PlatformSceneStats, CloudCorrError> {
        let station = &self.config.station;
        let scenes = self.platform.scenes(station, &key)?;
        if scenes.len() > 1 {
            self.sink.warn(Warning::MultipleCandidates {
                key,
                count: scenes.len(),
            });
        }

        let matched = self.resolver().resolve(&self.target(key), &scenes)?;
        let raw = self
            .platform
            .read_layers(&matched.chosen.source_handle, &self.config.platform, station)?;
        self.config.platform.process(&raw)
    }

    fn ground_day(
        &self,
        key: ObservationKey,
        stats: &PlatformSceneStats,
    ) -> Result<GroundSceneSummary, CloudCorrError> {
        let images = self.ground.images(&self.config.station, &key)?;
        let matched = self
            .resolver()
            .resolve_at(&self.target(key), stats.acquisition(&key), &images)?;
        let image = self.ground.read_rgb(&matched.chosen.source_handle)?;

        GroundSceneSummary::from_image(
            &image,
            self.ground.sky_mask(),
            &self.config.boundary,
            &matched,
        )
    }
}

#[cfg(test)]
mod session_test {
    use super::*;
    use crate::correlation::FieldValue;
    use crate::reporting::CollectingSink;
    use hifitime::Epoch;

    fn key(day: u32) -> ObservationKey {
        ObservationKey::new(2020, day).unwrap()
    }

    fn at(key: ObservationKey, hour: u8, minute: u8) -> Epoch {
        key.epoch_at(TimeOfDay::new(hour, minute).unwrap())
    }

    /// Day 100 has two scenes, day 101 a scene with no pixel weight, day 102 none.
    struct MockPlatform;

    impl PlatformArchive for MockPlatform {
        type Handle = String;

        fn scenes(
            &self,
            _station: &Station,
            key: &ObservationKey,
        ) -> Result<Vec<CandidateObservation<String>>, CloudCorrError> {
            Ok(match key.day_of_year() {
                100 => vec![
                    CandidateObservation::new(at(*key, 4, 0), "early.hdf".into()),
                    CandidateObservation::new(at(*key, 10, 35), "late.hdf".into()),
                ],
                101 => vec![CandidateObservation::new(at(*key, 11, 0), "empty.hdf".into())],
                _ => vec![],
            })
        }

        fn read_layers(
            &self,
            handle: &String,
            _descriptor: &PlatformDescriptor,
            _station: &Station,
        ) -> Result<RawLayers, CloudCorrError> {
            let npa = if handle == "empty.hdf" { 0 } else { 16 };
            Ok(RawLayers::new()
                .with_layer("CRGT", vec![1035; 4])
                .with_layer("CRNM", vec![8, 8, 0, 0])
                .with_layer("NPA", vec![npa; 4]))
        }
    }

    struct MockGround;

    impl GroundArchive for MockGround {
        type Handle = (u8, u8);

        fn images(
            &self,
            _station: &Station,
            key: &ObservationKey,
        ) -> Result<Vec<CandidateObservation<(u8, u8)>>, CloudCorrError> {
            Ok(vec![
                CandidateObservation::new(at(*key, 10, 30), (10, 30)),
                CandidateObservation::new(at(*key, 10, 40), (10, 40)),
            ])
        }

        fn read_rgb(&self, handle: &(u8, u8)) -> Result<RgbImage, CloudCorrError> {
            if *handle != (10, 30) {
                return Err(CloudCorrError::Archive(format!("unexpected image {handle:?}")));
            }
            // one bright (cloud) pixel, one dark (clear) pixel
            RgbImage::from_interleaved(1, 2, &[200, 230, 250, 20, 20, 20])
        }
    }

    fn config() -> CorrelationConfig {
        CorrelationConfig::new(Station::new(Some("test".into()), 60.0, 25.0).unwrap())
            .with_time_of_day(TimeOfDay::new(10, 0).unwrap())
    }

    #[test]
    fn test_failing_days_do_not_block_others() {
        let config = config();
        let sink = CollectingSink::default();
        let session = Session::new(&config, MockPlatform, MockGround, &sink);

        let report = session.run(&[key(100), key(101), key(102)]);

        assert_eq!(report.platform.keys().copied().collect::<Vec<_>>(), vec![key(100)]);
        assert_eq!(report.ground.keys().copied().collect::<Vec<_>>(), vec![key(100)]);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report.failures[0].root(),
            CloudCorrError::Division(_)
        ));
        assert!(matches!(
            &report.failures[1],
            CloudCorrError::ForKey { key, .. } if key == "2020102"
        ));
        assert!(matches!(
            report.failures[1].root(),
            CloudCorrError::NotFound { .. }
        ));

        let stats = &report.platform[&key(100)];
        assert_eq!(stats.percents["CLD"], 25.0);

        let summary = &report.ground[&key(100)];
        assert_eq!(summary.delta_seconds, 300);
        assert_eq!(summary.percent_cloud, 50.0);

        let correlated = report.correlated();
        assert_eq!(correlated.len(), 1);
        let fields = correlated[&key(100)].fields();
        assert_eq!(fields["sky_percent_CLD"], FieldValue::Real(25.0));
        assert_eq!(fields["grnd_percent_CLD"], FieldValue::Real(50.0));

        assert_eq!(
            sink.warnings(),
            vec![Warning::MultipleCandidates {
                key: key(100),
                count: 2
            }]
        );
    }

    #[test]
    fn test_default_time_and_large_delta_are_reported() {
        let mut config = config();
        config.default_time_of_day = None;
        config.large_delta_seconds = 3600;
        let sink = CollectingSink::default();
        let session = Session::new(&config, MockPlatform, MockGround, &sink);

        let platform = session.platform_results(&[key(101)]);
        assert!(platform[&key(101)].is_err());

        session.run(&[key(101)]);
        let warnings = sink.warnings();
        assert!(warnings.contains(&Warning::DefaultTimeOfDay {
            applied: TimeOfDay::noon(),
            count: 1
        }));
        // noon target, 11:00 scene
        assert!(warnings
            .iter()
            .all(|w| !matches!(w, Warning::LargeTimeDelta { .. })));

        // noon target, nearest scene at 10:35
        session.platform_results(&[key(100)]);
        assert!(sink
            .warnings()
            .iter()
            .any(|w| matches!(w, Warning::LargeTimeDelta { delta_seconds: 5100, .. })));
    }
}
