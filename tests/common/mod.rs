#![allow(dead_code)]

use approx::assert_relative_eq;
use hifitime::Epoch;
use indexmap::IndexMap;

use cloudcorr::cloudcorr_errors::CloudCorrError;
use cloudcorr::ground::indices::RgbImage;
use cloudcorr::platform::{PlatformDescriptor, RawLayers};
use cloudcorr::scenes::CandidateObservation;
use cloudcorr::session::{GroundArchive, PlatformArchive};
use cloudcorr::station::Station;
use cloudcorr::statistics::ChannelStats;
use cloudcorr::time::{ObservationKey, TimeOfDay};

pub fn key(year: i32, day: u32) -> ObservationKey {
    ObservationKey::new(year, day).unwrap()
}

pub fn at(key: ObservationKey, hour: u8, minute: u8) -> Epoch {
    key.epoch_at(TimeOfDay::new(hour, minute).unwrap())
}

pub fn station() -> Station {
    Station::new(Some("Sodankyla".into()), 67.37, 26.63).unwrap()
}

pub fn assert_stats_close(actual: &ChannelStats, expected: &ChannelStats, epsilon: f64) {
    assert_relative_eq!(actual.mean, expected.mean, epsilon = epsilon);
    assert_relative_eq!(actual.min, expected.min, epsilon = epsilon);
    assert_relative_eq!(actual.max, expected.max, epsilon = epsilon);
}

/// Pack `(CLD, CLD_SHDW, ADJ_CLD, SNW)` counts into one number-mapping word.
pub fn pack(cld: u8, shadow: u8, adjacent: u8, snow: u8) -> u32 {
    u32::from(cld) | (u32::from(shadow) << 8) | (u32::from(adjacent) << 16) | (u32::from(snow) << 24)
}

/// A platform scene held in memory.
#[derive(Debug, Clone)]
pub struct StoredScene {
    pub name: String,
    pub time: Epoch,
    pub layers: RawLayers,
}

/// Platform archive backed by a map of day -> scenes.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    pub days: IndexMap<ObservationKey, Vec<StoredScene>>,
}

impl MemoryPlatform {
    pub fn with_scene(mut self, key: ObservationKey, scene: StoredScene) -> Self {
        self.days.entry(key).or_default().push(scene);
        self
    }
}

impl PlatformArchive for MemoryPlatform {
    type Handle = (ObservationKey, usize);

    fn scenes(
        &self,
        _station: &Station,
        key: &ObservationKey,
    ) -> Result<Vec<CandidateObservation<Self::Handle>>, CloudCorrError> {
        Ok(self
            .days
            .get(key)
            .map(|scenes| {
                scenes
                    .iter()
                    .enumerate()
                    .map(|(i, scene)| CandidateObservation::new(scene.time, (*key, i)))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read_layers(
        &self,
        handle: &Self::Handle,
        _descriptor: &PlatformDescriptor,
        _station: &Station,
    ) -> Result<RawLayers, CloudCorrError> {
        self.days
            .get(&handle.0)
            .and_then(|scenes| scenes.get(handle.1))
            .map(|scene| scene.layers.clone())
            .ok_or_else(|| CloudCorrError::Archive(format!("no scene {handle:?}")))
    }
}

/// Ground archive backed by a list of timestamped images.
#[derive(Debug, Default)]
pub struct MemoryGround {
    pub images: Vec<(Epoch, RgbImage)>,
    pub sky_mask: Option<nalgebra::DMatrix<bool>>,
}

impl GroundArchive for MemoryGround {
    type Handle = usize;

    fn images(
        &self,
        _station: &Station,
        key: &ObservationKey,
    ) -> Result<Vec<CandidateObservation<usize>>, CloudCorrError> {
        let start = at(*key, 0, 0);
        let end = start + hifitime::Unit::Day * 1_i64;
        Ok(self
            .images
            .iter()
            .enumerate()
            .filter(|(_, (time, _))| *time >= start && *time < end)
            .map(|(i, (time, _))| CandidateObservation::new(*time, i))
            .collect())
    }

    fn read_rgb(&self, handle: &usize) -> Result<RgbImage, CloudCorrError> {
        self.images
            .get(*handle)
            .map(|(_, image)| image.clone())
            .ok_or_else(|| CloudCorrError::Archive(format!("no image {handle}")))
    }

    fn sky_mask(&self) -> Option<&nalgebra::DMatrix<bool>> {
        self.sky_mask.as_ref()
    }
}
