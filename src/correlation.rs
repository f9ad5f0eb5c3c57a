//! # Correlating the two stations
//!
//! Both pipelines produce one result per [`ObservationKey`]. [`correlate`] performs an
//! inner join of the two mappings:
//!
//! - a key present on one side only is dropped;
//! - output order is the platform-side insertion order, restricted to keys the ground
//!   side also holds;
//! - the joined [`CorrelatedRecord`] only borrows the two source results.
//!
//! Flattened records are produced through [`AsFields`]: each side lists its named
//! values, which are then prefixed with [`PLATFORM_PREFIX`] / [`GROUND_PREFIX`] so
//! that identical field names on both sides never collide.
//!
//! ```rust
//! use cloudcorr::correlation::{correlate, AsFields, FieldValue};
//! use cloudcorr::time::ObservationKey;
//! use indexmap::IndexMap;
//!
//! struct Cover(f64);
//! impl AsFields for Cover {
//!     fn fields(&self) -> IndexMap<String, FieldValue> {
//!         IndexMap::from([("percent_cloud".to_string(), FieldValue::Real(self.0))])
//!     }
//! }
//!
//! let day = ObservationKey::parse("2020100").unwrap();
//! let sky = IndexMap::from([(day, Cover(40.0))]);
//! let ground = IndexMap::from([(day, Cover(55.5))]);
//!
//! let joined = correlate(&sky, &ground);
//! let fields = joined[&day].fields();
//! assert_eq!(fields["sky_percent_cloud"], FieldValue::Real(40.0));
//! assert_eq!(fields["grnd_percent_cloud"], FieldValue::Real(55.5));
//! ```
use std::fmt;

use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::constants::{GROUND_PREFIX, PLATFORM_PREFIX};
use crate::time::ObservationKey;

/// One named value of a flattened result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Count(u64),
    Seconds(i64),
    Real(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{text}"),
            FieldValue::Count(count) => write!(f, "{count}"),
            FieldValue::Seconds(seconds) => write!(f, "{seconds}"),
            FieldValue::Real(value) => write!(f, "{value}"),
        }
    }
}

/// A per-day result that can be flattened into named fields, in a stable order.
pub trait AsFields {
    fn fields(&self) -> IndexMap<String, FieldValue>;
}

/// Platform and ground results of the same day.
#[derive(Debug, PartialEq)]
pub struct CorrelatedRecord<'a, P, G> {
    pub key: ObservationKey,
    pub platform: &'a P,
    pub ground: &'a G,
}

// Derived Clone/Copy would require P: Clone and G: Clone.
impl<P, G> Clone for CorrelatedRecord<'_, P, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, G> Copy for CorrelatedRecord<'_, P, G> {}

impl<P: AsFields, G: AsFields> CorrelatedRecord<'_, P, G> {
    /// Platform fields prefixed with `sky_`, followed by ground fields prefixed with
    /// `grnd_`.
    pub fn fields(&self) -> IndexMap<String, FieldValue> {
        let platform = self
            .platform
            .fields()
            .into_iter()
            .map(|(name, value)| (format!("{PLATFORM_PREFIX}{name}"), value));
        let ground = self
            .ground
            .fields()
            .into_iter()
            .map(|(name, value)| (format!("{GROUND_PREFIX}{name}"), value));
        platform.chain(ground).collect()
    }
}

/// Serialised as a flat map: `"key"` followed by every prefixed field.
impl<P: AsFields, G: AsFields> Serialize for CorrelatedRecord<'_, P, G> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.fields();
        let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
        map.serialize_entry("key", &self.key)?;
        for (name, value) in &fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Inner join of the two per-day result sets.
///
/// Arguments
/// -----------------
/// * `platform_results`: orbital platform results, in request order.
/// * `ground_results`: ground station results.
///
/// Return
/// ----------
/// * One [`CorrelatedRecord`] per key present on both sides, in platform order.
pub fn correlate<'a, P, G>(
    platform_results: &'a IndexMap<ObservationKey, P>,
    ground_results: &'a IndexMap<ObservationKey, G>,
) -> IndexMap<ObservationKey, CorrelatedRecord<'a, P, G>> {
    platform_results
        .iter()
        .filter_map(|(key, platform)| {
            ground_results.get(key).map(|ground| {
                (
                    *key,
                    CorrelatedRecord {
                        key: *key,
                        platform,
                        ground,
                    },
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod correlation_test {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Stats {
        n_total: u64,
        percent: f64,
    }

    impl AsFields for Stats {
        fn fields(&self) -> IndexMap<String, FieldValue> {
            IndexMap::from([
                ("n_total".to_string(), FieldValue::Count(self.n_total)),
                ("percent_cloud".to_string(), FieldValue::Real(self.percent)),
            ])
        }
    }

    fn key(s: &str) -> ObservationKey {
        ObservationKey::parse(s).unwrap()
    }

    #[test]
    fn test_inner_join_drops_one_sided_keys() {
        let platform = IndexMap::from([(
            key("2020100"),
            Stats {
                n_total: 64,
                percent: 25.0,
            },
        )]);
        let ground = IndexMap::from([
            (
                key("2020100"),
                Stats {
                    n_total: 1000,
                    percent: 31.2,
                },
            ),
            (
                key("2020101"),
                Stats {
                    n_total: 900,
                    percent: 4.0,
                },
            ),
        ]);

        let joined = correlate(&platform, &ground);
        assert_eq!(joined.len(), 1);
        let record = joined[&key("2020100")];
        assert_eq!(record.platform.n_total, 64);
        assert_eq!(record.ground.n_total, 1000);

        let fields = record.fields();
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec![
                "sky_n_total",
                "sky_percent_cloud",
                "grnd_n_total",
                "grnd_percent_cloud"
            ]
        );
        assert_eq!(fields["grnd_percent_cloud"], FieldValue::Real(31.2));
    }

    #[test]
    fn test_platform_order_is_kept() {
        let stats = |n| Stats {
            n_total: n,
            percent: 0.0,
        };
        let platform = IndexMap::from([
            (key("2020103"), stats(3)),
            (key("2020101"), stats(1)),
            (key("2020102"), stats(2)),
        ]);
        let ground = IndexMap::from([
            (key("2020101"), stats(10)),
            (key("2020102"), stats(20)),
            (key("2020103"), stats(30)),
        ]);

        let order: Vec<String> = correlate(&platform, &ground)
            .keys()
            .map(ToString::to_string)
            .collect();
        assert_eq!(order, vec!["2020103", "2020101", "2020102"]);
    }

    #[test]
    fn test_empty_side() {
        let platform: IndexMap<ObservationKey, Stats> = IndexMap::new();
        let ground = IndexMap::from([(
            key("2020100"),
            Stats {
                n_total: 1,
                percent: 0.0,
            },
        )]);
        assert!(correlate(&platform, &ground).is_empty());
        assert!(correlate(&ground, &platform).is_empty());
    }

    #[test]
    fn test_serialize_record() {
        let platform = IndexMap::from([(
            key("2020100"),
            Stats {
                n_total: 64,
                percent: 25.0,
            },
        )]);
        let joined = correlate(&platform, &platform);
        let json = serde_json::to_string(&joined[&key("2020100")]).unwrap();
        assert_eq!(
            json,
            r#"{"key":"2020100","sky_n_total":64,"sky_percent_cloud":25.0,"grnd_n_total":64,"grnd_percent_cloud":25.0}"#
        );
        assert_eq!(FieldValue::Text("10:35".into()).to_string(), "10:35");
    }
}
