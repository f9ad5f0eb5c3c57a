//! # Descriptive statistics
//!
//! Small NaN-aware summaries used by both stations:
//!
//! - [`describe`] – mean / min / max of an array, rounded to two decimals. `NaN`
//!   entries are placeholders for missing pixels; they stay in the source array and
//!   are skipped (or propagated) here depending on [`MissingPolicy`].
//! - [`percent_of_total`] – `100 * count / total`, rounded to two decimals.
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

use crate::cloudcorr_errors::CloudCorrError;
use crate::constants::Percent;

/// Round half away from zero to two decimal digits.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// How `NaN` placeholders are treated by [`describe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Skip missing entries.
    #[default]
    Ignore,
    /// Any missing entry makes every statistic `NaN`.
    Propagate,
}

/// Mean, minimum and maximum of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarise `values`.
///
/// Arguments
/// -----------------
/// * `values`: the entries, `NaN` marking missing ones.
/// * `policy`: whether missing entries are skipped or poison the result.
///
/// Return
/// ----------
/// * [`ChannelStats`] rounded to two decimals.
///
/// Errors
/// ----------
/// * [`CloudCorrError::EmptyInput`] when no entry is left to summarise.
pub fn describe<I>(values: I, policy: MissingPolicy) -> Result<ChannelStats, CloudCorrError>
where
    I: IntoIterator<Item = f64>,
{
    let mut saw_missing = false;
    let mut count = 0usize;
    let mut sum = 0.0;

    let minmax = values
        .into_iter()
        .filter(|v| {
            if v.is_nan() {
                saw_missing = true;
                false
            } else {
                true
            }
        })
        .inspect(|v| {
            count += 1;
            sum += v;
        })
        .minmax();

    let (min, max) = match minmax {
        MinMaxResult::NoElements => {
            return Err(CloudCorrError::EmptyInput(
                "every entry of the array is missing".into(),
            ))
        }
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };

    if saw_missing && policy == MissingPolicy::Propagate {
        return Ok(ChannelStats {
            mean: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        });
    }

    Ok(ChannelStats {
        mean: round2(sum / count as f64),
        min: round2(min),
        max: round2(max),
    })
}

/// Share of `count` in `total`, in percent, rounded to two decimals.
///
/// Errors
/// ----------
/// * [`CloudCorrError::Division`] when `total` is zero.
/// * [`CloudCorrError::PercentOutOfRange`] when `count` is negative or exceeds `total`.
pub fn percent_of_total(count: f64, total: f64) -> Result<Percent, CloudCorrError> {
    if total == 0.0 {
        return Err(CloudCorrError::Division(format!("{count} / {total}")));
    }
    if count < 0.0 || count > total {
        return Err(CloudCorrError::PercentOutOfRange { count, total });
    }
    Ok(round2(count / total * 100.0))
}

#[cfg(test)]
mod statistics_test {
    use super::*;

    #[test]
    fn test_describe_ignores_nan() {
        let stats = describe(vec![0.5, f64::NAN, 0.25, 1.0], MissingPolicy::Ignore).unwrap();
        assert_eq!(
            stats,
            ChannelStats {
                mean: 0.58,
                min: 0.25,
                max: 1.0
            }
        );
    }

    #[test]
    fn test_describe_single_and_rounding() {
        let stats = describe([0.123456], MissingPolicy::Ignore).unwrap();
        assert_eq!(stats.mean, 0.12);
        assert_eq!(stats.min, 0.12);
        assert_eq!(stats.max, 0.12);
    }

    #[test]
    fn test_describe_propagate() {
        let stats = describe(vec![0.5, f64::NAN], MissingPolicy::Propagate).unwrap();
        assert!(stats.mean.is_nan() && stats.min.is_nan() && stats.max.is_nan());

        let clean = describe(vec![0.5, 0.7], MissingPolicy::Propagate).unwrap();
        assert_eq!(clean.mean, 0.6);
    }

    #[test]
    fn test_describe_all_missing() {
        let err = describe(vec![f64::NAN, f64::NAN], MissingPolicy::Ignore).unwrap_err();
        assert!(matches!(err, CloudCorrError::EmptyInput(_)));
        assert!(describe(Vec::<f64>::new(), MissingPolicy::Ignore).is_err());
    }

    #[test]
    fn test_percent_of_total() {
        assert_eq!(percent_of_total(0.0, 100.0).unwrap(), 0.0);
        assert_eq!(percent_of_total(1.0, 3.0).unwrap(), 33.33);
        assert_eq!(percent_of_total(8.0, 8.0).unwrap(), 100.0);
        assert!(matches!(
            percent_of_total(5.0, 0.0),
            Err(CloudCorrError::Division(_))
        ));
        assert_eq!(
            percent_of_total(9.0, 8.0),
            Err(CloudCorrError::PercentOutOfRange {
                count: 9.0,
                total: 8.0
            })
        );
    }
}
