/*
Copyright 2021 Jakub Lewandowski

This file is part of Atmospheric Meridional Energy Transport (AMET).

Atmospheric Meridional Energy Transport (AMET) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Atmospheric Meridional Energy Transport (AMET) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Atmospheric Meridional Energy Transport (AMET). If not, see https://www.gnu.org/licenses/.
*/

//! Handling of sentinel (fill) values and physical validity of input.
//!
//! Reanalysis files mark missing data with declared fill values
//! (`_FillValue`, `missing_value` in NetCDF, `missingValue` with
//! a bitmap in GRIB). Such values are never used as numbers: depending
//! on the configured policy they become NaN and propagate as missing,
//! are substituted with zero, or stop the computation.

use float_cmp::approx_eq;
use log::warn;
use ndarray::{Array, Dimension};
use serde::Deserialize;

use crate::{errors::ValidationError, Float};

/// What to do with values equal to the declared fill value.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SentinelPolicy {
    /// Replace with NaN, results depending on them are NaN too
    Propagate,
    /// Replace with zero
    Zero,
    /// Fail with [`ValidationError::MissingValues`]
    Reject,
}

impl Default for SentinelPolicy {
    fn default() -> Self {
        SentinelPolicy::Propagate
    }
}

impl SentinelPolicy {
    /// Policy for surface pressure, for which zero is never a valid
    /// value: `Zero` keeps missing surface pressure as NaN instead.
    pub fn for_surface_pressure(self) -> Self {
        match self {
            SentinelPolicy::Zero => SentinelPolicy::Propagate,
            other => other,
        }
    }
}

/// Inclusive range of physically plausible values of a variable.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
pub struct PhysicalRange {
    pub variable: &'static str,
    pub min: Float,
    pub max: Float,
}

pub const TEMPERATURE_RANGE: PhysicalRange = PhysicalRange {
    variable: "temperature",
    min: 100.0,
    max: 400.0,
};

pub const HUMIDITY_RANGE: PhysicalRange = PhysicalRange {
    variable: "specific humidity",
    min: -0.01,
    max: 0.1,
};

pub const WIND_RANGE: PhysicalRange = PhysicalRange {
    variable: "wind",
    min: -300.0,
    max: 300.0,
};

pub const SURFACE_PRESSURE_RANGE: PhysicalRange = PhysicalRange {
    variable: "surface pressure",
    min: 10_000.0,
    max: 120_000.0,
};

pub fn is_sentinel(value: Float, fill_value: Float) -> bool {
    approx_eq!(Float, value, fill_value, ulps = 2)
}

/// Replaces fill values in the field according to the policy
/// and returns how many values were replaced.
pub fn apply<D: Dimension>(
    field: &mut Array<Float, D>,
    fill_value: Option<Float>,
    policy: SentinelPolicy,
    variable: &str,
) -> Result<usize, ValidationError> {
    let fill_value = match fill_value {
        Some(fill) => fill,
        None => return Ok(0),
    };

    let mut count = 0;

    for value in field.iter_mut() {
        if is_sentinel(*value, fill_value) {
            count += 1;

            match policy {
                SentinelPolicy::Propagate => *value = Float::NAN,
                SentinelPolicy::Zero => *value = 0.0,
                SentinelPolicy::Reject => {}
            }
        }
    }

    if count > 0 {
        if policy == SentinelPolicy::Reject {
            return Err(ValidationError::MissingValues {
                variable: variable.to_string(),
                count,
            });
        }

        warn!(
            "Replaced {} fill values of {} using {:?} policy",
            count, variable, policy
        );
    }

    Ok(count)
}

/// Checks that every non-missing value lies within the physical range.
pub fn check_range<D: Dimension>(
    field: &Array<Float, D>,
    range: &PhysicalRange,
) -> Result<(), ValidationError> {
    let count = field
        .iter()
        .filter(|v| !v.is_nan() && !(range.min..=range.max).contains(*v))
        .count();

    if count > 0 {
        return Err(ValidationError::OutOfRange {
            variable: range.variable,
            count,
            min: range.min,
            max: range.max,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply, check_range, SentinelPolicy, TEMPERATURE_RANGE};
    use crate::errors::ValidationError;
    use ndarray::array;

    #[test]
    fn fill_values_propagate_as_missing() {
        let mut field = array![[280.0, 1.0e20], [1.0e20, 250.0]];
        let count = apply(&mut field, Some(1.0e20), SentinelPolicy::Propagate, "t").unwrap();

        assert_eq!(count, 2);
        assert!(field[[0, 1]].is_nan());
        assert!(field[[1, 0]].is_nan());
        assert_eq!(field[[1, 1]], 250.0);

        // missing values are not range violations
        assert!(check_range(&field, &TEMPERATURE_RANGE).is_ok());
    }

    #[test]
    fn fill_values_substituted_or_rejected() {
        let mut field = array![32766.0, 0.5];
        apply(&mut field, Some(32766.0), SentinelPolicy::Zero, "q").unwrap();
        assert_eq!(field, array![0.0, 0.5]);

        let mut field = array![32766.0, 0.5];
        let result = apply(&mut field, Some(32766.0), SentinelPolicy::Reject, "q");
        assert!(matches!(
            result,
            Err(ValidationError::MissingValues { count: 1, .. })
        ));
    }

    #[test]
    fn no_fill_value_declared() {
        let mut field = array![1.0e20, 0.5];
        assert_eq!(apply(&mut field, None, SentinelPolicy::Reject, "q").unwrap(), 0);
        assert_eq!(field[0], 1.0e20);
    }

    #[test]
    fn implausible_values_are_reported() {
        let field = array![[280.0, 5000.0], [20.0, 250.0]];

        match check_range(&field, &TEMPERATURE_RANGE) {
            Err(ValidationError::OutOfRange { count, .. }) => assert_eq!(count, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn surface_pressure_is_never_zeroed() {
        assert_eq!(
            SentinelPolicy::Zero.for_surface_pressure(),
            SentinelPolicy::Propagate
        );
        assert_eq!(
            SentinelPolicy::Reject.for_surface_pressure(),
            SentinelPolicy::Reject
        );
    }

    #[test]
    fn policy_deserializes() {
        let policy: SentinelPolicy = serde_yaml::from_str("reject").unwrap();
        assert_eq!(policy, SentinelPolicy::Reject);
        assert_eq!(SentinelPolicy::default(), SentinelPolicy::Propagate);
    }
}
