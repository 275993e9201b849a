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

//! Module handling the hybrid sigma-pressure vertical coordinate.
//!
//! Pressure on the half level `k` of a column is `A[k] + B[k]·ps`,
//! so the whole vertical structure of the atmosphere is defined by
//! two coefficient tables and the surface pressure. The tables are
//! kept ordered from the top of atmosphere to the surface, in which
//! case every layer thickness is positive.

use std::{f64::consts::LN_2, path::Path};

use floccus::{error_wrapper::InputError, virtual_temperature};
use log::warn;
use ndarray::{Array1, Array2, Array3, Axis};
use serde::Deserialize;

use crate::{
    errors::{DataLoadError, ValidationError},
    Float,
};

/// Virtual temperature is undefined for perfectly dry air in `floccus`,
/// humidity below this floor is raised to it.
const MIN_VIRTUAL_HUMIDITY: Float = 1.0e-9;

/// Hybrid coefficients on half levels.
#[derive(Clone, PartialEq, Debug)]
pub struct HybridCoefficients {
    /// Pressure offsets (Pa)
    pub a: Array1<Float>,
    /// Sigma coefficients (dimensionless)
    pub b: Array1<Float>,
}

#[derive(Deserialize)]
struct CoefficientsRow {
    a: Float,
    b: Float,
}

impl HybridCoefficients {
    pub fn new(a: Array1<Float>, b: Array1<Float>) -> Result<Self, ValidationError> {
        if a.len() != b.len() || a.len() < 2 {
            return Err(ValidationError::CoefficientMismatch(a.len(), b.len()));
        }

        Ok(HybridCoefficients { a, b })
    }

    /// Reads coefficients from a CSV table with `a` and `b` columns,
    /// one row per half level.
    pub fn from_csv(path: &Path) -> Result<Self, DataLoadError> {
        let mut reader = csv::Reader::from_path(path)?;

        let mut a = vec![];
        let mut b = vec![];

        for row in reader.deserialize() {
            let row: CoefficientsRow = row?;
            a.push(row.a);
            b.push(row.b);
        }

        Ok(HybridCoefficients::new(
            Array1::from_vec(a),
            Array1::from_vec(b),
        )?)
    }

    /// Number of full model levels.
    pub fn levels(&self) -> usize {
        self.a.len() - 1
    }

    /// Copy of the tables with reversed level order.
    pub fn reversed(&self) -> Self {
        let mut a = self.a.clone();
        let mut b = self.b.clone();
        a.invert_axis(Axis(0));
        b.invert_axis(Axis(0));

        HybridCoefficients { a, b }
    }

    /// Pressure (Pa) on half levels for a column with given surface pressure.
    pub fn half_level_pressure(&self, surface_pressure: Float) -> Array1<Float> {
        &self.a + &(&self.b * surface_pressure)
    }

    /// Layer thickness `p(k+1) - p(k)` (Pa) for a column.
    ///
    /// No sign normalisation is done, the result is negative when
    /// the tables run from the surface to the top.
    pub fn layer_thickness(&self, surface_pressure: Float) -> Array1<Float> {
        let p = self.half_level_pressure(surface_pressure);
        let n = p.len();

        &p.slice(ndarray::s![1..n]) - &p.slice(ndarray::s![0..n - 1])
    }

    /// Layer thickness for every column of a surface pressure field,
    /// with shape `(level, lat, lon)`.
    pub fn pressure_thickness(&self, surface_pressure: &Array2<Float>) -> Array3<Float> {
        let (n_lat, n_lon) = surface_pressure.dim();

        Array3::from_shape_fn((self.levels(), n_lat, n_lon), |(k, i, j)| {
            (self.a[k + 1] - self.a[k]) + (self.b[k + 1] - self.b[k]) * surface_pressure[[i, j]]
        })
    }

    /// Pressure on half levels for every column, shape `(level + 1, lat, lon)`.
    pub fn half_level_pressures(&self, surface_pressure: &Array2<Float>) -> Array3<Float> {
        let (n_lat, n_lon) = surface_pressure.dim();

        Array3::from_shape_fn((self.levels() + 1, n_lat, n_lon), |(k, i, j)| {
            self.a[k] + self.b[k] * surface_pressure[[i, j]]
        })
    }

    /// Checks that tables run from the top of atmosphere to the
    /// surface, so that every layer is positive for the reference
    /// surface pressure.
    ///
    /// Integrating with reversed tables silently inverts
    /// the sign of the transport, so this is checked before
    /// any integration is done.
    pub fn check_order(&self, reference_pressure: Float) -> Result<(), ValidationError> {
        if self
            .layer_thickness(reference_pressure)
            .iter()
            .any(|&dp| dp <= 0.0)
        {
            return Err(ValidationError::LevelOrdering);
        }

        Ok(())
    }
}

/// Computes geopotential (m^2 s^-2) on full model levels by integrating
/// the hypsometric equation upwards from the surface geopotential.
///
/// Follows the IFS discretisation: half-level geopotential grows by
/// `Rd·Tv·ln(p_bot/p_top)` through each layer and full-level values
/// are placed with the `alpha` weight (`ln 2` for the topmost layer
/// whose top pressure is zero). Coefficients must be ordered from
/// the top to the surface.
///
/// Temperatures for which `floccus` does not define the virtual
/// temperature (below 173 K or above 354 K) are treated as missing.
pub fn geopotential_on_levels(
    coeffs: &HybridCoefficients,
    temperature: &Array3<Float>,
    specific_humidity: &Array3<Float>,
    surface_pressure: &Array2<Float>,
    surface_geopotential: &Array2<Float>,
    gas_constant: Float,
) -> Result<Array3<Float>, ValidationError> {
    if temperature.dim() != specific_humidity.dim()
        || temperature.dim().0 != coeffs.levels()
        || (temperature.dim().1, temperature.dim().2) != surface_pressure.dim()
        || surface_pressure.dim() != surface_geopotential.dim()
    {
        return Err(ValidationError::ShapeMismatch("hypsometric inputs"));
    }

    let half_pressure = coeffs.half_level_pressures(surface_pressure);
    let (n_lev, n_lat, n_lon) = temperature.dim();
    let mut geopotential = Array3::zeros(temperature.raw_dim());
    let mut undefined = 0;

    for i in 0..n_lat {
        for j in 0..n_lon {
            let mut half_geopotential = surface_geopotential[[i, j]];

            for k in (0..n_lev).rev() {
                let p_top = half_pressure[[k, i, j]];
                let p_bot = half_pressure[[k + 1, i, j]];

                let t = temperature[[k, i, j]];
                let q = specific_humidity[[k, i, j]];

                // missing values propagate to every level above
                let virtual_temp = if t.is_nan() || q.is_nan() {
                    Float::NAN
                } else {
                    match virtual_temperature::general3(t, q.max(MIN_VIRTUAL_HUMIDITY)) {
                        Ok(tv) => tv,
                        Err(InputError::OutOfRange(arg)) if arg == "temperature" => {
                            undefined += 1;
                            Float::NAN
                        }
                        Err(err) => return Err(err.into()),
                    }
                };
                let thickness_scale = gas_constant * virtual_temp;

                if k == 0 || p_top <= 0.0 {
                    geopotential[[k, i, j]] = half_geopotential + thickness_scale * LN_2;
                } else {
                    let dlog_p = (p_bot / p_top).ln();
                    let alpha = 1.0 - (p_top / (p_bot - p_top)) * dlog_p;

                    geopotential[[k, i, j]] = half_geopotential + thickness_scale * alpha;
                    half_geopotential += thickness_scale * dlog_p;
                }
            }
        }
    }

    if undefined > 0 {
        warn!(
            "Virtual temperature undefined in {} cells, geopotential above them is missing",
            undefined
        );
    }

    Ok(geopotential)
}
