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

//! Module with the input boundary of the computation.
//!
//! Readers of GRIB and NetCDF files implement [`MonthlyInput`]
//! which gives access to one month of model-level data in the native
//! level order of the dataset. Conversion to the internal conventions
//! (level order, geopotential on levels) happens in
//! [`AtmosphereState::from_input`](super::state::AtmosphereState::from_input).

pub mod grib;
pub mod nc;
pub mod sentinel;

use log::debug;
use ndarray::{Array2, Array3};

use self::{grib::GribMonth, nc::NetcdfMonth, sentinel::SentinelPolicy};
use super::{
    configuration::Config,
    grid::Grid,
    hybrid::HybridCoefficients,
    profile::{InputFormat, StateVariable, SurfacePressureKind, VariableNames},
};
use crate::{errors::DataLoadError, Float};

/// One month of model-level data.
///
/// Time steps are indexed from `0` in chronological order.
pub trait MonthlyInput {
    fn time_steps(&self) -> usize;

    fn grid(&self) -> &Grid;

    /// Hybrid coefficients in the level order of the input files.
    fn coefficients(&self) -> &HybridCoefficients;

    /// Surface pressure (Pa).
    fn surface_pressure(&self, step: usize) -> Result<Array2<Float>, DataLoadError>;

    /// 3D field with shape `(level, lat, lon)` in the level order
    /// and units of the input files.
    fn field(&self, variable: StateVariable, step: usize) -> Result<Array3<Float>, DataLoadError>;

    /// Surface geopotential (m^2 s^-2).
    fn surface_geopotential(&self, step: usize) -> Result<Array2<Float>, DataLoadError>;
}

/// Settings shared by the readers.
#[derive(Clone, PartialEq, Debug)]
pub struct ReaderSettings {
    pub names: VariableNames,
    pub sentinel: SentinelPolicy,
    pub surface_pressure_kind: SurfacePressureKind,
    /// Coefficients overriding those stored in the files.
    pub coefficients: Option<HybridCoefficients>,
}

impl ReaderSettings {
    pub fn from_config(config: &Config) -> Result<Self, DataLoadError> {
        let coefficients = match &config.input.coefficients {
            Some(path) => Some(HybridCoefficients::from_csv(path)?),
            None => None,
        };

        Ok(ReaderSettings {
            names: config.dataset.variable_names(),
            sentinel: config.input.sentinel,
            surface_pressure_kind: config.dataset.profile.surface_pressure_kind(),
            coefficients,
        })
    }
}

/// Opens input files of the given month with the reader
/// matching the configured input format.
pub fn open_month(
    config: &Config,
    settings: &ReaderSettings,
    year: i32,
    month: u32,
) -> Result<Box<dyn MonthlyInput>, DataLoadError> {
    let files = config.input.files(year, month);

    debug!("Opening input for {}-{:02}: {:?}", year, month, files);

    let input: Box<dyn MonthlyInput> = match config.input.format(config.dataset.profile) {
        InputFormat::Grib => Box::new(GribMonth::open(files, settings.clone())?),
        InputFormat::Netcdf => Box::new(NetcdfMonth::open(files, settings.clone())?),
    };

    Ok(input)
}

/// Converts the stored surface pressure field to Pa.
fn to_surface_pressure(mut field: Array2<Float>, kind: SurfacePressureKind) -> Array2<Float> {
    if kind == SurfacePressureKind::LogPressure {
        field.mapv_inplace(Float::exp);
    }

    field
}

#[cfg(test)]
mod tests {
    use super::to_surface_pressure;
    use crate::transport::profile::SurfacePressureKind;
    use float_cmp::approx_eq;
    use ndarray::array;

    #[test]
    fn log_surface_pressure_is_exponentiated() {
        let lnsp = array![[101_325.0_f64.ln(), f64::NAN]];
        let ps = to_surface_pressure(lnsp, SurfacePressureKind::LogPressure);

        assert!(approx_eq!(f64, ps[[0, 0]], 101_325.0, epsilon = 1e-8));
        assert!(ps[[0, 1]].is_nan());

        let ps = to_surface_pressure(array![[98_000.0]], SurfacePressureKind::Pressure);
        assert_eq!(ps[[0, 0]], 98_000.0);
    }
}
