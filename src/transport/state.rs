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

//! Module with the atmospheric state of a single time step.

use ndarray::{Array2, Array3, Axis};

use super::{
    grid::Grid,
    hybrid::{geopotential_on_levels, HybridCoefficients},
    input::{
        sentinel::{
            check_range, HUMIDITY_RANGE, SURFACE_PRESSURE_RANGE, TEMPERATURE_RANGE, WIND_RANGE,
        },
        MonthlyInput,
    },
    profile::{GeopotentialKind, LevelOrder, StateVariable},
};
use crate::{
    constants::DRY_AIR_GAS_CONSTANT,
    errors::{DataLoadError, ValidationError},
    Float,
};

/// Atmospheric state on model levels for one time step.
///
/// 3D fields have shape `(level, lat, lon)` with levels ordered
/// from the top of atmosphere to the surface, whatever the order
/// in the input files was.
#[derive(Clone, PartialEq, Debug)]
pub struct AtmosphereState {
    /// Temperature (K)
    pub temperature: Array3<Float>,
    /// Specific humidity (kg kg^-1)
    pub specific_humidity: Array3<Float>,
    /// Zonal wind (m s^-1)
    pub u_wind: Array3<Float>,
    /// Meridional wind (m s^-1)
    pub v_wind: Array3<Float>,
    /// Geopotential (m^2 s^-2)
    pub geopotential: Array3<Float>,
    /// Surface pressure (Pa)
    pub surface_pressure: Array2<Float>,
}

impl AtmosphereState {
    /// Reads the state of one time step and converts it
    /// to the internal conventions.
    ///
    /// `coefficients` must already be ordered from the top to the surface.
    /// Geopotential height is multiplied by `gravity` and datasets
    /// providing only surface geopotential get it computed on levels.
    pub fn from_input(
        input: &dyn MonthlyInput,
        step: usize,
        coefficients: &HybridCoefficients,
        level_order: LevelOrder,
        geopotential_kind: GeopotentialKind,
        gravity: Float,
    ) -> Result<Self, DataLoadError> {
        let surface_pressure = input.surface_pressure(step)?;
        check_range(&surface_pressure, &SURFACE_PRESSURE_RANGE)?;

        let temperature = input.field(StateVariable::Temperature, step)?;
        check_range(&temperature, &TEMPERATURE_RANGE)?;

        let specific_humidity = input.field(StateVariable::SpecificHumidity, step)?;
        check_range(&specific_humidity, &HUMIDITY_RANGE)?;

        let u_wind = input.field(StateVariable::UWind, step)?;
        check_range(&u_wind, &WIND_RANGE)?;

        let v_wind = input.field(StateVariable::VWind, step)?;
        check_range(&v_wind, &WIND_RANGE)?;

        let geopotential = match geopotential_kind {
            GeopotentialKind::Geopotential => input.field(StateVariable::Geopotential, step)?,
            GeopotentialKind::Height => input.field(StateVariable::Geopotential, step)? * gravity,
            GeopotentialKind::Hypsometric => Array3::zeros(temperature.raw_dim()),
        };

        let mut state = AtmosphereState {
            temperature,
            specific_humidity,
            u_wind,
            v_wind,
            geopotential,
            surface_pressure,
        };

        state.normalize_levels(level_order);
        state.check_shape(input.grid(), coefficients.levels())?;

        if geopotential_kind == GeopotentialKind::Hypsometric {
            let surface_geopotential = input.surface_geopotential(step)?;

            state.geopotential = geopotential_on_levels(
                coefficients,
                &state.temperature,
                &state.specific_humidity,
                &state.surface_pressure,
                &surface_geopotential,
                DRY_AIR_GAS_CONSTANT,
            )?;
        }

        Ok(state)
    }

    /// Checks that all fields share the grid and the level count.
    pub fn check_shape(&self, grid: &Grid, levels: usize) -> Result<(), ValidationError> {
        let (n_lat, n_lon) = grid.shape();
        let expected = (levels, n_lat, n_lon);

        let fields = [
            ("temperature", &self.temperature),
            ("specific humidity", &self.specific_humidity),
            ("u wind", &self.u_wind),
            ("v wind", &self.v_wind),
            ("geopotential", &self.geopotential),
        ];

        for (name, field) in fields {
            if field.dim() != expected {
                return Err(ValidationError::ShapeMismatch(name));
            }
        }

        if self.surface_pressure.dim() != (n_lat, n_lon) {
            return Err(ValidationError::ShapeMismatch("surface pressure"));
        }

        Ok(())
    }

    /// Brings the level axis into the top-to-surface order.
    pub fn normalize_levels(&mut self, order: LevelOrder) {
        if order == LevelOrder::SurfaceToTop {
            for field in [
                &mut self.temperature,
                &mut self.specific_humidity,
                &mut self.u_wind,
                &mut self.v_wind,
                &mut self.geopotential,
            ] {
                field.invert_axis(Axis(0));
            }
        }
    }
}
