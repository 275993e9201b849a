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

//! Module with the computation of the transport for one month.
//!
//! The mass correction needs time tendencies of surface pressure
//! and precipitable water, so the month is read twice: first
//! only the 2D budget terms of every time step, then the full
//! state of each time step which is reduced to zonal totals
//! and accumulated into the monthly mean right away.

use log::{debug, info};
use ndarray::{Axis, Ix1, Ix2};

use super::{
    configuration::Config,
    correction::{
        column_mass, correction_wind, mass_residual, precipitable_water, BudgetTendencies,
        CorrectionWind,
    },
    energy::{energy_terms, EnergyComponents},
    finite_difference::time_tendency,
    grid::Grid,
    hybrid::HybridCoefficients,
    input::MonthlyInput,
    integration::{point_transport, vertical_integral, zonal_integral},
    profile::{GeopotentialKind, LevelOrder, PhysicalConstants, StateVariable},
    state::AtmosphereState,
};
use crate::{
    constants::{EARTH_RADIUS, SECONDS_PER_HOUR},
    errors::{AmetError, DataLoadError, ValidationError},
    Float,
};

/// Surface pressure for which the ordering of hybrid
/// coefficients is checked (Pa).
const REFERENCE_SURFACE_PRESSURE: Float = 101_325.0;

/// Settings of the monthly computation resolved from
/// the configuration and the dataset profile.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct MonthSettings {
    pub level_order: LevelOrder,
    pub geopotential_kind: GeopotentialKind,
    pub constants: PhysicalConstants,
    /// Interval between time steps (s)
    pub time_step: Float,
    pub mass_correction: bool,
    pub point_output: bool,
    pub correction_output: bool,
}

impl MonthSettings {
    pub fn from_config(config: &Config) -> Self {
        let profile = config.dataset.profile;

        MonthSettings {
            level_order: config.dataset.level_order(),
            geopotential_kind: config.dataset.geopotential_kind(),
            constants: config.dataset.constants(),
            time_step: config.input.time_step_hours(profile) * SECONDS_PER_HOUR,
            mass_correction: config.computation.mass_correction,
            point_output: config.computation.point_output,
            correction_output: config.output.write_correction_winds,
        }
    }
}

/// Monthly mean transport.
#[derive(Clone, PartialEq, Debug)]
pub struct MonthlyTransport {
    pub year: i32,
    pub month: u32,
    pub grid: Grid,
    /// Zonally integrated transport per latitude (W)
    pub zonal: EnergyComponents<Ix1>,
    /// Transport through every grid cell (W)
    pub point: Option<EnergyComponents<Ix2>>,
    /// Mean correction wind (m s^-1)
    pub correction: Option<CorrectionWind>,
}

/// Computes the monthly mean meridional energy transport.
pub fn process_month(
    input: &dyn MonthlyInput,
    settings: &MonthSettings,
    year: i32,
    month: u32,
) -> Result<MonthlyTransport, AmetError> {
    let steps = input.time_steps();

    if steps == 0 {
        return Err(DataLoadError::DataNotSufficient("Input contains no time steps").into());
    }

    info!("Computing transport for {}-{:02} from {} time steps", year, month, steps);

    let grid = input.grid();
    let gravity = settings.constants.gravity;
    let dx = grid.zonal_spacing(EARTH_RADIUS);

    let coefficients = match settings.level_order {
        LevelOrder::TopToSurface => input.coefficients().clone(),
        LevelOrder::SurfaceToTop => input.coefficients().reversed(),
    };

    coefficients.check_order(REFERENCE_SURFACE_PRESSURE)?;

    let tendencies = if settings.mass_correction {
        Some(budget_tendencies(input, &coefficients, settings)?)
    } else {
        None
    };

    let shape = grid.shape();
    let weight = 1.0 / steps as Float;

    let mut zonal = EnergyComponents::zeros(Ix1(shape.0));
    let mut point = if settings.point_output {
        Some(EnergyComponents::zeros(Ix2(shape.0, shape.1)))
    } else {
        None
    };
    let mut correction_mean = if settings.correction_output {
        Some(CorrectionWind::zeros(shape))
    } else {
        None
    };

    for step in 0..steps {
        let mut state = AtmosphereState::from_input(
            input,
            step,
            &coefficients,
            settings.level_order,
            settings.geopotential_kind,
            gravity,
        )?;

        let thickness = coefficients.pressure_thickness(&state.surface_pressure);

        // kinetic energy of the resolved flow, before the correction
        let energy = energy_terms(&state, &settings.constants);

        let correction = match &tendencies {
            Some(tendencies) => {
                let residual =
                    mass_residual(&state, &thickness, &tendencies[step], grid, gravity, EARTH_RADIUS);
                let mass = column_mass(&thickness, gravity);

                correction_wind(&residual, &mass, grid, EARTH_RADIUS)
            }
            None => CorrectionWind::zeros(shape),
        };

        correction.apply(&mut state.u_wind, &mut state.v_wind);

        let column = energy
            .meridional_flux(&state.v_wind)
            .map(|flux| vertical_integral(flux, &thickness, gravity));

        zonal.accumulate(&column.map(|c| zonal_integral(c, &dx)), weight);

        if let Some(point) = point.as_mut() {
            point.accumulate(&column.map(|c| point_transport(c, &dx)), weight);
        }

        if let Some(mean) = correction_mean.as_mut() {
            mean.uc.scaled_add(weight, &correction.uc);
            mean.vc.scaled_add(weight, &correction.vc);
        }

        debug!(
            "{}-{:02} step {}: max |vc| {:.3e} m/s",
            year,
            month,
            step,
            correction.vc.iter().fold(0.0, |m: Float, v| m.max(v.abs()))
        );
    }

    Ok(MonthlyTransport {
        year,
        month,
        grid: grid.clone(),
        zonal,
        point,
        correction: correction_mean,
    })
}

/// Reads surface pressure and humidity of every time step
/// and computes the tendencies of the mass budget.
fn budget_tendencies(
    input: &dyn MonthlyInput,
    coefficients: &HybridCoefficients,
    settings: &MonthSettings,
) -> Result<Vec<BudgetTendencies>, AmetError> {
    let gravity = settings.constants.gravity;

    let mut surface_pressure = vec![];
    let mut water = vec![];

    for step in 0..input.time_steps() {
        let ps = input.surface_pressure(step)?;
        let mut q = input.field(StateVariable::SpecificHumidity, step)?;

        if settings.level_order == LevelOrder::SurfaceToTop {
            q.invert_axis(Axis(0));
        }

        if q.dim() != (coefficients.levels(), ps.dim().0, ps.dim().1) {
            return Err(ValidationError::ShapeMismatch("specific humidity").into());
        }

        let thickness = coefficients.pressure_thickness(&ps);

        water.push(precipitable_water(&q, &thickness, gravity));
        surface_pressure.push(ps);
    }

    let ps_tendency = time_tendency(&surface_pressure, settings.time_step);
    let water_tendency = time_tendency(&water, settings.time_step);

    Ok(ps_tendency
        .into_iter()
        .zip(water_tendency)
        .map(|(surface_pressure, precipitable_water)| BudgetTendencies {
            surface_pressure,
            precipitable_water,
        })
        .collect())
}
