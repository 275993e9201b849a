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

//! Barotropic mass correction of the wind field.
//!
//! Reanalysis winds do not conserve the mass of dry air: the
//! vertically integrated dry-air flux divergence does not balance
//! the tendency of the dry-air column mass. Because the energy
//! transport is dominated by large cancelling terms, even a small
//! spurious net mass flux across a latitude circle biases the result.
//!
//! The residual of the dry-air mass budget
//! `R = ∂(ps/g - W)/∂t + ∇·(M - Q)` is removed by a depth-uniform
//! correction wind `(uc, vc)` subtracted from every level:
//!
//! - `vc` carries, across each latitude circle, the residual
//!   integrated over the cap south of it, spread along the circle
//!   and divided by the column mass;
//! - `uc` carries along each latitude circle the zonal anomaly of
//!   the residual, accumulated eastwards, divided by the column mass.
//!
//! Both are closed-form expressions, no iterative solver is used.

use ndarray::{Array2, Array3, Axis, Zip};

use super::{
    finite_difference::divergence, grid::Grid, integration::vertical_integral,
    state::AtmosphereState,
};
use crate::Float;

/// Time tendencies entering the dry-air mass budget.
#[derive(Clone, PartialEq, Debug)]
pub struct BudgetTendencies {
    /// Surface pressure tendency (Pa s^-1)
    pub surface_pressure: Array2<Float>,
    /// Precipitable water tendency (kg m^-2 s^-1)
    pub precipitable_water: Array2<Float>,
}

/// Depth-uniform wind correction (m s^-1).
#[derive(Clone, PartialEq, Debug)]
pub struct CorrectionWind {
    pub uc: Array2<Float>,
    pub vc: Array2<Float>,
}

impl CorrectionWind {
    pub fn zeros(shape: (usize, usize)) -> Self {
        CorrectionWind {
            uc: Array2::zeros(shape),
            vc: Array2::zeros(shape),
        }
    }

    /// Subtracts the correction from every level of the wind field.
    pub fn apply(&self, u_wind: &mut Array3<Float>, v_wind: &mut Array3<Float>) {
        *u_wind -= &self.uc;
        *v_wind -= &self.vc;
    }
}

/// Column mass `Σ dp/g` (kg m^-2).
pub fn column_mass(thickness: &Array3<Float>, gravity: Float) -> Array2<Float> {
    thickness.sum_axis(Axis(0)) / gravity
}

/// Precipitable water `Σ q·dp/g` (kg m^-2).
pub fn precipitable_water(
    specific_humidity: &Array3<Float>,
    thickness: &Array3<Float>,
    gravity: Float,
) -> Array2<Float> {
    vertical_integral(specific_humidity, thickness, gravity)
}

/// Residual of the dry-air mass budget (kg m^-2 s^-1).
pub fn mass_residual(
    state: &AtmosphereState,
    thickness: &Array3<Float>,
    tendencies: &BudgetTendencies,
    grid: &Grid,
    gravity: Float,
    radius: Float,
) -> Array2<Float> {
    let moist_u = &state.u_wind * &state.specific_humidity;
    let moist_v = &state.v_wind * &state.specific_humidity;

    let dry_u = vertical_integral(&state.u_wind, thickness, gravity)
        - vertical_integral(&moist_u, thickness, gravity);
    let dry_v = vertical_integral(&state.v_wind, thickness, gravity)
        - vertical_integral(&moist_v, thickness, gravity);

    let flux_divergence = divergence(&dry_u, &dry_v, grid, radius);

    let mut residual = Array2::zeros(flux_divergence.raw_dim());

    Zip::from(&mut residual)
        .and(&tendencies.surface_pressure)
        .and(&tendencies.precipitable_water)
        .and(&flux_divergence)
        .for_each(|r, &dps, &dw, &div| {
            *r = dps / gravity - dw + div;
        });

    residual
}

/// Computes the correction wind removing the given mass residual.
///
/// Rows with zero zonal grid spacing (first and last latitude)
/// get no correction. Missing (NaN) residuals are left out of
/// the budget, so the correction stays defined everywhere
/// the column mass is.
pub fn correction_wind(
    residual: &Array2<Float>,
    column_mass: &Array2<Float>,
    grid: &Grid,
    radius: Float,
) -> CorrectionWind {
    let (n_lat, n_lon) = residual.dim();
    let dx = grid.zonal_spacing(radius);
    let area = grid.cell_area(radius);

    let mut correction = CorrectionWind::zeros((n_lat, n_lon));

    // meridional part, accumulated from the south
    let mut cap_residual = 0.0;

    for i in grid.south_to_north() {
        cap_residual += known_sum(residual.row(i).iter()) * area[i];

        if dx[i] == 0.0 {
            continue;
        }

        let circumference = dx[i] * n_lon as Float;

        for j in 0..n_lon {
            correction.vc[[i, j]] = cap_residual / circumference / column_mass[[i, j]];
        }
    }

    // zonal part, accumulated from the first longitude eastwards
    for i in 0..n_lat {
        let known = residual.row(i).iter().filter(|r| !r.is_nan()).count();

        if dx[i] == 0.0 || known == 0 {
            continue;
        }

        let zonal_mean = known_sum(residual.row(i).iter()) / known as Float;

        let mut flux = Vec::with_capacity(n_lon);
        let mut accumulated = 0.0;

        for j in 0..n_lon {
            let r = residual[[i, j]];

            if !r.is_nan() {
                accumulated += (r - zonal_mean) * dx[i];
            }

            flux.push(accumulated);
        }

        let flux_mean = flux.iter().sum::<Float>() / n_lon as Float;

        for j in 0..n_lon {
            correction.uc[[i, j]] = (flux[j] - flux_mean) / column_mass[[i, j]];
        }
    }

    correction
}

/// Sum of the values that are not missing.
fn known_sum<'a>(values: impl Iterator<Item = &'a Float>) -> Float {
    values.filter(|v| !v.is_nan()).sum()
}
