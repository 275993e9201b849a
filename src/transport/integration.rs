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

//! Vertical and zonal integration of energy fluxes.
//!
//! Vertical integral of a per-level flux is `Σ flux·dp/g` giving
//! column fluxes in W m^-1. Summing those around a latitude circle,
//! weighted with the zonal grid spacing, gives the total meridional
//! transport across that latitude in W.

use ndarray::{Array1, Array2, Array3, Axis, Zip};

use crate::Float;

/// Vertical integral `Σ_k field·dp/g` over the level axis.
pub fn vertical_integral(field: &Array3<Float>, thickness: &Array3<Float>, gravity: Float) -> Array2<Float> {
    let mut weighted = field * thickness;
    weighted.mapv_inplace(|v| v / gravity);

    weighted.sum_axis(Axis(0))
}

/// Zonal integral `Σ_λ column·dx` around every latitude circle.
pub fn zonal_integral(column: &Array2<Float>, zonal_spacing: &Array1<Float>) -> Array1<Float> {
    let mut total = column.sum_axis(Axis(1));

    Zip::from(&mut total)
        .and(zonal_spacing)
        .for_each(|t, &dx| *t *= dx);

    total
}

/// Transport (W) through the zonal width of every grid cell,
/// summing these along longitude gives [`zonal_integral`].
pub fn point_transport(column: &Array2<Float>, zonal_spacing: &Array1<Float>) -> Array2<Float> {
    let mut point = column.clone();

    for (mut row, &dx) in point.outer_iter_mut().zip(zonal_spacing.iter()) {
        row.mapv_inplace(|v| v * dx);
    }

    point
}

#[cfg(test)]
mod tests {
    use super::{point_transport, vertical_integral, zonal_integral};
    use crate::{
        constants::{EARTH_RADIUS, IFS_GRAVITY},
        transport::{
            energy::energy_terms, grid::Grid, hybrid::HybridCoefficients,
            profile::DatasetProfile, state::AtmosphereState,
        },
    };
    use float_cmp::approx_eq;
    use ndarray::{array, Array1, Array2, Array3, Axis};

    fn coefficients() -> HybridCoefficients {
        HybridCoefficients::new(
            array![0.0, 5000.0, 2000.0, 0.0],
            array![0.0, 0.1, 0.6, 1.0],
        )
        .unwrap()
    }

    fn varying_state() -> AtmosphereState {
        let shape = (3, 5, 4);
        AtmosphereState {
            temperature: Array3::from_shape_fn(shape, |(k, i, _)| 220.0 + 20.0 * k as f64 + i as f64),
            specific_humidity: Array3::from_shape_fn(shape, |(k, _, j)| 0.001 * (k + j) as f64),
            u_wind: Array3::from_shape_fn(shape, |(k, _, j)| 10.0 - k as f64 + j as f64),
            v_wind: Array3::from_shape_fn(shape, |(k, i, j)| (k as f64 - 1.0) * (i + j) as f64),
            geopotential: Array3::from_shape_fn(shape, |(k, _, _)| 9.8 * (10_000.0 - 4000.0 * k as f64)),
            surface_pressure: Array2::from_shape_fn((5, 4), |(i, j)| 98_000.0 + 500.0 * (i + j) as f64),
        }
    }

    #[test]
    fn integral_of_total_is_sum_of_integrals() {
        let state = varying_state();
        let coeffs = coefficients();
        let dp = coeffs.pressure_thickness(&state.surface_pressure);

        let flux = energy_terms(&state, &DatasetProfile::EraInterim.constants())
            .meridional_flux(&state.v_wind);

        let of_total = vertical_integral(&flux.total(), &dp, IFS_GRAVITY);
        let of_parts = flux
            .map(|f| vertical_integral(f, &dp, IFS_GRAVITY))
            .total();

        for (x, y) in of_total.iter().zip(of_parts.iter()) {
            assert!(approx_eq!(f64, *x, *y, epsilon = 1e-9 * x.abs().max(1.0)));
        }
    }

    #[test]
    fn reversed_coefficients_flip_the_sign() {
        // vertically uniform fluxes make the flip exact
        let coeffs = coefficients();
        let ps = Array2::from_elem((5, 4), 100_000.0);
        let flux = Array3::from_elem((3, 5, 4), 2.5e6);

        let dp = coeffs.pressure_thickness(&ps);
        let dp_reversed = coeffs.reversed().pressure_thickness(&ps);

        let column = vertical_integral(&flux, &dp, IFS_GRAVITY);
        let column_reversed = vertical_integral(&flux, &dp_reversed, IFS_GRAVITY);

        for (a, b) in column.iter().zip(column_reversed.iter()) {
            assert!(*a > 0.0);
            assert!(approx_eq!(f64, *a, -*b, epsilon = 1e-6 * a.abs()));
        }

        // the current convention is top to surface
        assert!(coeffs.check_order(100_000.0).is_ok());
        assert!(coeffs.reversed().check_order(100_000.0).is_err());
    }

    #[test]
    fn column_of_uniform_flux() {
        let coeffs = coefficients();
        let ps = Array2::from_elem((5, 4), 100_000.0);
        let dp = coeffs.pressure_thickness(&ps);
        let flux = Array3::from_elem((3, 5, 4), 1.0);

        let column = vertical_integral(&flux, &dp, IFS_GRAVITY);
        assert!(approx_eq!(f64, column[[2, 2]], 100_000.0 / IFS_GRAVITY, epsilon = 1e-9));
    }

    #[test]
    fn zonal_and_point_transport_agree() {
        let grid = Grid::new(
            Array1::linspace(90.0, -90.0, 5),
            Array1::linspace(0.0, 270.0, 4),
        )
        .unwrap();
        let dx = grid.zonal_spacing(EARTH_RADIUS);
        let column = Array2::from_shape_fn((5, 4), |(i, j)| 1.0e9 * (1.0 + i as f64 + j as f64));

        let zonal = zonal_integral(&column, &dx);
        let point = point_transport(&column, &dx);
        let summed = point.sum_axis(Axis(1));

        assert_eq!(zonal[0], 0.0);
        assert_eq!(zonal[4], 0.0);

        for i in 0..5 {
            assert!(approx_eq!(f64, zonal[i], summed[i], epsilon = 1e-6 * zonal[i].abs().max(1.0)));
        }

        let expected = 1.0e9 * (4.0 * 3.0 + 6.0) * dx[2];
        assert!(approx_eq!(f64, zonal[2], expected, epsilon = 1e-6 * expected));
    }
}
