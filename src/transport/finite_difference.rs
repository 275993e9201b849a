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

//! Finite-difference operators on the latitude-longitude grid.
//!
//! Central differences are used everywhere, with one-sided
//! differences at the edges of non-periodic axes. Longitude
//! is treated as periodic.

use ndarray::{Array2, Zip};

use super::grid::{neighbours, Grid};
use crate::Float;

/// Horizontal divergence (per m) of a vertically integrated flux
/// `(fu, fv)` on the sphere, in flux form:
/// `∂fu/∂x + ∂(fv·cos φ)/∂y / cos φ`.
///
/// The `cos φ` metric is taken from the zonal grid spacing, so rows
/// whose spacing is zero (first and last latitude) have zero divergence.
pub fn divergence(
    fu: &Array2<Float>,
    fv: &Array2<Float>,
    grid: &Grid,
    radius: Float,
) -> Array2<Float> {
    let (n_lat, n_lon) = fu.dim();
    let dx = grid.zonal_spacing(radius);
    let phi = grid.latitudes.mapv(Float::to_radians);

    let mut div = Array2::zeros((n_lat, n_lon));

    for i in 0..n_lat {
        if dx[i] == 0.0 {
            continue;
        }

        let (lo, hi) = neighbours(i, n_lat);
        let dy = radius * (phi[hi] - phi[lo]);

        for j in 0..n_lon {
            let west = (j + n_lon - 1) % n_lon;
            let east = (j + 1) % n_lon;

            let zonal = (fu[[i, east]] - fu[[i, west]]) / (2.0 * dx[i]);
            let meridional = (fv[[hi, j]] * dx[hi] - fv[[lo, j]] * dx[lo]) / (dy * dx[i]);

            div[[i, j]] = zonal + meridional;
        }
    }

    div
}

/// Time tendency (per s) of every field in a series sampled every
/// `time_step` seconds. A single-element series has zero tendency.
pub fn time_tendency(series: &[Array2<Float>], time_step: Float) -> Vec<Array2<Float>> {
    let n = series.len();

    if n < 2 {
        return series.iter().map(|f| Array2::zeros(f.raw_dim())).collect();
    }

    (0..n)
        .map(|t| {
            let (before, after) = neighbours(t, n);
            let span = (after - before) as Float * time_step;

            let mut tendency = Array2::zeros(series[t].raw_dim());
            Zip::from(&mut tendency)
                .and(&series[before])
                .and(&series[after])
                .for_each(|d, &b, &a| *d = (a - b) / span);

            tendency
        })
        .collect()
}
