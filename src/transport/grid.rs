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

//! Module with the horizontal grid of the input data
//! and the geometric quantities derived from it.

use std::{cmp::Ordering, f64::consts::PI};

use ndarray::{Array1, Zip};

use crate::{errors::ValidationError, Float};

/// Regular latitude-longitude grid of the input fields.
///
/// Latitudes are kept in the order of the input file
/// (reanalyses commonly store them from north to south)
/// so every latitude-dependent computation uses signed
/// differences or [`Grid::south_to_north`].
#[derive(Clone, PartialEq, Debug)]
pub struct Grid {
    pub latitudes: Array1<Float>,
    pub longitudes: Array1<Float>,
}

impl Grid {
    pub fn new(latitudes: Array1<Float>, longitudes: Array1<Float>) -> Result<Self, ValidationError> {
        if latitudes.len() < 3 || longitudes.is_empty() {
            return Err(ValidationError::ShapeMismatch("grid axes"));
        }

        let out_of_range = latitudes
            .iter()
            .filter(|lat| !(-90.0..=90.0).contains(*lat))
            .count();

        if out_of_range > 0 {
            return Err(ValidationError::OutOfRange {
                variable: "latitude",
                count: out_of_range,
                min: -90.0,
                max: 90.0,
            });
        }

        Ok(Grid {
            latitudes,
            longitudes,
        })
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.latitudes.len(), self.longitudes.len())
    }

    /// Zonal grid spacing (m) at each latitude: `2πR·cos(lat)/n_lon`.
    ///
    /// The first and last latitude rows are always set to exactly
    /// zero, whether or not the grid actually reaches the poles.
    /// Every zonal sum and every correction term is then void
    /// on those rows.
    pub fn zonal_spacing(&self, radius: Float) -> Array1<Float> {
        let n_lon = self.longitudes.len() as Float;
        let mut dx = self
            .latitudes
            .mapv(|lat| 2.0 * PI * radius * lat.to_radians().cos() / n_lon);

        let last = dx.len() - 1;
        dx[0] = 0.0;
        dx[last] = 0.0;

        dx
    }

    /// Meridional grid spacing (m) at each latitude, as the
    /// absolute central difference of latitudes (one-sided
    /// at the edges).
    pub fn meridional_spacing(&self, radius: Float) -> Array1<Float> {
        let phi = self.latitudes.mapv(Float::to_radians);
        let n = phi.len();
        let mut dy = Array1::zeros(n);

        for i in 0..n {
            let (lo, hi) = neighbours(i, n);
            dy[i] = radius * (phi[hi] - phi[lo]).abs() / (hi - lo) as Float;
        }

        dy
    }

    /// Area (m^2) of a grid cell at each latitude.
    pub fn cell_area(&self, radius: Float) -> Array1<Float> {
        let mut area = self.zonal_spacing(radius);

        Zip::from(&mut area)
            .and(&self.meridional_spacing(radius))
            .for_each(|a, &dy| *a *= dy);

        area
    }

    /// Latitude indices ordered from the southernmost to the northernmost.
    pub fn south_to_north(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.latitudes.len()).collect();
        order.sort_by(|&a, &b| {
            self.latitudes[a]
                .partial_cmp(&self.latitudes[b])
                .unwrap_or(Ordering::Equal)
        });
        order
    }
}

/// Indices of the neighbours used for a central difference
/// at index `i`, falling back to one-sided differences at the edges.
pub fn neighbours(i: usize, n: usize) -> (usize, usize) {
    if i == 0 {
        (0, 1)
    } else if i == n - 1 {
        (n - 2, n - 1)
    } else {
        (i - 1, i + 1)
    }
}
