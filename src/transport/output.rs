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

//! Module collecting monthly results into time series
//! and writing them to a NetCDF file.

use log::info;
use ndarray::{s, Array, Array4, Dimension, Ix3, Ix4};
use std::path::Path;

use super::{
    energy::{EnergyComponents, COMPONENT_NAMES},
    grid::Grid,
    month::MonthlyTransport,
};
use crate::{
    constants::{MONTHS_PER_YEAR, TERA},
    errors::{OutputError, SearchError},
    Float,
};

const TRANSPORT_UNITS: &str = "tera watt";

/// Transport for every (year, month) of the computed period.
///
/// Months that were not computed stay NaN.
#[derive(Clone, PartialEq, Debug)]
pub struct TransportSeries {
    pub years: Vec<i32>,
    pub grid: Grid,
    /// Zonal totals with shape `(year, month, lat)` (W)
    pub zonal: EnergyComponents<Ix3>,
    /// Transport through grid cells with shape `(year, month, lat, lon)` (W)
    pub point: Option<EnergyComponents<Ix4>>,
    /// Mean correction winds `(uc, vc)` with shape `(year, month, lat, lon)` (m s^-1)
    pub correction: Option<(Array4<Float>, Array4<Float>)>,
}

impl TransportSeries {
    pub fn new(years: Vec<i32>, grid: Grid, point_output: bool, correction_output: bool) -> Self {
        let (n_lat, n_lon) = grid.shape();
        let n_years = years.len();

        let point = if point_output {
            Some(EnergyComponents::from_elem(
                Ix4(n_years, MONTHS_PER_YEAR, n_lat, n_lon),
                Float::NAN,
            ))
        } else {
            None
        };

        let correction = if correction_output {
            let shape = (n_years, MONTHS_PER_YEAR, n_lat, n_lon);
            Some((
                Array4::from_elem(shape, Float::NAN),
                Array4::from_elem(shape, Float::NAN),
            ))
        } else {
            None
        };

        TransportSeries {
            zonal: EnergyComponents::from_elem(Ix3(n_years, MONTHS_PER_YEAR, n_lat), Float::NAN),
            years,
            grid,
            point,
            correction,
        }
    }

    fn position(&self, year: i32, month: u32) -> Result<(usize, usize), SearchError> {
        let year_index = self
            .years
            .iter()
            .position(|&y| y == year)
            .ok_or(SearchError::OutOfBounds)?;

        if !(1..=MONTHS_PER_YEAR as u32).contains(&month) {
            return Err(SearchError::OutOfBounds);
        }

        Ok((year_index, month as usize - 1))
    }

    /// Stores the result of one month.
    pub fn insert(&mut self, transport: &MonthlyTransport) -> Result<(), OutputError> {
        let (y, m) = self.position(transport.year, transport.month)?;

        if transport.grid != self.grid {
            return Err(OutputError::GridMismatch(transport.year, transport.month));
        }

        for (target, source) in self
            .zonal
            .as_array_mut()
            .into_iter()
            .zip(transport.zonal.as_array())
        {
            target.slice_mut(s![y, m, ..]).assign(source);
        }

        if let (Some(target), Some(source)) = (self.point.as_mut(), transport.point.as_ref()) {
            for (target, source) in target.as_array_mut().into_iter().zip(source.as_array()) {
                target.slice_mut(s![y, m, .., ..]).assign(source);
            }
        }

        if let (Some((uc, vc)), Some(source)) =
            (self.correction.as_mut(), transport.correction.as_ref())
        {
            uc.slice_mut(s![y, m, .., ..]).assign(&source.uc);
            vc.slice_mut(s![y, m, .., ..]).assign(&source.vc);
        }

        Ok(())
    }

    /// Writes the series to a NetCDF file, transport in TW.
    pub fn write_netcdf(&self, path: &Path, dataset: &str) -> Result<(), OutputError> {
        info!("Writing transport series to {}", path.display());

        let mut file = netcdf::create(path)?;

        file.add_attribute(
            "title",
            "Atmospheric meridional energy transport on model levels",
        )?;
        file.add_attribute("dataset", dataset)?;

        let has_longitude = self.point.is_some() || self.correction.is_some();

        file.add_dimension("year", self.years.len())?;
        file.add_dimension("month", MONTHS_PER_YEAR)?;
        file.add_dimension("latitude", self.grid.latitudes.len())?;

        if has_longitude {
            file.add_dimension("longitude", self.grid.longitudes.len())?;
        }

        let mut year = file.add_variable::<i32>("year", &["year"])?;
        year.add_attribute("long_name", "year")?;
        year.put_values(&self.years, ..)?;

        let months: Vec<i32> = (1..=MONTHS_PER_YEAR as i32).collect();
        let mut month = file.add_variable::<i32>("month", &["month"])?;
        month.add_attribute("long_name", "month")?;
        month.put_values(&months, ..)?;

        let mut latitude = file.add_variable::<Float>("latitude", &["latitude"])?;
        latitude.add_attribute("units", "degrees_north")?;
        latitude.add_attribute("long_name", "latitude")?;
        latitude.put_values(&flatten(&self.grid.latitudes), ..)?;

        if has_longitude {
            let mut longitude = file.add_variable::<Float>("longitude", &["longitude"])?;
            longitude.add_attribute("units", "degrees_east")?;
            longitude.add_attribute("long_name", "longitude")?;
            longitude.put_values(&flatten(&self.grid.longitudes), ..)?;
        }

        let zonal_dims = ["year", "month", "latitude"];

        put_transport(
            &mut file,
            "E",
            "total meridional energy transport",
            &zonal_dims,
            &self.zonal.total(),
        )?;

        for (name, component) in COMPONENT_NAMES.iter().zip(self.zonal.as_array()) {
            put_transport(
                &mut file,
                &format!("E_{}", name),
                &format!("meridional transport of {} energy", long_name(name)),
                &zonal_dims,
                component,
            )?;
        }

        let point_dims = ["year", "month", "latitude", "longitude"];

        if let Some(point) = &self.point {
            put_transport(
                &mut file,
                "E_point",
                "total meridional energy transport through grid cells",
                &point_dims,
                &point.total(),
            )?;

            for (name, component) in COMPONENT_NAMES.iter().zip(point.as_array()) {
                put_transport(
                    &mut file,
                    &format!("E_point_{}", name),
                    &format!(
                        "meridional transport of {} energy through grid cells",
                        long_name(name)
                    ),
                    &point_dims,
                    component,
                )?;
            }
        }

        if let Some((uc, vc)) = &self.correction {
            for (name, wind, description) in [
                ("uc", uc, "zonal barotropic correction wind"),
                ("vc", vc, "meridional barotropic correction wind"),
            ] {
                let mut var = file.add_variable::<Float>(name, &point_dims)?;
                var.add_attribute("units", "m/s")?;
                var.add_attribute("long_name", description)?;
                var.put_values(&flatten(wind), ..)?;
            }
        }

        Ok(())
    }
}

fn long_name(component: &str) -> &'static str {
    match component {
        "cpT" => "internal",
        "Lvq" => "latent",
        "gz" => "geopotential",
        _ => "kinetic",
    }
}

/// Values in the logical (row-major) order.
fn flatten<D: Dimension>(array: &Array<Float, D>) -> Vec<Float> {
    array.iter().copied().collect()
}

fn put_transport<D: Dimension>(
    file: &mut netcdf::MutableFile,
    name: &str,
    description: &str,
    dims: &[&str],
    transport: &Array<Float, D>,
) -> Result<(), OutputError> {
    let mut var = file.add_variable::<Float>(name, dims)?;
    var.add_attribute("units", TRANSPORT_UNITS)?;
    var.add_attribute("long_name", description)?;
    var.put_values(&flatten(&transport.mapv(|v| v / TERA)), ..)?;

    Ok(())
}
