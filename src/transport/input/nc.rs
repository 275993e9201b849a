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

//! Reader of model-level data stored in NetCDF files.
//!
//! Variables are looked up by name in all files of the month,
//! so they can be split between files. Packed variables are
//! unpacked with `scale_factor` and `add_offset` after the fill
//! values have been handled.

use log::debug;
use ndarray::{Array1, Array2, Array3, ArrayD, Ix1};
use netcdf::{AttrValue, File, Variable};
use std::path::PathBuf;

use super::{
    sentinel::{self, SentinelPolicy},
    to_surface_pressure, MonthlyInput, ReaderSettings,
};
use crate::{
    errors::DataLoadError,
    transport::{grid::Grid, hybrid::HybridCoefficients, profile::StateVariable},
    Float,
};

const LATITUDE_NAMES: [&str; 2] = ["latitude", "lat"];
const LONGITUDE_NAMES: [&str; 2] = ["longitude", "lon"];

/// One month of data in NetCDF files.
pub struct NetcdfMonth {
    files: Vec<File>,
    settings: ReaderSettings,
    time_steps: usize,
    grid: Grid,
    coefficients: HybridCoefficients,
}

impl NetcdfMonth {
    pub fn open(paths: Vec<PathBuf>, settings: ReaderSettings) -> Result<Self, DataLoadError> {
        let mut files = vec![];

        for path in &paths {
            files.push(netcdf::open(path)?);
        }

        let latitudes = read_coordinate(&files, &LATITUDE_NAMES)?;
        let longitudes = read_coordinate(&files, &LONGITUDE_NAMES)?;
        let grid = Grid::new(latitudes, longitudes)?;

        let time_steps = {
            let temperature = find_variable(&files, &settings.names.temperature)?;
            let dimensions = temperature.dimensions();

            if dimensions.len() != 4 {
                return Err(DataLoadError::DataNotSufficient(
                    "Temperature in NetCDF input must have time, level, lat and lon dimensions",
                ));
            }

            dimensions[0].len()
        };

        let coefficients = match &settings.coefficients {
            Some(coefficients) => coefficients.clone(),
            None => read_coefficients(&files, &settings)?,
        };

        debug!(
            "NetCDF input has {} time steps on {}x{} grid and {} levels",
            time_steps,
            grid.latitudes.len(),
            grid.longitudes.len(),
            coefficients.levels()
        );

        Ok(NetcdfMonth {
            files,
            settings,
            time_steps,
            grid,
            coefficients,
        })
    }

    /// Reads one time step of a 2D variable. Variables without
    /// the time dimension are read whole.
    fn read_2d(
        &self,
        name: &str,
        step: usize,
        policy: SentinelPolicy,
    ) -> Result<Array2<Float>, DataLoadError> {
        let var = find_variable(&self.files, name)?;
        let (n_lat, n_lon) = self.grid.shape();

        let raw = match var.dimensions().len() {
            2 => var.values_arr::<Float, _>(..)?,
            3 => var.values_arr::<Float, _>(([step, 0, 0], [1, n_lat, n_lon]))?,
            _ => return Err(DataLoadError::DataNotSufficient(
                "2D NetCDF variable must have lat and lon and optionally time dimensions",
            )),
        };

        let field = unpack(&var, raw, policy, name)?;

        Ok(field.into_shape((n_lat, n_lon))?)
    }
}

impl MonthlyInput for NetcdfMonth {
    fn time_steps(&self) -> usize {
        self.time_steps
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn coefficients(&self) -> &HybridCoefficients {
        &self.coefficients
    }

    fn surface_pressure(&self, step: usize) -> Result<Array2<Float>, DataLoadError> {
        let field = self.read_2d(
            &self.settings.names.surface_pressure,
            step,
            self.settings.sentinel.for_surface_pressure(),
        )?;

        Ok(to_surface_pressure(field, self.settings.surface_pressure_kind))
    }

    fn field(&self, variable: StateVariable, step: usize) -> Result<Array3<Float>, DataLoadError> {
        let name = self.settings.names.name_of(variable);
        let var = find_variable(&self.files, name)?;

        let (n_lat, n_lon) = self.grid.shape();
        let n_lev = self.coefficients.levels();

        if step >= self.time_steps {
            return Err(DataLoadError::DataNotSufficient(
                "Requested time step is not present in NetCDF input",
            ));
        }

        let raw = var.values_arr::<Float, _>(([step, 0, 0, 0], [1, n_lev, n_lat, n_lon]))?;
        let field = unpack(&var, raw, self.settings.sentinel, name)?;

        Ok(field.into_shape((n_lev, n_lat, n_lon))?)
    }

    fn surface_geopotential(&self, step: usize) -> Result<Array2<Float>, DataLoadError> {
        self.read_2d(&self.settings.names.geopotential, step, self.settings.sentinel)
    }
}

fn find_variable<'f>(files: &'f [File], name: &str) -> Result<Variable<'f>, DataLoadError> {
    files
        .iter()
        .find_map(|file| file.variable(name))
        .ok_or_else(|| DataLoadError::MissingVariable(name.to_string()))
}

fn read_1d(files: &[File], name: &str) -> Result<Array1<Float>, DataLoadError> {
    let var = find_variable(files, name)?;
    let values = var.values_arr::<Float, _>(..)?;

    Ok(values.into_dimensionality::<Ix1>()?)
}

fn read_coordinate(files: &[File], names: &[&str]) -> Result<Array1<Float>, DataLoadError> {
    for name in names {
        if files.iter().any(|file| file.variable(name).is_some()) {
            return read_1d(files, name);
        }
    }

    Err(DataLoadError::MissingVariable(names.join("|")))
}

fn read_coefficients(
    files: &[File],
    settings: &ReaderSettings,
) -> Result<HybridCoefficients, DataLoadError> {
    match (&settings.names.hybrid_a, &settings.names.hybrid_b) {
        (Some(a_name), Some(b_name)) => Ok(HybridCoefficients::new(
            read_1d(files, a_name)?,
            read_1d(files, b_name)?,
        )?),
        _ => Err(DataLoadError::DataNotSufficient(
            "NetCDF input needs hybrid coefficients from a CSV table or from variables in files",
        )),
    }
}

/// Reads a numeric attribute of the variable as a float.
fn numeric_attribute(var: &Variable, name: &str) -> Result<Option<Float>, DataLoadError> {
    let attribute = match var.attribute(name) {
        Some(attribute) => attribute,
        None => return Ok(None),
    };

    let value = match attribute.value()? {
        AttrValue::Double(v) => Some(v),
        AttrValue::Float(v) => Some(Float::from(v)),
        AttrValue::Short(v) => Some(Float::from(v)),
        AttrValue::Ushort(v) => Some(Float::from(v)),
        AttrValue::Int(v) => Some(Float::from(v)),
        AttrValue::Schar(v) => Some(Float::from(v)),
        AttrValue::Uchar(v) => Some(Float::from(v)),
        AttrValue::Doubles(v) => v.first().copied(),
        AttrValue::Floats(v) => v.first().map(|&f| Float::from(f)),
        _ => None,
    };

    Ok(value)
}

/// Handles fill values of the raw data and applies packing attributes.
fn unpack(
    var: &Variable,
    mut raw: ArrayD<Float>,
    policy: SentinelPolicy,
    name: &str,
) -> Result<ArrayD<Float>, DataLoadError> {
    let fill_value = match numeric_attribute(var, "_FillValue")? {
        Some(fill) => Some(fill),
        None => numeric_attribute(var, "missing_value")?,
    };

    // substituted zeros are physical values, not packed ones
    let packed_policy = match policy {
        SentinelPolicy::Zero => SentinelPolicy::Propagate,
        other => other,
    };

    sentinel::apply(&mut raw, fill_value, packed_policy, name)?;

    let scale = numeric_attribute(var, "scale_factor")?.unwrap_or(1.0);
    let offset = numeric_attribute(var, "add_offset")?.unwrap_or(0.0);

    if scale != 1.0 || offset != 0.0 {
        raw.mapv_inplace(|v| v * scale + offset);
    }

    if policy == SentinelPolicy::Zero {
        raw.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::NetcdfMonth;
    use crate::{
        errors::{DataLoadError, ValidationError},
        transport::{
            input::{sentinel::SentinelPolicy, MonthlyInput, ReaderSettings},
            profile::{DatasetProfile, StateVariable, SurfacePressureKind},
        },
    };
    use ndarray::array;
    use std::path::{Path, PathBuf};

    /// Writes a month with two time steps, two levels and a 3x2 grid.
    /// Temperature has a `missing_value` at step 1, surface pressure is
    /// packed into shorts with a `_FillValue` at step 1.
    fn write_month(path: &Path) {
        let mut file = netcdf::create(path).unwrap();

        file.add_dimension("time", 2).unwrap();
        file.add_dimension("lev", 2).unwrap();
        file.add_dimension("ilev", 3).unwrap();
        file.add_dimension("lat", 3).unwrap();
        file.add_dimension("longitude", 2).unwrap();

        let mut lat = file.add_variable::<f64>("lat", &["lat"]).unwrap();
        lat.put_values(&[90.0, 0.0, -90.0], ..).unwrap();

        let mut lon = file.add_variable::<f64>("longitude", &["longitude"]).unwrap();
        lon.put_values(&[0.0, 180.0], ..).unwrap();

        let mut hyai = file.add_variable::<f64>("hyai", &["ilev"]).unwrap();
        hyai.put_values(&[0.0, 5000.0, 0.0], ..).unwrap();

        let mut hybi = file.add_variable::<f64>("hybi", &["ilev"]).unwrap();
        hybi.put_values(&[0.0, 0.5, 1.0], ..).unwrap();

        let mut temperature: Vec<f64> = (0..24).map(|i| 250.0 + i as f64).collect();
        temperature[15] = -999.0;

        let mut t = file
            .add_variable::<f64>("t", &["time", "lev", "lat", "longitude"])
            .unwrap();
        t.add_attribute("missing_value", -999.0).unwrap();
        t.put_values(&temperature, ..).unwrap();

        let mut packed: Vec<i16> = (0..12).map(|i| i * 100 - 500).collect();
        packed[10] = i16::MAX;

        let mut ps = file
            .add_variable::<i16>("ps", &["time", "lat", "longitude"])
            .unwrap();
        ps.set_fill_value(i16::MAX).unwrap();
        ps.add_attribute("scale_factor", 2.0).unwrap();
        ps.add_attribute("add_offset", 100_000.0).unwrap();
        ps.put_values(&packed, ..).unwrap();

        let mut z = file.add_variable::<f64>("z", &["lat", "longitude"]).unwrap();
        z.put_values(&[0.0, 10.0, 20.0, 30.0, 40.0, 50.0], ..).unwrap();
    }

    fn open(name: &str, policy: SentinelPolicy) -> (NetcdfMonth, PathBuf) {
        let path = std::env::temp_dir().join(format!("amet_nc_reader_{}.nc", name));
        write_month(&path);

        let mut names = DatasetProfile::EcEarth.variable_names();
        names.surface_pressure = "ps".to_string();

        let settings = ReaderSettings {
            names,
            sentinel: policy,
            surface_pressure_kind: SurfacePressureKind::Pressure,
            coefficients: None,
        };

        (NetcdfMonth::open(vec![path.clone()], settings).unwrap(), path)
    }

    #[test]
    fn coordinates_and_coefficients_are_read() {
        let (month, path) = open("layout", SentinelPolicy::Propagate);

        assert_eq!(month.time_steps(), 2);
        assert_eq!(month.grid().latitudes, array![90.0, 0.0, -90.0]);
        assert_eq!(month.grid().longitudes, array![0.0, 180.0]);
        assert_eq!(month.coefficients().a, array![0.0, 5000.0, 0.0]);
        assert_eq!(month.coefficients().b, array![0.0, 0.5, 1.0]);

        // surface geopotential has no time dimension
        let z = month.surface_geopotential(1).unwrap();
        assert_eq!(z, array![[0.0, 10.0], [20.0, 30.0], [40.0, 50.0]]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn packed_values_are_unpacked_after_fill_values() {
        let (month, path) = open("packed", SentinelPolicy::Propagate);

        let ps = month.surface_pressure(0).unwrap();
        assert_eq!(ps[[0, 0]], 99_000.0);
        assert_eq!(ps[[2, 1]], 100_000.0);

        let ps = month.surface_pressure(1).unwrap();
        assert_eq!(ps[[0, 1]], 100_400.0);
        assert!(ps[[2, 0]].is_nan());
        assert_eq!(ps.iter().filter(|p| p.is_nan()).count(), 1);

        let t = month.field(StateVariable::Temperature, 1).unwrap();
        assert_eq!(t.dim(), (2, 3, 2));
        assert_eq!(t[[0, 0, 0]], 262.0);
        assert!(t[[0, 1, 1]].is_nan());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn fill_values_follow_the_policy() {
        let (month, path) = open("zero", SentinelPolicy::Zero);

        let t = month.field(StateVariable::Temperature, 1).unwrap();
        assert_eq!(t[[0, 1, 1]], 0.0);

        // zero is never a surface pressure, it stays missing
        let ps = month.surface_pressure(1).unwrap();
        assert!(ps[[2, 0]].is_nan());

        std::fs::remove_file(&path).unwrap();

        let (month, path) = open("reject", SentinelPolicy::Reject);

        assert!(month.field(StateVariable::Temperature, 0).is_ok());
        assert!(matches!(
            month.field(StateVariable::Temperature, 1),
            Err(DataLoadError::Validation(ValidationError::MissingValues { count: 1, .. }))
        ));
        assert!(matches!(
            month.surface_pressure(1),
            Err(DataLoadError::Validation(ValidationError::MissingValues { .. }))
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
