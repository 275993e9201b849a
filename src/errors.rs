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

use thiserror::Error;

use crate::Float;

#[derive(Error, Debug)]
pub enum AmetError {
    #[error("Error while reading config.yaml: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while loading input data: {0}")]
    DataLoad(#[from] DataLoadError),

    #[error("Input data failed validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("Error while writing output: {0}")]
    Output(#[from] OutputError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Error while handling output directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output directory is not usable: {0}")]
    FaultyOutput(&'static str),

    #[error("Computation for {0}-{1:02} failed: {2}")]
    TaskFailed(i32, u32, Box<AmetError>),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open config.yaml: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize config.yaml: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds: {0}")]
    OutOfBounds(&'static str),
}

#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("Error while reading GRIB file: {0}")]
    Codes(#[from] eccodes::errors::CodesError),

    #[error("Error while reading NetCDF file: {0}")]
    NetCdf(#[from] netcdf::error::Error),

    #[error("Input array has unexpected shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Variable {0} is missing in input file")]
    MissingVariable(String),

    #[error("Input data is not sufficient: {0}")]
    DataNotSufficient(&'static str),

    #[error("Key {0} has incorrect type")]
    IncorrectKeyType(&'static str),

    #[error("Cannot read coefficients table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot access input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input data is invalid: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{count} values of {variable} are outside of [{min}, {max}]")]
    OutOfRange {
        variable: &'static str,
        count: usize,
        min: Float,
        max: Float,
    },

    #[error("{count} values of {variable} are missing")]
    MissingValues { variable: String, count: usize },

    #[error("Hybrid coefficients are not ordered from the top of atmosphere to the surface")]
    LevelOrdering,

    #[error("Hybrid coefficients tables have lengths {0} and {1}, expected equal and at least 2")]
    CoefficientMismatch(usize, usize),

    #[error("Field {0} does not match the grid or level count")]
    ShapeMismatch(&'static str),

    #[error("Thermodynamic computation rejected inputs: {0}")]
    Floccus(#[from] floccus::error_wrapper::InputError),
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Cannot write NetCDF output: {0}")]
    NetCdf(#[from] netcdf::error::Error),

    #[error("Cannot write summary: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot create output file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Summary cannot be computed: {0}")]
    Search(#[from] SearchError),

    #[error("Trend cannot be computed: {0}")]
    Statistics(&'static str),

    #[error("Grid of {0}-{1:02} differs from the grid of other months")]
    GridMismatch(i32, u32),

    #[error("No valid dates for retrieval request of {0}-{1:02}")]
    RequestDate(i32, u32),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("Searched array is empty")]
    EmptyArray,

    #[error("Searched value is out of array bounds")]
    OutOfBounds,
}
