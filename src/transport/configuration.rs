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

//! Module responsible for parsing and checking the configuration file.
//!
//! The configuration file uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! and `serde` to enforce strong typing and automatic type checking.
//!
//! The structures and their fields in this module directly correspond to
//! the fields inside `config.yaml` so you can check this documentation
//! for more details how to set the config file.

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{
    input::sentinel::SentinelPolicy,
    profile::{
        DatasetProfile, GeopotentialKind, InputFormat, LevelOrder, PhysicalConstants,
        VariableNames,
    },
};
use crate::{constants::MONTHS_PER_YEAR, errors::ConfigError, Float};

/// Fields selecting the reanalysis and its conventions.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Dataset {
    /// Reanalysis the input comes from, one of `era-interim`,
    /// `merra2`, `jra55` or `ec-earth`.
    pub profile: DatasetProfile,

    /// _(Optional)_ Overrides the order of model levels in input files.
    ///
    /// Defaults to the native order of the dataset.
    #[serde(default)]
    pub level_order: Option<LevelOrder>,

    /// _(Optional)_ Overrides how geopotential on model levels is obtained,
    /// one of `geopotential`, `height` or `hypsometric`.
    ///
    /// Defaults to what the dataset provides.
    #[serde(default)]
    pub geopotential: Option<GeopotentialKind>,

    /// _(Optional)_ Overrides names of variables in input files.
    #[serde(default)]
    pub variables: Option<VariableNames>,

    /// _(Optional)_ Overrides physical constants of the reanalysis model.
    #[serde(default)]
    pub constants: Option<PhysicalConstants>,
}

impl Dataset {
    pub fn level_order(&self) -> LevelOrder {
        self.level_order
            .unwrap_or_else(|| self.profile.level_order())
    }

    pub fn geopotential_kind(&self) -> GeopotentialKind {
        self.geopotential
            .unwrap_or_else(|| self.profile.geopotential_kind())
    }

    pub fn variable_names(&self) -> VariableNames {
        self.variables
            .clone()
            .unwrap_or_else(|| self.profile.variable_names())
    }

    pub fn constants(&self) -> PhysicalConstants {
        self.constants.unwrap_or_else(|| self.profile.constants())
    }

    /// Checks if overridden constants are physically meaningful.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        let constants = self.constants();

        if constants.specific_heat <= 0.0 || constants.latent_heat <= 0.0 {
            return Err(ConfigError::OutOfBounds(
                "Specific and latent heat must be positive",
            ));
        }

        if !(9.7..9.9).contains(&constants.gravity) {
            return Err(ConfigError::OutOfBounds(
                "Gravitational acceleration must be between 9.7 and 9.9 m/s^2",
            ));
        }

        Ok(())
    }
}

/// Fields with the computed period.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Period {
    /// First year of the computation.
    pub start_year: i32,

    /// Last year of the computation (inclusive).
    pub end_year: i32,

    /// _(Optional)_ Months computed in every year.
    ///
    /// Defaults to all twelve months.
    #[serde(default = "Period::default_months")]
    pub months: Vec<u32>,
}

impl Period {
    fn default_months() -> Vec<u32> {
        (1..=MONTHS_PER_YEAR as u32).collect()
    }

    pub fn years(&self) -> Vec<i32> {
        (self.start_year..=self.end_year).collect()
    }

    /// All (year, month) pairs of the period in chronological order.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut months = self.months.clone();
        months.sort_unstable();
        months.dedup();

        self.years()
            .into_iter()
            .flat_map(|year| months.iter().map(move |&month| (year, month)))
            .collect()
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.start_year > self.end_year {
            return Err(ConfigError::OutOfBounds(
                "Start year cannot be later than end year",
            ));
        }

        if !(1850..=2300).contains(&self.start_year) || !(1850..=2300).contains(&self.end_year) {
            return Err(ConfigError::OutOfBounds(
                "Years must be between 1850 and 2300",
            ));
        }

        if self.months.is_empty() {
            return Err(ConfigError::OutOfBounds("At least one month must be selected"));
        }

        if self
            .months
            .iter()
            .any(|m| !(1..=MONTHS_PER_YEAR as u32).contains(m))
        {
            return Err(ConfigError::OutOfBounds("Months must be between 1 and 12"));
        }

        Ok(())
    }
}

/// Fields with information about input files.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Input {
    /// Templates of paths to input files holding one month of data.
    /// `{year}` is replaced with the year and `{month}` with the
    /// zero-padded month number.
    ///
    /// All files of a month are searched for the variables, so
    /// variables can be split between files.
    pub file_templates: Vec<String>,

    /// _(Optional)_ Format of input files.
    ///
    /// Defaults to the format the dataset is distributed in.
    #[serde(default)]
    pub format: Option<InputFormat>,

    /// _(Optional)_ CSV table with hybrid coefficients (`a`, `b` columns,
    /// one row per half level, in the order of levels in input files).
    ///
    /// Required for NetCDF inputs which do not carry the coefficients.
    #[serde(default)]
    pub coefficients: Option<PathBuf>,

    /// _(Optional)_ Interval between consecutive fields (hours).
    ///
    /// Defaults to the native interval of the dataset.
    #[serde(default)]
    pub time_step_hours: Option<Float>,

    /// _(Optional)_ Handling of fill values, one of `propagate`,
    /// `zero` or `reject`. Defaults to `propagate`.
    #[serde(default)]
    pub sentinel: SentinelPolicy,
}

impl Input {
    pub fn format(&self, profile: DatasetProfile) -> InputFormat {
        self.format.unwrap_or_else(|| profile.input_format())
    }

    pub fn time_step_hours(&self, profile: DatasetProfile) -> Float {
        self.time_step_hours
            .unwrap_or_else(|| profile.time_step_hours())
    }

    /// Paths of input files for the given month.
    pub fn files(&self, year: i32, month: u32) -> Vec<PathBuf> {
        self.file_templates
            .iter()
            .map(|template| {
                PathBuf::from(
                    template
                        .replace("{year}", &year.to_string())
                        .replace("{month}", &format!("{:02}", month)),
                )
            })
            .collect()
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.file_templates.is_empty() {
            return Err(ConfigError::OutOfBounds(
                "At least one input file template must be provided",
            ));
        }

        if let Some(hours) = self.time_step_hours {
            if !(hours > 0.0 && hours <= 24.0) {
                return Err(ConfigError::OutOfBounds(
                    "Time step must be between 0 and 24 hours",
                ));
            }
        }

        Ok(())
    }
}

/// _(Optional)_ Fields controlling the computation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Deserialize)]
pub struct Computation {
    /// _(Optional)_ Apply the barotropic mass correction to winds.
    ///
    /// Defaults to `true`.
    #[serde(default = "Computation::default_mass_correction")]
    pub mass_correction: bool,

    /// _(Optional)_ Store transport at every grid point
    /// in addition to zonal totals. Defaults to `false`.
    #[serde(default)]
    pub point_output: bool,
}

impl Computation {
    fn default_mass_correction() -> bool {
        true
    }
}

impl Default for Computation {
    fn default() -> Self {
        Computation {
            mass_correction: Computation::default_mass_correction(),
            point_output: false,
        }
    }
}

/// Fields with information about output.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Output {
    /// Directory where output files are written.
    /// It is created when it does not exist.
    pub directory: PathBuf,

    /// _(Optional)_ Store monthly mean correction winds.
    /// Defaults to `false`.
    #[serde(default)]
    pub write_correction_winds: bool,
}

/// _(Optional)_ Fields of the statistical summary.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Summary {
    /// Latitudes (in degrees) at which the transport time series
    /// is summarised. Nearest grid latitude is used.
    pub latitudes: Vec<Float>,

    /// _(Optional)_ Window of the running mean (months).
    ///
    /// Defaults to `12`.
    #[serde(default = "Summary::default_window")]
    pub running_mean_window: usize,
}

impl Summary {
    fn default_window() -> usize {
        12
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.latitudes.iter().any(|l| !(-90.0..=90.0).contains(l)) {
            return Err(ConfigError::OutOfBounds(
                "Summary latitudes must be between -90 and 90 degrees",
            ));
        }

        if self.running_mean_window < 1 {
            return Err(ConfigError::OutOfBounds(
                "Running mean window cannot be less than 1",
            ));
        }

        Ok(())
    }
}

/// _(Optional)_ Fields of data retrieval requests.
///
/// When present, a MARS request for every computed month is written
/// to the `requests` subdirectory of the output directory. Retrieved
/// data is targeted at the first input file of the month.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Retrieval {
    /// _(Optional)_ Archive class. Defaults to `ei`.
    #[serde(default = "Retrieval::default_class")]
    pub class: String,

    /// _(Optional)_ Archive dataset. Defaults to `interim`.
    #[serde(default = "Retrieval::default_dataset")]
    pub dataset: String,

    /// _(Optional)_ Resolution (in degrees) of the requested grid
    /// for longitude and latitude. Defaults to `0.75`.
    #[serde(default = "Retrieval::default_grid")]
    pub grid: (Float, Float),

    /// _(Optional)_ Number of model levels to request.
    /// Defaults to `60`.
    #[serde(default = "Retrieval::default_levels")]
    pub levels: u32,
}

impl Retrieval {
    fn default_class() -> String {
        "ei".to_string()
    }

    fn default_dataset() -> String {
        "interim".to_string()
    }

    fn default_grid() -> (Float, Float) {
        (0.75, 0.75)
    }

    fn default_levels() -> u32 {
        60
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !(self.grid.0 > 0.0 && self.grid.1 > 0.0) {
            return Err(ConfigError::OutOfBounds("Retrieval grid must be positive"));
        }

        if self.levels < 1 {
            return Err(ConfigError::OutOfBounds(
                "At least one model level must be requested",
            ));
        }

        Ok(())
    }
}

/// _(Optional)_ Fields with information about
/// resources available for the computation.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Thread count. Months are computed in parallel
    /// by up to this number of workers.
    ///
    /// Cannot be less than `1`. Defaults to `1`.
    #[serde(default = "Resources::default_threads")]
    pub threads: u16,

    /// _(Optional)_ Heap memory limit in MB.
    /// Useful for enabling meaningful Out-of-memory error messages.
    ///
    /// Cannot be less than `128`. Defaults to whole addressable-space.
    ///
    /// Every worker buffers two series of 2D fields and the 3D state
    /// of one time step, so set the limit with the thread count in mind.
    #[serde(default = "Resources::default_memory")]
    pub memory: usize,
}

impl Resources {
    fn default_threads() -> u16 {
        1
    }

    fn default_memory() -> usize {
        usize::MAX / (1024 * 1024)
    }

    /// Checks if thread count and memory limit are
    /// above limits.
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        if self.memory < 128 {
            return Err(ConfigError::OutOfBounds(
                "Available memory cannot be less than 128 MB",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: Resources::default_threads(),
            memory: Resources::default_memory(),
        }
    }
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct Config {
    pub dataset: Dataset,

    pub period: Period,

    pub input: Input,

    #[serde(default)]
    pub computation: Computation,

    pub output: Output,

    #[serde(default)]
    pub summary: Option<Summary>,

    #[serde(default)]
    pub retrieval: Option<Retrieval>,

    #[serde(default)]
    pub resources: Resources,
}

impl Config {
    /// Config structure constructor, responsible for
    /// deserializing configuration and checking it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        let config: Config = serde_yaml::from_slice(data.as_slice())?;

        config.check_bounds()?;

        Ok(config)
    }

    /// Same as [`Config::new_from_file`] but for configuration in memory.
    pub fn from_yaml(data: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(data)?;

        config.check_bounds()?;

        Ok(config)
    }

    fn check_bounds(&self) -> Result<(), ConfigError> {
        self.dataset.check_bounds()?;
        self.period.check_bounds()?;
        self.input.check_bounds()?;
        self.resources.check_bounds()?;

        if let Some(summary) = &self.summary {
            summary.check_bounds()?;
        }

        if let Some(retrieval) = &self.retrieval {
            retrieval.check_bounds()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::{
        errors::ConfigError,
        transport::{
            input::sentinel::SentinelPolicy,
            profile::{DatasetProfile, GeopotentialKind, InputFormat, LevelOrder},
        },
    };
    use std::path::PathBuf;

    const MINIMAL: &str = "
dataset:
  profile: era-interim
period:
  start_year: 1979
  end_year: 1980
input:
  file_templates:
    - data/era_{year}_{month}.grib
output:
  directory: output/
";

    #[test]
    fn minimal_config_uses_profile_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.dataset.profile, DatasetProfile::EraInterim);
        assert_eq!(config.dataset.level_order(), LevelOrder::TopToSurface);
        assert_eq!(config.dataset.geopotential_kind(), GeopotentialKind::Hypsometric);
        assert_eq!(config.input.format(config.dataset.profile), InputFormat::Grib);
        assert_eq!(config.input.time_step_hours(config.dataset.profile), 6.0);
        assert_eq!(config.input.sentinel, SentinelPolicy::Propagate);
        assert!(config.computation.mass_correction);
        assert!(!config.computation.point_output);
        assert!(config.summary.is_none());
        assert_eq!(config.resources.threads, 1);
        assert_eq!(config.period.months().len(), 24);
        assert_eq!(config.period.months()[12], (1980, 1));
    }

    #[test]
    fn file_templates_are_expanded() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(
            config.input.files(1979, 3),
            vec![PathBuf::from("data/era_1979_03.grib")]
        );
    }

    #[test]
    fn overrides_take_precedence() {
        let config = Config::from_yaml(
            "
dataset:
  profile: jra55
  level_order: top-to-surface
  geopotential: geopotential
  constants:
    specific_heat: 1005.0
    latent_heat: 2500000.0
    gravity: 9.81
period:
  start_year: 2000
  end_year: 2000
  months: [12, 1, 1]
input:
  file_templates: [a.nc, b.nc]
  format: netcdf
  coefficients: jra55_ab.csv
  sentinel: reject
computation:
  mass_correction: false
  point_output: true
output:
  directory: out
  write_correction_winds: true
summary:
  latitudes: [60.0, 26.5]
resources:
  threads: 4
  memory: 4096
",
        )
        .unwrap();

        assert_eq!(config.dataset.level_order(), LevelOrder::TopToSurface);
        assert_eq!(config.dataset.geopotential_kind(), GeopotentialKind::Geopotential);
        assert_eq!(config.dataset.constants().gravity, 9.81);
        assert_eq!(config.period.months(), vec![(2000, 1), (2000, 12)]);
        assert_eq!(config.input.sentinel, SentinelPolicy::Reject);
        assert!(!config.computation.mass_correction);
        assert_eq!(config.summary.unwrap().running_mean_window, 12);
    }

    #[test]
    fn out_of_bounds_values_are_rejected() {
        let reversed_period = MINIMAL.replace("end_year: 1980", "end_year: 1970");
        assert!(matches!(
            Config::from_yaml(&reversed_period),
            Err(ConfigError::OutOfBounds(_))
        ));

        let no_threads = format!("{}resources:\n  threads: 0\n", MINIMAL);
        assert!(matches!(
            Config::from_yaml(&no_threads),
            Err(ConfigError::OutOfBounds(_))
        ));

        let bad_profile = MINIMAL.replace("era-interim", "era5");
        assert!(matches!(
            Config::from_yaml(&bad_profile),
            Err(ConfigError::CantDeserialize(_))
        ));
    }
}
