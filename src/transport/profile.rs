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

//! Module with dataset profiles, the closed set of reanalyses
//! the transport can be computed for.
//!
//! Each reanalysis stores its model-level data differently: levels may
//! run from the top of atmosphere to the surface or the other way round,
//! variables have different names, geopotential may be given on levels
//! (as height or geopotential) or only at the surface, and the physical
//! constants differ slightly between models. A profile collects all of
//! those differences so that the numerical core is written only once.

use serde::Deserialize;

use crate::constants::{
    IFS_GRAVITY, IFS_LATENT_HEAT, IFS_SPECIFIC_HEAT, STANDARD_GRAVITY,
};
use crate::Float;

/// Supported reanalysis datasets.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetProfile {
    EraInterim,
    Merra2,
    Jra55,
    EcEarth,
}

/// Ordering of model levels in the input files.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LevelOrder {
    TopToSurface,
    SurfaceToTop,
}

/// Format of the input files.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    Grib,
    Netcdf,
}

/// How the surface pressure is stored in the input.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfacePressureKind {
    /// Surface pressure in Pa
    Pressure,
    /// Natural logarithm of surface pressure in Pa
    LogPressure,
}

/// How the geopotential on model levels is obtained.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeopotentialKind {
    /// Geopotential (m^2 s^-2) on model levels
    Geopotential,
    /// Geopotential height (m) on model levels
    Height,
    /// Only surface geopotential is provided, levels are
    /// computed with the hypsometric equation
    Hypsometric,
}

/// Variables of the atmospheric state read from input files.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum StateVariable {
    Temperature,
    SpecificHumidity,
    UWind,
    VWind,
    Geopotential,
}

/// Physical constants of the reanalysis model.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug, Deserialize)]
pub struct PhysicalConstants {
    /// Specific heat of dry air at constant pressure (J kg^-1 K^-1)
    pub specific_heat: Float,
    /// Latent heat of vaporization (J kg^-1)
    pub latent_heat: Float,
    /// Gravitational acceleration (m s^-2)
    pub gravity: Float,
}

/// Names of variables in input files.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Deserialize)]
pub struct VariableNames {
    pub temperature: String,
    pub specific_humidity: String,
    pub u_wind: String,
    pub v_wind: String,
    pub geopotential: String,
    pub surface_pressure: String,
    /// Name of the hybrid A coefficient on half levels,
    /// used only when the file carries the coefficients itself.
    #[serde(default)]
    pub hybrid_a: Option<String>,
    /// Name of the hybrid B coefficient on half levels.
    #[serde(default)]
    pub hybrid_b: Option<String>,
}

impl VariableNames {
    fn new(names: [&str; 6], hybrid: Option<(&str, &str)>) -> Self {
        VariableNames {
            temperature: names[0].to_string(),
            specific_humidity: names[1].to_string(),
            u_wind: names[2].to_string(),
            v_wind: names[3].to_string(),
            geopotential: names[4].to_string(),
            surface_pressure: names[5].to_string(),
            hybrid_a: hybrid.map(|h| h.0.to_string()),
            hybrid_b: hybrid.map(|h| h.1.to_string()),
        }
    }

    /// Name of the given state variable in input files.
    pub fn name_of(&self, variable: StateVariable) -> &str {
        match variable {
            StateVariable::Temperature => &self.temperature,
            StateVariable::SpecificHumidity => &self.specific_humidity,
            StateVariable::UWind => &self.u_wind,
            StateVariable::VWind => &self.v_wind,
            StateVariable::Geopotential => &self.geopotential,
        }
    }
}

impl DatasetProfile {
    pub fn level_order(&self) -> LevelOrder {
        match self {
            DatasetProfile::EraInterim | DatasetProfile::EcEarth | DatasetProfile::Merra2 => {
                LevelOrder::TopToSurface
            }
            DatasetProfile::Jra55 => LevelOrder::SurfaceToTop,
        }
    }

    pub fn input_format(&self) -> InputFormat {
        match self {
            DatasetProfile::EraInterim => InputFormat::Grib,
            DatasetProfile::Merra2 | DatasetProfile::Jra55 | DatasetProfile::EcEarth => {
                InputFormat::Netcdf
            }
        }
    }

    pub fn surface_pressure_kind(&self) -> SurfacePressureKind {
        match self {
            DatasetProfile::EraInterim | DatasetProfile::EcEarth => SurfacePressureKind::LogPressure,
            DatasetProfile::Merra2 | DatasetProfile::Jra55 => SurfacePressureKind::Pressure,
        }
    }

    pub fn geopotential_kind(&self) -> GeopotentialKind {
        match self {
            DatasetProfile::EraInterim | DatasetProfile::EcEarth => GeopotentialKind::Hypsometric,
            DatasetProfile::Merra2 | DatasetProfile::Jra55 => GeopotentialKind::Height,
        }
    }

    /// Interval between consecutive fields in the input files (hours).
    pub fn time_step_hours(&self) -> Float {
        match self {
            DatasetProfile::Merra2 => 3.0,
            DatasetProfile::EraInterim | DatasetProfile::Jra55 | DatasetProfile::EcEarth => 6.0,
        }
    }

    pub fn constants(&self) -> PhysicalConstants {
        match self {
            DatasetProfile::EraInterim | DatasetProfile::EcEarth => PhysicalConstants {
                specific_heat: IFS_SPECIFIC_HEAT,
                latent_heat: IFS_LATENT_HEAT,
                gravity: IFS_GRAVITY,
            },
            DatasetProfile::Merra2 | DatasetProfile::Jra55 => PhysicalConstants {
                specific_heat: IFS_SPECIFIC_HEAT,
                latent_heat: IFS_LATENT_HEAT,
                gravity: STANDARD_GRAVITY,
            },
        }
    }

    pub fn variable_names(&self) -> VariableNames {
        match self {
            DatasetProfile::EraInterim => {
                VariableNames::new(["t", "q", "u", "v", "z", "lnsp"], None)
            }
            DatasetProfile::EcEarth => VariableNames::new(
                ["t", "q", "u", "v", "z", "lnsp"],
                Some(("hyai", "hybi")),
            ),
            DatasetProfile::Merra2 => VariableNames::new(["T", "QV", "U", "V", "H", "PS"], None),
            DatasetProfile::Jra55 => {
                VariableNames::new(["tmp", "spfh", "ugrd", "vgrd", "hgt", "pres"], None)
            }
        }
    }

    /// Short dataset tag used in output file names.
    pub fn tag(&self) -> &'static str {
        match self {
            DatasetProfile::EraInterim => "era-interim",
            DatasetProfile::Merra2 => "merra2",
            DatasetProfile::Jra55 => "jra55",
            DatasetProfile::EcEarth => "ec-earth",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DatasetProfile, LevelOrder, StateVariable};

    #[test]
    fn jra55_is_the_only_surface_to_top_dataset() {
        for profile in [
            DatasetProfile::EraInterim,
            DatasetProfile::Merra2,
            DatasetProfile::EcEarth,
        ] {
            assert_eq!(profile.level_order(), LevelOrder::TopToSurface);
        }

        assert_eq!(DatasetProfile::Jra55.level_order(), LevelOrder::SurfaceToTop);
    }

    #[test]
    fn variable_lookup() {
        let names = DatasetProfile::Merra2.variable_names();

        assert_eq!(names.name_of(StateVariable::SpecificHumidity), "QV");
        assert_eq!(names.name_of(StateVariable::Geopotential), "H");
        assert_eq!(names.surface_pressure, "PS");
    }

    #[test]
    fn profile_deserializes_from_kebab_case() {
        let profile: DatasetProfile = serde_yaml::from_str("era-interim").unwrap();
        assert_eq!(profile, DatasetProfile::EraInterim);

        let order: LevelOrder = serde_yaml::from_str("surface-to-top").unwrap();
        assert_eq!(order, LevelOrder::SurfaceToTop);
    }
}
