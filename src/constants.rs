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

//! Module containing constants used by the computation.
//!
//! Constants that differ between reanalyses (specific heat, latent heat,
//! gravity) live in [`PhysicalConstants`](crate::transport::profile::PhysicalConstants),
//! defaults for them are kept here.

use crate::Float;

/// Mean Earth radius (m)
pub const EARTH_RADIUS: Float = 6_371_009.0;

/// Gas constant of dry air as used by IFS (J kg^-1 K^-1)
pub const DRY_AIR_GAS_CONSTANT: Float = 287.06;

/// Specific heat of dry air at constant pressure used by IFS (J kg^-1 K^-1)
pub const IFS_SPECIFIC_HEAT: Float = 1004.64;

/// Latent heat of vaporization used by IFS (J kg^-1)
pub const IFS_LATENT_HEAT: Float = 2_264_670.0;

/// Gravitational acceleration used by IFS (m s^-2)
pub const IFS_GRAVITY: Float = 9.80616;

/// Standard gravitational acceleration (m s^-2)
pub const STANDARD_GRAVITY: Float = 9.80665;

/// Watts in a terawatt
pub const TERA: Float = 1.0e12;

/// Watts in a petawatt
pub const PETA: Float = 1.0e15;

/// Seconds in one hour
pub const SECONDS_PER_HOUR: Float = 3600.0;

/// Months in a year, every output array has this length along month axis
pub const MONTHS_PER_YEAR: usize = 12;
