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

//! Module computing the energy terms transported by the atmosphere.
//!
//! Total energy of an air parcel is split into four components:
//! internal (sensible heat) energy `cp·T`, latent heat `Lv·q`,
//! geopotential energy `g·z` and kinetic energy `(u² + v²)/2`.
//! All of them are in J kg^-1 and become meridional fluxes
//! when multiplied by the (mass-corrected) meridional wind.

use ndarray::{Array, Array3, Dimension, Ix3, Zip};

use super::{profile::PhysicalConstants, state::AtmosphereState};
use crate::Float;

/// Names of energy components as used in output files.
pub const COMPONENT_NAMES: [&str; 4] = ["cpT", "Lvq", "gz", "uv2"];

/// Four energy components stored as arrays of the same shape.
#[derive(Clone, PartialEq, Debug)]
pub struct EnergyComponents<D: Dimension> {
    pub internal: Array<Float, D>,
    pub latent: Array<Float, D>,
    pub geopotential: Array<Float, D>,
    pub kinetic: Array<Float, D>,
}

impl<D: Dimension> EnergyComponents<D> {
    /// Components filled with zeros, used as an accumulator.
    pub fn zeros(shape: D) -> Self {
        Self::from_elem(shape, 0.0)
    }

    pub fn from_elem(shape: D, value: Float) -> Self {
        EnergyComponents {
            internal: Array::from_elem(shape.clone(), value),
            latent: Array::from_elem(shape.clone(), value),
            geopotential: Array::from_elem(shape.clone(), value),
            kinetic: Array::from_elem(shape, value),
        }
    }

    /// Sum of all components.
    pub fn total(&self) -> Array<Float, D> {
        &self.internal + &self.latent + &self.geopotential + &self.kinetic
    }

    /// Components in the order of [`COMPONENT_NAMES`].
    pub fn as_array(&self) -> [&Array<Float, D>; 4] {
        [
            &self.internal,
            &self.latent,
            &self.geopotential,
            &self.kinetic,
        ]
    }

    pub fn as_array_mut(&mut self) -> [&mut Array<Float, D>; 4] {
        [
            &mut self.internal,
            &mut self.latent,
            &mut self.geopotential,
            &mut self.kinetic,
        ]
    }

    /// Applies the same transformation to every component.
    pub fn map<E, F>(&self, f: F) -> EnergyComponents<E>
    where
        E: Dimension,
        F: Fn(&Array<Float, D>) -> Array<Float, E>,
    {
        EnergyComponents {
            internal: f(&self.internal),
            latent: f(&self.latent),
            geopotential: f(&self.geopotential),
            kinetic: f(&self.kinetic),
        }
    }

    /// Multiplies every component by the meridional wind,
    /// giving meridional energy fluxes (J kg^-1 m s^-1).
    pub fn meridional_flux(&self, v_wind: &Array<Float, D>) -> Self {
        self.map(|energy| energy * v_wind)
    }

    /// Adds `weight·other` to every component.
    pub fn accumulate(&mut self, other: &Self, weight: Float) {
        self.internal.scaled_add(weight, &other.internal);
        self.latent.scaled_add(weight, &other.latent);
        self.geopotential.scaled_add(weight, &other.geopotential);
        self.kinetic.scaled_add(weight, &other.kinetic);
    }
}

/// Computes energy components (J kg^-1) at every grid point of the state.
///
/// Geopotential in the state is already in m^2 s^-2 (height has been
/// multiplied by gravity while loading), so it is used directly.
pub fn energy_terms(state: &AtmosphereState, constants: &PhysicalConstants) -> EnergyComponents<Ix3> {
    let internal = state.temperature.mapv(|t| constants.specific_heat * t);
    let latent = state.specific_humidity.mapv(|q| constants.latent_heat * q);
    let geopotential = state.geopotential.clone();

    let mut kinetic = Array3::zeros(state.u_wind.raw_dim());

    Zip::from(&mut kinetic)
        .and(&state.u_wind)
        .and(&state.v_wind)
        .for_each(|k, &u, &v| {
            *k = 0.5 * (u * u + v * v);
        });

    EnergyComponents {
        internal,
        latent,
        geopotential,
        kinetic,
    }
}
