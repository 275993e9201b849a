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

//! Atmospheric Meridional Energy Transport (AMET) computes the
//! vertically and zonally integrated poleward energy transport
//! of the atmosphere from reanalysis data on hybrid model levels.
//!
//! The same numerical core (pressure thickness from hybrid coefficients,
//! energy terms, barotropic mass correction and the vertical and zonal
//! integration) is used for every supported reanalysis. Dataset-specific
//! details are captured in dataset profiles selected in the configuration.

mod constants;
mod errors;
mod transport;

use cap::Cap;
use env_logger::Env;
use log::{error, info};
use std::alloc;

type Float = f64;

/// Global allocator used by the program.
///
/// Monthly tasks run in parallel and each of them buffers full 3D fields,
/// so capping the memory to the limit set in the configuration file
/// gives a meaningful OOM error instead of the system killing the process.
#[global_allocator]
static ALLOCATOR: Cap<alloc::System> = Cap::new(alloc::System, usize::MAX);

/// The main program function.
/// Prepares the runtime environment and calls the [`transport::main`].
///
/// The `env_logger` needs to be initiated before any log messages
/// are possible to occur, so that errors from configuration and
/// input reading are reported with full context.
fn main() {
    #[cfg(not(feature = "debug"))]
    let logger_env = Env::new().filter_or("AMET_LOG_LEVEL", "info");

    #[cfg(feature = "debug")]
    let logger_env = Env::new().filter_or("AMET_LOG_LEVEL", "debug");

    env_logger::Builder::from_env(logger_env)
        .format_timestamp_millis()
        .init();

    match transport::main() {
        Ok(_) => info!("Computation finished. Check the output directory and log."),
        Err(err) => error!("Computation failed with error: {}", err),
    }
}
