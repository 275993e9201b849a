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

//! Module containing the transport computation.
//!
//! Every (year, month) of the configured period is an independent
//! task. Tasks read one month of model-level data, compute the
//! monthly mean meridional energy transport with the barotropic
//! mass correction and send the result back to the main thread,
//! which collects them into time series and writes the output.

mod bisection;
mod configuration;
mod correction;
mod energy;
mod finite_difference;
mod grid;
mod hybrid;
mod input;
mod integration;
mod month;
mod output;
mod profile;
mod request;
mod state;
mod statistics;

#[cfg(test)]
mod super_tests;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::{
    fs,
    path::Path,
    sync::{mpsc, Arc},
};

use self::{
    configuration::Config,
    input::{open_month, ReaderSettings},
    month::{process_month, MonthSettings, MonthlyTransport},
    output::TransportSeries,
};
use crate::{
    errors::{AmetError, ConfigError},
    ALLOCATOR,
};

/// Main computation function.
///
/// It reads the configuration, deploys monthly tasks onto
/// the threadpool, checks for errors and writes the output.
pub fn main() -> Result<(), AmetError> {
    info!("Preparing the computation core");

    let core = Core::new()?;
    let output_dir = core.config.output.directory.clone();

    prepare_output_dir(&output_dir)?;

    if let Some(retrieval) = &core.config.retrieval {
        request::write_requests(&core.config, retrieval, &output_dir.join("requests"))?;
    }

    let reader_settings = Arc::new(ReaderSettings::from_config(&core.config)?);
    let month_settings = MonthSettings::from_config(&core.config);
    let config = Arc::new(core.config);

    let months = config.period.months();
    let months_count = months.len();

    info!(
        "Deploying {} monthly tasks for {}",
        months_count,
        config.dataset.profile.tag()
    );

    // set progress bar for computed months
    let months_bar = ProgressBar::new(months_count as u64);
    months_bar.set_style(
        ProgressStyle::default_bar()
            .template("{prefix} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    months_bar.set_prefix("Computed months");

    // deploy months on to the threadpool
    let (tx, rx) = mpsc::channel();

    for (year, month) in months {
        let tx = tx.clone();
        let config = Arc::clone(&config);
        let reader_settings = Arc::clone(&reader_settings);

        core.threadpool.spawn(move || {
            let result = compute_month(&config, &reader_settings, &month_settings, year, month)
                .map_err(|err| AmetError::TaskFailed(year, month, Box::new(err)));

            if tx.send(result).is_err() {
                error!("Result of {}-{:02} could not be reported", year, month);
            }
        });
    }

    drop(tx);

    // receive months results, all tasks report before the first error is returned
    let mut transports = Vec::with_capacity(months_count);
    let mut first_error = None;

    for result in rx.iter() {
        match result {
            Ok(transport) => transports.push(transport),
            Err(err) => {
                error!("Monthly task failed, check the details and rerun: {}", err);
                // this is necessary to make sure that all error messages
                // are fully written before the progress bar updates
                println!();

                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        months_bar.inc(1);
    }

    if let Some(err) = first_error {
        months_bar.abandon_with_message("Computation failed");
        return Err(err);
    }

    months_bar.finish_with_message("All months finished");

    let series = collect_series(&config, transports)?;
    write_output(&config, &series, &output_dir)?;

    Ok(())
}

/// Structure containing everything needed to deploy tasks.
#[derive(Debug)]
pub struct Core {
    pub config: Config,
    pub threadpool: ThreadPool,
}

impl Core {
    /// Computation [`Core`] constructor.
    ///
    /// Configuration must be loaded and checked
    /// before any task is deployed.
    pub fn new() -> Result<Self, AmetError> {
        debug!("Reading configuration from config.yaml");
        let config = Config::new_from_file(Path::new("config.yaml"))?;

        debug!("Setting memory limit");
        ALLOCATOR
            .set_limit(config.resources.memory.saturating_mul(1024 * 1024))
            .map_err(|_| {
                ConfigError::OutOfBounds("Memory limit is lower than the memory already in use")
            })?;

        debug!("Setting up ThreadPool");
        let threadpool = ThreadPoolBuilder::new()
            .num_threads(config.resources.threads as usize)
            .build()?;

        Ok(Core { config, threadpool })
    }
}

/// Task deployed on the threadpool for one month.
fn compute_month(
    config: &Config,
    reader_settings: &ReaderSettings,
    month_settings: &MonthSettings,
    year: i32,
    month: u32,
) -> Result<MonthlyTransport, AmetError> {
    let input = open_month(config, reader_settings, year, month)?;

    process_month(input.as_ref(), month_settings, year, month)
}

/// Output directory must be empty or not exist,
/// so results of previous runs are never mixed up.
fn prepare_output_dir(out_path: &Path) -> Result<(), AmetError> {
    debug!("Checking and setting output directory");

    if out_path.is_dir() {
        if out_path.read_dir()?.next().is_none() {
            debug!("Output directory exists but is empty so continuing");
        } else {
            return Err(AmetError::FaultyOutput(
                "Output directory exists and is not empty",
            ));
        }
    } else {
        debug!("Output directory does not exist so creating a new one");
        fs::create_dir_all(out_path)?;
    }

    Ok(())
}

fn collect_series(
    config: &Config,
    transports: Vec<MonthlyTransport>,
) -> Result<TransportSeries, AmetError> {
    let grid = transports
        .first()
        .map(|t| t.grid.clone())
        .ok_or(AmetError::FaultyOutput("No month has been computed"))?;

    let mut series = TransportSeries::new(
        config.period.years(),
        grid,
        config.computation.point_output,
        config.output.write_correction_winds,
    );

    for transport in &transports {
        series.insert(transport)?;
    }

    Ok(series)
}

fn write_output(config: &Config, series: &TransportSeries, output_dir: &Path) -> Result<(), AmetError> {
    info!("Writing output");

    let tag = config.dataset.profile.tag();
    let file_name = format!(
        "amet_{}_{}-{}.nc",
        tag, config.period.start_year, config.period.end_year
    );

    series.write_netcdf(&output_dir.join(file_name), tag)?;

    if let Some(summary) = &config.summary {
        statistics::write_summary(
            series,
            &summary.latitudes,
            summary.running_mean_window,
            output_dir,
        )?;
    }

    Ok(())
}
