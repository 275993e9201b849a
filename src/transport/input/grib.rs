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

//! Reader of model-level data stored in GRIB files.
//!
//! In GRIB files data on each level and time is stored as a separate
//! message. Messages are filtered by their keys and only then
//! collected into arrays, so the files are scanned once per
//! requested variable and time step.

use eccodes::{
    codes_handle::{
        CodesHandle,
        KeyType::{Float as FloatKey, FloatArray, Int, Str},
        KeyedMessage,
        ProductKind::GRIB,
    },
    FallibleIterator,
};
use log::debug;
use ndarray::{stack, Array1, Array2, Array3, Axis};
use rustc_hash::FxHashSet;
use std::{cmp::Ordering, path::PathBuf};

use super::{
    sentinel::{self, SentinelPolicy},
    to_surface_pressure, MonthlyInput, ReaderSettings,
};
use crate::{
    errors::DataLoadError,
    transport::{grid::Grid, hybrid::HybridCoefficients, profile::StateVariable},
    Float,
};

const HYBRID_LEVEL: &str = "hybrid";

/// Validity date and time of a message (`dataDate`, `dataTime`).
type ValidityTime = (i64, i64);

/// One month of data in GRIB files.
pub struct GribMonth {
    files: Vec<PathBuf>,
    settings: ReaderSettings,
    steps: Vec<ValidityTime>,
    grid: Grid,
    coefficients: HybridCoefficients,
    shape: (usize, usize),
}

impl GribMonth {
    /// Scans the files for time steps of the temperature field
    /// and reads the grid and hybrid coefficients from its first message.
    pub fn open(files: Vec<PathBuf>, settings: ReaderSettings) -> Result<Self, DataLoadError> {
        let temperature = Str(settings.names.temperature.clone());
        let hybrid = Str(HYBRID_LEVEL.to_string());

        let mut steps: FxHashSet<ValidityTime> = FxHashSet::default();
        let mut layout = None;

        for file in &files {
            let mut handle = CodesHandle::new_from_file(file, GRIB)?;

            while let Some(msg) = handle.next()? {
                if msg.read_key("shortName")?.value != temperature
                    || msg.read_key("typeOfLevel")?.value != hybrid
                {
                    continue;
                }

                steps.insert(validity_time(&msg)?);

                if layout.is_none() {
                    layout = Some(read_layout(&msg)?);
                }
            }
        }

        let (grid, shape, stored_coefficients) = layout.ok_or(DataLoadError::DataNotSufficient(
            "No temperature on hybrid levels found in GRIB input",
        ))?;

        let coefficients = match &settings.coefficients {
            Some(coefficients) => coefficients.clone(),
            None => stored_coefficients,
        };

        let mut steps: Vec<ValidityTime> = steps.into_iter().collect();
        steps.sort_unstable();

        debug!(
            "GRIB input has {} time steps on {}x{} grid and {} levels",
            steps.len(),
            shape.0,
            shape.1,
            coefficients.levels()
        );

        Ok(GribMonth {
            files,
            settings,
            steps,
            grid,
            coefficients,
            shape,
        })
    }

    fn step_time(&self, step: usize) -> Result<ValidityTime, DataLoadError> {
        self.steps
            .get(step)
            .copied()
            .ok_or(DataLoadError::DataNotSufficient(
                "Requested time step is not present in GRIB input",
            ))
    }

    /// Filters and reads all GRIB messages of variable with
    /// given `short_name` valid at the time step.
    fn read_messages(
        &self,
        short_name: &str,
        step: usize,
        hybrid_only: bool,
    ) -> Result<Vec<KeyedMessage>, DataLoadError> {
        let (date, time) = self.step_time(step)?;
        let mut data_levels: Vec<KeyedMessage> = vec![];

        for file in &self.files {
            let handle = CodesHandle::new_from_file(file, GRIB)?;

            let mut data: Vec<KeyedMessage> = handle
                .filter(|msg| {
                    Ok(msg.read_key("shortName")?.value == Str(short_name.to_string())
                        && msg.read_key("dataDate")?.value == Int(date)
                        && msg.read_key("dataTime")?.value == Int(time)
                        && (!hybrid_only
                            || msg.read_key("typeOfLevel")?.value
                                == Str(HYBRID_LEVEL.to_string())))
                })
                .collect()?;

            data_levels.append(&mut data);
        }

        if data_levels.is_empty() {
            return Err(DataLoadError::MissingVariable(short_name.to_string()));
        }

        Ok(data_levels)
    }

    /// Reads a single-level field, taking the message with the lowest level.
    fn read_surface_field(
        &self,
        short_name: &str,
        step: usize,
        policy: SentinelPolicy,
    ) -> Result<Array2<Float>, DataLoadError> {
        let messages = self.read_messages(short_name, step, false)?;
        let mut sorted = messages_by_level(messages)?;
        let (_, msg) = sorted.remove(0);

        message_values(&msg, self.shape, policy, short_name)
    }
}

impl MonthlyInput for GribMonth {
    fn time_steps(&self) -> usize {
        self.steps.len()
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn coefficients(&self) -> &HybridCoefficients {
        &self.coefficients
    }

    fn surface_pressure(&self, step: usize) -> Result<Array2<Float>, DataLoadError> {
        let field = self.read_surface_field(
            &self.settings.names.surface_pressure,
            step,
            self.settings.sentinel.for_surface_pressure(),
        )?;

        Ok(to_surface_pressure(field, self.settings.surface_pressure_kind))
    }

    fn field(&self, variable: StateVariable, step: usize) -> Result<Array3<Float>, DataLoadError> {
        let short_name = self.settings.names.name_of(variable);
        let messages = self.read_messages(short_name, step, true)?;

        messages_to_array(messages, self.shape, self.settings.sentinel, short_name)
    }

    fn surface_geopotential(&self, step: usize) -> Result<Array2<Float>, DataLoadError> {
        self.read_surface_field(&self.settings.names.geopotential, step, self.settings.sentinel)
    }
}

fn read_int(msg: &KeyedMessage, key: &'static str) -> Result<i64, DataLoadError> {
    if let Int(val) = msg.read_key(key)?.value {
        Ok(val)
    } else {
        Err(DataLoadError::IncorrectKeyType(key))
    }
}

fn read_floats(msg: &KeyedMessage, key: &'static str) -> Result<Vec<Float>, DataLoadError> {
    if let FloatArray(vals) = msg.read_key(key)?.value {
        Ok(vals.into_iter().map(|v| v as Float).collect())
    } else {
        Err(DataLoadError::IncorrectKeyType(key))
    }
}

fn validity_time(msg: &KeyedMessage) -> Result<ValidityTime, DataLoadError> {
    Ok((read_int(msg, "dataDate")?, read_int(msg, "dataTime")?))
}

/// Missing value of the message, present only when
/// the message carries a bitmap.
fn missing_value(msg: &KeyedMessage) -> Result<Option<Float>, DataLoadError> {
    if read_int(msg, "bitmapPresent")? == 0 {
        return Ok(None);
    }

    match msg.read_key("missingValue")?.value {
        FloatKey(val) => Ok(Some(val as Float)),
        Int(val) => Ok(Some(val as Float)),
        _ => Err(DataLoadError::IncorrectKeyType("missingValue")),
    }
}

/// Reads the grid, the shape of values and hybrid coefficients
/// stored in the `pv` key.
///
/// We can read any hybrid-level message as we assume that
/// all messages share the grid.
fn read_layout(msg: &KeyedMessage) -> Result<(Grid, (usize, usize), HybridCoefficients), DataLoadError> {
    let ni = read_int(msg, "Ni")? as usize;
    let nj = read_int(msg, "Nj")? as usize;

    let mut latitudes = read_floats(msg, "distinctLatitudes")?;
    let mut longitudes = read_floats(msg, "distinctLongitudes")?;

    latitudes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    longitudes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    // values start in the north unless j scans positively
    if read_int(msg, "jScansPositively")? == 0 {
        latitudes.reverse();
    }

    if latitudes.len() != nj || longitudes.len() != ni {
        return Err(DataLoadError::DataNotSufficient(
            "GRIB input is not on a regular latitude-longitude grid",
        ));
    }

    let grid = Grid::new(Array1::from_vec(latitudes), Array1::from_vec(longitudes))?;

    let pv = read_floats(msg, "pv")?;
    let half_levels = pv.len() / 2;

    let coefficients = HybridCoefficients::new(
        Array1::from_vec(pv[..half_levels].to_vec()),
        Array1::from_vec(pv[half_levels..].to_vec()),
    )?;

    Ok((grid, (nj, ni), coefficients))
}

fn messages_by_level(
    messages: Vec<KeyedMessage>,
) -> Result<Vec<(i64, KeyedMessage)>, DataLoadError> {
    let mut sorted = vec![];

    for msg in messages {
        sorted.push((read_int(&msg, "level")?, msg));
    }

    sorted.sort_unstable_by_key(|k| k.0);

    Ok(sorted)
}

/// Decodes values of the message into a `(lat, lon)` array
/// handling the missing values.
fn message_values(
    msg: &KeyedMessage,
    shape: (usize, usize),
    policy: SentinelPolicy,
    short_name: &str,
) -> Result<Array2<Float>, DataLoadError> {
    let values = read_floats(msg, "values")?;
    let mut field = Array2::from_shape_vec(shape, values)?;

    sentinel::apply(&mut field, missing_value(msg)?, policy, short_name)?;

    Ok(field)
}

/// Collects data from GRIB messages into a 3d array
/// with levels in ascending order of the `level` key.
fn messages_to_array(
    messages: Vec<KeyedMessage>,
    shape: (usize, usize),
    policy: SentinelPolicy,
    short_name: &str,
) -> Result<Array3<Float>, DataLoadError> {
    let mut levels = vec![];

    for (_, msg) in messages_by_level(messages)? {
        levels.push(message_values(&msg, shape, policy, short_name)?);
    }

    let views: Vec<_> = levels.iter().map(|level| level.view()).collect();
    let field = stack(Axis(0), views.as_slice())?;

    Ok(field)
}
