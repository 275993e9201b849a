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

//! Module building requests for retrieval of model-level data
//! from the MARS archive.
//!
//! Requests are only rendered to text files, one per month,
//! which can be submitted with any MARS client. Nothing is
//! downloaded by this program.

use chrono::{Datelike, NaiveDate};
use log::info;
use std::{
    fmt::{self, Display},
    fs,
    path::{Path, PathBuf},
};

use super::{
    configuration::{Config, Retrieval},
    profile::InputFormat,
};
use crate::{errors::OutputError, Float};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum LevelType {
    ModelLevel,
    PressureLevel,
    Surface,
}

/// Parameters from the ECMWF parameter table 128.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Parameter {
    Geopotential,
    Temperature,
    UWind,
    VWind,
    SpecificHumidity,
    LogSurfacePressure,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Stream {
    Operational,
    MonthlyMeans,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum DataKind {
    Analysis,
    Forecast,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Format {
    Grib,
    Netcdf,
}

impl Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            LevelType::ModelLevel => "ml",
            LevelType::PressureLevel => "pl",
            LevelType::Surface => "sfc",
        };

        write!(f, "{}", code)
    }
}

impl Parameter {
    pub fn code(&self) -> u32 {
        match self {
            Parameter::Geopotential => 129,
            Parameter::Temperature => 130,
            Parameter::UWind => 131,
            Parameter::VWind => 132,
            Parameter::SpecificHumidity => 133,
            Parameter::LogSurfacePressure => 152,
        }
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.128", self.code())
    }
}

impl Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            Stream::Operational => "oper",
            Stream::MonthlyMeans => "moda",
        };

        write!(f, "{}", code)
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            DataKind::Analysis => "an",
            DataKind::Forecast => "fc",
        };

        write!(f, "{}", code)
    }
}

/// Request for one period of data.
#[derive(Clone, PartialEq, PartialOrd, Debug)]
pub struct RetrievalRequest {
    pub class: String,
    pub dataset: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Resolution (in degrees) for longitude and latitude
    pub grid: (Float, Float),
    pub levels: Vec<u32>,
    pub level_type: LevelType,
    pub parameters: Vec<Parameter>,
    pub step: u32,
    pub stream: Stream,
    /// Hours of the day
    pub times: Vec<u32>,
    pub kind: DataKind,
    pub format: Format,
    pub target: PathBuf,
}

impl RetrievalRequest {
    /// Request for all model-level variables needed by the
    /// transport computation in the given month, four times daily.
    pub fn for_month(
        retrieval: &Retrieval,
        year: i32,
        month: u32,
        format: Format,
        target: PathBuf,
    ) -> Result<Self, OutputError> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(OutputError::RequestDate(year, month))?;

        let (next_year, next_month) = if month == 12 {
            (year + 1, 1)
        } else {
            (year, month + 1)
        };

        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or(OutputError::RequestDate(year, month))?;

        Ok(RetrievalRequest {
            class: retrieval.class.clone(),
            dataset: retrieval.dataset.clone(),
            start,
            end,
            grid: retrieval.grid,
            levels: (1..=retrieval.levels).collect(),
            level_type: LevelType::ModelLevel,
            parameters: vec![
                Parameter::Geopotential,
                Parameter::Temperature,
                Parameter::UWind,
                Parameter::VWind,
                Parameter::SpecificHumidity,
                Parameter::LogSurfacePressure,
            ],
            step: 0,
            stream: Stream::Operational,
            times: vec![0, 6, 12, 18],
            kind: DataKind::Analysis,
            format,
            target,
        })
    }

    /// Renders the request in the MARS request language.
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("class={}", self.class),
            format!("dataset={}", self.dataset),
            format!(
                "date={}/to/{}",
                self.start.format("%Y-%m-%d"),
                self.end.format("%Y-%m-%d")
            ),
            "expver=1".to_string(),
            format!("grid={}/{}", self.grid.0, self.grid.1),
            format!("levelist={}", render_levels(&self.levels)),
            format!("levtype={}", self.level_type),
            format!("param={}", join(&self.parameters)),
            format!("step={}", self.step),
            format!("stream={}", self.stream),
            format!(
                "time={}",
                self.times
                    .iter()
                    .map(|h| format!("{:02}:00:00", h))
                    .collect::<Vec<_>>()
                    .join("/")
            ),
            format!("type={}", self.kind),
        ];

        if self.format == Format::Netcdf {
            lines.push("format=netcdf".to_string());
        }

        lines.push(format!("target=\"{}\"", self.target.display()));

        format!("retrieve,\n    {}\n", lines.join(",\n    "))
    }
}

fn join<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Contiguous level lists are written as a range.
fn render_levels(levels: &[u32]) -> String {
    let contiguous = levels.windows(2).all(|w| w[1] == w[0] + 1);

    match (levels.first(), levels.last()) {
        (Some(first), Some(last)) if contiguous && levels.len() > 2 => {
            format!("{}/to/{}", first, last)
        }
        _ => join(levels),
    }
}

/// Writes requests for every month of the period to `directory`.
pub fn write_requests(config: &Config, retrieval: &Retrieval, directory: &Path) -> Result<usize, OutputError> {
    fs::create_dir_all(directory)?;

    let format = match config.input.format(config.dataset.profile) {
        InputFormat::Grib => Format::Grib,
        InputFormat::Netcdf => Format::Netcdf,
    };

    let months = config.period.months();

    for &(year, month) in &months {
        let target = config
            .input
            .files(year, month)
            .into_iter()
            .next()
            .unwrap_or_else(|| PathBuf::from(format!("{}_{:02}", year, month)));

        let request = RetrievalRequest::for_month(retrieval, year, month, format, target)?;
        let path = directory.join(format!(
            "request_{}_{:02}.mars",
            request.start.year(),
            request.start.month()
        ));

        fs::write(path, request.render())?;
    }

    info!("Written {} retrieval requests to {}", months.len(), directory.display());

    Ok(months.len())
}

#[cfg(test)]
mod tests {
    use super::{render_levels, Format, RetrievalRequest};
    use crate::transport::configuration::Retrieval;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn retrieval() -> Retrieval {
        serde_yaml::from_str("{}").unwrap()
    }

    #[test]
    fn leap_february_request() {
        let request = RetrievalRequest::for_month(
            &retrieval(),
            2000,
            2,
            Format::Grib,
            PathBuf::from("data/era_2000_02.grib"),
        )
        .unwrap();

        assert_eq!(request.end, NaiveDate::from_ymd_opt(2000, 2, 29).unwrap());

        let text = request.render();

        assert!(text.starts_with("retrieve,\n    class=ei,\n"));
        assert!(text.contains("date=2000-02-01/to/2000-02-29,"));
        assert!(text.contains("levelist=1/to/60,"));
        assert!(text.contains("levtype=ml,"));
        assert!(text.contains("param=129.128/130.128/131.128/132.128/133.128/152.128,"));
        assert!(text.contains("time=00:00:00/06:00:00/12:00:00/18:00:00,"));
        assert!(text.contains("grid=0.75/0.75,"));
        assert!(!text.contains("format="));
        assert!(text.ends_with("target=\"data/era_2000_02.grib\"\n"));
    }

    #[test]
    fn december_ends_in_the_same_year() {
        let request =
            RetrievalRequest::for_month(&retrieval(), 1999, 12, Format::Netcdf, PathBuf::from("x.nc"))
                .unwrap();

        assert_eq!(request.end, NaiveDate::from_ymd_opt(1999, 12, 31).unwrap());
        assert!(request.render().contains("format=netcdf,"));
        assert!(RetrievalRequest::for_month(&retrieval(), 1999, 13, Format::Grib, PathBuf::new()).is_err());
    }

    #[test]
    fn level_lists() {
        assert_eq!(render_levels(&[1, 2, 3, 4]), "1/to/4");
        assert_eq!(render_levels(&[1, 5, 9]), "1/5/9");
        assert_eq!(render_levels(&[7]), "7");
    }
}
