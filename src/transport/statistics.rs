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

//! Module with statistics of the transport time series
//! written as a CSV summary for selected latitudes.
//!
//! Series are stored as `(year, month)` arrays; missing
//! months are NaN and are skipped by every statistic.

use log::{info, warn};
use nalgebra::{Matrix2, Vector2};
use ndarray::{s, Array1, Array2, Axis};
use std::path::Path;

use super::{bisection::find_nearest, output::TransportSeries};
use crate::{
    constants::{MONTHS_PER_YEAR, PETA},
    errors::OutputError,
    Float,
};

/// Least-squares line `y = intercept + slope·x`.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
pub struct Trend {
    pub slope: Float,
    pub intercept: Float,
}

/// Mean over years of every calendar month, NaN where
/// a month has no data.
pub fn seasonal_cycle(series: &Array2<Float>) -> Array1<Float> {
    series.map_axis(Axis(0), |month| {
        let (sum, count) = month
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));

        if count == 0 {
            Float::NAN
        } else {
            sum / count as Float
        }
    })
}

/// Series with the seasonal cycle removed.
pub fn anomalies(series: &Array2<Float>) -> Array2<Float> {
    series - &seasonal_cycle(series)
}

/// Centred running mean. Values whose window is incomplete
/// or contains a missing value are NaN.
pub fn running_mean(values: &[Float], window: usize) -> Vec<Float> {
    let n = values.len();
    let half = (window.max(1) - 1) / 2;

    (0..n)
        .map(|i| {
            if i < half || i - half + window > n {
                return Float::NAN;
            }

            let window_values = &values[i - half..i - half + window];

            if window_values.iter().any(|v| v.is_nan()) {
                Float::NAN
            } else {
                window_values.iter().sum::<Float>() / window as Float
            }
        })
        .collect()
}

/// Fits a line to the points with the normal equations,
/// skipping pairs with a missing value.
pub fn linear_trend(x: &[Float], y: &[Float]) -> Result<Trend, OutputError> {
    let points: Vec<(Float, Float)> = x
        .iter()
        .zip(y)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();

    if points.len() < 2 {
        return Err(OutputError::Statistics("at least two points are needed"));
    }

    let n = points.len() as Float;
    let sum_x: Float = points.iter().map(|p| p.0).sum();
    let sum_xx: Float = points.iter().map(|p| p.0 * p.0).sum();
    let sum_y: Float = points.iter().map(|p| p.1).sum();
    let sum_xy: Float = points.iter().map(|p| p.0 * p.1).sum();

    let normal = Matrix2::new(n, sum_x, sum_x, sum_xx);
    let inverse = normal
        .try_inverse()
        .ok_or(OutputError::Statistics("points do not span a line"))?;

    let solution = inverse * Vector2::new(sum_y, sum_xy);

    Ok(Trend {
        intercept: solution[0],
        slope: solution[1],
    })
}

/// Writes, for every requested latitude, a CSV file with the monthly
/// transport (PW), its anomaly and running mean at the nearest grid
/// latitude, and one file with the trends of anomalies.
pub fn write_summary(
    series: &TransportSeries,
    latitudes: &[Float],
    window: usize,
    directory: &Path,
) -> Result<(), OutputError> {
    let total = series.zonal.total();
    let grid_latitudes = series.grid.latitudes.to_vec();

    let mut trend_file = csv::Writer::from_path(directory.join("summary_trends.csv"))?;
    trend_file.write_record(&[
        "latitude",
        "gridLatitude",
        "meanTransport",
        "trendPerDecade",
    ])?;

    for &latitude in latitudes {
        let index = find_nearest(&grid_latitudes, latitude)?;
        let grid_latitude = grid_latitudes[index];

        let transport = total.slice(s![.., .., index]).mapv(|v| v / PETA);
        let anomaly = anomalies(&transport);

        let chronological: Vec<Float> = transport.iter().copied().collect();
        let smoothed = running_mean(&chronological, window);

        let mut times = vec![];
        let mut out_file =
            csv::Writer::from_path(directory.join(format!("summary_{:.2}.csv", grid_latitude)))?;

        out_file.write_record(&["year", "month", "transport", "anomaly", "runningMean"])?;

        for (y, year) in series.years.iter().enumerate() {
            for m in 0..MONTHS_PER_YEAR {
                let i = y * MONTHS_PER_YEAR + m;
                times.push(*year as Float + (m as Float + 0.5) / MONTHS_PER_YEAR as Float);

                out_file.write_record(&[
                    year.to_string(),
                    (m + 1).to_string(),
                    transport[[y, m]].to_string(),
                    anomaly[[y, m]].to_string(),
                    smoothed[i].to_string(),
                ])?;
            }
        }

        out_file.flush()?;

        let anomaly: Vec<Float> = anomaly.iter().copied().collect();
        let decadal_trend = match linear_trend(&times, &anomaly) {
            Ok(trend) => trend.slope * 10.0,
            Err(err) => {
                warn!("No trend at latitude {:.2}: {}", grid_latitude, err);
                Float::NAN
            }
        };

        let valid: Vec<Float> = chronological.iter().copied().filter(|v| !v.is_nan()).collect();
        let mean = if valid.is_empty() {
            Float::NAN
        } else {
            valid.iter().sum::<Float>() / valid.len() as Float
        };

        trend_file.write_record(&[
            latitude.to_string(),
            grid_latitude.to_string(),
            mean.to_string(),
            decadal_trend.to_string(),
        ])?;
    }

    trend_file.flush()?;

    info!(
        "Summary written for {} latitudes to {}",
        latitudes.len(),
        directory.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{anomalies, linear_trend, running_mean, seasonal_cycle, write_summary};
    use crate::{
        errors::OutputError,
        transport::{
            energy::EnergyComponents, grid::Grid, month::MonthlyTransport,
            output::TransportSeries,
        },
    };
    use float_cmp::approx_eq;
    use ndarray::{array, Array1, Ix1};

    #[test]
    fn seasonal_cycle_skips_missing_months() {
        let series = array![[1.0, 2.0, f64::NAN], [3.0, f64::NAN, f64::NAN]];
        let cycle = seasonal_cycle(&series);

        assert_eq!(cycle[0], 2.0);
        assert_eq!(cycle[1], 2.0);
        assert!(cycle[2].is_nan());

        let anomaly = anomalies(&series);
        assert_eq!(anomaly[[0, 0]], -1.0);
        assert_eq!(anomaly[[1, 0]], 1.0);
        assert_eq!(anomaly[[0, 1]], 0.0);
    }

    #[test]
    fn centred_running_mean() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN, 7.0];
        let mean = running_mean(&values, 3);

        assert!(mean[0].is_nan());
        assert_eq!(mean[1], 2.0);
        assert_eq!(mean[3], 4.0);
        assert!(mean[4].is_nan());
        assert!(mean[6].is_nan());

        // even windows lean forward
        let mean = running_mean(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(&mean[..3], &[1.5, 2.5, 3.5]);
        assert!(mean[3].is_nan());
    }

    #[test]
    fn trend_of_a_line() {
        let x = [0.0, 1.0, 2.0, f64::NAN, 4.0];
        let y = [1.0, 3.0, 5.0, 7.0, 9.0];

        let trend = linear_trend(&x, &y).unwrap();
        assert!(approx_eq!(f64, trend.slope, 2.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, trend.intercept, 1.0, epsilon = 1e-12));

        assert!(matches!(
            linear_trend(&[1.0], &[1.0]),
            Err(OutputError::Statistics(_))
        ));
        assert!(matches!(
            linear_trend(&[1.0, 1.0], &[1.0, 2.0]),
            Err(OutputError::Statistics(_))
        ));
    }

    #[test]
    fn summary_files_are_written() {
        let grid = Grid::new(
            Array1::linspace(90.0, -90.0, 5),
            Array1::linspace(0.0, 270.0, 4),
        )
        .unwrap();

        let mut series = TransportSeries::new(vec![2000, 2001], grid.clone(), false, false);

        for year in [2000, 2001] {
            for month in 1..=12 {
                let mut zonal = EnergyComponents::zeros(Ix1(5));
                zonal.internal.fill(1.0e15 * (year - 2000) as f64);

                series
                    .insert(&MonthlyTransport {
                        year,
                        month,
                        grid: grid.clone(),
                        zonal,
                        point: None,
                        correction: None,
                    })
                    .unwrap();
            }
        }

        let directory = std::env::temp_dir().join("amet_summary_test");
        std::fs::create_dir_all(&directory).unwrap();

        write_summary(&series, &[44.0], 12, &directory).unwrap();

        let mut reader = csv::Reader::from_path(directory.join("summary_45.00.csv")).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 24);
        assert_eq!(&rows[12][2], "1");
        assert_eq!(&rows[0][3], "-0.5");

        let mut reader = csv::Reader::from_path(directory.join("summary_trends.csv")).unwrap();
        let trend = reader.records().next().unwrap().unwrap();
        assert_eq!(&trend[1], "45");
        assert_eq!(&trend[2], "0.5");

        std::fs::remove_dir_all(&directory).unwrap();
    }
}
