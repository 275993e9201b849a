//! This is a module for integration tests of the transport computation,
//! but with access to private fields and methods.
//!
//! Reading real reanalysis files in tests would require shipping
//! gigabytes of data, so the monthly pipeline is exercised here
//! with a synthetic month implementing [`MonthlyInput`].

use float_cmp::approx_eq;
use ndarray::{array, Array, Array1, Array2, Array3, Axis};

use super::{
    grid::Grid,
    hybrid::HybridCoefficients,
    input::MonthlyInput,
    month::{process_month, MonthSettings},
    profile::{DatasetProfile, GeopotentialKind, LevelOrder, StateVariable},
    state::AtmosphereState,
};
use crate::{
    constants::EARTH_RADIUS,
    errors::{AmetError, DataLoadError, ValidationError},
};

const SHAPE: (usize, usize, usize) = (3, 7, 8);

struct SyntheticMonth {
    steps: usize,
    grid: Grid,
    coefficients: HybridCoefficients,
    temperature: Array3<f64>,
    specific_humidity: Array3<f64>,
    u_wind: Array3<f64>,
    v_wind: Array3<f64>,
    height: Array3<f64>,
    surface_pressure: Array2<f64>,
    /// Change of surface pressure between time steps (Pa)
    pressure_trend: f64,
}

impl SyntheticMonth {
    fn uniform(t: f64, q: f64, u: f64, v: f64) -> Self {
        SyntheticMonth {
            steps: 4,
            grid: Grid::new(
                Array1::linspace(90.0, -90.0, SHAPE.1),
                Array1::linspace(0.0, 315.0, SHAPE.2),
            )
            .unwrap(),
            // top to surface, p = [0, 40000, 70000, 100000] for ps = 1e5
            coefficients: HybridCoefficients::new(
                array![0.0, 20_000.0, 10_000.0, 0.0],
                array![0.0, 0.2, 0.6, 1.0],
            )
            .unwrap(),
            temperature: Array3::from_elem(SHAPE, t),
            specific_humidity: Array3::from_elem(SHAPE, q),
            u_wind: Array3::from_elem(SHAPE, u),
            v_wind: Array3::from_elem(SHAPE, v),
            height: Array3::zeros(SHAPE),
            surface_pressure: Array2::from_elem((SHAPE.1, SHAPE.2), 100_000.0),
            pressure_trend: 0.0,
        }
    }

    fn varying() -> Self {
        let mut month = SyntheticMonth::uniform(0.0, 0.0, 0.0, 0.0);

        month.temperature = Array::from_shape_fn(SHAPE, |(k, i, j)| {
            220.0 + 25.0 * k as f64 + (i as f64).sin() + 0.5 * j as f64
        });
        month.specific_humidity =
            Array::from_shape_fn(SHAPE, |(k, i, j)| 0.004 * k as f64 + 0.0001 * (i + j) as f64);
        month.u_wind =
            Array::from_shape_fn(SHAPE, |(k, _, j)| 10.0 - 3.0 * k as f64 + (j as f64).cos());
        month.v_wind = Array::from_shape_fn(SHAPE, |(k, i, j)| {
            2.0 * (i as f64 - 3.0) + (j as f64 * 0.7).sin() - k as f64
        });
        month.height = Array::from_shape_fn(SHAPE, |(k, _, _)| 10_000.0 - 4000.0 * k as f64);
        month.surface_pressure =
            Array::from_shape_fn((SHAPE.1, SHAPE.2), |(i, j)| 98_000.0 + 300.0 * i as f64 + 50.0 * j as f64);

        month
    }

    /// The same month stored from the surface to the top.
    fn reversed(&self) -> Self {
        let flip = |field: &Array3<f64>| {
            let mut field = field.clone();
            field.invert_axis(Axis(0));
            field
        };

        SyntheticMonth {
            steps: self.steps,
            grid: self.grid.clone(),
            coefficients: self.coefficients.reversed(),
            temperature: flip(&self.temperature),
            specific_humidity: flip(&self.specific_humidity),
            u_wind: flip(&self.u_wind),
            v_wind: flip(&self.v_wind),
            height: flip(&self.height),
            surface_pressure: self.surface_pressure.clone(),
            pressure_trend: self.pressure_trend,
        }
    }
}

impl MonthlyInput for SyntheticMonth {
    fn time_steps(&self) -> usize {
        self.steps
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn coefficients(&self) -> &HybridCoefficients {
        &self.coefficients
    }

    fn surface_pressure(&self, step: usize) -> Result<Array2<f64>, DataLoadError> {
        Ok(&self.surface_pressure + self.pressure_trend * step as f64)
    }

    fn field(&self, variable: StateVariable, _step: usize) -> Result<Array3<f64>, DataLoadError> {
        let field = match variable {
            StateVariable::Temperature => &self.temperature,
            StateVariable::SpecificHumidity => &self.specific_humidity,
            StateVariable::UWind => &self.u_wind,
            StateVariable::VWind => &self.v_wind,
            StateVariable::Geopotential => &self.height,
        };

        Ok(field.clone())
    }

    fn surface_geopotential(&self, _step: usize) -> Result<Array2<f64>, DataLoadError> {
        Ok(Array2::zeros((SHAPE.1, SHAPE.2)))
    }
}

fn settings(mass_correction: bool) -> MonthSettings {
    MonthSettings {
        level_order: LevelOrder::TopToSurface,
        geopotential_kind: GeopotentialKind::Height,
        constants: DatasetProfile::Merra2.constants(),
        time_step: 6.0 * 3600.0,
        mass_correction,
        point_output: true,
        correction_output: true,
    }
}

#[test]
fn resting_atmosphere_transports_nothing() {
    let input = SyntheticMonth::uniform(260.0, 0.002, 0.0, 0.0);
    let result = process_month(&input, &settings(true), 2000, 1).unwrap();

    assert!(result.zonal.total().iter().all(|&e| e == 0.0));

    let correction = result.correction.unwrap();
    assert!(correction.uc.iter().all(|&u| u == 0.0));
    assert!(correction.vc.iter().all(|&v| v == 0.0));
}

#[test]
fn uniform_northward_flow_without_correction() {
    let input = SyntheticMonth::uniform(250.0, 0.0, 0.0, 1.0);
    let settings = settings(false);
    let result = process_month(&input, &settings, 2000, 1).unwrap();

    let constants = settings.constants;
    let circumference = input.grid.zonal_spacing(EARTH_RADIUS) * SHAPE.2 as f64;
    let column_mass = 100_000.0 / constants.gravity;

    for i in 0..SHAPE.1 {
        let internal = constants.specific_heat * 250.0 * column_mass * circumference[i];
        let kinetic = 0.5 * column_mass * circumference[i];

        assert!(approx_eq!(
            f64,
            result.zonal.internal[i],
            internal,
            epsilon = 1e-9 * internal.abs() + 1e-6
        ));
        assert!(approx_eq!(
            f64,
            result.zonal.kinetic[i],
            kinetic,
            epsilon = 1e-9 * kinetic.abs() + 1e-6
        ));
        assert_eq!(result.zonal.latent[i], 0.0);
        assert_eq!(result.zonal.geopotential[i], 0.0);
    }

    // no transport through the poles
    assert_eq!(result.zonal.internal[0], 0.0);
    assert_eq!(result.zonal.internal[SHAPE.1 - 1], 0.0);

    let point = result.point.unwrap();
    let point_total = point.internal.sum_axis(Axis(1));
    assert!(approx_eq!(
        f64,
        point_total[3],
        result.zonal.internal[3],
        epsilon = 1e-9 * result.zonal.internal[3]
    ));
}

#[test]
fn native_level_order_does_not_change_the_result() {
    let top_to_surface = SyntheticMonth::varying();
    let surface_to_top = top_to_surface.reversed();

    let mut reversed_settings = settings(true);
    reversed_settings.level_order = LevelOrder::SurfaceToTop;

    let expected = process_month(&top_to_surface, &settings(true), 2000, 7).unwrap();
    let result = process_month(&surface_to_top, &reversed_settings, 2000, 7).unwrap();

    assert_eq!(result.zonal, expected.zonal);
    assert_eq!(result.correction, expected.correction);
    assert!(result.zonal.total().iter().all(|e| e.is_finite()));
}

#[test]
fn mismatched_level_order_is_flagged() {
    let surface_to_top = SyntheticMonth::varying().reversed();

    let result = process_month(&surface_to_top, &settings(true), 2000, 7);

    assert!(matches!(
        result,
        Err(AmetError::Validation(ValidationError::LevelOrdering))
    ));
}

#[test]
fn missing_values_stay_missing() {
    let mut input = SyntheticMonth::uniform(250.0, 0.0, 0.0, 1.0);
    input.temperature[[1, 2, 3]] = f64::NAN;

    let result = process_month(&input, &settings(false), 2000, 1).unwrap();

    assert!(result.zonal.internal[2].is_nan());
    assert!(result.zonal.internal[1].is_finite());
    assert!(result.zonal.kinetic[2].is_finite());
}

#[test]
fn missing_values_stay_local_with_mass_correction() {
    let mut input = SyntheticMonth::varying();
    input.specific_humidity[[2, 5, 3]] = f64::NAN;

    let result = process_month(&input, &settings(true), 2000, 7).unwrap();

    let correction = result.correction.unwrap();
    assert!(correction.uc.iter().all(|u| u.is_finite()));
    assert!(correction.vc.iter().all(|v| v.is_finite()));

    let total = result.zonal.total();
    assert!(result.zonal.latent[5].is_nan());
    assert!(result.zonal.kinetic[5].is_finite());

    for i in (0..SHAPE.1).filter(|&i| i != 5) {
        assert!(total[i].is_finite());
    }
}

#[test]
fn rising_surface_pressure_is_balanced_by_inflow() {
    let mut input = SyntheticMonth::uniform(260.0, 0.0, 0.0, 0.0);
    input.pressure_trend = 100.0;

    let settings = settings(true);
    let result = process_month(&input, &settings, 2000, 1).unwrap();
    let correction = result.correction.unwrap();

    let tendency = 100.0 / settings.time_step;
    let area = input.grid.cell_area(EARTH_RADIUS);
    let dx = input.grid.zonal_spacing(EARTH_RADIUS);

    // latitudes are descending, rows i.. form the cap south of row i
    for i in 1..SHAPE.1 - 1 {
        let cap_area: f64 = (i..SHAPE.1).map(|r| area[r]).sum();

        let expected = (0..input.steps)
            .map(|s| tendency * cap_area / (dx[i] * (100_000.0 + 100.0 * s as f64)))
            .sum::<f64>()
            / input.steps as f64;

        assert!(expected > 0.0);

        for j in 0..SHAPE.2 {
            assert!(approx_eq!(
                f64,
                correction.vc[[i, j]],
                expected,
                epsilon = 1e-9 * expected
            ));
        }
    }

    assert!(correction.uc.iter().all(|u| u.abs() < 1e-12));

    // the corrected wind carries heat southwards
    assert!(result.zonal.internal[3] < 0.0);
}

#[test]
fn implausible_input_is_rejected() {
    let input = SyntheticMonth::uniform(250.0, 0.0, 500.0, 0.0);

    let result = process_month(&input, &settings(false), 2000, 1);

    assert!(matches!(
        result,
        Err(AmetError::DataLoad(DataLoadError::Validation(
            ValidationError::OutOfRange { .. }
        )))
    ));
}

#[test]
fn hypsometric_geopotential_grows_upwards() {
    let input = SyntheticMonth::uniform(250.0, 0.001, 0.0, 0.0);

    let state = AtmosphereState::from_input(
        &input,
        0,
        &input.coefficients,
        LevelOrder::TopToSurface,
        GeopotentialKind::Hypsometric,
        9.80616,
    )
    .unwrap();

    let column = state.geopotential.slice(ndarray::s![.., 3, 4]).to_vec();

    assert!(column[2] > 0.0);
    assert!(column[1] > column[2]);
    assert!(column[0] > column[1]);
}

#[test]
fn geopotential_on_levels_is_taken_as_read() {
    let mut input = SyntheticMonth::uniform(250.0, 0.001, 0.0, 0.0);
    input.height = Array::from_shape_fn(SHAPE, |(k, _, _)| 60_000.0 - 20_000.0 * k as f64);

    let read = |kind| {
        AtmosphereState::from_input(
            &input,
            0,
            &input.coefficients,
            LevelOrder::TopToSurface,
            kind,
            9.80616,
        )
        .unwrap()
        .geopotential
    };

    assert_eq!(read(GeopotentialKind::Geopotential), input.height);
    assert_eq!(read(GeopotentialKind::Height), &input.height * 9.80616);
}
