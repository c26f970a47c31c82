//! Accuracy tests for the quadrature routines on integrals with known values

use kumquat_core::quadrature::DEFAULT_TOLERANCE;
use kumquat_core::{
    exp_sinh, gauss_kronrod, sinh_sinh, tanh_sinh, trapezoidal, GaussKronrodOptions, KronrodRule,
    Options, QuadratureError,
};
use num_complex::Complex64;
use std::convert::Infallible;
use std::f64::consts::{E, PI};

fn real(f: impl Fn(f64) -> f64) -> impl FnMut(f64) -> Result<Complex64, Infallible> {
    move |x| Ok(Complex64::new(f(x), 0.0))
}

fn complex(f: impl Fn(f64) -> Complex64) -> impl FnMut(f64) -> Result<Complex64, Infallible> {
    move |x| Ok(f(x))
}

fn assert_close(got: Complex64, expected: Complex64, tolerance: f64) {
    assert!(
        (got - expected).norm() <= tolerance,
        "expected {}, got {} (difference {:e})",
        expected,
        got,
        (got - expected).norm()
    );
}

#[test]
fn test_gauss_kronrod_every_rule() {
    for rule in KronrodRule::ALL {
        let options = GaussKronrodOptions {
            points: rule,
            ..GaussKronrodOptions::default()
        };
        let estimate = gauss_kronrod(real(f64::exp), 0.0, 1.0, &options).unwrap();
        assert_close(estimate.value, Complex64::new(E - 1.0, 0.0), 1e-13);
        assert_eq!(estimate.evaluations, rule.points());
    }
}

#[test]
fn test_gauss_kronrod_published_15_point_nodes() {
    let abscissa = KronrodRule::K15.abscissa();
    let expected = [
        0.0,
        0.207_784_955_007_898_5,
        0.405_845_151_377_397_2,
        0.586_087_235_467_691_1,
        0.741_531_185_599_394_4,
        0.864_864_423_359_769_1,
        0.949_107_912_342_758_5,
        0.991_455_371_120_812_6,
    ];
    assert_eq!(abscissa.len(), expected.len());
    for (got, want) in abscissa.iter().zip(expected) {
        assert!((got - want).abs() < 1e-14, "{} vs {}", got, want);
    }
    assert!((KronrodRule::K15.weights()[0] - 0.209_482_141_084_727_8).abs() < 1e-14);
}

#[test]
fn test_oscillatory_complex_integrand() {
    // integral of exp(10ix) over [0, 1] is (exp(10i) - 1) / (10i)
    let expected = (Complex64::new(0.0, 10.0).exp() - 1.0) / Complex64::new(0.0, 10.0);
    let f = |x: f64| Complex64::new(0.0, 10.0 * x).exp();

    let estimate = gauss_kronrod(complex(f), 0.0, 1.0, &GaussKronrodOptions::default()).unwrap();
    assert_close(estimate.value, expected, 1e-12);

    let estimate = tanh_sinh(complex(f), 0.0, 1.0, &Options::default()).unwrap();
    assert_close(estimate.value, expected, 1e-8);
}

#[test]
fn test_endpoint_singularities() {
    let estimate = tanh_sinh(real(|x: f64| 1.0 / x.sqrt()), 0.0, 1.0, &Options::default()).unwrap();
    assert_close(estimate.value, Complex64::new(2.0, 0.0), 1e-8);

    // log(x) is integrable at zero: the integral over [0, 1] is -1
    let estimate = tanh_sinh(real(f64::ln), 0.0, 1.0, &Options::default()).unwrap();
    assert_close(estimate.value, Complex64::new(-1.0, 0.0), 1e-8);
}

#[test]
fn test_real_line() {
    let gaussian = |x: f64| (-x * x).exp();
    let expected = Complex64::new(PI.sqrt(), 0.0);

    let estimate = sinh_sinh(real(gaussian), &Options::default()).unwrap();
    assert_close(estimate.value, expected, 1e-9);
    assert!(estimate.converged(DEFAULT_TOLERANCE));

    let estimate = tanh_sinh(real(gaussian), f64::NEG_INFINITY, f64::INFINITY, &Options::default()).unwrap();
    assert_close(estimate.value, expected, 1e-9);
}

#[test]
fn test_half_line() {
    let expected = Complex64::new(1.0, 0.0);

    let estimate = exp_sinh(real(|x: f64| (-x).exp()), 0.0, f64::INFINITY, &Options::default()).unwrap();
    assert_close(estimate.value, expected, 1e-9);

    let estimate = tanh_sinh(real(|x: f64| (-x).exp()), 0.0, f64::INFINITY, &Options::default()).unwrap();
    assert_close(estimate.value, expected, 1e-9);
}

#[test]
fn test_trapezoidal_polynomial_and_periodic() {
    let estimate = trapezoidal(real(|x| x * x), 0.0, 3.0, &Options::trapezoidal()).unwrap();
    // Second-order rule: only approximately 9 after 12 halvings
    assert_close(estimate.value, Complex64::new(9.0, 0.0), 1e-5);

    let estimate = trapezoidal(
        complex(|x: f64| Complex64::new(x.cos().exp(), x.sin().exp())),
        0.0,
        2.0 * PI,
        &Options::trapezoidal(),
    )
    .unwrap();
    // Both parts integrate to 2 pi I_0(1)
    let bessel_i0 = 1.266_065_877_752_008_4;
    assert_close(
        estimate.value,
        Complex64::new(2.0 * PI * bessel_i0, 2.0 * PI * bessel_i0),
        1e-12,
    );
}

#[test]
fn test_requested_tolerance_is_met() {
    for tolerance in [1e-4, 1e-8, 1e-12] {
        let options = Options {
            tolerance,
            ..Options::default()
        };
        let estimate = tanh_sinh(real(|x: f64| x.cos()), 0.0, 1.0, &options).unwrap();
        assert!(estimate.converged(tolerance));
        assert_close(estimate.value, Complex64::new(1.0_f64.sin(), 0.0), tolerance);
    }
}

#[test]
fn test_invalid_options() {
    let options = Options {
        tolerance: -1.0,
        ..Options::default()
    };
    let result = tanh_sinh(real(|x| x), 0.0, 1.0, &options);
    assert!(matches!(result, Err(QuadratureError::Options(_))));
}

#[test]
fn test_non_finite_integrand() {
    let result = gauss_kronrod(
        real(|x: f64| if x > 0.5 { f64::NAN } else { x }),
        0.0,
        1.0,
        &GaussKronrodOptions::default(),
    );
    assert!(matches!(result, Err(QuadratureError::NonFinite { x }) if x > 0.5));
}

#[test]
fn test_interval_too_wide_to_map() {
    let constant = || real(|_| 1e-300);
    let (a, b) = (-f64::MAX, f64::MAX);

    let results = [
        tanh_sinh(constant(), a, b, &Options::default()),
        gauss_kronrod(constant(), a, b, &GaussKronrodOptions::default()),
        trapezoidal(constant(), a, b, &Options::trapezoidal()),
    ];
    for result in results {
        assert!(
            matches!(result, Err(QuadratureError::InvalidInterval { .. })),
            "{:?}",
            result
        );
    }

    // Half of the same range still maps
    let estimate = tanh_sinh(constant(), 0.0, f64::MAX, &Options::default()).unwrap();
    assert!(estimate.value.re.is_finite());
}
