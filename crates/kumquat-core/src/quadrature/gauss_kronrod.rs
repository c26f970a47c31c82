//! Adaptive Gauss-Kronrod quadrature

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use super::legendre::{self, KronrodNodes};
use super::{check_finite, report, Counted, Estimate, GaussKronrodOptions};
use crate::error::{Error, QuadratureError};

/// Supported Gauss-Kronrod rules, by total point count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum KronrodRule {
    /// 7-point Gauss, 15-point Kronrod
    K15,
    /// 15-point Gauss, 31-point Kronrod
    #[default]
    K31,
    /// 20-point Gauss, 41-point Kronrod
    K41,
    /// 25-point Gauss, 51-point Kronrod
    K51,
    /// 30-point Gauss, 61-point Kronrod
    K61,
}

struct Tables {
    rule: KronrodNodes,
    /// Non-negative nodes, ascending from zero
    abscissa: Vec<f64>,
    /// Kronrod weights aligned with `abscissa`
    weights: Vec<f64>,
}

impl Tables {
    fn build(gauss_points: usize) -> Self {
        let rule = legendre::kronrod(gauss_points);
        let middle = gauss_points;
        let abscissa = rule.nodes[middle..].to_vec();
        let weights = rule.kronrod_weights[middle..].to_vec();
        tracing::trace!(points = rule.nodes.len(), "generated Gauss-Kronrod rule");
        Self {
            rule,
            abscissa,
            weights,
        }
    }
}

static K15: OnceLock<Tables> = OnceLock::new();
static K31: OnceLock<Tables> = OnceLock::new();
static K41: OnceLock<Tables> = OnceLock::new();
static K51: OnceLock<Tables> = OnceLock::new();
static K61: OnceLock<Tables> = OnceLock::new();

impl KronrodRule {
    /// Every supported rule, smallest first
    pub const ALL: [KronrodRule; 5] = [Self::K15, Self::K31, Self::K41, Self::K51, Self::K61];

    /// Total number of Kronrod points
    pub fn points(self) -> usize {
        match self {
            Self::K15 => 15,
            Self::K31 => 31,
            Self::K41 => 41,
            Self::K51 => 51,
            Self::K61 => 61,
        }
    }

    /// Number of points of the embedded Gauss rule
    pub fn gauss_points(self) -> usize {
        (self.points() - 1) / 2
    }

    /// Non-negative Kronrod nodes on `[-1, 1]`, ascending from zero
    pub fn abscissa(self) -> &'static [f64] {
        &self.tables().abscissa
    }

    /// Kronrod weights matching [`abscissa`](Self::abscissa)
    pub fn weights(self) -> &'static [f64] {
        &self.tables().weights
    }

    fn tables(self) -> &'static Tables {
        let cell = match self {
            Self::K15 => &K15,
            Self::K31 => &K31,
            Self::K41 => &K41,
            Self::K51 => &K51,
            Self::K61 => &K61,
        };
        cell.get_or_init(|| Tables::build(self.gauss_points()))
    }

    /// Kronrod and Gauss estimates on `[a, b]`, plus the local L1 norm
    fn apply<F, E>(
        self,
        f: &mut Counted<F>,
        a: f64,
        b: f64,
    ) -> Result<(Complex64, Complex64, f64), QuadratureError<E>>
    where
        F: FnMut(f64) -> Result<Complex64, E>,
    {
        let rule = &self.tables().rule;
        let center = 0.5 * (a + b);
        let half = 0.5 * (b - a);

        let mut kronrod = Complex64::new(0.0, 0.0);
        let mut gauss = Complex64::new(0.0, 0.0);
        let mut l1 = 0.0;
        for ((&x, &wk), &wg) in rule
            .nodes
            .iter()
            .zip(&rule.kronrod_weights)
            .zip(&rule.gauss_weights)
        {
            let y = f.eval(center + half * x)?;
            kronrod += wk * y;
            gauss += wg * y;
            l1 += wk * y.norm();
        }
        Ok((kronrod * half, gauss * half, l1 * half))
    }
}

impl TryFrom<usize> for KronrodRule {
    type Error = Error;

    fn try_from(points: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|rule| rule.points() == points)
            .ok_or_else(|| {
                Error::validation(
                    "points",
                    format!("must be one of 15, 31, 41, 51 or 61, got {}", points),
                )
            })
    }
}

impl From<KronrodRule> for usize {
    fn from(rule: KronrodRule) -> Self {
        rule.points()
    }
}

impl fmt::Display for KronrodRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-point Gauss-Kronrod", self.points())
    }
}

#[derive(Default)]
struct Accumulator {
    value: Complex64,
    error: f64,
    l1: f64,
    depth: usize,
}

fn refine<F, E>(
    f: &mut Counted<F>,
    rule: KronrodRule,
    a: f64,
    b: f64,
    depth: usize,
    options: &GaussKronrodOptions,
    total: &mut Accumulator,
) -> Result<(), QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    let (kronrod, gauss, l1) = rule.apply(f, a, b)?;
    let error = (kronrod - gauss).norm();
    let middle = 0.5 * (a + b);
    let splittable = a < middle && middle < b;

    if depth < options.max_levels && error > options.tolerance * l1 && splittable {
        refine(f, rule, a, middle, depth + 1, options, total)?;
        return refine(f, rule, middle, b, depth + 1, options, total);
    }

    total.value += kronrod;
    total.error += error;
    total.l1 += l1;
    total.depth = total.depth.max(depth);
    Ok(())
}

/// Integrate `f` over the finite interval `[a, b]` by adaptive Gauss-Kronrod
/// quadrature.
///
/// Each subinterval is evaluated with the chosen Kronrod rule and its
/// embedded Gauss rule; the difference between the two is the local error.
/// Subintervals whose error exceeds `tolerance` times their L1 norm are
/// bisected, at most `max_levels` times deep.
#[tracing::instrument(level = "debug", skip(f))]
pub fn gauss_kronrod<F, E>(
    f: F,
    a: f64,
    b: f64,
    options: &GaussKronrodOptions,
) -> Result<Estimate, QuadratureError<E>>
where
    F: FnMut(f64) -> Result<Complex64, E>,
{
    options.validate()?;
    check_finite(a, b)?;

    let mut f = Counted::new(f);
    let mut total = Accumulator::default();
    refine(&mut f, options.points, a, b, 0, options, &mut total)?;

    let estimate = Estimate {
        value: total.value,
        error: total.error,
        l1_norm: total.l1,
        levels: total.depth,
        evaluations: f.evaluations(),
    };
    report("gauss_kronrod", &estimate, options.tolerance);
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn real(f: impl Fn(f64) -> f64) -> impl FnMut(f64) -> Result<Complex64, Infallible> {
        move |x| Ok(Complex64::new(f(x), 0.0))
    }

    #[test]
    fn test_rule_conversions() {
        assert_eq!(KronrodRule::default(), KronrodRule::K31);
        assert_eq!(KronrodRule::try_from(61).ok(), Some(KronrodRule::K61));
        assert!(KronrodRule::try_from(21).is_err());
        assert_eq!(usize::from(KronrodRule::K41), 41);
        assert_eq!(KronrodRule::K51.gauss_points(), 25);
    }

    #[test]
    fn test_rule_serde() {
        let rule: KronrodRule = serde_json::from_str("15").unwrap();
        assert_eq!(rule, KronrodRule::K15);
        assert!(serde_json::from_str::<KronrodRule>("16").is_err());
        assert_eq!(serde_json::to_string(&KronrodRule::K61).unwrap(), "61");
    }

    #[test]
    fn test_abscissa_and_weights() {
        for rule in KronrodRule::ALL {
            let abscissa = rule.abscissa();
            let weights = rule.weights();
            assert_eq!(abscissa.len(), rule.gauss_points() + 1);
            assert_eq!(weights.len(), abscissa.len());
            assert_eq!(abscissa[0], 0.0);
            // Twice the sum minus the center weight integrates 1 over [-1, 1]
            let total = 2.0 * weights.iter().sum::<f64>() - weights[0];
            assert!((total - 2.0).abs() < 1e-13, "{}", rule);
        }
    }

    #[test]
    fn test_polynomial_is_exact_without_refinement() {
        let options = GaussKronrodOptions {
            points: KronrodRule::K15,
            ..GaussKronrodOptions::default()
        };
        let estimate = gauss_kronrod(real(|x| x.powi(5) - 3.0 * x), 0.0, 2.0, &options).unwrap();
        assert!((estimate.value.re - (64.0 / 6.0 - 6.0)).abs() < 1e-13);
        assert_eq!(estimate.levels, 0);
        assert_eq!(estimate.evaluations, 15);
    }

    #[test]
    fn test_complex_integrand() {
        // integral of exp(ix) over [0, pi] is 2i
        let estimate = gauss_kronrod(
            |x: f64| Ok::<_, Infallible>(Complex64::new(0.0, x).exp()),
            0.0,
            std::f64::consts::PI,
            &GaussKronrodOptions::default(),
        )
        .unwrap();
        assert!(estimate.value.re.abs() < 1e-13);
        assert!((estimate.value.im - 2.0).abs() < 1e-13);
        assert!(estimate.converged(crate::quadrature::DEFAULT_TOLERANCE));
    }

    #[test]
    fn test_adaptive_refinement_on_kink() {
        let estimate = gauss_kronrod(
            real(|x: f64| (x - 0.3).abs()),
            0.0,
            1.0,
            &GaussKronrodOptions::default(),
        )
        .unwrap();
        assert!(estimate.levels > 0);
        assert!((estimate.value.re - 0.29).abs() < 1e-9);
    }

    #[test]
    fn test_zero_levels_disables_refinement() {
        let options = GaussKronrodOptions {
            max_levels: 0,
            ..GaussKronrodOptions::default()
        };
        let estimate = gauss_kronrod(real(|x: f64| x.sqrt()), 0.0, 1.0, &options).unwrap();
        assert_eq!(estimate.evaluations, 31);
        assert_eq!(estimate.levels, 0);
    }

    #[test]
    fn test_rejects_infinite_interval() {
        let result = gauss_kronrod(
            real(|x: f64| (-x).exp()),
            0.0,
            f64::INFINITY,
            &GaussKronrodOptions::default(),
        );
        assert!(matches!(result, Err(QuadratureError::InvalidInterval { .. })));
    }

    #[test]
    fn test_integrand_error_aborts() {
        let mut calls = 0;
        let result = gauss_kronrod(
            |x: f64| {
                calls += 1;
                if x > 0.5 {
                    Err("boom")
                } else {
                    Ok(Complex64::new(x, 0.0))
                }
            },
            0.0,
            1.0,
            &GaussKronrodOptions::default(),
        );
        assert!(matches!(result, Err(QuadratureError::Integrand("boom"))));
        assert!(calls < 31);
    }
}
