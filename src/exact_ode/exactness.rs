//! Exactness test: is ∂M/∂y identically equal to ∂N/∂x?
//!
//! With `ExactnessStrategy::SymbolicThenNumeric` the expanded difference of the two derivatives
//! is inspected first: `0` means exact, a polynomial (negative powers allowed) whose coefficients
//! differ beyond the tolerance means not exact. Anything else, and everything under
//! `NumericOnly`, is decided by sampling:
//!
//! * the five diagonal points `(0.2i, 0.2i)`, i = 1..5, plus extra points when `exp`,
//!   `sin`/`cos` or `ln` occur in M or N;
//! * a point counts only when both derivatives are finite there;
//! * the first point where the values disagree decides "not exact";
//! * otherwise the pair is exact when at least `min_valid_points` points counted.
use crate::exact_ode::derivatives::{DerivativePair, EvaluationPoint, VARIABLES};
use crate::exact_ode::errors::EngineResult;
use crate::exact_ode::settings::{EngineSettings, ExactnessStrategy};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_simplify::MonomialKey;
use crate::symbolic::symbolic_traits::SymbolicBackend;
use log::{debug, trace};
use std::f64::consts::{E, PI};
use strum_macros::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum DecisionMethod {
    #[strum(to_string = "symbolic")]
    Symbolic,
    #[strum(to_string = "numeric sampling")]
    NumericSampling,
}

/// both derivatives at one test point
#[derive(Clone, Debug, PartialEq)]
pub struct SampleOutcome {
    pub point: EvaluationPoint,
    pub dm_dy: f64,
    pub dn_dx: f64,
    pub valid: bool,
    pub agree: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExactnessReport {
    pub exact: bool,
    pub method: DecisionMethod,
    pub dm_dy: String,
    pub dn_dx: String,
    /// sampled points in order, up to and including the first disagreement
    pub samples: Vec<SampleOutcome>,
    pub valid_points: usize,
}

/// Test points for the pair (M, N) in a fixed order. A point listed twice (the `ln` set
/// repeats `(1, 1)`) is sampled and counted twice.
pub fn test_points(m: &Expr, n: &Expr) -> Vec<EvaluationPoint> {
    let mut points: Vec<EvaluationPoint> = (1..=5)
        .map(|i| {
            let v = 0.2 * i as f64;
            EvaluationPoint::new(v, v)
        })
        .collect();
    let either = |pred: fn(&Expr) -> bool| pred(m) || pred(n);
    if either(Expr::contains_exp) {
        // kept small so exponentials do not overflow
        points.extend(
            [(0.5, 0.5), (0.3, 0.3), (1.0, 0.5), (0.5, 1.0), (0.1, 0.5), (0.5, 0.1)]
                .map(|(x, y)| EvaluationPoint::new(x, y)),
        );
    }
    if either(Expr::contains_sin_or_cos) {
        points.extend(
            [(PI / 6.0, 0.5), (PI / 4.0, 0.5), (PI / 3.0, 0.5)].map(|(x, y)| EvaluationPoint::new(x, y)),
        );
    }
    if either(Expr::contains_ln) {
        points.extend([(1.0, 1.0), (2.0, 2.0), (E, E)].map(|(x, y)| EvaluationPoint::new(x, y)));
    }
    points
}

pub struct ExactnessTester<'a, B: SymbolicBackend + ?Sized> {
    backend: &'a B,
    settings: &'a EngineSettings,
}

impl<'a, B: SymbolicBackend + ?Sized> ExactnessTester<'a, B> {
    pub fn new(backend: &'a B, settings: &'a EngineSettings) -> Self {
        ExactnessTester { backend, settings }
    }

    pub fn is_exact(&self, m: &Expr, n: &Expr) -> EngineResult<bool> {
        Ok(self.check(m, n)?.exact)
    }

    pub fn check(&self, m: &Expr, n: &Expr) -> EngineResult<ExactnessReport> {
        let pair = DerivativePair::compute(self.backend, m, n)?;
        let (dm_dy, dn_dx) = pair.strings();
        if self.settings.strategy == ExactnessStrategy::SymbolicThenNumeric {
            if let Some(exact) = self.decide_symbolically(&pair) {
                debug!("∂M/∂y = {}, ∂N/∂x = {}: decided symbolically, exact = {}", dm_dy, dn_dx, exact);
                return Ok(ExactnessReport {
                    exact,
                    method: DecisionMethod::Symbolic,
                    dm_dy,
                    dn_dx,
                    samples: Vec::new(),
                    valid_points: 0,
                });
            }
        }
        let (samples, valid_points) = self.sample(&pair, &test_points(m, n))?;
        let exact = samples.iter().all(|s| !s.valid || s.agree)
            && valid_points >= self.settings.min_valid_points;
        debug!(
            "∂M/∂y = {}, ∂N/∂x = {}: {} valid points, exact = {}",
            dm_dy, dn_dx, valid_points, exact
        );
        Ok(ExactnessReport {
            exact,
            method: DecisionMethod::NumericSampling,
            dm_dy,
            dn_dx,
            samples,
            valid_points,
        })
    }

    /// Some(answer) when the canonical form of ∂M/∂y − ∂N/∂x settles the question.
    ///
    /// A polynomial residual means "not exact" only if some coefficient of it is more than
    /// float noise under the sampling tolerance; otherwise sampling decides.
    fn decide_symbolically(&self, pair: &DerivativePair) -> Option<bool> {
        let difference = self.backend.expand(&pair.difference());
        if difference.is_zero() {
            return Some(true);
        }
        let residual = difference.polynomial_terms().filter(|terms| !terms.is_empty())?;
        let sides = pair.dm_dy.polynomial_terms().zip(pair.dn_dx.polynomial_terms());
        let coefficient = |terms: &[(MonomialKey, f64)], key: &MonomialKey| {
            terms.iter().find(|(k, _)| k == key).map_or(0.0, |(_, c)| *c)
        };
        let significant = residual.iter().any(|(key, c)| match &sides {
            Some((dm, dn)) => {
                !self.settings.values_agree(coefficient(dm.as_slice(), key), coefficient(dn.as_slice(), key))
            }
            None => !self.settings.values_agree(*c, 0.0),
        });
        significant.then_some(false)
    }

    fn sample(
        &self,
        pair: &DerivativePair,
        points: &[EvaluationPoint],
    ) -> EngineResult<(Vec<SampleOutcome>, usize)> {
        let dm_dy = self.backend.compile(&pair.dm_dy, &VARIABLES)?;
        let dn_dx = self.backend.compile(&pair.dn_dx, &VARIABLES)?;
        let mut samples = Vec::with_capacity(points.len());
        let mut valid_points = 0;
        for point in points {
            let args = point.as_args();
            let (a, b) = (dm_dy(&args), dn_dx(&args));
            let valid = a.is_finite() && b.is_finite();
            let agree = valid && self.settings.values_agree(a, b);
            trace!("at {}: ∂M/∂y = {}, ∂N/∂x = {}", point, a, b);
            samples.push(SampleOutcome {
                point: *point,
                dm_dy: a,
                dn_dx: b,
                valid,
                agree,
            });
            if valid {
                valid_points += 1;
                if !agree {
                    break;
                }
            }
        }
        Ok((samples, valid_points))
    }
}
