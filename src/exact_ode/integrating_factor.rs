//! Integrating-factor search.
//!
//! Families are tried in a fixed order and the first factor that makes μM dx + μN dy = 0 exact
//! wins:
//!
//! | family              | accepted when                                                |
//! |---------------------|--------------------------------------------------------------|
//! | μ(x)                | (∂M/∂y − ∂N/∂x)/N is free of y; μ = exp(∫ r dx)               |
//! | μ(y)                | (∂N/∂x − ∂M/∂y)/M is free of x; μ = exp(∫ r dy)               |
//! | μ(xy)               | M, N homogeneous of the same degree d; μ = 1/(xy)^d is exact |
//! | μ = x^m * y^n       | first (m, n), m outer, n inner, that is exact                |
//! | μ = e^(ax + by)     | first (a, b) ≠ (0, 0), a outer, b inner, that is exact       |
//! | common guess        | first entry of `COMMON_GUESSES` that is exact                |
//!
//! μ(x) and μ(y) are reported even when the product is not exact, but only if no later
//! family does better. The brute-force families may run in parallel and under a deadline;
//! either way the reported factor is the first exact one in enumeration order among the
//! candidates that were evaluated.
use crate::exact_ode::derivatives::DerivativePair;
use crate::exact_ode::errors::{EngineError, EngineResult};
use crate::exact_ode::exactness::ExactnessTester;
use crate::exact_ode::settings::EngineSettings;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_traits::SymbolicBackend;
use itertools::Itertools;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum FactorFamily {
    #[strum(to_string = "μ(x)")]
    OfX,
    #[strum(to_string = "μ(y)")]
    OfY,
    #[strum(to_string = "μ(xy)")]
    OfXY,
    #[strum(to_string = "μ = x^m * y^n")]
    PowerForm,
    #[strum(to_string = "μ = e^(ax + by)")]
    ExponentialForm,
    #[strum(to_string = "common guess")]
    CommonGuess,
}

/// tried in this order by the last family
pub const COMMON_GUESSES: [&str; 14] = [
    "1/x", "1/y", "x", "y", "1/(x*y)", "x*y", "exp(x)", "exp(-x)", "exp(y)", "exp(-y)", "1/x^2",
    "1/y^2", "x^2", "y^2",
];

pub const NOT_FOUND: &str = "No integrating factor found";

#[derive(Clone, Debug, PartialEq)]
pub struct IntegratingFactorResult {
    pub found: bool,
    pub factor: String,
    pub family: Option<FactorFamily>,
    pub transformed_m: String,
    pub transformed_n: String,
    /// `"{μM}dx + {μN}dy = 0"`, empty when nothing was found
    pub new_equation: String,
    pub exact_after_application: bool,
    pub derivation_steps: Vec<String>,
}

impl IntegratingFactorResult {
    fn not_found(derivation_steps: Vec<String>) -> Self {
        IntegratingFactorResult {
            found: false,
            factor: NOT_FOUND.to_string(),
            family: None,
            transformed_m: String::new(),
            transformed_n: String::new(),
            new_equation: String::new(),
            exact_after_application: false,
            derivation_steps,
        }
    }

    /// what callers get when the search itself failed
    pub fn failure(err: &EngineError) -> Self {
        IntegratingFactorResult {
            factor: format!("Error: {}", err),
            ..Self::not_found(vec!["Error calculating integrating factor.".to_string()])
        }
    }

    pub fn steps_text(&self) -> String {
        self.derivation_steps.join("\n")
    }
}

/// a factor applied to (M, N)
#[derive(Clone, Debug)]
struct Applied {
    family: FactorFamily,
    factor: Expr,
    m: Expr,
    n: Expr,
    exact: bool,
    steps: Vec<String>,
}

impl Applied {
    fn into_result(self) -> IntegratingFactorResult {
        let (m, n) = (self.m.to_string(), self.n.to_string());
        IntegratingFactorResult {
            found: true,
            factor: self.factor.to_string(),
            family: Some(self.family),
            new_equation: format!("{}dx + {}dy = 0", m, n),
            transformed_m: m,
            transformed_n: n,
            exact_after_application: self.exact,
            derivation_steps: self.steps,
        }
    }
}

struct SearchClock {
    started: Instant,
    limit: Option<Duration>,
    expired: AtomicBool,
}

impl SearchClock {
    fn start(limit: Option<Duration>) -> Self {
        SearchClock {
            started: Instant::now(),
            limit,
            expired: AtomicBool::new(false),
        }
    }

    fn out_of_time(&self) -> bool {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => {
                self.expired.store(true, Ordering::Relaxed);
                true
            }
            _ => false,
        }
    }

    fn has_expired(&self) -> bool {
        self.expired.load(Ordering::Relaxed)
    }
}

pub struct FactorSearch<'a, B: SymbolicBackend + ?Sized> {
    backend: &'a B,
    settings: &'a EngineSettings,
    tester: ExactnessTester<'a, B>,
}

impl<'a, B: SymbolicBackend + ?Sized> FactorSearch<'a, B> {
    pub fn new(backend: &'a B, settings: &'a EngineSettings) -> Self {
        FactorSearch {
            backend,
            settings,
            tester: ExactnessTester::new(backend, settings),
        }
    }

    pub fn find(&self, m: &Expr, n: &Expr) -> EngineResult<IntegratingFactorResult> {
        let pair = DerivativePair::compute(self.backend, m, n)?;
        let mut fallback: Option<Applied> = None;

        for family in [FactorFamily::OfX, FactorFamily::OfY] {
            match self.separable_factor(family, &pair, m, n) {
                Ok(Some(applied)) if applied.exact => {
                    info!("{} = {} makes the equation exact", family, applied.factor);
                    return Ok(applied.into_result());
                }
                Ok(Some(applied)) => {
                    info!("{} = {} found, but μM dx + μN dy is not exact", family, applied.factor);
                    if fallback.is_none() {
                        fallback = Some(applied);
                    }
                }
                Ok(None) => debug!("{} does not apply", family),
                Err(err) => warn!("{} failed: {}", family, err),
            }
        }

        match self.homogeneous_factor(m, n) {
            Ok(Some(applied)) if applied.exact => {
                info!("{} = {} makes the equation exact", applied.family, applied.factor);
                return Ok(applied.into_result());
            }
            Ok(_) => debug!("{} does not apply", FactorFamily::OfXY),
            Err(err) => warn!("{} failed: {}", FactorFamily::OfXY, err),
        }

        let clock = SearchClock::start(self.settings.deadline());
        let brute_force = self
            .power_factor(m, n, &clock)
            .or_else(|| self.exponential_factor(m, n, &clock))
            .or_else(|| self.common_guess(m, n, &clock));
        if let Some(applied) = brute_force {
            info!("{} = {} makes the equation exact", applied.family, applied.factor);
            return Ok(applied.into_result());
        }

        if let Some(applied) = fallback {
            return Ok(applied.into_result());
        }
        let mut steps = vec!["The following methods were attempted:".to_string()];
        steps.extend(
            FactorFamily::iter()
                .enumerate()
                .map(|(i, family)| match family {
                    FactorFamily::CommonGuess => format!("{}. {} (fallback)", i + 1, family),
                    _ => format!("{}. {}", i + 1, family),
                }),
        );
        if clock.has_expired() {
            let err = EngineError::DeadlineExceeded(self.settings.search_deadline_ms.unwrap_or(0));
            warn!("{}", err);
            steps.push(format!("Stopped early: {}.", err));
        }
        steps.push("None produced a valid integrating factor.".to_string());
        info!("no integrating factor found for M = {}, N = {}", m, n);
        Ok(IntegratingFactorResult::not_found(steps))
    }

    fn apply(&self, family: FactorFamily, factor: Expr, m: &Expr, n: &Expr, steps: Vec<String>) -> EngineResult<Applied> {
        let new_m = self.backend.expand(&(factor.clone() * m.clone()));
        let new_n = self.backend.expand(&(factor.clone() * n.clone()));
        let exact = self.tester.is_exact(&new_m, &new_n)?;
        Ok(Applied {
            family,
            factor,
            m: new_m,
            n: new_n,
            exact,
            steps,
        })
    }

    /// μ(x) or μ(y) from the ratio test
    fn separable_factor(
        &self,
        family: FactorFamily,
        pair: &DerivativePair,
        m: &Expr,
        n: &Expr,
    ) -> EngineResult<Option<Applied>> {
        let (var, other, ratio, label) = match family {
            FactorFamily::OfX => ("x", "y", pair.difference() / n.clone(), "(∂M/∂y - ∂N/∂x) / N"),
            _ => ("y", "x", -pair.difference() / m.clone(), "(∂N/∂x - ∂M/∂y) / M"),
        };
        let ratio = self.backend.simplify(&ratio);
        if ratio.free_variables().contains(other) {
            return Ok(None);
        }
        let integral = self.backend.integrate(&ratio, var)?;
        let factor = self.backend.simplify(&Expr::Exp(integral.clone().boxed()));
        let steps = vec![
            format!("Finding {}:", family),
            format!("1. Calculate {} = {}", label, ratio),
            format!("2. Verify it depends only on {} ✓", var),
            format!("3. Integrate with respect to {}: ∫({})d{} = {}", var, ratio, var, integral),
            format!("4. Integrating factor {} = e^({}) = {}", family, integral, factor),
        ];
        self.apply(family, factor, m, n, steps).map(Some)
    }

    fn homogeneous_factor(&self, m: &Expr, n: &Expr) -> EngineResult<Option<Applied>> {
        let (Some(dm), Some(dn)) = (homogeneous_degree(m), homogeneous_degree(n)) else {
            return Ok(None);
        };
        if dm != dn {
            return Ok(None);
        }
        let xy = Expr::var("x") * Expr::var("y");
        let factor = self
            .backend
            .simplify(&(Expr::Const(1.0) / xy.pow(Expr::Const(dm as f64))));
        let steps = vec![
            format!("Finding {}:", FactorFamily::OfXY),
            "1. Check that the equation is homogeneous".to_string(),
            format!("2. Degree of M = {}, degree of N = {}", dm, dn),
            format!("3. Integrating factor μ = 1/(xy)^{} = {}", dm, factor),
        ];
        self.apply(FactorFamily::OfXY, factor, m, n, steps).map(Some)
    }

    /// first candidate, in slice order, whose product with (M, N) is exact
    fn first_exact<T: Sync>(
        &self,
        family: FactorFamily,
        candidates: &[T],
        make: impl Fn(&T) -> (Expr, Vec<String>) + Sync,
        m: &Expr,
        n: &Expr,
        clock: &SearchClock,
    ) -> Option<Applied> {
        let try_one = |candidate: &T| {
            if clock.out_of_time() {
                return None;
            }
            let (factor, steps) = make(candidate);
            match self.apply(family, factor, m, n, steps) {
                Ok(applied) if applied.exact => Some(applied),
                Ok(_) => None,
                Err(err) => {
                    debug!("{} candidate rejected: {}", family, err);
                    None
                }
            }
        };
        if self.settings.parallel_search {
            candidates.par_iter().find_map_first(try_one)
        } else {
            candidates.iter().find_map(try_one)
        }
    }

    fn power_factor(&self, m: &Expr, n: &Expr, clock: &SearchClock) -> Option<Applied> {
        let (lo, hi) = self.settings.power_range;
        let grid: Vec<(i32, i32)> = (lo..=hi).cartesian_product(lo..=hi).collect();
        let family = FactorFamily::PowerForm;
        let make = |&(p, q): &(i32, i32)| {
            let raw = Expr::var("x").pow(Expr::Const(p as f64)) * Expr::var("y").pow(Expr::Const(q as f64));
            let factor = self.backend.simplify(&raw);
            let steps = vec![
                format!("Finding {}:", family),
                format!("1. Try integers m, n in [{}, {}]", lo, hi),
                format!("2. Found: m = {}, n = {}", p, q),
                format!("3. Integrating factor μ = x^{} * y^{} = {}", p, q, factor),
            ];
            (factor, steps)
        };
        self.first_exact(family, &grid, make, m, n, clock)
    }

    fn exponential_factor(&self, m: &Expr, n: &Expr, clock: &SearchClock) -> Option<Applied> {
        let (lo, hi) = self.settings.exponential_range;
        let grid: Vec<(i32, i32)> = (lo..=hi)
            .cartesian_product(lo..=hi)
            .filter(|&ab| ab != (0, 0))
            .collect();
        let family = FactorFamily::ExponentialForm;
        let make = |&(a, b): &(i32, i32)| {
            let exponent = Expr::Const(a as f64) * Expr::var("x") + Expr::Const(b as f64) * Expr::var("y");
            let factor = self.backend.simplify(&exponent.exp());
            let steps = vec![
                format!("Finding {}:", family),
                format!("1. Try integers a, b in [{}, {}]", lo, hi),
                format!("2. Found: a = {}, b = {}", a, b),
                format!("3. Integrating factor μ = e^({}x + {}y) = {}", a, b, factor),
            ];
            (factor, steps)
        };
        self.first_exact(family, &grid, make, m, n, clock)
    }

    fn common_guess(&self, m: &Expr, n: &Expr, clock: &SearchClock) -> Option<Applied> {
        let guesses: Vec<Expr> = COMMON_GUESSES
            .iter()
            .filter_map(|g| self.backend.parse(g).ok())
            .collect();
        let family = FactorFamily::CommonGuess;
        let make = |guess: &Expr| {
            let factor = self.backend.simplify(guess);
            let steps = vec![
                format!("Trying a {}:", family),
                format!("1. Candidates: {}", COMMON_GUESSES.join(", ")),
                format!("2. Found: μ = {}", factor),
            ];
            (factor, steps)
        };
        self.first_exact(family, &guesses, make, m, n, clock)
    }
}

/// d such that f(tx, ty) = t^d f(x, y), if any
pub fn homogeneous_degree(expr: &Expr) -> Option<i32> {
    let t = Expr::var("t");
    let scaled = expr
        .substitute_variable("x", &(t.clone() * Expr::var("x")))
        .substitute_variable("y", &(t * Expr::var("y")));
    scaled.degree_in("t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact_ode::settings::ExactnessStrategy;
    use crate::symbolic::symbolic_traits::NativeBackend;

    fn parse(s: &str) -> Expr {
        Expr::parse_expression(s).unwrap()
    }

    fn search(m: &str, n: &str, settings: &EngineSettings) -> IntegratingFactorResult {
        FactorSearch::new(&NativeBackend, settings)
            .find(&parse(m), &parse(n))
            .unwrap()
    }

    #[test]
    fn test_family_labels() {
        let labels: Vec<String> = FactorFamily::iter().map(|f| f.to_string()).collect();
        assert_eq!(
            labels,
            vec!["μ(x)", "μ(y)", "μ(xy)", "μ = x^m * y^n", "μ = e^(ax + by)", "common guess"]
        );
    }

    #[test]
    fn test_homogeneous_degree() {
        assert_eq!(homogeneous_degree(&parse("x^2 + 3*x*y")), Some(2));
        assert_eq!(homogeneous_degree(&parse("y/x^2")), Some(-1));
        assert_eq!(homogeneous_degree(&parse("x + y^2")), None);
        assert_eq!(homogeneous_degree(&parse("exp(x)")), None);
        assert_eq!(homogeneous_degree(&parse("0")), None);
    }

    #[test]
    fn test_mu_of_x() {
        let result = search("y", "-x", &EngineSettings::default());
        assert!(result.found);
        assert_eq!(result.family, Some(FactorFamily::OfX));
        assert_eq!(result.factor, "1/x^2");
        assert_eq!(result.transformed_m, "y/x^2");
        assert_eq!(result.transformed_n, "-1/x");
        assert_eq!(result.new_equation, "y/x^2dx + -1/xdy = 0");
        assert!(result.exact_after_application);
        assert_eq!(result.derivation_steps[0], "Finding μ(x):");
        assert_eq!(result.derivation_steps[1], "1. Calculate (∂M/∂y - ∂N/∂x) / N = -2/x");
    }

    #[test]
    fn test_mu_of_y() {
        let result = search("y", "2*x - y*exp(y)", &EngineSettings::default());
        assert_eq!(result.family, Some(FactorFamily::OfY));
        assert_eq!(result.factor, "y");
        assert_eq!(result.transformed_m, "y^2");
        assert!(result.exact_after_application);
    }

    #[test]
    fn test_mu_of_xy() {
        let result = search("y^2", "x^2", &EngineSettings::default());
        assert_eq!(result.family, Some(FactorFamily::OfXY));
        assert_eq!(result.factor, "1/(x^2*y^2)");
        assert_eq!(result.transformed_m, "1/x^2");
        assert_eq!(result.transformed_n, "1/y^2");
        assert!(result.exact_after_application);
    }

    #[test]
    fn test_power_form() {
        let result = search("2*y^2 - 6*x*y", "3*x*y - 4*x^2", &EngineSettings::default());
        assert_eq!(result.family, Some(FactorFamily::PowerForm));
        assert_eq!(result.factor, "x*y");
        assert_eq!(result.derivation_steps[2], "2. Found: m = 1, n = 1");
        assert!(result.exact_after_application);
    }

    #[test]
    fn test_exponential_form() {
        let result = search("x*y", "x*y + x - y - 1", &EngineSettings::default());
        assert_eq!(result.family, Some(FactorFamily::ExponentialForm));
        assert_eq!(result.factor, "exp(x + y)");
        assert_eq!(result.derivation_steps[2], "2. Found: a = 1, b = 1");
    }

    #[test]
    fn test_common_guess_when_ranges_are_narrow() {
        let settings = EngineSettings::default()
            .with_power_range(0, 0)
            .with_exponential_range(0, 0);
        let result = search("2*y^2 - 6*x*y", "3*x*y - 4*x^2", &settings);
        assert_eq!(result.family, Some(FactorFamily::CommonGuess));
        assert_eq!(result.factor, "x*y");
    }

    #[test]
    fn test_not_found() {
        let result = search("x + y^2", "x^2 + y", &EngineSettings::default());
        assert!(!result.found);
        assert_eq!(result.factor, NOT_FOUND);
        assert_eq!(result.family, None);
        assert!(!result.exact_after_application);
        assert_eq!(
            result.steps_text(),
            "The following methods were attempted:\n1. μ(x)\n2. μ(y)\n3. μ(xy)\n\
             4. μ = x^m * y^n\n5. μ = e^(ax + by)\n6. common guess (fallback)\n\
             None produced a valid integrating factor."
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        for (m, n) in [
            ("2*y^2 - 6*x*y", "3*x*y - 4*x^2"),
            ("x*y", "x*y + x - y - 1"),
            ("x + y^2", "x^2 + y"),
        ] {
            let sequential = search(m, n, &EngineSettings::default());
            let parallel = search(m, n, &EngineSettings::default().with_parallel_search(true));
            assert_eq!(sequential, parallel, "{} / {}", m, n);
        }
    }

    #[test]
    fn test_deadline_skips_brute_force() {
        let settings = EngineSettings::default().with_deadline(Some(Duration::ZERO));
        let result = search("2*y^2 - 6*x*y", "3*x*y - 4*x^2", &settings);
        assert!(!result.found);
        assert!(
            result
                .derivation_steps
                .contains(&"Stopped early: search deadline of 0 ms exceeded.".to_string())
        );
        // families before the brute-force loops are not affected
        let result = search("y", "-x", &settings);
        assert_eq!(result.family, Some(FactorFamily::OfX));
    }

    #[test]
    fn test_numeric_only_can_accept_a_diagonal_coincidence() {
        // for μ = x^-3 both derivatives equal -2/x^2 on the line y = x but not elsewhere;
        // with polynomial coefficients NumericOnly samples that line only
        let settings = EngineSettings::default().with_strategy(ExactnessStrategy::NumericOnly);
        let result = search("2*y^2 - 6*x*y", "3*x*y - 4*x^2", &settings);
        assert_eq!(result.family, Some(FactorFamily::PowerForm));
        assert_eq!(result.factor, "1/x^3");
        let result = search("2*y^2 - 6*x*y", "3*x*y - 4*x^2", &EngineSettings::default());
        assert_eq!(result.factor, "x*y");
    }
}
