//! Public operations on M(x,y) dx + N(x,y) dy = 0.
//!
//! Every operation takes the two coefficients as typed by a user and never fails: errors are
//! logged and turned into sentinel results (`false`, `("Error", "Error")`, a not-found factor
//! carrying the error, `SolutionResult::failure()`).
//!
//! ```
//! use RustedExactODE::exact_ode::engine::{ExactEngine, DifferentialForm};
//! let engine = ExactEngine::new();
//! assert!(engine.is_exact("2x*y", "x²"));
//! // outside exp(..) `xy` is read as one name, and only x and y are allowed
//! assert!(!engine.is_exact("2xy", "x²"));
//! let solution = engine.solve_exact_equation("2*x*y", "x^2");
//! assert_eq!(solution.implicit_solution, "x^2*y + 0 = C");
//! let factor = engine.find_integrating_factor("y", "-x");
//! assert_eq!(factor.factor, "1/x^2");
//! let report = engine.analyze(&DifferentialForm::new("y", "-x"));
//! assert!(report.render().contains("becomes exact"));
//! ```
use crate::exact_ode::derivatives::{derivative_strings, parse_coefficient};
use crate::exact_ode::errors::EngineResult;
use crate::exact_ode::exact_solver::{ExactSolver, SolutionResult};
use crate::exact_ode::exactness::{ExactnessReport, ExactnessTester};
use crate::exact_ode::integrating_factor::{FactorSearch, IntegratingFactorResult};
use crate::exact_ode::settings::EngineSettings;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_traits::{NativeBackend, SymbolicBackend};
use log::{error, info};
use std::fmt;

pub const BLANK_INPUT: &str = "Please enter both M(x,y) and N(x,y) functions.";
pub const DERIVATIVE_ERROR: &str = "Error";

/// The request: M dx + N dy = 0 as typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DifferentialForm {
    pub m: String,
    pub n: String,
}

impl DifferentialForm {
    pub fn new(m: impl Into<String>, n: impl Into<String>) -> Self {
        DifferentialForm {
            m: m.into(),
            n: n.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.m.trim().is_empty() || self.n.trim().is_empty()
    }
}

impl fmt::Display for DifferentialForm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}dx + {}dy = 0", self.m.trim(), self.n.trim())
    }
}

/// Everything `ExactEngine::analyze` found out about one equation.
#[derive(Clone, Debug, PartialEq)]
pub struct EquationReport {
    pub form: DifferentialForm,
    /// set when the input was rejected; nothing else is filled in then
    pub input_error: Option<String>,
    pub partial_derivatives: (String, String),
    pub exact: bool,
    /// of the equation itself when exact, else of μM dx + μN dy = 0 when that is exact
    pub solution: Option<SolutionResult>,
    pub integrating_factor: Option<IntegratingFactorResult>,
    /// (∂(μM)/∂y, ∂(μN)/∂x)
    pub transformed_derivatives: Option<(String, String)>,
}

impl EquationReport {
    fn rejected(form: &DifferentialForm, message: &str) -> Self {
        EquationReport {
            form: form.clone(),
            input_error: Some(message.to_string()),
            partial_derivatives: (String::new(), String::new()),
            exact: false,
            solution: None,
            integrating_factor: None,
            transformed_derivatives: None,
        }
    }

    /// multi-line narration of the analysis
    pub fn render(&self) -> String {
        if let Some(message) = &self.input_error {
            return message.clone();
        }
        let mut out = vec![
            format!("∂M/∂y = {}", self.partial_derivatives.0),
            format!("∂N/∂x = {}", self.partial_derivatives.1),
            String::new(),
        ];
        if self.exact {
            out.push("Yes, this is an exact differential equation.".to_string());
            out.push(format!("The equation {} is exact.", self.form));
            out.push("The partial derivatives are equal.".to_string());
            if let Some(solution) = &self.solution {
                out.push(String::new());
                out.push(format!("Solution: {}", solution.implicit_solution));
                out.push(String::new());
                out.push(format!("Solution steps:\n{}", solution.steps_text()));
            }
            return out.join("\n");
        }
        out.push("No, this is not an exact differential equation.".to_string());
        out.push(format!("The equation {} is not exact.", self.form));
        out.push("The partial derivatives are not equal.".to_string());
        let Some(factor) = &self.integrating_factor else {
            return out.join("\n");
        };
        out.push(String::new());
        match factor.family {
            Some(family) if factor.found => {
                out.push(format!("Integrating factor: {} = {}", family, factor.factor));
                out.push(format!("New equation: {}", factor.new_equation));
                out.push(factor.steps_text());
                out.push(String::new());
                if factor.exact_after_application {
                    out.push(
                        "The equation becomes exact after multiplying by the integrating factor."
                            .to_string(),
                    );
                } else {
                    out.push(
                        "Warning: The equation is still not exact after multiplying by this integrating factor."
                            .to_string(),
                    );
                }
            }
            _ => {
                out.push(format!("Integrating factor: {}", factor.factor));
                out.push(factor.steps_text());
            }
        }
        if let Some((dm, dn)) = &self.transformed_derivatives {
            out.push(String::new());
            out.push("New partial derivatives:".to_string());
            out.push(format!("∂(μM)/∂y = {}", dm));
            out.push(format!("∂(μN)/∂x = {}", dn));
        }
        if let Some(solution) = &self.solution {
            out.push(String::new());
            out.push("Solution after applying integrating factor:".to_string());
            out.push(solution.implicit_solution.clone());
            out.push(String::new());
            out.push(format!("Solution steps:\n{}", solution.steps_text()));
        }
        out.join("\n")
    }
}

/// Stateless engine: a symbolic backend plus settings. Cheap to share between threads.
pub struct ExactEngine<B: SymbolicBackend = NativeBackend> {
    backend: B,
    settings: EngineSettings,
}

impl ExactEngine<NativeBackend> {
    pub fn new() -> Self {
        ExactEngine::with_backend(NativeBackend, EngineSettings::default())
    }
}

impl Default for ExactEngine<NativeBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SymbolicBackend> ExactEngine<B> {
    pub fn with_backend(backend: B, settings: EngineSettings) -> Self {
        ExactEngine { backend, settings }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn parse_pair(&self, m: &str, n: &str) -> EngineResult<(Expr, Expr)> {
        Ok((
            parse_coefficient(&self.backend, m)?,
            parse_coefficient(&self.backend, n)?,
        ))
    }

    pub fn exactness_report(&self, m: &str, n: &str) -> EngineResult<ExactnessReport> {
        let (m, n) = self.parse_pair(m, n)?;
        ExactnessTester::new(&self.backend, &self.settings).check(&m, &n)
    }

    /// ∂M/∂y ≡ ∂N/∂x; false for input that cannot be read
    pub fn is_exact(&self, m: &str, n: &str) -> bool {
        match self.exactness_report(m, n) {
            Ok(report) => report.exact,
            Err(err) => {
                error!("exactness test of ({}, {}) failed: {}", m, n, err);
                false
            }
        }
    }

    /// (∂M/∂y, ∂N/∂x) as strings, `("Error", "Error")` on failure
    pub fn get_partial_derivatives(&self, m: &str, n: &str) -> (String, String) {
        derivative_strings(&self.backend, m, n).unwrap_or_else(|err| {
            error!("derivatives of ({}, {}) failed: {}", m, n, err);
            (DERIVATIVE_ERROR.to_string(), DERIVATIVE_ERROR.to_string())
        })
    }

    pub fn try_find_integrating_factor(&self, m: &str, n: &str) -> EngineResult<IntegratingFactorResult> {
        let (m, n) = self.parse_pair(m, n)?;
        FactorSearch::new(&self.backend, &self.settings).find(&m, &n)
    }

    pub fn find_integrating_factor(&self, m: &str, n: &str) -> IntegratingFactorResult {
        self.try_find_integrating_factor(m, n).unwrap_or_else(|err| {
            error!("integrating factor search for ({}, {}) failed: {}", m, n, err);
            IntegratingFactorResult::failure(&err)
        })
    }

    pub fn try_solve(&self, m: &str, n: &str) -> EngineResult<SolutionResult> {
        let (m, n) = self.parse_pair(m, n)?;
        ExactSolver::new(&self.backend).solve(&m, &n)
    }

    /// Implicit solution of an exact equation. Exactness is not checked.
    pub fn solve_exact_equation(&self, m: &str, n: &str) -> SolutionResult {
        self.try_solve(m, n).unwrap_or_else(|err| {
            error!("solving ({}, {}) failed: {}", m, n, err);
            SolutionResult::failure()
        })
    }

    /// Derivatives, exactness, then the solution, or the integrating factor and, when it
    /// works, the solution of the transformed equation.
    pub fn analyze(&self, form: &DifferentialForm) -> EquationReport {
        if form.is_blank() {
            return EquationReport::rejected(form, BLANK_INPUT);
        }
        let (m, n) = (form.m.trim(), form.n.trim());
        let partial_derivatives = self.get_partial_derivatives(m, n);
        let exact = self.is_exact(m, n);
        info!("{}: exact = {}", form, exact);
        let mut report = EquationReport {
            form: form.clone(),
            input_error: None,
            partial_derivatives,
            exact,
            solution: None,
            integrating_factor: None,
            transformed_derivatives: None,
        };
        if exact {
            report.solution = Some(self.solve_exact_equation(m, n));
            return report;
        }
        let factor = self.find_integrating_factor(m, n);
        if factor.found && factor.exact_after_application {
            report.transformed_derivatives =
                Some(self.get_partial_derivatives(&factor.transformed_m, &factor.transformed_n));
            report.solution =
                Some(self.solve_exact_equation(&factor.transformed_m, &factor.transformed_n));
        }
        report.integrating_factor = Some(factor);
        report
    }
}

/// `ExactEngine::is_exact` with default settings and the native backend
pub fn is_exact(m: &str, n: &str) -> bool {
    ExactEngine::new().is_exact(m, n)
}

pub fn get_partial_derivatives(m: &str, n: &str) -> (String, String) {
    ExactEngine::new().get_partial_derivatives(m, n)
}

pub fn find_integrating_factor(m: &str, n: &str) -> IntegratingFactorResult {
    ExactEngine::new().find_integrating_factor(m, n)
}

pub fn solve_exact_equation(m: &str, n: &str) -> SolutionResult {
    ExactEngine::new().solve_exact_equation(m, n)
}
