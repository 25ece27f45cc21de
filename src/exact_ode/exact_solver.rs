//! Implicit solution φ(x, y) = C of an exact equation M dx + N dy = 0.
//!
//! φ = ∫ M dx + g(y), where g'(y) = N − ∂/∂y ∫ M dx.
use crate::exact_ode::errors::EngineResult;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_traits::SymbolicBackend;
use log::warn;

pub const SOLVE_ERROR: &str = "Error solving equation";
pub const STEPS_ERROR: &str = "Error in solution steps";

#[derive(Clone, Debug, PartialEq)]
pub struct SolutionResult {
    /// `"{φ} + {g} = C"`
    pub implicit_solution: String,
    pub derivation_steps: Vec<String>,
}

impl SolutionResult {
    pub fn failure() -> Self {
        SolutionResult {
            implicit_solution: SOLVE_ERROR.to_string(),
            derivation_steps: vec![STEPS_ERROR.to_string()],
        }
    }

    pub fn is_failure(&self) -> bool {
        self.implicit_solution == SOLVE_ERROR
    }

    pub fn steps_text(&self) -> String {
        self.derivation_steps.join("\n")
    }
}

/// intermediate results of the construction of φ
#[derive(Clone, Debug, PartialEq)]
pub struct Potential {
    /// ∫ M dx
    pub phi: Expr,
    pub dphi_dy: Expr,
    /// N − ∂φ/∂y
    pub g_prime: Expr,
    pub g: Expr,
}

impl Potential {
    pub fn solution(&self) -> SolutionResult {
        let (phi, dphi_dy, g_prime, g) = (&self.phi, &self.dphi_dy, &self.g_prime, &self.g);
        SolutionResult {
            implicit_solution: format!("{} + {} = C", phi, g),
            derivation_steps: vec![
                "Steps to solve:".to_string(),
                format!("1. ∫ M dx = {}", phi),
                format!("2. ∂/∂y({}) = {}", phi, dphi_dy),
                format!("3. N - ∂φ/∂y = {}", g_prime),
                format!("4. ∫({})dy = {}", g_prime, g),
                format!("5. Therefore, φ(x,y) = {} + {} = C", phi, g),
            ],
        }
    }
}

pub struct ExactSolver<'a, B: SymbolicBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: SymbolicBackend + ?Sized> ExactSolver<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        ExactSolver { backend }
    }

    /// Builds φ without checking exactness first; for a pair that is not exact g' still
    /// depends on x and the result is not a solution.
    pub fn potential(&self, m: &Expr, n: &Expr) -> EngineResult<Potential> {
        let phi = self.backend.integrate(m, "x")?;
        let dphi_dy = self.backend.differentiate(&phi, "y")?;
        let g_prime = self.backend.expand(&(n.clone() - dphi_dy.clone()));
        if g_prime.contains_variable("x") {
            warn!("N - ∂φ/∂y = {} depends on x: the equation is not exact", g_prime);
        }
        let g = self.backend.integrate(&g_prime, "y")?;
        Ok(Potential {
            phi,
            dphi_dy,
            g_prime,
            g,
        })
    }

    pub fn solve(&self, m: &Expr, n: &Expr) -> EngineResult<SolutionResult> {
        Ok(self.potential(m, n)?.solution())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbolic_traits::NativeBackend;
    use approx::assert_relative_eq;

    fn solve(m: &str, n: &str) -> SolutionResult {
        let m = Expr::parse_expression(m).unwrap();
        let n = Expr::parse_expression(n).unwrap();
        ExactSolver::new(&NativeBackend).solve(&m, &n).unwrap()
    }

    #[test]
    fn test_polynomial_pairs() {
        assert_eq!(solve("y", "x").implicit_solution, "x*y + 0 = C");
        assert_eq!(solve("2*x*y", "x^2").implicit_solution, "x^2*y + 0 = C");
        assert_eq!(solve("3*x^2*y", "x^3").implicit_solution, "x^3*y + 0 = C");
        assert_eq!(solve("2*x + y", "x + 2*y").implicit_solution, "x^2 + x*y + y^2 = C");
    }

    #[test]
    fn test_steps() {
        let result = solve("2*x*y", "x^2 + 3*y^2");
        assert_eq!(result.implicit_solution, "x^2*y + y^3 = C");
        assert_eq!(
            result.steps_text(),
            "Steps to solve:\n\
             1. ∫ M dx = x^2*y\n\
             2. ∂/∂y(x^2*y) = x^2\n\
             3. N - ∂φ/∂y = 3*y^2\n\
             4. ∫(3*y^2)dy = y^3\n\
             5. Therefore, φ(x,y) = x^2*y + y^3 = C"
        );
    }

    #[test]
    fn test_potential_recovers_m_and_n() {
        let backend = NativeBackend;
        let m = Expr::parse_expression("y*cos(x*y) + exp(x)").unwrap();
        let n = Expr::parse_expression("x*cos(x*y) + 1/y").unwrap();
        let p = ExactSolver::new(&backend).potential(&m, &n).unwrap();
        let phi = p.phi.clone() + p.g.clone();
        for (x, y) in [(0.3, 0.7), (1.2, 2.0)] {
            let args = ["x", "y"];
            assert_relative_eq!(
                phi.diff("x").eval_expression(&args, &[x, y]),
                m.eval_expression(&args, &[x, y]),
                epsilon = 1e-10
            );
            assert_relative_eq!(
                phi.diff("y").eval_expression(&args, &[x, y]),
                n.eval_expression(&args, &[x, y]),
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn test_integration_failure_is_an_error() {
        let m = Expr::parse_expression("exp(x^2)*y").unwrap();
        let n = Expr::parse_expression("x").unwrap();
        assert!(ExactSolver::new(&NativeBackend).solve(&m, &n).is_err());
        let failure = SolutionResult::failure();
        assert!(failure.is_failure());
        assert_eq!(failure.steps_text(), STEPS_ERROR);
    }
}
