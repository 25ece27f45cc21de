//! Partial derivatives ∂M/∂y and ∂N/∂x, as expressions and at sample points.
use crate::exact_ode::errors::EngineResult;
use crate::exact_ode::normalizer::try_normalize;
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_error::SymbolicError;
use crate::symbolic::symbolic_traits::SymbolicBackend;
use std::collections::HashMap;
use std::fmt;

/// the two variables every coefficient may depend on, in argument order
pub const VARIABLES: [&str; 2] = ["x", "y"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvaluationPoint {
    pub x: f64,
    pub y: f64,
}

impl EvaluationPoint {
    pub fn new(x: f64, y: f64) -> Self {
        EvaluationPoint { x, y }
    }

    pub fn as_args(&self) -> [f64; 2] {
        [self.x, self.y]
    }

    pub fn bindings(&self) -> HashMap<String, f64> {
        HashMap::from([("x".to_string(), self.x), ("y".to_string(), self.y)])
    }
}

impl fmt::Display for EvaluationPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x, self.y)
    }
}

/// Normalizes and parses one coefficient. Only `x` and `y` may occur in it.
pub fn parse_coefficient<B: SymbolicBackend + ?Sized>(backend: &B, raw: &str) -> EngineResult<Expr> {
    let normalized = try_normalize(raw)?;
    let expr = backend.parse(&normalized)?;
    if let Some(other) = expr
        .free_variables()
        .into_iter()
        .find(|v| !VARIABLES.contains(&v.as_str()))
    {
        return Err(SymbolicError::UnknownVariable(other).into());
    }
    Ok(expr)
}

/// (∂M/∂y, ∂N/∂x)
#[derive(Clone, Debug, PartialEq)]
pub struct DerivativePair {
    pub dm_dy: Expr,
    pub dn_dx: Expr,
}

impl DerivativePair {
    pub fn compute<B: SymbolicBackend + ?Sized>(backend: &B, m: &Expr, n: &Expr) -> EngineResult<Self> {
        Ok(DerivativePair {
            dm_dy: backend.differentiate(m, "y")?,
            dn_dx: backend.differentiate(n, "x")?,
        })
    }

    /// ∂M/∂y − ∂N/∂x, zero exactly when the form is exact
    pub fn difference(&self) -> Expr {
        self.dm_dy.clone() - self.dn_dx.clone()
    }

    pub fn strings(&self) -> (String, String) {
        (self.dm_dy.to_string(), self.dn_dx.to_string())
    }
}

/// derivative strings of raw M and N
pub fn derivative_strings<B: SymbolicBackend + ?Sized>(
    backend: &B,
    m: &str,
    n: &str,
) -> EngineResult<(String, String)> {
    let m = parse_coefficient(backend, m)?;
    let n = parse_coefficient(backend, n)?;
    Ok(DerivativePair::compute(backend, &m, &n)?.strings())
}

/// value of `expr` at `point`; NaN or ±∞ on a domain error, never a failure
pub fn evaluate_at<B: SymbolicBackend + ?Sized>(backend: &B, expr: &Expr, point: EvaluationPoint) -> f64 {
    backend.evaluate(expr, &point.bindings())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact_ode::errors::EngineError;
    use crate::symbolic::symbolic_traits::NativeBackend;
    use approx::assert_relative_eq;

    #[test]
    fn test_derivative_strings() {
        let backend = NativeBackend;
        assert_eq!(
            derivative_strings(&backend, "2x*y", "x²").unwrap(),
            ("2*x".to_string(), "2*x".to_string())
        );
        assert_eq!(
            derivative_strings(&backend, "y", "-x").unwrap(),
            ("1".to_string(), "-1".to_string())
        );
        assert_eq!(
            derivative_strings(&backend, "y*e^(x*y)", "x*exp(x*y)").unwrap(),
            ("x*y*exp(x*y) + exp(x*y)".to_string(), "x*y*exp(x*y) + exp(x*y)".to_string())
        );
    }

    #[test]
    fn test_rejects_bad_input() {
        let backend = NativeBackend;
        assert!(derivative_strings(&backend, "", "x").is_err());
        assert!(derivative_strings(&backend, "x+", "x").is_err());
        // a third variable is not a coefficient of M dx + N dy
        assert!(matches!(
            derivative_strings(&backend, "x*z", "y"),
            Err(EngineError::Symbolic(_))
        ));
    }

    #[test]
    fn test_evaluate_at() {
        let backend = NativeBackend;
        let expr = backend.parse("ln(x) + y/x").unwrap();
        assert_relative_eq!(
            evaluate_at(&backend, &expr, EvaluationPoint::new(1.0, 2.0)),
            2.0,
            epsilon = 1e-12
        );
        assert!(evaluate_at(&backend, &expr, EvaluationPoint::new(-1.0, 2.0)).is_nan());
        assert!(!evaluate_at(&backend, &expr, EvaluationPoint::new(0.0, 2.0)).is_finite());
    }

    #[test]
    fn test_difference() {
        let backend = NativeBackend;
        let m = backend.parse("y").unwrap();
        let n = backend.parse("-x").unwrap();
        let pair = DerivativePair::compute(&backend, &m, &n).unwrap();
        assert_eq!(backend.expand(&pair.difference()).to_string(), "2");
    }
}
