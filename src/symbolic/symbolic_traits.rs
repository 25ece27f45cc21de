// SYMBOLIC TRAITS //////////////////////////////////////////////////////////////////
// The seam between the ODE layer and whatever does the symbolic work.
// The native engine implements it below; add other engines here as needed

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_error::SymbolicError;
use std::collections::HashMap;

/// Compiled numeric function of positional arguments
pub type CompiledFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Everything the exactness engine asks of a computer-algebra collaborator.
///
/// Results of `differentiate` and `integrate` are returned simplified.
pub trait SymbolicBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn parse(&self, input: &str) -> Result<Expr, SymbolicError>;
    fn differentiate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError>;
    fn integrate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError>;
    fn simplify(&self, expr: &Expr) -> Expr;
    fn expand(&self, expr: &Expr) -> Expr;
    /// NaN when the expression cannot be evaluated with the given values
    fn evaluate(&self, expr: &Expr, values: &HashMap<String, f64>) -> f64;
    /// function of `vars` in the given order, for evaluating at many points
    fn compile(&self, expr: &Expr, vars: &[&str]) -> Result<CompiledFn, SymbolicError> {
        expr.lambdify(vars)
    }
}

///////////////// IMPLEMENTATION OF THE TRAIT FOR THE NATIVE ENGINE /////////////////////////
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeBackend;

impl SymbolicBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }
    fn parse(&self, input: &str) -> Result<Expr, SymbolicError> {
        Expr::parse_expression(input)
    }
    fn differentiate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
        Ok(expr.diff(var).simplify())
    }
    fn integrate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
        expr.integrate(var)
    }
    fn simplify(&self, expr: &Expr) -> Expr {
        expr.simplify()
    }
    fn expand(&self, expr: &Expr) -> Expr {
        expr.expand()
    }
    fn evaluate(&self, expr: &Expr, values: &HashMap<String, f64>) -> f64 {
        expr.eval_with_map(values).unwrap_or(f64::NAN)
    }
}

impl<B: SymbolicBackend + ?Sized> SymbolicBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }
    fn parse(&self, input: &str) -> Result<Expr, SymbolicError> {
        (**self).parse(input)
    }
    fn differentiate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
        (**self).differentiate(expr, var)
    }
    fn integrate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
        (**self).integrate(expr, var)
    }
    fn simplify(&self, expr: &Expr) -> Expr {
        (**self).simplify(expr)
    }
    fn expand(&self, expr: &Expr) -> Expr {
        (**self).expand(expr)
    }
    fn evaluate(&self, expr: &Expr, values: &HashMap<String, f64>) -> f64 {
        (**self).evaluate(expr, values)
    }
    fn compile(&self, expr: &Expr, vars: &[&str]) -> Result<CompiledFn, SymbolicError> {
        (**self).compile(expr, vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_backend() {
        let backend = NativeBackend;
        let expr = backend.parse("x^2*y").unwrap();
        let dx = backend.differentiate(&expr, "x").unwrap();
        assert_eq!(dx.to_string(), "2*x*y");
        let phi = backend.integrate(&dx, "x").unwrap();
        assert_eq!(phi.to_string(), "x^2*y");
        let mut values = HashMap::new();
        values.insert("x".to_string(), 2.0);
        values.insert("y".to_string(), 3.0);
        assert_eq!(backend.evaluate(&expr, &values), 12.0);
        values.remove("y");
        assert!(backend.evaluate(&expr, &values).is_nan());
        let f = backend.compile(&expr, &["x", "y"]).unwrap();
        assert_eq!(f(&[1.0, 5.0]), 5.0);
    }

    #[test]
    fn test_boxed_backend_delegates() {
        let backend: Box<dyn SymbolicBackend> = Box::new(NativeBackend);
        assert_eq!(backend.name(), "native");
        let expr = backend.parse("(x + y)^2").unwrap();
        assert_eq!(backend.expand(&expr).to_string(), "x^2 + 2*x*y + y^2");
    }
}
