//! Analytical differentiation and direct evaluation of `Expr` trees.
//!
//! ## Key Methods
//!
//! ### Differentiation
//! - `diff(var: &str)` - Analytical partial derivative (not simplified)
//! - `diff_multi_args(vars)` - All partial derivatives at once
//!
//! ### Function evaluation
//! - `eval_expression()` - Direct evaluation without closure creation
//! - `eval_with_map()` - Evaluation from a name -> value map, reporting unknown names
//!
//! Evaluation never panics: a variable missing from the argument list evaluates to NaN, so
//! callers sampling at many points can discard non-finite values.

use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_error::SymbolicError;
use std::collections::HashMap;

impl Expr {
    /// DIFFERENTIATION

    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// Implements all standard differentiation rules from calculus:
    /// - Power rule: d/dx(x^n) = n*x^(n-1)
    /// - General power rule: d/dx(f^g) = f^g*(g'*ln(f) + g*f'/f)
    /// - Product rule: d/dx(f*g) = f'*g + f*g'
    /// - Quotient rule: d/dx(f/g) = (f'*g - f*g')/g^2
    /// - Chain rule: d/dx(f(g(x))) = f'(g(x))*g'(x)
    ///
    /// For multivariable functions, computes partial derivatives. The result is
    /// not simplified; call `simplify()` on it for a readable form.
    ///
    /// # Arguments
    /// * `var` - Variable name to differentiate with respect to
    ///
    /// # Returns
    /// New symbolic expression representing the derivative
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x").simplify(); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        let c = Expr::Const;
        let sq = |u: &Expr| u.clone().pow(c(2.0));
        match self {
            Expr::Var(name) => c(if name == var { 1.0 } else { 0.0 }),
            Expr::Const(_) => c(0.0),
            Expr::Add(f, g) => f.diff(var) + g.diff(var),
            Expr::Sub(f, g) => f.diff(var) - g.diff(var),
            Expr::Mul(f, g) => f.diff(var) * (**g).clone() + (**f).clone() * g.diff(var),
            Expr::Div(f, g) => {
                (f.diff(var) * (**g).clone() - g.diff(var) * (**f).clone()) / sq(g.as_ref())
            }
            // f^g * (g'*ln(f) + g*f'/f)
            Expr::Pow(f, g) if g.contains_variable(var) => {
                let (f, g) = ((**f).clone(), (**g).clone());
                self.clone() * (g.diff(var) * f.clone().ln() + g * f.diff(var) / f)
            }
            Expr::Pow(f, g) => {
                (**g).clone() * (**f).clone().pow((**g).clone() - c(1.0)) * f.diff(var)
            }
            // chain rule below: outer derivative times u'
            Expr::Exp(u) => self.clone() * u.diff(var),
            Expr::Ln(u) => u.diff(var) / (**u).clone(),
            Expr::sin(u) => Expr::cos(u.clone()) * u.diff(var),
            Expr::cos(u) => c(-1.0) * Expr::sin(u.clone()) * u.diff(var),
            Expr::tg(u) => c(1.0) / sq(&Expr::cos(u.clone())) * u.diff(var),
            Expr::arcsin(u) => u.diff(var) / (c(1.0) - sq(u.as_ref())).pow(c(0.5)),
            Expr::arccos(u) => c(-1.0) * u.diff(var) / (c(1.0) - sq(u.as_ref())).pow(c(0.5)),
            Expr::arctg(u) => u.diff(var) / (c(1.0) + sq(u.as_ref())),
        }
    }

    /// partial derivatives with respect to every variable in `all_vars`, in order
    pub fn diff_multi_args(&self, all_vars: &[&str]) -> Vec<Expr> {
        all_vars.iter().map(|var| self.diff(var)).collect()
    }

    /// FUNCTION EVALUATION

    /// Evaluates the expression with variables bound positionally.
    ///
    /// # Arguments
    /// * `vars` - Variable names in order matching values array
    /// * `values` - Numerical values for each variable
    ///
    /// # Returns
    /// Numerical result of expression evaluation; NaN if a variable is not bound
    ///
    /// # Performance
    /// Use compile() for repeated evaluation, eval_expression() for one-time use
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> f64 {
        match self {
            Expr::Var(name) => match vars.iter().position(|&x| x == name) {
                Some(index) => values.get(index).copied().unwrap_or(f64::NAN),
                None => f64::NAN,
            },
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => {
                lhs.eval_expression(vars, values) + rhs.eval_expression(vars, values)
            }
            Expr::Sub(lhs, rhs) => {
                lhs.eval_expression(vars, values) - rhs.eval_expression(vars, values)
            }
            Expr::Mul(lhs, rhs) => {
                lhs.eval_expression(vars, values) * rhs.eval_expression(vars, values)
            }
            Expr::Div(lhs, rhs) => {
                lhs.eval_expression(vars, values) / rhs.eval_expression(vars, values)
            }
            Expr::Pow(base, exp) => {
                let base_fn = base.eval_expression(vars, values);
                let exp_fn = exp.eval_expression(vars, values);
                base_fn.powf(exp_fn)
            }
            Expr::Exp(expr) => expr.eval_expression(vars, values).exp(),
            Expr::Ln(expr) => expr.eval_expression(vars, values).ln(),
            Expr::sin(expr) => expr.eval_expression(vars, values).sin(),
            Expr::cos(expr) => expr.eval_expression(vars, values).cos(),
            Expr::tg(expr) => expr.eval_expression(vars, values).tan(),
            Expr::arcsin(expr) => expr.eval_expression(vars, values).asin(),
            Expr::arccos(expr) => expr.eval_expression(vars, values).acos(),
            Expr::arctg(expr) => expr.eval_expression(vars, values).atan(),
        }
    } // end of eval_expression

    /// Evaluates with a name -> value map. Unlike `eval_expression` an unbound
    /// variable is reported instead of silently producing NaN.
    pub fn eval_with_map(&self, values: &HashMap<String, f64>) -> Result<f64, SymbolicError> {
        let free = self.free_variables();
        let mut names: Vec<&str> = Vec::with_capacity(free.len());
        let mut args: Vec<f64> = Vec::with_capacity(free.len());
        for name in free.iter() {
            match values.get(name) {
                Some(val) => {
                    names.push(name.as_str());
                    args.push(*val);
                }
                None => return Err(SymbolicError::UnknownVariable(name.clone())),
            }
        }
        Ok(self.eval_expression(&names, &args))
    }
}
