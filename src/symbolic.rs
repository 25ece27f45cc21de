#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedExactODE::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("x^2*y + exp(-x)").unwrap();
/// let f = parsed_expression.compile(&["x", "y"]).unwrap();
/// assert_eq!(f.eval(&[1.0, 2.0]), 2.0 + (-1.0f64).exp());
///  ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) holds the expression tree `Expr` with operator overloading
/// 2) prints expressions back in the input grammar
/// 3) answers structural questions (free variables, which functions occur)
///# Example
/// ```
/// use RustedExactODE::symbolic::symbolic_engine::Expr;
/// let expr = Expr::parse_expression("x*y + sin(x)").unwrap();
/// let df_dx = expr.diff("x").simplify();
/// assert_eq!(df_dx.to_string(), "y + cos(x)");
/// let phi = Expr::parse_expression("2*x*y").unwrap().integrate("x").unwrap();
/// assert_eq!(phi.to_string(), "x^2*y");
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
/// errors of the symbolic layer
pub mod symbolic_error;
/// indefinite integration
pub mod symbolic_integration;
/// compiled evaluation
pub mod symbolic_lambdify;
/// canonical forms: simplify / expand
pub mod symbolic_simplify;
///______________________________________________________________________________________________________________________________________________
/// the collaborator trait used by the ODE layer and its native implementation
/// _____________________________________________________________________________________________________________________________________________
pub mod symbolic_traits;
