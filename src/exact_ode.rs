//! # Exact first-order equations
//!
//! M(x,y) dx + N(x,y) dy = 0 is exact when ∂M/∂y = ∂N/∂x; then there is φ with
//! ∂φ/∂x = M, ∂φ/∂y = N and the solution is φ(x,y) = C.
//!
//! ```
//! use RustedExactODE::exact_ode::engine::{find_integrating_factor, is_exact, solve_exact_equation};
//! assert!(is_exact("3x^2y", "x^3"));
//! assert_eq!(solve_exact_equation("y", "x").implicit_solution, "x*y + 0 = C");
//! let mu = find_integrating_factor("y^2", "x^2");
//! assert_eq!(mu.factor, "1/(x^2*y^2)");
//! ```
/// the four public operations and the full analysis of one equation
pub mod engine;
pub mod errors;
/// ∂M/∂y, ∂N/∂x and their values at sample points
pub mod derivatives;
pub mod exact_solver;
pub mod exactness;
pub mod integrating_factor;
/// user input -> parser input
pub mod normalizer;
pub mod settings;

mod exact_ode_tests;
