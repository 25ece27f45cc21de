use RustedExactODE::exact_ode::derivatives::{EvaluationPoint, evaluate_at};
use RustedExactODE::exact_ode::engine::{
    find_integrating_factor, get_partial_derivatives, is_exact, solve_exact_equation,
};
use RustedExactODE::exact_ode::normalizer::normalize;
use RustedExactODE::symbolic::symbolic_engine::Expr;
use RustedExactODE::symbolic::symbolic_traits::NativeBackend;

fn main() {
    println!("=== Exact equations M dx + N dy = 0 ===\n");

    // input is normalized before parsing
    for raw in ["3x²y + y³", "e^(xy)", "exp(2(x+y))", "arctan(x)"] {
        println!("{:>14}  ->  {}", raw, normalize(raw));
    }
    println!();

    // (2xy + cos x) dx + (x² + 3y²) dy = 0
    let (m, n) = ("2x*y + cos(x)", "x² + 3y²");
    let (dm_dy, dn_dx) = get_partial_derivatives(m, n);
    println!("∂M/∂y = {}, ∂N/∂x = {}, exact: {}", dm_dy, dn_dx, is_exact(m, n));
    let solution = solve_exact_equation(m, n);
    println!("{}\n{}\n", solution.implicit_solution, solution.steps_text());

    // check φ against M at a point: ∂φ/∂x should reproduce M
    let phi = Expr::parse_expression("x^2*y + sin(x) + y^3").unwrap();
    let point = EvaluationPoint::new(0.7, 1.3);
    let m_expr = Expr::parse_expression(&normalize(m)).unwrap();
    println!(
        "at {}: ∂φ/∂x = {}, M = {}\n",
        point,
        evaluate_at(&NativeBackend, &phi.diff("x"), point),
        evaluate_at(&NativeBackend, &m_expr, point)
    );

    // y dx - x dy = 0 is not exact, 1/x² fixes it
    let result = find_integrating_factor("y", "-x");
    println!("{} = {}", result.family.map(|f| f.to_string()).unwrap_or_default(), result.factor);
    println!("{}", result.new_equation);
    println!("{}\n", result.steps_text());
    let solution = solve_exact_equation(&result.transformed_m, &result.transformed_n);
    println!("{}", solution.implicit_solution);
}
