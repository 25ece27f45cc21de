//___________________________________TESTS____________________________________

#[cfg(test)]
mod tests {
    use crate::exact_ode::derivatives::EvaluationPoint;
    use crate::exact_ode::engine::{
        BLANK_INPUT, DERIVATIVE_ERROR, DifferentialForm, ExactEngine, find_integrating_factor,
        get_partial_derivatives, is_exact, solve_exact_equation,
    };
    use crate::exact_ode::exact_solver::{SOLVE_ERROR, STEPS_ERROR};
    use crate::exact_ode::exactness::DecisionMethod;
    use crate::exact_ode::integrating_factor::{FactorFamily, NOT_FOUND};
    use crate::exact_ode::normalizer::normalize;
    use crate::exact_ode::settings::{EngineSettings, ExactnessStrategy};
    use crate::symbolic::symbolic_engine::Expr;
    use crate::symbolic::symbolic_error::SymbolicError;
    use crate::symbolic::symbolic_traits::{NativeBackend, SymbolicBackend};
    use std::collections::HashMap;

    fn numeric_engine() -> ExactEngine {
        ExactEngine::new()
            .with_settings(EngineSettings::default().with_strategy(ExactnessStrategy::NumericOnly))
    }

    #[test]
    fn test_scenario_y_dx_plus_x_dy() {
        assert!(is_exact("y", "x"));
        assert_eq!(
            get_partial_derivatives("y", "x"),
            ("1".to_string(), "1".to_string())
        );
        let solution = solve_exact_equation("y", "x");
        assert_eq!(solution.implicit_solution, "x*y + 0 = C");
        assert_eq!(solution.derivation_steps[1], "1. ∫ M dx = x*y");
        assert_eq!(solution.derivation_steps[4], "4. ∫(0)dy = 0");
    }

    #[test]
    fn test_scenario_2xy_dx_plus_x2_dy() {
        assert!(is_exact("2*x*y", "x^2"));
        let solution = solve_exact_equation("2*x*y", "x^2");
        assert_eq!(solution.implicit_solution, "x^2*y + 0 = C");
    }

    #[test]
    fn test_scenario_y_dx_minus_x_dy() {
        assert!(!is_exact("y", "-x"));
        assert_eq!(
            get_partial_derivatives("y", "-x"),
            ("1".to_string(), "-1".to_string())
        );
        let result = find_integrating_factor("y", "-x");
        assert!(result.found);
        assert_eq!(result.family, Some(FactorFamily::OfX));
        assert_eq!(result.factor, "1/x^2");
        assert!(result.exact_after_application);
        assert!(is_exact(&result.transformed_m, &result.transformed_n));
    }

    #[test]
    fn test_scenario_3x2y_dx_plus_x3_dy() {
        let engine = numeric_engine();
        let report = engine.exactness_report("3*x^2*y", "x^3").unwrap();
        assert!(report.exact);
        assert_eq!(report.method, DecisionMethod::NumericSampling);
        let points: Vec<EvaluationPoint> = report.samples.iter().map(|s| s.point).collect();
        let expected: Vec<EvaluationPoint> = (1..=5)
            .map(|i| EvaluationPoint::new(0.2 * i as f64, 0.2 * i as f64))
            .collect();
        assert_eq!(points, expected);
        let settings = engine.settings();
        for sample in &report.samples {
            assert!(sample.valid);
            assert!(settings.values_agree(sample.dm_dy, sample.dn_dx));
        }
        assert!(is_exact("3*x^2*y", "x^3"));
    }

    #[test]
    fn test_exactness_is_not_symmetric() {
        assert!(is_exact("y", "x + y"));
        assert!(!is_exact("x + y", "y"));
    }

    #[test]
    fn test_scaling_keeps_exactness() {
        let pairs = [
            ("y", "x"),
            ("2*x*y", "x^2"),
            ("y*cos(x*y)", "x*cos(x*y)"),
            ("y*exp(x*y)", "x*exp(x*y)"),
            ("ln(y) + y/x", "ln(x) + x/y"),
        ];
        for engine in [ExactEngine::new(), numeric_engine()] {
            for (m, n) in pairs {
                assert!(engine.is_exact(m, n), "{} / {}", m, n);
                for k in ["2", "-3", "0.5", "1000", "2.5", "1e3"] {
                    let km = format!("{}*({})", k, m);
                    let kn = format!("{}*({})", k, n);
                    assert!(engine.is_exact(&km, &kn), "{} / {}", km, kn);
                    // constant last, where a literal ends the input
                    let km = format!("({})*{}", m, k);
                    let kn = format!("({})*{}", n, k);
                    assert!(engine.is_exact(&km, &kn), "{} / {}", km, kn);
                }
            }
        }
    }

    #[test]
    fn test_decimal_coefficients() {
        assert!(is_exact("0.5*y", "x*0.5"));
        assert_eq!(
            get_partial_derivatives("2.5*y", "x*2.5"),
            ("2.5".to_string(), "2.5".to_string())
        );
        assert_eq!(
            solve_exact_equation("y", "x + 2.5").implicit_solution,
            "x*y + 2.5*y = C"
        );
        assert!(!is_exact("0.5*y", "x*0.25"));
    }

    #[test]
    fn test_malformed_input_is_never_exact() {
        assert!(!is_exact("", "y"));
        assert!(!is_exact("   ", "y"));
        assert!(!is_exact("x +", "y"));
        assert!(!is_exact("foo(x)", "y"));
        assert_eq!(
            get_partial_derivatives("", "y"),
            (DERIVATIVE_ERROR.to_string(), DERIVATIVE_ERROR.to_string())
        );
        let result = find_integrating_factor("", "y");
        assert!(!result.found);
        assert!(result.factor.starts_with("Error: "));
        assert_eq!(result.derivation_steps, vec!["Error calculating integrating factor."]);
        let solution = solve_exact_equation("y", "");
        assert_eq!(solution.implicit_solution, SOLVE_ERROR);
        assert_eq!(solution.derivation_steps, vec![STEPS_ERROR]);
    }

    #[test]
    fn test_diagonal_points_can_mislead_sampling() {
        // ∂M/∂y = x and ∂N/∂x = y agree on every base point (t, t)
        assert!(numeric_engine().is_exact("x*y", "x*y"));
        let report = ExactEngine::new().exactness_report("x*y", "x*y").unwrap();
        assert!(!report.exact);
        assert_eq!(report.method, DecisionMethod::Symbolic);
    }

    #[test]
    fn test_search_is_deterministic() {
        for (m, n) in [
            ("y", "-x"),
            ("2*y^2 - 6*x*y", "3*x*y - 4*x^2"),
            ("x*y", "x*y + x - y - 1"),
            ("x + y^2", "x^2 + y"),
        ] {
            let first = find_integrating_factor(m, n);
            let second = find_integrating_factor(m, n);
            assert_eq!(first, second);
            let parallel = ExactEngine::new()
                .with_settings(EngineSettings::default().with_parallel_search(true))
                .find_integrating_factor(m, n);
            assert_eq!(first, parallel);
        }
    }

    #[test]
    fn test_exhausted_search() {
        let result = find_integrating_factor("x + y^2", "x^2 + y");
        assert!(!result.found);
        assert_eq!(result.factor, NOT_FOUND);
        assert_eq!(result.derivation_steps.len(), 8);
        assert_eq!(result.derivation_steps[3], "3. μ(xy)");
    }

    #[test]
    fn test_normalized_inputs() {
        // the same equation typed three ways
        for (m, n) in [("2xy", "x²"), ("2x*y", "x²"), ("2 * x * y", "x ^ 2")] {
            let (nm, nn) = (normalize(m), normalize(n));
            assert_eq!(normalize(&nm), nm);
            assert_eq!(normalize(&nn), nn);
        }
        assert!(is_exact("2x*y", "x²"));
        assert!(is_exact("y*e^(x*y)", "x*exp(xy)"));
        assert!(is_exact("cos(x)", "arctan(y)"));
    }

    #[test]
    fn test_analyze_exact() {
        let report = ExactEngine::new().analyze(&DifferentialForm::new(" 2*x*y ", "x^2"));
        assert!(report.exact);
        assert!(report.integrating_factor.is_none());
        let text = report.render();
        assert!(text.contains("Yes, this is an exact differential equation."));
        assert!(text.contains("The equation 2*x*ydx + x^2dy = 0 is exact."));
        assert!(text.contains("Solution: x^2*y + 0 = C"));
    }

    #[test]
    fn test_analyze_with_factor() {
        let report = ExactEngine::new().analyze(&DifferentialForm::new("y^2", "x^2"));
        assert!(!report.exact);
        let factor = report.integrating_factor.as_ref().unwrap();
        assert_eq!(factor.family, Some(FactorFamily::OfXY));
        assert_eq!(
            report.transformed_derivatives,
            Some(("0".to_string(), "0".to_string()))
        );
        let solution = report.solution.as_ref().unwrap();
        assert_eq!(solution.implicit_solution, "-1/x + -1/y = C");
        let text = report.render();
        assert!(text.contains("Integrating factor: μ(xy) = 1/(x^2*y^2)"));
        assert!(text.contains("New equation: 1/x^2dx + 1/y^2dy = 0"));
        assert!(text.contains("Solution after applying integrating factor:"));
    }

    #[test]
    fn test_analyze_without_factor() {
        let report = ExactEngine::new().analyze(&DifferentialForm::new("x + y^2", "x^2 + y"));
        assert!(report.solution.is_none());
        assert!(report.transformed_derivatives.is_none());
        let text = report.render();
        assert!(text.contains("Integrating factor: No integrating factor found"));
        assert!(text.contains("None produced a valid integrating factor."));
    }

    #[test]
    fn test_analyze_blank_input() {
        let report = ExactEngine::new().analyze(&DifferentialForm::new("", "x"));
        assert_eq!(report.input_error.as_deref(), Some(BLANK_INPUT));
        assert_eq!(report.render(), BLANK_INPUT);
    }

    /// a collaborator that parses and simplifies but cannot do calculus
    struct NoCalculus;

    impl SymbolicBackend for NoCalculus {
        fn name(&self) -> &'static str {
            "no-calculus"
        }
        fn parse(&self, input: &str) -> Result<Expr, SymbolicError> {
            NativeBackend.parse(input)
        }
        fn differentiate(&self, expr: &Expr, _var: &str) -> Result<Expr, SymbolicError> {
            Err(SymbolicError::Evaluation(format!("cannot differentiate {}", expr)))
        }
        fn integrate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
            Err(SymbolicError::Integration {
                expr: expr.to_string(),
                var: var.to_string(),
            })
        }
        fn simplify(&self, expr: &Expr) -> Expr {
            NativeBackend.simplify(expr)
        }
        fn expand(&self, expr: &Expr) -> Expr {
            NativeBackend.expand(expr)
        }
        fn evaluate(&self, expr: &Expr, values: &HashMap<String, f64>) -> f64 {
            NativeBackend.evaluate(expr, values)
        }
    }

    /// differentiates but never integrates
    struct NoIntegrals;

    impl SymbolicBackend for NoIntegrals {
        fn name(&self) -> &'static str {
            "no-integrals"
        }
        fn parse(&self, input: &str) -> Result<Expr, SymbolicError> {
            NativeBackend.parse(input)
        }
        fn differentiate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
            NativeBackend.differentiate(expr, var)
        }
        fn integrate(&self, expr: &Expr, var: &str) -> Result<Expr, SymbolicError> {
            NoCalculus.integrate(expr, var)
        }
        fn simplify(&self, expr: &Expr) -> Expr {
            NativeBackend.simplify(expr)
        }
        fn expand(&self, expr: &Expr) -> Expr {
            NativeBackend.expand(expr)
        }
        fn evaluate(&self, expr: &Expr, values: &HashMap<String, f64>) -> f64 {
            NativeBackend.evaluate(expr, values)
        }
    }

    #[test]
    fn test_collaborator_failures_become_sentinels() {
        let engine = ExactEngine::with_backend(NoCalculus, EngineSettings::default());
        assert_eq!(engine.backend().name(), "no-calculus");
        assert!(!engine.is_exact("y", "x"));
        assert_eq!(
            engine.get_partial_derivatives("y", "x"),
            (DERIVATIVE_ERROR.to_string(), DERIVATIVE_ERROR.to_string())
        );
        let result = engine.find_integrating_factor("y", "-x");
        assert!(!result.found);
        assert!(result.factor.starts_with("Error: "));
        assert!(engine.solve_exact_equation("y", "x").is_failure());
        let report = engine.analyze(&DifferentialForm::new("y", "x"));
        assert!(!report.exact);
        assert!(report.render().contains("Error calculating integrating factor."));
    }

    #[test]
    fn test_failing_family_falls_through() {
        // μ(x) needs an integral; μ(xy) does not
        let engine = ExactEngine::with_backend(NoIntegrals, EngineSettings::default());
        let result = engine.find_integrating_factor("y", "-x");
        assert_eq!(result.family, Some(FactorFamily::OfXY));
        assert_eq!(result.factor, "1/(x*y)");
        assert_eq!(result.transformed_m, "1/x");
        assert_eq!(result.transformed_n, "-1/y");
        assert!(result.exact_after_application);
        assert!(engine.solve_exact_equation("y", "x").is_failure());
    }

    #[test]
    fn test_boxed_backend() {
        let backend: Box<dyn SymbolicBackend> = Box::new(NativeBackend);
        let engine = ExactEngine::with_backend(backend, EngineSettings::default());
        assert!(engine.is_exact("3*x^2*y", "x^3"));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = EngineSettings::from_toml_str(
            "[exactness]\nstrategy = \"numeric_only\"\nmin_valid_points = 6\n",
        )
        .unwrap();
        let engine = ExactEngine::new().with_settings(settings);
        // polynomial coefficients only give the five base points
        assert!(!engine.is_exact("y", "x"));
        assert!(ExactEngine::new().is_exact("y", "x"));
    }
}
