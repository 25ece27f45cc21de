#![allow(non_snake_case)]
use RustedExactODE::Utils::logger::{default_log_file_name, init_logger, parse_level};
use RustedExactODE::exact_ode::engine::{DifferentialForm, ExactEngine};
use RustedExactODE::exact_ode::settings::{EngineSettings, ExactnessStrategy};
use log::{LevelFilter, error};
use std::env;
use std::process;
use std::time::Duration;

// cargo run -- "<M>" "<N>" [settings.toml] analyzes one equation,
// without arguments one of the examples below runs.
// EXACT_ODE_LOG=debug shows the search, EXACT_ODE_LOG_FILE=1 also writes a log file
fn main() {
    let level = env::var("EXACT_ODE_LOG")
        .ok()
        .and_then(|l| parse_level(&l))
        .unwrap_or(LevelFilter::Warn);
    let log_file = env::var("EXACT_ODE_LOG_FILE").ok().map(|_| default_log_file_name());
    init_logger(level, log_file.as_deref());

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() >= 2 {
        let settings = match args.get(2) {
            Some(path) => EngineSettings::from_toml_file(path).unwrap_or_else(|err| {
                error!("{}", err);
                eprintln!("{}", err);
                process::exit(2);
            }),
            None => EngineSettings::default(),
        };
        let engine = ExactEngine::new().with_settings(settings);
        println!("{}", engine.analyze(&DifferentialForm::new(&args[0], &args[1])).render());
        return;
    }

    let example = 0;
    match example {
        0 => {
            // the textbook cases, one of each outcome
            let engine = ExactEngine::new();
            for (m, n) in [
                ("2x*y", "x² + 3y²"),
                ("y", "-x"),
                ("y^2", "x^2"),
                ("x + y^2", "x^2 + y"),
            ] {
                println!("{}\n", engine.analyze(&DifferentialForm::new(m, n)).render());
                println!("________________________________________________________\n");
            }
        }
        1 => {
            // exactness report: how the decision was taken
            let engine = ExactEngine::new();
            for (m, n) in [("3x^2*y", "x^3"), ("y*cos(x*y)", "x*cos(x*y)"), ("sin(y)", "x*sin(y)")] {
                match engine.exactness_report(m, n) {
                    Ok(report) => {
                        println!(
                            "M = {}, N = {}: exact = {} ({}), ∂M/∂y = {}, ∂N/∂x = {}",
                            m, n, report.exact, report.method, report.dm_dy, report.dn_dx
                        );
                        for s in &report.samples {
                            println!("   at {}: {} vs {}", s.point, s.dm_dy, s.dn_dx);
                        }
                    }
                    Err(err) => println!("M = {}, N = {}: {}", m, n, err),
                }
            }
        }
        2 => {
            // brute-force families, sequential and parallel
            for parallel in [false, true] {
                let engine = ExactEngine::new().with_settings(
                    EngineSettings::default()
                        .with_parallel_search(parallel)
                        .with_deadline(Some(Duration::from_secs(10))),
                );
                for (m, n) in [("2*y^2 - 6*x*y", "3*x*y - 4*x^2"), ("x*y", "x*y + x - y - 1")] {
                    let result = engine.find_integrating_factor(m, n);
                    println!("parallel = {}: {}", parallel, result.factor);
                    println!("{}\n", result.steps_text());
                }
            }
        }
        3 => {
            // sampling alone cannot tell x from y on the diagonal
            let sampling = ExactEngine::new()
                .with_settings(EngineSettings::default().with_strategy(ExactnessStrategy::NumericOnly));
            println!(
                "x*y dx + x*y dy: numeric only {}, symbolic first {}",
                sampling.is_exact("x*y", "x*y"),
                ExactEngine::new().is_exact("x*y", "x*y")
            );
        }
        _ => println!("no such example"),
    }
}
