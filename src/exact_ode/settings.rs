//! Tunables of the exactness test and the integrating-factor search.
//!
//! Settings can be built in code with the `with_*` setters or read from TOML, either flat
//! ```toml
//! abs_tol = 1e-8
//! strategy = "numeric_only"
//! ```
//! or under an `[exactness]` table. Unknown keys are rejected.
use crate::exact_ode::errors::{EngineError, EngineResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use strum_macros::{Display, EnumIter, EnumString};
use toml::{Table, Value};

/// How `∂M/∂y = ∂N/∂x` is decided
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum ExactnessStrategy {
    /// expand the difference of the derivatives first, sample numerically only when
    /// the canonical form cannot decide
    #[default]
    #[strum(serialize = "symbolic_then_numeric")]
    SymbolicThenNumeric,
    /// sample at test points only
    #[strum(serialize = "numeric_only")]
    NumericOnly,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub min_valid_points: usize,
    pub strategy: ExactnessStrategy,
    /// inclusive bounds of m and n in μ = x^m * y^n
    pub power_range: (i32, i32),
    /// inclusive bounds of a and b in μ = e^(ax + by)
    pub exponential_range: (i32, i32),
    pub search_deadline_ms: Option<u64>,
    pub parallel_search: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            abs_tol: 1e-8,
            rel_tol: 1e-6,
            min_valid_points: 5,
            strategy: ExactnessStrategy::SymbolicThenNumeric,
            power_range: (-3, 3),
            exponential_range: (-3, 3),
            search_deadline_ms: None,
            parallel_search: false,
        }
    }
}

const KNOWN_KEYS: [&str; 8] = [
    "abs_tol",
    "rel_tol",
    "min_valid_points",
    "strategy",
    "power_range",
    "exponential_range",
    "search_deadline_ms",
    "parallel_search",
];

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerances(mut self, abs_tol: f64, rel_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_min_valid_points(mut self, n: usize) -> Self {
        self.min_valid_points = n;
        self
    }

    pub fn with_strategy(mut self, strategy: ExactnessStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_power_range(mut self, lo: i32, hi: i32) -> Self {
        self.power_range = (lo, hi);
        self
    }

    pub fn with_exponential_range(mut self, lo: i32, hi: i32) -> Self {
        self.exponential_range = (lo, hi);
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.search_deadline_ms = deadline.map(|d| d.as_millis() as u64);
        self
    }

    pub fn with_parallel_search(mut self, parallel: bool) -> Self {
        self.parallel_search = parallel;
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.search_deadline_ms.map(Duration::from_millis)
    }

    /// `|a-b| < abs_tol`, else `|a-b| < rel_tol * max(|a|,|b|)`
    pub fn values_agree(&self, a: f64, b: f64) -> bool {
        let diff = (a - b).abs();
        diff < self.abs_tol || diff < self.rel_tol * a.abs().max(b.abs())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !(self.abs_tol >= 0.0 && self.rel_tol >= 0.0) {
            return Err(EngineError::Config("tolerances must be non-negative".to_string()));
        }
        if self.min_valid_points == 0 {
            return Err(EngineError::Config("min_valid_points must be at least 1".to_string()));
        }
        for (name, (lo, hi)) in [
            ("power_range", self.power_range),
            ("exponential_range", self.exponential_range),
        ] {
            if lo > hi {
                return Err(EngineError::Config(format!("{} is empty: [{}, {}]", name, lo, hi)));
            }
        }
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let table: Table = content
            .parse()
            .map_err(|e: toml::de::Error| EngineError::Config(e.to_string()))?;
        let table = match table.get("exactness") {
            Some(Value::Table(inner)) if table.len() == 1 => inner.clone(),
            Some(_) => {
                return Err(EngineError::Config(
                    "[exactness] must be the only table in the file".to_string(),
                ));
            }
            None => table,
        };
        let mut settings = EngineSettings::default();
        for (key, value) in &table {
            match key.as_str() {
                "abs_tol" => settings.abs_tol = as_float(key, value)?,
                "rel_tol" => settings.rel_tol = as_float(key, value)?,
                "min_valid_points" => settings.min_valid_points = as_unsigned(key, value)? as usize,
                "strategy" => {
                    let name = value
                        .as_str()
                        .ok_or_else(|| EngineError::Config(format!("{} must be a string", key)))?;
                    settings.strategy = ExactnessStrategy::from_str(name).map_err(|_| {
                        EngineError::Config(format!("unknown strategy `{}`", name))
                    })?;
                }
                "power_range" => settings.power_range = as_range(key, value)?,
                "exponential_range" => settings.exponential_range = as_range(key, value)?,
                "search_deadline_ms" => settings.search_deadline_ms = Some(as_unsigned(key, value)?),
                "parallel_search" => {
                    settings.parallel_search = value
                        .as_bool()
                        .ok_or_else(|| EngineError::Config(format!("{} must be a boolean", key)))?
                }
                other => {
                    return Err(EngineError::Config(format!(
                        "unknown key `{}`, expected one of {}",
                        other,
                        KNOWN_KEYS.join(", ")
                    )));
                }
            }
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

fn as_float(key: &str, value: &Value) -> EngineResult<f64> {
    match value {
        Value::Float(v) => Ok(*v),
        Value::Integer(v) => Ok(*v as f64),
        _ => Err(EngineError::Config(format!("{} must be a number", key))),
    }
}

fn as_unsigned(key: &str, value: &Value) -> EngineResult<u64> {
    match value {
        Value::Integer(v) if *v >= 0 => Ok(*v as u64),
        _ => Err(EngineError::Config(format!("{} must be a non-negative integer", key))),
    }
}

fn as_range(key: &str, value: &Value) -> EngineResult<(i32, i32)> {
    let bad = || EngineError::Config(format!("{} must be a pair of integers [lo, hi]", key));
    let items = value.as_array().ok_or_else(bad)?;
    match items.as_slice() {
        [Value::Integer(lo), Value::Integer(hi)] => {
            let lo = i32::try_from(*lo).map_err(|_| bad())?;
            let hi = i32::try_from(*hi).map_err(|_| bad())?;
            Ok((lo, hi))
        }
        _ => Err(bad()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use strum::IntoEnumIterator;

    #[test]
    fn test_defaults() {
        let s = EngineSettings::default();
        assert_eq!(s.abs_tol, 1e-8);
        assert_eq!(s.rel_tol, 1e-6);
        assert_eq!(s.min_valid_points, 5);
        assert_eq!(s.strategy, ExactnessStrategy::SymbolicThenNumeric);
        assert_eq!(s.power_range, (-3, 3));
        assert_eq!(s.exponential_range, (-3, 3));
        assert!(s.deadline().is_none());
        assert!(!s.parallel_search);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_values_agree() {
        let s = EngineSettings::default();
        assert!(s.values_agree(1.0, 1.0 + 1e-9));
        assert!(s.values_agree(1e6, 1e6 + 0.5));
        assert!(!s.values_agree(1.0, 1.0001));
        assert!(!s.values_agree(1e-7, -1e-7));
    }

    #[test]
    fn test_strategy_names() {
        let names: Vec<String> = ExactnessStrategy::iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["symbolic_then_numeric", "numeric_only"]);
        assert_eq!(
            ExactnessStrategy::from_str("numeric_only").unwrap(),
            ExactnessStrategy::NumericOnly
        );
    }

    #[test]
    fn test_flat_toml() {
        let s = EngineSettings::from_toml_str(
            r#"
            abs_tol = 1e-10
            rel_tol = 1
            strategy = "numeric_only"
            power_range = [-2, 2]
            search_deadline_ms = 250
            parallel_search = true
            "#,
        )
        .unwrap();
        assert_eq!(s.abs_tol, 1e-10);
        assert_eq!(s.rel_tol, 1.0);
        assert_eq!(s.strategy, ExactnessStrategy::NumericOnly);
        assert_eq!(s.power_range, (-2, 2));
        assert_eq!(s.exponential_range, (-3, 3));
        assert_eq!(s.deadline(), Some(Duration::from_millis(250)));
        assert!(s.parallel_search);
    }

    #[test]
    fn test_nested_toml() {
        let s = EngineSettings::from_toml_str("[exactness]\nmin_valid_points = 7\n").unwrap();
        assert_eq!(s.min_valid_points, 7);
    }

    #[test]
    fn test_rejected_toml() {
        for bad in [
            "tolerance = 1e-8",
            "strategy = \"guess\"",
            "power_range = [3, -3]",
            "power_range = [1]",
            "min_valid_points = -1",
            "parallel_search = 1",
            "[exactness]\nabs_tol = 1.0\n[other]\nx = 1",
            "abs_tol = ",
        ] {
            assert!(
                matches!(EngineSettings::from_toml_str(bad), Err(EngineError::Config(_))),
                "accepted: {}",
                bad
            );
        }
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[exactness]\nexponential_range = [-1, 1]").unwrap();
        let s = EngineSettings::from_toml_file(file.path()).unwrap();
        assert_eq!(s.exponential_range, (-1, 1));
        let missing = EngineSettings::from_toml_file("/definitely/not/here.toml");
        assert!(matches!(missing, Err(EngineError::Io(_))));
    }

    #[test]
    fn test_builder() {
        let s = EngineSettings::new()
            .with_tolerances(1e-9, 1e-7)
            .with_min_valid_points(3)
            .with_strategy(ExactnessStrategy::NumericOnly)
            .with_power_range(-1, 1)
            .with_exponential_range(0, 2)
            .with_deadline(Some(Duration::from_millis(10)))
            .with_parallel_search(true);
        assert_eq!(s.min_valid_points, 3);
        assert_eq!(s.search_deadline_ms, Some(10));
        assert_eq!(s.exponential_range, (0, 2));
    }
}
