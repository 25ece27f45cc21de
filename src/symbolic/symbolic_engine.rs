//! # Symbolic Engine Module
//!
//! Expression tree used by the exactness engine as its differentiation / integration /
//! simplification collaborator.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - symbolic variables like "x", "y"
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `arcsin`, `arccos`, `arctg`
//!
//! ### Key Methods
//! - `Symbols(symbols: &str)` - Create multiple variables from comma-separated string
//! - `diff(var: &str)` - Analytical differentiation (see `symbolic_engine_derivatives`)
//! - `integrate(var: &str)` - Indefinite integration (see `symbolic_integration`)
//! - `simplify()` / `expand()` - Canonical forms (see `symbolic_simplify`)
//! - `free_variables()` - set of variable names the expression depends on
//!
//! ## Printing
//!
//! `Display` writes the expression in the same grammar the parser reads (`x^2*y + 3*exp(-x)`),
//! with the minimum of parentheses, so printed results can be fed back as input.

#![allow(non_camel_case_types)]

use std::collections::BTreeSet;
use std::fmt;

/// Core symbolic expression enum representing mathematical expressions as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// use symbolic_engine::Expr;
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "y")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function, printed as `tan`
    tg(Box<Expr>),
    /// Arcsine function, printed as `asin`
    arcsin(Box<Expr>),
    /// Arccosine function, printed as `acos`
    arccos(Box<Expr>),
    /// Arctangent function, printed as `atan`
    arctg(Box<Expr>),
}

// binding strength used by Display: 1 sums, 2 products and unary minus, 3 powers, 4 atoms
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Add(..) | Expr::Sub(..) => 1,
        Expr::Mul(..) | Expr::Div(..) => 2,
        Expr::Const(c) if *c < 0.0 => 2,
        Expr::Pow(..) => 3,
        _ => 4,
    }
}

fn fmt_number(val: f64) -> String {
    if val == 0.0 {
        // avoids printing "-0"
        "0".to_string()
    } else {
        format!("{}", val)
    }
}

fn write_operand(f: &mut fmt::Formatter, expr: &Expr, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl Expr {
    /// true for `-c`, `-c*rest` and `-c/rest`: terms Display prints with a leading minus
    pub fn is_negative_leading(&self) -> bool {
        match self {
            Expr::Const(c) => *c < 0.0,
            Expr::Mul(lhs, _) | Expr::Div(lhs, _) => lhs.is_negative_leading(),
            _ => false,
        }
    }

    /// flips the sign of a negative-leading term without adding new nodes
    pub fn negate_leading(&self) -> Expr {
        match self {
            Expr::Const(c) => Expr::Const(-c),
            Expr::Mul(lhs, rhs) => match lhs.as_ref() {
                Expr::Const(c) if *c == -1.0 => rhs.as_ref().clone(),
                _ => Expr::Mul(lhs.negate_leading().boxed(), rhs.clone()),
            },
            Expr::Div(lhs, rhs) => Expr::Div(lhs.negate_leading().boxed(), rhs.clone()),
            _ => Expr::Mul(Expr::Const(-1.0).boxed(), self.clone().boxed()),
        }
    }
}

/// Display implementation writes the normalized input grammar.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", fmt_number(*val)),
            Expr::Add(lhs, rhs) => {
                write!(f, "{}", lhs)?;
                if rhs.is_negative_leading() {
                    let positive = rhs.negate_leading();
                    write!(f, " - ")?;
                    write_operand(f, &positive, precedence(&positive) <= 1)
                } else {
                    write!(f, " + {}", rhs)
                }
            }
            Expr::Sub(lhs, rhs) => {
                write!(f, "{}", lhs)?;
                if rhs.is_negative_leading() {
                    let positive = rhs.negate_leading();
                    write!(f, " + {}", positive)
                } else {
                    write!(f, " - ")?;
                    write_operand(f, rhs, precedence(rhs) <= 1)
                }
            }
            Expr::Mul(lhs, rhs) => {
                if let Expr::Const(c) = lhs.as_ref() {
                    if *c == -1.0 {
                        write!(f, "-")?;
                        return write_operand(
                            f,
                            rhs,
                            precedence(rhs) < 2 || rhs.is_negative_leading(),
                        );
                    }
                }
                write_operand(f, lhs, precedence(lhs) < 2)?;
                write!(f, "*")?;
                write_operand(f, rhs, precedence(rhs) < 2 || rhs.is_negative_leading())
            }
            Expr::Div(lhs, rhs) => {
                write_operand(f, lhs, precedence(lhs) < 2)?;
                write!(f, "/")?;
                write_operand(f, rhs, precedence(rhs) <= 2)
            }
            Expr::Pow(base, exp) => {
                write_operand(f, base, precedence(base) < 4)?;
                write!(f, "^")?;
                write_operand(f, exp, precedence(exp) < 4)
            }
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tan({})", expr),
            Expr::arcsin(expr) => write!(f, "asin({})", expr),
            Expr::arccos(expr) => write!(f, "acos({})", expr),
            Expr::arctg(expr) => write!(f, "atan({})", expr),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// BASIC FEATURES

    /// Creates multiple symbolic variables from a comma-separated string.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let vars = Expr::Symbols("x, y");
    /// assert_eq!(vars.len(), 2);
    /// ```
    pub fn Symbols(symbols: &str) -> Vec<Expr> {
        symbols
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| Expr::Var(s.to_string()))
            .collect()
    }

    /// Shorthand for `Expr::Var(name.to_string())`
    pub fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    /// Rebuilds the node with `f` applied to every direct argument.
    pub fn map_args<F: FnMut(&Expr) -> Expr>(&self, mut f: F) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => Expr::Add(f(lhs.as_ref()).boxed(), f(rhs.as_ref()).boxed()),
            Expr::Sub(lhs, rhs) => Expr::Sub(f(lhs.as_ref()).boxed(), f(rhs.as_ref()).boxed()),
            Expr::Mul(lhs, rhs) => Expr::Mul(f(lhs.as_ref()).boxed(), f(rhs.as_ref()).boxed()),
            Expr::Div(lhs, rhs) => Expr::Div(f(lhs.as_ref()).boxed(), f(rhs.as_ref()).boxed()),
            Expr::Pow(base, exp) => Expr::Pow(f(base.as_ref()).boxed(), f(exp.as_ref()).boxed()),
            Expr::Exp(expr) => Expr::Exp(f(expr.as_ref()).boxed()),
            Expr::Ln(expr) => Expr::Ln(f(expr.as_ref()).boxed()),
            Expr::sin(expr) => Expr::sin(f(expr.as_ref()).boxed()),
            Expr::cos(expr) => Expr::cos(f(expr.as_ref()).boxed()),
            Expr::tg(expr) => Expr::tg(f(expr.as_ref()).boxed()),
            Expr::arcsin(expr) => Expr::arcsin(f(expr.as_ref()).boxed()),
            Expr::arccos(expr) => Expr::arccos(f(expr.as_ref()).boxed()),
            Expr::arctg(expr) => Expr::arctg(f(expr.as_ref()).boxed()),
        }
    }

    /// Direct arguments of the node, left to right.
    pub fn args(&self) -> Vec<&Expr> {
        match self {
            Expr::Var(_) | Expr::Const(_) => Vec::new(),
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => vec![lhs.as_ref(), rhs.as_ref()],
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::arcsin(expr)
            | Expr::arccos(expr)
            | Expr::arctg(expr) => vec![expr.as_ref()],
        }
    }

    /// Substitutes a variable with a constant value throughout the expression.
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        self.substitute_variable(var, &Expr::Const(value))
    }

    /// substitute a variable with an expression
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            _ => self.map_args(|arg| arg.substitute_variable(var, expr)),
        }
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            _ => self.args().iter().any(|arg| arg.contains_variable(var_name)),
        }
    }

    /// Set of variable names occurring in the expression tree.
    ///
    /// This is a property of the tree, not of the printed text: `y^0` simplified to `1`
    /// no longer depends on `y`, while a literal `exp` never counts as containing `e`/`x`/`p`.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                vars.insert(name.clone());
            }
            _ => {
                for arg in self.args() {
                    arg.collect_variables(vars);
                }
            }
        }
    }

    /// true if any node of the tree satisfies the predicate
    pub fn any_node(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        pred(self) || self.args().iter().any(|arg| arg.any_node(pred))
    }

    /// contains an exponential node
    pub fn contains_exp(&self) -> bool {
        self.any_node(&|e| matches!(e, Expr::Exp(_)))
    }

    /// contains a sine or cosine node
    pub fn contains_sin_or_cos(&self) -> bool {
        self.any_node(&|e| matches!(e, Expr::sin(_) | Expr::cos(_)))
    }

    /// contains a natural logarithm node
    pub fn contains_ln(&self) -> bool {
        self.any_node(&|e| matches!(e, Expr::Ln(_)))
    }

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Creates exponential function e^(self).
    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    /// Creates natural logarithm ln(self).
    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    /// Creates power expression self^rhs.
    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// Checks if expression is exactly zero (constant 0.0).
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    /// Numerical value of an expression without free variables.
    pub fn as_constant(&self) -> Option<f64> {
        if !self.free_variables().is_empty() {
            return None;
        }
        let value = self.eval_expression(&[], &[]);
        if value.is_finite() { Some(value) } else { None }
    }
}

//___________________________________MACROS____________________________________

/// Macro to create symbolic variables from a comma-separated list
/// Usage: symbols!(x, y) -> creates variables x, y
#[macro_export]
macro_rules! symbols {
    ($($var:ident),+ $(,)?) => {
        {
            let var_names = stringify!($($var),+);
            let vars = $crate::symbolic::symbolic_engine::Expr::Symbols(var_names);
            let mut iter = vars.into_iter();
            ($(
                {
                    let $var = iter.next().unwrap();
                    $var
                }
            ),+)
        }
    };
}
