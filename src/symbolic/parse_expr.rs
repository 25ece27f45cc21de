//! Parser turning a normalized expression string into an `Expr` tree.
//!
//! Grammar (whitespace allowed between tokens):
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/') unary)*
//! unary   := '-' unary | '+' unary | power
//! power   := atom ('^' unary)?
//! atom    := number | name '(' sum (',' sum)* ')' | name | '(' sum ')'
//! ```
//! `^` is right-associative and binds tighter than unary minus, so `-x^2` is `-(x^2)`.
//! `pi` and `e` are read as constants, every other bare name is a variable.
//!# Example
//! ```
//! use RustedExactODE::symbolic::symbolic_engine::Expr;
//! let parsed = Expr::parse_expression("x^2*y + exp(-x)").unwrap();
//! assert_eq!(parsed.to_string(), "x^2*y + exp(-x)");
//! ```
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_error::SymbolicError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{map, map_res, opt, recognize},
    error::ErrorKind,
    multi::{many0, separated_list1},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
};
use std::f64::consts::{E, PI};

/// names accepted in call position
pub const KNOWN_FUNCTIONS: [&str; 17] = [
    "exp", "ln", "log", "sqrt", "pow", "sin", "cos", "tan", "tg", "asin", "arcsin", "acos",
    "arccos", "atan", "arctan", "arctg", "abs",
];

pub fn is_known_function(name: &str) -> bool {
    KNOWN_FUNCTIONS.contains(&name)
}

fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Const(val) => Expr::Const(-val),
        other => -other,
    }
}

fn build_function(name: &str, mut args: Vec<Expr>) -> Option<Expr> {
    if name == "pow" || (name == "log" && args.len() == 2) {
        if args.len() != 2 {
            return None;
        }
        let second = args.pop()?;
        let first = args.pop()?;
        return Some(if name == "pow" {
            first.pow(second)
        } else {
            // log(base, value)
            Expr::Div(second.ln().boxed(), first.ln().boxed())
        });
    }
    if args.len() != 1 {
        return None;
    }
    let arg = args.pop()?.boxed();
    let expr = match name {
        "exp" => Expr::Exp(arg),
        "ln" | "log" => Expr::Ln(arg),
        "sqrt" => Expr::Pow(arg, Expr::Const(0.5).boxed()),
        // |a| = sqrt(a^2); fine for real-valued sampling
        "abs" => Expr::Pow(
            Expr::Pow(arg, Expr::Const(2.0).boxed()).boxed(),
            Expr::Const(0.5).boxed(),
        ),
        "sin" => Expr::sin(arg),
        "cos" => Expr::cos(arg),
        "tan" | "tg" => Expr::tg(arg),
        "asin" | "arcsin" => Expr::arcsin(arg),
        "acos" | "arccos" => Expr::arccos(arg),
        "atan" | "arctan" | "arctg" => Expr::arctg(arg),
        _ => return None,
    };
    Some(expr)
}

fn symbol(name: &str) -> Expr {
    match name {
        "pi" => Expr::Const(PI),
        "e" => Expr::Const(E),
        _ => Expr::Var(name.to_string()),
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
}

// decimal literal with optional exponent: 2, 2.5, .5, 1e-3; `nan` / `inf` are not numbers here
fn number(input: &str) -> IResult<&str, Expr> {
    map_res(recognize_float, |s: &str| s.parse::<f64>().map(Expr::Const)).parse(input)
}

fn call_or_symbol(input: &str) -> IResult<&str, Expr> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(delimited(
        pair(multispace0, char('(')),
        separated_list1(pair(multispace0, char(',')), sum),
        pair(multispace0, char(')')),
    ))
    .parse(input)?;
    match args {
        Some(args) => match build_function(name, args) {
            Some(expr) => Ok((input, expr)),
            None => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                ErrorKind::Verify,
            ))),
        },
        None => Ok((input, symbol(name))),
    }
}

fn parenthesized(input: &str) -> IResult<&str, Expr> {
    delimited(char('('), sum, pair(multispace0, char(')'))).parse(input)
}

fn atom(input: &str) -> IResult<&str, Expr> {
    preceded(multispace0, alt((number, parenthesized, call_or_symbol))).parse(input)
}

fn power(input: &str) -> IResult<&str, Expr> {
    let (input, base) = atom(input)?;
    let (input, exponent) = opt(preceded(pair(multispace0, char('^')), unary)).parse(input)?;
    let expr = match exponent {
        Some(exponent) => base.pow(exponent),
        None => base,
    };
    Ok((input, expr))
}

fn unary(input: &str) -> IResult<&str, Expr> {
    alt((
        map(preceded(pair(multispace0, char('-')), unary), negate),
        preceded(pair(multispace0, char('+')), unary),
        power,
    ))
    .parse(input)
}

fn product(input: &str) -> IResult<&str, Expr> {
    let (input, first) = unary(input)?;
    let (input, rest) =
        many0(pair(preceded(multispace0, one_of("*/")), unary)).parse(input)?;
    let expr = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '*' => Expr::Mul(acc.boxed(), rhs.boxed()),
        _ => Expr::Div(acc.boxed(), rhs.boxed()),
    });
    Ok((input, expr))
}

fn sum(input: &str) -> IResult<&str, Expr> {
    let (input, first) = product(input)?;
    let (input, rest) =
        many0(pair(preceded(multispace0, one_of("+-")), product)).parse(input)?;
    let expr = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '+' => Expr::Add(acc.boxed(), rhs.boxed()),
        _ => Expr::Sub(acc.boxed(), rhs.boxed()),
    });
    Ok((input, expr))
}

/// first identifier used in call position that is not a known function
fn first_unknown_function(input: &str) -> Option<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_ascii_alphabetic() || chars[i] == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && chars[j] == '(' && !is_known_function(&name) {
                return Some(name);
            }
        } else {
            i += 1;
        }
    }
    None
}

/// Parses a whole string; trailing garbage is an error.
pub fn parse_expression_func(input: &str) -> Result<Expr, SymbolicError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SymbolicError::Parse {
            input: input.to_string(),
            reason: "empty expression".to_string(),
        });
    }
    if let Some(name) = first_unknown_function(trimmed) {
        return Err(SymbolicError::UnknownFunction(name));
    }
    match sum(trimmed) {
        Ok((rest, expr)) => {
            let rest = rest.trim();
            if rest.is_empty() {
                Ok(expr)
            } else {
                Err(SymbolicError::Parse {
                    input: input.to_string(),
                    reason: format!("unexpected `{}`", rest),
                })
            }
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(SymbolicError::Parse {
            input: input.to_string(),
            reason: format!("cannot read `{}`", e.input),
        }),
        Err(nom::Err::Incomplete(_)) => Err(SymbolicError::Parse {
            input: input.to_string(),
            reason: "incomplete input".to_string(),
        }),
    }
}

impl Expr {
    /// Parses a mathematical expression from its string representation.
    ///
    /// # Supported Syntax
    /// - Variables: x, y, var_name
    /// - Constants: 3.14, 2, .5, pi, e
    /// - Operators: +, -, *, /, ^
    /// - Functions: exp, ln, log, sqrt, pow, abs, sin, cos, tan, asin, acos, atan
    ///   (and the aliases tg, arcsin, arccos, arctan, arctg)
    pub fn parse_expression(input: &str) -> Result<Expr, SymbolicError> {
        parse_expression_func(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        let expr = Expr::parse_expression("1 + 2*x^2").unwrap();
        let x = Expr::var("x");
        let expected = Expr::Const(1.0)
            + Expr::Const(2.0) * x.pow(Expr::Const(2.0));
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = Expr::parse_expression("-x^2").unwrap();
        assert_eq!(expr, -(Expr::var("x").pow(Expr::Const(2.0))));
        let expr = Expr::parse_expression("-3*x").unwrap();
        assert_eq!(expr, Expr::Const(-3.0) * Expr::var("x"));
    }

    #[test]
    fn test_power_is_right_associative() {
        let expr = Expr::parse_expression("2^3^2").unwrap();
        assert_eq!(
            expr,
            Expr::Const(2.0).pow(Expr::Const(3.0).pow(Expr::Const(2.0)))
        );
    }

    #[test]
    fn test_functions_and_aliases() {
        let expr = Expr::parse_expression("arctg(x) + tan(y)").unwrap();
        assert_eq!(expr.to_string(), "atan(x) + tan(y)");
        let expr = Expr::parse_expression("pow(x, 3)").unwrap();
        assert_eq!(expr, Expr::var("x").pow(Expr::Const(3.0)));
        let expr = Expr::parse_expression("sqrt(x)").unwrap();
        assert_eq!(expr, Expr::var("x").pow(Expr::Const(0.5)));
    }

    #[test]
    fn test_constants() {
        let expr = Expr::parse_expression("pi").unwrap();
        assert_eq!(expr, Expr::Const(PI));
        let expr = Expr::parse_expression("e").unwrap();
        assert_eq!(expr, Expr::Const(E));
    }

    #[test]
    fn test_decimal_literals() {
        // a literal at the very end of the input keeps its fraction
        assert_eq!(Expr::parse_expression("2.5").unwrap(), Expr::Const(2.5));
        assert_eq!(Expr::parse_expression("0.5").unwrap(), Expr::Const(0.5));
        assert_eq!(Expr::parse_expression(".5").unwrap(), Expr::Const(0.5));
        assert_eq!(
            Expr::parse_expression("x*0.5").unwrap(),
            Expr::var("x") * Expr::Const(0.5)
        );
        assert_eq!(
            Expr::parse_expression("x + 2.5").unwrap(),
            Expr::var("x") + Expr::Const(2.5)
        );
        assert_eq!(
            Expr::parse_expression("x/0.5").unwrap().eval_expression(&["x"], &[3.0]),
            6.0
        );
        assert_eq!(Expr::parse_expression("1e6").unwrap(), Expr::Const(1e6));
        assert_eq!(
            Expr::parse_expression("2.5e-3*y").unwrap(),
            Expr::Const(2.5e-3) * Expr::var("y")
        );
        let e = Expr::Const(E).to_string();
        assert_eq!(Expr::parse_expression(&e).unwrap(), Expr::Const(E));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Expr::parse_expression(""),
            Err(SymbolicError::Parse { .. })
        ));
        assert!(matches!(
            Expr::parse_expression("foo(x)"),
            Err(SymbolicError::UnknownFunction(name)) if name == "foo"
        ));
        assert!(matches!(
            Expr::parse_expression("x + "),
            Err(SymbolicError::Parse { .. })
        ));
        assert!(matches!(
            Expr::parse_expression("(x + y"),
            Err(SymbolicError::Parse { .. })
        ));
        assert!(matches!(
            Expr::parse_expression("sin(x, y)"),
            Err(SymbolicError::Parse { .. })
        ));
        assert!(Expr::parse_expression("nan").unwrap() == Expr::var("nan"));
    }

    #[test]
    fn test_display_reparses() {
        for input in [
            "x^2*y + 3*exp(-x)",
            "x - (y - 1)",
            "1/(x*y)",
            "-2/x",
            "(x + y)^(-3)",
            "-(x + y)",
            "x/(y/2)",
        ] {
            let expr = Expr::parse_expression(input).unwrap();
            let printed = expr.to_string();
            let reparsed = Expr::parse_expression(&printed).unwrap();
            let (x, y) = (0.7, 1.3);
            let a = expr.eval_expression(&["x", "y"], &[x, y]);
            let b = reparsed.eval_expression(&["x", "y"], &[x, y]);
            approx::assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }
}
