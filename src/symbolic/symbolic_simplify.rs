//! # Symbolic Expression Simplification Module
//!
//! Canonical forms for `Expr` trees. Every expression is brought to a sum of terms
//!
//! ```text
//! coeff * x^a * y^b * ... * f1^p1 * f2^p2 * ...
//! ```
//! where the monomial part uses integer (possibly negative) exponents and the `f` are
//! opaque factors: function applications, sums that were not multiplied out, powers with
//! symbolic exponents.
//!
//! ## Simplification Strategy
//!
//! 1. **Constant Folding**: arithmetic on numerical constants is evaluated
//! 2. **Like Term Collection**: terms with the same monomial and the same opaque factors merge
//! 3. **Power Rules**: `x^a*x^b = x^(a+b)`, `exp(a)*exp(b) = exp(a+b)`, `exp(ln a) = a`
//! 4. **Quotient Cancellation**: `(x + y)/(x^2 + x*y) = 1/x` when numerator and denominator
//!    agree after removing their monomial content
//!
//! `simplify()` keeps sums inside products as they are; `expand()` multiplies them out, which
//! is what equality tests need: an expression that expands to `0` is identically zero.
//!
//! ## Ordering
//!
//! Terms are printed by total degree (highest first), then by exponent of the alphabetically
//! first variable, so `y + x^2` prints as `x^2 + y` and `y*x` prints as `x*y`.

use crate::symbolic::symbolic_engine::Expr;
use itertools::Itertools;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::E;

/// Monomial exponents of a term, e.g. `x^2*y^-1` -> `{"x": 2, "y": -1}`.
/// Zero exponents are never stored.
///
/// ## Examples
///
/// - `x^2` → `MonomialKey({"x": 2})`
/// - `xy^3` → `MonomialKey({"x": 1, "y": 3})`
/// - `5` (constant) → `MonomialKey({})` (empty map)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonomialKey(pub BTreeMap<String, i32>);

impl MonomialKey {
    pub fn degree(&self) -> i32 {
        self.0.values().sum()
    }

    pub fn exponent_of(&self, var: &str) -> i32 {
        self.0.get(var).copied().unwrap_or(0)
    }
}

const ZERO_TOL: f64 = 1e-12;
// largest integer power of a sum that expand() multiplies out
const MAX_EXPANDED_POWER: f64 = 8.0;

fn is_integral(val: f64) -> bool {
    val.is_finite() && (val - val.round()).abs() < 1e-12
}

// snaps accumulated float noise on integer coefficients
fn clean(val: f64) -> f64 {
    if val.is_finite() && (val - val.round()).abs() < 1e-9 {
        val.round()
    } else {
        val
    }
}

#[derive(Clone, Debug)]
struct Factor {
    base: Expr,
    exponent: f64,
}

#[derive(Clone, Debug)]
struct Term {
    coeff: f64,
    key: MonomialKey,
    rest: Vec<Factor>,
}

impl Term {
    fn constant(coeff: f64) -> Term {
        Term {
            coeff,
            key: MonomialKey(BTreeMap::new()),
            rest: Vec::new(),
        }
    }

    fn variable(name: &str) -> Term {
        let mut key = BTreeMap::new();
        key.insert(name.to_string(), 1);
        Term {
            coeff: 1.0,
            key: MonomialKey(key),
            rest: Vec::new(),
        }
    }

    fn factor(base: Expr, exponent: f64, expand: bool) -> Term {
        normalize_term(
            1.0,
            BTreeMap::new(),
            vec![Factor { base, exponent }],
            expand,
        )
    }

    fn is_constant(&self) -> bool {
        self.key.0.is_empty() && self.rest.is_empty()
    }

    fn rest_signature(&self) -> String {
        self.rest
            .iter()
            .map(|f| format!("{}^{}", f.base, f.exponent))
            .join("*")
    }

    fn same_shape(&self, other: &Term) -> bool {
        self.key == other.key && self.rest_signature() == other.rest_signature()
    }

    fn scaled(mut self, factor: f64) -> Term {
        self.coeff *= factor;
        self
    }

    fn mul(&self, other: &Term, expand: bool) -> Term {
        let mut key = self.key.0.clone();
        for (var, exp) in &other.key.0 {
            *key.entry(var.clone()).or_insert(0) += exp;
        }
        let mut rest = self.rest.clone();
        rest.extend(other.rest.iter().cloned());
        normalize_term(self.coeff * other.coeff, key, rest, expand)
    }

    /// `self^n` as a single term; None when that would change the value for positive variables
    fn powf(&self, n: f64, expand: bool) -> Option<Term> {
        let integral = is_integral(n);
        if !integral {
            if self.coeff < 0.0 {
                return None;
            }
            if self.key.0.values().any(|e| !is_integral(*e as f64 * n)) {
                return None;
            }
        }
        let coeff = if integral {
            self.coeff.powi(n.round() as i32)
        } else {
            self.coeff.powf(n)
        };
        let key = self
            .key
            .0
            .iter()
            .map(|(var, e)| (var.clone(), (*e as f64 * n).round() as i32))
            .collect();
        let rest = self
            .rest
            .iter()
            .map(|f| Factor {
                base: f.base.clone(),
                exponent: f.exponent * n,
            })
            .collect();
        Some(normalize_term(coeff, key, rest, expand))
    }

    fn inverse(&self, expand: bool) -> Term {
        let key = self
            .key
            .0
            .iter()
            .map(|(var, e)| (var.clone(), -e))
            .collect();
        let rest = self
            .rest
            .iter()
            .map(|f| Factor {
                base: f.base.clone(),
                exponent: -f.exponent,
            })
            .collect();
        normalize_term(1.0 / self.coeff, key, rest, expand)
    }

    fn to_expr(&self) -> Expr {
        let mut num: Vec<Expr> = Vec::new();
        let mut den: Vec<Expr> = Vec::new();
        for (var, exp) in &self.key.0 {
            let var_expr = Expr::Var(var.clone());
            if *exp > 0 {
                num.push(power_expr(var_expr, *exp as f64));
            } else {
                den.push(power_expr(var_expr, -(*exp as f64)));
            }
        }
        for f in &self.rest {
            if f.exponent > 0.0 {
                num.push(power_expr(f.base.clone(), f.exponent));
            } else {
                den.push(power_expr(f.base.clone(), -f.exponent));
            }
        }
        let product = |factors: Vec<Expr>| {
            factors
                .into_iter()
                .reduce(|a, b| Expr::Mul(Box::new(a), Box::new(b)))
        };
        let numerator = match product(num) {
            None => Expr::Const(self.coeff),
            Some(n) if self.coeff == 1.0 => n,
            Some(n) if self.coeff == -1.0 => -n,
            Some(n) => Expr::Mul(Box::new(Expr::Const(self.coeff)), Box::new(n)),
        };
        match product(den) {
            None => numerator,
            Some(d) => Expr::Div(Box::new(numerator), Box::new(d)),
        }
    }
}

fn power_expr(base: Expr, exponent: f64) -> Expr {
    if exponent == 1.0 {
        base
    } else {
        Expr::Pow(Box::new(base), Box::new(Expr::Const(exponent)))
    }
}

fn normalize_term(
    coeff: f64,
    mut key: BTreeMap<String, i32>,
    factors: Vec<Factor>,
    expand: bool,
) -> Term {
    let mut coeff = coeff;
    let mut exp_args: Vec<(Expr, f64)> = Vec::new();
    let mut merged: Vec<Factor> = Vec::new();
    for factor in factors {
        if factor.exponent == 0.0 {
            continue;
        }
        match &factor.base {
            Expr::Exp(arg) => exp_args.push((arg.as_ref().clone(), factor.exponent)),
            Expr::Var(name) if is_integral(factor.exponent) => {
                *key.entry(name.clone()).or_insert(0) += factor.exponent.round() as i32;
            }
            Expr::Const(c) => coeff *= c.powf(factor.exponent),
            _ => {
                let signature = factor.base.to_string();
                match merged.iter_mut().find(|f| f.base.to_string() == signature) {
                    Some(existing) => existing.exponent += factor.exponent,
                    None => merged.push(factor.clone()),
                }
            }
        }
    }
    let mut rest = Vec::new();
    for factor in merged {
        if factor.exponent.abs() < ZERO_TOL {
            continue;
        }
        match &factor.base {
            Expr::Var(name) if is_integral(factor.exponent) => {
                *key.entry(name.clone()).or_insert(0) += factor.exponent.round() as i32;
            }
            _ => rest.push(Factor {
                base: factor.base.clone(),
                exponent: clean(factor.exponent),
            }),
        }
    }
    if exp_args.len() == 1 && exp_args[0].1 == 1.0 {
        if let Some((arg, _)) = exp_args.pop() {
            rest.push(Factor {
                base: Expr::Exp(Box::new(arg)),
                exponent: 1.0,
            });
        }
    } else if !exp_args.is_empty() {
        let sum = exp_args
            .into_iter()
            .map(|(arg, n)| if n == 1.0 { arg } else { Expr::Const(n) * arg })
            .reduce(|a, b| a + b);
        if let Some(sum) = sum {
            let arg = render(&canonical(&sum, expand));
            if !arg.is_zero() {
                rest.push(Factor {
                    base: Expr::Exp(Box::new(arg)),
                    exponent: 1.0,
                });
            }
        }
    }
    key.retain(|_, e| *e != 0);
    rest.sort_by_key(|f| f.base.to_string());
    Term {
        coeff: clean(coeff),
        key: MonomialKey(key),
        rest,
    }
}

fn compare_terms(a: &Term, b: &Term) -> Ordering {
    b.key
        .degree()
        .cmp(&a.key.degree())
        .then_with(|| {
            let vars: BTreeSet<&String> = a.key.0.keys().chain(b.key.0.keys()).collect();
            for var in vars {
                let ea = a.key.exponent_of(var);
                let eb = b.key.exponent_of(var);
                if ea != eb {
                    return eb.cmp(&ea);
                }
            }
            Ordering::Equal
        })
        .then_with(|| a.rest_signature().cmp(&b.rest_signature()))
}

fn collect(terms: Vec<Term>) -> Vec<Term> {
    let mut out: Vec<Term> = Vec::new();
    for term in terms {
        match out.iter_mut().find(|o| o.same_shape(&term)) {
            Some(existing) => existing.coeff += term.coeff,
            None => out.push(term),
        }
    }
    for term in out.iter_mut() {
        term.coeff = clean(term.coeff);
    }
    // NaN coefficients are kept so that 0/0 stays visible
    out.retain(|t| !(t.coeff.abs() < ZERO_TOL));
    out.sort_by(compare_terms);
    out
}

fn render(terms: &[Term]) -> Expr {
    let mut iter = terms.iter().map(Term::to_expr);
    match iter.next() {
        None => Expr::Const(0.0),
        Some(first) => iter.fold(first, |acc, t| Expr::Add(Box::new(acc), Box::new(t))),
    }
}

/// monomial content (lowest exponents, leading coefficient) and the primitive part
fn split_content(terms: &[Term], expand: bool) -> (Term, Vec<Term>) {
    let vars: BTreeSet<&String> = terms.iter().flat_map(|t| t.key.0.keys()).collect();
    let mut key = BTreeMap::new();
    for var in vars {
        let lowest = terms
            .iter()
            .map(|t| t.key.exponent_of(var))
            .min()
            .unwrap_or(0);
        if lowest != 0 {
            key.insert(var.clone(), lowest);
        }
    }
    let lead = terms.first().map(|t| t.coeff).unwrap_or(1.0);
    let lead = if lead == 0.0 || !lead.is_finite() { 1.0 } else { lead };
    let content = Term {
        coeff: lead,
        key: MonomialKey(key),
        rest: Vec::new(),
    };
    let inverse = content.inverse(expand);
    let primitive = collect(terms.iter().map(|t| t.mul(&inverse, expand)).collect());
    (content, primitive)
}

fn same_terms(a: &[Term], b: &[Term]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(s, t)| s.same_shape(t) && (s.coeff - t.coeff).abs() < 1e-10)
}

fn as_single_term(terms: &[Term], expand: bool) -> Term {
    match terms {
        [] => Term::constant(0.0),
        [single] => single.clone(),
        _ => {
            let (content, primitive) = split_content(terms, expand);
            content.mul(&Term::factor(render(&primitive), 1.0, expand), expand)
        }
    }
}

fn is_scalar(terms: &[Term]) -> bool {
    terms.len() == 1 && terms[0].is_constant()
}

fn multiply(ta: &[Term], tb: &[Term], expand: bool) -> Vec<Term> {
    if ta.is_empty() || tb.is_empty() {
        return Vec::new();
    }
    if expand || (ta.len() == 1 && tb.len() == 1) || is_scalar(ta) || is_scalar(tb) {
        ta.iter()
            .cartesian_product(tb.iter())
            .map(|(a, b)| a.mul(b, expand))
            .collect()
    } else {
        vec![as_single_term(ta, expand).mul(&as_single_term(tb, expand), expand)]
    }
}

fn divide(ta: &[Term], tb: &[Term], expand: bool) -> Vec<Term> {
    if tb.is_empty() {
        return vec![Term::constant(f64::NAN)];
    }
    if ta.is_empty() {
        return Vec::new();
    }
    if tb.len() == 1 {
        let inverse = tb[0].inverse(expand);
        return ta.iter().map(|t| t.mul(&inverse, expand)).collect();
    }
    let (cb, sb) = split_content(tb, expand);
    let (ca, sa) = split_content(ta, expand);
    if same_terms(&sa, &sb) {
        return vec![ca.mul(&cb.inverse(expand), expand)];
    }
    let inverse = cb
        .inverse(expand)
        .mul(&Term::factor(render(&sb), -1.0, expand), expand);
    if expand || ta.len() == 1 {
        ta.iter().map(|t| t.mul(&inverse, expand)).collect()
    } else {
        vec![
            ca.mul(&Term::factor(render(&sa), 1.0, expand), expand)
                .mul(&inverse, expand),
        ]
    }
}

fn power_const(terms: Vec<Term>, n: f64, expand: bool) -> Vec<Term> {
    if n == 0.0 {
        return vec![Term::constant(1.0)];
    }
    if n == 1.0 {
        return terms;
    }
    if terms.is_empty() {
        return if n > 0.0 {
            Vec::new()
        } else {
            vec![Term::constant(f64::INFINITY)]
        };
    }
    if terms.len() == 1 {
        return match terms[0].powf(n, expand) {
            Some(t) => vec![t],
            None => vec![Term::factor(render(&terms), n, expand)],
        };
    }
    if is_integral(n) {
        if expand && n >= 2.0 && n <= MAX_EXPANDED_POWER {
            let mut acc = terms.clone();
            for _ in 1..(n.round() as i32) {
                acc = collect(multiply(&acc, &terms, expand));
            }
            return acc;
        }
        let (content, primitive) = split_content(&terms, expand);
        if let Some(content_pow) = content.powf(n, expand) {
            return vec![content_pow.mul(&Term::factor(render(&primitive), n, expand), expand)];
        }
    }
    vec![Term::factor(render(&terms), n, expand)]
}

/// `exp(ln a) = a`, `exp(c*ln a) = a^c`
fn exp_of_log(arg: &Expr) -> Option<Expr> {
    match arg {
        Expr::Ln(inner) => Some(inner.as_ref().clone()),
        Expr::Mul(lhs, rhs) => match (lhs.as_ref(), rhs.as_ref()) {
            (Expr::Const(c), Expr::Ln(inner)) => {
                Some(Expr::Pow(inner.clone(), Box::new(Expr::Const(*c))))
            }
            _ => None,
        },
        _ => None,
    }
}

fn exponential(arg: &Expr, expand: bool) -> Vec<Term> {
    let arg = render(&canonical(arg, expand));
    if arg.is_zero() {
        return vec![Term::constant(1.0)];
    }
    match exp_of_log(&arg) {
        Some(reduced) => canonical(&reduced, expand),
        None => vec![Term::factor(Expr::Exp(Box::new(arg)), 1.0, expand)],
    }
}

fn logarithm(arg: &Expr, expand: bool) -> Vec<Term> {
    let arg = render(&canonical(arg, expand));
    match &arg {
        Expr::Const(c) if *c == 1.0 => Vec::new(),
        Expr::Const(c) if *c == E => vec![Term::constant(1.0)],
        Expr::Exp(inner) => canonical(inner, expand),
        _ => vec![Term::factor(Expr::Ln(Box::new(arg)), 1.0, expand)],
    }
}

fn power(base: &Expr, exp: &Expr, expand: bool) -> Vec<Term> {
    let exponent = render(&canonical(exp, expand));
    let base_terms = canonical(base, expand);
    if let Expr::Const(n) = exponent {
        return power_const(base_terms, n, expand);
    }
    let base_expr = render(&base_terms);
    match base_expr {
        Expr::Const(c) if c == E => exponential(&exponent, expand),
        Expr::Const(c) if c == 1.0 => vec![Term::constant(1.0)],
        _ => vec![Term::factor(
            Expr::Pow(Box::new(base_expr), Box::new(exponent)),
            1.0,
            expand,
        )],
    }
}

// sin, cos, tan and the inverse functions
fn function(expr: &Expr, expand: bool) -> Vec<Term> {
    let rebuilt = expr.map_args(|arg| render(&canonical(arg, expand)));
    if let Some(arg) = rebuilt.args().first() {
        if let Expr::Const(_) = arg {
            let value = rebuilt.eval_expression(&[], &[]);
            if is_integral(value) {
                return vec![Term::constant(value.round())];
            }
        }
    }
    vec![Term::factor(rebuilt, 1.0, expand)]
}

fn canonical(expr: &Expr, expand: bool) -> Vec<Term> {
    let terms = match expr {
        Expr::Const(c) => vec![Term::constant(*c)],
        Expr::Var(name) => vec![Term::variable(name)],
        Expr::Add(lhs, rhs) => {
            let mut terms = canonical(lhs, expand);
            terms.extend(canonical(rhs, expand));
            terms
        }
        Expr::Sub(lhs, rhs) => {
            let mut terms = canonical(lhs, expand);
            terms.extend(canonical(rhs, expand).into_iter().map(|t| t.scaled(-1.0)));
            terms
        }
        Expr::Mul(lhs, rhs) => multiply(&canonical(lhs, expand), &canonical(rhs, expand), expand),
        Expr::Div(lhs, rhs) => divide(&canonical(lhs, expand), &canonical(rhs, expand), expand),
        Expr::Pow(base, exp) => power(base, exp, expand),
        Expr::Exp(arg) => exponential(arg, expand),
        Expr::Ln(arg) => logarithm(arg, expand),
        _ => function(expr, expand),
    };
    collect(terms)
}

impl Expr {
    //___________________________________SIMPLIFICATION____________________________________

    /// Canonical form without multiplying out sums: like terms are collected, constants folded
    /// and monomials written as `coeff*x^a*y^b`, but `x*(x + y)` stays a product.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let e = Expr::parse_expression("y*x + 2*x*y - 0*z").unwrap();
    /// assert_eq!(e.simplify().to_string(), "3*x*y");
    /// ```
    pub fn simplify(&self) -> Expr {
        render(&canonical(self, false))
    }

    /// Canonical form with products and small integer powers of sums multiplied out.
    /// Two expressions are equal as functions if their difference expands to `0`
    /// (the converse does not hold for transcendental identities such as `sin^2 + cos^2`).
    pub fn expand(&self) -> Expr {
        render(&canonical(self, true))
    }

    /// Terms of the expanded form when it is a Laurent polynomial (integer exponents of
    /// variables only, no functions or unexpanded sums); None otherwise.
    pub fn polynomial_terms(&self) -> Option<Vec<(MonomialKey, f64)>> {
        let terms = canonical(self, true);
        if terms.iter().any(|t| !t.rest.is_empty() || !t.coeff.is_finite()) {
            return None;
        }
        Some(terms.into_iter().map(|t| (t.key, t.coeff)).collect())
    }

    /// Exponent of `var` shared by every term of the expanded form.
    ///
    /// None if the expression is zero, if the terms disagree, or if `var` survives inside an
    /// opaque factor (a function or an unexpanded sum).
    pub fn degree_in(&self, var: &str) -> Option<i32> {
        let terms = canonical(self, true);
        let mut degree = None;
        for term in &terms {
            if term.rest.iter().any(|f| f.base.contains_variable(var)) {
                return None;
            }
            let exp = term.key.exponent_of(var);
            match degree {
                None => degree = Some(exp),
                Some(d) if d != exp => return None,
                Some(_) => {}
            }
        }
        degree
    }
}
