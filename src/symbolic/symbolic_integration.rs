use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_error::SymbolicError;

// highest n for which ∫ x^n * e^(ax+b) dx is unrolled by parts
const MAX_PARTS_DEGREE: f64 = 10.0;

impl Expr {
    /// SYMBOLIC INTEGRATION

    /// Indefinite integral with respect to `var` (without constant of integration).
    /// All other variables are treated as constants.
    ///
    /// The integrand is first brought to canonical form and integrated term by term; if a
    /// term resists, the fully expanded form is tried before giving up.
    ///
    /// # Errors
    /// `SymbolicError::Integration` when no closed form is found
    ///
    /// # Examples
    /// ```rust, ignore
    /// let f = Expr::parse_expression("2*x*y").unwrap();
    /// assert_eq!(f.integrate("x").unwrap().to_string(), "x^2*y");
    /// ```
    pub fn integrate(&self, var: &str) -> Result<Expr, SymbolicError> {
        let simplified = self.simplify();
        if let Some(result) = integrate_sum(&simplified, var) {
            return Ok(result.simplify());
        }
        let expanded = self.expand();
        if let Some(result) = integrate_sum(&expanded, var) {
            return Ok(result.simplify());
        }
        Err(SymbolicError::Integration {
            expr: self.to_string(),
            var: var.to_string(),
        })
    }
}

// ∫ (f ± g) dx = ∫ f dx ± ∫ g dx
fn integrate_sum(expr: &Expr, var: &str) -> Option<Expr> {
    match expr {
        Expr::Add(lhs, rhs) => Some(integrate_sum(lhs, var)? + integrate_sum(rhs, var)?),
        Expr::Sub(lhs, rhs) => Some(integrate_sum(lhs, var)? - integrate_sum(rhs, var)?),
        _ => integrate_term(expr, var),
    }
}

/// splits a product into (base, power) factors: `2*x^2*y/exp(x)` -> [(2,1), (x,2), (y,1), (exp(x),-1)]
fn flatten_product(expr: &Expr, sign: f64, out: &mut Vec<(Expr, f64)>) {
    match expr {
        Expr::Mul(lhs, rhs) => {
            flatten_product(lhs, sign, out);
            flatten_product(rhs, sign, out);
        }
        Expr::Div(lhs, rhs) => {
            flatten_product(lhs, sign, out);
            flatten_product(rhs, -sign, out);
        }
        Expr::Pow(base, exp) => match exp.as_ref() {
            Expr::Const(n) => out.push((base.as_ref().clone(), n * sign)),
            _ => out.push((expr.clone(), sign)),
        },
        _ => out.push((expr.clone(), sign)),
    }
}

fn rebuild_product(factors: &[(Expr, f64)]) -> Expr {
    factors
        .iter()
        .map(|(base, p)| {
            if *p == 1.0 {
                base.clone()
            } else {
                base.clone().pow(Expr::Const(*p))
            }
        })
        .reduce(|a, b| a * b)
        .unwrap_or(Expr::Const(1.0))
}

fn integrate_term(expr: &Expr, var: &str) -> Option<Expr> {
    let x = Expr::var(var);
    // ∫ c dx = c*x
    if !expr.contains_variable(var) {
        return Some(expr.clone() * x);
    }
    let mut factors = Vec::new();
    flatten_product(expr, 1.0, &mut factors);
    let (dependent, constant): (Vec<(Expr, f64)>, Vec<(Expr, f64)>) = factors
        .into_iter()
        .partition(|(base, _)| base.contains_variable(var));
    let integral = integrate_dependent(&dependent, var)?;
    Some(rebuild_product(&constant) * integral)
}

/// derivative of `g` if it does not depend on `var` and is not zero
fn linear_slope(g: &Expr, var: &str) -> Option<Expr> {
    let slope = g.diff(var).simplify();
    if slope.is_zero() || slope.contains_variable(var) {
        None
    } else {
        Some(slope)
    }
}

fn integrate_dependent(factors: &[(Expr, f64)], var: &str) -> Option<Expr> {
    let x = Expr::var(var);
    let mut n = 0.0;
    let mut others: Vec<(Expr, f64)> = Vec::new();
    for (base, p) in factors {
        match base {
            Expr::Var(name) if name == var => n += p,
            _ => others.push((base.clone(), *p)),
        }
    }
    if others.is_empty() {
        return Some(integrate_power_simple(n, var));
    }
    if others.len() == 1 && others[0].1 == 1.0 {
        match &others[0].0 {
            // ∫ x^n * e^(ax+b) dx, n = 0, 1, 2, ...
            Expr::Exp(g) if n > 0.0 && n.fract() == 0.0 && n <= MAX_PARTS_DEGREE => {
                if let Some(a) = linear_slope(g, var) {
                    return Some(integrate_xn_times_exp(n as i32, &a, g, var));
                }
            }
            // ∫ x^n * ln(x) dx
            Expr::Ln(inner) if n != 0.0 && **inner == x => {
                return Some(integrate_xn_times_ln_x(n, var));
            }
            _ => {}
        }
    }
    // substitution u = g: ∫ k * F'(g) * g' dx = k * F(g) when the cofactor is k*g' with k free of var
    for (i, (base, p)) in others.iter().enumerate() {
        for (g, antiderivative) in substitution_candidates(base, *p) {
            let g_prime = g.diff(var).simplify();
            if g_prime.is_zero() {
                continue;
            }
            let mut cofactor: Vec<(Expr, f64)> = others
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, f)| f.clone())
                .collect();
            if n != 0.0 {
                cofactor.push((x.clone(), n));
            }
            let k = (rebuild_product(&cofactor) / g_prime).simplify();
            if !k.contains_variable(var) {
                return Some(k * antiderivative);
            }
        }
    }
    None
}

/// (inner function g, antiderivative F(g)) pairs for a factor F'(g): the inner argument of a
/// known function first, then the factor itself as g with F(g) = g^2/2
fn substitution_candidates(base: &Expr, p: f64) -> Vec<(Expr, Expr)> {
    let one = || Expr::Const(1.0);
    let two = || Expr::Const(2.0);
    if matches!(base, Expr::Var(_) | Expr::Const(_)) {
        return Vec::new();
    }
    if p != 1.0 {
        // ∫ g^p g' dx
        return vec![(base.clone(), power_antiderivative(base.clone(), p))];
    }
    let mut candidates = Vec::new();
    match base {
        Expr::Exp(g) => candidates.push((g.as_ref().clone(), base.clone())),
        Expr::sin(g) => candidates.push((g.as_ref().clone(), -Expr::cos(g.clone()))),
        Expr::cos(g) => candidates.push((g.as_ref().clone(), Expr::sin(g.clone()))),
        Expr::tg(g) => candidates.push((g.as_ref().clone(), -Expr::cos(g.clone()).ln())),
        // ∫ ln(g) dg = g*ln(g) - g
        Expr::Ln(g) => {
            let g = g.as_ref().clone();
            candidates.push((g.clone(), g.clone() * g.clone().ln() - g));
        }
        // ∫ atan(g) dg = g*atan(g) - ln(1 + g^2)/2
        Expr::arctg(g) => {
            let g = g.as_ref().clone();
            let anti = g.clone() * Expr::arctg(g.clone().boxed())
                - (one() + g.clone().pow(two())).ln() / two();
            candidates.push((g, anti));
        }
        // ∫ asin(g) dg = g*asin(g) + sqrt(1 - g^2)
        Expr::arcsin(g) => {
            let g = g.as_ref().clone();
            let anti = g.clone() * Expr::arcsin(g.clone().boxed())
                + (one() - g.clone().pow(two())).pow(Expr::Const(0.5));
            candidates.push((g, anti));
        }
        // ∫ acos(g) dg = g*acos(g) - sqrt(1 - g^2)
        Expr::arccos(g) => {
            let g = g.as_ref().clone();
            let anti = g.clone() * Expr::arccos(g.clone().boxed())
                - (one() - g.clone().pow(two())).pow(Expr::Const(0.5));
            candidates.push((g, anti));
        }
        // ∫ c^g dg = c^g / ln(c)
        Expr::Pow(c, g) => {
            if let Expr::Const(val) = c.as_ref() {
                if *val > 0.0 && *val != 1.0 {
                    candidates.push((g.as_ref().clone(), base.clone() / Expr::Const(val.ln())));
                }
            }
        }
        _ => {}
    }
    // ∫ g dg = g^2/2
    if !matches!(base, Expr::Exp(_)) {
        candidates.push((base.clone(), power_antiderivative(base.clone(), 1.0)));
    }
    candidates
}

/// ∫ u^p du
fn power_antiderivative(u: Expr, p: f64) -> Expr {
    if p == -1.0 {
        u.ln()
    } else {
        u.pow(Expr::Const(p + 1.0)) / Expr::Const(p + 1.0)
    }
}

/// Simple power integration x^n dx = x^(n+1)/(n+1), ln(x) for n = -1
fn integrate_power_simple(n: f64, var: &str) -> Expr {
    power_antiderivative(Expr::var(var), n)
}

/// ∫ x^n * e^g dx with g linear in x, slope a:
/// I_n = x^n * e^g / a - (n/a) * I_(n-1),  I_0 = e^g / a
fn integrate_xn_times_exp(n: i32, a: &Expr, g: &Expr, var: &str) -> Expr {
    let exp_g = Expr::Exp(g.clone().boxed());
    if n == 0 {
        return exp_g / a.clone();
    }
    let x = Expr::var(var);
    let xn = if n == 1 {
        x
    } else {
        x.pow(Expr::Const(n as f64))
    };
    let first_term = (xn * exp_g) / a.clone();
    let second_term =
        (Expr::Const(n as f64) / a.clone()) * integrate_xn_times_exp(n - 1, a, g, var);
    first_term - second_term
}

/// Integrate x^n * ln(x) using integration by parts
/// ∫ x^n * ln(x) dx = x^(n+1) * [ln(x)/(n+1) - 1/(n+1)²]
fn integrate_xn_times_ln_x(n: f64, var: &str) -> Expr {
    let x = Expr::var(var);
    if n == -1.0 {
        // ∫ ln(x)/x dx = (ln(x))²/2
        return x.ln().pow(Expr::Const(2.0)) / Expr::Const(2.0);
    }
    let n_plus_1 = n + 1.0;
    let term1 = x.clone().ln() / Expr::Const(n_plus_1);
    let term2 = Expr::Const(1.0 / (n_plus_1 * n_plus_1));
    x.pow(Expr::Const(n_plus_1)) * (term1 - term2)
}
