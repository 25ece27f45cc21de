//! Compiling an `Expr` into a `Lambda` tree with variables resolved to argument slots,
//! so repeated evaluation at many sample points skips name lookups.
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_error::SymbolicError;

#[derive(Clone, Debug)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    ArcSin(Box<Lambda>),
    ArcCos(Box<Lambda>),
    ArcTg(Box<Lambda>),
}

impl Expr {
    /// Resolves every variable to its position in `vars`.
    ///
    /// # Errors
    /// `SymbolicError::UnknownVariable` if the expression uses a name not in `vars`
    pub fn compile(&self, vars: &[&str]) -> Result<Lambda, SymbolicError> {
        let lambda = match self {
            Expr::Var(name) => match vars.iter().position(|&v| v == name) {
                Some(idx) => Lambda::Var(idx),
                None => return Err(SymbolicError::UnknownVariable(name.clone())),
            },
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => Lambda::Add(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Sub(a, b) => Lambda::Sub(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Mul(a, b) => Lambda::Mul(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Div(a, b) => Lambda::Div(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Pow(a, b) => Lambda::Pow(Box::new(a.compile(vars)?), Box::new(b.compile(vars)?)),
            Expr::Exp(e) => Lambda::Exp(Box::new(e.compile(vars)?)),
            Expr::Ln(e) => Lambda::Ln(Box::new(e.compile(vars)?)),
            Expr::sin(e) => Lambda::Sin(Box::new(e.compile(vars)?)),
            Expr::cos(e) => Lambda::Cos(Box::new(e.compile(vars)?)),
            Expr::tg(e) => Lambda::Tg(Box::new(e.compile(vars)?)),
            Expr::arcsin(e) => Lambda::ArcSin(Box::new(e.compile(vars)?)),
            Expr::arccos(e) => Lambda::ArcCos(Box::new(e.compile(vars)?)),
            Expr::arctg(e) => Lambda::ArcTg(Box::new(e.compile(vars)?)),
        };
        Ok(lambda)
    }

    /// compiled closure, thread safe
    pub fn lambdify(&self, vars: &[&str]) -> Result<Box<dyn Fn(&[f64]) -> f64 + Send + Sync>, SymbolicError> {
        let compiled = self.compile(vars)?;
        Ok(Box::new(compiled.as_closure()))
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args.get(*i).copied().unwrap_or(f64::NAN),
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Pow(a, b) => a.eval(args).powf(b.eval(args)),
            Lambda::Exp(e) => e.eval(args).exp(),
            Lambda::Ln(e) => e.eval(args).ln(),
            Lambda::Sin(e) => e.eval(args).sin(),
            Lambda::Cos(e) => e.eval(args).cos(),
            Lambda::Tg(e) => e.eval(args).tan(),
            Lambda::ArcSin(e) => e.eval(args).asin(),
            Lambda::ArcCos(e) => e.eval(args).acos(),
            Lambda::ArcTg(e) => e.eval(args).atan(),
        }
    }

    pub fn as_closure(self) -> impl Fn(&[f64]) -> f64 + Send + Sync {
        move |args| self.eval(args)
    }
}
