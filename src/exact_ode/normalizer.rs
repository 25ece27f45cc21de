//! Rewrites what a user types into the grammar the parser accepts.
//!
//! Rules run in a fixed order, each one relying on the previous ones:
//! 1. whitespace is removed, `²` and `³` become `^2` and `^3`;
//! 2. `e^u` and `e^(...)` become `exp(u)` / `exp(...)`;
//! 3. inside `exp(...)`: `v^k` becomes `pow(v,k)` and implicit products are made explicit
//!    (`exp(2xy)` -> `exp(2*x*y)`), function names are left alone;
//! 4. a digit directly followed by a letter gets a `*` (`2x` -> `2*x`), except the exponent
//!    marker of a literal such as `1e6` or `2.5e-3`;
//! 5. `arcsin`, `arccos`, `arctan` are spelled `asin`, `acos`, `atan`.
//!
//! Applying the rules to their own output changes nothing.
use crate::exact_ode::errors::{EngineError, EngineResult};
use crate::symbolic::parse_expr::is_known_function;
use log::debug;
use regex::{Captures, Regex};
use std::sync::LazyLock;

struct Rules {
    power_in_exp: Regex,
    digit_letter: Regex,
    inverse_trig: Regex,
}

static RULES: LazyLock<Result<Rules, regex::Error>> = LazyLock::new(|| {
    Ok(Rules {
        power_in_exp: Regex::new(r"(pi|[A-Za-z])\^(\d+)")?,
        digit_letter: Regex::new(r"(\d)([A-Za-z])")?,
        inverse_trig: Regex::new(r"arc(sin|cos|tan)")?,
    })
});

fn rules() -> EngineResult<&'static Rules> {
    RULES.as_ref().map_err(|e| EngineError::Normalize {
        input: String::new(),
        reason: e.to_string(),
    })
}

/// Normalized form of `raw`, or the empty string when `raw` is blank or cannot be rewritten.
pub fn normalize(raw: &str) -> String {
    match try_normalize(raw) {
        Ok(normalized) => normalized,
        Err(err) => {
            debug!("normalization failed: {}", err);
            String::new()
        }
    }
}

pub fn try_normalize(raw: &str) -> EngineResult<String> {
    let failed = |reason: &str| EngineError::Normalize {
        input: raw.to_string(),
        reason: reason.to_string(),
    };
    let rules = rules()?;
    let text: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace('²', "^2")
        .replace('³', "^3");
    if text.is_empty() {
        return Err(failed("empty expression"));
    }
    let text = rewrite_e_powers(&text).ok_or_else(|| failed("unbalanced parentheses"))?;
    let text = rewrite_exp_arguments(&text, rules).ok_or_else(|| failed("unbalanced parentheses"))?;
    let text = rules.digit_letter.replace_all(&text, |caps: &Captures| {
        let end = caps.get(0).map_or(text.len(), |m| m.end());
        if is_exponent_marker(&caps[2], &text[end..]) {
            caps[0].to_string()
        } else {
            format!("{}*{}", &caps[1], &caps[2])
        }
    });
    let text = rules.inverse_trig.replace_all(&text, "a$1");
    Ok(text.into_owned())
}

/// `e` of a literal such as `1e6` or `2.5e-3`: followed by a digit, or by a sign and a digit
fn is_exponent_marker(letter: &str, rest: &str) -> bool {
    let mut next = rest.chars();
    let is_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());
    (letter == "e" || letter == "E")
        && match next.next() {
            Some('+') | Some('-') => is_digit(next.next()),
            c => is_digit(c),
        }
}

/// byte index of the `)` closing the `(` at `open`
fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn preceded_by_letter(text: &str, idx: usize) -> bool {
    text[..idx]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_ascii_alphabetic())
}

fn rewrite_exp_arguments(text: &str, rules: &Rules) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("exp(") {
        if preceded_by_letter(rest, start) {
            out.push_str(&rest[..start + 4]);
            rest = &rest[start + 4..];
            continue;
        }
        let open = start + 3;
        let close = matching_paren(rest, open)?;
        out.push_str(&rest[..=open]);
        let inner = rules.power_in_exp.replace_all(&rest[open + 1..close], "pow($1,$2)");
        out.push_str(&explicit_products(&inner));
        rest = &rest[close..];
    }
    out.push_str(rest);
    Some(out)
}

#[derive(Clone, Copy, PartialEq)]
enum Token {
    Word,
    Number,
    Close,
    Other,
}

/// `*` between adjacent operands: `2xy` -> `2*x*y`, `xsin(y)` -> `x*sin(y)`, `2(x+y)` -> `2*(x+y)`
fn explicit_products(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 4);
    let mut prev = Token::Other;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                i += 1;
            }
            let run: String = chars[start..i].iter().collect();
            let is_call = chars.get(i) == Some(&'(');
            for piece in split_names(&run, is_call) {
                if prev != Token::Other {
                    out.push('*');
                }
                out.push_str(&piece);
                prev = Token::Word;
            }
            if is_call {
                prev = Token::Other;
            }
        } else if c.is_ascii_digit() || c == '.' {
            if prev == Token::Word || prev == Token::Close {
                out.push('*');
            }
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                out.push(chars[i]);
                i += 1;
            }
            prev = Token::Number;
        } else {
            if c == '(' && (prev == Token::Number || prev == Token::Close) {
                out.push('*');
            }
            out.push(c);
            prev = if c == ')' { Token::Close } else { Token::Other };
            i += 1;
        }
    }
    out
}

fn split_names(run: &str, is_call: bool) -> Vec<String> {
    if run == "pi" || run == "e" || (is_call && is_known_function(run)) {
        return vec![run.to_string()];
    }
    let (head, call) = if is_call {
        // longest function name the run ends with
        match (1..run.len()).find(|&k| is_known_function(&run[k..])) {
            Some(k) => (&run[..k], Some(&run[k..])),
            None => (run, None),
        }
    } else {
        (run, None)
    };
    let mut pieces: Vec<String> = head.chars().map(String::from).collect();
    if let Some(name) = call {
        pieces.push(name.to_string());
    }
    pieces
}

fn rewrite_e_powers(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("e^") {
        if preceded_by_letter(rest, start) {
            out.push_str(&rest[..start + 2]);
            rest = &rest[start + 2..];
            continue;
        }
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        if after.starts_with('(') {
            let close = matching_paren(after, 0)?;
            out.push_str("exp");
            out.push_str(&after[..=close]);
            rest = &after[close + 1..];
        } else {
            let sign = usize::from(after.starts_with('-'));
            let len = after[sign..]
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
                .unwrap_or(after.len() - sign);
            if len == 0 {
                out.push_str("e^");
                rest = after;
                continue;
            }
            out.push_str("exp(");
            out.push_str(&after[..sign + len]);
            out.push(')');
            rest = &after[sign + len..];
        }
    }
    out.push_str(rest);
    Some(out)
}
