use crate::heap::Arena;
use crate::primitives::Primitive;
use crate::value::{exact_integer, Kind, PairId, Value};

/// Significant digits for numbers that are not exact integers.
const PRECISION: usize = 10;

/// Nesting beyond this prints as `...`.
const MAX_DEPTH: usize = 1000;

/// Print a value to a string.
pub fn print_val(val: Value, arena: &Arena, primitives: &[Primitive]) -> String {
    let mut out = String::new();
    print_inner(val, arena, primitives, &mut out, 0);
    out
}

fn print_inner(val: Value, arena: &Arena, primitives: &[Primitive], out: &mut String, depth: usize) {
    if depth > MAX_DEPTH {
        out.push_str("...");
        return;
    }

    match val.kind() {
        Kind::Nil => out.push_str("()"),
        Kind::Number(n) => out.push_str(&format_number(n)),
        Kind::Symbol(id) => out.push_str(&arena.symbol_name(id)),
        Kind::Primitive(id) => match primitives.get(id.0 as usize) {
            Some(prim) => {
                out.push('<');
                out.push_str(prim.name);
                out.push('>');
            }
            None => out.push_str(&format!("<prim:{}>", id.0)),
        },
        Kind::Closure(id) => out.push_str(&format!("{{{}}}", id.0)),
        Kind::Box(id) => out.push_str(&format!("<box:{}>", id.0)),
        Kind::Pair(id) => print_list(id, arena, primitives, out, depth),
    }
}

fn print_list(id: PairId, arena: &Arena, primitives: &[Primitive], out: &mut String, depth: usize) {
    out.push('(');
    print_inner(arena.car(id), arena, primitives, out, depth + 1);

    let mut current = arena.cdr(id);
    loop {
        match current.kind() {
            Kind::Nil => break,
            Kind::Pair(next) => {
                out.push(' ');
                print_inner(arena.car(next), arena, primitives, out, depth + 1);
                current = arena.cdr(next);
            }
            _ => {
                out.push_str(" . ");
                print_inner(current, arena, primitives, out, depth + 1);
                break;
            }
        }
    }
    out.push(')');
}

/// Render a number the way C's `%.10g` would, except that integral values in
/// the exact range always print in full.
pub fn format_number(n: f64) -> String {
    // an integer would drop the sign
    if n == 0.0 && n.is_sign_negative() {
        return "-0".into();
    }
    if let Some(i) = exact_integer(n) {
        return i.to_string();
    }
    if n.is_nan() {
        return "nan".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "inf" } else { "-inf" }.into();
    }

    // Scientific form already rounds to the right number of digits; its
    // exponent decides between fixed and exponent notation.
    let sci = format!("{:.*e}", PRECISION - 1, n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

/// Drop trailing fractional zeros, and the point if nothing is left after it.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
