use std::fmt;

use crate::error::{Fault, LispResult};
use crate::eval::Machine;
use crate::globals::pair_into;
use crate::value::{self, Value};

/// A native function. It receives the argument list unevaluated, together
/// with the calling environment, and evaluates whatever it needs itself.
/// That is what lets `quote`, `if`, `and` and friends control evaluation.
pub type NativeFn = fn(&mut Machine, Value, Value) -> LispResult<Value>;

/// A named native function. A primitive value's ordinal is its row in the
/// machine's primitive table.
#[derive(Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    pub func: NativeFn,
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Primitive({})", self.name)
    }
}

/// The core primitives, in registration order.
pub const CORE: &[Primitive] = &[
    Primitive { name: "eval", func: prim_eval },
    Primitive { name: "quote", func: prim_quote },
    Primitive { name: "cons", func: prim_cons },
    Primitive { name: "car", func: prim_car },
    Primitive { name: "cdr", func: prim_cdr },
    Primitive { name: "+", func: prim_add },
    Primitive { name: "-", func: prim_sub },
    Primitive { name: "*", func: prim_mul },
    Primitive { name: "/", func: prim_div },
    Primitive { name: "int", func: prim_int },
    Primitive { name: "<", func: prim_lt },
    Primitive { name: "eq?", func: prim_eq },
    Primitive { name: "or", func: prim_or },
    Primitive { name: "and", func: prim_and },
    Primitive { name: "not", func: prim_not },
    Primitive { name: "cond", func: prim_cond },
    Primitive { name: "if", func: prim_if },
    Primitive { name: "let*", func: prim_let_star },
    Primitive { name: "lambda", func: prim_lambda },
    Primitive { name: "define", func: prim_define },
];

/// (eval x): evaluate x, then evaluate the result.
fn prim_eval(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let expr = m.car(vals);
    m.eval(expr, env)
}

/// (quote x): x, unevaluated.
fn prim_quote(m: &mut Machine, args: Value, _env: Value) -> LispResult<Value> {
    Ok(m.car(args))
}

fn prim_cons(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let car = m.car(vals);
    let cdr = m.car(m.cdr(vals));
    m.arena.cons(car, cdr)
}

fn prim_car(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    Ok(m.car(m.car(vals)))
}

fn prim_cdr(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    Ok(m.cdr(m.car(vals)))
}

fn prim_add(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    fold_numbers(m, args, env, |a, b| a + b)
}

fn prim_sub(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    fold_numbers(m, args, env, |a, b| a - b)
}

fn prim_mul(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    fold_numbers(m, args, env, |a, b| a * b)
}

fn prim_div(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    fold_numbers(m, args, env, |a, b| a / b)
}

/// Left fold over the evaluated arguments, starting from the first one.
fn fold_numbers(
    m: &mut Machine,
    args: Value,
    env: Value,
    op: fn(f64, f64) -> f64,
) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let not_number = m.fault(Fault::NotNumber);
    let Some(mut acc) = m.car(vals).as_number() else {
        return Ok(not_number);
    };
    let mut rest = m.cdr(vals);
    while let Some(id) = rest.as_pair() {
        match m.arena.car(id).as_number() {
            Some(n) => acc = op(acc, n),
            None => return Ok(not_number),
        }
        rest = m.arena.cdr(id);
    }
    if !rest.is_nil() {
        return Ok(not_number);
    }
    Ok(Value::number(acc))
}

/// (int n): integer part of n.
fn prim_int(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    Ok(match m.car(vals).as_number() {
        Some(n) => Value::number(value::truncate(n)),
        None => m.fault(Fault::NotNumber),
    })
}

fn prim_lt(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let a = m.car(vals).as_number();
    let b = m.car(m.cdr(vals)).as_number();
    Ok(match (a, b) {
        (Some(a), Some(b)) => m.truth(a - b < 0.0),
        _ => m.fault(Fault::NotNumber),
    })
}

/// (eq? x y): bit identity.
fn prim_eq(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let a = m.car(vals);
    let b = m.car(m.cdr(vals));
    Ok(m.truth(a == b))
}

/// (or x1 x2 ...): first non-() value, otherwise ().
fn prim_or(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let mut result = Value::NIL;
    let mut rest = args;
    while let Some(id) = rest.as_pair() {
        result = m.eval(m.arena.car(id), env)?;
        if !result.is_nil() {
            break;
        }
        rest = m.arena.cdr(id);
    }
    Ok(result)
}

/// (and x1 x2 ...): last value if none is (), otherwise ().
fn prim_and(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let mut result = Value::NIL;
    let mut rest = args;
    while let Some(id) = rest.as_pair() {
        result = m.eval(m.arena.car(id), env)?;
        if result.is_nil() {
            break;
        }
        rest = m.arena.cdr(id);
    }
    Ok(result)
}

fn prim_not(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    Ok(m.truth(m.car(vals).is_nil()))
}

/// (cond (test expr) ...): the expr of the first test that is not ().
fn prim_cond(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let mut rest = args;
    while let Some(id) = rest.as_pair() {
        let clause = m.arena.car(id);
        let test = m.car(clause);
        if !m.eval(test, env)?.is_nil() {
            let body = m.car(m.cdr(clause));
            return m.eval(body, env);
        }
        rest = m.arena.cdr(id);
    }
    Ok(Value::NIL)
}

/// (if test then else): the else branch may be left out.
fn prim_if(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let test = m.car(args);
    let branches = if m.eval(test, env)?.is_nil() {
        m.cdr(m.cdr(args))
    } else {
        m.cdr(args)
    };
    match branches.as_pair() {
        Some(id) => m.eval(m.arena.car(id), env),
        None => Ok(Value::NIL),
    }
}

/// (let* (v1 x1) (v2 x2) ... body): bind in sequence, then evaluate body.
fn prim_let_star(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let mut env = env;
    let mut rest = args;
    while let Some(id) = rest.as_pair() {
        let next = m.arena.cdr(id);
        if next.is_nil() {
            break;
        }
        let binding = m.arena.car(id);
        let name = m.car(binding);
        let init = m.car(m.cdr(binding));
        let val = m.eval(init, env)?;
        env = pair_into(&mut m.arena, name, val, env)?;
        rest = next;
    }
    let body = m.car(rest);
    m.eval(body, env)
}

/// (lambda params body)
fn prim_lambda(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let params = m.car(args);
    let body = m.car(m.cdr(args));
    m.make_closure(params, body, env)
}

/// (define name expr): bind globally, evaluating expr in the caller's env.
fn prim_define(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let name = m.car(args);
    let expr = m.car(m.cdr(args));
    let val = m.eval(expr, env)?;
    m.define(name, val)?;
    Ok(name)
}
