use crate::error::LispResult;
use crate::heap::Arena;
use crate::primitives::Primitive;
use crate::value::{PrimId, Value};

/// Build the initial global environment.
/// The environment is a chain of (name . value) pairs, newest first.
/// Installs `#t` bound to itself, then every primitive in table order.
pub fn build_globals(arena: &mut Arena, truth: Value, table: &[Primitive]) -> LispResult<Value> {
    let mut globe = pair_into(arena, truth, truth, Value::NIL)?;
    for (row, prim) in table.iter().enumerate() {
        let name = Value::symbol(arena.intern(prim.name)?);
        globe = pair_into(arena, name, Value::primitive(PrimId(row as u32)), globe)?;
    }
    Ok(globe)
}

/// Prepend the binding `(name . val)` to `env`.
pub fn pair_into(arena: &mut Arena, name: Value, val: Value, env: Value) -> LispResult<Value> {
    let binding = arena.cons(name, val)?;
    arena.cons(binding, env)
}

/// Look up a binding front to back, so inner bindings shadow outer ones.
/// Returns `None` when the chain runs out.
pub fn lookup(arena: &Arena, name: Value, env: Value) -> Option<Value> {
    let mut current = env;
    while let Some(id) = current.as_pair() {
        let binding = arena.car(id);
        if arena.car_of(binding) == Some(name) {
            return arena.cdr_of(binding);
        }
        current = arena.cdr(id);
    }
    None
}

/// Extend `env` by destructuring `params` against `args`.
///
/// The empty list binds nothing. A pair binds its head to the head argument
/// and continues with both tails. Any other value (a lone symbol) takes the
/// whole remaining argument list, which is how rest parameters work.
/// Missing arguments bind to `missing`.
pub fn bind(
    arena: &mut Arena,
    params: Value,
    args: Value,
    env: Value,
    missing: Value,
) -> LispResult<Value> {
    let mut params = params;
    let mut args = args;
    let mut env = env;
    while let Some(id) = params.as_pair() {
        let (arg, rest) = match args.as_cell() {
            Some(cell) => (arena.car(cell), arena.cdr(cell)),
            None => (missing, missing),
        };
        let name = arena.car(id);
        env = pair_into(arena, name, arg, env)?;
        params = arena.cdr(id);
        args = rest;
    }
    if params.is_nil() {
        Ok(env)
    } else {
        pair_into(arena, params, args, env)
    }
}

/// The environment a closure resolves its free variables against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapturedEnv {
    /// Captured when the closure was built.
    Eager(Value),
    /// Built at top level: use whatever the global environment is at call time.
    DeferToGlobal,
}

impl CapturedEnv {
    /// Closures built directly in the global environment defer to it, which
    /// lets top-level definitions refer to each other in any order.
    pub fn capture(env: Value, globals: Value) -> Self {
        if env == globals {
            CapturedEnv::DeferToGlobal
        } else {
            CapturedEnv::Eager(env)
        }
    }

    /// Decode the cdr of a closure cell. The empty list marks deferral.
    pub fn from_value(val: Value) -> Self {
        if val.is_nil() {
            CapturedEnv::DeferToGlobal
        } else {
            CapturedEnv::Eager(val)
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            CapturedEnv::Eager(env) => env,
            CapturedEnv::DeferToGlobal => Value::NIL,
        }
    }

    pub fn resolve(self, globals: Value) -> Value {
        match self {
            CapturedEnv::Eager(env) => env,
            CapturedEnv::DeferToGlobal => globals,
        }
    }
}
