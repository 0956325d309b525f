use log::Level;

use crate::error::{Fault, LispResult};
use crate::globals::{self, CapturedEnv};
use crate::heap::Arena;
use crate::modules::{self, boxes::BoxTable};
use crate::primitives::Primitive;
use crate::printer;
use crate::symbol::WellKnown;
use crate::value::{Kind, PairId, Tag, Value};

/// The evaluation machine.
/// All interpreter state lives here so the collector can find its one root.
pub struct Machine {
    pub arena: Arena,
    /// The global environment: a chain of (name . value) pairs, newest first.
    pub globals: Value,
    pub symbols: WellKnown,
    /// Core primitives followed by every module's primitives, in registry order.
    pub primitives: Vec<Primitive>,
    pub boxes: BoxTable,
    /// Nesting level of traced evaluations.
    depth: usize,
}

impl Machine {
    pub fn new(cells: usize) -> LispResult<Self> {
        let mut arena = Arena::new(cells)?;
        let symbols = WellKnown::intern(&mut arena)?;
        let primitives = modules::primitive_table();
        let globals = globals::build_globals(&mut arena, symbols.truth, &primitives)?;

        let mut m = Machine {
            arena,
            globals,
            symbols,
            primitives,
            boxes: BoxTable::default(),
            depth: 0,
        };
        modules::setup_all(&mut m)?;
        log::info!(
            "machine ready: {} cells, {} primitives, {} free",
            m.arena.capacity(),
            m.primitives.len(),
            m.arena.free_slots()
        );
        Ok(m)
    }

    /// Run module teardown hooks. Called once, after the last form.
    pub fn shutdown(&mut self) {
        modules::teardown_all(self);
        log::info!("machine stopped with {} free", self.arena.free_slots());
    }

    // ========================================================================
    // Core evaluation
    // ========================================================================

    /// Evaluate `expr` in `env`.
    ///
    /// Symbols are looked up, pairs are applications, everything else is
    /// self-evaluating. With trace logging on, every symbol and application
    /// is logged with its result, indented by nesting depth.
    pub fn eval(&mut self, expr: Value, env: Value) -> LispResult<Value> {
        let traced =
            matches!(expr.tag(), Tag::Symbol | Tag::Pair) && log::log_enabled!(Level::Trace);
        if !traced {
            return self.eval_step(expr, env);
        }

        self.depth += 1;
        let result = self.eval_step(expr, env);
        self.depth -= 1;
        if let Ok(val) = result {
            log::trace!(
                "{}: {:indent$}{} => {}",
                self.arena.sp(),
                "",
                self.render(expr),
                self.render(val),
                indent = 2 * self.depth
            );
        }
        result
    }

    fn eval_step(&mut self, expr: Value, env: Value) -> LispResult<Value> {
        match expr.kind() {
            Kind::Symbol(_) => Ok(self.lookup(expr, env)),
            Kind::Pair(id) => {
                let head = self.arena.car(id);
                let f = self.eval(head, env)?;
                let args = self.arena.cdr(id);
                self.apply(f, args, env)
            }
            _ => Ok(expr),
        }
    }

    /// Apply `f` to the unevaluated `args`.
    ///
    /// Primitives receive the arguments as written. Closures get them
    /// evaluated in `env` first.
    pub fn apply(&mut self, f: Value, args: Value, env: Value) -> LispResult<Value> {
        match f.kind() {
            Kind::Primitive(id) => match self.primitives.get(id.0 as usize) {
                Some(prim) => {
                    let func = prim.func;
                    func(self, args, env)
                }
                None => Ok(self.fault(Fault::NotCallable)),
            },
            Kind::Closure(id) => self.reduce(id, args, env),
            _ => Ok(self.fault(Fault::NotCallable)),
        }
    }

    /// Evaluate each element of an argument list, left to right.
    ///
    /// A symbol in tail position (as in `(f . args)`) is looked up and used as
    /// the tail. Any other non-pair tail ends the list.
    pub fn eval_list(&mut self, list: Value, env: Value) -> LispResult<Value> {
        let mut vals = Vec::new();
        let mut rest = list;
        while let Some(id) = rest.as_pair() {
            let expr = self.arena.car(id);
            vals.push(self.eval(expr, env)?);
            rest = self.arena.cdr(id);
        }
        let mut result = match rest.tag() {
            Tag::Symbol => self.lookup(rest, env),
            _ => Value::NIL,
        };
        for &val in vals.iter().rev() {
            result = self.arena.cons(val, result)?;
        }
        Ok(result)
    }

    // ========================================================================
    // Closures
    // ========================================================================

    /// Build a closure over `env`. Closures built at top level defer to the
    /// global environment at call time instead of capturing it.
    pub fn make_closure(&mut self, params: Value, body: Value, env: Value) -> LispResult<Value> {
        let code = self.arena.cons(params, body)?;
        let captured = CapturedEnv::capture(env, self.globals).to_value();
        let cell = self.arena.alloc(code, captured)?;
        Ok(Value::closure(cell))
    }

    /// Call a closure: evaluate the arguments in the caller's environment,
    /// bind them over the captured environment, evaluate the body.
    fn reduce(&mut self, clos: PairId, args: Value, env: Value) -> LispResult<Value> {
        let code = self.arena.car(clos);
        let captured = CapturedEnv::from_value(self.arena.cdr(clos)).resolve(self.globals);
        let params = self.car(code);
        let body = self.cdr(code);

        let vals = self.eval_list(args, env)?;
        let missing = self.fault(Fault::NotPair);
        let frame = globals::bind(&mut self.arena, params, vals, captured, missing)?;
        self.eval(body, frame)
    }

    // ========================================================================
    // Helpers shared with the primitives
    // ========================================================================

    /// Value bound to `name` in `env`, or the unbound fault.
    pub fn lookup(&self, name: Value, env: Value) -> Value {
        globals::lookup(&self.arena, name, env).unwrap_or_else(|| self.fault(Fault::Unbound))
    }

    /// Car of a pair or closure, or the not-pair fault.
    pub fn car(&self, val: Value) -> Value {
        self.arena
            .car_of(val)
            .unwrap_or_else(|| self.fault(Fault::NotPair))
    }

    /// Cdr of a pair or closure, or the not-pair fault.
    pub fn cdr(&self, val: Value) -> Value {
        self.arena
            .cdr_of(val)
            .unwrap_or_else(|| self.fault(Fault::NotPair))
    }

    pub fn fault(&self, fault: Fault) -> Value {
        self.symbols.fault(fault)
    }

    pub fn is_fault(&self, val: Value) -> bool {
        self.symbols.is_fault(val)
    }

    /// `#t` or `()`.
    pub fn truth(&self, cond: bool) -> Value {
        if cond {
            self.symbols.truth
        } else {
            Value::NIL
        }
    }

    /// Prepend a global binding. An existing binding is shadowed, not replaced.
    pub fn define(&mut self, name: Value, val: Value) -> LispResult<()> {
        self.globals = globals::pair_into(&mut self.arena, name, val, self.globals)?;
        Ok(())
    }

    /// Reclaim every pair allocated since the newest global binding.
    ///
    /// Only safe between top-level forms, once the result has been printed:
    /// nothing outside the global chain may be referenced afterwards.
    pub fn collect(&mut self) {
        if let Some(top) = self.globals.as_pair() {
            let before = self.arena.sp();
            self.arena.rewind(top.0 as usize);
            log::debug!(
                "collect: reclaimed {} slots, {} free",
                self.arena.sp() - before,
                self.arena.free_slots()
            );
        }
    }

    pub fn render(&self, val: Value) -> String {
        printer::print_val(val, &self.arena, &self.primitives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    fn eval_str(m: &mut Machine, src: &str) -> Value {
        let expr = read_str(m, src).unwrap().unwrap();
        let env = m.globals;
        m.eval(expr, env).unwrap()
    }

    fn run(m: &mut Machine, src: &str) -> String {
        let val = eval_str(m, src);
        let out = m.render(val);
        m.collect();
        out
    }

    #[test]
    fn test_self_evaluating() {
        let mut m = Machine::new(1024).unwrap();
        assert_eq!(eval_str(&mut m, "42"), Value::number(42.0));
        assert_eq!(eval_str(&mut m, "()"), Value::NIL);
        assert_eq!(run(&mut m, "#t"), "#t");
    }

    #[test]
    fn test_unbound_symbol_is_a_fault() {
        let mut m = Machine::new(1024).unwrap();
        let val = eval_str(&mut m, "nope");
        assert!(m.is_fault(val));
        assert_eq!(m.render(val), "ERR-unbound");
    }

    #[test]
    fn test_applying_a_non_function() {
        let mut m = Machine::new(1024).unwrap();
        assert_eq!(run(&mut m, "(1 2 3)"), "ERR-not-callable");
        assert_eq!(run(&mut m, "('a 2)"), "ERR-not-callable");
    }

    #[test]
    fn test_closure_call() {
        let mut m = Machine::new(1024).unwrap();
        assert_eq!(run(&mut m, "((lambda (x y) (+ x y)) 1 2)"), "3");
        assert_eq!(run(&mut m, "((lambda args args) 1 2 3)"), "(1 2 3)");
        assert_eq!(run(&mut m, "((lambda (x . r) r) 1 2 3)"), "(2 3)");
        assert_eq!(run(&mut m, "((lambda () 7))"), "7");
    }

    #[test]
    fn test_missing_argument_binds_a_fault() {
        let mut m = Machine::new(1024).unwrap();
        assert_eq!(run(&mut m, "((lambda (x y) y) 1)"), "ERR-not-pair");
    }

    #[test]
    fn test_top_level_closures_defer_to_globals() {
        let mut m = Machine::new(2048).unwrap();
        run(&mut m, "(define f (lambda (n) (g n)))");
        run(&mut m, "(define g (lambda (n) (* n 10)))");
        assert_eq!(run(&mut m, "(f 4)"), "40");
    }

    #[test]
    fn test_inner_closures_capture_eagerly() {
        let mut m = Machine::new(2048).unwrap();
        run(&mut m, "(define make-adder (lambda (n) (lambda (x) (+ x n))))");
        run(&mut m, "(define add5 (make-adder 5))");
        run(&mut m, "(define n 100)");
        assert_eq!(run(&mut m, "(add5 1)"), "6");
    }

    #[test]
    fn test_recursion() {
        let mut m = Machine::new(4096).unwrap();
        run(
            &mut m,
            "(define fact (lambda (n) (if (< n 2) 1 (* n (fact (- n 1))))))",
        );
        assert_eq!(run(&mut m, "(fact 10)"), "3628800");
    }

    #[test]
    fn test_collect_keeps_globals_and_frees_garbage() {
        let mut m = Machine::new(1024).unwrap();
        run(&mut m, "(define xs '(1 2 3))");
        let after_define = m.arena.free_slots();
        for _ in 0..50 {
            assert_eq!(run(&mut m, "(cons 1 (cons 2 (cons 3 ())))"), "(1 2 3)");
            assert_eq!(m.arena.free_slots(), after_define);
        }
        assert_eq!(run(&mut m, "xs"), "(1 2 3)");
    }

    #[test]
    fn test_define_shadows() {
        let mut m = Machine::new(1024).unwrap();
        run(&mut m, "(define x 1)");
        run(&mut m, "(define x 2)");
        assert_eq!(run(&mut m, "x"), "2");
    }

    #[test]
    fn test_primitives_render_by_name() {
        let mut m = Machine::new(1024).unwrap();
        assert_eq!(run(&mut m, "car"), "<car>");
        assert_eq!(run(&mut m, "let*"), "<let*>");
    }

    #[test]
    fn test_symbol_tail_is_spliced() {
        let mut m = Machine::new(1024).unwrap();
        run(&mut m, "(define rest '(2 3))");
        assert_eq!(run(&mut m, "(+ 1 . rest)"), "6");
    }
}
