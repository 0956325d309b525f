//! Mutable reference cells kept in a fixed side table.
//!
//! A box value's ordinal is its row in the table. Contents live outside the
//! arena, so pairs and closures are refused: the collector could reclaim
//! them while the box still points at them.

use crate::error::{Fault, LispResult};
use crate::eval::Machine;
use crate::primitives::Primitive;
use crate::value::{BoxId, Tag, Value};

use super::Module;

pub const CAPACITY: usize = 100;

pub const MODULE: Module = Module {
    name: "boxes",
    primitives: PRIMITIVES,
    setup: Some(setup),
    teardown: Some(teardown),
};

const PRIMITIVES: &[Primitive] = &[
    Primitive { name: "box", func: prim_box },
    Primitive { name: "set-box!", func: prim_set_box },
    Primitive { name: "unbox", func: prim_unbox },
    Primitive { name: "isbox", func: prim_isbox },
];

/// The side table. Empty with zero capacity until the module is set up.
#[derive(Debug, Default)]
pub struct BoxTable {
    cells: Vec<Value>,
    capacity: usize,
}

impl BoxTable {
    pub fn with_capacity(capacity: usize) -> Self {
        BoxTable {
            cells: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Store `val` in the next free row. `None` when the table is full.
    pub fn push(&mut self, val: Value) -> Option<BoxId> {
        if self.cells.len() >= self.capacity {
            return None;
        }
        self.cells.push(val);
        Some(BoxId((self.cells.len() - 1) as u32))
    }

    pub fn get(&self, id: BoxId) -> Option<Value> {
        self.cells.get(id.0 as usize).copied()
    }

    /// Replace the content of an existing row. False if the row is unused.
    pub fn set(&mut self, id: BoxId, val: Value) -> bool {
        match self.cells.get_mut(id.0 as usize) {
            Some(cell) => {
                *cell = val;
                true
            }
            None => false,
        }
    }
}

fn setup(m: &mut Machine) -> LispResult<()> {
    m.boxes = BoxTable::with_capacity(CAPACITY);
    Ok(())
}

fn teardown(m: &mut Machine) {
    log::debug!("boxes: {} of {} rows used", m.boxes.len(), CAPACITY);
    m.boxes = BoxTable::default();
}

/// Arena-backed values may not outlive the next collection.
fn storable(val: Value) -> bool {
    !matches!(val.tag(), Tag::Pair | Tag::Closure)
}

/// (box x)
fn prim_box(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let content = m.car(vals);
    if !storable(content) {
        return Ok(m.fault(Fault::BoxContent));
    }
    Ok(match m.boxes.push(content) {
        Some(id) => Value::box_ref(id),
        None => m.fault(Fault::BoxFull),
    })
}

/// (set-box! b x)
fn prim_set_box(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let Some(id) = m.car(vals).as_box() else {
        return Ok(m.fault(Fault::NotBox));
    };
    let content = m.car(m.cdr(vals));
    if !storable(content) {
        return Ok(m.fault(Fault::BoxContent));
    }
    if !m.boxes.set(id, content) {
        return Ok(m.fault(Fault::NotBox));
    }
    Ok(Value::NIL)
}

/// (unbox b)
fn prim_unbox(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    let content = m.car(vals).as_box().and_then(|id| m.boxes.get(id));
    Ok(content.unwrap_or_else(|| m.fault(Fault::NotBox)))
}

/// (isbox x)
fn prim_isbox(m: &mut Machine, args: Value, env: Value) -> LispResult<Value> {
    let vals = m.eval_list(args, env)?;
    Ok(m.truth(m.car(vals).as_box().is_some()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::eval_all;

    fn run(src: &str) -> Vec<String> {
        let mut m = Machine::new(2048).unwrap();
        eval_all(&mut m, src).unwrap()
    }

    #[test]
    fn test_box_roundtrip() {
        let out = run("(define b (box 5)) (unbox b) (set-box! b 'x) (unbox b) b");
        assert_eq!(out, ["b", "5", "()", "x", "<box:0>"]);
    }

    #[test]
    fn test_isbox() {
        assert_eq!(run("(isbox (box 1)) (isbox 1)"), ["#t", "()"]);
    }

    #[test]
    fn test_refuses_arena_contents() {
        let out = run("(box '(1 2)) (box (lambda (x) x)) (define b (box 1)) (set-box! b '(1))");
        assert_eq!(
            out,
            ["ERR-box-content", "ERR-box-content", "b", "ERR-box-content"]
        );
    }

    #[test]
    fn test_not_a_box() {
        assert_eq!(run("(unbox 3) (set-box! 'a 1)"), ["ERR-not-box", "ERR-not-box"]);
    }

    #[test]
    fn test_table_fills_up() {
        let mut m = Machine::new(2048).unwrap();
        for i in 0..CAPACITY {
            let out = eval_all(&mut m, "(box 0)").unwrap();
            assert_eq!(out, [format!("<box:{}>", i)]);
        }
        assert_eq!(eval_all(&mut m, "(box 0)").unwrap(), ["ERR-box-full"]);
    }

    #[test]
    fn test_teardown_empties_the_table() {
        let mut m = Machine::new(1024).unwrap();
        eval_all(&mut m, "(box 1)").unwrap();
        assert_eq!(m.boxes.len(), 1);
        m.shutdown();
        assert!(m.boxes.is_empty());
    }

    #[test]
    fn test_unset_table_is_full() {
        let mut table = BoxTable::default();
        assert_eq!(table.push(Value::NIL), None);
        assert!(!table.set(BoxId(0), Value::NIL));
    }
}
