//! A small Lisp whose values are NaN-boxed 64-bit words living in one
//! fixed-size arena.
//!
//! Symbol names grow up from the bottom of the arena and pairs grow down from
//! the top. There is no tracing collector: after each top-level form the pair
//! stack is rewound to the newest global binding.

pub mod config;
pub mod error;
pub mod eval;
pub mod globals;
pub mod heap;
pub mod modules;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod repl;
pub mod symbol;
pub mod value;

pub use error::{Fault, LispError, LispResult};
pub use eval::Machine;
pub use value::Value;
