//! Extension modules.
//!
//! A module contributes primitives and may hook machine start and stop. The
//! registry is fixed at compile time; the primitive table the evaluator
//! dispatches on is the core table followed by each module's table, in
//! registry order.

pub mod boxes;

use crate::error::LispResult;
use crate::eval::Machine;
use crate::primitives::{Primitive, CORE};

pub type SetupFn = fn(&mut Machine) -> LispResult<()>;
pub type TeardownFn = fn(&mut Machine);

pub struct Module {
    pub name: &'static str,
    pub primitives: &'static [Primitive],
    /// Runs once, after globals are built and before the first read.
    pub setup: Option<SetupFn>,
    /// Runs once, when the machine stops.
    pub teardown: Option<TeardownFn>,
}

pub static REGISTRY: &[Module] = &[boxes::MODULE];

/// The full primitive table: core first, then every module in order.
pub fn primitive_table() -> Vec<Primitive> {
    CORE.iter()
        .chain(REGISTRY.iter().flat_map(|module| module.primitives.iter()))
        .copied()
        .collect()
}

pub fn setup_all(m: &mut Machine) -> LispResult<()> {
    for module in REGISTRY {
        log::debug!(
            "module {}: {} primitives",
            module.name,
            module.primitives.len()
        );
        if let Some(setup) = module.setup {
            setup(m)?;
        }
    }
    Ok(())
}

pub fn teardown_all(m: &mut Machine) {
    for module in REGISTRY {
        if let Some(teardown) = module.teardown {
            log::debug!("module {}: teardown", module.name);
            teardown(m);
        }
    }
}
