use std::path::PathBuf;

use crate::error::{LispError, LispResult};
use crate::heap::max_capacity;

pub const DEFAULT_CELLS: usize = 1024;

/// Smallest arena that holds the startup symbols and global bindings with
/// room left to work.
pub const MIN_CELLS: usize = 256;

pub const USAGE: &str = "\
Usage: nanlisp [OPTIONS]

Reads expressions from standard input, evaluates and prints them.

Options:
  --cells <n>      Arena capacity in slots (default 1024)
  --load <file>    Evaluate a source file before reading stdin (repeatable)
  --quiet          No banner, no prompt; one result per line
  --trace          Log every evaluation step at trace level
  -h, --help       Show this help message

Environment variables:
  RUST_LOG         Log filter (default: warn)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cells: usize,
    pub load: Vec<PathBuf>,
    pub quiet: bool,
    pub trace: bool,
    pub help: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cells: DEFAULT_CELLS,
            load: Vec::new(),
            quiet: false,
            trace: false,
            help: false,
        }
    }
}

impl Config {
    pub fn from_env() -> LispResult<Self> {
        Self::from_args(pico_args::Arguments::from_env())
    }

    pub fn from_args(mut args: pico_args::Arguments) -> LispResult<Self> {
        let help = args.contains(["-h", "--help"]);
        let cells = args
            .opt_value_from_str::<_, usize>("--cells")?
            .unwrap_or(DEFAULT_CELLS);
        let load = args.values_from_str::<_, PathBuf>("--load")?;
        let quiet = args.contains("--quiet");
        let trace = args.contains("--trace");

        let rest = args.finish();
        if !rest.is_empty() {
            let rest: Vec<String> = rest
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect();
            return Err(LispError::Config(format!(
                "unexpected arguments: {}",
                rest.join(" ")
            )));
        }

        let config = Config {
            cells,
            load,
            quiet,
            trace,
            help,
        };
        if !config.help {
            config.validate()?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> LispResult<()> {
        if self.cells < MIN_CELLS || self.cells > max_capacity() {
            return Err(LispError::Config(format!(
                "--cells must be between {} and {}, got {}",
                MIN_CELLS,
                max_capacity(),
                self.cells
            )));
        }
        Ok(())
    }
}
