use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::LispResult;
use crate::eval::Machine;
use crate::reader::Reader;
use crate::value::Value;

pub const BANNER: &str = "nanlisp";

/// Evaluate a top-level form against the current global environment.
fn eval_top(m: &mut Machine, expr: Value) -> LispResult<Value> {
    let env = m.globals;
    m.eval(expr, env)
}

/// Read, evaluate, print and collect until the input runs out.
///
/// With `prompt` set, the banner is shown first and every form is preceded by
/// a prompt carrying the free-slot gauge; results follow the prompt on the
/// same line. Without it, each result is printed on its own line.
/// Returns the number of forms evaluated.
pub fn run<R: Read, W: Write>(
    m: &mut Machine,
    input: R,
    out: &mut W,
    prompt: bool,
) -> LispResult<usize> {
    let mut reader = Reader::new(input);
    let mut count = 0;
    if prompt {
        write!(out, "{}", BANNER)?;
    }
    loop {
        if prompt {
            write!(out, "\n{}>", m.arena.free_slots())?;
            out.flush()?;
        }
        let Some(expr) = reader.read(m)? else {
            break;
        };
        let val = eval_top(m, expr)?;
        let text = m.render(val);
        if prompt {
            write!(out, "{}", text)?;
        } else {
            writeln!(out, "{}", text)?;
        }
        m.collect();
        count += 1;
    }
    if prompt {
        writeln!(out)?;
    }
    out.flush()?;
    log::debug!("input exhausted after {} forms", count);
    Ok(count)
}

/// Evaluate every form in `src`, collecting after each one.
/// Returns the printed result of each form.
pub fn eval_all(m: &mut Machine, src: &str) -> LispResult<Vec<String>> {
    let mut reader = Reader::new(src.as_bytes());
    let mut results = Vec::new();
    while let Some(expr) = reader.read(m)? {
        let val = eval_top(m, expr)?;
        results.push(m.render(val));
        m.collect();
    }
    Ok(results)
}

/// Evaluate a source file silently. Returns the number of forms evaluated.
pub fn load_file(m: &mut Machine, path: &Path) -> LispResult<usize> {
    let file = File::open(path)?;
    let mut reader = Reader::new(BufReader::new(file));
    let mut count = 0;
    while let Some(expr) = reader.read(m)? {
        eval_top(m, expr)?;
        m.collect();
        count += 1;
    }
    log::info!(
        "loaded {} forms from {} ({} free)",
        count,
        path.display(),
        m.arena.free_slots()
    );
    Ok(count)
}

/// Load each file in order, then run the REPL over `input`.
///
/// The machine is shut down however the session ends, so module teardown
/// also runs after a failed load.
pub fn session<R: Read, W: Write>(
    m: &mut Machine,
    loads: &[PathBuf],
    input: R,
    out: &mut W,
    prompt: bool,
) -> LispResult<usize> {
    let result = load_all(m, loads).and_then(|_| run(m, input, out, prompt));
    m.shutdown();
    result
}

fn load_all(m: &mut Machine, loads: &[PathBuf]) -> LispResult<()> {
    for path in loads {
        if let Err(e) = load_file(m, path) {
            log::error!("failed to load {}", path.display());
            return Err(e);
        }
    }
    Ok(())
}
