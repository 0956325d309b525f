use std::io::{self, Write};
use std::process;

use log::LevelFilter;

use nanlisp::config::{Config, USAGE};
use nanlisp::eval::Machine;
use nanlisp::repl;
use nanlisp::LispResult;

fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("nanlisp: {}", e);
            eprintln!("Try 'nanlisp --help' for usage information.");
            process::exit(2);
        }
    };

    if config.help {
        println!("{}", USAGE);
        return;
    }

    init_logging(config.trace);

    if let Err(e) = run(&config) {
        log::error!("{}", e);
        eprintln!("nanlisp: {}", e);
        process::exit(1);
    }
}

fn init_logging(trace: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if trace {
        builder.filter_module("nanlisp", LevelFilter::Trace);
    }
    builder.init();
}

fn run(config: &Config) -> LispResult<()> {
    let mut machine = Machine::new(config.cells)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = repl::session(&mut machine, &config.load, stdin.lock(), &mut out, !config.quiet);
    out.flush()?;
    result.map(|_| ())
}
