use thiserror::Error;

/// Host-level failures. In-language failures are ordinary values, see [`Fault`].
#[derive(Error, Debug)]
pub enum LispError {
    /// The symbol heap and the pair stack met. There is no recovery from this.
    #[error("arena exhausted (heap at byte {hp}, stack at slot {sp})")]
    ArenaExhausted { hp: usize, sp: usize },

    /// The reader ran out of input. Callers treat this as a clean stop.
    #[error("end of input")]
    EndOfInput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Args(#[from] pico_args::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type LispResult<T> = Result<T, LispError>;

/// Failures that surface as values inside the language.
///
/// Each fault is a symbol named `ERR` plus a suffix identifying what went
/// wrong. It flows through evaluation like any other symbol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Symbol not found in the environment chain.
    Unbound,
    /// car/cdr of something that is not a pair or closure.
    NotPair,
    /// Application of a value that is neither a primitive nor a closure.
    NotCallable,
    /// Arithmetic or comparison on a non-number.
    NotNumber,
    NotBox,
    BoxFull,
    /// Box contents that the collector could reclaim underneath the box.
    BoxContent,
}

impl Fault {
    pub const COUNT: usize = 7;

    pub const ALL: [Fault; Fault::COUNT] = [
        Fault::Unbound,
        Fault::NotPair,
        Fault::NotCallable,
        Fault::NotNumber,
        Fault::NotBox,
        Fault::BoxFull,
        Fault::BoxContent,
    ];

    pub fn symbol_name(self) -> &'static str {
        match self {
            Fault::Unbound => "ERR-unbound",
            Fault::NotPair => "ERR-not-pair",
            Fault::NotCallable => "ERR-not-callable",
            Fault::NotNumber => "ERR-not-number",
            Fault::NotBox => "ERR-not-box",
            Fault::BoxFull => "ERR-box-full",
            Fault::BoxContent => "ERR-box-content",
        }
    }
}
