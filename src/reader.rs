use std::io::{self, Read};

use crate::error::{LispError, LispResult};
use crate::eval::Machine;
use crate::value::Value;

/// Longest token. A longer run of atom bytes is split, and the overflow
/// starts the next token.
pub const TOKEN_LIMIT: usize = 39;

/// S-expression reader over a byte stream with one byte of lookahead.
///
/// End of input is only noticed when another byte is actually needed, so a
/// final expression with no trailing newline still reads.
pub struct Reader<R: Read> {
    input: io::Bytes<R>,
    /// The lookahead byte. `None` once the input is exhausted.
    see: Option<u8>,
    token: Vec<u8>,
}

fn is_space(byte: u8) -> bool {
    (1..=b' ').contains(&byte)
}

fn is_paren(byte: u8) -> bool {
    matches!(byte, b'(' | b')')
}

impl<R: Read> Reader<R> {
    pub fn new(input: R) -> Self {
        Reader {
            input: input.bytes(),
            see: Some(b' '),
            token: Vec::with_capacity(TOKEN_LIMIT),
        }
    }

    /// Read one expression. Returns `None` at end of input.
    pub fn read(&mut self, m: &mut Machine) -> LispResult<Option<Value>> {
        match self.read_expr(m) {
            Ok(val) => Ok(Some(val)),
            Err(LispError::EndOfInput) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn read_expr(&mut self, m: &mut Machine) -> LispResult<Value> {
        self.scan()?;
        self.parse(m)
    }

    fn look(&mut self) -> LispResult<()> {
        self.see = match self.input.next() {
            Some(byte) => Some(byte?),
            None => None,
        };
        Ok(())
    }

    /// Scan the next token into `self.token`.
    fn scan(&mut self) -> LispResult<()> {
        self.token.clear();
        while matches!(self.see, Some(byte) if is_space(byte)) {
            self.look()?;
        }
        let Some(first) = self.see else {
            return Err(LispError::EndOfInput);
        };
        // a quote is only its own token when it starts one
        if is_paren(first) || first == b'\'' {
            self.token.push(first);
            return self.look();
        }
        while let Some(byte) = self.see {
            if self.token.len() >= TOKEN_LIMIT || is_space(byte) || is_paren(byte) {
                break;
            }
            self.token.push(byte);
            self.look()?;
        }
        Ok(())
    }

    /// Parse an expression starting with the current token.
    fn parse(&mut self, m: &mut Machine) -> LispResult<Value> {
        match self.token.as_slice() {
            b"(" => self.read_list(m),
            b"'" => self.read_quote(m),
            _ => self.read_atom(m),
        }
    }

    /// Read a list: (a b c) or (a . b) or (a b . c)
    fn read_list(&mut self, m: &mut Machine) -> LispResult<Value> {
        let mut elements = Vec::new();
        let mut tail = Value::NIL;
        loop {
            self.scan()?;
            match self.token.as_slice() {
                b")" => break,
                b"." => {
                    tail = self.read_expr(m)?;
                    // the closing paren
                    self.scan()?;
                    break;
                }
                _ => elements.push(self.parse(m)?),
            }
        }

        let mut result = tail;
        for &elem in elements.iter().rev() {
            result = m.arena.cons(elem, result)?;
        }
        Ok(result)
    }

    /// 'x => (quote x)
    fn read_quote(&mut self, m: &mut Machine) -> LispResult<Value> {
        let quoted = self.read_expr(m)?;
        let rest = m.arena.cons(quoted, Value::NIL)?;
        m.arena.cons(m.symbols.quote, rest)
    }

    /// A token that parses as a number in full is a number; anything else is
    /// a symbol, interned with its bytes as read.
    fn read_atom(&mut self, m: &mut Machine) -> LispResult<Value> {
        if let Some(n) = std::str::from_utf8(&self.token)
            .ok()
            .and_then(|text| text.parse::<f64>().ok())
        {
            return Ok(Value::number(n));
        }
        let id = m.arena.intern(&self.token)?;
        Ok(Value::symbol(id))
    }
}

/// Read the first expression of a string.
pub fn read_str(m: &mut Machine, src: &str) -> LispResult<Option<Value>> {
    Reader::new(src.as_bytes()).read(m)
}
