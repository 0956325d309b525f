use crate::error::{Fault, LispResult};
use crate::heap::Arena;
use crate::value::{SymbolId, Value};

/// Interning over the heap region of the arena.
///
/// Names are stored once, NUL-terminated, in insertion order. A symbol's id is
/// the byte offset of its name, so equal names always box to equal values.
impl Arena {
    /// Intern a symbol name, returning the existing symbol when present.
    ///
    /// Names are raw bytes and need not be UTF-8. A name containing NUL is cut
    /// at the first NUL.
    pub fn intern(&mut self, name: impl AsRef<[u8]>) -> LispResult<SymbolId> {
        let bytes = name.as_ref();
        let bytes = match bytes.iter().position(|&b| b == 0) {
            Some(end) => &bytes[..end],
            None => bytes,
        };
        if let Some(id) = self.find_bytes(bytes) {
            return Ok(id);
        }
        let at = self.push_name(bytes)?;
        Ok(SymbolId(at as u32))
    }

    /// Look up a symbol without interning it.
    pub fn find_symbol(&self, name: impl AsRef<[u8]>) -> Option<SymbolId> {
        self.find_bytes(name.as_ref())
    }

    /// The name of an interned symbol, lossily decoded for display.
    pub fn symbol_name(&self, id: SymbolId) -> String {
        let start = id.0 as usize;
        let len = self.name_len(start);
        let bytes: Vec<u8> = (start..start + len).map(|i| self.heap_byte(i)).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Number of interned symbols.
    pub fn symbol_count(&self) -> usize {
        let mut count = 0;
        let mut at = 0;
        while at < self.hp() {
            at += self.name_len(at) + 1;
            count += 1;
        }
        count
    }

    fn find_bytes(&self, name: &[u8]) -> Option<SymbolId> {
        let mut at = 0;
        while at < self.hp() {
            if self.name_matches(at, name) {
                return Some(SymbolId(at as u32));
            }
            at += self.name_len(at) + 1;
        }
        None
    }

    fn name_matches(&self, at: usize, name: &[u8]) -> bool {
        for (i, &byte) in name.iter().enumerate() {
            if self.heap_byte(at + i) != byte {
                return false;
            }
        }
        self.heap_byte(at + name.len()) == 0
    }

    fn name_len(&self, at: usize) -> usize {
        let mut len = 0;
        while self.heap_byte(at + len) != 0 {
            len += 1;
        }
        len
    }
}

/// Symbols the evaluator and reader need without a lookup.
/// Interned once when the machine is built, so using them never allocates.
pub struct WellKnown {
    pub quote: Value,
    /// `#t`, the canonical true value.
    pub truth: Value,
    faults: [Value; Fault::COUNT],
}

impl WellKnown {
    pub fn intern(arena: &mut Arena) -> LispResult<Self> {
        let mut faults = [Value::NIL; Fault::COUNT];
        for (slot, fault) in faults.iter_mut().zip(Fault::ALL) {
            *slot = Value::symbol(arena.intern(fault.symbol_name())?);
        }
        let quote = Value::symbol(arena.intern("quote")?);
        let truth = Value::symbol(arena.intern("#t")?);
        Ok(WellKnown {
            quote,
            truth,
            faults,
        })
    }

    pub fn fault(&self, fault: Fault) -> Value {
        self.faults[fault as usize]
    }

    pub fn is_fault(&self, val: Value) -> bool {
        self.faults.contains(&val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    #[test]
    fn test_intern_dedupes() {
        let mut arena = Arena::new(64).unwrap();
        let a = arena.intern("lambda").unwrap();
        let b = arena.intern("define").unwrap();
        let c = arena.intern("lambda").unwrap();
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(a, SymbolId(0));
        assert_eq!(b, SymbolId(7));
        assert_eq!(arena.symbol_count(), 2);
    }

    #[test]
    fn test_prefix_is_not_a_match() {
        let mut arena = Arena::new(64).unwrap();
        let long = arena.intern("car-safe").unwrap();
        let short = arena.intern("car").unwrap();
        assert_ne!(long, short);
        assert_eq!(arena.symbol_name(short), "car");
        assert_eq!(arena.symbol_name(long), "car-safe");
    }

    #[test]
    fn test_find_does_not_intern() {
        let mut arena = Arena::new(64).unwrap();
        assert_eq!(arena.find_symbol("x"), None);
        let x = arena.intern("x").unwrap();
        assert_eq!(arena.find_symbol("x"), Some(x));
        assert_eq!(arena.hp(), 2);
    }

    #[test]
    fn test_nul_cuts_the_name() {
        let mut arena = Arena::new(64).unwrap();
        let a = arena.intern("ab\0cd").unwrap();
        let b = arena.intern("ab").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_raw_byte_names_are_distinct() {
        let mut arena = Arena::new(64).unwrap();
        let ff = arena.intern(b"x\xff").unwrap();
        let fe = arena.intern(b"x\xfe").unwrap();
        assert_ne!(ff, fe);
        assert_eq!(arena.intern(b"x\xff").unwrap(), ff);
        assert_eq!(arena.find_symbol(b"x\xfe"), Some(fe));
        assert_eq!(arena.symbol_count(), 2);
    }

    #[test]
    fn test_random_names_intern_consistently() {
        let mut rng = rand::thread_rng();
        let mut arena = Arena::new(4096).unwrap();
        let names: Vec<String> = (0..100)
            .map(|_| {
                let len = rng.gen_range(1..12);
                (&mut rng)
                    .sample_iter(&Alphanumeric)
                    .take(len)
                    .map(char::from)
                    .collect()
            })
            .collect();
        let first: Vec<SymbolId> = names.iter().map(|n| arena.intern(n).unwrap()).collect();
        let second: Vec<SymbolId> = names.iter().map(|n| arena.intern(n).unwrap()).collect();
        assert_eq!(first, second);
        for (i, a) in names.iter().enumerate() {
            for (j, b) in names.iter().enumerate() {
                assert_eq!(a == b, first[i] == first[j]);
            }
            assert_eq!(&arena.symbol_name(first[i]), a);
        }
    }

    #[test]
    fn test_well_known_faults_are_distinct() {
        let mut arena = Arena::new(256).unwrap();
        let known = WellKnown::intern(&mut arena).unwrap();
        for (i, &a) in Fault::ALL.iter().enumerate() {
            assert!(known.is_fault(known.fault(a)));
            for &b in &Fault::ALL[i + 1..] {
                assert_ne!(known.fault(a), known.fault(b));
            }
        }
        assert!(!known.is_fault(known.truth));
        let name = arena.symbol_name(known.fault(Fault::Unbound).as_symbol().unwrap());
        assert_eq!(name, "ERR-unbound");
    }
}
