//! NaN-boxed values.
//!
//! Every value is one 64-bit word. Numbers are stored as the raw bits of an
//! `f64`. Everything else lives in the quiet-NaN space: the top 16 bits hold a
//! reserved tag and the low 32 bits hold an ordinal (an arena index, a symbol
//! heap offset, or a row in a side table).
//!
//! | Top 16 bits | Tag       | Ordinal                          |
//! |-------------|-----------|----------------------------------|
//! | 0x7FF8      | Symbol    | byte offset of the interned name |
//! | 0x7FF9      | Primitive | row in the primitive table       |
//! | 0x7FFA      | Pair      | arena index of the cdr slot      |
//! | 0x7FFB      | Closure   | arena index of the cdr slot      |
//! | 0x7FFC      | Nil       | unused                           |
//! | 0x7FFD      | Box       | row in the box table             |
//!
//! Two values are equal iff their bits are equal, so symbol equality and pair
//! identity are single integer compares.

use std::fmt;

const TAG_SHIFT: u32 = 48;
const ORDINAL_MASK: u64 = 0x0000_0000_FFFF_FFFF;

/// NaN produced by arithmetic is folded onto this pattern. Its top 16 bits
/// (0xFFF8) are outside the reserved range, so it stays a number.
const CANONICAL_NAN: u64 = 0xFFF8_0000_0000_0000;

/// Integers below this magnitude are exact in an `f64` and display without a
/// fractional part.
pub const EXACT_INTEGER_LIMIT: f64 = 1e16;

/// Byte offset of an interned symbol name in the arena heap region.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Arena index of a pair's cdr slot. The car lives in the slot above it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairId(pub u32);

/// Row in the machine's primitive table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimId(pub u32);

/// Row in the box side table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Number,
    Symbol,
    Primitive,
    Pair,
    Closure,
    Nil,
    Box,
}

/// The tags a [`Value`] can be boxed under: every [`Tag`] but `Number`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoxTag {
    Symbol,
    Primitive,
    Pair,
    Closure,
    Nil,
    Box,
}

impl BoxTag {
    /// The reserved top-16-bit pattern.
    const fn bits(self) -> u64 {
        match self {
            BoxTag::Symbol => 0x7FF8,
            BoxTag::Primitive => 0x7FF9,
            BoxTag::Pair => 0x7FFA,
            BoxTag::Closure => 0x7FFB,
            BoxTag::Nil => 0x7FFC,
            BoxTag::Box => 0x7FFD,
        }
    }
}

impl From<BoxTag> for Tag {
    fn from(tag: BoxTag) -> Tag {
        match tag {
            BoxTag::Symbol => Tag::Symbol,
            BoxTag::Primitive => Tag::Primitive,
            BoxTag::Pair => Tag::Pair,
            BoxTag::Closure => Tag::Closure,
            BoxTag::Nil => Tag::Nil,
            BoxTag::Box => Tag::Box,
        }
    }
}

impl Tag {
    const fn from_bits(top: u64) -> Tag {
        match top {
            0x7FF8 => Tag::Symbol,
            0x7FF9 => Tag::Primitive,
            0x7FFA => Tag::Pair,
            0x7FFB => Tag::Closure,
            0x7FFC => Tag::Nil,
            0x7FFD => Tag::Box,
            _ => Tag::Number,
        }
    }
}

/// A pattern-matchable view of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Kind {
    Number(f64),
    Symbol(SymbolId),
    Primitive(PrimId),
    Pair(PairId),
    Closure(PairId),
    Nil,
    Box(BoxId),
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Value {
    bits: u64,
}

impl Value {
    /// The empty list.
    pub const NIL: Value = Value::boxed(BoxTag::Nil, 0);

    /// Box an ordinal under one of the reserved tags.
    ///
    /// Callers are responsible for keeping the ordinal inside the addressable
    /// range; the arena refuses capacities whose indices would not fit.
    #[inline]
    pub const fn boxed(tag: BoxTag, ordinal: u32) -> Value {
        Value {
            bits: (tag.bits() << TAG_SHIFT) | ordinal as u64,
        }
    }

    /// Wrap a float. NaNs are canonicalized so they never alias a boxed tag.
    #[inline]
    pub fn number(n: f64) -> Value {
        if n.is_nan() {
            Value {
                bits: CANONICAL_NAN,
            }
        } else {
            Value { bits: n.to_bits() }
        }
    }

    #[inline]
    pub const fn symbol(id: SymbolId) -> Value {
        Value::boxed(BoxTag::Symbol, id.0)
    }

    #[inline]
    pub const fn pair(id: PairId) -> Value {
        Value::boxed(BoxTag::Pair, id.0)
    }

    #[inline]
    pub const fn closure(id: PairId) -> Value {
        Value::boxed(BoxTag::Closure, id.0)
    }

    #[inline]
    pub const fn primitive(id: PrimId) -> Value {
        Value::boxed(BoxTag::Primitive, id.0)
    }

    #[inline]
    pub const fn box_ref(id: BoxId) -> Value {
        Value::boxed(BoxTag::Box, id.0)
    }

    /// Raw word, used by the arena to pack symbol-name bytes into slots.
    #[inline]
    pub const fn from_bits(bits: u64) -> Value {
        Value { bits }
    }

    #[inline]
    pub const fn bits(self) -> u64 {
        self.bits
    }

    #[inline]
    pub const fn tag(self) -> Tag {
        Tag::from_bits(self.bits >> TAG_SHIFT)
    }

    /// The 32-bit ordinal with the tag stripped. Meaningless for numbers.
    #[inline]
    pub const fn ordinal(self) -> u32 {
        (self.bits & ORDINAL_MASK) as u32
    }

    pub fn kind(self) -> Kind {
        let ord = self.ordinal();
        match self.tag() {
            Tag::Number => Kind::Number(f64::from_bits(self.bits)),
            Tag::Symbol => Kind::Symbol(SymbolId(ord)),
            Tag::Primitive => Kind::Primitive(PrimId(ord)),
            Tag::Pair => Kind::Pair(PairId(ord)),
            Tag::Closure => Kind::Closure(PairId(ord)),
            Tag::Nil => Kind::Nil,
            Tag::Box => Kind::Box(BoxId(ord)),
        }
    }

    pub fn is_nil(self) -> bool {
        self.tag() == Tag::Nil
    }

    pub fn is_number(self) -> bool {
        self.tag() == Tag::Number
    }

    pub fn is_pair(self) -> bool {
        self.tag() == Tag::Pair
    }

    pub fn as_number(self) -> Option<f64> {
        match self.tag() {
            Tag::Number => Some(f64::from_bits(self.bits)),
            _ => None,
        }
    }

    pub fn as_pair(self) -> Option<PairId> {
        match self.tag() {
            Tag::Pair => Some(PairId(self.ordinal())),
            _ => None,
        }
    }

    pub fn as_symbol(self) -> Option<SymbolId> {
        match self.tag() {
            Tag::Symbol => Some(SymbolId(self.ordinal())),
            _ => None,
        }
    }

    pub fn as_box(self) -> Option<BoxId> {
        match self.tag() {
            Tag::Box => Some(BoxId(self.ordinal())),
            _ => None,
        }
    }

    /// Pairs and closures both own an arena cell that car/cdr can read.
    pub fn as_cell(self) -> Option<PairId> {
        match self.tag() {
            Tag::Pair | Tag::Closure => Some(PairId(self.ordinal())),
            _ => None,
        }
    }
}

/// Exact integer form of `n` when it is integral and small enough to be
/// represented without loss.
pub fn exact_integer(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n.abs() < EXACT_INTEGER_LIMIT {
        Some(n as i64)
    } else {
        None
    }
}

/// Truncate toward zero inside the exact range, leave larger magnitudes alone.
pub fn truncate(n: f64) -> f64 {
    if n.abs() < EXACT_INTEGER_LIMIT {
        n.trunc()
    } else {
        n
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Kind::Number(n) => write!(f, "Num({})", n),
            Kind::Symbol(id) => write!(f, "Sym({})", id.0),
            Kind::Primitive(id) => write!(f, "Prim({})", id.0),
            Kind::Pair(id) => write!(f, "Pair({})", id.0),
            Kind::Closure(id) => write!(f, "Clo({})", id.0),
            Kind::Nil => write!(f, "Nil"),
            Kind::Box(id) => write!(f, "Box({})", id.0),
        }
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

impl fmt::Debug for PairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairId({})", self.0)
    }
}

impl fmt::Debug for PrimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrimId({})", self.0)
    }
}

impl fmt::Debug for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxId({})", self.0)
    }
}
