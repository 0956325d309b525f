use crate::error::{LispError, LispResult};
use crate::value::{PairId, Value};

/// Bytes per arena slot. Symbol names are packed this many to a slot.
pub const SLOT_BYTES: usize = 8;

/// The one fixed-capacity arena.
///
/// The bottom of `slots` is the symbol heap: NUL-terminated names packed
/// byte by byte, growing upward from `hp` (a byte index). The top is the pair
/// stack, growing downward from `sp` (a slot index). Each pair takes two
/// slots: the cdr at `sp` and the car at `sp + 1`, and the pair's ordinal is
/// the cdr slot. `hp <= sp * SLOT_BYTES` holds after every allocation.
pub struct Arena {
    slots: Box<[Value]>,
    hp: usize,
    sp: usize,
}

impl Arena {
    /// Create an arena of `capacity` slots.
    ///
    /// Every heap byte index has to fit a 32-bit ordinal, which bounds the
    /// capacity from above.
    pub fn new(capacity: usize) -> LispResult<Self> {
        if capacity == 0 || capacity > max_capacity() {
            return Err(LispError::Config(format!(
                "arena capacity must be between 1 and {} slots, got {}",
                max_capacity(),
                capacity
            )));
        }
        Ok(Arena {
            slots: vec![Value::NIL; capacity].into_boxed_slice(),
            hp: 0,
            sp: capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Heap pointer: first free byte of the symbol heap.
    pub fn hp(&self) -> usize {
        self.hp
    }

    /// Stack pointer: lowest slot in use by the pair stack.
    pub fn sp(&self) -> usize {
        self.sp
    }

    /// Slots not claimed by either region.
    pub fn free_slots(&self) -> usize {
        self.sp - self.hp / SLOT_BYTES
    }

    /// Allocate a pair cell. Fails when the stack would dip into the heap.
    pub fn alloc(&mut self, car: Value, cdr: Value) -> LispResult<PairId> {
        let sp = match self.sp.checked_sub(2) {
            Some(sp) if self.hp <= sp * SLOT_BYTES => sp,
            _ => return Err(self.exhausted()),
        };
        self.sp = sp;
        self.slots[sp + 1] = car;
        self.slots[sp] = cdr;
        Ok(PairId(sp as u32))
    }

    /// Allocate a pair and return it as a value.
    pub fn cons(&mut self, car: Value, cdr: Value) -> LispResult<Value> {
        self.alloc(car, cdr).map(Value::pair)
    }

    #[inline]
    pub fn car(&self, id: PairId) -> Value {
        self.slots[id.0 as usize + 1]
    }

    #[inline]
    pub fn cdr(&self, id: PairId) -> Value {
        self.slots[id.0 as usize]
    }

    /// Car of a pair or closure cell, `None` for anything else.
    pub fn car_of(&self, val: Value) -> Option<Value> {
        val.as_cell().map(|id| self.car(id))
    }

    /// Cdr of a pair or closure cell, `None` for anything else.
    pub fn cdr_of(&self, val: Value) -> Option<Value> {
        val.as_cell().map(|id| self.cdr(id))
    }

    /// Build a proper list from a slice of values, last element first.
    pub fn list(&mut self, values: &[Value]) -> LispResult<Value> {
        let mut result = Value::NIL;
        for &val in values.iter().rev() {
            result = self.cons(val, result)?;
        }
        Ok(result)
    }

    /// Bulk rewind of the pair stack. Everything below `sp` is discarded.
    pub fn rewind(&mut self, sp: usize) {
        debug_assert!(sp <= self.slots.len());
        debug_assert!(self.hp <= sp * SLOT_BYTES);
        self.sp = sp;
    }

    // === Symbol heap bytes ===

    pub(crate) fn heap_byte(&self, at: usize) -> u8 {
        let word = self.slots[at / SLOT_BYTES].bits().to_le_bytes();
        word[at % SLOT_BYTES]
    }

    fn set_heap_byte(&mut self, at: usize, byte: u8) {
        let slot = &mut self.slots[at / SLOT_BYTES];
        let mut word = slot.bits().to_le_bytes();
        word[at % SLOT_BYTES] = byte;
        *slot = Value::from_bits(u64::from_le_bytes(word));
    }

    /// Append a NUL-terminated name to the heap and return its byte offset.
    pub(crate) fn push_name(&mut self, name: &[u8]) -> LispResult<usize> {
        let at = self.hp;
        let end = at + name.len() + 1;
        if end > self.sp * SLOT_BYTES {
            return Err(self.exhausted());
        }
        for (i, &byte) in name.iter().enumerate() {
            self.set_heap_byte(at + i, byte);
        }
        self.set_heap_byte(at + name.len(), 0);
        self.hp = end;
        Ok(at)
    }

    fn exhausted(&self) -> LispError {
        log::error!(
            "arena exhausted: hp={} sp={} capacity={}",
            self.hp,
            self.sp,
            self.slots.len()
        );
        LispError::ArenaExhausted {
            hp: self.hp,
            sp: self.sp,
        }
    }
}

/// Largest capacity whose heap byte indices all fit in a `u32` ordinal.
pub const fn max_capacity() -> usize {
    u32::MAX as usize / SLOT_BYTES
}
