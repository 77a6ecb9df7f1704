// engine/qpool/src/slot_mask.rs

/// Single-word bitmask of live pool slots. Length is in bits, at most 64.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SlotMask {
    word: u64,
    len_bits: u8,
}

impl SlotMask {
    pub const MAX_BITS: usize = u64::BITS as usize;

    /// Zeroed mask tracking `len_bits` slots.
    pub const fn with_len(len_bits: usize) -> Self {
        assert!(len_bits > 0 && len_bits <= Self::MAX_BITS, "slot mask holds 1..=64 bits");
        Self { word: 0, len_bits: len_bits as u8 }
    }

    #[inline]
    pub fn len_bits(&self) -> usize {
        self.len_bits as usize
    }
    #[inline]
    fn check(&self, i: usize) {
        assert!(i < self.len_bits(), "slot index {i} OOB");
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.word == 0
    }
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.word.count_ones() as usize
    }

    #[inline]
    pub fn set(&mut self, i: usize) {
        self.check(i);
        self.word |= 1u64 << i;
    }
    #[inline]
    pub fn clear(&mut self, i: usize) {
        self.check(i);
        self.word &= !(1u64 << i);
    }
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.check(i);
        ((self.word >> i) & 1) != 0
    }

    /// Lowest clear bit, if any slot is free.
    #[inline]
    pub fn first_zero(&self) -> Option<usize> {
        let idx = (!self.word).trailing_zeros() as usize;
        (idx < self.len_bits()).then_some(idx)
    }

    /// Bits set in either mask. Both must track the same number of slots.
    #[inline]
    pub fn union(self, other: SlotMask) -> SlotMask {
        debug_assert_eq!(self.len_bits, other.len_bits);
        SlotMask { word: self.word | other.word, len_bits: self.len_bits }
    }

    /// Iterate the indices of set bits, lowest first.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        let mut w = self.word;
        core::iter::from_fn(move || {
            if w == 0 {
                return None;
            }
            let i = w.trailing_zeros() as usize;
            w &= w - 1;
            Some(i)
        })
    }
}
