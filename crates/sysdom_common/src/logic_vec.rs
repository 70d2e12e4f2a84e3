//! Fixed-width vectors of [`Logic`] bits, packed two bits per value.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

const PER_WORD: u32 = 32;

/// A bus value: `width` four-valued bits, index 0 is the least significant.
///
/// The width is part of the value's identity. Signals carrying a `LogicVec`
/// reject writes of a different width.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    words: Vec<u64>,
}

impl LogicVec {
    /// A vector with every bit set to `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let pattern = (0..PER_WORD).fold(0u64, |acc, i| acc | ((value as u64) << (i * 2)));
        let mut v = Self {
            width,
            words: vec![pattern; width.div_ceil(PER_WORD) as usize],
        };
        // Padding past `width` stays zero so derived equality only sees real bits.
        let tail = width % PER_WORD;
        if let (Some(last), true) = (v.words.last_mut(), tail != 0) {
            *last &= (1u64 << (tail * 2)) - 1;
        }
        v
    }

    /// All bits `0`.
    pub fn zeros(width: u32) -> Self {
        Self::filled(width, Logic::Zero)
    }

    /// All bits `X`, the power-up state of memories and registers.
    pub fn unknown(width: u32) -> Self {
        Self::filled(width, Logic::X)
    }

    /// Number of bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Reads bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(index < self.width, "bit {index} outside width {}", self.width);
        let (word, shift) = locate(index);
        match (self.words[word] >> shift) & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }

    /// Writes bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(index < self.width, "bit {index} outside width {}", self.width);
        let (word, shift) = locate(index);
        self.words[word] = (self.words[word] & !(0b11 << shift)) | ((value as u64) << shift);
    }

    /// Iterates bits from index 0 upward.
    pub fn bits(&self) -> impl Iterator<Item = Logic> + '_ {
        (0..self.width).map(|i| self.get(i))
    }

    /// Encodes the low `width` bits of `value`.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::zeros(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 == 1 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Decodes to an integer; `None` if any bit is `X`/`Z` or the width exceeds 64.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        self.bits().enumerate().try_fold(0u64, |acc, (i, bit)| {
            bit.to_bool().map(|b| acc | (u64::from(b) << i))
        })
    }

    /// True when any bit is `X` or `Z`.
    pub fn has_unknown(&self) -> bool {
        self.bits().any(|b| !b.is_definite())
    }

    /// Parses an MSB-first string such as `"10XZ"`.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut v = Self::zeros(s.chars().count() as u32);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Bitwise `std_logic` resolution of two equally wide drivers.
    ///
    /// # Panics
    ///
    /// Panics if the widths differ.
    pub fn resolve(&self, other: &LogicVec) -> LogicVec {
        self.zip_with(other, "resolve", Logic::resolve)
    }

    fn zip_with(&self, other: &LogicVec, op: &str, f: impl Fn(Logic, Logic) -> Logic) -> LogicVec {
        assert_eq!(self.width, other.width, "width mismatch in {op}");
        let mut out = LogicVec::zeros(self.width);
        for i in 0..self.width {
            out.set(i, f(self.get(i), other.get(i)));
        }
        out
    }
}

fn locate(index: u32) -> (usize, u32) {
    ((index / PER_WORD) as usize, (index % PER_WORD) * 2)
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({}'b{self})", self.width)
    }
}

impl BitAnd for &LogicVec {
    type Output = LogicVec;

    fn bitand(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "and", |a, b| a & b)
    }
}

impl BitOr for &LogicVec {
    type Output = LogicVec;

    fn bitor(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "or", |a, b| a | b)
    }
}

impl BitXor for &LogicVec {
    type Output = LogicVec;

    fn bitxor(self, rhs: Self) -> LogicVec {
        self.zip_with(rhs, "xor", |a, b| a ^ b)
    }
}

impl Not for &LogicVec {
    type Output = LogicVec;

    fn not(self) -> LogicVec {
        let mut out = LogicVec::zeros(self.width);
        for (i, bit) in self.bits().enumerate() {
            out.set(i as u32, !bit);
        }
        out
    }
}

macro_rules! owned_binop {
    ($trait:ident, $method:ident) => {
        impl $trait for LogicVec {
            type Output = LogicVec;

            fn $method(self, rhs: Self) -> LogicVec {
                (&self).$method(&rhs)
            }
        }
    };
}

owned_binop!(BitAnd, bitand);
owned_binop!(BitOr, bitor);
owned_binop!(BitXor, bitxor);

impl Not for LogicVec {
    type Output = LogicVec;

    fn not(self) -> LogicVec {
        !&self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_vectors() {
        let v = LogicVec::unknown(40);
        assert_eq!(v.width(), 40);
        assert!(v.bits().all(|b| b == Logic::X));
        assert!(v.has_unknown());
        assert!(!LogicVec::zeros(3).has_unknown());
    }

    #[test]
    fn integer_conversion() {
        let v = LogicVec::from_u64(0b1011, 4);
        assert_eq!(v.to_string(), "1011");
        assert_eq!(v.to_u64(), Some(11));
        assert_eq!(LogicVec::from_u64(0xff, 4).to_u64(), Some(0xf));
        assert_eq!(LogicVec::zeros(65).to_u64(), None);
    }

    #[test]
    fn unknown_bits_block_decoding() {
        let v = LogicVec::from_binary_str("1X0").unwrap();
        assert_eq!(v.get(1), Logic::X);
        assert_eq!(v.to_u64(), None);
        assert!(LogicVec::from_binary_str("12").is_none());
    }

    #[test]
    fn set_crosses_word_boundary() {
        let mut v = LogicVec::zeros(70);
        v.set(33, Logic::Z);
        v.set(69, Logic::One);
        assert_eq!(v.get(33), Logic::Z);
        assert_eq!(v.get(69), Logic::One);
        assert_eq!(v.get(32), Logic::Zero);
    }

    #[test]
    fn filled_equals_bitwise_construction() {
        let mut v = LogicVec::zeros(3);
        for i in 0..3 {
            v.set(i, Logic::X);
        }
        assert_eq!(v, LogicVec::unknown(3));
    }

    #[test]
    fn resolve_bitwise() {
        let a = LogicVec::from_binary_str("ZZ10").unwrap();
        let b = LogicVec::from_binary_str("1Z00").unwrap();
        assert_eq!(a.resolve(&b).to_string(), "1ZX0");
    }

    #[test]
    fn bitwise_ops() {
        let a = LogicVec::from_u64(0b1100, 4);
        let b = LogicVec::from_u64(0b1010, 4);
        assert_eq!((&a & &b).to_u64(), Some(0b1000));
        assert_eq!((&a | &b).to_u64(), Some(0b1110));
        assert_eq!((&a ^ &b).to_u64(), Some(0b0110));
        assert_eq!((!&a).to_u64(), Some(0b0011));
        assert_eq!((a.clone() ^ b).to_u64(), Some(0b0110));
        assert_eq!((!a).to_u64(), Some(0b0011));
    }

    #[test]
    #[should_panic(expected = "width mismatch")]
    fn mismatched_widths_panic() {
        let _ = &LogicVec::zeros(2) & &LogicVec::zeros(3);
    }

    #[test]
    fn debug_shows_width() {
        assert_eq!(format!("{:?}", LogicVec::from_u64(2, 2)), "LogicVec(2'b10)");
    }
}
