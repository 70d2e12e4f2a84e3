//! Four-valued logic (`0`, `1`, `X`, `Z`) as carried by single-bit signals.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};

/// A single bit of four-valued logic, the subset of IEEE 1164 `std_logic`
/// the kernel models.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Logic {
    /// Driven low.
    Zero = 0,
    /// Driven high.
    One = 1,
    /// Unknown. Also the value of a conflicting or corrupted cell.
    #[default]
    X = 2,
    /// Not driven (high impedance).
    Z = 3,
}

impl Logic {
    /// Parses one of `0`, `1`, `x`/`X`, `z`/`Z`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' => Some(Logic::Z),
            _ => None,
        }
    }

    /// Maps `false`/`true` to `0`/`1`.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Returns the boolean meaning of a definite value, `None` for `X` and `Z`.
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Logic::Zero => Some(false),
            Logic::One => Some(true),
            Logic::X | Logic::Z => None,
        }
    }

    /// Returns true for `0` and `1`.
    pub fn is_definite(self) -> bool {
        matches!(self, Logic::Zero | Logic::One)
    }

    /// Two-driver resolution following the `std_logic` resolution table.
    ///
    /// ```text
    ///     0  1  X  Z
    /// 0 | 0  X  X  0
    /// 1 | X  1  X  1
    /// X | X  X  X  X
    /// Z | 0  1  X  Z
    /// ```
    pub fn resolve(self, other: Logic) -> Logic {
        use Logic::*;
        match (self, other) {
            (Z, v) | (v, Z) => v,
            (Zero, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

impl From<bool> for Logic {
    fn from(value: bool) -> Self {
        Logic::from_bool(value)
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'X',
            Logic::Z => 'Z',
        };
        write!(f, "{c}")
    }
}

/// `0` dominates; `1 & 1 = 1`; everything else is `X`.
impl BitAnd for Logic {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (Zero, _) | (_, Zero) => Zero,
            (One, One) => One,
            _ => X,
        }
    }
}

/// `1` dominates; `0 | 0 = 0`; everything else is `X`.
impl BitOr for Logic {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        use Logic::*;
        match (self, rhs) {
            (One, _) | (_, One) => One,
            (Zero, Zero) => Zero,
            _ => X,
        }
    }
}

impl BitXor for Logic {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        match (self.to_bool(), rhs.to_bool()) {
            (Some(a), Some(b)) => Logic::from_bool(a != b),
            _ => Logic::X,
        }
    }
}

impl Not for Logic {
    type Output = Self;

    fn not(self) -> Self {
        match self.to_bool() {
            Some(b) => Logic::from_bool(!b),
            None => Logic::X,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Logic::*;
    use super::*;

    const ALL: [Logic; 4] = [Zero, One, X, Z];

    #[test]
    fn resolution_table() {
        assert_eq!(Zero.resolve(Zero), Zero);
        assert_eq!(Zero.resolve(One), X);
        assert_eq!(One.resolve(One), One);
        assert_eq!(Z.resolve(One), One);
        assert_eq!(Zero.resolve(Z), Zero);
        assert_eq!(Z.resolve(Z), Z);
        assert_eq!(X.resolve(Z), X);
        for v in ALL {
            assert_eq!(X.resolve(v), X);
        }
    }

    #[test]
    fn resolution_is_commutative_and_associative() {
        for a in ALL {
            for b in ALL {
                assert_eq!(a.resolve(b), b.resolve(a));
                for c in ALL {
                    assert_eq!(a.resolve(b).resolve(c), a.resolve(b.resolve(c)));
                }
            }
        }
    }

    #[test]
    fn and_or_dominance() {
        for v in ALL {
            assert_eq!(Zero & v, Zero);
            assert_eq!(One | v, One);
        }
        assert_eq!(One & One, One);
        assert_eq!(One & Z, X);
        assert_eq!(Zero | Zero, Zero);
        assert_eq!(Zero | X, X);
    }

    #[test]
    fn xor_and_not() {
        assert_eq!(Zero ^ One, One);
        assert_eq!(One ^ One, Zero);
        assert_eq!(Z ^ One, X);
        assert_eq!(!Zero, One);
        assert_eq!(!Z, X);
    }

    #[test]
    fn bool_conversions() {
        assert_eq!(Logic::from(true), One);
        assert_eq!(Zero.to_bool(), Some(false));
        assert_eq!(X.to_bool(), None);
        assert!(One.is_definite());
        assert!(!Z.is_definite());
    }

    #[test]
    fn char_and_display() {
        for v in ALL {
            let c = v.to_string().chars().next().unwrap();
            assert_eq!(Logic::from_char(c), Some(v));
        }
        assert_eq!(Logic::from_char('q'), None);
        assert_eq!(Logic::default(), X);
    }
}
