use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A number in the mixed-precision tower. Results always take the smallest
/// representation that fits: i32 if possible, otherwise a bignum, and a float
/// as soon as either operand is one.
#[derive(Debug, Clone, PartialEq)]
pub enum Num {
    Int(i32),
    Big(BigInt),
    Float(f64),
}

impl Num {
    /// Parse a numeric token: bounded int first, then bignum, then float.
    /// Returns None if the text is not a number at all.
    pub fn parse(text: &str) -> Option<Num> {
        if let Ok(i) = text.parse::<i32>() {
            return Some(Num::Int(i));
        }
        if let Ok(b) = text.parse::<BigInt>() {
            return Some(Num::Big(b));
        }
        if let Ok(f) = text.parse::<f64>() {
            return Some(Num::Float(f));
        }
        None
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Num::Float(_))
    }

    pub fn add(&self, other: &Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Num::from_i64(*a as i64 + *b as i64),
            _ if self.is_float() || other.is_float() => {
                Num::Float(self.to_f64() + other.to_f64())
            }
            _ => Num::from_big(self.to_big() + other.to_big()),
        }
    }

    pub fn sub(&self, other: &Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Num::from_i64(*a as i64 - *b as i64),
            _ if self.is_float() || other.is_float() => {
                Num::Float(self.to_f64() - other.to_f64())
            }
            _ => Num::from_big(self.to_big() - other.to_big()),
        }
    }

    pub fn mul(&self, other: &Num) -> Num {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => Num::from_i64(*a as i64 * *b as i64),
            _ if self.is_float() || other.is_float() => {
                Num::Float(self.to_f64() * other.to_f64())
            }
            _ => Num::from_big(self.to_big() * other.to_big()),
        }
    }

    /// Ordering with the same promotion rules as arithmetic. Mixing a float
    /// with an exact integer compares by converting the integer to float.
    pub fn compare(&self, other: &Num) -> Ordering {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => a.cmp(b),
            _ if self.is_float() || other.is_float() => {
                self.to_f64().total_cmp(&other.to_f64())
            }
            _ => self.to_big().cmp(&other.to_big()),
        }
    }

    /// Narrow an i64 intermediate back into the tower.
    fn from_i64(v: i64) -> Num {
        match i32::try_from(v) {
            Ok(i) => Num::Int(i),
            Err(_) => Num::Big(BigInt::from(v)),
        }
    }

    /// Narrow a bignum result back into the tower.
    fn from_big(b: BigInt) -> Num {
        match b.to_i32() {
            Some(i) => Num::Int(i),
            None => Num::Big(b),
        }
    }

    fn to_big(&self) -> BigInt {
        match self {
            Num::Int(i) => BigInt::from(*i),
            Num::Big(b) => b.clone(),
            Num::Float(f) => BigInt::from(*f as i64),
        }
    }

    fn to_f64(&self) -> f64 {
        match self {
            Num::Int(i) => *i as f64,
            Num::Big(b) => b.to_f64().unwrap_or(f64::INFINITY),
            Num::Float(f) => *f,
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Num::Int(i) => write!(f, "{}", i),
            Num::Big(b) => write!(f, "{}", b),
            Num::Float(x) => {
                // An integral float keeps its point so it reads back as a float.
                if x.is_finite() && *x == x.trunc() {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
        }
    }
}
