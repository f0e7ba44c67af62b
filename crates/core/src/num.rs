//! Numbers over bitstrings
//!
//! Naturals are MSB-first bitstrings with no leading zeros (0 is unit).
//! Signed integers reuse the natural encoding for non-negatives and flip
//! every bit for negatives: `-1` is `0`, `-7` is `000`. A non-empty
//! bitstring starting with 1 is therefore non-negative, starting with 0
//! negative.
//!
//! Arithmetic preserves operand widths: `add` and `mul` return a low word
//! the width of the first operand and a carry/overflow word the width of
//! the second, such that `carry ++ low` is the exact result. This keeps the
//! operations total and makes them commute under joins. `sub` fails on
//! negative differences and yields the canonical natural; `div` fails on a
//! zero divisor.

use crate::bits::Bits;
use crate::value::Value;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

impl Value {
    /// Canonical natural: MSB-first, no leading zeros.
    pub fn of_nat(n: u64) -> Value {
        Value::of_bits(&Bits::from_u64(n))
    }

    pub fn of_int(n: i64) -> Value {
        if n >= 0 {
            Value::of_nat(n as u64)
        } else {
            Value::of_bits(&Bits::from_u64(n.unsigned_abs()).not())
        }
    }

    /// Machine natural; requires the canonical encoding.
    pub fn to_nat64(&self) -> Option<u64> {
        let bits = self.to_bits()?;
        if bits.has_leading_zero() {
            return None;
        }
        bits.to_u64()
    }

    pub fn to_int64(&self) -> Option<i64> {
        let bits = self.to_bits()?;
        if bits.is_empty() {
            return Some(0);
        }
        if bits.get(0) {
            let n = bits.to_u64()?;
            (n <= i64::MAX as u64).then_some(n as i64)
        } else {
            let mag = bits.not().to_u64()?;
            if mag == 1 << 63 {
                Some(i64::MIN)
            } else if mag <= i64::MAX as u64 {
                Some(-(mag as i64))
            } else {
                None
            }
        }
    }

    pub fn of_biguint(n: &BigUint) -> Value {
        Value::of_bits(&Bits::from_biguint(n, n.bits() as usize))
    }

    pub fn to_biguint(&self) -> Option<BigUint> {
        let bits = self.to_bits()?;
        if bits.has_leading_zero() {
            return None;
        }
        Some(bits.to_biguint())
    }

    pub fn of_bigint(n: &BigInt) -> Value {
        match n.sign() {
            Sign::NoSign | Sign::Plus => Value::of_biguint(n.magnitude()),
            Sign::Minus => {
                let mag = n.magnitude();
                Value::of_bits(&Bits::from_biguint(mag, mag.bits() as usize).not())
            }
        }
    }

    pub fn to_bigint(&self) -> Option<BigInt> {
        let bits = self.to_bits()?;
        if bits.is_empty() {
            return Some(BigInt::zero());
        }
        if bits.get(0) {
            Some(BigInt::from(bits.to_biguint()))
        } else {
            Some(-BigInt::from(bits.not().to_biguint()))
        }
    }
}

/// `( a b -- sum carry )` with `len(sum) = len(a)`, `len(carry) = len(b)`;
/// `carry ++ sum` is the exact sum, which always fits.
pub fn add(a: &Value, b: &Value) -> Option<(Value, Value)> {
    let (ba, bb) = (a.to_bits()?, b.to_bits()?);
    let total = ba.to_biguint() + bb.to_biguint();
    let joined = Bits::from_biguint(&total, ba.len() + bb.len());
    let (carry, sum) = joined.split_at(bb.len());
    Some((Value::of_bits(&sum), Value::of_bits(&carry)))
}

/// `( a b -- prod overflow )`, widths as for `add`.
pub fn mul(a: &Value, b: &Value) -> Option<(Value, Value)> {
    let (ba, bb) = (a.to_bits()?, b.to_bits()?);
    let total = ba.to_biguint() * bb.to_biguint();
    let joined = Bits::from_biguint(&total, ba.len() + bb.len());
    let (overflow, prod) = joined.split_at(bb.len());
    Some((Value::of_bits(&prod), Value::of_bits(&overflow)))
}

/// `( a b -- a-b )`; fails when the difference is negative. The result is
/// the canonical natural.
pub fn sub(a: &Value, b: &Value) -> Option<Value> {
    let (ba, bb) = (a.to_bits()?, b.to_bits()?);
    let (va, vb) = (ba.to_biguint(), bb.to_biguint());
    if va < vb {
        return None;
    }
    let d = va - vb;
    let width = d.bits() as usize;
    Some(Value::of_bits(&Bits::from_biguint(&d, width)))
}

/// `( a b -- q r )` with `len(q) = len(a)`, `len(r) = len(b)`; fails when
/// the divisor is zero.
pub fn divmod(a: &Value, b: &Value) -> Option<(Value, Value)> {
    let (ba, bb) = (a.to_bits()?, b.to_bits()?);
    let (va, vb) = (ba.to_biguint(), bb.to_biguint());
    if vb.is_zero() {
        return None;
    }
    let q = &va / &vb;
    let r = va % vb;
    Some((
        Value::of_bits(&Bits::from_biguint(&q, ba.len())),
        Value::of_bits(&Bits::from_biguint(&r, bb.len())),
    ))
}
