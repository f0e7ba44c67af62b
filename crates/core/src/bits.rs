//! Growable bit sequences
//!
//! `Bits` is the working form for bitstring contents: record keys, symbol
//! labels, and the operands of bitstring arithmetic. Bits are stored
//! MSB-first in `u64` words; unused tail bits are kept zero so that derived
//! equality and hashing see a canonical form.
//!
//! Conversions to and from `num_bigint::BigUint` back the width-preserving
//! arithmetic in `num`.

use num_bigint::BigUint;
use num_traits::Zero;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bits {
    len: usize,
    words: Vec<u64>,
}

impl Bits {
    pub fn new() -> Self {
        Bits::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at position `i` (0 = front).
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len);
        (self.words[i / 64] >> (63 - (i % 64))) & 1 == 1
    }

    /// Append one bit.
    pub fn push(&mut self, bit: bool) {
        if self.len % 64 == 0 {
            self.words.push(0);
        }
        if bit {
            let i = self.len;
            self.words[i / 64] |= 1 << (63 - (i % 64));
        }
        self.len += 1;
    }

    /// Append the data bits of a packed stem word (see `stem`).
    pub fn push_stem(&mut self, s: u64) {
        let n = crate::stem::len(s);
        for i in 0..n {
            self.push(crate::stem::bit_at(s, i) == 1);
        }
    }

    /// Append a whole byte, MSB first.
    pub fn push_byte(&mut self, b: u8) {
        for i in (0..8).rev() {
            self.push((b >> i) & 1 == 1);
        }
    }

    pub fn extend(&mut self, other: &Bits) {
        for i in 0..other.len {
            self.push(other.get(i));
        }
    }

    /// Bits in `[start, end)` as a new sequence.
    pub fn slice(&self, start: usize, end: usize) -> Bits {
        debug_assert!(start <= end && end <= self.len);
        let mut out = Bits::new();
        for i in start..end {
            out.push(self.get(i));
        }
        out
    }

    pub fn split_at(&self, n: usize) -> (Bits, Bits) {
        (self.slice(0, n), self.slice(n, self.len))
    }

    pub fn concat(a: &Bits, b: &Bits) -> Bits {
        let mut out = a.clone();
        out.extend(b);
        out
    }

    /// Longest common prefix of `other` against `self` starting at `offset`.
    pub fn common_prefix_from(&self, offset: usize, other: &Bits) -> usize {
        let limit = other.len.min(self.len - offset);
        let mut n = 0;
        while n < limit && self.get(offset + n) == other.get(n) {
            n += 1;
        }
        n
    }

    /// Lexicographic order: first differing bit decides (0 < 1), a proper
    /// prefix sorts before its extensions.
    pub fn lex_cmp(&self, other: &Bits) -> std::cmp::Ordering {
        let limit = self.len.min(other.len);
        for i in 0..limit {
            match (self.get(i), other.get(i)) {
                (false, true) => return std::cmp::Ordering::Less,
                (true, false) => return std::cmp::Ordering::Greater,
                _ => {}
            }
        }
        self.len.cmp(&other.len)
    }

    /// Bitwise complement.
    pub fn not(&self) -> Bits {
        let mut out = Bits {
            len: self.len,
            words: self.words.iter().map(|w| !w).collect(),
        };
        out.mask_tail();
        out
    }

    /// Pairwise or; `None` on length mismatch.
    pub fn or(&self, other: &Bits) -> Option<Bits> {
        self.zip_words(other, |a, b| a | b)
    }

    /// Pairwise and; `None` on length mismatch.
    pub fn and(&self, other: &Bits) -> Option<Bits> {
        self.zip_words(other, |a, b| a & b)
    }

    /// Pairwise equivalence (xnor); `None` on length mismatch.
    pub fn xnor(&self, other: &Bits) -> Option<Bits> {
        self.zip_words(other, |a, b| !(a ^ b))
    }

    fn zip_words(&self, other: &Bits, f: impl Fn(u64, u64) -> u64) -> Option<Bits> {
        if self.len != other.len {
            return None;
        }
        let mut out = Bits {
            len: self.len,
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        };
        out.mask_tail();
        Some(out)
    }

    /// Reverse bit order.
    pub fn reverse(&self) -> Bits {
        let mut out = Bits::new();
        for i in (0..self.len).rev() {
            out.push(self.get(i));
        }
        out
    }

    /// True when the sequence starts with a zero bit (a non-canonical
    /// natural number encoding).
    pub fn has_leading_zero(&self) -> bool {
        self.len > 0 && !self.get(0)
    }

    fn mask_tail(&mut self) {
        let tail = self.len % 64;
        if tail != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= !0u64 << (64 - tail);
            }
        }
        self.words.truncate(self.len.div_ceil(64));
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.get(i))
    }

    // ---- numeric bridge ----

    /// Canonical (leading-zero-free) encoding of a machine natural.
    pub fn from_u64(n: u64) -> Bits {
        let width = (64 - n.leading_zeros()) as usize;
        let mut out = Bits::new();
        for i in (0..width).rev() {
            out.push((n >> i) & 1 == 1);
        }
        out
    }

    /// Numeric value, if it fits a machine word. Leading zeros are allowed.
    pub fn to_u64(&self) -> Option<u64> {
        let mut acc: u64 = 0;
        for i in 0..self.len {
            if self.get(i) {
                if i + 64 < self.len {
                    return None; // a set bit above the low 64
                }
                acc |= 1 << (self.len - 1 - i);
            }
        }
        Some(acc)
    }

    pub fn to_biguint(&self) -> BigUint {
        let mut acc = BigUint::zero();
        let mut consumed = 0usize;
        for w in &self.words {
            let take = 64.min(self.len - consumed);
            acc = (acc << take) | BigUint::from(w >> (64 - take));
            consumed += take;
        }
        acc
    }

    /// Fixed-width encoding of `n`; the value must fit `width` bits.
    pub fn from_biguint(n: &BigUint, width: usize) -> Bits {
        debug_assert!(n.bits() as usize <= width);
        let mut out = Bits::new();
        for i in (0..width).rev() {
            out.push(n.bit(i as u64));
        }
        out
    }

    // ---- byte bridge ----

    pub fn from_bytes(bytes: &[u8]) -> Bits {
        let mut out = Bits::new();
        for b in bytes {
            out.push_byte(*b);
        }
        out
    }

    /// Bytes, if the length is byte-aligned.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        if self.len % 8 != 0 {
            return None;
        }
        let mut out = Vec::with_capacity(self.len / 8);
        for i in (0..self.len).step_by(8) {
            let mut b = 0u8;
            for j in 0..8 {
                b = (b << 1) | self.get(i + j) as u8;
            }
            out.push(b);
        }
        Some(out)
    }

    /// Bytes with trailing zero padding, for serialization.
    pub fn to_padded_bytes(&self) -> Vec<u8> {
        self.words
            .iter()
            .flat_map(|w| w.to_be_bytes())
            .take(self.len.div_ceil(8))
            .collect()
    }

    /// Rebuild from `to_padded_bytes` output; `None` if `bytes` is too short
    /// for `len`.
    pub fn from_padded_bytes(len: usize, bytes: &[u8]) -> Option<Bits> {
        if bytes.len() < len.div_ceil(8) {
            return None;
        }
        let mut out = Bits::new();
        for i in 0..len {
            out.push((bytes[i / 8] >> (7 - (i % 8))) & 1 == 1);
        }
        Some(out)
    }
}

impl std::fmt::Debug for Bits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0b")?;
        for b in self.iter() {
            write!(f, "{}", b as u8)?;
        }
        Ok(())
    }
}

impl FromIterator<bool> for Bits {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Bits {
        let mut out = Bits::new();
        for b in iter {
            out.push(b);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    fn of_str(s: &str) -> Bits {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn test_push_get_roundtrip() {
        let pattern: Vec<bool> = (0..200).map(|i| i % 3 == 0).collect();
        let bits: Bits = pattern.iter().copied().collect();
        assert_eq!(bits.len(), 200);
        for (i, b) in pattern.iter().enumerate() {
            assert_eq!(bits.get(i), *b, "bit {}", i);
        }
    }

    #[test]
    fn test_slice_concat() {
        let bits = of_str("110100111");
        let (a, b) = bits.split_at(4);
        assert_eq!(a, of_str("1101"));
        assert_eq!(b, of_str("00111"));
        assert_eq!(Bits::concat(&a, &b), bits);
    }

    #[test]
    fn test_tail_masking_keeps_equality_canonical() {
        // not() flips garbage past the end; masking must keep it zero
        let a = of_str("101").not();
        let b = of_str("010");
        assert_eq!(a, b);
    }

    #[test]
    fn test_bitwise_ops() {
        let a = of_str("1100");
        let b = of_str("1010");
        assert_eq!(a.or(&b), Some(of_str("1110")));
        assert_eq!(a.and(&b), Some(of_str("1000")));
        assert_eq!(a.xnor(&b), Some(of_str("1001")));
        assert_eq!(a.or(&of_str("10")), None);
        assert_eq!(a.not(), of_str("0011"));
    }

    #[test]
    fn test_lex_cmp() {
        assert_eq!(of_str("10").lex_cmp(&of_str("100")), Ordering::Less);
        assert_eq!(of_str("11").lex_cmp(&of_str("100")), Ordering::Greater);
        assert_eq!(of_str("").lex_cmp(&of_str("0")), Ordering::Less);
        assert_eq!(of_str("101").lex_cmp(&of_str("101")), Ordering::Equal);
    }

    #[test]
    fn test_u64_roundtrip() {
        for n in [0u64, 1, 2, 21, 255, 256, u64::MAX] {
            let bits = Bits::from_u64(n);
            assert_eq!(bits.to_u64(), Some(n));
            assert!(!bits.has_leading_zero());
        }
        assert_eq!(Bits::from_u64(0).len(), 0);
        assert_eq!(Bits::from_u64(6), of_str("110"));
    }

    #[test]
    fn test_biguint_roundtrip() {
        let bits = of_str("0001101");
        let n = bits.to_biguint();
        assert_eq!(n, BigUint::from(13u32));
        assert_eq!(Bits::from_biguint(&n, 7), bits);
        assert_eq!(Bits::from_biguint(&BigUint::zero(), 4), of_str("0000"));
    }

    #[test]
    fn test_biguint_wide() {
        // crosses several words
        let bits: Bits = (0..190).map(|i| i % 7 == 2).collect();
        let n = bits.to_biguint();
        assert_eq!(Bits::from_biguint(&n, 190), bits);
    }

    #[test]
    fn test_byte_roundtrip() {
        let bytes = [0x00u8, 0x7f, 0x80, 0xff, 0x41];
        let bits = Bits::from_bytes(&bytes);
        assert_eq!(bits.len(), 40);
        assert_eq!(bits.to_bytes(), Some(bytes.to_vec()));
        assert_eq!(of_str("101").to_bytes(), None);
    }

    #[test]
    fn test_padded_bytes_roundtrip() {
        let bits = of_str("11010");
        let padded = bits.to_padded_bytes();
        assert_eq!(padded, vec![0b1101_0000]);
        assert_eq!(Bits::from_padded_bytes(5, &padded), Some(bits));
        assert_eq!(Bits::from_padded_bytes(9, &padded), None);
    }

    #[test]
    fn test_reverse() {
        assert_eq!(of_str("1101").reverse(), of_str("1011"));
        assert_eq!(of_str("").reverse(), of_str(""));
    }

    #[test]
    fn test_common_prefix_from() {
        let key = of_str("10110011");
        assert_eq!(key.common_prefix_from(0, &of_str("1011")), 4);
        assert_eq!(key.common_prefix_from(4, &of_str("0011")), 4);
        assert_eq!(key.common_prefix_from(4, &of_str("01")), 1);
        assert_eq!(key.common_prefix_from(6, &of_str("110011")), 2);
    }
}
