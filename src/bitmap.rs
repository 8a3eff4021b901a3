//! Packed validity bitmap.
//!
//! Bits are stored little-endian within each `u64` word: bit 0 is the LSB of
//! word 0. Bits past `len` in the last word are always zero, which keeps
//! `count_ones` and equality exact.

use crate::{Error, Result};
use std::ops::Not;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct BitArray {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

#[inline]
fn word_count(bits: usize) -> usize {
    (bits + 63) / 64
}

#[inline]
fn tail_mask(len: usize) -> u64 {
    match len % 64 {
        0 => u64::MAX,
        rem => (1u64 << rem) - 1,
    }
}

impl BitArray {
    /// Create a bitmap of `len` bits, all unset.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; word_count(len)],
            len,
            ones: 0,
        }
    }

    /// Create a bitmap of `len` bits, all set.
    pub fn all_set(len: usize) -> Self {
        let mut words = vec![u64::MAX; word_count(len)];
        if let Some(last) = words.last_mut() {
            *last &= tail_mask(len);
        }
        Self {
            words,
            len,
            ones: len,
        }
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            words: Vec::with_capacity(word_count(bits)),
            len: 0,
            ones: 0,
        }
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        bits.iter().copied().collect()
    }

    /// Rebuild a bitmap from packed words. Bits beyond `len` are cleared.
    pub fn from_words(mut words: Vec<u64>, len: usize) -> Result<Self> {
        let needed = word_count(len);
        if words.len() < needed {
            return Err(Error::ShapeMismatch(format!(
                "bitmap of {} bits needs {} words, got {}",
                len,
                needed,
                words.len()
            )));
        }
        words.truncate(needed);
        if let Some(last) = words.last_mut() {
            *last &= tail_mask(len);
        }
        let ones = words.iter().map(|w| w.count_ones() as usize).sum();
        Ok(Self { words, len, ones })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read bit `index`. Panics when `index >= len`, like slice indexing.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(
            index < self.len,
            "bit index {} out of range for BitArray of length {}",
            index,
            self.len
        );
        (self.words[index / 64] >> (index % 64)) & 1 == 1
    }

    pub fn set(&mut self, index: usize, value: bool) {
        assert!(
            index < self.len,
            "bit index {} out of range for BitArray of length {}",
            index,
            self.len
        );
        let word = &mut self.words[index / 64];
        let mask = 1u64 << (index % 64);
        let was_set = *word & mask != 0;
        match (was_set, value) {
            (false, true) => {
                *word |= mask;
                self.ones += 1;
            }
            (true, false) => {
                *word &= !mask;
                self.ones -= 1;
            }
            _ => {}
        }
    }

    pub fn push(&mut self, value: bool) {
        let bit = self.len % 64;
        if bit == 0 {
            self.words.push(0);
        }
        if value {
            let last = self.words.len() - 1;
            self.words[last] |= 1u64 << bit;
            self.ones += 1;
        }
        self.len += 1;
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn count_zeros(&self) -> usize {
        self.len - self.ones
    }

    pub fn all(&self) -> bool {
        self.ones == self.len
    }

    pub fn any(&self) -> bool {
        self.ones > 0
    }

    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    pub fn into_words(self) -> Vec<u64> {
        self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| (self.words[i / 64] >> (i % 64)) & 1 == 1)
    }

    /// Positions of all set bits, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(w * 64 + bit)
            })
        })
    }

    fn zip_words(&self, other: &BitArray, op: impl Fn(u64, u64) -> u64) -> Result<BitArray> {
        if self.len != other.len {
            return Err(Error::ShapeMismatch(format!(
                "bitmap length mismatch: {} vs {}",
                self.len, other.len
            )));
        }
        let words = self
            .words
            .iter()
            .zip(&other.words)
            .map(|(&a, &b)| op(a, b))
            .collect();
        BitArray::from_words(words, self.len)
    }

    pub fn and(&self, other: &BitArray) -> Result<BitArray> {
        self.zip_words(other, |a, b| a & b)
    }

    pub fn or(&self, other: &BitArray) -> Result<BitArray> {
        self.zip_words(other, |a, b| a | b)
    }

    pub fn not_inplace(&mut self) {
        for w in &mut self.words {
            *w = !*w;
        }
        if let Some(last) = self.words.last_mut() {
            *last &= tail_mask(self.len);
        }
        self.ones = self.len - self.ones;
    }

    /// Keep the bits at positions where `mask` is set.
    pub fn filter(&self, mask: &BitArray) -> Result<BitArray> {
        if mask.len != self.len {
            return Err(Error::ShapeMismatch(format!(
                "mask length {} does not match bitmap length {}",
                mask.len, self.len
            )));
        }
        let mut out = BitArray::with_capacity(mask.count_ones());
        for i in mask.iter_ones() {
            out.push(self.get(i));
        }
        Ok(out)
    }

    /// Copy of bits `[start, end)`. Callers validate the range.
    pub fn slice(&self, start: usize, end: usize) -> BitArray {
        debug_assert!(start <= end && end <= self.len);
        if start % 64 == 0 {
            let words = self.words[start / 64..word_count(end)].to_vec();
            // Range checked above; from_words only fails on short input.
            return BitArray::from_words(words, end - start)
                .unwrap_or_else(|_| BitArray::new(end - start));
        }
        (start..end).map(|i| self.get(i)).collect()
    }

    pub fn take(&self, indices: &[usize]) -> BitArray {
        indices.iter().map(|&i| self.get(i)).collect()
    }

    pub fn extend(&mut self, other: &BitArray) {
        for bit in other.iter() {
            self.push(bit);
        }
    }
}

impl FromIterator<bool> for BitArray {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut out = BitArray::with_capacity(iter.size_hint().0);
        for bit in iter {
            out.push(bit);
        }
        out
    }
}

impl Not for BitArray {
    type Output = BitArray;

    fn not(mut self) -> BitArray {
        self.not_inplace();
        self
    }
}

impl Not for &BitArray {
    type Output = BitArray;

    fn not(self) -> BitArray {
        let mut out = self.clone();
        out.not_inplace();
        out
    }
}
