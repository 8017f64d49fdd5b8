//! Visibility keys: compact bitsets over visibility indices.
//!
//! A key is a string of radix-32 digits (`0-9a-v`, case-insensitive). Digit `c` holds the bits of
//! indices `5c..5c + 4`, least significant bit first. Missing trailing digits are zero bits, so the
//! empty key reveals nothing and keys of different lengths compare naturally.

use crate::error::{Error, Result};
use serde::Serialize;

const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";
const BITS_PER_DIGIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityDiff {
    /// Indices set in the new key but not the old one, ascending.
    pub added: Vec<usize>,
    /// Indices set in the old key but not the new one, ascending.
    pub removed: Vec<usize>,
}

impl VisibilityDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

fn digits(key: &str) -> Result<Vec<u8>> {
    key.chars()
        .enumerate()
        .map(|(offset, c)| {
            c.to_digit(32)
                .map(|d| d as u8)
                .ok_or_else(|| Error::InvalidVisibilityKey {
                    key: key.to_string(),
                    found: c,
                    offset,
                })
        })
        .collect()
}

/// Indices revealed by `key`, ascending.
pub fn decode(key: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (c, digit) in digits(key)?.into_iter().enumerate() {
        for bit in 0..BITS_PER_DIGIT {
            if digit & (1 << bit) != 0 {
                out.push(c * BITS_PER_DIGIT + bit);
            }
        }
    }
    Ok(out)
}

/// Canonical key for `indices`: no trailing `'0'` digits, order and duplicates ignored.
pub fn encode(indices: impl IntoIterator<Item = usize>) -> String {
    let mut buf: Vec<u8> = Vec::new();
    for idx in indices {
        let c = idx / BITS_PER_DIGIT;
        if buf.len() <= c {
            buf.resize(c + 1, 0);
        }
        buf[c] |= 1 << (idx % BITS_PER_DIGIT);
    }
    while buf.last() == Some(&0) {
        buf.pop();
    }
    buf.into_iter().map(|d| ALPHABET[d as usize] as char).collect()
}

/// Key revealing exactly the indices `0..n`.
pub fn first_n(n: usize) -> String {
    let full = n / BITS_PER_DIGIT;
    let rest = n % BITS_PER_DIGIT;
    let mut out = String::with_capacity(full + 1);
    out.extend(std::iter::repeat_n('v', full));
    if rest > 0 {
        out.push(ALPHABET[(1 << rest) - 1] as char);
    }
    out
}

/// Indices that became visible (`added`) and hidden (`removed`) going from `old` to `new`.
pub fn compare(old: &str, new: &str) -> Result<VisibilityDiff> {
    let old = digits(old)?;
    let new = digits(new)?;
    let mut diff = VisibilityDiff::default();
    for c in 0..old.len().max(new.len()) {
        let o = old.get(c).copied().unwrap_or(0);
        let n = new.get(c).copied().unwrap_or(0);
        let changed = o ^ n;
        if changed == 0 {
            continue;
        }
        for bit in 0..BITS_PER_DIGIT {
            if changed & (1 << bit) == 0 {
                continue;
            }
            let idx = c * BITS_PER_DIGIT + bit;
            if n & (1 << bit) != 0 {
                diff.added.push(idx);
            } else {
                diff.removed.push(idx);
            }
        }
    }
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_reveals_nothing() {
        assert_eq!(decode("").unwrap(), Vec::<usize>::new());
        assert_eq!(decode("000").unwrap(), Vec::<usize>::new());
        assert_eq!(encode([]), "");
    }

    #[test]
    fn digits_hold_five_bits_lsb_first() {
        assert_eq!(decode("1").unwrap(), vec![0]);
        assert_eq!(decode("v").unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(decode("01").unwrap(), vec![5]);
        assert_eq!(decode("V").unwrap(), decode("v").unwrap());
        assert_eq!(encode([5, 0, 0]), "11");
    }

    #[test]
    fn encode_is_canonical() {
        assert_eq!(encode(decode("a300").unwrap()), "a3");
        assert_eq!(encode(decode("A3").unwrap()), "a3");
    }

    #[test]
    fn first_n_is_a_prefix() {
        assert_eq!(first_n(0), "");
        assert_eq!(first_n(1), "1");
        assert_eq!(first_n(7), "v3");
        assert_eq!(decode(&first_n(12)).unwrap(), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn compare_handles_different_lengths() {
        let diff = compare("v", "3001").unwrap();
        assert_eq!(diff.added, vec![15]);
        assert_eq!(diff.removed, vec![2, 3, 4]);

        let diff = compare("", "3").unwrap();
        assert_eq!(diff.added, vec![0, 1]);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn same_key_is_an_empty_diff() {
        for key in ["", "0", "1", "v3", "a0b"] {
            assert!(compare(key, key).unwrap().is_empty());
        }
        assert!(compare("1", "10").unwrap().is_empty());
    }

    #[test]
    fn invalid_characters_are_rejected() {
        let err = decode("1w").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidVisibilityKey {
                found: 'w',
                offset: 1,
                ..
            }
        ));
        assert!(compare("", "-").is_err());
    }
}
