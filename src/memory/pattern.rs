//! AOB pattern parsing and masked matching
//!
//! Patterns use the textual grammar `"89 45 ?? 8B 4D"`: whitespace separated
//! tokens, each either a two digit hex byte or a wildcard marker (`?` / `??`).
//! A parsed pattern carries the bytes plus a mask string of the same length,
//! `x` for bytes that must match and `?` for unconstrained positions.

use crate::core::types::{MemoryError, MemoryResult};
use std::fmt;
use std::str::FromStr;

/// Mask symbol for a byte that must match exactly
pub const MASK_EXACT: char = 'x';
/// Mask symbol for an unconstrained byte
pub const MASK_WILDCARD: char = '?';

/// A parsed AOB pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<u8>,
    mask: String,
}

impl Pattern {
    /// Parse the textual pattern grammar.
    ///
    /// `None`, empty and whitespace-only input are rejected, as is any token
    /// that is neither a wildcard marker nor exactly two hex digits. There is
    /// never a partial result.
    pub fn parse<'a>(input: impl Into<Option<&'a str>>) -> MemoryResult<Self> {
        let input = input
            .into()
            .ok_or_else(|| MemoryError::InvalidPattern("No pattern given".to_string()))?;

        if input.trim().is_empty() {
            return Err(MemoryError::InvalidPattern("Empty pattern".to_string()));
        }

        let mut bytes = Vec::new();
        let mut mask = String::new();

        for token in input.split_whitespace() {
            if token == "?" || token == "??" {
                bytes.push(0x00);
                mask.push(MASK_WILDCARD);
                continue;
            }

            let mut byte = [0u8; 1];
            hex::decode_to_slice(token, &mut byte).map_err(|e| {
                MemoryError::InvalidPattern(format!("Invalid hex byte '{}': {}", token, e))
            })?;
            bytes.push(byte[0]);
            mask.push(MASK_EXACT);
        }

        Self::from_parts(bytes, mask)
    }

    /// Build a pattern from raw bytes and a mask, checking the length invariant
    pub fn from_parts(bytes: Vec<u8>, mask: impl Into<String>) -> MemoryResult<Self> {
        let mask = mask.into();
        if bytes.len() != mask.len() {
            return Err(MemoryError::MaskMismatch {
                pattern: bytes.len(),
                mask: mask.len(),
            });
        }
        if bytes.is_empty() {
            return Err(MemoryError::InvalidPattern("Empty pattern".to_string()));
        }
        if let Some(bad) = mask.chars().find(|c| *c != MASK_EXACT && *c != MASK_WILDCARD) {
            return Err(MemoryError::InvalidPattern(format!(
                "Invalid mask symbol '{}'",
                bad
            )));
        }
        Ok(Pattern { bytes, mask })
    }

    /// Exact-match pattern without wildcards
    pub fn exact(bytes: &[u8]) -> MemoryResult<Self> {
        Self::from_parts(bytes.to_vec(), MASK_EXACT.to_string().repeat(bytes.len()))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mask(&self) -> &str {
        &self.mask
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of positions that must match exactly
    pub fn exact_count(&self) -> usize {
        self.mask.chars().filter(|c| *c == MASK_EXACT).count()
    }

    /// Split into the `(bytes, mask)` pair the scanner entry points take
    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.bytes, self.mask)
    }

    /// Check the pattern against `buffer` starting at `offset`
    pub fn matches_at(&self, buffer: &[u8], offset: usize) -> bool {
        matches(buffer, offset, &self.bytes, self.mask.as_bytes())
    }
}

/// Masked comparison of `pattern` against `buffer[offset..]`.
///
/// Every position whose mask symbol is `x` must be equal; wildcard positions
/// never block a match. A window running past the end of `buffer` never
/// matches.
pub fn matches(buffer: &[u8], offset: usize, pattern: &[u8], mask: &[u8]) -> bool {
    let window = match offset
        .checked_add(pattern.len())
        .and_then(|end| buffer.get(offset..end))
    {
        Some(window) => window,
        None => return false,
    };

    window
        .iter()
        .zip(pattern)
        .zip(mask)
        .all(|((have, want), symbol)| *symbol != MASK_EXACT as u8 || have == want)
}

impl FromStr for Pattern {
    type Err = MemoryError;

    fn from_str(s: &str) -> MemoryResult<Self> {
        Pattern::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (byte, symbol)) in self.bytes.iter().zip(self.mask.chars()).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if symbol == MASK_WILDCARD {
                f.write_str("??")?;
            } else {
                f.write_str(&hex::encode_upper([*byte]))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_with_double_wildcard() {
        let pattern = Pattern::parse("89 45 ?? 8B 4D").unwrap();
        assert_eq!(pattern.bytes(), &[0x89, 0x45, 0x00, 0x8B, 0x4D]);
        assert_eq!(pattern.mask(), "xx?xx");
        assert_eq!(pattern.exact_count(), 4);
    }

    #[test]
    fn test_parse_with_single_wildcard() {
        let pattern = Pattern::parse("89 ? 45").unwrap();
        assert_eq!(pattern.len(), 3);
        assert_eq!(pattern.mask(), "x?x");
    }

    #[test]
    fn test_parse_all_wildcards() {
        let pattern = Pattern::parse("?? ?? ??").unwrap();
        assert_eq!(pattern.bytes(), &[0, 0, 0]);
        assert_eq!(pattern.mask(), "???");
    }

    #[test]
    fn test_parse_long_pattern() {
        let pattern = Pattern::parse("55 8B EC 83 EC ?? 53 56 57 8B ?? ?? ?? ?? ?? 33 FF").unwrap();
        assert_eq!(pattern.len(), 17);
        assert_eq!(pattern.mask().len(), 17);
    }

    #[test]
    fn test_parse_mixed_whitespace_and_case() {
        let pattern = Pattern::parse("  8b\tec \n ?? ff ").unwrap();
        assert_eq!(pattern.bytes(), &[0x8B, 0xEC, 0x00, 0xFF]);
        assert_eq!(pattern.mask(), "xx?x");
    }

    #[test]
    fn test_parse_rejects_absent_and_blank_input() {
        assert!(Pattern::parse(None::<&str>).is_err());
        assert!(Pattern::parse("").is_err());
        assert!(Pattern::parse("   ").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert!(Pattern::parse("ZZ").is_err());
        assert!(Pattern::parse("ZZ XX YY").is_err());
        assert!(Pattern::parse("89 4").is_err());
        assert!(Pattern::parse("89 456").is_err());
        assert!(Pattern::parse("89 ???").is_err());
        assert!(matches!(
            Pattern::parse("89 GG").unwrap_err(),
            MemoryError::InvalidPattern(_)
        ));
    }

    #[test]
    fn test_from_parts_enforces_lengths() {
        assert!(matches!(
            Pattern::from_parts(vec![1, 2, 3], "xx"),
            Err(MemoryError::MaskMismatch { pattern: 3, mask: 2 })
        ));
        assert!(Pattern::from_parts(vec![1, 2], "xz").is_err());
        assert!(Pattern::from_parts(vec![], "").is_err());
        assert!(Pattern::from_parts(vec![1, 2], "x?").is_ok());
    }

    #[test]
    fn test_display_uses_pattern_grammar() {
        let pattern = Pattern::parse("89 45 ? 8b 4d").unwrap();
        assert_eq!(pattern.to_string(), "89 45 ?? 8B 4D");
        assert_eq!(Pattern::exact(&[0x0A]).unwrap().to_string(), "0A");
    }

    #[test]
    fn test_masked_match() {
        let pattern = [0x89, 0x45, 0x00, 0x8B, 0x4D];
        let mask = b"xx?xx";

        assert!(matches(&[0x89, 0x45, 0xFF, 0x8B, 0x4D], 0, &pattern, mask));
        assert!(matches(&[0x89, 0x45, 0x00, 0x8B, 0x4D], 0, &pattern, mask));
        assert!(!matches(&[0x89, 0x46, 0x00, 0x8B, 0x4D], 0, &pattern, mask));
    }

    #[test]
    fn test_match_window_bounds() {
        let buffer = [0x00, 0x89, 0x45];
        assert!(matches(&buffer, 1, &[0x89, 0x45], b"xx"));
        assert!(!matches(&buffer, 2, &[0x45, 0x00], b"xx"));
        assert!(!matches(&buffer, usize::MAX, &[0x45], b"x"));
    }

    fn token() -> impl Strategy<Value = (String, Option<u8>)> {
        prop_oneof![
            Just(("?".to_string(), None)),
            Just(("??".to_string(), None)),
            any::<u8>().prop_map(|b| (format!("{:02X}", b), Some(b))),
            any::<u8>().prop_map(|b| (format!("{:02x}", b), Some(b))),
        ]
    }

    proptest! {
        #[test]
        fn prop_parse_preserves_token_kinds(tokens in prop::collection::vec(token(), 1..64)) {
            let text = tokens.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>().join(" ");
            let pattern = Pattern::parse(text.as_str()).unwrap();

            prop_assert_eq!(pattern.len(), tokens.len());
            prop_assert_eq!(pattern.mask().len(), tokens.len());
            for (i, (_, expected)) in tokens.iter().enumerate() {
                match expected {
                    Some(byte) => {
                        prop_assert_eq!(pattern.bytes()[i], *byte);
                        prop_assert_eq!(pattern.mask().as_bytes()[i], b'x');
                    }
                    None => {
                        prop_assert_eq!(pattern.bytes()[i], 0x00);
                        prop_assert_eq!(pattern.mask().as_bytes()[i], b'?');
                    }
                }
            }
        }

        #[test]
        fn prop_wildcards_never_block(buffer in prop::collection::vec(any::<u8>(), 1..32)) {
            let mask = "?".repeat(buffer.len());
            let pattern = vec![0u8; buffer.len()];
            prop_assert!(matches(&buffer, 0, &pattern, mask.as_bytes()));
        }

        #[test]
        fn prop_pattern_taken_from_buffer_matches(
            buffer in prop::collection::vec(any::<u8>(), 8..64),
            start in 0usize..8,
            wildcard_mask in prop::collection::vec(any::<bool>(), 1..8),
        ) {
            let len = wildcard_mask.len().min(buffer.len() - start);
            let pattern: Vec<u8> = buffer[start..start + len]
                .iter()
                .zip(&wildcard_mask)
                .map(|(b, wild)| if *wild { 0 } else { *b })
                .collect();
            let mask: String = wildcard_mask[..len]
                .iter()
                .map(|wild| if *wild { '?' } else { 'x' })
                .collect();
            prop_assert!(matches(&buffer, start, &pattern, mask.as_bytes()));
        }
    }
}
