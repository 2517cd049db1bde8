//! The three header tokens of a Room frame: [`Verb`], [`Channel`] and
//! [`Count`].
//!
//! Tokens are validated byte-slice wrappers. `parse` enforces the lexical
//! rule and returns a framing error on violation; `Display` reproduces the
//! exact stored bytes. Conversions to and from fixed-width integers are
//! lossless over the integer's range.

use std::fmt;
use std::str::FromStr;

use crate::error::{Field, WireError};
use crate::scan::{is_sign, scan_digit, scan_hex, scan_word};

/// An opaque message kind: one or more ASCII letters or underscores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Verb(String);

impl Verb {
    /// `true` if `view` is a non-empty run of word-class bytes.
    pub fn verify(view: &[u8]) -> bool {
        !view.is_empty() && scan_word(view, 1, view.len()) == view.len()
    }

    /// Parses a verb, reporting a framing error on lexical violation.
    pub fn parse(view: impl AsRef<[u8]>) -> Result<Self, WireError> {
        let view = view.as_ref();
        if !Self::verify(view) {
            return Err(WireError::Invalid { field: Field::Verb });
        }
        Ok(Self(String::from_utf8_lossy(view).into_owned()))
    }

    /// Non-throwing parse.
    pub fn try_parse(view: impl AsRef<[u8]>) -> Option<Self> {
        Self::parse(view).ok()
    }

    /// Wraps bytes the codec has already scanned as word-class (possibly
    /// empty, for the default token).
    pub(crate) fn from_scanned(view: &[u8]) -> Self {
        Self(String::from_utf8_lossy(view).into_owned())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Verb {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

/// A signed hexadecimal route id: a mandatory sign byte followed by one
/// or more hex digits.
///
/// `+0` (hub-peer) and `-1` (broadcast) are reserved by routing layers;
/// the codec gives them no special meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Channel(String);

impl Channel {
    /// `true` if `view` is `sign` followed by a hex run covering the rest.
    pub fn verify(view: &[u8]) -> bool {
        view.len() >= 2 && is_sign(view[0]) && 1 + scan_hex(&view[1..], 1, view.len() - 1) == view.len()
    }

    /// Parses a channel, reporting a framing error on lexical violation.
    pub fn parse(view: impl AsRef<[u8]>) -> Result<Self, WireError> {
        let view = view.as_ref();
        if !Self::verify(view) {
            return Err(WireError::Invalid {
                field: Field::Channel,
            });
        }
        Ok(Self(String::from_utf8_lossy(view).into_owned()))
    }

    /// Non-throwing parse.
    pub fn try_parse(view: impl AsRef<[u8]>) -> Option<Self> {
        Self::parse(view).ok()
    }

    /// Formats a signed integer: `+` and the lowercase hex magnitude for
    /// `n >= 0`, `-` and the magnitude otherwise.
    pub fn from_i64(n: i64) -> Self {
        let sign = if n >= 0 { '+' } else { '-' };
        Self(format!("{sign}{:x}", n.unsigned_abs()))
    }

    pub fn from_i32(n: i32) -> Self {
        Self::from_i64(n as i64)
    }

    /// Converts back to a signed 64-bit integer.
    ///
    /// The empty (default) token converts to 0. A magnitude outside the
    /// integer's range is a framing error, never truncated.
    pub fn to_i64(&self) -> Result<i64, WireError> {
        let view = self.0.as_bytes();
        if view.is_empty() {
            return Ok(0);
        }
        fn invalid() -> WireError {
            WireError::Invalid {
                field: Field::Channel,
            }
        }
        let negative = view[0] == b'-';
        let mut magnitude: u64 = 0;
        for &b in &view[1..] {
            let digit = match b {
                b'0'..=b'9' => b - b'0',
                b'a'..=b'f' => b - b'a' + 10,
                b'A'..=b'F' => b - b'A' + 10,
                _ => return Err(invalid()),
            };
            magnitude = magnitude
                .checked_mul(16)
                .and_then(|m| m.checked_add(u64::from(digit)))
                .ok_or_else(invalid)?;
        }
        if negative {
            if magnitude > i64::MAX as u64 + 1 {
                return Err(invalid());
            }
            Ok((-(magnitude as i128)) as i64)
        } else {
            i64::try_from(magnitude).map_err(|_| invalid())
        }
    }

    pub fn to_i32(&self) -> Result<i32, WireError> {
        i32::try_from(self.to_i64()?).map_err(|_| WireError::Invalid {
            field: Field::Channel,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Channel {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

/// The content byte length: one or more ASCII decimal digits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Count(String);

impl Count {
    /// `true` if `view` is a non-empty run of decimal digits.
    pub fn verify(view: &[u8]) -> bool {
        !view.is_empty() && scan_digit(view, 1, view.len()) == view.len()
    }

    /// Parses a count, reporting a framing error on lexical violation.
    pub fn parse(view: impl AsRef<[u8]>) -> Result<Self, WireError> {
        let view = view.as_ref();
        if !Self::verify(view) {
            return Err(WireError::Invalid { field: Field::Count });
        }
        Ok(Self(String::from_utf8_lossy(view).into_owned()))
    }

    /// Non-throwing parse.
    pub fn try_parse(view: impl AsRef<[u8]>) -> Option<Self> {
        Self::parse(view).ok()
    }

    /// Formats a byte length in decimal.
    pub fn from_u64(n: u64) -> Self {
        Self(n.to_string())
    }

    /// Formats a signed length; negatives are rejected.
    pub fn from_i64(n: i64) -> Result<Self, WireError> {
        u64::try_from(n)
            .map(Self::from_u64)
            .map_err(|_| WireError::Invalid { field: Field::Count })
    }

    /// Converts back to an unsigned 64-bit length.
    ///
    /// The empty (default) token converts to 0. Overflow is a framing
    /// error, never truncated.
    pub fn to_u64(&self) -> Result<u64, WireError> {
        let mut value: u64 = 0;
        for &b in self.0.as_bytes() {
            if !b.is_ascii_digit() {
                return Err(WireError::Invalid { field: Field::Count });
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .ok_or(WireError::Invalid { field: Field::Count })?;
        }
        Ok(value)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Count {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_accepts_letters_and_underscore() {
        for ok in ["A", "MSG", "snake_case", "_", "BCAST"] {
            assert!(Verb::verify(ok.as_bytes()), "{ok} should verify");
            assert_eq!(Verb::parse(ok).unwrap().as_str(), ok);
        }
    }

    #[test]
    fn verb_rejects_everything_else() {
        for bad in ["", "MSG1", "a b", "+x", "héllo", " "] {
            assert!(!Verb::verify(bad.as_bytes()), "{bad:?} should not verify");
            assert!(matches!(
                Verb::parse(bad),
                Err(WireError::Invalid { field: Field::Verb })
            ));
        }
        assert!(Verb::try_parse("1").is_none());
    }

    #[test]
    fn verb_display_reproduces_bytes() {
        assert_eq!(Verb::parse("PING").unwrap().to_string(), "PING");
        assert_eq!("Ping".parse::<Verb>().unwrap().as_bytes(), b"Ping");
    }

    #[test]
    fn channel_verify_rules() {
        for ok in ["+0", "-1", "+ff", "-DEAD", "+0123456789abcdefABCDEF"] {
            assert!(Channel::verify(ok.as_bytes()), "{ok} should verify");
        }
        for bad in ["", "+", "-", "0", "ff", "+g", "- 1", "++1", "+1x"] {
            assert!(!Channel::verify(bad.as_bytes()), "{bad:?} should not verify");
            assert!(Channel::try_parse(bad).is_none());
        }
    }

    #[test]
    fn channel_formats_lowercase_hex_with_mandatory_sign() {
        assert_eq!(Channel::from_i64(0).as_str(), "+0");
        assert_eq!(Channel::from_i64(255).as_str(), "+ff");
        assert_eq!(Channel::from_i64(-1).as_str(), "-1");
        assert_eq!(Channel::from_i64(-3735928559).as_str(), "-deadbeef");
        assert_eq!(Channel::from_i32(16).as_str(), "+10");
    }

    #[test]
    fn channel_roundtrips_i64_extremes() {
        for n in [0i64, 1, -1, 255, -255, i64::MAX, i64::MIN, 0xffffffff] {
            let c = Channel::from_i64(n);
            assert_eq!(c.to_i64().unwrap(), n, "roundtrip of {n}");
        }
    }

    #[test]
    fn channel_accepts_uppercase_hex_on_parse() {
        let c = Channel::parse("+FF").unwrap();
        assert_eq!(c.to_i64().unwrap(), 255);
        // Display keeps the stored bytes, not a normalized form.
        assert_eq!(c.to_string(), "+FF");
    }

    #[test]
    fn channel_overflow_is_an_error() {
        // 2^63 is out of range for +, in range (as MIN) for -.
        let c = Channel::parse("+8000000000000000").unwrap();
        assert!(c.to_i64().is_err());
        let c = Channel::parse("-8000000000000000").unwrap();
        assert_eq!(c.to_i64().unwrap(), i64::MIN);
        let c = Channel::parse("-8000000000000001").unwrap();
        assert!(c.to_i64().is_err());
        let c = Channel::parse("+ffffffffffffffffff").unwrap();
        assert!(c.to_i64().is_err());
    }

    #[test]
    fn channel_to_i32_range() {
        assert_eq!(Channel::from_i32(i32::MIN).to_i32().unwrap(), i32::MIN);
        assert!(Channel::from_i64(i64::from(i32::MAX) + 1).to_i32().is_err());
    }

    #[test]
    fn channel_default_converts_to_zero() {
        assert_eq!(Channel::default().to_i64().unwrap(), 0);
    }

    #[test]
    fn count_verify_and_parse() {
        for ok in ["0", "5", "1048576", "007"] {
            assert!(Count::verify(ok.as_bytes()));
        }
        for bad in ["", "-1", "+1", "1a", " 1", "1 "] {
            assert!(!Count::verify(bad.as_bytes()), "{bad:?} should not verify");
            assert!(matches!(
                Count::parse(bad),
                Err(WireError::Invalid { field: Field::Count })
            ));
        }
    }

    #[test]
    fn count_conversions() {
        assert_eq!(Count::from_u64(0).as_str(), "0");
        assert_eq!(Count::from_u64(1_048_576).to_u64().unwrap(), 1_048_576);
        assert_eq!(Count::from_i64(26).unwrap().as_str(), "26");
        assert!(Count::from_i64(-1).is_err());
        assert_eq!(Count::default().to_u64().unwrap(), 0);
    }

    #[test]
    fn count_overflow_is_an_error() {
        // 21 nines exceeds u64::MAX but fits the default 32-byte length cap.
        let c = Count::parse("999999999999999999999").unwrap();
        assert!(c.to_u64().is_err());
        assert_eq!(
            Count::parse(u64::MAX.to_string()).unwrap().to_u64().unwrap(),
            u64::MAX
        );
    }
}
