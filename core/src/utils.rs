//! Utility functions and types.

use std::fmt::Debug;

/// Redacts a secret by replacing all but the first and last three characters with asterisks.
///
/// - Secrets shorter than 12 characters are entirely redacted.
/// - Otherwise only the first three and the last three characters are kept.
///
/// This allows users to tell different redacted keys apart without leaking them.
pub struct Redact<'a>(&'a str);

impl<'a> From<&'a str> for Redact<'a> {
    fn from(value: &'a str) -> Self {
        Redact(value)
    }
}

impl<'a> From<&'a String> for Redact<'a> {
    fn from(value: &'a String) -> Self {
        Redact(value.as_str())
    }
}

impl Debug for Redact<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let length = self.0.len();
        if length == 0 {
            f.write_str("EMPTY")
        } else if length < 12 || !self.0.is_char_boundary(3) || !self.0.is_char_boundary(length - 3)
        {
            f.write_str("***")
        } else {
            f.write_str(&self.0[..3])?;
            f.write_str("***")?;
            f.write_str(&self.0[length - 3..])
        }
    }
}

/// Redacts the `sig` parameter of a signed URI while keeping everything else readable.
///
/// A signed URI is a bearer credential, but its resource and constraints are
/// useful in logs. Only the signature is hidden.
pub struct RedactSignature<'a>(&'a str);

impl<'a> From<&'a str> for RedactSignature<'a> {
    fn from(value: &'a str) -> Self {
        RedactSignature(value)
    }
}

impl Debug for RedactSignature<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Some((base, query)) = self.0.split_once('?') else {
            return f.write_str(self.0);
        };

        f.write_str(base)?;
        f.write_str("?")?;
        for (i, pair) in query.split('&').enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            match pair.split_once('=') {
                Some(("sig", v)) => write!(f, "sig={:?}", Redact(v))?,
                _ => f.write_str(pair)?,
            }
        }
        Ok(())
    }
}
