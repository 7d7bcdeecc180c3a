use std::fmt;

pub const API_KEY_PREFIX: &str = "sk-";
const MIN_KEY_LEN: usize = 20;
const MAX_KEY_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyFormatError {
    #[error("API key must start with \"{}\"", API_KEY_PREFIX)]
    MissingPrefix,

    #[error("API key must be between {} and {} characters", MIN_KEY_LEN, MAX_KEY_LEN)]
    BadLength,

    #[error("API key may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Opaque bearer token for the optimization service.
///
/// Only the shape is checked locally; the service decides whether the key is
/// valid. `Debug` and `Display` print a masked form.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: &str) -> Result<Self, KeyFormatError> {
        let key = raw.trim();
        if !key.starts_with(API_KEY_PREFIX) {
            return Err(KeyFormatError::MissingPrefix);
        }
        if key.len() < MIN_KEY_LEN || key.len() > MAX_KEY_LEN {
            return Err(KeyFormatError::BadLength);
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(KeyFormatError::InvalidCharacter);
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `sk-a…wxyz`
    pub fn masked(&self) -> String {
        let head: String = self.0.chars().take(API_KEY_PREFIX.len() + 1).collect();
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "sk-abcdefghijklmnop1234";

    #[test]
    fn test_parse_valid_key() {
        let key = ApiKey::parse(VALID).unwrap();
        assert_eq!(key.expose(), VALID);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let key = ApiKey::parse(&format!("  {VALID}\n")).unwrap();
        assert_eq!(key.expose(), VALID);
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert_eq!(
            ApiKey::parse("pk-abcdefghijklmnop1234"),
            Err(KeyFormatError::MissingPrefix)
        );
        assert_eq!(ApiKey::parse("sk-short"), Err(KeyFormatError::BadLength));
        assert_eq!(
            ApiKey::parse("sk-abcdefghijkl mnop1234"),
            Err(KeyFormatError::InvalidCharacter)
        );
    }

    #[test]
    fn test_debug_is_masked() {
        let key = ApiKey::parse(VALID).unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains(VALID));
        assert_eq!(key.masked(), "sk-a…1234");
    }
}
