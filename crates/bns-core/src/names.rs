//! Fully-qualified names and the restricted name charset

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_NAME_LEN, MAX_NAMESPACE_LEN};
use crate::{Error, Result};

/// Characters allowed in names and namespaces on the wire
pub(crate) fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

fn validate_label(label: &str, what: &str, max_len: usize) -> Result<()> {
    if label.is_empty() {
        return Err(Error::validation(format!("{} must not be empty", what)));
    }
    if label.len() > max_len {
        return Err(Error::validation(format!(
            "{} {:?} is longer than {} bytes",
            what, label, max_len
        )));
    }
    if let Some(bad) = label.chars().find(|c| !is_name_char(*c)) {
        return Err(Error::validation(format!(
            "{} {:?} contains unsupported character {:?}",
            what, label, bad
        )));
    }
    Ok(())
}

/// Validate a bare namespace
pub fn validate_namespace(namespace: &str) -> Result<()> {
    validate_label(namespace, "namespace", MAX_NAMESPACE_LEN)
}

/// Parsed fully-qualified name: `name.namespace` or `sub.name.namespace`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fqn {
    pub subdomain: Option<String>,
    pub name: String,
    pub namespace: String,
}

impl Fqn {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Result<Self> {
        let fqn = Self {
            subdomain: None,
            name: name.into(),
            namespace: namespace.into(),
        };
        fqn.validate()?;
        Ok(fqn)
    }

    /// Parse a name that must be top-level
    ///
    /// Subdomains are rejected as a contract error because the registry
    /// contract cannot address them; the check runs before any I/O.
    pub fn parse_top_level(text: &str) -> Result<Self> {
        let fqn: Fqn = text.parse()?;
        if fqn.subdomain.is_some() {
            return Err(Error::contract(format!(
                "{} is a subdomain; only top-level names are supported",
                text
            )));
        }
        Ok(fqn)
    }

    pub fn is_subdomain(&self) -> bool {
        self.subdomain.is_some()
    }

    /// `name.namespace`, without any subdomain
    pub fn top_level(&self) -> String {
        format!("{}.{}", self.name, self.namespace)
    }

    fn validate(&self) -> Result<()> {
        if let Some(sub) = &self.subdomain {
            validate_label(sub, "subdomain", MAX_NAME_LEN)?;
        }
        validate_label(&self.name, "name", MAX_NAME_LEN)?;
        validate_namespace(&self.namespace)
    }
}

impl FromStr for Fqn {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let parts: Vec<&str> = text.split('.').collect();
        let fqn = match parts.as_slice() {
            [name, namespace] => Fqn {
                subdomain: None,
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            [sub, name, namespace] => Fqn {
                subdomain: Some(sub.to_string()),
                name: name.to_string(),
                namespace: namespace.to_string(),
            },
            _ => {
                return Err(Error::validation(format!(
                    "{:?} is not a fully-qualified name",
                    text
                )))
            }
        };
        fqn.validate()?;
        Ok(fqn)
    }
}

impl fmt::Display for Fqn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subdomain {
            Some(sub) => write!(f, "{}.{}.{}", sub, self.name, self.namespace),
            None => write!(f, "{}.{}", self.name, self.namespace),
        }
    }
}

/// Decode a name buffer returned by a contract back into text
pub fn decode_name_text(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::unexpected(format!("name buffer is not UTF-8: {}", e)).with_response_type("buffer"))
}

/// Decode a legacy comma-separated character-code list (`"98,116,99"` -> `"btc"`)
///
/// Text that is not a code list is returned unchanged.
pub fn decode_char_codes(text: &str) -> Result<String> {
    let looks_like_codes = !text.is_empty()
        && text.contains(',')
        && text.chars().all(|c| c.is_ascii_digit() || c == ',' || c == ' ');
    if !looks_like_codes {
        return Ok(text.to_string());
    }

    text.split(',')
        .map(|code| {
            code.trim()
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| Error::unexpected(format!("invalid character code {:?}", code)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_top_level() {
        let fqn = Fqn::parse_top_level("alice.btc").unwrap();
        assert_eq!(fqn.name, "alice");
        assert_eq!(fqn.namespace, "btc");
        assert_eq!(fqn.to_string(), "alice.btc");
    }

    #[test]
    fn test_subdomain_is_contract_error() {
        let err = Fqn::parse_top_level("sub.alice.btc").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractError);

        let fqn: Fqn = "sub.alice.btc".parse().unwrap();
        assert!(fqn.is_subdomain());
        assert_eq!(fqn.top_level(), "alice.btc");
    }

    #[test]
    fn test_malformed_is_validation_error() {
        for bad in ["alice", "a.b.c.d", ".btc", "alice.", "Alice.btc", "al ice.btc", "ålice.btc"] {
            let err = bad.parse::<Fqn>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValidationError, "input {:?}", bad);
        }
    }

    #[test]
    fn test_length_limits() {
        let long_ns = "a".repeat(MAX_NAMESPACE_LEN + 1);
        assert!(validate_namespace(&long_ns).is_err());
        let long_name = format!("{}.btc", "a".repeat(MAX_NAME_LEN + 1));
        assert!(long_name.parse::<Fqn>().is_err());
    }

    #[test]
    fn test_char_codes() {
        assert_eq!(decode_char_codes("98,116,99").unwrap(), "btc");
        assert_eq!(decode_char_codes("btc").unwrap(), "btc");
        assert!(decode_char_codes("98,,99").is_err());
    }
}
