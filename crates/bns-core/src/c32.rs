//! c32check principal addresses
//!
//! A standard principal is a version byte plus a 20-byte hash160. Its textual
//! form is `S` + c32(version) + c32(hash160 || checksum), where the checksum is
//! the first 4 bytes of sha256(sha256(version || hash160)).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Longest contract name a principal may carry
const MAX_CONTRACT_NAME_LEN: usize = 128;

fn c32_value(c: char) -> Option<u8> {
    let c = match c.to_ascii_uppercase() {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    C32_ALPHABET.iter().position(|&a| a as char == c).map(|p| p as u8)
}

/// Encode bytes into Crockford base32, preserving leading zero bytes as `0`
pub fn c32_encode(input: &[u8]) -> String {
    let mut out: Vec<u8> = Vec::with_capacity(input.len() * 8 / 5 + 1);
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for &byte in input.iter().rev() {
        let byte = byte as u16;
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1 << low_bits_to_take) - 1);
        out.push(C32_ALPHABET[((low_bits << carry_bits) + carry) as usize]);

        carry_bits = 8 + carry_bits - 5;
        carry = byte >> (8 - carry_bits);

        if carry_bits >= 5 {
            out.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        out.push(C32_ALPHABET[carry as usize]);
    }

    while out.last() == Some(&C32_ALPHABET[0]) {
        out.pop();
    }
    for &byte in input {
        if byte != 0 {
            break;
        }
        out.push(C32_ALPHABET[0]);
    }

    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Decode a c32 string back into bytes
pub fn c32_decode(input: &str) -> Result<Vec<u8>> {
    if !input.is_ascii() {
        return Err(Error::validation(format!("c32 input is not ASCII: {}", input)));
    }

    let mut out = Vec::with_capacity(input.len());
    let mut carry: u16 = 0;
    let mut carry_bits: u16 = 0;

    for c in input.chars().rev() {
        let value = c32_value(c)
            .ok_or_else(|| Error::validation(format!("invalid c32 character {:?}", c)))?;
        carry += (value as u16) << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            out.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }

    if carry_bits > 0 {
        out.push(carry as u8);
    }

    while out.last() == Some(&0) {
        out.pop();
    }
    let leading_zeros = input.chars().take_while(|&c| c == '0').count();
    out.extend(std::iter::repeat(0).take(leading_zeros));

    out.reverse();
    Ok(out)
}

fn checksum(version: u8, hash160: &[u8; 20]) -> [u8; 4] {
    let mut data = Vec::with_capacity(21);
    data.push(version);
    data.extend_from_slice(hash160);
    let first = Sha256::digest(&data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 4];
    out.copy_from_slice(&second[..4]);
    out
}

/// Account principal: version byte + hash160
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StandardPrincipal {
    pub version: u8,
    pub hash160: [u8; 20],
}

impl StandardPrincipal {
    pub fn new(version: u8, hash160: [u8; 20]) -> Self {
        Self { version, hash160 }
    }

    /// Render as a c32check address (`SP...`, `ST...`)
    pub fn to_address(&self) -> String {
        let mut data = Vec::with_capacity(24);
        data.extend_from_slice(&self.hash160);
        data.extend_from_slice(&checksum(self.version, &self.hash160));
        format!(
            "S{}{}",
            C32_ALPHABET[(self.version & 0x1f) as usize] as char,
            c32_encode(&data)
        )
    }

    /// Parse a c32check address, verifying its checksum
    pub fn from_address(address: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::validation(format!("invalid address {}: {}", address, reason));

        let mut chars = address.chars();
        if chars.next() != Some('S') {
            return Err(invalid("must start with 'S'"));
        }
        let version = chars
            .next()
            .and_then(c32_value)
            .ok_or_else(|| invalid("bad version character"))?;
        let data = c32_decode(chars.as_str())?;
        if data.len() != 24 {
            return Err(invalid("wrong length"));
        }

        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(&data[..20]);
        if data[20..] != checksum(version, &hash160) {
            return Err(invalid("checksum mismatch"));
        }

        Ok(Self { version, hash160 })
    }
}

impl fmt::Display for StandardPrincipal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_address())
    }
}

/// A standard principal or a contract principal (`SP....contract-name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    Standard(StandardPrincipal),
    Contract(StandardPrincipal, String),
}

impl FromStr for Principal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('.') {
            None => Ok(Principal::Standard(StandardPrincipal::from_address(s)?)),
            Some((address, name)) => {
                if name.is_empty() || name.len() > MAX_CONTRACT_NAME_LEN || !name.is_ascii() {
                    return Err(Error::validation(format!("invalid contract name in {}", s)));
                }
                Ok(Principal::Contract(
                    StandardPrincipal::from_address(address)?,
                    name.to_string(),
                ))
            }
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Standard(p) => write!(f, "{}", p),
            Principal::Contract(p, name) => write!(f, "{}.{}", p, name),
        }
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
