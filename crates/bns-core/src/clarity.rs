//! Clarity value codec
//!
//! `ClarityValue` mirrors the tagged encoding of contract arguments and
//! read-only call results. Decoding is strict: unknown tags, truncated payloads
//! and trailing bytes are all errors.

use std::collections::BTreeMap;
use std::fmt;

use crate::c32::{Principal, StandardPrincipal};
use crate::names::is_name_char;
use crate::{Error, Result};

const TAG_INT: u8 = 0x00;
const TAG_UINT: u8 = 0x01;
const TAG_BUFFER: u8 = 0x02;
const TAG_TRUE: u8 = 0x03;
const TAG_FALSE: u8 = 0x04;
const TAG_PRINCIPAL_STANDARD: u8 = 0x05;
const TAG_PRINCIPAL_CONTRACT: u8 = 0x06;
const TAG_RESPONSE_OK: u8 = 0x07;
const TAG_RESPONSE_ERR: u8 = 0x08;
const TAG_NONE: u8 = 0x09;
const TAG_SOME: u8 = 0x0a;
const TAG_LIST: u8 = 0x0b;
const TAG_TUPLE: u8 = 0x0c;
const TAG_STRING_ASCII: u8 = 0x0d;
const TAG_STRING_UTF8: u8 = 0x0e;

/// Nesting limit for decoding untrusted input
const MAX_DEPTH: usize = 32;

/// Decoded contract value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    Int(i128),
    UInt(u128),
    Bool(bool),
    Buffer(Vec<u8>),
    PrincipalStandard(StandardPrincipal),
    PrincipalContract(StandardPrincipal, String),
    OptionalSome(Box<ClarityValue>),
    OptionalNone,
    ResponseOk(Box<ClarityValue>),
    ResponseErr(Box<ClarityValue>),
    Tuple(ClarityTuple),
    List(Vec<ClarityValue>),
    StringAscii(String),
    StringUtf8(String),
}

impl ClarityValue {
    pub fn uint(value: u128) -> Self {
        ClarityValue::UInt(value)
    }

    pub fn int(value: i128) -> Self {
        ClarityValue::Int(value)
    }

    pub fn bool(value: bool) -> Self {
        ClarityValue::Bool(value)
    }

    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Self {
        ClarityValue::Buffer(bytes.into())
    }

    /// Name or namespace text as a buffer, restricted to the name charset
    pub fn name_buffer(text: &str) -> Result<Self> {
        if let Some(bad) = text.chars().find(|c| !is_name_char(*c)) {
            return Err(Error::validation(format!(
                "character {:?} is not allowed in {:?}",
                bad, text
            )));
        }
        Ok(ClarityValue::Buffer(text.as_bytes().to_vec()))
    }

    /// Principal argument from its textual form
    pub fn principal(text: &str) -> Result<Self> {
        Ok(match text.parse::<Principal>()? {
            Principal::Standard(p) => ClarityValue::PrincipalStandard(p),
            Principal::Contract(p, name) => ClarityValue::PrincipalContract(p, name),
        })
    }

    pub fn some(inner: ClarityValue) -> Self {
        ClarityValue::OptionalSome(Box::new(inner))
    }

    pub fn optional(inner: Option<ClarityValue>) -> Self {
        match inner {
            Some(v) => Self::some(v),
            None => ClarityValue::OptionalNone,
        }
    }

    pub fn ok(inner: ClarityValue) -> Self {
        ClarityValue::ResponseOk(Box::new(inner))
    }

    pub fn err(inner: ClarityValue) -> Self {
        ClarityValue::ResponseErr(Box::new(inner))
    }

    pub fn tuple<K: Into<String>>(fields: impl IntoIterator<Item = (K, ClarityValue)>) -> Self {
        ClarityValue::Tuple(ClarityTuple(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn list(items: impl IntoIterator<Item = ClarityValue>) -> Self {
        ClarityValue::List(items.into_iter().collect())
    }

    /// Type tag name, used in error details
    pub fn type_name(&self) -> &'static str {
        match self {
            ClarityValue::Int(_) => "int",
            ClarityValue::UInt(_) => "uint",
            ClarityValue::Bool(true) => "true",
            ClarityValue::Bool(false) => "false",
            ClarityValue::Buffer(_) => "buffer",
            ClarityValue::PrincipalStandard(_) => "principal-standard",
            ClarityValue::PrincipalContract(..) => "principal-contract",
            ClarityValue::OptionalSome(_) => "optional-some",
            ClarityValue::OptionalNone => "optional-none",
            ClarityValue::ResponseOk(_) => "response-ok",
            ClarityValue::ResponseErr(_) => "response-err",
            ClarityValue::Tuple(_) => "tuple",
            ClarityValue::List(_) => "list",
            ClarityValue::StringAscii(_) => "string-ascii",
            ClarityValue::StringUtf8(_) => "string-utf8",
        }
    }

    // --- encoding ---

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(&mut out);
        out
    }

    /// `0x`-prefixed hex, the form the call-read endpoint expects
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.serialize()))
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            ClarityValue::Int(v) => {
                out.push(TAG_INT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::UInt(v) => {
                out.push(TAG_UINT);
                out.extend_from_slice(&v.to_be_bytes());
            }
            ClarityValue::Bool(true) => out.push(TAG_TRUE),
            ClarityValue::Bool(false) => out.push(TAG_FALSE),
            ClarityValue::Buffer(bytes) => {
                out.push(TAG_BUFFER);
                write_len_prefixed(out, bytes);
            }
            ClarityValue::PrincipalStandard(p) => {
                out.push(TAG_PRINCIPAL_STANDARD);
                write_standard(out, p);
            }
            ClarityValue::PrincipalContract(p, name) => {
                out.push(TAG_PRINCIPAL_CONTRACT);
                write_standard(out, p);
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
            ClarityValue::ResponseOk(inner) => {
                out.push(TAG_RESPONSE_OK);
                inner.write_to(out);
            }
            ClarityValue::ResponseErr(inner) => {
                out.push(TAG_RESPONSE_ERR);
                inner.write_to(out);
            }
            ClarityValue::OptionalNone => out.push(TAG_NONE),
            ClarityValue::OptionalSome(inner) => {
                out.push(TAG_SOME);
                inner.write_to(out);
            }
            ClarityValue::List(items) => {
                out.push(TAG_LIST);
                out.extend_from_slice(&(items.len() as u32).to_be_bytes());
                for item in items {
                    item.write_to(out);
                }
            }
            ClarityValue::Tuple(tuple) => {
                out.push(TAG_TUPLE);
                out.extend_from_slice(&(tuple.0.len() as u32).to_be_bytes());
                for (name, value) in &tuple.0 {
                    out.push(name.len() as u8);
                    out.extend_from_slice(name.as_bytes());
                    value.write_to(out);
                }
            }
            ClarityValue::StringAscii(s) => {
                out.push(TAG_STRING_ASCII);
                write_len_prefixed(out, s.as_bytes());
            }
            ClarityValue::StringUtf8(s) => {
                out.push(TAG_STRING_UTF8);
                write_len_prefixed(out, s.as_bytes());
            }
        }
    }

    // --- decoding ---

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader { bytes, pos: 0 };
        let value = reader.read_value(0)?;
        if reader.pos != bytes.len() {
            return Err(Error::unexpected(format!(
                "{} trailing bytes after {}",
                bytes.len() - reader.pos,
                value.type_name()
            ))
            .with_response_type(value.type_name()));
        }
        Ok(value)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let text = text.strip_prefix("0x").unwrap_or(text);
        let bytes = hex::decode(text)
            .map_err(|e| Error::unexpected(format!("invalid hex value: {}", e)).with_cause(e))?;
        Self::deserialize(&bytes)
    }

    // --- interpretation helpers ---

    pub fn expect_uint(self) -> Result<u128> {
        match self {
            ClarityValue::UInt(v) => Ok(v),
            other => Err(Error::type_mismatch("uint", other.type_name())),
        }
    }

    pub fn expect_bool(self) -> Result<bool> {
        match self {
            ClarityValue::Bool(v) => Ok(v),
            other => Err(Error::type_mismatch("bool", other.type_name())),
        }
    }

    pub fn expect_buffer(self) -> Result<Vec<u8>> {
        match self {
            ClarityValue::Buffer(v) => Ok(v),
            other => Err(Error::type_mismatch("buffer", other.type_name())),
        }
    }

    /// Principal in its textual form
    pub fn expect_principal(self) -> Result<String> {
        match self {
            ClarityValue::PrincipalStandard(p) => Ok(p.to_address()),
            ClarityValue::PrincipalContract(p, name) => Ok(format!("{}.{}", p, name)),
            other => Err(Error::type_mismatch("principal", other.type_name())),
        }
    }

    pub fn expect_tuple(self) -> Result<ClarityTuple> {
        match self {
            ClarityValue::Tuple(t) => Ok(t),
            other => Err(Error::type_mismatch("tuple", other.type_name())),
        }
    }

    pub fn expect_list(self) -> Result<Vec<ClarityValue>> {
        match self {
            ClarityValue::List(items) => Ok(items),
            other => Err(Error::type_mismatch("list", other.type_name())),
        }
    }

    pub fn expect_optional(self) -> Result<Option<ClarityValue>> {
        match self {
            ClarityValue::OptionalSome(inner) => Ok(Some(*inner)),
            ClarityValue::OptionalNone => Ok(None),
            other => Err(Error::type_mismatch("optional", other.type_name())),
        }
    }

    /// Unwrap `(ok ...)`; `(err ...)` becomes a contract error carrying its repr
    pub fn expect_ok(self) -> Result<ClarityValue> {
        match self {
            ClarityValue::ResponseOk(inner) => Ok(*inner),
            ClarityValue::ResponseErr(inner) => {
                Err(Error::contract(inner.repr()).with_response_type("response-err"))
            }
            other => Err(Error::type_mismatch("response", other.type_name())),
        }
    }

    /// Strip a `(ok ...)` wrapper if present, leaving other values untouched
    pub fn peel_ok(self) -> ClarityValue {
        match self {
            ClarityValue::ResponseOk(inner) => *inner,
            other => other,
        }
    }

    /// Clarity repr (`u42`, `(some 'SP...)`, `(err u131)`)
    pub fn repr(&self) -> String {
        match self {
            ClarityValue::Int(v) => v.to_string(),
            ClarityValue::UInt(v) => format!("u{}", v),
            ClarityValue::Bool(v) => v.to_string(),
            ClarityValue::Buffer(bytes) => format!("0x{}", hex::encode(bytes)),
            ClarityValue::PrincipalStandard(p) => format!("'{}", p),
            ClarityValue::PrincipalContract(p, name) => format!("'{}.{}", p, name),
            ClarityValue::OptionalSome(inner) => format!("(some {})", inner.repr()),
            ClarityValue::OptionalNone => "none".to_string(),
            ClarityValue::ResponseOk(inner) => format!("(ok {})", inner.repr()),
            ClarityValue::ResponseErr(inner) => format!("(err {})", inner.repr()),
            ClarityValue::Tuple(tuple) => {
                let fields: Vec<String> = tuple
                    .0
                    .iter()
                    .map(|(k, v)| format!("({} {})", k, v.repr()))
                    .collect();
                format!("(tuple {})", fields.join(" "))
            }
            ClarityValue::List(items) => {
                let items: Vec<String> = items.iter().map(|v| v.repr()).collect();
                format!("(list {})", items.join(" "))
            }
            ClarityValue::StringAscii(s) => format!("{:?}", s),
            ClarityValue::StringUtf8(s) => format!("u{:?}", s),
        }
    }
}

impl fmt::Display for ClarityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

/// Tuple fields, kept sorted by name as the wire format requires
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClarityTuple(pub BTreeMap<String, ClarityValue>);

impl ClarityTuple {
    /// Remove a required field
    pub fn take(&mut self, name: &str) -> Result<ClarityValue> {
        self.0
            .remove(name)
            .ok_or_else(|| Error::unexpected(format!("tuple is missing field {:?}", name)).with_response_type("tuple"))
    }

    /// Remove an `(optional ...)` field; an absent field counts as `none`
    pub fn take_optional(&mut self, name: &str) -> Result<Option<ClarityValue>> {
        match self.0.remove(name) {
            Some(value) => value.expect_optional(),
            None => Ok(None),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClarityValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn write_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn write_standard(out: &mut Vec<u8>, p: &StandardPrincipal) {
    out.push(p.version);
    out.extend_from_slice(&p.hash160);
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::unexpected(format!(
                "truncated value: wanted {} bytes at offset {}",
                n, self.pos
            ))),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn array16(&mut self) -> Result<[u8; 16]> {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(self.take(16)?);
        Ok(buf)
    }

    fn standard(&mut self) -> Result<StandardPrincipal> {
        let version = self.u8()?;
        let mut hash160 = [0u8; 20];
        hash160.copy_from_slice(self.take(20)?);
        Ok(StandardPrincipal { version, hash160 })
    }

    fn text(&mut self, len: usize, tag: &str) -> Result<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::unexpected(format!("invalid {} bytes: {}", tag, e)).with_response_type(tag))
    }

    fn read_value(&mut self, depth: usize) -> Result<ClarityValue> {
        if depth > MAX_DEPTH {
            return Err(Error::unexpected("value nesting too deep"));
        }

        let tag = self.u8()?;
        let value = match tag {
            TAG_INT => ClarityValue::Int(i128::from_be_bytes(self.array16()?)),
            TAG_UINT => ClarityValue::UInt(u128::from_be_bytes(self.array16()?)),
            TAG_BUFFER => {
                let len = self.u32()? as usize;
                ClarityValue::Buffer(self.take(len)?.to_vec())
            }
            TAG_TRUE => ClarityValue::Bool(true),
            TAG_FALSE => ClarityValue::Bool(false),
            TAG_PRINCIPAL_STANDARD => ClarityValue::PrincipalStandard(self.standard()?),
            TAG_PRINCIPAL_CONTRACT => {
                let issuer = self.standard()?;
                let len = self.u8()? as usize;
                let name = self.text(len, "principal-contract")?;
                ClarityValue::PrincipalContract(issuer, name)
            }
            TAG_RESPONSE_OK => ClarityValue::ok(self.read_value(depth + 1)?),
            TAG_RESPONSE_ERR => ClarityValue::err(self.read_value(depth + 1)?),
            TAG_NONE => ClarityValue::OptionalNone,
            TAG_SOME => ClarityValue::some(self.read_value(depth + 1)?),
            TAG_LIST => {
                let count = self.u32()? as usize;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                ClarityValue::List(items)
            }
            TAG_TUPLE => {
                let count = self.u32()? as usize;
                let mut fields = BTreeMap::new();
                for _ in 0..count {
                    let len = self.u8()? as usize;
                    let name = self.text(len, "tuple")?;
                    let value = self.read_value(depth + 1)?;
                    fields.insert(name, value);
                }
                ClarityValue::Tuple(ClarityTuple(fields))
            }
            TAG_STRING_ASCII => {
                let len = self.u32()? as usize;
                ClarityValue::StringAscii(self.text(len, "string-ascii")?)
            }
            TAG_STRING_UTF8 => {
                let len = self.u32()? as usize;
                ClarityValue::StringUtf8(self.text(len, "string-utf8")?)
            }
            other => {
                return Err(Error::unexpected(format!("unknown type tag 0x{:02x}", other))
                    .with_response_type(format!("0x{:02x}", other)))
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const ALICE: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";

    #[test]
    fn test_uint_wire_format() {
        let hex = ClarityValue::uint(42).to_hex();
        assert_eq!(hex, "0x010000000000000000000000000000002a");
        assert_eq!(ClarityValue::from_hex(&hex).unwrap(), ClarityValue::UInt(42));
    }

    #[test]
    fn test_large_uint_is_exact() {
        let big = u128::MAX - 1;
        let decoded = ClarityValue::deserialize(&ClarityValue::uint(big).serialize()).unwrap();
        assert_eq!(decoded.expect_uint().unwrap(), big);
    }

    #[test]
    fn test_negative_int() {
        let bytes = ClarityValue::int(-7).serialize();
        assert_eq!(bytes[0], 0x00);
        assert_eq!(ClarityValue::deserialize(&bytes).unwrap(), ClarityValue::Int(-7));
    }

    #[test]
    fn test_nested_owner_response() {
        let value = ClarityValue::ok(ClarityValue::some(ClarityValue::principal(ALICE).unwrap()));
        let decoded = ClarityValue::from_hex(&value.to_hex()).unwrap();
        let owner = decoded.expect_ok().unwrap().expect_optional().unwrap().unwrap();
        assert_eq!(owner.expect_principal().unwrap(), ALICE);
    }

    #[test]
    fn test_tuple_fields_sorted_on_wire() {
        let value = ClarityValue::tuple([
            ("namespace", ClarityValue::buffer(b"btc".to_vec())),
            ("name", ClarityValue::buffer(b"alice".to_vec())),
        ]);
        let bytes = value.serialize();
        // tag, count, then the first name must be "name" (sorted before "namespace")
        assert_eq!(&bytes[5..10], &[4, b'n', b'a', b'm', b'e']);
        assert_eq!(ClarityValue::deserialize(&bytes).unwrap(), value);
    }

    #[test]
    fn test_contract_principal_wire() {
        let text = format!("{}.zonefile-resolver", ALICE);
        let value = ClarityValue::principal(&text).unwrap();
        assert_eq!(value.type_name(), "principal-contract");
        let decoded = ClarityValue::deserialize(&value.serialize()).unwrap();
        assert_eq!(decoded.expect_principal().unwrap(), text);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let err = ClarityValue::from_hex("0x42").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedResponse);
        assert_eq!(err.details().response_type.as_deref(), Some("0x42"));
    }

    #[test]
    fn test_truncated_and_trailing() {
        assert!(ClarityValue::from_hex("0x0100").is_err());
        let mut bytes = ClarityValue::bool(true).serialize();
        bytes.push(0);
        assert!(ClarityValue::deserialize(&bytes).is_err());
    }

    #[test]
    fn test_err_becomes_contract_error() {
        let err = ClarityValue::err(ClarityValue::uint(131)).expect_ok().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractError);
        assert_eq!(err.message(), "u131");
    }

    #[test]
    fn test_mismatch_reports_tag() {
        let err = ClarityValue::bool(false).expect_uint().unwrap_err();
        assert_eq!(err.details().response_type.as_deref(), Some("false"));
    }

    #[test]
    fn test_name_buffer_charset() {
        assert!(ClarityValue::name_buffer("alice-01").is_ok());
        assert!(ClarityValue::name_buffer("Alice").is_err());
        assert!(ClarityValue::name_buffer("ålice").is_err());
    }

    #[test]
    fn test_repr() {
        let value = ClarityValue::ok(ClarityValue::tuple([
            ("owner", ClarityValue::OptionalNone),
            ("renewal", ClarityValue::uint(9)),
        ]));
        assert_eq!(value.repr(), "(ok (tuple (owner none) (renewal u9)))");
        assert_eq!(ClarityValue::StringUtf8("hi".into()).repr(), "u\"hi\"");
    }

    #[test]
    fn test_depth_limit() {
        let mut bytes = vec![TAG_SOME; MAX_DEPTH + 2];
        bytes.push(TAG_NONE);
        assert!(ClarityValue::deserialize(&bytes).is_err());
    }
}
