//! Solidity ABI encoding for the value shapes the poll contract uses.
//!
//! Covers `uint256` (values up to `u128`), `address`, `bool`, `string`,
//! dynamic arrays and tuples, which is every parameter and return type in
//! the poll contract. Layout follows the standard head/tail scheme: static
//! values inline, dynamic values behind a 32-byte offset relative to the
//! start of the enclosing sequence.

use chainvote_types::Address;
use sha3::{Digest, Keccak256};
use thiserror::Error;

const WORD: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AbiError {
    #[error("data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("integer does not fit: {0}")]
    Overflow(String),

    #[error("invalid bool word")]
    InvalidBool,

    #[error("string is not UTF-8")]
    InvalidUtf8,

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// A decoded or to-be-encoded ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address(Address),
    Bool(bool),
    String(String),
    Array(Vec<Token>),
    Tuple(Vec<Token>),
}

/// The shape to decode against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Uint,
    Address,
    Bool,
    String,
    Array(Box<ParamType>),
    Tuple(Vec<ParamType>),
}

impl Token {
    fn name(&self) -> &'static str {
        match self {
            Token::Uint(_) => "uint",
            Token::Address(_) => "address",
            Token::Bool(_) => "bool",
            Token::String(_) => "string",
            Token::Array(_) => "array",
            Token::Tuple(_) => "tuple",
        }
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Array(_) => true,
            Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    fn mismatch(&self, expected: &'static str) -> AbiError {
        AbiError::TypeMismatch {
            expected,
            found: self.name(),
        }
    }

    pub fn into_uint(self) -> Result<u128, AbiError> {
        match self {
            Token::Uint(v) => Ok(v),
            other => Err(other.mismatch("uint")),
        }
    }

    pub fn into_u64(self) -> Result<u64, AbiError> {
        let v = self.into_uint()?;
        u64::try_from(v).map_err(|_| AbiError::Overflow(v.to_string()))
    }

    pub fn into_address(self) -> Result<Address, AbiError> {
        match self {
            Token::Address(a) => Ok(a),
            other => Err(other.mismatch("address")),
        }
    }

    pub fn into_bool(self) -> Result<bool, AbiError> {
        match self {
            Token::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn into_string(self) -> Result<String, AbiError> {
        match self {
            Token::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn into_array(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Token::Array(items) => Ok(items),
            other => Err(other.mismatch("array")),
        }
    }

    pub fn into_tuple(self) -> Result<Vec<Token>, AbiError> {
        match self {
            Token::Tuple(items) => Ok(items),
            other => Err(other.mismatch("tuple")),
        }
    }
}

impl ParamType {
    fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Array(_) => true,
            ParamType::Tuple(members) => members.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Inline size of a static type.
    fn static_len(&self) -> usize {
        match self {
            ParamType::Tuple(members) => members.iter().map(ParamType::static_len).sum(),
            _ => WORD,
        }
    }
}

/// First four bytes of keccak256 of a canonical function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// keccak256 of a canonical event signature (log topic 0).
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Selector followed by the encoded arguments.
pub fn encode_call(selector: [u8; 4], args: &[Token]) -> Vec<u8> {
    let mut out = selector.to_vec();
    out.extend(encode(args));
    out
}

/// Encode a top-level argument or return list.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    encode_sequence(tokens)
}

fn uint_word(v: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&v.to_be_bytes());
    word
}

fn encode_sequence(tokens: &[Token]) -> Vec<u8> {
    let head_len: usize = tokens
        .iter()
        .map(|t| if t.is_dynamic() { WORD } else { static_token_len(t) })
        .sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
            tail.extend(encode_single(token));
        } else {
            head.extend(encode_single(token));
        }
    }
    head.extend(tail);
    head
}

fn static_token_len(token: &Token) -> usize {
    match token {
        Token::Tuple(items) => items.iter().map(static_token_len).sum(),
        _ => WORD,
    }
}

fn encode_single(token: &Token) -> Vec<u8> {
    match token {
        Token::Uint(v) => uint_word(*v).to_vec(),
        Token::Bool(b) => uint_word(u128::from(*b)).to_vec(),
        Token::Address(a) => {
            let mut word = vec![0u8; WORD];
            word[12..].copy_from_slice(a.as_bytes());
            word
        }
        Token::String(s) => {
            let bytes = s.as_bytes();
            let mut out = uint_word(bytes.len() as u128).to_vec();
            out.extend_from_slice(bytes);
            out.resize(WORD + bytes.len().div_ceil(WORD) * WORD, 0);
            out
        }
        Token::Array(items) => {
            let mut out = uint_word(items.len() as u128).to_vec();
            out.extend(encode_sequence(items));
            out
        }
        Token::Tuple(items) => encode_sequence(items),
    }
}

/// Decode `data` as a top-level list of `types`.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    decode_sequence(types, data, 0)
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = advance(data, offset, WORD)?;
    Ok(&data[offset..end])
}

/// `offset + needed`, provided the result stays inside `data`.
fn advance(data: &[u8], offset: usize, needed: usize) -> Result<usize, AbiError> {
    offset
        .checked_add(needed)
        .filter(|end| *end <= data.len())
        .ok_or(AbiError::OutOfBounds {
            offset,
            needed,
            len: data.len(),
        })
}

fn read_uint(data: &[u8], offset: usize) -> Result<u128, AbiError> {
    let word = word_at(data, offset)?;
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow(format!("0x{}", hex::encode(word))));
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(low))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let v = read_uint(data, offset)?;
    usize::try_from(v).map_err(|_| AbiError::Overflow(v.to_string()))
}

fn decode_sequence(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut cursor = base;
    for ty in types {
        if ty.is_dynamic() {
            let relative = read_usize(data, cursor)?;
            let target = base.checked_add(relative).ok_or_else(|| AbiError::Overflow(relative.to_string()))?;
            tokens.push(decode_single(ty, data, target)?);
            cursor = advance(data, cursor, WORD)?;
        } else {
            tokens.push(decode_single(ty, data, cursor)?);
            cursor = advance(data, cursor, ty.static_len())?;
        }
    }
    Ok(tokens)
}

fn decode_single(ty: &ParamType, data: &[u8], at: usize) -> Result<Token, AbiError> {
    match ty {
        ParamType::Uint => Ok(Token::Uint(read_uint(data, at)?)),
        ParamType::Bool => match read_uint(data, at)? {
            0 => Ok(Token::Bool(false)),
            1 => Ok(Token::Bool(true)),
            _ => Err(AbiError::InvalidBool),
        },
        ParamType::Address => {
            let word = word_at(data, at)?;
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address::new(bytes)))
        }
        ParamType::String => {
            let len = read_usize(data, at)?;
            let start = advance(data, at, WORD)?;
            let end = advance(data, start, len)?;
            String::from_utf8(data[start..end].to_vec())
                .map(Token::String)
                .map_err(|_| AbiError::InvalidUtf8)
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let start = advance(data, at, WORD)?;
            // Every element takes at least one word; reject lengths the data cannot hold.
            advance(data, start, len.saturating_mul(WORD))?;
            let types = vec![(**inner).clone(); len];
            decode_sequence(&types, data, start).map(Token::Array)
        }
        ParamType::Tuple(members) => decode_sequence(members, data, at).map(Token::Tuple),
    }
}

/// `0x`-prefixed lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse `0x`-prefixed hex (an empty `0x` is zero bytes).
pub fn from_hex(s: &str) -> Result<Vec<u8>, AbiError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| AbiError::InvalidHex(format!("{s}: {e}")))
}
