use std::convert::TryInto;
use std::fmt;
use thiserror::Error;

pub use types::{CharType, DataType};

mod types;

///
/// Wire format (big-endian):
///
///     Int       | i32 |
///     Char(w)   | len: u32 | bytes, zero-padded to w |
///
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Datum {
    Int(i32),
    Char(String),
}

impl Datum {
    pub fn matches_type(&self, data_type: &DataType) -> bool {
        matches!(
            (self, data_type),
            (Self::Int(_), DataType::Int) | (Self::Char(_), DataType::Char(_))
        )
    }
    pub fn into_bytes(self, data_type: &DataType) -> Result<Vec<u8>, DatumError> {
        match (self, data_type) {
            (Self::Int(v), DataType::Int) => Ok(v.to_be_bytes().to_vec()),
            (Self::Char(v), DataType::Char(char_type)) => {
                if v.len() > char_type.width {
                    return Err(DatumError::CharTooLong(v.len(), char_type.width));
                }
                let mut bytes = (v.len() as u32).to_be_bytes().to_vec();
                bytes.extend_from_slice(v.as_bytes());
                bytes.resize(4 + char_type.width, 0u8);
                Ok(bytes)
            }
            (datum, data_type) => Err(DatumError::TypeMismatch(datum, *data_type)),
        }
    }
    /// Readers trim at the declared length; the zero padding past it is
    /// not part of the value.
    pub fn from_bytes(data_type: &DataType, bytes: &[u8]) -> Result<Self, DatumError> {
        let prefix: [u8; 4] = bytes
            .get(0..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(DatumError::ShortRead)?;
        match data_type {
            DataType::Int => Ok(Self::Int(i32::from_be_bytes(prefix))),
            DataType::Char(char_type) => {
                let len = u32::from_be_bytes(prefix) as usize;
                if len > char_type.width || 4 + char_type.width > bytes.len() {
                    return Err(DatumError::ShortRead);
                }
                let value = std::str::from_utf8(&bytes[4..4 + len])?;
                Ok(Self::Char(value.to_string()))
            }
        }
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Self::Char(v.to_string())
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Char(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Error, Debug)]
pub enum DatumError {
    #[error("datum {0:?} does not match type {1}")]
    TypeMismatch(Datum, DataType),
    #[error("char value of {0} bytes exceeds column width {1}")]
    CharTooLong(usize, usize),
    #[error("short read while decoding datum")]
    ShortRead,
    #[error("invalid utf-8 in char datum: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}
