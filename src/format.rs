//! Sample format tags and the registry that maps scalar element types onto them.
//!
//! Two lookups are offered. [`Sample::FORMAT`] resolves at compile time and is what the typed
//! read/write paths use. [`format_tag_of`] resolves any `'static` type at runtime through a static
//! `TypeId` table, so unsupported types fail with a proper error instead of a missing trait impl.
//! Registering a new scalar type means adding one `impl_sample!` line and one table entry.

use crate::error::StreamError;
use byteorder::{ByteOrder, NativeEndian};
use num_complex::Complex;
use std::{
    any::{TypeId, type_name},
    fmt,
    str::FromStr,
};
use thiserror::Error;

/// Canonical format strings understood by the device transport.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FormatTag {
    S8,
    S16,
    S32,
    U8,
    U16,
    U32,
    F32,
    F64,
}

impl FormatTag {
    pub const ALL: [FormatTag; 8] = [
        FormatTag::S8,
        FormatTag::S16,
        FormatTag::S32,
        FormatTag::U8,
        FormatTag::U16,
        FormatTag::U32,
        FormatTag::F32,
        FormatTag::F64,
    ];

    pub fn as_str(&self) -> &'static str {
        match *self {
            FormatTag::S8 => "S8",
            FormatTag::S16 => "S16",
            FormatTag::S32 => "S32",
            FormatTag::U8 => "U8",
            FormatTag::U16 => "U16",
            FormatTag::U32 => "U32",
            FormatTag::F32 => "F32",
            FormatTag::F64 => "F64",
        }
    }

    /// Size in bytes of one element of this format
    pub fn element_size(&self) -> usize {
        match *self {
            FormatTag::S8 | FormatTag::U8 => 1,
            FormatTag::S16 | FormatTag::U16 => 2,
            FormatTag::S32 | FormatTag::U32 | FormatTag::F32 => 4,
            FormatTag::F64 => 8,
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, PartialEq)]
#[error("\"{0}\" is not a known sample format")]
pub struct ParseFormatError(pub String);

impl FromStr for FormatTag {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatTag::ALL
            .iter()
            .find(|tag| tag.as_str() == s)
            .copied()
            .ok_or_else(|| ParseFormatError(s.to_owned()))
    }
}

/// A scalar element type that can be streamed as-is.
pub trait Sample: Copy + Default + Send + Sync + 'static {
    const FORMAT: FormatTag;

    /// Decodes one element from native-endian bytes. `bytes` holds at least
    /// `FORMAT.element_size()` bytes.
    fn read_ne(bytes: &[u8]) -> Self;
}

macro_rules! impl_sample {
    ($ty:ty, $tag:ident, $read:expr) => {
        impl Sample for $ty {
            const FORMAT: FormatTag = FormatTag::$tag;

            fn read_ne(bytes: &[u8]) -> Self {
                $read(bytes)
            }
        }
    };
}

impl_sample!(i8, S8, |b: &[u8]| b[0] as i8);
impl_sample!(i16, S16, NativeEndian::read_i16);
impl_sample!(i32, S32, NativeEndian::read_i32);
impl_sample!(u8, U8, |b: &[u8]| b[0]);
impl_sample!(u16, U16, NativeEndian::read_u16);
impl_sample!(u32, U32, NativeEndian::read_u32);
impl_sample!(f32, F32, NativeEndian::read_f32);
impl_sample!(f64, F64, NativeEndian::read_f64);

type TypeKey = fn() -> TypeId;

static SCALAR_FORMATS: [(TypeKey, FormatTag); 8] = [
    (TypeId::of::<i8>, FormatTag::S8),
    (TypeId::of::<i16>, FormatTag::S16),
    (TypeId::of::<i32>, FormatTag::S32),
    (TypeId::of::<u8>, FormatTag::U8),
    (TypeId::of::<u16>, FormatTag::U16),
    (TypeId::of::<u32>, FormatTag::U32),
    (TypeId::of::<f32>, FormatTag::F32),
    (TypeId::of::<f64>, FormatTag::F64),
];

// Complex types are recognized only to give a precise rejection.
static COMPLEX_FORMATS: [(TypeKey, &str); 8] = [
    (TypeId::of::<Complex<i8>>, "CS8"),
    (TypeId::of::<Complex<i16>>, "CS16"),
    (TypeId::of::<Complex<i32>>, "CS32"),
    (TypeId::of::<Complex<u8>>, "CU8"),
    (TypeId::of::<Complex<u16>>, "CU16"),
    (TypeId::of::<Complex<u32>>, "CU32"),
    (TypeId::of::<Complex<f32>>, "CF32"),
    (TypeId::of::<Complex<f64>>, "CF64"),
];

/// Returns the canonical tag of the element type `T`.
pub fn format_tag_of<T: 'static>() -> Result<FormatTag, StreamError> {
    let id = TypeId::of::<T>();

    if let Some((_, tag)) = SCALAR_FORMATS.iter().find(|(key, _)| key() == id) {
        return Ok(*tag);
    }

    let reason = match COMPLEX_FORMATS.iter().find(|(key, _)| key() == id) {
        Some((_, name)) => format!("complex format {name} is not supported"),
        None => "not a registered scalar sample type".to_owned(),
    };

    Err(StreamError::UnsupportedFormat {
        type_name: type_name::<T>(),
        reason,
    })
}
