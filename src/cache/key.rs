//! Key normalization.
//!
//! A key is either a scalar or an ordered sequence of scalars. Both end up as
//! a list of string segments which a [`KeyEncoding`] turns into the single
//! string used as map key. A scalar is a one-segment sequence, so `"x"` and
//! `["x"]` address the same slot.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator placed between segments.
pub const SEPARATOR: &str = "|";

/// A scalar usable as (part of) a cache key.
pub trait KeySegment {
    /// String representation of the scalar.
    fn segment(&self) -> Cow<'_, str>;
}

impl KeySegment for str {
    fn segment(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl KeySegment for String {
    fn segment(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl KeySegment for Cow<'_, str> {
    fn segment(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_ref())
    }
}

impl<T: KeySegment + ?Sized> KeySegment for &T {
    fn segment(&self) -> Cow<'_, str> {
        (**self).segment()
    }
}

macro_rules! display_segment {
    ($($t:ty),* $(,)?) => {
        $(
            impl KeySegment for $t {
                fn segment(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

display_segment!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

/// Anything that can address a cache slot.
///
/// Implemented for every [`KeySegment`] scalar, for slices, vectors and arrays
/// of scalars, and for tuples of up to six scalars.
pub trait CacheKey {
    /// Ordered string segments of the key.
    fn segments(&self) -> Vec<Cow<'_, str>>;
}

macro_rules! scalar_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheKey for $t {
                fn segments(&self) -> Vec<Cow<'_, str>> {
                    vec![self.segment()]
                }
            }
        )*
    };
}

scalar_key!(
    str, String, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    f32, f64,
);

impl<T: KeySegment> CacheKey for [T] {
    fn segments(&self) -> Vec<Cow<'_, str>> {
        self.iter().map(KeySegment::segment).collect()
    }
}

impl<T: KeySegment> CacheKey for Vec<T> {
    fn segments(&self) -> Vec<Cow<'_, str>> {
        self.as_slice().segments()
    }
}

impl<T: KeySegment, const N: usize> CacheKey for [T; N] {
    fn segments(&self) -> Vec<Cow<'_, str>> {
        self.as_slice().segments()
    }
}

macro_rules! tuple_key {
    ($($name:ident),+) => {
        impl<$($name: KeySegment),+> CacheKey for ($($name,)+) {
            #[allow(non_snake_case)]
            fn segments(&self) -> Vec<Cow<'_, str>> {
                let ($($name,)+) = self;
                vec![$($name.segment()),+]
            }
        }
    };
}

tuple_key!(A);
tuple_key!(A, B);
tuple_key!(A, B, C);
tuple_key!(A, B, C, D);
tuple_key!(A, B, C, D, E);
tuple_key!(A, B, C, D, E, F);

/// How segments are combined into the normalized key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyEncoding {
    /// `<byte_len>:<segment>` per segment, joined by `|`. Unambiguous.
    #[default]
    LengthPrefixed,

    /// Segments joined by `|` without escaping.
    ///
    /// `["a", "b"]` and `["a|b"]` both become `a|b` and share a slot.
    Joined,

    /// Hex SHA-256 of the length-prefixed form.
    Hashed,
}

impl KeyEncoding {
    /// All encodings, in declaration order.
    pub const ALL: [KeyEncoding; 3] = [Self::LengthPrefixed, Self::Joined, Self::Hashed];

    /// Normalizes a key to its string form.
    pub fn normalize<K: CacheKey + ?Sized>(self, key: &K) -> String {
        let segments = key.segments();
        match self {
            Self::LengthPrefixed => length_prefixed(&segments),
            Self::Joined => segments.join(SEPARATOR),
            Self::Hashed => {
                let mut hasher = Sha256::new();
                hasher.update(length_prefixed(&segments).as_bytes());
                hex::encode(hasher.finalize())
            }
        }
    }

    /// Configuration name of the encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LengthPrefixed => "length_prefixed",
            Self::Joined => "joined",
            Self::Hashed => "hashed",
        }
    }
}

impl fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyEncoding {
    type Err = crate::RuntimeCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == name)
            .ok_or_else(|| crate::RuntimeCacheError::config(format!("unknown key encoding '{}'", s)))
    }
}

fn length_prefixed(segments: &[Cow<'_, str>]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push_str(SEPARATOR);
        }
        out.push_str(&segment.len().to_string());
        out.push(':');
        out.push_str(segment);
    }
    out
}

/// Normalizes a key with the default encoding.
pub fn normalize_key<K: CacheKey + ?Sized>(key: &K) -> String {
    KeyEncoding::default().normalize(key)
}
