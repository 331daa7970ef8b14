//! The dynamically typed value stored under each key.
//!
//! Numeric variants are stored inline; anything else is boxed behind
//! `Any` so the cache can hold opaque payloads without a generic type
//! parameter (spec.md §9: "a tagged variant over supported numeric types
//! plus an opaque 'other' tag").

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;

/// A value stored in the cache.
#[derive(Clone)]
pub enum Value {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    Usize(usize),
    F32(f32),
    F64(f64),
    /// Any non-numeric payload, type-erased.
    Other(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I8(v) => write!(f, "Value::I8({v})"),
            Value::I16(v) => write!(f, "Value::I16({v})"),
            Value::I32(v) => write!(f, "Value::I32({v})"),
            Value::I64(v) => write!(f, "Value::I64({v})"),
            Value::Isize(v) => write!(f, "Value::Isize({v})"),
            Value::U8(v) => write!(f, "Value::U8({v})"),
            Value::U16(v) => write!(f, "Value::U16({v})"),
            Value::U32(v) => write!(f, "Value::U32({v})"),
            Value::U64(v) => write!(f, "Value::U64({v})"),
            Value::Usize(v) => write!(f, "Value::Usize({v})"),
            Value::F32(v) => write!(f, "Value::F32({v})"),
            Value::F64(v) => write!(f, "Value::F64({v})"),
            Value::Other(_) => write!(f, "Value::Other(..)"),
        }
    }
}

macro_rules! from_numeric {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

from_numeric!(i8, I8);
from_numeric!(i16, I16);
from_numeric!(i32, I32);
from_numeric!(i64, I64);
from_numeric!(isize, Isize);
from_numeric!(u8, U8);
from_numeric!(u16, U16);
from_numeric!(u32, U32);
from_numeric!(u64, U64);
from_numeric!(usize, Usize);
from_numeric!(f32, F32);
from_numeric!(f64, F64);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::opaque(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::opaque(v)
    }
}

impl Value {
    /// Wraps an arbitrary `Send + Sync + 'static` payload as an opaque value.
    pub fn opaque<T: Any + Send + Sync + 'static>(v: T) -> Self {
        Value::Other(Arc::new(v))
    }

    /// Returns a human-readable name of the stored type, for error messages.
    fn type_name(&self) -> &'static str {
        match self {
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Isize(_) => "isize",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::Usize(_) => "usize",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Other(_) => "opaque",
        }
    }

    /// Adds `delta` to the stored numeric value in place, wrapping on
    /// overflow per the stored type's natural modular arithmetic.
    ///
    /// Errors with [`CacheError::NotANumber`] for `Other` values.
    pub fn increment(&mut self, key: &str, delta: i64) -> Result<(), CacheError> {
        match self {
            Value::I8(v) => *v = v.wrapping_add(delta as i8),
            Value::I16(v) => *v = v.wrapping_add(delta as i16),
            Value::I32(v) => *v = v.wrapping_add(delta as i32),
            Value::I64(v) => *v = v.wrapping_add(delta),
            Value::Isize(v) => *v = v.wrapping_add(delta as isize),
            Value::U8(v) => *v = v.wrapping_add(delta as u8),
            Value::U16(v) => *v = v.wrapping_add(delta as u16),
            Value::U32(v) => *v = v.wrapping_add(delta as u32),
            Value::U64(v) => *v = v.wrapping_add(delta as u64),
            Value::Usize(v) => *v = v.wrapping_add(delta as usize),
            Value::F32(v) => *v += delta as f32,
            Value::F64(v) => *v += delta as f64,
            Value::Other(_) => {
                return Err(CacheError::NotANumber {
                    key: key.to_string(),
                    type_name: self.type_name(),
                });
            }
        }
        Ok(())
    }

    /// Subtracts `delta` from the stored numeric value in place.
    ///
    /// For unsigned types, a `delta` greater than the current value fails
    /// with [`CacheError::NegativeOverflow`] and leaves the value
    /// unchanged. Signed and floating-point decrement are unchecked and
    /// wrap/underflow per their natural arithmetic, matching
    /// [`Value::increment`].
    pub fn decrement(&mut self, key: &str, delta: i64) -> Result<(), CacheError> {
        macro_rules! checked_unsigned {
            ($v:expr, $ty:ty) => {{
                let delta = delta as $ty;
                if delta > *$v {
                    return Err(CacheError::NegativeOverflow { key: key.to_string() });
                }
                *$v -= delta;
            }};
        }

        match self {
            Value::I8(v) => *v = v.wrapping_sub(delta as i8),
            Value::I16(v) => *v = v.wrapping_sub(delta as i16),
            Value::I32(v) => *v = v.wrapping_sub(delta as i32),
            Value::I64(v) => *v = v.wrapping_sub(delta),
            Value::Isize(v) => *v = v.wrapping_sub(delta as isize),
            Value::U8(v) => checked_unsigned!(v, u8),
            Value::U16(v) => checked_unsigned!(v, u16),
            Value::U32(v) => checked_unsigned!(v, u32),
            Value::U64(v) => checked_unsigned!(v, u64),
            Value::Usize(v) => checked_unsigned!(v, usize),
            Value::F32(v) => *v -= delta as f32,
            Value::F64(v) => *v -= delta as f64,
            Value::Other(_) => {
                return Err(CacheError::NotANumber {
                    key: key.to_string(),
                    type_name: self.type_name(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_wraps_signed() {
        let mut v = Value::from(127i8);
        v.increment("k", 1).unwrap();
        assert!(matches!(v, Value::I8(-128)));
    }

    #[test]
    fn increment_wraps_unsigned() {
        let mut v = Value::from(255u8);
        v.increment("k", 1).unwrap();
        assert!(matches!(v, Value::U8(0)));
    }

    #[test]
    fn decrement_unsigned_underflow_errors_and_leaves_value() {
        let mut v = Value::from(0u8);
        let err = v.decrement("k", 1).unwrap_err();
        assert!(matches!(err, CacheError::NegativeOverflow { .. }));
        assert!(matches!(v, Value::U8(0)));
    }

    #[test]
    fn decrement_signed_underflow_wraps() {
        let mut v = Value::from(i8::MIN);
        v.decrement("k", 1).unwrap();
        assert!(matches!(v, Value::I8(i8::MAX)));
    }

    #[test]
    fn increment_on_opaque_is_not_a_number() {
        let mut v = Value::opaque("hello".to_string());
        let err = v.increment("k", 1).unwrap_err();
        assert!(matches!(err, CacheError::NotANumber { .. }));
    }

    #[test]
    fn float_increment_and_decrement() {
        let mut v = Value::from(1.5f64);
        v.increment("k", 2).unwrap();
        assert!(matches!(v, Value::F64(x) if (x - 3.5).abs() < f64::EPSILON));
        v.decrement("k", 1).unwrap();
        assert!(matches!(v, Value::F64(x) if (x - 2.5).abs() < f64::EPSILON));
    }
}
