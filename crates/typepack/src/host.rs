//! Host types that travel as extensions.
//!
//! None of these have a native MessagePack representation. The built-in
//! bindings in [`crate::builtins`] give each one a private extension id, and
//! [`HostObject`] lets applications bring their own.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::Value;

// ---------------------------------------------------------------------------
// Regular expressions
// ---------------------------------------------------------------------------

/// A regular expression carried as its source text and flag letters.
///
/// The pair is transported verbatim; [`RegExp::to_regex`] compiles it for
/// matching on this side of the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegExp {
    pub source: String,
    pub flags: String,
}

impl RegExp {
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }

    /// Compiles the expression.
    ///
    /// Flags `i`, `m`, `s` and `x` map onto the matching builder options.
    /// Flags with no counterpart in the `regex` crate (`g`, `y`, `u`, `d`,
    /// `v`) are ignored.
    pub fn to_regex(&self) -> Result<Regex, regex::Error> {
        let mut builder = RegexBuilder::new(&self.source);
        for flag in self.flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                _ => &mut builder,
            };
        }
        builder.build()
    }
}

impl From<&Regex> for RegExp {
    fn from(re: &Regex) -> Self {
        RegExp::new(re.as_str(), "")
    }
}

// ---------------------------------------------------------------------------
// Arbitrary-precision integers
// ---------------------------------------------------------------------------

/// Error returned when parsing a [`BigInt`] from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid decimal integer: {0:?}")]
pub struct ParseBigIntError(pub String);

/// An arbitrary-precision integer in canonical decimal form.
///
/// The codec only transports big integers, it does not do arithmetic on them,
/// so the digits are kept as text: an optional `-` followed by digits with no
/// leading zeros. Zero is always `"0"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BigInt(String);

impl BigInt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.starts_with('-')
    }

    /// Converts to `i128` when the value fits.
    pub fn to_i128(&self) -> Option<i128> {
        self.0.parse().ok()
    }
}

impl FromStr for BigInt {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseBigIntError(s.to_owned()));
        }
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(BigInt("0".to_owned()));
        }
        let canonical = if negative {
            format!("-{digits}")
        } else {
            digits.to_owned()
        };
        Ok(BigInt(canonical))
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! big_int_from {
    ($($t:ty),*) => {
        $(impl From<$t> for BigInt {
            fn from(n: $t) -> Self {
                BigInt(n.to_string())
            }
        })*
    };
}

big_int_from!(i8, i16, i32, i64, i128, u8, u16, u32, u64, u128);

// ---------------------------------------------------------------------------
// 64-bit integers
// ---------------------------------------------------------------------------

/// A full-precision 64-bit integer with explicit signedness.
///
/// Plain [`Value::Integer`] values beyond ±(2^53 - 1) fall back to a float on
/// the wire; a `Long` keeps every bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Long {
    Signed(i64),
    Unsigned(u64),
}

impl Long {
    pub fn is_unsigned(&self) -> bool {
        matches!(self, Long::Unsigned(_))
    }

    /// The two's complement bit pattern.
    pub fn to_bits(self) -> u64 {
        match self {
            Long::Signed(n) => n as u64,
            Long::Unsigned(n) => n,
        }
    }

    pub fn from_bits(bits: u64, unsigned: bool) -> Self {
        if unsigned {
            Long::Unsigned(bits)
        } else {
            Long::Signed(bits as i64)
        }
    }

    pub fn high(self) -> u32 {
        (self.to_bits() >> 32) as u32
    }

    pub fn low(self) -> u32 {
        self.to_bits() as u32
    }
}

impl fmt::Display for Long {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Long::Signed(n) => write!(f, "{n}"),
            Long::Unsigned(n) => write!(f, "{n}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Exceptions
// ---------------------------------------------------------------------------

/// Well-known exception kinds, each with a stable sub-type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ErrorKind {
    #[default]
    Error = 0,
    EvalError = 1,
    RangeError = 2,
    ReferenceError = 3,
    SyntaxError = 4,
    TypeError = 5,
    UriError = 6,
}

impl ErrorKind {
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Unknown ids fall back to the generic [`ErrorKind::Error`].
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => ErrorKind::EvalError,
            2 => ErrorKind::RangeError,
            3 => ErrorKind::ReferenceError,
            4 => ErrorKind::SyntaxError,
            5 => ErrorKind::TypeError,
            6 => ErrorKind::UriError,
            _ => ErrorKind::Error,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::EvalError => "EvalError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::ReferenceError => "ReferenceError",
            ErrorKind::SyntaxError => "SyntaxError",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::UriError => "URIError",
        }
    }
}

/// An exception object: kind, name, message, optional stack and any extra
/// fields attached to it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
    pub fields: Vec<(String, Value)>,
}

impl ErrorValue {
    /// Creates an exception whose name is the kind's name.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: kind.name().to_owned(),
            message: message.into(),
            stack: None,
            fields: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

// ---------------------------------------------------------------------------
// Application-defined host objects
// ---------------------------------------------------------------------------

/// An application type that can ride inside a [`Value`].
///
/// Implemented for every `Debug + PartialEq + Send + Sync + 'static` type.
/// Register a predicate that downcasts through [`HostRef::downcast_ref`] to
/// give the type an extension id.
pub trait HostObject: Any + fmt::Debug + Send + Sync {
    /// Short type name used in error messages.
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn eq_host(&self, other: &dyn HostObject) -> bool;
}

impl<T> HostObject for T
where
    T: Any + fmt::Debug + PartialEq + Send + Sync,
{
    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<T>();
        let base = full.split('<').next().unwrap_or(full);
        let start = base.rfind("::").map_or(0, |i| i + 2);
        &full[start..]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_host(&self, other: &dyn HostObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Shared handle to a [`HostObject`].
#[derive(Clone)]
pub struct HostRef(Arc<dyn HostObject>);

impl HostRef {
    pub fn new<T: HostObject>(object: T) -> Self {
        HostRef(Arc::new(object))
    }

    pub fn type_name(&self) -> &'static str {
        (*self.0).type_name()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.0).as_any().downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || (*self.0).eq_host(&*other.0)
    }
}
