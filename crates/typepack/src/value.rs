//! [`Value`]: everything the codec can carry.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::host::{BigInt, ErrorValue, HostObject, HostRef, Long, RegExp};

/// A value the codec encodes and decodes.
///
/// The first nine variants have a native MessagePack form. The rest are host
/// types with no wire representation of their own; they travel as extensions
/// through the serializer's type registry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absence of a value, carried by the type-0 extension sentinel.
    Undefined,
    Null,
    Bool(bool),
    /// Exact below ±(2^53 - 1); larger magnitudes are written as a float.
    Integer(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// Generic associative object: ordered string-keyed pairs.
    Object(Vec<(String, Value)>),
    /// Calendar timestamp with millisecond precision.
    Date(DateTime<Utc>),
    /// Associative map with arbitrary keys, in insertion order.
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    RegExp(RegExp),
    BigInt(BigInt),
    Long(Long),
    /// Boxed to keep `Value` small.
    Error(Box<ErrorValue>),
    /// Application-defined object, encoded by a user registration.
    Host(HostRef),
}

impl Value {
    /// The runtime type name reported when no encoding is available.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "Date",
            Value::Map(_) => "Map",
            Value::Set(_) => "Set",
            Value::RegExp(_) => "RegExp",
            Value::BigInt(_) => "BigInt",
            Value::Long(_) => "Long",
            Value::Error(_) => "Error",
            Value::Host(host) => host.type_name(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float; integers convert with the usual rounding.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Wraps an application-defined object.
    pub fn from_host<T: HostObject>(object: T) -> Self {
        Value::Host(HostRef::new(object))
    }

    /// Looks up a key of a generic object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Integer(n as i64)
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(date: DateTime<Utc>) -> Self {
        Value::Date(date)
    }
}

impl From<RegExp> for Value {
    fn from(re: RegExp) -> Self {
        Value::RegExp(re)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::BigInt(n)
    }
}

impl From<Long> for Value {
    fn from(n: Long) -> Self {
        Value::Long(n)
    }
}

impl From<ErrorValue> for Value {
    fn from(err: ErrorValue) -> Self {
        Value::Error(Box::new(err))
    }
}

impl From<HostRef> for Value {
    fn from(host: HostRef) -> Self {
        Value::Host(host)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// JSON rendering of a value.
///
/// Host types map onto their closest JSON shape: dates become RFC 3339
/// strings, maps become arrays of `[key, value]` pairs, sets become arrays,
/// regular expressions become `/source/flags`, and errors become objects.
/// `Undefined`, non-finite floats and opaque host objects become `null`.
impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        use serde_json::Value as Json;
        match v {
            Value::Undefined | Value::Null | Value::Host(_) => Json::Null,
            Value::Bool(b) => Json::Bool(b),
            Value::Integer(i) => Json::from(i),
            Value::Float(f) => serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s),
            Value::Bytes(b) => Json::Array(b.into_iter().map(Json::from).collect()),
            Value::Array(arr) => Json::Array(arr.into_iter().map(Json::from).collect()),
            Value::Object(pairs) => {
                Json::Object(pairs.into_iter().map(|(k, v)| (k, Json::from(v))).collect())
            }
            Value::Date(date) => Json::String(date.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Value::Map(pairs) => Json::Array(
                pairs
                    .into_iter()
                    .map(|(k, v)| Json::Array(vec![Json::from(k), Json::from(v)]))
                    .collect(),
            ),
            Value::Set(items) => Json::Array(items.into_iter().map(Json::from).collect()),
            Value::RegExp(re) => Json::String(format!("/{}/{}", re.source, re.flags)),
            Value::BigInt(n) => Json::String(n.to_string()),
            Value::Long(Long::Signed(n)) => Json::from(n),
            Value::Long(Long::Unsigned(n)) => Json::from(n),
            Value::Error(err) => {
                let err = *err;
                let mut obj = serde_json::Map::new();
                obj.insert("name".into(), Json::String(err.name));
                obj.insert("message".into(), Json::String(err.message));
                if let Some(stack) = err.stack {
                    obj.insert("stack".into(), Json::String(stack));
                }
                for (k, v) in err.fields {
                    obj.insert(k, Json::from(v));
                }
                Json::Object(obj)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ErrorKind;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn from_json_keeps_structure() {
        let value = Value::from(json!({"a": [1, -2, 2.5, "x", null, true]}));
        let expected = Value::Object(vec![(
            "a".into(),
            Value::Array(vec![
                Value::Integer(1),
                Value::Integer(-2),
                Value::Float(2.5),
                Value::Str("x".into()),
                Value::Null,
                Value::Bool(true),
            ]),
        )]);
        assert_eq!(value, expected);
    }

    #[test]
    fn from_json_large_unsigned_becomes_float() {
        let value = Value::from(json!(u64::MAX));
        assert_eq!(value, Value::Float(u64::MAX as f64));
    }

    #[test]
    fn to_json_renders_host_types() {
        let date = Utc.timestamp_millis_opt(0).unwrap();
        let value = Value::Array(vec![
            Value::Undefined,
            Value::Date(date),
            Value::Map(vec![(Value::Integer(1), Value::from("one"))]),
            Value::Set(vec![Value::Bool(false)]),
            Value::RegExp(RegExp::new("a+", "gi")),
            Value::BigInt("123456789012345678901234567890".parse().unwrap()),
            Value::Long(Long::Unsigned(u64::MAX)),
            Value::Bytes(vec![1, 2]),
            Value::Float(f64::INFINITY),
        ]);
        assert_eq!(
            serde_json::Value::from(value),
            json!([
                null,
                "1970-01-01T00:00:00.000Z",
                [[1, "one"]],
                [false],
                "/a+/gi",
                "123456789012345678901234567890",
                u64::MAX,
                [1, 2],
                null
            ])
        );
    }

    #[test]
    fn to_json_renders_errors_as_objects() {
        let err = ErrorValue::new(ErrorKind::RangeError, "too big")
            .with_stack("at f")
            .with_field("limit", Value::Integer(10));
        assert_eq!(
            serde_json::Value::from(Value::from(err)),
            json!({"name": "RangeError", "message": "too big", "stack": "at f", "limit": 10})
        );
    }

    #[test]
    fn accessors() {
        let obj = Value::from(json!({"k": "v", "n": 3}));
        assert_eq!(obj.get("k").and_then(Value::as_str), Some("v"));
        assert_eq!(obj.get("n").and_then(Value::as_i64), Some(3));
        assert_eq!(obj.get("n").and_then(Value::as_f64), Some(3.0));
        assert_eq!(obj.get("missing"), None);
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert!(Value::Undefined.is_undefined());
        assert!(Value::Null.is_null());
        assert_eq!(Value::Integer(1).type_name(), "number");
        assert_eq!(Value::Set(vec![]).type_name(), "Set");
    }
}
