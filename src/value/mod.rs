mod record;
pub mod serializer;

pub use record::Record;

use crate::error::TemplateError;
use crate::value::serializer::ValueSerializer;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Data a template can see.
///
/// Maps and lists are plain data; anything that exposes fields or zero-argument
/// methods to templates is wrapped as an [`Value::Object`] (see [`Record`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),

    /// Arbitrary-precision decimal number
    Decimal(Decimal),

    /// Date without time zone
    Date(NaiveDate),

    /// Time without date
    Time(NaiveTime),

    /// Date and time without time zone
    DateTime(NaiveDateTime),

    /// Date and time in UTC
    DateTimeUtc(DateTime<Utc>),

    /// Ordered list of values (e.g. arrays, tuples)
    List(Vec<Value>),

    /// Key-value map (e.g. serde structs, JSON objects)
    Map(HashMap<String, Value>),

    /// A record exposing fields and accessor methods
    Object(Arc<dyn Record>),
}

impl Value {
    /// Wraps a record so templates can reach its fields and methods.
    pub fn object<R: Record + 'static>(record: R) -> Self {
        Value::Object(Arc::new(record))
    }

    /// Converts any serde-serializable value; structs become [`Value::Map`].
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, TemplateError> {
        value.serialize(ValueSerializer)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Handlebars truthiness: `false`, null, numeric zero, the empty string and
    /// empty collections are falsy. Everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Str(s) => !s.is_empty(),
            Value::I64(n) => *n != 0,
            Value::U64(n) => *n != 0,
            Value::F64(n) => *n != 0.0 && !n.is_nan(),
            Value::Decimal(d) => !d.is_zero(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Date(_)
            | Value::Time(_)
            | Value::DateTime(_)
            | Value::DateTimeUtc(_)
            | Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// The string form a value takes when emitted into template output.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Str(s) => f.write_str(s),
            Value::I64(n) => write!(f, "{}", n),
            Value::U64(n) => write!(f, "{}", n),
            Value::F64(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Date(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::DateTimeUtc(dt) => write!(f, "{}", dt),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Map(map) => {
                // Sorted so that output stays deterministic.
                let sorted: BTreeMap<_, _> = map.iter().collect();
                f.write_str("{")?;
                for (i, (k, v)) in sorted.into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Object(record) => f.write_str(&record.to_text()),
        }
    }
}

/// Types that can be rendered by a template.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Types a helper argument can be converted into.
pub trait FromValue: Sized {
    fn from_value(v: Value) -> Result<Self, TemplateError>;
}

// --- scalars ---
macro_rules! impl_to_value_as {
    ($variant:ident, $as:ty, $($rust_type:ty),+) => {
        $(
            impl ToValue for $rust_type {
                fn to_value(&self) -> Value {
                    Value::$variant(*self as $as)
                }
            }
        )+
    };
}

macro_rules! impl_from_value_int {
    ($($rust_type:ty),+) => {
        $(
            impl FromValue for $rust_type {
                fn from_value(v: Value) -> Result<Self, TemplateError> {
                    let out_of_range = |n: &dyn fmt::Display| {
                        TemplateError::TypeMismatch(format!(
                            "Value {} out of range for {}",
                            n,
                            stringify!($rust_type)
                        ))
                    };
                    match v {
                        Value::I64(n) => <$rust_type>::try_from(n).map_err(|_| out_of_range(&n)),
                        Value::U64(n) => <$rust_type>::try_from(n).map_err(|_| out_of_range(&n)),
                        Value::Str(ref s) => s.trim().parse::<$rust_type>().map_err(|_| {
                            TemplateError::TypeMismatch(format!(
                                "Cannot parse {:?} as {}",
                                s,
                                stringify!($rust_type)
                            ))
                        }),
                        _ => Err(TemplateError::TypeMismatch(format!(
                            "Expected numeric value, got {:?}",
                            v
                        ))),
                    }
                }
            }
        )+
    };
}

impl_to_value_as!(I64, i64, i8, i16, i32, i64, isize);
impl_to_value_as!(U64, u64, u8, u16, u32, u64, usize);
impl_to_value_as!(F64, f64, f32, f64);
impl_from_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// bool
impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}
impl FromValue for bool {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            // "true" / "false"
            Value::Str(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::Str(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Ok(other.is_truthy()),
        }
    }
}

// char is a one-character string
impl ToValue for char {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

// strings
impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}
impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}
impl FromValue for String {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::Str(s) => Ok(s),
            Value::Null | Value::List(_) | Value::Map(_) | Value::Object(_) => Err(
                TemplateError::TypeMismatch(format!("Expected Str, got {:?}", v)),
            ),
            // scalars convert through their rendered form
            scalar => Ok(scalar.to_string()),
        }
    }
}

impl FromValue for f64 {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::F64(n) => Ok(n),
            Value::I64(n) => Ok(n as f64),
            Value::U64(n) => Ok(n as f64),
            Value::Str(ref s) => s
                .trim()
                .parse()
                .map_err(|_| TemplateError::TypeMismatch(format!("Cannot parse {:?} as f64", s))),
            _ => Err(TemplateError::TypeMismatch(format!("Expected F64, got {:?}", v))),
        }
    }
}

impl ToValue for Decimal {
    fn to_value(&self) -> Value {
        Value::Decimal(*self)
    }
}
impl FromValue for Decimal {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::Decimal(d) => Ok(d),
            Value::I64(n) => Ok(Decimal::from(n)),
            Value::U64(n) => Ok(Decimal::from(n)),
            Value::Str(ref s) => s.trim().parse().map_err(|_| {
                TemplateError::TypeMismatch(format!("Cannot parse {:?} as Decimal", s))
            }),
            _ => Err(TemplateError::TypeMismatch(format!(
                "Expected Decimal, got {:?}",
                v
            ))),
        }
    }
}

// --- dates and times ---
impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Date(*self)
    }
}
impl FromValue for NaiveDate {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::Date(d) => Ok(d),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::DateTimeUtc(dt) => Ok(dt.date_naive()),
            _ => Err(TemplateError::TypeMismatch(format!("Expected Date, got {:?}", v))),
        }
    }
}

impl ToValue for NaiveTime {
    fn to_value(&self) -> Value {
        Value::Time(*self)
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }
}
impl FromValue for NaiveDateTime {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::DateTime(dt) => Ok(dt),
            Value::DateTimeUtc(dt) => Ok(dt.naive_utc()),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            _ => Err(TemplateError::TypeMismatch(format!(
                "Expected DateTime, got {:?}",
                v
            ))),
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::DateTimeUtc(*self)
    }
}
impl FromValue for DateTime<Utc> {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::DateTimeUtc(dt) => Ok(dt),
            Value::DateTime(dt) => Ok(dt.and_utc()),
            _ => Err(TemplateError::TypeMismatch(format!(
                "Expected DateTimeUtc, got {:?}",
                v
            ))),
        }
    }
}

// Allow Value to be passed as argument
impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

// Allow Value to be returned as result
impl FromValue for Value {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        Ok(v)
    }
}

impl ToValue for () {
    fn to_value(&self) -> Value {
        Value::Null
    }
}

// Blanket implementation for references
impl<T> ToValue for &T
where
    T: ToValue + ?Sized,
{
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

// Option
impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }
}
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(v)?)),
        }
    }
}

// Vec / slices
impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(|v| v.to_value()).collect())
    }
}
impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}
impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::List(l) => l.into_iter().map(T::from_value).collect(),
            _ => Err(TemplateError::TypeMismatch(format!("Expected List, got {:?}", v))),
        }
    }
}

// HashMap / BTreeMap
impl<T: ToValue> ToValue for HashMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}
impl<T: ToValue> ToValue for HashMap<&str, T> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_string(), v.to_value()))
                .collect(),
        )
    }
}
impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }
}
impl<T: FromValue> FromValue for HashMap<String, T> {
    fn from_value(v: Value) -> Result<Self, TemplateError> {
        match v {
            Value::Map(m) => {
                let mut out = HashMap::with_capacity(m.len());
                for (k, val) in m {
                    out.insert(k, T::from_value(val)?);
                }
                Ok(out)
            }
            _ => Err(TemplateError::TypeMismatch(format!("Expected Map, got {:?}", v))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::I64(0).is_truthy());
        assert!(Value::I64(-1).is_truthy());
        assert!(!Value::F64(0.0).is_truthy());
        assert!(!Value::Decimal(Decimal::ZERO).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        // "false" is a non-empty string, not a boolean
        assert!(Value::Str("false".to_string()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
        assert!(!Value::Map(HashMap::new()).is_truthy());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::F64(1.5).to_string(), "1.5");
        assert_eq!(
            Value::List(vec![Value::I64(1), Value::Str("a".into())]).to_string(),
            "1,a"
        );

        let mut map = HashMap::new();
        map.insert("b".to_string(), Value::I64(2));
        map.insert("a".to_string(), Value::I64(1));
        assert_eq!(Value::Map(map).to_string(), "{a=1, b=2}");
    }

    #[test]
    fn test_from_value_conversions() {
        assert_eq!(String::from_value(Value::I64(7)).unwrap(), "7");
        assert!(String::from_value(Value::Null).is_err());
        assert_eq!(i32::from_value(Value::U64(3)).unwrap(), 3);
        assert!(u8::from_value(Value::I64(-1)).is_err());
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert!(bool::from_value(Value::Str("TRUE".into())).unwrap());
    }

    #[test]
    fn test_option_and_vec_to_value() {
        let none: Option<String> = None;
        assert_eq!(none.to_value(), Value::Null);
        assert_eq!(
            vec!["a", "b"].to_value(),
            Value::List(vec![Value::Str("a".into()), Value::Str("b".into())])
        );
    }
}
