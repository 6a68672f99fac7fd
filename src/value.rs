//! Host-side Values
//!
//! A [`Value`] is the owned, arena-independent form of a stored datum. The
//! binding layer builds `Value`s from host data and hands them to the table;
//! the table copies them into a bucket arena and copies them back out on reads.
//!
//! The engine treats values as opaque except for three questions asked by the
//! positional update operations:
//!
//! - is this a record (`Tuple`), and what is its arity?
//! - is this field numeric (`Int` or `Float`)?
//! - is this field a list?

use bytes::Bytes;
use std::fmt;

/// An immutable, arbitrarily nested datum.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer
    Int(i64),

    /// 64-bit float
    Float(f64),

    /// Symbolic constant
    Atom(String),

    /// Binary payload. Reference counted: copies share the bytes.
    Binary(Bytes),

    /// Proper list
    List(Vec<Value>),

    /// Fixed-arity record
    Tuple(Vec<Value>),
}

impl Value {
    /// Creates an integer value.
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    /// Creates a float value.
    pub fn float(n: f64) -> Self {
        Value::Float(n)
    }

    /// Creates an atom value.
    ///
    /// # Example
    /// ```
    /// use gentable::Value;
    /// let ok = Value::atom("ok");
    /// assert_eq!(ok.to_string(), "ok");
    /// ```
    pub fn atom(name: impl Into<String>) -> Self {
        Value::Atom(name.into())
    }

    /// Creates a binary value.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Value::Binary(data.into())
    }

    /// Creates a list value.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(items)
    }

    /// Creates a record value.
    ///
    /// # Example
    /// ```
    /// use gentable::Value;
    /// let user = Value::tuple(vec![Value::atom("user"), Value::int(7), Value::list(vec![])]);
    /// assert_eq!(user.arity(), Some(3));
    /// ```
    pub fn tuple(fields: Vec<Value>) -> Self {
        Value::Tuple(fields)
    }

    /// Returns true for `Int` and `Float`.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Returns true for `List`.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Returns the record arity, or `None` if this is not a record.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Value::Tuple(fields) => Some(fields.len()),
            _ => None,
        }
    }

    /// Returns the field at a 1-based position of a record.
    pub fn field(&self, position: usize) -> Option<&Value> {
        match self {
            Value::Tuple(fields) if position >= 1 => fields.get(position - 1),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the elements if this is a `List`.
    ///
    /// ```
    /// use gentable::Value;
    ///
    /// let queue = Value::list(vec![Value::atom("a"), Value::atom("b")]);
    /// assert_eq!(queue.as_list().map(<[Value]>::len), Some(2));
    /// assert_eq!(Value::int(1).as_list(), None);
    /// ```
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::Binary(data)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Atom(name) => write!(f, "{}", name),
            Value::Binary(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "<<\"{}\">>", s)
                } else {
                    write!(f, "<<{} bytes>>", data.len())
                }
            }
            Value::List(items) => write_seq(f, "[", items, "]"),
            Value::Tuple(fields) => write_seq(f, "{", fields, "}"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    f.write_str(open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", item)?;
    }
    f.write_str(close)
}
