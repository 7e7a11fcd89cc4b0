//! Cache Key Module
//!
//! Builds value-comparable keys from an operation id and its call arguments.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{CacheError, Result};

// == Argument Value ==
/// A single argument value compared by value, never by identity.
///
/// Floats are stored as normalized bit patterns so that the enum can be
/// hashed; NaN has no stable equality and is rejected on conversion.
/// Integers are `UInt` when non-negative and `Int` only when negative, so an
/// integer keys the same whatever its source type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Str(String),
    List(Vec<ArgValue>),
    Map(BTreeMap<String, ArgValue>),
}

impl ArgValue {
    /// Converts a signed integer to its canonical form.
    pub fn int(value: i64) -> Self {
        match u64::try_from(value) {
            Ok(u) => ArgValue::UInt(u),
            Err(_) => ArgValue::Int(value),
        }
    }

    /// Converts a float, rejecting NaN.
    pub fn float(value: f64) -> Result<Self> {
        if value.is_nan() {
            return Err(CacheError::UnhashableArgument(
                "NaN is not comparable by value".to_string(),
            ));
        }
        // -0.0 == 0.0, so both must hash the same
        let normalized = if value == 0.0 { 0.0 } else { value };
        Ok(ArgValue::Float(normalized.to_bits()))
    }

    /// Converts any serializable value through its JSON representation.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let json = serde_json::to_value(value)
            .map_err(|e| CacheError::UnhashableArgument(e.to_string()))?;
        Self::from_json(&json)
    }

    /// Converts a JSON value.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => ArgValue::Null,
            Value::Bool(b) => ArgValue::Bool(*b),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    ArgValue::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    ArgValue::Int(i)
                } else {
                    let f = n.as_f64().ok_or_else(|| {
                        CacheError::UnhashableArgument(format!("unrepresentable number {}", n))
                    })?;
                    ArgValue::float(f)?
                }
            }
            Value::String(s) => ArgValue::Str(s.clone()),
            Value::Array(items) => ArgValue::List(
                items
                    .iter()
                    .map(ArgValue::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(fields) => ArgValue::Map(
                fields
                    .iter()
                    .map(|(k, v)| ArgValue::from_json(v).map(|arg| (k.clone(), arg)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            ),
        })
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Null => write!(f, "null"),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::UInt(u) => write!(f, "{}", u),
            ArgValue::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            ArgValue::Str(s) => write!(f, "{:?}", s),
            ArgValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ArgValue::Map(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// == Argument Conversion ==
/// Conversion into an [`ArgValue`], which may fail for values that have no
/// value equality.
pub trait IntoArg {
    fn into_arg(self) -> Result<ArgValue>;
}

impl IntoArg for ArgValue {
    fn into_arg(self) -> Result<ArgValue> {
        Ok(self)
    }
}

macro_rules! impl_into_arg_signed {
    ($($t:ty),*) => {
        $(impl IntoArg for $t {
            fn into_arg(self) -> Result<ArgValue> {
                Ok(ArgValue::int(i64::from(self)))
            }
        })*
    };
}

macro_rules! impl_into_arg_unsigned {
    ($($t:ty),*) => {
        $(impl IntoArg for $t {
            fn into_arg(self) -> Result<ArgValue> {
                Ok(ArgValue::UInt(u64::from(self)))
            }
        })*
    };
}

impl_into_arg_signed!(i8, i16, i32, i64);
impl_into_arg_unsigned!(u8, u16, u32, u64);

impl IntoArg for usize {
    fn into_arg(self) -> Result<ArgValue> {
        Ok(ArgValue::UInt(self as u64))
    }
}

impl IntoArg for isize {
    fn into_arg(self) -> Result<ArgValue> {
        Ok(ArgValue::int(self as i64))
    }
}

impl IntoArg for bool {
    fn into_arg(self) -> Result<ArgValue> {
        Ok(ArgValue::Bool(self))
    }
}

impl IntoArg for f64 {
    fn into_arg(self) -> Result<ArgValue> {
        ArgValue::float(self)
    }
}

impl IntoArg for f32 {
    fn into_arg(self) -> Result<ArgValue> {
        ArgValue::float(f64::from(self))
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> Result<ArgValue> {
        Ok(ArgValue::Str(self.to_string()))
    }
}

impl IntoArg for String {
    fn into_arg(self) -> Result<ArgValue> {
        Ok(ArgValue::Str(self))
    }
}

impl IntoArg for &String {
    fn into_arg(self) -> Result<ArgValue> {
        Ok(ArgValue::Str(self.clone()))
    }
}

impl<T: IntoArg> IntoArg for Vec<T> {
    fn into_arg(self) -> Result<ArgValue> {
        self.into_iter()
            .map(IntoArg::into_arg)
            .collect::<Result<Vec<_>>>()
            .map(ArgValue::List)
    }
}

impl IntoArg for serde_json::Value {
    fn into_arg(self) -> Result<ArgValue> {
        ArgValue::from_json(&self)
    }
}

impl<T: IntoArg> IntoArg for Option<T> {
    fn into_arg(self) -> Result<ArgValue> {
        match self {
            Some(v) => v.into_arg(),
            None => Ok(ArgValue::Null),
        }
    }
}

// == Call Arguments ==
/// Positional and keyword arguments of one call.
///
/// Conversion failures are remembered and reported when the key is built,
/// so argument lists can be chained without intermediate `?`.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<ArgValue>,
    keyword: BTreeMap<String, ArgValue>,
    invalid: Option<String>,
}

impl CallArgs {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg(mut self, value: impl IntoArg) -> Self {
        match value.into_arg() {
            Ok(v) => self.positional.push(v),
            Err(e) => self.reject(e),
        }
        self
    }

    /// Sets a keyword argument. Supplying the same name twice keeps the last value.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl IntoArg) -> Self {
        match value.into_arg() {
            Ok(v) => {
                self.keyword.insert(name.into(), v);
            }
            Err(e) => self.reject(e),
        }
        self
    }

    /// Appends a positional argument converted from any serializable value.
    pub fn arg_serialized<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match ArgValue::from_serialize(value) {
            Ok(v) => self.positional.push(v),
            Err(e) => self.reject(e),
        }
        self
    }

    fn reject(&mut self, err: CacheError) {
        if self.invalid.is_none() {
            self.invalid = Some(match err {
                CacheError::UnhashableArgument(msg) => msg,
                other => other.to_string(),
            });
        }
    }
}

// == Cache Key ==
/// Identity of one cached result: operation id plus argument values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    operation: String,
    positional: Vec<ArgValue>,
    keyword: BTreeMap<String, ArgValue>,
}

impl CacheKey {
    /// Builds the key for `operation` called with `args`.
    pub fn new(operation: &str, args: &CallArgs) -> Result<Self> {
        if let Some(reason) = &args.invalid {
            return Err(CacheError::UnhashableArgument(reason.clone()));
        }
        Ok(Self {
            operation: operation.to_string(),
            positional: args.positional.clone(),
            keyword: args.keyword.clone(),
        })
    }

    /// The operation this key belongs to.
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.operation)?;
        let mut first = true;
        for arg in &self.positional {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
            first = false;
        }
        for (name, arg) in &self.keyword {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, arg)?;
            first = false;
        }
        write!(f, ")")
    }
}
