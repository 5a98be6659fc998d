//! The closed set of values an attribute can hold.
//!
//! Everything here maps one-to-one onto JSON, so a value written to the
//! metadata file reads back unchanged. Floats must be finite: JSON has no
//! spelling for NaN or infinity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Most arrays and maps a value may nest inside one another.
///
/// The metadata document wraps every value in two more levels, and the JSON
/// reader stops at 128, so this leaves ample headroom.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A JSON-representable attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<AttributeValue>),
    Map(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AttributeValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Check that the value survives a trip through JSON unchanged.
    ///
    /// Non-finite floats are refused, and so is anything with more than
    /// [`MAX_NESTING_DEPTH`] levels of arrays and maps, which the metadata
    /// file could be written with but not read back.
    ///
    /// Returns a short description of the first offending element.
    pub fn check_representable(&self) -> Result<(), String> {
        self.check_at(0)
    }

    fn check_at(&self, depth: usize) -> Result<(), String> {
        let nested = matches!(self, Self::Array(_) | Self::Map(_));
        if nested && depth >= MAX_NESTING_DEPTH {
            return Err(format!("nested deeper than {MAX_NESTING_DEPTH} levels"));
        }
        match self {
            Self::Float(f) if !f.is_finite() => Err(format!("non-finite float {f}")),
            Self::Array(items) => items.iter().enumerate().try_for_each(|(i, item)| {
                item.check_at(depth + 1).map_err(|e| format!("[{i}]: {e}"))
            }),
            Self::Map(map) => map.iter().try_for_each(|(k, v)| {
                v.check_at(depth + 1).map_err(|e| format!("{k:?}: {e}"))
            }),
            _ => Ok(()),
        }
    }
}

impl Default for AttributeValue {
    fn default() -> Self {
        Self::Null
    }
}

impl PartialEq<str> for AttributeValue {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for AttributeValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

macro_rules! from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for AttributeValue {
                fn from(i: $t) -> Self {
                    Self::Int(i64::from(i))
                }
            }
        )*
    };
}

from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for AttributeValue {
    fn from(f: f32) -> Self {
        Self::Float(f64::from(f))
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<BTreeMap<String, AttributeValue>> for AttributeValue {
    fn from(map: BTreeMap<String, AttributeValue>) -> Self {
        Self::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AttributeValue {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn json_scalars_map_to_variants() {
        assert_eq!(parse("null"), AttributeValue::Null);
        assert_eq!(parse("true"), AttributeValue::Bool(true));
        assert_eq!(parse("42"), AttributeValue::Int(42));
        assert_eq!(parse("-7"), AttributeValue::Int(-7));
        assert_eq!(parse("2.5"), AttributeValue::Float(2.5));
        assert_eq!(parse(r#""m/s""#), AttributeValue::from("m/s"));
    }

    #[test]
    fn whole_float_stays_float() {
        let text = serde_json::to_string(&AttributeValue::Float(3.0)).unwrap();
        assert_eq!(parse(&text), AttributeValue::Float(3.0));
    }

    #[test]
    fn nested_values_parse() {
        let v = parse(r#"{"shape": [10, 2], "desc": {"unit": "K", "scale": 0.5}}"#);
        let map = v.as_map().unwrap();
        assert_eq!(
            map["shape"],
            AttributeValue::Array(vec![AttributeValue::Int(10), AttributeValue::Int(2)])
        );
        assert_eq!(map["desc"].as_map().unwrap()["unit"], "K");
        assert_eq!(map["desc"].as_map().unwrap()["scale"].as_f64(), Some(0.5));
    }

    #[test]
    fn conversions() {
        assert_eq!(AttributeValue::from(7u8), AttributeValue::Int(7));
        assert_eq!(AttributeValue::from(1.5f32), AttributeValue::Float(1.5));
        assert_eq!(AttributeValue::from(None::<i32>), AttributeValue::Null);
        assert_eq!(AttributeValue::from(Some("x")), "x");
        assert_eq!(
            AttributeValue::from(vec![1, 2]),
            AttributeValue::Array(vec![AttributeValue::Int(1), AttributeValue::Int(2)])
        );
    }

    #[test]
    fn accessors_reject_other_variants() {
        let v = AttributeValue::Int(3);
        assert_eq!(v.as_str(), None);
        assert_eq!(v.as_bool(), None);
        assert_eq!(v.as_f64(), Some(3.0));
        assert!(AttributeValue::default().is_null());
    }

    #[test]
    fn non_finite_floats_are_not_representable() {
        assert!(AttributeValue::Float(1.0).check_representable().is_ok());
        assert!(AttributeValue::Float(f64::NAN).check_representable().is_err());

        let nested = AttributeValue::Array(vec![
            AttributeValue::Int(1),
            AttributeValue::Float(f64::INFINITY),
        ]);
        let reason = nested.check_representable().unwrap_err();
        assert!(reason.starts_with("[1]"));

        let mut map = BTreeMap::new();
        map.insert("bad".to_string(), AttributeValue::Float(f64::NEG_INFINITY));
        assert!(AttributeValue::Map(map).check_representable().is_err());
    }

    /// `Int` wrapped in `levels` arrays.
    fn nest(levels: usize) -> AttributeValue {
        (0..levels).fold(AttributeValue::Int(7), |inner, _| {
            AttributeValue::Array(vec![inner])
        })
    }

    #[test]
    fn nesting_is_capped() {
        assert!(nest(MAX_NESTING_DEPTH).check_representable().is_ok());
        let reason = nest(MAX_NESTING_DEPTH + 1).check_representable().unwrap_err();
        assert!(reason.contains("nested deeper than"), "{reason}");

        let mut map = BTreeMap::new();
        map.insert("deep".to_string(), nest(MAX_NESTING_DEPTH));
        assert!(AttributeValue::Map(map).check_representable().is_err());
    }

    #[test]
    fn value_at_nesting_cap_parses_back() {
        let value = nest(MAX_NESTING_DEPTH);
        let json = serde_json::to_string(&value).unwrap();
        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
