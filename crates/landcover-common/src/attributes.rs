//! Ordered attribute mappings for variables and datasets.
//!
//! NetCDF attributes are typed and ordered. `Attributes` keeps insertion
//! order so that a dataset written back to disk lists its attributes the
//! way the source file did, with recomputed keys replaced in place.

use std::fmt;

/// Well-known attribute names.
pub mod keys {
    pub const FILL_VALUE: &str = "_FillValue";
    pub const GRID_MAPPING: &str = "grid_mapping";
    pub const FLAG_VALUES: &str = "flag_values";
    pub const HISTORY: &str = "history";
    pub const SPATIAL_REF: &str = "spatial_ref";
    pub const SPATIAL_RESOLUTION: &str = "spatial_resolution";
    pub const CRS_WKT: &str = "crs_wkt";
    pub const UNITS: &str = "units";
    pub const STANDARD_NAME: &str = "standard_name";
    pub const LONG_NAME: &str = "long_name";
    pub const AXIS: &str = "axis";
    pub const VALID_MIN: &str = "valid_min";
    pub const VALID_MAX: &str = "valid_max";
    pub const VALID_RANGE: &str = "valid_range";
    pub const MISSING_VALUE: &str = "missing_value";

    /// Attributes whose values must share the data variable's type.
    pub const DATA_TYPED: [&str; 5] = [FLAG_VALUES, VALID_MIN, VALID_MAX, VALID_RANGE, MISSING_VALUE];
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Int(i64),
    Ints(Vec<i64>),
    Float(f64),
    Floats(Vec<f64>),
}

impl AttrValue {
    /// Text content, if this is a text attribute.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar numeric value. Single-element lists count as scalars.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0] as f64),
            AttrValue::Floats(v) if v.len() == 1 => Some(v[0]),
            AttrValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer list view of the value.
    ///
    /// Float lists are accepted only when every element is integral.
    /// Text is split on whitespace and commas (some writers store
    /// `flag_values` as a string).
    pub fn as_i64_list(&self) -> Option<Vec<i64>> {
        match self {
            AttrValue::Int(v) => Some(vec![*v]),
            AttrValue::Ints(v) => Some(v.clone()),
            AttrValue::Float(v) if v.fract() == 0.0 => Some(vec![*v as i64]),
            AttrValue::Floats(v) if v.iter().all(|f| f.fract() == 0.0) => {
                Some(v.iter().map(|f| *f as i64).collect())
            }
            AttrValue::Text(s) => s
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|t| !t.is_empty())
                .map(|t| t.parse::<i64>().ok())
                .collect(),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Text(s) => write!(f, "{}", s),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Ints(v) => write!(f, "{:?}", v),
            AttrValue::Floats(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(value: Vec<i64>) -> Self {
        AttrValue::Ints(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        AttrValue::Floats(value)
    }
}

/// Insertion-ordered attribute mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttrValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Text value of `key`, if present and textual.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_text)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key`, replacing an existing value in place.
    ///
    /// Returns the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, AttrValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut attrs = Attributes::new();
        attrs.insert("a", "first");
        attrs.insert("b", 2i64);
        let old = attrs.insert("a", "second");

        assert_eq!(old, Some(AttrValue::Text("first".into())));
        assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(attrs.text("a"), Some("second"));
    }

    #[test]
    fn test_remove() {
        let mut attrs = Attributes::new();
        attrs.insert(keys::FILL_VALUE, 0i64);
        attrs.insert(keys::LONG_NAME, "land cover");

        assert_eq!(attrs.remove(keys::FILL_VALUE), Some(AttrValue::Int(0)));
        assert_eq!(attrs.remove(keys::FILL_VALUE), None);
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn test_integer_list_views() {
        assert_eq!(AttrValue::Ints(vec![0, 10, 20]).as_i64_list(), Some(vec![0, 10, 20]));
        assert_eq!(AttrValue::Floats(vec![1.0, 2.0]).as_i64_list(), Some(vec![1, 2]));
        assert_eq!(AttrValue::Floats(vec![1.5]).as_i64_list(), None);
        assert_eq!(AttrValue::from("0 10, 20").as_i64_list(), Some(vec![0, 10, 20]));
        assert_eq!(AttrValue::from("0 ten").as_i64_list(), None);
    }

    #[test]
    fn test_as_f64() {
        assert_eq!(AttrValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(AttrValue::Floats(vec![2.5]).as_f64(), Some(2.5));
        assert_eq!(AttrValue::Floats(vec![2.5, 1.0]).as_f64(), None);
        assert_eq!(AttrValue::from(" 300 ").as_f64(), Some(300.0));
    }
}
