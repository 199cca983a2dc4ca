//! Property list values as they appear in `project.pbxproj`.

use indexmap::IndexMap;

/// A node in an OpenStep-style property list.
///
/// pbxproj files only ever carry strings, arrays, dictionaries and (rarely) hex data;
/// numbers and booleans are stored as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Array(Vec<Value>),
    Dict(Dict),
    /// Hex digits between `<` and `>`, kept verbatim (whitespace removed).
    Data(String),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Dict(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::Array(a)
    }
}

/// An insertion-ordered dictionary.
///
/// Keys are unique: inserting an existing key replaces its value in place.
/// Equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dict {
    entries: IndexMap<String, Value>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert or replace. Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Value)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut d = Dict::new();
        d.insert("a", "1");
        d.insert("b", "2");
        let old = d.insert("a", "3");

        assert_eq!(old, Some(Value::from("1")));
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(d.get_str("a"), Some("3"));
    }

    #[test]
    fn many_keys_keep_insertion_order() {
        let d: Dict = (0..10_000).rev().map(|i| (format!("k{i}"), "v")).collect();
        assert_eq!(d.len(), 10_000);
        assert_eq!(d.keys().next(), Some("k9999"));
        assert_eq!(d.keys().last(), Some("k0"));
        assert!(d.contains_key("k5000"));
    }

    #[test]
    fn accessors_reject_other_kinds() {
        let v = Value::Array(vec![]);
        assert!(v.as_str().is_none());
        assert!(v.as_dict().is_none());
        assert_eq!(v.as_array().map(<[Value]>::len), Some(0));
    }
}
