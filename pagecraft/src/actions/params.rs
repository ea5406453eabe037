//! Typed access to an action's free-form `data` object.

use facet_value::{VArray, VObject, Value};

use crate::error::EditError;

#[derive(Clone, Copy)]
pub(crate) struct Params<'a> {
    obj: &'a VObject,
}

impl<'a> Params<'a> {
    pub fn new(obj: &'a VObject) -> Self {
        Self { obj }
    }

    /// `null` counts as absent.
    fn field(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key).filter(|v| !v.is_null())
    }

    fn invalid(key: &str, expected: &str) -> EditError {
        EditError::validation(format!("`{key}` must be {expected}"))
    }

    pub fn index(&self, key: &str) -> Result<usize, EditError> {
        let value = self
            .field(key)
            .ok_or_else(|| EditError::validation(format!("`{key}` is required")))?;
        as_index(value).ok_or_else(|| Self::invalid(key, "a non-negative integer"))
    }

    pub fn text(&self, key: &str) -> Result<Option<String>, EditError> {
        match self.field(key) {
            None => Ok(None),
            Some(value) => value_text(value)
                .map(Some)
                .ok_or_else(|| Self::invalid(key, "a string or number")),
        }
    }

    pub fn required_text(&self, key: &str) -> Result<String, EditError> {
        match self.text(key)? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(EditError::validation(format!("`{key}` is required"))),
        }
    }

    /// Like [`text`](Self::text) but keeps whether the value was a JSON number.
    pub fn price(&self, key: &str) -> Result<Option<Price>, EditError> {
        match self.field(key) {
            None => Ok(None),
            Some(value) if value.as_number().is_some() => Ok(value_text(value).map(Price::Amount)),
            Some(value) => value_text(value)
                .map(|t| Some(Price::Display(t)))
                .ok_or_else(|| Self::invalid(key, "a string or number")),
        }
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>, EditError> {
        match self.field(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| Self::invalid(key, "a boolean")),
        }
    }

    pub fn object(&self, key: &str) -> Result<Option<Params<'a>>, EditError> {
        match self.field(key) {
            None => Ok(None),
            Some(value) => value
                .as_object()
                .map(|obj| Some(Params::new(obj)))
                .ok_or_else(|| Self::invalid(key, "an object")),
        }
    }

    pub fn list(&self, key: &str) -> Result<Option<&'a VArray>, EditError> {
        match self.field(key) {
            None => Ok(None),
            Some(value) => value
                .as_array()
                .map(Some)
                .ok_or_else(|| Self::invalid(key, "an array")),
        }
    }

    pub fn index_list(&self, key: &str) -> Result<Vec<usize>, EditError> {
        let list = self
            .list(key)?
            .ok_or_else(|| EditError::validation(format!("`{key}` is required")))?;
        list.iter()
            .map(|v| as_index(v).ok_or_else(|| Self::invalid(key, "a list of non-negative integers")))
            .collect()
    }

    pub fn text_list(&self, key: &str) -> Result<Option<Vec<String>>, EditError> {
        let Some(list) = self.list(key)? else {
            return Ok(None);
        };
        list.iter()
            .map(|v| value_text(v).ok_or_else(|| Self::invalid(key, "a list of strings")))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

/// A price as supplied: verbatim display text, or a bare amount to be formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    Display(String),
    Amount(String),
}

impl Price {
    pub fn raw(&self) -> &str {
        match self {
            Price::Display(text) | Price::Amount(text) => text,
        }
    }
}

fn as_index(value: &Value) -> Option<usize> {
    value
        .as_number()?
        .to_u64()
        .and_then(|n| usize::try_from(n).ok())
}

fn value_text(value: &Value) -> Option<String> {
    if let Some(s) = value.as_string() {
        return Some(s.as_str().to_string());
    }
    let n = value.as_number()?;
    n.to_i64()
        .map(|i| i.to_string())
        .or_else(|| n.to_f64().map(|f| f.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(json: &str) -> Value {
        facet_json::from_str(json).unwrap()
    }

    #[test]
    fn reads_typed_fields() {
        let value = data(r#"{"index": 2, "name": "Pro", "price": 49, "hot": true, "order": [1, 0]}"#);
        let params = Params::new(value.as_object().unwrap());
        assert_eq!(params.index("index").unwrap(), 2);
        assert_eq!(params.text("name").unwrap().as_deref(), Some("Pro"));
        assert_eq!(params.price("price").unwrap(), Some(Price::Amount("49".to_string())));
        assert_eq!(params.flag("hot").unwrap(), Some(true));
        assert_eq!(params.index_list("order").unwrap(), [1, 0]);
        assert_eq!(params.text("missing").unwrap(), None);
    }

    #[test]
    fn rejects_bad_indices() {
        let value = data(r#"{"a": -1, "b": 1.5, "c": "2", "d": null}"#);
        let params = Params::new(value.as_object().unwrap());
        for key in ["a", "b", "c", "d", "e"] {
            assert!(
                matches!(params.index(key), Err(EditError::Validation { .. })),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn string_price_is_display_text() {
        let value = data(r#"{"price": "$49/mo"}"#);
        let params = Params::new(value.as_object().unwrap());
        assert_eq!(
            params.price("price").unwrap(),
            Some(Price::Display("$49/mo".to_string()))
        );
    }
}
