//! Shallow object merging
use serde_json::{Map, Value};

/// Copy every key of every source into `base`, later sources winning.
///
/// `base` is mutated in place and also handed back, so the call works both
/// as a mutation and as a merge expression.
///
/// ```rust
/// use domlite::extend;
/// use serde_json::json;
///
/// let mut base = json!({"a": 1}).as_object().cloned().unwrap();
/// let b = json!({"b": 2}).as_object().cloned().unwrap();
/// let a = json!({"a": 3}).as_object().cloned().unwrap();
/// let merged = extend(&mut base, [&b, &a]).clone();
/// assert_eq!(merged, base);
/// assert_eq!(serde_json::Value::Object(base), json!({"a": 3, "b": 2}));
/// ```
pub fn extend<'a, 'b, I>(base: &'a mut Map<String, Value>, sources: I) -> &'a mut Map<String, Value>
where
    I: IntoIterator<Item = &'b Map<String, Value>>,
{
    for source in sources {
        for (key, value) in source {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn later_sources_win_and_base_is_mutated() {
        let mut base = object(json!({"a": 1}));
        let sources = [object(json!({"b": 2})), object(json!({"a": 3}))];
        let returned = extend(&mut base, &sources).clone();
        assert_eq!(Value::Object(returned), json!({"a": 3, "b": 2}));
        assert_eq!(Value::Object(base), json!({"a": 3, "b": 2}));
    }

    #[test]
    fn usable_as_pure_merge_over_a_copy() {
        let defaults = object(json!({"method": "GET", "url": ""}));
        let overrides = object(json!({"url": "/x"}));
        let merged = extend(&mut defaults.clone(), [&overrides]).clone();
        assert_eq!(Value::Object(merged), json!({"method": "GET", "url": "/x"}));
        assert_eq!(Value::Object(defaults), json!({"method": "GET", "url": ""}));
    }

    #[test]
    fn merge_is_shallow() {
        let mut base = object(json!({"data": {"q": "1", "page": 2}}));
        let source = object(json!({"data": {"q": "2"}}));
        extend(&mut base, [&source]);
        assert_eq!(Value::Object(base), json!({"data": {"q": "2"}}));
    }

    #[test]
    fn no_sources_is_identity() {
        let mut base = object(json!({"a": 1}));
        extend(&mut base, std::iter::empty());
        assert_eq!(Value::Object(base), json!({"a": 1}));
    }
}
