//! PropertyMap: the generic key-value structure at the call boundary.

use std::collections::HashMap;
use super::Value;

/// A map of parameter names to values (a filter dict or a result dict).
pub type PropertyMap = HashMap<String, Value>;

/// Look up `key`, treating an explicit `null` the same as a missing key.
pub fn present<'a>(props: &'a PropertyMap, key: &str) -> Option<&'a Value> {
    props.get(key).filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_is_absent() {
        let mut props = PropertyMap::new();
        props.insert("a".into(), Value::Null);
        props.insert("b".into(), Value::Int(1));
        assert!(present(&props, "a").is_none());
        assert!(present(&props, "missing").is_none());
        assert_eq!(present(&props, "b"), Some(&Value::Int(1)));
    }
}
