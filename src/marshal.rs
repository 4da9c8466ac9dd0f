//! Boundary marshalling.
//!
//! Translates between the generic key-value structures a caller speaks
//! (`PropertyMap` / JSON) and the typed core: [`FilterSpec`] in,
//! [`ConnectionColumns`] out. Nothing here touches the kernel.
//!
//! Input keys: `sources`, `targets`, `type_name` (or `synapse_model`),
//! `min_weight`, `max_weight`, `min_delay`, `max_delay`, and the optional
//! `scan_mode`. Unknown keys are ignored and `null` means "not given".
//!
//! Output keys: `source`, `target`, `weight`, `delay`.

use crate::columns::ConnectionColumns;
use crate::model::property_map::present;
use crate::model::*;
use crate::planner::ScanMode;
use crate::predicate::FilterSpec;
use crate::{Error, Result};

pub const SOURCES: &str = "sources";
pub const TARGETS: &str = "targets";
pub const TYPE_NAME: &str = "type_name";
pub const SYNAPSE_MODEL: &str = "synapse_model";
pub const MIN_WEIGHT: &str = "min_weight";
pub const MAX_WEIGHT: &str = "max_weight";
pub const MIN_DELAY: &str = "min_delay";
pub const MAX_DELAY: &str = "max_delay";
pub const SCAN_MODE: &str = "scan_mode";

pub const SOURCE: &str = "source";
pub const TARGET: &str = "target";
pub const WEIGHT: &str = "weight";
pub const DELAY: &str = "delay";

// ============================================================================
// Input
// ============================================================================

impl TryFrom<&PropertyMap> for FilterSpec {
    type Error = Error;

    fn try_from(props: &PropertyMap) -> Result<Self> {
        let spec = FilterSpec {
            sources: id_list(props, SOURCES)?,
            targets: id_list(props, TARGETS)?,
            type_name: type_name(props)?,
            min_weight: bound(props, MIN_WEIGHT)?,
            max_weight: bound(props, MAX_WEIGHT)?,
            min_delay: bound(props, MIN_DELAY)?,
            max_delay: bound(props, MAX_DELAY)?,
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl FilterSpec {
    /// Parse a JSON filter document.
    ///
    /// Well-formed JSON with a wrong value type is a `ValidationError`;
    /// malformed JSON is `Error::Json`.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: FilterSpec = serde_json::from_str(json).map_err(|e| {
            if e.classify() == serde_json::error::Category::Data {
                Error::ValidationError { key: "filter".into(), message: e.to_string() }
            } else {
                Error::Json(e)
            }
        })?;
        spec.validate()?;
        Ok(spec)
    }
}

/// The optional `scan_mode` key.
pub fn scan_mode(props: &PropertyMap) -> Result<Option<ScanMode>> {
    match present(props, SCAN_MODE) {
        None => Ok(None),
        Some(Value::String(s)) => s.parse().map(Some),
        Some(other) => Err(invalid(SCAN_MODE, "STRING", other)),
    }
}

fn id_list(props: &PropertyMap, key: &str) -> Result<Option<Vec<NodeId>>> {
    let Some(value) = present(props, key) else {
        return Ok(None);
    };
    let items = value.as_list().ok_or_else(|| invalid(key, "LIST of INTEGER", value))?;
    items.iter()
        .map(|item| {
            let id = item.as_int().ok_or_else(|| invalid(key, "INTEGER node id", item))?;
            u64::try_from(id).map(NodeId).map_err(|_| Error::ValidationError {
                key: key.into(),
                message: format!("node ids must be non-negative, got {id}"),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn type_name(props: &PropertyMap) -> Result<Option<String>> {
    let mut name = None;
    for key in [TYPE_NAME, SYNAPSE_MODEL] {
        if let Some(value) = present(props, key) {
            let s = value.as_str().ok_or_else(|| invalid(key, "STRING", value))?;
            match &name {
                Some(existing) if existing != s => {
                    return Err(Error::ValidationError {
                        key: key.into(),
                        message: format!("conflicts with {TYPE_NAME} '{existing}'"),
                    });
                }
                _ => name = Some(s.to_string()),
            }
        }
    }
    Ok(name)
}

fn bound(props: &PropertyMap, key: &str) -> Result<Option<f64>> {
    match present(props, key) {
        None => Ok(None),
        Some(value) => value.as_float()
            .map(Some)
            .ok_or_else(|| invalid(key, "FLOAT", value)),
    }
}

fn invalid(key: &str, expected: &str, got: &Value) -> Error {
    Error::ValidationError {
        key: key.into(),
        message: format!("expected {expected}, got {}", got.type_name()),
    }
}

// ============================================================================
// Output
// ============================================================================

/// Node id as a boundary integer.
pub fn node_to_i64(id: NodeId) -> Result<i64> {
    i64::try_from(id.0).map_err(|_| Error::TypeError {
        expected: "INTEGER".into(),
        got: format!("node id {id} beyond i64 range"),
    })
}

impl ConnectionColumns {
    /// Convert into a result map with `source`, `target`, `weight` and
    /// `delay` lists. One pass per column; order and length are preserved.
    pub fn into_property_map(self) -> Result<PropertyMap> {
        let (source, target, weight, delay) = self.into_parts();
        let ids = |col: Vec<NodeId>| -> Result<Value> {
            col.into_iter()
                .map(|id| node_to_i64(id).map(Value::Int))
                .collect::<Result<Vec<_>>>()
                .map(Value::List)
        };
        let floats = |col: Vec<f64>| Value::List(col.into_iter().map(Value::Float).collect());

        let mut out = PropertyMap::with_capacity(4);
        out.insert(SOURCE.into(), ids(source)?);
        out.insert(TARGET.into(), ids(target)?);
        out.insert(WEIGHT.into(), floats(weight));
        out.insert(DELAY.into(), floats(delay));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnWriter;

    fn props(pairs: Vec<(&str, Value)>) -> PropertyMap {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn test_empty_map_is_empty_filter() {
        let spec = FilterSpec::try_from(&PropertyMap::new()).unwrap();
        assert_eq!(spec, FilterSpec::new());
    }

    #[test]
    fn test_full_map() {
        let p = props(vec![
            ("sources", Value::from(vec![1i64, 2])),
            ("targets", Value::from(vec![3i64])),
            ("synapse_model", Value::from("stdp_synapse")),
            ("min_weight", Value::Int(1)),
            ("max_weight", Value::Float(2.5)),
            ("min_delay", Value::Null),
            ("max_delay", Value::Float(3.0)),
            ("receptor_type", Value::Int(1)),
        ]);
        let spec = FilterSpec::try_from(&p).unwrap();
        assert_eq!(spec.sources, Some(vec![NodeId(1), NodeId(2)]));
        assert_eq!(spec.targets, Some(vec![NodeId(3)]));
        assert_eq!(spec.type_name.as_deref(), Some("stdp_synapse"));
        assert_eq!(spec.min_weight, Some(1.0));
        assert_eq!(spec.max_weight, Some(2.5));
        assert_eq!(spec.min_delay, None);
        assert_eq!(spec.max_delay, Some(3.0));
    }

    #[test]
    fn test_wrong_shapes_are_validation_errors() {
        let cases = vec![
            ("sources", Value::Int(1)),
            ("targets", Value::from(vec!["a"])),
            ("sources", Value::from(vec![-4i64])),
            ("sources", Value::from(vec![1e20])),
            ("targets", Value::from(vec![Value::Int(2), Value::Float(-1e20)])),
            ("type_name", Value::Int(3)),
            ("min_weight", Value::from("heavy")),
            ("max_delay", Value::Float(f64::NAN)),
        ];
        for (key, value) in cases {
            let err = FilterSpec::try_from(&props(vec![(key, value)])).unwrap_err();
            assert!(
                matches!(&err, Error::ValidationError { key: k, .. } if k == key),
                "{key}: {err}"
            );
        }
    }

    #[test]
    fn test_conflicting_type_names() {
        let p = props(vec![
            ("type_name", Value::from("static_synapse")),
            ("synapse_model", Value::from("stdp_synapse")),
        ]);
        assert!(matches!(
            FilterSpec::try_from(&p),
            Err(Error::ValidationError { key, .. }) if key == "synapse_model"
        ));

        let p = props(vec![
            ("type_name", Value::from("stdp_synapse")),
            ("synapse_model", Value::from("stdp_synapse")),
        ]);
        assert!(FilterSpec::try_from(&p).is_ok());
    }

    #[test]
    fn test_empty_type_name_is_kept() {
        let p = props(vec![("type_name", Value::from(""))]);
        let spec = FilterSpec::try_from(&p).unwrap();
        assert_eq!(spec.type_name.as_deref(), Some(""));
    }

    #[test]
    fn test_scan_mode_key() {
        assert_eq!(scan_mode(&PropertyMap::new()).unwrap(), None);
        let p = props(vec![("scan_mode", Value::from("locally_scoped"))]);
        assert_eq!(scan_mode(&p).unwrap(), Some(ScanMode::LocallyScoped));
        let p = props(vec![("scan_mode", Value::Int(1))]);
        assert!(scan_mode(&p).is_err());
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            FilterSpec::from_json(r#"{"sources": "all"}"#),
            Err(Error::ValidationError { .. })
        ));
        assert!(matches!(
            FilterSpec::from_json(r#"{"sources": [1,"#),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            FilterSpec::from_json(r#"{"sources": [-1]}"#),
            Err(Error::ValidationError { .. })
        ));
    }

    #[test]
    fn test_columns_to_map() {
        let mut w = ColumnWriter::with_capacity(2);
        w.push(&Connection::new(NodeId(5), NodeId(6), SynapseModelId(0)).with_weight(0.25));
        w.push(&Connection::new(NodeId(7), NodeId(8), SynapseModelId(1)).with_delay(2.0));
        let map = w.finish().into_property_map().unwrap();

        assert_eq!(map.len(), 4);
        assert_eq!(map["source"], Value::from(vec![5i64, 7]));
        assert_eq!(map["target"], Value::from(vec![6i64, 8]));
        assert_eq!(map["weight"], Value::from(vec![0.25, 1.0]));
        assert_eq!(map["delay"], Value::from(vec![1.0, 2.0]));
    }

    #[test]
    fn test_oversized_node_id_is_type_error() {
        assert!(matches!(node_to_i64(NodeId(u64::MAX)), Err(Error::TypeError { .. })));
        assert_eq!(node_to_i64(NodeId(12)).unwrap(), 12);
    }
}
