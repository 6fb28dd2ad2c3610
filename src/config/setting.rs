use hashlink::LinkedHashMap;
use ordered_float::OrderedFloat;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;

/// Owned, ordered settings tree.
///
/// Every value read from `scriptpipe.yaml` and the built-in defaults ends up
/// in this shape, so that merging and validation never have to deal with the
/// borrowed YAML representation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Setting {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    String(String),
    Sequence(Vec<Setting>),
    Mapping(LinkedHashMap<String, Setting>),
}

impl Setting {
    /// Parses the first YAML document of `contents`.
    ///
    /// Returns `Ok(None)` when the input holds no document at all.
    pub fn parse_document(contents: &str) -> Result<Option<Self>, SettingError> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        documents.first().map(Self::from_yaml).transpose()
    }

    pub fn from_yaml(node: &Yaml<'_>) -> Result<Self, SettingError> {
        if let Some(mapping) = node.as_mapping() {
            let mut entries = LinkedHashMap::new();
            for (key, value) in mapping.iter() {
                entries.insert(Self::key_from_yaml(key)?, Self::from_yaml(value)?);
            }
            return Ok(Setting::Mapping(entries));
        }

        if let Some(sequence) = node.as_sequence() {
            return sequence
                .iter()
                .map(Self::from_yaml)
                .collect::<Result<Vec<_>, _>>()
                .map(Setting::Sequence);
        }

        match node {
            Yaml::Value(scalar) => Ok(Self::from_scalar(scalar)),
            other => UnsupportedNodeSnafu {
                node: format!("{other:?}"),
            }
            .fail(),
        }
    }

    fn from_scalar(scalar: &Scalar<'_>) -> Self {
        match scalar {
            Scalar::Null => Setting::Null,
            Scalar::Boolean(value) => Setting::Bool(*value),
            Scalar::Integer(value) => Setting::Integer(*value),
            Scalar::FloatingPoint(value) => Setting::Float(OrderedFloat(value.0)),
            Scalar::String(value) => Setting::String(value.to_string()),
        }
    }

    fn key_from_yaml(key: &Yaml<'_>) -> Result<String, SettingError> {
        match key {
            Yaml::Value(Scalar::String(value)) => Ok(value.to_string()),
            Yaml::Value(Scalar::Integer(value)) => Ok(value.to_string()),
            Yaml::Value(Scalar::Boolean(value)) => Ok(value.to_string()),
            Yaml::Value(Scalar::FloatingPoint(value)) => Ok(value.0.to_string()),
            other => UnsupportedKeySnafu {
                key: format!("{other:?}"),
            }
            .fail(),
        }
    }

    /// Deep-merges `overrides` on top of `self`.
    ///
    /// Mappings are merged key by key, recursively. Any other override value
    /// replaces the base value outright, sequences included.
    pub fn merged_with(self, overrides: Setting) -> Setting {
        match (self, overrides) {
            (Setting::Mapping(mut base), Setting::Mapping(overrides)) => {
                for (key, value) in overrides {
                    match base.get_mut(&key) {
                        Some(existing) => {
                            let current = std::mem::take(existing);
                            *existing = current.merged_with(value);
                        }
                        None => {
                            base.insert(key, value);
                        }
                    }
                }
                Setting::Mapping(base)
            }
            (_, overrides) => overrides,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.as_mapping().and_then(|mapping| mapping.get(key))
    }

    /// Looks up the first of `keys` present in this mapping.
    pub fn get_any(&self, keys: &[&str]) -> Option<&Setting> {
        keys.iter().find_map(|key| self.get(key))
    }

    pub fn as_mapping(&self) -> Option<&LinkedHashMap<String, Setting>> {
        match self {
            Setting::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Setting::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Setting::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Reads a string or a list of strings. Anything else yields `None`.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            Setting::String(value) => Some(vec![value.clone()]),
            Setting::Sequence(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.into()
    }
}

impl From<&Setting> for serde_json::Value {
    fn from(setting: &Setting) -> Self {
        use serde_json::Value;

        match setting {
            Setting::Null => Value::Null,
            Setting::Bool(value) => Value::Bool(*value),
            Setting::Integer(value) => Value::from(*value),
            Setting::Float(value) => serde_json::Number::from_f64(value.0)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Setting::String(value) => Value::String(value.clone()),
            Setting::Sequence(items) => Value::Array(items.iter().map(Value::from).collect()),
            Setting::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::from(value)))
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SettingError {
    #[snafu(display("Failed to parse YAML"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Unsupported YAML node: {}", node))]
    UnsupportedNodeError { node: String },
    #[snafu(display("Unsupported mapping key: {}", key))]
    UnsupportedKeyError { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    fn parse(contents: &str) -> Setting {
        Setting::parse_document(contents)
            .expect("valid yaml")
            .expect("one document")
    }

    #[test]
    fn parses_nested_mappings_in_order() {
        let setting = parse("b: 1\na:\n  c: true\n  d: [x, y]\n");

        let keys: Vec<_> = setting.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(setting.get("b"), Some(&Setting::Integer(1)));
        assert_eq!(
            setting.get("a").and_then(|a| a.get("c")),
            Some(&Setting::Bool(true))
        );
        assert_eq!(
            setting.get("a").and_then(|a| a.get("d")).unwrap().as_string_list(),
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[test]
    fn empty_input_has_no_document() {
        assert_eq!(Setting::parse_document("").unwrap(), None);
    }

    #[test]
    fn invalid_yaml_is_a_parse_error() {
        let result = Setting::parse_document("invalid: yaml: content: [unclosed");
        assert!(matches!(result, Err(SettingError::ParseError { .. })));
    }

    #[test]
    fn numeric_keys_become_strings() {
        let setting = parse("123: numeric\n");
        assert_eq!(
            setting.get("123"),
            Some(&Setting::String("numeric".to_string()))
        );
    }

    #[test]
    fn merge_with_empty_override_is_identity() {
        let base = parse("lint:\n  esversion: 6\n  laxbreak: true\nminify: {}\n");
        let merged = base.clone().merged_with(Setting::Mapping(LinkedHashMap::new()));
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_overrides_only_the_nested_key() {
        let base = parse("lint:\n  options:\n    esversion: 6\n    laxbreak: true\n");
        let overrides = parse("lint:\n  options:\n    esversion: 8\n");

        let merged = base.merged_with(overrides);
        let options = merged.get("lint").and_then(|l| l.get("options")).unwrap();
        assert_eq!(options.get("esversion"), Some(&Setting::Integer(8)));
        assert_eq!(options.get("laxbreak"), Some(&Setting::Bool(true)));
    }

    #[test]
    fn merge_keeps_base_key_order_and_appends_new_keys() {
        let base = parse("a: 1\nb: 2\n");
        let merged = base.merged_with(parse("c: 3\na: 10\n"));

        let keys: Vec<_> = merged.as_mapping().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(merged.get("a"), Some(&Setting::Integer(10)));
    }

    #[rstest]
    #[case("list: [1, 2, 3]\n", "list: [9]\n", "list: [9]\n")]
    #[case("value: {nested: 1}\n", "value: plain\n", "value: plain\n")]
    #[case("value: plain\n", "value: {nested: 1}\n", "value: {nested: 1}\n")]
    #[case("value: 1\n", "value: ~\n", "value: ~\n")]
    fn non_mapping_overrides_replace_the_base(
        #[case] base: &str,
        #[case] overrides: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(parse(base).merged_with(parse(overrides)), parse(expected));
    }

    #[test]
    fn converts_to_json() {
        let setting = parse("esversion: 6\n\"-W086\": true\nratio: 1.5\nname: x\nlist: [a]\nnone: ~\n");
        let json = setting.to_json();

        assert_eq!(json["esversion"], serde_json::json!(6));
        assert_eq!(json["-W086"], serde_json::json!(true));
        assert_eq!(json["ratio"], serde_json::json!(1.5));
        assert_eq!(json["name"], serde_json::json!("x"));
        assert_eq!(json["list"], serde_json::json!(["a"]));
        assert_eq!(json["none"], serde_json::Value::Null);
    }

    #[test]
    fn string_list_rejects_mixed_sequences() {
        assert_eq!(parse("v: [a, 1]\n").get("v").unwrap().as_string_list(), None);
        assert_eq!(
            parse("v: a\n").get("v").unwrap().as_string_list(),
            Some(vec!["a".to_string()])
        );
    }
}
