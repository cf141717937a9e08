//! In-memory form of the `exports`, `imports` and `default` fields.
//!
//! A field value is a recursive structure of strings, `false`, arrays and
//! objects. It's turned into a [`MappingTable`] once per lookup; invalid
//! *targets* are accepted here and only rejected when validated, so that
//! fallback arrays can skip over entries they don't understand.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde_json::{Map, Value};

use crate::{
    error::{Error, ErrorKind, fail},
    util::{Trie, key_occurrences},
};

pub type ConditionMap = IndexMap<String, MappingTarget, FxBuildHasher>;

#[derive(Clone, Debug, PartialEq)]
pub enum MappingTarget {
    /// A path, normally `./`-prefixed. In `imports` tables it may also name
    /// another package.
    Path(String),

    /// The literal `false` (or `null`): explicitly mapped to nothing.
    Excluded,

    /// Condition name => target, in declaration order.
    Conditional(ConditionMap),

    /// Alternatives tried in order until one validates.
    Fallback(Vec<MappingTarget>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingField {
    Exports,
    Imports,
    Default,
}

impl MappingField {
    pub fn name(self) -> &'static str {
        match self {
            MappingField::Exports => "exports",
            MappingField::Imports => "imports",
            MappingField::Default => "default",
        }
    }
}

#[derive(Clone, Debug)]
pub enum MappingTable {
    /// `exports: false`: nothing is reachable through the table.
    Empty,

    /// Single entrypoint shorthand, only answering the `.` subpath.
    Single(MappingTarget),

    /// Subpath key => target.
    Subpaths(SubpathTable),
}

#[derive(Clone, Debug, Default)]
pub struct SubpathTable {
    entries: Vec<(String, MappingTarget)>,
    directories: Trie<usize>,
}

impl SubpathTable {
    /// Builds a table from entries in declaration order. Repeated keys are
    /// kept; looking one of them up reports the table as ambiguous.
    pub fn from_entries<I: IntoIterator<Item = (String, MappingTarget)>>(entries: I) -> SubpathTable {
        let entries: Vec<(String, MappingTarget)> = entries.into_iter().collect();
        let mut directories = Trie::default();

        for (index, (key, _)) in entries.iter().enumerate() {
            if key.ends_with('/') {
                directories.insert(key.clone(), index);
            }
        }

        SubpathTable { entries, directories }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &MappingTarget)> {
        self.entries.iter().map(|(key, target)| (key.as_str(), target))
    }

    pub fn exact(&self, key: &str) -> Vec<(&str, &MappingTarget)> {
        self.entries()
            .filter(|(k, _)| *k == key)
            .collect()
    }

    /// Longest directory key prefixing `subpath`, with every entry declared
    /// under it.
    pub fn longest_directory(&self, subpath: &str) -> Option<(&str, Vec<&MappingTarget>)> {
        let (key, indices) = self.directories.get_ancestor(subpath)?;

        Some((key, indices.iter().map(|&index| &self.entries[index].1).collect()))
    }

    pub fn duplicate_keys(&self) -> Vec<&str> {
        let mut duplicates: Vec<&str> = key_occurrences(self.entries.iter().map(|(k, _)| k.as_str()))
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key)
            .collect();

        duplicates.sort_unstable();
        duplicates
    }
}

impl MappingTable {
    pub fn from_value(value: &Value, field: MappingField, sigil: char) -> Result<MappingTable, Error> {
        match value {
            Value::Bool(false) if field == MappingField::Exports => Ok(MappingTable::Empty),

            Value::Object(obj) => {
                match classify_keys(obj, field, sigil)? {
                    KeyForm::Subpaths => {
                        let mut entries = Vec::with_capacity(obj.len());

                        for (key, value) in obj {
                            let target = MappingTarget::from_value(value, field, sigil)
                                .map_err(|err| err.with_key(key))?;

                            entries.push((key.clone(), target));
                        }

                        Ok(MappingTable::Subpaths(SubpathTable::from_entries(entries)))
                    }

                    KeyForm::Conditions => {
                        Ok(MappingTable::Single(MappingTarget::from_value(value, field, sigil)?))
                    }
                }
            }

            _ => Ok(MappingTable::Single(MappingTarget::from_value(value, field, sigil)?)),
        }
    }
}

impl MappingTarget {
    pub fn from_value(value: &Value, field: MappingField, sigil: char) -> Result<MappingTarget, Error> {
        match value {
            Value::String(s) => Ok(MappingTarget::Path(s.clone())),

            Value::Bool(false) | Value::Null => Ok(MappingTarget::Excluded),

            Value::Array(items) => items.iter()
                .map(|item| MappingTarget::from_value(item, field, sigil))
                .collect::<Result<Vec<_>, _>>()
                .map(MappingTarget::Fallback),

            Value::Object(obj) => {
                if let Some(key) = obj.keys().find(|key| is_path_like(key, field, sigil) || key.starts_with('.')) {
                    return Err(fail(ErrorKind::MalformedMapping, format!(
                        "Invalid \"{}\" field: conditional objects cannot contain the subpath key \"{key}\"",
                        field.name(),
                    )));
                }

                let mut conditions = ConditionMap::default();

                for (name, value) in obj {
                    conditions.insert(name.clone(), MappingTarget::from_value(value, field, sigil)?);
                }

                Ok(MappingTarget::Conditional(conditions))
            }

            Value::Bool(true) | Value::Number(_) => Err(fail(ErrorKind::MalformedMapping, format!(
                "Invalid \"{}\" field: {value} is not a valid mapping target",
                field.name(),
            ))),
        }
    }
}

enum KeyForm {
    Subpaths,
    Conditions,
}

fn is_path_like(key: &str, field: MappingField, sigil: char) -> bool {
    match field {
        MappingField::Imports => key.starts_with(sigil),
        MappingField::Exports | MappingField::Default => key.starts_with('.'),
    }
}

fn classify_keys(obj: &Map<String, Value>, field: MappingField, sigil: char) -> Result<KeyForm, Error> {
    let path_like = obj.keys().filter(|key| is_path_like(key, field, sigil)).count();

    if path_like == obj.len() {
        return Ok(KeyForm::Subpaths);
    }

    if path_like > 0 {
        return Err(fail(ErrorKind::MalformedMapping, format!(
            "Invalid \"{}\" field: subpath keys and condition keys cannot be mixed",
            field.name(),
        )));
    }

    if field == MappingField::Imports {
        return Err(fail(ErrorKind::MalformedMapping, format!(
            "Invalid \"imports\" field: every key must start with '{sigil}'",
        )));
    }

    Ok(KeyForm::Conditions)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn exports(value: Value) -> Result<MappingTable, Error> {
        MappingTable::from_value(&value, MappingField::Exports, '#')
    }

    fn path(s: &str) -> MappingTarget {
        MappingTarget::Path(s.to_string())
    }

    #[test]
    fn test_string_shorthand() {
        match exports(json!("./index.js")).unwrap() {
            MappingTable::Single(target) => assert_eq!(target, path("./index.js")),
            table => panic!("unexpected table {table:?}"),
        }
    }

    #[test]
    fn test_false_is_empty() {
        assert!(matches!(exports(json!(false)).unwrap(), MappingTable::Empty));
    }

    #[test]
    fn test_array_shorthand() {
        match exports(json!([{ "require": "./index.cjs" }, "./index.js"])).unwrap() {
            MappingTable::Single(MappingTarget::Fallback(items)) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[1], path("./index.js"));
            }
            table => panic!("unexpected table {table:?}"),
        }
    }

    #[test]
    fn test_root_conditions() {
        match exports(json!({ "require": "./index.cjs", "default": "./index.js" })).unwrap() {
            MappingTable::Single(MappingTarget::Conditional(conditions)) => {
                let names: Vec<&String> = conditions.keys().collect();
                assert_eq!(names, vec!["require", "default"]);
            }
            table => panic!("unexpected table {table:?}"),
        }
    }

    #[test]
    fn test_subpath_table() {
        let table = match exports(json!({
            "./": "./src/util/",
            "./timezones/": "./data/timezones/",
            "./timezones/utc": "./data/timezones/utc/index.mjs",
        })).unwrap() {
            MappingTable::Subpaths(table) => table,
            table => panic!("unexpected table {table:?}"),
        };

        assert_eq!(table.exact("./timezones/utc"), vec![("./timezones/utc", &path("./data/timezones/utc/index.mjs"))]);
        assert!(table.exact("./timezones/pdt").is_empty());

        let (key, targets) = table.longest_directory("./timezones/pdt.mjs").unwrap();
        assert_eq!(key, "./timezones/");
        assert_eq!(targets, vec![&path("./data/timezones/")]);

        let (key, _) = table.longest_directory("./other.js").unwrap();
        assert_eq!(key, "./");

        assert!(table.longest_directory(".").is_none());
        assert!(table.duplicate_keys().is_empty());
    }

    #[test]
    fn test_mixed_keys_rejected() {
        let err = exports(json!({ "./a": "./a.js", "require": "./b.js" })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMapping);
    }

    #[test]
    fn test_nested_subpath_key_rejected() {
        let err = exports(json!({ "./a": { "node": { "./b": "./b.js" } } })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMapping);
        assert_eq!(err.failure().unwrap().key.as_deref(), Some("./a"));
    }

    #[test]
    fn test_non_string_directory_target_rejected() {
        let err = exports(json!({ "./lib/": 42 })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMapping);
        assert_eq!(err.failure().unwrap().key.as_deref(), Some("./lib/"));

        let err = exports(json!({ "./lib/": ["./lib/", true] })).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMapping);
    }

    #[test]
    fn test_unslashed_directory_target_accepted_at_construction() {
        // Rejected by validation instead, which lets fallbacks continue past it
        assert!(exports(json!({ "./": "./dist" })).is_ok());
    }

    #[test]
    fn test_imports_keys() {
        let table = MappingTable::from_value(&json!({ "#timezones/": "./data/timezones/" }), MappingField::Imports, '#');
        assert!(matches!(table.unwrap(), MappingTable::Subpaths(_)));

        let err = MappingTable::from_value(&json!({ "node": "./x.js" }), MappingField::Imports, '#').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMapping);

        let err = MappingTable::from_value(&json!({ "#a": "./a.js", "./b": "./b.js" }), MappingField::Imports, '#').unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMapping);
    }

    #[test]
    fn test_duplicate_entries() {
        let table = SubpathTable::from_entries(vec![
            ("./lib/".to_string(), path("./a/")),
            ("./lib/".to_string(), path("./b/")),
        ]);

        assert_eq!(table.duplicate_keys(), vec!["./lib/"]);
        assert_eq!(table.longest_directory("./lib/x.js").unwrap().1.len(), 2);
    }
}
