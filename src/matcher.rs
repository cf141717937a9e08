use tracing::trace;

use crate::{
    error::{Error, ErrorKind, fail},
    mapping::{MappingTable, MappingTarget},
};

/// Outcome of looking a subpath up in a mapping table.
#[derive(Clone, Debug, PartialEq)]
pub struct SubpathMatch<'t, 's> {
    /// The table key that matched (`.` for single-entrypoint tables).
    pub key: &'t str,
    pub target: &'t MappingTarget,

    /// For directory keys, the part of the subpath after the key. It gets
    /// appended verbatim to every string the target reduces to.
    pub remainder: Option<&'s str>,
}

/// Finds the entry answering `subpath`: an exact key first, otherwise the
/// longest directory key prefixing it. There is no implicit `index` lookup,
/// and requests for a directory (trailing slash) never match.
pub fn match_subpath<'t, 's>(table: &'t MappingTable, subpath: &'s str) -> Result<SubpathMatch<'t, 's>, Error> {
    if subpath.ends_with('/') {
        return Err(fail(ErrorKind::NoMapping, format!("Directory subpath \"{subpath}\" cannot be imported")));
    }

    let table = match table {
        MappingTable::Empty => {
            return Err(no_mapping(subpath));
        }

        MappingTable::Single(target) => {
            return if subpath == "." {
                Ok(SubpathMatch { key: ".", target, remainder: None })
            } else {
                Err(no_mapping(subpath))
            };
        }

        MappingTable::Subpaths(table) => table,
    };

    match table.exact(subpath).as_slice() {
        &[(key, target)] => {
            trace!(subpath, "Exact subpath match");
            return Ok(SubpathMatch { key, target, remainder: None });
        }
        [] => {}
        _ => {
            return Err(ambiguous(subpath));
        }
    }

    let Some((key, targets)) = table.longest_directory(subpath) else {
        return Err(no_mapping(subpath));
    };

    match targets.as_slice() {
        &[target] => {
            let remainder = &subpath[key.len()..];
            trace!(subpath, key, remainder, "Directory subpath match");

            Ok(SubpathMatch { key, target, remainder: Some(remainder) })
        }
        _ => Err(ambiguous(subpath).with_key(key)),
    }
}

fn no_mapping(subpath: &str) -> Error {
    fail(ErrorKind::NoMapping, format!("No mapping defined for subpath \"{subpath}\""))
}

fn ambiguous(subpath: &str) -> Error {
    fail(ErrorKind::AmbiguousMapping, format!("Several entries of equal length match subpath \"{subpath}\""))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::mapping::{MappingField, SubpathTable};

    fn timezones() -> MappingTable {
        MappingTable::from_value(&json!({
            "./": "./src/util/",
            "./timezones/": "./data/timezones/",
            "./timezones/utc": "./data/timezones/utc/index.mjs",
        }), MappingField::Exports, '#').unwrap()
    }

    #[rstest]
    #[case("./timezones/utc", "./timezones/utc", "./data/timezones/utc/index.mjs", None)]
    #[case("./timezones/pdt.mjs", "./timezones/", "./data/timezones/", Some("pdt.mjs"))]
    #[case("./timezones/utc/extra.mjs", "./timezones/", "./data/timezones/", Some("utc/extra.mjs"))]
    #[case("./strings.mjs", "./", "./src/util/", Some("strings.mjs"))]
    #[case("./../escape.mjs", "./", "./src/util/", Some("../escape.mjs"))]
    fn test_match(#[case] subpath: &str, #[case] key: &str, #[case] target: &str, #[case] remainder: Option<&str>) {
        let table = timezones();
        let m = match_subpath(&table, subpath).unwrap();

        assert_eq!(m.key, key);
        assert_eq!(m.target, &MappingTarget::Path(target.to_string()));
        assert_eq!(m.remainder, remainder);
    }

    #[rstest]
    #[case(".")]
    #[case("./timezones/")]
    #[case("./")]
    fn test_no_match(#[case] subpath: &str) {
        let table = timezones();

        assert_eq!(match_subpath(&table, subpath).unwrap_err().kind(), ErrorKind::NoMapping);
    }

    #[test]
    fn test_single_entrypoint() {
        let table = MappingTable::from_value(&json!("./index.js"), MappingField::Exports, '#').unwrap();

        assert_eq!(match_subpath(&table, ".").unwrap().key, ".");
        assert_eq!(match_subpath(&table, "./index.js").unwrap_err().kind(), ErrorKind::NoMapping);
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(match_subpath(&MappingTable::Empty, ".").unwrap_err().kind(), ErrorKind::NoMapping);
    }

    #[test]
    fn test_imports_directory_key() {
        let table = MappingTable::from_value(&json!({ "#timezones/": "./data/timezones/" }), MappingField::Imports, '#').unwrap();

        assert_eq!(match_subpath(&table, "#timezones/utc").unwrap().remainder, Some("utc"));
        assert_eq!(match_subpath(&table, "#timezones/utc/").unwrap_err().kind(), ErrorKind::NoMapping);
        assert_eq!(match_subpath(&table, "#unknown").unwrap_err().kind(), ErrorKind::NoMapping);
    }

    #[test]
    fn test_duplicate_keys_are_ambiguous() {
        let table = MappingTable::Subpaths(SubpathTable::from_entries(vec![
            ("./lib/".to_string(), MappingTarget::Path("./a/".to_string())),
            ("./lib/".to_string(), MappingTarget::Path("./b/".to_string())),
            ("./x".to_string(), MappingTarget::Path("./x1.js".to_string())),
            ("./x".to_string(), MappingTarget::Path("./x2.js".to_string())),
        ]));

        let err = match_subpath(&table, "./lib/file.js").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMapping);
        assert_eq!(err.failure().unwrap().key.as_deref(), Some("./lib/"));

        assert_eq!(match_subpath(&table, "./x").unwrap_err().kind(), ErrorKind::AmbiguousMapping);
    }
}
