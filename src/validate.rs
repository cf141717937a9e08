use url::Url;

use crate::{
    error::{Error, ErrorKind, fail_target},
    mapping::MappingField,
    specifier::is_path_specifier,
    util::{has_segment, normalize_relative},
};

/// A target that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// Normalized path relative to the package root, without `./`.
    File(String),

    /// An `imports` entry pointing into another package, as a bare specifier.
    Package(String),
}

#[derive(Clone, Copy, Debug)]
pub struct TargetRules<'a> {
    pub field: MappingField,
    pub dependency_dir: &'a str,
    pub sigil: char,
}

/// Checks a candidate target, with the directory remainder (if any)
/// appended, against the package boundary rules.
pub fn validate_target(target: &str, remainder: Option<&str>, rules: TargetRules<'_>) -> Result<ResolvedTarget, Error> {
    let candidate = format!("{target}{}", remainder.unwrap_or_default());

    if let Some(remainder) = remainder {
        if !target.ends_with('/') {
            return Err(fail_target(
                ErrorKind::InvalidTarget,
                format!("Target \"{target}\" of a directory key must end with \"/\""),
                target,
            ));
        }

        if has_segment(remainder, "..") {
            return Err(fail_target(
                ErrorKind::PathTraversal,
                format!("Request \"{remainder}\" backtracks out of \"{target}\""),
                &candidate,
            ));
        }
    }

    if !target.starts_with("./") {
        if rules.field == MappingField::Imports && is_package_target(target, rules.sigil) {
            return Ok(ResolvedTarget::Package(candidate));
        }

        return Err(fail_target(
            ErrorKind::InvalidTarget,
            format!("Invalid \"{}\" target \"{target}\": targets must start with \"./\"", rules.field.name()),
            &candidate,
        ));
    }

    let Some(normalized) = normalize_relative(&candidate).filter(|p| !p.is_empty()) else {
        return Err(fail_target(
            ErrorKind::PathTraversal,
            format!("Target \"{candidate}\" resolves outside of the package"),
            &candidate,
        ));
    };

    if designates_directory(&candidate) {
        return Err(fail_target(
            ErrorKind::InvalidTarget,
            format!("Target \"{target}\" designates a directory, which cannot be imported"),
            &candidate,
        ));
    }

    if has_segment(&candidate, rules.dependency_dir) {
        return Err(fail_target(
            ErrorKind::EncapsulationViolation,
            format!("Target \"{candidate}\" reaches into a \"{}\" directory", rules.dependency_dir),
            &candidate,
        ));
    }

    Ok(ResolvedTarget::File(normalized))
}

/// Directories are never importable as a unit, whatever key led to them.
fn designates_directory(candidate: &str) -> bool {
    candidate.ends_with('/') || matches!(candidate.rsplit('/').next(), Some("." | ".."))
}

fn is_package_target(target: &str, sigil: char) -> bool {
    !target.is_empty()
        && !is_path_specifier(target)
        && !target.starts_with('.')
        && !target.starts_with(sigil)
        && Url::parse(target).is_err()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const EXPORTS: TargetRules<'static> = TargetRules {
        field: MappingField::Exports,
        dependency_dir: "node_modules",
        sigil: '#',
    };

    const IMPORTS: TargetRules<'static> = TargetRules {
        field: MappingField::Imports,
        dependency_dir: "node_modules",
        sigil: '#',
    };

    fn file(p: &str) -> ResolvedTarget {
        ResolvedTarget::File(p.to_string())
    }

    #[rstest]
    #[case("./index.js", None, file("index.js"))]
    #[case("./dist/../lib/index.js", None, file("lib/index.js"))]
    #[case("./data/timezones/", Some("pdt.mjs"), file("data/timezones/pdt.mjs"))]
    #[case("./", Some("util/strings.mjs"), file("util/strings.mjs"))]
    fn test_valid(#[case] target: &str, #[case] remainder: Option<&str>, #[case] expected: ResolvedTarget) {
        assert_eq!(validate_target(target, remainder, EXPORTS).unwrap(), expected);
    }

    #[rstest]
    #[case("dist/index.js", None, ErrorKind::InvalidTarget)]
    #[case("/abs/index.js", None, ErrorKind::InvalidTarget)]
    #[case("../sibling/index.js", None, ErrorKind::InvalidTarget)]
    #[case("file:///etc/passwd", None, ErrorKind::InvalidTarget)]
    #[case("lodash", None, ErrorKind::InvalidTarget)]
    #[case("./dist", Some("index.js"), ErrorKind::InvalidTarget)]
    #[case("./dir/", None, ErrorKind::InvalidTarget)]
    #[case("./dir/sub/../", None, ErrorKind::InvalidTarget)]
    #[case("./dir/.", None, ErrorKind::InvalidTarget)]
    #[case("./lib/", Some("x/."), ErrorKind::InvalidTarget)]
    #[case("./..", None, ErrorKind::PathTraversal)]
    #[case("./../secret.js", None, ErrorKind::PathTraversal)]
    #[case("./a/../../secret.js", None, ErrorKind::PathTraversal)]
    #[case("./", None, ErrorKind::PathTraversal)]
    #[case("./dist/", Some("../secret.js"), ErrorKind::PathTraversal)]
    #[case("./dist/", Some("a/../../b.js"), ErrorKind::PathTraversal)]
    #[case("./dist/", Some("x/.."), ErrorKind::PathTraversal)]
    #[case("./node_modules/dep/index.js", None, ErrorKind::EncapsulationViolation)]
    #[case("./lib/", Some("node_modules/dep/index.js"), ErrorKind::EncapsulationViolation)]
    fn test_invalid(#[case] target: &str, #[case] remainder: Option<&str>, #[case] kind: ErrorKind) {
        let err = validate_target(target, remainder, EXPORTS).unwrap_err();

        assert_eq!(err.kind(), kind, "target='{target}' remainder={remainder:?}");
        assert!(err.failure().unwrap().target.is_some());
    }

    #[test]
    fn test_imports_package_targets() {
        assert_eq!(
            validate_target("dep/feature", None, IMPORTS).unwrap(),
            ResolvedTarget::Package("dep/feature".to_string()),
        );
        assert_eq!(
            validate_target("@scope/dep/lib/", Some("x.js"), IMPORTS).unwrap(),
            ResolvedTarget::Package("@scope/dep/lib/x.js".to_string()),
        );

        assert_eq!(validate_target("#other", None, IMPORTS).unwrap_err().kind(), ErrorKind::InvalidTarget);
        assert_eq!(validate_target("../x.js", None, IMPORTS).unwrap_err().kind(), ErrorKind::InvalidTarget);
        assert_eq!(validate_target("node:fs", None, IMPORTS).unwrap_err().kind(), ErrorKind::InvalidTarget);
    }
}
