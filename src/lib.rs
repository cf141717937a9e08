//! Resolution of module specifiers through `package.json` metadata.
//!
//! Bare specifiers (`pkg/sub/path`) are resolved through the `exports`
//! table of the dependency they name, `#alias` specifiers through the
//! `imports` table of the importer's own package, and relative or URL
//! specifiers are joined onto the importer as-is. No extension or `index`
//! probing ever takes place, and a package can never be used to reach files
//! outside of its own directory.

pub mod conditions;
pub mod config;
pub mod error;
pub mod format;
pub mod fs;
pub mod locator;
pub mod manifest;
pub mod mapping;
pub mod matcher;
pub mod specifier;
pub mod util;
pub mod validate;


use tracing::debug;
use url::Url;

pub use crate::{
    config::{ConditionPriority, ConditionSet, ResolutionConfig, ResolutionHost},
    error::{Error, ErrorKind, FailedMetadataLoad, ResolutionFailure},
    format::{ModuleFormat, resolve_format},
    manifest::{PackageBoundary, PackageMetadata, PackageType},
    mapping::{MappingField, MappingTable, MappingTarget},
};

use crate::{
    conditions::Evaluator,
    error::fail,
    locator::{locate_dependency, locate_self},
    specifier::{BareSpecifier, Specifier, classify, is_path_specifier},
    validate::{ResolvedTarget, TargetRules, validate_target},
};

/// The subpath served from the `default` field when `allow_default_subpath`
/// is set.
pub const DEFAULT_SUBPATH: &str = "./default";

/// `imports` entries may point into another package, but what they point to
/// can't be an alias again.
const MAX_ALIAS_DEPTH: u8 = 1;

pub fn is_builtin(specifier: &str, config: &ResolutionConfig) -> bool {
    config.builtins.contains(specifier)
}

/// Resolves `specifier`, as imported from `importer`, to the URL of the
/// file it designates.
pub fn resolve(specifier: &str, importer: &Url, conditions: &ConditionSet, config: &ResolutionConfig) -> Result<Url, Error> {
    debug!(specifier, importer = %importer, "Resolving specifier");

    let resolution = resolve_request(specifier, importer, conditions, config, 0);

    match &resolution {
        Ok(url) => debug!(specifier, resolved = %url, "Resolved specifier"),
        Err(err) => debug!(specifier, kind = %err.kind(), "Resolution failed: {err}"),
    }

    resolution
}

fn resolve_request(specifier: &str, importer: &Url, conditions: &ConditionSet, config: &ResolutionConfig, depth: u8) -> Result<Url, Error> {
    if is_builtin(specifier, config) {
        return Url::parse(&format!("node:{specifier}"))
            .map_err(|err| fail(ErrorKind::InvalidSpecifier, err.to_string()).with_request(specifier, None));
    }

    match classify(specifier, config)? {
        Specifier::Relative(relative) => {
            importer.join(relative).map_err(|err| {
                fail(ErrorKind::InvalidSpecifier, format!("Cannot join \"{relative}\" onto {importer}: {err}"))
                    .with_request(specifier, None)
            })
        }

        Specifier::Url(url) => Ok(url),

        Specifier::Internal(alias) => {
            if depth >= MAX_ALIAS_DEPTH {
                return Err(fail(ErrorKind::InvalidSpecifier, format!("Alias \"{alias}\" cannot be the target of another alias"))
                    .with_request(specifier, None));
            }

            resolve_internal(alias, importer, conditions, config, depth)
        }

        Specifier::Bare(bare) => resolve_bare(specifier, &bare, importer, conditions, config),
    }
}

/// `#alias` lookup through the `imports` field of the importer's package.
fn resolve_internal(specifier: &str, importer: &Url, conditions: &ConditionSet, config: &ResolutionConfig, depth: u8) -> Result<Url, Error> {
    let boundary = locate_self(importer, config)
        .map_err(|err| err.with_request(specifier, None))?;

    debug!(specifier, boundary = %boundary.root, "Resolving through imports");

    let resolved = resolve_imports(specifier, &boundary, conditions, config)
        .map_err(|err| err.with_request(specifier, Some(&boundary.root)))?;

    match resolved {
        ResolvedTarget::File(path) => file_url(&boundary, &path)
            .map_err(|err| err.with_request(specifier, Some(&boundary.root))),

        ResolvedTarget::Package(target) => {
            debug!(specifier, target = %target, "Following imports alias into a dependency");

            resolve_request(&target, &boundary.package_json_url(), conditions, config, depth + 1)
        }
    }
}

fn resolve_imports(specifier: &str, boundary: &PackageBoundary, conditions: &ConditionSet, config: &ResolutionConfig) -> Result<ResolvedTarget, Error> {
    let Some(imports) = &boundary.metadata.imports else {
        return Err(fail(ErrorKind::NoMapping, format!("Package has no \"imports\" field to resolve \"{specifier}\"")));
    };

    let table = MappingTable::from_value(imports, MappingField::Imports, config.alias_sigil)?;

    resolve_in_table(&table, specifier, MappingField::Imports, conditions, config)
}

fn resolve_bare(specifier: &str, bare: &BareSpecifier<'_>, importer: &Url, conditions: &ConditionSet, config: &ResolutionConfig) -> Result<Url, Error> {
    if let Some(boundary) = find_self_reference(bare.name, importer, config)? {
        debug!(specifier, boundary = %boundary.root, "Resolving self reference");

        return resolve_package_subpath(&boundary, &bare.subpath, conditions, config)
            .map_err(|err| err.with_request(specifier, Some(&boundary.root)));
    }

    let boundary = locate_dependency(bare.name, importer, config)
        .map_err(|err| err.with_request(specifier, None))?;

    debug!(specifier, boundary = %boundary.root, subpath = %bare.subpath, "Located dependency");

    resolve_package_subpath(&boundary, &bare.subpath, conditions, config)
        .map_err(|err| err.with_request(specifier, Some(&boundary.root)))
}

/// The importer's own package, when it's named `name` and declares `exports`.
fn find_self_reference(name: &str, importer: &Url, config: &ResolutionConfig) -> Result<Option<PackageBoundary>, Error> {
    if !config.self_reference {
        return Ok(None);
    }

    match locate_self(importer, config) {
        Ok(boundary) => {
            let is_self = boundary.metadata.name.as_deref() == Some(name)
                && boundary.metadata.exports.is_some();

            Ok(is_self.then_some(boundary))
        }
        Err(err) if err.kind() == ErrorKind::NoPackageBoundary => Ok(None),
        Err(err) => Err(err),
    }
}

/// Resolves a subpath (`.` or `./x`) of a located package.
pub fn resolve_package_subpath(boundary: &PackageBoundary, subpath: &str, conditions: &ConditionSet, config: &ResolutionConfig) -> Result<Url, Error> {
    let metadata = &boundary.metadata;

    let wants_default_field = config.allow_default_subpath
        && subpath == DEFAULT_SUBPATH
        && metadata.default.is_some();

    if let Some(exports) = &metadata.exports {
        let table = MappingTable::from_value(exports, MappingField::Exports, config.alias_sigil)?;

        match resolve_in_table(&table, subpath, MappingField::Exports, conditions, config) {
            Ok(ResolvedTarget::File(path)) => return file_url(boundary, &path),
            Ok(ResolvedTarget::Package(target)) => {
                return Err(fail(ErrorKind::InvalidTarget, format!("Exports target \"{target}\" must be a relative path")));
            }

            // `exports: false` still lets the entry point through
            Err(err) if err.kind() == ErrorKind::NoMapping && subpath == "." && matches!(table, MappingTable::Empty) => {}
            Err(err) if err.kind() == ErrorKind::NoMapping && wants_default_field => {}

            Err(err) => return Err(err),
        }
    } else if subpath != "." && !wants_default_field {
        return resolve_legacy_subpath(boundary, subpath, config);
    }

    resolve_entry_point(boundary, conditions, config)
}

/// Without `exports`, files of a package are addressed by their path, as
/// written: no extension or `index` is ever added.
fn resolve_legacy_subpath(boundary: &PackageBoundary, subpath: &str, config: &ResolutionConfig) -> Result<Url, Error> {
    if subpath.ends_with('/') {
        return Err(fail(ErrorKind::NoMapping, format!("Directory subpath \"{subpath}\" cannot be imported")));
    }

    match validate_target(subpath, None, rules(MappingField::Exports, config))? {
        ResolvedTarget::File(path) => file_url(boundary, &path),
        ResolvedTarget::Package(target) => Err(fail(ErrorKind::InvalidTarget, format!("Invalid subpath \"{target}\""))),
    }
}

/// The package root entry: the `default` field, then `main`.
fn resolve_entry_point(boundary: &PackageBoundary, conditions: &ConditionSet, config: &ResolutionConfig) -> Result<Url, Error> {
    let metadata = &boundary.metadata;

    let resolved = if let Some(default) = &metadata.default {
        let table = MappingTable::from_value(default, MappingField::Default, config.alias_sigil)?;
        resolve_in_table(&table, ".", MappingField::Default, conditions, config)?
    } else if let Some(main) = &metadata.main {
        let main = if is_path_specifier(main) {
            main.clone()
        } else {
            format!("./{main}")
        };

        validate_target(&main, None, rules(MappingField::Default, config))?
    } else {
        return Err(fail(ErrorKind::NoMapping, "Package declares no entry point"));
    };

    match resolved {
        ResolvedTarget::File(path) => file_url(boundary, &path),
        ResolvedTarget::Package(target) => Err(fail(ErrorKind::InvalidTarget, format!("Entry point \"{target}\" must be a relative path"))),
    }
}

fn resolve_in_table(table: &MappingTable, subpath: &str, field: MappingField, conditions: &ConditionSet, config: &ResolutionConfig) -> Result<ResolvedTarget, Error> {
    let matched = matcher::match_subpath(table, subpath)?;

    let evaluator = Evaluator {
        conditions,
        priority: config.condition_priority,
        rules: rules(field, config),
    };

    evaluator.evaluate(matched.target, matched.remainder)
        .map_err(|err| err.with_key(matched.key))
}

fn rules(field: MappingField, config: &ResolutionConfig) -> TargetRules<'_> {
    TargetRules {
        field,
        dependency_dir: &config.dependency_dir,
        sigil: config.alias_sigil,
    }
}

/// Appends a validated package-relative path to the package root. Segments
/// are percent-encoded, so `?` and `#` stay part of the path.
fn file_url(boundary: &PackageBoundary, path: &str) -> Result<Url, Error> {
    let mut url = boundary.root.clone();

    url.path_segments_mut()
        .map_err(|()| fail(ErrorKind::InvalidTarget, format!("Package root {} cannot hold paths", boundary.root)))?
        .pop_if_empty()
        .extend(path.split('/'));

    Ok(url)
}
