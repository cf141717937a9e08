use std::{fmt, sync::Arc};

use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use serde::Deserialize;
use url::Url;

use crate::{
    error::Error,
    fs::{PackageMetadataCache, load_package_metadata},
    locator::list_ancestor_directories,
    manifest::PackageMetadata,
};

pub const DEFAULT_DEPENDENCY_DIR: &str = "node_modules";
pub const DEFAULT_ALIAS_SIGIL: char = '#';
pub const DEFAULT_CONDITION: &str = "default";

pub type MetadataLoader =
    Box<dyn Fn(&Url) -> Result<Option<Arc<PackageMetadata>>, Error> + Send + Sync>;

pub type AncestorLister =
    Box<dyn Fn(&Url) -> Box<dyn Iterator<Item = Url>> + Send + Sync>;

/// Collaborators the resolver consults for everything that touches storage.
pub struct ResolutionHost {
    /// Returns the parsed `package.json` of a directory, or `None` when the
    /// directory has none.
    pub load_package_metadata: MetadataLoader,

    /// Lists the directories enclosing a file, nearest first.
    pub list_ancestor_directories: AncestorLister,
}

impl Default for ResolutionHost {
    fn default() -> ResolutionHost {
        ResolutionHost {
            load_package_metadata: Box::new(load_package_metadata),
            list_ancestor_directories: Box::new(|url: &Url| -> Box<dyn Iterator<Item = Url>> {
                Box::new(list_ancestor_directories(url))
            }),
        }
    }
}

impl fmt::Debug for ResolutionHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionHost").finish_non_exhaustive()
    }
}

impl ResolutionHost {
    /// A filesystem host keeping up to `capacity` parsed manifests around.
    pub fn cached(capacity: u64) -> ResolutionHost {
        let cache = PackageMetadataCache::new(capacity, load_package_metadata);

        ResolutionHost {
            load_package_metadata: Box::new(move |dir: &Url| cache.load(dir)),
            ..Default::default()
        }
    }
}

/// How conditional objects pick their branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionPriority {
    /// The first key of the object (in declaration order) that is part of the
    /// active set wins.
    #[default]
    Declaration,

    /// The first name of the active set (in caller order) that appears in the
    /// object wins.
    Caller,
}

/// Ordered set of condition names active for a resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConditionSet {
    names: IndexSet<String>,
}

impl ConditionSet {
    pub fn new<I, S>(names: I) -> ConditionSet
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConditionSet {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// `default` always matches, whether or not it was listed.
    pub fn contains(&self, name: &str) -> bool {
        name == DEFAULT_CONDITION || self.names.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> ConditionSet {
        ConditionSet::new(iter)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolutionConfig {
    /// Name of the directory dependencies are installed into.
    pub dependency_dir: String,

    /// Prefix marking specifiers resolved through the `imports` field.
    pub alias_sigil: char,

    pub condition_priority: ConditionPriority,

    /// Serve `pkg/default` from the package's `default` field when its
    /// `exports` don't map that subpath.
    pub allow_default_subpath: bool,

    /// Let a package import itself by name through its own `exports`.
    pub self_reference: bool,

    pub builtins: FxHashSet<String>,

    #[serde(skip)]
    pub host: ResolutionHost,
}

impl Default for ResolutionConfig {
    fn default() -> ResolutionConfig {
        ResolutionConfig {
            dependency_dir: DEFAULT_DEPENDENCY_DIR.to_string(),
            alias_sigil: DEFAULT_ALIAS_SIGIL,
            condition_priority: ConditionPriority::default(),
            allow_default_subpath: false,
            self_reference: true,
            builtins: FxHashSet::default(),
            host: ResolutionHost::default(),
        }
    }
}

impl ResolutionConfig {
    pub fn from_json_str(content: &str) -> Result<ResolutionConfig, serde_json::Error> {
        serde_json::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_set_keeps_caller_order() {
        let conditions = ConditionSet::new(["node", "require", "node"]);

        assert_eq!(conditions.iter().collect::<Vec<_>>(), vec!["node", "require"]);
        assert!(conditions.contains("require"));
        assert!(conditions.contains("default"));
        assert!(!conditions.contains("import"));
    }

    #[test]
    fn test_config_from_json() {
        let config = ResolutionConfig::from_json_str(r#"{
            "dependencyDir": "deps",
            "conditionPriority": "caller",
            "allowDefaultSubpath": true,
            "builtins": ["fs"]
        }"#).unwrap();

        assert_eq!(config.dependency_dir, "deps");
        assert_eq!(config.alias_sigil, '#');
        assert_eq!(config.condition_priority, ConditionPriority::Caller);
        assert!(config.allow_default_subpath);
        assert!(config.self_reference);
        assert!(config.builtins.contains("fs"));
    }
}
