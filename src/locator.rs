use tracing::trace;
use url::Url;

use crate::{
    config::ResolutionConfig,
    error::{Error, ErrorKind, ResolutionFailure},
    manifest::PackageBoundary,
};

/// Directories enclosing a URL, nearest first, ending with the root.
#[derive(Clone, Debug)]
pub struct Ancestors {
    next: Option<Url>,
}

impl Iterator for Ancestors {
    type Item = Url;

    fn next(&mut self) -> Option<Url> {
        let current = self.next.take()?;

        if current.path() != "/" {
            self.next = current.join("../").ok().filter(|parent| parent != &current);
        }

        Some(current)
    }
}

/// For a file URL the first item is its directory; for a directory URL
/// (slash-terminated) it's the directory itself.
pub fn list_ancestor_directories(url: &Url) -> Ancestors {
    let mut start = url.join("./").ok();

    if let Some(dir) = &mut start {
        dir.set_query(None);
        dir.set_fragment(None);
    }

    Ancestors { next: start }
}

fn last_segment(dir: &Url) -> Option<&str> {
    dir.path_segments()?.rev().find(|segment| !segment.is_empty())
}

fn not_found(kind: ErrorKind, message: String, specifier: &str) -> Error {
    Error::new(kind, ResolutionFailure {
        message,
        specifier: specifier.to_string(),
        boundary: None,
        key: None,
        target: None,
    })
}

/// Walks up from `importer` looking for `<dependency-dir>/<name>/package.json`.
pub fn locate_dependency(name: &str, importer: &Url, config: &ResolutionConfig) -> Result<PackageBoundary, Error> {
    let storage = config.dependency_dir.as_str();

    for dir in (config.host.list_ancestor_directories)(importer) {
        // `node_modules/node_modules` is never a valid install location
        if last_segment(&dir) == Some(storage) {
            continue;
        }

        let Ok(root) = dir.join(&format!("{storage}/{name}/")) else {
            continue;
        };

        trace!(candidate = %root, "Probing dependency location");

        if let Some(metadata) = (config.host.load_package_metadata)(&root)? {
            return Ok(PackageBoundary { root, metadata });
        }
    }

    Err(not_found(
        ErrorKind::PackageNotFound,
        format!("Cannot find package '{name}' imported from {importer}"),
        name,
    ))
}

/// Finds the package governing `importer`: the nearest enclosing directory
/// with a `package.json`. The search stops at a dependency-storage directory,
/// which never belongs to a package itself.
pub fn locate_self(importer: &Url, config: &ResolutionConfig) -> Result<PackageBoundary, Error> {
    let storage = config.dependency_dir.as_str();

    for dir in (config.host.list_ancestor_directories)(importer) {
        if last_segment(&dir) == Some(storage) {
            break;
        }

        if let Some(metadata) = (config.host.load_package_metadata)(&dir)? {
            return Ok(PackageBoundary { root: dir, metadata });
        }
    }

    Err(not_found(
        ErrorKind::NoPackageBoundary,
        format!("No package.json found above {importer}"),
        "",
    ))
}
