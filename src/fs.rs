use std::{io::ErrorKind, sync::Arc};

use url::Url;

use crate::{
    error::{Error, failed_metadata_load},
    manifest::PackageMetadata,
};

pub const PACKAGE_JSON: &str = "package.json";

/// Reads `<dir>/package.json` from disk.
///
/// A missing file (or a URL that doesn't point at the local filesystem) means
/// the directory isn't a package boundary; a file that exists but can't be
/// read or parsed is an error.
pub fn load_package_metadata(dir: &Url) -> Result<Option<Arc<PackageMetadata>>, Error> {
    let Ok(package_json) = dir.join(PACKAGE_JSON) else {
        return Ok(None);
    };

    let Ok(path) = package_json.to_file_path() else {
        return Ok(None);
    };

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(None);
        }
        Err(err) => {
            return Err(failed_metadata_load(&package_json, format!("Failed to read {}: {err}", path.display())));
        }
    };

    PackageMetadata::from_json_str(&package_json, &content).map(|metadata| Some(Arc::new(metadata)))
}

type Loader = fn(&Url) -> Result<Option<Arc<PackageMetadata>>, Error>;

/// Sharded LRU in front of a metadata loader. Negative lookups are cached
/// too, since most ancestor directories don't hold a manifest.
#[derive(Debug)]
pub struct PackageMetadataCache {
    lru: concurrent_lru::sharded::LruCache<Url, Option<Arc<PackageMetadata>>>,
    open: Loader,
}

impl PackageMetadataCache {
    pub fn new(n: u64, open: Loader) -> PackageMetadataCache {
        PackageMetadataCache { lru: concurrent_lru::sharded::LruCache::new(n), open }
    }

    pub fn load(&self, dir: &Url) -> Result<Option<Arc<PackageMetadata>>, Error> {
        let entry = self.lru.get_or_try_init(dir.clone(), 1, |dir| (self.open)(dir))?;

        Ok(entry.value().clone())
    }
}
