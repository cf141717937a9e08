use std::fmt;

use url::Url;

use crate::{
    config::ResolutionConfig,
    error::{Error, ErrorKind},
    locator::locate_self,
    manifest::PackageType,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleFormat {
    Module,
    CommonJs,
    Json,
    Wasm,
    Builtin,
    Unknown,
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleFormat::Module => "module",
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::Json => "json",
            ModuleFormat::Wasm => "wasm",
            ModuleFormat::Builtin => "builtin",
            ModuleFormat::Unknown => "unknown",
        };

        f.write_str(name)
    }
}

/// Tells how a resolved URL should be loaded. Explicit extensions win;
/// `.js` and extensionless files follow the `type` of the package that
/// contains them.
pub fn resolve_format(url: &Url, config: &ResolutionConfig) -> Result<ModuleFormat, Error> {
    match url.scheme() {
        "node" => return Ok(ModuleFormat::Builtin),
        "file" => {}
        _ => return Ok(ModuleFormat::Unknown),
    }

    let file_name = url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let extension = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "",
    };

    match extension {
        "mjs" => Ok(ModuleFormat::Module),
        "cjs" => Ok(ModuleFormat::CommonJs),
        "json" => Ok(ModuleFormat::Json),
        "wasm" => Ok(ModuleFormat::Wasm),
        "js" | "" => package_format(url, config),
        _ => Ok(ModuleFormat::Unknown),
    }
}

fn package_format(url: &Url, config: &ResolutionConfig) -> Result<ModuleFormat, Error> {
    match locate_self(url, config) {
        Ok(boundary) if boundary.metadata.package_type == PackageType::Module => Ok(ModuleFormat::Module),
        Ok(_) => Ok(ModuleFormat::CommonJs),
        Err(err) if err.kind() == ErrorKind::NoPackageBoundary => Ok(ModuleFormat::CommonJs),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rstest::rstest;

    use super::*;
    use crate::{config::ResolutionHost, manifest::PackageMetadata};

    fn config() -> ResolutionConfig {
        let esm = Url::parse("file:///project/esm/").unwrap();

        ResolutionConfig {
            host: ResolutionHost {
                load_package_metadata: Box::new(move |dir: &Url| {
                    Ok((dir == &esm).then(|| Arc::new(PackageMetadata {
                        package_type: PackageType::Module,
                        ..Default::default()
                    })))
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[rstest]
    #[case("file:///project/esm/index.js", ModuleFormat::Module)]
    #[case("file:///project/esm/bin/cli", ModuleFormat::Module)]
    #[case("file:///project/esm/index.cjs", ModuleFormat::CommonJs)]
    #[case("file:///project/cjs/index.js", ModuleFormat::CommonJs)]
    #[case("file:///project/cjs/index.mjs", ModuleFormat::Module)]
    #[case("file:///project/esm/data.json", ModuleFormat::Json)]
    #[case("file:///project/esm/lib.wasm", ModuleFormat::Wasm)]
    #[case("file:///project/esm/style.css", ModuleFormat::Unknown)]
    #[case("file:///project/esm/.js", ModuleFormat::Module)]
    #[case("node:fs", ModuleFormat::Builtin)]
    #[case("https://example.com/mod.js", ModuleFormat::Unknown)]
    fn test_resolve_format(#[case] url: &str, #[case] expected: ModuleFormat) {
        let url = Url::parse(url).unwrap();

        assert_eq!(resolve_format(&url, &config()).unwrap(), expected, "url='{url}'");
    }
}
