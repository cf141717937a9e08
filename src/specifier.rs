use url::Url;

use crate::{
    config::ResolutionConfig,
    error::{Error, ErrorKind, ResolutionFailure},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Specifier<'a> {
    /// `./x`, `../x`, `/x`: joined onto the importer URL as-is.
    Relative(&'a str),

    /// Anything carrying a URL scheme (`file:`, `node:`, `data:`...).
    Url(Url),

    /// `#alias` requests, looked up in the importer's own `imports` table.
    Internal(&'a str),

    /// `pkg`, `pkg/sub/path`, `@scope/pkg/sub/path`.
    Bare(BareSpecifier<'a>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BareSpecifier<'a> {
    pub name: &'a str,
    /// Either `.` or a `./`-prefixed path, matching mapping table keys.
    pub subpath: String,
}

pub fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == ".."
}

pub fn classify<'a>(specifier: &'a str, config: &ResolutionConfig) -> Result<Specifier<'a>, Error> {
    if specifier.is_empty() {
        return Err(invalid(specifier, "Specifier must not be empty"));
    }

    if is_path_specifier(specifier) {
        return Ok(Specifier::Relative(specifier));
    }

    if let Ok(url) = Url::parse(specifier) {
        return Ok(Specifier::Url(url));
    }

    if let Some(alias) = specifier.strip_prefix(config.alias_sigil) {
        if alias.is_empty() || alias.starts_with('/') {
            return Err(invalid(specifier, "Internal specifiers need a name after the alias prefix"));
        }

        return Ok(Specifier::Internal(specifier));
    }

    parse_bare_identifier(specifier, config).map(Specifier::Bare)
}

/// Splits a bare specifier into its package name and subpath. Scoped names
/// (`@scope/name`) count as a single unit.
pub fn parse_bare_identifier<'a>(specifier: &'a str, config: &ResolutionConfig) -> Result<BareSpecifier<'a>, Error> {
    let name_len = if specifier.starts_with('@') {
        let Some(scope_end) = specifier.find('/') else {
            return Err(invalid(specifier, "Scoped package names must be of the form @scope/name"));
        };

        let rest = &specifier[scope_end + 1..];
        scope_end + 1 + rest.find('/').unwrap_or(rest.len())
    } else {
        specifier.find('/').unwrap_or(specifier.len())
    };

    let name = &specifier[..name_len];

    let valid_name = !name.is_empty()
        && !name.ends_with('/')
        && !name.starts_with('.')
        && name != "@"
        && !name.starts_with("@/")
        && !name.contains(['%', '\\', '?', '#'])
        && !name.contains(char::is_whitespace)
        && !name.contains(config.alias_sigil);

    if !valid_name {
        return Err(invalid(specifier, format!("'{name}' is not a valid package name")));
    }

    let subpath = match specifier[name_len..].strip_prefix('/') {
        None => ".".to_string(),
        Some(rest) => {
            if has_encoded_separator(rest) {
                return Err(invalid(specifier, "Subpaths must not contain encoded or backslash separators"));
            }

            format!("./{rest}")
        }
    };

    Ok(BareSpecifier { name, subpath })
}

fn has_encoded_separator(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();

    lower.contains("%2f") || lower.contains("%5c") || path.contains('\\')
}

fn invalid(specifier: &str, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidSpecifier, ResolutionFailure {
        message: message.into(),
        specifier: specifier.to_string(),
        boundary: None,
        key: None,
        target: None,
    })
}
