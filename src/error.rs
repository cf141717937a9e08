use std::fmt;

use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidSpecifier(Box<ResolutionFailure>),

    #[error(transparent)]
    PackageNotFound(Box<ResolutionFailure>),

    #[error(transparent)]
    NoPackageBoundary(Box<ResolutionFailure>),

    #[error(transparent)]
    MalformedMapping(Box<ResolutionFailure>),

    #[error(transparent)]
    NoMapping(Box<ResolutionFailure>),

    #[error(transparent)]
    AmbiguousMapping(Box<ResolutionFailure>),

    #[error(transparent)]
    NoConditionMatch(Box<ResolutionFailure>),

    #[error(transparent)]
    InvalidTarget(Box<ResolutionFailure>),

    #[error(transparent)]
    PathTraversal(Box<ResolutionFailure>),

    #[error(transparent)]
    EncapsulationViolation(Box<ResolutionFailure>),

    #[error(transparent)]
    FailedMetadataLoad(Box<FailedMetadataLoad>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidSpecifier,
    PackageNotFound,
    NoPackageBoundary,
    MalformedMapping,
    NoMapping,
    AmbiguousMapping,
    NoConditionMatch,
    InvalidTarget,
    PathTraversal,
    EncapsulationViolation,
    FailedMetadataLoad,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidSpecifier => "InvalidSpecifier",
            ErrorKind::PackageNotFound => "PackageNotFound",
            ErrorKind::NoPackageBoundary => "NoPackageBoundary",
            ErrorKind::MalformedMapping => "MalformedMapping",
            ErrorKind::NoMapping => "NoMapping",
            ErrorKind::AmbiguousMapping => "AmbiguousMapping",
            ErrorKind::NoConditionMatch => "NoConditionMatch",
            ErrorKind::InvalidTarget => "InvalidTarget",
            ErrorKind::PathTraversal => "PathTraversal",
            ErrorKind::EncapsulationViolation => "EncapsulationViolation",
            ErrorKind::FailedMetadataLoad => "FailedMetadataLoad",
        };

        f.write_str(name)
    }
}

/// Context attached to every resolution error: the request that failed,
/// the package boundary it was evaluated against, and the mapping key or
/// target that produced the failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ResolutionFailure {
    pub message: String,
    pub specifier: String,

    pub boundary: Option<Url>,

    pub key: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct FailedMetadataLoad {
    pub message: String,
    pub package_json: Option<Url>,
}

impl Error {
    pub fn new(kind: ErrorKind, failure: ResolutionFailure) -> Error {
        let failure = Box::new(failure);

        match kind {
            ErrorKind::InvalidSpecifier => Error::InvalidSpecifier(failure),
            ErrorKind::PackageNotFound => Error::PackageNotFound(failure),
            ErrorKind::NoPackageBoundary => Error::NoPackageBoundary(failure),
            ErrorKind::MalformedMapping => Error::MalformedMapping(failure),
            ErrorKind::NoMapping => Error::NoMapping(failure),
            ErrorKind::AmbiguousMapping => Error::AmbiguousMapping(failure),
            ErrorKind::NoConditionMatch => Error::NoConditionMatch(failure),
            ErrorKind::InvalidTarget => Error::InvalidTarget(failure),
            ErrorKind::PathTraversal => Error::PathTraversal(failure),
            ErrorKind::EncapsulationViolation => Error::EncapsulationViolation(failure),
            ErrorKind::FailedMetadataLoad => Error::FailedMetadataLoad(Box::new(FailedMetadataLoad {
                message: failure.message,
                package_json: failure.boundary,
            })),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidSpecifier(_) => ErrorKind::InvalidSpecifier,
            Error::PackageNotFound(_) => ErrorKind::PackageNotFound,
            Error::NoPackageBoundary(_) => ErrorKind::NoPackageBoundary,
            Error::MalformedMapping(_) => ErrorKind::MalformedMapping,
            Error::NoMapping(_) => ErrorKind::NoMapping,
            Error::AmbiguousMapping(_) => ErrorKind::AmbiguousMapping,
            Error::NoConditionMatch(_) => ErrorKind::NoConditionMatch,
            Error::InvalidTarget(_) => ErrorKind::InvalidTarget,
            Error::PathTraversal(_) => ErrorKind::PathTraversal,
            Error::EncapsulationViolation(_) => ErrorKind::EncapsulationViolation,
            Error::FailedMetadataLoad(_) => ErrorKind::FailedMetadataLoad,
        }
    }

    pub fn failure(&self) -> Option<&ResolutionFailure> {
        match self {
            Error::InvalidSpecifier(f)
            | Error::PackageNotFound(f)
            | Error::NoPackageBoundary(f)
            | Error::MalformedMapping(f)
            | Error::NoMapping(f)
            | Error::AmbiguousMapping(f)
            | Error::NoConditionMatch(f)
            | Error::InvalidTarget(f)
            | Error::PathTraversal(f)
            | Error::EncapsulationViolation(f) => Some(f),
            Error::FailedMetadataLoad(_) => None,
        }
    }

    pub(crate) fn failure_mut(&mut self) -> Option<&mut ResolutionFailure> {
        match self {
            Error::InvalidSpecifier(f)
            | Error::PackageNotFound(f)
            | Error::NoPackageBoundary(f)
            | Error::MalformedMapping(f)
            | Error::NoMapping(f)
            | Error::AmbiguousMapping(f)
            | Error::NoConditionMatch(f)
            | Error::InvalidTarget(f)
            | Error::PathTraversal(f)
            | Error::EncapsulationViolation(f) => Some(f),
            Error::FailedMetadataLoad(_) => None,
        }
    }

    /// Fills in the request and boundary for errors raised by components
    /// that only know about the mapping they were evaluating.
    pub(crate) fn with_request(mut self, specifier: &str, boundary: Option<&Url>) -> Error {
        if let Some(failure) = self.failure_mut() {
            if failure.specifier.is_empty() {
                failure.specifier = specifier.to_string();
            }

            if failure.boundary.is_none() {
                failure.boundary = boundary.cloned();
            }
        }

        self
    }

    pub(crate) fn with_key(mut self, key: &str) -> Error {
        if let Some(failure) = self.failure_mut() {
            if failure.key.is_none() {
                failure.key = Some(key.to_string());
            }
        }

        self
    }
}

/// Builds an error of the given kind with only a message; the remaining
/// context is attached as the error travels back up through the facade.
pub(crate) fn fail(kind: ErrorKind, message: impl Into<String>) -> Error {
    Error::new(kind, ResolutionFailure {
        message: message.into(),
        specifier: String::new(),
        boundary: None,
        key: None,
        target: None,
    })
}

pub(crate) fn fail_target(kind: ErrorKind, message: impl Into<String>, target: &str) -> Error {
    Error::new(kind, ResolutionFailure {
        message: message.into(),
        specifier: String::new(),
        boundary: None,
        key: None,
        target: Some(target.to_string()),
    })
}

pub(crate) fn failed_metadata_load(package_json: &Url, message: impl Into<String>) -> Error {
    Error::FailedMetadataLoad(Box::new(FailedMetadataLoad {
        message: message.into(),
        package_json: Some(package_json.clone()),
    }))
}
