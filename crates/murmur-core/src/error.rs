// SPDX-License-Identifier: Apache-2.0

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by every layer of the platform.
///
/// `NotFound` surfaces as a user-visible 404 document; everything else is an
/// internal fault that surfaces as the 500 document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    NotFound {
        kind: &'static str,
        ident: String,
    },
    Storage {
        context: &'static str,
        message: String,
    },
    Media {
        context: &'static str,
        message: String,
    },
}

impl Error {
    #[must_use]
    pub fn not_found(kind: &'static str, ident: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            ident: ident.into(),
        }
    }

    #[must_use]
    pub fn storage(context: &'static str, source: impl fmt::Display) -> Self {
        Self::Storage {
            context,
            message: source.to_string(),
        }
    }

    #[must_use]
    pub fn media(context: &'static str, source: impl fmt::Display) -> Self {
        Self::Media {
            context,
            message: source.to_string(),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, ident } => write!(f, "{kind} not found: {ident}"),
            Self::Storage { context, message } => write!(f, "storage failure ({context}): {message}"),
            Self::Media { context, message } => write!(f, "media failure ({context}): {message}"),
        }
    }
}

impl std::error::Error for Error {}
