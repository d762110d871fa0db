//! Shared value types

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Programming language of a generated artifact.
///
/// Only [`Language::Python`] has toolchain support (file suffix, package
/// markers, reference statements, execution). Any other name is carried as
/// [`Language::Other`] so that operations needing toolchain support can
/// report it as not implemented at the point of use.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    Python,
    Other(String),
}

impl Language {
    /// Parse a language name, case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("python") {
            Self::Python
        } else {
            Self::Other(trimmed.to_string())
        }
    }

    /// Canonical lowercase name, also used as the Markdown fence tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Python => "python",
            Self::Other(name) => name.as_str(),
        }
    }

    /// File suffix appended to artifact locations, including the dot.
    #[must_use]
    pub const fn suffix(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some(".py"),
            Self::Other(_) => None,
        }
    }

    /// File that must exist in a directory for it to be importable.
    #[must_use]
    pub const fn package_marker(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some("__init__.py"),
            Self::Other(_) => None,
        }
    }

    /// Line that starts a script's entry-point block.
    #[must_use]
    pub const fn main_guard(&self) -> Option<&'static str> {
        match self {
            Self::Python => Some("if __name__ == \"__main__\":"),
            Self::Other(_) => None,
        }
    }

    #[must_use]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::Python)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.as_str().to_string()
    }
}
