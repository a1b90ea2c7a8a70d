use std::fmt;
use std::str::FromStr;

use crate::build_context::{self, BuildFile};
use crate::codec::ContractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::JavaScript];

    /// Wire name, as supplied by callers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
        }
    }

    /// Filename the entrypoint loads from [`crate::FUNCTION_DIR`].
    pub fn handler_file(self) -> &'static str {
        match self {
            Self::Python => "function.py",
            Self::JavaScript => "function.js",
        }
    }

    /// Image repository, without tag.
    pub fn image_repository(self) -> &'static str {
        match self {
            Self::Python => "python-runner",
            Self::JavaScript => "node-runner",
        }
    }

    /// Fully qualified image name: `<repository>:<context hash>`.
    ///
    /// The tag changes whenever the embedded build context changes, so an
    /// image built from an older entrypoint is never reused.
    pub fn image_name(self) -> String {
        format!("{}:{}", self.image_repository(), self.context_hash())
    }

    pub fn build_context(self) -> &'static [BuildFile] {
        match self {
            Self::Python => build_context::PYTHON,
            Self::JavaScript => build_context::JAVASCRIPT,
        }
    }

    pub fn context_hash(self) -> String {
        build_context::context_hash(self.build_context())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s)
            .ok_or_else(|| ContractError::UnsupportedLanguage(s.to_string()))
    }
}
