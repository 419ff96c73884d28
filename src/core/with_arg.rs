//! Parser for combined `--with` / `--replace` arguments.
//!
//! Grammar: `module[@version][=replacement]`
//!
//! The last `@` before any `=` separates the version, so module paths that
//! themselves contain `@` are tolerated as long as a version follows.

use std::path::Path;
use std::str::FromStr;

use crate::core::dependency::Dependency;
use crate::core::errors::ParseError;
use crate::core::replace::{resolve_replacement, Replace};

/// A parsed `module[@version][=replacement]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithArg {
    pub module: String,
    pub version: Option<String>,
    pub replacement: Option<String>,
}

impl WithArg {
    /// Split a raw argument into module, version and replacement.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();

        let (head, replacement) = match trimmed.split_once('=') {
            Some((_, "")) => {
                return Err(ParseError::MissingReplacement {
                    raw: raw.to_string(),
                })
            }
            Some((head, repl)) => (head, Some(repl.to_string())),
            None => (trimmed, None),
        };

        let (module, version) = match head.rsplit_once('@') {
            Some((_, "")) => {
                return Err(ParseError::MissingVersion {
                    raw: raw.to_string(),
                })
            }
            Some((module, version)) => (module, Some(version.to_string())),
            None => (head, None),
        };

        let module = module.trim_end_matches('/');
        if module.is_empty() {
            return Err(ParseError::EmptyModule {
                raw: raw.to_string(),
            });
        }

        Ok(WithArg {
            module: module.to_string(),
            version,
            replacement,
        })
    }

    /// Parse a `--replace` argument, which must carry a replacement.
    pub fn parse_replace(raw: &str) -> Result<Self, ParseError> {
        let arg = Self::parse(raw)?;
        if arg.replacement.is_none() {
            return Err(ParseError::ReplacementRequired {
                raw: raw.to_string(),
            });
        }
        Ok(arg)
    }

    /// The plugin this argument designates.
    pub fn dependency(&self) -> Dependency {
        let dep = Dependency::new(&self.module);
        match &self.version {
            Some(v) => dep.with_version(v.clone()),
            None => dep,
        }
    }

    /// The override this argument requests, with relative directories
    /// resolved against `cwd`.
    pub fn replace(&self, cwd: &Path) -> Option<Replace> {
        let replacement = self.replacement.as_deref()?;
        Some(Replace::new(
            self.dependency().to_string(),
            resolve_replacement(replacement, cwd),
        ))
    }
}

impl FromStr for WithArg {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WithArg::parse(s)
    }
}
