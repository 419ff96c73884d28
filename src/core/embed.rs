//! Directories embedded into the produced binary.

use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::core::errors::ParseError;

/// A directory to embed, optionally under an aliased subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedDir {
    /// Subdirectory name inside the embedded file system; empty for the root
    pub alias: String,

    /// Source directory on disk
    pub dir: PathBuf,
}

impl EmbedDir {
    /// Parse `[alias:]dir`.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let raw_trimmed = raw.trim();
        let (alias, dir) = match raw_trimmed.split_once(':') {
            // `C:\static` is a drive letter, not an alias
            Some((drive, rest))
                if cfg!(windows)
                    && drive.len() == 1
                    && (rest.starts_with('\\') || rest.starts_with('/')) =>
            {
                ("", raw_trimmed)
            }
            Some((alias, dir)) => (alias, dir),
            None => ("", raw_trimmed),
        };

        if dir.is_empty() {
            return Err(ParseError::EmptyEmbedDir {
                raw: raw.to_string(),
            });
        }
        // The alias names a directory inside the workspace's `files/`
        if !Path::new(alias)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(ParseError::InvalidEmbedAlias {
                raw: raw.to_string(),
            });
        }

        Ok(EmbedDir {
            alias: alias.to_string(),
            dir: PathBuf::from(dir),
        })
    }
}

impl FromStr for EmbedDir {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EmbedDir::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliased() {
        let embed = EmbedDir::parse("assets:./static").unwrap();
        assert_eq!(embed.alias, "assets");
        assert_eq!(embed.dir, PathBuf::from("./static"));
    }

    #[test]
    fn test_unaliased() {
        let embed = EmbedDir::parse("./static").unwrap();
        assert_eq!(embed.alias, "");
        assert_eq!(embed.dir, PathBuf::from("./static"));
    }

    #[test]
    fn test_missing_dir() {
        assert!(matches!(
            EmbedDir::parse("assets:"),
            Err(ParseError::EmptyEmbedDir { .. })
        ));
        assert!(EmbedDir::parse("").is_err());
    }

    #[test]
    fn test_alias_stays_inside_workspace() {
        for raw in ["/abs:./static", "../x:./static", "a/../../b:./static", "./a:./static"] {
            assert_eq!(
                EmbedDir::parse(raw),
                Err(ParseError::InvalidEmbedAlias {
                    raw: raw.to_string()
                }),
                "{}",
                raw
            );
        }
        let nested = EmbedDir::parse("a/b:./static").unwrap();
        assert_eq!(nested.alias, "a/b");
    }
}
