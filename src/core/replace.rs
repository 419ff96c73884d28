//! Override directives and the ordered set that holds them.
//!
//! An override substitutes a different source for a dependency: either a
//! filesystem directory or another module at a version. Overrides come
//! from two origins. Inherited ones are copied from the developer's own
//! `go.mod`, explicit ones are requested on the command line. When two
//! overrides name the same target the later one wins.

use std::fmt::Write as _;
use std::path::Path;

use crate::util::fs::clean_path;

/// A single source-replacement directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    /// Target as `path` or `path@version`
    old: String,

    /// Replacement as a directory or `path@version`
    new: String,
}

/// Where an override came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Copied from the developer's own manifest.
    Inherited,
    /// Requested with `--with` or `--replace`.
    Explicit,
}

impl Replace {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Self {
        Replace {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Target token, `path[@version]`.
    pub fn old(&self) -> &str {
        &self.old
    }

    /// Replacement token, a directory or `path@version`.
    pub fn new_location(&self) -> &str {
        &self.new
    }

    /// Module path being replaced.
    pub fn target_path(&self) -> &str {
        split_version(&self.old).0
    }

    /// Version being replaced, if the override is pinned to one.
    pub fn target_version(&self) -> Option<&str> {
        split_version(&self.old).1
    }

    /// Check whether the replacement is a directory on disk.
    pub fn is_local(&self) -> bool {
        is_filesystem_path(&self.new)
    }

    /// Check whether this override covers a package path.
    ///
    /// A package is covered when it is the target module or lives below it.
    pub fn covers(&self, package_path: &str) -> bool {
        let target = self.target_path();
        package_path == target
            || (package_path.starts_with(target)
                && package_path.as_bytes().get(target.len()) == Some(&b'/'))
    }

    /// Render as a `go.mod` replace line.
    pub fn manifest_line(&self) -> String {
        let (old_path, old_version) = split_version(&self.old);
        let mut line = format!("replace {}", quote_token(old_path));
        if let Some(v) = old_version {
            line.push(' ');
            line.push_str(&quote_token(v));
        }
        line.push_str(" => ");
        if self.is_local() {
            line.push_str(&quote_token(&self.new));
        } else {
            let (new_path, new_version) = split_version(&self.new);
            line.push_str(&quote_token(new_path));
            if let Some(v) = new_version {
                line.push(' ');
                line.push_str(&quote_token(v));
            }
        }
        line
    }
}

fn split_version(token: &str) -> (&str, Option<&str>) {
    match token.rsplit_once('@') {
        Some((path, version)) if !version.is_empty() => (path, Some(version)),
        _ => (token, None),
    }
}

/// Quote a `go.mod` token when the manifest lexer would split or misread it.
fn quote_token(token: &str) -> String {
    if must_quote(token) {
        go_quote(token)
    } else {
        token.to_string()
    }
}

fn must_quote(token: &str) -> bool {
    let multi = token.chars().nth(1).is_some();
    let special = token.chars().any(|c| match c {
        ' ' | '"' | '\'' | '`' => true,
        '(' | ')' | '[' | ']' | '{' | '}' | ',' => multi,
        c => !is_printable(c),
    });
    special || token.is_empty() || token.contains("//") || token.contains("/*")
}

/// Approximates Go's `unicode.IsPrint`: ASCII space is the only printable space.
fn is_printable(c: char) -> bool {
    c == ' ' || !(c.is_control() || c.is_whitespace() || is_format_char(c))
}

fn is_format_char(c: char) -> bool {
    matches!(
        c,
        '\u{00ad}'
            | '\u{200b}'..='\u{200f}'
            | '\u{2028}'..='\u{202e}'
            | '\u{2060}'..='\u{2064}'
            | '\u{feff}'
    )
}

/// Render a Go interpreted string literal.
fn go_quote(token: &str) -> String {
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\u{07}' => quoted.push_str("\\a"),
            '\u{08}' => quoted.push_str("\\b"),
            '\u{0c}' => quoted.push_str("\\f"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            '\u{0b}' => quoted.push_str("\\v"),
            c if c != ' ' && !is_printable(c) => {
                let code = c as u32;
                if code < 0x80 {
                    let _ = write!(quoted, "\\x{:02x}", code);
                } else if code <= 0xffff {
                    let _ = write!(quoted, "\\u{:04x}", code);
                } else {
                    let _ = write!(quoted, "\\U{:08x}", code);
                }
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Check whether a replacement names a filesystem directory.
///
/// Follows the toolchain's rule: absolute paths and paths starting with
/// `./` or `../` are directories; anything else is a module path.
pub fn is_filesystem_path(location: &str) -> bool {
    is_relative_path(location) || Path::new(location).is_absolute()
}

fn is_relative_path(location: &str) -> bool {
    location == "."
        || location == ".."
        || location.starts_with("./")
        || location.starts_with("../")
        || (cfg!(windows) && (location.starts_with(".\\") || location.starts_with("..\\")))
}

/// Resolve a relative directory replacement against `cwd`.
///
/// The synthesized workspace lives elsewhere, so a relative path written
/// verbatim would point at the wrong directory.
pub fn resolve_replacement(location: &str, cwd: &Path) -> String {
    if !is_relative_path(location) {
        return location.to_string();
    }
    let resolved = clean_path(&cwd.join(location));
    tracing::info!("Resolved relative replacement {} to {}", location, resolved.display());
    resolved.to_string_lossy().into_owned()
}

/// Join a directory replacement from a developer manifest onto the module directory.
pub fn resolve_inherited(location: &str, module_dir: &Path) -> String {
    if Path::new(location).is_absolute() {
        return location.to_string();
    }
    let resolved = clean_path(&module_dir.join(location));
    tracing::info!("Resolved relative replacement {} to {}", location, resolved.display());
    resolved.to_string_lossy().into_owned()
}

/// An ordered collection of overrides keyed by target token.
///
/// Insertion order is preserved for rendering; a repeated target keeps its
/// original position but takes the newer replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideSet {
    entries: Vec<(Replace, Origin)>,
}

impl OverrideSet {
    pub fn new() -> Self {
        OverrideSet {
            entries: Vec::new(),
        }
    }

    /// Build a set from the developer's own overrides.
    pub fn from_inherited(inherited: impl IntoIterator<Item = Replace>) -> Self {
        let mut set = OverrideSet::new();
        set.merge_inherited(inherited);
        set
    }

    /// Copy every override of the developer's manifest into this set.
    pub fn merge_inherited(&mut self, inherited: impl IntoIterator<Item = Replace>) {
        for replace in inherited {
            self.insert(replace, Origin::Inherited);
        }
    }

    /// Merge another set; its entries supersede ours.
    pub fn merge(&mut self, other: &OverrideSet) {
        for (replace, origin) in &other.entries {
            self.insert(replace.clone(), *origin);
        }
    }

    /// Insert an override, returning the one it superseded.
    pub fn insert(&mut self, replace: Replace, origin: Origin) -> Option<Replace> {
        let Some(slot) = self.entries.iter_mut().find(|(r, _)| r.old == replace.old) else {
            self.entries.push((replace, origin));
            return None;
        };

        let (previous, previous_origin) = std::mem::replace(slot, (replace, origin));
        let current = &slot.0;
        if previous.new != current.new {
            match (previous_origin, origin) {
                (Origin::Explicit, Origin::Explicit) => tracing::warn!(
                    "Replacement for {} given more than once; using {} instead of {}",
                    current.old,
                    current.new,
                    previous.new
                ),
                _ => tracing::info!(
                    "Replacement for {} => {} supersedes {}",
                    current.old,
                    current.new,
                    previous.new
                ),
            }
        }
        Some(previous)
    }

    /// Look up the override for an exact target token.
    pub fn get(&self, old: &str) -> Option<&Replace> {
        self.entries.iter().map(|(r, _)| r).find(|r| r.old == old)
    }

    /// Find the override whose target module contains a package.
    ///
    /// The longest matching target wins, since a package may live in a
    /// nested module.
    pub fn covering(&self, package_path: &str) -> Option<&Replace> {
        self.iter()
            .filter(|r| r.covers(package_path))
            .max_by_key(|r| r.target_path().len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Replace> {
        self.entries.iter().map(|(r, _)| r)
    }

    /// Get the origin of the override for a target token.
    pub fn origin(&self, old: &str) -> Option<Origin> {
        self.entries
            .iter()
            .find(|(r, _)| r.old == old)
            .map(|(_, o)| *o)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_replacement() {
        let cwd = Path::new("/home/u/proj");
        assert_eq!(
            resolve_replacement("./local/dep", cwd),
            Path::new("/home/u/proj/local/dep").to_string_lossy()
        );
        assert_eq!(
            resolve_replacement("../sibling", cwd),
            Path::new("/home/u/sibling").to_string_lossy()
        );
        // Module paths are left alone
        assert_eq!(
            resolve_replacement("github.com/fork/dep@v1.0.0", cwd),
            "github.com/fork/dep@v1.0.0"
        );
    }

    #[test]
    fn test_is_filesystem_path() {
        assert!(is_filesystem_path("./dep"));
        assert!(is_filesystem_path("../dep"));
        assert!(is_filesystem_path("."));
        #[cfg(unix)]
        assert!(is_filesystem_path("/abs/dep"));
        assert!(!is_filesystem_path("github.com/fork/dep"));
    }

    #[test]
    fn test_manifest_line() {
        let local = Replace::new("github.com/example/dep", "/home/u/proj/local/dep");
        assert_eq!(
            local.manifest_line(),
            "replace github.com/example/dep => /home/u/proj/local/dep"
        );

        let module = Replace::new("github.com/example/dep@v1.0.0", "github.com/fork/dep@v1.0.1");
        assert_eq!(
            module.manifest_line(),
            "replace github.com/example/dep v1.0.0 => github.com/fork/dep v1.0.1"
        );

        let spaced = Replace::new("github.com/example/dep", "/home/u/my proj");
        assert_eq!(
            spaced.manifest_line(),
            "replace github.com/example/dep => \"/home/u/my proj\""
        );
    }

    #[test]
    fn test_quote_token() {
        // Bare tokens
        assert_eq!(quote_token("/home/u/proj"), "/home/u/proj");
        assert_eq!(quote_token("v1.0.0"), "v1.0.0");
        assert_eq!(quote_token(","), ",");
        assert_eq!(quote_token("/home/u/é"), "/home/u/é");

        // Lexer separators
        assert_eq!(quote_token("/home/u/a,b"), "\"/home/u/a,b\"");
        assert_eq!(quote_token("/home/u/[x]"), "\"/home/u/[x]\"");
        assert_eq!(quote_token("/home/u/{x}"), "\"/home/u/{x}\"");
        assert_eq!(quote_token("/home/u/(x)"), "\"/home/u/(x)\"");
        assert_eq!(quote_token("it's"), "\"it's\"");
        assert_eq!(quote_token(""), "\"\"");

        // Comment markers
        assert_eq!(quote_token("/home//u"), "\"/home//u\"");
        assert_eq!(quote_token("/home/*u"), "\"/home/*u\"");

        // Escapes
        assert_eq!(quote_token("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote_token("C:\\dep x"), "\"C:\\\\dep x\"");
        assert_eq!(quote_token("a\tb"), "\"a\\tb\"");
        assert_eq!(quote_token("a\u{1}b"), "\"a\\x01b\"");
        assert_eq!(quote_token("a\u{a0}b"), "\"a\\u00a0b\"");
    }

    #[test]
    fn test_covers() {
        let r = Replace::new("example.com/a", "/src/a");
        assert!(r.covers("example.com/a"));
        assert!(r.covers("example.com/a/sub/pkg"));
        assert!(!r.covers("example.com/ab"));
    }

    #[test]
    fn test_last_write_wins() {
        let mut set = OverrideSet::from_inherited([
            Replace::new("example.com/dep", "/inherited/dep"),
            Replace::new("example.com/other", "/inherited/other"),
        ]);
        let superseded = set.insert(Replace::new("example.com/dep", "/explicit/dep"), Origin::Explicit);

        assert_eq!(superseded.unwrap().new_location(), "/inherited/dep");
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("example.com/dep").unwrap().new_location(), "/explicit/dep");
        assert_eq!(set.origin("example.com/dep"), Some(Origin::Explicit));
        // Original position is kept
        assert_eq!(set.iter().next().unwrap().old(), "example.com/dep");
    }

    #[test]
    fn test_covering_prefers_longest_target() {
        let set = OverrideSet::from_inherited([
            Replace::new("example.com/a", "/src/a"),
            Replace::new("example.com/a/nested", "/src/nested"),
        ]);
        let found = set.covering("example.com/a/nested/pkg").unwrap();
        assert_eq!(found.target_path(), "example.com/a/nested");
        assert!(set.covering("example.com/b").is_none());
    }
}
