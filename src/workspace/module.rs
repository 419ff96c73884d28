//! Discovery of the module under development.
//!
//! `go list -m -json all` reports the main module and every module with a
//! replace directive. The main module becomes an implicit plugin, and its
//! replace directives are carried into the synthesized workspace since
//! they only apply to the top-level `go.mod`.

use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::core::dependency::Dependency;
use crate::core::errors::BuildError;
use crate::core::replace::{resolve_inherited, Replace};
use crate::util::cancel::CancelToken;
use crate::util::fs::{normalize_path, relative_path};
use crate::util::process::ProcessBuilder;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListModule {
    path: String,
    #[serde(default)]
    dir: Option<String>,
    #[serde(default)]
    main: bool,
    #[serde(default)]
    replace: Option<GoListReplace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GoListReplace {
    path: String,
    #[serde(default)]
    version: Option<String>,
}

/// The developer's module as reported by the toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevModule {
    /// Declared module path
    pub path: String,

    /// Root directory of the module
    pub dir: PathBuf,

    /// Replace directives of the module's manifest, including the
    /// self-override pointing the module at its own directory
    pub replacements: Vec<Replace>,
}

/// The package being iterated on, located within its module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevelopmentContext {
    /// The module containing the working directory
    pub module: DevModule,

    /// Import path of the package in the working directory
    pub import_path: String,
}

impl DevelopmentContext {
    /// Locate the package in `cwd` within `module`.
    pub fn new(module: DevModule, cwd: &Path) -> Result<Self, BuildError> {
        let import_path = normalize_import_path(&module.path, cwd, &module.dir)?;
        Ok(DevelopmentContext {
            module,
            import_path,
        })
    }

    /// The implicit plugin for the package under development.
    ///
    /// It carries no version; the self-override resolves it locally.
    pub fn plugin(&self) -> Dependency {
        Dependency::new(&self.import_path)
    }
}

/// Ask the toolchain about the module containing `cwd`.
pub fn discover(go: &Path, cwd: &Path, cancel: &CancelToken) -> Result<DevModule, BuildError> {
    let cmd = ProcessBuilder::new(go)
        .args(["list", "-mod=readonly", "-m", "-json", "all"])
        .cwd(cwd)
        .echo(false);

    let output = cmd.exec_captured(cancel).map_err(|e| {
        BuildError::resolution(format!("failed to run `{}`: {}", cmd.display_command(), e))
    })?;
    if !output.success() {
        if cancel.is_cancelled() {
            return Err(BuildError::Cancelled {
                command: cmd.display_command(),
            });
        }
        return Err(BuildError::resolution_with(
            format!("`{}` failed; is the current directory inside a Go module?", cmd.display_command()),
            output.combined,
        ));
    }

    parse_go_list_json(output.stdout.as_bytes(), cwd)
}

/// Parse the JSON stream of `go list -m -json all`.
///
/// Diagnostics the toolchain printed around the JSON objects are ignored.
/// When several main modules are listed (a Go workspace), the one whose
/// directory contains `cwd` is chosen, deepest first.
pub fn parse_go_list_json(out: &[u8], cwd: &Path) -> Result<DevModule, BuildError> {
    let start = out.iter().position(|&b| b == b'{').unwrap_or(out.len());
    let stream = serde_json::Deserializer::from_slice(&out[start..]).into_iter::<GoListModule>();

    let mut mains: Vec<(String, PathBuf)> = Vec::new();
    let mut replaced: Vec<(String, GoListReplace)> = Vec::new();
    for module in stream {
        let module = module.map_err(|e| {
            BuildError::resolution(format!("unable to parse `go list` output: {}", e))
        })?;
        if module.main {
            let dir = module.dir.ok_or_else(|| {
                BuildError::resolution(format!("main module {} has no directory", module.path))
            })?;
            mains.push((module.path, PathBuf::from(dir)));
            continue;
        }
        if let Some(replace) = module.replace {
            replaced.push((module.path, replace));
        }
    }

    let (path, dir) = select_main(mains, cwd)?;

    let mut replacements = vec![Replace::new(&path, dir.to_string_lossy())];
    for (target, replace) in replaced {
        let location = match replace.version.filter(|v| !v.is_empty()) {
            Some(version) => format!("{}@{}", replace.path, version),
            None => resolve_inherited(&replace.path, &dir),
        };
        replacements.push(Replace::new(target, location));
    }

    Ok(DevModule {
        path,
        dir,
        replacements,
    })
}

fn select_main(mut mains: Vec<(String, PathBuf)>, cwd: &Path) -> Result<(String, PathBuf), BuildError> {
    match mains.len() {
        0 => Err(BuildError::resolution(
            "no main module found; run from inside a Go module",
        )),
        1 => Ok(mains.remove(0)),
        _ => {
            let mut containing: Vec<_> = mains
                .into_iter()
                .filter(|(_, dir)| steps_below(cwd, dir).is_some())
                .collect();
            containing.sort_by_key(|(_, dir)| std::cmp::Reverse(dir.components().count()));
            let mut iter = containing.into_iter();
            match (iter.next(), iter.next()) {
                (Some(best), Some(next)) if best.1.components().count() == next.1.components().count() => {
                    Err(BuildError::resolution(format!(
                        "ambiguous main module: both {} and {} contain {}",
                        best.0,
                        next.0,
                        cwd.display()
                    )))
                }
                (Some(best), _) => Ok(best),
                (None, _) => Err(BuildError::resolution(format!(
                    "none of the workspace modules contain {}",
                    cwd.display()
                ))),
            }
        }
    }
}

/// Relative path segments from `module_dir` down to `cwd`, if `cwd` is inside it.
fn steps_below(cwd: &Path, module_dir: &Path) -> Option<Vec<String>> {
    let segments = |rel: PathBuf| -> Option<Vec<String>> {
        rel.components()
            .map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    };

    if let Ok(rel) = cwd.strip_prefix(module_dir) {
        return segments(rel.to_path_buf());
    }
    // The toolchain reports resolved paths; the shell may not
    let cwd = normalize_path(cwd);
    let module_dir = normalize_path(module_dir);
    if !cwd.starts_with(&module_dir) {
        return None;
    }
    relative_path(&module_dir, &cwd).and_then(segments)
}

/// Compute the import path of the package in `cwd`.
///
/// A module `foo/a` rooted at `/home/foo/a`, worked on from
/// `/home/foo/a/b`, yields `foo/a/b`.
pub fn normalize_import_path(
    module_path: &str,
    cwd: &Path,
    module_dir: &Path,
) -> Result<String, BuildError> {
    let segments = steps_below(cwd, module_dir).ok_or_else(|| {
        BuildError::resolution(format!(
            "working directory {} is outside the module root {}",
            cwd.display(),
            module_dir.display()
        ))
    })?;

    let mut import_path = module_path.trim_end_matches('/').to_string();
    for segment in segments {
        import_path.push('/');
        import_path.push_str(&segment);
    }
    Ok(import_path)
}
