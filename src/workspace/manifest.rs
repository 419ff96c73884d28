//! Rendering of the synthesized `go.mod`.

use std::fmt::Write;

use crate::core::dependency::Dependency;
use crate::core::replace::OverrideSet;
use crate::core::version::LATEST;

/// Module name of the synthesized main module.
pub const MAIN_MODULE: &str = "kengine";

/// Version the toolchain uses for modules known only through a replacement.
pub const ZERO_PSEUDO_VERSION: &str = "v0.0.0-00010101000000-000000000000";

/// A `require` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub module: String,
    pub version: String,
}

impl Requirement {
    pub fn new(module: impl Into<String>, version: impl Into<String>) -> Self {
        Requirement {
            module: module.into(),
            version: version.into(),
        }
    }
}

/// Compute the requirement for a plugin.
///
/// The module is the target of the override covering the plugin's package,
/// if any, since a plugin package may live below its module root.
pub fn plugin_requirement(plugin: &Dependency, overrides: &OverrideSet) -> Requirement {
    let covering = overrides.covering(plugin.package_path());
    let module = covering
        .map(|r| r.target_path())
        .unwrap_or(plugin.package_path());

    let version = match (plugin.version(), covering) {
        (Some(v), _) => v,
        (None, Some(r)) => r.target_version().unwrap_or(ZERO_PSEUDO_VERSION),
        (None, None) => LATEST,
    };
    Requirement::new(module, version)
}

/// Compute all requirements: the core first, then one per plugin module.
///
/// Plugins that live in the core module or in a module already required
/// add no line of their own.
pub fn requirements(
    core_module: &str,
    core_version: &str,
    plugins: &[Dependency],
    overrides: &OverrideSet,
) -> Vec<Requirement> {
    // A replaced core has no tags to resolve `latest` against
    let core_version = match overrides.get(core_module) {
        Some(_) if core_version == LATEST => ZERO_PSEUDO_VERSION,
        _ => core_version,
    };
    let mut reqs = vec![Requirement::new(core_module, core_version)];
    for plugin in plugins {
        if within_module(plugin.package_path(), core_module) {
            continue;
        }
        let req = plugin_requirement(plugin, overrides);
        if let Some(existing) = reqs.iter().find(|r| r.module == req.module) {
            if existing.version != req.version {
                tracing::debug!(
                    "{} already required at {}; ignoring {}",
                    req.module,
                    existing.version,
                    req.version
                );
            }
            continue;
        }
        reqs.push(req);
    }
    reqs
}

fn within_module(package_path: &str, module: &str) -> bool {
    package_path == module
        || package_path
            .strip_prefix(module)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Render the manifest text.
pub fn render_manifest(requirements: &[Requirement], overrides: &OverrideSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {}", MAIN_MODULE);

    if !requirements.is_empty() {
        out.push_str("\nrequire (\n");
        for req in requirements {
            let _ = writeln!(out, "\t{} {}", req.module, req.version);
        }
        out.push_str(")\n");
    }

    if !overrides.is_empty() {
        out.push('\n');
        for replace in overrides.iter() {
            let _ = writeln!(out, "{}", replace.manifest_line());
        }
    }
    out
}
