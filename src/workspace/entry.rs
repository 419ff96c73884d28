//! Rendering of the synthesized Go sources.
//!
//! Plugins register themselves from `init` functions, so the entry point
//! only needs a blank import per plugin package before handing control
//! to the core's `Main`.

use std::fmt::Write;

use crate::core::dependency::Dependency;

/// Name of the directory embedded files are copied to.
pub const EMBED_DIR: &str = "files";

/// Render `main.go`.
pub fn render_main(core_module: &str, standard_modules: bool, plugins: &[Dependency]) -> String {
    let standard = format!("{}/modules/standard", core_module);

    let mut imports: Vec<&str> = Vec::new();
    if standard_modules {
        imports.push(&standard);
    }
    for plugin in plugins {
        let path = plugin.package_path();
        if !imports.contains(&path) {
            imports.push(path);
        }
    }

    let mut out = String::new();
    out.push_str("package main\n\nimport (\n");
    let _ = writeln!(out, "\tkenginecmd \"{}/cmd\"", core_module);
    if !imports.is_empty() {
        out.push_str("\n\t// plug in Kengine modules here\n");
        for path in imports {
            let _ = writeln!(out, "\t_ \"{}\"", path);
        }
    }
    out.push_str(")\n\nfunc main() {\n\tkenginecmd.Main()\n}\n");
    out
}

/// Render `embed.go`, exposing the `files` directory as a file system module.
pub fn render_embed(core_module: &str) -> String {
    format!(
        r#"package main

import (
	"embed"
	"io/fs"

	"{core}"
)

// embedded holds the directories copied into the files folder at build time.
//
//go:embed all:{dir}
var embedded embed.FS

// files is the embedded file system with the top folder trimmed.
var files fs.FS = embedded

const topFolder = "{dir}"

func init() {{
	if sub, err := fs.Sub(embedded, topFolder); err == nil {{
		files = sub
	}}
	kengine.RegisterModule(FS{{}})
}}

// FS implements a Kengine module and fs.FS for the embedded file system.
type FS struct {{
	fs.FS
}}

// KengineModule returns the Kengine module information.
func (FS) KengineModule() kengine.ModuleInfo {{
	return kengine.ModuleInfo{{
		ID:  "kengine.fs.embedded",
		New: func() kengine.Module {{ return new(FS) }},
	}}
}}

// Provision points the module at the embedded files.
func (f *FS) Provision(kengine.Context) error {{
	f.FS = files
	return nil
}}

var (
	_ fs.FS               = (*FS)(nil)
	_ kengine.Provisioner = (*FS)(nil)
)
"#,
        core = core_module,
        dir = EMBED_DIR,
    )
}
