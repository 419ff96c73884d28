//! Test utilities for xkengine unit tests.
//!
//! Provides a fake `go` toolchain written as a shell script, so the build
//! invoker and the artifact lifecycle can be exercised without a Go
//! installation. Every invocation is appended to a log as
//! `<working dir> <args...>`.
//!
//! # Example
//!
//! ```rust,ignore
//! let tmp = TempDir::new().unwrap();
//! let go = FakeGo::new().tidy("echo 'no network' >&2; exit 1").install(tmp.path());
//! let config = BuildConfig::new(&go.path);
//! ```

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Script body for `go build` that writes a runnable artifact to the `-o` path.
///
/// The artifact answers `version` and otherwise echoes its arguments, exiting
/// with `$FAKE_KENGINE_EXIT` (default 0).
pub const BUILD_ARTIFACT: &str = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; fi
  shift
done
cat > "$out" <<'EOF'
#!/bin/sh
if [ "$1" = "version" ]; then echo "v2.0.0-fake"; exit 0; fi
echo "args: $*"
exit "${FAKE_KENGINE_EXIT:-0}"
EOF
chmod +x "$out""#;

/// Builder for a fake `go` script.
#[derive(Debug, Clone)]
pub struct FakeGo {
    tidy: String,
    build: String,
    list: String,
}

impl Default for FakeGo {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGo {
    /// A toolchain whose every step succeeds.
    pub fn new() -> Self {
        FakeGo {
            tidy: "exit 0".to_string(),
            build: BUILD_ARTIFACT.to_string(),
            list: "echo 'go: cannot find main module' >&2\nexit 1".to_string(),
        }
    }

    /// Replace the `go mod tidy` behavior.
    pub fn tidy(mut self, body: &str) -> Self {
        self.tidy = body.to_string();
        self
    }

    /// Replace the `go build` behavior.
    pub fn build(mut self, body: &str) -> Self {
        self.build = body.to_string();
        self
    }

    /// Report a single main module from `go list`.
    pub fn list_module(mut self, path: &str, dir: &Path) -> Self {
        self.list = format!(
            "cat <<'EOF'\n{{\n\t\"Path\": \"{}\",\n\t\"Main\": true,\n\t\"Dir\": \"{}\"\n}}\nEOF",
            path,
            dir.display()
        );
        self
    }

    /// Write the script into `dir`.
    pub fn install(self, dir: &Path) -> InstalledGo {
        let path = dir.join("go");
        let log = dir.join("go.log");
        let script = format!(
            "#!/bin/sh\necho \"$PWD $*\" >> '{log}'\ncase \"$1\" in\nmod)\n{tidy}\n;;\nbuild)\n{build}\n;;\nlist)\n{list}\n;;\nesac\n",
            log = log.display(),
            tidy = self.tidy,
            build = self.build,
            list = self.list,
        );
        write_script(&path, &script);
        InstalledGo { path, log }
    }
}

/// A fake toolchain on disk.
#[derive(Debug, Clone)]
pub struct InstalledGo {
    /// The script to use as the `go` binary
    pub path: PathBuf,

    /// Invocation log
    pub log: PathBuf,
}

impl InstalledGo {
    /// Logged invocations, one line each.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Working directories of the logged invocations.
    pub fn workspaces(&self) -> Vec<PathBuf> {
        self.invocations()
            .iter()
            .filter_map(|line| line.split_whitespace().next())
            .map(PathBuf::from)
            .collect()
    }
}

/// Write an executable shell script.
pub fn write_script(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
