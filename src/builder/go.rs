//! Construction of the `go` invocations.

use std::path::Path;

use crate::core::build_config::BuildConfig;
use crate::util::process::ProcessBuilder;

/// Whether cgo ends up enabled, taking the race detector into account.
pub fn cgo_enabled(config: &BuildConfig) -> bool {
    config.compile.cgo || config.race_detector
}

/// Toolchain command with the target environment applied.
pub fn go_command(config: &BuildConfig, workspace: &Path) -> ProcessBuilder {
    let platform = &config.compile.platform;
    let mut cmd = ProcessBuilder::new(&config.go)
        .cwd(workspace)
        .echo(config.echo)
        .env("GOOS", &platform.os)
        .env("GOARCH", &platform.arch)
        .env("CGO_ENABLED", if cgo_enabled(config) { "1" } else { "0" });
    if let Some(arm) = &platform.arm {
        cmd = cmd.env("GOARM", arm);
    }
    cmd
}

/// `go mod tidy [mod flags]`
pub fn tidy_command(config: &BuildConfig, workspace: &Path) -> ProcessBuilder {
    go_command(config, workspace)
        .args(["mod", "tidy"])
        .args(&config.mod_flags)
}

/// Flags passed to `go build` ahead of the output path.
pub fn build_flags(config: &BuildConfig) -> Vec<String> {
    let mut flags = config.build_flags.clone();
    if config.debug {
        // Keep symbols and disable optimizations for debuggers
        flags.extend(["-gcflags".to_string(), "all=-N -l".to_string()]);
    } else if config.build_flags.is_empty() {
        flags.extend([
            "-ldflags".to_string(),
            "-w -s".to_string(),
            "-trimpath".to_string(),
        ]);
    }
    if config.race_detector {
        flags.push("-race".to_string());
    }
    flags
}

/// `go build [flags] -o <output>`
pub fn build_command(config: &BuildConfig, workspace: &Path, output: &Path) -> ProcessBuilder {
    go_command(config, workspace)
        .arg("build")
        .args(build_flags(config))
        .arg("-o")
        .arg(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::platform::Platform;

    fn config() -> BuildConfig {
        BuildConfig::new("/usr/bin/go")
    }

    #[test]
    fn test_default_build_strips_symbols() {
        let cmd = build_command(&config(), Path::new("/tmp/ws"), Path::new("/out/kengine"));
        assert_eq!(
            cmd.get_args(),
            ["build", "-ldflags", "-w -s", "-trimpath", "-o", "/out/kengine"]
        );
        assert_eq!(cmd.get_env("CGO_ENABLED"), Some("0"));
    }

    #[test]
    fn test_custom_build_flags_replace_defaults() {
        let mut config = config();
        config.build_flags = vec!["-tags".to_string(), "nobadger".to_string()];
        assert_eq!(build_flags(&config), ["-tags", "nobadger"]);
    }

    #[test]
    fn test_debug_keeps_symbols() {
        let mut config = config();
        config.debug = true;
        assert_eq!(build_flags(&config), ["-gcflags", "all=-N -l"]);
    }

    #[test]
    fn test_race_detector_forces_cgo() {
        let mut config = config();
        config.race_detector = true;
        let cmd = build_command(&config, Path::new("/tmp/ws"), Path::new("/out/kengine"));
        assert!(cmd.get_args().contains(&"-race".to_string()));
        assert_eq!(cmd.get_env("CGO_ENABLED"), Some("1"));
    }

    #[test]
    fn test_target_environment() {
        let mut config = config();
        config.compile.platform = Platform {
            os: "linux".to_string(),
            arch: "arm".to_string(),
            arm: Some("7".to_string()),
        };
        config.mod_flags = vec!["-compat=1.21".to_string()];
        let cmd = tidy_command(&config, Path::new("/tmp/ws"));
        assert_eq!(cmd.get_args(), ["mod", "tidy", "-compat=1.21"]);
        assert_eq!(cmd.get_env("GOOS"), Some("linux"));
        assert_eq!(cmd.get_env("GOARCH"), Some("arm"));
        assert_eq!(cmd.get_env("GOARM"), Some("7"));
    }
}
