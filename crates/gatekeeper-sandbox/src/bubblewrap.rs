//! Bubblewrap (`bwrap`) argv construction (spec §4.4), grounded on the
//! chroot-style wrapping in `astrid-workspace::sandbox::SandboxCommand`.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Host paths bound read-only (or read-write for `root_dir`/`/tmp`) into
/// every bubblewrap sandbox, in the order the spec lists them.
const RO_BIND_CANDIDATES: &[&str] = &["/usr", "/bin", "/lib", "/lib64", "/etc"];

pub struct BwrapPlan {
    pub command: String,
    pub args: Vec<String>,
}

/// Builds the full `bwrap` argv (command = `"bwrap"`, args = everything
/// after it) for invoking `tool.command tool_args...` inside the sandbox.
#[allow(clippy::too_many_arguments)]
pub fn build_argv(
    command: &str,
    command_args: &[String],
    cwd: &Path,
    network: bool,
    kept_env: &[(String, String)],
    root_dir: &Path,
    wasm_dir: Option<&Path>,
) -> BwrapPlan {
    let mut args = Vec::new();
    args.push("--die-with-parent".to_string());
    args.push("--unshare-all".to_string());
    if network {
        args.push("--share-net".to_string());
    }

    // `root_dir` and `/tmp` are writable; everything else is read-only.
    push_bind(&mut args, root_dir, true);
    for candidate in RO_BIND_CANDIDATES {
        push_bind(&mut args, Path::new(candidate), false);
    }
    push_bind(&mut args, Path::new("/tmp"), true);
    if let Some(wasm_dir) = wasm_dir {
        push_bind(&mut args, wasm_dir, false);
    }

    args.push("--proc".to_string());
    args.push("/proc".to_string());
    args.push("--dev".to_string());
    args.push("/dev".to_string());

    args.push("--chdir".to_string());
    args.push(cwd.display().to_string());

    for (key, value) in kept_env {
        args.push("--setenv".to_string());
        args.push(key.clone());
        args.push(value.clone());
    }

    args.push("--".to_string());
    args.push(command.to_string());
    args.extend(command_args.iter().cloned());

    BwrapPlan {
        command: "bwrap".to_string(),
        args,
    }
}

fn push_bind(args: &mut Vec<String>, path: &Path, writable: bool) {
    if !path.exists() {
        return;
    }
    let flag = if writable { "--bind" } else { "--ro-bind" };
    let display = path.display().to_string();
    args.push(flag.to_string());
    args.push(display.clone());
    args.push(display);
}

static BWRAP_DETECTED: OnceLock<bool> = OnceLock::new();

/// Resolves whether `bwrap` is on `PATH`, caching the result for the life
/// of the process (spec: "detection is cached per process").
pub fn bwrap_available() -> bool {
    *BWRAP_DETECTED.get_or_init(detect_bwrap)
}

fn detect_bwrap() -> bool {
    resolve_on_path("bwrap").is_some()
}

fn resolve_on_path(binary: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_order_matches_spec() {
        let kept_env = vec![("PATH".to_string(), "/usr/bin".to_string())];
        let plan = build_argv(
            "/bin/echo",
            &["hello".to_string()],
            Path::new("/tmp"),
            false,
            &kept_env,
            Path::new("/tmp"),
            None,
        );
        assert_eq!(plan.command, "bwrap");
        assert_eq!(plan.args[0], "--die-with-parent");
        assert_eq!(plan.args[1], "--unshare-all");
        assert!(!plan.args.contains(&"--share-net".to_string()));
        let dash_dash = plan
            .args
            .iter()
            .position(|a| a == "--")
            .expect("terminal -- present");
        assert_eq!(plan.args[dash_dash + 1], "/bin/echo");
        assert_eq!(plan.args[dash_dash + 2], "hello");
    }

    #[test]
    fn network_flag_adds_share_net() {
        let plan = build_argv(
            "/bin/echo",
            &[],
            Path::new("/tmp"),
            true,
            &[],
            Path::new("/tmp"),
            None,
        );
        assert!(plan.args.contains(&"--share-net".to_string()));
    }

    #[test]
    fn nonexistent_host_paths_are_skipped() {
        let plan = build_argv(
            "/bin/echo",
            &[],
            Path::new("/tmp"),
            false,
            &[],
            Path::new("/tmp"),
            Some(Path::new("/definitely/does/not/exist")),
        );
        assert!(!plan.args.contains(&"/definitely/does/not/exist".to_string()));
    }
}
