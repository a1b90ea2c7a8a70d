//! Argument vectors for the container CLI.
//!
//! Kept free of I/O so the exact command lines can be asserted in tests.

use std::path::Path;

use sandbox::{Mount, SandboxConfig};

/// Label carried by every container and image this backend creates.
pub const MANAGED_LABEL: &str = "fnrun.managed=true";

/// Label key recording the invocation a container belongs to.
pub const INVOCATION_LABEL: &str = "fnrun.invocation";

/// `host_cpus` caps `--cpus`: the daemon rejects values above the number
/// of CPUs it can see.
pub(crate) fn create(config: &SandboxConfig, host_cpus: u32) -> Vec<String> {
    let memory = format!("{}m", config.resources.memory_mb);
    let cpus = config.resources.cpu_count.min(host_cpus.max(1));
    let mut args: Vec<String> = vec![
        "create".into(),
        // Keeps stdin open for `start --attach --interactive`; the container
        // sees EOF once the attached client closes it.
        "--interactive".into(),
        "--name".into(),
        config.name.clone(),
        "--label".into(),
        MANAGED_LABEL.into(),
        "--label".into(),
        format!("{INVOCATION_LABEL}={}", config.id),
        "--memory".into(),
        memory.clone(),
        // Equal to --memory: no swap beyond the ceiling.
        "--memory-swap".into(),
        memory,
        "--cpus".into(),
        cpus.to_string(),
    ];
    for (key, value) in &config.env {
        args.push("--env".into());
        args.push(format!("{key}={value}"));
    }
    for mount in &config.mounts {
        args.push("--mount".into());
        args.push(mount_spec(mount));
    }
    args.push(config.image.clone());
    args
}

fn mount_spec(mount: &Mount) -> String {
    let mut spec = format!(
        "type=bind,source={},target={}",
        mount.host_path.display(),
        mount.guest_path
    );
    if mount.read_only {
        spec.push_str(",readonly");
    }
    spec
}

pub(crate) fn start(name: &str) -> Vec<String> {
    vec![
        "start".into(),
        "--attach".into(),
        "--interactive".into(),
        name.into(),
    ]
}

pub(crate) fn exit_code(name: &str) -> Vec<String> {
    vec![
        "inspect".into(),
        "--format".into(),
        "{{.State.ExitCode}}".into(),
        name.into(),
    ]
}

pub(crate) fn remove(name: &str) -> Vec<String> {
    vec![
        "rm".into(),
        "--force".into(),
        "--volumes".into(),
        name.into(),
    ]
}

pub(crate) fn list() -> Vec<String> {
    vec![
        "ps".into(),
        "--all".into(),
        "--filter".into(),
        format!("label={MANAGED_LABEL}"),
        "--format".into(),
        "{{.Names}}".into(),
    ]
}

pub(crate) fn image_inspect(image: &str) -> Vec<String> {
    vec![
        "image".into(),
        "inspect".into(),
        "--format".into(),
        "{{.Id}}".into(),
        image.into(),
    ]
}

pub(crate) fn build(image: &str, context_dir: &Path) -> Vec<String> {
    vec![
        "build".into(),
        "--quiet".into(),
        "--tag".into(),
        image.into(),
        "--label".into(),
        MANAGED_LABEL.into(),
        context_dir.display().to_string(),
    ]
}

pub(crate) fn server_version() -> Vec<String> {
    vec![
        "version".into(),
        "--format".into(),
        "{{.Server.Version}}".into(),
    ]
}

pub(crate) fn as_strs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}
