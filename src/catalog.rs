//! Builtin step catalog for tuning a single Ubuntu machine for local AI
//! workloads: package installs, Docker, Python toolchain, GPU driver,
//! kernel tuning, swap, firewall and intrusion-detection defaults, and a
//! scheduled maintenance timer.
//!
//! Reversibility is curated per step, never inferred: package and driver
//! installs are irreversible from the engine's point of view, while
//! config-file writes and service toggles restore cleanly from
//! snapshots.

use crate::registry::{RegistryError, StepRegistry};
use crate::types::step::{CommandSpec, Probe, ServiceOp, Step, StepAction};

const SYSCTL_CONF_PATH: &str = "/etc/sysctl.d/99-ai-tuning.conf";
const SYSCTL_CONF: &str = "\
# Managed by groundwork. Local AI workload tuning.
vm.swappiness = 10
vm.overcommit_memory = 1
fs.inotify.max_user_watches = 1048576
fs.inotify.max_user_instances = 1024
net.core.somaxconn = 4096
";

const MAINTENANCE_SERVICE_PATH: &str = "/etc/systemd/system/ai-maintenance.service";
const MAINTENANCE_SERVICE: &str = "\
[Unit]
Description=Weekly host maintenance for AI workloads

[Service]
Type=oneshot
ExecStart=/usr/bin/apt-get update
ExecStart=/usr/bin/apt-get autoremove -y
ExecStart=/usr/bin/journalctl --vacuum-time=14d
";

const MAINTENANCE_TIMER_PATH: &str = "/etc/systemd/system/ai-maintenance.timer";
const MAINTENANCE_TIMER: &str = "\
[Unit]
Description=Run ai-maintenance weekly

[Timer]
OnCalendar=weekly
Persistent=true

[Install]
WantedBy=timers.target
";

fn apt_install(packages: &[&str]) -> CommandSpec {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(packages);
    CommandSpec::new("apt-get", &args)
}

fn dpkg_installed(package: &str) -> Probe {
    Probe::CommandSucceeds(CommandSpec::new("dpkg", &["-s", package]))
}

fn unit_enabled(unit: &str) -> Probe {
    Probe::CommandSucceeds(CommandSpec::new("systemctl", &["is-enabled", "--quiet", unit]))
}

fn rendered(path: &str, contents: &str) -> Probe {
    Probe::FileHasContents {
        path: path.into(),
        contents: contents.to_string(),
    }
}

/// The full host catalog, dependency-ordered by the registry.
///
/// # Errors
///
/// Only on a programming mistake in the catalog itself (duplicate id),
/// surfaced as a configuration error before any execution.
pub fn ubuntu_ai_host() -> Result<StepRegistry, RegistryError> {
    let mut reg = StepRegistry::new();

    reg.register(
        Step::new(
            "apt-refresh",
            "refresh apt package indexes",
            StepAction::Command(CommandSpec::new("apt-get", &["update"])),
        ), // no probe: indexes are stale by definition
    )?;

    reg.register(
        Step::new(
            "base-packages",
            "install base build and transfer tools",
            StepAction::Command(apt_install(&[
                "curl",
                "git",
                "build-essential",
                "ca-certificates",
                "htop",
            ])),
        )
        .depends_on(&["apt-refresh"])
        .satisfied_when(Probe::AllOf(vec![
            dpkg_installed("curl"),
            dpkg_installed("git"),
            dpkg_installed("build-essential"),
        ]))
        .irreversible(),
    )?;

    reg.register(
        Step::new(
            "python-toolchain",
            "install Python interpreter, pip, and venv",
            StepAction::Command(apt_install(&["python3", "python3-pip", "python3-venv"])),
        )
        .depends_on(&["apt-refresh"])
        .satisfied_when(Probe::AllOf(vec![
            dpkg_installed("python3"),
            dpkg_installed("python3-pip"),
            dpkg_installed("python3-venv"),
        ]))
        .irreversible(),
    )?;

    reg.register(
        Step::new(
            "docker-engine",
            "install the Docker container runtime",
            StepAction::Command(apt_install(&["docker.io"])),
        )
        .depends_on(&["base-packages"])
        .satisfied_when(Probe::CommandSucceeds(CommandSpec::new(
            "docker",
            &["--version"],
        )))
        .irreversible(),
    )?;

    reg.register(
        Step::new(
            "docker-service",
            "enable and start the Docker daemon",
            StepAction::Service { unit: "docker".into(), op: ServiceOp::Enable },
        )
        .depends_on(&["docker-engine"])
        .satisfied_when(unit_enabled("docker")),
    )?;

    reg.register(
        Step::new(
            "gpu-driver",
            "install the recommended GPU driver",
            StepAction::Command(CommandSpec::new("ubuntu-drivers", &["autoinstall"])),
        )
        .depends_on(&["base-packages"])
        .satisfied_when(Probe::CommandSucceeds(CommandSpec::new(
            "nvidia-smi",
            &["--list-gpus"],
        )))
        .irreversible(),
    )?;

    reg.register(
        Step::new(
            "sysctl-tuning",
            "render kernel tuning for AI workloads",
            StepAction::WriteFile {
                path: SYSCTL_CONF_PATH.into(),
                contents: SYSCTL_CONF.to_string(),
                mode: Some(0o644),
            },
        )
        .satisfied_when(rendered(SYSCTL_CONF_PATH, SYSCTL_CONF))
        .mutates(SYSCTL_CONF_PATH),
    )?;

    reg.register(
        Step::new(
            "sysctl-apply",
            "load kernel tuning into the running kernel",
            StepAction::Command(CommandSpec::new("sysctl", &["--system"])),
        )
        .depends_on(&["sysctl-tuning"]), // reapplied whenever tuning changed
    )?;

    reg.register(
        Step::new(
            "zram-tools",
            "install compressed swap tooling",
            StepAction::Command(apt_install(&["zram-tools"])),
        )
        .depends_on(&["apt-refresh"])
        .satisfied_when(dpkg_installed("zram-tools"))
        .irreversible(),
    )?;

    reg.register(
        Step::new(
            "zram-service",
            "enable compressed swap",
            StepAction::Service { unit: "zramswap".into(), op: ServiceOp::Enable },
        )
        .depends_on(&["zram-tools"])
        .satisfied_when(unit_enabled("zramswap")),
    )?;

    reg.register(
        Step::new(
            "ufw-deny-incoming",
            "default-deny inbound traffic",
            StepAction::Command(CommandSpec::new("ufw", &["default", "deny", "incoming"])),
        )
        .depends_on(&["base-packages"])
        .mutates("/etc/default/ufw"),
    )?;

    reg.register(
        Step::new(
            "ufw-allow-ssh",
            "keep SSH reachable before enabling the firewall",
            StepAction::Command(CommandSpec::new("ufw", &["allow", "OpenSSH"])),
        )
        .depends_on(&["ufw-deny-incoming"]),
    )?;

    reg.register(
        Step::new(
            "ufw-enable",
            "turn the firewall on",
            StepAction::Command(CommandSpec::new("ufw", &["--force", "enable"])),
        )
        .depends_on(&["ufw-deny-incoming", "ufw-allow-ssh"])
        .satisfied_when(Probe::AllOf(vec![
            Probe::PathExists("/etc/ufw/ufw.conf".into()),
            unit_enabled("ufw"),
        ]))
        .mutates("/etc/ufw/ufw.conf"),
    )?;

    reg.register(
        Step::new(
            "fail2ban",
            "install intrusion detection",
            StepAction::Command(apt_install(&["fail2ban"])),
        )
        .depends_on(&["apt-refresh"])
        .satisfied_when(dpkg_installed("fail2ban"))
        .irreversible(),
    )?;

    reg.register(
        Step::new(
            "fail2ban-service",
            "enable intrusion detection",
            StepAction::Service { unit: "fail2ban".into(), op: ServiceOp::Enable },
        )
        .depends_on(&["fail2ban"])
        .satisfied_when(unit_enabled("fail2ban")),
    )?;

    reg.register(
        Step::new(
            "maintenance-service-unit",
            "render the weekly maintenance service unit",
            StepAction::WriteFile {
                path: MAINTENANCE_SERVICE_PATH.into(),
                contents: MAINTENANCE_SERVICE.to_string(),
                mode: Some(0o644),
            },
        )
        .satisfied_when(rendered(MAINTENANCE_SERVICE_PATH, MAINTENANCE_SERVICE))
        .mutates(MAINTENANCE_SERVICE_PATH),
    )?;

    reg.register(
        Step::new(
            "maintenance-timer-unit",
            "render the weekly maintenance timer unit",
            StepAction::WriteFile {
                path: MAINTENANCE_TIMER_PATH.into(),
                contents: MAINTENANCE_TIMER.to_string(),
                mode: Some(0o644),
            },
        )
        .satisfied_when(rendered(MAINTENANCE_TIMER_PATH, MAINTENANCE_TIMER))
        .mutates(MAINTENANCE_TIMER_PATH),
    )?;

    reg.register(
        Step::new(
            "maintenance-timer",
            "enable the weekly maintenance timer",
            StepAction::Service { unit: "ai-maintenance.timer".into(), op: ServiceOp::Enable },
        )
        .depends_on(&["maintenance-service-unit", "maintenance-timer-unit"])
        .satisfied_when(unit_enabled("ai-maintenance.timer")),
    )?;

    Ok(reg)
}
