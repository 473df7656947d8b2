use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::warn;
use which::which;

/// Lockfile whose presence switches reinstalls to yarn.
pub const YARN_LOCKFILE: &str = "yarn.lock";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Npm,
    Yarn,
}

impl PackageManager {
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Yarn if `yarn.lock` exists in `workdir`, npm otherwise.
///
/// An error probing the lockfile is logged and treated as absence.
pub fn detect_package_manager(workdir: &Path) -> PackageManager {
    let lockfile = workdir.join(YARN_LOCKFILE);
    match lockfile.try_exists() {
        Ok(true) => PackageManager::Yarn,
        Ok(false) => PackageManager::Npm,
        Err(err) => {
            warn!(
                "Failed to check if {} exists in the workdir: {err}",
                lockfile.display()
            );
            PackageManager::Npm
        }
    }
}

/// Which of the external programs the workflow relies on are reachable.
#[derive(Debug, Clone, Serialize)]
pub struct Toolchain {
    pub npm: bool,
    pub yarn: bool,
    pub expo: bool,
}

pub fn detect_toolchain() -> Toolchain {
    Toolchain {
        npm: has_command("npm"),
        yarn: has_command("yarn"),
        expo: has_command("expo"),
    }
}

fn has_command(cmd: &str) -> bool {
    which(cmd).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yarn_lock_selects_yarn() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(YARN_LOCKFILE), "").unwrap();
        assert_eq!(detect_package_manager(dir.path()), PackageManager::Yarn);
    }

    #[test]
    fn defaults_to_npm() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package-lock.json"), "{}").unwrap();
        assert_eq!(detect_package_manager(dir.path()), PackageManager::Npm);
    }

    #[test]
    fn unknown_command_is_not_available() {
        assert!(!has_command("definitely-not-a-real-program-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn lookup_does_not_execute_the_program() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let script = dir.path().join("fake-expo");
        std::fs::write(
            &script,
            format!("#!/bin/sh\ntouch '{}'\n", marker.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        assert!(has_command(script.to_str().unwrap()));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_not_available() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-yarn");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(!has_command(script.to_str().unwrap()));
    }
}
