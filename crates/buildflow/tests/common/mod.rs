use assert_cmd::Command;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FAKE_GIT: &str = r#"#!/bin/sh
echo "git $*" >> "$TOOL_LOG"
if [ "$1" = "clone" ]; then
    if [ -n "$FAIL_CLONE" ]; then
        echo "fatal: repository not found" >&2
        exit 128
    fi
    mkdir -p "$4"
fi
"#;

const FAKE_LOGIN: &str = r#"#!/bin/sh
read -r token
echo "login $* stdin=$token" >> "$TOOL_LOG"
echo "token=$token"
echo "Login Succeeded"
"#;

const FAKE_IMAGE: &str = r#"#!/bin/sh
echo "image $*" >> "$TOOL_LOG"
if [ "$1" = "bud" ] && [ -n "$FAIL_BUILD" ]; then
    echo "error building at STEP 1" >&2
    exit 1
fi
"#;

/// Shell scripts standing in for git, the login client and the image tool.
/// Each one appends its arguments to a log file.
pub struct FakeToolchain {
    pub root: TempDir,
}

impl FakeToolchain {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(root.path().join("workspace")).unwrap();

        write_script(&bin.join("fake-git"), FAKE_GIT);
        write_script(&bin.join("fake-login"), FAKE_LOGIN);
        write_script(&bin.join("fake-image"), FAKE_IMAGE);

        Self { root }
    }

    pub fn workspace(&self) -> PathBuf {
        self.root.path().join("workspace")
    }

    fn bin(&self, name: &str) -> PathBuf {
        self.root.path().join("bin").join(name)
    }

    fn log_path(&self) -> PathBuf {
        self.root.path().join("tools.log")
    }

    /// Point the command at the fake tools and the scratch workspace.
    pub fn command(&self, mut cmd: Command) -> Command {
        cmd.env("BUILDFLOW_GIT", self.bin("fake-git"))
            .env("BUILDFLOW_LOGIN_TOOL", self.bin("fake-login"))
            .env("BUILDFLOW_IMAGE_TOOL", self.bin("fake-image"))
            .env("TOOL_LOG", self.log_path())
            .env("BUILD_ROOT", self.workspace());
        cmd
    }

    /// Logged invocations, one per line.
    pub fn log(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
