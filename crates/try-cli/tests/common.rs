#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use tempfile::TempDir;

/// Stands in for `virtualenv`: lays out `<dest>/bin` with an `activate`
/// marker and a copy of the fake interpreter.
const FAKE_VIRTUALENV: &str = r#"#!/bin/sh
dest="$1"
mkdir -p "$dest/bin"
: > "$dest/bin/activate"
cp "$TRY_FAKE_PYTHON" "$dest/bin/python"
chmod +x "$dest/bin/python"
echo "created virtual environment in $dest"
"#;

/// Stands in for an environment's `python`: `-m pip install` records its
/// targets and fails for `$TRY_FAKE_FAIL`; anything else records the startup
/// file and arguments it was given.
const FAKE_PYTHON: &str = r#"#!/bin/sh
record="${TRY_FAKE_RECORD:-/dev/null}"
if [ "$1" = "-m" ] && [ "$2" = "pip" ]; then
  shift 3
  echo "pip install $*" >> "$record"
  for arg in "$@"; do
    if [ -n "$TRY_FAKE_FAIL" ] && [ "$arg" = "$TRY_FAKE_FAIL" ]; then
      echo "ERROR: No matching distribution found for $arg"
      exit 1
    fi
  done
  echo "Successfully installed $*"
  exit 0
fi
if [ -n "$PYTHONSTARTUP" ]; then
  echo "startup $PYTHONSTARTUP" >> "$record"
  cat "$PYTHONSTARTUP" >> "$record"
fi
if [ $# -gt 0 ]; then
  echo "run $*" >> "$record"
fi
exit 0
"#;

pub struct FakeToolchain {
    pub temp: TempDir,
    pub tools: PathBuf,
    pub base: PathBuf,
    pub record: PathBuf,
}

impl FakeToolchain {
    pub fn new() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("try-cli-test")
            .tempdir()
            .expect("tempdir");
        let tools = temp.path().join("tools");
        fs::create_dir_all(&tools).expect("tools dir");
        write_executable(&tools.join("virtualenv"), FAKE_VIRTUALENV);
        write_executable(&tools.join("fake-python"), FAKE_PYTHON);
        let base = temp.path().join("base");
        let record = temp.path().join("record.txt");
        Self {
            temp,
            tools,
            base,
            record,
        }
    }

    /// `try` with an isolated environment and `--tmpdir` pointing at `base`.
    pub fn command(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("try");
        cmd.current_dir(self.temp.path())
            .env("PATH", format!("{}:/usr/bin:/bin", self.tools.display()))
            .env("HOME", self.temp.path())
            .env("TRY_CONFIG", self.temp.path().join("absent.ini"))
            .env("TRY_ENV_CREATOR", "virtualenv")
            .env("TRY_RUNTIME_PYTHON", "python3")
            .env("TRY_FAKE_PYTHON", self.tools.join("fake-python"))
            .env("TRY_FAKE_RECORD", &self.record)
            .env("EDITOR", "true")
            .env("NO_COLOR", "1")
            .env_remove("VISUAL")
            .env_remove("TRY_LOG")
            .env_remove("TRY_FAKE_FAIL")
            .arg("--tmpdir")
            .arg(&self.base);
        cmd
    }

    pub fn workspaces(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.base) {
            Ok(entries) => entries.flatten().map(|entry| entry.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn recorded(&self) -> String {
        fs::read_to_string(&self.record).unwrap_or_default()
    }

    /// A pre-existing environment outside `base`.
    pub fn external_env(&self, name: &str) -> PathBuf {
        let env = self.temp.path().join(name);
        fs::create_dir_all(env.join("bin")).expect("bin dir");
        fs::write(env.join("bin").join("activate"), "").expect("activate");
        write_executable(&env.join("bin").join("python"), FAKE_PYTHON);
        env
    }
}

pub fn write_executable(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;

    fs::write(path, body).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod");
}

pub fn stdout(assert: &Assert) -> String {
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout")
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}
