use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use config::{ConfigError, FileFormat};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use try_domain::ShellCommand;

use crate::core::environment::EnvCreator;
use crate::core::python::{detect_interpreter, normalize_python_version};
use crate::core::tooling::errors::TryError;

const CONFIG_SECTION: &str = "env";
const CONFIG_FILE_NAME: &str = "config.ini";
const APP_DIR: &str = "try";

static ENV_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("env reference pattern")
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    /// Explicit config file; beats `TRY_CONFIG` and the default location.
    pub config: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set and non-blank.
    pub(crate) fn non_empty(&self, key: &str) -> Option<&str> {
        self.var(key).filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Raw `[env]` section; every INI value arrives as a string.
#[derive(Debug, Default, Deserialize)]
struct EnvSection {
    python: Option<String>,
    shell: Option<String>,
    keep: Option<String>,
    always_use_editor: Option<String>,
    tmpdir: Option<String>,
    index: Option<String>,
    editor: Option<String>,
}

/// Persistent defaults read from the user's config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSettings {
    pub python: Option<String>,
    pub shell: Option<String>,
    pub keep: bool,
    pub always_use_editor: bool,
    pub tmpdir: Option<PathBuf>,
    pub index: Option<String>,
    pub editor: Option<String>,
}

impl FileSettings {
    /// Reads the `[env]` section of `path`. A missing file or section yields
    /// the defaults.
    ///
    /// # Errors
    /// Returns [`TryError::Config`] when the file is malformed or a boolean
    /// key holds something other than a boolean word.
    pub(crate) fn load(path: &Path, env: &EnvSnapshot) -> Result<Self, TryError> {
        let invalid = |message: String| TryError::Config {
            path: path.to_path_buf(),
            message,
        };
        if !path.is_file() {
            debug!(config = %path.display(), "no config file");
            return Ok(Self::default());
        }

        let source = config::Config::builder()
            .add_source(
                config::File::from(path.to_path_buf())
                    .format(FileFormat::Ini)
                    .required(false),
            )
            .build()
            .map_err(|err| invalid(err.to_string()))?;
        let section = match source.get::<EnvSection>(CONFIG_SECTION) {
            Ok(section) => section,
            Err(ConfigError::NotFound(_)) => EnvSection::default(),
            Err(err) => return Err(invalid(err.to_string())),
        };
        debug!(config = %path.display(), "loaded config file");

        Ok(Self {
            python: non_blank(section.python),
            shell: non_blank(section.shell),
            keep: parse_flag("keep", section.keep.as_deref()).map_err(invalid)?,
            always_use_editor: parse_flag(
                "always_use_editor",
                section.always_use_editor.as_deref(),
            )
            .map_err(invalid)?,
            tmpdir: non_blank(section.tmpdir.map(|raw| expand_path(&raw, env)))
                .map(PathBuf::from),
            index: non_blank(section.index),
            editor: non_blank(section.editor),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// INI boolean words, matched case-insensitively.
fn parse_flag(key: &str, value: Option<&str>) -> Result<bool, String> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Ok(true),
        "0" | "no" | "false" | "off" => Ok(false),
        _ => Err(format!("`{key}` must be a boolean, found `{raw}`")),
    }
}

/// Expands `$VAR`/`${VAR}` and then a leading `~`. Unknown variables are
/// left as written.
pub(crate) fn expand_path(raw: &str, env: &EnvSnapshot) -> String {
    let expanded = ENV_REFERENCE.replace_all(raw, |caps: &Captures<'_>| {
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map_or("", |m| m.as_str());
        env.var(name)
            .map_or_else(|| caps[0].to_string(), ToString::to_string)
    });

    let home = || {
        env.non_empty("HOME")
            .map(PathBuf::from)
            .or_else(dirs_next::home_dir)
    };
    if expanded == "~" {
        if let Some(home) = home() {
            return home.display().to_string();
        }
    } else if let Some(rest) = expanded
        .strip_prefix("~/")
        .or_else(|| expanded.strip_prefix("~\\"))
    {
        if let Some(home) = home() {
            return home.join(rest).display().to_string();
        }
    }
    expanded.into_owned()
}

/// `--config`, then `TRY_CONFIG`, then `<config dir>/try/config.ini`.
pub(crate) fn config_path(explicit: Option<&str>, env: &EnvSnapshot) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.trim().is_empty()) {
        return Some(PathBuf::from(expand_path(path, env)));
    }
    if let Some(path) = env.non_empty("TRY_CONFIG") {
        return Some(PathBuf::from(expand_path(path, env)));
    }
    dirs_next::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Per-invocation flags; `None`/`false` defer to the config file.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub python: Option<String>,
    pub virtualenv: Option<PathBuf>,
    pub ipython: bool,
    pub shell: Option<String>,
    pub keep: bool,
    pub editor: bool,
    pub tmpdir: Option<PathBuf>,
    pub index: Option<String>,
}

/// Fully resolved options for one run. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOptions {
    pub python: String,
    pub virtualenv: Option<PathBuf>,
    pub shell: Option<ShellCommand>,
    pub keep: bool,
    pub use_editor: bool,
    pub tmpdir: Option<PathBuf>,
    pub index: Option<String>,
    pub editor: ShellCommand,
    pub creator: EnvCreator,
    pub cwd: PathBuf,
    /// Search path the environment overlay prepends to.
    pub base_path: Option<OsString>,
}

impl TryOptions {
    /// Layers defaults, `file` and `overrides`, in that order.
    ///
    /// # Errors
    /// Returns [`TryError::InvalidShell`] when the chosen shell cannot be
    /// split into words.
    pub(crate) fn resolve(
        file: FileSettings,
        overrides: OptionOverrides,
        env: &EnvSnapshot,
        cwd: &Path,
    ) -> Result<Self, TryError> {
        let python = overrides
            .python
            .as_deref()
            .or(file.python.as_deref())
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| detect_interpreter(env, cwd), normalize_python_version);

        let shell_text = overrides
            .shell
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| overrides.ipython.then(|| "ipython".to_string()))
            .or(file.shell.clone());
        let shell = match shell_text {
            Some(raw) => Some(
                ShellCommand::parse(&raw).ok_or_else(|| TryError::InvalidShell { value: raw.clone() })?,
            ),
            None => None,
        };

        let base_path = env.var("PATH").map(OsString::from);
        let creator = match env.non_empty("TRY_ENV_CREATOR") {
            Some(forced) => forced.parse::<EnvCreator>().unwrap_or_else(|err| {
                warn!(%err, "ignoring TRY_ENV_CREATOR");
                EnvCreator::detect(base_path.clone(), cwd)
            }),
            None => EnvCreator::detect(base_path.clone(), cwd),
        };

        Ok(Self {
            python,
            virtualenv: overrides.virtualenv.map(|path| absolutize(cwd, path)),
            shell,
            keep: overrides.keep || file.keep,
            use_editor: overrides.editor || file.always_use_editor,
            tmpdir: overrides
                .tmpdir
                .or(file.tmpdir)
                .map(|path| absolutize(cwd, path)),
            index: overrides.index.filter(|v| !v.trim().is_empty()).or(file.index),
            editor: resolve_editor(file.editor.as_deref(), env),
            creator,
            cwd: cwd.to_path_buf(),
            base_path,
        })
    }
}

fn absolutize(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Config `editor`, `$VISUAL`, `$EDITOR`, then the platform default. Values
/// that cannot be split into words are skipped.
fn resolve_editor(configured: Option<&str>, env: &EnvSnapshot) -> ShellCommand {
    configured
        .into_iter()
        .chain(env.non_empty("VISUAL"))
        .chain(env.non_empty("EDITOR"))
        .find_map(ShellCommand::parse)
        .unwrap_or_else(|| ShellCommand {
            program: if cfg!(windows) { "notepad" } else { "vi" }.to_string(),
            args: Vec::new(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let env = EnvSnapshot::testing(&[]);
        let settings = FileSettings::load(&temp.path().join("absent.ini"), &env).expect("load");
        assert_eq!(settings, FileSettings::default());
    }

    #[test]
    fn reads_env_section() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_config(
            temp.path(),
            "[env]\npython = 3.11\nshell = ptpython\nkeep = yes\nalways_use_editor = off\n\
             tmpdir = $TRY_TEST_BASE/envs\nindex = https://test.pypi.org/simple\n",
        );
        let env = EnvSnapshot::testing(&[("TRY_TEST_BASE", "/var/tmp")]);
        let settings = FileSettings::load(&path, &env).expect("load");
        assert_eq!(settings.python.as_deref(), Some("3.11"));
        assert_eq!(settings.shell.as_deref(), Some("ptpython"));
        assert!(settings.keep);
        assert!(!settings.always_use_editor);
        assert_eq!(settings.tmpdir, Some(PathBuf::from("/var/tmp/envs")));
        assert_eq!(
            settings.index.as_deref(),
            Some("https://test.pypi.org/simple")
        );
    }

    #[test]
    fn other_sections_are_ignored() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_config(temp.path(), "[other]\nkeep = true\n");
        let settings = FileSettings::load(&path, &EnvSnapshot::testing(&[])).expect("load");
        assert!(!settings.keep);
    }

    #[test]
    fn invalid_boolean_is_a_config_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_config(temp.path(), "[env]\nkeep = maybe\n");
        let err = FileSettings::load(&path, &EnvSnapshot::testing(&[])).unwrap_err();
        assert!(matches!(err, TryError::Config { .. }));
        assert!(err.is_user_error());
        assert!(err.to_string().contains("keep"));
    }

    #[test]
    fn expands_home_and_variables() {
        let env = EnvSnapshot::testing(&[("HOME", "/home/tester"), ("SCRATCH", "/scratch")]);
        assert_eq!(expand_path("~/try", &env), "/home/tester/try");
        assert_eq!(expand_path("~", &env), "/home/tester");
        assert_eq!(expand_path("${SCRATCH}/try", &env), "/scratch/try");
        assert_eq!(expand_path("$SCRATCH/x", &env), "/scratch/x");
        assert_eq!(expand_path("$NOT_SET_ANYWHERE/x", &env), "$NOT_SET_ANYWHERE/x");
    }

    #[test]
    fn config_path_precedence() {
        let env = EnvSnapshot::testing(&[("TRY_CONFIG", "/etc/try.ini")]);
        assert_eq!(
            config_path(Some("/tmp/explicit.ini"), &env),
            Some(PathBuf::from("/tmp/explicit.ini"))
        );
        assert_eq!(config_path(None, &env), Some(PathBuf::from("/etc/try.ini")));
    }

    fn resolve_with(
        file: FileSettings,
        overrides: OptionOverrides,
        env: &[(&str, &str)],
    ) -> Result<TryOptions, TryError> {
        let env = EnvSnapshot::testing(env);
        TryOptions::resolve(file, overrides, &env, Path::new("/work"))
    }

    #[test]
    fn shell_precedence() {
        let file = FileSettings {
            shell: Some("ptpython".into()),
            ..FileSettings::default()
        };
        let env = [("TRY_ENV_CREATOR", "venv"), ("TRY_RUNTIME_PYTHON", "python3")];

        let options = resolve_with(file.clone(), OptionOverrides::default(), &env).expect("file");
        assert_eq!(options.shell.map(|s| s.program).as_deref(), Some("ptpython"));

        let ipython = OptionOverrides {
            ipython: true,
            ..OptionOverrides::default()
        };
        let options = resolve_with(file.clone(), ipython.clone(), &env).expect("ipython");
        assert_eq!(options.shell.map(|s| s.program).as_deref(), Some("ipython"));

        let explicit = OptionOverrides {
            shell: Some("bpython -q".into()),
            ..ipython
        };
        let shell = resolve_with(file, explicit, &env)
            .expect("shell")
            .shell
            .expect("some shell");
        assert_eq!(shell.program, "bpython");
        assert_eq!(shell.args, vec!["-q"]);
    }

    #[test]
    fn unbalanced_shell_is_rejected() {
        let overrides = OptionOverrides {
            shell: Some("ipython 'oops".into()),
            ..OptionOverrides::default()
        };
        let err = resolve_with(FileSettings::default(), overrides, &[("TRY_ENV_CREATOR", "venv")])
            .unwrap_err();
        assert!(matches!(err, TryError::InvalidShell { .. }));
    }

    #[test]
    fn flags_layer_over_file() {
        let file = FileSettings {
            python: Some("3.9".into()),
            keep: true,
            tmpdir: Some(PathBuf::from("/from/file")),
            index: Some("https://file.example/simple".into()),
            ..FileSettings::default()
        };
        let overrides = OptionOverrides {
            python: Some("3.12".into()),
            editor: true,
            tmpdir: Some(PathBuf::from("relative")),
            virtualenv: Some(PathBuf::from("venv")),
            ..OptionOverrides::default()
        };
        let options = resolve_with(file, overrides, &[("TRY_ENV_CREATOR", "virtualenv")])
            .expect("options");
        assert_eq!(options.python, "python3.12");
        assert!(options.keep);
        assert!(options.use_editor);
        assert_eq!(options.tmpdir, Some(PathBuf::from("/work/relative")));
        assert_eq!(options.virtualenv, Some(PathBuf::from("/work/venv")));
        assert_eq!(options.index.as_deref(), Some("https://file.example/simple"));
        assert_eq!(options.creator, EnvCreator::Virtualenv);
    }

    #[test]
    fn editor_resolution_order() {
        let env = EnvSnapshot::testing(&[("VISUAL", "code --wait"), ("EDITOR", "nano")]);
        assert_eq!(resolve_editor(Some("vim -n"), &env).display(), "vim -n");
        let visual = resolve_editor(None, &env);
        assert_eq!(visual.program, "code");
        assert_eq!(visual.args, vec!["--wait"]);

        let env = EnvSnapshot::testing(&[("EDITOR", "nano")]);
        assert_eq!(resolve_editor(None, &env).program, "nano");

        let env = EnvSnapshot::testing(&[("VISUAL", "  ")]);
        let fallback = resolve_editor(None, &env).program;
        assert!(fallback == "vi" || fallback == "notepad");
    }
}
