use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Directory holding an environment's executables on this platform.
#[must_use]
pub(crate) fn bin_dir(env_path: &Path) -> PathBuf {
    if cfg!(windows) {
        env_path.join("Scripts")
    } else {
        env_path.join("bin")
    }
}

/// Variables that make a child process resolve tools from an activated
/// environment. Built as data and handed to each invocation; the parent
/// process environment is never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverlay {
    env_path: PathBuf,
    vars: Vec<(String, String)>,
}

impl EnvOverlay {
    /// `base_path` is the search path the overlay prepends to, normally the
    /// caller's `PATH`.
    #[must_use]
    pub fn for_environment(env_path: &Path, base_path: Option<OsString>) -> Self {
        let bin = bin_dir(env_path);
        let mut entries = vec![bin];
        if let Some(base) = base_path.as_ref() {
            entries.extend(env::split_paths(base));
        }
        let path = env::join_paths(&entries)
            .map(|joined| joined.to_string_lossy().into_owned())
            .unwrap_or_else(|_| {
                let mut rendered = entries[0].display().to_string();
                if let Some(base) = base_path {
                    rendered.push(if cfg!(windows) { ';' } else { ':' });
                    rendered.push_str(&base.to_string_lossy());
                }
                rendered
            });
        let vars = vec![
            ("VIRTUAL_ENV".to_string(), env_path.display().to_string()),
            ("PATH".to_string(), path),
            ("PYTHONHOME".to_string(), String::new()),
        ];
        Self {
            env_path: env_path.to_path_buf(),
            vars,
        }
    }

    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        bin_dir(&self.env_path)
    }

    #[must_use]
    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    /// The overlay plus one extra variable, for a single invocation.
    #[must_use]
    pub fn with(&self, key: &str, value: impl Into<String>) -> Vec<(String, String)> {
        let mut vars = self.vars.clone();
        vars.retain(|(existing, _)| existing != key);
        vars.push((key.to_string(), value.into()));
        vars
    }
}
