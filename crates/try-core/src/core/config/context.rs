use std::env;
use std::path::Path;

use tracing::debug;

use crate::core::config::settings::{
    config_path, EnvSnapshot, FileSettings, GlobalOptions, OptionOverrides, TryOptions,
};
use crate::core::runtime::effects::{Effects, SharedEffects};
use crate::core::tooling::errors::TryError;

/// Everything one `try` run needs: global flags, the resolved options and
/// the effects used to spawn processes.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    options: TryOptions,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    /// Reads the process environment and config file once and resolves the
    /// run's options.
    ///
    /// # Errors
    /// Returns an error if the working directory is unavailable, the config
    /// file is malformed, or the shell cannot be parsed.
    pub fn new(
        global: &'a GlobalOptions,
        overrides: OptionOverrides,
        effects: SharedEffects,
    ) -> Result<Self, TryError> {
        let cwd = env::current_dir()
            .map_err(|err| TryError::io("failed to read the current directory", err))?;
        Self::from_snapshot(global, overrides, effects, &EnvSnapshot::capture(), &cwd)
    }

    pub(crate) fn from_snapshot(
        global: &'a GlobalOptions,
        overrides: OptionOverrides,
        effects: SharedEffects,
        env: &EnvSnapshot,
        cwd: &Path,
    ) -> Result<Self, TryError> {
        let file = match config_path(global.config.as_deref(), env) {
            Some(path) => FileSettings::load(&path, env)?,
            None => FileSettings::default(),
        };
        let options = TryOptions::resolve(file, overrides, env, cwd)?;
        debug!(
            python = %options.python,
            creator = %options.creator,
            keep = options.keep,
            editor = options.use_editor,
            "resolved options"
        );
        Ok(Self {
            global,
            options,
            effects,
        })
    }

    #[must_use]
    pub fn options(&self) -> &TryOptions {
        &self.options
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }
}
