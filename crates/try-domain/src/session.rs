use serde::{Deserialize, Serialize};

use crate::spec::PackageSpec;

/// Interpreter every environment ships with; never installed as an extra tool.
pub const DEFAULT_INTERPRETER: &str = "python";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Plain `python` with the import preamble as startup file.
    Interpreter,
    /// An alternate interactive shell such as `ipython` or `ptpython`.
    Shell,
    /// Edit a generated script, then run it.
    Editor,
}

/// A `--shell` value split into program and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellCommand {
    /// Splits `raw` with shell word rules. Returns `None` for blank input or
    /// unbalanced quotes.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut words = shlex::split(raw)?.into_iter();
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }

    #[must_use]
    pub fn interpreter() -> Self {
        Self {
            program: DEFAULT_INTERPRETER.to_string(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_default_interpreter(&self) -> bool {
        self.program == DEFAULT_INTERPRETER
    }

    /// The package to install so the shell exists inside the environment.
    ///
    /// Only the program word is considered. Explicit paths point outside the
    /// environment and are used as-is.
    #[must_use]
    pub fn installable_tool(&self) -> Option<&str> {
        if self.is_default_interpreter()
            || self.program.contains('/')
            || self.program.contains('\\')
        {
            None
        } else {
            Some(&self.program)
        }
    }

    #[must_use]
    pub fn display(&self) -> String {
        let mut words = vec![self.program.as_str()];
        words.extend(self.args.iter().map(String::as_str));
        shlex::try_join(words.iter().copied()).unwrap_or_else(|_| words.join(" "))
    }
}

/// What the orchestrator should launch once packages are installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub specs: Vec<PackageSpec>,
    pub mode: SessionMode,
    pub shell_command: Option<ShellCommand>,
}

impl SessionRequest {
    #[must_use]
    pub fn new(specs: Vec<PackageSpec>, shell_command: Option<ShellCommand>, use_editor: bool) -> Self {
        let mode = if use_editor {
            SessionMode::Editor
        } else if shell_command
            .as_ref()
            .is_some_and(|shell| !shell.is_default_interpreter())
        {
            SessionMode::Shell
        } else {
            SessionMode::Interpreter
        };
        Self {
            specs,
            mode,
            shell_command,
        }
    }

    /// Shell used in interactive modes; falls back to the plain interpreter.
    #[must_use]
    pub fn interactive_shell(&self) -> ShellCommand {
        self.shell_command
            .clone()
            .unwrap_or_else(ShellCommand::interpreter)
    }

    #[must_use]
    pub fn import_symbols(&self) -> Vec<&str> {
        self.specs
            .iter()
            .map(|spec| spec.import_symbol.as_str())
            .collect()
    }
}
