use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Result};

use super::effects::{Effects, ProcessRunner};
use super::process::{append_log_line, ExecutionResult, Invocation};

/// Records invocations instead of spawning them. Environment creators get a
/// minimal `env/bin/activate` layout so validation passes.
#[derive(Default)]
pub(crate) struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    exit_codes: Mutex<Vec<(String, i32)>>,
    missing: Mutex<Vec<String>>,
    skip_layout: Mutex<bool>,
    occupied: Mutex<Vec<String>>,
}

impl FakeRunner {
    /// Any command whose text contains `needle` exits with `code`.
    pub(crate) fn fail_on(&self, needle: &str, code: i32) {
        self.exit_codes
            .lock()
            .expect("exit codes")
            .push((needle.to_string(), code));
    }

    /// `program` behaves as if it were not installed.
    pub(crate) fn missing_program(&self, program: &str) {
        self.missing.lock().expect("missing").push(program.to_string());
    }

    /// Creators succeed without leaving an activation script behind.
    pub(crate) fn without_layout(&self) {
        *self.skip_layout.lock().expect("layout") = true;
    }

    /// Every command leaves a directory called `name` in its working
    /// directory, so a later write to that path fails.
    pub(crate) fn occupy(&self, name: &str) {
        self.occupied.lock().expect("occupied").push(name.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::command_text).collect()
    }
}

impl ProcessRunner for FakeRunner {
    fn run(&self, invocation: &Invocation, log: &Path) -> Result<ExecutionResult> {
        self.calls.lock().expect("calls").push(invocation.clone());
        let command_text = invocation.command_text();
        append_log_line(log, &format!("$ {command_text}"))?;

        if self
            .missing
            .lock()
            .expect("missing")
            .contains(&invocation.program)
        {
            bail!(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", invocation.program)
            ));
        }

        let exit_code = self
            .exit_codes
            .lock()
            .expect("exit codes")
            .iter()
            .find(|(needle, _)| command_text.contains(needle.as_str()))
            .map_or(0, |(_, code)| *code);

        let creates_env = invocation.program == "virtualenv"
            || invocation.args.windows(2).any(|pair| pair == ["-m", "venv"]);
        if exit_code == 0 && creates_env && !*self.skip_layout.lock().expect("layout") {
            let bin = invocation.cwd.join("env").join("bin");
            fs::create_dir_all(&bin)?;
            fs::write(bin.join("activate"), "# fake\n")?;
        }

        for name in self.occupied.lock().expect("occupied").iter() {
            fs::create_dir_all(invocation.cwd.join(name))?;
        }

        Ok(ExecutionResult {
            exit_code,
            command_text,
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeEffects {
    pub(crate) runner: FakeRunner,
}

impl Effects for FakeEffects {
    fn runner(&self) -> &dyn ProcessRunner {
        &self.runner
    }
}
