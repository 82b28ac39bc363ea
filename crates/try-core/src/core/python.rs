use std::ffi::OsString;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use which::which_in;

use crate::core::config::settings::EnvSnapshot;

const FALLBACK_INTERPRETER: &str = "python3";

static VERSION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("version pattern"));

/// Interpreter used to build environments when `-p` and the config file are
/// silent: `TRY_RUNTIME_PYTHON`, then the first of `python3`/`python` on the
/// search path.
pub(crate) fn detect_interpreter(env: &EnvSnapshot, cwd: &Path) -> String {
    if let Some(explicit) = env.var("TRY_RUNTIME_PYTHON").filter(|v| !v.trim().is_empty()) {
        return explicit.trim().to_string();
    }

    let search_path = env.var("PATH").map(OsString::from);
    for candidate in ["python3", "python"] {
        if which_in(candidate, search_path.clone(), cwd).is_ok() {
            return candidate.to_string();
        }
    }
    FALLBACK_INTERPRETER.to_string()
}

/// `3.11` becomes `python3.11`; names and paths pass through untouched.
#[must_use]
pub fn normalize_python_version(value: &str) -> String {
    let value = value.trim();
    if VERSION_NUMBER.is_match(value) {
        format!("python{value}")
    } else {
        value.to_string()
    }
}
