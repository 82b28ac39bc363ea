#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod session;
pub mod spec;

pub use session::{SessionMode, SessionRequest, ShellCommand, DEFAULT_INTERPRETER};
pub use spec::{parse, resolve, PackageSpec, SpecError, GITHUB_VCS_PREFIX};
