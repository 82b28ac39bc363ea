pub(crate) mod api;
pub(crate) mod config;
pub(crate) mod environment;
pub(crate) mod fs;
pub(crate) mod orchestrator;
pub(crate) mod python;
pub(crate) mod runtime;
pub(crate) mod session;
pub(crate) mod tooling;
