//! Error taxonomy and the outcome envelope handed back to the CLI.

pub(crate) mod errors;
pub(crate) mod outcome;
