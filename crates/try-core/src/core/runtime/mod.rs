pub mod effects;
pub(crate) mod executor;
pub mod process;
#[cfg(test)]
pub(crate) mod testing;
