pub mod crop;
pub mod tier;
#[allow(clippy::module_inception)]
pub mod workspace;
