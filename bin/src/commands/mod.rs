//! CLI command implementations.

pub(crate) mod periods;
pub(crate) mod replay;
