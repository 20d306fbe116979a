//! Shared setup code for the myr binaries

pub mod common;
