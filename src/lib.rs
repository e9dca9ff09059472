//! ndkscan - interpretation of ndk-build dry runs
//!
//! This crate reads the transcript printed by `ndk-build -n` and recovers
//! the native build configuration an IDE needs: the libraries being built,
//! the sources and flags of each, and the compilers of each toolchain.

pub mod ndkbuild;
pub mod ops;
pub mod util;

/// Test utilities for ndkscan unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides transcript fixtures and temporary projects.
#[cfg(test)]
pub mod test_support;

pub use ndkbuild::{NativeBuildConfigValue, NativeBuildConfigValueBuilder, NdkBuildError};
