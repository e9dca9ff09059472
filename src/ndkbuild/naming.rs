//! Names derived from output paths.
//!
//! ndk-build lays out its products as `.../<toolchain-dir>/<abi>/<output>`.
//! Nothing in the transcript states the ABI or toolchain explicitly; they are
//! read back from that layout here and only here.

use super::conventions::FileConventions;

/// ABI of an output: the name of the directory containing it.
pub fn derive_abi_from_path(output: &str, conventions: &dyn FileConventions) -> String {
    conventions
        .file_name(conventions.file_parent(output))
        .to_string()
}

/// Toolchain of an output: `toolchain-` followed by the name of the
/// directory two levels up.
///
/// A layout that does not follow the ndk-build convention still yields a
/// name; it is just not a meaningful one.
pub fn derive_toolchain_from_path(output: &str, conventions: &dyn FileConventions) -> String {
    let grandparent = conventions.file_parent(conventions.file_parent(output));
    format!("toolchain-{}", conventions.file_name(grandparent))
}

/// Target name from an output file name: `libfoo.so` -> `foo`.
pub fn target_name_from_output_file_name(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    stem.strip_prefix("lib").unwrap_or(stem).to_string()
}

/// `{artifact}-{variant}-{abi}`
pub fn library_name(artifact_name: &str, variant_name: &str, abi: &str) -> String {
    format!("{}-{}-{}", artifact_name, variant_name, abi)
}
