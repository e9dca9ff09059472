//! Selection of the compiler flags an IDE needs.
//!
//! An IDE re-runs the front end on one file to index it; flags that only
//! matter for producing build outputs (object path, dependency files) are
//! removed, everything else is kept in order.

/// Flags removed together with the word that follows them.
const STRIP_WITH_VALUE: &[&str] = &["-o", "-MF", "-MT", "-MQ", "--serialize-diagnostics"];

/// Flags removed on their own.
const STRIP_ALONE: &[&str] = &["-c", "-M", "-MM", "-MD", "-MMD", "-MG", "-MP"];

/// Prefixes of joined forms such as `-oout.o` or `-MFdeps.d`.
const STRIP_JOINED: &[&str] = &["-o", "-MF", "-MT", "-MQ", "--serialize-diagnostics="];

/// Positions in `flags` of the flags relevant to the IDE for `source_file`.
pub fn ide_flag_indices(source_file: &str, flags: &[String]) -> Vec<usize> {
    let mut kept = Vec::with_capacity(flags.len());
    let mut i = 0;

    while i < flags.len() {
        let flag = flags[i].as_str();
        if STRIP_WITH_VALUE.contains(&flag) {
            i += 2;
            continue;
        }
        if flag == source_file
            || STRIP_ALONE.contains(&flag)
            || STRIP_JOINED.iter().any(|prefix| is_joined(flag, prefix))
        {
            i += 1;
            continue;
        }
        kept.push(i);
        i += 1;
    }

    kept
}

/// The flags relevant to the IDE for `source_file`, in order.
pub fn strip_args_for_ide(source_file: &str, flags: &[String]) -> Vec<String> {
    ide_flag_indices(source_file, flags)
        .into_iter()
        .map(|i| flags[i].clone())
        .collect()
}

fn is_joined(flag: &str, prefix: &str) -> bool {
    flag.len() > prefix.len() && flag.starts_with(prefix) && !is_unrelated_long_option(flag)
}

/// Driver options that begin with `-o` without naming an output.
fn is_unrelated_long_option(flag: &str) -> bool {
    flag.starts_with("-objc") || flag.starts_with("-object")
}
