//! Recognized C and C++ source file extensions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extensions compiled as C.
pub const C_FILE_EXTENSIONS: &[&str] = &["c"];

/// Extensions compiled as C++.
///
/// `.C` (uppercase) is C++ on case-sensitive filesystems.
pub const CPP_FILE_EXTENSIONS: &[&str] = &["C", "CPP", "c++", "cc", "cp", "cpp", "cxx"];

/// Source language of a compiled file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cxx,
}

impl Language {
    /// Get the language name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
        }
    }

    /// Language for a file extension (without the dot), if recognized.
    pub fn from_extension(extension: &str) -> Option<Language> {
        if C_FILE_EXTENSIONS.contains(&extension) {
            Some(Language::C)
        } else if CPP_FILE_EXTENSIONS.contains(&extension) {
            Some(Language::Cxx)
        } else {
            None
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
