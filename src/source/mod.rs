//! Source files: which paths count as code, and where their functions are.

pub mod parser;

pub use parser::TreeSitterParser;

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static CODE_FILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\.(fort|c|c\+\+|cpp|h|hpp|py|sh|pl|cs\+\+|hh)$").expect("valid code file pattern")
});

/// Extension-based filter applied before any blame or function work.
pub fn is_code_file(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    CODE_FILE_RE.is_match(&name)
}
