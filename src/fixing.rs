//! Fixing-commit classification and patch keyword statistics.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static CVE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CVE-\d{4}-\d{4,7}").expect("valid CVE pattern"));

static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").expect("valid separator pattern"));

/// C and C++ keywords plus the libc allocation family.
pub const PATCH_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else", "enum", "extern",
    "float", "for", "goto", "if", "int", "long", "register", "return", "short", "signed", "sizeof", "static",
    "struct", "switch", "typedef", "union", "unsigned", "void", "volatile", "while", "asm", "dynamic_cast",
    "namespace", "reinterpret_cast", "try", "bool", "explicit", "new", "static_cast", "typeid", "catch", "false",
    "operator", "template", "typename", "class", "friend", "private", "this", "using", "const_cast", "inline",
    "public", "throw", "virtual", "delete", "mutable", "protected", "true", "wchar_t", "malloc", "calloc",
    "realloc", "free", "alloca", "alloc",
];

/// CVE ids mentioned in a commit message, in order of appearance.
pub fn cve_ids(message: &str) -> Vec<&str> {
    CVE_RE.find_iter(message).map(|m| m.as_str()).collect()
}

/// The commit's CVE column: every mentioned id joined with `", "`, or `None`
/// when the message mentions none.
pub fn fixed_cves(message: &str) -> Option<String> {
    let ids = cve_ids(message);
    if ids.is_empty() {
        None
    } else {
        Some(ids.join(", "))
    }
}

/// Keyword occurrence counts over the whole patch text. Every keyword is
/// present, with zero when absent; an empty patch yields `None`.
pub fn patch_keywords(patch: &str) -> Option<BTreeMap<String, usize>> {
    if patch.is_empty() {
        return None;
    }
    let mut counts: BTreeMap<String, usize> = PATCH_KEYWORDS.iter().map(|k| (k.to_string(), 0)).collect();
    for token in NON_WORD_RE.split(patch).filter(|t| !t.is_empty()) {
        if let Some(count) = counts.get_mut(token) {
            *count += 1;
        }
    }
    Some(counts)
}
