//! Textual pre-pass that runs before parsing.
//!
//! Submitted snippets routinely start with the SDK import line they were
//! copied with. Import and export declarations cannot appear inside the
//! synthetic function wrapper the validator parses, so they are stripped
//! line-by-line here, before any parsing happens. Nothing is validated at
//! this stage; malformed leftovers surface as parse diagnostics later.

use std::sync::LazyLock;

use regex::Regex;

/// Multi-line `import { … } from '…'` blocks. Applied first so the
/// single-line pattern below cannot orphan the tail of a block. The body is
/// bounded by the braces so the match can never swallow code between two
/// unrelated import lines.
static IMPORT_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:[\w$]+\s*,\s*)?\{[^}]*\}\s*from\s+['"][^'"]+['"]\s*;?\s*$"#)
        .unwrap()
});

/// Single-line import declarations, with or without a `from` clause.
static IMPORT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*import\s+.*?(?:from\s+['"][^'"]+['"])?[;\s]*$"#).unwrap()
});

/// Export declarations (the remainder of a multi-line export body is left
/// for the parser to reject).
static EXPORT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*export\s+.*?[;\s]*$").unwrap());

/// Fully blank lines left behind by the removals above.
static BLANK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\n").unwrap());

/// Remove import/export declarations and collapse the blank lines left
/// behind.
///
/// Purely textual: the result is what the validator parses and, on
/// acceptance, what the runner executes.
pub fn presanitize(raw_code: &str) -> String {
    let code = IMPORT_BLOCK_RE.replace_all(raw_code, "");
    let code = IMPORT_LINE_RE.replace_all(&code, "");
    let code = EXPORT_LINE_RE.replace_all(&code, "");
    BLANK_LINE_RE.replace_all(&code, "").into_owned()
}
