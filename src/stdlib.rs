//! The embedded JavaScript standard library, bundled into the binary
//! with [`include_str!`] so the CLI never needs to locate it on disk.
//!
//! The standard library's own content is out of scope for this crate
//! (see the system design's out-of-scope collaborators); this module
//! only owns getting its text into the right places: primed into the
//! [`crate::runtime::Runtime`] on spawn, and appended to every compiled
//! output file behind the banner comment the original compiler writes.

/// The raw JavaScript source of the embedded standard library.
pub const SOURCE: &str = include_str!("../stdlib/stdlib.js");

/// The banner separating a compiled program from the appended stdlib
/// in an output file, matching the original compiler's output layout.
pub const BANNER: &str = "// ========\n// stdlib\n// ========";

/// Renders the full output file contents: the transpiled program,
/// the banner, then the embedded stdlib.
pub fn with_banner(program_js: &str) -> String {
    format!("{program_js}\n{BANNER}\n{SOURCE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_sits_between_program_and_stdlib() {
        let out = with_banner("let x = 1;");
        assert!(out.starts_with("let x = 1;"));
        assert!(out.contains(BANNER));
        assert!(out.ends_with(SOURCE));
    }

    #[test]
    fn stdlib_defines_nil() {
        assert!(SOURCE.contains("const nil = null;"));
    }
}
