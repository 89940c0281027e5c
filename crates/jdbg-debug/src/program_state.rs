//! Source listing for `show-state`.

use std::path::Path;

use crate::error::DebugError;

/// One rendered source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Whether the target is halted on this line.
    pub current: bool,
    pub text: String,
}

/// Prefix each source line with `>` for the current line, its number, and
/// `o` when a breakpoint is registered there.
pub fn render(source: &str, current: Option<u32>, breakpoints: &[u32]) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .map(|(i, text)| {
            let number = i as u32 + 1;
            let is_current = current == Some(number);
            let marker = if is_current { '>' } else { ' ' };
            let bp = if breakpoints.contains(&number) { 'o' } else { ' ' };
            SourceLine {
                current: is_current,
                text: format!("{marker}{number:3} {bp} {text}"),
            }
        })
        .collect()
}

pub fn load(path: &Path) -> Result<String, DebugError> {
    std::fs::read_to_string(path).map_err(|source| DebugError::Source {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "class Test {\n  int x = 1;\n  void f() {}\n}";

    #[test]
    fn program_state_markers() {
        let lines = render(SOURCE, Some(2), &[3]);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "   1   class Test {");
        assert_eq!(lines[1].text, ">  2     int x = 1;");
        assert!(lines[1].current);
        assert_eq!(lines[2].text, "   3 o   void f() {}");
        assert!(!lines[2].current);
    }

    #[test]
    fn program_state_without_location() {
        let lines = render(SOURCE, None, &[]);
        assert!(lines.iter().all(|l| !l.current));
    }

    #[test]
    fn program_state_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("Missing.java")).unwrap_err();
        assert!(matches!(err, DebugError::Source { .. }));
    }

    #[test]
    fn program_state_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Test.java");
        std::fs::write(&path, SOURCE).unwrap();
        assert_eq!(load(&path).unwrap(), SOURCE);
    }
}
