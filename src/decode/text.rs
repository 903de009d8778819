//! Line-level stages of the text decoding pipeline.

use std::io::{self, BufRead};

/// Splits UTF-8 text into lines without their `\n` or `\r\n` terminators.
pub struct TextLines<R> {
    inner: R,
}

impl<R: BufRead> TextLines<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BufRead> Iterator for TextLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.inner.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Collapses each run of blank lines into one, and drops blank lines at
/// the end of the input.
///
/// A run is only emitted once a non-blank line follows it.
pub struct CollapseBlankLines<I> {
    inner: I,
    held: Option<String>,
}

impl<I> CollapseBlankLines<I> {
    pub fn new(inner: I) -> Self {
        Self { inner, held: None }
    }
}

impl<I: Iterator<Item = io::Result<String>>> Iterator for CollapseBlankLines<I> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.held.take() {
            return Some(Ok(line));
        }
        let mut saw_blank = false;
        loop {
            match self.inner.next()? {
                Ok(line) if line.is_empty() => saw_blank = true,
                Ok(line) if saw_blank => {
                    self.held = Some(line);
                    return Some(Ok(String::new()));
                }
                other => return Some(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collapse(input: &str) -> String {
        CollapseBlankLines::new(TextLines::new(input.as_bytes()))
            .map(|line| line.unwrap() + "\n")
            .collect()
    }

    #[test]
    fn test_lines_strip_terminators() {
        let lines: Vec<String> = TextLines::new("a\r\nb\nc".as_bytes())
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lines_keep_inner_cr() {
        let lines: Vec<String> = TextLines::new("a\rb\n".as_bytes())
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines, vec!["a\rb"]);
    }

    #[test]
    fn test_collapse_blank_run() {
        assert_eq!(collapse("a\n\n\n\nb\n"), "a\n\nb\n");
    }

    #[test]
    fn test_collapse_drops_trailing_blanks() {
        assert_eq!(collapse("a\n\n\n"), "a\n");
        assert_eq!(collapse("\n\n"), "");
    }

    #[test]
    fn test_collapse_keeps_single_blank_and_leading_run() {
        assert_eq!(collapse("\n\nx\n\ny\n"), "\nx\n\ny\n");
    }
}
