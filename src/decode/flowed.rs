//! `format=flowed` handling for text/plain bodies (RFC 3676).
//!
//! Lines are de-stuffed and grouped into paragraphs by quote depth, and the
//! quote markers are rewritten as `"> "`-style prefixes. Paragraphs are not
//! re-wrapped to a target width: every input line stays on its own output line.

use std::collections::VecDeque;
use std::io;

const SIGNATURE_DELIMITER: &str = "-- ";

/// Reformats a stream of flowed lines.
pub struct FlowedText<I> {
    inner: I,
    delsp: bool,
    paragraph: Vec<String>,
    depth: usize,
    ready: VecDeque<String>,
    done: bool,
}

impl<I: Iterator<Item = io::Result<String>>> FlowedText<I> {
    /// `delsp` removes the trailing space that marks each flowed line.
    pub fn new(inner: I, delsp: bool) -> Self {
        Self {
            inner,
            delsp,
            paragraph: Vec::new(),
            depth: 0,
            ready: VecDeque::new(),
            done: false,
        }
    }

    fn flush_paragraph(&mut self) {
        let prefix = quote_prefix(self.depth);
        for line in self.paragraph.drain(..) {
            self.ready.push_back(format!("{prefix}{line}"));
        }
        self.depth = 0;
    }

    fn process(&mut self, raw: String) {
        let mut is_signature = raw == SIGNATURE_DELIMITER;

        let unquoted = raw.trim_start_matches('>');
        let depth = raw.len() - unquoted.len();
        let mut line = unquoted.strip_prefix(' ').unwrap_or(unquoted).to_string();

        if line == SIGNATURE_DELIMITER {
            is_signature = true;
        }

        let mut flowed = false;
        if !is_signature && line.ends_with(' ') {
            flowed = true;
            if self.delsp {
                line.pop();
            }
        }
        if line.chars().all(|c| c == ' ') {
            flowed = true;
        }

        if !flowed || depth != self.depth {
            self.flush_paragraph();
        }

        if flowed {
            self.paragraph.push(line);
            self.depth = depth;
        } else {
            self.ready.push_back(format!("{}{line}", quote_prefix(depth)));
        }
    }
}

impl<I: Iterator<Item = io::Result<String>>> Iterator for FlowedText<I> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if self.done {
                return None;
            }
            match self.inner.next() {
                Some(Ok(raw)) => self.process(raw),
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.flush_paragraph();
                    self.done = true;
                }
            }
        }
    }
}

fn quote_prefix(depth: usize) -> String {
    if depth == 0 {
        String::new()
    } else {
        format!("{} ", ">".repeat(depth))
    }
}
