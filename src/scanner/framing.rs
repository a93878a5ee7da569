//! Incremental framing of a concatenated JSON stream.
//!
//! The scanner writes pretty-printed JSON values back to back with no length
//! prefix. [`JsonFramer`] tracks nesting depth and string state so a value is
//! emitted exactly when its outermost bracket closes, regardless of how the
//! value is split across lines or what its strings contain.

use crate::error::{BumpError, Result};

#[derive(Debug, Default)]
pub struct JsonFramer {
    buf: String,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line (without its terminator) and return every value it completes.
    pub fn push_line(&mut self, line: &str) -> Result<Vec<String>> {
        let mut complete = Vec::new();

        for c in line.chars() {
            if self.depth == 0 {
                match c {
                    '{' | '[' => {
                        self.depth = 1;
                        self.buf.push(c);
                    }
                    c if c.is_whitespace() => {}
                    other => {
                        return Err(BumpError::Protocol(format!(
                            "unexpected {:?} outside of a JSON object",
                            other
                        )))
                    }
                }
                continue;
            }

            self.buf.push(c);

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match c {
                '"' => self.in_string = true,
                '{' | '[' => self.depth += 1,
                '}' | ']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        complete.push(std::mem::take(&mut self.buf));
                    }
                }
                _ => {}
            }
        }

        if self.depth > 0 {
            self.buf.push('\n');
        }

        Ok(complete)
    }

    /// Bytes held for a value that has not closed yet.
    pub fn pending(&self) -> usize {
        self.buf.trim().len()
    }

    /// Signal end of stream; fails if a value was left open.
    pub fn finish(self) -> Result<()> {
        match self.pending() {
            0 => Ok(()),
            pending => Err(BumpError::Truncated { pending }),
        }
    }
}
