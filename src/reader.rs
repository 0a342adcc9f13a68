//! Logical line reader.
//!
//! A `\` at the end of a physical line joins it with the next one. Each
//! logical line is reported with the number of its first physical line.

use std::io::{self, BufRead};

pub struct LineReader<R> {
    inner: R,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, line: 0 }
    }

    /// Reads one physical line without its terminator. `None` at end of input.
    fn physical(&mut self) -> io::Result<Option<String>> {
        let mut buffer = String::new();
        if self.inner.read_line(&mut buffer)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        if buffer.ends_with('\n') {
            buffer.pop();
        }
        if buffer.ends_with('\r') {
            buffer.pop();
        }
        Ok(Some(buffer))
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut logical = match self.physical() {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(err) => return Some(Err(err)),
        };
        let number = self.line;

        while logical.ends_with('\\') {
            logical.pop();
            match self.physical() {
                Ok(Some(next)) => logical.push_str(&next),
                Ok(None) => break,
                Err(err) => return Some(Err(err)),
            }
        }
        Some(Ok((number, logical)))
    }
}
