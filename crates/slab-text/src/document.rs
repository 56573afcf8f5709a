//! Line buffer over the raw bytes of a model file.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    fn detect(raw: &[u8]) -> Self {
        match raw.iter().position(|&b| b == b'\n') {
            Some(i) if i > 0 && raw[i - 1] == b'\r' => LineEnding::CrLf,
            _ => LineEnding::Lf,
        }
    }
}

/// A model file split into lines without decoding.
///
/// Each stored line keeps every byte except its terminating `\n`, so a `\r`
/// of a CRLF file stays attached to its line and is written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    lines: Vec<Vec<u8>>,
    ending: LineEnding,
    trailing_newline: bool,
}

impl Document {
    pub fn from_bytes(raw: &[u8]) -> Self {
        let ending = LineEnding::detect(raw);
        let trailing_newline = raw.last() == Some(&b'\n');
        let mut lines: Vec<Vec<u8>> = raw.split(|&b| b == b'\n').map(<[u8]>::to_vec).collect();
        if trailing_newline || raw.is_empty() {
            lines.pop();
        }
        Self {
            lines,
            ending,
            trailing_newline,
        }
    }

    pub fn parse_str(raw: &str) -> Self {
        Self::from_bytes(raw.as_bytes())
    }

    pub fn read(path: impl AsRef<Path>) -> io::Result<Self> {
        let raw = fs::read(path)?;
        Ok(Self::from_bytes(&raw))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_ending(&self) -> LineEnding {
        self.ending
    }

    /// Text view of line `index` without its `\r`. Invalid UTF-8 is replaced,
    /// the stored bytes are not.
    pub fn line(&self, index: usize) -> Option<Cow<'_, str>> {
        self.lines.get(index).map(|raw| {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            String::from_utf8_lossy(raw)
        })
    }

    /// Text views of all lines, for scanning.
    pub fn text_lines(&self) -> Vec<Cow<'_, str>> {
        (0..self.lines.len()).filter_map(|i| self.line(i)).collect()
    }

    /// Insert `new_lines` so the first of them lands at `at` (`at == len()`
    /// appends). Inserted lines take the document's line ending.
    pub fn insert_lines<I, S>(&mut self, at: usize, new_lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let at = at.min(self.lines.len());
        let ending = self.ending;
        let encoded = new_lines.into_iter().map(|line| {
            let mut bytes = line.as_ref().as_bytes().to_vec();
            if ending == LineEnding::CrLf {
                bytes.push(b'\r');
            }
            bytes
        });
        self.lines.splice(at..at, encoded);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push(b'\n');
            }
            out.extend_from_slice(line);
        }
        if self.trailing_newline && !self.lines.is_empty() {
            out.push(b'\n');
        }
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> io::Result<()> {
        fs::write(path, self.to_bytes())
    }
}
