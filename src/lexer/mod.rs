
use std::fmt::{self, Display};
use std::io;

use super::error::{Error, Result};

pub(crate) const END_LINE: &str = "\r\n";

/// Record is a single `<type>=<value>` line of a session description with its
/// terminator removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: u8,
    pub line: String,
}

impl Record {
    /// value returns everything after the `<type>=` prefix.
    pub fn value(&self) -> &str {
        // key and '=' are both single byte ASCII
        &self.line[2..]
    }

    pub(crate) fn syntax_error(self) -> Error {
        Error::SyntaxError {
            s: self.line,
            p: 0,
        }
    }
}

/// Lexer splits a byte stream into records. Lines may end in `\n` or `\r\n`
/// and empty lines are skipped.
pub struct Lexer<'a, R: io::BufRead> {
    pub reader: &'a mut R,
}

impl<'a, R: io::BufRead> Lexer<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        Lexer { reader }
    }

    /// read_record returns the next record, or `None` once the input is exhausted.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            let mut buf = vec![];
            if self.reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(None);
            }

            if buf.last() == Some(&b'\n') {
                buf.pop();
            }
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
            if buf.is_empty() {
                continue;
            }

            let line = String::from_utf8(buf)?;
            let bytes = line.as_bytes();
            if bytes.len() < 2 || bytes[1] != b'=' {
                let p = bytes.len().min(1);
                return Err(Error::SyntaxError { s: line, p });
            }
            if !bytes[0].is_ascii_alphabetic() {
                return Err(Error::SyntaxError { s: line, p: 0 });
            }

            return Ok(Some(Record {
                key: bytes[0],
                line,
            }));
        }
    }
}

impl<R: io::BufRead> Iterator for Lexer<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

pub fn write_key_value<W: fmt::Write, V: Display>(
    writer: &mut W,
    key: &str,
    value: Option<V>,
) -> fmt::Result {
    let Some(value) = value else {
        return Ok(());
    };

    write!(writer, "{key}{value}{END_LINE}")
}

pub fn write_key_slice_of_values<W: fmt::Write, V: Display>(
    writer: &mut W,
    key: &str,
    value: &[V],
) -> fmt::Result {
    if value.is_empty() {
        return Ok(());
    }

    write!(writer, "{key}")?;
    for (i, val) in value.iter().enumerate() {
        if i == 0 {
            write!(writer, "{val}")?;
        } else {
            write!(writer, " {val}")?;
        }
    }
    write!(writer, "{END_LINE}")
}
