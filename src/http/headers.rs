use std::fmt;

use indexmap::IndexMap;

use crate::http::error::HttpError;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Case-insensitive, insertion-ordered header map.
///
/// Keys are stored lower-cased. [`HeaderTable::set`] joins repeated keys
/// with `", "`, which is also what the line parser does for repeated header
/// lines. [`HeaderTable::set_override`] is the only way to replace a value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    entries: IndexMap<String, String>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a single `Name: Value\r\n` line from the front of `buf`.
    ///
    /// Returns `(consumed, done)`:
    ///
    /// * `(0, false)` when `buf` holds no complete line yet,
    /// * `(2, true)` when `buf` starts with the blank line ending the block,
    /// * `(line_len + 2, false)` after storing one header.
    ///
    /// Only the returned prefix is consumed, so the caller can re-invoke this
    /// on a growing buffer without re-reading bytes.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpwire::http::headers::HeaderTable;
    /// let mut headers = HeaderTable::new();
    /// let (n, done) = headers.parse(b"Host: localhost:42069\r\n\r\n").unwrap();
    /// assert_eq!((n, done), (23, false));
    /// assert_eq!(headers.get("HOST"), Some("localhost:42069"));
    /// ```
    pub fn parse(&mut self, buf: &[u8]) -> Result<(usize, bool), HttpError> {
        let Some(line_end) = find_crlf(buf) else {
            return Ok((0, false));
        };

        if line_end == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = std::str::from_utf8(&buf[..line_end])
            .map_err(|_| HttpError::InvalidHeaderFormat(String::from_utf8_lossy(&buf[..line_end]).into_owned()))?;
        let (name, value) = split_header_line(line)?;

        self.set(name, value);

        Ok((line_end + CRLF.len(), false))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Adds a value, joining it onto an existing one as `old, new`.
    pub fn set(&mut self, key: &str, value: &str) {
        let key = key.to_ascii_lowercase();
        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                self.entries.insert(key, value.to_string());
            }
        }
    }

    /// Replaces any existing value for `key`.
    pub fn set_override(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_ascii_lowercase(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(&key.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes every entry as `name: value\r\n`, without the blank line.
    pub(crate) fn write_lines(&self, buf: &mut Vec<u8>) {
        for (name, value) in self.iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(CRLF);
        }
    }
}

impl fmt::Display for HeaderTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for HeaderTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut table = HeaderTable::new();
        for (key, value) in iter {
            table.set(key, value);
        }
        table
    }
}

pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn split_header_line(line: &str) -> Result<(&str, &str), HttpError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| HttpError::InvalidHeaderFormat(line.to_string()))?;

    // Leading whitespace is tolerated, "Name :" is not.
    let name = name.trim_start();
    if name != name.trim_end() {
        return Err(HttpError::InvalidHeaderFormat(line.to_string()));
    }

    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(HttpError::InvalidHeaderKey(name.to_string()));
    }

    Ok((name, value.trim()))
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}
