// SPDX-License-Identifier: PMPL-1.0-or-later

//! Shared reader/writer for the `BeginHeader … EndHeader` text files

use crate::model::header::FileHeader;
use anyhow::{anyhow, bail, Result};
use std::fmt::Write as _;
use std::str::FromStr;

const BEGIN_HEADER: &str = "BeginHeader";
const END_HEADER: &str = "EndHeader";

/// Line cursor over a file body that reports line numbers on failure.
pub struct TextReader<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> TextReader<'a> {
    pub fn new(body: &'a str) -> Self {
        Self {
            lines: body.lines().collect(),
            pos: 0,
        }
    }

    fn line_number(&self) -> usize {
        self.pos
    }

    /// Next non-blank line, trimmed.
    pub fn next_line(&mut self) -> Result<&'a str> {
        while self.pos < self.lines.len() {
            let line = self.lines[self.pos].trim();
            self.pos += 1;
            if !line.is_empty() {
                return Ok(line);
            }
        }
        bail!("unexpected end of file after line {}", self.line_number())
    }

    pub fn peek_line(&self) -> Option<&'a str> {
        self.lines[self.pos..]
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }

    pub fn at_end(&self) -> bool {
        self.peek_line().is_none()
    }

    pub fn next_tokens(&mut self) -> Result<Vec<&'a str>> {
        Ok(self.next_line()?.split_whitespace().collect())
    }

    /// Parse a token, naming it and the current line on failure.
    pub fn parse<T: FromStr>(&self, token: &str, what: &str) -> Result<T> {
        token.parse::<T>().map_err(|_| {
            anyhow!(
                "line {}: invalid {} \"{}\"",
                self.line_number(),
                what,
                token
            )
        })
    }

    /// Require at least `count` tokens on a line.
    pub fn expect_tokens(&self, tokens: &[&str], count: usize, what: &str) -> Result<()> {
        if tokens.len() < count {
            bail!(
                "line {}: expected {} values for {}, found {}",
                self.line_number(),
                count,
                what,
                tokens.len()
            );
        }
        Ok(())
    }

    /// Fail unless `count` one-line records can still follow.
    pub fn expect_records(&self, count: usize, what: &str) -> Result<usize> {
        let left = self.lines.len() - self.pos;
        if count > left {
            bail!(
                "line {}: {} {} declared but only {} lines remain",
                self.line_number(),
                count,
                what,
                left
            );
        }
        Ok(count)
    }

    /// Fail unless `count` whitespace-separated fields fit in the text left.
    pub fn expect_fields(&self, count: usize, what: &str) -> Result<usize> {
        let left: usize = self.lines[self.pos..].iter().map(|l| l.len() + 1).sum();
        if count > left {
            bail!(
                "line {}: {} {} declared but only {} bytes remain",
                self.line_number(),
                count,
                what,
                left
            );
        }
        Ok(count)
    }

    /// Value of a `tag-name value…` line, requiring the tag.
    pub fn expect_tag(&mut self, tag: &str) -> Result<&'a str> {
        let line = self.next_line()?;
        match line.strip_prefix(tag) {
            Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                Ok(rest.trim())
            }
            _ => bail!(
                "line {}: expected \"{}\", found \"{}\"",
                self.line_number(),
                tag,
                line
            ),
        }
    }
}

/// Split off an optional header block; the rest is the body.
pub fn parse_header(content: &str) -> Result<(FileHeader, TextReader<'_>)> {
    let mut header = FileHeader::new();
    let mut reader = TextReader::new(content);
    if reader.peek_line() != Some(BEGIN_HEADER) {
        return Ok((header, reader));
    }
    reader.next_line()?;
    loop {
        let line = reader
            .next_line()
            .map_err(|_| anyhow!("header is missing {}", END_HEADER))?;
        if line == END_HEADER {
            break;
        }
        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((k, v)) => (k.to_string(), v.trim().to_string()),
            None => (line.to_string(), String::new()),
        };
        header.push_raw(key, value);
    }
    Ok((header, reader))
}

pub fn write_header(header: &FileHeader, out: &mut String) {
    out.push_str(BEGIN_HEADER);
    out.push('\n');
    for (key, value) in header.iter() {
        if value.is_empty() {
            let _ = writeln!(out, "{}", key);
        } else {
            let _ = writeln!(out, "{} {}", key, value);
        }
    }
    out.push_str(END_HEADER);
    out.push('\n');
}

/// Shortest text that parses back to the same `f32`.
pub fn format_float(value: f32) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_in_order() {
        let text = "BeginHeader\nencoding ASCII\nconfiguration_id FIDUCIAL\ncomment two words\nEndHeader\n3\n";
        let (header, mut body) = parse_header(text).unwrap();
        let keys: Vec<_> = header.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["encoding", "configuration_id", "comment"]);
        assert_eq!(header.get("comment"), Some("two words"));
        assert_eq!(body.next_line().unwrap(), "3");

        let mut out = String::new();
        write_header(&header, &mut out);
        assert_eq!(out, "BeginHeader\nencoding ASCII\nconfiguration_id FIDUCIAL\ncomment two words\nEndHeader\n");
    }

    #[test]
    fn headerless_files_start_at_body() {
        let (header, mut body) = parse_header("\n2\n").unwrap();
        assert!(header.is_empty());
        assert_eq!(body.next_line().unwrap(), "2");
        assert!(body.at_end());
    }

    #[test]
    fn unterminated_header_is_an_error() {
        assert!(parse_header("BeginHeader\nkey value\n").is_err());
    }

    #[test]
    fn expect_tag_requires_exact_tag() {
        let mut reader = TextReader::new("tag-number-of-nodes 5\ntag-number-of-nodesX 1\n");
        assert_eq!(reader.expect_tag("tag-number-of-nodes").unwrap(), "5");
        assert!(reader.expect_tag("tag-number-of-nodes").is_err());
    }

    #[test]
    fn declared_counts_are_checked_against_the_rest_of_the_body() {
        let mut reader = TextReader::new("3\na\n\nb\n");
        reader.next_line().unwrap();
        assert_eq!(reader.expect_records(3, "rows").unwrap(), 3);
        assert!(reader.expect_records(4, "rows").is_err());
        assert_eq!(reader.expect_fields(5, "values").unwrap(), 5);
        assert!(reader.expect_fields(usize::MAX, "values").is_err());
    }
}
