//! Output formatting for streamed query result lines

use crate::query::job::Connection;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Open stdout with or without color support
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print one result line, colorizing the `path:line:column:` key prefix.
///
/// Lines that do not carry a parseable key (quoted output, numeric keys,
/// raw text) are printed unchanged.
pub fn print_line(stdout: &mut StandardStream, line: &str) -> io::Result<()> {
    let (key, rest) = match line.split_once('\t') {
        Some((key, rest)) => (key, Some(rest)),
        None => (line, None),
    };

    match split_key(key) {
        Some((path, line_no, column)) => {
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
            write!(stdout, "{path}")?;
            stdout.reset()?;
            write!(stdout, ":")?;
            stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(stdout, "{line_no}")?;
            stdout.reset()?;
            write!(stdout, ":{column}:")?;
        }
        None => write!(stdout, "{key}")?,
    }

    if let Some(rest) = rest {
        write!(stdout, "\t{rest}")?;
    }
    writeln!(stdout)?;

    Ok(())
}

/// Split a `path:line:column:` key into its parts.
fn split_key(key: &str) -> Option<(&str, u32, u32)> {
    let key = key.strip_suffix(':')?;
    let (rest, column) = key.rsplit_once(':')?;
    let (path, line) = rest.rsplit_once(':')?;
    if path.is_empty() {
        return None;
    }
    let line: u32 = line.parse().ok()?;
    let column: u32 = column.parse().ok()?;
    Some((path, line, column))
}

/// Connection that prints result lines to stdout (direct, daemon-less mode)
pub struct StdoutConnection {
    stream: StandardStream,
}

impl StdoutConnection {
    pub fn new(color: bool) -> Self {
        Self {
            stream: stdout(color),
        }
    }
}

impl Connection for StdoutConnection {
    fn write_line(&mut self, line: &str) -> bool {
        print_line(&mut self.stream, line).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_key_parses_location_prefixes() {
        assert_eq!(
            split_key("src/a.cpp:12:3:"),
            Some(("src/a.cpp", 12, 3))
        );
        // a path may itself contain colons
        assert_eq!(split_key("c:dir/a.cpp:1:2:"), Some(("c:dir/a.cpp", 1, 2)));
        assert_eq!(split_key("no key here"), None);
        assert_eq!(split_key("\"quoted\""), None);
        assert_eq!(split_key("src/a.cpp:x:3:"), None);
    }
}
