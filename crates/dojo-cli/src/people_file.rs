//! People file parsing.
//!
//! One person per line: `NAME... FELLOW|STAFF [Y|N]`. Blank lines and
//! lines starting with `#` are ignored.

use dojo_core::prelude::PersonKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonEntry {
    pub name: String,
    pub kind: PersonKind,
    pub wants_accommodation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected a name followed by FELLOW or STAFF")]
    TooShort,
    #[error("invalid person type '{0}'")]
    PersonType(String),
    #[error("invalid accommodation flag '{0}', expected Y or N")]
    Accommodation(String),
}

/// Parse a `Y`/`N` accommodation flag
pub fn parse_accommodation(flag: &str) -> Result<bool, ParseError> {
    match flag.trim().to_ascii_uppercase().as_str() {
        "Y" => Ok(true),
        "N" => Ok(false),
        _ => Err(ParseError::Accommodation(flag.to_string())),
    }
}

/// Parse one line; `Ok(None)` for blanks and comments
pub fn parse_line(line: &str) -> Result<Option<PersonEntry>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts: Vec<&str> = line.split_whitespace().collect();
    let wants_accommodation = match parts.last() {
        Some(last) if last.eq_ignore_ascii_case("y") || last.eq_ignore_ascii_case("n") => {
            let flag = parse_accommodation(last)?;
            parts.pop();
            flag
        }
        _ => false,
    };

    if parts.len() < 2 {
        return Err(ParseError::TooShort);
    }
    let kind_word = parts.pop().unwrap_or_default();
    let kind = kind_word
        .parse::<PersonKind>()
        .map_err(|_| ParseError::PersonType(kind_word.to_string()))?;

    Ok(Some(PersonEntry {
        name: parts.join(" "),
        kind,
        wants_accommodation,
    }))
}

/// Parse a whole file, collecting valid entries and (line number, error)
/// pairs for the rest
pub fn parse(contents: &str) -> (Vec<PersonEntry>, Vec<(usize, ParseError)>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(entry)) => entries.push(entry),
            Ok(None) => {}
            Err(e) => errors.push((index + 1, e)),
        }
    }
    (entries, errors)
}
