//! Parsing of SMTP command lines
//!
//! The grammar is deliberately loose: anything in front of the first colon is
//! taken as the verb, which is how `MAIL FROM:<addr>` and `RCPT TO:<addr>` are
//! recognised without a real tokenizer.

/// Verbs that carry a space-separated argument instead of a colon
const SPACED_VERBS: [&str; 3] = ["HELLO", "EHLO", "VRFY"];

/// A command recognised by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Helo,
    Ehlo,
    Noop,
    Quit,
    Rset,
    MailFrom,
    RcptTo,
    Data,
    Vrfy,
    Unknown,
}

impl Command {
    /// Map an uppercased verb onto a command
    pub fn from_verb(verb: &str) -> Self {
        match verb {
            "HELO" => Command::Helo,
            "EHLO" => Command::Ehlo,
            "NOOP" => Command::Noop,
            "QUIT" => Command::Quit,
            "RSET" => Command::Rset,
            "MAIL FROM" => Command::MailFrom,
            "RCPT TO" => Command::RcptTo,
            "DATA" => Command::Data,
            "VRFY" => Command::Vrfy,
            _ => Command::Unknown,
        }
    }

    /// Classify a raw command line, returning the command and its payload
    pub fn parse(line: &str) -> (Command, &str) {
        let verb = parse_verb(line);
        (Command::from_verb(&verb), payload(line, &verb))
    }
}

/// Extract the uppercased verb from a command line.
///
/// Uppercasing is ASCII-only so that byte offsets into the verb remain valid
/// offsets into the original line.
pub fn parse_verb(line: &str) -> String {
    let upper = line.to_ascii_uppercase();

    match upper.find(':') {
        Some(idx) if idx > 0 => return upper[..idx].to_owned(),
        _ => {}
    }

    for verb in SPACED_VERBS {
        if upper.starts_with(verb) && upper[verb.len()..].starts_with(' ') {
            return verb.to_owned();
        }
    }

    upper
}

/// The part of `line` after `verb` and one separator character
pub fn payload<'a>(line: &'a str, verb: &str) -> &'a str {
    if line.len() == verb.len() {
        return "";
    }
    line.get(verb.len() + 1..).unwrap_or("")
}

/// Text strictly between the first `<` and the first `>` of `payload`.
///
/// Returns `None` when either delimiter is missing or the closing one comes
/// first.
pub fn extract_address(payload: &str) -> Option<&str> {
    let start = payload.find('<')?;
    let end = payload.find('>')?;
    if end < start {
        return None;
    }
    Some(&payload[start + 1..end])
}
