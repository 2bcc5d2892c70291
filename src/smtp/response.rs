//! SMTP response handling

use uuid::Uuid;

/// Name advertised in HELO/EHLO replies
pub const SERVER_NAME: &str = "SmtpSink";

/// Represents an SMTP response that can be sent to a client
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpResponse {
    /// The SMTP response code (e.g., "250", "354", "500")
    pub code: String,
    /// The human-readable message
    pub message: String,
    /// Raw lines written after the first one, each on its own line
    pub extra_lines: Vec<String>,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            extra_lines: Vec::new(),
        }
    }

    /// Create a success response (250 Ok)
    pub fn ok() -> Self {
        Self::new("250", "Ok")
    }

    /// `250 Ok: <body>`, or a plain `250 Ok` when the body is empty
    pub fn ok_with(body: &str) -> Self {
        if body.is_empty() {
            Self::ok()
        } else {
            Self::new("250", &format!("Ok: {body}"))
        }
    }

    /// Create a greeting response (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new("220", hostname)
    }

    /// Create a HELO response (250)
    pub fn helo(hostname: &str) -> Self {
        Self::new("250", &format!("{hostname} {SERVER_NAME} server responding"))
    }

    /// Create an EHLO response: the HELO line followed by the SMTPUTF8 capability
    pub fn ehlo(hostname: &str) -> Self {
        let mut response = Self::helo(hostname);
        response.extra_lines.push("250-SMTPUTF8".to_owned());
        response
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new("354", "Start mail input; end with <CRLF>.<CRLF>")
    }

    /// Reply sent once a message has been committed to the store
    pub fn queued(id: &Uuid) -> Self {
        Self::ok_with(&format!("queued as {id}"))
    }

    /// Create a QUIT response (221)
    pub fn quit() -> Self {
        Self::new("221", "It was nice talking to you. Bye.")
    }

    pub fn unknown_command() -> Self {
        Self::new("500", "Unknown command")
    }

    /// Reply for an argument that could not be parsed (501)
    pub fn syntax_error(detail: &str) -> Self {
        Self::new("501", &format!("Syntax error: {detail}"))
    }

    /// Create an error response with an arbitrary code
    pub fn error(code: &str, message: &str) -> Self {
        Self::new(code, message)
    }

    /// Format the response for sending over the wire
    pub fn format(&self) -> String {
        let mut result = format!("{} {}\r\n", self.code, self.message);
        for line in &self.extra_lines {
            result.push_str(line);
            result.push_str("\r\n");
        }
        result
    }
}
