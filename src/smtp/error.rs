//! Error types for the SMTP server

use crate::smtp::response::SmtpResponse;
use thiserror::Error;

/// Errors that end a session
#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Line not terminated by CRLF")]
    MalformedLine,

    #[error("Line too long (max {max} bytes)")]
    LineTooLong { max: usize },
}

impl SmtpError {
    /// Last reply to send before dropping the connection, if the peer can
    /// still hear one
    pub fn reply(&self) -> Option<SmtpResponse> {
        match self {
            SmtpError::Io(_) | SmtpError::ConnectionClosed => None,
            SmtpError::MalformedLine => {
                Some(SmtpResponse::error("500", "Line must end with <CRLF>"))
            }
            SmtpError::LineTooLong { max } => Some(SmtpResponse::error(
                "500",
                &format!("Line too long (max {max} bytes)"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_errors_have_replies() {
        let reply = SmtpError::MalformedLine.reply().unwrap();
        assert_eq!(reply.format(), "500 Line must end with <CRLF>\r\n");

        let reply = SmtpError::LineTooLong { max: 10 }.reply().unwrap();
        assert_eq!(reply.format(), "500 Line too long (max 10 bytes)\r\n");
    }

    #[test]
    fn test_transport_errors_are_silent() {
        assert!(SmtpError::ConnectionClosed.reply().is_none());

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: SmtpError = io.into();
        assert!(matches!(err, SmtpError::Io(_)));
        assert_eq!(err.to_string(), "IO error: gone");
        assert!(err.reply().is_none());
    }
}
