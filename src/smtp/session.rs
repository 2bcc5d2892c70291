//! SMTP session state management

use crate::smtp::commands::{Command, extract_address};
use crate::smtp::email::Email;
use crate::smtp::response::SmtpResponse;
use tracing::debug;

/// Line that ends the DATA phase
const DATA_TERMINATOR: &str = ".";

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    /// Reading commands
    Command,
    /// DATA accepted - collecting body lines until a lone `.`
    Data,
}

/// The message being assembled by one session, not yet committed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Sender address from MAIL FROM, empty if never given
    pub from: String,
    /// Recipients from RCPT TO, in order, duplicates kept
    pub to: Vec<String>,
    /// Body lines concatenated as received
    pub data: String,
}

impl Draft {
    /// Forget everything collected so far
    pub fn clear(&mut self) {
        *self = Draft::default();
    }

    /// Turn the draft into an email with a fresh identifier, leaving the draft empty
    pub fn commit(&mut self) -> Email {
        let draft = std::mem::take(self);
        Email::new(draft.from, draft.to, draft.data)
    }
}

/// What the connection driver should do after a line has been handled
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send the reply and keep reading
    Reply(SmtpResponse),
    /// Send the reply and close the connection
    Close(SmtpResponse),
    /// The line was absorbed into the body; nothing to send
    Collect,
    /// DATA finished; commit the email and acknowledge it
    Deliver(Email),
}

/// Protocol state of a single connection
#[derive(Debug)]
pub struct SmtpSession<'a> {
    hostname: &'a str,
    /// Current state of the session
    pub state: SmtpState,
    /// Transaction in progress
    pub draft: Draft,
}

impl<'a> SmtpSession<'a> {
    /// Create a new SMTP session
    pub fn new(hostname: &'a str) -> Self {
        Self {
            hostname,
            state: SmtpState::Command,
            draft: Draft::default(),
        }
    }

    /// Reply sent as soon as the connection is accepted
    pub fn greeting(&self) -> SmtpResponse {
        SmtpResponse::greeting(self.hostname)
    }

    /// Feed one line, with its CRLF already stripped, into the state machine
    pub fn handle_line(&mut self, line: &str) -> Outcome {
        match self.state {
            SmtpState::Command => self.handle_command(line),
            SmtpState::Data => self.handle_data_line(line),
        }
    }

    fn handle_command(&mut self, line: &str) -> Outcome {
        let (command, payload) = Command::parse(line);
        debug!(?command, line, "smtp command");

        let response = match command {
            Command::Helo => SmtpResponse::helo(self.hostname),
            Command::Ehlo => SmtpResponse::ehlo(self.hostname),
            Command::Noop => SmtpResponse::ok(),
            Command::Quit => return Outcome::Close(SmtpResponse::quit()),
            Command::Rset => {
                self.draft.clear();
                SmtpResponse::ok()
            }
            Command::MailFrom => match extract_address(payload) {
                Some(addr) => {
                    self.draft.from = addr.to_owned();
                    SmtpResponse::ok()
                }
                None => bad_address(),
            },
            Command::RcptTo => match extract_address(payload) {
                Some(addr) => {
                    self.draft.to.push(addr.to_owned());
                    SmtpResponse::ok()
                }
                None => bad_address(),
            },
            Command::Data => {
                self.state = SmtpState::Data;
                SmtpResponse::data_start()
            }
            Command::Vrfy => SmtpResponse::ok_with(payload),
            Command::Unknown => SmtpResponse::unknown_command(),
        };

        Outcome::Reply(response)
    }

    fn handle_data_line(&mut self, line: &str) -> Outcome {
        if line == DATA_TERMINATOR {
            self.state = SmtpState::Command;
            return Outcome::Deliver(self.draft.commit());
        }

        self.draft.data.push_str(line);
        Outcome::Collect
    }
}

fn bad_address() -> SmtpResponse {
    SmtpResponse::syntax_error("address must be enclosed in angle brackets")
}
