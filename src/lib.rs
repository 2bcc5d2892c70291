//! # SmtpSink
//!
//! SmtpSink is an in-memory SMTP server for development and integration
//! testing.
//!
//! Point the application under test at it and every message it sends is kept
//! in memory instead of being delivered.
//!
//! ## Quick Start
//!
//! ```rust
//! use smtpsink::{ServerConfig, SmtpServer};
//! use std::io::{BufRead, BufReader, Write};
//! use std::net::TcpStream;
//! use std::time::Duration;
//!
//! let server = SmtpServer::start(&ServerConfig::new("127.0.0.1:0", "test.local"))?;
//!
//! // Application sends email to server.local_addr()
//! let mut stream = TcpStream::connect(server.local_addr())?;
//! let mut greeting = String::new();
//! BufReader::new(stream.try_clone()?).read_line(&mut greeting)?;
//! stream.write_all(b"MAIL FROM:<app@example.com>\r\nRCPT TO:<user@example.com>\r\n")?;
//! stream.write_all(b"DATA\r\nHello\r\n.\r\nQUIT\r\n")?;
//!
//! // Check the contents of the sent email
//! let emails = server.store().wait_for(1, Duration::from_secs(1));
//! assert_eq!(emails[0].from, "app@example.com");
//! assert_eq!(emails[0].data, "Hello");
//!
//! server.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO`, `EHLO` - Greeting (EHLO also advertises `SMTPUTF8`)
//! - `MAIL FROM` - Specify the sender's address
//! - `RCPT TO` - Specify a recipient (repeat for several)
//! - `DATA` - Send the email body, ended by a line holding only `.`
//! - `RSET` - Reset the current transaction
//! - `VRFY` - Echoed back, nothing is verified
//! - `NOOP` - Do nothing
//! - `QUIT` - Close connection
//!
//! Anything else gets `500 Unknown command` and the session carries on.
//!
//! ## Notes
//!
//! - Runs in-memory only. Email persistence is not supported.
//! - Addresses are not validated and mail is never relayed.
//! - Body lines are stored verbatim and concatenated without line breaks.
//! - SMTP authentication and TLS are not supported.

mod smtp;

pub use smtp::{
    Command, Draft, Email, MailStore, Outcome, ServerConfig, SmtpError, SmtpResponse, SmtpServer,
    SmtpSession, SmtpState, handle_connection,
};
