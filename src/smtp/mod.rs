//! SMTP server implementation

pub mod commands;
pub mod config;
pub mod email;
pub mod error;
pub mod response;
pub mod server;
pub mod session;
pub mod store;

pub use commands::Command;
pub use config::ServerConfig;
pub use email::Email;
pub use error::SmtpError;
pub use response::SmtpResponse;
pub use server::{SmtpServer, handle_connection};
pub use session::{Draft, Outcome, SmtpSession, SmtpState};
pub use store::MailStore;
