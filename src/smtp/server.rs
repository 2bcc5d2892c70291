//! SMTP server implementation

use crate::smtp::config::ServerConfig;
use crate::smtp::email::Email;
use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{Outcome, SmtpSession};
use crate::smtp::store::MailStore;

use parking_lot::Mutex;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Longest accepted line in bytes, CRLF included
pub const MAX_LINE_LENGTH: usize = 4096;

/// A running SMTP server that keeps every received email in memory.
///
/// Each accepted connection is served on its own thread. Dropping the server
/// stops the accept loop but leaves sessions already in progress alone.
#[derive(Debug)]
pub struct SmtpServer {
    local_addr: SocketAddr,
    store: MailStore,
    shutdown: Arc<AtomicBool>,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
}

impl SmtpServer {
    /// Bind the configured address and start accepting connections
    pub fn start(config: &ServerConfig) -> Result<Self, SmtpError> {
        let listener = TcpListener::bind(config.resolved_address())?;
        Self::start_with_listener(listener, &config.hostname)
    }

    /// Start accepting connections on a listener the caller already bound
    pub fn start_with_listener(listener: TcpListener, hostname: &str) -> Result<Self, SmtpError> {
        // The accept loop relies on accept() blocking
        listener.set_nonblocking(false)?;
        let local_addr = listener.local_addr()?;
        let store = MailStore::new();
        let shutdown = Arc::new(AtomicBool::new(false));

        let acceptor = Acceptor {
            listener,
            hostname: Arc::from(hostname),
            store: store.clone(),
            shutdown: Arc::clone(&shutdown),
        };
        let handle = thread::Builder::new()
            .name("smtp-accept".to_owned())
            .spawn(move || acceptor.run())?;

        info!(%local_addr, hostname, "SMTP server listening");

        Ok(Self {
            local_addr,
            store,
            shutdown,
            accept_thread: Mutex::new(Some(handle)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Emails received so far, in commit order
    pub fn emails(&self) -> Vec<Email> {
        self.store.snapshot()
    }

    /// Handle to the shared store, e.g. to wait for deliveries
    pub fn store(&self) -> &MailStore {
        &self.store
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    ///
    /// Calling this more than once is harmless. Concurrent callers all return
    /// only after the accept loop is gone.
    pub fn stop(&self) {
        let mut accept_thread = self.accept_thread.lock();
        let Some(handle) = accept_thread.take() else {
            return;
        };

        self.shutdown.store(true, Ordering::SeqCst);

        // accept() only returns once something connects
        if let Err(e) = TcpStream::connect(wake_addr(self.local_addr)) {
            warn!(error = %e, "could not wake the accept loop");
        }

        if handle.join().is_err() {
            error!("accept thread panicked");
        }
        info!(local_addr = %self.local_addr, "SMTP server stopped");
    }
}

impl Drop for SmtpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Acceptor {
    listener: TcpListener,
    hostname: Arc<str>,
    store: MailStore,
    shutdown: Arc<AtomicBool>,
}

impl Acceptor {
    fn run(self) {
        for stream in self.listener.incoming() {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            match stream {
                Ok(stream) => self.spawn_session(stream),
                Err(e) if is_transient(&e) => {
                    warn!(error = %e, "error accepting connection");
                }
                Err(e) => {
                    error!(error = %e, "accept failed, closing listener");
                    break;
                }
            }
        }
        debug!("accept loop exited");
    }

    fn spawn_session(&self, stream: TcpStream) {
        let hostname = Arc::clone(&self.hostname);
        let store = self.store.clone();
        let peer = stream.peer_addr().ok();

        let spawned = thread::Builder::new()
            .name("smtp-session".to_owned())
            .spawn(move || {
                debug!(?peer, "session started");
                match handle_client(stream, &hostname, &store) {
                    Ok(()) => debug!(?peer, "session closed"),
                    Err(SmtpError::ConnectionClosed) => {
                        debug!(?peer, "client disconnected")
                    }
                    Err(e) => warn!(?peer, error = %e, "session terminated"),
                }
            });

        if let Err(e) = spawned {
            error!(?peer, error = %e, "could not spawn session thread");
        }
    }
}

fn handle_client(stream: TcpStream, hostname: &str, store: &MailStore) -> Result<(), SmtpError> {
    let reader = BufReader::new(stream.try_clone()?);
    let writer = BufWriter::new(stream);
    handle_connection(reader, writer, hostname, store)
}

/// Run one SMTP session over an arbitrary byte stream until QUIT or an error.
///
/// Completed emails are appended to `store`; a draft still open when the
/// stream fails is dropped.
pub fn handle_connection<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    hostname: &str,
    store: &MailStore,
) -> Result<(), SmtpError> {
    let mut session = SmtpSession::new(hostname);
    send_response(&mut writer, &session.greeting())?;

    let mut line_buffer = Vec::new();
    loop {
        let line = match read_line(&mut reader, &mut line_buffer) {
            Ok(line) => line,
            Err(e) => {
                if let Some(response) = e.reply() {
                    // The session ends either way; the reply is best effort
                    let _ = send_response(&mut writer, &response);
                }
                return Err(e);
            }
        };

        match session.handle_line(&line) {
            Outcome::Reply(response) => send_response(&mut writer, &response)?,
            Outcome::Close(response) => {
                send_response(&mut writer, &response)?;
                return Ok(());
            }
            Outcome::Collect => {}
            Outcome::Deliver(email) => {
                let response = SmtpResponse::queued(&email.id);
                info!(
                    id = %email.id,
                    from = %email.from,
                    recipients = email.to.len(),
                    size = email.data_size(),
                    "email queued"
                );
                store.append(email);
                send_response(&mut writer, &response)?;
            }
        }
    }
}

/// Read one CRLF-terminated line and return it without the terminator
fn read_line<R: BufRead>(reader: &mut R, buffer: &mut Vec<u8>) -> Result<String, SmtpError> {
    buffer.clear();
    let limit = MAX_LINE_LENGTH as u64;
    if reader.by_ref().take(limit).read_until(b'\n', buffer)? == 0 {
        return Err(SmtpError::ConnectionClosed);
    }

    match buffer.strip_suffix(b"\r\n") {
        Some(line) => Ok(String::from_utf8_lossy(line).into_owned()),
        None if buffer.ends_with(b"\n") => Err(SmtpError::MalformedLine),
        None if buffer.len() >= MAX_LINE_LENGTH => Err(SmtpError::LineTooLong {
            max: MAX_LINE_LENGTH,
        }),
        // EOF in the middle of a line
        None => Err(SmtpError::ConnectionClosed),
    }
}

/// Send a response and flush it so the client sees it before we read again
fn send_response<W: Write>(writer: &mut W, response: &SmtpResponse) -> Result<(), SmtpError> {
    writer.write_all(response.format().as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::TimedOut
    )
}

/// A connectable address for the listener, even when it is bound to a wildcard
fn wake_addr(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str) -> (Result<(), SmtpError>, String, MailStore) {
        let store = MailStore::new();
        let mut output = Vec::new();
        let result = handle_connection(
            Cursor::new(input.as_bytes().to_vec()),
            &mut output,
            "test.local",
            &store,
        );
        (result, String::from_utf8(output).unwrap(), store)
    }

    #[test]
    fn test_complete_smtp_session() {
        let (result, output, store) = run(concat!(
            "MAIL FROM:<sender@example.com>\r\n",
            "RCPT TO:<recipient@example.com>\r\n",
            "DATA\r\n",
            "Subject: Test\r\n",
            "Body\r\n",
            ".\r\n",
            "QUIT\r\n",
        ));

        assert!(result.is_ok());
        let emails = store.snapshot();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].data, "Subject: TestBody");

        let expected = format!(
            concat!(
                "220 test.local\r\n",
                "250 Ok\r\n",
                "250 Ok\r\n",
                "354 Start mail input; end with <CRLF>.<CRLF>\r\n",
                "250 Ok: queued as {}\r\n",
                "221 It was nice talking to you. Bye.\r\n",
            ),
            emails[0].id
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_eof_discards_draft() {
        let (result, _, store) = run(concat!(
            "MAIL FROM:<sender@example.com>\r\n",
            "DATA\r\n",
            "partial body\r\n",
        ));

        assert!(matches!(result, Err(SmtpError::ConnectionClosed)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_bare_lf_ends_session() {
        let (result, output, store) = run("NOOP\r\nNOOP\nNOOP\r\n");

        assert!(matches!(result, Err(SmtpError::MalformedLine)));
        assert_eq!(
            output,
            "220 test.local\r\n250 Ok\r\n500 Line must end with <CRLF>\r\n"
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_unterminated_final_line() {
        let (result, output, _) = run("NOOP\r\nQUIT");
        assert!(matches!(result, Err(SmtpError::ConnectionClosed)));
        assert_eq!(output, "220 test.local\r\n250 Ok\r\n");
    }

    #[test]
    fn test_overlong_line_ends_session() {
        let mut input = "DATA\r\n".to_string();
        input.push_str(&"a".repeat(MAX_LINE_LENGTH + 10));
        input.push_str("\r\n.\r\n");

        let (result, output, store) = run(&input);

        assert!(matches!(result, Err(SmtpError::LineTooLong { max: MAX_LINE_LENGTH })));
        assert!(output.ends_with("500 Line too long (max 4096 bytes)\r\n"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_line_at_length_limit_is_accepted() {
        let mut input = "DATA\r\n".to_string();
        input.push_str(&"a".repeat(MAX_LINE_LENGTH - 2));
        input.push_str("\r\n.\r\nQUIT\r\n");

        let (result, _, store) = run(&input);

        assert!(result.is_ok());
        assert_eq!(store.snapshot()[0].data.len(), MAX_LINE_LENGTH - 2);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let store = MailStore::new();
        let mut output = Vec::new();
        let mut input = b"DATA\r\n".to_vec();
        input.extend_from_slice(b"caf\xe9\r\n.\r\n");

        let result = handle_connection(Cursor::new(input), &mut output, "test.local", &store);

        assert!(matches!(result, Err(SmtpError::ConnectionClosed)));
        assert_eq!(store.snapshot()[0].data, "caf\u{FFFD}");
    }

    #[test]
    fn test_wake_addr() {
        let wildcard: SocketAddr = "0.0.0.0:2525".parse().unwrap();
        assert_eq!(wake_addr(wildcard), "127.0.0.1:2525".parse().unwrap());

        let wildcard6: SocketAddr = "[::]:2525".parse().unwrap();
        assert_eq!(wake_addr(wildcard6), "[::1]:2525".parse().unwrap());

        let bound: SocketAddr = "127.0.0.1:2525".parse().unwrap();
        assert_eq!(wake_addr(bound), bound);
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::Interrupted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::InvalidInput)));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = SmtpServer::start_with_listener(listener, "test.local").unwrap();

        server.stop();
        server.stop();

        assert!(server.accept_thread.lock().is_none());
    }

    #[test]
    fn test_concurrent_stop_waits_for_accept_loop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let server = Arc::new(SmtpServer::start_with_listener(listener, "test.local").unwrap());
        let addr = server.local_addr();

        let stoppers: Vec<_> = (0..2)
            .map(|_| {
                let server = Arc::clone(&server);
                thread::spawn(move || {
                    server.stop();
                    TcpStream::connect(addr).is_err()
                })
            })
            .collect();

        for stopper in stoppers {
            assert!(stopper.join().unwrap());
        }
    }

    #[test]
    fn test_nonblocking_listener_is_served() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let server = SmtpServer::start_with_listener(listener, "test.local").unwrap();

        let stream = TcpStream::connect(server.local_addr()).unwrap();
        stream
            .set_read_timeout(Some(std::time::Duration::from_secs(5)))
            .unwrap();
        let mut reader = BufReader::new(stream);
        let mut greeting = String::new();
        reader.read_line(&mut greeting).unwrap();

        assert_eq!(greeting, "220 test.local\r\n");
    }
}
