//! Shared in-memory storage for received emails

use crate::smtp::email::Email;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Inner {
    emails: Mutex<Vec<Email>>,
    appended: Condvar,
}

/// Append-only list of committed emails, shared by every session.
///
/// Cloning is cheap and yields a handle to the same storage.
#[derive(Debug, Clone, Default)]
pub struct MailStore {
    inner: Arc<Inner>,
}

impl MailStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an email at the end of the list
    pub fn append(&self, email: Email) {
        self.inner.emails.lock().push(email);
        self.inner.appended.notify_all();
    }

    /// Copy of the emails stored so far, in commit order
    pub fn snapshot(&self) -> Vec<Email> {
        self.inner.emails.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.emails.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until at least `count` emails are stored or `timeout` elapses,
    /// then return a snapshot either way.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Email> {
        // A timeout too large for `Instant` means no deadline at all
        let deadline = Instant::now().checked_add(timeout);
        let mut emails = self.inner.emails.lock();
        while emails.len() < count {
            match deadline {
                Some(deadline) => {
                    if self
                        .inner
                        .appended
                        .wait_until(&mut emails, deadline)
                        .timed_out()
                    {
                        break;
                    }
                }
                None => self.inner.appended.wait(&mut emails),
            }
        }
        emails.clone()
    }
}
