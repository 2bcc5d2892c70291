//! Email data structures and functionality

use std::time::SystemTime;
use uuid::Uuid;

/// Represents an email message received by the SMTP server
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    /// Identifier assigned when the message was queued
    pub id: Uuid,

    /// The sender's email address
    pub from: String,

    /// Recipient addresses in the order they were given
    pub to: Vec<String>,

    /// Every DATA line concatenated, without line terminators
    pub data: String,

    /// When the email was received by the server
    pub received_at: SystemTime,
}

impl Email {
    /// Create a new email with a freshly generated identifier
    pub fn new(from: String, to: Vec<String>, data: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            data,
            received_at: SystemTime::now(),
        }
    }

    /// Check if this email was sent to a specific recipient
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.to.iter().any(|addr| addr == recipient)
    }

    /// Check if this email was sent from a specific sender
    pub fn is_from_sender(&self, sender: &str) -> bool {
        self.from == sender
    }

    /// Get the size of the email data in bytes
    pub fn data_size(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_creation() {
        let email = Email::new(
            "sender@example.com".to_string(),
            vec!["recipient@example.com".to_string()],
            "Subject: TestHello World".to_string(),
        );

        assert_eq!(email.from, "sender@example.com");
        assert_eq!(email.to, vec!["recipient@example.com"]);
        assert_eq!(email.data, "Subject: TestHello World");
        assert!(email.received_at <= SystemTime::now());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Email::new(String::new(), Vec::new(), String::new());
        let b = Email::new(String::new(), Vec::new(), String::new());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_has_recipient() {
        let email = Email::new(
            "sender@example.com".to_string(),
            vec![
                "user1@example.com".to_string(),
                "user2@example.com".to_string(),
            ],
            "Test email".to_string(),
        );

        assert!(email.has_recipient("user1@example.com"));
        assert!(email.has_recipient("user2@example.com"));
        assert!(!email.has_recipient("user3@example.com"));
    }

    #[test]
    fn test_is_from_sender() {
        let email = Email::new(
            "sender@example.com".to_string(),
            vec!["recipient@example.com".to_string()],
            "Test email".to_string(),
        );

        assert!(email.is_from_sender("sender@example.com"));
        assert!(!email.is_from_sender("other@example.com"));
    }

    #[test]
    fn test_data_size() {
        let email = Email::new(
            "sender@example.com".to_string(),
            vec!["recipient@example.com".to_string()],
            "Hello".to_string(),
        );

        assert_eq!(email.data_size(), 5);
    }
}
