// libs/notification-cell/src/models.rs
use serde::{Deserialize, Serialize};

/// What the core hands to the mail transport: a recipient and templated
/// content. How delivery happens is the transport's business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum NotificationError {
    #[error("Mailer is not configured")]
    NotConfigured,

    #[error("Mail API error: {0}")]
    MailApiError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
