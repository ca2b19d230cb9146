//! Message shapes consumed and produced by the composer.

use serde::{Deserialize, Serialize};

/// S/MIME protection applied when sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SmimeMode {
    /// No S/MIME.
    #[default]
    None,
    /// Signed only.
    Sign,
    /// Encrypted only.
    Encrypt,
    /// Signed and encrypted.
    SignAndEncrypt,
}

impl SmimeMode {
    /// Returns `true` if the message is sealed outside the normal attachment
    /// flow, so inline images must carry their payload.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// How an attachment is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Shown inside the body and referenced by `cid:`.
    Inline,
    /// A regular file attachment.
    #[default]
    Attachment,
}

/// An attachment known to the composer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// MIME `Content-ID`, without angle brackets.
    pub content_id: Option<String>,
    /// File name.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Presentation.
    pub content_disposition: Disposition,
    /// Download URL of an attachment already stored on the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base64 payload of a locally added attachment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

impl Attachment {
    /// Returns the payload as a `data:` URL, if it is held locally.
    #[must_use]
    pub fn data_url(&self) -> Option<String> {
        self.base64
            .as_ref()
            .map(|data| format!("data:{};base64,{data}", self.content_type))
    }

    /// Returns `true` if this attachment has the given content id.
    #[must_use]
    pub fn has_content_id(&self, content_id: &str) -> bool {
        self.content_id
            .as_deref()
            .is_some_and(|cid| cid.trim_matches(|c| c == '<' || c == '>') == content_id)
    }
}

/// A received message being replied to or forwarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMessage {
    /// Sender address.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: Option<String>,
    /// Plain-text body.
    pub text: Option<String>,
    /// Attachments.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// The in-progress message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedMessage {
    /// Recipient addresses (To), comma separated.
    pub to: String,
    /// CC addresses, comma separated.
    pub cc: String,
    /// BCC addresses, comma separated.
    pub bcc: String,
    /// Subject line.
    pub subject: String,
    /// Assembled HTML body. Empty for plain-text messages.
    pub html: String,
    /// Plain-text body.
    pub text: String,
    /// File attachments.
    pub attachments: Vec<Attachment>,
    /// Images referenced from the body by `cid:`.
    pub inline_attachments: Vec<Attachment>,
}

impl ComposedMessage {
    /// Creates an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the addressing fields.
    #[must_use]
    pub fn validate(&self) -> Option<String> {
        if self.to.trim().is_empty() {
            return Some("Please enter at least one recipient".to_string());
        }

        for recipient in split_recipients(&self.to)
            .iter()
            .chain(&split_recipients(&self.cc))
            .chain(&split_recipients(&self.bcc))
        {
            if !recipient.contains('@') {
                return Some(format!("Invalid email address: {recipient}"));
            }
        }

        None
    }

    /// Converts to the send contract.
    #[must_use]
    pub fn to_outgoing(&self, from: &str) -> OutgoingMessage {
        OutgoingMessage {
            from: from.to_string(),
            to: split_recipients(&self.to),
            cc: split_recipients(&self.cc),
            bcc: split_recipients(&self.bcc),
            subject: self.subject.clone(),
            html: (!self.html.is_empty()).then(|| self.html.clone()),
            text: self.text.clone(),
            attachments: self.attachments.clone(),
            inline_attachments: self.inline_attachments.clone(),
            flags: Vec::new(),
        }
    }
}

/// A message handed to the send or save-draft call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses.
    pub bcc: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Sanitized, `cid:`-normalized HTML body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Plain-text body.
    pub text: String,
    /// File attachments.
    pub attachments: Vec<Attachment>,
    /// Inline images.
    pub inline_attachments: Vec<Attachment>,
    /// Message flags.
    #[serde(default)]
    pub flags: Vec<String>,
}

impl OutgoingMessage {
    /// Serializes the message for the send call.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(Into::into)
    }
}

fn split_recipients(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
