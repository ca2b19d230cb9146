//! # richmail-compose
//!
//! Message composition on top of `richmail-editor`: quoted previous mail,
//! inline images, link cards, and assembly of the transport body.
//!
//! ## Features
//!
//! - **Previous mail**: replies and forwards quote the original under a
//!   selectable policy; hand-edited quotes are never replaced silently
//! - **Body assembly**: inline images point back at their `cid:` parts,
//!   editor affordances and markers are stripped
//! - **S/MIME aware**: sealed messages keep inline image payloads in place
//! - **Plain text**: every HTML body gets a text projection
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use richmail_compose::{Composer, ComposerConfig, SourceMessage};
//! use richmail_sanitize::SanitizerSession;
//!
//! let session = Arc::new(SanitizerSession::default());
//! let mut composer = Composer::reply(session, ComposerConfig::default(), &source)?;
//! composer.add_inline_image("photo.png").await?;
//! let outgoing = composer.build_outgoing("me@example.com")?;
//! send(outgoing.to_json()?).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod assemble;
mod attachment;
mod composer;
mod config;
mod error;
mod message;
mod previous_mail;

pub use assemble::{
    AssembleOptions, AssembledBody, STRIP_ATTRS, STRIP_NODES, assemble_body, has_previous_mail,
    plain_text, prepare_for_send,
};
pub use attachment::{image_content_type, new_content_id, read_inline_attachment};
pub use composer::{Composer, Notification, NotificationKind, PolicyChange};
pub use config::{ComposerConfig, DEFAULT_QUOTE_SEPARATOR};
pub use error::{Error, Result};
pub use message::{
    Attachment, ComposedMessage, Disposition, OutgoingMessage, SmimeMode, SourceMessage,
};
pub use previous_mail::{
    ModifiedBody, PREVIOUS_MAIL_CONTAINER_ID, PreviousMailPolicy, check_previous_mail_changed,
    container_inner_html, modify_body, remove_container, unwrap_container, wrap_container,
};
