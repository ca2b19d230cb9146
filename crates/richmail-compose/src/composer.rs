//! The composer: message state around an editing surface.

use std::path::Path;
use std::sync::Arc;

use richmail_editor::{EditableSurface, PasteContent, PasteOutcome, SurfaceState};
use richmail_sanitize::dom::escape_text;
use richmail_sanitize::templates::{self, LinkCard};
use richmail_sanitize::SanitizerSession;
use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use crate::assemble::{
    AssembleOptions, AssembledBody, assemble_body, plain_text, prepare_for_send,
};
use crate::attachment::read_inline_attachment;
use crate::config::ComposerConfig;
use crate::error::{Error, Result};
use crate::message::{ComposedMessage, Disposition, OutgoingMessage, SourceMessage};
use crate::previous_mail::{
    PreviousMailPolicy, check_previous_mail_changed, container_inner_html, modify_body,
    remove_container, wrap_container,
};

/// Outcome of a previous-mail policy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyChange {
    /// The policy was already in effect.
    Unchanged,
    /// The new policy was applied.
    Applied,
    /// The quoted content was edited by hand; call
    /// [`Composer::confirm_policy_change`] or
    /// [`Composer::cancel_policy_change`].
    NeedsConfirmation,
}

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Informational.
    Info,
    /// Something the user asked for did not happen.
    Error,
}

/// A user-visible message raised by the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub kind: NotificationKind,
    /// Text shown to the user.
    pub message: String,
}

/// An open composer.
#[derive(Debug)]
pub struct Composer {
    session: Arc<SanitizerSession>,
    config: ComposerConfig,
    message: ComposedMessage,
    surface: Option<EditableSurface>,
    original_body: Option<String>,
    policy: PreviousMailPolicy,
    pending_policy: Option<PreviousMailPolicy>,
    modified_body_content: String,
    expand_previous_mails: bool,
    notifications: Vec<Notification>,
}

impl Composer {
    /// Opens a composer for a new message.
    #[must_use]
    pub fn new(session: Arc<SanitizerSession>, config: ComposerConfig) -> Self {
        let surface = EditableSurface::mount(Arc::clone(&session), config.surface.clone());
        Self {
            session,
            policy: config.previous_mail_policy,
            expand_previous_mails: config.expand_previous_mails,
            config,
            message: ComposedMessage::new(),
            surface: Some(surface),
            original_body: None,
            pending_policy: None,
            modified_body_content: String::new(),
            notifications: Vec::new(),
        }
    }

    /// Opens a reply to `source`, quoting it with the configured policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the quoted body cannot be placed in the editor.
    pub fn reply(
        session: Arc<SanitizerSession>,
        config: ComposerConfig,
        source: &SourceMessage,
    ) -> Result<Self> {
        let mut composer = Self::new(session, config);
        composer.message.to = source.from.clone();
        composer.message.subject = prefixed("Re:", &source.subject);
        composer.load_previous_mail(source)?;
        Ok(composer)
    }

    /// Opens a forward of `source`, carrying its attachments.
    ///
    /// # Errors
    ///
    /// Returns an error if the quoted body cannot be placed in the editor.
    pub fn forward(
        session: Arc<SanitizerSession>,
        config: ComposerConfig,
        source: &SourceMessage,
    ) -> Result<Self> {
        let mut composer = Self::new(session, config);
        composer.message.subject = prefixed("Fwd:", &source.subject);
        for attachment in &source.attachments {
            let target = match attachment.content_disposition {
                Disposition::Inline => &mut composer.message.inline_attachments,
                Disposition::Attachment => &mut composer.message.attachments,
            };
            target.push(attachment.clone());
        }
        composer.load_previous_mail(source)?;
        Ok(composer)
    }

    /// Returns the message state.
    #[must_use]
    pub const fn message(&self) -> &ComposedMessage {
        &self.message
    }

    /// Returns the message state for editing the addressing fields.
    pub const fn message_mut(&mut self) -> &mut ComposedMessage {
        &mut self.message
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Returns the editing surface, if still open.
    #[must_use]
    pub const fn surface(&self) -> Option<&EditableSurface> {
        self.surface.as_ref()
    }

    /// Returns the editing surface mutably, if still open.
    pub const fn surface_mut(&mut self) -> Option<&mut EditableSurface> {
        self.surface.as_mut()
    }

    /// Returns the previous-mail policy in effect.
    #[must_use]
    pub const fn policy(&self) -> PreviousMailPolicy {
        self.policy
    }

    /// Returns the policy awaiting confirmation.
    #[must_use]
    pub const fn pending_policy(&self) -> Option<PreviousMailPolicy> {
        self.pending_policy
    }

    /// Returns the quoted container tracked for the current policy.
    #[must_use]
    pub fn modified_body_content(&self) -> &str {
        &self.modified_body_content
    }

    /// Returns `true` if quoted content is shown in the editor.
    #[must_use]
    pub const fn is_previous_mail_expanded(&self) -> bool {
        self.expand_previous_mails
    }

    /// Returns pending notifications.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Drains pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Closes the editing surface. Later body operations fail with
    /// [`Error::NoSurface`].
    pub fn close(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.unmount();
        }
    }

    /// Returns `true` if the quoted content shown in the editor was edited.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub fn is_previous_mail_edited(&self) -> Result<bool> {
        let surface = self.surface.as_ref().ok_or(Error::NoSurface)?;
        if self.original_body.is_none() || !self.expand_previous_mails {
            return Ok(false);
        }
        Ok(check_previous_mail_changed(
            &self.session,
            &surface.html(),
            &self.modified_body_content,
        ))
    }

    /// Requests a switch of the previous-mail policy.
    ///
    /// When the quoted content was edited by hand the switch waits for
    /// [`confirm_policy_change`](Self::confirm_policy_change).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub fn select_previous_mail_policy(
        &mut self,
        policy: PreviousMailPolicy,
    ) -> Result<PolicyChange> {
        if self.original_body.is_none() || policy == self.policy {
            self.pending_policy = None;
            return Ok(PolicyChange::Unchanged);
        }
        if self.is_previous_mail_edited()? {
            tracing::debug!(?policy, "quoted content edited, asking for confirmation");
            self.pending_policy = Some(policy);
            return Ok(PolicyChange::NeedsConfirmation);
        }
        self.apply_policy(policy)?;
        Ok(PolicyChange::Applied)
    }

    /// Applies the pending policy, discarding edits to the quoted content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub fn confirm_policy_change(&mut self) -> Result<PolicyChange> {
        let Some(policy) = self.pending_policy.take() else {
            return Ok(PolicyChange::Unchanged);
        };
        self.apply_policy(policy)?;
        Ok(PolicyChange::Applied)
    }

    /// Drops the pending policy and keeps the edited quote.
    pub fn cancel_policy_change(&mut self) {
        if let Some(policy) = self.pending_policy.take() {
            tracing::debug!(?policy, "policy change cancelled");
        }
    }

    /// Shows or hides the quoted content in the editor.
    ///
    /// Hiding keeps any edits made to the quote; it is merged back when the
    /// message is assembled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub fn set_previous_mail_expanded(&mut self, expand: bool) -> Result<()> {
        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        if expand == self.expand_previous_mails {
            return Ok(());
        }
        let current = surface.html();
        if expand {
            surface.replace_html(&format!("{current}{}", self.modified_body_content))?;
        } else {
            self.modified_body_content = container_inner_html(&current)
                .map(|inner| self.session.sanitize(&wrap_container(&inner)).to_string())
                .unwrap_or_default();
            surface.replace_html(&remove_container(&current))?;
        }
        self.expand_previous_mails = expand;
        Ok(())
    }

    /// Handles a paste into the editor. A bare link pasted into a rich
    /// editor is also embedded as a link card.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub fn paste(&mut self, content: &PasteContent, now: Instant) -> Result<PasteOutcome> {
        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        let outcome = surface.on_paste(content, now)?;
        if let Some(link) = &outcome.link {
            self.add_link(link, None)?;
        }
        Ok(outcome)
    }

    /// Inserts a link card at the caret and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub fn add_link(&mut self, url: &Url, title: Option<&str>) -> Result<String> {
        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        let card = LinkCard {
            id: Uuid::new_v4().simple().to_string(),
            url: url.to_string(),
            title: title
                .or_else(|| url.host_str())
                .unwrap_or(url.as_str())
                .to_string(),
            description: None,
            image_url: None,
        };
        surface.insert_html_at_caret(&templates::link_card(&self.session, &card))?;
        tracing::debug!(card = %card.id, "link card added");
        Ok(card.id)
    }

    /// Reads an image and inserts it at the caret. Returns its content id.
    ///
    /// A failed read raises a notification and leaves the message
    /// untouched (`Ok(None)`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub async fn add_inline_image(&mut self, path: impl AsRef<Path>) -> Result<Option<String>> {
        let path = path.as_ref();
        if self.surface.is_none() {
            return Err(Error::NoSurface);
        }
        let attachment = match read_inline_attachment(path).await {
            Ok(attachment) => attachment,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "inline image not added");
                self.notifications.push(Notification {
                    kind: NotificationKind::Error,
                    message: format!("Could not attach {}: {e}", path.display()),
                });
                return Ok(None);
            }
        };

        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        let content_id = attachment.content_id.clone().unwrap_or_default();
        let src = attachment.data_url().unwrap_or_default();
        let html = templates::inline_image(&self.session, &content_id, &src, &attachment.filename);
        surface.insert_html_at_caret(&html)?;
        self.message.inline_attachments.push(attachment);
        Ok(Some(content_id))
    }

    /// Assembles the body for saving a draft. The quoted container is kept
    /// so the draft reopens with its policy intact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSurface`] after [`close`](Self::close).
    pub fn build_draft(&mut self) -> Result<ComposedMessage> {
        let body = self.assemble()?;
        self.message.html = body.html;
        self.message.text = body.text;
        Ok(self.message.clone())
    }

    /// Assembles the message for sending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PolicyConfirmationPending`] while a policy change
    /// awaits confirmation, or [`Error::NoSurface`] after
    /// [`close`](Self::close).
    pub fn build_outgoing(&mut self, from: &str) -> Result<OutgoingMessage> {
        if self.pending_policy.is_some() {
            return Err(Error::PolicyConfirmationPending);
        }
        if let Some(problem) = self.message.validate() {
            return Err(Error::InvalidMessage(problem));
        }
        let body = self.assemble()?;
        if body.html.is_empty() {
            self.message.html = String::new();
            self.message.text = body.text;
        } else {
            let html = prepare_for_send(&body.html);
            self.message.text = plain_text(&html);
            self.message.html = html;
            if !self.config.smime.is_active() {
                let html = &self.message.html;
                self.message.inline_attachments.retain(|attachment| {
                    attachment.content_id.as_deref().is_some_and(|cid| {
                        html.contains(&format!("cid:{}", cid.trim_matches(['<', '>'])))
                    })
                });
            }
        }
        Ok(self.message.to_outgoing(from))
    }

    /// Flushes a pending paste cleanup, then sanitizes and assembles the
    /// surface content.
    fn assemble(&mut self) -> Result<AssembledBody> {
        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        if surface.state() == SurfaceState::PendingCleanup {
            surface.cleanup_sync()?;
        }
        if !surface.config().rich {
            return Ok(AssembledBody {
                html: String::new(),
                text: surface.text(),
            });
        }
        let mut html = surface.html();
        if !self.expand_previous_mails {
            html.push_str(&self.modified_body_content);
        }
        let html = self.session.sanitize(&html);
        Ok(assemble_body(
            &self.session,
            &html,
            AssembleOptions {
                inline_attachments: &self.message.inline_attachments,
                smime: self.config.smime,
            },
        ))
    }

    fn load_previous_mail(&mut self, source: &SourceMessage) -> Result<()> {
        let original = match (&source.html, &source.text) {
            (Some(html), _) => html.clone(),
            (None, Some(text)) => text.lines().map(escape_text).collect::<Vec<_>>().join("<br>"),
            (None, None) => String::new(),
        };
        self.original_body = Some(original);
        self.apply_policy(self.config.previous_mail_policy)
    }

    fn apply_policy(&mut self, policy: PreviousMailPolicy) -> Result<()> {
        let surface = self.surface.as_mut().ok_or(Error::NoSurface)?;
        let original = self.original_body.as_deref().unwrap_or_default();
        let current = surface.html();
        let modified = modify_body(policy, &current, original, &self.config.quote_separator);
        self.modified_body_content = self
            .session
            .sanitize(&modified.modified_body_content)
            .to_string();
        if self.expand_previous_mails {
            surface.replace_html(&modified.body)?;
        }
        self.policy = policy;
        self.pending_policy = None;
        Ok(())
    }
}

fn prefixed(prefix: &str, subject: &str) -> String {
    if subject.to_lowercase().starts_with(&prefix.to_lowercase()) {
        subject.to_string()
    } else {
        format!("{prefix} {subject}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed() {
        assert_eq!(prefixed("Re:", "Lunch"), "Re: Lunch");
        assert_eq!(prefixed("Re:", "RE: Lunch"), "RE: Lunch");
        assert_eq!(prefixed("Fwd:", "Lunch"), "Fwd: Lunch");
    }

    #[test]
    fn test_closed_composer_has_no_surface() {
        let mut composer =
            Composer::new(Arc::new(SanitizerSession::default()), ComposerConfig::default());
        composer.close();
        assert!(matches!(composer.build_draft(), Err(Error::NoSurface)));
        assert!(matches!(
            composer.add_link(&Url::parse("https://example.com").unwrap(), None),
            Err(Error::NoSurface)
        ));
    }

    #[test]
    fn test_plain_composer_sends_text() {
        let config = ComposerConfig::default().surface(richmail_editor::SurfaceConfig::plain());
        let mut composer = Composer::new(Arc::new(SanitizerSession::default()), config);
        composer.message_mut().to = "bob@example.com".into();
        composer
            .paste(&PasteContent::text("hello"), Instant::now())
            .unwrap();
        let out = composer.build_outgoing("me@example.com").unwrap();
        assert!(out.html.is_none());
        assert_eq!(out.text, "hello");
    }

    #[test]
    fn test_invalid_recipients_block_send() {
        let mut composer =
            Composer::new(Arc::new(SanitizerSession::default()), ComposerConfig::default());
        assert!(matches!(
            composer.build_outgoing("me@example.com"),
            Err(Error::InvalidMessage(_))
        ));
        composer.message_mut().to = "a@example.com, bob".into();
        match composer.build_outgoing("me@example.com") {
            Err(Error::InvalidMessage(problem)) => {
                assert_eq!(problem, "Invalid email address: bob");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(composer.build_draft().is_ok());
        composer.message_mut().to = "a@example.com".into();
        assert!(composer.build_outgoing("me@example.com").is_ok());
    }
}
