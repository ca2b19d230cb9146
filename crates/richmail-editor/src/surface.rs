//! The editable surface controller.
//!
//! An [`EditableSurface`] owns the document behind a rich-text editor. It
//! keeps the caret stable while pasted content is sanitized in place,
//! remembers the last selection across focus changes, and serializes
//! externally supplied content through a ticketed, deferred resolve.
//!
//! Timers are modeled as deadlines checked by [`EditableSurface::poll`], so
//! every deferred step is a plain method call guarded by the mounted flag.

use std::sync::Arc;

use richmail_sanitize::dom::{VOID_ELEMENTS, escape_text};
use richmail_sanitize::{Document, NodeData, NodeId, SanitizeOptions, SanitizerSession};
use tokio::time::Instant;
use url::Url;

use crate::config::SurfaceConfig;
use crate::error::{Error, Result};
use crate::resolve::{ResolveTicket, get_resolved_value};
use crate::selection::{Boundary, Range, SelectionMemory, end_of, node_length, validate_range};

/// Attribute toggled on the body while the placeholder is visible.
pub const EMPTY_ATTR: &str = "data-empty";

const ZERO_WIDTH_SPACE: &str = "\u{200b}";

/// Lifecycle of pending work on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Nothing pending.
    Idle,
    /// A paste happened and a cleanup is scheduled.
    PendingCleanup,
    /// An external value is being resolved.
    Resolving,
}

/// Notifications produced by [`EditableSurface::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The surface content changed; carries the new body HTML.
    Input(String),
    /// The placeholder became visible (`true`) or hidden (`false`).
    PlaceholderChanged(bool),
}

/// Clipboard content of a paste event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteContent {
    /// `text/html` flavor, if present.
    pub html: Option<String>,
    /// `text/plain` flavor.
    pub text: String,
}

impl PasteContent {
    /// Plain-text clipboard content.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            html: None,
            text: text.into(),
        }
    }

    /// Clipboard content with both flavors.
    #[must_use]
    pub fn html(html: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            html: Some(html.into()),
            text: text.into(),
        }
    }
}

/// Result of handling a paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteOutcome {
    /// `false` if a cleanup was already pending.
    pub cleanup_scheduled: bool,
    /// A bare link pasted into a rich surface, to be embedded as a card.
    pub link: Option<Url>,
}

/// Read-only view of the surface document.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceDocument<'a> {
    doc: &'a Document,
    body: NodeId,
}

impl<'a> SurfaceDocument<'a> {
    /// The editable root.
    #[must_use]
    pub const fn body(&self) -> NodeId {
        self.body
    }

    /// The underlying document.
    #[must_use]
    pub const fn document(&self) -> &'a Document {
        self.doc
    }

    /// Finds an element inside the surface by id, including ids renamed to
    /// `data-safe-id` by sanitization.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.doc
            .find_by_id(id)
            .filter(|&n| self.doc.contains(self.body, n))
    }

    /// Serializes the surface content.
    #[must_use]
    pub fn inner_html(&self) -> String {
        self.doc.inner_html(self.body)
    }
}

/// A mounted rich-text editing surface.
pub struct EditableSurface {
    session: Arc<SanitizerSession>,
    config: SurfaceConfig,
    doc: Document,
    body: NodeId,
    mounted: bool,
    focused: bool,
    selection: Option<Range>,
    memory: SelectionMemory,
    state: SurfaceState,
    cleanup_due: Option<Instant>,
    placeholder_due: Option<Instant>,
    placeholder_visible: bool,
    last_emitted: Option<String>,
    last_resolved_input: Option<String>,
    latest_ticket: u64,
    markers: CaretMarkers,
}

/// Attribute names of the temporary caret markers.
///
/// Derived from the session token, so content cannot carry a marker the
/// cleanup would mistake for its own.
#[derive(Debug, Clone)]
struct CaretMarkers {
    sentinel: String,
    trail: String,
    wrap: String,
}

impl CaretMarkers {
    fn new(session: &SanitizerSession) -> Self {
        let base = session.safe_attr_name();
        Self {
            sentinel: format!("{base}-caret"),
            trail: format!("{base}-trail"),
            wrap: format!("{base}-wrap"),
        }
    }
}

impl std::fmt::Debug for EditableSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableSurface")
            .field("mounted", &self.mounted)
            .field("focused", &self.focused)
            .field("state", &self.state)
            .field("selection", &self.selection)
            .field("latest_ticket", &self.latest_ticket)
            .finish_non_exhaustive()
    }
}

impl EditableSurface {
    /// Mounts an empty surface.
    #[must_use]
    pub fn mount(session: Arc<SanitizerSession>, config: SurfaceConfig) -> Self {
        let mut doc = Document::skeleton();
        let body = doc.ensure_body();
        doc.set_attr(body, "contenteditable", "true");
        doc.set_attr(body, EMPTY_ATTR, "");
        let memory = SelectionMemory::new(config.max_range_reuses);
        let markers = CaretMarkers::new(&session);
        tracing::debug!(rich = config.rich, "mounted editable surface");
        Self {
            session,
            config,
            doc,
            body,
            mounted: true,
            focused: false,
            selection: None,
            memory,
            state: SurfaceState::Idle,
            cleanup_due: None,
            placeholder_due: None,
            placeholder_visible: true,
            last_emitted: None,
            last_resolved_input: None,
            latest_ticket: 0,
            markers,
        }
    }

    /// Tears the surface down. Pending timers and resolves become no-ops.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.focused = false;
        self.cleanup_due = None;
        self.placeholder_due = None;
        self.selection = None;
        self.memory.clear();
        self.state = SurfaceState::Idle;
        tracing::debug!("unmounted editable surface");
    }

    /// Returns `true` until [`unmount`](Self::unmount) is called.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Returns `true` while the surface has focus.
    #[must_use]
    pub const fn is_focused(&self) -> bool {
        self.focused
    }

    /// Returns the pending-work state.
    #[must_use]
    pub const fn state(&self) -> SurfaceState {
        self.state
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Returns the sanitizer session.
    #[must_use]
    pub const fn session(&self) -> &Arc<SanitizerSession> {
        &self.session
    }

    /// Returns the current selection.
    #[must_use]
    pub const fn selection(&self) -> Option<Range> {
        self.selection
    }

    /// Returns `true` while the placeholder is shown.
    #[must_use]
    pub const fn is_placeholder_visible(&self) -> bool {
        self.placeholder_visible
    }

    /// Serializes the surface content.
    #[must_use]
    pub fn html(&self) -> String {
        self.doc.inner_html(self.body)
    }

    /// Returns the surface's text content.
    #[must_use]
    pub fn text(&self) -> String {
        self.doc.text_content(self.body)
    }

    /// Returns a view of the surface document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn get_document(&self) -> Result<SurfaceDocument<'_>> {
        self.ensure_mounted()?;
        Ok(SurfaceDocument {
            doc: &self.doc,
            body: self.body,
        })
    }

    /// Runs `f` against the surface document and its body.
    ///
    /// This is how edits reach the surface; follow them with
    /// [`on_input`](Self::on_input).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn with_document<R>(&mut self, f: impl FnOnce(&mut Document, NodeId) -> R) -> Result<R> {
        self.ensure_mounted()?;
        Ok(f(&mut self.doc, self.body))
    }

    /// Focuses the surface, restoring the saved selection if still usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn focus(&mut self) -> Result<()> {
        self.ensure_mounted()?;
        self.focused = true;
        if !self.restore_range() && self.selection.is_none() {
            self.selection = Some(Range::caret(end_of(&self.doc, self.body)));
        }
        Ok(())
    }

    /// Blurs the surface. The live selection is lost; the saved one is kept.
    pub fn blur(&mut self) {
        self.focused = false;
        self.selection = None;
    }

    /// Moves the selection.
    ///
    /// # Errors
    ///
    /// Returns an error if either boundary lies outside the surface or is
    /// out of range, or the surface is unmounted.
    pub fn set_selection(&mut self, range: Range) -> Result<()> {
        self.ensure_mounted()?;
        validate_range(&self.doc, self.body, &range)?;
        self.selection = Some(range);
        self.memory.save(range);
        Ok(())
    }

    /// Saves the current selection for later restoration.
    pub fn save_range(&mut self) {
        if let Some(range) = self.selection {
            self.memory.save(range);
        }
    }

    /// Restores the saved selection.
    ///
    /// Returns `false` when nothing is saved, the saved range was reused
    /// too often, or its nodes are no longer in the surface.
    pub fn restore_range(&mut self) -> bool {
        let Some(range) = self.memory.take() else {
            return false;
        };
        if validate_range(&self.doc, self.body, &range).is_err() {
            tracing::debug!("saved range no longer valid");
            self.memory.clear();
            return false;
        }
        self.selection = Some(range);
        true
    }

    /// Handles user input: schedules the placeholder check and returns the
    /// new content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn on_input(&mut self, now: Instant) -> Result<String> {
        self.ensure_mounted()?;
        self.schedule_placeholder(now);
        let html = self.html();
        self.last_emitted = Some(html.clone());
        Ok(html)
    }

    /// Handles a paste: inserts the clipboard content at the caret as-is and
    /// schedules a single cleanup.
    ///
    /// Rich surfaces prefer the HTML flavor and report a pasted bare
    /// `http`/`https` URL so the caller can embed a link card; plain
    /// surfaces insert text and never report links.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn on_paste(&mut self, content: &PasteContent, now: Instant) -> Result<PasteOutcome> {
        self.ensure_mounted()?;
        let link = if self.config.rich {
            detect_link(&content.text)
        } else {
            None
        };
        let html = match (&content.html, self.config.rich) {
            (Some(html), true) => html.clone(),
            _ => text_to_html(&content.text),
        };
        self.insert_pasted(&html);
        let cleanup_scheduled = self.schedule_cleanup(now);
        self.schedule_placeholder(now);
        Ok(PasteOutcome {
            cleanup_scheduled,
            link,
        })
    }

    /// Returns the earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.cleanup_due, self.placeholder_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Runs every deadline that has passed at `now`.
    ///
    /// A torn-down surface produces no events.
    pub fn poll(&mut self, now: Instant) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        if !self.mounted {
            tracing::debug!("poll on unmounted surface ignored");
            return events;
        }
        if self.cleanup_due.is_some_and(|due| due <= now) {
            self.cleanup_due = None;
            if let Ok(html) = self.cleanup_sync() {
                events.push(SurfaceEvent::Input(html));
            }
        }
        if self.placeholder_due.is_some_and(|due| due <= now) {
            self.placeholder_due = None;
            if let Some(visible) = self.update_placeholder() {
                events.push(SurfaceEvent::PlaceholderChanged(visible));
            }
        }
        events
    }

    /// Sleeps until every pending deadline has passed and returns the
    /// events they produced.
    pub async fn settle(&mut self) -> Vec<SurfaceEvent> {
        let mut events = Vec::new();
        while let Some(deadline) = self.next_deadline() {
            tokio::time::sleep_until(deadline).await;
            events.extend(self.poll(Instant::now()));
        }
        events
    }

    /// Sanitizes the surface content in place, keeping the caret where it
    /// was relative to the surviving content.
    ///
    /// A sentinel is inserted at the caret before sanitizing and the caret
    /// is placed where the sentinel ends up. When sanitization removes the
    /// sentinel together with its container, the caret goes to the end of
    /// the nearest surviving element before it, or to the end of the
    /// surface if there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn cleanup_sync(&mut self) -> Result<String> {
        self.ensure_mounted()?;
        let caret = self.collapse_selection();
        let sentinel = self.doc.create_element("span");
        self.doc.set_attr(sentinel, &self.markers.sentinel, "");
        let marker = self.doc.create_text(ZERO_WIDTH_SPACE);
        self.doc.append_child(sentinel, marker);
        insert_node_at(&mut self.doc, caret, sentinel);
        self.mark_trail(sentinel);

        let raw = self.doc.inner_html(self.body);
        let clean = self
            .session
            .do_sanitize(&raw, &mut [], SanitizeOptions::default());
        self.doc.take_children(self.body);
        if let Some(clean_body) = clean.body() {
            self.doc.import_children(self.body, &clean, clean_body);
        }

        let caret = Range::caret(self.locate_caret());
        self.selection = Some(caret);
        self.memory.save(caret);
        self.cleanup_due = None;
        if self.state == SurfaceState::PendingCleanup {
            self.state = SurfaceState::Idle;
        }
        self.update_placeholder();
        let html = self.html();
        tracing::trace!(len = html.len(), "surface cleaned up");
        self.last_emitted = Some(html.clone());
        Ok(html)
    }

    /// Sanitizes `html` and inserts it at the caret.
    ///
    /// Markup produced by the session's templates keeps its safe-region
    /// privileges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn insert_html_at_caret(&mut self, html: &str) -> Result<()> {
        self.ensure_mounted()?;
        let clean = self.session.sanitize(html);
        self.insert_unsanitized(&clean);
        self.update_placeholder();
        self.last_emitted = Some(self.html());
        Ok(())
    }

    /// Sanitizes `html` and replaces the whole surface content with it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMounted`] after unmount.
    pub fn replace_html(&mut self, html: &str) -> Result<String> {
        self.ensure_mounted()?;
        let clean = self.session.sanitize(html);
        self.doc.set_inner_html(self.body, &clean);
        self.selection = None;
        self.update_placeholder();
        let html = self.html();
        self.last_emitted = Some(html.clone());
        Ok(html)
    }

    /// Starts replacing the content with an externally supplied value.
    ///
    /// Returns `None` when the value is the surface's own last emitted (or
    /// last resolved) content, or the surface is unmounted. Otherwise the
    /// returned ticket supersedes every earlier one.
    pub fn begin_value(&mut self, value: &str, stylesheet: Option<&str>) -> Option<ResolveTicket> {
        if !self.mounted {
            return None;
        }
        if self.last_emitted.as_deref() == Some(value)
            || self.last_resolved_input.as_deref() == Some(value)
        {
            tracing::trace!("ignoring self-echoed value");
            return None;
        }
        self.latest_ticket += 1;
        self.state = SurfaceState::Resolving;
        Some(ResolveTicket {
            id: self.latest_ticket,
            value: value.to_string(),
            stylesheet: stylesheet.map(str::to_string),
        })
    }

    /// Injects resolved HTML for `ticket`.
    ///
    /// Returns `false`, leaving the surface untouched, if the surface was
    /// unmounted or a newer ticket has been issued.
    pub fn finish_value(&mut self, ticket: &ResolveTicket, html: &str) -> bool {
        if !self.mounted {
            tracing::debug!(ticket = ticket.id, "surface gone, dropping resolved value");
            return false;
        }
        if ticket.id != self.latest_ticket {
            tracing::debug!(
                ticket = ticket.id,
                latest = self.latest_ticket,
                "dropping superseded value"
            );
            return false;
        }
        self.doc.set_inner_html(self.body, html);
        self.selection = None;
        self.state = if self.cleanup_due.is_some() {
            SurfaceState::PendingCleanup
        } else {
            SurfaceState::Idle
        };
        self.last_resolved_input = Some(ticket.value.clone());
        self.last_emitted = Some(self.html());
        self.update_placeholder();
        true
    }

    /// Resolves and injects an external value.
    ///
    /// Returns `true` if the surface content was replaced.
    pub async fn set_value(&mut self, value: &str, stylesheet: Option<&str>) -> bool {
        let Some(ticket) = self.begin_value(value, stylesheet) else {
            return false;
        };
        let session = Arc::clone(&self.session);
        let html =
            get_resolved_value(&session, &ticket.value, ticket.stylesheet.as_deref()).await;
        self.finish_value(&ticket, &html)
    }

    const fn ensure_mounted(&self) -> Result<()> {
        if self.mounted {
            Ok(())
        } else {
            Err(Error::NotMounted)
        }
    }

    fn schedule_cleanup(&mut self, now: Instant) -> bool {
        if self.cleanup_due.is_some() {
            return false;
        }
        self.cleanup_due = Some(now + self.config.cleanup_delay());
        self.state = SurfaceState::PendingCleanup;
        true
    }

    fn schedule_placeholder(&mut self, now: Instant) {
        if self.placeholder_due.is_none() {
            self.placeholder_due = Some(now + self.config.placeholder_debounce());
        }
    }

    /// Recomputes placeholder visibility; returns the new value if it changed.
    fn update_placeholder(&mut self) -> Option<bool> {
        let empty = self.is_visually_empty();
        if empty {
            self.doc.set_attr(self.body, EMPTY_ATTR, "");
        } else {
            self.doc.remove_attr(self.body, EMPTY_ATTR);
        }
        let changed = empty != self.placeholder_visible;
        self.placeholder_visible = empty;
        changed.then_some(empty)
    }

    fn is_visually_empty(&self) -> bool {
        let blank = self
            .text()
            .chars()
            .all(|c| c.is_whitespace() || c == '\u{200b}');
        blank
            && self.doc.elements_by_tag(self.body, "img").is_empty()
            && self.doc.elements_by_tag(self.body, "li").is_empty()
    }

    /// Reduces the selection to a caret, deleting the selected content.
    /// Stale selections fall back to the end.
    fn collapse_selection(&mut self) -> Boundary {
        let Some(range) = self
            .selection
            .filter(|r| validate_range(&self.doc, self.body, r).is_ok())
        else {
            return end_of(&self.doc, self.body);
        };
        if range.is_collapsed() {
            return range.start;
        }
        if range.start.node == range.end.node {
            if let Some(text) = self.doc.text(range.start.node) {
                let (from, to) = (
                    range.start.offset.min(range.end.offset),
                    range.start.offset.max(range.end.offset),
                );
                let kept: String = text
                    .chars()
                    .take(from)
                    .chain(text.chars().skip(to))
                    .collect();
                self.doc.set_text(range.start.node, kept);
                return Boundary::new(range.start.node, from);
            }
        }
        delete_range(&mut self.doc, self.body, range)
    }

    fn insert_unsanitized(&mut self, html: &str) {
        let at = self.collapse_selection();
        let nodes = self.doc.parse_fragment_nodes(html);
        self.insert_nodes(at, nodes);
    }

    /// Inserts pasted markup outside every safe region, with any region
    /// stamp it carries removed, so the next cleanup sanitizes all of it.
    fn insert_pasted(&mut self, html: &str) {
        let at = self.collapse_selection();
        let at = self.outside_safe_regions(at);
        let token = self.session.safe_attr_name();
        let nodes = self.doc.parse_fragment_nodes(html);
        for &node in &nodes {
            for n in std::iter::once(node).chain(self.doc.descendants(node)) {
                self.doc.remove_attr(n, token);
            }
        }
        self.insert_nodes(at, nodes);
    }

    fn insert_nodes(&mut self, mut at: Boundary, nodes: Vec<NodeId>) {
        for node in nodes {
            at = insert_node_at(&mut self.doc, at, node);
        }
        self.selection = Some(Range::caret(at));
    }

    /// Moves `at` just behind the outermost safe region containing it.
    fn outside_safe_regions(&self, at: Boundary) -> Boundary {
        let token = self.session.token();
        let root = std::iter::once(at.node)
            .chain(self.doc.ancestors(at.node))
            .take_while(|&n| n != self.body)
            .filter(|&n| token.is_stamped(&self.doc, n))
            .last();
        let Some(root) = root else {
            return at;
        };
        match (self.doc.parent(root), self.doc.index_in_parent(root)) {
            (Some(parent), Some(index)) => {
                tracing::trace!("paste moved out of a safe region");
                Boundary::new(parent, index + 1)
            }
            _ => at,
        }
    }

    /// Tags the nearest previous sibling of the sentinel and of each of its
    /// ancestors with its distance from the caret. Text siblings are
    /// wrapped in a marked span for the duration of the cleanup.
    fn mark_trail(&mut self, sentinel: NodeId) {
        let chain: Vec<NodeId> = std::iter::once(sentinel)
            .chain(self.doc.ancestors(sentinel))
            .take_while(|&n| n != self.body)
            .collect();
        for (depth, node) in chain.into_iter().enumerate() {
            let previous = std::iter::successors(self.doc.previous_sibling(node), |&s| {
                self.doc.previous_sibling(s)
            })
            .find(|&s| match self.doc.data(s) {
                NodeData::Element(_) => true,
                NodeData::Text(text) => !text.trim().is_empty(),
                _ => false,
            });
            let Some(previous) = previous else {
                continue;
            };
            let marked = if self.doc.text(previous).is_some() {
                let wrapper = self.doc.create_element("span");
                self.doc.set_attr(wrapper, &self.markers.wrap, "");
                self.doc.replace_with(previous, wrapper);
                self.doc.append_child(wrapper, previous);
                wrapper
            } else {
                previous
            };
            self.doc.set_attr(marked, &self.markers.trail, depth.to_string());
        }
    }

    fn locate_caret(&mut self) -> Boundary {
        let nodes = self.doc.descendants(self.body);
        let mut sentinels = Vec::new();
        let mut wrappers = Vec::new();
        let mut trail: Option<(usize, NodeId)> = None;
        for node in nodes {
            if self.doc.has_attr(node, &self.markers.sentinel) {
                sentinels.push(node);
            }
            if self.doc.has_attr(node, &self.markers.wrap) {
                wrappers.push(node);
            }
            if let Some(depth) = self.doc.remove_attr(node, &self.markers.trail) {
                let depth = depth.parse().unwrap_or(usize::MAX);
                if trail.is_none_or(|(best, _)| depth < best) {
                    trail = Some((depth, node));
                }
            }
        }

        // Wrapped text goes back in place first so the sentinel's
        // neighbours merge again.
        let mut trail = trail.map(|(_, node)| node);
        for wrapper in wrappers {
            if trail == Some(wrapper) {
                trail = self
                    .doc
                    .last_child(wrapper)
                    .or_else(|| self.doc.parent(wrapper));
            }
            self.doc.unwrap(wrapper);
        }

        let mut caret = None;
        for sentinel in sentinels {
            let removed = remove_sentinel(&mut self.doc, sentinel);
            caret = caret.or(removed);
        }
        if let Some(caret) = caret {
            return caret;
        }
        tracing::debug!("caret sentinel did not survive sanitization");
        end_of(&self.doc, trail.unwrap_or(self.body))
    }
}

/// Removes a sentinel, merging the text around it, and returns the
/// boundary where it stood.
fn remove_sentinel(doc: &mut Document, sentinel: NodeId) -> Option<Boundary> {
    let parent = doc.parent(sentinel)?;
    let index = doc.index_in_parent(sentinel)?;
    let before = doc.previous_sibling(sentinel);
    let after = doc.next_sibling(sentinel);
    doc.detach(sentinel);

    match (before, after) {
        (Some(before), Some(after)) if doc.text(before).is_some() && doc.text(after).is_some() => {
            let head = doc.text(before).unwrap_or_default().to_string();
            let tail = doc.text(after).unwrap_or_default().to_string();
            let offset = head.chars().count();
            doc.set_text(before, head + &tail);
            doc.detach(after);
            Some(Boundary::new(before, offset))
        }
        (Some(before), _) if doc.text(before).is_some() => {
            Some(Boundary::new(before, node_length(doc, before)))
        }
        _ => Some(Boundary::new(parent, index)),
    }
}

/// Inserts `node` at `at`, splitting a text node if needed, and returns
/// the boundary just after it.
fn insert_node_at(doc: &mut Document, at: Boundary, node: NodeId) -> Boundary {
    match doc.data(at.node) {
        NodeData::Text(text) => {
            let text = text.clone();
            let split = text
                .char_indices()
                .nth(at.offset)
                .map_or(text.len(), |(i, _)| i);
            if split == 0 {
                doc.insert_before(at.node, node);
            } else {
                let (head, tail) = text.split_at(split);
                if !tail.is_empty() {
                    let tail = doc.create_text(tail);
                    doc.insert_after(at.node, tail);
                }
                doc.set_text(at.node, head);
                doc.insert_after(at.node, node);
            }
        }
        NodeData::Element(el) if VOID_ELEMENTS.contains(&el.name.as_str()) => {
            doc.insert_after(at.node, node);
        }
        NodeData::Comment(_) => doc.insert_after(at.node, node),
        _ => doc.insert_child(at.node, at.offset, node),
    }
    match (doc.parent(node), doc.index_in_parent(node)) {
        (Some(parent), Some(index)) => Boundary::new(parent, index + 1),
        _ => at,
    }
}

/// Splits a text boundary so it falls between nodes.
fn split_at(doc: &mut Document, at: Boundary) -> Boundary {
    let Some(text) = doc.text(at.node).map(str::to_string) else {
        return at;
    };
    let (Some(parent), Some(index)) = (doc.parent(at.node), doc.index_in_parent(at.node)) else {
        return at;
    };
    let split = text
        .char_indices()
        .nth(at.offset)
        .map_or(text.len(), |(i, _)| i);
    let (head, tail) = text.split_at(split);
    if !tail.is_empty() {
        let tail = doc.create_text(tail);
        doc.insert_after(at.node, tail);
    }
    doc.set_text(at.node, head);
    Boundary::new(parent, index + 1)
}

/// Child-index path from `root` down to `node`.
fn path_to(doc: &Document, root: NodeId, node: NodeId) -> Vec<usize> {
    let mut path: Vec<usize> = std::iter::once(node)
        .chain(doc.ancestors(node))
        .take_while(|&n| n != root)
        .filter_map(|n| doc.index_in_parent(n))
        .collect();
    path.reverse();
    path
}

/// Document-order key of a boundary below `root`.
fn boundary_key(doc: &Document, root: NodeId, at: Boundary) -> Vec<usize> {
    let mut key = path_to(doc, root, at.node);
    key.push(at.offset);
    key
}

/// Deletes every node between the ends of `range`, splitting partially
/// selected text, and returns the collapsed boundary.
fn delete_range(doc: &mut Document, root: NodeId, range: Range) -> Boundary {
    let (start, end) = if boundary_key(doc, root, range.end) < boundary_key(doc, root, range.start)
    {
        (range.end, range.start)
    } else {
        (range.start, range.end)
    };
    let end = split_at(doc, end);
    let anchor = doc.children(end.node).get(end.offset).copied();
    let start = split_at(doc, start);
    let end = anchor
        .and_then(|a| Some(Boundary::new(doc.parent(a)?, doc.index_in_parent(a)?)))
        .unwrap_or_else(|| Boundary::new(end.node, doc.children(end.node).len()));
    let from = boundary_key(doc, root, start);
    let to = boundary_key(doc, root, end);

    let mut doomed = Vec::new();
    for node in doc.descendants(root) {
        if doc.parent(node).is_some_and(|p| doomed.contains(&p)) {
            doomed.push(node);
            continue;
        }
        let before = path_to(doc, root, node);
        let mut after = before.clone();
        let Some(last) = after.last_mut() else {
            continue;
        };
        *last += 1;
        if before >= from && after <= to {
            doomed.push(node);
        }
    }
    for &node in &doomed {
        if doc.parent(node).is_some_and(|p| !doomed.contains(&p)) {
            doc.detach(node);
        }
    }
    tracing::trace!(removed = doomed.len(), "deleted selected content");
    start
}

fn detect_link(text: &str) -> Option<Url> {
    let candidate = text.trim();
    if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
        return None;
    }
    Url::parse(candidate)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

fn text_to_html(text: &str) -> String {
    text.lines()
        .map(escape_text)
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn surface() -> EditableSurface {
        EditableSurface::mount(Arc::new(SanitizerSession::default()), SurfaceConfig::default())
    }

    #[test]
    fn test_insert_node_splits_text() {
        let mut doc = Document::parse("<p>hello</p>");
        let body = doc.body().unwrap();
        let p = doc.first_child(body).unwrap();
        let text = doc.first_child(p).unwrap();
        let b = doc.create_element("b");
        let after = insert_node_at(&mut doc, Boundary::new(text, 2), b);
        assert_eq!(doc.inner_html(p), "he<b></b>llo");
        assert_eq!(after, Boundary::new(p, 2));
    }

    #[test]
    fn test_insert_into_void_element_goes_after_it() {
        let mut doc = Document::parse(r#"<p>a<img src="x.png">b</p>"#);
        let body = doc.body().unwrap();
        let p = doc.first_child(body).unwrap();
        let img = doc.children(p)[1];
        let b = doc.create_element("b");
        let after = insert_node_at(&mut doc, Boundary::new(img, 0), b);
        assert_eq!(doc.inner_html(p), r#"a<img src="x.png"><b></b>b"#);
        assert!(doc.children(img).is_empty());
        assert_eq!(after, Boundary::new(p, 3));
    }

    #[test]
    fn test_delete_range_across_blocks() {
        let mut doc = Document::parse("<p>one</p><p>two</p><p>three</p>");
        let body = doc.body().unwrap();
        let first = doc.first_child(doc.children(body)[0]).unwrap();
        let last = doc.first_child(doc.children(body)[2]).unwrap();
        let range = Range::new(Boundary::new(last, 2), Boundary::new(first, 1));
        let at = delete_range(&mut doc, body, range);
        assert_eq!(doc.inner_html(body), "<p>o</p><p>ree</p>");
        assert_eq!(at, Boundary::new(doc.children(body)[0], 1));
    }

    #[test]
    fn test_delete_range_within_one_parent() {
        let mut doc = Document::parse("<p>abc<b>x</b>def</p>");
        let body = doc.body().unwrap();
        let p = doc.first_child(body).unwrap();
        let (head, tail) = (doc.children(p)[0], doc.children(p)[2]);
        let range = Range::new(Boundary::new(head, 2), Boundary::new(tail, 1));
        delete_range(&mut doc, body, range);
        assert_eq!(doc.inner_html(p), "abef");
    }

    #[test]
    fn test_selection_replaced_by_inserted_html() {
        let mut surface = surface();
        surface.replace_html("<p>one</p><p>two</p><p>three</p>").unwrap();
        let (first, last) = {
            let view = surface.get_document().unwrap();
            let doc = view.document();
            let blocks = doc.children(view.body());
            (
                doc.first_child(blocks[0]).unwrap(),
                doc.first_child(blocks[2]).unwrap(),
            )
        };
        surface
            .set_selection(Range::new(Boundary::new(first, 1), Boundary::new(last, 2)))
            .unwrap();
        surface.insert_html_at_caret("<b>x</b>").unwrap();
        assert_eq!(surface.html(), "<p>o<b>x</b></p><p>ree</p>");
    }

    #[test]
    fn test_resolved_value_keeps_pending_cleanup() {
        let mut surface = surface();
        let now = Instant::now();
        surface.on_paste(&PasteContent::text("x"), now).unwrap();
        let ticket = surface.begin_value("<p>y</p>", None).unwrap();
        assert!(surface.finish_value(&ticket, "<p>y</p>"));
        assert_eq!(surface.state(), SurfaceState::PendingCleanup);
        assert!(surface.next_deadline().is_some());
        surface.cleanup_sync().unwrap();
        assert_eq!(surface.state(), SurfaceState::Idle);
    }

    #[test]
    fn test_caret_markers_are_unguessable() {
        let session = SanitizerSession::default();
        let markers = CaretMarkers::new(&session);
        assert!(markers.sentinel.starts_with(session.safe_attr_name()));
        assert_ne!(markers.sentinel, CaretMarkers::new(&SanitizerSession::default()).sentinel);
        assert_ne!(markers.trail, markers.wrap);
    }

    #[test]
    fn test_detect_link() {
        assert!(detect_link(" https://example.com/a ").is_some());
        assert!(detect_link("see https://example.com").is_none());
        assert!(detect_link("ftp://example.com").is_none());
        assert!(detect_link("mailto:a@b.c").is_none());
    }

    #[test]
    fn test_text_to_html() {
        assert_eq!(text_to_html("a < b\nc"), "a &lt; b<br>c");
    }

    #[test]
    fn test_caret_survives_cleanup() {
        let mut surface = surface();
        surface.replace_html("<p>hello world</p>").unwrap();
        let (p, text) = {
            let view = surface.get_document().unwrap();
            let doc = view.document();
            let p = doc.first_child(view.body()).unwrap();
            (p, doc.first_child(p).unwrap())
        };
        surface.set_selection(Range::caret(Boundary::new(text, 5))).unwrap();
        surface
            .with_document(|doc, _| doc.set_attr(p, "onclick", "x()"))
            .unwrap();

        let html = surface.cleanup_sync().unwrap();
        assert_eq!(html, "<p>hello world</p>");
        let caret = surface.selection().unwrap().start;
        let view = surface.get_document().unwrap();
        assert_eq!(view.document().text(caret.node), Some("hello world"));
        assert_eq!(caret.offset, 5);
    }

    #[test]
    fn test_placeholder_toggles() {
        let mut surface = surface();
        assert!(surface.is_placeholder_visible());
        surface.replace_html("<ul><li></li></ul>").unwrap();
        assert!(!surface.is_placeholder_visible());
        surface.replace_html("<p> </p>").unwrap();
        assert!(surface.is_placeholder_visible());
        let view = surface.get_document().unwrap();
        assert!(view.document().has_attr(view.body(), EMPTY_ATTR));
    }

    #[test]
    fn test_unmounted_surface_rejects_operations() {
        let mut surface = surface();
        surface.unmount();
        assert!(matches!(surface.focus(), Err(Error::NotMounted)));
        assert!(surface.get_document().is_err());
        assert!(surface.poll(Instant::now()).is_empty());
        assert!(surface.begin_value("<p>x</p>", None).is_none());
    }
}
