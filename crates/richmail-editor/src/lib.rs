//! # richmail-editor
//!
//! The document model behind a rich-text email editor.
//!
//! ## Features
//!
//! - **Caret-stable cleanup**: pasted content is sanitized in place and the
//!   caret lands where the user left it
//! - **Selection memory**: the last selection survives blur/focus, reused a
//!   bounded number of times
//! - **Ticketed resolve**: externally supplied content is resolved on the
//!   next scheduler turn and only the newest request is applied
//! - **Placeholder debounce**: a single outstanding timer decides whether
//!   the empty-state placeholder shows
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use richmail_editor::{EditableSurface, PasteContent, SurfaceConfig};
//! use richmail_sanitize::SanitizerSession;
//!
//! let session = Arc::new(SanitizerSession::default());
//! let mut surface = EditableSurface::mount(session, SurfaceConfig::default());
//! surface.set_value("<p>Hello</p>", None).await;
//!
//! let outcome = surface.on_paste(&PasteContent::text("https://example.com"), Instant::now())?;
//! let events = surface.settle().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod resolve;
mod selection;
mod surface;

pub use config::{MAX_RANGE_REUSES, SurfaceConfig};
pub use error::{Error, Result};
pub use resolve::{ResolveTicket, get_resolved_value, wrap_document};
pub use selection::{Boundary, Range, SelectionMemory, end_of, node_length, validate_range};
pub use surface::{
    EMPTY_ATTR, EditableSurface, PasteContent, PasteOutcome, SurfaceDocument, SurfaceEvent,
    SurfaceState,
};
