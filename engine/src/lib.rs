//! The selection-triggered action pipeline.
//!
//! # Architecture
//!
//! Three kinds of context cooperate without sharing memory:
//!
//! - [`SelectionController`] - one per tab; tracks the selection, floats the
//!   toolbar and turns tool clicks into runtime messages
//! - [`Coordinator`] - the long-lived background loop; decodes runtime messages
//!   and host events and hands tool requests to the [`ActionRouter`]
//! - transient UI surfaces (settings, popup) - talk to the coordinator through
//!   the same [`MessageBus`] using `getSettings` / `saveSettings`
//!
//! The only shared state is the bus and the durable [`ConfigStore`].
//!
//! # Failure model
//!
//! Nothing here is fatal. Adapter failures become notifications for the
//! originating tab, and a result for a tab that has gone away is dropped
//! ([`Delivery::Missed`]).
//!
//! [`ConfigStore`]: comfort_config::ConfigStore

mod background;
mod bus;
mod clipboard;
mod error;
mod menu;
mod router;
mod selection;
mod toolbar;


use std::time::Duration;

pub use background::Coordinator;
pub use bus::{
    BackgroundEvent, Delivery, Envelope, Inbound, InstallReason, MessageBus, RouterInbox,
    TabListener,
};
pub use clipboard::{
    ClipboardError, ClipboardWriter, CommandClipboard, FallbackClipboard, SystemClipboard,
};
pub use error::ActionError;
pub use menu::{MENU_PREFIX, MenuClick};
pub use router::ActionRouter;
pub use selection::{ContentEvent, PageSurface, SelectionController};
pub use toolbar::{
    POINTER_OFFSET_Y, ToolbarItem, VIEWPORT_INSET, compute_toolbar_position, toolbar_items,
};

pub const COPIED_MESSAGE: &str = "Copied to clipboard!";
pub const COPY_FAILED_MESSAGE: &str = "Copy failed";
pub const SELECT_TEXT_FIRST_MESSAGE: &str = "Select some text first";
pub const NO_WIKI_RESULTS_MESSAGE: &str = "No Wikipedia results found";
pub const WIKI_FAILED_MESSAGE: &str = "Wikipedia search failed";

/// How long a toast stays up unless the host configures otherwise.
pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(2000);
