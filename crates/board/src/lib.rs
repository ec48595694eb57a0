//! `board` crate: the contract between the automation engine and the Kanban board.
//!
//! The engine never touches board storage directly.  Every mutation an action
//! performs (move a card, attach a label, post a comment, ...) goes through
//! [`BoardService`], and user-facing notifications go through [`Notifier`].
//!
//! Two implementations ship with the crate:
//! - [`http::HttpBoardClient`] talks to the board application's REST API.
//! - [`mock::MemoryBoard`] keeps a whole board in memory; tests and local
//!   runs use it.

pub mod error;
pub mod http;
pub mod mock;
pub mod models;
pub mod traits;

pub use error::BoardError;
pub use models::{BoardList, Card, Checklist, Label, Member, Notification};
pub use traits::{BoardService, Notifier};
