//! Route handlers, one module per resource.

pub mod events;
pub mod health;
pub mod hooks;
pub mod rules;
pub mod templates;
pub mod webhooks;

use serde::Deserialize;

/// `?limit=` on log listings.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}
