use serde::Deserialize;

use crate::config::CoreConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything a request can see besides its own params. Collections are
/// never cached here; each request carries the snapshots it needs.
pub struct AppState {
    pub config: CoreConfig,
}
