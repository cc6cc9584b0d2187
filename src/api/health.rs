use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Map, Value};

use crate::protocol::provider::ProviderTag;
use crate::state::AppState;
use crate::transport::Transport;

/// Health check handler.
/// Reports which providers have a credential; never the credential itself.
pub fn health_handler<T: Transport>(State(state): State<Arc<AppState<T>>>) -> Json<Value> {
    let providers: Map<String, Value> = ProviderTag::ALL
        .into_iter()
        .map(|provider| {
            (
                provider.as_str().to_string(),
                json!({ "configured": state.gateway.has_credential(provider) }),
            )
        })
        .collect();
    Json(json!({
        "status": "chatgate is running",
        "providers": providers,
        "features": {
            "log_level": state.config.features.log_level,
        }
    }))
}
