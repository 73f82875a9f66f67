use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppResult, state::AppState};

/// Makes sure the shared store connection is open before the handler runs.
///
/// A failed connect short-circuits with `ConnectionUnavailable`; the handler's
/// own response is otherwise returned unchanged.
pub async fn connection_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    state.gate.ensure_connected().await?;
    Ok(next.run(request).await)
}
