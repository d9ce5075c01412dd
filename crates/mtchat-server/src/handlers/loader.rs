//! Chat loader page.

use axum::extract::{RawQuery, State};
use axum::response::{Html, Redirect};
use mtchat_core::chat::LoaderParams;

use crate::pages;
use crate::state::AppState;

/// Only chat URLs on the configured chat origin are framed.
pub async fn loader(State(state): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    let query = query.unwrap_or_default();
    let params = LoaderParams::parse(&query).restrict_to(&state.config().chat_base_url);
    Html(pages::loader_page(&params, &query))
}

/// Leaves the loader for the entity page, keeping `chatId` and any
/// unrecognized parameters.
pub async fn close(RawQuery(query): RawQuery) -> Redirect {
    let params = LoaderParams::parse(query.as_deref().unwrap_or_default());
    Redirect::to(&params.close_target())
}
