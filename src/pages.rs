use axum::{http::StatusCode, response::Html, routing::get, Router};

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../templates/index.html");
const DASHBOARD_HTML: &str = include_str!("../templates/dashboard.html");
const NOT_FOUND_HTML: &str = include_str!("../templates/404.html");

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/dashboard", get(dashboard))
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

pub async fn not_found() -> (StatusCode, Html<&'static str>) {
    (StatusCode::NOT_FOUND, Html(NOT_FOUND_HTML))
}
