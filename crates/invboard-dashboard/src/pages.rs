//! Dashboard page handlers.
//!
//! Each handler queries the backend through the abort helpers, builds view
//! types, and renders an Askama template.

use askama::Template;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

use invboard_client::{Backend, paged};

use crate::DashboardState;
use crate::abort::{Abort, Failure, get_or_abort, get_or_abort_except_client_errors};
use crate::env::{ALL_ENVIRONMENTS, check_env};
use crate::format::jsonprint;
use crate::stream::yield_or_stop_stream;
use crate::urls::{RequestContext, encode_query};
use crate::views::{TableView, in_environment};

/// Template whose section the shared stylesheet lives in.
pub const LAYOUT_TEMPLATE: &str = "layouts/base.html";
pub const STYLESHEET: &str = "dashboard.css";

fn render<T: Template>(tmpl: T) -> Html<String> {
    Html(tmpl.render().unwrap_or_else(|e| {
        format!("<pre>Template error: {e}</pre>")
    }))
}

fn stylesheet<B>(state: &DashboardState<B>) -> String {
    state.static_urls.url_static_offline(LAYOUT_TEMPLATE, STYLESHEET)
}

// ── Index ───────────────────────────────────────────────────────

pub async fn index() -> Redirect {
    Redirect::to(&format!("/{ALL_ENVIRONMENTS}/query"))
}

// ── Meta ────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "meta.html")]
struct MetaTemplate {
    stylesheet: String,
    version: String,
    details: String,
}

pub async fn meta<B: Backend>(State(state): State<DashboardState<B>>) -> Result<Html<String>, Failure> {
    let version = get_or_abort(state.backend.current_version()).await?;
    let environments = get_or_abort(state.backend.environments()).await?;

    let details = jsonprint(&json!({
        "version": version,
        "environments": environments,
    }))
    .unwrap_or_default();

    Ok(render(MetaTemplate {
        stylesheet: stylesheet(&state),
        version,
        details,
    }))
}

// ── Query ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Template)]
#[template(path = "query.html")]
struct QueryTemplate {
    stylesheet: String,
    env: String,
    query: String,
    rows_url: String,
    client_error: Option<String>,
    table: TableView,
}

pub async fn query<B: Backend>(
    State(state): State<DashboardState<B>>,
    Path(env): Path<String>,
    ctx: RequestContext,
    Query(params): Query<QueryParams>,
) -> Result<Response, Failure> {
    let envs = get_or_abort(state.backend.environments()).await?;
    check_env(&env, &envs)?;

    let mut status = StatusCode::OK;
    let mut client_error = None;
    let mut rows = Vec::new();
    if !params.query.trim().is_empty() {
        match get_or_abort_except_client_errors(state.backend.query(&params.query, None)).await {
            Ok(result) => rows = result,
            Err(Failure::ClientError(e)) => {
                status = e.status().unwrap_or(StatusCode::BAD_REQUEST);
                client_error = Some(e.to_string());
            }
            Err(failure) => return Err(failure),
        }
    }
    rows.retain(|row| in_environment(row, &env));

    let page = QueryTemplate {
        stylesheet: stylesheet(&state),
        rows_url: format!("query/rows?{}", encode_query(&[("query", &params.query)])),
        table: TableView::build(&rows, &ctx),
        env,
        query: params.query,
        client_error,
    };
    Ok((status, render(page)).into_response())
}

/// Stream query rows as newline-delimited JSON.
pub async fn query_rows<B: Backend + Clone + 'static>(
    State(state): State<DashboardState<B>>,
    Path(env): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Response, Failure> {
    let envs = get_or_abort(state.backend.environments()).await?;
    check_env(&env, &envs)?;
    if params.query.trim().is_empty() {
        return Err(Abort(StatusCode::BAD_REQUEST).into());
    }

    let rows = paged(state.backend.clone(), params.query, state.page_size);
    let lines = yield_or_stop_stream(Box::pin(rows))
        .filter(move |row| {
            let keep = match row {
                Ok(value) => in_environment(value, &env),
                Err(_) => true,
            };
            std::future::ready(keep)
        })
        .map(|row| {
            row.map(|value| {
                let mut line = value.to_string();
                line.push('\n');
                line
            })
        });

    Ok((
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response())
}
