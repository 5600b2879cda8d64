//! URL builders for templates.
//!
//! [`RequestContext`] captures the route and arguments of the current
//! request so pages can link to "the same view with one argument changed"
//! (sort column, filter value) without rebuilding query strings by hand.

use std::collections::HashSet;
use std::convert::Infallible;
use std::path::Path;

use axum::extract::{FromRequestParts, MatchedPath, Query, RawPathParams};
use axum::http::request::Parts;
use reqwest::Url;

const ORIGIN: &str = "http://localhost/";

/// Route template and arguments of the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    route: String,
    path_params: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl RequestContext {
    /// `route` uses axum syntax: `/{env}/query`, `/files/{*path}`.
    pub fn new(
        route: impl Into<String>,
        path_params: Vec<(String, String)>,
        query: Vec<(String, String)>,
    ) -> Self {
        Self {
            route: route.into(),
            path_params,
            query,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Value of a path or query argument; query arguments win.
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .chain(self.path_params.iter())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// URL of the current route with `field` set to `value` and every
    /// other path and query argument preserved.
    pub fn url_for_field(&self, field: &str, value: &str) -> String {
        let mut args = self.path_params.clone();
        let mut seen = HashSet::new();
        for (k, v) in &self.query {
            // Repeated query keys contribute their first value only.
            if seen.insert(k.as_str()) {
                set_arg(&mut args, k, v);
            }
        }
        set_arg(&mut args, field, value);
        build_url(&self.route, args)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let route = parts
            .extensions
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());

        let path_params = match RawPathParams::from_request_parts(parts, state).await {
            Ok(params) => params
                .iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect(),
            Err(_) => Vec::new(),
        };

        let query = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        Ok(Self {
            route,
            path_params,
            query,
        })
    }
}

fn set_arg(args: &mut Vec<(String, String)>, key: &str, value: &str) {
    match args.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value.to_owned(),
        None => args.push((key.to_owned(), value.to_owned())),
    }
}

/// `{name}` → (`name`, false); `{*name}` → (`name`, true).
fn placeholder(segment: &str) -> Option<(&str, bool)> {
    let inner = segment.strip_prefix('{')?.strip_suffix('}')?;
    match inner.strip_prefix('*') {
        Some(name) => Some((name, true)),
        None => Some((inner, false)),
    }
}

fn take_arg(args: &mut Vec<(String, String)>, name: &str) -> String {
    match args.iter().position(|(k, _)| k == name) {
        Some(i) => args.remove(i).1,
        None => String::new(),
    }
}

/// Fill route placeholders from `args`; leftovers become the query string.
fn build_url(route: &str, mut args: Vec<(String, String)>) -> String {
    let Ok(mut url) = Url::parse(ORIGIN) else {
        return route.to_owned();
    };

    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear();
        let path = route.trim_start_matches('/');
        if !path.is_empty() {
            for segment in path.split('/') {
                match placeholder(segment) {
                    Some((name, true)) => {
                        let value = take_arg(&mut args, name);
                        segments.extend(value.split('/'));
                    }
                    Some((name, false)) => {
                        let value = take_arg(&mut args, name);
                        segments.push(&value);
                    }
                    None => {
                        segments.push(segment);
                    }
                }
            }
        }
    }

    if !args.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(args.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    }
}

/// Form-urlencode `pairs` into a query string (without the `?`).
pub fn encode_query(pairs: &[(&str, &str)]) -> String {
    let Ok(mut url) = Url::parse(ORIGIN) else {
        return String::new();
    };
    url.query_pairs_mut().extend_pairs(pairs.iter());
    url.query().unwrap_or_default().to_owned()
}

/// URLs of static assets grouped by template section.
#[derive(Debug, Clone)]
pub struct StaticUrls {
    prefix: String,
}

impl StaticUrls {
    /// `prefix` is where static files are mounted, e.g. `/static`.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_owned(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// URL of `asset` in the static directory matching the section of
    /// `template` (its parent directory): `layouts/base.html` with
    /// `app.css` gives `{prefix}/layouts/app.css`.
    pub fn url_static_offline(&self, template: &str, asset: &str) -> String {
        let asset = asset.trim_start_matches('/');
        let section = Path::new(template)
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str());
        match section {
            Some(section) => format!("{}/{section}/{asset}", self.prefix),
            None => format!("{}/{asset}", self.prefix),
        }
    }
}
