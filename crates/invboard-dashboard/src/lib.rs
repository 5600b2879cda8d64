//! invboard-dashboard: request helpers and server-rendered pages over the
//! inventory backend.
//!
//! The helper modules are usable on their own; [`dashboard_router`] wires
//! them into axum handlers.
//!
//! # Routes
//!
//! | Route | Handler |
//! |---|---|
//! | `/` | Redirect to `/*/query` |
//! | `/meta` | Backend version and environments |
//! | `/{env}/query` | Query form and result table |
//! | `/{env}/query/rows` | Query rows as NDJSON, streamed page by page |

pub mod abort;
pub mod env;
pub mod format;
pub mod gate;
pub mod literal;
pub mod pages;
pub mod stream;
pub mod urls;
pub mod views;

use axum::Router;
use axum::routing::get;
use invboard_client::Backend;

pub use abort::{Abort, Failure, get_or_abort, get_or_abort_except_client_errors};
pub use env::{ALL_ENVIRONMENTS, check_env};
pub use format::{formatvalue, jsonprint, quote_columns_data};
pub use gate::{VersionGateError, check_db_version};
pub use literal::{Literal, parse_python};
pub use stream::{yield_or_stop, yield_or_stop_stream};
pub use urls::{RequestContext, StaticUrls};

/// Rows fetched per backend request by the NDJSON endpoint.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Shared state for dashboard handlers.
#[derive(Clone)]
pub struct DashboardState<B> {
    pub backend: B,
    pub static_urls: StaticUrls,
    pub page_size: usize,
}

impl<B> DashboardState<B> {
    pub fn new(backend: B, static_urls: StaticUrls) -> Self {
        Self {
            backend,
            static_urls,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Build the dashboard router.
pub fn dashboard_router<B>(state: DashboardState<B>) -> Router
where
    B: Backend + Clone + 'static,
{
    Router::new()
        .route("/", get(pages::index))
        .route("/meta", get(pages::meta::<B>))
        .route("/{env}/query", get(pages::query::<B>))
        .route("/{env}/query/rows", get(pages::query_rows::<B>))
        .with_state(state)
}
