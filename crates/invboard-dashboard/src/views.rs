//! View types for dashboard template rendering.
//!
//! These types are purpose-built for Askama templates: they carry
//! pre-formatted strings so templates stay simple. Cell contents are
//! HTML-escaped here and emitted with `|safe`, because `formatvalue`
//! inserts `<br/>` markers of its own.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::format::{formatvalue, quote_columns_data};
use crate::literal::parse_python;
use crate::urls::RequestContext;

/// Query argument selecting the sort column.
pub const ORDER_BY: &str = "order_by";

pub struct ColumnView {
    pub name: String,
    /// Column identifier for the client-side table, dots escaped.
    pub data: String,
    pub sort_url: String,
    pub sorted: bool,
}

pub struct TableView {
    pub columns: Vec<ColumnView>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// Build a table from query result rows, sorted by the request's
    /// `order_by` column when it names one.
    pub fn build(rows: &[Value], ctx: &RequestContext) -> Self {
        let names = column_names(rows);
        let order_by = ctx
            .arg(ORDER_BY)
            .filter(|col| names.iter().any(|n| n.as_str() == *col));

        let mut ordered: Vec<&Value> = rows.iter().collect();
        if let Some(col) = order_by {
            ordered.sort_by(|a, b| compare_field(a.get(col), b.get(col)));
        }

        let columns = names
            .iter()
            .map(|name| ColumnView {
                name: name.clone(),
                data: quote_columns_data(name),
                sort_url: ctx.url_for_field(ORDER_BY, name),
                sorted: order_by == Some(name.as_str()),
            })
            .collect();

        let rows = ordered
            .into_iter()
            .map(|row| {
                names
                    .iter()
                    .map(|name| row.get(name).map(cell_html).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }
}

/// Keys of all object rows, in first-seen order.
fn column_names(rows: &[Value]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }
    }
    names
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => formatvalue(x).cmp(&formatvalue(y)),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Display HTML for one cell. Strings holding a stringified structure
/// are expanded first.
pub fn cell_html(value: &Value) -> String {
    let value = match value {
        Value::String(s) => Value::from(parse_python(s)),
        other => other.clone(),
    };
    formatvalue(&escape_leaves(value))
}

fn escape_leaves(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_html(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(escape_leaves).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (escape_html(&k), escape_leaves(v)))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Keep rows of `env` (rows without an environment field always match).
pub fn in_environment(row: &Value, env: &str) -> bool {
    if env == crate::env::ALL_ENVIRONMENTS {
        return true;
    }
    match row.get("environment").and_then(Value::as_str) {
        Some(row_env) => row_env == env,
        None => true,
    }
}
