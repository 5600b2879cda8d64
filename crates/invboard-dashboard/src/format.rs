//! Display formatting for backend values.

use std::io;

use serde::Serialize;
use serde::ser::Error as _;
use serde_json::Value;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};

/// Render a value for display in a table cell.
///
/// Arrays are joined with `", "`; each object entry becomes
/// `key => value,<br/>`, including the last one.
pub fn formatvalue(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(formatvalue).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k} => {},<br/>", formatvalue(v)))
            .collect(),
        other => other.to_string(),
    }
}

/// Pretty-print as JSON with two-space indentation. Non-ASCII characters
/// are written as `\uXXXX` escapes, so the output is always ASCII.
pub fn jsonprint<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut out = Vec::new();
    let mut ser = Serializer::with_formatter(&mut out, AsciiPretty(PrettyFormatter::new()));
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(serde_json::Error::custom)
}

/// [`PrettyFormatter`] layout with ASCII-only strings.
struct AsciiPretty<'a>(PrettyFormatter<'a>);

impl Formatter for AsciiPretty<'_> {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            if c.is_ascii() {
                continue;
            }
            writer.write_all(&fragment.as_bytes()[start..i])?;
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
            start = i + c.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

/// Escape dots in a projected field path (`facts.osfamily`) so the
/// client-side table does not read it as a nested lookup.
pub fn quote_columns_data(data: &str) -> String {
    data.replace('.', "\\.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_unchanged() {
        assert_eq!(formatvalue(&json!("Debian")), "Debian");
        assert_eq!(formatvalue(&json!("<b>")), "<b>");
    }

    #[test]
    fn arrays_join_recursively() {
        assert_eq!(formatvalue(&json!(["eth0", "lo"])), "eth0, lo");
        assert_eq!(formatvalue(&json!(["a", ["b", "c"]])), "a, b, c");
        assert_eq!(formatvalue(&json!([])), "");
    }

    #[test]
    fn objects_keep_trailing_break() {
        assert_eq!(
            formatvalue(&json!({"a": "1", "b": "2"})),
            "a => 1,<br/>b => 2,<br/>"
        );
    }

    #[test]
    fn objects_follow_insertion_order() {
        let value: Value = serde_json::from_str(r#"{"zeta": 1, "alpha": [2, 3]}"#).unwrap();
        assert_eq!(formatvalue(&value), "zeta => 1,<br/>alpha => 2, 3,<br/>");
    }

    #[test]
    fn scalars_use_json_text() {
        assert_eq!(formatvalue(&json!(42)), "42");
        assert_eq!(formatvalue(&json!(1.5)), "1.5");
        assert_eq!(formatvalue(&json!(true)), "true");
        assert_eq!(formatvalue(&Value::Null), "null");
    }

    #[test]
    fn jsonprint_indents_two_spaces() {
        let text = jsonprint(&json!({"name": "web01", "tags": ["a", "b"]})).unwrap();
        assert_eq!(
            text,
            "{\n  \"name\": \"web01\",\n  \"tags\": [\n    \"a\",\n    \"b\"\n  ]\n}"
        );
    }

    #[test]
    fn jsonprint_scalars() {
        assert_eq!(jsonprint(&json!(3)).unwrap(), "3");
        assert_eq!(jsonprint("x").unwrap(), "\"x\"");
        assert_eq!(jsonprint(&json!([])).unwrap(), "[]");
        assert_eq!(jsonprint(&json!({})).unwrap(), "{}");
    }

    #[test]
    fn jsonprint_escapes_non_ascii() {
        assert_eq!(jsonprint("café").unwrap(), "\"caf\\u00e9\"");
        assert_eq!(jsonprint("😀").unwrap(), "\"\\ud83d\\ude00\"");
        assert_eq!(
            jsonprint(&json!({"名": "a\tb"})).unwrap(),
            "{\n  \"\\u540d\": \"a\\tb\"\n}"
        );
    }

    #[test]
    fn dots_are_escaped() {
        assert_eq!(quote_columns_data("facts.osfamily"), "facts\\.osfamily");
        assert_eq!(quote_columns_data("a.b.c"), "a\\.b\\.c");
        assert_eq!(quote_columns_data("certname"), "certname");
    }
}
