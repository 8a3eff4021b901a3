//! Canonical group-key encoding.
//!
//! Each component is written as `<tag><byte length>:<payload>` so that
//! values of different logical types never produce the same key and no
//! payload can run into its neighbour. Null has its own tag.

use std::fmt::Write;

use crate::column::Column;
use crate::value::Value;

const NULL_SENTINEL: &str = "\u{0}N";

pub(crate) fn push_key_component(buf: &mut String, value: &Value) {
    let (tag, payload) = match value {
        Value::Null => {
            buf.push_str(NULL_SENTINEL);
            buf.push(';');
            return;
        }
        Value::Float64(v) => ('f', canonical_f64(*v)),
        Value::Int32(v) => ('i', v.to_string()),
        Value::Utf8(s) => ('s', s.clone()),
        Value::Boolean(b) => ('b', if *b { "1".to_string() } else { "0".to_string() }),
        Value::Date(ms) => ('d', ms.to_string()),
        Value::List(_) => ('l', value.to_json().to_string()),
        Value::Object(v) => ('o', v.to_string()),
    };
    buf.push(tag);
    let _ = write!(buf, "{}:", payload.len());
    buf.push_str(&payload);
}

fn canonical_f64(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == 0.0 {
        // -0.0 and 0.0 group together
        "0".to_string()
    } else {
        format!("{:?}", v)
    }
}

/// Key of row `row` across `columns`, in column order.
pub(crate) fn row_key(columns: &[&Column], row: usize, buf: &mut String) {
    buf.clear();
    for column in columns {
        push_key_component(buf, &column.value_at(row));
    }
}
