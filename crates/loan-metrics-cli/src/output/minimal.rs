use serde_json::Value;

use super::cell;

/// Key answer fields, most specific first
const PRIORITY_KEYS: [&str; 7] = [
    "annual_rate",
    "rate",
    "interest_rate",
    "imported",
    "removed",
    "path",
    "records",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal(value));
}

fn minimal(value: &Value) -> String {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Object(map) => {
            if let Some(val) = PRIORITY_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|val| !val.is_null())
            {
                return cell(val, "null");
            }
            match map.iter().next() {
                Some((key, val)) => format!("{}: {}", key, cell(val, "null")),
                None => String::new(),
            }
        }
        // One line per listed row
        Value::Array(rows) => rows
            .iter()
            .map(|row| match (row.get("name"), row.get("annual_rate")) {
                (Some(name), Some(rate)) => format!("{}\t{}", cell(name, ""), cell(rate, "")),
                _ => cell(row, "null"),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => cell(result, "null"),
    }
}
