use std::sync::LazyLock;

use regex::Regex;

use crate::error::AppError;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// "Yas Marina Circuit" → "yas_marina_circuit".
pub fn slugify(input: &str) -> String {
    let lowered = input.trim().to_lowercase();

    NON_ALPHANUMERIC
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

pub fn circuit_key(input: &str) -> Result<String, AppError> {
    let key = slugify(input);

    if key.is_empty() {
        return Err(AppError::MalformedCircuit(input.to_string()));
    }

    Ok(key)
}

pub fn cache_key(session_key: u32) -> String {
    format!("current_{session_key}")
}

/// "yas_marina" → "Yas Marina".
pub fn display_name(circuit_key: &str) -> String {
    circuit_key
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
