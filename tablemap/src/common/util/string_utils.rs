/// Converts a property name to its snake_case column name.
///
/// # Behavior
/// - Already snake_case input passes through unchanged.
/// - camelCase/PascalCase boundaries get an underscore inserted and the
///   letter lowered (`createdAt` -> `created_at`).
/// - Digits are kept as-is (`line2` -> `line2`).
pub fn to_snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Derives a short table alias from a table name.
///
/// Takes the first letter of each underscore-separated word, optionally
/// skipping one conventional prefix word (e.g. a shared table-name prefix).
///
/// # Examples
/// - `derive_alias("order_item", None)` -> `"oi"`
/// - `derive_alias("app_user_profile", Some("app"))` -> `"up"`
pub fn derive_alias(table_name: &str, skip_word: Option<&str>) -> String {
    let mut alias = String::new();
    for word in table_name.split('_') {
        if let Some(skip) = skip_word {
            if word == skip {
                continue;
            }
        }
        if let Some(first) = word.chars().next() {
            alias.push(first);
        }
    }
    alias
}
