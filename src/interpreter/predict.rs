//! Identifier completion for the command input
//!
//! The token being typed is taken after the last space first; if nothing
//! completes it, the token after the last `(` is tried instead. The
//! lexicographically smallest candidate starting with the token wins.

/// Complete the trailing token of `partial`, or return it unchanged
pub fn predict<'a>(partial: &str, candidates: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<&str> = candidates.into_iter().collect();
    names.sort_unstable();

    for delimiter in [' ', '('] {
        let split = partial.rfind(delimiter).map_or(0, |i| i + 1);
        let (head, token) = partial.split_at(split);
        if token.is_empty() {
            continue;
        }
        if let Some(name) = names.iter().find(|name| name.starts_with(token)) {
            return format!("{}{}", head, name);
        }
    }

    partial.to_string()
}
