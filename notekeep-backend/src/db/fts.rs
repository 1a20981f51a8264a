//! Turning free text typed by a user into a safe FTS5 MATCH expression.

/// Build an FTS5 query from user input.
///
/// Every whitespace-separated term becomes a quoted string, so operators,
/// column filters and stray punctuation are matched literally instead of
/// raising a syntax error. A trailing `*` on a term is kept as a prefix
/// search. Terms without a single letter or digit can never match a token
/// and are dropped. Terms are ANDed. Returns None when nothing searchable is
/// left, in which case the query cannot match any note.
pub fn match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query.split_whitespace().filter_map(quote_term).collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

fn quote_term(term: &str) -> Option<String> {
    let (body, prefix) = match term.strip_suffix('*') {
        Some(rest) if !rest.trim_end_matches('*').is_empty() => (rest.trim_end_matches('*'), true),
        Some(_) => return None,
        None => (term, false),
    };
    if !body.chars().any(char::is_alphanumeric) {
        return None;
    }
    let quoted = format!("\"{}\"", body.replace('"', "\"\""));
    Some(if prefix { format!("{}*", quoted) } else { quoted })
}
