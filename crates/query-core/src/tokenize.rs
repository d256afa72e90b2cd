//! Argument tokenizer for MCP server command lines.

/// Split a free-form argument string into an argv.
///
/// A comma anywhere switches to list mode: the input is split on commas,
/// each piece trimmed and empty pieces dropped, and quotes are not special.
/// Otherwise tokens are separated by spaces outside quotes. `"` and `'` open
/// a quoted run that only the same character closes; the quote characters
/// themselves are dropped. An unterminated quote runs to the end of input.
pub fn tokenize(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }

    if raw.contains(',') {
        return raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
    }

    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match (ch, quote) {
            ('"' | '\'', None) => quote = Some(ch),
            (c, Some(q)) if c == q => quote = None,
            (' ', None) => push_token(&mut args, &mut current),
            (c, _) => current.push(c),
        }
    }
    push_token(&mut args, &mut current);

    args
}

fn push_token(args: &mut Vec<String>, current: &mut String) {
    let token = current.trim();
    if !token.is_empty() {
        args.push(token.to_owned());
    }
    current.clear();
}
