//! Splitting a rendered command line into arguments.

/// Split a rendered command line into arguments.
///
/// Whitespace outside quotes separates arguments. A `"` or `'` opens a quoted
/// run that lasts until the same quote character recurs; the quotes themselves
/// are dropped and everything between them is kept, including whitespace and
/// the other quote character. An unmatched quote stays open to the end of the
/// input. Arguments are trimmed and empty ones are discarded.
pub fn split_args(rendered: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in rendered.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch.is_whitespace() => push_arg(&mut args, &mut current),
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None => current.push(ch),
        }
    }
    push_arg(&mut args, &mut current);

    args
}

fn push_arg(args: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        args.push(trimmed.to_string());
    }
    current.clear();
}
