//! Command template rendering.
//!
//! A command template is a shell command line with a small embedded
//! templating language. Rendering happens in two steps:
//!
//! 1. **Evaluate**: interpolations and conditional blocks are resolved
//!    against a context map, producing one command line string.
//! 2. **Split**: the command line is tokenized into an ordered argument list,
//!    honoring single and double quotes.
//!
//! # Template Syntax
//!
//! ```text
//! cursor-agent --model composer-1 <% if (conversationHandle) { %>--resume <%= conversationHandle %><% } %> "<%- prompt %>"
//! ```
//!
//! - `<%= key %>` - HTML-escaped value of `key`
//! - `<%- key %>` - raw value of `key`
//! - `<% if (key) { %> ... <% } %>` - included only when `key` is present and non-empty
//! - `<% if (!key) { %>` - negated condition, `<% } else { %>` - else branch
//! - `<%# note %>` - comment
//! - `<%%` - literal `<%`
//! - `-%>` - closes a tag and swallows the newline that follows it
//!
//! Only bare identifiers are accepted inside tags. Property paths, calls and
//! operators are rejected, so template files cannot execute code.

mod args;
mod parser;

pub use args::split_args;
pub use parser::{EvalError, TemplateError, escape_html, render_template};

use std::collections::HashMap;

/// Context key for the escaped agent prompt.
pub const PROMPT: &str = "prompt";
/// Context key for the member's resolved working directory.
pub const WORKING_DIRECTORY: &str = "workingDirectory";
/// Context key for the member's role id.
pub const ROLE_ID: &str = "roleId";
/// Context key for the raw task text.
pub const TASK: &str = "task";
/// Context key for the conversation handle (stateful run template only).
pub const CONVERSATION_HANDLE: &str = "conversationHandle";
/// Context key for the freshly generated token (create-handle template only).
pub const GENERATED_TOKEN: &str = "generatedToken";

/// Older template files use these names for the same values.
pub const WORKING_DIRECTORY_ALIAS: &str = "cwd";
pub const CONVERSATION_HANDLE_ALIAS: &str = "chatId";
pub const GENERATED_TOKEN_ALIAS: &str = "generatedUuid";

/// Render a command template into an argument list.
///
/// Returns an empty list when the template evaluates to whitespace only;
/// callers decide whether that is an error, since only they know which file
/// the template came from.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use squad::template::render;
///
/// let args = render("a \"b c\" d", &HashMap::new()).unwrap();
/// assert_eq!(args, vec!["a", "b c", "d"]);
/// ```
pub fn render(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<Vec<String>, TemplateError> {
    let rendered = render_template(template, variables)?;
    Ok(split_args(&rendered))
}

/// Helper to create a variables map from a list of key-value pairs.
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests;
