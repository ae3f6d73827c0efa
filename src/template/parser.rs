//! Template evaluation: tag scanning, block structure, and substitution.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Number of template characters quoted in a [`TemplateError`].
const EXCERPT_CHARS: usize = 100;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("Invalid identifier regex"));

static IF_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^if\s*\(\s*(!)?\s*([A-Za-z_$][A-Za-z0-9_$]*)\s*\)\s*\{$")
        .expect("Invalid if directive regex")
});

static ELSE_DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\}\s*else\s*\{$").expect("Invalid else directive regex"));

/// Reason a template could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An interpolation referenced a key that is not in the context.
    UndefinedVariable {
        /// The name of the undefined variable.
        name: String,
        /// Byte offset of the tag that referenced it.
        position: usize,
    },
    /// A `<%` was found without a matching `%>`.
    UnclosedTag {
        /// Byte offset of the unclosed tag.
        position: usize,
    },
    /// A tag contained something other than an identifier or a directive.
    UnsupportedExpression {
        /// The offending tag body.
        expression: String,
        /// Byte offset of the tag.
        position: usize,
    },
    /// An interpolation tag with nothing inside (`<%= %>`).
    EmptyExpression {
        /// Byte offset of the tag.
        position: usize,
    },
    /// A `<% } %>` or `<% } else { %>` without an open conditional.
    UnexpectedBlockEnd {
        /// Byte offset of the tag.
        position: usize,
    },
    /// A conditional block that is never closed.
    UnclosedBlock {
        /// Byte offset of the opening `if` tag.
        position: usize,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedVariable { name, position } => {
                write!(f, "{} is not defined (at position {})", name, position)
            }
            EvalError::UnclosedTag { position } => {
                write!(f, "could not find matching close tag for '<%' at position {}", position)
            }
            EvalError::UnsupportedExpression {
                expression,
                position,
            } => write!(
                f,
                "unsupported expression '{}' at position {}",
                expression, position
            ),
            EvalError::EmptyExpression { position } => {
                write!(f, "empty expression at position {}", position)
            }
            EvalError::UnexpectedBlockEnd { position } => {
                write!(f, "unexpected '}}' at position {} with no open block", position)
            }
            EvalError::UnclosedBlock { position } => {
                write!(f, "block opened at position {} is never closed", position)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// A template evaluation failure, carrying the start of the template for context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateError {
    /// What went wrong.
    pub cause: EvalError,
    /// The first 100 characters of the template.
    pub excerpt: String,
}

impl TemplateError {
    /// Wrap an evaluation error together with the template it came from.
    pub fn evaluation(cause: EvalError, template: &str) -> Self {
        Self {
            cause,
            excerpt: template.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Template rendering failed: {}. Template: {}...",
            self.cause, self.excerpt
        )
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Evaluate a template against a context map.
///
/// Conditional blocks are evaluated lazily: keys referenced only inside a
/// branch that is not taken do not need to exist.
pub fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let nodes = tokenize(template)
        .and_then(parse)
        .map_err(|cause| TemplateError::evaluation(cause, template))?;

    let mut result = String::with_capacity(template.len());
    evaluate(&nodes, variables, &mut result)
        .map_err(|cause| TemplateError::evaluation(cause, template))?;
    Ok(result)
}

/// Escape text the way `<%= %>` does.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Escaped,
    Raw,
    Code,
    Comment,
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    Tag {
        kind: TagKind,
        body: String,
        position: usize,
    },
}

#[derive(Debug)]
enum Node {
    Text(String),
    Value {
        name: String,
        escape: bool,
        position: usize,
    },
    Conditional {
        key: String,
        negated: bool,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
}

/// An open `if` block while parsing.
struct Frame {
    key: String,
    negated: bool,
    position: usize,
    then_branch: Vec<Node>,
    else_branch: Option<Vec<Node>>,
}

fn tokenize(template: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find("<%") {
        let start = cursor + offset;
        text.push_str(&template[cursor..start]);
        let after_open = start + 2;
        let rest = &template[after_open..];

        // `<%%` renders a literal `<%`
        if rest.starts_with('%') {
            text.push_str("<%");
            cursor = after_open + 1;
            continue;
        }

        let (kind, body_start) = match rest.chars().next() {
            Some('=') => (TagKind::Escaped, after_open + 1),
            Some('-') => (TagKind::Raw, after_open + 1),
            Some('#') => (TagKind::Comment, after_open + 1),
            _ => (TagKind::Code, after_open),
        };

        let close = template[body_start..]
            .find("%>")
            .ok_or(EvalError::UnclosedTag { position: start })?;
        let mut body_end = body_start + close;
        let mut next = body_end + 2;

        // `-%>` swallows the newline right after the tag
        if body_end > body_start && template[body_start..body_end].ends_with('-') {
            body_end -= 1;
            let tail = &template[next..];
            if tail.starts_with("\r\n") {
                next += 2;
            } else if tail.starts_with('\n') {
                next += 1;
            }
        }

        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
        }
        tokens.push(Token::Tag {
            kind,
            body: template[body_start..body_end].trim().to_string(),
            position: start,
        });
        cursor = next;
    }

    text.push_str(&template[cursor..]);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }

    Ok(tokens)
}

/// Node list that new nodes are appended to: the innermost open branch.
fn target<'a>(root: &'a mut Vec<Node>, stack: &'a mut [Frame]) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => match frame.else_branch.as_mut() {
            Some(else_branch) => else_branch,
            None => &mut frame.then_branch,
        },
        None => root,
    }
}

fn parse(tokens: Vec<Token>) -> Result<Vec<Node>, EvalError> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for token in tokens {
        match token {
            Token::Text(text) => target(&mut root, &mut stack).push(Node::Text(text)),
            Token::Tag {
                kind: TagKind::Comment,
                ..
            } => {}
            Token::Tag {
                kind: kind @ (TagKind::Escaped | TagKind::Raw),
                body,
                position,
            } => {
                if body.is_empty() {
                    return Err(EvalError::EmptyExpression { position });
                }
                if !IDENTIFIER.is_match(&body) {
                    return Err(EvalError::UnsupportedExpression {
                        expression: body,
                        position,
                    });
                }
                target(&mut root, &mut stack).push(Node::Value {
                    name: body,
                    escape: kind == TagKind::Escaped,
                    position,
                });
            }
            Token::Tag {
                kind: TagKind::Code,
                body,
                position,
            } => {
                if body.is_empty() {
                    continue;
                }

                if let Some(captures) = IF_DIRECTIVE.captures(&body) {
                    stack.push(Frame {
                        key: captures[2].to_string(),
                        negated: captures.get(1).is_some(),
                        position,
                        then_branch: Vec::new(),
                        else_branch: None,
                    });
                } else if ELSE_DIRECTIVE.is_match(&body) {
                    match stack.last_mut() {
                        Some(frame) if frame.else_branch.is_none() => {
                            frame.else_branch = Some(Vec::new());
                        }
                        _ => return Err(EvalError::UnexpectedBlockEnd { position }),
                    }
                } else if body == "}" {
                    let frame = stack
                        .pop()
                        .ok_or(EvalError::UnexpectedBlockEnd { position })?;
                    target(&mut root, &mut stack).push(Node::Conditional {
                        key: frame.key,
                        negated: frame.negated,
                        then_branch: frame.then_branch,
                        else_branch: frame.else_branch.unwrap_or_default(),
                    });
                } else {
                    return Err(EvalError::UnsupportedExpression {
                        expression: body,
                        position,
                    });
                }
            }
        }
    }

    if let Some(frame) = stack.last() {
        return Err(EvalError::UnclosedBlock {
            position: frame.position,
        });
    }

    Ok(root)
}

fn evaluate(
    nodes: &[Node],
    variables: &HashMap<String, String>,
    out: &mut String,
) -> Result<(), EvalError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Value {
                name,
                escape,
                position,
            } => {
                let value = variables
                    .get(name)
                    .ok_or_else(|| EvalError::UndefinedVariable {
                        name: name.clone(),
                        position: *position,
                    })?;
                if *escape {
                    out.push_str(&escape_html(value));
                } else {
                    out.push_str(value);
                }
            }
            Node::Conditional {
                key,
                negated,
                then_branch,
                else_branch,
            } => {
                let truthy = variables.get(key).is_some_and(|value| !value.is_empty());
                if truthy != *negated {
                    evaluate(then_branch, variables, out)?;
                } else {
                    evaluate(else_branch, variables, out)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::vars;

    #[test]
    fn test_tokenize_splits_text_and_tags() {
        let tokens = tokenize("echo <%= name %>!").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Text("echo ".to_string()),
                Token::Tag {
                    kind: TagKind::Escaped,
                    body: "name".to_string(),
                    position: 5,
                },
                Token::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_literal_open_delimiter() {
        let tokens = tokenize("a <%% b").unwrap();
        assert_eq!(tokens, vec![Token::Text("a <% b".to_string())]);
    }

    #[test]
    fn test_unclosed_tag_position() {
        let err = tokenize("ab <%= name").unwrap_err();
        assert_eq!(err, EvalError::UnclosedTag { position: 3 });
    }

    #[test]
    fn test_trim_newline_after_tag() {
        let vars = vars([("x", "1")]);
        let result = render_template("<% if (x) { -%>\nyes\n<% } -%>\nend", &vars).unwrap();
        assert_eq!(result, "yes\nend");
    }

    #[test]
    fn test_else_branch() {
        let template = "<% if (flag) { %>on<% } else { %>off<% } %>";
        assert_eq!(
            render_template(template, &vars([("flag", "1")])).unwrap(),
            "on"
        );
        assert_eq!(render_template(template, &HashMap::new()).unwrap(), "off");
    }

    #[test]
    fn test_negated_condition() {
        let template = "<% if (!handle) { %>new<% } %>";
        assert_eq!(render_template(template, &HashMap::new()).unwrap(), "new");
        assert_eq!(
            render_template(template, &vars([("handle", "abc")])).unwrap(),
            ""
        );
    }

    #[test]
    fn test_nested_conditionals() {
        let template = "<% if (a) { %>A<% if (b) { %>B<% } %><% } %>";
        assert_eq!(
            render_template(template, &vars([("a", "1"), ("b", "1")])).unwrap(),
            "AB"
        );
        assert_eq!(
            render_template(template, &vars([("a", "1")])).unwrap(),
            "A"
        );
        assert_eq!(render_template(template, &vars([("b", "1")])).unwrap(), "");
    }

    #[test]
    fn test_undefined_variable_in_untaken_branch_is_ignored() {
        let template = "<% if (missing) { %><%= alsoMissing %><% } %>ok";
        assert_eq!(render_template(template, &HashMap::new()).unwrap(), "ok");
    }

    #[test]
    fn test_stray_block_end() {
        let err = render_template("a <% } %>", &HashMap::new()).unwrap_err();
        assert_eq!(err.cause, EvalError::UnexpectedBlockEnd { position: 2 });
    }

    #[test]
    fn test_double_else_is_rejected() {
        let template = "<% if (a) { %>1<% } else { %>2<% } else { %>3<% } %>";
        let err = render_template(template, &HashMap::new()).unwrap_err();
        assert!(matches!(err.cause, EvalError::UnexpectedBlockEnd { .. }));
    }

    #[test]
    fn test_unclosed_block() {
        let err = render_template("<% if (a) { %>open", &HashMap::new()).unwrap_err();
        assert_eq!(err.cause, EvalError::UnclosedBlock { position: 0 });
    }

    #[test]
    fn test_empty_expression() {
        let err = render_template("x <%= %>", &HashMap::new()).unwrap_err();
        assert_eq!(err.cause, EvalError::EmptyExpression { position: 2 });
    }

    #[test]
    fn test_code_tags_reject_arbitrary_statements() {
        let err = render_template("<% process.exit(1) %>", &HashMap::new()).unwrap_err();
        assert!(matches!(
            err.cause,
            EvalError::UnsupportedExpression { ref expression, .. } if expression == "process.exit(1)"
        ));
    }

    #[test]
    fn test_excerpt_is_truncated_to_100_chars() {
        let template = format!("{}<%= missing %>", "x".repeat(150));
        let err = render_template(&template, &HashMap::new()).unwrap_err();
        assert_eq!(err.excerpt.chars().count(), 100);
        assert!(err.excerpt.chars().all(|c| c == 'x'));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&#34;x&#34;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_error_display() {
        let err = EvalError::UndefinedVariable {
            name: "foo".to_string(),
            position: 10,
        };
        assert_eq!(err.to_string(), "foo is not defined (at position 10)");

        let err = EvalError::UnclosedTag { position: 5 };
        assert_eq!(
            err.to_string(),
            "could not find matching close tag for '<%' at position 5"
        );

        let err = TemplateError::evaluation(EvalError::EmptyExpression { position: 0 }, "<%= %>");
        assert_eq!(
            err.to_string(),
            "Template rendering failed: empty expression at position 0. Template: <%= %>..."
        );
    }
}
