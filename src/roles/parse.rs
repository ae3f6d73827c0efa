//! Role file parsing.

use super::RoleDefinition;
use crate::error::{Result, SquadError};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct RoleFrontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Parse a role file's content.
///
/// Frontmatter is optional. Both LF and CRLF line endings are accepted.
///
/// # Examples
///
/// ```
/// use squad::roles::parse_role;
///
/// let role = parse_role("qa", "---\nname: QA\n---\n\nTest things.\n").unwrap();
/// assert_eq!(role.name, "QA");
/// assert_eq!(role.body, "Test things.");
/// ```
pub fn parse_role(id: &str, content: &str) -> Result<RoleDefinition> {
    let normalized = content.replace("\r\n", "\n");

    let (frontmatter, body) = match split_frontmatter(&normalized) {
        Some((yaml, body)) => {
            let frontmatter = if yaml.trim().is_empty() {
                RoleFrontmatter::default()
            } else {
                serde_yaml::from_str(yaml).map_err(|e| {
                    SquadError::UserError(format!(
                        "failed to parse frontmatter of role '{}': {}",
                        id, e
                    ))
                })?
            };
            (frontmatter, body)
        }
        None => (RoleFrontmatter::default(), normalized.as_str()),
    };

    let name = frontmatter
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| id.to_string());

    Ok(RoleDefinition {
        id: id.to_string(),
        name,
        description: frontmatter.description.unwrap_or_default().trim().to_string(),
        body: body.trim().to_string(),
    })
}

/// Split `---` delimited frontmatter from the body.
///
/// Both delimiters must be a whole `---` line; `----` or `---foo` inside the
/// frontmatter do not close it. Returns `None` when the content does not open
/// with a delimiter line or the closing delimiter is missing; the whole file
/// is then treated as body.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;

    if let Some(body) = rest.strip_prefix("---")
        && matches!(body.as_bytes().first(), None | Some(b'\n'))
    {
        return Some(("", body));
    }

    let closing = rest
        .match_indices("\n---")
        .map(|(index, _)| index)
        .find(|&index| matches!(rest.as_bytes().get(index + 4), None | Some(b'\n')))?;
    let yaml = &rest[..closing];
    let body = &rest[closing + 4..];
    Some((yaml, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_frontmatter_needs_whole_delimiter_line() {
        assert_eq!(
            split_frontmatter("---\nname: a\n----\n---\nbody"),
            Some(("name: a\n----", "\nbody"))
        );
        assert_eq!(split_frontmatter("---\nname: a\n---foo\nbody"), None);
        assert_eq!(
            split_frontmatter("---\n----\n---\nbody"),
            Some(("----", "\nbody"))
        );
    }

    #[test]
    fn test_split_frontmatter_closing_at_end_of_input() {
        assert_eq!(split_frontmatter("---\nname: a\n---"), Some(("name: a", "")));
        assert_eq!(split_frontmatter("---\n---"), Some(("", "")));
    }
}
