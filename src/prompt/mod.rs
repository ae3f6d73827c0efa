//! Prompt construction for squad members.
//!
//! Every prompt is a sequence of markdown sections followed by a fixed
//! footer that tells the agent how to report setup problems. Three layouts
//! exist:
//!
//! - stateless: `# Role`, `---`, `# Task`, footer
//! - new conversation: `# Role`, `---`, `# Initial Task`, footer
//! - continuing conversation: `# Task`, footer
//!
//! The prompt ends up inside a double-quoted shell argument, so
//! [`escape_for_double_quotes`] is applied before it reaches a template.

use crate::roles::RoleDefinition;

/// Instructions appended to every prompt.
pub const SETUP_REPORTING_FOOTER: &str = "# Setup & Reporting Rules

If you encounter SETUP / ENVIRONMENT ISSUES (missing dependencies, broken tooling, \
missing credentials, unavailable services, permission problems), clearly report them \
at the top of your answer.
For each issue, suggest specific steps the user can take to resolve it.
Do not pretend the task succeeded when it did not. If you could only finish part of \
the work, say exactly which part.";

const SEPARATOR: &str = "---";

fn section(heading: &str, content: &str) -> String {
    format!("# {}\n\n{}", heading, content)
}

fn assemble(parts: &[String]) -> String {
    let mut prompt = parts.join("\n\n");
    prompt.push_str("\n\n");
    prompt.push_str(SETUP_REPORTING_FOOTER);
    prompt
}

/// Prompt for a one-shot run: role, then task.
pub fn build_stateless(role: &RoleDefinition, task: &str) -> String {
    assemble(&[
        section("Role", &role.body),
        SEPARATOR.to_string(),
        section("Task", task),
    ])
}

/// Prompt for the first message of a new conversation.
pub fn build_new_conversation(role: &RoleDefinition, task: &str) -> String {
    assemble(&[
        section("Role", &role.body),
        SEPARATOR.to_string(),
        section("Initial Task", task),
    ])
}

/// Prompt for a follow-up message in an existing conversation.
///
/// The agent already knows its role, so only the task is sent.
pub fn build_continuing(task: &str) -> String {
    assemble(&[section("Task", task)])
}

/// Escape text for inclusion inside a double-quoted shell argument.
///
/// Backslash, `$`, backtick and `"` get a leading backslash. Newlines become
/// the two characters `\n` and carriage returns are dropped, which keeps the
/// rendered command on one line.
pub fn escape_for_double_quotes(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for ch in text.chars() {
        match ch {
            '\\' | '$' | '`' | '"' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(body: &str) -> RoleDefinition {
        RoleDefinition {
            id: "frontend".to_string(),
            name: "Frontend Developer".to_string(),
            description: "Frontend specialist".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_stateless_layout() {
        let prompt = build_stateless(&role("Build UI components"), "Create a button component");

        let lines: Vec<&str> = prompt.lines().collect();
        assert_eq!(lines[0], "# Role");
        assert_eq!(lines[1], "");
        assert_eq!(lines[2], "Build UI components");
        assert!(prompt.contains("\n---\n"));
        assert!(prompt.find("# Task").unwrap() > prompt.find("# Role").unwrap());
        assert!(prompt.contains("# Task\n\nCreate a button component"));
        assert!(prompt.contains(SETUP_REPORTING_FOOTER));
    }

    #[test]
    fn test_stateless_keeps_multiline_role_body() {
        let body = "You are a test role.\nDo your best.";
        let prompt = build_stateless(&role(body), "Complete this task");
        assert!(prompt.contains(body));
        assert!(prompt.contains("SETUP / ENVIRONMENT ISSUES"));
    }

    #[test]
    fn test_new_conversation_uses_initial_task() {
        let prompt = build_new_conversation(&role("Build APIs"), "Create user endpoint");

        assert!(prompt.starts_with("# Role\n\nBuild APIs"));
        assert!(prompt.contains("# Initial Task\n\nCreate user endpoint"));
        assert!(!prompt.contains("# Task"));
        assert!(prompt.ends_with(SETUP_REPORTING_FOOTER));
    }

    #[test]
    fn test_continuing_has_task_only() {
        let prompt = build_continuing("Fix the bug");

        assert_eq!(prompt.find("# Task"), Some(0));
        assert!(prompt.contains("Fix the bug"));
        assert!(!prompt.contains("# Role"));
        assert!(!prompt.contains("# Initial Task"));
        assert!(prompt.contains("# Setup & Reporting Rules"));
    }

    #[test]
    fn test_footer_reporting_instructions() {
        let prompt = build_continuing("Any task");
        assert!(prompt.contains("clearly report them"));
        assert!(prompt.contains("suggest specific steps"));
        assert!(prompt.contains("Do not pretend the task succeeded"));
    }

    #[test]
    fn test_empty_inputs_keep_headers() {
        let prompt = build_stateless(&role(""), "");
        assert!(prompt.starts_with("# Role\n\n"));
        assert!(prompt.contains("# Task\n\n"));

        let prompt = build_continuing("");
        assert!(prompt.starts_with("# Task\n\n"));
    }

    #[test]
    fn test_escape_for_double_quotes() {
        assert_eq!(
            escape_for_double_quotes("echo \"$HOME\" `id` C:\\tmp"),
            "echo \\\"\\$HOME\\\" \\`id\\` C:\\\\tmp"
        );
    }

    #[test]
    fn test_escape_flattens_newlines() {
        assert_eq!(escape_for_double_quotes("a\r\nb\nc"), "a\\nb\\nc");
    }

    #[test]
    fn test_escape_leaves_single_quotes() {
        assert_eq!(escape_for_double_quotes("it's"), "it's");
    }
}
