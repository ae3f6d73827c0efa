use super::*;

#[test]
fn test_render_splits_quoted_args() {
    let args = render("a \"b c\" d", &HashMap::new()).unwrap();
    assert_eq!(args, vec!["a", "b c", "d"]);
}

#[test]
fn test_render_without_handle_omits_resume() {
    let template = "--approve-mcps --model composer-1 <% if (conversationHandle) { %>--resume <%= conversationHandle %><% } %> agent \"<%= prompt %>\"";
    let context = vars([
        (PROMPT, "Test prompt"),
        (WORKING_DIRECTORY, "/workspace"),
        (ROLE_ID, "frontend-developer"),
        (TASK, "Build UI"),
    ]);

    let args = render(template, &context).unwrap();
    assert_eq!(
        args,
        vec![
            "--approve-mcps",
            "--model",
            "composer-1",
            "agent",
            "Test prompt"
        ]
    );
}

#[test]
fn test_render_with_handle_adds_resume() {
    let template = "<% if (conversationHandle) { %> --resume <%= conversationHandle %> <% } %> agent \"<%= prompt %>\"";
    let context = vars([
        (PROMPT, "Continue task"),
        (CONVERSATION_HANDLE, "chat-123"),
    ]);

    let args = render(template, &context).unwrap();
    assert_eq!(args, vec!["--resume", "chat-123", "agent", "Continue task"]);
}

#[test]
fn test_empty_handle_is_falsy() {
    let template = "run<% if (conversationHandle) { %> --resume<% } %>";
    let context = vars([(CONVERSATION_HANDLE, "")]);
    assert_eq!(render(template, &context).unwrap(), vec!["run"]);
}

#[test]
fn test_collapses_repeated_whitespace() {
    let args = render("arg1   arg2  \"quoted arg\"  arg3", &HashMap::new()).unwrap();
    assert_eq!(args, vec!["arg1", "arg2", "quoted arg", "arg3"]);
}

#[test]
fn test_single_quotes() {
    let args = render("arg1 'single quoted' arg2", &HashMap::new()).unwrap();
    assert_eq!(args, vec!["arg1", "single quoted", "arg2"]);
}

#[test]
fn test_escaped_interpolation_inside_quotes() {
    let template = "cmd \"<%= doubleWrapped %>\" --json '<%= singleWrapped %>'";
    let context = vars([
        ("doubleWrapped", "value with 'single quotes' nested"),
        ("singleWrapped", "value with \"double quotes\" nested"),
    ]);

    let args = render(template, &context).unwrap();
    assert_eq!(
        args,
        vec![
            "cmd",
            "value with &#39;single quotes&#39; nested",
            "--json",
            "value with &#34;double quotes&#34; nested",
        ]
    );
}

#[test]
fn test_raw_interpolation_is_not_escaped() {
    let context = vars([("payload", "a&b <c>")]);
    let args = render("cmd '<%- payload %>'", &context).unwrap();
    assert_eq!(args, vec!["cmd", "a&b <c>"]);
}

#[test]
fn test_preserves_whitespace_inside_quotes() {
    let template = "cmd \"<%= payload %>\" --flag";
    let context = vars([("payload", "line1\nline 2\talpha&beta|gamma")]);

    let args = render(template, &context).unwrap();
    assert_eq!(
        args,
        vec!["cmd", "line1\nline 2\talpha&amp;beta|gamma", "--flag"]
    );
}

#[test]
fn test_whitespace_only_renders_to_no_args() {
    let template = "  <% if (missing) { %>never<% } %>\n\t ";
    assert!(render(template, &HashMap::new()).unwrap().is_empty());
}

#[test]
fn test_undefined_variable_error_carries_excerpt() {
    let template = "echo <%= missingVariable %>";
    let err = render(template, &HashMap::new()).unwrap_err();

    assert_eq!(
        err.cause,
        EvalError::UndefinedVariable {
            name: "missingVariable".to_string(),
            position: 5,
        }
    );
    let message = err.to_string();
    assert!(message.starts_with("Template rendering failed: "));
    assert!(message.contains("missingVariable is not defined"));
    assert!(message.ends_with("Template: echo <%= missingVariable %>..."));
}

#[test]
fn test_malformed_template_reports_unclosed_tag() {
    let template = "<% if (flag) { %> <%= missingClosingTag";
    let err = render(template, &vars([("flag", "1")])).unwrap_err();
    assert_eq!(err.cause, EvalError::UnclosedTag { position: 18 });
}

#[test]
fn test_property_paths_are_rejected() {
    let err = render("<%= process.env.HOME %>", &HashMap::new()).unwrap_err();
    assert!(matches!(
        err.cause,
        EvalError::UnsupportedExpression { ref expression, position: 0 } if expression == "process.env.HOME"
    ));
}

#[test]
fn test_comments_render_nothing() {
    let args = render("a <%# ignored note %>b", &HashMap::new()).unwrap();
    assert_eq!(args, vec!["a", "b"]);
}

#[test]
fn test_split_args_unmatched_quote_stays_open() {
    assert_eq!(split_args("a \"b c d"), vec!["a", "b c d"]);
}

#[test]
fn test_split_args_other_quote_is_literal_inside_quotes() {
    assert_eq!(split_args("\"it's\" 'say \"hi\"'"), vec!["it's", "say \"hi\""]);
}

#[test]
fn test_split_args_trims_quoted_padding() {
    assert_eq!(split_args("\"  padded  \" \"\" x"), vec!["padded", "x"]);
}

#[test]
fn test_split_args_non_whitespace_never_empty() {
    for input in ["x", " y ", "'z'", "a|b", "\"\tq\""] {
        assert!(!split_args(input).is_empty(), "input {:?}", input);
    }
}

#[test]
fn test_vars_helper() {
    let map = vars([("a", "1"), ("b", "2")]);
    assert_eq!(map.get("a").map(String::as_str), Some("1"));
    assert_eq!(map.len(), 2);
}

#[test]
fn test_shipped_templates_render() {
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    for engine in ["cursor-agent", "claude", "codex"] {
        let run = std::fs::read_to_string(dir.join(format!("run-{}.template", engine))).unwrap();
        let create =
            std::fs::read_to_string(dir.join(format!("create-chat-{}.template", engine))).unwrap();

        let mut context = vars([
            (PROMPT, "Do the thing"),
            (WORKING_DIRECTORY, "/workspace"),
            (ROLE_ID, "qa"),
            (TASK, "Do the thing"),
        ]);
        let fresh = render(&run, &context).unwrap();
        assert_eq!(fresh.last().map(String::as_str), Some("Do the thing"), "{}", engine);
        assert!(!fresh.iter().any(|arg| arg == "chat-9"), "{}", engine);

        context.insert(CONVERSATION_HANDLE.to_string(), "chat-9".to_string());
        let resumed = render(&run, &context).unwrap();
        assert!(resumed.iter().any(|arg| arg == "chat-9"), "{}", engine);

        context.insert(GENERATED_TOKEN.to_string(), "token-1".to_string());
        assert!(!render(&create, &context).unwrap().is_empty(), "{}", engine);
    }
}
