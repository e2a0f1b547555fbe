//! Best-effort classification of execution failure logs.
//!
//! The backend reports a failed run as a raw tool log inside the
//! wrong-submission event payload, prefixed with `log:`. That text can be a
//! JavaScript stack trace, a Python traceback, a Go compiler dump, or a
//! sandbox-level failure. Classification pattern-matches against the known
//! categories and rewrites the log into a short human-readable message;
//! anything unrecognized passes through truncated.

/// Longest unclassified message shown before truncation.
pub const MAX_LOG_CHARS: usize = 200;

/// Prefix the backend puts in front of the raw execution log.
pub const LOG_PREFIX: &str = "log:";

/// Known execution-failure categories, checked in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Syntax,
    Reference,
    Type,
    Timeout,
    Memory,
    Container,
    Compile,
    Indentation,
    Name,
    Undefined,
    Unknown,
}

/// Strip the `log:` transport prefix if present.
pub fn strip_log_prefix(raw: &str) -> &str {
    raw.strip_prefix(LOG_PREFIX).unwrap_or(raw)
}

/// Categorize a raw execution log. Order matters: generic interpreter errors
/// first, sandbox-level failures next, then language-specific patterns.
pub fn classify_kind(log: &str) -> FailureKind {
    if log.contains("SyntaxError") {
        FailureKind::Syntax
    } else if log.contains("ReferenceError") {
        FailureKind::Reference
    } else if log.contains("TypeError") {
        FailureKind::Type
    } else if log.contains("timeout") || log.contains("SIGKILL") {
        FailureKind::Timeout
    } else if log.contains("memory") || log.contains("OOM") {
        FailureKind::Memory
    } else if log.contains("container") || log.contains("docker") {
        FailureKind::Container
    } else if log.contains("compilation failed") || log.contains("compile error") {
        FailureKind::Compile
    } else if log.contains("IndentationError") {
        FailureKind::Indentation
    } else if log.contains("NameError") {
        FailureKind::Name
    } else if log.contains("undefined:") || log.contains("not defined") {
        FailureKind::Undefined
    } else {
        FailureKind::Unknown
    }
}

/// Rewrite a raw execution log into the message shown in the error panel.
///
/// Accepts the payload text with or without the `log:` prefix.
pub fn classify_execution_log(raw: &str) -> String {
    let log = strip_log_prefix(raw).trim();
    if log.is_empty() {
        return "Code execution failed with no output. Please check your syntax and try again."
            .to_string();
    }

    match classify_kind(log) {
        FailureKind::Syntax => format!("Syntax Error: {}", after_marker(log, "SyntaxError")),
        FailureKind::Reference => {
            format!("Reference Error: {}", after_marker(log, "ReferenceError"))
        }
        FailureKind::Type => format!("Type Error: {}", after_marker(log, "TypeError")),
        FailureKind::Timeout => {
            "Execution timeout: Your code took too long to execute. Check for infinite loops."
                .to_string()
        }
        FailureKind::Memory => {
            "Memory Error: Your code used too much memory. Try optimizing your solution."
                .to_string()
        }
        FailureKind::Container => format!("Sandbox execution error: {}", log),
        FailureKind::Compile => format!("Compilation failed: {}", log),
        FailureKind::Indentation => {
            "Python Indentation Error: Check your code indentation (use spaces or tabs consistently)."
                .to_string()
        }
        FailureKind::Name => format!("Python Name Error: {}", after_marker(log, "NameError")),
        FailureKind::Undefined => format!("Go Error: {}", log),
        FailureKind::Unknown => truncate(log),
    }
}

/// Text after the last occurrence of `marker`, with a trailing colon and
/// leading whitespace removed. Mirrors a greedy leading wildcard match.
fn after_marker<'a>(log: &'a str, marker: &str) -> &'a str {
    match log.rfind(marker) {
        Some(pos) => {
            let rest = &log[pos + marker.len()..];
            rest.strip_prefix(':').unwrap_or(rest).trim_start()
        }
        None => log,
    }
}

fn truncate(log: &str) -> String {
    if log.chars().count() > MAX_LOG_CHARS {
        let cut: String = log.chars().take(MAX_LOG_CHARS).collect();
        format!("{}...", cut)
    } else {
        log.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("SyntaxError: unexpected token", FailureKind::Syntax)]
    #[case("ReferenceError: x is not defined", FailureKind::Reference)]
    #[case("TypeError: cannot read properties", FailureKind::Type)]
    #[case("process killed by SIGKILL", FailureKind::Timeout)]
    #[case("execution timeout exceeded", FailureKind::Timeout)]
    #[case("OOM killed", FailureKind::Memory)]
    #[case("out of memory", FailureKind::Memory)]
    #[case("container exited with status 1", FailureKind::Container)]
    #[case("docker daemon unreachable", FailureKind::Container)]
    #[case("compilation failed: main.go:3", FailureKind::Compile)]
    #[case("IndentationError: unexpected indent", FailureKind::Indentation)]
    #[case("NameError: name 'x' is not defined", FailureKind::Name)]
    #[case("undefined: solve", FailureKind::Undefined)]
    #[case("something else entirely", FailureKind::Unknown)]
    fn test_classify_kind(#[case] log: &str, #[case] expected: FailureKind) {
        assert_eq!(classify_kind(log), expected);
    }

    #[test]
    fn test_strip_log_prefix_present() {
        assert_eq!(strip_log_prefix("log:stack trace"), "stack trace");
    }

    #[test]
    fn test_strip_log_prefix_absent() {
        assert_eq!(strip_log_prefix("stack trace"), "stack trace");
    }

    #[test]
    fn test_indentation_error_classified_not_raw() {
        let message = classify_execution_log("log:IndentationError at line 3");
        assert!(message.contains("Python Indentation Error"));
        assert!(!message.contains("at line 3"));
    }

    #[test]
    fn test_syntax_error_strips_traceback_head() {
        let message =
            classify_execution_log("log:File \"main.py\", line 1\nSyntaxError: invalid syntax");
        assert_eq!(message, "Syntax Error: invalid syntax");
    }

    #[test]
    fn test_reference_error_message_extracted() {
        let message = classify_execution_log("ReferenceError: solve is not defined");
        assert_eq!(message, "Reference Error: solve is not defined");
    }

    #[test]
    fn test_name_error_after_reference_check() {
        // NameError contains neither ReferenceError nor the earlier markers
        let message = classify_execution_log("NameError: name 'foo' is not defined");
        assert!(message.starts_with("Python Name Error: "));
    }

    #[test]
    fn test_empty_log_gets_generic_message() {
        let message = classify_execution_log("log:");
        assert!(message.contains("no output"));
        let message = classify_execution_log("   ");
        assert!(message.contains("no output"));
    }

    #[test]
    fn test_timeout_message_is_fixed_text() {
        let message = classify_execution_log("log:signal: SIGKILL");
        assert!(message.contains("infinite loops"));
    }

    #[test]
    fn test_unknown_long_message_truncated() {
        let raw = "z".repeat(500);
        let message = classify_execution_log(&raw);
        assert!(message.ends_with("..."));
        assert_eq!(message.chars().count(), MAX_LOG_CHARS + 3);
    }

    #[test]
    fn test_unknown_short_message_passes_through() {
        assert_eq!(classify_execution_log("weird exit"), "weird exit");
    }

    proptest! {
        // The classifier must never panic and never exceed the truncation
        // budget for unrecognized input, regardless of unicode content.
        #[test]
        fn prop_classifier_never_panics(raw in "\\PC*") {
            let _ = classify_execution_log(&raw);
        }

        #[test]
        fn prop_unknown_output_bounded(raw in "[a-z ]{0,1000}") {
            prop_assume!(classify_kind(raw.trim()) == FailureKind::Unknown);
            let message = classify_execution_log(&raw);
            prop_assert!(message.chars().count() <= MAX_LOG_CHARS + 3 || message.contains("no output"));
        }
    }
}
