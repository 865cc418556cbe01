//! Golden snapshot tests for the built-in formatters
//!
//! Each test drives a formatter through a fixed sequence of reporter events (with fixed timings) and
//! compares the full report against an inline snapshot.
//!
//! Review changes: `cargo insta review`

use std::time::Duration;

use specrun::formatters::{self, FormatterKind, FormatterOptions};
use specrun::specrun_core::{ExampleReport, ExampleStatus, Failure, GroupReport, Reporter};

fn example(description: &str, full: &str, line: u32, depth: usize, status: ExampleStatus, millis: u64) -> ExampleReport {
    ExampleReport {
        description: description.to_string(),
        full_description: full.to_string(),
        location: format!("spec/stack_spec.rs:{}", line),
        depth,
        status,
        run_time: Duration::from_millis(millis),
    }
}

/// A stack spec with one passing, one failing and one pending example.
fn drive(reporter: &mut dyn Reporter) {
    reporter.start(3).unwrap();
    reporter
        .example_group_started(&GroupReport {
            description: "Stack".to_string(),
            depth: 0,
        })
        .unwrap();
    reporter
        .example_finished(&example("pushes", "Stack pushes", 4, 1, ExampleStatus::Passed, 250))
        .unwrap();
    reporter
        .example_group_started(&GroupReport {
            description: "when empty".to_string(),
            depth: 1,
        })
        .unwrap();
    reporter
        .example_finished(&example(
            "pops nothing",
            "Stack when empty pops nothing",
            9,
            2,
            ExampleStatus::Failed(Failure::with_backtrace("expected nil, got 3", Vec::new())),
            500,
        ))
        .unwrap();
    reporter
        .example_finished(&example(
            "peeks",
            "Stack when empty peeks",
            12,
            2,
            ExampleStatus::Pending("Not Yet Implemented".to_string()),
            0,
        ))
        .unwrap();
    reporter.start_dump(Duration::from_millis(1250)).unwrap();
    reporter.dump_failures().unwrap();
    reporter.dump_summary().unwrap();
    reporter.dump_pending().unwrap();
    reporter.close().unwrap();
}

fn report(kind: FormatterKind, options: FormatterOptions) -> String {
    let mut out: Vec<u8> = Vec::new();
    {
        let mut reporter = formatters::build(kind, options, &mut out);
        drive(reporter.as_mut());
    }
    String::from_utf8(out).unwrap()
}

#[test]
fn test_progress_report() {
    let output = report(FormatterKind::Progress, FormatterOptions::default());
    insta::assert_snapshot!(output.trim(), @r"
.F*

1)
'Stack when empty pops nothing' FAILED
expected nil, got 3
# spec/stack_spec.rs:9

Finished in 1.25 seconds

3 examples, 1 failure, 1 pending

Pending:
Stack when empty peeks (Not Yet Implemented)
  # spec/stack_spec.rs:12
");
}

#[test]
fn test_documentation_report() {
    let output = report(FormatterKind::Documentation, FormatterOptions::default());
    insta::assert_snapshot!(output.trim(), @r"
Stack
  pushes
  when empty
    pops nothing (FAILED - 1)
    peeks (PENDING: Not Yet Implemented)


1)
'Stack when empty pops nothing' FAILED
expected nil, got 3
# spec/stack_spec.rs:9

Finished in 1.25 seconds

3 examples, 1 failure, 1 pending

Pending:
Stack when empty peeks (Not Yet Implemented)
  # spec/stack_spec.rs:12
");
}

#[test]
fn test_profile_lists_slowest_examples_first() {
    let options = FormatterOptions {
        profile: true,
        ..FormatterOptions::default()
    };
    let output = report(FormatterKind::Progress, options);
    let profile: Vec<&str> = output
        .lines()
        .skip_while(|line| !line.starts_with("Top "))
        .take(4)
        .collect();
    assert_eq!(
        profile,
        vec![
            "Top 3 slowest examples:",
            "0.5000000 seconds Stack when empty pops nothing",
            "0.2500000 seconds Stack pushes",
            "0.0000000 seconds Stack when empty peeks",
        ]
    );
}

#[test]
fn test_colour_summary_is_red_when_anything_failed() {
    let options = FormatterOptions {
        color: true,
        ..FormatterOptions::default()
    };
    let output = report(FormatterKind::Progress, options);
    assert!(output.starts_with("\x1b[32m.\x1b[0m\x1b[31mF\x1b[0m\x1b[33m*\x1b[0m"));
    assert!(output.contains("\x1b[31m3 examples, 1 failure, 1 pending\x1b[0m"));
}
