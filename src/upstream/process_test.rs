use std::time::Duration;

use tempfile::TempDir;

use crate::upstream::process::*;

fn invocation(program: &str, args: &[&str], dir: &TempDir, timeout: Duration) -> Invocation {
    Invocation {
        program: program.to_string(),
        args: args.iter().map(|s| s.to_string()).collect(),
        cwd: dir.path().to_path_buf(),
        timeout,
        env: Vec::new(),
    }
}

#[tokio::test]
async fn test_captures_stdout_stderr_and_exit_code() {
    let dir = TempDir::new().unwrap();
    let runner = TokioRunner::new();

    let output = runner
        .run(&invocation(
            "sh",
            &["-c", "echo out; echo err >&2; exit 3"],
            &dir,
            Duration::from_secs(5),
        ))
        .await
        .unwrap();

    assert_eq!(output.exit_code, Some(3));
    assert!(!output.success());
    assert_eq!(output.stdout.trim(), "out");
    assert_eq!(output.stderr.trim(), "err");
}

#[tokio::test]
async fn test_arguments_are_not_shell_interpreted() {
    let dir = TempDir::new().unwrap();
    let runner = TokioRunner::new();

    let output = runner
        .run(&invocation(
            "echo",
            &["$(touch pwned)", "; rm -rf ."],
            &dir,
            Duration::from_secs(5),
        ))
        .await
        .unwrap();

    assert!(output.success());
    assert_eq!(output.stdout.trim(), "$(touch pwned) ; rm -rf .");
    assert!(!dir.path().join("pwned").exists());
}

#[tokio::test]
async fn test_strips_ansi_escapes() {
    let dir = TempDir::new().unwrap();
    let runner = TokioRunner::new();

    let output = runner
        .run(&invocation(
            "printf",
            &["\\033[31mred\\033[0m"],
            &dir,
            Duration::from_secs(5),
        ))
        .await
        .unwrap();

    assert_eq!(output.stdout, "red");
}

#[tokio::test]
async fn test_missing_program() {
    let dir = TempDir::new().unwrap();
    let runner = TokioRunner::new();

    let err = runner
        .run(&invocation(
            "definitely-not-a-real-binary-4f2a",
            &[],
            &dir,
            Duration::from_secs(5),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::NotFound { .. }));
}

#[tokio::test]
async fn test_timeout_kills_child() {
    let dir = TempDir::new().unwrap();
    let runner = TokioRunner::new();

    let err = runner
        .run(&invocation(
            "sh",
            &["-c", "sleep 1 && touch finished"],
            &dir,
            Duration::from_millis(100),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, ProcessError::TimedOut { .. }));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(
        !dir.path().join("finished").exists(),
        "child should have been killed on timeout"
    );
}

#[tokio::test]
async fn test_extra_environment_reaches_the_child() {
    let dir = TempDir::new().unwrap();
    let runner = TokioRunner::new();
    let mut invocation = invocation(
        "sh",
        &["-c", "echo $TOOLBELT_MARKER"],
        &dir,
        Duration::from_secs(5),
    );
    invocation.env.push(("TOOLBELT_MARKER".to_string(), "set".to_string()));

    let output = runner.run(&invocation).await.unwrap();

    assert_eq!(output.stdout.trim(), "set");
}
