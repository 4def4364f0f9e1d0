#![cfg(unix)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use gke_port_forward::Error;
use gke_port_forward::error::StepError;
use gke_port_forward::plan::{CommandPlan, PlannedCommand};
use gke_port_forward::runner::{RunOptions, run_plan};
use tokio_util::sync::CancellationToken;

fn sh(label: &str, script: &str) -> PlannedCommand {
    PlannedCommand {
        label: label.to_string(),
        program: PathBuf::from("sh"),
        args: vec!["-c".to_string(), script.to_string()],
    }
}

fn options() -> RunOptions {
    RunOptions {
        shutdown_grace: Duration::from_secs(2),
    }
}

fn cancel_after(token: &CancellationToken, delay: Duration) {
    let token = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        token.cancel();
    });
}

#[tokio::test]
async fn runs_setup_steps_in_order_then_stops_forward_on_shutdown() {
    let temp = tempfile::tempdir().unwrap();
    let log = temp.path().join("steps.log");
    let log_str = log.display().to_string();
    let plan = CommandPlan {
        steps: vec![
            sh("first", &format!("echo one >> {log_str}")),
            sh("second", &format!("echo two >> {log_str}")),
            sh("forward", &format!("echo forward >> {log_str}; exec sleep 30")),
        ],
    };
    let token = CancellationToken::new();
    cancel_after(&token, Duration::from_millis(300));

    let started = Instant::now();
    run_plan(&plan, &token, &options()).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(
        std::fs::read_to_string(&log).unwrap(),
        "one\ntwo\nforward\n"
    );
}

#[tokio::test]
async fn halts_at_first_failing_step() {
    let temp = tempfile::tempdir().unwrap();
    let marker = temp.path().join("should-not-exist");
    let plan = CommandPlan {
        steps: vec![
            sh("ok", "true"),
            sh("fails", "exit 3"),
            sh("never", &format!("touch {}", marker.display())),
            sh("forward", "exec sleep 30"),
        ],
    };
    let token = CancellationToken::new();

    let err = run_plan(&plan, &token, &options()).await.unwrap_err();

    match err {
        Error::SubprocessFailure {
            index,
            command,
            source: StepError::Exit(status),
        } => {
            assert_eq!(index, 1);
            assert_eq!(command, "sh -c exit 3");
            assert_eq!(status.code(), Some(3));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!marker.exists());
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() {
    let plan = CommandPlan {
        steps: vec![
            PlannedCommand {
                label: "missing".to_string(),
                program: PathBuf::from("/nonexistent/gcloud"),
                args: vec![],
            },
            sh("forward", "exec sleep 30"),
        ],
    };
    let err = run_plan(&plan, &CancellationToken::new(), &options())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SubprocessFailure {
            index: 0,
            source: StepError::Spawn(_),
            ..
        }
    ));
}

#[tokio::test]
async fn failing_forward_is_reported() {
    let plan = CommandPlan {
        steps: vec![sh("setup", "true"), sh("forward", "exit 1")],
    };
    let err = run_plan(&plan, &CancellationToken::new(), &options())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SubprocessFailure {
            index: 1,
            source: StepError::Exit(_),
            ..
        }
    ));
}

#[tokio::test]
async fn forward_killed_by_the_shutdown_signal_is_a_clean_stop() {
    let plan = CommandPlan {
        steps: vec![sh("forward", "sleep 0.1; kill -TERM $$; sleep 5")],
    };
    let token = CancellationToken::new();
    cancel_after(&token, Duration::from_millis(250));

    run_plan(&plan, &token, &options()).await.unwrap();
}

#[tokio::test]
async fn forward_killed_by_a_signal_without_shutdown_is_reported() {
    let plan = CommandPlan {
        steps: vec![sh("forward", "kill -TERM $$; sleep 5")],
    };
    let err = run_plan(&plan, &CancellationToken::new(), &options())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::SubprocessFailure {
            index: 0,
            source: StepError::Exit(_),
            ..
        }
    ));
}

#[tokio::test]
async fn forward_that_exits_cleanly_still_waits_for_shutdown() {
    let plan = CommandPlan {
        steps: vec![sh("forward", "true")],
    };
    let token = CancellationToken::new();
    cancel_after(&token, Duration::from_millis(300));

    let started = Instant::now();
    run_plan(&plan, &token, &options()).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn forward_ignoring_sigterm_is_killed_after_grace() {
    let plan = CommandPlan {
        steps: vec![sh("forward", "trap '' TERM; while true; do sleep 0.1; done")],
    };
    let token = CancellationToken::new();
    cancel_after(&token, Duration::from_millis(200));
    let options = RunOptions {
        shutdown_grace: Duration::from_millis(300),
    };

    let started = Instant::now();
    run_plan(&plan, &token, &options).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn shutdown_during_setup_interrupts_run() {
    let temp = tempfile::tempdir().unwrap();
    let marker = temp.path().join("forward-started");
    let plan = CommandPlan {
        steps: vec![
            sh("slow", "exec sleep 30"),
            sh("forward", &format!("touch {}; exec sleep 30", marker.display())),
        ],
    };
    let token = CancellationToken::new();
    cancel_after(&token, Duration::from_millis(200));

    let err = run_plan(&plan, &token, &options()).await.unwrap_err();
    assert!(matches!(err, Error::Interrupted { index: 0, .. }));
    assert!(!marker.exists());
}

#[tokio::test]
async fn empty_plan_is_a_no_op() {
    let plan = CommandPlan { steps: vec![] };
    run_plan(&plan, &CancellationToken::new(), &options())
        .await
        .unwrap();
}
