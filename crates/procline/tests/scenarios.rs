//! End-to-end scenarios against real `/bin/sh` children

#![cfg(unix)]

use std::time::{Duration, Instant};

use procline::{ReadOutcome, SpawnConfig, Supervisor, SupervisorError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn sh(script: &str) -> SpawnConfig {
    SpawnConfig::new("/bin/sh").args(["-c", script])
}

#[tokio::test]
async fn matched_prefix_ends_read_early() {
    init_tracing();
    let mut sup = Supervisor::new(sh("sleep 0.2; echo readyok; sleep 30"));
    sup.spawn().unwrap();

    let result = sup
        .read_until(Duration::from_millis(2000), "readyok")
        .await
        .unwrap();
    assert_eq!(result.outcome, ReadOutcome::Matched);
    assert_eq!(result.lines, vec!["readyok"]);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn silent_child_times_out_promptly() {
    init_tracing();
    let mut sup = Supervisor::new(sh("sleep 30"));
    sup.spawn().unwrap();

    let started = Instant::now();
    let result = sup.read_lines(Duration::from_millis(100)).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::TimedOut);
    assert!(result.lines.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn instant_exit_reports_closed() {
    init_tracing();
    let mut sup = Supervisor::new(sh(":"));
    sup.spawn().unwrap();

    let result = sup.read_lines(Duration::from_millis(1000)).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::Closed);
    assert!(result.lines.is_empty());
}

#[tokio::test]
async fn shutdown_leaves_no_process_behind() {
    init_tracing();
    let mut sup = Supervisor::new(sh("sleep 60"));
    let pid = sup.spawn().unwrap();
    sup.shutdown().await.unwrap();

    // Signal-0 probe: the pid must be gone from the process table.
    let probe = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None);
    assert!(probe.is_err());
    assert!(sup.pid().is_none());

    // Repeated teardown is a no-op.
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn send_appends_exactly_one_newline() {
    init_tracing();
    let mut sup = Supervisor::new(sh("while read line; do printf 'got:%s\\n' \"$line\"; done"));
    sup.spawn().unwrap();

    // No trailing newline: one gets appended.
    sup.send("isready").await.unwrap();
    let result = sup
        .read_until(Duration::from_secs(5), "got:")
        .await
        .unwrap();
    assert_eq!(result.outcome, ReadOutcome::Matched);
    assert_eq!(result.lines, vec!["got:isready"]);

    // Already newline-terminated: no second newline, so no blank command line
    // reaches the child and the follow-up read times out empty.
    sup.send("ping\n").await.unwrap();
    let result = sup.read_until(Duration::from_secs(5), "got:").await.unwrap();
    assert_eq!(result.lines, vec!["got:ping"]);
    let result = sup.read_lines(Duration::from_millis(200)).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::TimedOut);
    assert!(result.lines.is_empty());

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn embedded_newlines_become_separate_commands() {
    init_tracing();
    let mut sup = Supervisor::new(sh("while read line; do printf 'got:%s\\n' \"$line\"; done"));
    sup.spawn().unwrap();

    sup.send("position startpos\ngo depth 1").await.unwrap();
    let result = sup
        .read_until(Duration::from_secs(5), "got:go")
        .await
        .unwrap();
    assert_eq!(result.outcome, ReadOutcome::Matched);
    assert_eq!(
        result.lines,
        vec!["got:position startpos", "got:go depth 1"]
    );

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn liveness_flips_false_after_exit_and_stays_false() {
    init_tracing();
    let mut sup = Supervisor::new(sh(":"));
    sup.spawn().unwrap();

    // Wait for the child to be gone, bounded.
    let deadline = Instant::now() + Duration::from_secs(5);
    while sup.is_alive().unwrap() {
        assert!(Instant::now() < deadline, "child never exited");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(!sup.is_alive().unwrap());
    assert!(sup.pid().is_none());
    let err = sup.send("isready").await.unwrap_err();
    assert!(matches!(err, SupervisorError::NotRunning));
}

#[tokio::test]
async fn output_written_before_exit_survives_the_reap() {
    init_tracing();
    let mut sup = Supervisor::new(sh("echo bestmove e2e4"));
    sup.spawn().unwrap();

    // Collect the exit status first, then drain what the child left behind.
    let deadline = Instant::now() + Duration::from_secs(5);
    while sup.is_alive().unwrap() {
        assert!(Instant::now() < deadline, "child never exited");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(sup.pid().is_none());

    let result = sup.read_lines(Duration::from_millis(500)).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::Closed);
    assert_eq!(result.lines, vec!["bestmove e2e4"]);
}

#[tokio::test]
async fn zero_timeout_uses_the_bounded_default() {
    init_tracing();
    let config = sh("sleep 30").default_read_timeout(Duration::from_millis(100));
    let mut sup = Supervisor::new(config);
    sup.spawn().unwrap();

    let started = Instant::now();
    let result = sup.read_lines(Duration::ZERO).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::TimedOut);
    assert!(result.lines.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn relaunch_after_confirmed_death() {
    init_tracing();
    let mut sup = Supervisor::new(sh("echo one"));
    sup.spawn().unwrap();
    let result = sup.read_lines(Duration::from_secs(5)).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::Closed);
    assert_eq!(result.lines, vec!["one"]);

    while sup.is_alive().unwrap() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // Same handle, second launch.
    sup.spawn().unwrap();
    let result = sup.read_lines(Duration::from_secs(5)).await.unwrap();
    assert_eq!(result.lines, vec!["one"]);
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn spawn_twice_is_rejected_while_running() {
    init_tracing();
    let mut sup = Supervisor::new(sh("sleep 30"));
    sup.spawn().unwrap();
    assert!(matches!(sup.spawn(), Err(SupervisorError::AlreadyRunning)));
    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn spawn_failure_is_surfaced() {
    init_tracing();
    let mut sup = Supervisor::new(SpawnConfig::new("/nonexistent/engine"));
    assert!(matches!(sup.spawn(), Err(SupervisorError::SpawnFailed(_))));
    assert!(!sup.is_alive().unwrap());
}

#[tokio::test]
async fn unterminated_tail_is_flushed_at_timeout() {
    init_tracing();
    let mut sup = Supervisor::new(sh("printf 'info depth 12'; sleep 30"));
    sup.spawn().unwrap();

    let result = sup.read_lines(Duration::from_millis(500)).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::TimedOut);
    assert_eq!(result.lines, vec!["info depth 12"]);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn unterminated_tail_is_flushed_at_eof() {
    init_tracing();
    let mut sup = Supervisor::new(sh("printf 'bestmove e2e4'"));
    sup.spawn().unwrap();

    let result = sup.read_lines(Duration::from_secs(5)).await.unwrap();
    assert_eq!(result.outcome, ReadOutcome::Closed);
    assert_eq!(result.lines, vec!["bestmove e2e4"]);
}

#[tokio::test]
async fn lines_after_a_match_wait_for_the_next_read() {
    init_tracing();
    let mut sup = Supervisor::new(sh("echo uciok; sleep 0.3; echo readyok; sleep 30"));
    sup.spawn().unwrap();

    let result = sup
        .read_until(Duration::from_secs(5), "uciok")
        .await
        .unwrap();
    assert_eq!(result.outcome, ReadOutcome::Matched);
    assert_eq!(result.lines, vec!["uciok"]);

    let result = sup
        .read_until(Duration::from_secs(5), "readyok")
        .await
        .unwrap();
    assert_eq!(result.outcome, ReadOutcome::Matched);
    assert_eq!(result.lines, vec!["readyok"]);

    sup.shutdown().await.unwrap();
}

#[tokio::test]
async fn mirror_subscribers_see_every_line() {
    init_tracing();
    let mut sup = Supervisor::new(sh("echo alpha; echo beta"));
    let mut rx = sup.mirror().subscribe();
    sup.mirror_mut().set_echo(true);
    sup.spawn().unwrap();

    let result = sup.read_lines(Duration::from_secs(5)).await.unwrap();
    assert_eq!(result.lines, vec!["alpha", "beta"]);

    assert_eq!(rx.recv().await.unwrap(), "alpha");
    assert_eq!(rx.recv().await.unwrap(), "beta");
}

#[tokio::test]
async fn shutdown_without_spawn_is_a_noop() {
    init_tracing();
    let mut sup = Supervisor::new(sh("sleep 30"));
    sup.shutdown().await.unwrap();
    assert!(!sup.is_alive().unwrap());
}
