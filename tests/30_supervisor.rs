mod common;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::time::timeout;

use pocketledger_gateway::supervisor::{Supervisor, UpstreamCommand};

fn marker(name: &str) -> PathBuf {
    common::temp_dir(name).join("marker")
}

#[tokio::test]
async fn crashing_process_is_restarted_repeatedly_without_cap() -> Result<()> {
    let marker = marker("crashloop");
    let command = UpstreamCommand::new(
        "sh",
        vec![
            "-c".to_string(),
            format!("echo tick >> '{}'; exit 1", marker.display()),
        ],
    );

    let (supervisor, _handle) = Supervisor::new(command, Duration::from_millis(25));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(supervisor.run(shutdown_rx));

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown_tx.send(true)?;
    timeout(Duration::from_secs(2), task).await???;

    let ticks = std::fs::read_to_string(&marker)?.lines().count();
    assert!(ticks >= 3, "expected repeated restart attempts, saw {}", ticks);
    Ok(())
}

#[tokio::test]
async fn clean_exit_ends_supervision_without_restart() -> Result<()> {
    let marker = marker("clean-exit");
    let command = UpstreamCommand::new(
        "sh",
        vec![
            "-c".to_string(),
            format!("echo done >> '{}'; exit 0", marker.display()),
        ],
    );

    let (supervisor, _handle) = Supervisor::new(command, Duration::from_millis(25));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    timeout(Duration::from_secs(2), supervisor.run(shutdown_rx)).await??;

    let runs = std::fs::read_to_string(&marker)?.lines().count();
    assert_eq!(runs, 1);
    Ok(())
}

#[tokio::test]
async fn shutdown_kills_the_child_before_returning() -> Result<()> {
    let command = UpstreamCommand::new("sh", vec!["-c".to_string(), "sleep 30".to_string()]);

    let (supervisor, mut handle_rx) = Supervisor::new(command, Duration::from_millis(25));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(supervisor.run(shutdown_rx));

    // Wait for the child to be published
    let pid = loop {
        if let Some(handle) = handle_rx.borrow_and_update().clone() {
            break handle.pid.expect("spawned child has a pid");
        }
        handle_rx.changed().await?;
    };

    shutdown_tx.send(true)?;
    timeout(Duration::from_secs(2), task).await???;

    // The child was killed and reaped, not orphaned
    #[cfg(target_os = "linux")]
    assert!(
        !std::path::Path::new(&format!("/proc/{}", pid)).exists(),
        "child process {} survived shutdown",
        pid
    );
    #[cfg(not(target_os = "linux"))]
    let _ = pid;
    Ok(())
}
