use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time;
use tracing::debug;

/// Trimmed stdout, or `""` on any failure.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, argv: &[String], timeout: Duration) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, argv: &[String], timeout: Duration) -> String {
        let Some((program, args)) = argv.split_first() else {
            return String::new();
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                debug!(command = %program, error = %err, "command failed to start");
                return String::new();
            }
            Err(_elapsed) => {
                debug!(command = %program, timeout_ms = timeout.as_millis() as u64, "command timed out");
                return String::new();
            }
        };

        if !output.status.success() {
            debug!(command = %program, status = %output.status, "command exited unsuccessfully");
            return String::new();
        }

        match String::from_utf8(output.stdout) {
            Ok(text) => text.trim().to_string(),
            Err(_) => {
                debug!(command = %program, "command output is not UTF-8");
                String::new()
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[tokio::test]
    async fn captures_trimmed_stdout() {
        let out = SystemCommandRunner
            .run(&argv(&["sh", "-c", "echo '  active  '"]), Duration::from_secs(5))
            .await;
        assert_eq!(out, "active");
    }

    #[tokio::test]
    async fn non_zero_exit_is_empty() {
        let out = SystemCommandRunner
            .run(&argv(&["sh", "-c", "echo inactive; exit 3"]), Duration::from_secs(5))
            .await;
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn missing_binary_and_empty_argv_are_empty() {
        let out = SystemCommandRunner
            .run(&argv(&["/nonexistent/pimonitord-test-binary"]), Duration::from_secs(5))
            .await;
        assert_eq!(out, "");
        assert_eq!(SystemCommandRunner.run(&[], Duration::from_secs(5)).await, "");
    }

    #[tokio::test]
    async fn timeout_is_empty() {
        let started = std::time::Instant::now();
        let out = SystemCommandRunner
            .run(&argv(&["sh", "-c", "sleep 5; echo late"]), Duration::from_millis(200))
            .await;
        assert_eq!(out, "");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn invalid_utf8_is_empty() {
        let out = SystemCommandRunner
            .run(&argv(&["sh", "-c", "printf '\\377\\376'"]), Duration::from_secs(5))
            .await;
        assert_eq!(out, "");
    }
}
