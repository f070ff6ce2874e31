//! Shared submit-and-poll skeleton for external job services.
//!
//! Submit once to get a job handle, then poll on an interval until the
//! job reaches a terminal state or a deadline elapses. The whole
//! submit+poll cycle is retried with exponential backoff
//! (`base * 2^(attempt-1)`) up to `max_retries` on the outer boundary —
//! not the inner poll loop, which only waits for one job to finish.

use std::time::Duration;

use async_trait::async_trait;

/// Outcome of a single poll.
pub enum JobState<T> {
    Pending,
    Succeeded(T),
    Failed(String),
}

/// One external job service, parameterized over its submit input and
/// terminal output. `submit`/`poll` return `anyhow::Error` for transport or
/// protocol failures; a job-level failure is reported as `JobState::Failed`,
/// not an `Err`, so the retry loop can tell "try again" from "ask again
/// later" apart.
#[async_trait]
pub trait JobAdapter: Send + Sync {
    type Input: Send + Sync;
    type Output: Send;

    /// Submit a job, returning an opaque handle (prediction id / job id).
    async fn submit(&self, input: &Self::Input) -> anyhow::Result<String>;

    /// Check on a previously submitted job.
    async fn poll(&self, handle: &str) -> anyhow::Result<JobState<Self::Output>>;

    /// Interval between polls.
    fn poll_interval(&self) -> Duration;

    /// Total wall-clock budget for one submit+poll cycle (§5: transcode and
    /// ASR are both 30 min).
    fn poll_deadline(&self) -> Duration;
}

/// Run one submit+poll cycle to completion or timeout.
async fn run_once<A: JobAdapter>(adapter: &A, input: &A::Input) -> anyhow::Result<A::Output> {
    let handle = adapter.submit(input).await?;
    let deadline = tokio::time::Instant::now() + adapter.poll_deadline();

    loop {
        match adapter.poll(&handle).await? {
            JobState::Succeeded(output) => return Ok(output),
            JobState::Failed(message) => {
                anyhow::bail!("job {handle} failed: {message}");
            }
            JobState::Pending => {
                if tokio::time::Instant::now() >= deadline {
                    anyhow::bail!("job {handle} timed out after {:?}", adapter.poll_deadline());
                }
                tokio::time::sleep(adapter.poll_interval()).await;
            }
        }
    }
}

/// Retry the entire submit+poll cycle up to `max_retries` times with
/// exponential backoff between attempts (§4.2, §5).
pub async fn run_with_retry<A: JobAdapter>(
    adapter: &A,
    input: A::Input,
    max_retries: u32,
    base_backoff: Duration,
) -> anyhow::Result<A::Output> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match run_once(adapter, &input).await {
            Ok(output) => return Ok(output),
            Err(err) => {
                if attempt >= max_retries {
                    return Err(err.context(format!("exhausted {max_retries} retries")));
                }
                let backoff = base_backoff * 2u32.pow(attempt - 1);
                tracing::warn!(attempt, error = %err, backoff_secs = backoff.as_secs(), "job attempt failed, retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyAdapter {
        fail_until_attempt: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl JobAdapter for FlakyAdapter {
        type Input = ();
        type Output = &'static str;

        async fn submit(&self, _input: &()) -> anyhow::Result<String> {
            Ok("handle-1".to_string())
        }

        async fn poll(&self, _handle: &str) -> anyhow::Result<JobState<&'static str>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.fail_until_attempt {
                Ok(JobState::Succeeded("done"))
            } else {
                Ok(JobState::Failed("transient".to_string()))
            }
        }

        fn poll_interval(&self) -> Duration {
            Duration::from_millis(1)
        }

        fn poll_deadline(&self) -> Duration {
            Duration::from_secs(5)
        }
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let adapter = FlakyAdapter {
            fail_until_attempt: 3,
            calls: Arc::new(AtomicU32::new(0)),
        };
        let result = run_with_retry(&adapter, (), 5, Duration::from_millis(1)).await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let adapter = FlakyAdapter {
            fail_until_attempt: 100,
            calls: Arc::new(AtomicU32::new(0)),
        };
        let result = run_with_retry(&adapter, (), 3, Duration::from_millis(1)).await;
        assert!(result.is_err());
    }
}
