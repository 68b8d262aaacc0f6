use std::{
    future::Future,
    time::{Duration, Instant},
};

use anyhow::Result;
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

use crate::exit;

lazy_static::lazy_static! {
    static ref DOTS_STYLE: ProgressStyle = ProgressStyle::with_template("{spinner} {msg} {elapsed_precise}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    static ref GREEN_TICK: StyledObject<&'static str> = style("✔").green();
    static ref RED_CROSS: StyledObject<&'static str> = style("✗").red();
}

pub fn progress(msg: &str) -> ProgressBar {
    let w = ProgressBar::new_spinner();
    w.set_style(DOTS_STYLE.clone());
    w.enable_steady_tick(Duration::from_millis(80));
    w.set_message(msg.to_owned());
    w
}

/// Awaits `task` behind a spinner showing `msgs[0]`. On failure logs
/// `msgs[1]` and returns the error, on success prints `msgs[2]` with the
/// elapsed time. `verbose` disables the spinner so log lines stay readable.
pub async fn with_progress<T, E, F>(
    task: F,
    verbose: bool,
    msgs: [&str; 3],
    context: &str,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let pb = (!verbose).then(|| progress(&format!("{} ({context})", msgs[0])));

    let start_time = Instant::now();
    let output = task.await;
    let dur = start_time.elapsed();
    match output {
        Ok(value) => {
            finish_progress(msgs[2], context, dur, pb);
            Ok(value)
        }
        Err(err) => {
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            exit!(err, "{} {}", RED_CROSS.to_string(), msgs[1]);
        }
    }
}

fn elapsed_time_str(dur: &Duration) -> String {
    let seconds = dur.as_secs() % 60;
    let minutes = (dur.as_secs() / 60) % 60;
    let hours = (dur.as_secs() / 60) / 60;
    format!("{:0>2}:{:0>2}:{:0>2}", hours, minutes, seconds)
}

pub fn finish_progress(
    status_message: &str,
    context: &str,
    dur: Duration,
    pb: Option<ProgressBar>,
) {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    println!(
        "{} {} ({}) took {}",
        GREEN_TICK.to_string(),
        status_message,
        context,
        elapsed_time_str(&dur)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_is_zero_padded() {
        assert_eq!(elapsed_time_str(&Duration::from_secs(3725)), "01:02:05");
        assert_eq!(elapsed_time_str(&Duration::from_secs(59)), "00:00:59");
    }

    #[tokio::test]
    async fn with_progress_passes_the_value_through() {
        let v = with_progress(
            async { Ok::<_, std::io::Error>(7) },
            true,
            ["a", "b", "c"],
            "test",
        )
        .await
        .unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn with_progress_keeps_the_error() {
        let err = with_progress(
            async { Err::<(), _>(crate::Error::validation("bad")) },
            true,
            ["a", "b", "c"],
            "test",
        )
        .await
        .unwrap_err();
        assert!(err.downcast_ref::<crate::Error>().is_some());
    }
}
