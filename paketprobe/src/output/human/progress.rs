use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Live progress on stderr; report lines printed through it stay above the bar.
pub(crate) struct HumanProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl HumanProgress {
    pub(crate) fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    /// Starts a bar counting up to `total`, or a spinner when `total` is unknown.
    pub(crate) fn start(&self, prefix: &str, total: Option<u64>) {
        let pb = match total {
            Some(total) => {
                let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr_with_hz(5));
                pb.set_style(bar_style());
                pb
            }
            None => {
                let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(5));
                pb.set_style(spinner_style());
                pb.enable_steady_tick(Duration::from_millis(120));
                pb
            }
        };
        pb.set_prefix(prefix.to_string());

        let mut bar = self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(old) = bar.replace(pb) {
            old.finish_and_clear();
        }
    }

    /// Prints `line` to stdout and advances the bar by one.
    pub(crate) fn println(&self, line: &str, message: String) {
        let bar = self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match bar.as_ref() {
            Some(pb) => {
                pb.suspend(|| println!("{line}"));
                pb.set_message(message);
                pb.inc(1);
            }
            None => println!("{line}"),
        }
    }

    pub(crate) fn finish(&self) {
        let mut bar = self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(pb) = bar.take() {
            pb.finish_and_clear();
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [ {bar:20.cyan/blue} ] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} {spinner} {pos} steps {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
