use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use timelapse_engine::ProgressEvent;

fn download_style() -> Option<ProgressStyle> {
    ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise}] [{bar:40.green/white}] {bytes}/{total_bytes} @ {bytes_per_sec}")
        .map(|style| style.progress_chars("=> "))
        .ok()
}

/// Draws one progress bar per transferred file
pub struct ProgressManager {
    bar: Option<ProgressBar>,
    disabled: bool,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            bar: None,
            disabled: false,
        }
    }

    pub fn new_disabled() -> Self {
        Self {
            bar: None,
            disabled: true,
        }
    }

    pub fn handle_event(&mut self, event: ProgressEvent) {
        if self.disabled {
            return;
        }

        match event {
            ProgressEvent::TransferStarted {
                name,
                index,
                total,
                size,
            } => {
                let bar = ProgressBar::new(size);
                if let Some(style) = download_style() {
                    bar.set_style(style);
                }
                bar.set_message(format!("[{index}/{total}] {name}"));
                bar.enable_steady_tick(Duration::from_millis(500));
                if let Some(previous) = self.bar.replace(bar) {
                    previous.abandon();
                }
            }
            ProgressEvent::BytesWritten { bytes, .. } => {
                if let Some(bar) = self.bar.as_ref() {
                    bar.set_position(bytes);
                }
            }
            ProgressEvent::TransferFinished { success, .. } => {
                if let Some(bar) = self.bar.take() {
                    if success {
                        bar.finish();
                    } else {
                        bar.abandon();
                    }
                }
            }
        }
    }

    #[inline]
    #[allow(unused)]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}
