//! Terminal live view of a running render.
//!
//! Polls the session on a fixed frame interval and shows the tile iteration
//! range on a progress bar. With a preview target set, every Nth frame is
//! also written out as an image.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use lumen_core::{export_image, ImageFormat};
use lumen_renderer::{RenderSession, SamplePolicy};

const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Where and how often to write in-progress frames.
#[derive(Debug, Clone)]
pub struct PreviewTarget {
    pub path: PathBuf,
    pub format: ImageFormat,
    pub every: u64,
}

/// Why the display loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Finished,
    TimeLimit,
}

pub struct Display {
    bar: ProgressBar,
    frame: u64,
    preview: Option<PreviewTarget>,
}

impl Display {
    pub fn new(samples: SamplePolicy, preview: Option<PreviewTarget>) -> Result<Self> {
        let bar = match samples {
            SamplePolicy::Passes(n) => {
                let bar = ProgressBar::new(n as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("{bar:40} {pos}/{len} passes  {msg}  [{elapsed_precise}]")?,
                );
                bar
            }
            SamplePolicy::Progressive => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner} {msg}  [{elapsed_precise}]")?,
                );
                bar
            }
        };

        Ok(Self {
            bar,
            frame: 0,
            preview,
        })
    }

    /// Refresh until every worker is done or `time_limit` runs out, then
    /// cancel and join the session.
    pub fn run(&mut self, session: &mut RenderSession, time_limit: Option<Duration>) -> Result<StopReason> {
        let start = Instant::now();

        let reason = loop {
            thread::sleep(FRAME_INTERVAL);
            self.present(session)?;

            if session.is_finished() {
                break StopReason::Finished;
            }
            if time_limit.is_some_and(|limit| start.elapsed() >= limit) {
                log::info!("Time limit reached after {:.1?}, cancelling", start.elapsed());
                break StopReason::TimeLimit;
            }
        };

        session.join()?;
        self.present(session)?;
        self.bar.finish();

        let (min, max) = session.iteration_range();
        log::info!(
            "Rendered {}..{} passes per tile in {:.2?}",
            min,
            max,
            start.elapsed()
        );
        Ok(reason)
    }

    fn present(&mut self, session: &RenderSession) -> Result<()> {
        self.frame += 1;
        let (min, max) = session.iteration_range();

        self.bar.set_position(min as u64);
        self.bar.set_message(overlay_text(self.frame, min, max, session.thread_count()));
        self.bar.tick();

        if let Some(preview) = &self.preview {
            if self.frame % preview.every == 0 {
                let buffer = session.buffer();
                export_image(
                    &preview.path,
                    preview.format,
                    &buffer.snapshot(),
                    buffer.width(),
                    buffer.height(),
                )
                .with_context(|| format!("Failed to write preview {}", preview.path.display()))?;
            }
        }
        Ok(())
    }
}

fn overlay_text(frame: u64, min: u32, max: u32, threads: usize) -> String {
    format!("frame {} | iterations {}..{} | {} threads", frame, min, max, threads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_text() {
        assert_eq!(
            overlay_text(12, 3, 5, 8),
            "frame 12 | iterations 3..5 | 8 threads"
        );
    }
}
