pub mod compare;
pub mod watermark;

use indicatif::{ProgressBar, ProgressStyle};

pub use compare::{compare_streams, ComparisonReport, PlaneDiff};
pub use watermark::{watermark_file, watermark_stream, WatermarkSummary};

/// Progress bar over `len` frames, or a hidden one when disabled.
fn frame_progress(len: u64, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let progress = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta})")
    {
        progress.set_style(style.progress_chars("##-"));
    }
    progress
}
