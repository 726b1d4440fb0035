use std::io::{Read, Seek};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::stream::StreamReader;
use crate::video::plane::ChromaFormat;

/// Byte-level difference statistics for one plane across a stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaneDiff {
    pub samples: u64,
    pub changed: u64,
    pub max_abs_diff: u8,
    pub sum_squared: f64,
}

impl PlaneDiff {
    fn accumulate(&mut self, a: &[u8], b: &[u8]) {
        for (&x, &y) in a.iter().zip(b) {
            let d = x.abs_diff(y);
            if d != 0 {
                self.changed += 1;
                self.max_abs_diff = self.max_abs_diff.max(d);
                self.sum_squared += f64::from(d) * f64::from(d);
            }
        }
        self.samples += a.len().min(b.len()) as u64;
    }

    pub fn mse(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.sum_squared / self.samples as f64
        }
    }

    /// Peak signal-to-noise ratio in dB. `None` when the planes are identical.
    pub fn psnr(&self) -> Option<f64> {
        let mse = self.mse();
        (mse > 0.0).then(|| 10.0 * (255.0 * 255.0 / mse).log10())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub frames: u64,
    pub format: ChromaFormat,
    /// Frames whose header lines differ.
    pub header_mismatches: u64,
    pub y: PlaneDiff,
    pub u: PlaneDiff,
    pub v: PlaneDiff,
}

/// Compare a source stream with its watermarked copy frame by frame.
pub fn compare_streams(source: &Path, watermarked: &Path) -> Result<ComparisonReport> {
    let mut a = StreamReader::open(source)
        .with_context(|| format!("failed to open source stream {}", source.display()))?;
    let mut b = StreamReader::open(watermarked)
        .with_context(|| format!("failed to open watermarked stream {}", watermarked.display()))?;
    compare_readers(&mut a, &mut b)
}

pub fn compare_readers<R: Read + Seek>(a: &mut StreamReader<R>, b: &mut StreamReader<R>) -> Result<ComparisonReport> {
    if (a.width(), a.height(), a.format()) != (b.width(), b.height(), b.format()) {
        bail!(
            "stream geometry differs: {}x{} {} vs {}x{} {}",
            a.width(),
            a.height(),
            a.format(),
            b.width(),
            b.height(),
            b.format()
        );
    }
    if a.frame_count() != b.frame_count() {
        warn!(
            "frame counts differ ({} vs {}); comparing the common prefix",
            a.frame_count(),
            b.frame_count()
        );
    }

    let format = a.format();
    let y_size = a.width() * a.height();
    let uv_size = format.chroma_size(a.width(), a.height());

    let mut report = ComparisonReport {
        frames: 0,
        format,
        header_mismatches: 0,
        y: PlaneDiff::default(),
        u: PlaneDiff::default(),
        v: PlaneDiff::default(),
    };

    while let (Some(fa), Some(fb)) = (a.next_frame()?, b.next_frame()?) {
        if fa.header != fb.header {
            report.header_mismatches += 1;
        }
        let (ya, ua, va) = planes(&fa.data, y_size, uv_size);
        let (yb, ub, vb) = planes(&fb.data, y_size, uv_size);
        report.y.accumulate(ya, yb);
        report.u.accumulate(ua, ub);
        report.v.accumulate(va, vb);
        report.frames += 1;
    }

    info!("compared {} frames", report.frames);
    Ok(report)
}

fn planes(data: &[u8], y_size: usize, uv_size: usize) -> (&[u8], &[u8], &[u8]) {
    let (y, rest) = data.split_at(y_size);
    let (u, v) = rest.split_at(uv_size);
    (y, u, v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatermarkConfig;
    use crate::pipeline::watermark::watermark_stream;
    use crate::stream::tests::synthetic_stream;
    use std::io::Cursor;

    #[test]
    fn test_identical_streams() {
        let bytes = synthetic_stream(16, 16, ChromaFormat::Yuv422, 3);
        let mut a = StreamReader::new(Cursor::new(bytes.clone())).unwrap();
        let mut b = StreamReader::new(Cursor::new(bytes)).unwrap();
        let report = compare_readers(&mut a, &mut b).unwrap();
        assert_eq!(report.frames, 3);
        assert_eq!(report.y.samples, 3 * 256);
        assert_eq!(report.u.samples, 3 * 64);
        assert_eq!(report.y.changed, 0);
        assert_eq!(report.y.psnr(), None);
    }

    #[test]
    fn test_watermarked_luma_differs() {
        let mut bytes = b"YUV4MPEG2 W16 H16\n".to_vec();
        for f in 0..2usize {
            bytes.extend_from_slice(b"FRAME\n");
            bytes.extend((0..768).map(|i| (50 + (i + f) % 30) as u8));
        }
        let mut reader = StreamReader::new(Cursor::new(bytes.clone())).unwrap();
        let (_, marked) = watermark_stream(&mut reader, Vec::new(), &WatermarkConfig::default()).unwrap();

        let mut a = StreamReader::new(Cursor::new(bytes)).unwrap();
        let mut b = StreamReader::new(Cursor::new(marked)).unwrap();
        let report = compare_readers(&mut a, &mut b).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.header_mismatches, 0);
        assert!(report.y.changed > 0);
        assert!(report.y.max_abs_diff > 0);
        assert!(report.y.psnr().unwrap() > 20.0);
        assert_eq!(report.u.changed, 0);
        assert_eq!(report.v.changed, 0);
    }

    #[test]
    fn test_geometry_mismatch() {
        let mut a = StreamReader::new(Cursor::new(synthetic_stream(8, 8, ChromaFormat::Yuv444, 1))).unwrap();
        let mut b = StreamReader::new(Cursor::new(synthetic_stream(16, 16, ChromaFormat::Yuv444, 1))).unwrap();
        assert!(compare_readers(&mut a, &mut b).is_err());
    }

    #[test]
    fn test_psnr() {
        let mut diff = PlaneDiff::default();
        diff.accumulate(&[10, 10, 10, 10], &[12, 10, 10, 10]);
        assert_eq!(diff.changed, 1);
        assert_eq!(diff.max_abs_diff, 2);
        assert!((diff.mse() - 1.0).abs() < 1e-12);
        assert!((diff.psnr().unwrap() - 48.1308).abs() < 1e-3);
    }
}
