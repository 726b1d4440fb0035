use std::io::{Read, Seek, Write};
use std::path::Path;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rayon::prelude::*;

use crate::config::WatermarkConfig;
use crate::modifier::CoefficientModifier;
use crate::stream::{Frame, StreamError, StreamReader, StreamWriter};
use crate::video::plane::{ChromaFormat, FrameWatermarker};

/// What a completed run processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSummary {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
    pub format: ChromaFormat,
}

/// Full watermark pipeline: source stream -> per-frame DCT perturbation -> output stream.
///
/// The modification settings are validated before the output file is
/// created. A failure after that leaves a truncated output behind.
pub fn watermark_file(input: &Path, output: &Path, cfg: &WatermarkConfig) -> Result<WatermarkSummary, StreamError> {
    cfg.settings.validate()?;

    info!("opening source stream: {}", input.display());
    let mut reader = StreamReader::open(input)?;

    info!("writing watermarked stream: {}", output.display());
    let file = std::fs::File::create(output)?;

    match watermark_stream(&mut reader, file, cfg) {
        Ok((summary, _)) => Ok(summary),
        Err(e) => {
            warn!("watermarking stopped: {e}; {} is incomplete", output.display());
            Err(e)
        }
    }
}

/// Watermark every frame of `reader` into `output`, copying the stream and
/// frame headers verbatim. Returns the summary and the flushed writer.
///
/// Frames are transformed in parallel batches and written in source order.
/// Each frame draws from its own generator, seeded from the run's master
/// generator, so a seeded run produces identical output on any thread count.
pub fn watermark_stream<R: Read + Seek, W: Write>(
    reader: &mut StreamReader<R>,
    output: W,
    cfg: &WatermarkConfig,
) -> Result<(WatermarkSummary, W), StreamError> {
    let modifier = CoefficientModifier::new(cfg.settings.clone())?;
    let header = reader.header().clone();
    let format = reader.format();
    let total = reader.frame_count();
    info!(
        "{}x{} {}, {} frames of {} bytes",
        header.width,
        header.height,
        format,
        total,
        reader.frame_length()
    );
    info!(
        "modifying zigzag coefficients {}..={} ({} {}) on {}{}{}",
        cfg.settings.range_init,
        cfg.settings.range_end,
        cfg.settings.mod_type,
        cfg.settings.mod_step,
        if cfg.components.y { "Y" } else { "" },
        if cfg.components.u { "U" } else { "" },
        if cfg.components.v { "V" } else { "" },
    );

    let watermarker = FrameWatermarker::new(reader.width(), reader.height(), format, cfg.components, modifier);
    let mut writer = StreamWriter::new(output, &header)?;

    let mut master = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let progress = super::frame_progress(total, cfg.progress);

    // Batch size matches the rayon pool so every core is busy while at most
    // `threads` frames are held in memory.
    let batch_size = rayon::current_num_threads().max(1);
    let mut pending_error = None;
    loop {
        let mut batch: Vec<(Frame, u64)> = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            match reader.read_frame() {
                Ok(Some(frame)) => batch.push((frame, master.next_u64())),
                Ok(None) => break,
                Err(e) => {
                    pending_error = Some(e);
                    break;
                }
            }
        }
        if batch.is_empty() {
            break;
        }

        batch.par_iter_mut().try_for_each(|(frame, seed)| {
            let mut rng = StdRng::seed_from_u64(*seed);
            watermarker.watermark_frame(&mut frame.data, &mut rng)
        })?;

        for (frame, _) in &batch {
            writer.write_frame(frame)?;
        }
        progress.inc(batch.len() as u64);
        debug!("wrote {} frames", writer.frames_written());

        if pending_error.is_some() {
            break;
        }
    }
    progress.finish_with_message("watermarking complete");

    let frames = writer.frames_written();
    let output = writer.finish()?;
    if let Some(e) = pending_error {
        return Err(e);
    }

    info!("watermark complete: {frames} frames");
    Ok((
        WatermarkSummary {
            frames,
            width: header.width,
            height: header.height,
            format,
        },
        output,
    ))
}
