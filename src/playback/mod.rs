//! Side-by-side access to a source stream and its watermarked copy.

pub mod state;

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::stream::{Frame, StreamError, StreamReader};
use crate::video::plane::ChromaFormat;
use crate::video::rgb::RgbImage;
use state::{Action, Effect, IllegalStateChange, PlayerState};

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    State(#[from] IllegalStateChange),
    #[error("streams do not match: source is {source_desc}, watermarked is {watermarked_desc}")]
    Mismatch {
        source_desc: String,
        watermarked_desc: String,
    },
}

/// One frame from each stream, converted for display. A `None` side means
/// that stream has run out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePair {
    pub index: u64,
    pub source: Option<RgbImage>,
    pub watermarked: Option<RgbImage>,
}

impl FramePair {
    /// Both frames are present.
    pub fn is_complete(&self) -> bool {
        self.source.is_some() && self.watermarked.is_some()
    }
}

/// Paired reader over a source stream and its watermarked copy.
pub struct ComparisonPlayer<R = File> {
    source: StreamReader<R>,
    watermarked: StreamReader<R>,
    state: PlayerState,
}

impl ComparisonPlayer<File> {
    pub fn open(source: &Path, watermarked: &Path) -> Result<Self, PlaybackError> {
        Self::new(StreamReader::open(source)?, StreamReader::open(watermarked)?)
    }
}

impl<R: Read + Seek> ComparisonPlayer<R> {
    /// Pair two readers. Both must share geometry and chroma format.
    pub fn new(source: StreamReader<R>, watermarked: StreamReader<R>) -> Result<Self, PlaybackError> {
        let describe = |r: &StreamReader<R>| format!("{}x{} {}", r.width(), r.height(), r.format());
        if (source.width(), source.height(), source.format())
            != (watermarked.width(), watermarked.height(), watermarked.format())
        {
            return Err(PlaybackError::Mismatch {
                source_desc: describe(&source),
                watermarked_desc: describe(&watermarked),
            });
        }

        let state = PlayerState::NotReady.transition(PlayerState::Ready)?;
        Ok(Self {
            source,
            watermarked,
            state,
        })
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn format(&self) -> ChromaFormat {
        self.source.format()
    }

    pub fn frame_count(&self) -> u64 {
        self.source.frame_count().min(self.watermarked.frame_count())
    }

    /// Rewind both streams and read the first pair.
    pub fn first(&mut self) -> Result<FramePair, PlaybackError> {
        self.rewind()?;
        self.next()
    }

    /// Read the pair at the current position and advance. When continuous
    /// playback hits the end, both streams rewind and the player returns
    /// to `Ready`.
    pub fn next(&mut self) -> Result<FramePair, PlaybackError> {
        let index = self.source.position()?;
        let source = self.source.next_frame()?;
        let watermarked = self.watermarked.next_frame()?;
        if source.is_some() != watermarked.is_some() {
            // one stream ran out: keep both cursors on the same frame
            self.source.seek_to_frame(index + 1)?;
            self.watermarked.seek_to_frame(index + 1)?;
        }
        let pair = FramePair {
            index,
            source: source.map(|f| self.to_rgb(&f)),
            watermarked: watermarked.map(|f| self.to_rgb(&f)),
        };

        if !pair.is_complete() && self.state.is_playing() {
            debug!("end of stream at frame {index}; rewinding");
            self.rewind()?;
            self.state = self.state.transition(PlayerState::Ready)?;
        }
        Ok(pair)
    }

    /// Step back one frame from the pair last returned.
    pub fn previous(&mut self) -> Result<FramePair, PlaybackError> {
        self.source.seek_relative(-2)?;
        self.watermarked.seek_relative(-2)?;
        self.next()
    }

    pub fn rewind(&mut self) -> Result<(), PlaybackError> {
        self.source.rewind_to_start()?;
        self.watermarked.rewind_to_start()?;
        Ok(())
    }

    /// Random access to frame `index`; the following `next` continues from there.
    pub fn get_frame(&mut self, index: u64) -> Result<FramePair, PlaybackError> {
        self.source.seek_to_frame(index)?;
        self.watermarked.seek_to_frame(index)?;
        self.next()
    }

    /// Press a control button. Stepping and stopping touch the streams
    /// here; pacing effects are returned for the caller to honour.
    pub fn perform(&mut self, action: Action) -> Result<(Option<Effect>, Option<FramePair>), PlaybackError> {
        let (to, effect) = self.state.apply(action)?;
        self.state = to;

        let pair = match effect {
            Some(Effect::StepForward) => Some(self.next()?),
            Some(Effect::StepBack) => Some(self.previous()?),
            Some(Effect::Stop) => {
                self.rewind()?;
                None
            }
            _ => None,
        };
        Ok((effect, pair))
    }

    fn to_rgb(&self, frame: &Frame) -> RgbImage {
        RgbImage::from_frame(&frame.data, self.source.width(), self.source.height(), self.source.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::tests::synthetic_stream;
    use std::io::Cursor;

    /// 8x8 4:4:4 stream of flat grey frames, each a different shade.
    fn grey_stream(frames: usize) -> Vec<u8> {
        let mut bytes = b"TEST W8 H8\n".to_vec();
        for i in 0..frames {
            bytes.extend_from_slice(b"FRAME\n");
            bytes.extend(std::iter::repeat(16 + 50 * i as u8).take(64));
            bytes.extend(std::iter::repeat(128u8).take(128));
        }
        bytes
    }

    fn uneven_player(source_frames: usize, watermarked_frames: usize) -> ComparisonPlayer<Cursor<Vec<u8>>> {
        let source = StreamReader::new(Cursor::new(grey_stream(source_frames))).unwrap();
        let watermarked = StreamReader::new(Cursor::new(grey_stream(watermarked_frames))).unwrap();
        ComparisonPlayer::new(source, watermarked).unwrap()
    }

    fn player(frames: usize) -> ComparisonPlayer<Cursor<Vec<u8>>> {
        uneven_player(frames, frames)
    }

    fn luma(pair: &FramePair) -> u32 {
        pair.source.as_ref().unwrap().packed_rgb(0, 0)
    }

    #[test]
    fn test_navigation() {
        let mut p = player(3);
        assert_eq!(p.state(), PlayerState::Ready);
        assert_eq!(p.frame_count(), 3);

        let f0 = p.first().unwrap();
        assert_eq!(f0.index, 0);
        assert!(f0.is_complete());
        assert_eq!(f0.source, f0.watermarked);

        let f1 = p.next().unwrap();
        assert_eq!(f1.index, 1);
        let f2 = p.next().unwrap();
        assert_eq!(f2.index, 2);
        assert_ne!(luma(&f1), luma(&f2));

        let back = p.previous().unwrap();
        assert_eq!(back.index, 1);
        assert_eq!(luma(&back), luma(&f1));

        let f0_again = p.get_frame(0).unwrap();
        assert_eq!(luma(&f0_again), luma(&f0));
    }

    #[test]
    fn test_previous_at_start_stays_on_first_frame() {
        let mut p = player(2);
        p.first().unwrap();
        let pair = p.previous().unwrap();
        assert_eq!(pair.index, 0);
    }

    #[test]
    fn test_end_of_stream_yields_empty_pair() {
        let mut p = player(1);
        p.first().unwrap();
        let end = p.next().unwrap();
        assert!(end.source.is_none() && end.watermarked.is_none());
        assert_eq!(p.state(), PlayerState::Ready);
    }

    #[test]
    fn test_playing_to_the_end_returns_to_ready() {
        let mut p = player(1);
        let (effect, _) = p.perform(Action::Play).unwrap();
        assert_eq!(effect, Some(Effect::Start));
        assert!(p.next().unwrap().is_complete());
        assert!(!p.next().unwrap().is_complete());
        assert_eq!(p.state(), PlayerState::Ready);
        assert_eq!(p.next().unwrap().index, 0);
    }

    #[test]
    fn test_step_controls() {
        let mut p = player(3);
        assert_eq!(p.perform(Action::Speed).unwrap(), (None, None));
        assert_eq!(p.state(), PlayerState::Ready);

        p.perform(Action::Play).unwrap();
        let (effect, pair) = p.perform(Action::Pause).unwrap();
        assert_eq!((effect, pair), (Some(Effect::Suspend), None));
        assert_eq!(p.state(), PlayerState::Paused);

        let (_, pair) = p.perform(Action::Speed).unwrap();
        assert_eq!(p.state(), PlayerState::Paused);
        assert_eq!(pair.unwrap().index, 0);
        let (_, pair) = p.perform(Action::Speed).unwrap();
        assert_eq!(pair.unwrap().index, 1);
        let (effect, pair) = p.perform(Action::Slow).unwrap();
        assert_eq!(effect, Some(Effect::StepBack));
        assert_eq!(pair.unwrap().index, 0);

        let (effect, pair) = p.perform(Action::Stop).unwrap();
        assert_eq!((effect, pair), (Some(Effect::Stop), None));
        assert_eq!(p.state(), PlayerState::Ready);
        assert_eq!(p.next().unwrap().index, 0);
    }

    #[test]
    fn test_shorter_watermarked_stream_keeps_cursors_together() {
        let mut p = uneven_player(3, 2);
        assert_eq!(p.frame_count(), 2);
        p.first().unwrap();
        let f1 = p.next().unwrap();
        let f2 = p.next().unwrap();
        assert_eq!(f2.index, 2);
        assert!(f2.source.is_some() && f2.watermarked.is_none());

        let back = p.previous().unwrap();
        assert_eq!(back.index, 1);
        assert!(back.is_complete());
        assert_eq!(luma(&back), luma(&f1));
        assert_eq!(back.source, back.watermarked);
    }

    #[test]
    fn test_mismatched_streams_rejected() {
        let a = StreamReader::new(Cursor::new(synthetic_stream(8, 8, ChromaFormat::Yuv444, 1))).unwrap();
        let b = StreamReader::new(Cursor::new(synthetic_stream(16, 16, ChromaFormat::Yuv444, 1))).unwrap();
        assert!(matches!(ComparisonPlayer::new(a, b), Err(PlaybackError::Mismatch { .. })));
    }
}
