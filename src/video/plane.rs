//! Per-frame plane extraction/reassembly and the block-wise watermark pass.
//!
//! Chroma planes follow this tool's own subsampling arithmetic: "4:2:2"
//! halves both dimensions and "4:2:0" quarters both, so existing streams
//! keep their byte layout.

use std::fmt;

use rand::RngCore;

use crate::config::{Components, BLOCK_SIZE};
use crate::modifier::{CoefficientModifier, ModifyError};
use crate::video::dct::{self, Block8x8, ScaledQuantTable};
use crate::video::round_half_up;

/// Chroma layout of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromaFormat {
    Yuv444,
    Yuv422,
    Yuv420,
}

impl ChromaFormat {
    /// Order in which candidates are tried when detecting a stream's format.
    pub const DETECTION_ORDER: [ChromaFormat; 3] =
        [ChromaFormat::Yuv422, ChromaFormat::Yuv420, ChromaFormat::Yuv444];

    /// Divisor applied to each luma dimension to get the chroma dimension.
    pub fn subsampling(self) -> usize {
        match self {
            Self::Yuv444 => 1,
            Self::Yuv422 => 2,
            Self::Yuv420 => 4,
        }
    }

    /// `(width, height)` of the U and V planes.
    pub fn chroma_dims(self, width: usize, height: usize) -> (usize, usize) {
        let s = self.subsampling();
        (width / s, height / s)
    }

    /// Bytes reserved for each of U and V in a packed frame.
    pub fn chroma_size(self, width: usize, height: usize) -> usize {
        let s = self.subsampling();
        width * height / (s * s)
    }

    /// Bytes of plane data per frame (excluding the frame header line).
    pub fn frame_data_len(self, width: usize, height: usize) -> usize {
        width * height + 2 * self.chroma_size(width, height)
    }

    /// [`frame_data_len`](Self::frame_data_len), or `None` when it does
    /// not fit in `usize`.
    pub fn checked_frame_data_len(self, width: usize, height: usize) -> Option<usize> {
        let s = self.subsampling();
        let luma = width.checked_mul(height)?;
        luma.checked_add((luma / (s * s)).checked_mul(2)?)
    }

    /// Offset within a chroma plane of the sample covering luma `(row, col)`.
    pub fn chroma_index(self, width: usize, row: usize, col: usize) -> usize {
        let s = self.subsampling();
        (width / s) * (row / s) + col / s
    }
}

impl fmt::Display for ChromaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yuv444 => write!(f, "YUV 4:4:4"),
            Self::Yuv422 => write!(f, "YUV 4:2:2"),
            Self::Yuv420 => write!(f, "YUV 4:2:0"),
        }
    }
}

/// A row-major 8-bit sample matrix for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Plane {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn blocks_wide(&self) -> usize {
        self.width / BLOCK_SIZE
    }

    pub fn blocks_tall(&self) -> usize {
        self.height / BLOCK_SIZE
    }

    /// Copy out the 8x8 tile at block `(br, bc)` as signed samples.
    pub fn read_block(&self, br: usize, bc: usize) -> Block8x8 {
        let mut block = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];
        for (i, row) in block.iter_mut().enumerate() {
            let offset = (br * BLOCK_SIZE + i) * self.width + bc * BLOCK_SIZE;
            for (v, &byte) in row.iter_mut().zip(&self.data[offset..offset + BLOCK_SIZE]) {
                *v = f32::from(byte as i8);
            }
        }
        block
    }

    /// Write an 8x8 tile back, rounding to the nearest integer and keeping
    /// the low eight bits. Out-of-range values wrap rather than clamp.
    pub fn write_block(&mut self, br: usize, bc: usize, block: &Block8x8) {
        for (i, row) in block.iter().enumerate() {
            let offset = (br * BLOCK_SIZE + i) * self.width + bc * BLOCK_SIZE;
            for (byte, &v) in self.data[offset..offset + BLOCK_SIZE].iter_mut().zip(row) {
                *byte = round_half_up(v) as u8;
            }
        }
    }
}

/// Split packed frame bytes into Y, U and V planes.
pub fn split_frame(bytes: &[u8], width: usize, height: usize, format: ChromaFormat) -> (Plane, Plane, Plane) {
    let y_size = width * height;
    let uv_size = format.chroma_size(width, height);
    let (cw, ch) = format.chroma_dims(width, height);

    let y = Plane::new(width, height, bytes[..y_size].to_vec());
    let u = Plane::new(cw, ch, bytes[y_size..y_size + cw * ch].to_vec());
    let v_start = y_size + uv_size;
    let v = Plane::new(cw, ch, bytes[v_start..v_start + cw * ch].to_vec());
    (y, u, v)
}

/// Write Y, U and V planes back into a packed frame buffer in place.
pub fn merge_into(frame: &mut [u8], y: &Plane, u: &Plane, v: &Plane, format: ChromaFormat) {
    let y_size = y.width * y.height;
    let uv_size = format.chroma_size(y.width, y.height);

    frame[..y_size].copy_from_slice(&y.data);
    frame[y_size..y_size + u.data.len()].copy_from_slice(&u.data);
    let v_start = y_size + uv_size;
    frame[v_start..v_start + v.data.len()].copy_from_slice(&v.data);
}

/// Pack Y, U and V planes into a freshly allocated frame buffer.
pub fn merge_frame(y: &Plane, u: &Plane, v: &Plane, format: ChromaFormat) -> Vec<u8> {
    let mut frame = vec![0u8; format.frame_data_len(y.width, y.height)];
    merge_into(&mut frame, y, u, v, format);
    frame
}

/// Forward DCT, coefficient modification and inverse DCT over every full
/// 8x8 tile of `plane`, in row-major block order. Returns the number of
/// blocks processed.
pub fn process_component(
    plane: &mut Plane,
    blocks_wide: usize,
    blocks_tall: usize,
    modifier: &CoefficientModifier,
    quant: &ScaledQuantTable,
    rng: &mut dyn RngCore,
) -> Result<usize, ModifyError> {
    for br in 0..blocks_tall {
        for bc in 0..blocks_wide {
            let samples = plane.read_block(br, bc);
            let mut coeffs = dct::forward_dct(&samples);
            modifier.zigzag_range(&mut coeffs, rng)?;
            let restored = dct::inverse_dct(&coeffs, quant);
            plane.write_block(br, bc, &restored);
        }
    }
    Ok(blocks_wide * blocks_tall)
}

/// Applies one run's watermark to packed frames of fixed geometry.
#[derive(Debug, Clone)]
pub struct FrameWatermarker {
    width: usize,
    height: usize,
    format: ChromaFormat,
    components: Components,
    modifier: CoefficientModifier,
    quant: ScaledQuantTable,
}

impl FrameWatermarker {
    pub fn new(
        width: usize,
        height: usize,
        format: ChromaFormat,
        components: Components,
        modifier: CoefficientModifier,
    ) -> Self {
        Self {
            width,
            height,
            format,
            components,
            modifier,
            quant: ScaledQuantTable::unit(),
        }
    }

    pub fn format(&self) -> ChromaFormat {
        self.format
    }

    pub fn frame_data_len(&self) -> usize {
        self.format.frame_data_len(self.width, self.height)
    }

    /// Watermark the selected components of one packed frame in place.
    pub fn watermark_frame(&self, frame: &mut [u8], rng: &mut dyn RngCore) -> Result<(), ModifyError> {
        if !self.components.any() {
            return Ok(());
        }

        let (mut y, mut u, mut v) = split_frame(frame, self.width, self.height, self.format);
        let selected = [
            (self.components.y, &mut y),
            (self.components.u, &mut u),
            (self.components.v, &mut v),
        ];
        for (enabled, plane) in selected {
            if enabled {
                let (bw, bt) = (plane.blocks_wide(), plane.blocks_tall());
                process_component(plane, bw, bt, &self.modifier, &self.quant, rng)?;
            }
        }

        merge_into(frame, &y, &u, &v, self.format);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::{ModType, ModificationSettings};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn packed_frame(width: usize, height: usize, format: ChromaFormat) -> Vec<u8> {
        (0..format.frame_data_len(width, height))
            .map(|i| (i * 7 % 251) as u8)
            .collect()
    }

    #[test]
    fn test_frame_sizes() {
        assert_eq!(ChromaFormat::Yuv444.frame_data_len(16, 16), 768);
        assert_eq!(ChromaFormat::Yuv422.frame_data_len(16, 16), 384);
        assert_eq!(ChromaFormat::Yuv420.frame_data_len(16, 16), 288);
        assert_eq!(ChromaFormat::Yuv422.chroma_dims(32, 16), (16, 8));
        assert_eq!(ChromaFormat::Yuv420.chroma_dims(32, 16), (8, 4));
    }

    #[test]
    fn test_split_merge_identity() {
        for format in [ChromaFormat::Yuv444, ChromaFormat::Yuv422, ChromaFormat::Yuv420] {
            let frame = packed_frame(32, 16, format);
            let (y, u, v) = split_frame(&frame, 32, 16, format);
            assert_eq!(y.data.len(), 32 * 16);
            assert_eq!(u.data.len(), format.chroma_size(32, 16));
            assert_eq!(merge_frame(&y, &u, &v, format), frame, "{format}");
        }
    }

    #[test]
    fn test_split_places_planes() {
        let frame = packed_frame(16, 16, ChromaFormat::Yuv422);
        let (y, u, v) = split_frame(&frame, 16, 16, ChromaFormat::Yuv422);
        assert_eq!(y.data[..], frame[..256]);
        assert_eq!(u.data[..], frame[256..320]);
        assert_eq!(v.data[..], frame[320..384]);
        assert_eq!((u.width, u.height), (8, 8));
    }

    #[test]
    fn test_block_roundtrip_preserves_bytes() {
        // includes values >= 128, which are read as negative samples
        let data: Vec<u8> = (0..256).map(|i| (i * 13 % 256) as u8).collect();
        let mut plane = Plane::new(16, 16, data.clone());
        for br in 0..2 {
            for bc in 0..2 {
                let block = plane.read_block(br, bc);
                let restored = dct::inverse_dct(&dct::forward_dct(&block), &ScaledQuantTable::unit());
                plane.write_block(br, bc, &restored);
            }
        }
        assert_eq!(plane.data, data);
    }

    #[test]
    fn test_write_block_wraps_instead_of_clamping() {
        let mut plane = Plane::new(8, 8, vec![0; 64]);
        let mut block = [[0.0f32; 8]; 8];
        block[0][0] = 130.0;
        block[0][1] = -129.0;
        block[0][2] = 255.6;
        plane.write_block(0, 0, &block);
        assert_eq!(plane.data[0], 130);
        assert_eq!(plane.data[1], 127);
        assert_eq!(plane.data[2], 0);
    }

    #[test]
    fn test_unselected_components_pass_through() {
        let format = ChromaFormat::Yuv444;
        let modifier =
            CoefficientModifier::new(ModificationSettings::uniform(1, 10, ModType::Absolute, 5)).unwrap();
        let wm = FrameWatermarker::new(16, 16, format, Components::LUMA, modifier);

        let original: Vec<u8> = (0..768).map(|i| (40 + i % 50) as u8).collect();
        let mut frame = original.clone();
        wm.watermark_frame(&mut frame, &mut StdRng::seed_from_u64(0)).unwrap();

        assert_ne!(frame[..256], original[..256]);
        assert_eq!(frame[256..], original[256..]);
    }

    #[test]
    fn test_partial_tiles_pass_through() {
        // 12x12 luma holds one full tile; the 4-pixel right and bottom edges stay as they are
        let modifier =
            CoefficientModifier::new(ModificationSettings::uniform(1, 10, ModType::Absolute, 5)).unwrap();
        let wm = FrameWatermarker::new(12, 12, ChromaFormat::Yuv444, Components::LUMA, modifier);

        let original: Vec<u8> = (0..432).map(|i| (40 + i * 3 % 50) as u8).collect();
        let mut frame = original.clone();
        wm.watermark_frame(&mut frame, &mut StdRng::seed_from_u64(0)).unwrap();

        let mut tile_changed = false;
        for row in 0..12 {
            for col in 0..12 {
                let i = row * 12 + col;
                if row < 8 && col < 8 {
                    tile_changed |= frame[i] != original[i];
                } else {
                    assert_eq!(frame[i], original[i], "edge pixel ({row},{col})");
                }
            }
        }
        assert!(tile_changed);
        assert_eq!(frame[144..], original[144..]);
    }

    #[test]
    fn test_small_chroma_planes_have_no_full_blocks() {
        // 16x16 "4:2:0" chroma is 4x4: nothing to tile, bytes unchanged
        let format = ChromaFormat::Yuv420;
        let modifier =
            CoefficientModifier::new(ModificationSettings::uniform(1, 63, ModType::Absolute, 20)).unwrap();
        let wm = FrameWatermarker::new(16, 16, format, Components { y: false, u: true, v: true }, modifier);

        let original = packed_frame(16, 16, format);
        let mut frame = original.clone();
        wm.watermark_frame(&mut frame, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(frame, original);
    }
}
