use crate::video::plane::ChromaFormat;

/// An 8-bit RGB raster, three bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl RgbImage {
    /// Convert planar Y/U/V data to RGB with the integer BT.601 studio-swing
    /// matrix. Chroma is looked up at the subsampled position for `format`.
    pub fn from_planes(
        y: &[u8],
        u: &[u8],
        v: &[u8],
        width: usize,
        height: usize,
        format: ChromaFormat,
    ) -> Self {
        let mut pixels = Vec::with_capacity(width * height * 3);
        for row in 0..height {
            for col in 0..width {
                let pos = row * width + col;
                let spos = format.chroma_index(width, row, col);
                pixels.extend_from_slice(&yuv_to_rgb(y[pos], u[spos], v[spos]));
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert one packed frame (Y, then U, then V) to RGB.
    pub fn from_frame(frame: &[u8], width: usize, height: usize, format: ChromaFormat) -> Self {
        let y_size = width * height;
        let uv_size = format.chroma_size(width, height);
        Self::from_planes(
            &frame[..y_size],
            &frame[y_size..y_size + uv_size],
            &frame[y_size + uv_size..y_size + 2 * uv_size],
            width,
            height,
            format,
        )
    }

    /// Pixel at `(row, col)` as `0xRRGGBB`.
    pub fn packed_rgb(&self, row: usize, col: usize) -> u32 {
        let i = (row * self.width + col) * 3;
        (u32::from(self.pixels[i]) << 16) | (u32::from(self.pixels[i + 1]) << 8) | u32::from(self.pixels[i + 2])
    }

    /// Serialize as a binary PPM (P6) image.
    pub fn to_ppm(&self) -> Vec<u8> {
        let mut out = format!("P6\n{} {}\n255\n", self.width, self.height).into_bytes();
        out.extend_from_slice(&self.pixels);
        out
    }
}

/// One pixel through `R = clip((298·C + 409·E + 128) >> 8)` and friends,
/// where `C = Y - 16`, `D = U - 128`, `E = V - 128`.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;

    let r = clip((298 * c + 409 * e + 128) >> 8);
    let g = clip((298 * c - 100 * d - 208 * e + 128) >> 8);
    let b = clip((298 * c + 516 * d + 128) >> 8);
    [r, g, b]
}

fn clip(x: i32) -> u8 {
    x.clamp(0, 255) as u8
}
