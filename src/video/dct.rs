//! Float 8x8 forward/inverse DCT in the butterfly formulation used by the
//! IJG `jfdctflt.c` / `jidctflt.c` routines.
//!
//! The forward transform is orthonormal. The inverse transform expects its
//! dequantization table to carry the AAN scale factors (and the final `1/8`
//! descale), which is what [`ScaledQuantTable`] guarantees.

use crate::config::BLOCK_SIZE;

/// An 8x8 block of samples or coefficients, indexed `[row][col]`.
pub type Block8x8 = [[f32; BLOCK_SIZE]; BLOCK_SIZE];

const R2: f32 = 1.414_213_562_373_095_1;

// Inverse transform constants
const SCALE_FACTOR: [f32; BLOCK_SIZE] = [
    1.0,
    1.387_039_845_322_147_5, // cos(1π/16)·√2
    1.306_562_964_876_376_6, // cos(2π/16)·√2
    1.175_875_602_419_358_8, // cos(3π/16)·√2
    1.0,                     // cos(4π/16)·√2
    0.785_694_958_387_102_3, // cos(5π/16)·√2
    0.541_196_100_146_197_1, // cos(6π/16)·√2
    0.275_899_379_282_943_1, // cos(7π/16)·√2
];
const K2: f32 = 1.847_759_065_022_573_5; // 2·cos(π/8)
const M26: f32 = 1.082_392_200_292_393_8; // K2 - K6
const P26: f32 = -2.613_125_929_752_753; // -(K2 + K6)

// Forward transform constants: Fk = cos(kπ/16) / 2
const F0: f32 = 0.707_106_781_186_547_5;
const F3: f32 = 0.415_734_806_151_272_6;
const F4: f32 = 0.353_553_390_593_273_8;
const F6: f32 = 0.191_341_716_182_544_92;
const F7: f32 = 0.097_545_161_008_064_17;
const D71: f32 = -0.392_847_479_193_551_06;
const D35: f32 = 0.137_949_689_641_471_47;
const D62: f32 = -0.270_598_050_073_098_45;
const S71: f32 = 0.587_937_801_209_679_4;
const S35: f32 = 0.693_519_922_661_073_8;
const S62: f32 = 0.653_281_482_438_188_3;

/// 1D forward butterfly over eight values.
#[inline]
fn fdct_1d(v: [f32; 8]) -> [f32; 8] {
    let b0 = v[0] + v[7];
    let b7 = v[0] - v[7];
    let b1 = v[1] + v[6];
    let b6 = v[1] - v[6];
    let b2 = v[2] + v[5];
    let b5 = v[2] - v[5];
    let b3 = v[3] + v[4];
    let b4 = v[3] - v[4];

    let a0 = b0 + b3;
    let a1 = b1 + b2;
    let a2 = b1 - b2;
    let a3 = b0 - b3;
    let a4 = b4;
    let a5 = (b6 - b5) * F0;
    let a6 = (b6 + b5) * F0;
    let a7 = b7;

    let mut out = [0.0f32; 8];
    out[0] = (a0 + a1) * F4;
    out[4] = (a0 - a1) * F4;

    let temp = (a3 + a2) * F6;
    out[2] = temp - a3 * D62;
    out[6] = temp - a2 * S62;

    let b4 = a4 + a5;
    let b7 = a7 + a6;
    let b5 = a4 - a5;
    let b6 = a7 - a6;

    let temp = (b7 + b4) * F7;
    out[1] = temp - b7 * D71;
    out[7] = temp - b4 * S71;

    let temp = (b6 + b5) * F3;
    out[5] = temp - b6 * D35;
    out[3] = temp - b5 * S35;

    out
}

/// 1D inverse butterfly over eight already-dequantized values.
#[inline]
fn idct_1d(v: [f32; 8]) -> [f32; 8] {
    // Even part
    let tmp10 = v[0] + v[4];
    let tmp11 = v[0] - v[4];

    let tmp13 = v[2] + v[6];
    let tmp12 = (v[2] - v[6]) * R2 - tmp13;

    let tmp0 = tmp10 + tmp13;
    let tmp3 = tmp10 - tmp13;
    let tmp1 = tmp11 + tmp12;
    let tmp2 = tmp11 - tmp12;

    // Odd part
    let z13 = v[5] + v[3];
    let z10 = v[5] - v[3];
    let z11 = v[1] + v[7];
    let z12 = v[1] - v[7];

    let tmp7 = z11 + z13;
    let tmp11 = (z11 - z13) * R2;

    let z5 = (z10 + z12) * K2;
    let tmp10 = M26 * z12 - z5;
    let tmp12 = P26 * z10 + z5;

    let tmp6 = tmp12 - tmp7;
    let tmp5 = tmp11 - tmp6;
    let tmp4 = tmp10 + tmp5;

    [
        tmp0 + tmp7,
        tmp1 + tmp6,
        tmp2 + tmp5,
        tmp3 - tmp4,
        tmp3 + tmp4,
        tmp2 - tmp5,
        tmp1 - tmp6,
        tmp0 - tmp7,
    ]
}

/// Forward 2D DCT: rows first, then columns of the row-transformed block.
pub fn forward_dct(input: &Block8x8) -> Block8x8 {
    let mut out = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];

    for (row, dst) in input.iter().zip(out.iter_mut()) {
        *dst = fdct_1d(*row);
    }

    for col in 0..BLOCK_SIZE {
        let column = std::array::from_fn(|r| out[r][col]);
        let transformed = fdct_1d(column);
        for (r, value) in transformed.into_iter().enumerate() {
            out[r][col] = value;
        }
    }

    out
}

/// Inverse 2D DCT: dequantize, then columns, then rows.
///
/// A column whose AC terms are all exactly zero is filled with its
/// dequantized DC value without running the butterfly; the result is the
/// same as the full computation.
pub fn inverse_dct(coeffs: &Block8x8, quant: &ScaledQuantTable) -> Block8x8 {
    let q = &quant.0;
    let mut out = [[0.0f32; BLOCK_SIZE]; BLOCK_SIZE];

    for col in 0..BLOCK_SIZE {
        if (1..BLOCK_SIZE).all(|r| coeffs[r][col] == 0.0) {
            let dc = coeffs[0][col] * q[0][col];
            for row in out.iter_mut() {
                row[col] = dc;
            }
            continue;
        }

        let column = std::array::from_fn(|r| coeffs[r][col] * q[r][col]);
        let transformed = idct_1d(column);
        for (r, value) in transformed.into_iter().enumerate() {
            out[r][col] = value;
        }
    }

    for row in out.iter_mut() {
        *row = idct_1d(*row);
    }

    out
}

/// Apply the pre-scaling the inverse transform needs, in place.
///
/// Must run exactly once per table; a second application corrupts every
/// reconstruction made with it. Prefer [`ScaledQuantTable`], which can only
/// be built through a single scaling pass.
pub fn scale_quantization_table(table: &mut Block8x8) {
    for (i, row) in table.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = *value * SCALE_FACTOR[i] * SCALE_FACTOR[j] / 8.0;
        }
    }
}

/// A dequantization table that has been through [`scale_quantization_table`]
/// exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledQuantTable(Block8x8);

impl ScaledQuantTable {
    /// Scale a raw (natural order, non-zigzag) quantization table.
    pub fn new(mut table: Block8x8) -> Self {
        scale_quantization_table(&mut table);
        Self(table)
    }

    /// The all-ones table, scaled: reconstruction with no quantization.
    pub fn unit() -> Self {
        Self::new([[1.0; BLOCK_SIZE]; BLOCK_SIZE])
    }

    pub fn values(&self) -> &Block8x8 {
        &self.0
    }
}

impl Default for ScaledQuantTable {
    fn default() -> Self {
        Self::unit()
    }
}
