//! JPEG zigzag traversal of an 8x8 coefficient block.

use crate::config::{BLOCK_LEN, BLOCK_SIZE};

/// Maps zigzag position (0-63) to `(row, col)` within the block.
///
/// Position 0 is the DC term; odd diagonals run top-right to bottom-left,
/// even diagonals bottom-left to top-right.
pub const ZIGZAG: [(usize, usize); BLOCK_LEN] = build_zigzag();

const fn build_zigzag() -> [(usize, usize); BLOCK_LEN] {
    let mut table = [(0usize, 0usize); BLOCK_LEN];
    let mut n = 0;
    let mut diagonal = 0;
    while diagonal < 2 * BLOCK_SIZE - 1 {
        // rows touched by this anti-diagonal
        let lo = if diagonal < BLOCK_SIZE { 0 } else { diagonal - (BLOCK_SIZE - 1) };
        let hi = if diagonal < BLOCK_SIZE { diagonal } else { BLOCK_SIZE - 1 };
        if diagonal % 2 == 1 {
            let mut row = lo;
            while row <= hi {
                table[n] = (row, diagonal - row);
                n += 1;
                row += 1;
            }
        } else {
            let mut row = hi + 1;
            while row > lo {
                row -= 1;
                table[n] = (row, diagonal - row);
                n += 1;
            }
        }
        diagonal += 1;
    }
    table
}

/// Natural row-major index (`row * 8 + col`) for a zigzag position.
pub fn natural_index(position: usize) -> usize {
    let (row, col) = ZIGZAG[position];
    row * BLOCK_SIZE + col
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_jpeg_table() {
        const ZIGZAG_TO_NATURAL: [usize; 64] = [
             0,  1,  8, 16,  9,  2,  3, 10,
            17, 24, 32, 25, 18, 11,  4,  5,
            12, 19, 26, 33, 40, 48, 41, 34,
            27, 20, 13,  6,  7, 14, 21, 28,
            35, 42, 49, 56, 57, 50, 43, 36,
            29, 22, 15, 23, 30, 37, 44, 51,
            58, 59, 52, 45, 38, 31, 39, 46,
            53, 60, 61, 54, 47, 55, 62, 63,
        ];
        for (n, &expected) in ZIGZAG_TO_NATURAL.iter().enumerate() {
            assert_eq!(natural_index(n), expected, "zigzag position {n}");
        }
    }

    #[test]
    fn all_positions_covered_once() {
        let mut seen = [false; 64];
        for n in 0..64 {
            let idx = natural_index(n);
            assert!(!seen[idx], "duplicate natural index {idx}");
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn known_positions() {
        assert_eq!(ZIGZAG[0], (0, 0));
        assert_eq!(ZIGZAG[1], (0, 1));
        assert_eq!(ZIGZAG[2], (1, 0));
        assert_eq!(ZIGZAG[3], (2, 0));
        assert_eq!(ZIGZAG[28], (0, 7));
        assert_eq!(ZIGZAG[35], (7, 0));
        assert_eq!(ZIGZAG[36], (7, 1));
        assert_eq!(ZIGZAG[63], (7, 7));
    }
}
