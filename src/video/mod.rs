pub mod dct;
pub mod plane;
pub mod rgb;
pub mod zigzag;

/// Round to the nearest integer, ties toward positive infinity.
pub fn round_half_up(x: f32) -> i32 {
    (x + 0.5).floor() as i32
}
