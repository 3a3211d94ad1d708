//! Test data generators for synthetic land-cover rasters.
//!
//! These generators create predictable, verifiable class layouts that can be
//! used across the test suite.

/// ESA CCI land-cover legend (LCCS class codes), including 0 = no data.
pub const ESA_CCI_FLAG_VALUES: [u8; 38] = [
    0, 10, 11, 12, 20, 30, 40, 50, 60, 61, 62, 70, 71, 72, 80, 81, 82, 90, 100, 110, 120, 121, 122,
    130, 140, 150, 151, 152, 153, 160, 170, 180, 190, 200, 201, 202, 210, 220,
];

/// Creates a class grid of vertical stripes cycling through `codes`.
///
/// Each stripe is `stripe_width` columns wide, so column `c` holds
/// `codes[(c / stripe_width) % codes.len()]`. Stripes survive resampling
/// well, which keeps expected class sets easy to reason about.
///
/// # Returns
///
/// A `Vec<u8>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_striped_classes;
///
/// let grid = create_striped_classes(6, 2, &[10, 20], 3);
/// assert_eq!(grid, vec![10, 10, 10, 20, 20, 20, 10, 10, 10, 20, 20, 20]);
/// ```
pub fn create_striped_classes(width: usize, height: usize, codes: &[u8], stripe_width: usize) -> Vec<u8> {
    assert!(!codes.is_empty(), "at least one class code is required");
    let stripe_width = stripe_width.max(1);
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(codes[(col / stripe_width) % codes.len()]);
        }
    }
    data
}

/// Creates a class grid of square blocks cycling through `codes`.
///
/// Block (bx, by) of size `block` holds `codes[(bx + by) % codes.len()]`.
pub fn create_block_classes(width: usize, height: usize, codes: &[u8], block: usize) -> Vec<u8> {
    assert!(!codes.is_empty(), "at least one class code is required");
    let block = block.max(1);
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(codes[(col / block + row / block) % codes.len()]);
        }
    }
    data
}

/// Pixel-center coordinates `start, start + step, ...` (`n` values).
pub fn regular_axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}
