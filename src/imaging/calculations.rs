//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `original` so its longer edge equals `target`, preserving aspect ratio.
///
/// Smaller sources are scaled up. The shorter edge never drops below 1px.
///
/// # Examples
/// ```
/// # use image_derivatives::imaging::calculate_long_edge_dimensions;
/// // Landscape 2000x1500 → 500 on the long edge
/// assert_eq!(calculate_long_edge_dimensions((2000, 1500), 500), (500, 375));
///
/// // Portrait 1500x2000 → 100 on the long edge
/// assert_eq!(calculate_long_edge_dimensions((1500, 2000), 100), (75, 100));
/// ```
pub fn calculate_long_edge_dimensions(original: (u32, u32), target: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    if orig_w == 0 || orig_h == 0 {
        return (target, target);
    }

    if orig_w >= orig_h {
        // Landscape or square
        let ratio = target as f64 / orig_w as f64;
        (target, ((orig_h as f64 * ratio).round() as u32).max(1))
    } else {
        // Portrait
        let ratio = target as f64 / orig_h as f64;
        (((orig_w as f64 * ratio).round() as u32).max(1), target)
    }
}
