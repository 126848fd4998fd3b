//! Color descriptors and perceptual color distance.
//!
//! A [`ColorDescriptor`] summarizes a rectangular pixel region as a single
//! four-channel value (the arithmetic mean of each RGBA channel). Distance
//! between descriptors is measured in YCbCr space so that ranking
//! approximates perceptual difference rather than raw RGB distance.
//!
//! The distance is used for ranking only; no calibration against a
//! standardized color space is performed.

use image::{GenericImageView, Rgba};

/// Compact four-channel color summary of an image region.
///
/// Channels are stored as 8-bit RGBA averages. Descriptors are computed once
/// per image and immutable afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorDescriptor {
    /// Average red channel.
    pub r: u8,
    /// Average green channel.
    pub g: u8,
    /// Average blue channel.
    pub b: u8,
    /// Average alpha channel.
    pub a: u8,
}

impl ColorDescriptor {
    /// Creates a descriptor from explicit channel values.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Computes the average color of an image region.
///
/// The result is the arithmetic per-channel mean over every pixel within the
/// region's bounds. Accumulators are 64-bit, wide enough for any image the
/// `image` crate can decode.
///
/// # Panics
///
/// The region must contain at least one pixel; calling this on an empty
/// bound is a precondition violation (debug assertion).
pub fn average_color<I>(region: &I) -> ColorDescriptor
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (width, height) = region.dimensions();
    debug_assert!(width > 0 && height > 0, "empty region has no average color");

    let mut r_sum: u64 = 0;
    let mut g_sum: u64 = 0;
    let mut b_sum: u64 = 0;
    let mut a_sum: u64 = 0;

    for (_, _, Rgba([r, g, b, a])) in region.pixels() {
        r_sum += u64::from(r);
        g_sum += u64::from(g);
        b_sum += u64::from(b);
        a_sum += u64::from(a);
    }

    let num_pixels = u64::from(width) * u64::from(height);
    ColorDescriptor {
        r: (r_sum / num_pixels) as u8,
        g: (g_sum / num_pixels) as u8,
        b: (b_sum / num_pixels) as u8,
        a: (a_sum / num_pixels) as u8,
    }
}

/// Projects an RGB triple into YCbCr (ITU-R BT.601).
///
/// Matches the integer behavior of the common luma/chroma conversion: full
/// range, rounded, clamped to `0..=255`.
pub(crate) fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = f32::from(r);
    let g = f32::from(g);
    let b = f32::from(b);

    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;

    (
        y.round().clamp(0.0, 255.0) as u8,
        cb.round().clamp(0.0, 255.0) as u8,
        cr.round().clamp(0.0, 255.0) as u8,
    )
}

/// Computes the squared distance between two descriptors in luma/chroma space.
///
/// Both descriptors are projected into YCbCr; the result is the sum of
/// squared per-channel differences plus the squared alpha difference.
/// Symmetric, and zero for identical descriptors. Used only for ranking.
pub fn color_distance(x: ColorDescriptor, y: ColorDescriptor) -> u32 {
    let (xy, xcb, xcr) = rgb_to_ycbcr(x.r, x.g, x.b);
    let (yy, ycb, ycr) = rgb_to_ycbcr(y.r, y.g, y.b);

    let dy = abs_diff(xy, yy);
    let dcb = abs_diff(xcb, ycb);
    let dcr = abs_diff(xcr, ycr);
    let da = abs_diff(x.a, y.a);

    dy * dy + dcb * dcb + dcr * dcr + da * da
}

fn abs_diff(a: u8, b: u8) -> u32 {
    if a < b {
        u32::from(b - a)
    } else {
        u32::from(a - b)
    }
}
