//! Image format and color-attribute types shared by the whole crate.
//!
//! Mirrors `ImageFormat`/`ColorSpace`/`GammaCurve` in
//! `examples/original_source/effect_chain.h`, extended with the alpha
//! and Y'CbCr output types `spec.md` §3 calls out.

/// Pixel layout of an image, independent of its color attributes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    Rgb,
    Rgba,
}

/// Color space a node's output is encoded in. `Invalid` is a propagation
/// sentinel, never a value a disabled-free finalized graph may carry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ColorSpace {
    Srgb,
    Rec601_525,
    Rec601_625,
    Invalid,
}

/// Gamma transfer curve. `Rec601_709` covers both Rec. 601 and Rec. 709,
/// which share a curve (matching `GAMMA_REC_601 == GAMMA_REC_709` in the
/// original).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum GammaCurve {
    Linear,
    Srgb,
    Rec601_709,
    Invalid,
}

/// Alpha storage convention of a node's output.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AlphaType {
    /// No meaningful alpha channel (fully opaque, or simply unused).
    Blank,
    Premultiplied,
    Postmultiplied,
    Invalid,
}

/// Requested alpha convention for the chain's final output. Only
/// premultiplied or postmultiplied may be requested explicitly; `Blank`
/// is never a valid output request (there's nothing to convert to).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OutputAlphaFormat {
    Premultiplied,
    Postmultiplied,
}

/// Which corner of the image is row 0 in the final render target.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OutputOrigin {
    BottomLeft,
    TopLeft,
}

/// The declared input/output image format: pixel layout plus color
/// attributes. Gamma/alpha propagation seeds from this for zero-input
/// nodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ImageFormat {
    pub pixel_format: PixelFormat,
    pub color_space: ColorSpace,
    pub gamma_curve: GammaCurve,
}

/// Y'CbCr format. Chroma subsampling is fixed to 1x1 (`spec.md` Non-goals
/// exclude other ratios), so this only records the colorimetry constants
/// needed by `YCbCrConversionEffect`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct YCbCrFormat {
    pub luma_coefficients: YCbCrLumaCoefficients,
    pub full_range: bool,
    pub num_levels: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum YCbCrLumaCoefficients {
    Rec601,
    Rec709,
}

/// How a Y'CbCr output is split across fragment shader output locations.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum YCbCrOutputSplitting {
    /// Single `FragColor` output carrying Y, Cb, Cr interleaved.
    Interleaved,
    /// `Y` and `Chroma` (packed Cb/Cr) outputs.
    SplitYAndCbCr,
    /// `Y`, `Cb`, `Cr` as three separate outputs.
    Planar,
}
