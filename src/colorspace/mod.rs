//! # Color-Space Layer
//!
//! A color space is the per-pixel codec of the engine: it defines how many
//! bytes one pixel occupies, what the channels are and where they sit, how a
//! pixel converts to and from a canonical RGB color, and how two pixel
//! rectangles combine under a compositing operator.
//!
//! ## Pixel Buffer ABI
//!
//! Pixel buffers are plain `&[u8]` runs of `pixel_size()` bytes per pixel.
//! The channel layout is defined *entirely* by [`ColorSpace::channels`];
//! callers (iterators, paintops, file-format codecs) must consult the
//! descriptor table rather than assume an order.
//!
//! ## Statelessness
//!
//! Color-space objects are stateless functions over buffers. They are
//! constructed once at registry-initialization time and shared as
//! `Arc<dyn ColorSpace>` by every tile, layer and device that uses the
//! encoding.
//!
//! ## Compositing
//!
//! [`ColorSpace::bit_blt`] dispatches on [`CompositeOp`]. Every encoding
//! implements OVER, ERASE and COPY; the RGB encoding additionally implements
//! the generic Porter-Duff / GraphicsMagick table in [`composite`].
//! Operators an encoding does not implement are documented no-ops, as is
//! [`CompositeOp::Undef`].

pub mod alpha;
pub mod composite;
pub mod gray;
pub mod math;
pub mod registry;
pub mod rgb;
pub mod ycbcr;

pub use alpha::AlphaU8ColorSpace;
pub use gray::GrayU8ColorSpace;
pub use math::{OPACITY_OPAQUE, OPACITY_TRANSPARENT};
pub use registry::ColorSpaceRegistry;
pub use rgb::RgbU8ColorSpace;
pub use ycbcr::YCbCrU8ColorSpace;

use std::fmt;

/// Canonical device-independent color used at the conversion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// What a channel stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Color,
    Alpha,
}

/// One entry of a color space's channel descriptor table.
#[derive(Debug, Clone, Copy)]
pub struct ChannelInfo {
    pub name: &'static str,
    /// Byte offset of the channel within a pixel.
    pub pos: usize,
    /// Channel width in bytes.
    pub size: usize,
    pub kind: ChannelKind,
}

impl ChannelInfo {
    pub const fn new(name: &'static str, pos: usize, size: usize, kind: ChannelKind) -> Self {
        Self {
            name,
            pos,
            size,
            kind,
        }
    }
}

/// Compositing operator tag selecting the blend function applied by
/// [`ColorSpace::bit_blt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeOp {
    /// No composition at all.
    Undef,
    Over,
    In,
    Out,
    Atop,
    Xor,
    Plus,
    Minus,
    Add,
    Subtract,
    Diff,
    Bumpmap,
    Copy,
    CopyRed,
    CopyGreen,
    CopyBlue,
    CopyOpacity,
    Clear,
    Dissolve,
    Erase,
}

/// Per-pixel alpha mask applied during compositing: one byte per pixel,
/// rows `stride` bytes apart.
#[derive(Debug, Clone, Copy)]
pub struct Mask<'a> {
    pub data: &'a [u8],
    pub stride: usize,
}

impl<'a> Mask<'a> {
    pub fn new(data: &'a [u8], stride: usize) -> Self {
        Self { data, stride }
    }

    #[inline]
    pub(crate) fn row(&self, r: usize) -> &'a [u8] {
        &self.data[r * self.stride..]
    }
}

/// Pluggable per-pixel codec: pixel layout, canonical-color conversion,
/// pixel arithmetic, and compositing over raw byte buffers.
///
/// Buffers passed to any operation hold exactly `pixel_size()` bytes per
/// pixel. Rectangular operations address pixels as `rows` x `cols` with the
/// given byte strides between row starts.
pub trait ColorSpace: fmt::Debug + Send + Sync {
    /// Stable symbolic identifier, e.g. `"RGBA"`.
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// Channel descriptor table. Offsets are fixed for the lifetime of the
    /// instance.
    fn channels(&self) -> &[ChannelInfo];

    /// Bytes per pixel.
    fn pixel_size(&self) -> usize;

    fn has_alpha(&self) -> bool;

    /// Byte offset of the alpha channel, if the encoding has one.
    fn alpha_pos(&self) -> Option<usize>;

    /// Write one pixel from the canonical color and opacity.
    fn from_color(&self, c: Color, opacity: u8, dst: &mut [u8]);

    /// Read one pixel back into a canonical color and opacity.
    fn to_color(&self, src: &[u8]) -> (Color, u8);

    /// Perceptual or channel-max distance between two pixels, used by
    /// flood-fill and selection tools. The formula is color-space specific.
    fn difference(&self, a: &[u8], b: &[u8]) -> u8;

    /// Weighted average of `pixels`, additionally weighted by each pixel's
    /// own alpha and normalized by the accumulated alpha. Weights sum to
    /// 255. If the accumulated alpha is zero the output pixel is fully
    /// transparent (never divides by zero).
    fn mix_colors(&self, pixels: &[&[u8]], weights: &[u8], dst: &mut [u8]);

    /// Blend a `rows` x `cols` rectangle of `src` into `dst` under `op`,
    /// scaled by `opacity` and by the optional per-pixel `mask`.
    ///
    /// Unrecognized operators are a no-op for the encoding.
    #[allow(clippy::too_many_arguments)]
    fn bit_blt(
        &self,
        dst: &mut [u8],
        dst_stride: usize,
        src: &[u8],
        src_stride: usize,
        mask: Option<Mask<'_>>,
        opacity: u8,
        rows: usize,
        cols: usize,
        op: CompositeOp,
    );
}
