//! Lightweight, row-major `u8` pixel buffers.
//!
//! Images are already decoded by the caller; nothing here reads files.

/// Errors for caller-supplied pixel buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid image buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("unsupported channel count {channels} (expected 1..=4)")]
    UnsupportedChannels { channels: usize },
}

/// Borrowed interleaved image, `channels` bytes per pixel.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: &'a [u8], // row-major, len = w*h*c
}

/// Owned interleaved image, `channels` bytes per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: Vec<u8>,
}

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

fn check_layout(width: usize, height: usize, channels: usize, len: usize) -> Result<(), ImageError> {
    if !(1..=4).contains(&channels) {
        return Err(ImageError::UnsupportedChannels { channels });
    }
    let expected = width * height * channels;
    if len != expected {
        return Err(ImageError::InvalidBuffer {
            expected,
            got: len,
        });
    }
    Ok(())
}

impl<'a> ImageView<'a> {
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: &'a [u8],
    ) -> Result<Self, ImageError> {
        check_layout(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &'a [u8] {
        let i = (y * self.width + x) * self.channels;
        &self.data[i..i + self.channels]
    }

    /// Luma conversion (ITU-R BT.601 weights, RGB(A) channel order).
    /// Single-channel and gray+alpha inputs keep their first channel.
    pub fn to_gray(&self) -> GrayImage {
        let data = match self.channels {
            3 | 4 => self
                .data
                .chunks_exact(self.channels)
                .map(|px| {
                    let l = 299 * px[0] as u32 + 587 * px[1] as u32 + 114 * px[2] as u32;
                    ((l + 500) / 1000) as u8
                })
                .collect(),
            c => self.data.iter().step_by(c.max(1)).copied().collect(),
        };
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

impl Image {
    pub fn new(
        width: usize,
        height: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self, ImageError> {
        check_layout(width, height, channels, data.len())?;
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Image filled with one pixel value; `fill` supplies one byte per channel.
    pub fn filled(width: usize, height: usize, fill: &[u8]) -> Result<Self, ImageError> {
        let channels = fill.len();
        check_layout(width, height, channels, width * height * channels)?;
        Ok(Self {
            width,
            height,
            channels,
            data: fill.repeat(width * height),
        })
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            width: self.width,
            height: self.height,
            channels: self.channels,
            data: &self.data,
        }
    }
}

impl GrayImage {
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    /// Reinterpret as a single-channel [`Image`].
    pub fn into_image(self) -> Image {
        Image {
            width: self.width,
            height: self.height,
            channels: 1,
            data: self.data,
        }
    }
}

impl<'a> From<GrayImageView<'a>> for ImageView<'a> {
    fn from(v: GrayImageView<'a>) -> Self {
        ImageView {
            width: v.width,
            height: v.height,
            channels: 1,
            data: v.data,
        }
    }
}

/// Edge-clamped bilinear sample of every channel at `(x, y)` (pixel centres
/// at integer coordinates), written into `out`.
#[inline]
pub(crate) fn sample_bilinear_clamped(src: &ImageView<'_>, x: f64, y: f64, out: &mut [u8]) {
    let max_x = src.width as f64 - 1.0;
    let max_y = src.height as f64 - 1.0;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(src.width - 1);
    let y1 = (y0 + 1).min(src.height - 1);
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    for (c, o) in out.iter_mut().enumerate() {
        let a = p00[c] as f64 + fx * (p10[c] as f64 - p00[c] as f64);
        let b = p01[c] as f64 + fx * (p11[c] as f64 - p01[c] as f64);
        *o = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
}
