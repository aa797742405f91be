//! Adapters between `image` crate buffers and the core image types.

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use projector_calib_core::{Image, ImageError, ImageView};

/// Borrow an `image::GrayImage` as a single-channel view.
pub fn gray_view(img: &GrayImage) -> ImageView<'_> {
    ImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        channels: 1,
        data: img.as_raw(),
    }
}

pub fn rgb_view(img: &RgbImage) -> ImageView<'_> {
    ImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        channels: 3,
        data: img.as_raw(),
    }
}

pub fn rgba_view(img: &RgbaImage) -> ImageView<'_> {
    ImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        channels: 4,
        data: img.as_raw(),
    }
}

/// Copy any decoded image into an 8-bit [`Image`], keeping gray, RGB or RGBA
/// layout and converting everything else to RGB.
pub fn from_dynamic(img: &DynamicImage) -> Image {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let (channels, data) = match img {
        DynamicImage::ImageLuma8(g) => (1, g.as_raw().clone()),
        DynamicImage::ImageRgba8(c) => (4, c.as_raw().clone()),
        other => (3, other.to_rgb8().into_raw()),
    };
    Image {
        width,
        height,
        channels,
        data,
    }
}

/// Convert an [`Image`] back into an `image::DynamicImage`.
pub fn into_dynamic(img: Image) -> Result<DynamicImage, ImageError> {
    let expected = img.width * img.height * img.channels;
    let got = img.data.len();
    let (w, h) = (img.width as u32, img.height as u32);
    let invalid = || ImageError::InvalidBuffer { expected, got };
    match img.channels {
        1 => GrayImage::from_raw(w, h, img.data)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(invalid),
        3 => RgbImage::from_raw(w, h, img.data)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(invalid),
        4 => RgbaImage::from_raw(w, h, img.data)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(invalid),
        channels => Err(ImageError::UnsupportedChannels { channels }),
    }
}
