use image::imageops::FilterType;
use image::GrayImage;

use crate::error::Result;
use crate::math::tensor::Tensor;
use crate::nn::INPUT_SHAPE;

/// Decodes an encoded image (PNG, JPEG, BMP, GIF) to full-resolution grayscale.
pub fn gray_from_bytes(bytes: &[u8]) -> Result<GrayImage> {
    Ok(image::load_from_memory(bytes)?.to_luma8())
}

/// Scales a grayscale image down to the network input resolution and maps
/// pixel values from [0, 255] into [0, 1].
pub fn tensor_from_gray(image: &GrayImage) -> Tensor {
    let resized = image::imageops::resize(
        image,
        INPUT_SHAPE.w as u32,
        INPUT_SHAPE.h as u32,
        FilterType::Triangle,
    );
    let data = resized.pixels().map(|p| p.0[0] as f64 / 255.0).collect();
    Tensor::from_vec(INPUT_SHAPE, data)
}

/// Full decode path: bytes in, normalized 48×48×1 tensor out.
pub fn tensor_from_bytes(bytes: &[u8]) -> Result<Tensor> {
    Ok(tensor_from_gray(&gray_from_bytes(bytes)?))
}

/// Crops a rectangular region out of a grayscale image, clamped to the image
/// bounds, and converts it to a network input tensor.
pub fn crop_to_tensor(image: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> Tensor {
    let x = x.min(image.width().saturating_sub(1));
    let y = y.min(image.height().saturating_sub(1));
    let width = width.min(image.width() - x).max(1);
    let height = height.min(image.height() - y).max(1);
    let crop = image::imageops::crop_imm(image, x, y, width, height).to_image();
    tensor_from_gray(&crop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::io::Cursor;

    fn encode_png(img: &GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decodes_and_normalizes_to_unit_range() {
        let img = GrayImage::from_pixel(64, 80, Luma([255]));
        let t = tensor_from_bytes(&encode_png(&img)).unwrap();
        assert_eq!(t.shape, INPUT_SHAPE);
        assert!(t.data.iter().all(|&v| (v - 1.0).abs() < 1e-9));
    }

    #[test]
    fn garbage_bytes_fail_with_decode_error() {
        let err = tensor_from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, crate::error::Error::ImageDecode(_)));
    }

    #[test]
    fn crop_is_clamped_to_image_bounds() {
        let img = GrayImage::from_pixel(30, 30, Luma([100]));
        let t = crop_to_tensor(&img, 20, 20, 50, 50);
        assert_eq!(t.shape, INPUT_SHAPE);
        assert!(t.data.iter().all(|&v| (v - 100.0 / 255.0).abs() < 1e-9));
    }
}
