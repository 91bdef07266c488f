use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{codecs::jpeg::JpegDecoder, DynamicImage, ImageDecoder, ImageFormat};
use std::io::Cursor;

/// 送入视觉模型前的最长边像素
pub const MAX_LONG_EDGE: u32 = 2048;

/// 纠正EXIF方向、限制尺寸并统一编码为PNG
///
/// 无法解码时返回 `None`，调用方应回退为原始字节。
pub fn prepare_for_vision(input: &[u8]) -> Option<Vec<u8>> {
    let format = image::guess_format(input).ok()?;
    let mut image = image::load_from_memory_with_format(input, format).ok()?;

    if let Some(orientation) = read_orientation(input, format) {
        image.apply_orientation(orientation);
    }

    encode_png(&fit_long_edge(image, MAX_LONG_EDGE))
}

fn fit_long_edge(image: DynamicImage, max_edge: u32) -> DynamicImage {
    if image.width().max(image.height()) <= max_edge {
        return image;
    }
    image.resize(max_edge, max_edge, FilterType::Triangle)
}

fn encode_png(image: &DynamicImage) -> Option<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png).ok()?;
    Some(cursor.into_inner())
}

fn read_orientation(bytes: &[u8], format: ImageFormat) -> Option<Orientation> {
    match format {
        ImageFormat::Jpeg => {
            let mut decoder = JpegDecoder::new(Cursor::new(bytes)).ok()?;
            decoder
                .orientation()
                .ok()
                .filter(|orientation| *orientation != Orientation::NoTransforms)
        }
        _ => None,
    }
}
