use image::{imageops::FilterType, DynamicImage, ImageReader};
use ndarray::{Array, Ix4};
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

pub const INPUT_SIZE: u32 = 224;

const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Detects the format from the file contents only; the staged file name
/// carries no format hint.
pub fn load_image(path: &Path) -> Result<DynamicImage, PreprocessError> {
    let reader = BufReader::new(File::open(path)?);
    let image = ImageReader::new(reader).with_guessed_format()?.decode()?;
    Ok(image)
}

/// Resizes straight to 224x224 without keeping the aspect ratio, then
/// normalizes each channel into a `[1, 3, H, W]` tensor.
pub fn to_input_tensor(image: &DynamicImage) -> Array<f32, Ix4> {
    let size = INPUT_SIZE as usize;
    let rgb = image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
        .to_rgb8();

    let mut input = Array::zeros((1, 3, size, size));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for (c, value) in pixel.0.iter().enumerate() {
            input[[0, c, y, x]] = (*value as f32 / 255. - MEAN[c]) / STD[c];
        }
    }

    input
}
