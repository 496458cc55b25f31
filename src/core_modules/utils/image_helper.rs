pub mod image_helper {
    use crate::core_modules::frame::{Frame, Mask};
    use image::ImageEncoder;

    /// Saves an RGBA frame as a PNG. Handy for capturing what the pipeline
    /// actually saw when a detection misbehaves in the field.
    pub fn save_frame(name: String, frame: &Frame) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(name)?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder.write_image(
            frame.data(),
            frame.width(),
            frame.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(())
    }

    /// Saves a binary mask as a grayscale PNG for threshold tuning.
    pub fn save_mask(name: String, mask: &Mask) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(name)?;
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder.write_image(
            mask.data(),
            mask.width(),
            mask.height(),
            image::ExtendedColorType::L8,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::image_helper::*;
    use crate::core_modules::frame::{Frame, Mask};

    fn temp_path(name: &str) -> String {
        std::env::temp_dir().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn save_solid_frame() {
        let width = 64u32;
        let height = 48u32;
        let buffer = vec![200u8; (width * height * 4) as usize];
        let frame = Frame::from_rgba(width, height, buffer).unwrap();

        save_frame(temp_path("pv_frame.png"), &frame).expect("Error Saving File.");
    }

    #[test]
    fn save_checkerboard_mask() {
        let mut mask = Mask::new(32, 32);
        for y in 0..32 {
            for x in 0..32 {
                mask.set(x, y, (x + y) % 2 == 0);
            }
        }

        save_mask(temp_path("pv_mask.png"), &mask).expect("Error Saving File.");
    }
}
