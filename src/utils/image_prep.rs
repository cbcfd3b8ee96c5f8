use image::{GrayImage, ImageError, Luma};
use std::path::Path;

/// Otsu's global threshold over the grey-level histogram
pub fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0f64;
    let mut best = 0f64;
    let mut threshold = 0u8;

    for (level, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        sum_bg += level as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum - sum_bg) / weight_fg as f64;
        let between = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);

        if between > best {
            best = between;
            threshold = level as u8;
        }
    }

    threshold
}

/// Pure black text on pure white
pub fn binarize(image: &GrayImage) -> GrayImage {
    let threshold = otsu_threshold(image);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        *pixel = if pixel[0] > threshold { Luma([255]) } else { Luma([0]) };
    }
    out
}

pub fn binarize_file(input: &Path, output: &Path) -> Result<(), ImageError> {
    let gray = image::open(input)?.to_luma8();
    binarize(&gray).save(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn two_tone() -> GrayImage {
        GrayImage::from_fn(20, 10, |x, _| if x < 10 { Luma([30]) } else { Luma([220]) })
    }

    #[test]
    fn test_threshold_separates_ink_from_paper() {
        let threshold = otsu_threshold(&two_tone());
        assert!((30..220).contains(&threshold));
    }

    #[test]
    fn test_binarize_two_tone() {
        let out = binarize(&two_tone());
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(19, 9)[0], 255);
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_binarize_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("page.png");
        let output = dir.path().join("page-bin.png");
        two_tone().save(&input).unwrap();

        binarize_file(&input, &output).unwrap();
        let written = image::open(&output).unwrap().to_luma8();
        assert_eq!(written.get_pixel(5, 5)[0], 0);
    }
}
