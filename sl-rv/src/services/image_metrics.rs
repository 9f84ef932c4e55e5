//! Grayscale image measurements
//!
//! Pure functions over `image::GrayImage` shared by the Layer 0 checks and
//! the severity estimator. No allocation beyond what each metric needs.

use image::{imageops::FilterType, DynamicImage, GrayImage};

/// Side length of the square image the severity estimator works on
pub const ANALYSIS_SIZE: u32 = 224;

/// Summary statistics used by the quality checks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub width: u32,
    pub height: u32,
    pub mean: f64,
    pub std_dev: f64,
    pub laplacian_variance: f64,
}

impl ImageStats {
    pub fn measure(gray: &GrayImage) -> Self {
        let (mean, std_dev) = mean_and_std_dev(gray);
        Self {
            width: gray.width(),
            height: gray.height(),
            mean,
            std_dev,
            laplacian_variance: laplacian_variance(gray),
        }
    }
}

/// Mean and population standard deviation of pixel intensity
pub fn mean_and_std_dev(img: &GrayImage) -> (f64, f64) {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for pixel in img.pixels() {
        let val = pixel.0[0] as f64;
        sum += val;
        sum_sq += val * val;
        count += 1;
    }

    if count == 0 {
        return (0.0, 0.0);
    }

    let mean = sum / count as f64;
    let variance = (sum_sq / count as f64) - (mean * mean);
    (mean, variance.max(0.0).sqrt())
}

/// Variance of the 3x3 Laplacian `[0,1,0; 1,-4,1; 0,1,0]` response
///
/// Sharp images score in the hundreds or thousands; heavy blur stays
/// below 50.
pub fn laplacian_variance(img: &GrayImage) -> f64 {
    let (w, h) = (img.width(), img.height());
    if w < 3 || h < 3 {
        return 0.0;
    }

    let at = |x: u32, y: u32| img.get_pixel(x, y).0[0] as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut count = 0u64;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let laplacian =
                at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4.0 * at(x, y);
            sum += laplacian;
            sum_sq += laplacian * laplacian;
            count += 1;
        }
    }

    if count == 0 {
        return 0.0;
    }

    let mean = sum / count as f64;
    ((sum_sq / count as f64) - mean * mean).max(0.0)
}

/// Fraction of pixels strictly darker than `threshold`
pub fn dark_ratio(img: &GrayImage, threshold: u8) -> f64 {
    let total = img.pixels().len();
    if total == 0 {
        return 0.0;
    }
    let dark = img.pixels().filter(|p| p.0[0] < threshold).count();
    dark as f64 / total as f64
}

/// Otsu's threshold: pixels above it are foreground
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &n)| i as f64 * n as f64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = -1.0f64;
    let mut background_weight = 0u64;
    let mut background_sum = 0.0f64;

    for (t, &n) in histogram.iter().enumerate() {
        background_weight += n;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }
        background_sum += t as f64 * n as f64;

        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight as f64;
        let between = background_weight as f64
            * foreground_weight as f64
            * (background_mean - foreground_mean).powi(2);

        if between > best_variance {
            best_variance = between;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Fraction of pixels on an edge
///
/// Sobel L1 gradient magnitude with two-level hysteresis: pixels at or
/// above `high` are edges, pixels at or above `low` are edges when an
/// 8-neighbour is at or above `high`.
pub fn edge_density(img: &GrayImage, low: f64, high: f64) -> f64 {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: usize, y: usize| img.get_pixel(x as u32, y as u32).0[0] as f64;
    let mut magnitude = vec![0.0f64; w * h];

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            magnitude[y * w + x] = gx.abs() + gy.abs();
        }
    }

    let mut edges = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let m = magnitude[y * w + x];
            if m >= high {
                edges += 1;
            } else if m >= low {
                let has_strong_neighbour = (y - 1..=y + 1)
                    .flat_map(|ny| (x - 1..=x + 1).map(move |nx| (nx, ny)))
                    .any(|(nx, ny)| magnitude[ny * w + nx] >= high);
                if has_strong_neighbour {
                    edges += 1;
                }
            }
        }
    }

    edges as f64 / (w * h) as f64
}

/// Connected foreground region of a binary mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component {
    /// Pixel count
    pub area: usize,
    /// Bounding box width
    pub width: u32,
    /// Bounding box height
    pub height: u32,
}

/// 8-connected components of `mask` (row-major, `width * height` long)
pub fn connected_components(mask: &[bool], width: u32, height: u32) -> Vec<Component> {
    let (w, h) = (width as usize, height as usize);
    debug_assert_eq!(mask.len(), w * h);

    let mut visited = vec![false; mask.len()];
    let mut components = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }

        visited[start] = true;
        stack.push(start);
        let (mut min_x, mut max_x) = (start % w, start % w);
        let (mut min_y, mut max_y) = (start / w, start / w);
        let mut area = 0usize;

        while let Some(idx) = stack.pop() {
            area += 1;
            let (x, y) = (idx % w, idx / w);
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }

        components.push(Component {
            area,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        });
    }

    components
}

/// Downscale to the square analysis size in grayscale
pub fn analysis_gray(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    image::imageops::resize(&gray, ANALYSIS_SIZE, ANALYSIS_SIZE, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn checkerboard(size: u32, cell: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_flat_image_statistics() {
        let img = GrayImage::from_pixel(50, 40, Luma([100]));
        let stats = ImageStats::measure(&img);
        assert_eq!((stats.width, stats.height), (50, 40));
        assert!((stats.mean - 100.0).abs() < 1e-9);
        assert!(stats.std_dev.abs() < 1e-9);
        assert!(stats.laplacian_variance.abs() < 1e-9);
    }

    #[test]
    fn test_checkerboard_is_sharp() {
        let img = checkerboard(64, 4);
        assert!(laplacian_variance(&img) > 1000.0);
        let (mean, std_dev) = mean_and_std_dev(&img);
        assert!((mean - 127.5).abs() < 1.0);
        assert!(std_dev > 100.0);
    }

    #[test]
    fn test_tiny_image_has_zero_laplacian() {
        let img = GrayImage::from_pixel(2, 2, Luma([10]));
        assert_eq!(laplacian_variance(&img), 0.0);
        assert_eq!(edge_density(&img, 50.0, 150.0), 0.0);
    }

    #[test]
    fn test_dark_ratio() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 3 { Luma([20]) } else { Luma([200]) });
        assert!((dark_ratio(&img, 80) - 0.3).abs() < 1e-9);
        assert_eq!(dark_ratio(&img, 0), 0.0);
    }

    #[test]
    fn test_otsu_separates_two_levels() {
        let img = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([40]) } else { Luma([210]) });
        let t = otsu_threshold(&img);
        assert!((40..210).contains(&t), "threshold {} between levels", t);
    }

    #[test]
    fn test_edge_density_of_single_step() {
        let img = GrayImage::from_fn(20, 20, |x, _| if x < 10 { Luma([0]) } else { Luma([255]) });
        let density = edge_density(&img, 50.0, 150.0);
        // Two columns either side of the step, minus the border rows
        assert!((density - (2.0 * 18.0) / 400.0).abs() < 1e-9);
        assert_eq!(edge_density(&GrayImage::from_pixel(20, 20, Luma([90])), 50.0, 150.0), 0.0);
    }

    #[test]
    fn test_connected_components_diagonal_join() {
        // X . .
        // . X .
        // . . . X
        let (w, h) = (4u32, 3u32);
        let mut mask = vec![false; (w * h) as usize];
        mask[0] = true;
        mask[5] = true;
        mask[11] = true;

        let mut components = connected_components(&mask, w, h);
        components.sort_by_key(|c| std::cmp::Reverse(c.area));
        assert_eq!(components.len(), 2);
        assert_eq!(components[0], Component { area: 2, width: 2, height: 2 });
        assert_eq!(components[1], Component { area: 1, width: 1, height: 1 });
    }

    #[test]
    fn test_analysis_gray_is_square() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(640, 480, Luma([128])));
        let gray = analysis_gray(&img);
        assert_eq!(gray.dimensions(), (ANALYSIS_SIZE, ANALYSIS_SIZE));
    }
}
