//! Region cropping from page images.

use crate::core::errors::ImageCropError;
use crate::processors::geometry::{NormalizedBBox, NormalizedPoint, PixelRect};
use ::image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

/// Fill color for pixels outside a region's polygon.
const OUTSIDE_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Crops a normalized region out of a page image.
///
/// The bbox is mapped to pixels with floored left/top and ceiled right/bottom
/// edges, then intersected with the image. When `polygon` has at least three
/// points, pixels of the crop outside the polygon are filled with white.
///
/// # Arguments
///
/// * `image` - The page image.
/// * `bbox` - Region bounds in `[0, 1000]` coordinates.
/// * `polygon` - Optional region outline in `[0, 1000]` coordinates.
///
/// # Returns
///
/// * `Ok(RgbImage)` - The cropped (and possibly masked) region.
/// * `Err(ImageCropError)` - If the image is empty, the bbox is invalid, or the
///   crop rectangle is empty.
pub fn crop_region(
    image: &RgbImage,
    bbox: &NormalizedBBox,
    polygon: Option<&[NormalizedPoint]>,
) -> Result<RgbImage, ImageCropError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageCropError::EmptyImage { width, height });
    }
    if !bbox.is_valid() {
        return Err(ImageCropError::InvalidBBox {
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
        });
    }
    let rect = bbox
        .to_pixel_rect(width, height)
        .ok_or(ImageCropError::EmptyCropRect)?;

    let mut cropped = imageops::crop_imm(image, rect.x, rect.y, rect.width, rect.height).to_image();

    // Rectangular outlines cover the whole crop.
    if let Some(polygon) = polygon
        && polygon.len() >= 3
        && polygon != bbox.polygon().as_slice()
    {
        apply_polygon_mask(&mut cropped, &rect, polygon, width, height);
    }
    Ok(cropped)
}

fn apply_polygon_mask(
    cropped: &mut RgbImage,
    rect: &PixelRect,
    polygon: &[NormalizedPoint],
    image_width: u32,
    image_height: u32,
) {
    let to_local = |p: &NormalizedPoint| {
        let px = (p.x as f64 * image_width as f64 / 1000.0).round() as i32 - rect.x as i32;
        let py = (p.y as f64 * image_height as f64 / 1000.0).round() as i32 - rect.y as i32;
        Point::new(px, py)
    };

    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for point in polygon.iter().map(to_local) {
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    // The rasterizer rejects an explicitly closed outline.
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return;
    }

    let mut mask = GrayImage::new(cropped.width(), cropped.height());
    draw_polygon_mut(&mut mask, &points, Luma([255u8]));
    for (x, y, pixel) in cropped.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == 0 {
            *pixel = OUTSIDE_FILL;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]))
    }

    #[test]
    fn test_crop_full_page() {
        let image = gradient(100, 50);
        let bbox = NormalizedBBox::new(0, 0, 1000, 1000);
        let crop = crop_region(&image, &bbox, None).unwrap();
        assert_eq!(crop.dimensions(), (100, 50));
    }

    #[test]
    fn test_crop_rounds_outward() {
        let image = gradient(10, 10);
        let bbox = NormalizedBBox::new(333, 333, 667, 667);
        let crop = crop_region(&image, &bbox, None).unwrap();
        assert_eq!(crop.dimensions(), (4, 4));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([3, 3, 7]));
    }

    #[test]
    fn test_crop_errors() {
        let image = gradient(10, 10);
        assert!(matches!(
            crop_region(&image, &NormalizedBBox::new(10, 10, 5, 20), None),
            Err(ImageCropError::InvalidBBox { x1: 10, x2: 5, .. })
        ));
        let empty = RgbImage::new(0, 0);
        assert!(matches!(
            crop_region(&empty, &NormalizedBBox::new(0, 0, 10, 10), None),
            Err(ImageCropError::EmptyImage { .. })
        ));
    }

    #[test]
    fn test_polygon_mask_fills_outside_with_white() {
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let bbox = NormalizedBBox::new(0, 0, 1000, 1000);
        // Triangle covering the upper-left half of the page.
        let polygon = [
            NormalizedPoint::new(0, 0),
            NormalizedPoint::new(1000, 0),
            NormalizedPoint::new(0, 1000),
            NormalizedPoint::new(0, 0),
        ];
        let crop = crop_region(&image, &bbox, Some(&polygon)).unwrap();
        assert_eq!(crop.get_pixel(5, 5), &Rgb([0, 0, 0]));
        assert_eq!(crop.get_pixel(95, 95), &OUTSIDE_FILL);
    }

    #[test]
    fn test_rectangle_polygon_leaves_crop_untouched() {
        let image = RgbImage::from_pixel(20, 20, Rgb([9, 9, 9]));
        let bbox = NormalizedBBox::new(100, 100, 900, 900);
        let crop = crop_region(&image, &bbox, Some(&bbox.polygon())).unwrap();
        assert!(crop.pixels().all(|p| *p == Rgb([9, 9, 9])));
    }
}
