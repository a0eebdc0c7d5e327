//! Outlined, rotated text drawn onto an RGBA canvas.
//!
//! Each line is rasterized into a small sprite (stroke pass in the outline
//! color, then fill pass in the fill color), and the sprite is blitted onto
//! the canvas centered on the line's origin, rotated about that origin.

use ab_glyph::{Font, FontArc, PxScale, ScaleFont, point};
use image::{Rgba, RgbaImage};

use crate::overlay::{Color, StyleSettings, TextLine};

/// Outline width in pixels, centered on the glyph edge.
pub const STROKE_WIDTH: f32 = 2.0;

/// Coverage of a line of text, with room around it for the stroke.
struct Coverage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Coverage {
    fn get(&self, x: isize, y: isize) -> f32 {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return 0.0;
        }
        self.data[y as usize * self.width + x as usize]
    }
}

/// Rasterize `text` into a coverage buffer, padded by `pad` pixels per side.
///
/// A line wider than `max_extent` keeps only its middle `max_extent` pixels,
/// so the sprite stays centered on the same point.
fn rasterize(text: &str, font: &FontArc, pixel_height: f32, pad: usize, max_extent: f32) -> Coverage {
    let scale = PxScale::from(pixel_height);
    let scaled = font.as_scaled(scale);

    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    let mut previous = None;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }

    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let extent = caret_x.min(max_extent.max(1.0));
    let shift = (caret_x - extent) / 2.0;
    let width = extent.ceil().max(1.0) as usize + pad * 2;
    let height = (ascent - descent).ceil().max(1.0) as usize + pad * 2;
    let baseline_y = pad as f32 + ascent;

    let mut data = vec![0.0f32; width * height];
    for &(glyph_id, glyph_x) in &glyphs {
        if glyph_x + pixel_height < shift || glyph_x - shift > extent {
            continue;
        }
        let glyph = glyph_id.with_scale_and_position(scale, point(pad as f32 + glyph_x - shift, baseline_y));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let idx = y as usize * width + x as usize;
                    data[idx] = (data[idx] + coverage).min(1.0);
                }
            });
        }
    }

    Coverage { width, height, data }
}

/// Grow coverage by `radius` pixels (max over a disc).
fn dilate(src: &Coverage, radius: f32) -> Coverage {
    let r = radius.ceil() as isize;
    let offsets: Vec<(isize, isize)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| ((dx * dx + dy * dy) as f32) <= radius * radius)
        .collect();

    let mut data = vec![0.0f32; src.width * src.height];
    for y in 0..src.height as isize {
        for x in 0..src.width as isize {
            let v = offsets
                .iter()
                .map(|&(dx, dy)| src.get(x + dx, y + dy))
                .fold(0.0f32, f32::max);
            data[y as usize * src.width + x as usize] = v;
        }
    }
    Coverage {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Source-over blend of a straight-alpha color onto a pixel.
fn blend(dst: &mut Rgba<u8>, color: [f32; 3], alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    let alpha = alpha.min(1.0);
    let da = dst[3] as f32 / 255.0;
    let out_a = alpha + da * (1.0 - alpha);
    if out_a <= 0.0 {
        return;
    }
    for c in 0..3 {
        let d = dst[c] as f32;
        let v = (color[c] * alpha + d * da * (1.0 - alpha)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

fn channels(color: Color) -> [f32; 3] {
    [color.r as f32, color.g as f32, color.b as f32]
}

/// Build the outlined text sprite: stroke first, fill on top.
fn text_sprite(text: &str, font: &FontArc, style: &StyleSettings, max_extent: f32) -> RgbaImage {
    let pad = STROKE_WIDTH.ceil() as usize + 1;
    let fill = rasterize(text, font, style.size as f32, pad, max_extent);
    let stroke = dilate(&fill, STROKE_WIDTH / 2.0);

    let mut sprite = RgbaImage::new(fill.width as u32, fill.height as u32);
    let (fill_rgb, outline_rgb) = (channels(style.fill), channels(style.outline));
    for (x, y, px) in sprite.enumerate_pixels_mut() {
        let idx = y as usize * fill.width + x as usize;
        blend(px, outline_rgb, stroke.data[idx]);
        blend(px, fill_rgb, fill.data[idx]);
    }
    sprite
}

/// Bilinear sample in premultiplied space; returns straight RGB and alpha.
fn sample(sprite: &RgbaImage, x: f32, y: f32) -> ([f32; 3], f32) {
    let (w, h) = (sprite.width() as i64, sprite.height() as i64);
    let x0 = x.floor();
    let y0 = y.floor();
    let (fx, fy) = (x - x0, y - y0);
    let mut acc = [0.0f32; 4];
    for (dx, dy, weight) in [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ] {
        let sx = x0 as i64 + dx;
        let sy = y0 as i64 + dy;
        if weight <= 0.0 || sx < 0 || sy < 0 || sx >= w || sy >= h {
            continue;
        }
        let p = sprite.get_pixel(sx as u32, sy as u32);
        let a = p[3] as f32 / 255.0;
        acc[0] += p[0] as f32 * a * weight;
        acc[1] += p[1] as f32 * a * weight;
        acc[2] += p[2] as f32 * a * weight;
        acc[3] += a * weight;
    }
    if acc[3] <= 0.0 {
        return ([0.0; 3], 0.0);
    }
    ([acc[0] / acc[3], acc[1] / acc[3], acc[2] / acc[3]], acc[3])
}

/// Draw `sprite` centered at `(cx, cy)`, rotated clockwise by `radians`.
fn blit_rotated(canvas: &mut RgbaImage, sprite: &RgbaImage, cx: f32, cy: f32, radians: f32) {
    let (sin, cos) = radians.sin_cos();
    let half_w = sprite.width() as f32 / 2.0;
    let half_h = sprite.height() as f32 / 2.0;

    // Axis-aligned bounds of the rotated sprite on the canvas.
    let ext_x = half_w * cos.abs() + half_h * sin.abs();
    let ext_y = half_w * sin.abs() + half_h * cos.abs();
    let min_x = (cx - ext_x).floor().max(0.0) as u32;
    let min_y = (cy - ext_y).floor().max(0.0) as u32;
    let max_x = ((cx + ext_x).ceil().max(0.0) as u32).min(canvas.width());
    let max_y = ((cy + ext_y).ceil().max(0.0) as u32).min(canvas.height());

    for y in min_y..max_y {
        for x in min_x..max_x {
            // Inverse-rotate the pixel center into sprite space.
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let sx = dx * cos + dy * sin + half_w - 0.5;
            let sy = -dx * sin + dy * cos + half_h - 0.5;
            let (rgb, alpha) = sample(sprite, sx, sy);
            if alpha > 0.0 {
                blend(canvas.get_pixel_mut(x, y), rgb, alpha);
            }
        }
    }
}

/// Draw one overlay line at its normalized position and rotation.
///
/// Blank lines are skipped.
pub fn draw_line(canvas: &mut RgbaImage, line: &TextLine, style: &StyleSettings, font: &FontArc) {
    if line.is_blank() {
        return;
    }
    // Centered on a point inside the canvas, nothing past twice the
    // diagonal can land on it.
    let diagonal = (canvas.width() as f32).hypot(canvas.height() as f32);
    let sprite = text_sprite(&line.text, font, style, diagonal * 2.0);
    let (cx, cy) = line.position.to_pixels(canvas.width(), canvas.height());
    blit_rotated(canvas, &sprite, cx, cy, line.rotation.to_radians());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::fonts::FontBook;
    use crate::overlay::{FontFamily, TextPosition};

    fn line(text: &str, x: f32, y: f32, rotation: f32) -> TextLine {
        TextLine {
            text: text.to_string(),
            position: TextPosition::new(x, y),
            rotation,
        }
    }

    fn font() -> FontArc {
        FontBook::embedded().font_for(FontFamily::Impact).clone()
    }

    fn red_fill() -> StyleSettings {
        StyleSettings {
            fill: Color::rgb(255, 0, 0),
            ..StyleSettings::default()
        }
    }

    /// Bounding box of pixels that differ from `background`.
    fn changed_bounds(img: &RgbaImage, background: Rgba<u8>) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in img.enumerate_pixels() {
            if *p != background {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((a, b, c, d)) => (a.min(x), b.min(y), c.max(x), d.max(y)),
                });
            }
        }
        bounds
    }

    #[test]
    fn test_sprite_has_fill_and_outline() {
        let sprite = text_sprite("GG", &font(), &red_fill(), f32::MAX);
        let has_fill = sprite.pixels().any(|p| p[0] > 240 && p[1] < 15 && p[3] > 240);
        let has_outline = sprite.pixels().any(|p| p[0] < 60 && p[1] < 15 && p[3] > 240);
        assert!(has_fill, "fill color missing");
        assert!(has_outline, "outline color missing");
    }

    #[test]
    fn test_text_is_centered_on_position() {
        let background = Rgba([40, 120, 200, 255]);
        let mut canvas = RgbaImage::from_pixel(400, 300, background);
        draw_line(&mut canvas, &line("GG", 50.0, 50.0, 0.0), &red_fill(), &font());

        let (x0, y0, x1, y1) = changed_bounds(&canvas, background).expect("nothing drawn");
        let center_x = (x0 + x1) as f32 / 2.0;
        let center_y = (y0 + y1) as f32 / 2.0;
        assert!((center_x - 200.0).abs() < 8.0, "center_x={}", center_x);
        assert!((center_y - 150.0).abs() < 20.0, "center_y={}", center_y);
    }

    #[test]
    fn test_blank_line_draws_nothing() {
        let background = Rgba([1, 2, 3, 255]);
        let mut canvas = RgbaImage::from_pixel(50, 50, background);
        draw_line(&mut canvas, &line("   ", 50.0, 50.0, 0.0), &red_fill(), &font());
        assert!(changed_bounds(&canvas, background).is_none());
    }

    #[test]
    fn test_rotation_changes_footprint() {
        let background = Rgba([255, 255, 255, 255]);
        let mut flat = RgbaImage::from_pixel(400, 400, background);
        let mut tilted = flat.clone();
        draw_line(&mut flat, &line("WIDE TEXT", 50.0, 50.0, 0.0), &red_fill(), &font());
        draw_line(&mut tilted, &line("WIDE TEXT", 50.0, 50.0, 45.0), &red_fill(), &font());

        let (_, fy0, _, fy1) = changed_bounds(&flat, background).unwrap();
        let (_, ty0, _, ty1) = changed_bounds(&tilted, background).unwrap();
        assert!(ty1 - ty0 > fy1 - fy0, "rotated text should be taller");
    }

    #[test]
    fn test_text_near_edge_is_clipped_not_panicking() {
        let mut canvas = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255]));
        draw_line(&mut canvas, &line("EDGE CASE", 95.0, 95.0, -45.0), &red_fill(), &font());
    }

    #[test]
    fn test_long_line_sprite_is_bounded_by_canvas() {
        let long = "W".repeat(2_000);
        let sprite = text_sprite(&long, &font(), &red_fill(), 500.0);
        assert!(sprite.width() <= 510, "width={}", sprite.width());

        let background = Rgba([40, 120, 200, 255]);
        let mut canvas = RgbaImage::from_pixel(200, 100, background);
        draw_line(&mut canvas, &line(&long, 50.0, 50.0, 0.0), &red_fill(), &font());
        let (x0, _, x1, _) = changed_bounds(&canvas, background).expect("nothing drawn");
        assert_eq!((x0, x1), (0, 199));
    }

    #[test]
    fn test_dilate_grows_coverage() {
        let mut data = vec![0.0; 25];
        data[12] = 1.0;
        let src = Coverage {
            width: 5,
            height: 5,
            data,
        };
        let grown = dilate(&src, 1.0);
        assert_eq!(grown.data.iter().filter(|&&v| v > 0.0).count(), 5);
    }
}
