// SPDX-License-Identifier: PMPL-1.0-or-later

//! Software rendering of surfaces and volume slices into RGB images

use crate::model::geometry;
use crate::model::surface::{Surface, ViewTransform};
use crate::model::volume::Volume;
use crate::types::{Axis, SurfaceView};
use anyhow::{bail, Result};
use image::{Rgb, RgbImage};

const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const SURFACE_GRAY: f32 = 200.0;
/// Fraction of the image left empty around the projected surface
const MARGIN: f32 = 0.05;

/// Orthographic, z-buffered, Lambert-shaded rendering from a standard view.
/// Right hemispheres are mirrored so LATERAL always faces the viewer.
pub fn render_surface(surface: &Surface, view: SurfaceView, width: u32, height: u32) -> Result<RgbImage> {
    if width == 0 || height == 0 {
        bail!("image size {}x{} is empty", width, height);
    }
    let transform = ViewTransform::standard(view, surface.structure());
    let projected: Vec<[f32; 3]> = surface
        .coords
        .points
        .iter()
        .map(|p| transform.apply(*p))
        .collect();

    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);
    if projected.is_empty() {
        return Ok(image);
    }
    let (mut lo, mut hi) = ([f32::INFINITY; 2], [f32::NEG_INFINITY; 2]);
    for p in &projected {
        for a in 0..2 {
            lo[a] = lo[a].min(p[a]);
            hi[a] = hi[a].max(p[a]);
        }
    }
    let usable = [width as f32 * (1.0 - 2.0 * MARGIN), height as f32 * (1.0 - 2.0 * MARGIN)];
    let span = [(hi[0] - lo[0]).max(f32::EPSILON), (hi[1] - lo[1]).max(f32::EPSILON)];
    let scale = (usable[0] / span[0]).min(usable[1] / span[1]);
    let offset = [
        (width as f32 - span[0] * scale) * 0.5,
        (height as f32 - span[1] * scale) * 0.5,
    ];
    let to_screen = |p: [f32; 3]| -> [f32; 3] {
        [
            offset[0] + (p[0] - lo[0]) * scale,
            // image rows grow downward
            height as f32 - (offset[1] + (p[1] - lo[1]) * scale),
            p[2],
        ]
    };

    let mut depth = vec![f32::NEG_INFINITY; (width * height) as usize];
    for (tile, tri) in surface.topology.triangles.iter().enumerate() {
        let normal = surface.tile_normal(tile);
        let facing = geometry::dot(normal, transform.toward_viewer).abs();
        let shade = (40.0 + SURFACE_GRAY * facing).min(255.0) as u8;
        let v = tri.map(|n| to_screen(projected[n]));
        rasterize(&v, width, height, |x, y, z| {
            let slot = (y * width + x) as usize;
            if z > depth[slot] {
                depth[slot] = z;
                image.put_pixel(x, y, Rgb([shade, shade, shade]));
            }
        });
    }
    Ok(image)
}

/// Visit every pixel centre inside a screen-space triangle with its depth.
fn rasterize(v: &[[f32; 3]; 3], width: u32, height: u32, mut plot: impl FnMut(u32, u32, f32)) {
    let area = edge(v[0], v[1], v[2]);
    if area.abs() < f32::EPSILON {
        return;
    }
    let min_x = v.iter().map(|p| p[0]).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_x = v.iter().map(|p| p[0]).fold(f32::NEG_INFINITY, f32::max).ceil().min(width as f32 - 1.0);
    let min_y = v.iter().map(|p| p[1]).fold(f32::INFINITY, f32::min).floor().max(0.0) as u32;
    let max_y = v.iter().map(|p| p[1]).fold(f32::NEG_INFINITY, f32::max).ceil().min(height as f32 - 1.0);
    if max_x < 0.0 || max_y < 0.0 {
        return;
    }
    for y in min_y..=max_y as u32 {
        for x in min_x..=max_x as u32 {
            let p = [x as f32 + 0.5, y as f32 + 0.5, 0.0];
            let w0 = edge(v[1], v[2], p) / area;
            let w1 = edge(v[2], v[0], p) / area;
            let w2 = edge(v[0], v[1], p) / area;
            if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                plot(x, y, w0 * v[0][2] + w1 * v[1][2] + w2 * v[2][2]);
            }
        }
    }
}

fn edge(a: [f32; 3], b: [f32; 3], p: [f32; 3]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Grayscale image of one slice, windowed to the volume's value range.
/// Superior and anterior are at the top of the image.
pub fn render_slice(volume: &Volume, axis: Axis, slice: usize) -> Result<RgbImage> {
    let a = axis.index();
    if slice >= volume.dims[a] {
        bail!(
            "slice {} is outside 0 to {} along {:?}",
            slice,
            volume.dims[a].saturating_sub(1),
            axis
        );
    }
    let (u, v) = match axis {
        Axis::X => (1, 2),
        Axis::Y => (0, 2),
        Axis::Z => (0, 1),
    };
    let (width, height) = (volume.dims[u] as u32, volume.dims[v] as u32);
    if width == 0 || height == 0 {
        bail!("slice of {:?} is empty", volume.dims);
    }
    let (lo, hi) = volume.range();
    let span = if hi > lo { hi - lo } else { 1.0 };
    let mut image = RgbImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let mut ijk = [0usize; 3];
        ijk[a] = slice;
        ijk[u] = x as usize;
        ijk[v] = (height - 1 - y) as usize;
        let value = volume.get(ijk[0], ijk[1], ijk[2]);
        let gray = (((value - lo) / span) * 255.0).clamp(0.0, 255.0) as u8;
        *pixel = Rgb([gray, gray, gray]);
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::surface::tests::octahedron;

    #[test]
    fn surface_render_fills_centre() {
        let image = render_surface(&octahedron(), SurfaceView::Dorsal, 64, 64).unwrap();
        assert_ne!(*image.get_pixel(32, 32), BACKGROUND);
        assert_eq!(*image.get_pixel(0, 0), BACKGROUND);
        assert!(render_surface(&octahedron(), SurfaceView::Dorsal, 0, 64).is_err());
    }

    #[test]
    fn slice_puts_superior_at_top() {
        let mut volume = Volume::new([2, 1, 3], 1).unwrap();
        volume.set(0, 0, 2, 10.0);
        let image = render_slice(&volume, Axis::Y, 0).unwrap();
        assert_eq!(image.dimensions(), (2, 3));
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert_eq!(image.get_pixel(0, 2)[0], 0);
        assert!(render_slice(&volume, Axis::Y, 1).is_err());
    }
}
