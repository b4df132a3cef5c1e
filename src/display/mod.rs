// SPDX-License-Identifier: PMPL-1.0-or-later

//! Image-display shim: show an RGB image in a window or save it as JPEG

use crate::error::{CommandError, CommandResult};
use crate::io;
use eframe::{egui, App, Frame, NativeOptions};
use image::RgbImage;
use std::cell::Cell;
use std::path::Path;
use tracing::debug;

/// Largest viewer window; bigger images scroll inside it.
const MAX_WINDOW: [f32; 2] = [1024.0, 768.0];
const FRAME_MARGIN: f32 = 16.0;

thread_local! {
    static WINDOWS_ALLOWED: Cell<bool> = const { Cell::new(false) };
}

/// Permission for the current thread to open viewer windows, held while an
/// operation that needs a display runs. Dropping it withdraws the permission.
#[must_use]
pub struct WindowPermit {
    previous: bool,
}

pub fn allow_windows() -> WindowPermit {
    WindowPermit {
        previous: WINDOWS_ALLOWED.with(|allowed| allowed.replace(true)),
    }
}

impl Drop for WindowPermit {
    fn drop(&mut self) {
        WINDOWS_ALLOWED.with(|allowed| allowed.set(self.previous));
    }
}

pub fn windows_allowed() -> bool {
    WINDOWS_ALLOWED.with(Cell::get)
}

/// Where a display operation sends its rendered image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget<'a> {
    Window { title: &'a str },
    File(&'a Path),
}

/// Write the image, or block in a viewer window until it is closed.
pub fn present(image: &RgbImage, target: ImageTarget<'_>) -> CommandResult<()> {
    match target {
        ImageTarget::File(path) => io::write_image(image, path),
        ImageTarget::Window { .. } if !windows_allowed() => Err(CommandError::Kernel {
            operation: "image viewer".to_string(),
            message: "this operation runs without a display".to_string(),
        }),
        ImageTarget::Window { title } => ImageViewer::run(title, image.clone()),
    }
}

/// How the viewer lays out its image
#[derive(Debug, Clone, Copy, PartialEq)]
enum ViewerLayout {
    /// The whole image fits; show it as a fixed-size label in a window of
    /// exactly that size.
    Fixed { window: [f32; 2] },
    /// The image is larger than the biggest window; scroll inside it.
    Scrolling { window: [f32; 2] },
}

impl ViewerLayout {
    fn for_image(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        if w <= MAX_WINDOW[0] && h <= MAX_WINDOW[1] {
            ViewerLayout::Fixed {
                window: [w + FRAME_MARGIN, h + FRAME_MARGIN],
            }
        } else {
            ViewerLayout::Scrolling {
                window: [w.min(MAX_WINDOW[0]) + FRAME_MARGIN, h.min(MAX_WINDOW[1]) + FRAME_MARGIN],
            }
        }
    }

    fn window(self) -> [f32; 2] {
        match self {
            ViewerLayout::Fixed { window } | ViewerLayout::Scrolling { window } => window,
        }
    }
}

struct ImageViewer {
    image: RgbImage,
    layout: ViewerLayout,
    texture: Option<egui::TextureHandle>,
}

impl ImageViewer {
    fn run(title: &str, image: RgbImage) -> CommandResult<()> {
        debug!(
            "opening viewer for {}x{} image",
            image.width(),
            image.height()
        );
        let layout = ViewerLayout::for_image(image.width(), image.height());
        let mut options = NativeOptions::default();
        options.viewport = egui::ViewportBuilder::default()
            .with_title(title)
            .with_inner_size(layout.window())
            .with_resizable(matches!(layout, ViewerLayout::Scrolling { .. }));
        let app = Self {
            image,
            layout,
            texture: None,
        };
        eframe::run_native(title, options, Box::new(|_cc| Box::new(app))).map_err(|err| {
            CommandError::Kernel {
                operation: "image viewer".to_string(),
                message: format!("failed to open window: {err}"),
            }
        })
    }

    fn texture(&mut self, ctx: &egui::Context) -> egui::TextureHandle {
        let image = &self.image;
        self.texture
            .get_or_insert_with(|| {
                let size = [image.width() as usize, image.height() as usize];
                let pixels = egui::ColorImage::from_rgb(size, image.as_raw());
                ctx.load_texture("image", pixels, egui::TextureOptions::NEAREST)
            })
            .clone()
    }
}

impl App for ImageViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        let texture = self.texture(ctx);
        let layout = self.layout;
        egui::CentralPanel::default().show(ctx, |ui| match layout {
            ViewerLayout::Fixed { .. } => {
                ui.image(&texture);
            }
            ViewerLayout::Scrolling { .. } => {
                egui::ScrollArea::both().show(ui, |ui| {
                    ui.image(&texture);
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn file_target_writes_jpeg() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("shot.jpg");
        let image = RgbImage::from_pixel(8, 8, Rgb([10, 20, 30]));
        present(&image, ImageTarget::File(&path)).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn small_images_use_a_fixed_window() {
        assert_eq!(
            ViewerLayout::for_image(640, 480),
            ViewerLayout::Fixed {
                window: [656.0, 496.0]
            }
        );
        assert_eq!(
            ViewerLayout::for_image(1024, 768).window(),
            [1040.0, 784.0]
        );
    }

    #[test]
    fn large_images_scroll_inside_the_largest_window() {
        assert_eq!(
            ViewerLayout::for_image(2000, 300),
            ViewerLayout::Scrolling {
                window: [1040.0, 316.0]
            }
        );
    }

    #[test]
    fn windows_need_a_permit() {
        let image = RgbImage::new(4, 4);
        assert!(!windows_allowed());
        let err = present(&image, ImageTarget::Window { title: "test" }).unwrap_err();
        assert!(err.to_string().contains("without a display"));

        let permit = allow_windows();
        assert!(windows_allowed());
        let nested = allow_windows();
        drop(nested);
        assert!(windows_allowed());
        drop(permit);
        assert!(!windows_allowed());
    }
}
