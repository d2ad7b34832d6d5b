use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::render::FrameBuffer;

/// Owns the window surface and the internal-resolution frame the scene draws
/// into. Presenting scales the frame up to the window.
pub struct Presenter {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    surface_width: u32,
    surface_height: u32,
    frame: FrameBuffer,
}

impl Presenter {
    pub fn new(window: Arc<Window>, render_width: u32, render_height: u32) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            surface_width: size.width,
            surface_height: size.height,
            frame: FrameBuffer::new(render_width.max(1), render_height.max(1)),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.surface_width = width;
        self.surface_height = height;
        Ok(())
    }

    pub fn frame_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frame
    }

    pub fn present(&mut self) -> Result<(), Error> {
        if self.surface_width == 0 || self.surface_height == 0 {
            return Ok(());
        }
        self.frame.scale_into(
            self.pixels.frame_mut(),
            self.surface_width,
            self.surface_height,
        );
        self.pixels.render()
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }
}
