/// RGBA8 pixel surface. A zero alpha marks a pixel nothing was drawn to.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    pub fn fill(&mut self, color: [u8; 4]) {
        for pixel in self.rgba.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    /// Writes one pixel; coordinates outside the surface are ignored.
    pub fn put(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.rgba[offset..offset + 4].copy_from_slice(&color);
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut color = [0; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }

    /// Copies every drawn pixel of `layer` over this surface.
    pub fn overlay(&mut self, layer: &FrameBuffer) {
        if layer.width != self.width || layer.height != self.height {
            return;
        }
        for (dst, src) in self
            .rgba
            .chunks_exact_mut(4)
            .zip(layer.rgba.chunks_exact(4))
        {
            if src[3] != 0 {
                dst.copy_from_slice(src);
            }
        }
    }

    /// Nearest-neighbour scale into an RGBA target of another size.
    pub fn scale_into(&self, target: &mut [u8], target_width: u32, target_height: u32) {
        if self.width == 0 || self.height == 0 || target_width == 0 || target_height == 0 {
            return;
        }
        let expected = target_width as usize * target_height as usize * 4;
        if target.len() < expected {
            return;
        }
        let source_width = self.width as usize;
        for (out_y, row) in target[..expected]
            .chunks_exact_mut(target_width as usize * 4)
            .enumerate()
        {
            let src_y = (out_y * self.height as usize / target_height as usize)
                .min(self.height as usize - 1);
            let src_row = &self.rgba[src_y * source_width * 4..(src_y + 1) * source_width * 4];
            for (out_x, pixel) in row.chunks_exact_mut(4).enumerate() {
                let src_x =
                    (out_x * source_width / target_width as usize).min(source_width - 1);
                pixel.copy_from_slice(&src_row[src_x * 4..src_x * 4 + 4]);
                pixel[3] = 255;
            }
        }
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * 4)
    }
}

/// Scales a colour toward black. `factor` 1 leaves it unchanged.
pub fn shade(color: [u8; 4], factor: f32) -> [u8; 4] {
    let factor = factor.clamp(0.0, 1.0);
    [
        (color[0] as f32 * factor) as u8,
        (color[1] as f32 * factor) as u8,
        (color[2] as f32 * factor) as u8,
        color[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut frame = FrameBuffer::new(4, 3);
        frame.put(-1, 0, [255; 4]);
        frame.put(4, 0, [255; 4]);
        frame.put(0, 3, [255; 4]);
        assert!(frame.as_bytes().iter().all(|byte| *byte == 0));
        frame.put(3, 2, [1, 2, 3, 4]);
        assert_eq!(frame.get(3, 2), Some([1, 2, 3, 4]));
        assert_eq!(frame.get(4, 2), None);
    }

    #[test]
    fn overlay_skips_undrawn_pixels() {
        let mut base = FrameBuffer::new(2, 1);
        base.fill([10, 10, 10, 255]);
        let mut layer = FrameBuffer::new(2, 1);
        layer.put(1, 0, [200, 0, 0, 255]);
        base.overlay(&layer);
        assert_eq!(base.get(0, 0), Some([10, 10, 10, 255]));
        assert_eq!(base.get(1, 0), Some([200, 0, 0, 255]));
    }

    #[test]
    fn scale_into_doubles_pixels() {
        let mut frame = FrameBuffer::new(2, 1);
        frame.put(0, 0, [1, 1, 1, 255]);
        frame.put(1, 0, [2, 2, 2, 255]);
        let mut target = vec![0u8; 4 * 2 * 4];
        frame.scale_into(&mut target, 4, 2);
        let reds: Vec<u8> = target.chunks_exact(4).map(|pixel| pixel[0]).collect();
        assert_eq!(reds, vec![1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn shade_clamps_factor_and_keeps_alpha() {
        assert_eq!(shade([100, 50, 10, 7], 0.5), [50, 25, 5, 7]);
        assert_eq!(shade([100, 50, 10, 7], 2.0), [100, 50, 10, 7]);
        assert_eq!(shade([100, 50, 10, 7], -1.0), [0, 0, 0, 7]);
    }
}
