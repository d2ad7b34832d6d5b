use super::frame::FrameBuffer;
use super::texture::Image;

/// Share of the screen height the held weapon occupies.
const WEAPON_SCREEN_FRACTION: f32 = 0.5;

/// Draws the held weapon anchored to the bottom centre of the screen.
/// `offset` is the bob displacement in pixels; positive y moves it down.
pub(crate) fn draw_weapon(frame: &mut FrameBuffer, image: &Image, offset: (f32, f32)) {
    let screen_height = frame.height() as f32;
    let scale = screen_height * WEAPON_SCREEN_FRACTION / image.height() as f32;
    let width = image.width() as f32 * scale;
    let height = image.height() as f32 * scale;
    let left = frame.width() as f32 / 2.0 - width / 2.0 + offset.0;
    let top = screen_height - height + offset.1;

    let dst_w = width.round() as i32;
    let dst_h = height.round() as i32;
    if dst_w <= 0 || dst_h <= 0 {
        return;
    }
    let origin_x = left.round() as i32;
    let origin_y = top.round() as i32;
    for dy in 0..dst_h {
        let src_y = (dy as i64 * image.height() as i64) / dst_h as i64;
        for dx in 0..dst_w {
            let src_x = (dx as i64 * image.width() as i64) / dst_w as i64;
            let texel = image.texel(src_x, src_y);
            if texel[3] == 0 {
                continue;
            }
            frame.put(origin_x + dx, origin_y + dy, texel);
        }
    }
}
