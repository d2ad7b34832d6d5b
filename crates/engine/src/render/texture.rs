use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use image::ImageReader;
use thiserror::Error;
use tracing::{info, warn};

use crate::world::TextureId;

const PLACEHOLDER_SIZE: u32 = 16;
const PLACEHOLDER_CELL: u32 = 4;
const PLACEHOLDER_DARK: [u8; 4] = [24, 24, 24, 255];
const PLACEHOLDER_LIGHT: [u8; 4] = [220, 0, 220, 255];

/// Decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl Image {
    /// Returns `None` when the buffer does not hold `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            rgba: color.repeat(width as usize * height as usize),
        }
    }

    pub fn checkerboard() -> Self {
        let mut rgba = Vec::with_capacity((PLACEHOLDER_SIZE * PLACEHOLDER_SIZE * 4) as usize);
        for y in 0..PLACEHOLDER_SIZE {
            for x in 0..PLACEHOLDER_SIZE {
                let light = (x / PLACEHOLDER_CELL + y / PLACEHOLDER_CELL) % 2 == 0;
                rgba.extend_from_slice(if light {
                    &PLACEHOLDER_LIGHT
                } else {
                    &PLACEHOLDER_DARK
                });
            }
        }
        Self {
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            rgba,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel at integer coordinates, wrapped into the image.
    pub fn texel(&self, x: i64, y: i64) -> [u8; 4] {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        let offset = (y * self.width as usize + x) * 4;
        let mut color = [0; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        color
    }

    /// Nearest-neighbour lookup with repeat wrapping; `u`/`v` of 1 span the image once.
    pub fn sample(&self, u: f32, v: f32) -> [u8; 4] {
        let x = (u * self.width as f32).floor();
        let y = (v * self.height as f32).floor();
        if !x.is_finite() || !y.is_finite() {
            return self.texel(0, 0);
        }
        self.texel(x as i64, y as i64)
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to open image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub fn load_image(path: &Path) -> Result<Image, AssetError> {
    let reader = ImageReader::open(path).map_err(|source| AssetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let decoded = reader.decode().map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decoded.to_rgba8();
    Ok(Image {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Images indexed by [`TextureId`]. Missing or undecodable entries resolve to
/// a checkerboard and are reported once per id.
#[derive(Debug)]
pub struct AssetTable {
    images: Vec<Option<Image>>,
    placeholder: Image,
    warned: Mutex<HashSet<TextureId>>,
}

impl Default for AssetTable {
    fn default() -> Self {
        Self::from_images(Vec::new())
    }
}

impl AssetTable {
    pub fn from_images(images: Vec<Image>) -> Self {
        Self {
            images: images.into_iter().map(Some).collect(),
            placeholder: Image::checkerboard(),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Loads every path in order; the position in `paths` becomes the texture id.
    pub fn load(paths: &[PathBuf]) -> Self {
        let mut table = Self::from_images(Vec::new());
        for (index, path) in paths.iter().enumerate() {
            match load_image(path) {
                Ok(image) => table.images.push(Some(image)),
                Err(error) => {
                    table.warn_once(
                        TextureId(index as u16),
                        Some(path.as_path()),
                        &error.to_string(),
                    );
                    table.images.push(None);
                }
            }
        }
        info!(
            requested = paths.len(),
            loaded = table.images.iter().filter(|image| image.is_some()).count(),
            "textures_loaded"
        );
        table
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn contains(&self, id: TextureId) -> bool {
        matches!(self.images.get(id.0 as usize), Some(Some(_)))
    }

    pub fn get(&self, id: TextureId) -> &Image {
        match self.images.get(id.0 as usize) {
            Some(Some(image)) => image,
            Some(None) => &self.placeholder,
            None => {
                self.warn_once(id, None, "unregistered_texture_id");
                &self.placeholder
            }
        }
    }

    fn warn_once(&self, id: TextureId, path: Option<&Path>, reason: &str) {
        let mut warned = self.warned.lock().unwrap_or_else(PoisonError::into_inner);
        if !warned.insert(id) {
            return;
        }
        let path_display = path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unresolved>".to_string());
        warn!(
            texture_id = id.0,
            path = %path_display,
            reason = reason,
            "texture_missing_using_placeholder"
        );
    }
}
