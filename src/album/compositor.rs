//! Album composition: every generated image on one captioned grid
//!
//! Tiles are placed by the batch's task order, never by completion order,
//! and every tile is cover-cropped to the same square. Nothing in the output
//! depends on time, so the same images always encode to the same bytes.

use crate::album::glyphs::{draw_text, fit_text};
use crate::album::layout::AlbumLayout;
use crate::generation::client::ImageBytes;
use crate::io::configuration::{ALBUM_FILE_STEM, ALBUM_JPEG_QUALITY, ALBUM_TITLE};
use crate::io::error::{MultiverseError, Result, composition_failure};
use crate::orchestration::batch::Batch;
use crate::orchestration::task::TaskId;
use clap::ValueEnum;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ImageEncoder, RgbImage};
use std::collections::HashMap;
use tracing::debug;

/// Encoding of the finished album
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum AlbumFormat {
    /// Lossless PNG
    #[default]
    Png,
    /// JPEG at a fixed quality
    Jpeg,
}

impl AlbumFormat {
    /// File extension for this format
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }
}

/// A composited, encoded album
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Album {
    /// Encoded image data
    pub bytes: Vec<u8>,
    /// Suggested file name
    pub filename: String,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
    /// Encoding of `bytes`
    pub format: AlbumFormat,
    /// Number of tiles on the canvas
    pub tiles: usize,
}

/// Caption shown under a tile: the id with separators as spaces, uppercased
pub fn caption_for(id: &TaskId) -> String {
    id.as_str()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// Renders albums with one fixed layout and encoding
#[derive(Clone, Debug, Default)]
pub struct AlbumCompositor {
    layout: AlbumLayout,
    format: AlbumFormat,
}

impl AlbumCompositor {
    /// Create a compositor
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is invalid
    pub fn new(layout: AlbumLayout, format: AlbumFormat) -> Result<Self> {
        layout.validate()?;
        Ok(Self { layout, format })
    }

    /// Layout used for every album
    pub const fn layout(&self) -> &AlbumLayout {
        &self.layout
    }

    /// Encoding used for every album
    pub const fn format(&self) -> AlbumFormat {
        self.format
    }

    /// Compose the album of a finished batch
    ///
    /// Readiness is read from the batch's state store: every task must be
    /// `Done`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Any task is `Pending` or `Error` (`IncompleteAlbumRequest`)
    /// - An image cannot be decoded or the album cannot be encoded
    pub fn compose_batch(&self, batch: &Batch) -> Result<Album> {
        let counts = batch.counts();
        if counts.done != batch.len() {
            let store = batch.store();
            let missing = batch
                .ids()
                .iter()
                .filter(|id| store.get(id).and_then(|state| state.result().cloned()).is_none())
                .cloned()
                .collect();
            return Err(MultiverseError::IncompleteAlbumRequest {
                expected: batch.len(),
                done: counts.done,
                missing,
            });
        }

        self.compose(batch.ids(), &batch.store().done_images())
    }

    /// Compose an album from an explicit id → image mapping
    ///
    /// `expected` fixes both the required membership and the tile order;
    /// the order of `images` is irrelevant.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An expected id has no image (`IncompleteAlbumRequest`)
    /// - An image belongs to no expected id, or `expected` is empty
    /// - An image cannot be decoded or the album cannot be encoded
    pub fn compose(&self, expected: &[TaskId], images: &[(TaskId, ImageBytes)]) -> Result<Album> {
        let by_id: HashMap<&TaskId, &ImageBytes> = images.iter().map(|(id, image)| (id, image)).collect();

        let missing: Vec<TaskId> = expected
            .iter()
            .filter(|id| !by_id.contains_key(id))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MultiverseError::IncompleteAlbumRequest {
                expected: expected.len(),
                done: expected.len() - missing.len(),
                missing,
            });
        }
        if let Some((stray, _)) = images.iter().find(|(id, _)| !expected.contains(id)) {
            return Err(composition_failure(Some(stray), &"image is not part of the batch"));
        }
        if expected.is_empty() {
            return Err(composition_failure(None, &"an album needs at least one image"));
        }

        let count = u32::try_from(expected.len())
            .map_err(|_| composition_failure(None, &"too many images for one album"))?;
        let (width, height) = self.layout.canvas_size(count)?;
        let mut canvas = RgbImage::from_pixel(width, height, self.layout.background);

        if self.layout.header_height > 0 {
            let title = fit_text(ALBUM_TITLE, width, self.layout.title_scale);
            let (x, y) = self.layout.title_origin(width, title);
            draw_text(&mut canvas, title, x, y, self.layout.title_scale, self.layout.text_color);
        }

        for (index, id) in (0u32..).zip(expected) {
            let image = by_id
                .get(id)
                .ok_or_else(|| composition_failure(Some(id), &"image disappeared during composition"))?;
            self.place_tile(&mut canvas, index, id, image)?;
        }

        let bytes = self.encode(&canvas)?;
        debug!(width, height, tiles = count, bytes = bytes.len(), "album composed");

        Ok(Album {
            bytes,
            filename: format!("{ALBUM_FILE_STEM}.{}", self.format.extension()),
            width,
            height,
            format: self.format,
            tiles: expected.len(),
        })
    }

    fn place_tile(&self, canvas: &mut RgbImage, index: u32, id: &TaskId, image: &ImageBytes) -> Result<()> {
        let decoded = image
            .decode()
            .map_err(|e| composition_failure(Some(id), &e))?;

        let size = self.layout.tile_size;
        let tile = decoded
            .resize_to_fill(size, size, FilterType::Lanczos3)
            .to_rgb8();
        let (x, y) = self.layout.tile_origin(index);
        imageops::replace(canvas, &tile, i64::from(x), i64::from(y));

        let caption = caption_for(id);
        let caption = fit_text(&caption, size, self.layout.caption_scale);
        let (caption_x, caption_y) = self.layout.caption_origin(index, caption);
        draw_text(
            canvas,
            caption,
            caption_x,
            caption_y,
            self.layout.caption_scale,
            self.layout.text_color,
        );
        Ok(())
    }

    fn encode(&self, canvas: &RgbImage) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let (width, height) = canvas.dimensions();
        let encoded = match self.format {
            AlbumFormat::Png => PngEncoder::new(&mut bytes).write_image(
                canvas.as_raw(),
                width,
                height,
                image::ExtendedColorType::Rgb8,
            ),
            AlbumFormat::Jpeg => JpegEncoder::new_with_quality(&mut bytes, ALBUM_JPEG_QUALITY)
                .write_image(canvas.as_raw(), width, height, image::ExtendedColorType::Rgb8),
        };
        encoded.map_err(|e| composition_failure(None, &e))?;
        Ok(bytes)
    }
}
