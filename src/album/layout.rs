//! Fixed grid geometry for the album canvas

use crate::album::glyphs::{text_height, text_width};
use crate::io::configuration::{
    ALBUM_BACKGROUND, ALBUM_CAPTION_HEIGHT, ALBUM_COLUMNS, ALBUM_HEADER_HEIGHT, ALBUM_PADDING,
    ALBUM_TEXT_COLOR, ALBUM_TILE_SIZE, CAPTION_GLYPH_SCALE, MAX_ALBUM_EDGE, TITLE_GLYPH_SCALE,
};
use crate::io::error::{Result, invalid_parameter};
use image::Rgb;

/// Grid dimensions, spacing and colours of the album
///
/// Tile `i` always lands in column `i % columns`, row `i / columns`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlbumLayout {
    /// Tiles per row
    pub columns: u32,
    /// Edge length of each square tile
    pub tile_size: u32,
    /// Gap between tiles and around the edge
    pub padding: u32,
    /// Height of the caption band under every tile
    pub caption_height: u32,
    /// Height of the title band, 0 to omit the title
    pub header_height: u32,
    /// Glyph scale for captions
    pub caption_scale: u32,
    /// Glyph scale for the title
    pub title_scale: u32,
    /// Canvas background
    pub background: Rgb<u8>,
    /// Caption and title colour
    pub text_color: Rgb<u8>,
}

impl Default for AlbumLayout {
    fn default() -> Self {
        Self {
            columns: ALBUM_COLUMNS,
            tile_size: ALBUM_TILE_SIZE,
            padding: ALBUM_PADDING,
            caption_height: ALBUM_CAPTION_HEIGHT,
            header_height: ALBUM_HEADER_HEIGHT,
            caption_scale: CAPTION_GLYPH_SCALE,
            title_scale: TITLE_GLYPH_SCALE,
            background: Rgb(ALBUM_BACKGROUND),
            text_color: Rgb(ALBUM_TEXT_COLOR),
        }
    }
}

impl AlbumLayout {
    /// Check that the geometry can hold at least one tile
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The column count, tile size or a glyph scale is zero
    /// - One full row of tiles does not fit within `MAX_ALBUM_EDGE`
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 {
            return Err(invalid_parameter("columns", &self.columns, &"must be positive"));
        }
        if self.tile_size == 0 {
            return Err(invalid_parameter("tile_size", &self.tile_size, &"must be positive"));
        }
        if self.caption_scale == 0 || self.title_scale == 0 {
            return Err(invalid_parameter(
                "glyph_scale",
                &format!("{}/{}", self.caption_scale, self.title_scale),
                &"must be positive",
            ));
        }
        self.canvas_size(self.columns)?;
        Ok(())
    }

    /// Rows needed for `count` tiles
    pub const fn rows(&self, count: u32) -> u32 {
        count.div_ceil(self.columns)
    }

    /// Canvas width and height for `count` tiles
    ///
    /// # Errors
    ///
    /// Returns an error if there are no columns or either edge would exceed
    /// `MAX_ALBUM_EDGE`
    pub fn canvas_size(&self, count: u32) -> Result<(u32, u32)> {
        if self.columns == 0 {
            return Err(invalid_parameter("columns", &self.columns, &"must be positive"));
        }
        let width = self
            .tile_size
            .checked_add(self.padding)
            .and_then(|step| step.checked_mul(count.min(self.columns)))
            .and_then(|span| span.checked_add(self.padding));
        let height = self
            .tile_size
            .checked_add(self.caption_height)
            .and_then(|step| step.checked_add(self.padding))
            .and_then(|step| step.checked_mul(self.rows(count)))
            .and_then(|span| span.checked_add(self.padding))
            .and_then(|span| span.checked_add(self.header_height));

        match width.zip(height) {
            Some((width, height)) if width <= MAX_ALBUM_EDGE && height <= MAX_ALBUM_EDGE => {
                Ok((width, height))
            }
            _ => Err(invalid_parameter(
                "album_size",
                &format!("{count} tiles"),
                &format!("canvas must fit within {MAX_ALBUM_EDGE}x{MAX_ALBUM_EDGE} pixels"),
            )),
        }
    }

    /// Top-left corner of tile `index`
    ///
    /// Saturates instead of wrapping for indices beyond any valid canvas.
    pub const fn tile_origin(&self, index: u32) -> (u32, u32) {
        let column = index % self.columns;
        let row = index / self.columns;
        let x = self
            .padding
            .saturating_add(column.saturating_mul(self.tile_size.saturating_add(self.padding)));
        let y = self.header_height.saturating_add(self.padding).saturating_add(
            row.saturating_mul(
                self.tile_size
                    .saturating_add(self.caption_height)
                    .saturating_add(self.padding),
            ),
        );
        (x, y)
    }

    /// Top-left corner of a caption `text` centred under tile `index`
    pub fn caption_origin(&self, index: u32, text: &str) -> (u32, u32) {
        let (tile_x, tile_y) = self.tile_origin(index);
        let width = text_width(text, self.caption_scale);
        let height = text_height(self.caption_scale);
        let x = tile_x.saturating_add(self.tile_size.saturating_sub(width) / 2);
        let y = tile_y
            .saturating_add(self.tile_size)
            .saturating_add(self.caption_height.saturating_sub(height) / 2);
        (x, y)
    }

    /// Top-left corner of the title centred in the header band
    pub fn title_origin(&self, canvas_width: u32, text: &str) -> (u32, u32) {
        let width = text_width(text, self.title_scale);
        let height = text_height(self.title_scale);
        let x = canvas_width.saturating_sub(width) / 2;
        let y = self.header_height.saturating_add(self.padding).saturating_sub(height) / 2;
        (x, y)
    }
}
