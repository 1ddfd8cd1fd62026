//! Orchestration constants and runtime configuration defaults

// Worker pool
/// Number of generation calls allowed in flight at once
pub const DEFAULT_CONCURRENCY: usize = 2;
/// Upper bound accepted for the concurrency ceiling
pub const MAX_CONCURRENCY: usize = 16;
/// Default per-call timeout for the generation backend, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

// Album layout
/// Columns in the album grid
pub const ALBUM_COLUMNS: u32 = 3;
/// Edge length of each square album tile in pixels
pub const ALBUM_TILE_SIZE: u32 = 360;
/// Gap between tiles and around the canvas edge
pub const ALBUM_PADDING: u32 = 24;
/// Height reserved under each tile for its caption
pub const ALBUM_CAPTION_HEIGHT: u32 = 44;
/// Height of the title band at the top of the album
pub const ALBUM_HEADER_HEIGHT: u32 = 72;
/// Integer scale applied to the 5x7 caption glyphs
pub const CAPTION_GLYPH_SCALE: u32 = 3;
/// Integer scale applied to the 5x7 title glyphs
pub const TITLE_GLYPH_SCALE: u32 = 5;
/// Title rendered in the header band
pub const ALBUM_TITLE: &str = "MULTIVERSE";
/// Canvas background colour
pub const ALBUM_BACKGROUND: [u8; 3] = [18, 18, 24];
/// Caption and title colour
pub const ALBUM_TEXT_COLOR: [u8; 3] = [236, 236, 240];
/// Longest canvas edge an album may have, in pixels
pub const MAX_ALBUM_EDGE: u32 = 16_384;
/// Quality used when the album is encoded as JPEG
pub const ALBUM_JPEG_QUALITY: u8 = 90;

// Output settings
/// File stem of the composited album
pub const ALBUM_FILE_STEM: &str = "multiverse-album";
/// Directory name used when no output directory is given
pub const DEFAULT_OUTPUT_DIR: &str = "multiverse-output";

// Logging
/// Environment variable holding the tracing filter directive
pub const LOG_ENV_VAR: &str = "MULTIVERSE_LOG";
/// Filter used when the environment variable is unset
pub const DEFAULT_LOG_FILTER: &str = "multiverse=info";
