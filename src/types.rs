use crate::constants::{ALPHA_SPRITE_HEADER_LENGTH, SPRITE_HEADER_LENGTH};

/// The four pixel-encoding schemes of the sprite family.
///
/// All four share the same scanline scheme of sparse pixel runs separated
/// by transparent gaps; the format selects the framing widths, the 16-bit
/// color packing and the optional chroma-key sub-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteFormat {
    /// SPR: every line is one full-width run of RGB 5:6:5 pixels.
    Opaque,
    /// ASP: sparse runs of RGA 5:5:5 pixels with 1-byte framing fields
    /// and a trailing per-line length table.
    AlphaBlend,
    /// ISP: sparse runs of RGB 5:6:5 pixels, each segment optionally led
    /// by a chroma-key sub-run.
    ChromaKey,
    /// SSP: sparse runs carrying only their length, rendered as black.
    Shadow,
}

impl SpriteFormat {
    /// Byte length of the sprite header.
    pub fn header_length(&self) -> usize {
        match self {
            SpriteFormat::AlphaBlend => ALPHA_SPRITE_HEADER_LENGTH,
            _ => SPRITE_HEADER_LENGTH,
        }
    }

    /// Fixed bytes each line costs on top of its segments, counting the
    /// AlphaBlend footer entry. Opaque lines have no framing at all.
    pub fn line_overhead(&self) -> usize {
        match self {
            SpriteFormat::Opaque => 0,
            // segment count byte + footer length entry
            SpriteFormat::AlphaBlend => 3,
            // recorded length + segment count
            SpriteFormat::ChromaKey | SpriteFormat::Shadow => 4,
        }
    }

    pub fn has_chroma_run(&self) -> bool {
        matches!(self, SpriteFormat::ChromaKey)
    }

    pub fn pack_extension(&self) -> &'static str {
        match self {
            SpriteFormat::Opaque => "spk",
            SpriteFormat::AlphaBlend => "aspk",
            SpriteFormat::ChromaKey => "ispk",
            SpriteFormat::Shadow => "sspk",
        }
    }

    /// Companion index files use the pack extension plus an `i`.
    pub fn index_extension(&self) -> String {
        format!("{}i", self.pack_extension())
    }
}

/// The pixel payload of a segment. Shadow sprites store only the run
/// length; the other formats store the packed colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelRun {
    Colors(Vec<u16>),
    Length(u16),
}

impl PixelRun {
    pub fn len(&self) -> usize {
        match self {
            PixelRun::Colors(pixels) => pixels.len(),
            PixelRun::Length(run) => *run as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A contiguous pixel run prefixed by its transparent gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Transparent pixels between the previous segment's end (or the
    /// line start) and this run's first pixel.
    ///
    /// Held as u32 because the Shadow format keeps its offset that wide
    /// in memory, even though only 2 bytes ever cross the wire.
    pub skip: u32,
    /// Leading chroma-key sub-run. Always empty outside ChromaKey.
    pub chroma_pixels: Vec<u16>,
    pub pixels: PixelRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub segments: Vec<Segment>,
}

/// One decoded sprite.
///
/// Built once, either from a byte source or from a raster image, and not
/// mutated afterwards. The redundant per-line length scalars of the wire
/// format are not kept; they are regenerated on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    pub format: SpriteFormat,
    /// Diagnostic name, `<packName>[<index>]` for sprites decoded out of
    /// a named pack. No effect on the wire format.
    pub name: Option<String>,
    pub width: u16,
    pub height: u16,
    pub lines: Vec<Line>,
    /// Exact serialized length, measured by a full encode at
    /// construction time. Never taken from a header field.
    pub(crate) byte_count: usize,
}

impl Sprite {
    pub fn byte_count(&self) -> usize {
        self.byte_count
    }

    /// Total chroma-key pixels across all lines. Zero outside ChromaKey.
    pub fn chroma_pixel_count(&self) -> usize {
        self.lines
            .iter()
            .flat_map(|line| &line.segments)
            .map(|segment| segment.chroma_pixels.len())
            .sum()
    }
}

/// A pack of sprites serialized back-to-back behind a u16 count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpritePack {
    pub format: SpriteFormat,
    pub name: Option<String>,
    pub sprites: Vec<Sprite>,
    /// False only for a pack decoded from an empty byte source.
    pub initialized: bool,
}

impl SpritePack {
    /// Creates an initialized pack with no sprites.
    pub fn new(format: SpriteFormat) -> Self {
        Self {
            format,
            name: None,
            sprites: vec![],
            initialized: true,
        }
    }
}
