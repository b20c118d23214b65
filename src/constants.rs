/// Sprite count field at the start of every pack file.
pub const PACK_HEADER_LENGTH: usize = 2;

pub const SPRITE_HEADER_LENGTH: usize = 4;
/// AlphaBlend sprites prefix the usual header with a u32 body length.
pub const ALPHA_SPRITE_HEADER_LENGTH: usize = 8;
