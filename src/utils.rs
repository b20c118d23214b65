use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use image::{Rgba, RgbaImage};

use crate::{
    error::SpkError,
    parser::{parse_pack_sprites, parse_sprite},
    writer::split_alpha_segments,
    Line, PixelRun, Segment, Sprite, SpriteFormat, SpritePack,
};

/// Packs 0-255 RGB channels into 5:6:5. Low bits drop silently.
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

pub fn unpack_rgb565(n: u16) -> [u8; 4] {
    let r = ((n & 0xF800) >> 8) as u8;
    let g = ((n & 0x07E0) >> 3) as u8;
    let b = ((n & 0x001F) << 3) as u8;

    [r, g, b, 255]
}

/// Packs red, green and alpha into 5:5:5. Blue never hits the wire.
pub fn pack_rga555(r: u8, g: u8, a: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 3) << 5) | (a as u16 >> 3)
}

pub fn unpack_rga555(n: u16) -> [u8; 4] {
    let r = ((n >> 11) << 3) as u8;
    let g = (((n >> 5) & 0x1F) << 3) as u8;
    let a = ((n & 0x001F) << 3) as u8;

    [r, g, 0, a]
}

/// The reserved overlay colors: any amount of blue with no red and one
/// of three low green steps.
pub fn is_chroma_key(r: u8, g: u8, b: u8) -> bool {
    b > 0 && r == 0 && (g == 0 || g == 32 || g == 64)
}

impl Sprite {
    pub fn from_bytes(bytes: &[u8], format: SpriteFormat) -> Result<Sprite, SpkError> {
        parse_sprite(bytes, format)
            .map(|(_, sprite)| sprite)
            .map_err(|err| SpkError::NomError {
                source: err.to_owned(),
            })
    }

    pub fn open_from_file(
        path: impl AsRef<Path>,
        format: SpriteFormat,
    ) -> Result<Sprite, SpkError> {
        let bytes = std::fs::read(path)?;

        Self::from_bytes(&bytes, format)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path> + Into<PathBuf>) -> Result<(), SpkError> {
        let bytes = self.write_to_bytes();

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        file.write_all(&bytes)?;
        file.flush()?;

        Ok(())
    }

    /// Builds a sprite from a raster image. Lossy: channels truncate to
    /// the format's bit depths and blue is dropped entirely for
    /// AlphaBlend.
    pub fn from_image(image: &RgbaImage, format: SpriteFormat) -> Sprite {
        let lines = (0..image.height())
            .map(|y| Line {
                segments: encode_line(image, y, format),
            })
            .collect();

        let mut sprite = Sprite {
            format,
            name: None,
            width: image.width() as u16,
            height: image.height() as u16,
            lines,
            byte_count: 0,
        };
        sprite.byte_count = sprite.write_to_bytes().len();

        sprite
    }

    /// Renders the sprite into a transparent raster.
    pub fn to_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width as u32, self.height as u32);

        for (y, line) in self.lines.iter().enumerate() {
            let mut x = 0u32;

            // the cursor saturates rather than wrap: decodable data can
            // pile up skips and runs past any pixel bound
            for segment in &line.segments {
                x = x.saturating_add(segment.skip);

                for &pixel in &segment.chroma_pixels {
                    put_pixel_checked(&mut image, x, y as u32, unpack_rgb565(pixel));
                    x = x.saturating_add(1);
                }

                match &segment.pixels {
                    PixelRun::Length(run) => {
                        for _ in 0..*run {
                            put_pixel_checked(&mut image, x, y as u32, [0, 0, 0, 255]);
                            x = x.saturating_add(1);
                        }
                    }
                    PixelRun::Colors(pixels) => {
                        for &pixel in pixels {
                            let rgba = match self.format {
                                SpriteFormat::AlphaBlend => unpack_rga555(pixel),
                                _ => unpack_rgb565(pixel),
                            };

                            put_pixel_checked(&mut image, x, y as u32, rgba);
                            x = x.saturating_add(1);
                        }
                    }
                }
            }
        }

        image
    }
}

// segments may legally overflow the sprite bounds; the stray writes are
// dropped and rendering carries on
fn put_pixel_checked(image: &mut RgbaImage, x: u32, y: u32, rgba: [u8; 4]) {
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, Rgba(rgba));
    }
}

fn encode_line(image: &RgbaImage, y: u32, format: SpriteFormat) -> Vec<Segment> {
    let width = image.width();

    // opaque lines ignore transparency: one full-width run
    if format == SpriteFormat::Opaque {
        let pixels = (0..width)
            .map(|x| {
                let p = image.get_pixel(x, y);
                pack_rgb565(p[0], p[1], p[2])
            })
            .collect();

        return vec![Segment {
            skip: 0,
            chroma_pixels: vec![],
            pixels: PixelRun::Colors(pixels),
        }];
    }

    let mut segments = vec![];
    let mut x = 0;

    while x < width {
        let mut skip = 0u32;

        while x < width && image.get_pixel(x, y)[3] == 0 {
            skip += 1;
            x += 1;
        }

        // a trailing gap serializes as nothing
        if x >= width {
            break;
        }

        let mut chroma_pixels = vec![];

        if format.has_chroma_run() {
            while x < width {
                let p = image.get_pixel(x, y);

                if p[3] == 0 || !is_chroma_key(p[0], p[1], p[2]) {
                    break;
                }

                chroma_pixels.push(pack_rgb565(p[0], p[1], p[2]));
                x += 1;
            }
        }

        let pixels = match format {
            SpriteFormat::Shadow => {
                let mut run = 0u16;

                while x < width && image.get_pixel(x, y)[3] > 0 {
                    run += 1;
                    x += 1;
                }

                PixelRun::Length(run)
            }
            SpriteFormat::AlphaBlend => {
                let mut colors = vec![];

                while x < width {
                    let p = image.get_pixel(x, y);

                    if p[3] == 0 {
                        break;
                    }

                    colors.push(pack_rga555(p[0], p[1], p[3]));
                    x += 1;
                }

                PixelRun::Colors(colors)
            }
            SpriteFormat::ChromaKey => {
                // a key pixel resurfacing after normal pixels ends the
                // segment; the next one starts with no gap
                let mut colors = vec![];

                while x < width {
                    let p = image.get_pixel(x, y);

                    if p[3] == 0 || is_chroma_key(p[0], p[1], p[2]) {
                        break;
                    }

                    colors.push(pack_rgb565(p[0], p[1], p[2]));
                    x += 1;
                }

                PixelRun::Colors(colors)
            }
            SpriteFormat::Opaque => unreachable!(),
        };

        segments.push(Segment {
            skip,
            chroma_pixels,
            pixels,
        });
    }

    // AlphaBlend frames with single bytes; long gaps and runs split here
    // so the sprite mirrors what its own serialization holds
    if format == SpriteFormat::AlphaBlend {
        return split_alpha_segments(&segments);
    }

    segments
}

impl SpritePack {
    pub fn from_bytes(bytes: &[u8], format: SpriteFormat) -> Result<SpritePack, SpkError> {
        Self::decode(bytes, format, None)
    }

    pub fn from_bytes_with_name(
        bytes: &[u8],
        format: SpriteFormat,
        name: impl Into<String>,
    ) -> Result<SpritePack, SpkError> {
        Self::decode(bytes, format, Some(name.into()))
    }

    /// Opens a pack file, taking the pack name from the file stem.
    pub fn open_from_file(
        path: impl AsRef<Path>,
        format: SpriteFormat,
    ) -> Result<SpritePack, SpkError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());

        let bytes = std::fs::read(path)?;

        Self::decode(&bytes, format, name)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path> + Into<PathBuf>) -> Result<(), SpkError> {
        let bytes = self.write_to_bytes();

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        file.write_all(&bytes)?;
        file.flush()?;

        Ok(())
    }

    fn decode(
        bytes: &[u8],
        format: SpriteFormat,
        name: Option<String>,
    ) -> Result<SpritePack, SpkError> {
        // the engine treats an empty pack file as valid and empty
        if bytes.is_empty() {
            return Ok(SpritePack {
                format,
                name,
                sprites: vec![],
                initialized: false,
            });
        }

        let (_, mut sprites) =
            parse_pack_sprites(bytes, format).map_err(|err| SpkError::NomError {
                source: err.to_owned(),
            })?;

        if let Some(pack_name) = &name {
            for (index, sprite) in sprites.iter_mut().enumerate() {
                sprite.name = Some(format!("{pack_name}[{index}]"));
            }
        }

        Ok(SpritePack {
            format,
            name,
            sprites,
            initialized: true,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rgb565_masks() {
        assert_eq!(pack_rgb565(255, 0, 0), 0xF800);
        assert_eq!(pack_rgb565(0, 255, 0), 0x07E0);
        assert_eq!(pack_rgb565(0, 0, 255), 0x001F);

        assert_eq!(unpack_rgb565(0xF800), [248, 0, 0, 255]);
        assert_eq!(unpack_rgb565(0x07E0), [0, 252, 0, 255]);
        assert_eq!(unpack_rgb565(0x001F), [0, 0, 248, 255]);
    }

    #[test]
    fn rga555_drops_blue() {
        assert_eq!(pack_rga555(255, 0, 255), 0xF81F);
        // blue channel is gone, alpha takes the low bits
        assert_eq!(unpack_rga555(0xF81F), [248, 0, 0, 248]);
        assert_eq!(unpack_rga555(pack_rga555(0, 255, 0)), [0, 248, 0, 0]);
    }

    #[test]
    fn packing_truncates_and_never_fails() {
        // 7 low bits of red vanish below the 5-bit step
        assert_eq!(pack_rgb565(7, 0, 0), 0);
        assert_eq!(pack_rgb565(8, 0, 0), 1 << 11);
        assert_eq!(pack_rga555(0, 0, 7), 0);
    }

    #[test]
    fn chroma_key_palette() {
        assert!(is_chroma_key(0, 0, 255));
        assert!(is_chroma_key(0, 32, 8));
        assert!(is_chroma_key(0, 64, 1));

        assert!(!is_chroma_key(0, 16, 255));
        assert!(!is_chroma_key(1, 0, 255));
        assert!(!is_chroma_key(0, 0, 0));
    }
}
