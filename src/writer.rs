use crate::{
    byte_writer::ByteWriter, constants::PACK_HEADER_LENGTH, Line, PixelRun, Segment, Sprite,
    SpriteFormat, SpritePack,
};

impl Sprite {
    /// Serializes the sprite exactly as the game engine reads it.
    pub fn write_to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write(&mut writer);
        writer.data
    }

    pub(crate) fn write(&self, writer: &mut ByteWriter) {
        match self.format {
            SpriteFormat::AlphaBlend => self.write_alpha(writer),
            _ => {
                writer.append_u16(self.width);
                writer.append_u16(self.height);

                for line in &self.lines {
                    write_line(line, self.format, writer);
                }
            }
        }
    }

    // the body length and the footer table both measure the writer's own
    // output, never a value remembered from decode
    fn write_alpha(&self, writer: &mut ByteWriter) {
        let body_length_index = writer.get_offset();
        writer.append_u32(0);
        writer.append_u16(self.width);
        writer.append_u16(self.height);

        let body_start = writer.get_offset();
        let mut line_lengths = Vec::with_capacity(self.lines.len());

        for line in &self.lines {
            let line_start = writer.get_offset();
            write_line(line, self.format, writer);
            // informational; a line body past 64 KiB pins the entry
            line_lengths.push((writer.get_offset() - line_start).min(u16::MAX as usize) as u16);
        }

        writer.replace_with_u32(body_length_index, (writer.get_offset() - body_start) as u32);

        for line_length in line_lengths {
            writer.append_u16(line_length);
        }
    }
}

fn write_line(line: &Line, format: SpriteFormat, writer: &mut ByteWriter) {
    match format {
        SpriteFormat::Opaque => {
            for segment in &line.segments {
                write_segment(segment, format, writer);
            }
        }
        SpriteFormat::AlphaBlend => {
            let segments = split_alpha_segments(&line.segments);
            // the count byte frames at most 255 segments
            let framed = segments.len().min(u8::MAX as usize);
            writer.append_u8(framed as u8);

            for segment in &segments[..framed] {
                write_segment(segment, format, writer);
            }
        }
        SpriteFormat::ChromaKey => {
            // recorded length counts 16-bit words, itself included
            let recorded_length_index = writer.get_offset();
            writer.append_u16(0);
            writer.append_u16(line.segments.len() as u16);

            for segment in &line.segments {
                write_segment(segment, format, writer);
            }

            let words = (writer.get_offset() - recorded_length_index) / 2;
            writer.replace_with_u16(recorded_length_index, words as u16);
        }
        SpriteFormat::Shadow => {
            writer.append_u16(shadow_line_length(line));
            writer.append_u16(line.segments.len() as u16);

            for segment in &line.segments {
                write_segment(segment, format, writer);
            }
        }
    }
}

// the engine wants the pixel runs counted in the recorded length even
// though shadow segments serialize no pixel data
fn shadow_line_length(line: &Line) -> u16 {
    let words = line
        .segments
        .iter()
        .map(|segment| 2 + segment.pixels.len())
        .sum::<usize>()
        + 2;

    // informational; wide lines wrap the field like the engine's own u16
    words as u16
}

/// Rewrites segments so every AlphaBlend framing value fits its single
/// byte: gaps past 255 spill into empty segments, runs past 255 continue
/// in follow-up segments with no gap.
pub(crate) fn split_alpha_segments(segments: &[Segment]) -> Vec<Segment> {
    let mut split = vec![];

    for segment in segments {
        let mut skip = segment.skip;

        while skip > u8::MAX as u32 {
            split.push(Segment {
                skip: u8::MAX as u32,
                chroma_pixels: vec![],
                pixels: PixelRun::Colors(vec![]),
            });
            skip -= u8::MAX as u32;
        }

        let pixels = match &segment.pixels {
            PixelRun::Colors(pixels) => pixels,
            run => {
                split.push(Segment {
                    skip,
                    chroma_pixels: vec![],
                    pixels: run.clone(),
                });
                continue;
            }
        };

        if pixels.len() <= u8::MAX as usize {
            split.push(Segment {
                skip,
                chroma_pixels: vec![],
                pixels: PixelRun::Colors(pixels.clone()),
            });
            continue;
        }

        for (index, chunk) in pixels.chunks(u8::MAX as usize).enumerate() {
            split.push(Segment {
                skip: if index == 0 { skip } else { 0 },
                chroma_pixels: vec![],
                pixels: PixelRun::Colors(chunk.to_vec()),
            });
        }
    }

    split
}

fn write_segment(segment: &Segment, format: SpriteFormat, writer: &mut ByteWriter) {
    match format {
        SpriteFormat::AlphaBlend => writer.append_u8(segment.skip as u8),
        // Shadow included: its skip is u32 in memory but 2 bytes cross
        // the wire, reads and writes alike
        _ => writer.append_u16(segment.skip as u16),
    }

    if format.has_chroma_run() {
        writer.append_u16(segment.chroma_pixels.len() as u16);

        for &pixel in &segment.chroma_pixels {
            writer.append_u16(pixel);
        }
    }

    match (&segment.pixels, format) {
        (PixelRun::Length(run), _) => writer.append_u16(*run),
        (PixelRun::Colors(pixels), SpriteFormat::AlphaBlend) => {
            writer.append_u8(pixels.len() as u8);

            for &pixel in pixels {
                writer.append_u16(pixel);
            }
        }
        (PixelRun::Colors(pixels), _) => {
            writer.append_u16(pixels.len() as u16);

            for &pixel in pixels {
                writer.append_u16(pixel);
            }
        }
    }
}

impl SpritePack {
    pub fn write_to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();

        writer.append_u16(self.sprites.len() as u16);

        for sprite in &self.sprites {
            sprite.write(&mut writer);
        }

        writer.data
    }

    /// Offset index for this pack alone, the companion file the engine
    /// needs for random access into the pack.
    pub fn index_bytes(&self) -> Vec<u8> {
        build_pack_index(std::iter::once(self))
    }
}

/// Builds one combined offset index over several packs.
///
/// Offsets start at the pack header size and keep accumulating across
/// pack boundaries in pack order; the count field sums every pack.
pub fn build_pack_index<'a>(packs: impl IntoIterator<Item = &'a SpritePack>) -> Vec<u8> {
    let mut writer = ByteWriter::new();

    let sprite_count_index = writer.get_offset();
    writer.append_u16(0);

    let mut sprite_count: u16 = 0;
    let mut offset = PACK_HEADER_LENGTH as u32;

    for pack in packs {
        for sprite in &pack.sprites {
            writer.append_u32(offset);
            offset += sprite.byte_count() as u32;
            sprite_count += 1;
        }
    }

    writer.replace_with_u16(sprite_count_index, sprite_count);

    writer.data
}
