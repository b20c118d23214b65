use nom::{
    bytes::complete::take,
    multi::count,
    number::complete::{le_u16, le_u32, le_u8},
    IResult as _IResult, Parser,
};

use crate::{Line, PixelRun, Segment, Sprite, SpriteFormat};

pub type IResult<'a, T> = _IResult<&'a [u8], T>;

fn parse_pixels(i: &'_ [u8], pixel_count: usize) -> IResult<'_, Vec<u16>> {
    count(le_u16, pixel_count).parse(i)
}

fn parse_segment(i: &'_ [u8], format: SpriteFormat) -> IResult<'_, Segment> {
    // Shadow skip is 2 bytes on the wire despite the u32 in memory
    let (i, skip) = match format {
        SpriteFormat::AlphaBlend => {
            let (i, skip) = le_u8(i)?;
            (i, skip as u32)
        }
        _ => {
            let (i, skip) = le_u16(i)?;
            (i, skip as u32)
        }
    };

    let (i, chroma_pixels) = if format.has_chroma_run() {
        let (i, chroma_count) = le_u16(i)?;
        parse_pixels(i, chroma_count as usize)?
    } else {
        (i, vec![])
    };

    let (i, pixels) = match format {
        SpriteFormat::Shadow => {
            let (i, run) = le_u16(i)?;
            (i, PixelRun::Length(run))
        }
        SpriteFormat::AlphaBlend => {
            let (i, run) = le_u8(i)?;
            let (i, pixels) = parse_pixels(i, run as usize)?;
            (i, PixelRun::Colors(pixels))
        }
        SpriteFormat::Opaque | SpriteFormat::ChromaKey => {
            let (i, run) = le_u16(i)?;
            let (i, pixels) = parse_pixels(i, run as usize)?;
            (i, PixelRun::Colors(pixels))
        }
    };

    Ok((
        i,
        Segment {
            skip,
            chroma_pixels,
            pixels,
        },
    ))
}

fn parse_line(i: &'_ [u8], format: SpriteFormat) -> IResult<'_, Line> {
    match format {
        // one implicit full-width segment, no per-line framing
        SpriteFormat::Opaque => {
            let (i, segment) = parse_segment(i, format)?;
            Ok((
                i,
                Line {
                    segments: vec![segment],
                },
            ))
        }
        SpriteFormat::AlphaBlend => {
            let (i, segment_count) = le_u8(i)?;
            let (i, segments) =
                count(|i| parse_segment(i, format), segment_count as usize).parse(i)?;
            Ok((i, Line { segments }))
        }
        SpriteFormat::ChromaKey | SpriteFormat::Shadow => {
            // the game engine consumes the recorded length; decoding never does
            let (i, _recorded_length) = le_u16(i)?;
            let (i, segment_count) = le_u16(i)?;
            let (i, segments) =
                count(|i| parse_segment(i, format), segment_count as usize).parse(i)?;
            Ok((i, Line { segments }))
        }
    }
}

pub fn parse_sprite(i: &'_ [u8], format: SpriteFormat) -> IResult<'_, Sprite> {
    // the body length is informational, the line data frames itself
    let i = match format {
        SpriteFormat::AlphaBlend => le_u32(i)?.0,
        _ => i,
    };

    let (i, width) = le_u16(i)?;
    let (i, height) = le_u16(i)?;

    let (i, lines) = count(|i| parse_line(i, format), height as usize).parse(i)?;

    // the footer line lengths are regenerated on encode, only skip them
    let i = match format {
        SpriteFormat::AlphaBlend => take(height as usize * 2).parse(i)?.0,
        _ => i,
    };

    let mut sprite = Sprite {
        format,
        name: None,
        width,
        height,
        lines,
        byte_count: 0,
    };
    sprite.byte_count = sprite.write_to_bytes().len();

    Ok((i, sprite))
}

pub fn parse_pack_sprites(i: &'_ [u8], format: SpriteFormat) -> IResult<'_, Vec<Sprite>> {
    let (i, sprite_count) = le_u16(i)?;

    // a lying count is not validated here; it surfaces as a parse error
    // when the body runs out
    count(|i| parse_sprite(i, format), sprite_count as usize).parse(i)
}
