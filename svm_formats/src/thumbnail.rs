use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use crate::savegame::SaveError;

pub const THUMBNAIL_TAG: [u8; 4] = *b"THMB";
const THUMBNAIL_VERSION: u8 = 1;
const BYTES_PER_PIXEL: u8 = 2;
const MAX_DIMENSION: u16 = 1024;

/// Small RGB565 preview stored alongside a savegame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u16>,
}

impl Thumbnail {
    pub fn new(width: u16, height: u16, fill: u16) -> Self {
        Thumbnail {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn validate(&self) -> Result<(), SaveError> {
        if self.width == 0
            || self.height == 0
            || self.width > MAX_DIMENSION
            || self.height > MAX_DIMENSION
            || self.pixels.len() != self.width as usize * self.height as usize
        {
            return Err(SaveError::BadThumbnail);
        }
        Ok(())
    }

    pub fn set_pixel(&mut self, x: u16, y: u16, color: u16) {
        if x < self.width && y < self.height {
            self.pixels[y as usize * self.width as usize + x as usize] = color;
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x < self.width && y < self.height {
            Some(self.pixels[y as usize * self.width as usize + x as usize])
        } else {
            None
        }
    }

    pub fn fill_rect(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, color: u16) {
        for y in y0.min(self.height)..y1.min(self.height) {
            for x in x0.min(self.width)..x1.min(self.width) {
                self.set_pixel(x, y, color);
            }
        }
    }

    pub fn to_rgba8888(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.len() * 4);
        for &value in &self.pixels {
            let r = ((value >> 11) & 0x1F) as u8;
            let g = ((value >> 5) & 0x3F) as u8;
            let b = (value & 0x1F) as u8;
            rgba.push((r << 3) | (r >> 2));
            rgba.push((g << 2) | (g >> 4));
            rgba.push((b << 3) | (b >> 2));
            rgba.push(0xFF);
        }
        rgba
    }

    pub(crate) fn write_to<W: Write>(&self, out: &mut W) -> Result<(), SaveError> {
        self.validate()?;
        out.write_all(&THUMBNAIL_TAG)?;
        out.write_u8(THUMBNAIL_VERSION)?;
        out.write_u16::<BigEndian>(self.width)?;
        out.write_u16::<BigEndian>(self.height)?;
        out.write_u8(BYTES_PER_PIXEL)?;
        for &pixel in &self.pixels {
            out.write_u16::<BigEndian>(pixel)?;
        }
        Ok(())
    }

    /// Reads a thumbnail block whose tag has already been consumed.
    pub(crate) fn read_body<R: Read>(input: &mut R) -> Result<Self, SaveError> {
        let version = input.read_u8().map_err(truncated)?;
        if version != THUMBNAIL_VERSION {
            return Err(SaveError::BadThumbnail);
        }
        let width = input.read_u16::<BigEndian>().map_err(truncated)?;
        let height = input.read_u16::<BigEndian>().map_err(truncated)?;
        let bpp = input.read_u8().map_err(truncated)?;
        if bpp != BYTES_PER_PIXEL || width == 0 || height == 0 {
            return Err(SaveError::BadThumbnail);
        }
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(SaveError::BadThumbnail);
        }
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count);
        for _ in 0..count {
            pixels.push(input.read_u16::<BigEndian>().map_err(truncated)?);
        }
        Ok(Thumbnail {
            width,
            height,
            pixels,
        })
    }
}

/// Packs 8-bit channels into RGB565.
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

fn truncated(_: std::io::Error) -> SaveError {
    SaveError::Truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb565_expands_to_full_range() {
        let mut thumb = Thumbnail::new(2, 1, rgb565(255, 255, 255));
        thumb.set_pixel(1, 0, rgb565(0, 0, 0));
        let rgba = thumb.to_rgba8888();
        assert_eq!(&rgba[..4], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(&rgba[4..], &[0, 0, 0, 0xFF]);
    }

    #[test]
    fn body_rejects_wrong_depth() {
        let mut data = Vec::new();
        data.push(THUMBNAIL_VERSION);
        data.extend_from_slice(&4u16.to_be_bytes());
        data.extend_from_slice(&4u16.to_be_bytes());
        data.push(3);
        let err = Thumbnail::read_body(&mut data.as_slice()).unwrap_err();
        assert!(matches!(err, SaveError::BadThumbnail));
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut thumb = Thumbnail::new(4, 4, 0);
        thumb.fill_rect(2, 2, 10, 10, 7);
        assert_eq!(thumb.pixel(3, 3), Some(7));
        assert_eq!(thumb.pixel(1, 1), Some(0));
        assert_eq!(thumb.pixel(4, 4), None);
    }
}
