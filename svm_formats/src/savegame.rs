//! Savegame container shared by every engine.
//!
//! A slot file starts with a fixed header (`SCVM` tag, version, 32-byte
//! description, engine id), followed by an `INFO` section carrying play time
//! and creation date, an optional `THMB` thumbnail, and a `DATA` block with
//! the engine's own state.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};
use chrono::{Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::thumbnail::{THUMBNAIL_TAG, Thumbnail};

pub const SAVEGAME_TAG: [u8; 4] = *b"SCVM";
pub const SAVEGAME_VERSION: u32 = 2;
pub const MIN_SAVEGAME_VERSION: u32 = 1;
pub const DESCRIPTION_LEN: usize = 32;

const INFO_TAG: [u8; 4] = *b"INFO";
const INFO_VERSION: u32 = 2;
const INFO_SIZE_V1: u32 = 4 + 4 + 4 + 4 + 4;
const INFO_SIZE: u32 = INFO_SIZE_V1 + 4 + 2;
const DATA_TAG: [u8; 4] = *b"DATA";

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("savegame magic mismatch")]
    BadMagic,
    #[error("savegame version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("savegame info section is corrupt")]
    CorruptInfo,
    #[error("savegame is truncated")]
    Truncated,
    #[error("savegame thumbnail is malformed")]
    BadThumbnail,
    #[error("savegame data block is missing")]
    MissingPayload,
    #[error("payload length mismatch: header declared {expected} bytes but found {actual}")]
    PayloadLength { expected: u32, actual: usize },
    #[error("payload decode error: {0}")]
    PayloadDecode(#[from] rmp_serde::decode::Error),
    #[error("payload encode error: {0}")]
    PayloadEncode(#[from] rmp_serde::encode::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveHeader {
    pub version: u32,
    pub description: String,
    pub engine_id: String,
}

impl SaveHeader {
    pub fn new(description: impl Into<String>, engine_id: impl Into<String>) -> Self {
        SaveHeader {
            version: SAVEGAME_VERSION,
            description: description.into(),
            engine_id: engine_id.into(),
        }
    }
}

/// Calendar stamp stored in the info section, minute resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl SaveDate {
    pub fn now() -> Self {
        let now = Local::now();
        SaveDate {
            year: now.year().clamp(0, u16::MAX as i32) as u16,
            month: now.month() as u8,
            day: now.day() as u8,
            hour: now.hour() as u8,
            minute: now.minute() as u8,
        }
    }

    pub fn packed_date(&self) -> u32 {
        ((self.day as u32) << 24) | ((self.month as u32) << 16) | self.year as u32
    }

    pub fn packed_time(&self) -> u16 {
        ((self.hour as u16) << 8) | self.minute as u16
    }

    pub fn from_packed(date: u32, time: u16) -> Self {
        SaveDate {
            year: (date & 0xFFFF) as u16,
            month: ((date >> 16) & 0xFF) as u8,
            day: (date >> 24) as u8,
            hour: (time >> 8) as u8,
            minute: (time & 0xFF) as u8,
        }
    }

    pub fn is_unset(&self) -> bool {
        *self == SaveDate::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveInfo {
    pub play_time_secs: u32,
    pub date: SaveDate,
}

#[derive(Debug, Clone)]
pub struct SaveMetadata {
    pub header: SaveHeader,
    pub info: SaveInfo,
    pub thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Clone)]
pub struct SaveGame {
    pub header: SaveHeader,
    pub info: SaveInfo,
    pub thumbnail: Option<Thumbnail>,
    pub payload: Vec<u8>,
}

pub fn write_savegame<W: Write>(
    out: &mut W,
    header: &SaveHeader,
    info: &SaveInfo,
    thumbnail: Option<&Thumbnail>,
    payload: &[u8],
) -> Result<(), SaveError> {
    let mut buf: Vec<u8> = Vec::with_capacity(128 + payload.len());

    buf.put_slice(&SAVEGAME_TAG);
    buf.put_u32_le(SAVEGAME_VERSION);
    let mut name = [0u8; DESCRIPTION_LEN];
    let description = truncate_utf8(&header.description, DESCRIPTION_LEN - 1);
    name[..description.len()].copy_from_slice(description.as_bytes());
    buf.put_slice(&name);
    let engine_id = truncate_utf8(&header.engine_id, u8::MAX as usize);
    buf.put_u8(engine_id.len() as u8);
    buf.put_slice(engine_id.as_bytes());

    buf.put_slice(&INFO_TAG);
    buf.put_u32(INFO_VERSION);
    buf.put_u32(INFO_SIZE);
    buf.put_u32(0);
    buf.put_u32(info.play_time_secs);
    buf.put_u32(info.date.packed_date());
    buf.put_u16(info.date.packed_time());

    if let Some(thumbnail) = thumbnail {
        thumbnail.write_to(&mut buf)?;
    }

    let length = u32::try_from(payload.len()).map_err(|_| SaveError::PayloadLength {
        expected: u32::MAX,
        actual: payload.len(),
    })?;
    buf.put_slice(&DATA_TAG);
    buf.put_u32_le(length);
    buf.put_slice(payload);

    out.write_all(&buf)?;
    Ok(())
}

pub fn read_savegame<R: Read>(input: &mut R) -> Result<SaveGame, SaveError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let mut cursor = bytes.as_slice();

    let header = parse_header(&mut cursor)?;
    let info = parse_info(&mut cursor)?;
    let thumbnail = parse_thumbnail(&mut cursor)?;

    if cursor.remaining() < 8 {
        return Err(SaveError::MissingPayload);
    }
    if cursor[..4] != DATA_TAG {
        return Err(SaveError::MissingPayload);
    }
    cursor.advance(4);
    let expected = cursor.get_u32_le();
    if cursor.remaining() != expected as usize {
        return Err(SaveError::PayloadLength {
            expected,
            actual: cursor.remaining(),
        });
    }

    Ok(SaveGame {
        header,
        info,
        thumbnail,
        payload: cursor.to_vec(),
    })
}

/// Reads everything but the engine payload.
pub fn read_save_metadata<R: Read>(
    input: &mut R,
    skip_thumbnail: bool,
) -> Result<SaveMetadata, SaveError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let mut cursor = bytes.as_slice();

    let header = parse_header(&mut cursor)?;
    let info = parse_info(&mut cursor)?;
    let thumbnail = if skip_thumbnail {
        None
    } else {
        parse_thumbnail(&mut cursor)?
    };

    Ok(SaveMetadata {
        header,
        info,
        thumbnail,
    })
}

pub fn encode_payload<T: Serialize>(state: &T) -> Result<Vec<u8>, SaveError> {
    Ok(rmp_serde::to_vec_named(state)?)
}

pub fn decode_payload<T>(payload: &[u8]) -> Result<T, SaveError>
where
    T: for<'de> Deserialize<'de>,
{
    Ok(rmp_serde::from_slice(payload)?)
}

fn parse_header(cursor: &mut &[u8]) -> Result<SaveHeader, SaveError> {
    if cursor.remaining() < 8 {
        return Err(SaveError::Truncated);
    }
    if cursor[..4] != SAVEGAME_TAG {
        return Err(SaveError::BadMagic);
    }
    cursor.advance(4);
    let version = cursor.get_u32_le();
    if !(MIN_SAVEGAME_VERSION..=SAVEGAME_VERSION).contains(&version) {
        return Err(SaveError::UnsupportedVersion(version));
    }

    if cursor.remaining() < DESCRIPTION_LEN {
        return Err(SaveError::Truncated);
    }
    let raw_name = &cursor[..DESCRIPTION_LEN];
    let end = raw_name.iter().position(|&b| b == 0).unwrap_or(DESCRIPTION_LEN - 1);
    let description = String::from_utf8_lossy(&raw_name[..end]).into_owned();
    cursor.advance(DESCRIPTION_LEN);

    // Version 1 files predate the engine id field.
    let engine_id = if version >= 2 {
        if cursor.remaining() < 1 {
            return Err(SaveError::Truncated);
        }
        let len = cursor.get_u8() as usize;
        if cursor.remaining() < len {
            return Err(SaveError::Truncated);
        }
        let id = String::from_utf8_lossy(&cursor[..len]).into_owned();
        cursor.advance(len);
        id
    } else {
        String::new()
    };

    Ok(SaveHeader {
        version,
        description,
        engine_id,
    })
}

fn parse_info(cursor: &mut &[u8]) -> Result<SaveInfo, SaveError> {
    if cursor.remaining() < 12 {
        return Err(SaveError::Truncated);
    }
    if cursor[..4] != INFO_TAG {
        return Err(SaveError::CorruptInfo);
    }
    cursor.advance(4);
    let version = cursor.get_u32();
    let size = cursor.get_u32();

    if version == INFO_VERSION && size != INFO_SIZE {
        return Err(SaveError::CorruptInfo);
    }
    if size < INFO_SIZE_V1 || (version >= 2 && size < INFO_SIZE) {
        return Err(SaveError::CorruptInfo);
    }
    let body_len = (size - 12) as usize;
    if cursor.remaining() < body_len {
        return Err(SaveError::Truncated);
    }

    let mut body = &cursor[..body_len];
    let _time_t = body.get_u32();
    let play_time_secs = body.get_u32();
    let date = if version >= 2 {
        let date = body.get_u32();
        let time = body.get_u16();
        SaveDate::from_packed(date, time)
    } else {
        SaveDate::default()
    };
    cursor.advance(body_len);

    Ok(SaveInfo {
        play_time_secs,
        date,
    })
}

fn parse_thumbnail(cursor: &mut &[u8]) -> Result<Option<Thumbnail>, SaveError> {
    if cursor.remaining() < 4 || cursor[..4] != THUMBNAIL_TAG {
        return Ok(None);
    }
    cursor.advance(4);
    let thumbnail = Thumbnail::read_body(cursor)?;
    Ok(Some(thumbnail))
}

fn truncate_utf8(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> SaveInfo {
        SaveInfo {
            play_time_secs: 754,
            date: SaveDate {
                year: 2024,
                month: 3,
                day: 9,
                hour: 21,
                minute: 5,
            },
        }
    }

    fn encode(thumbnail: Option<&Thumbnail>, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let header = SaveHeader::new("Before the drawbridge", "freescape");
        write_savegame(&mut out, &header, &sample_info(), thumbnail, payload).unwrap();
        out
    }

    #[test]
    fn reads_back_header_info_and_payload() {
        let thumb = Thumbnail::new(3, 2, 0x1234);
        let bytes = encode(Some(&thumb), b"state");
        let save = read_savegame(&mut bytes.as_slice()).unwrap();
        assert_eq!(save.header.description, "Before the drawbridge");
        assert_eq!(save.header.engine_id, "freescape");
        assert_eq!(save.info, sample_info());
        assert_eq!(save.thumbnail, Some(thumb));
        assert_eq!(save.payload, b"state");
    }

    #[test]
    fn header_layout_matches_fixed_offsets() {
        let bytes = encode(None, b"");
        assert_eq!(&bytes[..4], b"SCVM");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), SAVEGAME_VERSION);
        assert_eq!(bytes[8 + DESCRIPTION_LEN] as usize, "freescape".len());
        let info = 8 + DESCRIPTION_LEN + 1 + "freescape".len();
        assert_eq!(&bytes[info..info + 4], b"INFO");
        assert_eq!(
            u32::from_be_bytes(bytes[info + 8..info + 12].try_into().unwrap()),
            INFO_SIZE
        );
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let mut out = Vec::new();
        let header = SaveHeader::new("x".repeat(80), "eob");
        write_savegame(&mut out, &header, &SaveInfo::default(), None, b"").unwrap();
        let meta = read_save_metadata(&mut out.as_slice(), true).unwrap();
        assert_eq!(meta.header.description.len(), DESCRIPTION_LEN - 1);
    }

    #[test]
    fn rejects_bad_magic_and_versions() {
        let mut bytes = encode(None, b"");
        bytes[0] = b'X';
        assert!(matches!(
            read_savegame(&mut bytes.as_slice()),
            Err(SaveError::BadMagic)
        ));

        let mut bytes = encode(None, b"");
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            read_savegame(&mut bytes.as_slice()),
            Err(SaveError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn detects_corrupt_info_size() {
        let mut bytes = encode(None, b"");
        let info = 8 + DESCRIPTION_LEN + 1 + "freescape".len();
        bytes[info + 8..info + 12].copy_from_slice(&30u32.to_be_bytes());
        assert!(matches!(
            read_savegame(&mut bytes.as_slice()),
            Err(SaveError::CorruptInfo)
        ));
    }

    #[test]
    fn detects_truncated_payload() {
        let mut bytes = encode(None, b"payload");
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            read_savegame(&mut bytes.as_slice()),
            Err(SaveError::PayloadLength {
                expected: 7,
                actual: 5
            })
        ));
    }

    #[test]
    fn reads_version_one_files() {
        let mut bytes = Vec::new();
        bytes.put_slice(&SAVEGAME_TAG);
        bytes.put_u32_le(1);
        let mut name = [0u8; DESCRIPTION_LEN];
        name[..5].copy_from_slice(b"old 1");
        bytes.put_slice(&name);
        bytes.put_slice(&INFO_TAG);
        bytes.put_u32(1);
        bytes.put_u32(INFO_SIZE_V1);
        bytes.put_u32(0);
        bytes.put_u32(42);
        bytes.put_slice(&DATA_TAG);
        bytes.put_u32_le(0);

        let save = read_savegame(&mut bytes.as_slice()).unwrap();
        assert_eq!(save.header.version, 1);
        assert_eq!(save.header.description, "old 1");
        assert!(save.header.engine_id.is_empty());
        assert_eq!(save.info.play_time_secs, 42);
        assert!(save.info.date.is_unset());
    }

    #[test]
    fn packs_dates_like_the_info_section() {
        let date = sample_info().date;
        assert_eq!(date.packed_date(), (9 << 24) | (3 << 16) | 2024);
        assert_eq!(date.packed_time(), (21 << 8) | 5);
        assert_eq!(SaveDate::from_packed(date.packed_date(), date.packed_time()), date);
    }

    #[test]
    fn payload_helpers_use_messagepack() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct State {
            area: u16,
            shield: i32,
        }
        let bytes = encode_payload(&State { area: 3, shield: 40 }).unwrap();
        let state: State = decode_payload(&bytes).unwrap();
        assert_eq!(state, State { area: 3, shield: 40 });
    }
}
