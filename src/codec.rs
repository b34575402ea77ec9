use std::io::Cursor;

use anyhow::Context as _;
use twox_hash::XxHash32;

use crate::{
    error::VeilResult,
    mask::{CachedMask, atlas_grid},
    raster::Raster,
};

pub const FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 24;
const HASH_SEED: u32 = 0;

/// Header fields a cached record must match to be accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validator {
    pub frame_duration: i64,
    pub frames_count: i32,
    pub canvas_size: i32,
}

struct Header {
    version: u32,
    data_length: u32,
    data_hash: u32,
    frames_count: i32,
    canvas_size: i32,
    frame_duration: i32,
}

impl Header {
    fn write_to(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..8].copy_from_slice(&self.data_length.to_le_bytes());
        out[8..12].copy_from_slice(&self.data_hash.to_le_bytes());
        out[12..16].copy_from_slice(&self.frames_count.to_le_bytes());
        out[16..20].copy_from_slice(&self.canvas_size.to_le_bytes());
        out[20..24].copy_from_slice(&self.frame_duration.to_le_bytes());
    }

    fn read_from(bytes: &[u8]) -> Self {
        let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        let u32_at = |i: usize| u32::from_le_bytes(word(i));
        let i32_at = |i: usize| i32::from_le_bytes(word(i));
        Self {
            version: u32_at(0),
            data_length: u32_at(4),
            data_hash: u32_at(8),
            frames_count: i32_at(12),
            canvas_size: i32_at(16),
            frame_duration: i32_at(20),
        }
    }
}

/// Serialize a mask into a versioned record: fixed header, then one channel
/// of the atlas (the mask is grayscale by construction) as an 8-bit PNG,
/// with an XXH32 of the payload patched into the header.
pub fn serialize(mask: &CachedMask) -> VeilResult<Vec<u8>> {
    assert!(
        mask.frame_duration() < i64::from(i32::MAX),
        "frame_duration does not fit the record header"
    );

    let image = mask.image();
    let width = image.width() as u32;
    let height = image.height() as u32;
    let intensity: Vec<u8> = image.pixels().map(|px| px[0]).collect();
    let gray = image::GrayImage::from_raw(width, height, intensity)
        .context("grayscale buffer does not match atlas dimensions")?;

    let mut out = vec![0u8; HEADER_LEN];
    let mut cursor = Cursor::new(&mut out);
    cursor.set_position(HEADER_LEN as u64);
    image::DynamicImage::ImageLuma8(gray)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .context("encode mask payload")?;

    let header = Header {
        version: FORMAT_VERSION,
        data_length: (out.len() - HEADER_LEN) as u32,
        data_hash: XxHash32::oneshot(HASH_SEED, &out[HEADER_LEN..]),
        frames_count: mask.frames_count(),
        canvas_size: mask.canvas_size(),
        frame_duration: mask.frame_duration() as i32,
    };
    header.write_to(&mut out[..HEADER_LEN]);
    Ok(out)
}

/// Decode a serialized record. Every rejection (truncation, version or
/// validator mismatch, length or hash mismatch, wrong payload format or
/// shape) yields `None`: "no usable cache", never an error.
pub fn deserialize(bytes: &[u8], validator: Option<&Validator>) -> Option<CachedMask> {
    if bytes.len() <= HEADER_LEN {
        return None;
    }
    let header = Header::read_from(&bytes[..HEADER_LEN]);
    if header.version != FORMAT_VERSION
        || header.canvas_size <= 0
        || header.frames_count <= 0
        || header.frame_duration <= 0
    {
        return None;
    }
    if let Some(validator) = validator {
        if validator.frame_duration != i64::from(header.frame_duration)
            || validator.frames_count != header.frames_count
            || validator.canvas_size != header.canvas_size
        {
            return None;
        }
    }

    let payload = &bytes[HEADER_LEN..];
    if header.data_length as usize != payload.len() {
        return None;
    }
    if XxHash32::oneshot(HASH_SEED, payload) != header.data_hash {
        return None;
    }

    let decoded = image::load_from_memory_with_format(payload, image::ImageFormat::Png).ok()?;
    let image::DynamicImage::ImageLuma8(gray) = decoded else {
        return None;
    };
    let (columns, rows) = atlas_grid(header.frames_count);
    let (width, height) = gray.dimensions();
    if width as i32 != columns * header.canvas_size || height as i32 != rows * header.canvas_size {
        return None;
    }

    let mut image = Raster::new(width as i32, height as i32);
    for (px, luma) in image.pixels_mut().zip(gray.pixels()) {
        let v = luma.0[0];
        px.copy_from_slice(&[v, v, v, v]); // premultiplied white again
    }
    Some(CachedMask::new(
        image,
        header.frames_count,
        i64::from(header.frame_duration),
        header.canvas_size,
    ))
}
