// SPDX-License-Identifier: PMPL-1.0-or-later

//! Byte-level helpers shared by the volume codecs

use crate::model::volume::alloc_voxels;
use crate::types::VoxelDataType;
use anyhow::{bail, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Fixed-layout binary header read at explicit offsets.
pub struct HeaderBytes<'a> {
    bytes: &'a [u8],
    pub endian: Endian,
}

impl<'a> HeaderBytes<'a> {
    /// Detect byte order from a leading `sizeof_hdr` field.
    pub fn detect(bytes: &'a [u8], expected_size: i32) -> Result<Self> {
        if bytes.len() < expected_size as usize {
            bail!(
                "header is {} bytes, expected at least {}",
                bytes.len(),
                expected_size
            );
        }
        let endian = if LittleEndian::read_i32(bytes) == expected_size {
            Endian::Little
        } else if BigEndian::read_i32(bytes) == expected_size {
            Endian::Big
        } else {
            bail!("header size field is not {}", expected_size);
        };
        Ok(Self { bytes, endian })
    }

    pub fn i16_at(&self, offset: usize) -> i16 {
        let b = &self.bytes[offset..offset + 2];
        match self.endian {
            Endian::Little => LittleEndian::read_i16(b),
            Endian::Big => BigEndian::read_i16(b),
        }
    }

    pub fn i32_at(&self, offset: usize) -> i32 {
        let b = &self.bytes[offset..offset + 4];
        match self.endian {
            Endian::Little => LittleEndian::read_i32(b),
            Endian::Big => BigEndian::read_i32(b),
        }
    }

    pub fn f32_at(&self, offset: usize) -> f32 {
        let b = &self.bytes[offset..offset + 4];
        match self.endian {
            Endian::Little => LittleEndian::read_f32(b),
            Endian::Big => BigEndian::read_f32(b),
        }
    }

    pub fn u8_at(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    pub fn slice(&self, offset: usize, len: usize) -> &'a [u8] {
        &self.bytes[offset..offset + len]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Little-endian header under construction.
pub struct HeaderWriter {
    pub bytes: Vec<u8>,
}

impl HeaderWriter {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0u8; size],
        }
    }

    pub fn put_i16(&mut self, offset: usize, value: i16) {
        LittleEndian::write_i16(&mut self.bytes[offset..offset + 2], value);
    }

    /// Store a header short, failing when `value` does not fit in 16 bits.
    pub fn put_short<T>(&mut self, offset: usize, value: T, what: &str) -> Result<()>
    where
        T: TryInto<i16> + Copy + std::fmt::Display,
    {
        let Ok(short) = value.try_into() else {
            bail!("{} {} does not fit the 16-bit header field (limit {})", what, value, i16::MAX);
        };
        self.put_i16(offset, short);
        Ok(())
    }

    pub fn put_i32(&mut self, offset: usize, value: i32) {
        LittleEndian::write_i32(&mut self.bytes[offset..offset + 4], value);
    }

    pub fn put_f32(&mut self, offset: usize, value: f32) {
        LittleEndian::write_f32(&mut self.bytes[offset..offset + 4], value);
    }

    pub fn put_bytes(&mut self, offset: usize, value: &[u8]) {
        self.bytes[offset..offset + value.len()].copy_from_slice(value);
    }
}

/// Decode `count` voxels, applying `value * slope + intercept` when the
/// slope is non-zero.
pub fn decode_voxels(
    bytes: &[u8],
    data_type: VoxelDataType,
    endian: Endian,
    count: usize,
    slope: f32,
    intercept: f32,
) -> Result<Vec<f32>> {
    let width = data_type.bytes();
    let needed = count * width;
    if bytes.len() < needed {
        bail!(
            "voxel data is {} bytes, expected {} ({} {} voxels)",
            bytes.len(),
            needed,
            count,
            data_type.name()
        );
    }
    let mut out = alloc_voxels(count)?;
    let bytes = &bytes[..needed];
    for (n, chunk) in bytes.chunks_exact(width).enumerate() {
        out[n] = match (data_type, endian) {
            (VoxelDataType::UnsignedByte, _) => chunk[0] as f32,
            (VoxelDataType::SignedShort, Endian::Little) => LittleEndian::read_i16(chunk) as f32,
            (VoxelDataType::SignedShort, Endian::Big) => BigEndian::read_i16(chunk) as f32,
            (VoxelDataType::SignedInt, Endian::Little) => LittleEndian::read_i32(chunk) as f32,
            (VoxelDataType::SignedInt, Endian::Big) => BigEndian::read_i32(chunk) as f32,
            (VoxelDataType::Float, Endian::Little) => LittleEndian::read_f32(chunk),
            (VoxelDataType::Float, Endian::Big) => BigEndian::read_f32(chunk),
            (VoxelDataType::Double, Endian::Little) => LittleEndian::read_f64(chunk) as f32,
            (VoxelDataType::Double, Endian::Big) => BigEndian::read_f64(chunk) as f32,
        };
    }
    if slope != 0.0 && !(slope == 1.0 && intercept == 0.0) {
        for v in out.iter_mut() {
            *v = *v * slope + intercept;
        }
    }
    Ok(out)
}

/// Float32 little-endian voxel payload.
pub fn encode_voxels(data: &[f32]) -> Vec<u8> {
    let mut bytes = vec![0u8; data.len() * 4];
    LittleEndian::write_f32_into(data, &mut bytes);
    bytes
}

/// Fixed-width, NUL-padded text field.
pub fn fixed_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes[..end]);
    text.trim_end().to_string()
}

/// Encode `text` into at most `width - 1` bytes so the field stays terminated.
pub fn encode_fixed_text(text: &str, width: usize) -> Vec<u8> {
    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(text);
    let mut out = encoded.into_owned();
    out.truncate(width.saturating_sub(1));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_shorts_are_scaled() {
        let bytes = [0x00, 0x02, 0xff, 0xfe];
        let voxels =
            decode_voxels(&bytes, VoxelDataType::SignedShort, Endian::Big, 2, 0.5, 1.0).unwrap();
        assert_eq!(voxels, [2.0, 0.0]);
    }

    #[test]
    fn header_shorts_reject_values_past_i16() {
        let mut hdr = HeaderWriter::new(4);
        hdr.put_short(0, 32_767usize, "dimension").unwrap();
        assert_eq!(LittleEndian::read_i16(&hdr.bytes[0..2]), 32_767);
        let err = hdr.put_short(2, 40_000usize, "dimension").unwrap_err();
        assert!(err.to_string().contains("dimension 40000"));
        assert_eq!(&hdr.bytes[2..4], &[0, 0]);
        assert!(hdr.put_short(2, -40_000i64, "originator").is_err());
    }

    #[test]
    fn short_payload_is_an_error() {
        let err = decode_voxels(&[0u8; 3], VoxelDataType::Float, Endian::Little, 1, 0.0, 0.0)
            .unwrap_err();
        assert!(err.to_string().contains("expected 4"));
    }

    #[test]
    fn fixed_text_uses_windows_1252() {
        let field = encode_fixed_text("caf\u{e9}", 80);
        assert_eq!(field, b"caf\xe9");
        let mut padded = field.clone();
        padded.resize(80, 0);
        assert_eq!(fixed_text(&padded), "caf\u{e9}");
    }
}
