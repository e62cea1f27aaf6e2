//! Binary encoding of a descriptor set stored as a view embedding.
//!
//! Layout, all integers and floats little-endian:
//!
//! | field               | type       |
//! |---------------------|------------|
//! | magic `SFMDESCR`    | `[u8; 8]`  |
//! | version             | `u16`      |
//! | width               | `u32`      |
//! | height              | `u32`      |
//! | descriptor count    | `u32`      |
//! | descriptor length   | `u32`      |
//! | CRC-32 of payload   | `u32`      |
//! | payload             | records    |
//!
//! Each record is `x: f32, y: f32` followed by `descriptor length` `f32`
//! values. `width` and `height` are the dimensions of the image the
//! descriptors were computed at; positions are in that image's pixels.

use sfm_features_core::{Descriptor, Descriptors};

const MAGIC: &[u8; 8] = b"SFMDESCR";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 8 + 2 + 4 * 5;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingError {
    #[error("descriptor embedding has an invalid header")]
    InvalidHeader,
    #[error("unsupported descriptor embedding version {0}")]
    UnsupportedVersion(u16),
    #[error("descriptor embedding has {got} bytes, expected {expected}")]
    Truncated { expected: usize, got: usize },
    #[error("descriptor embedding checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },
    #[error("descriptor length {found} does not match the expected {expected}")]
    DescriptorLength { expected: usize, found: usize },
    #[error("value {0} does not fit the embedding format")]
    Overflow(usize),
}

/// Fixed-size prefix of an encoded descriptor set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmbeddingHeader {
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub descriptor_length: usize,
}

/// Descriptors recovered from an embedding together with the dimensions of
/// the image they were computed at.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedDescriptors {
    pub width: usize,
    pub height: usize,
    pub descriptors: Descriptors,
}

/// Serialize `descriptors` computed on a `width x height` image.
///
/// Every descriptor must carry exactly `descriptor_length` values.
pub fn encode(
    descriptors: &[Descriptor],
    descriptor_length: usize,
    width: usize,
    height: usize,
) -> Result<Vec<u8>, EmbeddingError> {
    if let Some(bad) = descriptors
        .iter()
        .find(|d| d.data.len() != descriptor_length)
    {
        return Err(EmbeddingError::DescriptorLength {
            expected: descriptor_length,
            found: bad.data.len(),
        });
    }

    let record = (2 + descriptor_length) * 4;
    let mut payload = Vec::with_capacity(descriptors.len() * record);
    for d in descriptors {
        payload.extend_from_slice(&d.x.to_le_bytes());
        payload.extend_from_slice(&d.y.to_le_bytes());
        for v in &d.data {
            payload.extend_from_slice(&v.to_le_bytes());
        }
    }

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    for value in [width, height, descriptors.len(), descriptor_length] {
        out.extend_from_slice(&to_u32(value)?.to_le_bytes());
    }
    out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Read and validate the header without touching the payload.
pub fn header(bytes: &[u8]) -> Result<EmbeddingHeader, EmbeddingError> {
    if bytes.len() < HEADER_LEN || &bytes[..8] != MAGIC {
        return Err(EmbeddingError::InvalidHeader);
    }
    let version = u16::from_le_bytes([bytes[8], bytes[9]]);
    if version != VERSION {
        return Err(EmbeddingError::UnsupportedVersion(version));
    }
    Ok(EmbeddingHeader {
        width: read_u32(bytes, 10) as usize,
        height: read_u32(bytes, 14) as usize,
        count: read_u32(bytes, 18) as usize,
        descriptor_length: read_u32(bytes, 22) as usize,
    })
}

/// Decode an embedding whose descriptors must have `descriptor_length`
/// values each.
pub fn decode(bytes: &[u8], descriptor_length: usize) -> Result<DecodedDescriptors, EmbeddingError> {
    let head = header(bytes)?;
    if head.descriptor_length != descriptor_length {
        return Err(EmbeddingError::DescriptorLength {
            expected: descriptor_length,
            found: head.descriptor_length,
        });
    }

    let record = (2 + descriptor_length) * 4;
    let expected = head
        .count
        .checked_mul(record)
        .and_then(|n| n.checked_add(HEADER_LEN))
        .ok_or(EmbeddingError::Overflow(head.count))?;
    if bytes.len() != expected {
        return Err(EmbeddingError::Truncated {
            expected,
            got: bytes.len(),
        });
    }

    let stored = read_u32(bytes, 26);
    let payload = &bytes[HEADER_LEN..];
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(EmbeddingError::ChecksumMismatch { stored, computed });
    }

    let mut floats = payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]));
    let mut descriptors = Vec::with_capacity(head.count);
    for _ in 0..head.count {
        let x = floats.next().unwrap_or_default();
        let y = floats.next().unwrap_or_default();
        let data = floats.by_ref().take(descriptor_length).collect();
        descriptors.push(Descriptor { x, y, data });
    }

    Ok(DecodedDescriptors {
        width: head.width,
        height: head.height,
        descriptors,
    })
}

fn to_u32(value: usize) -> Result<u32, EmbeddingError> {
    u32::try_from(value).map_err(|_| EmbeddingError::Overflow(value))
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
