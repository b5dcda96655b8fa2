//! RLE / bit-packing hybrid encoding for definition and repetition levels.
//!
//! Layout of one encoded block:
//!
//! ```text
//! block          := length:u32le run*
//! run            := rle-run | bit-packed-run
//! rle-run        := varint(count << 1) value:ceil(bit_width / 8) bytes
//! bit-packed-run := varint(groups << 1 | 1) groups * bit_width bytes
//! ```
//!
//! Bit-packed values are packed LSB first, eight values per group. The last
//! group is padded with zeros; decoders stop after the number of values the
//! page header declares.

use crate::{ParquetError, Result};

/// Largest number of 8-value groups in one bit-packed run; keeps the run
/// header to a single varint byte.
const MAX_GROUPS_PER_BIT_PACKED_RUN: usize = 63;
const MAX_BUFFERED_LITERALS: usize = MAX_GROUPS_PER_BIT_PACKED_RUN * 8;

/// Minimum run length worth encoding as an RLE run
const MIN_RLE_RUN: usize = 8;

/// Number of bits needed to store levels up to `max_level`
pub fn bit_width(max_level: u8) -> u8 {
    (8 - max_level.leading_zeros()) as u8
}

/// Encoder/decoder for one level stream of a fixed bit width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelEncoder {
    bit_width: u8,
}

impl LevelEncoder {
    pub fn new(bit_width: u8) -> Self {
        debug_assert!(bit_width <= 8);
        Self { bit_width }
    }

    pub fn for_max_level(max_level: u8) -> Self {
        Self::new(bit_width(max_level))
    }

    pub fn bit_width(&self) -> u8 {
        self.bit_width
    }

    /// Append the length-prefixed encoding of `levels` to `out` and return the
    /// number of bytes appended.
    pub fn encode(&self, levels: &[u8], out: &mut Vec<u8>) -> usize {
        let start = out.len();
        out.extend_from_slice(&[0; 4]);

        let mut literals: Vec<u8> = Vec::with_capacity(MAX_BUFFERED_LITERALS);
        let mut idx = 0;
        while idx < levels.len() {
            let value = levels[idx];
            let mut run = levels[idx..].iter().take_while(|&&l| l == value).count();

            if run >= MIN_RLE_RUN {
                // Top up pending literals to a whole group from the run itself
                let fill = (8 - literals.len() % 8) % 8;
                literals.extend(std::iter::repeat(value).take(fill));
                idx += fill;
                run -= fill;
                if run >= MIN_RLE_RUN {
                    self.flush_literals(&mut literals, out);
                    self.put_rle_run(value, run, out);
                    idx += run;
                    continue;
                }
            }

            for _ in 0..run {
                if literals.len() == MAX_BUFFERED_LITERALS {
                    self.flush_literals(&mut literals, out);
                }
                literals.push(value);
            }
            idx += run;
        }
        self.flush_literals(&mut literals, out);

        let body_len = (out.len() - start - 4) as u32;
        out[start..start + 4].copy_from_slice(&body_len.to_le_bytes());
        out.len() - start
    }

    fn put_rle_run(&self, value: u8, count: usize, out: &mut Vec<u8>) {
        put_varint((count as u64) << 1, out);
        let value_bytes = usize::from(self.bit_width).div_ceil(8);
        if value_bytes > 0 {
            out.push(value);
        }
    }

    fn flush_literals(&self, literals: &mut Vec<u8>, out: &mut Vec<u8>) {
        if literals.is_empty() {
            return;
        }
        let groups = literals.len().div_ceil(8);
        literals.resize(groups * 8, 0);
        put_varint(((groups as u64) << 1) | 1, out);

        let width = usize::from(self.bit_width);
        let base = out.len();
        out.resize(base + groups * width, 0);
        for (i, &level) in literals.iter().enumerate() {
            for b in 0..width {
                if (level >> b) & 1 == 1 {
                    let bit = i * width + b;
                    out[base + bit / 8] |= 1 << (bit % 8);
                }
            }
        }
        literals.clear();
    }

    /// Decode exactly `count` levels from a length-prefixed block.
    ///
    /// Returns the levels and the number of bytes of `data` the block
    /// occupies (prefix included).
    pub fn decode(&self, data: &[u8], count: usize) -> Result<(Vec<u8>, usize)> {
        if self.bit_width > 8 {
            return Err(ParquetError::corrupt(format!(
                "level bit width {} is wider than a level",
                self.bit_width
            )));
        }
        let prefix = data
            .get(..4)
            .ok_or_else(|| ParquetError::corrupt("level block is missing its length prefix"))?;
        let mut len = [0u8; 4];
        len.copy_from_slice(prefix);
        let end = 4 + u32::from_le_bytes(len) as usize;
        let body = data.get(4..end).ok_or_else(|| {
            ParquetError::corrupt(format!(
                "level block declares {} bytes, only {} available",
                end - 4,
                data.len() - 4
            ))
        })?;

        let width = usize::from(self.bit_width);
        let mut levels = Vec::with_capacity(count);
        let mut pos = 0;
        while levels.len() < count {
            if pos >= body.len() {
                return Err(ParquetError::corrupt(format!(
                    "level block ends after {} of {} levels",
                    levels.len(),
                    count
                )));
            }
            let header = get_varint(body, &mut pos)?;
            let remaining = count - levels.len();

            if header & 1 == 1 {
                let too_long = || ParquetError::corrupt("bit-packed level run is too long");
                let groups = usize::try_from(header >> 1).map_err(|_| too_long())?;
                let values = groups.checked_mul(8).ok_or_else(too_long)?;
                let run_end = groups
                    .checked_mul(width)
                    .and_then(|len| pos.checked_add(len))
                    .ok_or_else(too_long)?;
                let packed = body.get(pos..run_end).ok_or_else(|| {
                    ParquetError::corrupt("bit-packed level run is truncated")
                })?;
                for i in 0..values.min(remaining) {
                    let mut level = 0u8;
                    for b in 0..width {
                        let bit = i * width + b;
                        if (packed[bit / 8] >> (bit % 8)) & 1 == 1 {
                            level |= 1 << b;
                        }
                    }
                    levels.push(level);
                }
                pos += packed.len();
            } else {
                let run = usize::try_from(header >> 1).unwrap_or(usize::MAX);
                let value_bytes = width.div_ceil(8);
                let value = match value_bytes {
                    0 => 0,
                    _ => *body
                        .get(pos)
                        .ok_or_else(|| ParquetError::corrupt("RLE level run is truncated"))?,
                };
                pos += value_bytes;
                levels.extend(std::iter::repeat(value).take(run.min(remaining)));
            }
        }

        Ok((levels, end))
    }
}

fn put_varint(mut v: u64, out: &mut Vec<u8>) {
    while v >= 0x80 {
        out.push((v as u8 & 0x7f) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn get_varint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;
    let mut shift = 0;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| ParquetError::corrupt("level run header is truncated"))?;
        *pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift >= 64 {
            return Err(ParquetError::corrupt("level run header varint is too long"));
        }
    }
}
