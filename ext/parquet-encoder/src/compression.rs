//! Page compression codecs

use parquet::format::CompressionCodec;
use serde::Deserialize;
use std::io::{Read, Write};
use std::str::FromStr;

use crate::{ParquetError, Result};

/// Compression codec applied to one column's pages
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[serde(alias = "none")]
    Uncompressed,
    #[default]
    Snappy,
    Gzip,
}

impl Codec {
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Uncompressed => "UNCOMPRESSED",
            Codec::Snappy => "SNAPPY",
            Codec::Gzip => "GZIP",
        }
    }
}

impl FromStr for Codec {
    type Err = ParquetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Codec::Uncompressed),
            "snappy" => Ok(Codec::Snappy),
            "gzip" => Ok(Codec::Gzip),
            _ => Err(ParquetError::codec(format!("unknown codec name: {}", s))),
        }
    }
}

impl From<Codec> for CompressionCodec {
    fn from(codec: Codec) -> Self {
        match codec {
            Codec::Uncompressed => CompressionCodec::UNCOMPRESSED,
            Codec::Snappy => CompressionCodec::SNAPPY,
            Codec::Gzip => CompressionCodec::GZIP,
        }
    }
}

/// Resolve the codec recorded in a column chunk
impl TryFrom<CompressionCodec> for Codec {
    type Error = ParquetError;

    fn try_from(codec: CompressionCodec) -> Result<Self> {
        let name = match codec {
            CompressionCodec::UNCOMPRESSED => return Ok(Codec::Uncompressed),
            CompressionCodec::SNAPPY => return Ok(Codec::Snappy),
            CompressionCodec::GZIP => return Ok(Codec::Gzip),
            CompressionCodec::LZO => "LZO",
            CompressionCodec::BROTLI => "BROTLI",
            CompressionCodec::LZ4 => "LZ4",
            CompressionCodec::ZSTD => "ZSTD",
            CompressionCodec::LZ4_RAW => "LZ4_RAW",
            other => {
                return Err(ParquetError::codec(format!(
                    "unsupported column chunk codec id: {}",
                    other.0
                )))
            }
        };
        Err(ParquetError::codec(format!(
            "unsupported column chunk codec: {}",
            name
        )))
    }
}

impl TryFrom<parquet::basic::Compression> for Codec {
    type Error = ParquetError;

    fn try_from(compression: parquet::basic::Compression) -> Result<Self> {
        use parquet::basic::Compression;

        match compression {
            Compression::UNCOMPRESSED => Ok(Codec::Uncompressed),
            Compression::SNAPPY => Ok(Codec::Snappy),
            Compression::GZIP(_) => Ok(Codec::Gzip),
            other => Err(ParquetError::codec(format!(
                "unsupported compression: {}",
                other
            ))),
        }
    }
}

/// Sizes and bytes produced by one [`Compressor::compress`] call
#[derive(Debug)]
pub struct Compressed<'a> {
    pub uncompressed_len: usize,
    pub compressed_len: usize,
    pub bytes: &'a [u8],
}

/// Reusable compressor state shared by every column of a writer
pub struct Compressor {
    snappy: snap::raw::Encoder,
    gzip_level: flate2::Compression,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Compressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compressor")
            .field("gzip_level", &self.gzip_level.level())
            .finish()
    }
}

impl Compressor {
    pub fn new() -> Self {
        Self {
            snappy: snap::raw::Encoder::new(),
            gzip_level: flate2::Compression::fast(),
        }
    }

    /// Use a specific gzip level (0-9) instead of the fastest one
    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = flate2::Compression::new(level.min(9));
        self
    }

    /// Compress `input` with `codec`.
    ///
    /// `scratch` is cleared and receives the compressed bytes; for
    /// [`Codec::Uncompressed`] the returned bytes are `input` itself.
    pub fn compress<'a>(
        &mut self,
        codec: Codec,
        input: &'a [u8],
        scratch: &'a mut Vec<u8>,
    ) -> Result<Compressed<'a>> {
        scratch.clear();
        match codec {
            Codec::Uncompressed => {
                return Ok(Compressed {
                    uncompressed_len: input.len(),
                    compressed_len: input.len(),
                    bytes: input,
                })
            }
            Codec::Snappy => {
                scratch.resize(snap::raw::max_compress_len(input.len()), 0);
                let written = self
                    .snappy
                    .compress(input, scratch.as_mut_slice())
                    .map_err(|e| ParquetError::codec(format!("snappy compression failed: {}", e)))?;
                scratch.truncate(written);
            }
            Codec::Gzip => {
                let mut encoder = flate2::write::GzEncoder::new(&mut *scratch, self.gzip_level);
                encoder.write_all(input)?;
                encoder.finish()?;
            }
        }

        let scratch: &'a Vec<u8> = scratch;
        Ok(Compressed {
            uncompressed_len: input.len(),
            compressed_len: scratch.len(),
            bytes: scratch.as_slice(),
        })
    }
}

/// Decompress one page payload, checking it against the size in its header
pub fn decompress(codec: Codec, input: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let out = match codec {
        Codec::Uncompressed => input.to_vec(),
        Codec::Snappy => snap::raw::Decoder::new()
            .decompress_vec(input)
            .map_err(|e| ParquetError::codec(format!("snappy decompression failed: {}", e)))?,
        Codec::Gzip => {
            let mut out = Vec::with_capacity(uncompressed_size);
            flate2::read::MultiGzDecoder::new(input).read_to_end(&mut out)?;
            out
        }
    };

    if out.len() != uncompressed_size {
        return Err(ParquetError::corrupt(format!(
            "{} page decompressed to {} bytes, header says {}",
            codec.name(),
            out.len(),
            uncompressed_size
        )));
    }
    Ok(out)
}
