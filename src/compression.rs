use crate::{error::CodecError, CompressionType};
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use std::io::{Read, Write};

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_LGWIN: u32 = 22;

/// Zlib默认使用最高压缩等级
pub const ZLIB_DEFAULT_LEVEL: i32 = 9;
pub const ZSTD_DEFAULT_LEVEL: i32 = 3;
pub const BROTLI_DEFAULT_LEVEL: i32 = 11;

/// 返回该算法的默认压缩等级（LZ4和None没有等级）
pub fn default_level(compression_type: CompressionType) -> Option<i32> {
    match compression_type {
        CompressionType::Zlib => Some(ZLIB_DEFAULT_LEVEL),
        CompressionType::Zstd => Some(ZSTD_DEFAULT_LEVEL),
        CompressionType::Brotli => Some(BROTLI_DEFAULT_LEVEL),
        CompressionType::None | CompressionType::Lz4 => None,
    }
}

/// 返回该算法可接受的压缩等级范围
pub fn level_range(compression_type: CompressionType) -> Option<(i32, i32)> {
    match compression_type {
        CompressionType::Zlib => Some((0, 9)),
        CompressionType::Zstd => Some((1, 22)),
        CompressionType::Brotli => Some((0, 11)),
        CompressionType::None | CompressionType::Lz4 => None,
    }
}

/// 压缩数据
///
/// `level` 为 `None` 时使用 [`default_level`]。
pub fn compress_data(
    data: &[u8],
    compression_type: CompressionType,
    level: Option<i32>,
) -> Result<Vec<u8>, CodecError> {
    let level = level.or_else(|| default_level(compression_type));

    match compression_type {
        CompressionType::None => Ok(data.to_vec()),

        CompressionType::Zlib => {
            let level = level.unwrap_or(ZLIB_DEFAULT_LEVEL).clamp(0, 9) as u32;
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level));
            encoder
                .write_all(data)
                .map_err(|e| CodecError::Compression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CodecError::Compression(e.to_string()))
        }

        // 帧模式并开启内容校验，损坏的数据在解压时报错
        CompressionType::Lz4 => {
            let mut encoder = lz4::EncoderBuilder::new()
                .checksum(lz4::ContentChecksum::ChecksumEnabled)
                .build(Vec::new())
                .map_err(|e| CodecError::Compression(e.to_string()))?;
            encoder
                .write_all(data)
                .map_err(|e| CodecError::Compression(e.to_string()))?;
            let (compressed, result) = encoder.finish();
            result.map_err(|e| CodecError::Compression(e.to_string()))?;
            Ok(compressed)
        }

        CompressionType::Zstd => {
            let mut compressed = Vec::new();
            let mut encoder =
                zstd::Encoder::new(&mut compressed, level.unwrap_or(ZSTD_DEFAULT_LEVEL))
                    .map_err(|e| CodecError::Compression(e.to_string()))?;
            encoder
                .include_checksum(true)
                .map_err(|e| CodecError::Compression(e.to_string()))?;
            encoder
                .write_all(data)
                .map_err(|e| CodecError::Compression(e.to_string()))?;
            encoder
                .finish()
                .map_err(|e| CodecError::Compression(e.to_string()))?;
            Ok(compressed)
        }

        CompressionType::Brotli => {
            let quality = level.unwrap_or(BROTLI_DEFAULT_LEVEL).clamp(0, 11) as u32;
            let mut compressed = Vec::new();
            {
                let mut encoder = brotli::CompressorWriter::new(
                    &mut compressed,
                    BROTLI_BUFFER_SIZE,
                    quality,
                    BROTLI_LGWIN,
                );
                encoder
                    .write_all(data)
                    .map_err(|e| CodecError::Compression(e.to_string()))?;
                encoder
                    .flush()
                    .map_err(|e| CodecError::Compression(e.to_string()))?;
            }
            Ok(compressed)
        }
    }
}

/// 解压数据
///
/// `original_len` 是压缩前的长度，解压结果与其不一致时视为解压错误。
pub fn decompress_data(
    compressed_data: &[u8],
    original_len: usize,
    compression_type: CompressionType,
) -> Result<Vec<u8>, CodecError> {
    let decompressed = match compression_type {
        CompressionType::None => compressed_data.to_vec(),

        CompressionType::Zlib => {
            let mut decompressed = Vec::with_capacity(original_len);
            ZlibDecoder::new(compressed_data)
                .take(original_len as u64 + 1)
                .read_to_end(&mut decompressed)
                .map_err(|e| CodecError::Decompression(e.to_string()))?;
            decompressed
        }

        CompressionType::Lz4 => {
            let mut decompressed = Vec::with_capacity(original_len);
            lz4::Decoder::new(compressed_data)
                .map_err(|e| CodecError::Decompression(e.to_string()))?
                .take(original_len as u64 + 1)
                .read_to_end(&mut decompressed)
                .map_err(|e| CodecError::Decompression(e.to_string()))?;
            decompressed
        }

        CompressionType::Zstd => zstd::bulk::decompress(compressed_data, original_len)
            .map_err(|e| CodecError::Decompression(e.to_string()))?,

        CompressionType::Brotli => {
            let mut decompressed = Vec::with_capacity(original_len);
            brotli::Decompressor::new(compressed_data, BROTLI_BUFFER_SIZE)
                .take(original_len as u64 + 1)
                .read_to_end(&mut decompressed)
                .map_err(|e| CodecError::Decompression(e.to_string()))?;
            decompressed
        }
    };

    if decompressed.len() != original_len {
        return Err(CodecError::Decompression(format!(
            "解压后长度 {} 与声明长度 {} 不一致",
            decompressed.len(),
            original_len
        )));
    }

    Ok(decompressed)
}

/// 将压缩类型值转换为枚举
pub fn compression_type_from_u8(value: u8) -> Result<CompressionType, CodecError> {
    match value {
        0 => Ok(CompressionType::None),
        1 => Ok(CompressionType::Zlib),
        2 => Ok(CompressionType::Lz4),
        3 => Ok(CompressionType::Zstd),
        4 => Ok(CompressionType::Brotli),
        _ => Err(CodecError::UnsupportedCompression(value)),
    }
}
