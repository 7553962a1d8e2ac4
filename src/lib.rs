pub mod builder;
pub mod compression;
pub mod config;
pub mod error;
pub mod packing;
pub mod reader;
pub mod table;
pub mod transport;
pub mod types;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub use crate::builder::MessageBuilder;
pub use crate::config::CodecConfig;
pub use crate::error::CodecError;
pub use crate::reader::{decode_batch, MessageReader};
pub use crate::table::DataTable;
pub use crate::types::{DataType, FieldValue, Message, TableEntry};

/// 长度前缀字节数（u32，大端）
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// 默认的单条消息解压上限（16 MiB）
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// 压缩算法枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum CompressionType {
    None = 0,
    #[default]
    Zlib = 1,
    Lz4 = 2,
    Zstd = 3,
    Brotli = 4,
}

impl CompressionType {
    pub fn name(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Zlib => "zlib",
            CompressionType::Lz4 => "lz4",
            CompressionType::Zstd => "zstd",
            CompressionType::Brotli => "brotli",
        }
    }

    /// 压缩流自带校验（Zlib 的 Adler-32，LZ4 与 Zstd 的内容校验），
    /// 损坏的线上字节不会被静默解码成错误的值。None 和 Brotli 没有校验。
    pub fn verifies_integrity(&self) -> bool {
        matches!(
            self,
            CompressionType::Zlib | CompressionType::Lz4 | CompressionType::Zstd
        )
    }
}

impl TryFrom<u8> for CompressionType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        compression::compression_type_from_u8(value)
    }
}

impl FromStr for CompressionType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(CompressionType::None),
            "zlib" | "deflate" => Ok(CompressionType::Zlib),
            "lz4" => Ok(CompressionType::Lz4),
            "zstd" => Ok(CompressionType::Zstd),
            "brotli" => Ok(CompressionType::Brotli),
            other => Err(CodecError::Config(format!("不支持的压缩算法: {}", other))),
        }
    }
}
