use crate::types::DataType;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error("帧格式错误: {0}")]
    Framing(String),

    #[error("压缩错误: {0}")]
    Compression(String),

    #[error("解压错误: {0}")]
    Decompression(String),

    #[error("目录表错误: {0}")]
    Table(String),

    #[error("JSON解析错误: {0}")]
    Json(String),

    #[error("{data_type:?} 字段宽度为 {width} 字节，超过 {expected} 字节")]
    ValueWidth {
        data_type: DataType,
        width: usize,
        expected: usize,
    },

    #[error("非UTF-8编码的文本: {0}")]
    Utf8(String),

    #[error("不支持的压缩类型: {0}")]
    UnsupportedCompression(u8),

    #[error("消息ID不一致: 期望 {expected}，实际 {actual}")]
    IdMismatch { expected: i64, actual: i64 },

    #[error("配置错误: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(err.to_string())
    }
}
