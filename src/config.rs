use crate::{
    compression::level_range, error::CodecError, CompressionType, DEFAULT_MAX_MESSAGE_SIZE,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// 编解码配置
///
/// 压缩算法不写入线上格式，收发双方必须使用相同的配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// None 和 Brotli 不校验数据完整性，损坏的消息可能被解码成错误的值，
    /// 见 [`CompressionType::verifies_integrity`]
    pub compression: CompressionType,
    /// 压缩等级，`None` 使用算法默认值（Zlib 为最高等级）
    pub level: Option<i32>,
    /// 数值零写为一个 0x00 字节，文本、字节和JSON原样写入；
    /// 关闭后与旧版格式兼容：所有非布尔字段截断前导零，全零或空值直接丢弃
    pub preserve_zero_values: bool,
    /// 允许的最大内层长度
    pub max_message_size: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression: CompressionType::Zlib,
            level: None,
            preserve_zero_values: true,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl CodecConfig {
    pub fn new(compression: CompressionType) -> Self {
        Self {
            compression,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    /// 旧版格式：零值和空值不写入
    pub fn legacy(mut self) -> Self {
        self.preserve_zero_values = false;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: u32) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// 从JSON文本读取配置
    pub fn from_json_str(text: &str) -> Result<Self, CodecError> {
        let config: CodecConfig = serde_json::from_str(text)
            .map_err(|e| CodecError::Config(format!("配置解析失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从JSON文件读取配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CodecError> {
        let reader = BufReader::new(File::open(path)?);
        let config: CodecConfig = serde_json::from_reader(reader)
            .map_err(|e| CodecError::Config(format!("配置解析失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CodecError> {
        if self.max_message_size == 0 {
            return Err(CodecError::Config("max_message_size 不能为0".to_string()));
        }

        if let Some(level) = self.level {
            match level_range(self.compression) {
                Some((min, max)) if level < min || level > max => {
                    return Err(CodecError::Config(format!(
                        "{} 压缩等级 {} 超出范围 {}..={}",
                        self.compression.name(),
                        level,
                        min,
                        max
                    )));
                }
                None => {
                    return Err(CodecError::Config(format!(
                        "{} 不支持压缩等级",
                        self.compression.name()
                    )));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = CodecConfig::default();
        assert_eq!(config.compression, CompressionType::Zlib);
        assert!(config.preserve_zero_values);
        assert_eq!(config.level, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = CodecConfig::from_json_str(r#"{"compression":"zstd","level":19}"#).unwrap();
        assert_eq!(config.compression, CompressionType::Zstd);
        assert_eq!(config.level, Some(19));
        assert_eq!(config.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
    }

    #[test]
    fn rejects_bad_levels() {
        assert!(CodecConfig::new(CompressionType::Zlib)
            .with_level(12)
            .validate()
            .is_err());
        assert!(CodecConfig::new(CompressionType::Lz4)
            .with_level(1)
            .validate()
            .is_err());
        assert!(CodecConfig::default()
            .with_max_message_size(0)
            .validate()
            .is_err());
        assert!(matches!(
            CodecConfig::from_json_str(r#"{"compression":"rar"}"#),
            Err(CodecError::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"compression":"lz4","preserve_zero_values":false}}"#).unwrap();

        let config = CodecConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.compression, CompressionType::Lz4);
        assert!(!config.preserve_zero_values);
    }
}
