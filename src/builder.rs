use crate::{
    compression::compress_data,
    config::CodecConfig,
    error::CodecError,
    packing::pack,
    table::DataTable,
    types::{DataType, FieldValue, Message},
    LENGTH_PREFIX_SIZE,
};
use byteorder::{BigEndian, WriteBytesExt};
use std::sync::Arc;

const ZERO: &[u8] = &[0];

/// 消息构建器，把各类字段依次写入载荷并记录到目录表
///
/// 单个构建器只能由一个写入方使用。
pub struct MessageBuilder {
    config: CodecConfig,
    payload: Vec<u8>,
    table: DataTable,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    /// 使用默认配置（Zlib 最高压缩等级）创建构建器
    pub fn new() -> Self {
        Self::with_config(CodecConfig::default())
    }

    pub fn with_config(config: CodecConfig) -> Self {
        Self {
            config,
            payload: Vec::new(),
            table: DataTable::new(),
        }
    }

    /// 以已有消息为起点，按固定类型顺序回放其全部字段，之后可继续追加
    pub fn modify(message: &Message, config: CodecConfig) -> Result<Self, CodecError> {
        let mut builder = Self::with_config(config);
        builder.replay(message)?;
        Ok(builder)
    }

    /// 把 `inserted` 中的消息依次插入到 `target` 之前
    ///
    /// 每种类型内部的顺序保持不变，但不同类型之间会按
    /// bytes、utf、int16、int32、int64、float32、float64、boolean、json 的顺序重排。
    pub fn insert_before(
        target: &Message,
        inserted: &[&Message],
        config: CodecConfig,
    ) -> Result<Self, CodecError> {
        let mut builder = Self::with_config(config);
        for message in inserted {
            if message.id() != target.id() {
                return Err(CodecError::IdMismatch {
                    expected: target.id(),
                    actual: message.id(),
                });
            }
            builder.replay(message)?;
        }
        builder.replay(target)?;
        Ok(builder)
    }

    /// 回放一条消息的全部字段，不影响该消息自身的读取
    pub fn replay(&mut self, message: &Message) -> Result<(), CodecError> {
        let mut reader = message.reader();
        for value in reader.drain()? {
            self.write_value(&value)?;
        }
        Ok(())
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.write_packed(DataType::Byte, bytes)
    }

    pub fn write_utf(&mut self, text: &str) -> Result<(), CodecError> {
        self.write_packed(DataType::Utf, text.as_bytes())
    }

    pub fn write_json(&mut self, value: &serde_json::Value) -> Result<(), CodecError> {
        let bytes = serde_json::to_vec(value)?;
        self.write_packed(DataType::Json, &bytes)
    }

    pub fn write_int16(&mut self, value: i16) -> Result<(), CodecError> {
        self.write_packed(DataType::Int16, &value.to_be_bytes())
    }

    pub fn write_int32(&mut self, value: i32) -> Result<(), CodecError> {
        self.write_packed(DataType::Int32, &value.to_be_bytes())
    }

    pub fn write_int64(&mut self, value: i64) -> Result<(), CodecError> {
        self.write_packed(DataType::Int64, &value.to_be_bytes())
    }

    pub fn write_float32(&mut self, value: f32) -> Result<(), CodecError> {
        self.write_packed(DataType::Float32, &value.to_be_bytes())
    }

    pub fn write_float64(&mut self, value: f64) -> Result<(), CodecError> {
        self.write_packed(DataType::Float64, &value.to_be_bytes())
    }

    /// 布尔值固定占一个字节，不做截断
    pub fn write_boolean(&mut self, value: bool) -> Result<(), CodecError> {
        self.append(DataType::Boolean, &[u8::from(value)])
    }

    pub fn write_value(&mut self, value: &FieldValue) -> Result<(), CodecError> {
        match value {
            FieldValue::Bytes(bytes) => self.write(bytes),
            FieldValue::Utf(text) => self.write_utf(text),
            FieldValue::Int16(v) => self.write_int16(*v),
            FieldValue::Int32(v) => self.write_int32(*v),
            FieldValue::Int64(v) => self.write_int64(*v),
            FieldValue::Float32(v) => self.write_float32(*v),
            FieldValue::Float64(v) => self.write_float64(*v),
            FieldValue::Boolean(v) => self.write_boolean(*v),
            FieldValue::Json(v) => self.write_json(v),
        }
    }

    fn write_packed(&mut self, data_type: DataType, bytes: &[u8]) -> Result<(), CodecError> {
        if !self.config.preserve_zero_values {
            // 旧版格式：全零或空值既不写载荷也不记条目
            return match pack(bytes) {
                Some(packed) => self.append(data_type, packed),
                None => Ok(()),
            };
        }

        if data_type.is_numeric() {
            self.append(data_type, pack(bytes).unwrap_or(ZERO))
        } else {
            self.append(data_type, bytes)
        }
    }

    fn append(&mut self, data_type: DataType, bytes: &[u8]) -> Result<(), CodecError> {
        let origin = u32::try_from(self.payload.len())
            .map_err(|_| CodecError::Framing("载荷超过4GB限制".to_string()))?;
        let destination = u32::try_from(self.payload.len() + bytes.len())
            .map_err(|_| CodecError::Framing("载荷超过4GB限制".to_string()))?;

        self.payload.extend_from_slice(bytes);
        self.table.add_entry(data_type, origin, destination);
        Ok(())
    }

    /// 生成消息：`u32 内层长度 + 压缩(u32 目录表长度 + 目录表 + 载荷)`
    ///
    /// 构建后构建器仍可继续写入并再次构建。
    pub fn build(&self, id: i64) -> Result<Message, CodecError> {
        let table_bytes = self.table.wrap()?;
        let table_len = u32::try_from(table_bytes.len())
            .map_err(|_| CodecError::Framing("目录表超过4GB限制".to_string()))?;

        let mut inner =
            Vec::with_capacity(LENGTH_PREFIX_SIZE + table_bytes.len() + self.payload.len());
        inner.write_u32::<BigEndian>(table_len)?;
        inner.extend_from_slice(&table_bytes);
        inner.extend_from_slice(&self.payload);

        let inner_len = u32::try_from(inner.len())
            .ok()
            .filter(|len| *len <= self.config.max_message_size)
            .ok_or_else(|| {
                CodecError::Framing(format!(
                    "消息长度 {} 超过上限 {}",
                    inner.len(),
                    self.config.max_message_size
                ))
            })?;

        let compressed = compress_data(&inner, self.config.compression, self.config.level)?;

        let mut wire = Vec::with_capacity(LENGTH_PREFIX_SIZE + compressed.len());
        wire.write_u32::<BigEndian>(inner_len)?;
        wire.extend_from_slice(&compressed);

        Ok(Message {
            id,
            wire,
            payload: Arc::from(self.payload.as_slice()),
            table: self.table.fork(),
        })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    /// 当前未压缩载荷
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 清空已写入的字段，保留配置
    pub fn clear(&mut self) {
        self.payload.clear();
        self.table = DataTable::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableEntry;

    #[test]
    fn payload_layout_for_mixed_fields() {
        let mut builder = MessageBuilder::new();
        builder.write_int32(300).unwrap();
        builder.write_utf("hi").unwrap();
        builder.write_boolean(true).unwrap();

        assert_eq!(builder.payload(), &[0x01, 0x2C, b'h', b'i', 0x01]);

        let mut table = builder.table().fork();
        assert_eq!(table.next(DataType::Int32), Some(TableEntry::new(0, 2)));
        assert_eq!(table.next(DataType::Utf), Some(TableEntry::new(2, 4)));
        assert_eq!(table.next(DataType::Boolean), Some(TableEntry::new(4, 5)));
    }

    #[test]
    fn small_numbers_take_few_bytes() {
        let mut builder = MessageBuilder::new();
        builder.write_int64(5).unwrap();
        builder.write_int16(-1).unwrap();
        assert_eq!(builder.payload(), &[5, 0xFF, 0xFF]);
    }

    #[test]
    fn zero_is_kept_as_one_byte() {
        let mut builder = MessageBuilder::new();
        builder.write_int64(0).unwrap();
        builder.write_float32(0.0).unwrap();
        builder.write_utf("").unwrap();
        assert_eq!(builder.payload(), &[0, 0]);
        assert_eq!(builder.table().total_entries(), 3);
        assert_eq!(builder.table().len(DataType::Utf), 1);
    }

    #[test]
    fn legacy_mode_drops_zero_values() {
        let mut builder = MessageBuilder::with_config(CodecConfig::default().legacy());
        builder.write_int64(0).unwrap();
        builder.write(&[0, 0, 7]).unwrap();
        builder.write_boolean(false).unwrap();
        assert_eq!(builder.payload(), &[7, 0]);
        assert_eq!(builder.table().len(DataType::Int64), 0);
        assert_eq!(builder.table().len(DataType::Byte), 1);
        assert_eq!(builder.table().len(DataType::Boolean), 1);
    }

    #[test]
    fn wire_starts_with_inner_length() {
        let config = CodecConfig::new(crate::CompressionType::None);
        let mut builder = MessageBuilder::with_config(config);
        builder.write_int32(300).unwrap();
        let message = builder.build(1).unwrap();

        // 目录表：tag(1) + count(4) + entry(8)
        let inner_len = 4 + 13 + 2;
        let wire = message.wire_bytes();
        assert_eq!(&wire[..4], &(inner_len as u32).to_be_bytes());
        assert_eq!(&wire[4..8], &13u32.to_be_bytes());
        assert_eq!(&wire[wire.len() - 2..], &[0x01, 0x2C]);
        assert_eq!(message.payload(), &[0x01, 0x2C]);
    }

    #[test]
    fn oversized_message_is_refused() {
        let config = CodecConfig::default().with_max_message_size(8);
        let mut builder = MessageBuilder::with_config(config);
        builder.write(&[1u8; 32]).unwrap();
        assert!(matches!(builder.build(1), Err(CodecError::Framing(_))));
    }

    #[test]
    fn clear_keeps_config() {
        let mut builder = MessageBuilder::with_config(CodecConfig::default().legacy());
        builder.write_int32(9).unwrap();
        builder.clear();
        assert!(builder.is_empty());
        assert_eq!(builder.payload_len(), 0);
        assert!(!builder.config().preserve_zero_values);
    }
}
