use crate::{error::CodecError, reader::MessageReader, table::DataTable};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 字段类型标签，声明顺序即目录表序列化顺序和合并时的回放顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum DataType {
    Byte = 0,
    Utf = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Float32 = 5,
    Float64 = 6,
    Boolean = 7,
    Json = 8,
}

impl DataType {
    /// 全部类型，按声明顺序
    pub const ALL: [DataType; 9] = [
        DataType::Byte,
        DataType::Utf,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::Float32,
        DataType::Float64,
        DataType::Boolean,
        DataType::Json,
    ];

    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    /// 定宽数值类型的大端字节宽度
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            DataType::Int16 => Some(2),
            DataType::Int32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::Float64 => Some(8),
            DataType::Boolean => Some(1),
            DataType::Byte | DataType::Utf | DataType::Json => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            DataType::Byte => "bytes",
            DataType::Utf => "utf",
            DataType::Int16 => "int16",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Boolean => "boolean",
            DataType::Json => "json",
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DataType::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| CodecError::Table(format!("无效的类型标签: {}", value)))
    }
}

/// 目录表条目，描述载荷中 `[origin, destination)` 区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableEntry {
    origin: u32,
    destination: u32,
}

impl TableEntry {
    /// 只由目录表在校验 `origin <= destination` 之后构造
    pub(crate) fn new(origin: u32, destination: u32) -> Self {
        debug_assert!(origin <= destination);
        Self {
            origin,
            destination,
        }
    }

    pub fn origin(&self) -> u32 {
        self.origin
    }

    pub fn destination(&self) -> u32 {
        self.destination
    }

    pub fn len(&self) -> usize {
        self.destination.saturating_sub(self.origin) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 单个字段值，也是命令行工具JSON文档中的字段格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Bytes(Vec<u8>),
    Utf(String),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Boolean(bool),
    Json(serde_json::Value),
}

impl FieldValue {
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValue::Bytes(_) => DataType::Byte,
            FieldValue::Utf(_) => DataType::Utf,
            FieldValue::Int16(_) => DataType::Int16,
            FieldValue::Int32(_) => DataType::Int32,
            FieldValue::Int64(_) => DataType::Int64,
            FieldValue::Float32(_) => DataType::Float32,
            FieldValue::Float64(_) => DataType::Float64,
            FieldValue::Boolean(_) => DataType::Boolean,
            FieldValue::Json(_) => DataType::Json,
        }
    }
}

/// `MessageBuilder::build` 的产物
///
/// 同时保留线上字节和未压缩的载荷与目录表，进程内读取时无需再次解压。
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) id: i64,
    pub(crate) wire: Vec<u8>,
    pub(crate) payload: Arc<[u8]>,
    pub(crate) table: DataTable,
}

impl Message {
    /// 关联ID，仅用于应用层对应关系，不参与编码自描述
    pub fn id(&self) -> i64 {
        self.id
    }

    /// 完整线上字节：`u32 内层长度 + 压缩数据`
    pub fn wire_bytes(&self) -> &[u8] {
        &self.wire
    }

    pub fn into_wire(self) -> Vec<u8> {
        self.wire
    }

    /// 未压缩的字段载荷
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    /// 基于保留的载荷创建读取器，游标从头开始
    pub fn reader(&self) -> MessageReader {
        MessageReader::from_message(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_tags_follow_declaration_order() {
        for (i, data_type) in DataType::ALL.iter().enumerate() {
            assert_eq!(data_type.index(), i);
            assert_eq!(DataType::try_from(i as u8).unwrap(), *data_type);
        }
        assert!(DataType::try_from(9).is_err());
    }

    #[test]
    fn field_value_json_shape() {
        let value = FieldValue::Int32(300);
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"type":"int32","value":300}"#);

        let parsed: FieldValue = serde_json::from_str(r#"{"type":"utf","value":"hi"}"#).unwrap();
        assert_eq!(parsed, FieldValue::Utf("hi".to_string()));
        assert_eq!(parsed.data_type(), DataType::Utf);
    }

    #[test]
    fn entry_width() {
        let entry = TableEntry::new(3, 7);
        assert_eq!(entry.len(), 4);
        assert!(!entry.is_empty());
        assert!(TableEntry::new(5, 5).is_empty());
    }

    #[test]
    fn inverted_entry_has_zero_width() {
        let entry = TableEntry {
            origin: 5,
            destination: 3,
        };
        assert_eq!(entry.len(), 0);
        assert!(entry.is_empty());
    }
}
