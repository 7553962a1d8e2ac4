use crate::{
    compression::decompress_data,
    config::CodecConfig,
    error::CodecError,
    packing::unpack_fixed,
    table::DataTable,
    types::{DataType, FieldValue, Message},
    LENGTH_PREFIX_SIZE,
};
use byteorder::{BigEndian, ByteOrder};
use rayon::prelude::*;
use std::sync::Arc;

/// 消息读取器
///
/// 两种来源共用同一套读取逻辑：[`MessageReader::decode`] 从线上字节解压得到载荷，
/// [`MessageReader::from_message`] 直接复用构建时保留的载荷。
/// 每次读取会推进目录表中对应类型的游标，需要独立遍历时使用 [`MessageReader::fork`]。
#[derive(Debug)]
pub struct MessageReader {
    id: i64,
    payload: Arc<[u8]>,
    table: DataTable,
}

impl MessageReader {
    /// 解码线上字节，帧、解压和目录表错误都在这里报告
    pub fn decode(id: i64, wire: &[u8], config: &CodecConfig) -> Result<Self, CodecError> {
        if wire.len() < LENGTH_PREFIX_SIZE {
            return Err(CodecError::Framing(format!(
                "消息过短，只有 {} 字节",
                wire.len()
            )));
        }

        let declared = BigEndian::read_u32(&wire[..LENGTH_PREFIX_SIZE]);
        if declared > config.max_message_size {
            return Err(CodecError::Framing(format!(
                "声明长度 {} 超过上限 {}",
                declared, config.max_message_size
            )));
        }
        if (declared as usize) < LENGTH_PREFIX_SIZE {
            return Err(CodecError::Framing(format!(
                "声明长度 {} 小于目录表长度前缀",
                declared
            )));
        }

        let inner = decompress_data(
            &wire[LENGTH_PREFIX_SIZE..],
            declared as usize,
            config.compression,
        )?;

        let table_len = BigEndian::read_u32(&inner[..LENGTH_PREFIX_SIZE]) as usize;
        let table_end = LENGTH_PREFIX_SIZE
            .checked_add(table_len)
            .filter(|end| *end <= inner.len())
            .ok_or_else(|| {
                CodecError::Framing(format!(
                    "目录表长度 {} 超出消息范围 {}",
                    table_len,
                    inner.len()
                ))
            })?;

        let table = DataTable::unwrap(&inner[LENGTH_PREFIX_SIZE..table_end])?;
        let payload: Arc<[u8]> = Arc::from(&inner[table_end..]);

        let max_destination = table.max_destination() as usize;
        if max_destination > payload.len() {
            return Err(CodecError::Framing(format!(
                "目录表条目终点 {} 超出载荷长度 {}",
                max_destination,
                payload.len()
            )));
        }

        Ok(Self { id, payload, table })
    }

    /// 复用构建时保留的载荷，不再解压
    pub fn from_message(message: &Message) -> Self {
        Self {
            id: message.id,
            payload: Arc::clone(&message.payload),
            table: message.table.fork(),
        }
    }

    /// 独立的读取器：共享载荷，游标从头开始，原读取器的游标不受影响
    pub fn fork(&self) -> Self {
        Self {
            id: self.id,
            payload: Arc::clone(&self.payload),
            table: self.table.fork(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn table(&self) -> &DataTable {
        &self.table
    }

    fn next_slice(&mut self, data_type: DataType) -> Result<Option<&[u8]>, CodecError> {
        let entry = match self.table.next(data_type) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        self.payload
            .get(entry.origin() as usize..entry.destination() as usize)
            .map(Some)
            .ok_or_else(|| {
                CodecError::Framing(format!(
                    "{} 字段区间 {}..{} 超出载荷长度 {}",
                    data_type.name(),
                    entry.origin(),
                    entry.destination(),
                    self.payload.len()
                ))
            })
    }

    pub fn get_bytes(&mut self) -> Result<Option<Vec<u8>>, CodecError> {
        Ok(self.next_slice(DataType::Byte)?.map(<[u8]>::to_vec))
    }

    /// 读取文本，遇到第一个NUL字节即截断
    pub fn get_utf(&mut self) -> Result<Option<String>, CodecError> {
        let slice = match self.next_slice(DataType::Utf)? {
            Some(slice) => slice,
            None => return Ok(None),
        };

        let end = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
        String::from_utf8(slice[..end].to_vec())
            .map(Some)
            .map_err(|e| CodecError::Utf8(e.to_string()))
    }

    pub fn get_int16(&mut self) -> Result<Option<i16>, CodecError> {
        self.next_fixed::<2>(DataType::Int16)
            .map(|bytes| bytes.map(i16::from_be_bytes))
    }

    pub fn get_int32(&mut self) -> Result<Option<i32>, CodecError> {
        self.next_fixed::<4>(DataType::Int32)
            .map(|bytes| bytes.map(i32::from_be_bytes))
    }

    pub fn get_int64(&mut self) -> Result<Option<i64>, CodecError> {
        self.next_fixed::<8>(DataType::Int64)
            .map(|bytes| bytes.map(i64::from_be_bytes))
    }

    pub fn get_float32(&mut self) -> Result<Option<f32>, CodecError> {
        self.next_fixed::<4>(DataType::Float32)
            .map(|bytes| bytes.map(f32::from_be_bytes))
    }

    pub fn get_float64(&mut self) -> Result<Option<f64>, CodecError> {
        self.next_fixed::<8>(DataType::Float64)
            .map(|bytes| bytes.map(f64::from_be_bytes))
    }

    /// 直接读取起点处的单个字节，1 为真
    pub fn get_boolean(&mut self) -> Result<Option<bool>, CodecError> {
        let entry = match self.table.next(DataType::Boolean) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        self.payload
            .get(entry.origin() as usize)
            .map(|&b| Some(b == 1))
            .ok_or_else(|| {
                CodecError::Framing(format!(
                    "布尔字段偏移 {} 超出载荷长度 {}",
                    entry.origin(),
                    self.payload.len()
                ))
            })
    }

    pub fn get_json(&mut self) -> Result<Option<serde_json::Value>, CodecError> {
        match self.next_slice(DataType::Json)? {
            Some(slice) => Ok(Some(serde_json::from_slice(slice)?)),
            None => Ok(None),
        }
    }

    fn next_fixed<const N: usize>(
        &mut self,
        data_type: DataType,
    ) -> Result<Option<[u8; N]>, CodecError> {
        match self.next_slice(data_type)? {
            Some(slice) => unpack_fixed::<N>(slice, data_type).map(Some),
            None => Ok(None),
        }
    }

    /// 读取指定类型的下一个字段
    pub fn next_value(&mut self, data_type: DataType) -> Result<Option<FieldValue>, CodecError> {
        Ok(match data_type {
            DataType::Byte => self.get_bytes()?.map(FieldValue::Bytes),
            DataType::Utf => self.get_utf()?.map(FieldValue::Utf),
            DataType::Int16 => self.get_int16()?.map(FieldValue::Int16),
            DataType::Int32 => self.get_int32()?.map(FieldValue::Int32),
            DataType::Int64 => self.get_int64()?.map(FieldValue::Int64),
            DataType::Float32 => self.get_float32()?.map(FieldValue::Float32),
            DataType::Float64 => self.get_float64()?.map(FieldValue::Float64),
            DataType::Boolean => self.get_boolean()?.map(FieldValue::Boolean),
            DataType::Json => self.get_json()?.map(FieldValue::Json),
        })
    }

    /// 按类型声明顺序读完所有剩余字段
    pub fn drain(&mut self) -> Result<Vec<FieldValue>, CodecError> {
        let mut values = Vec::with_capacity(self.table.total_entries());
        for data_type in DataType::ALL {
            while let Some(value) = self.next_value(data_type)? {
                values.push(value);
            }
        }
        Ok(values)
    }
}

/// 并行解码多条消息，结果顺序与输入一致
pub fn decode_batch(
    messages: &[(i64, Vec<u8>)],
    config: &CodecConfig,
) -> Vec<Result<MessageReader, CodecError>> {
    messages
        .par_iter()
        .map(|(id, wire)| MessageReader::decode(*id, wire, config))
        .collect()
}
