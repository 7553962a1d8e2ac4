use crate::{
    error::CodecError,
    types::{DataType, TableEntry},
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

/// 单个桶头部：类型标签(1) + 条目数(4)
const BUCKET_HEADER_SIZE: usize = 1 + 4;
/// 单个条目：起点(4) + 终点(4)
const ENTRY_SIZE: usize = 4 + 4;

/// 消息目录表
///
/// 按类型分桶保存每个字段在载荷中的区间。读取端只能通过 [`DataTable::next`]
/// 逐个取出同类型的下一个条目，没有按下标或字段名的随机访问。
///
/// `clone` 与 [`DataTable::fork`] 相同：复制全部条目，但游标归零。
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DataTable {
    buckets: [Vec<TableEntry>; DataType::COUNT],
    cursors: [usize; DataType::COUNT],
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个条目到对应类型的桶末尾
    pub fn add_entry(&mut self, data_type: DataType, origin: u32, destination: u32) {
        self.buckets[data_type.index()].push(TableEntry::new(origin, destination));
    }

    /// 取出该类型的下一个条目并前移游标，读完后始终返回 `None`
    pub fn next(&mut self, data_type: DataType) -> Option<TableEntry> {
        let index = data_type.index();
        let entry = self.buckets[index].get(self.cursors[index]).copied()?;
        self.cursors[index] += 1;
        Some(entry)
    }

    /// 该类型写入的条目总数
    pub fn len(&self, data_type: DataType) -> usize {
        self.buckets[data_type.index()].len()
    }

    /// 该类型尚未读取的条目数
    pub fn remaining(&self, data_type: DataType) -> usize {
        let index = data_type.index();
        self.buckets[index].len() - self.cursors[index]
    }

    pub fn total_entries(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// 所有条目中最大的终点偏移
    pub fn max_destination(&self) -> u32 {
        self.buckets
            .iter()
            .flatten()
            .map(TableEntry::destination)
            .max()
            .unwrap_or(0)
    }

    /// 复制全部条目，游标归零，得到一个独立的遍历
    pub fn fork(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            cursors: [0; DataType::COUNT],
        }
    }

    /// 序列化目录表
    ///
    /// 按类型声明顺序写出每个非空桶：`u8 标签, u32 条目数, 条目数 × (u32 起点, u32 终点)`。
    pub fn wrap(&self) -> Result<Vec<u8>, CodecError> {
        let size = self
            .buckets
            .iter()
            .filter(|bucket| !bucket.is_empty())
            .map(|bucket| BUCKET_HEADER_SIZE + bucket.len() * ENTRY_SIZE)
            .sum();
        let mut buffer = Vec::with_capacity(size);

        for data_type in DataType::ALL {
            let bucket = &self.buckets[data_type.index()];
            if bucket.is_empty() {
                continue;
            }

            let count = u32::try_from(bucket.len())
                .map_err(|_| CodecError::Table("条目数超过上限".to_string()))?;
            buffer.write_u8(data_type as u8)?;
            buffer.write_u32::<BigEndian>(count)?;

            for entry in bucket {
                buffer.write_u32::<BigEndian>(entry.origin())?;
                buffer.write_u32::<BigEndian>(entry.destination())?;
            }
        }

        Ok(buffer)
    }

    /// 反序列化目录表
    pub fn unwrap(data: &[u8]) -> Result<Self, CodecError> {
        let mut table = DataTable::new();
        let mut seen = [false; DataType::COUNT];
        let mut cursor = Cursor::new(data);

        while (cursor.position() as usize) < data.len() {
            let tag = cursor.read_u8()?;
            let data_type = DataType::try_from(tag)?;
            if seen[data_type.index()] {
                return Err(CodecError::Table(format!(
                    "重复的类型桶: {}",
                    data_type.name()
                )));
            }
            seen[data_type.index()] = true;

            let count = read_table_u32(&mut cursor)? as usize;
            let left = data.len() - cursor.position() as usize;
            if count.checked_mul(ENTRY_SIZE).map_or(true, |need| need > left) {
                return Err(CodecError::Table(format!(
                    "{} 桶声明 {} 个条目，剩余字节只有 {}",
                    data_type.name(),
                    count,
                    left
                )));
            }

            let bucket = &mut table.buckets[data_type.index()];
            bucket.reserve(count);
            for _ in 0..count {
                let origin = read_table_u32(&mut cursor)?;
                let destination = read_table_u32(&mut cursor)?;
                if origin > destination {
                    return Err(CodecError::Table(format!(
                        "条目起点 {} 大于终点 {}",
                        origin, destination
                    )));
                }
                bucket.push(TableEntry::new(origin, destination));
            }
        }

        Ok(table)
    }
}

impl Clone for DataTable {
    fn clone(&self) -> Self {
        self.fork()
    }
}

fn read_table_u32<R: Read>(reader: &mut R) -> Result<u32, CodecError> {
    reader
        .read_u32::<BigEndian>()
        .map_err(|_| CodecError::Table("目录表被截断".to_string()))
}
