// 定宽大端数值的前导零截断
//
// 写入时去掉最高位一侧的全部 0x00 字节，读取时在左侧补零还原到目标宽度。
// 例如 i32 的 300 (00 00 01 2C) 在线上只占两个字节 01 2C。

use crate::{error::CodecError, types::DataType};

/// 截断前导零字节
///
/// 输入为空或全部为零时返回 `None`。
pub fn pack(bytes: &[u8]) -> Option<&[u8]> {
    let first = bytes.iter().position(|&b| b != 0)?;
    Some(&bytes[first..])
}

/// 左侧补零还原到 `width` 字节
pub fn unpack(bytes: &[u8], width: usize) -> Option<Vec<u8>> {
    if bytes.len() > width {
        return None;
    }
    let mut restored = vec![0u8; width];
    restored[width - bytes.len()..].copy_from_slice(bytes);
    Some(restored)
}

/// 按类型的定宽还原，宽度超出时报错
pub(crate) fn unpack_fixed<const N: usize>(
    bytes: &[u8],
    data_type: DataType,
) -> Result<[u8; N], CodecError> {
    let width_error = || CodecError::ValueWidth {
        data_type,
        width: bytes.len(),
        expected: N,
    };
    let restored = unpack(bytes, N).ok_or_else(width_error)?;
    <[u8; N]>::try_from(restored).map_err(|_| width_error())
}
