// 流式传输帧：`i64 消息ID + u32 线上长度 + 线上字节`，均为大端
//
// 编解码本身不关心传输方式，这里只提供在任意 Read/Write 上收发消息的最小封装。

use crate::{
    config::CodecConfig, error::CodecError, reader::MessageReader, types::Message,
    LENGTH_PREFIX_SIZE,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Write};

/// 帧头大小：ID(8) + 长度(4)
pub const FRAME_HEADER_SIZE: usize = 8 + 4;

/// 根据配置计算单帧线上字节的上限，为压缩膨胀留出余量
pub fn frame_limit(config: &CodecConfig) -> usize {
    let max = config.max_message_size as usize;
    LENGTH_PREFIX_SIZE + max + max / 64 + 1024
}

/// 写入一条消息
pub fn write_frame<W: Write>(writer: &mut W, message: &Message) -> Result<(), CodecError> {
    write_raw_frame(writer, message.id(), message.wire_bytes())
}

/// 写入已编码的线上字节
pub fn write_raw_frame<W: Write>(writer: &mut W, id: i64, wire: &[u8]) -> Result<(), CodecError> {
    let len = u32::try_from(wire.len())
        .map_err(|_| CodecError::Framing("帧超过4GB限制".to_string()))?;
    writer.write_i64::<BigEndian>(id)?;
    writer.write_u32::<BigEndian>(len)?;
    writer.write_all(wire)?;
    Ok(())
}

/// 读取一帧，流在帧边界处结束时返回 `None`
pub fn read_frame<R: Read>(
    reader: &mut R,
    max_len: usize,
) -> Result<Option<(i64, Vec<u8>)>, CodecError> {
    let mut id_bytes = [0u8; 8];
    let mut filled = 0;
    while filled < id_bytes.len() {
        match reader.read(&mut id_bytes[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(CodecError::Framing(format!(
                    "帧头被截断，只读到 {} 字节",
                    filled
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let id = i64::from_be_bytes(id_bytes);

    let len = reader
        .read_u32::<BigEndian>()
        .map_err(|_| CodecError::Framing("帧长度被截断".to_string()))? as usize;
    if len > max_len {
        return Err(CodecError::Framing(format!(
            "帧长度 {} 超过上限 {}",
            len, max_len
        )));
    }

    let mut wire = vec![0u8; len];
    reader.read_exact(&mut wire).map_err(|_| {
        CodecError::Framing(format!("帧数据被截断，期望 {} 字节", len))
    })?;

    Ok(Some((id, wire)))
}

/// 读取流中全部帧
pub fn read_frames<R: Read>(
    reader: &mut R,
    max_len: usize,
) -> Result<Vec<(i64, Vec<u8>)>, CodecError> {
    let mut frames = Vec::new();
    while let Some(frame) = read_frame(reader, max_len)? {
        frames.push(frame);
    }
    Ok(frames)
}

/// 读取一帧并解码为消息读取器
pub fn read_message<R: Read>(
    reader: &mut R,
    config: &CodecConfig,
) -> Result<Option<MessageReader>, CodecError> {
    match read_frame(reader, frame_limit(config))? {
        Some((id, wire)) => MessageReader::decode(id, &wire, config).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MessageBuilder;
    use std::io::Cursor;

    fn message(id: i64, text: &str) -> Message {
        let mut builder = MessageBuilder::new();
        builder.write_utf(text).unwrap();
        builder.build(id).unwrap()
    }

    #[test]
    fn frame_header_layout() {
        let mut sink = Vec::new();
        write_raw_frame(&mut sink, 7, &[0xAA, 0xBB]).unwrap();
        assert_eq!(sink, vec![0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0, 2, 0xAA, 0xBB]);
    }

    #[test]
    fn frames_come_back_in_order() {
        let mut sink = Vec::new();
        write_frame(&mut sink, &message(1, "first")).unwrap();
        write_frame(&mut sink, &message(2, "second")).unwrap();

        let config = CodecConfig::default();
        let mut source = Cursor::new(sink);
        let mut first = read_message(&mut source, &config).unwrap().unwrap();
        let mut second = read_message(&mut source, &config).unwrap().unwrap();
        assert!(read_message(&mut source, &config).unwrap().is_none());

        assert_eq!(first.id(), 1);
        assert_eq!(first.get_utf().unwrap(), Some("first".to_string()));
        assert_eq!(second.id(), 2);
        assert_eq!(second.get_utf().unwrap(), Some("second".to_string()));
    }

    #[test]
    fn truncated_stream_is_a_framing_error() {
        let mut sink = Vec::new();
        write_frame(&mut sink, &message(1, "payload")).unwrap();

        for cut in [3, FRAME_HEADER_SIZE - 1, sink.len() - 1] {
            let mut source = Cursor::new(&sink[..cut]);
            assert!(
                matches!(read_frame(&mut source, 1024), Err(CodecError::Framing(_))),
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut sink = Vec::new();
        write_raw_frame(&mut sink, 1, &[0u8; 64]).unwrap();
        let mut source = Cursor::new(sink);
        assert!(matches!(
            read_frame(&mut source, 16),
            Err(CodecError::Framing(_))
        ));
    }

    #[test]
    fn empty_stream_has_no_frames() {
        let mut source = Cursor::new(Vec::<u8>::new());
        assert!(read_frames(&mut source, 1024).unwrap().is_empty());
    }
}
