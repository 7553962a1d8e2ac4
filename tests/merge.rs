// 消息合并与复制：modify / insert_before

use mcmsg::{CodecConfig, CodecError, FieldValue, Message, MessageBuilder, MessageReader};

fn message_a() -> Message {
    let mut builder = MessageBuilder::new();
    builder.write_utf("a1").unwrap();
    builder.write_int32(10).unwrap();
    builder.write_utf("a2").unwrap();
    builder.write_boolean(true).unwrap();
    builder.build(7).unwrap()
}

fn message_b() -> Message {
    let mut builder = MessageBuilder::new();
    builder.write_int32(20).unwrap();
    builder.write_utf("b1").unwrap();
    builder.write_float64(2.5).unwrap();
    builder.build(7).unwrap()
}

#[test]
fn insert_before_puts_inserted_fields_first_per_type() {
    let a = message_a();
    let b = message_b();

    let merged = MessageBuilder::insert_before(&a, &[&b], CodecConfig::default())
        .unwrap()
        .build(a.id())
        .unwrap();

    let mut reader =
        MessageReader::decode(7, merged.wire_bytes(), &CodecConfig::default()).unwrap();
    assert_eq!(reader.get_utf().unwrap().as_deref(), Some("b1"));
    assert_eq!(reader.get_utf().unwrap().as_deref(), Some("a1"));
    assert_eq!(reader.get_utf().unwrap().as_deref(), Some("a2"));
    assert_eq!(reader.get_utf().unwrap(), None);
    assert_eq!(reader.get_int32().unwrap(), Some(20));
    assert_eq!(reader.get_int32().unwrap(), Some(10));
    assert_eq!(reader.get_float64().unwrap(), Some(2.5));
    assert_eq!(reader.get_boolean().unwrap(), Some(true));
}

#[test]
fn merged_payload_follows_fixed_kind_order() {
    let a = message_a();
    let merged = MessageBuilder::modify(&a, CodecConfig::default())
        .unwrap()
        .build(a.id())
        .unwrap();

    // 原始写入顺序为 utf, int32, utf, boolean；回放后 utf 全部排在 int32 之前
    assert_eq!(merged.payload(), &[b'a', b'1', b'a', b'2', 10, 1]);
    assert_eq!(
        merged.reader().drain().unwrap(),
        vec![
            FieldValue::Utf("a1".to_string()),
            FieldValue::Utf("a2".to_string()),
            FieldValue::Int32(10),
            FieldValue::Boolean(true),
        ]
    );
}

#[test]
fn modify_allows_appending_more_fields() {
    let a = message_a();
    let mut builder = MessageBuilder::modify(&a, CodecConfig::default()).unwrap();
    builder.write_int32(11).unwrap();
    let modified = builder.build(a.id()).unwrap();

    let mut reader = modified.reader();
    assert_eq!(reader.get_int32().unwrap(), Some(10));
    assert_eq!(reader.get_int32().unwrap(), Some(11));
}

#[test]
fn replay_leaves_the_source_readable() {
    let a = message_a();
    let mut reader = a.reader();
    assert_eq!(reader.get_utf().unwrap().as_deref(), Some("a1"));

    MessageBuilder::modify(&a, CodecConfig::default()).unwrap();

    assert_eq!(reader.get_utf().unwrap().as_deref(), Some("a2"));
    assert_eq!(a.reader().get_utf().unwrap().as_deref(), Some("a1"));
}

#[test]
fn insert_before_rejects_other_ids() {
    let a = message_a();
    let mut builder = MessageBuilder::new();
    builder.write_int32(1).unwrap();
    let other = builder.build(8).unwrap();

    let result = MessageBuilder::insert_before(&a, &[&other], CodecConfig::default());
    assert!(matches!(
        result,
        Err(CodecError::IdMismatch {
            expected: 7,
            actual: 8
        })
    ));
}

#[test]
fn multiple_inserted_messages_keep_slice_order() {
    let a = message_a();
    let b = message_b();
    let mut builder = MessageBuilder::new();
    builder.write_int32(30).unwrap();
    let c = builder.build(7).unwrap();

    let merged = MessageBuilder::insert_before(&a, &[&b, &c], CodecConfig::default())
        .unwrap()
        .build(7)
        .unwrap();

    let mut reader = merged.reader();
    let ints: Vec<i32> = std::iter::from_fn(|| reader.get_int32().unwrap()).collect();
    assert_eq!(ints, vec![20, 30, 10]);
}
