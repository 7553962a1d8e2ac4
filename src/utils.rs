use sha2::{Digest, Sha256};
use std::fmt::Write;

/// 计算SHA-256哈希
pub fn calculate_sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 小写十六进制
pub fn to_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// 线上字节的指纹，用于比对两端收到的是否为同一条消息
pub fn fingerprint(wire: &[u8]) -> String {
    to_hex(&calculate_sha256(wire))
}
