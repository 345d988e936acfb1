//! 链 ID 解析与格式化
//!
//! 钱包 provider 的 eth_chainId 返回 EIP-695 十六进制字符串（"0xa"），
//! 索引器实体里则多为十进制数字或字符串。统一在这里处理两种形式。

use anyhow::{bail, Result};

/// 解析链 ID：接受 "0x..." 十六进制或十进制字符串
pub fn parse_chain_id(raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("empty chain id");
    }

    if let Some(hex_part) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex_part.is_empty() {
            bail!("empty hex chain id: {}", raw);
        }
        u64::from_str_radix(hex_part, 16)
            .map_err(|e| anyhow::anyhow!("invalid hex chain id {}: {}", raw, e))
    } else {
        trimmed
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("invalid decimal chain id {}: {}", raw, e))
    }
}

/// 格式化为 EIP-695 十六进制形式（钱包 provider 使用的形式）
pub fn format_chain_id_hex(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}
