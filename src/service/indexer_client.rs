//! 索引器 HTTP 客户端
//!
//! 封装两个外部端点：
//! - POST /attestation-listener/{tx_hash}/{chain_id}：fire-and-forget
//!   通知，催促索引器更快摄入刚落地的写入；
//! - GET 实体读端点：确认轮询检查受影响实体的已知字段。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::config::IndexerConfig;
use crate::domain::TransactionReference;
use crate::service::confirmation_poller::{ConfirmationCheck, IndexerNotifier};
use crate::utils::parse_chain_id;

/// 索引器客户端
pub struct IndexerClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl IndexerClient {
    pub fn new(config: &IndexerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client: client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 通知索引器一笔写入已落地
    ///
    /// 只关心"没有抛错"，不依赖响应内容。传输层失败返回 Err，
    /// 由调用方决定口径（轮询器只记日志后继续）。
    pub async fn notify_write_landed(&self, reference: &TransactionReference) -> Result<()> {
        let url = format!(
            "{}/attestation-listener/{}/{}",
            self.base_url,
            reference.tx_hash(),
            reference.chain_id()
        );

        let response = self
            .http_client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("attestation listener unreachable: {}", url))?;

        if response.status().is_success() {
            tracing::debug!(reference = %reference, "attestation listener notified");
        } else {
            tracing::debug!(
                reference = %reference,
                status = response.status().as_u16(),
                "attestation listener returned non-success status"
            );
        }

        Ok(())
    }

    /// 读取实体 JSON
    pub async fn fetch_entity(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("indexer request failed: {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("indexer returned status {} for {}", response.status(), url);
        }

        response
            .json::<Value>()
            .await
            .context("failed to parse indexer response as json")
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl IndexerNotifier for IndexerClient {
    async fn notify_write_landed(&self, reference: &TransactionReference) -> Result<()> {
        IndexerClient::notify_write_landed(self, reference).await
    }
}

/// 基于实体字段的确认检查
///
/// GET 配置的实体路径，比较 JSON pointer 指向的字段与期望值。
/// 实体若带链 ID 字段（十进制或 0x 十六进制），先校验与提交链一致——
/// 索引器可能同时索引多条链。
pub struct EntityFieldCheck {
    client: Arc<IndexerClient>,
    entity_path: String,
    field_pointer: String,
    expected: Value,
}

impl EntityFieldCheck {
    /// # Arguments
    /// * `entity_path` - 实体读端点路径，例如 "milestones/0x123"
    /// * `field_pointer` - JSON pointer，例如 "/completed" 或 "/data/status"
    /// * `expected` - 期望的写入后字段值
    pub fn new(
        client: Arc<IndexerClient>,
        entity_path: impl Into<String>,
        field_pointer: impl Into<String>,
        expected: Value,
    ) -> Self {
        Self {
            client,
            entity_path: entity_path.into(),
            field_pointer: field_pointer.into(),
            expected,
        }
    }

    fn entity_chain_id(entity: &Value) -> Option<u64> {
        let field = entity.pointer("/chainID").or_else(|| entity.pointer("/chainId"))?;
        match field {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => parse_chain_id(s).ok(),
            _ => None,
        }
    }

    /// 实体 JSON 是否反映该写入：链 ID 一致（若有）且目标字段已是期望值
    fn reflects(&self, entity: &Value, reference: &TransactionReference) -> bool {
        if let Some(chain_id) = Self::entity_chain_id(entity) {
            if chain_id != reference.chain_id() {
                tracing::debug!(
                    entity_chain = chain_id,
                    reference_chain = reference.chain_id(),
                    "entity belongs to a different chain"
                );
                return false;
            }
        }

        entity.pointer(&self.field_pointer) == Some(&self.expected)
    }
}

#[async_trait]
impl ConfirmationCheck for EntityFieldCheck {
    async fn is_reflected(&self, reference: &TransactionReference) -> Result<bool> {
        let entity = self.client.fetch_entity(&self.entity_path).await?;
        Ok(self.reflects(&entity, reference))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> Arc<IndexerClient> {
        Arc::new(IndexerClient::new(&IndexerConfig {
            base_url: "http://localhost:4000/".to_string(),
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
        }))
    }

    #[test]
    fn test_base_url_normalized() {
        assert_eq!(client().base_url(), "http://localhost:4000");
    }

    #[test]
    fn test_reflects_requires_matching_chain() {
        let check = EntityFieldCheck::new(client(), "milestones/0x123", "/completed", json!(true));
        let reference = TransactionReference::new("0xabcdef0123456789", 10).unwrap();

        // 字段已是期望值，但实体属于另一条链
        assert!(!check.reflects(&json!({"chainID": 1, "completed": true}), &reference));
        // 链一致（十六进制形式）且字段命中
        assert!(check.reflects(&json!({"chainID": "0xa", "completed": true}), &reference));
        // 链一致但字段还没翻转
        assert!(!check.reflects(&json!({"chainID": 10, "completed": false}), &reference));
    }

    #[test]
    fn test_reflects_without_chain_field_compares_pointer_only() {
        let check = EntityFieldCheck::new(client(), "grants/7", "/data/status", json!("approved"));
        let reference = TransactionReference::new("0xabcdef0123456789", 10).unwrap();

        assert!(check.reflects(&json!({"data": {"status": "approved"}}), &reference));
        assert!(!check.reflects(&json!({"data": {"status": "pending"}}), &reference));
        assert!(!check.reflects(&json!({"data": {}}), &reference));
    }

    #[test]
    fn test_entity_chain_id_forms() {
        assert_eq!(
            EntityFieldCheck::entity_chain_id(&json!({"chainID": 10})),
            Some(10)
        );
        assert_eq!(
            EntityFieldCheck::entity_chain_id(&json!({"chainID": "0xa"})),
            Some(10)
        );
        assert_eq!(
            EntityFieldCheck::entity_chain_id(&json!({"chainId": "42161"})),
            Some(42161)
        );
        assert_eq!(
            EntityFieldCheck::entity_chain_id(&json!({"completed": true})),
            None
        );
    }
}
