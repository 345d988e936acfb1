//! 支持网络目录
//!
//! 静态映射：网络 ID -> 网络属性。纯查询，无状态，无副作用，
//! 唯一的失败模式是"未找到"。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 网络描述符。进程启动时装载，之后不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// 链 ID（EIP-155），目录内唯一
    pub id: u64,
    /// 网络名称
    pub name: String,
    /// RPC 端点
    pub rpc_endpoint: String,
    /// 是否为测试网
    pub is_testnet: bool,
}

/// 网络目录
pub struct NetworkCatalog {
    descriptors: HashMap<u64, NetworkDescriptor>,
    name_map: HashMap<String, u64>,
}

impl NetworkCatalog {
    /// 创建预配置的目录
    pub fn new() -> Self {
        let mut catalog = Self {
            descriptors: HashMap::new(),
            name_map: HashMap::new(),
        };

        catalog.register_default_networks();
        catalog
    }

    /// 创建空目录（调用方自行注册网络）
    pub fn empty() -> Self {
        Self {
            descriptors: HashMap::new(),
            name_map: HashMap::new(),
        }
    }

    /// 注册默认支持的网络
    fn register_default_networks(&mut self) {
        // Ethereum Mainnet
        self.register(NetworkDescriptor {
            id: 1,
            name: "Ethereum".to_string(),
            rpc_endpoint: "https://eth.llamarpc.com".to_string(),
            is_testnet: false,
        });

        // Optimism
        self.register(NetworkDescriptor {
            id: 10,
            name: "Optimism".to_string(),
            rpc_endpoint: "https://mainnet.optimism.io".to_string(),
            is_testnet: false,
        });

        // Arbitrum One
        self.register(NetworkDescriptor {
            id: 42161,
            name: "Arbitrum One".to_string(),
            rpc_endpoint: "https://arb1.arbitrum.io/rpc".to_string(),
            is_testnet: false,
        });

        // Base
        self.register(NetworkDescriptor {
            id: 8453,
            name: "Base".to_string(),
            rpc_endpoint: "https://mainnet.base.org".to_string(),
            is_testnet: false,
        });

        // Ethereum Sepolia
        self.register(NetworkDescriptor {
            id: 11155111,
            name: "Ethereum Sepolia".to_string(),
            rpc_endpoint: "https://rpc.sepolia.org".to_string(),
            is_testnet: true,
        });

        // Optimism Sepolia
        self.register(NetworkDescriptor {
            id: 11155420,
            name: "Optimism Sepolia".to_string(),
            rpc_endpoint: "https://sepolia.optimism.io".to_string(),
            is_testnet: true,
        });
    }

    /// 注册网络描述符。同 ID 重复注册以后者为准
    pub fn register(&mut self, descriptor: NetworkDescriptor) {
        let id = descriptor.id;
        let name = descriptor.name.to_lowercase();

        self.name_map.insert(name, id);
        self.descriptors.insert(id, descriptor);
    }

    /// 通过链 ID 查找描述符
    pub fn describe(&self, id: u64) -> Option<&NetworkDescriptor> {
        self.descriptors.get(&id)
    }

    /// 是否为支持的网络
    pub fn is_supported(&self, id: u64) -> bool {
        self.descriptors.contains_key(&id)
    }

    /// 通过名称查找描述符（大小写不敏感）
    pub fn get_by_name(&self, name: &str) -> Option<&NetworkDescriptor> {
        let id = self.name_map.get(&name.to_lowercase())?;
        self.descriptors.get(id)
    }

    /// 列出所有支持的网络
    pub fn list_all(&self) -> Vec<&NetworkDescriptor> {
        self.descriptors.values().collect()
    }

    /// 校验目录完整性
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (id, descriptor) in &self.descriptors {
            if descriptor.name.is_empty() {
                errors.push(format!("network {} has empty name", id));
            }
            if descriptor.rpc_endpoint.is_empty() {
                errors.push(format!("network {} has empty rpc_endpoint", descriptor.name));
            } else if !descriptor.rpc_endpoint.starts_with("http://")
                && !descriptor.rpc_endpoint.starts_with("https://")
                && !descriptor.rpc_endpoint.starts_with("ws://")
                && !descriptor.rpc_endpoint.starts_with("wss://")
            {
                errors.push(format!(
                    "network {} has invalid rpc_endpoint scheme: {}",
                    descriptor.name, descriptor.rpc_endpoint
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for NetworkCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        let catalog = NetworkCatalog::new();

        let optimism = catalog.describe(10).unwrap();
        assert_eq!(optimism.name, "Optimism");
        assert!(!optimism.is_testnet);

        assert!(catalog.is_supported(1));
        assert!(catalog.is_supported(42161));
        assert!(!catalog.is_supported(999_999));
        assert!(catalog.describe(999_999).is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = NetworkCatalog::new();

        let base = catalog.get_by_name("base").unwrap();
        assert_eq!(base.id, 8453);

        let sepolia = catalog.get_by_name("Ethereum Sepolia").unwrap();
        assert!(sepolia.is_testnet);

        assert!(catalog.get_by_name("no-such-network").is_none());
    }

    #[test]
    fn test_register_override() {
        let mut catalog = NetworkCatalog::empty();
        assert!(!catalog.is_supported(10));

        catalog.register(NetworkDescriptor {
            id: 10,
            name: "Optimism".to_string(),
            rpc_endpoint: "https://custom.optimism.example".to_string(),
            is_testnet: false,
        });

        assert_eq!(
            catalog.describe(10).unwrap().rpc_endpoint,
            "https://custom.optimism.example"
        );
    }

    #[test]
    fn test_validate_defaults() {
        let catalog = NetworkCatalog::new();
        assert!(catalog.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut catalog = NetworkCatalog::empty();
        catalog.register(NetworkDescriptor {
            id: 7,
            name: "Broken".to_string(),
            rpc_endpoint: "not-a-url".to_string(),
            is_testnet: true,
        });

        let errors = catalog.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("invalid rpc_endpoint scheme"));
    }
}
