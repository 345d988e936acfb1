//! Domain 模块
//!
//! 网络目录与同步过程中的瞬态数据模型。
//! 这里没有任何实体需要持久化：所有值都是函数调用作用域内的状态机，
//! 编排操作完成或抛错后自然析构。

pub mod network_catalog;
pub mod transaction;

// 重新导出常用类型
pub use network_catalog::{NetworkCatalog, NetworkDescriptor};
pub use transaction::{
    ConfirmationOutcome, ConfirmationState, SwitchAttemptResult, SwitchMethod,
    TransactionReference, WalletClientHandle,
};
