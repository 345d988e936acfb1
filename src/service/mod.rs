pub mod chain_switch;
pub mod chain_verifier;
pub mod confirmation_poller;
pub mod indexer_client;
pub mod wallet_resolver;

// 重新导出常用类型
pub use chain_switch::{ChainSwitchCoordinator, StrategyError, SwitchPolicy, SwitchStrategy};
pub use chain_verifier::{ChainProbe, ChainVerifier, RpcChainProbe};
pub use confirmation_poller::{ConfirmationCheck, IndexerNotifier, WriteConfirmationPoller};
pub use indexer_client::{EntityFieldCheck, IndexerClient};
pub use wallet_resolver::{WalletClientResolver, WalletGateway};
