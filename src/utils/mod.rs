pub mod chain_id;

// 重新导出常用函数
pub use chain_id::{format_chain_id_hex, parse_chain_id};
