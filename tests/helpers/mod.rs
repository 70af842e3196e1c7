// ==========================================
// 集成测试共享辅助模块
// ==========================================
#![allow(dead_code)]

pub mod mock_config;
pub mod mock_provider;
pub mod test_data_builder;
