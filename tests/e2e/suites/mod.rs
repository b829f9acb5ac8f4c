//! 测试套件模块

pub mod exclusion;
pub mod lease;
pub mod waiting;
