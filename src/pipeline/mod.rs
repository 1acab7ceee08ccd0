// Pipeline 模块 - 批处理管道
//
// - batch: 并发规范化，结果按输入顺序返回
// - types: 记录结果、审计汇总、输出报告

mod batch;
mod types;

pub use batch::{process_record, restore_input_order, BatchPipeline};
pub use types::*;
