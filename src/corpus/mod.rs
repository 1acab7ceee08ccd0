// 语料模块
//
// - loader: 输入读取 / 输出写出
// - denylist: 译文屏蔽短语
// - builder: 译文合并与建模标记

pub mod builder;
pub mod denylist;
pub mod loader;
pub mod types;

pub use builder::CorpusBuilder;
pub use denylist::DenylistMatcher;
pub use types::{CorpusRecord, Inscription, NormalizedRecord};
