// 缺失片段补全模块
//
// - scorer: 打分服务接口与失败类型
// - http_scorer: 远程打分服务客户端
// - infiller: 限流、超时与候选选择

pub mod http_scorer;
pub mod infiller;
pub mod scorer;

pub use http_scorer::HttpMaskScorer;
pub use infiller::{select_candidate, Candidate, SpanInfiller};
pub use scorer::{InfillFailure, MaskScorer, ScoreRequest, ScoreResponse, ScoredToken};
