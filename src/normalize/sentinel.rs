//! 缺失文本哨兵 `[---]` 的定位与保护

use std::ops::Range;

/// 缺失文本哨兵
pub const SENTINEL: &str = "[---]";

/// 发送给打分服务的掩码占位符
pub const MASK: &str = "[MASK]";

/// 查找所有哨兵的字节区间（从左到右，不重叠）
pub fn find_sentinels(text: &str) -> Vec<Range<usize>> {
    text.match_indices(SENTINEL)
        .map(|(start, s)| start..start + s.len())
        .collect()
}

/// 仅对哨兵之间的片段应用变换，哨兵本身原样保留
pub fn map_outside_sentinels<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;

    for range in find_sentinels(text) {
        result.push_str(&f(&text[last_end..range.start]));
        result.push_str(SENTINEL);
        last_end = range.end;
    }
    result.push_str(&f(&text[last_end..]));

    result
}

/// 片段中包含的哨兵（用于删除定界片段时保留缺失标记）
pub fn sentinels_within(fragment: &str) -> String {
    SENTINEL.repeat(fragment.matches(SENTINEL).count())
}
