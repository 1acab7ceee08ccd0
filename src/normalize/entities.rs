//! HTML/XML 字符实体解码（规则 3）
//!
//! 单遍解码：`&amp;lt;` → `&lt;`，不会级联。无法识别的实体原样保留

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

lazy_static! {
    static ref ENTITY: Regex =
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
            .expect("entity pattern");

    static ref NAMED: HashMap<&'static str, char> = HashMap::from([
        // XML 预定义
        ("amp", '&'),
        ("lt", '<'),
        ("gt", '>'),
        ("quot", '"'),
        ("apos", '\''),
        // 常见排版
        ("nbsp", '\u{00A0}'),
        ("ndash", '–'),
        ("mdash", '—'),
        ("hellip", '…'),
        ("lsquo", '‘'),
        ("rsquo", '’'),
        ("ldquo", '“'),
        ("rdquo", '”'),
        ("middot", '·'),
        ("para", '¶'),
        ("sect", '§'),
        ("lang", '⟨'),
        ("rang", '⟩'),
        // 带变音的拉丁字母
        ("aacute", 'á'),
        ("eacute", 'é'),
        ("iacute", 'í'),
        ("oacute", 'ó'),
        ("uacute", 'ú'),
        ("agrave", 'à'),
        ("egrave", 'è'),
        ("auml", 'ä'),
        ("euml", 'ë'),
        ("iuml", 'ï'),
        ("ouml", 'ö'),
        ("uuml", 'ü'),
        // 希腊字母
        ("Alpha", 'Α'),
        ("Beta", 'Β'),
        ("Gamma", 'Γ'),
        ("Delta", 'Δ'),
        ("Epsilon", 'Ε'),
        ("Zeta", 'Ζ'),
        ("Eta", 'Η'),
        ("Theta", 'Θ'),
        ("Iota", 'Ι'),
        ("Kappa", 'Κ'),
        ("Lambda", 'Λ'),
        ("Mu", 'Μ'),
        ("Nu", 'Ν'),
        ("Xi", 'Ξ'),
        ("Omicron", 'Ο'),
        ("Pi", 'Π'),
        ("Rho", 'Ρ'),
        ("Sigma", 'Σ'),
        ("Tau", 'Τ'),
        ("Upsilon", 'Υ'),
        ("Phi", 'Φ'),
        ("Chi", 'Χ'),
        ("Psi", 'Ψ'),
        ("Omega", 'Ω'),
        ("alpha", 'α'),
        ("beta", 'β'),
        ("gamma", 'γ'),
        ("delta", 'δ'),
        ("epsilon", 'ε'),
        ("zeta", 'ζ'),
        ("eta", 'η'),
        ("theta", 'θ'),
        ("iota", 'ι'),
        ("kappa", 'κ'),
        ("lambda", 'λ'),
        ("mu", 'μ'),
        ("nu", 'ν'),
        ("xi", 'ξ'),
        ("omicron", 'ο'),
        ("pi", 'π'),
        ("rho", 'ρ'),
        ("sigmaf", 'ς'),
        ("sigma", 'σ'),
        ("tau", 'τ'),
        ("upsilon", 'υ'),
        ("phi", 'φ'),
        ("chi", 'χ'),
        ("psi", 'ψ'),
        ("omega", 'ω'),
    ]);
}

/// 解码字符实体
///
/// 返回 None 表示文本中没有可解码的实体
pub fn decode_entities(text: &str) -> Option<String> {
    if !text.contains('&') {
        return None;
    }

    let mut changed = false;
    let decoded = ENTITY.replace_all(text, |caps: &Captures| {
        let body = &caps[1];
        match resolve(body) {
            Some(ch) => {
                changed = true;
                ch.to_string()
            }
            None => caps[0].to_string(),
        }
    });

    if changed {
        Some(decoded.into_owned())
    } else {
        None
    }
}

fn resolve(body: &str) -> Option<char> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = if let Some(hex) = numeric.strip_prefix(|c: char| c == 'x' || c == 'X') {
            u32::from_str_radix(hex, 16).ok()?
        } else {
            numeric.parse::<u32>().ok()?
        };
        // 拒绝 NUL 与代理区等非法码位
        return char::from_u32(code).filter(|c| *c != '\0');
    }
    NAMED.get(body).copied()
}
