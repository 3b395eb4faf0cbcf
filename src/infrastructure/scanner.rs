//! 括号与元素配对扫描
//!
//! 正则无法处理嵌套结构，函数体、数组字面量和嵌套 `<div>` 的跨度
//! 都通过这里的线性扫描确定。只识别 ASCII 定界符，返回的下标总落在字符边界上。

/// 从 `open_at` 处的 `[`、`{` 或 `(` 开始，找到与之配对的闭括号下标
///
/// 跳过字符串（单引号、双引号、反引号）和注释中的括号。
/// 括号不闭合或 `open_at` 不是开括号时返回 `None`。
pub fn find_matching(text: &str, open_at: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = *bytes.get(open_at)?;
    let close = match open {
        b'[' => b']',
        b'{' => b'}',
        b'(' => b')',
        _ => return None,
    };

    let mut stack: Vec<u8> = vec![close];
    let mut i = open_at + 1;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'"' | b'\'' | b'`') => {
                i = skip_string(bytes, i, quote)?;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = skip_line_comment(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = skip_block_comment(bytes, i)?;
                continue;
            }
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            b'(' => stack.push(b')'),
            c @ (b']' | b'}' | b')') => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// 返回字符串字面量结束引号之后的下标
pub fn skip_string(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

fn skip_block_comment(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return Some(i + 2);
        }
        i += 1;
    }
    None
}

/// 找到 `start` 处开始标签对应的闭合标签，返回闭合标签之后的下标
///
/// 统计同名标签的嵌套层数，标签名大小写不敏感。
pub fn find_element_end(html: &str, start: usize, tag: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    let tag = tag.to_ascii_lowercase();
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);

    let first_gt = lower[start..].find('>')? + start;
    if lower[..first_gt].ends_with('/') {
        return Some(first_gt + 1);
    }

    let mut depth = 1usize;
    let mut i = first_gt + 1;
    while i < lower.len() {
        let rest = &lower[i..];
        if rest.starts_with(&close) && is_tag_boundary(rest.as_bytes().get(close.len())) {
            depth -= 1;
            let gt = rest.find('>')? + i;
            if depth == 0 {
                return Some(gt + 1);
            }
            i = gt + 1;
            continue;
        }
        if rest.starts_with(&open) && is_tag_boundary(rest.as_bytes().get(open.len())) {
            depth += 1;
            i += open.len();
            continue;
        }
        i += rest.chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn is_tag_boundary(next: Option<&u8>) -> bool {
    matches!(next, Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r'))
}
