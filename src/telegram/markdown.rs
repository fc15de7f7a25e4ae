/// Escapes special characters for MarkdownV2 format
///
/// # Arguments
/// * `text` - Text to escape
///
/// # Returns
/// Escaped text safe for MarkdownV2 parsing
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '_' => result.push_str("\\_"),
            '*' => result.push_str("\\*"),
            '[' => result.push_str("\\["),
            ']' => result.push_str("\\]"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '~' => result.push_str("\\~"),
            '`' => result.push_str("\\`"),
            '>' => result.push_str("\\>"),
            '#' => result.push_str("\\#"),
            '+' => result.push_str("\\+"),
            '-' => result.push_str("\\-"),
            '=' => result.push_str("\\="),
            '|' => result.push_str("\\|"),
            '{' => result.push_str("\\{"),
            '}' => result.push_str("\\}"),
            '.' => result.push_str("\\."),
            '!' => result.push_str("\\!"),
            _ => result.push(c),
        }
    }

    result
}

/// Безопасно обрезает строку до указанной длины символов (не байт!)
/// Возвращает обрезанную строку с добавлением "..." если была обрезка
pub fn truncate_string_safe(text: &str, max_len: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let char_count = text.chars().count();
    if char_count <= max_len {
        return text.to_string();
    }

    let truncate_len = max_len.saturating_sub(3);
    let mut result = String::with_capacity(truncate_len + 3);
    for (idx, ch) in text.chars().enumerate() {
        if idx >= truncate_len {
            break;
        }
        result.push(ch);
    }
    result.push_str("...");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown_special_chars() {
        assert_eq!(escape_markdown("a_b*c"), "a\\_b\\*c");
        assert_eq!(escape_markdown("15.09.2026 18:30"), "15\\.09\\.2026 18:30");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn test_escape_markdown_backslash_first() {
        assert_eq!(escape_markdown("a\\_"), "a\\\\\\_");
    }

    #[test]
    fn test_truncate_string_safe() {
        assert_eq!(truncate_string_safe("short", 10), "short");
        assert_eq!(truncate_string_safe("абвгдежзик", 8), "абвгд...");
        assert_eq!(truncate_string_safe("", 5), "");
    }
}
