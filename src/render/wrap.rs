/// Greedy word wrap against a width budget. Explicit newlines always break;
/// a word wider than the budget gets a line of its own.
pub(crate) fn wrap_text<F>(text: &str, max_width: f32, mut measure: F) -> Vec<String>
where
    F: FnMut(&str) -> f32,
{
    let mut result = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if measure(&candidate) > max_width {
                result.push(std::mem::take(&mut current));
                current.push_str(word);
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    if result.is_empty() && !text.trim().is_empty() {
        result.push(text.trim().to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(text: &str) -> f32 {
        text.chars().count() as f32
    }

    #[test]
    fn breaks_at_width() {
        let lines = wrap_text("aaa bbb ccc", 7.0, chars);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn keeps_explicit_newlines_and_long_words() {
        let lines = wrap_text("first\nextraordinarily long", 6.0, chars);
        assert_eq!(lines, vec!["first", "extraordinarily", "long"]);
        assert!(wrap_text("  ", 6.0, chars).is_empty());
    }
}
