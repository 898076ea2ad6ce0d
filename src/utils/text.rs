// src/utils/text.rs
//! Offset helpers. Rule options count characters while `str` slicing counts
//! bytes, so every conversion between the two goes through here.

/// Number of characters in `text[..byte]`.
pub fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Number of characters in `text`.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index reached by moving `n` characters forward from `from`, clamped to the end.
pub fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}

/// Byte index reached by moving `n` characters back from `from`, clamped to 0.
pub fn retreat_chars(text: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    text[..from]
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Moves `delta` characters from `from`. Returns `None` when the move would
/// leave the text on either side.
pub fn shift_chars(text: &str, from: usize, delta: i64) -> Option<usize> {
    if delta >= 0 {
        let n = delta as usize;
        let mut iter = text[from..].char_indices();
        match iter.nth(n) {
            Some((i, _)) => Some(from + i),
            None if char_len(&text[from..]) == n => Some(text.len()),
            None => None,
        }
    } else {
        let n = delta.unsigned_abs() as usize;
        let before = char_len(&text[..from]);
        if n > before {
            None
        } else {
            Some(retreat_chars(text, from, n))
        }
    }
}

/// Byte index of the `n`th character, clamped to the end of the text.
pub fn byte_offset(text: &str, chars: usize) -> usize {
    advance_chars(text, 0, chars)
}

/// Half-width counterpart of a full-width punctuation or digit character.
/// Only one-to-one mappings, so a folded string has the same character count.
pub fn fold_char(c: char) -> char {
    match c {
        // Full-width ASCII block: ！ through ～
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '\u{3000}' => ' ',
        '。' => '.',
        '“' | '”' => '"',
        '‘' | '’' => '\'',
        '—' => '-',
        '【' => '[',
        '】' => ']',
        _ => c,
    }
}

/// A punctuation-folded copy of a text that can map its byte offsets back to
/// the original.
#[derive(Debug)]
pub struct FoldedText {
    pub text: String,
    // (folded byte, original byte) for each char start, plus the end pair
    boundaries: Vec<(usize, usize)>,
}

impl FoldedText {
    pub fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut boundaries = Vec::with_capacity(original.len() + 1);
        for (orig, c) in original.char_indices() {
            boundaries.push((text.len(), orig));
            text.push(fold_char(c));
        }
        boundaries.push((text.len(), original.len()));
        Self { text, boundaries }
    }

    /// Original byte offset for a char boundary in the folded text.
    pub fn to_original(&self, folded: usize) -> usize {
        match self.boundaries.binary_search_by_key(&folded, |&(f, _)| f) {
            Ok(i) => self.boundaries[i].1,
            Err(i) => self.boundaries[i.saturating_sub(1)].1,
        }
    }
}

/// Folds a string without keeping the offset map.
pub fn fold_punctuation(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

/// Short single-line preview for debug traces.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.chars().take(max_chars).map(|c| if c == '\n' { ' ' } else { c }).collect();
    if char_len(text) > max_chars {
        format!("{}...", flat)
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "合同金额：100元";

    #[test]
    fn test_char_offsets_on_cjk_text() {
        let yuan = MIXED.find('元').unwrap();
        assert_eq!(char_offset(MIXED, yuan), 8);
        assert_eq!(char_len(MIXED), 9);
        assert_eq!(byte_offset(MIXED, 8), yuan);
        assert_eq!(byte_offset(MIXED, 100), MIXED.len());
    }

    #[test]
    fn test_advance_and_retreat_clamp() {
        let colon = MIXED.find('：').unwrap();
        assert_eq!(advance_chars(MIXED, colon, 1), colon + '：'.len_utf8());
        assert_eq!(advance_chars(MIXED, colon, 50), MIXED.len());
        assert_eq!(retreat_chars(MIXED, colon, 2), "合同".len());
        assert_eq!(retreat_chars(MIXED, colon, 50), 0);
        assert_eq!(retreat_chars(MIXED, colon, 0), colon);
    }

    #[test]
    fn test_shift_chars_rejects_out_of_text() {
        assert_eq!(shift_chars(MIXED, 0, 9), Some(MIXED.len()));
        assert_eq!(shift_chars(MIXED, 0, 10), None);
        assert_eq!(shift_chars(MIXED, 0, -1), None);
        let colon = MIXED.find('：').unwrap();
        assert_eq!(shift_chars(MIXED, colon, -4), Some(0));
        assert_eq!(shift_chars(MIXED, colon, -5), None);
    }

    #[test]
    fn test_folded_text_maps_back_to_original() {
        let folded = FoldedText::new(MIXED);
        assert_eq!(folded.text, "合同金额:100元");
        let pos = folded.text.find("100").unwrap();
        let orig = folded.to_original(pos);
        assert_eq!(&MIXED[orig..orig + 3], "100");
        assert_eq!(folded.to_original(folded.text.len()), MIXED.len());
    }

    #[test]
    fn test_fold_brackets_and_digits() {
        assert_eq!(fold_punctuation("（１２）【注】"), "(12)[注]");
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("abc\ndef", 5), "abc d...");
        assert_eq!(preview("abc", 5), "abc");
    }
}
