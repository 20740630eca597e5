//! Vietnamese letter values and vowel rules

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Pythagorean values (A=1 ... I=9, J=1 ...) extended to Vietnamese
    /// letters; tone marks keep the base vowel's value.
    static ref LETTER_VALUES: HashMap<char, u32> = {
        let groups: &[(&str, u32)] = &[
            ("AJS", 1),
            ("BKT", 2),
            ("CLU", 3),
            ("DMV", 4),
            ("ENW", 5),
            ("FOX", 6),
            ("GPY", 7),
            ("HQZ", 8),
            ("IR", 9),
            ("ĂÂ", 1),
            ("ÁÀẢÃẠẮẰẲẴẶẤẦẨẪẬ", 1),
            ("Ê", 5),
            ("ÉÈẺẼẸẾỀỂỄỆ", 5),
            ("ÍÌỈĨỊ", 9),
            ("ÔƠ", 6),
            ("ÓÒỎÕỌỐỒỔỖỘỚỜỞỠỢ", 6),
            ("ÚÙỦŨỤƯỨỪỬỮỰ", 3),
            ("ÝỲỶỸỴ", 7),
            ("Đ", 4),
        ];

        groups
            .iter()
            .flat_map(|(letters, value)| letters.chars().map(move |c| (c, *value)))
            .collect()
    };

    static ref VOWELS: HashSet<char> = "AEIOUY\
        ĂÂÊÔƠƯ\
        ÁÀẢÃẠẮẰẲẴẶẤẦẨẪẬ\
        ÉÈẺẼẸẾỀỂỄỆ\
        ÍÌỈĨỊ\
        ÓÒỎÕỌỐỒỔỖỘỚỜỞỠỢ\
        ÚÙỦŨỤỨỪỬỮỰ\
        ÝỲỶỸỴ"
        .chars()
        .collect();
}

/// Y acts as a consonant in words built on these clusters
const Y_CONSONANT_PATTERNS: &[&str] = &[
    "YÊU", "YẾU", "YỀU", "YỂU", "YỄU", "YỆU",
    "YÊN", "YẾN", "YỀN", "YỂN", "YỄN", "YỆN",
];

pub fn to_upper(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}

/// Numeric value of a letter, `None` for anything outside the alphabet
pub fn letter_value(c: char) -> Option<u32> {
    LETTER_VALUES.get(&to_upper(c)).copied()
}

/// Vowel test with the Y rule applied against the containing word
pub fn is_vowel(c: char, word: &str) -> bool {
    let upper = to_upper(c);
    if upper == 'Y' {
        let word_upper = word.to_uppercase();
        return !Y_CONSONANT_PATTERNS
            .iter()
            .any(|pattern| word_upper.contains(pattern));
    }
    VOWELS.contains(&upper)
}

pub fn is_consonant(c: char, word: &str) -> bool {
    letter_value(c).is_some() && !is_vowel(c, word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_letters() {
        assert_eq!(letter_value('a'), Some(1));
        assert_eq!(letter_value('Z'), Some(8));
        assert_eq!(letter_value('r'), Some(9));
        assert_eq!(letter_value(' '), None);
        assert_eq!(letter_value('1'), None);
    }

    #[test]
    fn test_vietnamese_letters() {
        assert_eq!(letter_value('đ'), Some(4));
        assert_eq!(letter_value('ồ'), Some(6));
        assert_eq!(letter_value('ạ'), Some(1));
        assert_eq!(letter_value('ư'), Some(3));
        assert_eq!(letter_value('ỹ'), Some(7));
    }

    #[test]
    fn test_y_rule() {
        assert!(is_vowel('y', "Thúy"));
        assert!(!is_vowel('Y', "Yến"));
        assert!(!is_vowel('y', "Nguyễn"));
        assert!(is_consonant('y', "Nguyễn"));
    }

    #[test]
    fn test_vowels() {
        assert!(is_vowel('ă', "Đăng"));
        assert!(!is_vowel('đ', "Đăng"));
        assert!(is_consonant('n', "Đăng"));
    }
}
