use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Canonical form used to compare free-text answers.
///
/// Case, diacritics and surrounding/repeated whitespace are ignored. `đ` has no
/// canonical decomposition, so it is folded to `d` explicitly.
pub fn normalize_answer(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'Đ' => 'd',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when `input` matches any of `accepted` after normalization.
pub fn matches_any<S: AsRef<str>>(input: &str, accepted: &[S]) -> bool {
    let input = normalize_answer(input);
    !input.is_empty()
        && accepted
            .iter()
            .any(|candidate| normalize_answer(candidate.as_ref()) == input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_diacritics_and_spacing_are_ignored() {
        let expected = normalize_answer("tap duot");
        assert_eq!(normalize_answer("Tập Dượt"), expected);
        assert_eq!(normalize_answer("TẬP DƯỢT  "), expected);
        assert_eq!(normalize_answer("  tập   dượt "), expected);
        assert_eq!(expected, "tap duot");
    }

    #[test]
    fn d_with_stroke_folds_to_d() {
        assert_eq!(normalize_answer("Đông Dương"), "dong duong");
    }

    #[test]
    fn matches_any_accepts_alternatives() {
        let accepted = ["MÁC - LÊNIN", "MAC LENIN"];
        assert!(matches_any("mac lenin", &accepted));
        assert!(matches_any("Mác - Lênin", &accepted));
        assert!(!matches_any("lenin", &accepted));
    }

    #[test]
    fn blank_input_never_matches() {
        assert!(!matches_any("   ", &["", " "]));
    }
}
