// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Lowercase, trim, and strip Spanish diacritics so `"Matrícula"` matches `"matricula"`.
pub fn fold_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Case-insensitive substring match; an empty needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return true;
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{contains_ignore_case, fold_key};

    #[test]
    fn fold_key_strips_accents_and_case() {
        assert_eq!(fold_key(" Matrícula "), "matricula");
        assert_eq!(fold_key("Tipo Vehículo"), "tipo vehiculo");
        assert_eq!(fold_key("AUTOMÁTICO"), "automatico");
    }

    #[test]
    fn contains_ignore_case_matches_substrings() {
        assert!(contains_ignore_case("1234ABC", "34ab"));
        assert!(contains_ignore_case("anything", ""));
        assert!(!contains_ignore_case("Engrase", "aceite"));
    }
}
