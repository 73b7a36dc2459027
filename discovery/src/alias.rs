//! Redirect targets for mistyped or denormalized place slugs.
//!
//! Every canonical slug is indexed under two keys: the slug with its hyphens
//! removed, and the slug with its hyphens removed after dropping the Catalan
//! stop-words `de`, `del` and `dels`. Both keys also fold diacritics. An
//! incoming slug is projected the same way and looked up in the index.
//!
//! When two different canonical slugs share a key the key is ambiguous and
//! never resolves. Guessing wrong would send users to the wrong town.

use crate::types::PlaceRecord;
use std::collections::{HashMap, HashSet};

const STOP_WORDS: &[&str] = &["de", "del", "dels"];

pub fn normalize_slug(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Maps accented Catalan and Spanish letters to their plain form. The middle
/// dot of `l·l` and apostrophes are dropped.
fn fold_diacritics(slug: &str) -> String {
    slug.chars()
        .filter_map(|c| match c {
            'à' | 'á' | 'â' | 'ä' => Some('a'),
            'è' | 'é' | 'ê' | 'ë' => Some('e'),
            'ì' | 'í' | 'î' | 'ï' => Some('i'),
            'ò' | 'ó' | 'ô' | 'ö' => Some('o'),
            'ù' | 'ú' | 'û' | 'ü' => Some('u'),
            'ç' => Some('c'),
            'ñ' => Some('n'),
            '·' | '\'' | '’' => None,
            ' ' | '_' => Some('-'),
            c => Some(c),
        })
        .collect()
}

pub fn collapse_hyphens(slug: &str) -> String {
    fold_diacritics(slug).replace('-', "")
}

pub fn collapse_hyphens_excluding_stop_words(slug: &str) -> String {
    fold_diacritics(slug)
        .split('-')
        .filter(|token| !token.is_empty() && !STOP_WORDS.contains(token))
        .collect()
}

fn alias_keys(slug: &str) -> [String; 2] {
    [
        collapse_hyphens(slug),
        collapse_hyphens_excluding_stop_words(slug),
    ]
}

/// Reverse index from alias key to canonical slug. `None` marks a key shared
/// by more than one canonical slug.
#[derive(Debug, Default)]
pub struct AliasIndex {
    keys: HashMap<String, Option<String>>,
    canonical: HashSet<String>,
}

impl AliasIndex {
    pub fn new(places: &[PlaceRecord]) -> Self {
        let mut index = AliasIndex::default();

        for place in places {
            let slug = place.slug.as_str();
            index.canonical.insert(slug.to_string());

            for key in alias_keys(&normalize_slug(slug)) {
                if key.is_empty() {
                    continue;
                }
                index
                    .keys
                    .entry(key)
                    .and_modify(|existing| {
                        if existing.as_deref() != Some(slug) {
                            *existing = None;
                        }
                    })
                    .or_insert_with(|| Some(slug.to_string()));
            }
        }

        index
    }

    /// Returns the canonical slug `input` is a variant of, or `None` when the
    /// input is already canonical, unknown, or only matches ambiguous keys.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        let normalized = normalize_slug(input);
        if normalized.is_empty() || self.canonical.contains(&normalized) {
            return None;
        }

        alias_keys(&normalized)
            .iter()
            .filter(|key| !key.is_empty())
            .filter_map(|key| self.keys.get(key).and_then(|slug| slug.as_deref()))
            .find(|slug| *slug != normalized)
    }

    pub fn is_canonical(&self, slug: &str) -> bool {
        self.canonical.contains(slug)
    }
}

pub fn resolve_alias(input: &str, places: &[PlaceRecord]) -> Option<String> {
    AliasIndex::new(places).resolve(input).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlaceType;

    fn place_list(slugs: &[&str]) -> Vec<PlaceRecord> {
        slugs
            .iter()
            .enumerate()
            .map(|(i, slug)| PlaceRecord::new(i as u64, PlaceType::City, *slug, *slug))
            .collect()
    }

    #[test]
    fn test_missing_hyphens() {
        let places = place_list(&["barcelona", "sant-cugat-sesgarrigues", "mataro"]);
        assert_eq!(
            resolve_alias("santcugatsesgarrigues", &places),
            Some("sant-cugat-sesgarrigues".to_string())
        );
        assert_eq!(
            resolve_alias("  SantCugat-Sesgarrigues ", &places),
            Some("sant-cugat-sesgarrigues".to_string())
        );
    }

    #[test]
    fn test_stop_words() {
        let places = place_list(&["sant-pere-de-ribes", "vilanova-i-la-geltru"]);
        assert_eq!(
            resolve_alias("sant-pere-ribes", &places),
            Some("sant-pere-de-ribes".to_string())
        );
        assert_eq!(
            resolve_alias("santperederibes", &places),
            Some("sant-pere-de-ribes".to_string())
        );
    }

    #[test]
    fn test_diacritics() {
        let places = place_list(&["mataro", "l-hospitalet-de-llobregat", "sant-adria-de-besos"]);
        assert_eq!(resolve_alias("mataró", &places), Some("mataro".to_string()));
        assert_eq!(
            resolve_alias("sant-adrià-de-besòs", &places),
            Some("sant-adria-de-besos".to_string())
        );
        assert_eq!(
            resolve_alias("l'hospitalet-de-llobregat", &places),
            Some("l-hospitalet-de-llobregat".to_string())
        );
    }

    #[test]
    fn test_canonical_slugs_never_redirect() {
        let slugs = [
            "barcelona",
            "sant-cugat-sesgarrigues",
            "sant-pere-de-ribes",
            "sant-pere-ribes",
            "a-b",
            "ab",
            "maresme",
        ];
        let places = place_list(&slugs);
        for slug in slugs {
            assert_eq!(resolve_alias(slug, &places), None, "{slug}");
        }
    }

    #[test]
    fn test_ambiguous_keys_fail_closed() {
        let places = place_list(&["a-b", "ab"]);
        assert_eq!(resolve_alias("ab", &places), None);
        assert_eq!(resolve_alias("a-b", &places), None);
        assert_eq!(resolve_alias("a--b", &places), None);

        // Collision through the stop-word projection.
        let places = place_list(&["sant-pere-de-ribes", "sant-pere-ribes"]);
        assert_eq!(resolve_alias("santpereribes", &places), None);
        // The full projection is still unique for the stop-word variant.
        assert_eq!(
            resolve_alias("santperederibes", &places),
            Some("sant-pere-de-ribes".to_string())
        );
    }

    #[test]
    fn test_unknown_slug() {
        let places = place_list(&["barcelona", "girona"]);
        assert_eq!(resolve_alias("xyzzy", &places), None);
        assert_eq!(resolve_alias("", &places), None);
        assert_eq!(resolve_alias("de", &places), None);
        assert_eq!(resolve_alias("anything", &[]), None);
    }

    #[test]
    fn test_duplicate_records_are_not_ambiguous() {
        let mut places = place_list(&["girona"]);
        places.push(PlaceRecord::new(99, PlaceType::Region, "Girona", "girona"));
        let index = AliasIndex::new(&places);
        assert!(index.is_canonical("girona"));
        assert_eq!(index.resolve("gi-rona"), Some("girona"));
    }

    #[test]
    fn test_key_projections() {
        assert_eq!(collapse_hyphens("sant-pere-de-ribes"), "santperederibes");
        assert_eq!(
            collapse_hyphens_excluding_stop_words("sant-pere-de-ribes"),
            "santpereribes"
        );
        assert_eq!(
            collapse_hyphens_excluding_stop_words("castell-dels-moros"),
            "castellmoros"
        );
        assert_eq!(collapse_hyphens("l·l-ò"), "llo");
    }
}
