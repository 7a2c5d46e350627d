use std::sync::Arc;

use crate::models::enums::Gender;
use crate::models::ReferenceRange;

use super::error::CatalogError;
use super::store::CatalogStore;

const SCORE_EXACT_POPULATION: i32 = 10;
const SCORE_BOTH_ADULT: i32 = 5;
const SCORE_GENDER_MATCH: i32 = 5;
const SCORE_GENERIC_WITH_GENDER: i32 = 2;

/// Picks the reference range that best fits a subject.
pub struct ReferenceRangeSelector {
    catalog: Arc<CatalogStore>,
}

impl ReferenceRangeSelector {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Best-scoring range for `biomarker`, or `None` if the catalog declares
    /// no range for it.
    pub fn select(
        &self,
        biomarker: &str,
        age: Option<u32>,
        gender: Option<Gender>,
        population: &str,
    ) -> Result<Option<ReferenceRange>, CatalogError> {
        let table = self.catalog.load_ranges()?;
        let candidates = table.records.iter().filter(|r| r.biomarker == biomarker);
        Ok(select_from(candidates, age, gender, population).cloned())
    }
}

/// Highest score wins; on ties the first candidate in iteration order is kept.
pub fn select_from<'a>(
    candidates: impl IntoIterator<Item = &'a ReferenceRange>,
    age: Option<u32>,
    gender: Option<Gender>,
    population: &str,
) -> Option<&'a ReferenceRange> {
    let mut best: Option<(&ReferenceRange, i32)> = None;
    for candidate in candidates {
        let score = match_score(candidate, age, gender, population);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(range, _)| range)
}

pub fn match_score(
    candidate: &ReferenceRange,
    age: Option<u32>,
    gender: Option<Gender>,
    population: &str,
) -> i32 {
    let tokens = population_tokens(&candidate.population);
    let mut score = 0;

    if candidate.population == population {
        score += SCORE_EXACT_POPULATION;
    }
    if population.contains("adult") && candidate.population.contains("adult") {
        score += SCORE_BOTH_ADULT;
    }
    if let Some(gender) = gender {
        if candidate.gender == Some(gender) || tokens.contains(&gender.as_str()) {
            score += SCORE_GENDER_MATCH;
        }
        if tokens.contains(&"general") {
            score += SCORE_GENERIC_WITH_GENDER;
        }
    }

    score + age_score(candidate, age)
}

/// Age does not influence selection yet; `age_min`/`age_max` are carried on
/// the range so a weighting can be introduced here without touching callers.
fn age_score(_candidate: &ReferenceRange, _age: Option<u32>) -> i32 {
    0
}

fn population_tokens(population: &str) -> Vec<&str> {
    population
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(population: &str, gender: Option<Gender>) -> ReferenceRange {
        ReferenceRange {
            biomarker: "hemoglobin".into(),
            population: population.into(),
            gender,
            age_min: None,
            age_max: None,
            min: Some(12.0),
            max: Some(17.5),
            unit: "g/dL".into(),
        }
    }

    #[test]
    fn exact_population_scores_highest() {
        let ranges = [range("pediatric", None), range("general_adult", None)];
        let picked = select_from(&ranges, None, None, "general_adult").unwrap();
        assert_eq!(picked.population, "general_adult");
    }

    #[test]
    fn gender_token_breaks_adult_tie() {
        let ranges = [
            range("adult_female", Some(Gender::Female)),
            range("adult_male", Some(Gender::Male)),
            range("general", None),
        ];
        let male = select_from(&ranges, Some(40), Some(Gender::Male), "general_adult").unwrap();
        assert_eq!(male.population, "adult_male");
        let female = select_from(&ranges, Some(40), Some(Gender::Female), "general_adult").unwrap();
        assert_eq!(female.population, "adult_female");
    }

    #[test]
    fn male_does_not_match_female_substring() {
        let female = range("adult_female", None);
        assert_eq!(match_score(&female, None, Some(Gender::Male), "general_adult"), 5);
    }

    #[test]
    fn generic_range_gets_bonus_only_with_gender() {
        let generic = range("general", None);
        assert_eq!(match_score(&generic, None, None, "general_adult"), 0);
        assert_eq!(match_score(&generic, None, Some(Gender::Female), "general_adult"), 2);
    }

    #[test]
    fn ties_keep_first_seen() {
        let ranges = [range("adult_female", None), range("adult_male", None)];
        let picked = select_from(&ranges, None, None, "general_adult").unwrap();
        assert_eq!(picked.population, "adult_female");
    }

    #[test]
    fn age_does_not_change_selection() {
        let mut young = range("general_adult", None);
        young.age_max = Some(30);
        let old = range("general_adult", None);
        assert_eq!(
            match_score(&young, Some(70), None, "general_adult"),
            match_score(&old, Some(70), None, "general_adult")
        );
    }

    #[test]
    fn no_candidates_yields_none() {
        let selector = ReferenceRangeSelector::new(Arc::new(CatalogStore::bundled()));
        assert!(selector
            .select("apolipoprotein_b", None, None, "general_adult")
            .unwrap()
            .is_none());
    }

    #[test]
    fn catalog_selection_respects_gender() {
        let selector = ReferenceRangeSelector::new(Arc::new(CatalogStore::bundled()));
        let range = selector
            .select("hdl_cholesterol", Some(50), Some(Gender::Female), "general_adult")
            .unwrap()
            .unwrap();
        assert_eq!(range.min, Some(50.0));
    }
}
