use crate::COMPARE_TOLERANCE;
use crate::model::{IrtModel, ItemParams};
use rand::Rng;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// An unanswered active item offered to the selector.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    pub id: Uuid,
    pub params: ItemParams,
    pub skills: Vec<String>,
}

/// Per-skill coverage requirement for a session.
#[derive(Debug, Clone)]
pub struct SkillQuota {
    pub skill: String,
    pub min_items: u32,
    pub max_items: Option<u32>,
}

/// Pick the next item: maximum Fisher information at the current theta,
/// restricted by skill coverage. Ties (within [`COMPARE_TOLERANCE`]) break
/// by largest skill deficit, then smallest |b - theta|, then item id, so a
/// replay over the same state selects the same item. With `top_k > 1` the
/// result is drawn uniformly from the top K by information.
pub fn select_next<'a, R: Rng>(
    theta: f64,
    model: IrtModel,
    candidates: &'a [CandidateItem],
    answered_by_skill: &BTreeMap<String, u32>,
    quotas: &[SkillQuota],
    top_k: usize,
    rng: &mut R,
) -> Option<&'a CandidateItem> {
    let eligible = eligible_candidates(candidates, answered_by_skill, quotas);
    if eligible.is_empty() {
        return None;
    }

    let mut ranked: Vec<Ranked<'_>> = eligible
        .into_iter()
        .map(|item| Ranked {
            information: item.params.information(theta, model),
            deficit: max_deficit(item, answered_by_skill, quotas),
            distance: (item.params.under(model).difficulty - theta).abs(),
            item,
        })
        .collect();
    ranked.sort_by(|left, right| rank_order(left, right));

    let pool = ranked.len().min(top_k.max(1));
    let pick = if pool > 1 { rng.random_range(0..pool) } else { 0 };
    Some(ranked[pick].item)
}

struct Ranked<'a> {
    item: &'a CandidateItem,
    information: f64,
    deficit: u32,
    distance: f64,
}

fn rank_order(left: &Ranked<'_>, right: &Ranked<'_>) -> Ordering {
    if (left.information - right.information).abs() > COMPARE_TOLERANCE {
        // Highest information first.
        return right.information.partial_cmp(&left.information).unwrap_or(Ordering::Equal);
    }
    match right.deficit.cmp(&left.deficit) {
        Ordering::Equal => {}
        unequal => return unequal,
    }
    if (left.distance - right.distance).abs() > COMPARE_TOLERANCE {
        return left.distance.partial_cmp(&right.distance).unwrap_or(Ordering::Equal);
    }
    left.item.id.to_string().cmp(&right.item.id.to_string())
}

/// Filter to items that still fit the coverage plan. An item is dropped
/// once every covered skill has reached its maximum; while any skill sits
/// below its minimum, items covering a deficit skill take priority.
fn eligible_candidates<'a>(
    candidates: &'a [CandidateItem],
    answered_by_skill: &BTreeMap<String, u32>,
    quotas: &[SkillQuota],
) -> Vec<&'a CandidateItem> {
    if quotas.is_empty() {
        return candidates.iter().collect();
    }

    let open: Vec<&CandidateItem> = candidates
        .iter()
        .filter(|item| {
            let covered: Vec<&SkillQuota> = quotas.iter().filter(|q| item.skills.contains(&q.skill)).collect();
            if covered.is_empty() {
                return false;
            }
            covered.iter().any(|quota| match quota.max_items {
                Some(max) => answered(answered_by_skill, &quota.skill) < max,
                None => true,
            })
        })
        .collect();

    let deficits: Vec<&SkillQuota> = quotas
        .iter()
        .filter(|quota| answered(answered_by_skill, &quota.skill) < quota.min_items)
        .collect();
    if deficits.is_empty() {
        return open;
    }

    let prioritized: Vec<&CandidateItem> = open
        .iter()
        .copied()
        .filter(|item| deficits.iter().any(|quota| item.skills.contains(&quota.skill)))
        .collect();
    if prioritized.is_empty() { open } else { prioritized }
}

fn answered(answered_by_skill: &BTreeMap<String, u32>, skill: &str) -> u32 {
    answered_by_skill.get(skill).copied().unwrap_or(0)
}

fn max_deficit(item: &CandidateItem, answered_by_skill: &BTreeMap<String, u32>, quotas: &[SkillQuota]) -> u32 {
    quotas
        .iter()
        .filter(|quota| item.skills.contains(&quota.skill))
        .map(|quota| quota.min_items.saturating_sub(answered(answered_by_skill, &quota.skill)))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn grammar_item(nibble: u8, b: f64) -> CandidateItem {
        CandidateItem {
            id: Uuid::from_u128(u128::from(nibble)),
            params: ItemParams::new(1.0, b, 0.0).unwrap(),
            skills: vec!["grammar".to_owned()],
        }
    }

    fn quota(skill: &str, min_items: u32, max_items: Option<u32>) -> SkillQuota {
        SkillQuota {
            skill: skill.to_owned(),
            min_items,
            max_items,
        }
    }

    #[test]
    fn picks_the_most_informative_item() {
        // Rasch items at b in {-2, -1, 0, 1, 2}: at theta = 0 the b = 0
        // item carries the highest information.
        let candidates: Vec<_> = [-2.0f64, -1.0, 0.0, 1.0, 2.0]
            .iter()
            .enumerate()
            .map(|(i, &b)| grammar_item(i as u8, b))
            .collect();
        let quotas = [quota("grammar", 0, None)];
        let mut rng = StdRng::seed_from_u64(7);
        let picked = select_next(0.0, IrtModel::TwoPl, &candidates, &BTreeMap::new(), &quotas, 1, &mut rng).unwrap();
        assert!((picked.params.difficulty - 0.0).abs() < 1e-9);
    }

    #[test]
    fn selection_is_deterministic_for_top_one() {
        let candidates: Vec<_> = (0..6u8).map(|i| grammar_item(i, f64::from(i) * 0.3 - 1.0)).collect();
        let quotas = [quota("grammar", 0, None)];
        let mut rng_a = StdRng::seed_from_u64(1);
        let mut rng_b = StdRng::seed_from_u64(99);
        let a = select_next(0.4, IrtModel::TwoPl, &candidates, &BTreeMap::new(), &quotas, 1, &mut rng_a).unwrap();
        let b = select_next(0.4, IrtModel::TwoPl, &candidates, &BTreeMap::new(), &quotas, 1, &mut rng_b).unwrap();
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn equal_information_breaks_ties_by_id() {
        // Two identical items: the lexicographically smaller id wins.
        let candidates = vec![grammar_item(2, 0.0), grammar_item(1, 0.0)];
        let mut rng = StdRng::seed_from_u64(0);
        let picked = select_next(0.0, IrtModel::TwoPl, &candidates, &BTreeMap::new(), &[], 1, &mut rng).unwrap();
        assert_eq!(picked.id, Uuid::from_u128(1));
    }

    #[test]
    fn deficit_skill_takes_priority() {
        let mut vocab = grammar_item(1, 0.0);
        vocab.skills = vec!["vocabulary".to_owned()];
        let candidates = vec![grammar_item(2, 0.0), vocab];
        let answered = BTreeMap::from([("grammar".to_owned(), 3_u32)]);
        let quotas = [quota("grammar", 2, Some(10)), quota("vocabulary", 2, Some(10))];
        let mut rng = StdRng::seed_from_u64(0);
        let picked = select_next(0.0, IrtModel::TwoPl, &candidates, &answered, &quotas, 1, &mut rng).unwrap();
        assert_eq!(picked.skills, vec!["vocabulary".to_owned()]);
    }

    #[test]
    fn saturated_skill_bucket_removes_items() {
        let candidates = vec![grammar_item(1, 0.0)];
        let answered = BTreeMap::from([("grammar".to_owned(), 4_u32)]);
        let quotas = [quota("grammar", 1, Some(4))];
        let mut rng = StdRng::seed_from_u64(0);
        assert!(select_next(0.0, IrtModel::TwoPl, &candidates, &answered, &quotas, 1, &mut rng).is_none());
    }

    #[test]
    fn empty_bank_yields_none() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(select_next(0.0, IrtModel::TwoPl, &[], &BTreeMap::new(), &[], 1, &mut rng).is_none());
    }

    #[test]
    fn top_k_draws_from_the_best_k() {
        let candidates: Vec<_> = (0..5u8).map(|i| grammar_item(i, 0.0)).collect();
        let mut rng = StdRng::seed_from_u64(42);
        let picked = select_next(0.0, IrtModel::TwoPl, &candidates, &BTreeMap::new(), &[], 3, &mut rng).unwrap();
        assert!(candidates.iter().take(5).any(|c| c.id == picked.id));
    }
}
