/// Sorts by score descending, breaking ties with `tiebreak` ascending, and
/// assigns sequential ranks starting at 1. Equal scores never share a rank.
pub fn rank_by_score<T, K, S, B>(mut items: Vec<T>, score: S, tiebreak: B) -> Vec<(u32, T)>
where
    K: Ord,
    S: Fn(&T) -> i64,
    B: Fn(&T) -> K,
{
    items.sort_by(|a, b| {
        score(b)
            .cmp(&score(a))
            .then_with(|| tiebreak(a).cmp(&tiebreak(b)))
    });

    items
        .into_iter()
        .zip(1u32..)
        .map(|(item, rank)| (rank, item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_score_first() {
        let ranked = rank_by_score(vec![("a", 10, 0), ("b", 30, 1), ("c", 20, 2)], |e| e.1, |e| e.2);
        let names: Vec<_> = ranked.iter().map(|(r, e)| (*r, e.0)).collect();
        assert_eq!(names, vec![(1, "b"), (2, "c"), (3, "a")]);
    }

    #[test]
    fn ties_keep_original_order() {
        let ranked = rank_by_score(vec![("late", 50, 2), ("early", 50, 1), ("low", 10, 0)], |e| e.1, |e| e.2);
        let names: Vec<_> = ranked.iter().map(|(r, e)| (*r, e.0)).collect();
        assert_eq!(names, vec![(1, "early"), (2, "late"), (3, "low")]);
    }

    #[test]
    fn empty_input() {
        let ranked: Vec<(u32, i64)> = rank_by_score(Vec::new(), |e: &i64| *e, |_| 0);
        assert!(ranked.is_empty());
    }
}
