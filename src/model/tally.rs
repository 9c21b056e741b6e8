use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::election::Vote;

/// Number of votes received by a single candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTally {
    pub candidate_id: String,
    pub count: u64,
}

/// Count the votes per candidate.
///
/// The result is ordered by count, highest first; candidates with equal
/// counts are ordered by ID. Candidates without votes do not appear.
pub fn tally<'a>(votes: impl IntoIterator<Item = &'a Vote>) -> Vec<CandidateTally> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for vote in votes {
        *counts.entry(vote.candidate_id.as_str()).or_default() += 1;
    }

    let mut results = counts
        .into_iter()
        .map(|(candidate_id, count)| CandidateTally {
            candidate_id: candidate_id.to_string(),
            count,
        })
        .collect::<Vec<_>>();
    results.sort_unstable_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(pairs: &[(&str, &str)]) -> Vec<Vote> {
        pairs
            .iter()
            .map(|(voter, candidate)| Vote::new(*voter, *candidate))
            .collect()
    }

    fn tallied(pairs: &[(&str, u64)]) -> Vec<CandidateTally> {
        pairs
            .iter()
            .map(|(candidate, count)| CandidateTally {
                candidate_id: candidate.to_string(),
                count: *count,
            })
            .collect()
    }

    #[test]
    fn counts_and_orders() {
        let votes = votes(&[("v1", "a"), ("v2", "b"), ("v3", "a")]);
        assert_eq!(tally(&votes), tallied(&[("a", 2), ("b", 1)]));
    }

    #[test]
    fn empty() {
        assert!(tally(&Vec::<Vote>::new()).is_empty());
    }

    #[test]
    fn ties_are_broken_by_id() {
        let votes = votes(&[("v1", "zeca"), ("v2", "bia"), ("v3", "maria"), ("v4", "bia")]);
        assert_eq!(
            tally(&votes),
            tallied(&[("bia", 2), ("maria", 1), ("zeca", 1)])
        );
    }

    #[test]
    fn counts_sum_to_vote_total() {
        let pairs = (0..50)
            .map(|i| (format!("voter{i}"), format!("candidate{}", i % 7)))
            .collect::<Vec<_>>();
        let votes = pairs
            .iter()
            .map(|(v, c)| Vote::new(v.as_str(), c.as_str()))
            .collect::<Vec<_>>();

        let results = tally(&votes);
        assert_eq!(results.iter().map(|r| r.count).sum::<u64>(), 50);
        assert!(results.windows(2).all(|w| w[0].count >= w[1].count));
        for result in &results {
            let expected = votes
                .iter()
                .filter(|v| v.candidate_id == result.candidate_id)
                .count() as u64;
            assert_eq!(result.count, expected);
        }
    }
}
