use crate::reports::repo_types::UrgencyVote;

/// Running urgency aggregate of one report: the mean of the latest rating
/// per voter, the voter count, and the vote list itself.
#[derive(Debug, Clone, PartialEq)]
pub struct UrgencyTally {
    pub score: f64,
    pub count: i32,
    pub votes: Vec<UrgencyVote>,
}

impl UrgencyTally {
    pub fn new(score: f64, count: i32, votes: Vec<UrgencyVote>) -> Self {
        Self {
            score,
            count,
            votes,
        }
    }

    /// Folds one rating into the aggregate. A repeat vote by the same user
    /// replaces the previous value in place and leaves the count unchanged.
    pub fn cast(&mut self, user_id: &str, value: u8) -> anyhow::Result<()> {
        if let Some(existing) = self.votes.iter_mut().find(|v| v.user_id == user_id) {
            // A recorded vote with a zero count means the stored aggregate
            // is corrupt; refuse rather than divide through it.
            anyhow::ensure!(self.count > 0, "vote list and vote count out of sync");
            let old = existing.vote;
            existing.vote = value;
            self.score =
                (self.score * self.count as f64 - old as f64 + value as f64) / self.count as f64;
        } else {
            let new_count = self.count + 1;
            self.score = (self.score * self.count as f64 + value as f64) / new_count as f64;
            self.count = new_count;
            self.votes.push(UrgencyVote {
                user_id: user_id.to_string(),
                vote: value,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn empty() -> UrgencyTally {
        UrgencyTally::new(0.0, 0, Vec::new())
    }

    fn assert_score(tally: &UrgencyTally, expected: f64) {
        assert!(
            (tally.score - expected).abs() < TOLERANCE,
            "score {} != {}",
            tally.score,
            expected
        );
    }

    #[test]
    fn first_vote_sets_the_mean() {
        let mut tally = empty();
        tally.cast("a@example.com", 4).expect("cast");
        assert_eq!(tally.count, 1);
        assert_score(&tally, 4.0);
        assert_eq!(tally.votes.len(), 1);
    }

    #[test]
    fn two_voters_average() {
        let mut tally = empty();
        tally.cast("a@example.com", 4).expect("cast a");
        tally.cast("b@example.com", 2).expect("cast b");
        assert_eq!(tally.count, 2);
        assert_score(&tally, 3.0);

        // A changes their mind; count stays at two distinct voters.
        tally.cast("a@example.com", 2).expect("revote a");
        assert_eq!(tally.count, 2);
        assert_score(&tally, 2.0);
    }

    #[test]
    fn revote_replaces_in_place() {
        let mut tally = empty();
        tally.cast("a@example.com", 3).expect("cast");
        tally.cast("a@example.com", 5).expect("revote");
        assert_eq!(tally.count, 1);
        assert_score(&tally, 5.0);
        assert_eq!(tally.votes.len(), 1);
        assert_eq!(tally.votes[0].vote, 5);
    }

    #[test]
    fn revote_preserves_position() {
        let mut tally = empty();
        tally.cast("a@example.com", 1).expect("cast a");
        tally.cast("b@example.com", 5).expect("cast b");
        tally.cast("c@example.com", 3).expect("cast c");
        tally.cast("b@example.com", 2).expect("revote b");
        let users: Vec<&str> = tally.votes.iter().map(|v| v.user_id.as_str()).collect();
        assert_eq!(
            users,
            vec!["a@example.com", "b@example.com", "c@example.com"]
        );
        assert_eq!(tally.votes[1].vote, 2);
    }

    #[test]
    fn identical_revote_changes_nothing() {
        let mut tally = empty();
        tally.cast("a@example.com", 4).expect("cast");
        tally.cast("b@example.com", 1).expect("cast");
        let before = tally.clone();
        tally.cast("a@example.com", 4).expect("revote");
        assert_eq!(tally.count, before.count);
        assert_score(&tally, before.score);
        assert_eq!(tally.votes, before.votes);
    }

    #[test]
    fn score_is_mean_of_latest_vote_per_voter() {
        let mut tally = empty();
        let casts = [
            ("a@example.com", 5),
            ("b@example.com", 1),
            ("c@example.com", 3),
            ("a@example.com", 2),
            ("d@example.com", 4),
            ("b@example.com", 5),
        ];
        for (user, value) in casts {
            tally.cast(user, value).expect("cast");
        }
        // latest per voter: a=2, b=5, c=3, d=4
        assert_eq!(tally.count, 4);
        assert_eq!(tally.votes.len() as i32, tally.count);
        assert_score(&tally, (2.0 + 5.0 + 3.0 + 4.0) / 4.0);
    }

    #[test]
    fn desynced_tally_is_an_error_not_a_divide() {
        let mut tally = UrgencyTally::new(
            3.0,
            0,
            vec![UrgencyVote {
                user_id: "a@example.com".into(),
                vote: 3,
            }],
        );
        let err = tally.cast("a@example.com", 5).unwrap_err();
        assert!(err.to_string().contains("out of sync"));
    }
}
