//! Maps a learner's self-rating on a revealed item to one of two outcomes:
//! mark it complete, or append a clone to the requeue tail for a second pass
//! within the same session.

use serde::{Deserialize, Serialize};

#[derive(
    Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Ord, PartialOrd,
)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Mastered,
    Partial,
    Struggling,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RatingOutcome {
    pub completes: bool,
    pub requeues: bool,
}

impl Rating {
    pub fn outcome(self) -> RatingOutcome {
        match self {
            Rating::Mastered => RatingOutcome {
                completes: true,
                requeues: false,
            },
            Rating::Partial | Rating::Struggling => RatingOutcome {
                completes: false,
                requeues: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mastered_completes_without_requeueing() {
        let outcome = Rating::Mastered.outcome();
        assert!(outcome.completes);
        assert!(!outcome.requeues);
    }

    #[test]
    fn weak_ratings_requeue_without_completing() {
        for rating in [Rating::Partial, Rating::Struggling] {
            let outcome = rating.outcome();
            assert!(!outcome.completes);
            assert!(outcome.requeues);
        }
    }

    #[test]
    fn ratings_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&Rating::Struggling).unwrap(),
            "\"struggling\""
        );
    }
}
