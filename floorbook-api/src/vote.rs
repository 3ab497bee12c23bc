#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteDirection {
    Like,
    Dislike,
}

impl VoteDirection {
    /// Representation in the `comment_votes.direction` column
    pub fn as_i16(self) -> i16 {
        match self {
            VoteDirection::Like => 1,
            VoteDirection::Dislike => -1,
        }
    }

    pub fn from_i16(v: i16) -> Option<VoteDirection> {
        match v {
            1 => Some(VoteDirection::Like),
            -1 => Some(VoteDirection::Dislike),
            _ => None,
        }
    }
}

/// Vote of one user on one comment
///
/// A single state per (comment, user) makes liking and disliking at the same
/// time unrepresentable.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteState {
    #[default]
    None,
    Liked,
    Disliked,
}

impl VoteState {
    /// Voting in the direction already held withdraws the vote, any other
    /// vote switches to the requested direction.
    pub fn toggle(self, direction: VoteDirection) -> VoteState {
        match (self, direction) {
            (VoteState::Liked, VoteDirection::Like) => VoteState::None,
            (VoteState::Disliked, VoteDirection::Dislike) => VoteState::None,
            (_, VoteDirection::Like) => VoteState::Liked,
            (_, VoteDirection::Dislike) => VoteState::Disliked,
        }
    }

    pub fn direction(self) -> Option<VoteDirection> {
        match self {
            VoteState::None => None,
            VoteState::Liked => Some(VoteDirection::Like),
            VoteState::Disliked => Some(VoteDirection::Dislike),
        }
    }

    pub fn from_direction(direction: Option<VoteDirection>) -> VoteState {
        match direction {
            None => VoteState::None,
            Some(VoteDirection::Like) => VoteState::Liked,
            Some(VoteDirection::Dislike) => VoteState::Disliked,
        }
    }
}

/// Result of a vote, enough for a client to refresh without reading again
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct VoteTally {
    pub like_count: u64,
    pub dislike_count: u64,
    pub user_liked: bool,
    pub user_disliked: bool,
}

impl VoteTally {
    pub fn new(like_count: u64, dislike_count: u64, state: VoteState) -> VoteTally {
        VoteTally {
            like_count,
            dislike_count,
            user_liked: state == VoteState::Liked,
            user_disliked: state == VoteState::Disliked,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn transitions() {
        use VoteDirection::*;
        use VoteState::*;
        assert_eq!(VoteState::None.toggle(Like), Liked);
        assert_eq!(Liked.toggle(Like), VoteState::None);
        assert_eq!(Disliked.toggle(Like), Liked);
        assert_eq!(VoteState::None.toggle(Dislike), Disliked);
        assert_eq!(Disliked.toggle(Dislike), VoteState::None);
        assert_eq!(Liked.toggle(Dislike), Disliked);
    }

    #[test]
    fn direction_column_mapping() {
        for d in [VoteDirection::Like, VoteDirection::Dislike] {
            assert_eq!(VoteDirection::from_i16(d.as_i16()), Some(d));
        }
        assert_eq!(VoteDirection::from_i16(0), None);
    }

    // Compare against the two-set bookkeeping it replaces
    #[test]
    fn agrees_with_like_and_dislike_sets() {
        bolero::check!()
            .with_type::<Vec<(u8, bool)>>()
            .for_each(|votes| {
                let mut likes = HashSet::new();
                let mut dislikes = HashSet::new();
                let mut states = std::collections::HashMap::<u8, VoteState>::new();
                for &(user, is_like) in votes {
                    let user = user % 8;
                    let (same, other) = match is_like {
                        true => (&mut likes, &mut dislikes),
                        false => (&mut dislikes, &mut likes),
                    };
                    if !same.remove(&user) {
                        same.insert(user);
                        other.remove(&user);
                    }
                    let direction = match is_like {
                        true => VoteDirection::Like,
                        false => VoteDirection::Dislike,
                    };
                    let state = states.entry(user).or_default();
                    *state = state.toggle(direction);
                }
                assert!(likes.is_disjoint(&dislikes));
                for (user, state) in states {
                    assert_eq!(state == VoteState::Liked, likes.contains(&user));
                    assert_eq!(state == VoteState::Disliked, dislikes.contains(&user));
                }
            })
    }

    #[test]
    fn tally_keys_match_comment_keys() {
        let tally = serde_json::to_value(VoteTally::new(2, 1, VoteState::Liked)).unwrap();
        assert_eq!(
            tally,
            serde_json::json!({
                "like_count": 2,
                "dislike_count": 1,
                "user_liked": true,
                "user_disliked": false,
            })
        );
    }
}
