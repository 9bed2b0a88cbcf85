use crate::api::{Votable, Vote, Votes};

pub trait VotableExt: Sized {
    /// Returns a copy of `self` with the viewer's `vote` applied. Voting the
    /// same way twice retracts the vote.
    fn apply_vote(&self, vote: Vote) -> Self;
}

impl<T: Votable + Clone> VotableExt for T {
    fn apply_vote(&self, vote: Vote) -> T {
        let mut res = self.clone();
        *res.votes_mut() = tally(self.votes(), vote);
        res
    }
}

fn tally(current: &Votes, vote: Vote) -> Votes {
    let mut res = *current;

    // Saturate so that counters inconsistent with viewer_vote cannot underflow
    match current.viewer_vote {
        Some(Vote::Up) => res.upvotes = res.upvotes.saturating_sub(1),
        Some(Vote::Down) => res.downvotes = res.downvotes.saturating_sub(1),
        None => (),
    }

    if current.viewer_vote == Some(vote) {
        res.viewer_vote = None;
        return res;
    }

    res.viewer_vote = Some(vote);
    match vote {
        Vote::Up => res.upvotes += 1,
        Vote::Down => res.downvotes += 1,
    }
    res
}
