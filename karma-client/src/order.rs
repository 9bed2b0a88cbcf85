use chrono::Duration;

use crate::api::{SortMode, Time, Votable};

const MILLIS_PER_HOUR: f64 = 3_600_000.;

pub trait OrderExt {
    /// Numeric key of `entity` under this mode at instant `now`, higher ranks first
    fn rank_key<T: Votable>(&self, entity: &T, now: Time) -> f64;

    /// Whether `entity` is eligible at all under this mode at instant `now`
    fn admits<T: Votable>(&self, entity: &T, now: Time) -> bool;

    /// Drops the entities this mode does not admit, then sorts the rest by
    /// decreasing rank key. Entities with equal keys keep their relative order.
    fn order<T: Votable>(&self, entities: Vec<T>, now: Time) -> Vec<T>;
}

impl OrderExt for SortMode {
    fn rank_key<T: Votable>(&self, e: &T, now: Time) -> f64 {
        match self {
            SortMode::New => e.date().timestamp_millis() as f64,
            SortMode::Top | SortMode::TopWeek => e.score() as f64,
            SortMode::Hot => e.score() as f64 + 0.5 * e.comment_count() as f64,
            SortMode::Rising => {
                let age_hours = (now - e.date()).num_milliseconds() as f64 / MILLIS_PER_HOUR;
                e.score() as f64 / age_hours.max(1.)
            }
            SortMode::Controversial => {
                let (up, down) = (e.votes().upvotes, e.votes().downvotes);
                let (low, high) = (up.min(down) as f64, up.max(down) as f64);
                if low == 0. {
                    0.
                } else {
                    // volume of the minority side, weighed by how balanced the split is
                    low * (low / high)
                }
            }
        }
    }

    fn admits<T: Votable>(&self, e: &T, now: Time) -> bool {
        match self {
            SortMode::Rising => now - e.date() < Duration::hours(24),
            SortMode::TopWeek => now - e.date() < Duration::days(7),
            SortMode::Hot | SortMode::New | SortMode::Top | SortMode::Controversial => true,
        }
    }

    fn order<T: Votable>(&self, entities: Vec<T>, now: Time) -> Vec<T> {
        let mut keyed = entities
            .into_iter()
            .filter(|e| self.admits(e, now))
            .map(|e| (self.rank_key(&e, now), e))
            .collect::<Vec<_>>();
        // sort_by is stable
        keyed.sort_by(|(a, _), (b, _)| b.total_cmp(a));
        keyed.into_iter().map(|(_, e)| e).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::Post,
        test_util::{at_hour, post},
    };

    fn ids(posts: &[Post]) -> Vec<u64> {
        posts.iter().map(|p| p.id.0).collect()
    }

    #[test]
    fn hot_counts_comments_for_half() {
        let now = at_hour(0);
        let a = post(1, 5, 1, 4, now);
        let b = post(2, 3, 0, 10, now);
        assert_eq!(SortMode::Hot.rank_key(&a, now), 6.);
        assert_eq!(SortMode::Hot.rank_key(&b, now), 8.);
        assert_eq!(ids(&SortMode::Hot.order(vec![a, b], now)), vec![2, 1]);
    }

    #[test]
    fn new_is_most_recent_first() {
        let now = at_hour(100);
        let posts = vec![
            post(1, 0, 0, 0, at_hour(10)),
            post(2, 0, 0, 0, at_hour(30)),
            post(3, 0, 0, 0, at_hour(20)),
        ];
        assert_eq!(ids(&SortMode::New.order(posts, now)), vec![2, 3, 1]);
    }

    #[test]
    fn top_ignores_age_and_comments() {
        let now = at_hour(10_000);
        let posts = vec![
            post(1, 10, 0, 500, at_hour(9_999)),
            post(2, 30, 5, 0, at_hour(0)),
            post(3, 2, 8, 0, at_hour(5_000)),
        ];
        assert_eq!(ids(&SortMode::Top.order(posts, now)), vec![2, 1, 3]);
    }

    #[test]
    fn top_keeps_input_order_on_ties() {
        let now = at_hour(0);
        let posts = vec![
            post(1, 4, 1, 2, now),
            post(2, 10, 0, 0, now),
            post(3, 3, 0, 2, now),
            post(4, 6, 3, 2, now),
        ];
        assert_eq!(ids(&SortMode::Top.order(posts, now)), vec![2, 1, 3, 4]);
    }

    #[test]
    fn top_week_drops_old_posts() {
        let now = at_hour(1000);
        let posts = vec![
            post(1, 100, 0, 0, at_hour(1000 - 7 * 24)),
            post(2, 1, 0, 0, at_hour(1000 - 7 * 24 + 1)),
        ];
        assert_eq!(ids(&SortMode::TopWeek.order(posts, now)), vec![2]);
    }

    #[test]
    fn rising_excludes_older_than_a_day() {
        let now = at_hour(100);
        let old = post(1, 1_000_000, 0, 0, at_hour(75));
        let fresh = post(2, 1, 0, 0, at_hour(99));
        assert!(!SortMode::Rising.admits(&old, now));
        assert!(SortMode::Rising.admits(&fresh, now));
        assert_eq!(ids(&SortMode::Rising.order(vec![old, fresh], now)), vec![2]);
    }

    #[test]
    fn rising_floors_age_at_one_hour() {
        let now = at_hour(100);
        let just_posted = post(1, 6, 0, 0, now);
        let two_hours = post(2, 10, 0, 0, at_hour(98));
        assert_eq!(SortMode::Rising.rank_key(&just_posted, now), 6.);
        assert_eq!(SortMode::Rising.rank_key(&two_hours, now), 5.);
        assert_eq!(
            ids(&SortMode::Rising.order(vec![two_hours, just_posted], now)),
            vec![1, 2]
        );
    }

    #[test]
    fn controversial_favors_balanced_volume() {
        let now = at_hour(0);
        let balanced = post(1, 50, 48, 0, now);
        let lopsided = post(2, 500, 10, 0, now);
        let one_sided = post(3, 1000, 0, 0, now);
        let small_tie = post(4, 2, 2, 0, now);
        assert_eq!(SortMode::Controversial.rank_key(&one_sided, now), 0.);
        assert_eq!(SortMode::Controversial.rank_key(&small_tie, now), 2.);
        assert_eq!(
            ids(&SortMode::Controversial.order(
                vec![one_sided, small_tie, lopsided, balanced],
                now
            )),
            vec![1, 4, 2, 3]
        );
    }

    #[test]
    fn fuzz_rank_key_is_deterministic() {
        bolero::check!()
            .with_type::<(SortMode, u16, u16, u16, i16)>()
            .cloned()
            .for_each(|(mode, up, down, comments, age)| {
                let now = at_hour(0);
                let p = post(1, up as u64, down as u64, comments as u64, at_hour(-(age as i64)));
                let key = mode.rank_key(&p, now);
                assert!(!key.is_nan());
                assert_eq!(key.to_bits(), mode.rank_key(&p.clone(), now).to_bits());
            })
    }
}
