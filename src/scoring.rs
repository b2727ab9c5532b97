//! Pure scoring rule applied to every accepted tap.

use crate::dao::models::Role;

/// Points awarded for an ordinary tap.
pub const BASE_TAP_POINTS: i64 = 1;
/// Points awarded when a tap lands on the bonus interval.
pub const BONUS_TAP_POINTS: i64 = 10;
/// Every this-many-th tap of a player in a round is a bonus tap.
pub const BONUS_TAP_INTERVAL: i64 = 11;

/// Point value of the tap that brought a player's per-round counter to
/// `new_taps`.
///
/// The counter is 1-based: the first tap of a round has `new_taps == 1`,
/// and the bonus starts at tap [`BONUS_TAP_INTERVAL`]. Members of
/// [`Role::Nikita`] always earn zero, though their taps are still counted.
pub fn points_for_tap(new_taps: i64, role: Role) -> i64 {
    if !role.scores() {
        return 0;
    }
    if new_taps >= BONUS_TAP_INTERVAL && new_taps % BONUS_TAP_INTERVAL == 0 {
        BONUS_TAP_POINTS
    } else {
        BASE_TAP_POINTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_taps_score_one() {
        assert_eq!(points_for_tap(1, Role::Survivor), 1);
        assert_eq!(points_for_tap(10, Role::Survivor), 1);
        assert_eq!(points_for_tap(12, Role::Survivor), 1);
    }

    #[test]
    fn a_zero_count_never_earns_the_bonus() {
        assert_eq!(points_for_tap(0, Role::Survivor), 1);
        assert_eq!(points_for_tap(0, Role::Nikita), 0);
    }

    #[test]
    fn every_eleventh_tap_scores_ten() {
        assert_eq!(points_for_tap(11, Role::Survivor), 10);
        assert_eq!(points_for_tap(22, Role::Survivor), 10);
        assert_eq!(points_for_tap(110, Role::Survivor), 10);
    }

    #[test]
    fn nikita_never_scores() {
        for taps in 1..=33 {
            assert_eq!(points_for_tap(taps, Role::Nikita), 0);
        }
    }

    #[test]
    fn admins_score_like_survivors() {
        assert_eq!(points_for_tap(11, Role::Admin), 10);
        assert_eq!(points_for_tap(7, Role::Admin), 1);
    }

    #[test]
    fn eleven_taps_total_twenty_points() {
        let total: i64 = (1..=11).map(|n| points_for_tap(n, Role::Survivor)).sum();
        assert_eq!(total, 20);
    }
}
