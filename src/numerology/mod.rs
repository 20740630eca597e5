//! Vietnamese numerology calculator
//!
//! Deterministic numbers derived from a full name and a date of birth.
//! Master numbers (11, 22, 33) survive reduction unless a formula says
//! otherwise.

pub mod alphabet;
pub mod calculator;

pub use calculator::{
    AlignmentSignals, Challenges, MilestonePhases, NumerologyCalculator, NumerologyProfile,
};

pub const MASTER_NUMBERS: [u32; 3] = [11, 22, 33];
pub const KARMIC_NUMBERS: [u32; 4] = [13, 14, 16, 19];

fn digit_sum(mut n: u32) -> u32 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}

/// Reduce to a single digit, stopping at a master number.
///
/// 29 → 11 (kept), 38 → 11 (kept), 2033 → 8.
pub fn reduce_number(n: u32) -> u32 {
    reduce_number_with_masters(n, &MASTER_NUMBERS)
}

/// Reduce to a single digit, stopping at any of `masters`
pub fn reduce_number_with_masters(mut n: u32, masters: &[u32]) -> u32 {
    while n > 9 {
        if masters.contains(&n) {
            return n;
        }
        n = digit_sum(n);
    }
    n
}

/// Reduce to a single digit with no master numbers
pub fn reduce_number_no_master(mut n: u32) -> u32 {
    while n > 9 {
        n = digit_sum(n);
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduce_keeps_master_numbers() {
        assert_eq!(reduce_number(29), 11);
        assert_eq!(reduce_number(38), 11);
        assert_eq!(reduce_number(22), 22);
        assert_eq!(reduce_number(2033), 8);
        assert_eq!(reduce_number(7), 7);
    }

    #[test]
    fn test_reduce_without_masters() {
        assert_eq!(reduce_number_no_master(38), 2);
        assert_eq!(reduce_number_no_master(29), 2);
        assert_eq!(reduce_number_no_master(0), 0);
    }

    #[test]
    fn test_custom_masters() {
        assert_eq!(reduce_number_with_masters(38, &[]), 2);
        assert_eq!(reduce_number_with_masters(44, &[44]), 44);
    }
}
