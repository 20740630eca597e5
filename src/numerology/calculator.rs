use super::alphabet::{is_consonant, is_vowel, letter_value};
use super::{reduce_number, reduce_number_no_master, KARMIC_NUMBERS, MASTER_NUMBERS};
use crate::error::AgentError;
use crate::Result;
use chrono::{Datelike, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DATE_FORMAT: &str = "%d/%m/%Y";

/// Asia/Ho_Chi_Minh has no daylight saving
const VIETNAM_UTC_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestonePhases {
    pub milestone_1: u32,
    pub milestone_2: u32,
    pub milestone_3: u32,
    pub milestone_4: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Challenges {
    pub challenge_1: u32,
    pub challenge_2: u32,
    pub challenge_3: u32,
    pub challenge_4: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlignmentSignals {
    pub personal_year: u32,
    pub personal_month: u32,
    pub personal_day: u32,
}

/// Every indicator for one person
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumerologyProfile {
    pub day_of_birth: String,
    pub current_date: String,
    pub life_path: u32,
    pub life_purpose: u32,
    pub balance: u32,
    pub soul: u32,
    pub personality: u32,
    pub birth_day: u32,
    pub subconscious_strength: u32,
    pub maturity: u32,
    pub missing_aspects: Vec<u32>,
    pub shadow_challenge_code: String,
    pub passion: Vec<u32>,
    pub societal_adaptability_index: String,
    pub emotional_response_style: u32,
    pub lifepath_life_purpose_link: u32,
    pub soul_personality_link: u32,
    pub milestone_phase: MilestonePhases,
    pub challenge: Challenges,
    pub rational_thinking: u32,
    pub age_milestones: [u32; 4],
    pub alignment_signals: AlignmentSignals,
}

pub struct NumerologyCalculator {
    name: String,
    birth_date: NaiveDate,
    current_date: NaiveDate,
    name_numbers: Vec<u32>,
}

impl NumerologyCalculator {
    /// `dob` and `current_date` use dd/mm/yyyy. Without a current date,
    /// today in Vietnam is used.
    pub fn new(name: &str, dob: &str, current_date: Option<&str>) -> Result<Self> {
        let name = name.trim().to_string();
        let birth_date = parse_date(dob, "birth")?;
        let current_date = match current_date {
            Some(date) => parse_date(date, "current")?,
            None => today_in_vietnam(),
        };

        let name_numbers = name.chars().filter_map(letter_value).collect();

        Ok(Self {
            name,
            birth_date,
            current_date,
            name_numbers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn day(&self) -> u32 {
        self.birth_date.day()
    }

    fn month(&self) -> u32 {
        self.birth_date.month()
    }

    fn year(&self) -> u32 {
        self.birth_date.year().unsigned_abs()
    }

    fn name_parts(&self) -> Vec<&str> {
        self.name.split_whitespace().collect()
    }

    fn letters_sum(word: &str, keep: impl Fn(char, &str) -> bool) -> u32 {
        word.chars()
            .filter(|&c| keep(c, word))
            .filter_map(letter_value)
            .sum()
    }

    /// reduce(day + month + year), masters kept
    pub fn life_path(&self) -> u32 {
        reduce_number(self.day() + self.month() + self.year())
    }

    /// reduce(all letters of the full name), masters kept
    pub fn life_purpose(&self) -> u32 {
        reduce_number(self.name_numbers.iter().sum())
    }

    /// reduce(first letter of each name part), no masters
    pub fn balance(&self) -> u32 {
        let sum = self
            .name_parts()
            .iter()
            .filter_map(|part| part.chars().next())
            .filter_map(letter_value)
            .sum();
        reduce_number_no_master(sum)
    }

    /// reduce(vowels of the full name), masters kept
    pub fn soul(&self) -> u32 {
        let sum = self
            .name_parts()
            .iter()
            .map(|word| Self::letters_sum(word, is_vowel))
            .sum();
        reduce_number(sum)
    }

    /// reduce(consonants of the full name), masters kept
    pub fn personality(&self) -> u32 {
        let sum = self
            .name_parts()
            .iter()
            .map(|word| Self::letters_sum(word, is_consonant))
            .sum();
        reduce_number(sum)
    }

    pub fn birth_day(&self) -> u32 {
        reduce_number_no_master(self.day())
    }

    /// Count of distinct digits 1-9 present in the name
    pub fn subconscious_strength(&self) -> u32 {
        self.present_numbers().len() as u32
    }

    pub fn maturity(&self) -> u32 {
        reduce_number(self.life_path() + self.life_purpose())
    }

    fn present_numbers(&self) -> BTreeSet<u32> {
        self.name_numbers
            .iter()
            .copied()
            .filter(|n| (1..=9).contains(n))
            .collect()
    }

    /// Digits 1-9 absent from the name, ascending
    pub fn missing_aspects(&self) -> Vec<u32> {
        let present = self.present_numbers();
        (1..=9).filter(|n| !present.contains(n)).collect()
    }

    pub fn karmic_debt(&self) -> String {
        let mut debts = Vec::new();

        let life_path_sum = self.day() + self.month() + self.year();
        if KARMIC_NUMBERS.contains(&life_path_sum) {
            debts.push(format!("Life Path: {}", life_path_sum));
        }

        let life_purpose_sum: u32 = self.name_numbers.iter().sum();
        if KARMIC_NUMBERS.contains(&life_purpose_sum) {
            debts.push(format!("Life Purpose: {}", life_purpose_sum));
        }

        if debts.is_empty() {
            "No karmic debt detected".to_string()
        } else {
            debts.join(", ")
        }
    }

    /// Most frequent digits in the name, ascending
    pub fn passion(&self) -> Vec<u32> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for n in self.name_numbers.iter().filter(|n| (1..=9).contains(*n)) {
            *counts.entry(*n).or_insert(0) += 1;
        }

        let Some(max) = counts.values().copied().max() else {
            return Vec::new();
        };

        counts
            .into_iter()
            .filter(|(_, count)| *count == max)
            .map(|(n, _)| n)
            .collect()
    }

    pub fn societal_adaptability(&self) -> &'static str {
        match self.name_parts().len() {
            0..=2 => "High adaptability - Simple name structure",
            3 => "Moderate adaptability - Balanced name structure",
            _ => "Lower adaptability - Complex name structure",
        }
    }

    /// reduce(vowels of the first name part), no masters
    pub fn emotional_response_style(&self) -> u32 {
        let parts = self.name_parts();
        let Some(first) = parts.first() else {
            return 0;
        };
        reduce_number_no_master(Self::letters_sum(first, is_vowel))
    }

    pub fn lifepath_life_purpose_link(&self) -> u32 {
        reduce_number_no_master(self.life_path() + self.life_purpose())
    }

    pub fn soul_personality_link(&self) -> u32 {
        reduce_number_no_master(self.soul() + self.personality())
    }

    pub fn milestone_phases(&self) -> MilestonePhases {
        let milestone_1 = reduce_number_no_master(self.month());
        let milestone_2 = reduce_number_no_master(self.day());
        let milestone_3 = reduce_number_no_master(self.year());
        let milestone_4 = reduce_number_no_master(milestone_1 + milestone_2 + milestone_3);

        MilestonePhases {
            milestone_1,
            milestone_2,
            milestone_3,
            milestone_4,
        }
    }

    pub fn challenges(&self) -> Challenges {
        let m = self.milestone_phases();

        let challenge_1 = m.milestone_1.abs_diff(m.milestone_2);
        let challenge_2 = m.milestone_3.abs_diff(m.milestone_1);

        Challenges {
            challenge_1,
            challenge_2,
            challenge_3: challenge_1.abs_diff(challenge_2),
            challenge_4: m.milestone_2.abs_diff(m.milestone_3),
        }
    }

    /// reduce(day + letters of the given name), masters kept.
    /// The given name is the last name part.
    pub fn rational_thinking(&self) -> u32 {
        let parts = self.name_parts();
        let Some(given) = parts.last() else {
            return 0;
        };
        reduce_number(self.day() + Self::letters_sum(given, |_, _| true))
    }

    /// Ages at which each milestone phase ends
    pub fn age_milestones(&self) -> [u32; 4] {
        let life_path = self.life_path();
        let start = if MASTER_NUMBERS.contains(&life_path) {
            32
        } else {
            36u32.saturating_sub(life_path)
        };
        [start, start + 9, start + 18, start + 27]
    }

    /// Personal year, month and day for the current date
    pub fn alignment_signals(&self) -> AlignmentSignals {
        let current_year = self.current_date.year().unsigned_abs();
        let current_month = self.current_date.month();
        let current_day = self.current_date.day();

        let mut personal_year = self.day() + self.month() + current_year;
        let before_birthday = current_month < self.month()
            || (current_month == self.month() && current_day < self.day());
        if before_birthday {
            personal_year -= 1;
        }
        let personal_year = reduce_number_no_master(personal_year);

        AlignmentSignals {
            personal_year,
            personal_month: reduce_number_no_master(current_month + personal_year),
            personal_day: reduce_number_no_master(current_day + current_month + personal_year),
        }
    }

    pub fn profile(&self) -> NumerologyProfile {
        NumerologyProfile {
            day_of_birth: self.birth_date.format(DATE_FORMAT).to_string(),
            current_date: self.current_date.format(DATE_FORMAT).to_string(),
            life_path: self.life_path(),
            life_purpose: self.life_purpose(),
            balance: self.balance(),
            soul: self.soul(),
            personality: self.personality(),
            birth_day: self.birth_day(),
            subconscious_strength: self.subconscious_strength(),
            maturity: self.maturity(),
            missing_aspects: self.missing_aspects(),
            shadow_challenge_code: self.karmic_debt(),
            passion: self.passion(),
            societal_adaptability_index: self.societal_adaptability().to_string(),
            emotional_response_style: self.emotional_response_style(),
            lifepath_life_purpose_link: self.lifepath_life_purpose_link(),
            soul_personality_link: self.soul_personality_link(),
            milestone_phase: self.milestone_phases(),
            challenge: self.challenges(),
            rational_thinking: self.rational_thinking(),
            age_milestones: self.age_milestones(),
            alignment_signals: self.alignment_signals(),
        }
    }
}

fn parse_date(value: &str, kind: &'static str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| AgentError::InvalidDate {
        kind,
        value: value.to_string(),
    })
}

fn today_in_vietnam() -> NaiveDate {
    FixedOffset::east_opt(VIETNAM_UTC_OFFSET_SECS)
        .map(|tz| Utc::now().with_timezone(&tz).date_naive())
        .unwrap_or_else(|| Utc::now().date_naive())
}
