use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::model::AnswerKind;

/// Percentage of correct answers rounded to one decimal place; 0 when `total` is 0.
#[must_use]
pub fn accuracy_rate(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(correct) * 1000.0 / f64::from(total)).round() / 10.0
}

/// Derived tally for one statistics bucket. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStat {
    correct: u32,
    incorrect: u32,
}

impl AggregateStat {
    #[must_use]
    pub fn new(correct: u32, incorrect: u32) -> Self {
        Self { correct, incorrect }
    }

    pub fn record(&mut self, kind: AnswerKind) {
        match kind {
            AnswerKind::Correct => self.correct = self.correct.saturating_add(1),
            AnswerKind::Incorrect => self.incorrect = self.incorrect.saturating_add(1),
        }
    }

    pub fn add(&mut self, correct: u32, incorrect: u32) {
        self.correct = self.correct.saturating_add(correct);
        self.incorrect = self.incorrect.saturating_add(incorrect);
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    #[must_use]
    pub fn accuracy_rate(&self) -> f64 {
        accuracy_rate(self.correct, self.total())
    }
}

impl Serialize for AggregateStat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("AggregateStat", 4)?;
        s.serialize_field("acertos", &self.correct)?;
        s.serialize_field("erros", &self.incorrect)?;
        s.serialize_field("total", &self.total())?;
        s.serialize_field("taxa_acerto", &self.accuracy_rate())?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_rounds_to_one_decimal() {
        assert!((accuracy_rate(2, 3) - 66.7).abs() < 1e-9);
        assert!((accuracy_rate(1, 3) - 33.3).abs() < 1e-9);
        assert!((accuracy_rate(7, 10) - 70.0).abs() < 1e-9);
        assert!(accuracy_rate(0, 0).abs() < 1e-9);
    }

    #[test]
    fn record_counts_by_kind() {
        let mut stat = AggregateStat::default();
        stat.record(AnswerKind::Correct);
        stat.record(AnswerKind::Incorrect);
        stat.record(AnswerKind::Correct);

        assert_eq!(stat.correct(), 2);
        assert_eq!(stat.incorrect(), 1);
        assert_eq!(stat.total(), 3);
    }
}
