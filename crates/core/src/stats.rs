//! Grouped statistics over committed sessions and the persisted answer history.
//!
//! Everything here is pure: the same input yields the same numbers no matter
//! how it is ordered.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{AggregateStat, AnswerEvent, QuestionMeta, Session};

/// Bucket key → derived stat. Ordered so output is stable.
pub type StatTable = BTreeMap<String, AggregateStat>;

/// A field of the question metadata used to group answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Subject,
    Topic,
    ExamBoard,
    Year,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Subject,
        Dimension::Topic,
        Dimension::ExamBoard,
        Dimension::Year,
    ];

    /// Bucket used when the event does not carry a value for this dimension.
    #[must_use]
    pub fn unspecified(self) -> &'static str {
        match self {
            Dimension::Subject | Dimension::ExamBoard => "Não especificada",
            Dimension::Topic | Dimension::Year => "Não especificado",
        }
    }

    #[must_use]
    pub fn value_of(self, question: &QuestionMeta) -> Option<&str> {
        let raw = match self {
            Dimension::Subject => question.subject.as_deref(),
            Dimension::Topic => question.topic.as_deref(),
            Dimension::ExamBoard => question.exam_board.as_deref(),
            Dimension::Year => question.year.as_deref(),
        };
        raw.map(str::trim).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn bucket_of(self, question: &QuestionMeta) -> &str {
        self.value_of(question).unwrap_or(self.unspecified())
    }
}

/// Per-dimension breakdown of the answer history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailedStats {
    #[serde(rename = "por_materia")]
    pub by_subject: StatTable,
    #[serde(rename = "por_assunto")]
    pub by_topic: StatTable,
    #[serde(rename = "por_banca")]
    pub by_exam_board: StatTable,
    #[serde(rename = "por_ano")]
    pub by_year: StatTable,
    #[serde(skip)]
    pub total_events: usize,
}

impl DetailedStats {
    #[must_use]
    pub fn table(&self, dimension: Dimension) -> &StatTable {
        match dimension {
            Dimension::Subject => &self.by_subject,
            Dimension::Topic => &self.by_topic,
            Dimension::ExamBoard => &self.by_exam_board,
            Dimension::Year => &self.by_year,
        }
    }

    fn table_mut(&mut self, dimension: Dimension) -> &mut StatTable {
        match dimension {
            Dimension::Subject => &mut self.by_subject,
            Dimension::Topic => &mut self.by_topic,
            Dimension::ExamBoard => &mut self.by_exam_board,
            Dimension::Year => &mut self.by_year,
        }
    }
}

/// Sum session tallies per subject.
#[must_use]
pub fn sessions_by_subject(sessions: &[Session]) -> StatTable {
    let mut table = StatTable::new();
    for session in sessions {
        table
            .entry(session.subject().to_owned())
            .or_default()
            .add(session.correct(), session.incorrect());
    }
    table
}

/// Group events by a single dimension.
#[must_use]
pub fn events_by(events: &[AnswerEvent], dimension: Dimension) -> StatTable {
    let mut table = StatTable::new();
    for event in events {
        let bucket = dimension.bucket_of(event.question());
        match table.get_mut(bucket) {
            Some(stat) => stat.record(event.kind()),
            None => {
                let mut stat = AggregateStat::default();
                stat.record(event.kind());
                table.insert(bucket.to_owned(), stat);
            }
        }
    }
    table
}

/// Four independent passes over the history, one per dimension.
#[must_use]
pub fn detailed(events: &[AnswerEvent]) -> DetailedStats {
    let mut stats = DetailedStats {
        total_events: events.len(),
        ..DetailedStats::default()
    };
    for dimension in Dimension::ALL {
        *stats.table_mut(dimension) = events_by(events, dimension);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerKind;
    use crate::time::{default_offset, fixed_clock};
    use proptest::prelude::*;
    use serde_json::json;

    fn event(kind: AnswerKind, meta: QuestionMeta) -> AnswerEvent {
        AnswerEvent::new(kind, fixed_clock().local_now(default_offset()), meta)
    }

    #[test]
    fn math_algebra_geometry_scenario() {
        let history = vec![
            event(
                AnswerKind::Correct,
                QuestionMeta::default().with_subject("Math").with_topic("Algebra"),
            ),
            event(
                AnswerKind::Incorrect,
                QuestionMeta::default().with_subject("Math").with_topic("Geometry"),
            ),
        ];

        let stats = detailed(&history);

        assert_eq!(stats.total_events, 2);
        assert_eq!(
            serde_json::to_value(stats.by_subject["Math"]).unwrap(),
            json!({"acertos": 1, "erros": 1, "total": 2, "taxa_acerto": 50.0})
        );
        assert_eq!(stats.by_topic.len(), 2);
        assert_eq!(stats.by_topic["Algebra"].total(), 1);
        assert_eq!(stats.by_topic["Geometry"].total(), 1);
    }

    #[test]
    fn missing_and_blank_values_use_dimension_sentinels() {
        let history = vec![
            event(AnswerKind::Correct, QuestionMeta::default().with_extra("id", "1")),
            event(
                AnswerKind::Incorrect,
                QuestionMeta::default().with_subject("  ").with_year(""),
            ),
        ];

        let stats = detailed(&history);

        for dimension in Dimension::ALL {
            let table = stats.table(dimension);
            assert_eq!(table.len(), 1);
            assert_eq!(table[dimension.unspecified()].total(), 2);
        }
        assert!(stats.by_subject.contains_key("Não especificada"));
        assert!(stats.by_year.contains_key("Não especificado"));
    }

    #[test]
    fn dimensions_are_grouped_independently() {
        let history = vec![
            event(
                AnswerKind::Correct,
                QuestionMeta::default()
                    .with_subject("Law")
                    .with_exam_board("FGV")
                    .with_year("2020"),
            ),
            event(
                AnswerKind::Correct,
                QuestionMeta::default()
                    .with_subject("Math")
                    .with_exam_board("FGV")
                    .with_year("2021"),
            ),
        ];

        let stats = detailed(&history);

        assert_eq!(stats.by_exam_board["FGV"].correct(), 2);
        assert_eq!(stats.by_subject.len(), 2);
        assert_eq!(stats.table(Dimension::Year).len(), 2);
    }

    #[test]
    fn sessions_group_by_subject() {
        let at = fixed_clock().local_now(default_offset());
        let sessions = vec![
            Session::new(at, "Math", "a", 3, 1),
            Session::new(at, "Math", "b", 2, 4),
            Session::new(at, "Law", "c", 0, 0),
        ];

        let table = sessions_by_subject(&sessions);

        assert_eq!(table["Math"].correct(), 5);
        assert_eq!(table["Math"].incorrect(), 5);
        assert_eq!(table["Math"].total(), 10);
        assert!((table["Math"].accuracy_rate() - 50.0).abs() < 1e-9);
        assert!(table["Law"].accuracy_rate().abs() < 1e-9);
    }

    fn arb_event() -> impl Strategy<Value = AnswerEvent> {
        (
            any::<bool>(),
            prop::option::of(prop::sample::select(vec!["Math", "Law", "History"])),
            prop::option::of(prop::sample::select(vec!["A", "B"])),
            prop::option::of(prop::sample::select(vec!["FGV", "CESPE"])),
            prop::option::of(prop::sample::select(vec!["2019", "2020"])),
        )
            .prop_map(|(right, subject, topic, board, year)| {
                let meta = QuestionMeta {
                    subject: subject.map(str::to_owned),
                    topic: topic.map(str::to_owned),
                    exam_board: board.map(str::to_owned),
                    year: year.map(str::to_owned),
                    ..QuestionMeta::default()
                };
                let kind = if right {
                    AnswerKind::Correct
                } else {
                    AnswerKind::Incorrect
                };
                event(kind, meta)
            })
    }

    proptest! {
        #[test]
        fn aggregation_ignores_order(
            (events, shuffled) in proptest::collection::vec(arb_event(), 0..40)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            prop_assert_eq!(detailed(&events), detailed(&shuffled));
        }
    }
}
