use serde::Serialize;

use tally_core::model::{AggregateStat, AnswerEvent, Session};
use tally_core::stats::{self, StatTable};

/// Session paired with its position in the store.
///
/// The position is what deletion takes, so it stays correct even when the
/// list has been filtered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionListItem {
    pub index: usize,
    #[serde(flatten)]
    pub session: Session,
}

/// Sessions matching a subject filter plus their combined totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionListItem>,
    #[serde(rename = "resumo")]
    pub summary: AggregateStat,
}

impl SessionList {
    /// Keep sessions whose subject contains `filter`, ignoring case.
    /// A missing or blank filter keeps everything.
    #[must_use]
    pub fn build(sessions: Vec<Session>, filter: Option<&str>) -> Self {
        let needle = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        let mut summary = AggregateStat::default();
        let sessions = sessions
            .into_iter()
            .enumerate()
            .filter(|(_, s)| {
                needle
                    .as_deref()
                    .is_none_or(|n| s.subject().to_lowercase().contains(n))
            })
            .map(|(index, session)| {
                summary.add(session.correct(), session.incorrect());
                SessionListItem { index, session }
            })
            .collect();

        Self { sessions, summary }
    }
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub sessions: Vec<SessionListItem>,
    #[serde(rename = "stats_por_materia")]
    pub by_subject: StatTable,
    #[serde(rename = "historico")]
    pub recent: Vec<AnswerEvent>,
    #[serde(rename = "ano_atual")]
    pub current_year: i32,
}

impl Dashboard {
    #[must_use]
    pub fn build(sessions: Vec<Session>, recent: Vec<AnswerEvent>, current_year: i32) -> Self {
        let by_subject = stats::sessions_by_subject(&sessions);
        let sessions = sessions
            .into_iter()
            .enumerate()
            .map(|(index, session)| SessionListItem { index, session })
            .collect();
        Self {
            sessions,
            by_subject,
            recent,
            current_year,
        }
    }
}
