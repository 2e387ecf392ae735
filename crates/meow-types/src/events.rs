use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tables whose changes can be subscribed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Moods,
    Answers,
}

/// Events sent over the realtime gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RealtimeEvent {
    /// Server acknowledges the connection
    Ready { connection_id: Uuid },

    /// Server applied a `Subscribe` command
    Subscribed { space_id: Uuid, tables: Vec<Table> },

    /// A mood row was inserted
    MoodInserted {
        space_id: Uuid,
        mood_id: Uuid,
        user_id: Uuid,
    },

    /// An answer row was inserted or overwritten
    AnswerChanged {
        space_id: Uuid,
        question_id: Uuid,
        user_id: Uuid,
    },
}

impl RealtimeEvent {
    /// The space and table a change event is scoped to. Acknowledgements are not changes.
    pub fn scope(&self) -> Option<(Uuid, Table)> {
        match self {
            Self::MoodInserted { space_id, .. } => Some((*space_id, Table::Moods)),
            Self::AnswerChanged { space_id, .. } => Some((*space_id, Table::Answers)),
            Self::Ready { .. } | Self::Subscribed { .. } => None,
        }
    }
}

/// Commands sent FROM client TO server over the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RealtimeCommand {
    /// Replace this connection's subscription.
    Subscribe { space_id: Uuid, tables: Vec<Table> },

    /// Stop receiving change events.
    Unsubscribe,
}
