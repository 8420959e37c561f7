use serde::Serialize;

use super::presence::Presence;
use crate::core::ActorId;

/// Path of the shared text field
pub const CONTENT_PATH: &str = "$.content";

/// Path of the document root
pub const ROOT_PATH: &str = "$";

/// Replacement value of an edit operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditValue {
    pub content: String,
}

/// Operation reported to subscribers.
///
/// Edit operations within one event are sequential: the offsets of each one
/// are in the coordinates left behind by the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OperationInfo {
    Edit {
        path: String,
        from: i64,
        to: i64,
        value: EditValue,
    },
    Set {
        path: String,
        key: String,
    },
}

impl OperationInfo {
    pub fn edit(from: usize, to: usize, content: impl Into<String>) -> Self {
        OperationInfo::Edit {
            path: CONTENT_PATH.to_string(),
            from: from as i64,
            to: to as i64,
            value: EditValue {
                content: content.into(),
            },
        }
    }

    pub fn path(&self) -> &str {
        match self {
            OperationInfo::Edit { path, .. } | OperationInfo::Set { path, .. } => path,
        }
    }
}

/// Event emitted by a shared document
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DocEvent {
    /// Committed by this document's own `update`
    LocalChange {
        actor: ActorId,
        operations: Vec<OperationInfo>,
    },
    /// Integrated from another participant
    RemoteChange {
        actor: ActorId,
        operations: Vec<OperationInfo>,
    },
    /// Another participant's presence was updated, or removed on detach
    PresenceChanged {
        actor: ActorId,
        #[serde(skip)]
        presence: Option<Presence>,
    },
}

impl DocEvent {
    pub fn operations(&self) -> &[OperationInfo] {
        match self {
            DocEvent::LocalChange { operations, .. } | DocEvent::RemoteChange { operations, .. } => {
                operations
            }
            DocEvent::PresenceChanged { .. } => &[],
        }
    }
}

/// What a subscriber listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    All,
    Presence,
    /// Change events restricted to operations under this path
    Path(String),
}

impl Topic {
    pub fn path(path: impl Into<String>) -> Self {
        Topic::Path(path.into())
    }

    /// The view of `event` this topic receives, if any
    pub(crate) fn filter(&self, event: &DocEvent) -> Option<DocEvent> {
        match (self, event) {
            (Topic::All, _) => Some(event.clone()),
            (Topic::Presence, DocEvent::PresenceChanged { .. }) => Some(event.clone()),
            (Topic::Presence, _) => None,
            (Topic::Path(_), DocEvent::PresenceChanged { .. }) => None,
            (Topic::Path(target), DocEvent::LocalChange { actor, operations }) => {
                let operations = matching(operations, target)?;
                Some(DocEvent::LocalChange {
                    actor: *actor,
                    operations,
                })
            }
            (Topic::Path(target), DocEvent::RemoteChange { actor, operations }) => {
                let operations = matching(operations, target)?;
                Some(DocEvent::RemoteChange {
                    actor: *actor,
                    operations,
                })
            }
        }
    }
}

fn matching(operations: &[OperationInfo], target: &str) -> Option<Vec<OperationInfo>> {
    let matched: Vec<OperationInfo> = operations
        .iter()
        .filter(|op| op.path().starts_with(target))
        .cloned()
        .collect();

    if matched.is_empty() {
        None
    } else {
        Some(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_topic_filters_operations() {
        let event = DocEvent::RemoteChange {
            actor: ActorId(7),
            operations: vec![
                OperationInfo::Set {
                    path: ROOT_PATH.to_string(),
                    key: "content".to_string(),
                },
                OperationInfo::edit(0, 0, "A"),
            ],
        };

        let filtered = Topic::path(CONTENT_PATH).filter(&event).unwrap();
        assert_eq!(filtered.operations(), &[OperationInfo::edit(0, 0, "A")]);

        assert!(Topic::Presence.filter(&event).is_none());
        assert!(Topic::path("$.title").filter(&event).is_none());
    }

    #[test]
    fn test_event_json_shape() {
        let event = DocEvent::RemoteChange {
            actor: ActorId(1),
            operations: vec![OperationInfo::edit(1, 3, "xy")],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "remote-change");
        assert_eq!(json["operations"][0]["type"], "edit");
        assert_eq!(json["operations"][0]["from"], 1);
        assert_eq!(json["operations"][0]["value"]["content"], "xy");
    }
}
