//! Conflict decisions as data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How to handle a destination that already holds an item with the same name.
///
/// `DetailedPlan` is only meaningful for directory copies and nests exactly one level:
/// its items carry an [`ItemAction`], never another plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ConflictDecision {
    Proceed,
    Overwrite,
    Cancel,
    Skip,
    Rename { new_name: String },
    DetailedPlan { items: Vec<PlannedItem> },
}

impl ConflictDecision {
    pub fn rename(new_name: impl Into<String>) -> Self {
        ConflictDecision::Rename {
            new_name: new_name.into(),
        }
    }

    /// Short label for logs and messages.
    pub fn label(&self) -> &'static str {
        match self {
            ConflictDecision::Proceed => "proceed",
            ConflictDecision::Overwrite => "overwrite",
            ConflictDecision::Cancel => "cancel",
            ConflictDecision::Skip => "skip",
            ConflictDecision::Rename { .. } => "rename",
            ConflictDecision::DetailedPlan { .. } => "detailed_plan",
        }
    }
}

impl fmt::Display for ConflictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictDecision::Rename { new_name } => write!(f, "rename to '{new_name}'"),
            ConflictDecision::DetailedPlan { items } => write!(f, "detailed plan ({} items)", items.len()),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAction {
    Skip,
    Overwrite,
    Rename { new_name: String },
}

impl ItemAction {
    pub fn label(&self) -> &'static str {
        match self {
            ItemAction::Skip => "skip",
            ItemAction::Overwrite => "overwrite",
            ItemAction::Rename { .. } => "rename",
        }
    }
}

/// One child of a directory copy and what to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPlannedItem", into = "RawPlannedItem")]
pub struct PlannedItem {
    pub name: String,
    pub action: ItemAction,
}

impl PlannedItem {
    pub fn new(name: impl Into<String>, action: ItemAction) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

/// Flat on-disk shape: `{"name": "a.json", "action": "rename", "new_name": "b"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPlannedItem {
    name: String,
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_name: Option<String>,
}

impl TryFrom<RawPlannedItem> for PlannedItem {
    type Error = String;

    fn try_from(raw: RawPlannedItem) -> Result<Self, Self::Error> {
        let action = match raw.action.trim().to_ascii_lowercase().as_str() {
            "skip" => ItemAction::Skip,
            "overwrite" | "replace" => ItemAction::Overwrite,
            "rename" => match raw.new_name {
                Some(n) if !n.trim().is_empty() => ItemAction::Rename {
                    new_name: n.trim().to_string(),
                },
                _ => return Err(format!("item '{}': rename needs a new_name", raw.name)),
            },
            other => return Err(format!("item '{}': unknown action '{other}'", raw.name)),
        };
        Ok(PlannedItem {
            name: raw.name,
            action,
        })
    }
}

impl From<PlannedItem> for RawPlannedItem {
    fn from(item: PlannedItem) -> Self {
        let action = item.action.label().to_string();
        let new_name = match item.action {
            ItemAction::Rename { new_name } => Some(new_name),
            _ => None,
        };
        RawPlannedItem {
            name: item.name,
            action,
            new_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_items_parse_from_flat_json() {
        let items: Vec<PlannedItem> = serde_json::from_value(json!([
            {"name": "a.json", "action": "rename", "new_name": "a_old"},
            {"name": "b.json", "action": "skip"},
            {"name": "c.json", "action": "replace"}
        ]))
        .unwrap();
        assert_eq!(items[0].action, ItemAction::Rename { new_name: "a_old".into() });
        assert_eq!(items[1].action, ItemAction::Skip);
        assert_eq!(items[2].action, ItemAction::Overwrite);
    }

    #[test]
    fn rename_without_name_is_rejected() {
        let err = serde_json::from_value::<PlannedItem>(json!({"name": "a.json", "action": "rename"}))
            .unwrap_err();
        assert!(err.to_string().contains("needs a new_name"));
    }

    #[test]
    fn decision_serializes_with_action_tag() {
        let v = serde_json::to_value(ConflictDecision::rename("a_copy")).unwrap();
        assert_eq!(v, json!({"action": "rename", "new_name": "a_copy"}));
        let v = serde_json::to_value(ConflictDecision::DetailedPlan {
            items: vec![PlannedItem::new("x.json", ItemAction::Skip)],
        })
        .unwrap();
        assert_eq!(
            v,
            json!({"action": "detailed_plan", "items": [{"name": "x.json", "action": "skip"}]})
        );
    }
}
