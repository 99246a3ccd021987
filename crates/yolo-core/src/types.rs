use crate::error::YoloError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Epic,
    Feature,
    Task,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Epic, ItemKind::Feature, ItemKind::Task];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Epic => "epic",
            ItemKind::Feature => "feature",
            ItemKind::Task => "task",
        }
    }

    /// Capitalized form used in headings and relationship labels.
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Epic => "Epic",
            ItemKind::Feature => "Feature",
            ItemKind::Task => "Task",
        }
    }

    pub fn prefix(self) -> char {
        match self {
            ItemKind::Epic => 'E',
            ItemKind::Feature => 'F',
            ItemKind::Task => 'T',
        }
    }

    /// Directory under `yolo/`, e.g. `epics`.
    pub fn dir_name(self) -> &'static str {
        match self {
            ItemKind::Epic => "epics",
            ItemKind::Feature => "features",
            ItemKind::Task => "tasks",
        }
    }

    pub fn parent(self) -> Option<ItemKind> {
        match self {
            ItemKind::Epic => None,
            ItemKind::Feature => Some(ItemKind::Epic),
            ItemKind::Task => Some(ItemKind::Feature),
        }
    }

    pub fn child(self) -> Option<ItemKind> {
        match self {
            ItemKind::Epic => Some(ItemKind::Feature),
            ItemKind::Feature => Some(ItemKind::Task),
            ItemKind::Task => None,
        }
    }

    pub fn from_prefix(c: char) -> Option<ItemKind> {
        match c {
            'E' => Some(ItemKind::Epic),
            'F' => Some(ItemKind::Feature),
            'T' => Some(ItemKind::Task),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = YoloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "epic" | "epics" | "e" => Ok(ItemKind::Epic),
            "feature" | "features" | "f" => Ok(ItemKind::Feature),
            "task" | "tasks" | "t" => Ok(ItemKind::Task),
            _ => Err(YoloError::InvalidKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Closed set of work-item states. Items are never deleted; superseded ones
/// move to `Deprecated`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Planned,
    InProgress,
    Completed,
    Deprecated,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Planned => "planned",
            Status::InProgress => "in-progress",
            Status::Completed => "completed",
            Status::Deprecated => "deprecated",
        }
    }

    /// Statuses a freshly synthesized plan may carry.
    pub fn is_plan_status(self) -> bool {
        !matches!(self, Status::Deprecated)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = YoloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(Status::Planned),
            "in-progress" => Ok(Status::InProgress),
            "completed" => Ok(Status::Completed),
            "deprecated" => Ok(Status::Deprecated),
            _ => Err(YoloError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ItemId
// ---------------------------------------------------------------------------

pub const MAX_ITEM_NUMBER: u16 = 999;

/// A work-item identifier such as `E001`, `F012` or `T107`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId {
    kind: ItemKind,
    number: u16,
}

impl ItemId {
    pub fn new(kind: ItemKind, number: u16) -> Result<Self, YoloError> {
        if number == 0 || number > MAX_ITEM_NUMBER {
            return Err(YoloError::InvalidId(format!("{}{number}", kind.prefix())));
        }
        Ok(Self { kind, number })
    }

    pub fn first(kind: ItemKind) -> Self {
        Self { kind, number: 1 }
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn next(&self) -> Option<Self> {
        Self::new(self.kind, self.number + 1).ok()
    }

    /// True when `s` is a well-formed id of `kind`.
    pub fn is_valid_for(s: &str, kind: ItemKind) -> bool {
        s.parse::<ItemId>().is_ok_and(|id| id.kind == kind)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.kind.prefix(), self.number)
    }
}

impl FromStr for ItemId {
    type Err = YoloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || YoloError::InvalidId(s.to_string());
        let mut chars = s.chars();
        let kind = chars.next().and_then(ItemKind::from_prefix).ok_or_else(invalid)?;
        let digits = chars.as_str();
        if digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number: u16 = digits.parse().map_err(|_| invalid())?;
        ItemId::new(kind, number)
    }
}

impl TryFrom<String> for ItemId {
    type Error = YoloError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            Status::Planned,
            Status::InProgress,
            Status::Completed,
            Status::Deprecated,
        ] {
            assert_eq!(s.as_str().parse::<Status>().unwrap(), s);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(matches!(
            "done".parse::<Status>(),
            Err(YoloError::InvalidStatus(_))
        ));
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(serde_json::to_value(Status::InProgress).unwrap(), "in-progress");
        let s: Status = serde_json::from_value("completed".into()).unwrap();
        assert_eq!(s, Status::Completed);
    }

    #[test]
    fn ids_format_with_three_digits() {
        let id = ItemId::new(ItemKind::Feature, 7).unwrap();
        assert_eq!(id.to_string(), "F007");
        assert_eq!("F007".parse::<ItemId>().unwrap(), id);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in ["E1", "E0001", "X001", "e001", "E000", "F01a", ""] {
            assert!(bad.parse::<ItemId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn next_stops_at_999() {
        let last = ItemId::new(ItemKind::Task, MAX_ITEM_NUMBER).unwrap();
        assert!(last.next().is_none());
        assert_eq!(ItemId::first(ItemKind::Task).next().unwrap().to_string(), "T002");
    }

    #[test]
    fn kinds_know_their_neighbours() {
        assert_eq!(ItemKind::Task.parent(), Some(ItemKind::Feature));
        assert_eq!(ItemKind::Epic.parent(), None);
        assert_eq!(ItemKind::Feature.child(), Some(ItemKind::Task));
        assert_eq!("features".parse::<ItemKind>().unwrap(), ItemKind::Feature);
    }

    #[test]
    fn id_serializes_as_string() {
        let id: ItemId = serde_json::from_value("E042".into()).unwrap();
        assert_eq!(serde_json::to_value(id).unwrap(), "E042");
        assert!(serde_json::from_value::<ItemId>("E42".into()).is_err());
    }
}
