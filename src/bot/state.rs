//! Per-user dialog state and the small domain enums it carries.

use crate::config::{WS_EVENTS_OFFICIAL, WS_EVENTS_UNOFFICIAL, WS_MAGISTRS, WS_METHODISTS};
use std::collections::HashMap;

/// Which dialog a session is running
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogKind {
    /// Membership application
    Registration,
    /// Event creation with final confirmation
    OrganizeEvent,
    /// Event list browsing with detail presses
    BrowseEvents,
}

/// Where inside a dialog a session currently is
#[derive(Clone, Debug, PartialEq)]
pub enum DialogPos {
    /// Collecting the step-table field at this index
    Collecting(usize),
    /// Event organization awaits the Yes/No confirmation
    Confirming,
    /// Event browsing holds its fetched list for detail presses
    Browsing(Vec<EventRecord>),
}

/// One user's in-flight dialog
///
/// At most one session exists per user; starting another dialog overwrites it.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    /// Owning user
    pub user_id: i64,
    /// The dialog being run
    pub kind: DialogKind,
    /// Current position
    pub pos: DialogPos,
    /// Collected step values; an empty string records a skipped step
    pub fields: HashMap<&'static str, String>,
}

impl Session {
    /// Fresh session at the first step of `kind`
    #[must_use]
    pub fn begin(user_id: i64, kind: DialogKind) -> Self {
        Self {
            user_id,
            kind,
            pos: DialogPos::Collecting(0),
            fields: HashMap::new(),
        }
    }

    /// Collected value for a field, the empty string when absent
    #[must_use]
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map_or("", String::as_str)
    }
}

/// Applicant gender choice
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    /// "Мужской" button
    Male,
    /// "Женский" button
    Female,
}

impl Gender {
    /// Callback payload stored for this choice
    #[must_use]
    pub const fn payload(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    /// Parse a stored choice payload
    #[must_use]
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }
}

/// Applicant role choice, deciding the membership worksheet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// "Методист" button
    Methodist,
    /// "Магистр" button
    Magistr,
}

impl Role {
    /// Callback payload stored for this choice
    #[must_use]
    pub const fn payload(self) -> &'static str {
        match self {
            Self::Methodist => "methodist",
            Self::Magistr => "magistr",
        }
    }

    /// Parse a stored choice payload
    #[must_use]
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            "methodist" => Some(Self::Methodist),
            "magistr" => Some(Self::Magistr),
            _ => None,
        }
    }

    /// Worksheet approved applications of this role are appended to
    #[must_use]
    pub const fn worksheet(self) -> &'static str {
        match self {
            Self::Methodist => WS_METHODISTS,
            Self::Magistr => WS_MAGISTRS,
        }
    }
}

/// Official/unofficial event track, deciding the events worksheet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Official events
    Official,
    /// Unofficial events
    Unofficial,
}

impl EventKind {
    /// Parse either the organize-entry or the browse-entry payload
    #[must_use]
    pub fn from_payload(payload: &str) -> Option<Self> {
        match payload {
            "event_type_official" | "view_official_events" => Some(Self::Official),
            "event_type_unofficial" | "view_unofficial_events" => Some(Self::Unofficial),
            _ => None,
        }
    }

    /// Worksheet holding events of this kind
    #[must_use]
    pub const fn worksheet(self) -> &'static str {
        match self {
            Self::Official => WS_EVENTS_OFFICIAL,
            Self::Unofficial => WS_EVENTS_UNOFFICIAL,
        }
    }
}

/// One event row as browsed from a worksheet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    /// Event name
    pub name: String,
    /// Date and time, free text as entered
    pub datetime: String,
    /// Venue
    pub place: String,
    /// Short description
    pub description: String,
    /// Extra information, may be empty
    pub extra_info: String,
    /// Organizer username, or the literal "без username"
    pub organizer: String,
}

impl EventRecord {
    /// Build a record from a worksheet row; `None` when the row is too short
    ///
    /// Columns beyond the sixth are ignored.
    #[must_use]
    pub fn from_row(row: &[String]) -> Option<Self> {
        if let [name, datetime, place, description, extra_info, organizer, ..] = row {
            Some(Self {
                name: name.clone(),
                datetime: datetime.clone(),
                place: place.clone(),
                description: description.clone(),
                extra_info: extra_info.clone(),
                organizer: organizer.clone(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_event_record_needs_six_columns() {
        assert!(EventRecord::from_row(&row(&["a", "b", "c", "d", "e"])).is_none());
        assert!(EventRecord::from_row(&[]).is_none());

        let record = EventRecord::from_row(&row(&["Квест", "10.10", "Двор", "Игра", "", "anna"]));
        assert_eq!(
            record,
            Some(EventRecord {
                name: "Квест".to_string(),
                datetime: "10.10".to_string(),
                place: "Двор".to_string(),
                description: "Игра".to_string(),
                extra_info: String::new(),
                organizer: "anna".to_string(),
            })
        );
    }

    #[test]
    fn test_event_record_ignores_extra_columns() {
        let record = EventRecord::from_row(&row(&["a", "b", "c", "d", "e", "f", "g", "h"]));
        assert!(record.is_some());
    }

    #[test]
    fn test_choice_payload_round_trips() {
        for gender in [Gender::Male, Gender::Female] {
            assert_eq!(Gender::from_payload(gender.payload()), Some(gender));
        }
        for role in [Role::Methodist, Role::Magistr] {
            assert_eq!(Role::from_payload(role.payload()), Some(role));
        }
        assert_eq!(Gender::from_payload("methodist"), None);
        assert_eq!(Role::from_payload("male"), None);
    }

    #[test]
    fn test_event_kind_accepts_both_payload_families() {
        assert_eq!(
            EventKind::from_payload("event_type_official"),
            Some(EventKind::Official)
        );
        assert_eq!(
            EventKind::from_payload("view_official_events"),
            Some(EventKind::Official)
        );
        assert_eq!(
            EventKind::from_payload("event_type_unofficial"),
            Some(EventKind::Unofficial)
        );
        assert_eq!(
            EventKind::from_payload("view_unofficial_events"),
            Some(EventKind::Unofficial)
        );
        assert_eq!(EventKind::from_payload("view_events"), None);
    }

    #[test]
    fn test_worksheet_selection() {
        assert_eq!(Role::Methodist.worksheet(), "Методисты");
        assert_eq!(Role::Magistr.worksheet(), "Магистры");
        assert_eq!(EventKind::Official.worksheet(), "Мероприятия официальные");
        assert_eq!(
            EventKind::Unofficial.worksheet(),
            "Мероприятия неофициальные"
        );
    }

    #[test]
    fn test_session_begin_and_field_access() {
        let mut session = Session::begin(7, DialogKind::Registration);
        assert_eq!(session.pos, DialogPos::Collecting(0));
        assert_eq!(session.field("full_name"), "");

        session.fields.insert("full_name", "Анна".to_string());
        assert_eq!(session.field("full_name"), "Анна");
    }
}
