use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle states of an appointment.
///
/// The wire representation uses the display names shown in the practice
/// UI ("Checked-In", "In Session", ...), which is also what gets
/// persisted in the `appointments.status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    #[serde(rename = "Checked-In")]
    CheckedIn,
    #[serde(rename = "In Session")]
    InSession,
    Completed,
    #[serde(rename = "No-Show")]
    NoShow,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [Self; 7] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::CheckedIn,
        Self::InSession,
        Self::Completed,
        Self::NoShow,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::Confirmed => "Confirmed",
            Self::CheckedIn => "Checked-In",
            Self::InSession => "In Session",
            Self::Completed => "Completed",
            Self::NoShow => "No-Show",
            Self::Cancelled => "Cancelled",
        }
    }

    /// States legally reachable from `self`, not counting the
    /// cancellation bypass. Terminal states map to an empty slice.
    #[must_use]
    pub const fn allowed_transitions(self) -> &'static [Self] {
        match self {
            Self::Scheduled => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::CheckedIn, Self::Cancelled],
            Self::CheckedIn => &[Self::InSession, Self::NoShow],
            Self::InSession => &[Self::Completed],
            Self::Completed | Self::NoShow | Self::Cancelled => &[],
        }
    }

    /// Cancellation is always permitted; anything else must be listed in
    /// the allowed-transitions table for the current state.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        target == Self::Cancelled || self.allowed_transitions().contains(&target)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::NoShow | Self::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Scheduled" => Ok(Self::Scheduled),
            "Confirmed" => Ok(Self::Confirmed),
            "Checked-In" => Ok(Self::CheckedIn),
            "In Session" => Ok(Self::InSession),
            "Completed" => Ok(Self::Completed),
            "No-Show" => Ok(Self::NoShow),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(format!("Unknown appointment status: {other}")),
        }
    }
}

/// Delivery state of an appointment reminder row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Cancelled,
    Failed,
}

impl ReminderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in AppointmentStatus::ALL {
            assert_eq!(
                status.as_str().parse::<AppointmentStatus>().unwrap(),
                status
            );
        }
        assert!("Checked In".parse::<AppointmentStatus>().is_err());
        assert!("".parse::<AppointmentStatus>().is_err());
        assert!("scheduled".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_cancellation_bypasses_table() {
        for status in AppointmentStatus::ALL {
            assert!(
                status.can_transition_to(AppointmentStatus::Cancelled),
                "{status} should allow cancellation"
            );
        }
    }

    #[test]
    fn test_transition_table() {
        use AppointmentStatus::*;

        assert_eq!(Scheduled.allowed_transitions(), &[Confirmed, Cancelled]);
        assert_eq!(Confirmed.allowed_transitions(), &[CheckedIn, Cancelled]);
        assert_eq!(CheckedIn.allowed_transitions(), &[InSession, NoShow]);
        assert_eq!(InSession.allowed_transitions(), &[Completed]);
        assert!(Completed.allowed_transitions().is_empty());
        assert!(NoShow.allowed_transitions().is_empty());
        assert!(Cancelled.allowed_transitions().is_empty());
    }

    #[test]
    fn test_transition_allowed_iff_cancel_or_listed() {
        for current in AppointmentStatus::ALL {
            for target in AppointmentStatus::ALL {
                let expected = target == AppointmentStatus::Cancelled
                    || current.allowed_transitions().contains(&target);
                assert_eq!(
                    current.can_transition_to(target),
                    expected,
                    "{current} -> {target}"
                );
            }
        }
    }

    #[test]
    fn test_same_state_is_not_a_legal_transition() {
        // The table never lists a state as its own successor; only
        // Cancelled -> Cancelled passes, via the bypass rule.
        for status in AppointmentStatus::ALL {
            let expected = status == AppointmentStatus::Cancelled;
            assert_eq!(status.can_transition_to(status), expected, "{status}");
        }
    }

    #[test]
    fn test_terminal_states() {
        use AppointmentStatus::*;

        for status in [Completed, NoShow, Cancelled] {
            assert!(status.is_terminal());
            assert!(status.allowed_transitions().is_empty());
        }
        for status in [Scheduled, Confirmed, CheckedIn, InSession] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn test_serde_wire_names() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::InSession).unwrap(),
            "\"In Session\""
        );
        assert_eq!(
            serde_json::from_str::<AppointmentStatus>("\"Checked-In\"").unwrap(),
            AppointmentStatus::CheckedIn
        );
        assert_eq!(
            serde_json::to_string(&ReminderStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
