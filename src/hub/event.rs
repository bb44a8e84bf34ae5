//! Provider event categories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of events the capability provider can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    RecordingStarted,
    RecordingEnded,
    UploadProgress,
    MeetingDetected,
    MeetingUpdated,
    MeetingClosed,
    StateChange,
    Error,
    MediaCaptureStatus,
    ParticipantCaptureStatus,
    PermissionsGranted,
    PermissionStatus,
    RealtimeEvent,
    Shutdown,
}

impl EventKind {
    pub const COUNT: usize = 14;

    pub const ALL: [EventKind; Self::COUNT] = [
        Self::RecordingStarted,
        Self::RecordingEnded,
        Self::UploadProgress,
        Self::MeetingDetected,
        Self::MeetingUpdated,
        Self::MeetingClosed,
        Self::StateChange,
        Self::Error,
        Self::MediaCaptureStatus,
        Self::ParticipantCaptureStatus,
        Self::PermissionsGranted,
        Self::PermissionStatus,
        Self::RealtimeEvent,
        Self::Shutdown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecordingStarted => "recording-started",
            Self::RecordingEnded => "recording-ended",
            Self::UploadProgress => "upload-progress",
            Self::MeetingDetected => "meeting-detected",
            Self::MeetingUpdated => "meeting-updated",
            Self::MeetingClosed => "meeting-closed",
            Self::StateChange => "state-change",
            Self::Error => "error",
            Self::MediaCaptureStatus => "media-capture-status",
            Self::ParticipantCaptureStatus => "participant-capture-status",
            Self::PermissionsGranted => "permissions-granted",
            Self::PermissionStatus => "permission-status",
            Self::RealtimeEvent => "realtime-event",
            Self::Shutdown => "shutdown",
        }
    }

    /// Position in [`EventKind::ALL`]; used to key fixed-size tables.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind '{0}'")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}
