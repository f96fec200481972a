//! Session data types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo;
use crate::types::{DeviceInfo, InteractionCounters, Position, ViewportSnapshot};

/// Caller-supplied fields of a waypoint or event
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Reference to the game task a player is working on
pub type Task = serde_json::Value;

/// Payload keys owned by the recorder; callers cannot override them
pub const RESERVED_KEYS: &[&str] = &[
    "timestamp",
    "position",
    "mapViewport",
    "compassHeading",
    "interaction",
    "task",
];

/// Lifecycle state of a session recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    /// No session started yet
    #[default]
    Uninitialized,
    /// Recording a session
    Active,
    /// Session sealed and handed out
    Finished,
}

impl RecorderState {
    /// Check if recording
    pub fn is_active(&self) -> bool {
        matches!(self, RecorderState::Active)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            RecorderState::Uninitialized => "Uninitialized",
            RecorderState::Active => "Active",
            RecorderState::Finished => "Finished",
        }
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Context the recorder attaches to every waypoint and event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordContext {
    /// When the record was created
    pub timestamp: DateTime<Utc>,
    /// Latest fix, if any had arrived
    pub position: Option<Position>,
    /// Map camera at record time
    #[serde(rename = "mapViewport")]
    pub viewport: ViewportSnapshot,
    /// Latest compass heading, if any had arrived
    #[serde(rename = "compassHeading")]
    pub heading: Option<f64>,
    /// Interaction counters for the active task
    pub interaction: InteractionCounters,
}

/// A location checkpoint tied to gameplay progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(flatten)]
    pub context: RecordContext,
    #[serde(flatten)]
    pub payload: Payload,
}

/// A discrete gameplay occurrence
///
/// Serialized like a waypoint, except that the rotation counter is written as
/// `interaction.rotationCount` and `task` is left out when no task was set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub context: RecordContext,
    /// Task active when the event fired
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRecord<'a> {
    timestamp: &'a DateTime<Utc>,
    position: &'a Option<Position>,
    #[serde(rename = "mapViewport")]
    viewport: &'a ViewportSnapshot,
    #[serde(rename = "compassHeading")]
    heading: &'a Option<f64>,
    interaction: EventInteraction,
    #[serde(skip_serializing_if = "Option::is_none")]
    task: Option<&'a Task>,
    #[serde(flatten)]
    payload: &'a Payload,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventInteraction {
    pan_count: u32,
    zoom_count: u32,
    rotation_count: f64,
}

impl Serialize for Event {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let context = &self.context;
        EventRecord {
            timestamp: &context.timestamp,
            position: &context.position,
            viewport: &context.viewport,
            heading: &context.heading,
            interaction: EventInteraction {
                pan_count: context.interaction.pan_count,
                zoom_count: context.interaction.zoom_count,
                rotation_count: context.interaction.rotation_accum_deg,
            },
            task: self.task.as_ref(),
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}

/// One complete recorded play-through
///
/// Records can only be appended while the session is open; once sealed the
/// session is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "game")]
    game_id: String,
    #[serde(rename = "name")]
    game_name: String,
    #[serde(rename = "start")]
    start_time: DateTime<Utc>,
    #[serde(rename = "end")]
    end_time: Option<DateTime<Utc>>,
    device: DeviceInfo,
    waypoints: Vec<Waypoint>,
    events: Vec<Event>,
    /// Quiz answers; filled in by the game server, always null here
    answers: Option<serde_json::Value>,
    players: Vec<String>,
    #[serde(rename = "playersCount")]
    players_count: usize,
}

impl Session {
    /// Open a new session starting now
    pub fn new(
        game_id: impl Into<String>,
        game_name: impl Into<String>,
        device: DeviceInfo,
        players: Vec<String>,
    ) -> Self {
        Self::starting_at(game_id, game_name, device, players, Utc::now())
    }

    /// Open a new session with an explicit start time
    pub fn starting_at(
        game_id: impl Into<String>,
        game_name: impl Into<String>,
        device: DeviceInfo,
        players: Vec<String>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            game_id: game_id.into(),
            game_name: game_name.into(),
            start_time,
            end_time: None,
            device,
            waypoints: Vec::new(),
            events: Vec::new(),
            answers: None,
            players_count: players.len(),
            players,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// End time; `None` while the session is open
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn players(&self) -> &[String] {
        &self.players
    }

    /// Check if the session has been sealed
    pub fn is_sealed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Append a waypoint; ignored once sealed
    pub(crate) fn push_waypoint(&mut self, waypoint: Waypoint) -> bool {
        if self.is_sealed() {
            return false;
        }
        self.waypoints.push(waypoint);
        true
    }

    /// Append an event; ignored once sealed
    pub(crate) fn push_event(&mut self, event: Event) -> bool {
        if self.is_sealed() {
            return false;
        }
        self.events.push(event);
        true
    }

    /// Seal the session; the end time never precedes the start time
    pub(crate) fn seal(&mut self, end_time: DateTime<Utc>) {
        if self.end_time.is_none() {
            self.end_time = Some(end_time.max(self.start_time));
        }
    }

    /// File name used for the local copy: `<game name>-<start>.json`
    ///
    /// Spaces in the game name become underscores. Path separators and
    /// colons are also replaced so the name is valid on every platform.
    pub fn file_name(&self) -> String {
        let name: String = self
            .game_name
            .chars()
            .map(|c| match c {
                ' ' => '_',
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                c => c,
            })
            .collect();
        let start = self.start_time.format("%Y-%m-%dT%H-%M-%S%.3fZ");
        format!("{}-{}.json", name, start)
    }

    /// Aggregate statistics for display
    pub fn summary(&self) -> SessionSummary {
        let duration_secs = self
            .end_time
            .map(|end| (end - self.start_time).num_milliseconds() as f64 / 1000.0);
        let distance_m =
            geo::path_length_m(self.waypoints.iter().filter_map(|w| w.context.position.as_ref()));
        let last_interaction = self
            .events
            .last()
            .map(|e| e.context.interaction)
            .unwrap_or_default();

        SessionSummary {
            waypoint_count: self.waypoints.len(),
            event_count: self.events.len(),
            players_count: self.players_count,
            duration_secs,
            distance_m,
            positioned_records: self
                .waypoints
                .iter()
                .map(|w| &w.context)
                .chain(self.events.iter().map(|e| &e.context))
                .filter(|c| c.position.is_some())
                .count(),
            last_interaction,
        }
    }
}

/// Aggregate statistics of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub waypoint_count: usize,
    pub event_count: usize,
    pub players_count: usize,
    /// `None` while the session is open
    pub duration_secs: Option<f64>,
    /// Path length through the waypoint positions
    pub distance_m: f64,
    /// Records that carry a position fix
    pub positioned_records: usize,
    /// Counters attached to the most recent event
    pub last_interaction: InteractionCounters,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Waypoints:  {}", self.waypoint_count)?;
        writeln!(f, "Events:     {}", self.event_count)?;
        writeln!(f, "Players:    {}", self.players_count)?;
        match self.duration_secs {
            Some(secs) => writeln!(f, "Duration:   {:.1} s", secs)?,
            None => writeln!(f, "Duration:   (open)")?,
        }
        writeln!(f, "Distance:   {:.0} m", self.distance_m)?;
        write!(
            f,
            "Last event: {} pans, {} zooms, {:.0}° rotation",
            self.last_interaction.pan_count,
            self.last_interaction.zoom_count,
            self.last_interaction.rotation_accum_deg
        )
    }
}
