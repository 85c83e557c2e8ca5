//! Display records emitted by the client.
//!
//! The session core never touches a rendering surface. Instead every state
//! transition produces [`SeanceEvent`] records on the channel returned by
//! [`SeanceClient::start`](crate::client::SeanceClient::start); a thin
//! adapter (terminal printer, GUI, test harness) subscribes and draws. Record
//! order matches processing order, which matches arrival order.

use crate::log::{ChatEntry, LogEntry};
use crate::protocol::PlayerProfile;

/// A display record from the session core.
#[derive(Debug, Clone)]
pub enum SeanceEvent {
    /// The transport loop is running and the connection is live. Always the
    /// first record on the channel.
    Connected,

    /// Session bootstrap landed. Carries the confirmed profile and roster
    /// bookkeeping; the accompanying greeting appears as a `Log` record.
    Welcome {
        player: PlayerProfile,
        /// Absolute roster size (1 when the server omitted it).
        player_count: u32,
        /// 1-based join position (1 when the server omitted it).
        player_index: u32,
        room_code: Option<String>,
    },

    /// An entry was appended to the event log.
    Log(LogEntry),

    /// An entry was appended to the chat log.
    Chat(ChatEntry),

    /// The local player's room changed — optimistically on a dispatched move,
    /// or confirmed by a movement echo.
    RoomChanged { room: String },

    /// The roster size changed; `count` is the server's absolute total.
    PlayerCountChanged { count: u32 },

    /// A narrative beat is on screen with its choices offered.
    BeatPresented {
        /// Chunked beat text (at most three sentences).
        text: String,
        choices: Vec<String>,
    },

    /// A choice was accepted: the choices are cleared and the narrative
    /// surface now shows the canned acknowledgment.
    ChoiceAcknowledged { label: String },

    /// Terminal record: the connection is gone and the loop has exited.
    /// `clean` distinguishes an orderly close from a failure; `detail` carries
    /// the failure description when there is one. Reconnection is manual —
    /// build a new transport and client to rejoin.
    Disconnected {
        clean: bool,
        detail: Option<String>,
    },
}
