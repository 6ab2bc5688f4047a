// crates/ragpoint-core/src/runtime/sessions.rs
// ============================================================================
// Module: Ragpoint Chat Sessions
// Description: Bounded per-project chat history keyed by session id.
// Purpose: Keep chat memory in process without unbounded growth.
// Dependencies: crate::core, crate::runtime::prompts
// ============================================================================

//! ## Overview
//! Each project keeps at most [`ChatLimits::max_sessions`] sessions. Adding a
//! session beyond the cap evicts the least recently used one. Each session
//! keeps its newest [`ChatLimits::max_turns`] turns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::VecDeque;

use crate::core::identifiers::ChatId;
use crate::runtime::prompts::ChatTurn;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Default number of chat sessions kept per project.
pub const DEFAULT_MAX_CHAT_SESSIONS: usize = 256;
/// Default number of turns kept per chat session.
pub const DEFAULT_MAX_CHAT_TURNS: usize = 32;

/// Chat memory bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLimits {
    /// Sessions kept per project.
    pub max_sessions: usize,
    /// Turns kept per session.
    pub max_turns: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_sessions: DEFAULT_MAX_CHAT_SESSIONS,
            max_turns: DEFAULT_MAX_CHAT_TURNS,
        }
    }
}

// ============================================================================
// SECTION: Sessions
// ============================================================================

/// One session's history and recency stamp.
#[derive(Debug, Default)]
struct Session {
    /// Turns, oldest first.
    turns: VecDeque<ChatTurn>,
    /// Value of the access clock at last use.
    last_used: u64,
}

/// Least-recently-used map of chat sessions.
#[derive(Debug)]
pub struct ChatSessions {
    /// Memory bounds.
    limits: ChatLimits,
    /// Sessions by id.
    sessions: BTreeMap<ChatId, Session>,
    /// Monotonic access clock.
    clock: u64,
}

impl ChatSessions {
    /// Creates an empty session map.
    #[must_use]
    pub const fn new(limits: ChatLimits) -> Self {
        Self {
            limits,
            sessions: BTreeMap::new(),
            clock: 0,
        }
    }

    /// Returns the history of `id`, oldest turn first, and marks it used.
    pub fn history(&mut self, id: &ChatId) -> Vec<ChatTurn> {
        let stamp = self.tick();
        self.sessions.get_mut(id).map_or_else(Vec::new, |session| {
            session.last_used = stamp;
            session.turns.iter().cloned().collect()
        })
    }

    /// Appends a turn to `id`, evicting as needed to stay within limits.
    pub fn record(&mut self, id: &ChatId, turn: ChatTurn) {
        let stamp = self.tick();
        if !self.sessions.contains_key(id) {
            while self.sessions.len() >= self.limits.max_sessions.max(1) {
                let Some(oldest) = self
                    .sessions
                    .iter()
                    .min_by_key(|(_, session)| session.last_used)
                    .map(|(key, _)| key.clone())
                else {
                    break;
                };
                self.sessions.remove(&oldest);
            }
        }
        let session = self.sessions.entry(id.clone()).or_default();
        session.last_used = stamp;
        session.turns.push_back(turn);
        while session.turns.len() > self.limits.max_turns.max(1) {
            session.turns.pop_front();
        }
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when no session is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops every session.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Advances the access clock.
    const fn tick(&mut self) -> u64 {
        self.clock = self.clock.wrapping_add(1);
        self.clock
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
