//! Client-side projection of the signed-in user's favorites.
//!
//! The server is the source of truth. This set answers `is_favorite` quickly
//! for one identity and reports when it must be refetched: after the identity
//! changes (sign-in, sign-out, account switch) or once it is older than the
//! caller's max age.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::messages::FavoriteToggleResponse;

#[derive(Debug, Clone, Default)]
pub struct FavoriteSet {
    owner: Option<String>,
    session_ids: HashSet<String>,
    fetched_at: Option<DateTime<Utc>>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Replace the whole projection with a fresh server listing.
    pub fn replace<I>(&mut self, owner: Option<&str>, session_ids: I, now: DateTime<Utc>)
    where
        I: IntoIterator<Item = String>,
    {
        self.owner = owner.map(str::to_string);
        self.session_ids = match owner {
            Some(_) => session_ids.into_iter().collect(),
            None => HashSet::new(),
        };
        self.fetched_at = Some(now);
    }

    pub fn needs_refresh(&self, owner: Option<&str>, now: DateTime<Utc>, max_age: Duration) -> bool {
        if self.owner.as_deref() != owner {
            return true;
        }
        match self.fetched_at {
            Some(fetched_at) => now - fetched_at > max_age,
            None => true,
        }
    }

    pub fn is_favorite(&self, owner: Option<&str>, session_id: &str) -> bool {
        owner.is_some() && self.owner.as_deref() == owner && self.session_ids.contains(session_id)
    }

    /// Fold a toggle result into the projection without refetching.
    pub fn apply_toggle(&mut self, resp: &FavoriteToggleResponse) {
        if resp.requires_sign_in || self.owner.is_none() {
            return;
        }
        if resp.favorited {
            self.session_ids.insert(resp.session_id.clone());
        } else {
            self.session_ids.remove(&resp.session_id);
        }
    }

    pub fn len(&self) -> usize {
        self.session_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.session_ids.is_empty()
    }
}
