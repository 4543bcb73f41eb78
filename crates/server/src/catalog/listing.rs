//! Visibility and ordering rules for session listings.

use chrono::{DateTime, Utc};
use shared::{ScheduleResponse, SessionInfo, VideoSort};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// On-demand recording
    Video,
    /// Scheduled or live class
    Live,
}

pub fn kind(session: &SessionInfo) -> SessionKind {
    match session.live_at {
        Some(_) => SessionKind::Live,
        None => SessionKind::Video,
    }
}

/// Upcoming while the start time has not passed or the class is on air.
pub fn is_upcoming(session: &SessionInfo, now: DateTime<Utc>) -> bool {
    match session.live_at {
        Some(live_at) => live_at >= now || session.streaming_now,
        None => false,
    }
}

/// Published on-demand videos ordered by creation time.
pub fn videos(sessions: Vec<SessionInfo>, sort: VideoSort) -> Vec<SessionInfo> {
    let mut videos: Vec<_> = sessions
        .into_iter()
        .filter(|s| s.is_published && kind(s) == SessionKind::Video)
        .collect();

    match sort {
        VideoSort::Newest => videos.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        VideoSort::Oldest => videos.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    videos
}

/// Published live-format sessions split into upcoming and past.
///
/// Upcoming: the streaming session first, then ascending start time.
/// Past: most recently started first.
pub fn schedule(sessions: Vec<SessionInfo>, now: DateTime<Utc>) -> ScheduleResponse {
    let (mut upcoming, mut past): (Vec<_>, Vec<_>) = sessions
        .into_iter()
        .filter(|s| s.is_published && kind(s) == SessionKind::Live)
        .partition(|s| is_upcoming(s, now));

    upcoming.sort_by(upcoming_order);
    past.sort_by(|a, b| b.live_at.cmp(&a.live_at));

    ScheduleResponse { upcoming, past }
}

fn upcoming_order(a: &SessionInfo, b: &SessionInfo) -> Ordering {
    b.streaming_now
        .cmp(&a.streaming_now)
        .then_with(|| a.live_at.cmp(&b.live_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(id: &str) -> SessionInfo {
        let now = Utc::now();
        SessionInfo {
            id: id.to_string(),
            slug: format!("{}-1", id),
            title: id.to_string(),
            description: None,
            thumbnail_url: None,
            video_url: None,
            duration_minutes: Some(30),
            difficulty: None,
            category_id: None,
            theme_id: None,
            is_published: true,
            is_live: false,
            live_at: None,
            streaming_now: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn live(id: &str, live_at: DateTime<Utc>, streaming_now: bool) -> SessionInfo {
        SessionInfo {
            is_live: true,
            live_at: Some(live_at),
            streaming_now,
            ..session(id)
        }
    }

    fn ids(list: &[SessionInfo]) -> Vec<&str> {
        list.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_streaming_session_sorts_first() {
        let now = Utc::now();
        let a = live("a", now + Duration::days(1), true);
        let b = live("b", now + Duration::hours(1), false);
        let c = live("c", now + Duration::hours(2), false);

        let listing = schedule(vec![c, a, b], now);
        assert_eq!(ids(&listing.upcoming), vec!["a", "b", "c"]);
        assert!(listing.past.is_empty());
    }

    #[test]
    fn test_past_sorted_most_recent_first() {
        let now = Utc::now();
        let older = live("older", now - Duration::days(3), false);
        let recent = live("recent", now - Duration::hours(2), false);

        let listing = schedule(vec![older, recent], now);
        assert_eq!(ids(&listing.past), vec!["recent", "older"]);
    }

    #[test]
    fn test_overdue_streaming_session_stays_upcoming() {
        let now = Utc::now();
        let on_air = live("on-air", now - Duration::minutes(20), true);
        let done = live("done", now - Duration::minutes(10), false);

        let listing = schedule(vec![on_air, done], now);
        assert_eq!(ids(&listing.upcoming), vec!["on-air"]);
        assert_eq!(ids(&listing.past), vec!["done"]);
    }

    #[test]
    fn test_live_and_video_listings_are_disjoint() {
        let now = Utc::now();
        let all = vec![
            session("v1"),
            live("l1", now + Duration::hours(1), false),
            live("l2", now - Duration::hours(1), false),
            session("v2"),
        ];

        let video_ids: Vec<String> = videos(all.clone(), VideoSort::Newest)
            .into_iter()
            .map(|s| s.id)
            .collect();
        let listing = schedule(all.clone(), now);
        let live_ids: Vec<String> = listing
            .upcoming
            .iter()
            .chain(listing.past.iter())
            .map(|s| s.id.clone())
            .collect();

        for s in &all {
            let in_videos = video_ids.contains(&s.id);
            let in_live = live_ids.contains(&s.id);
            assert_eq!(in_live, s.live_at.is_some(), "{}", s.id);
            assert_eq!(in_videos, s.live_at.is_none(), "{}", s.id);
        }
    }

    #[test]
    fn test_drafts_are_hidden() {
        let now = Utc::now();
        let draft_video = SessionInfo {
            is_published: false,
            ..session("draft")
        };
        let draft_live = SessionInfo {
            is_published: false,
            ..live("draft-live", now + Duration::hours(1), false)
        };

        assert!(videos(vec![draft_video], VideoSort::Newest).is_empty());
        assert!(schedule(vec![draft_live], now).upcoming.is_empty());
    }

    #[test]
    fn test_video_sort_direction() {
        let now = Utc::now();
        let first = SessionInfo {
            created_at: now - Duration::days(2),
            ..session("first")
        };
        let second = SessionInfo {
            created_at: now - Duration::days(1),
            ..session("second")
        };

        let newest = videos(vec![first.clone(), second.clone()], VideoSort::Newest);
        assert_eq!(ids(&newest), vec!["second", "first"]);

        let oldest = videos(vec![second, first], VideoSort::Oldest);
        assert_eq!(ids(&oldest), vec!["first", "second"]);
    }
}
