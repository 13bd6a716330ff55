//! Clients for the external data feeds the dashboard draws from.
//!
//! One module per feed: departures, calendar, weather, and now-playing.
//! Each client fetches one thing and hands back normalized records or a
//! [`FetchError`](errors::FetchError); nothing in here panics on a bad
//! payload, since one broken feed must never take the others with it.

pub mod errors;
pub mod transit;
pub mod calendar;
pub mod weather;
pub mod media;

pub use crate::errors::{FetchError, FeedResult};
