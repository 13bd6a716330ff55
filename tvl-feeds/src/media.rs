//! Now-playing client for the music service.
//!
//! Interactive authorization is somebody else's problem: configuration
//! hands us a long-lived refresh token, and we trade it for short-lived
//! access tokens as needed. "Nothing playing" is a real answer here,
//! carefully kept apart from "the fetch failed".

use serde_derive::{Serialize, Deserialize};
use log::*;
use tvl_util::http::{ApiClient, HttpError};

use crate::errors::*;

/// Default base URL of the playback API.
static DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
/// Default token endpoint.
static DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
/// Album art rendition the layout is sized for.
static WANTED_IMAGE_WIDTH: u32 = 300;

/// What's playing right now.
#[derive(Serialize, Debug, Clone)]
pub struct MediaStatus {
    pub artist: String,
    pub track: String,
    pub album: String,
    pub image_url: Option<String>,
    pub is_playing: bool,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize, Debug)]
struct CurrentlyPlaying {
    #[serde(default)]
    is_playing: bool,
    item: Option<Track>,
}

#[derive(Deserialize, Debug)]
struct Track {
    name: String,
    #[serde(default)]
    artists: Vec<Artist>,
    album: Album,
}

#[derive(Deserialize, Debug)]
struct Artist {
    name: String,
}

#[derive(Deserialize, Debug)]
struct Album {
    name: String,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Deserialize, Debug)]
struct Image {
    url: String,
    #[serde(default)]
    width: Option<u32>,
}

pub struct MediaClient {
    api: ApiClient,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    access_token: Option<String>,
}

impl MediaClient {
    pub fn new(ua: String, client_id: String, client_secret: String, refresh_token: String,
               api_url: Option<String>, token_url: Option<String>) -> Self {
        let api = ApiClient::new(ua, "media",
                                 api_url.unwrap_or_else(|| DEFAULT_API_URL.into()));
        Self {
            api,
            token_url: token_url.unwrap_or_else(|| DEFAULT_TOKEN_URL.into()),
            client_id, client_secret, refresh_token,
            access_token: None,
        }
    }
    fn access_token(&mut self) -> FeedResult<String> {
        match self.access_token {
            Some(ref tok) => Ok(tok.clone()),
            None => {
                debug!("refreshing playback access token");
                let resp: TokenResponse = self.api.post_form(
                    &self.token_url,
                    &[("grant_type", "refresh_token"),
                      ("refresh_token", &self.refresh_token as &str)],
                    &self.client_id, &self.client_secret)?;
                self.access_token = Some(resp.access_token.clone());
                Ok(resp.access_token)
            }
        }
    }
    /// Asks what's playing. `Ok(None)` means silence (or a paused
    /// player), which is not an error and must replace a stale track.
    pub fn fetch_status(&mut self) -> FeedResult<Option<MediaStatus>> {
        let token = self.access_token()?;
        let resp: Option<CurrentlyPlaying> =
            match self.api.get_json_opt("/me/player/currently-playing", Some(&token)) {
                Ok(r) => r,
                Err(e) => {
                    if let HttpError::Status { code: 401, .. } = e {
                        debug!("playback token rejected; will refresh next fetch");
                        self.access_token = None;
                    }
                    return Err(e.into());
                }
            };
        Ok(resp.and_then(status_from))
    }
}

fn status_from(cur: CurrentlyPlaying) -> Option<MediaStatus> {
    if !cur.is_playing {
        return None;
    }
    let item = cur.item?;
    let artist = match item.artists.into_iter().next() {
        Some(a) => a.name,
        None => {
            warn!("now-playing track \"{}\" has no artists", item.name);
            return None;
        }
    };
    Some(MediaStatus {
        artist,
        track: item.name,
        image_url: pick_image(&item.album.images),
        album: item.album.name,
        is_playing: true,
    })
}

/// Prefers the rendition the layout is sized for, falling back to
/// whatever comes first.
fn pick_image(images: &[Image]) -> Option<String> {
    images.iter()
        .find(|i| i.width == Some(WANTED_IMAGE_WIDTH))
        .or_else(|| images.first())
        .map(|i| i.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(json: &str) -> Option<MediaStatus> {
        status_from(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn picks_preferred_album_art() {
        let status = playing(r#"{
            "is_playing": true,
            "item": {
                "name": "Gamma Knife",
                "artists": [ { "name": "King Gizzard" }, { "name": "someone else" } ],
                "album": {
                    "name": "Nonagon Infinity",
                    "images": [
                        { "url": "http://img/640", "width": 640 },
                        { "url": "http://img/300", "width": 300 },
                        { "url": "http://img/64", "width": 64 }
                    ]
                }
            }
        }"#).unwrap();
        assert_eq!(status.artist, "King Gizzard");
        assert_eq!(status.track, "Gamma Knife");
        assert_eq!(status.album, "Nonagon Infinity");
        assert_eq!(status.image_url.as_ref().map(|s| s as &str), Some("http://img/300"));
        assert!(status.is_playing);
    }

    #[test]
    fn falls_back_to_first_image() {
        let status = playing(r#"{
            "is_playing": true,
            "item": {
                "name": "x",
                "artists": [ { "name": "y" } ],
                "album": { "name": "z", "images": [ { "url": "http://img/other", "width": 512 } ] }
            }
        }"#).unwrap();
        assert_eq!(status.image_url.as_ref().map(|s| s as &str), Some("http://img/other"));
    }

    #[test]
    fn paused_player_is_nothing_playing() {
        assert!(playing(r#"{
            "is_playing": false,
            "item": {
                "name": "x",
                "artists": [ { "name": "y" } ],
                "album": { "name": "z" }
            }
        }"#).is_none());
    }

    #[test]
    fn missing_item_is_nothing_playing() {
        assert!(playing(r#"{ "is_playing": true }"#).is_none());
    }
}
