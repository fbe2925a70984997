//! GTFS-realtime trip updates.
//!
//! The feed is fetched and decoded so trip updates can be inspected; delays
//! are not yet applied to the board.

use std::io::Read;

use flate2::read::GzDecoder;
use prost::Message;
use thiserror::Error;
use tracing::debug;

use crate::fetch::{FetchError, HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;

pub const DEFAULT_TRIP_UPDATE_URL: &str = "https://api.bart.gov/gtfsrt/tripupdate.aspx";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to decompress feed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("failed to decode feed: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// Bodies that still carry a gzip header are decompressed first.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, RealtimeError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut decoded)
            .map_err(RealtimeError::Decompress)?;
        debug!(compressed = bytes.len(), decoded = decoded.len(), "Feed gunzipped");
        return Ok(FeedMessage::decode(decoded.as_slice())?);
    }

    Ok(FeedMessage::decode(bytes)?)
}

/// Fetches and decodes the feed at `url`.
#[tracing::instrument(skip(client))]
pub async fn fetch_feed<C: HttpClient>(client: &C, url: &str) -> Result<FeedMessage, RealtimeError> {
    let bytes = fetch_bytes(client, url).await?;
    let feed = parse_feed(&bytes)?;
    debug!(entities = feed.entity.len(), "Feed decoded");
    Ok(feed)
}

/// Trip ids of every trip-update entity, in feed order.
pub fn trip_update_ids(feed: &FeedMessage) -> Vec<&str> {
    feed.entity
        .iter()
        .filter_map(|entity| entity.trip_update.as_ref())
        .filter_map(|update| update.trip.trip_id.as_deref())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StaticClient;
    use crate::gtfs_rt::{FeedEntity, FeedHeader, TripDescriptor, TripUpdate, VehiclePosition};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn header() -> FeedHeader {
        FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1234567890),
            incrementality: None,
            feed_version: None,
        }
    }

    fn trip_update(id: &str, trip_id: Option<&str>) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: trip_id.map(str::to_string),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn sample_feed() -> FeedMessage {
        FeedMessage {
            header: header(),
            entity: vec![
                trip_update("1", Some("T1")),
                FeedEntity {
                    id: "v".to_string(),
                    vehicle: Some(VehiclePosition::default()),
                    ..Default::default()
                },
                trip_update("2", None),
                trip_update("3", Some("T3")),
            ],
        }
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_parse_empty_bytes_returns_default_feed() {
        // An empty message is valid protobuf and decodes to defaults
        let feed = parse_feed(&[]).unwrap();
        assert_eq!(feed.header.gtfs_realtime_version, "");
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        let result = parse_feed(&invalid_bytes);
        assert!(matches!(result, Err(RealtimeError::Decode(_))));
    }

    #[test]
    fn test_parse_plain_and_gzipped_agree() {
        let encoded = sample_feed().encode_to_vec();

        let plain = parse_feed(&encoded).unwrap();
        let gunzipped = parse_feed(&gzip(&encoded)).unwrap();

        assert_eq!(plain, gunzipped);
        assert_eq!(plain.header.timestamp, Some(1234567890));
    }

    #[test]
    fn test_trip_update_ids_skip_other_entities() {
        let feed = sample_feed();
        assert_eq!(trip_update_ids(&feed), vec!["T1", "T3"]);
    }

    #[tokio::test]
    async fn test_fetch_feed_decodes_gzipped_body() {
        let client = StaticClient::ok(gzip(&sample_feed().encode_to_vec()));
        let feed = fetch_feed(&client, DEFAULT_TRIP_UPDATE_URL).await.unwrap();
        assert_eq!(feed.entity.len(), 4);
    }
}
