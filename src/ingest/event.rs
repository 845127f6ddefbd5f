use crate::error::Error;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// MAC-48 hardware address, colon or dash separated, case insensitive.
static MAC_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").unwrap());

/// Incoming occupancy message from a camera.
///
/// Wire shape: `{ "camera_id": "<MAC>", "timestamp": "<RFC3339>",
/// "person_count": <integer> }`. `person_count` is an `Option` so that an
/// absent field and a legitimate zero stay distinguishable; absent is always
/// invalid. Never persisted verbatim; either converted into an occupancy row
/// or rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraEvent {
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub person_count: Option<i64>,
}

impl CameraEvent {
    /// Decode and validate a raw delivery payload.
    ///
    /// Malformed JSON and semantic failures both surface as
    /// `Error::Validation`: an unchanged payload can never become valid on
    /// redelivery.
    pub fn decode(payload: &[u8]) -> Result<Self, Error> {
        let event: CameraEvent = serde_json::from_slice(payload).map_err(|e| {
            Error::Validation(format!(
                "failed to parse camera event (raw len={}): {}",
                payload.len(),
                e
            ))
        })?;
        event.validate()?;
        Ok(event)
    }

    /// Enforce required-field and shape rules on a decoded event.
    pub fn validate(&self) -> Result<(), Error> {
        if self.camera_id.is_empty() {
            return Err(Error::Validation("camera_id is missing".to_string()));
        }
        if !MAC_ADDRESS.is_match(&self.camera_id) {
            return Err(Error::Validation(format!(
                "camera_id {} is not a valid MAC address",
                self.camera_id
            )));
        }
        match self.person_count {
            None => Err(Error::Validation(
                "person_count is missing".to_string(),
            )),
            Some(count) if count < 0 => Err(Error::Validation(format!(
                "person_count {} is negative",
                count
            ))),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn valid_event_decodes() {
        let payload = br#"{
            "camera_id": "AA:BB:CC:DD:EE:FF",
            "timestamp": "2024-03-10T12:00:00Z",
            "person_count": 17
        }"#;
        let event = CameraEvent::decode(payload).unwrap();
        assert_eq!(event.camera_id, "AA:BB:CC:DD:EE:FF");
        assert_eq!(event.person_count, Some(17));
    }

    #[test]
    fn zero_count_is_valid() {
        let payload = br#"{
            "camera_id": "aa:bb:cc:dd:ee:ff",
            "timestamp": "2024-03-10T12:00:00Z",
            "person_count": 0
        }"#;
        let event = CameraEvent::decode(payload).unwrap();
        assert_eq!(event.person_count, Some(0));
    }

    #[test]
    fn missing_count_is_rejected() {
        let payload = br#"{
            "camera_id": "AA:BB:CC:DD:EE:FF",
            "timestamp": "2024-03-10T12:00:00Z"
        }"#;
        let err = CameraEvent::decode(payload).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn negative_count_is_rejected() {
        let payload = br#"{
            "camera_id": "AA:BB:CC:DD:EE:FF",
            "timestamp": "2024-03-10T12:00:00Z",
            "person_count": -1
        }"#;
        assert!(matches!(
            CameraEvent::decode(payload),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn malformed_mac_is_rejected() {
        let payload = br#"{
            "camera_id": "not-a-mac",
            "timestamp": "2024-03-10T12:00:00Z",
            "person_count": 3
        }"#;
        assert!(matches!(
            CameraEvent::decode(payload),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn dash_separated_mac_is_accepted() {
        let payload = br#"{
            "camera_id": "AA-BB-CC-DD-EE-FF",
            "timestamp": "2024-03-10T12:00:00Z",
            "person_count": 3
        }"#;
        assert!(CameraEvent::decode(payload).is_ok());
    }

    #[test]
    fn missing_timestamp_is_rejected() {
        let payload = br#"{
            "camera_id": "AA:BB:CC:DD:EE:FF",
            "person_count": 3
        }"#;
        assert!(matches!(
            CameraEvent::decode(payload),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            CameraEvent::decode(b"{not json"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn offset_timestamp_is_normalized_to_utc() {
        let payload = br#"{
            "camera_id": "AA:BB:CC:DD:EE:FF",
            "timestamp": "2024-03-10T15:00:00+03:00",
            "person_count": 5
        }"#;
        let event = CameraEvent::decode(payload).unwrap();
        assert_eq!(
            event.timestamp,
            chrono::Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
        );
    }
}
