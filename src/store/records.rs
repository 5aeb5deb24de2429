use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::backend::StorageBackend;
use super::load_json;
use crate::error::{Error, Result};
use crate::geo::{Coordinate, Nearby, ProximityIndex};
use crate::models::{Emotion, Record, Response};
use crate::recording::AudioArtifact;

/// The record collection, newest first
pub struct RecordStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    records: Vec<Record>,
    load_error: Option<Error>,
}

impl RecordStore {
    /// Load the collection under `key`
    ///
    /// Malformed content loads as an empty collection with `load_error` set;
    /// the next mutation replaces it. A backend read failure is returned.
    pub fn load(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let (records, load_error) = load_json::<Vec<Record>>(backend.as_ref(), &key)?;
        let records = records.unwrap_or_default();

        info!("Loaded {} records from '{}'", records.len(), key);

        Ok(Self {
            backend,
            key,
            records,
            load_error,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Why the stored collection could not be read, if it couldn't
    pub fn load_error(&self) -> Option<&Error> {
        self.load_error.as_ref()
    }

    /// Store a finished recording as a new record at the front of the
    /// collection
    pub fn add_record(
        &mut self,
        artifact: &AudioArtifact,
        location: Coordinate,
        emotions: Vec<Emotion>,
    ) -> Result<&Record> {
        if !location.is_valid() {
            return Err(Error::InvalidCoordinate {
                latitude: location.latitude,
                longitude: location.longitude,
            });
        }
        Emotion::validate_selection(&emotions)?;

        let mut record = Record::new(String::new(), location, emotions, artifact.duration_secs());
        let blob_name = format!("{}.{}", record.id, artifact.file_extension());
        record.audio_url = self.backend.put_blob(&blob_name, artifact.bytes())?;

        self.records.insert(0, record);

        if let Err(e) = self.save() {
            let record = self.records.remove(0);
            if let Err(cleanup) = self.backend.remove_blob(&record.audio_url) {
                warn!("Failed to remove orphaned blob {}: {}", record.audio_url, cleanup);
            }
            return Err(e);
        }

        let record = &self.records[0];
        info!(
            "Record {} shared: {}s at {:.4}, {:.4}",
            record.id, record.duration, record.location.latitude, record.location.longitude
        );

        Ok(record)
    }

    pub fn get(&self, id: Uuid) -> Result<&Record> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| Error::not_found("Record", id))
    }

    /// Append a response to one record
    pub fn add_response(&mut self, record_id: Uuid, content: &str, is_audio: bool) -> Result<&Response> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::EmptyResponse);
        }

        let index = self
            .records
            .iter()
            .position(|record| record.id == record_id)
            .ok_or_else(|| Error::not_found("Record", record_id))?;

        self.records[index]
            .responses
            .push(Response::new(record_id, content.to_string(), is_audio));

        if let Err(e) = self.save() {
            self.records[index].responses.pop();
            return Err(e);
        }

        let responses = &self.records[index].responses;
        let response = &responses[responses.len() - 1];
        info!("Response {} added to record {}", response.id, record_id);

        Ok(response)
    }

    /// Records within `radius_km` of `observer`, nearest first
    pub fn nearby(&self, observer: Coordinate, radius_km: f64) -> Vec<Nearby<'_, Record>> {
        ProximityIndex::query(observer, radius_km, &self.records)
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string(&self.records)?;
        self.backend.set(&self.key, &json)
    }
}
