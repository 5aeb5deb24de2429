use uuid::Uuid;

/// A finished recording: every captured chunk concatenated in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    id: Uuid,
    bytes: Vec<u8>,
    mime_type: String,
    duration_secs: u64,
}

impl AudioArtifact {
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime_type: impl Into<String>, duration_secs: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes: chunks.concat(),
            mime_type: mime_type.into(),
            duration_secs,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Whole seconds spent recording, excluding pauses
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// File extension matching the mime type, used when the artifact is stored
    pub fn file_extension(&self) -> &'static str {
        let essence = self.mime_type.split(';').next().unwrap_or_default().trim();
        match essence {
            "audio/webm" => "webm",
            "audio/wav" | "audio/wave" | "audio/x-wav" => "wav",
            "audio/ogg" => "ogg",
            "audio/mp4" => "m4a",
            "audio/mpeg" => "mp3",
            _ => "bin",
        }
    }
}
