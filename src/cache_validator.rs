use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Cached registry payload sealed with a SHA-256 checksum.
///
/// Registry lookups are cached as JSON strings; a checksum mismatch on read
/// means the entry is discarded and the registry is queried again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedCacheEntry {
    /// The cached payload (JSON string)
    pub data: String,
    /// SHA-256 checksum of `data` (hex encoded)
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    /// Serializes `value` and wraps it with its checksum, ready to be stored.
    pub fn seal<T: Serialize>(value: &T) -> Option<String> {
        let data = serde_json::to_string(value).ok()?;
        serde_json::to_string(&Self::new(data)).ok()
    }

    /// Reads back a sealed value. Returns `None` for malformed or tampered
    /// entries.
    pub fn open<T: DeserializeOwned>(sealed: &str) -> Option<T> {
        let entry: ValidatedCacheEntry = serde_json::from_str(sealed).ok()?;

        if !entry.is_valid() {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            return None;
        }

        serde_json::from_str(&entry.data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::{CompanyRecord, Officer};

    fn record() -> CompanyRecord {
        CompanyRecord {
            razao_social: "ACME COMERCIO LTDA".to_string(),
            situacao: "ATIVA".to_string(),
            qsa: vec![Officer {
                name: "MARIA".to_string(),
                qualification: "49-Sócio-Administrador".to_string(),
            }],
        }
    }

    #[test]
    fn sealed_record_opens_unchanged() {
        let sealed = ValidatedCacheEntry::seal(&record()).unwrap();
        let opened: Option<CompanyRecord> = ValidatedCacheEntry::open(&sealed);
        assert_eq!(opened, Some(record()));
    }

    #[test]
    fn tampered_entry_is_rejected() {
        let sealed = ValidatedCacheEntry::seal(&record()).unwrap();
        let tampered = sealed.replace("ATIVA", "BAIXADA");

        let opened: Option<CompanyRecord> = ValidatedCacheEntry::open(&tampered);
        assert_eq!(opened, None);
    }

    #[test]
    fn garbage_is_rejected() {
        let opened: Option<CompanyRecord> = ValidatedCacheEntry::open("not json");
        assert_eq!(opened, None);
    }

    #[test]
    fn checksum_is_deterministic() {
        let a = ValidatedCacheEntry::new("payload".to_string());
        let b = ValidatedCacheEntry::new("payload".to_string());
        assert_eq!(a.checksum, b.checksum);
        assert!(a.is_valid());
    }
}
