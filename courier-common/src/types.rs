/// Identifier for a send record
///
/// A globally unique ULID. ULIDs are lexicographically sortable by creation
/// time and collision-resistant, which makes them usable both as primary keys
/// and as filenames for the file-backed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmailId {
    id: ulid::Ulid,
}

impl EmailId {
    /// Create an id from an existing ULID
    #[must_use]
    pub const fn new(id: ulid::Ulid) -> Self {
        Self { id }
    }

    /// Generate a new unique id
    #[must_use]
    pub fn generate() -> Self {
        Self {
            id: ulid::Ulid::new(),
        }
    }

    /// Parse an id from its canonical 26-character string form
    pub fn parse(value: &str) -> Option<Self> {
        ulid::Ulid::from_string(value).ok().map(|id| Self { id })
    }

    /// Parse an id from a store filename like `01ARYZ6S41....bin`
    ///
    /// Rejects path separators and traversal patterns so a hostile filename
    /// can never escape the store directory.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            return None;
        }

        let stem = filename.strip_suffix(".bin")?;
        Self::parse(stem)
    }

    /// Get the underlying ULID
    #[must_use]
    pub const fn ulid(&self) -> ulid::Ulid {
        self.id
    }

    /// Milliseconds since the Unix epoch encoded in this id
    #[must_use]
    pub const fn timestamp_ms(&self) -> u64 {
        self.id.timestamp_ms()
    }
}

impl std::fmt::Display for EmailId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl serde::Serialize for EmailId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.id.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for EmailId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let id = ulid::Ulid::from_string(&s).map_err(serde::de::Error::custom)?;
        Ok(Self { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_id_roundtrip() {
        let id = EmailId::generate();
        let parsed = EmailId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_email_id_filename_validation() {
        assert!(EmailId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin").is_some());

        // Security: traversal and separators rejected
        assert!(EmailId::from_filename("../etc/passwd.bin").is_none());
        assert!(EmailId::from_filename("foo/bar.bin").is_none());
        assert!(EmailId::from_filename("..\\windows\\system32.bin").is_none());

        // Format: only .bin with a valid ULID stem
        assert!(EmailId::from_filename("not_a_valid_ulid.bin").is_none());
        assert!(EmailId::from_filename("01ARZ3NDEKTSV4RRFFQ69G5FAV.json").is_none());
    }
}
