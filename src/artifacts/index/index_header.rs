use crate::artifacts::index::{HEADER_SIZE, IndexError, SIGNATURE, VERSION};
use crate::artifacts::objects::object::Packable;
use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct IndexHeader {
    pub marker: String,
    pub version: u32,
    pub entries_count: u32,
}

impl IndexHeader {
    pub fn empty() -> Self {
        IndexHeader::new(String::from(SIGNATURE), VERSION, 0)
    }

    pub fn with_count(entries_count: u32) -> Self {
        IndexHeader {
            entries_count,
            ..Self::empty()
        }
    }

    /// Parse and validate the 12 header bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_SIZE {
            return Err(IndexError::Truncated);
        }

        let marker = String::from_utf8_lossy(&bytes[0..4]).into_owned();
        if marker != SIGNATURE {
            return Err(IndexError::BadHeader(format!("bad signature '{marker}'")));
        }

        let version = NetworkEndian::read_u32(&bytes[4..8]);
        if version != VERSION {
            return Err(IndexError::BadHeader(format!(
                "unsupported version {version}"
            )));
        }

        let entries_count = NetworkEndian::read_u32(&bytes[8..12]);

        Ok(IndexHeader::new(marker, version, entries_count))
    }
}

impl Packable for IndexHeader {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.write_all(self.marker.as_bytes())?;
        bytes.write_u32::<NetworkEndian>(self.version)?;
        bytes.write_u32::<NetworkEndian>(self.entries_count)?;

        Ok(Bytes::from(bytes))
    }
}
