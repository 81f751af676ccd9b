//! Block attribute persistence with zstd compression.
//!
//! The attribute store is written as a single `.bi` file: a fixed header
//! (magic, version, CRC32 of the payload, payload length) followed by the
//! zstd-compressed bincode encoding of [`MemoryBlockInfo`].

use crate::block_info::MemoryBlockInfo;
use anyhow::{Context, Result};
use crc32fast::Hasher;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Magic number for block info files ("BKST").
const BLOCK_INFO_MAGIC: u32 = 0x424B5354;

/// Current block info file format version.
const BLOCK_INFO_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

/// File name used inside a save directory.
pub const BLOCK_INFO_FILE: &str = "block_info.bi";

#[derive(Debug, Clone)]
struct FileHeader {
    magic: u32,
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl FileHeader {
    fn new(crc32: u32, payload_len: u32) -> Self {
        Self {
            magic: BLOCK_INFO_MAGIC,
            version: BLOCK_INFO_VERSION,
            crc32,
            payload_len,
        }
    }

    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.crc32.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != BLOCK_INFO_MAGIC {
            anyhow::bail!(
                "Invalid block info magic: expected 0x{:08X}, got 0x{:08X}",
                BLOCK_INFO_MAGIC,
                magic
            );
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != BLOCK_INFO_VERSION {
            anyhow::bail!("Unsupported block info version {version}");
        }

        Ok(Self {
            magic,
            version,
            crc32: u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            payload_len: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
        })
    }
}

/// Saves and loads the block attribute store of one world.
pub struct BlockInfoFile {
    path: PathBuf,
}

impl BlockInfoFile {
    /// Store rooted at the given save directory, creating it if needed.
    pub fn new<P: AsRef<Path>>(save_dir: P) -> Result<Self> {
        let save_dir = save_dir.as_ref();
        fs::create_dir_all(save_dir).context("Failed to create save directory")?;
        Ok(Self {
            path: save_dir.join(BLOCK_INFO_FILE),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write the whole store to disk.
    pub fn save(&self, store: &MemoryBlockInfo) -> Result<()> {
        let serialized = bincode::serialize(store).context("Failed to serialize block info")?;

        // Level 3 keeps saves fast; the payload is small text-heavy maps.
        let compressed =
            zstd::encode_all(&serialized[..], 3).context("Failed to compress block info")?;

        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let header = FileHeader::new(hasher.finalize(), compressed.len() as u32);

        let mut file = File::create(&self.path).context("Failed to create block info file")?;
        file.write_all(&header.to_bytes())
            .context("Failed to write header")?;
        file.write_all(&compressed)
            .context("Failed to write payload")?;
        Ok(())
    }

    /// Read the store back from disk.
    pub fn load(&self) -> Result<MemoryBlockInfo> {
        let mut file = File::open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut header_bytes = [0u8; HEADER_LEN];
        file.read_exact(&mut header_bytes)
            .context("Failed to read block info header")?;
        let header = FileHeader::from_bytes(&header_bytes)?;

        let mut compressed = vec![0u8; header.payload_len as usize];
        file.read_exact(&mut compressed)
            .context("Failed to read block info payload")?;

        let mut hasher = Hasher::new();
        hasher.update(&compressed);
        let computed_crc = hasher.finalize();
        if computed_crc != header.crc32 {
            anyhow::bail!(
                "CRC32 mismatch: expected {:08X}, got {:08X}",
                header.crc32,
                computed_crc
            );
        }

        let decompressed =
            zstd::decode_all(&compressed[..]).context("Failed to decompress block info")?;
        bincode::deserialize(&decompressed).context("Failed to deserialize block info")
    }

    /// Load the store, or start empty when no file has been written yet.
    pub fn load_or_default(&self) -> Result<MemoryBlockInfo> {
        if !self.exists() {
            return Ok(MemoryBlockInfo::default());
        }
        self.load()
    }
}
