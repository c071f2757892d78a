//! The shared-memory image: directory header and the four named regions.
//!
//! The loader writes one contiguous image per core: a directory header
//! (magic, format version, four offset/length entries) followed by the
//! region payloads. The core resolves regions through the directory so
//! the loader is free to place and size them; the core never assumes
//! adjacency.

use indexmap::IndexMap;

use volley_core::LoadError;

use crate::params::{read_u32, ParameterBlock, SourceRecord, SystemConfig};

/// Magic word at the start of every image ("VOLY").
pub const MAGIC: u32 = 0x564F_4C59;
/// Format version understood by this core: major 1, minor 0.
pub const VERSION: (u16, u16) = (1, 0);
/// Directory header size: magic, version, four offset/length pairs.
pub const HEADER_LEN: usize = 8 + 4 * 8;
/// Size of the provenance region payload.
pub const PROVENANCE_LEN: usize = 32;

/// The four named regions of a core's shared-memory image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// Simulation timing and subsystem priority slots.
    System,
    /// Parameter block followed by the source records.
    Parameters,
    /// Recording subsystem's store; opaque to this core.
    SpikeHistory,
    /// Provenance counters, written at finalise.
    Provenance,
}

impl Region {
    /// All regions in directory order.
    pub const ALL: [Region; 4] = [
        Region::System,
        Region::Parameters,
        Region::SpikeHistory,
        Region::Provenance,
    ];
}

#[derive(Clone, Copy, Debug)]
struct RegionSpan {
    offset: usize,
    len: usize,
}

/// A parsed shared-memory image with resolved region spans.
///
/// Owns the image bytes. Regions are re-read (not re-parsed) across
/// pause/resume; the directory is fixed for the image's lifetime.
#[derive(Clone, Debug)]
pub struct CoreMemory {
    bytes: Vec<u8>,
    directory: IndexMap<Region, RegionSpan>,
}

impl CoreMemory {
    /// Parse an image, validating magic, version, and region bounds.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, LoadError> {
        if bytes.len() < HEADER_LEN {
            return Err(LoadError::Truncated {
                what: "image header",
                needed: HEADER_LEN,
                got: bytes.len(),
            });
        }
        let magic = read_u32(&bytes, 0);
        if magic != MAGIC {
            return Err(LoadError::BadMagic { found: magic });
        }
        let version = read_u32(&bytes, 4);
        let (major, minor) = ((version >> 16) as u16, version as u16);
        if major != VERSION.0 {
            return Err(LoadError::UnsupportedVersion { major, minor });
        }

        let mut directory = IndexMap::with_capacity(Region::ALL.len());
        for (i, region) in Region::ALL.into_iter().enumerate() {
            let offset = read_u32(&bytes, 8 + i * 8) as usize;
            let len = read_u32(&bytes, 12 + i * 8) as usize;
            if offset.checked_add(len).is_none_or(|end| end > bytes.len()) {
                return Err(LoadError::RegionOutOfBounds {
                    region: i,
                    offset,
                    len,
                    image_len: bytes.len(),
                });
            }
            directory.insert(region, RegionSpan { offset, len });
        }

        Ok(Self { bytes, directory })
    }

    /// Start building an image the way the loader does.
    pub fn builder() -> CoreMemoryBuilder {
        CoreMemoryBuilder::new()
    }

    /// Read access to a region's payload.
    pub fn region(&self, region: Region) -> &[u8] {
        let span = self.directory[&region];
        &self.bytes[span.offset..span.offset + span.len]
    }

    /// Write access to a region's payload.
    pub fn region_mut(&mut self, region: Region) -> &mut [u8] {
        let span = self.directory[&region];
        &mut self.bytes[span.offset..span.offset + span.len]
    }

    /// The whole image, e.g. for handing back to a host-side reader.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ── CoreMemoryBuilder ────────────────────────────────────────────

/// Builds a loader-shaped image from typed configuration.
///
/// This is the host/loader side of the contract and the fixture used by
/// tests: regions are laid out back-to-back after the header, the
/// parameter region sized for the block plus every source record, and
/// the provenance region zeroed.
pub struct CoreMemoryBuilder {
    system: Option<SystemConfig>,
    params: Option<ParameterBlock>,
    sources: Vec<SourceRecord>,
    history_len: usize,
}

impl CoreMemoryBuilder {
    fn new() -> Self {
        Self {
            system: None,
            params: None,
            sources: Vec::new(),
            history_len: 0,
        }
    }

    /// Set the system region contents.
    pub fn system(mut self, system: SystemConfig) -> Self {
        self.system = Some(system);
        self
    }

    /// Set the parameter block.
    pub fn parameters(mut self, params: ParameterBlock) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the initial source records. Must match `n_sources`.
    pub fn sources(mut self, sources: Vec<SourceRecord>) -> Self {
        self.sources = sources;
        self
    }

    /// Reserve space in the (opaque) spike-history region.
    pub fn history_capacity(mut self, bytes: usize) -> Self {
        self.history_len = bytes;
        self
    }

    /// Assemble the image.
    ///
    /// # Panics
    ///
    /// Panics if system or parameters were not set, or if the source
    /// record count does not match the block's `n_sources`.
    pub fn build(self) -> CoreMemory {
        let system = self.system.expect("system config is required");
        let params = self.params.expect("parameter block is required");
        assert_eq!(
            self.sources.len(),
            params.n_sources as usize,
            "source record count must match n_sources"
        );

        let mut system_bytes = Vec::with_capacity(SystemConfig::ENCODED_LEN);
        system.encode_into(&mut system_bytes);

        let mut param_bytes =
            Vec::with_capacity(ParameterBlock::ENCODED_LEN + self.sources.len() * SourceRecord::ENCODED_LEN);
        params.encode_into(&mut param_bytes);
        for record in &self.sources {
            record.encode_into(&mut param_bytes);
        }

        let lens = [
            system_bytes.len(),
            param_bytes.len(),
            self.history_len,
            PROVENANCE_LEN,
        ];
        let mut offsets = [0usize; 4];
        let mut cursor = HEADER_LEN;
        for (offset, len) in offsets.iter_mut().zip(lens) {
            *offset = cursor;
            cursor += len;
        }

        let mut bytes = Vec::with_capacity(cursor);
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        let version = (u32::from(VERSION.0) << 16) | u32::from(VERSION.1);
        bytes.extend_from_slice(&version.to_le_bytes());
        for (offset, len) in offsets.iter().zip(lens) {
            bytes.extend_from_slice(&(*offset as u32).to_le_bytes());
            bytes.extend_from_slice(&(len as u32).to_le_bytes());
        }
        bytes.extend_from_slice(&system_bytes);
        bytes.extend_from_slice(&param_bytes);
        bytes.resize(cursor, 0);

        CoreMemory::parse(bytes).expect("builder produced an invalid image")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::{GlobalSourceId, Tick};
    use volley_rand::Seed;

    use crate::params::Regime;

    fn system() -> SystemConfig {
        SystemConfig {
            timer_period_us: 1000,
            run_forever: false,
            total_ticks: 100,
            recording_enabled: true,
            host_msg_priority: 1,
            dma_priority: 0,
        }
    }

    fn params(n: u32) -> ParameterBlock {
        ParameterBlock {
            has_key: true,
            base_key: 0x0200_0000,
            rate_update_mask: 0xFF,
            random_backoff_us: 0,
            inter_spike_gap_ticks: 0,
            first_source_id: GlobalSourceId(0),
            n_sources: n,
            slow_fast_cutoff: 0.25,
            seconds_per_tick: 0.001,
            ticks_per_second: 1000.0,
            seed: Seed([1, 2, 3, 4]),
        }
    }

    fn record() -> SourceRecord {
        SourceRecord {
            start: Tick(0),
            end: Tick(u32::MAX),
            regime: Regime::Slow {
                mean_isi_ticks: 0.0,
                time_to_spike_ticks: 0.0,
            },
        }
    }

    #[test]
    fn builder_image_parses_and_round_trips() {
        let mem = CoreMemory::builder()
            .system(system())
            .parameters(params(2))
            .sources(vec![record(), record()])
            .build();

        assert_eq!(SystemConfig::decode(mem.region(Region::System)).unwrap(), system());
        let block = ParameterBlock::decode(mem.region(Region::Parameters)).unwrap();
        assert_eq!(block, params(2));
        assert_eq!(mem.region(Region::Provenance).len(), PROVENANCE_LEN);
        assert!(mem.region(Region::SpikeHistory).is_empty());
    }

    #[test]
    fn bad_magic_rejected() {
        let mem = CoreMemory::builder()
            .system(system())
            .parameters(params(1))
            .sources(vec![record()])
            .build();
        let mut bytes = mem.as_bytes().to_vec();
        bytes[0] ^= 0xFF;
        assert!(matches!(
            CoreMemory::parse(bytes),
            Err(LoadError::BadMagic { .. })
        ));
    }

    #[test]
    fn future_major_version_rejected() {
        let mem = CoreMemory::builder()
            .system(system())
            .parameters(params(1))
            .sources(vec![record()])
            .build();
        let mut bytes = mem.as_bytes().to_vec();
        bytes[4..8].copy_from_slice(&((2u32 << 16) | 0).to_le_bytes());
        assert!(matches!(
            CoreMemory::parse(bytes),
            Err(LoadError::UnsupportedVersion { major: 2, .. })
        ));
    }

    #[test]
    fn region_past_image_end_rejected() {
        let mem = CoreMemory::builder()
            .system(system())
            .parameters(params(1))
            .sources(vec![record()])
            .build();
        let mut bytes = mem.as_bytes().to_vec();
        let huge = (bytes.len() as u32 + 1000).to_le_bytes();
        bytes[12..16].copy_from_slice(&huge);
        assert!(matches!(
            CoreMemory::parse(bytes),
            Err(LoadError::RegionOutOfBounds { region: 0, .. })
        ));
    }

    #[test]
    #[should_panic(expected = "must match n_sources")]
    fn builder_rejects_source_count_mismatch() {
        CoreMemory::builder()
            .system(system())
            .parameters(params(3))
            .sources(vec![record()])
            .build();
    }

    #[test]
    fn region_mut_writes_are_visible() {
        let mut mem = CoreMemory::builder()
            .system(system())
            .parameters(params(1))
            .sources(vec![record()])
            .build();
        mem.region_mut(Region::Provenance)[0] = 0xAB;
        assert_eq!(mem.region(Region::Provenance)[0], 0xAB);
    }
}
