//! Source table lifecycle: load once, re-read on resume, store at pause.

use volley_core::{LoadError, SourceId, StoreError};

use crate::params::{ParameterBlock, SourceRecord};

/// Dense array of per-source state records, addressable by local index.
///
/// Allocated exactly once, on first load. Resume re-reads the same
/// shared-memory span into the existing allocation; pause writes the
/// live records back so the host sees the final regime and countdown of
/// every source.
#[derive(Clone, Debug)]
pub struct SourceTable {
    records: Vec<SourceRecord>,
}

impl SourceTable {
    /// Decode `n_sources` records from the parameter region.
    ///
    /// `region` is the whole parameter region; records follow the block.
    pub fn load(params: &ParameterBlock, region: &[u8]) -> Result<Self, LoadError> {
        let mut table = Self {
            records: Vec::with_capacity(params.n_sources as usize),
        };
        table.read_records(params, region, true)?;
        Ok(table)
    }

    /// Re-read records into the existing allocation.
    pub fn reload(&mut self, params: &ParameterBlock, region: &[u8]) -> Result<(), LoadError> {
        if params.n_sources as usize != self.records.len() {
            return Err(LoadError::SourceCountChanged {
                was: self.records.len() as u32,
                now: params.n_sources,
            });
        }
        self.read_records(params, region, false)
    }

    fn read_records(
        &mut self,
        params: &ParameterBlock,
        region: &[u8],
        first_load: bool,
    ) -> Result<(), LoadError> {
        let n = params.n_sources as usize;
        let needed = ParameterBlock::ENCODED_LEN + n * SourceRecord::ENCODED_LEN;
        if region.len() < needed {
            return Err(LoadError::Truncated {
                what: "source table",
                needed,
                got: region.len(),
            });
        }
        for i in 0..n {
            let at = ParameterBlock::ENCODED_LEN + i * SourceRecord::ENCODED_LEN;
            let record = SourceRecord::decode(&region[at..], i)?;
            if first_load {
                self.records.push(record);
            } else {
                self.records[i] = record;
            }
        }
        Ok(())
    }

    /// Encode every record back into the parameter region after the block.
    pub fn store(&self, region: &mut [u8]) -> Result<(), StoreError> {
        let needed = ParameterBlock::ENCODED_LEN + self.records.len() * SourceRecord::ENCODED_LEN;
        if region.len() < needed {
            return Err(StoreError::RegionTooSmall {
                what: "source table",
                needed,
                got: region.len(),
            });
        }
        let mut bytes = Vec::with_capacity(self.records.len() * SourceRecord::ENCODED_LEN);
        for record in &self.records {
            record.encode_into(&mut bytes);
        }
        region[ParameterBlock::ENCODED_LEN..needed].copy_from_slice(&bytes);
        Ok(())
    }

    /// Number of sources in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table holds no sources. Never true after a valid load.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Shared access to one record.
    pub fn get(&self, source: SourceId) -> &SourceRecord {
        &self.records[source.0 as usize]
    }

    /// Exclusive access to one record.
    pub fn get_mut(&mut self, source: SourceId) -> &mut SourceRecord {
        &mut self.records[source.0 as usize]
    }

    /// Iterate records in source order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.records.iter()
    }
}
