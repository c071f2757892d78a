//! Growable ragged bitfield of per-tick spike counts.

use volley_core::{RecordFrame, SourceId, Tick};

/// One tick's spike record as a stack of bit-plane layers.
///
/// Bit `s` of layer `k` means "source `s` emitted at least `k + 1` spikes
/// this tick". Layers are allocated lazily: the buffer starts with zero
/// capacity and grows (by doubling) the first time a larger simultaneous
/// spike count is observed. Capacity never shrinks, so a burst early in a
/// run pays the allocation once.
#[derive(Debug)]
pub struct SpikeAccumulator {
    n_sources: u32,
    words_per_layer: usize,
    layers: Vec<Vec<u32>>,
    n_layers: usize,
    grow_events: u32,
}

impl SpikeAccumulator {
    /// Create an empty accumulator for `n_sources` sources.
    pub fn new(n_sources: u32) -> Self {
        Self {
            n_sources,
            words_per_layer: (n_sources as usize).div_ceil(32),
            layers: Vec::new(),
            n_layers: 0,
            grow_events: 0,
        }
    }

    /// Number of sources each layer covers.
    pub fn n_sources(&self) -> u32 {
        self.n_sources
    }

    /// Number of layers currently populated.
    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    /// Number of layers currently allocated.
    pub fn capacity(&self) -> usize {
        self.layers.len()
    }

    /// How many times the buffer has been grown. Reported as provenance.
    pub fn grow_events(&self) -> u32 {
        self.grow_events
    }

    /// Whether no source has been marked since the last reset.
    pub fn is_empty(&self) -> bool {
        self.n_layers == 0
    }

    /// Record that `source` emitted `count` spikes this tick.
    ///
    /// Sets bit `source` in layers `0..count`, growing the layer stack if
    /// `count` exceeds the current capacity. `count == 0` is a no-op.
    pub fn mark(&mut self, source: SourceId, count: u32) {
        if count == 0 {
            return;
        }
        let count = count as usize;
        if count > self.layers.len() {
            self.grow_to(count);
        }
        self.n_layers = self.n_layers.max(count);

        let word = (source.0 / 32) as usize;
        let bit = 1u32 << (source.0 % 32);
        for layer in &mut self.layers[..count] {
            layer[word] |= bit;
        }
    }

    /// Zero the populated layers and mark the buffer empty.
    ///
    /// Only the first `n_layers` layers are touched; layers beyond that
    /// are already zero.
    pub fn reset(&mut self) {
        for layer in &mut self.layers[..self.n_layers] {
            layer.fill(0);
        }
        self.n_layers = 0;
    }

    /// The serializable view of the populated layers for tick `time`.
    pub fn frame(&self, time: Tick) -> RecordFrame<'_> {
        RecordFrame {
            time,
            layers: &self.layers[..self.n_layers],
        }
    }

    /// Whether bit `source` of layer `k` is set. Readers use this to
    /// recover "source fired at least `k + 1` times".
    pub fn bit(&self, layer: usize, source: SourceId) -> bool {
        if layer >= self.n_layers {
            return false;
        }
        let word = (source.0 / 32) as usize;
        self.layers[layer][word] & (1 << (source.0 % 32)) != 0
    }

    /// Total spikes recorded this tick: the popcount summed over layers.
    pub fn total_spikes(&self) -> u64 {
        self.layers[..self.n_layers]
            .iter()
            .flat_map(|layer| layer.iter())
            .map(|w| u64::from(w.count_ones()))
            .sum()
    }

    fn grow_to(&mut self, count: usize) {
        let target = count.max(self.layers.len() * 2);
        log::debug!(
            "spike accumulator growing {} -> {target} layers",
            self.layers.len()
        );
        while self.layers.len() < target {
            self.layers.push(vec![0; self.words_per_layer]);
        }
        self.grow_events += 1;
    }
}
