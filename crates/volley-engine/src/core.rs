//! The spike generator core: owned state and the per-tick callback.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use volley_core::{
    FabricLink, GlobalSourceId, HardwareClock, LoadError, RecordSink, RoutingKey, SourceId,
    StoreError, Tick,
};
use volley_rand::KissRng;
use volley_record::Recorder;

use crate::intake::{self, RateUpdate};
use crate::memory::{CoreMemory, Region, PROVENANCE_LEN};
use crate::params::{read_u32, read_u64, ParameterBlock, Regime, SourceRecord, SystemConfig};
use crate::rate::RateTarget;
use crate::table::SourceTable;
use crate::throttle::DispatchThrottle;

// ── TickOutcome ──────────────────────────────────────────────────

/// Result of one timer callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick executed; carries the tick index that ran.
    Ran(Tick),
    /// The run limit was reached (or had been reached earlier); state is
    /// persisted and the same tick index replays after [`SpikeCore::resume`].
    Paused,
}

// ── Provenance ───────────────────────────────────────────────────

/// Counters written to the provenance region at finalise.
///
/// Layout (32 bytes): `last_tick: u32`, `spikes_generated: u64`,
/// `packets_sent: u64`, `rate_updates_applied: u32`,
/// `rate_updates_ignored: u32`, `accumulator_grows: u32`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provenance {
    /// Tick index at which the run parked.
    pub last_tick: Tick,
    /// Spikes generated across all sources (emitted or not).
    pub spikes_generated: u64,
    /// Packets accepted by the fabric.
    pub packets_sent: u64,
    /// Rate updates that landed in this core's window.
    pub rate_updates_applied: u32,
    /// Rate updates addressed to some other core's sources.
    pub rate_updates_ignored: u32,
    /// Times the recording buffer had to grow.
    pub accumulator_grows: u32,
}

impl Provenance {
    /// Encoded size in bytes.
    pub const ENCODED_LEN: usize = PROVENANCE_LEN;

    /// Write the encoded form over the provenance region.
    pub fn store(&self, region: &mut [u8]) -> Result<(), StoreError> {
        if region.len() < Self::ENCODED_LEN {
            return Err(StoreError::RegionTooSmall {
                what: "provenance",
                needed: Self::ENCODED_LEN,
                got: region.len(),
            });
        }
        region[0..4].copy_from_slice(&self.last_tick.0.to_le_bytes());
        region[4..12].copy_from_slice(&self.spikes_generated.to_le_bytes());
        region[12..20].copy_from_slice(&self.packets_sent.to_le_bytes());
        region[20..24].copy_from_slice(&self.rate_updates_applied.to_le_bytes());
        region[24..28].copy_from_slice(&self.rate_updates_ignored.to_le_bytes());
        region[28..32].copy_from_slice(&self.accumulator_grows.to_le_bytes());
        Ok(())
    }

    /// Decode from a provenance region. Host-side readback.
    pub fn decode(region: &[u8]) -> Result<Self, LoadError> {
        if region.len() < Self::ENCODED_LEN {
            return Err(LoadError::Truncated {
                what: "provenance",
                needed: Self::ENCODED_LEN,
                got: region.len(),
            });
        }
        Ok(Self {
            last_tick: Tick(read_u32(region, 0)),
            spikes_generated: read_u64(region, 4),
            packets_sent: read_u64(region, 12),
            rate_updates_applied: read_u32(region, 20),
            rate_updates_ignored: read_u32(region, 24),
            accumulator_grows: read_u32(region, 28),
        })
    }
}

// ── SpikeCore ────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Running,
    Paused,
}

/// One core's worth of Poisson sources and everything they touch.
///
/// Owns the parameter block, the source table, the random streams, the
/// recorder, and the dispatch throttle; the fabric, clock, and record
/// sink are the platform seams. All entry points are methods; on
/// hardware they are registered as callbacks at the priorities described
/// in the crate docs.
pub struct SpikeCore {
    system: SystemConfig,
    params: ParameterBlock,
    table: SourceTable,
    rng: KissRng,
    jitter: ChaCha8Rng,
    recorder: Recorder,
    throttle: DispatchThrottle,
    next_tick: Tick,
    state: RunState,
    clock: Box<dyn HardwareClock>,
    fabric: Box<dyn FabricLink>,
    sink: Box<dyn RecordSink>,
    spikes_generated: u64,
    packets_sent: u64,
    rate_updates_applied: u32,
    rate_updates_ignored: u32,
}

impl SpikeCore {
    /// Load a core from a shared-memory image.
    ///
    /// Decodes the system and parameter regions, allocates the source
    /// table, and seeds the random streams. Any decode failure is fatal
    /// to this core.
    pub fn load(
        mem: &CoreMemory,
        clock: Box<dyn HardwareClock>,
        fabric: Box<dyn FabricLink>,
        sink: Box<dyn RecordSink>,
    ) -> Result<Self, LoadError> {
        let system = SystemConfig::decode(mem.region(Region::System))?;
        let param_region = mem.region(Region::Parameters);
        let params = ParameterBlock::decode(param_region)?;
        params.validate()?;
        let table = SourceTable::load(&params, param_region)?;

        let rng = KissRng::from_seed(params.seed);
        let jitter = ChaCha8Rng::seed_from_u64(Self::jitter_seed(&params));
        let recorder = Recorder::new(params.n_sources, system.recording_enabled);
        let throttle = DispatchThrottle::new(params.inter_spike_gap_ticks);

        log::info!(
            "loaded {} sources at global offset {}, {} run",
            params.n_sources,
            params.first_source_id,
            if system.run_forever { "endless" } else { "finite" },
        );

        Ok(Self {
            system,
            params,
            table,
            rng,
            jitter,
            recorder,
            throttle,
            next_tick: Tick(0),
            state: RunState::Running,
            clock,
            fabric,
            sink,
            spikes_generated: 0,
            packets_sent: 0,
            rate_updates_applied: 0,
            rate_updates_ignored: 0,
        })
    }

    /// Derive a jitter-stream seed that is decorrelated from the spike
    /// stream. The jitter only moves work within a tick, never the
    /// schedule, so it does not participate in determinism.
    fn jitter_seed(params: &ParameterBlock) -> u64 {
        let [a, b, c, d] = params.seed.0;
        ((u64::from(a) << 32) | u64::from(b)) ^ ((u64::from(c) << 32) | u64::from(d))
    }

    // ── Timer path ───────────────────────────────────────────────

    /// The periodic timer callback: run one tick.
    ///
    /// Non-reentrant by contract. When a finite run has reached its
    /// limit, persists all state back to `mem`, finalises the recorder,
    /// and parks; the held tick index replays after [`resume`](Self::resume).
    pub fn on_timer_tick(&mut self, mem: &mut CoreMemory) -> Result<TickOutcome, StoreError> {
        if self.state == RunState::Paused {
            return Ok(TickOutcome::Paused);
        }
        let t = self.next_tick;
        if let Some(limit) = self.system.run_limit() {
            if t >= limit {
                self.pause(mem, t)?;
                return Ok(TickOutcome::Paused);
            }
        }

        // Random back-off desynchronises cores that share a timer.
        if self.params.random_backoff_us > 0 {
            let delay = self.jitter.random_range(0..=self.params.random_backoff_us);
            self.clock.busy_wait_us(delay);
        }

        self.throttle.arm(self.clock.as_ref());
        self.recorder.reset();
        self.sweep(t);

        if self.recorder.enabled() {
            let Self {
                recorder,
                sink,
                clock,
                ..
            } = self;
            recorder.flush(t, sink.as_mut(), clock.as_ref());
            sink.end_of_tick(t);
        }

        self.next_tick = t.next();
        Ok(TickOutcome::Ran(t))
    }

    /// Generate and dispatch for every source, in source order.
    fn sweep(&mut self, t: Tick) {
        let Self {
            params,
            table,
            rng,
            recorder,
            throttle,
            clock,
            fabric,
            spikes_generated,
            packets_sent,
            ..
        } = self;

        for index in 0..table.len() as u32 {
            let source = SourceId(index);
            let record = table.get_mut(source);
            if !record.active_at(t) {
                continue;
            }
            let key = RoutingKey::for_source(params.base_key, source);

            match &mut record.regime {
                Regime::Fast { exp_minus_lambda } => {
                    let count = rng.poisson_count(*exp_minus_lambda);
                    if count > 0 {
                        recorder.mark(source, count);
                        *spikes_generated += u64::from(count);
                        if params.has_key {
                            for _ in 0..count {
                                throttle.send(clock.as_ref(), fabric.as_mut(), key);
                            }
                            *packets_sent += u64::from(count);
                        }
                    }
                }
                Regime::Slow {
                    mean_isi_ticks,
                    time_to_spike_ticks,
                } => {
                    if *mean_isi_ticks == 0.0 {
                        continue;
                    }
                    let mut crossings = 0u32;
                    while *time_to_spike_ticks <= 0.0 {
                        crossings += 1;
                        if params.has_key {
                            throttle.send(clock.as_ref(), fabric.as_mut(), key);
                            *packets_sent += 1;
                        }
                        *time_to_spike_ticks += rng.interval_ticks(*mean_isi_ticks);
                    }
                    if crossings > 0 {
                        recorder.mark(source, crossings);
                        *spikes_generated += u64::from(crossings);
                    }
                    *time_to_spike_ticks -= 1.0;
                }
            }
        }
    }

    /// Persist everything and park. The held tick replays after resume.
    fn pause(&mut self, mem: &mut CoreMemory, t: Tick) -> Result<(), StoreError> {
        // The live stream state goes back into the seed words so a
        // resumed run continues the exact schedule.
        self.params.seed = self.rng.state();

        let region = mem.region_mut(Region::Parameters);
        self.params.store(region)?;
        self.table.store(region)?;

        let Self {
            recorder,
            sink,
            clock,
            ..
        } = self;
        recorder.finalise(t, sink.as_mut(), clock.as_ref());

        self.provenance(t).store(mem.region_mut(Region::Provenance))?;
        self.state = RunState::Paused;
        log::info!("paused at tick {t}, state persisted");
        Ok(())
    }

    /// Re-read configuration and state after a host-driven pause.
    ///
    /// The host may have rewritten the system region (extending the run)
    /// or the parameter region (new keys, rates, or seed). The table is
    /// re-read into its existing allocation; the tick index is kept so
    /// the held tick executes next.
    pub fn resume(&mut self, mem: &CoreMemory) -> Result<(), LoadError> {
        let system = SystemConfig::decode(mem.region(Region::System))?;
        let param_region = mem.region(Region::Parameters);
        let params = ParameterBlock::decode(param_region)?;
        params.validate()?;
        self.table.reload(&params, param_region)?;

        self.rng = KissRng::restore(params.seed);
        self.throttle = DispatchThrottle::new(params.inter_spike_gap_ticks);
        self.recorder.set_enabled(system.recording_enabled);
        self.system = system;
        self.params = params;
        self.state = RunState::Running;
        log::info!("resumed at tick {}", self.next_tick);
        Ok(())
    }

    // ── Rate-update paths ────────────────────────────────────────

    /// The multicast-packet callback: one rate update from the fabric.
    pub fn on_multicast_packet(&mut self, key: RoutingKey, payload: u32) {
        let update = intake::decode_multicast_update(key, payload, self.params.rate_update_mask);
        self.apply_update(update);
    }

    /// The host-message callback: a batch of rate updates.
    pub fn on_host_message(&mut self, payload: &[u8]) {
        for update in intake::decode_host_batch(payload) {
            self.apply_update(update);
        }
    }

    /// Apply one rate update directly (the runner's command path).
    pub fn set_rate(&mut self, id: GlobalSourceId, rate_hz: f64) {
        self.apply_update(RateUpdate { id, rate_hz });
    }

    fn apply_update(&mut self, update: RateUpdate) {
        match self.table.set_rate(&self.params, update.id, update.rate_hz) {
            RateTarget::Applied => self.rate_updates_applied += 1,
            RateTarget::Foreign => self.rate_updates_ignored += 1,
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    /// The system configuration this core was loaded with.
    pub fn system(&self) -> &SystemConfig {
        &self.system
    }

    /// The parameter block as currently held in memory.
    pub fn params(&self) -> &ParameterBlock {
        &self.params
    }

    /// The tick that will execute on the next timer callback.
    pub fn next_tick(&self) -> Tick {
        self.next_tick
    }

    /// Whether the core has parked at its run limit.
    pub fn is_paused(&self) -> bool {
        self.state == RunState::Paused
    }

    /// One source's current record.
    pub fn source(&self, source: SourceId) -> &SourceRecord {
        self.table.get(source)
    }

    /// The provenance counters as they stand, stamped with `last_tick`.
    pub fn provenance(&self, last_tick: Tick) -> Provenance {
        Provenance {
            last_tick,
            spikes_generated: self.spikes_generated,
            packets_sent: self.packets_sent,
            rate_updates_applied: self.rate_updates_applied,
            rate_updates_ignored: self.rate_updates_ignored,
            accumulator_grows: self.recorder.accumulator().grow_events(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::fixed::f64_to_s1615;
    use volley_rand::Seed;
    use volley_test_utils::{CollectingSink, MockFabric, TestClock};

    use crate::memory::CoreMemoryBuilder;

    const BASE_KEY: u32 = 0x0400_0000;

    struct Rig {
        clock: TestClock,
        fabric: MockFabric,
        sink: CollectingSink,
        mem: CoreMemory,
        core: SpikeCore,
    }

    fn silent_source() -> SourceRecord {
        SourceRecord {
            start: Tick(0),
            end: Tick(u32::MAX),
            regime: Regime::Slow {
                mean_isi_ticks: 0.0,
                time_to_spike_ticks: 0.0,
            },
        }
    }

    fn builder(n_sources: u32, total_ticks: u32) -> CoreMemoryBuilder {
        CoreMemory::builder()
            .system(SystemConfig {
                timer_period_us: 1000,
                run_forever: false,
                total_ticks,
                recording_enabled: true,
                host_msg_priority: 1,
                dma_priority: 0,
            })
            .parameters(ParameterBlock {
                has_key: true,
                base_key: BASE_KEY,
                rate_update_mask: 0x0000_FFFF,
                random_backoff_us: 0,
                inter_spike_gap_ticks: 0,
                first_source_id: GlobalSourceId(0),
                n_sources,
                slow_fast_cutoff: 0.25,
                seconds_per_tick: 0.001,
                ticks_per_second: 1000.0,
                seed: Seed([0xC0FF_EE00, 0x1234_5678, 0x9ABC_DEF0, 77]),
            })
            .sources(vec![silent_source(); n_sources as usize])
    }

    fn rig(builder: CoreMemoryBuilder) -> Rig {
        let clock = TestClock::new();
        let fabric = MockFabric::new();
        let sink = CollectingSink::new();
        let mem = builder.build();
        let core = SpikeCore::load(
            &mem,
            Box::new(clock.clone()),
            Box::new(fabric.clone()),
            Box::new(sink.clone()),
        )
        .unwrap();
        Rig {
            clock,
            fabric,
            sink,
            mem,
            core,
        }
    }

    fn run_ticks(rig: &mut Rig, n: u32) {
        for _ in 0..n {
            rig.core.on_timer_tick(&mut rig.mem).unwrap();
        }
    }

    #[test]
    fn zero_rate_source_stays_silent() {
        let mut rig = rig(builder(1, 100));
        run_ticks(&mut rig, 100);
        assert_eq!(rig.fabric.sent_count(), 0);
        assert!(rig.sink.frames().is_empty());
        assert_eq!(rig.sink.ticks_completed().len(), 100);
    }

    #[test]
    fn fast_source_emits_and_records_equally() {
        let mut rig = rig(builder(1, 200));
        rig.core.set_rate(GlobalSourceId(0), 1000.0);
        run_ticks(&mut rig, 200);

        let sent = rig.fabric.sent_count() as u64;
        assert!(sent > 0, "lambda=1 over 200 ticks should spike");
        assert_eq!(rig.sink.total_spikes(), sent);
        let prov = rig.core.provenance(Tick(200));
        assert_eq!(prov.spikes_generated, sent);
        assert_eq!(prov.packets_sent, sent);
        // Every emitted key names source 0.
        assert!(rig.fabric.sent().iter().all(|&k| k == RoutingKey(BASE_KEY)));
    }

    #[test]
    fn activity_window_gates_generation() {
        // The source lives [10, 20); every recorded tick must fall there.
        let mut rig = rig(builder(1, 40).sources(vec![SourceRecord {
            start: Tick(10),
            end: Tick(20),
            regime: Regime::Fast {
                exp_minus_lambda: (-2.0f64).exp(),
            },
        }]));
        run_ticks(&mut rig, 40);
        for frame in rig.sink.frames() {
            assert!(
                frame.time >= Tick(10) && frame.time < Tick(20),
                "spike recorded outside the window at {}",
                frame.time
            );
        }
        assert!(rig.sink.total_spikes() > 0);
    }

    #[test]
    fn keyless_core_records_without_emitting() {
        let mut rig = rig(builder(1, 100)
            .parameters(ParameterBlock {
                has_key: false,
                base_key: BASE_KEY,
                rate_update_mask: 0x0000_FFFF,
                random_backoff_us: 0,
                inter_spike_gap_ticks: 0,
                first_source_id: GlobalSourceId(0),
                n_sources: 1,
                slow_fast_cutoff: 0.25,
                seconds_per_tick: 0.001,
                ticks_per_second: 1000.0,
                seed: Seed([0xC0FF_EE00, 0x1234_5678, 0x9ABC_DEF0, 77]),
            })
            .sources(vec![SourceRecord {
                start: Tick(0),
                end: Tick(u32::MAX),
                regime: Regime::Fast {
                    exp_minus_lambda: (-1.0f64).exp(),
                },
            }]));
        run_ticks(&mut rig, 100);
        assert_eq!(rig.fabric.sent_count(), 0);
        assert!(rig.sink.total_spikes() > 0);
        assert_eq!(rig.core.provenance(Tick(100)).packets_sent, 0);
    }

    #[test]
    fn run_limit_pauses_and_holds_the_tick() {
        let mut rig = rig(builder(1, 5));
        let mut outcomes = Vec::new();
        for _ in 0..7 {
            outcomes.push(rig.core.on_timer_tick(&mut rig.mem).unwrap());
        }
        assert_eq!(
            outcomes,
            vec![
                TickOutcome::Ran(Tick(0)),
                TickOutcome::Ran(Tick(1)),
                TickOutcome::Ran(Tick(2)),
                TickOutcome::Ran(Tick(3)),
                TickOutcome::Ran(Tick(4)),
                TickOutcome::Paused,
                TickOutcome::Paused,
            ]
        );
        assert!(rig.core.is_paused());
        assert_eq!(rig.core.next_tick(), Tick(5));

        let prov = Provenance::decode(rig.mem.region(Region::Provenance)).unwrap();
        assert_eq!(prov.last_tick, Tick(5));

        // The persisted seed is the live stream state, not the original.
        let stored = ParameterBlock::decode(rig.mem.region(Region::Parameters)).unwrap();
        assert_eq!(stored.seed, rig.core.params().seed);
    }

    #[test]
    fn multicast_packet_updates_one_source() {
        let mut rig = rig(builder(4, 100));
        rig.core
            .on_multicast_packet(RoutingKey(0xBEEF_0002), f64_to_s1615(1000.0));
        assert!(matches!(
            rig.core.source(SourceId(2)).regime,
            Regime::Fast { .. }
        ));
        let prov = rig.core.provenance(Tick(0));
        assert_eq!(prov.rate_updates_applied, 1);
    }

    #[test]
    fn host_message_applies_batch_and_counts_foreign_ids() {
        let mut rig = rig(builder(2, 100));
        let mut payload = Vec::new();
        payload.extend_from_slice(&3u32.to_le_bytes());
        for (id, hz) in [(0u32, 400.0f64), (1, 2000.0), (9, 100.0)] {
            payload.extend_from_slice(&id.to_le_bytes());
            payload.extend_from_slice(&f64_to_s1615(hz).to_le_bytes());
        }
        rig.core.on_host_message(&payload);

        assert!(matches!(
            rig.core.source(SourceId(0)).regime,
            Regime::Fast { .. }
        ));
        assert!(matches!(
            rig.core.source(SourceId(1)).regime,
            Regime::Fast { .. }
        ));
        let prov = rig.core.provenance(Tick(0));
        assert_eq!(prov.rate_updates_applied, 2);
        assert_eq!(prov.rate_updates_ignored, 1);
    }

    #[test]
    fn schedule_is_a_function_of_seed_and_parameters() {
        let make = || {
            let mut rig = rig(builder(3, 300));
            rig.core.set_rate(GlobalSourceId(0), 900.0);
            rig.core.set_rate(GlobalSourceId(1), 40.0);
            rig.core.set_rate(GlobalSourceId(2), 2500.0);
            run_ticks(&mut rig, 300);
            rig.fabric.sent()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn jitter_consumes_time_but_not_the_schedule() {
        let run = |backoff: u32| {
            let b = builder(1, 100)
                .parameters(ParameterBlock {
                    has_key: true,
                    base_key: BASE_KEY,
                    rate_update_mask: 0x0000_FFFF,
                    random_backoff_us: backoff,
                    inter_spike_gap_ticks: 0,
                    first_source_id: GlobalSourceId(0),
                    n_sources: 1,
                    slow_fast_cutoff: 0.25,
                    seconds_per_tick: 0.001,
                    ticks_per_second: 1000.0,
                    seed: Seed([0xC0FF_EE00, 0x1234_5678, 0x9ABC_DEF0, 77]),
                })
                .sources(vec![SourceRecord {
                    start: Tick(0),
                    end: Tick(u32::MAX),
                    regime: Regime::Fast {
                        exp_minus_lambda: (-1.0f64).exp(),
                    },
                }]);
            let mut rig = rig(b);
            run_ticks(&mut rig, 100);
            (rig.fabric.sent(), rig.clock.busy_us())
        };
        let (quiet, quiet_busy) = run(0);
        let (jittered, jittered_busy) = run(50);
        assert_eq!(quiet, jittered, "jitter must not move the schedule");
        assert_eq!(quiet_busy, 0);
        assert!(jittered_busy > 0, "jitter should burn wall-clock time");
    }
}
