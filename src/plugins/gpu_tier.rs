// GPU capability detection: a one-shot async probe of the render adapter mapped
// onto a coarse tier, cached across sessions and overridable by the user.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bevy::prelude::*;
use bevy::render::renderer::{RenderAdapterInfo, RenderDevice};
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future::{block_on, poll_once};
use serde::{Deserialize, Serialize};
use wgpu::DeviceType;

use crate::plugins::config::ForgeConfig;
use crate::plugins::storage::PreferenceStore;

pub const TIER_CACHE_KEY: &str = "golf-forge-gpu-tier";
pub const TIER_OVERRIDE_KEY: &str = "golf-forge-gpu-tier-override";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuTier {
    #[default]
    Low,
    Mid,
    High,
}

impl GpuTier {
    pub fn as_str(self) -> &'static str {
        match self {
            GpuTier::Low => "low",
            GpuTier::Mid => "mid",
            GpuTier::High => "high",
        }
    }
}

impl fmt::Display for GpuTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GpuTier {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "low" => Ok(GpuTier::Low),
            "mid" => Ok(GpuTier::Mid),
            "high" => Ok(GpuTier::High),
            _ => Err(()),
        }
    }
}

/// User preference; `Auto` defers to detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierOverride {
    #[default]
    Auto,
    Low,
    Mid,
    High,
}

impl TierOverride {
    pub const ALL: [TierOverride; 4] = [TierOverride::Auto, TierOverride::Low, TierOverride::Mid, TierOverride::High];

    pub fn as_str(self) -> &'static str {
        match self {
            TierOverride::Auto => "auto",
            TierOverride::Low => "low",
            TierOverride::Mid => "mid",
            TierOverride::High => "high",
        }
    }

    pub fn next(self) -> Self {
        match self {
            TierOverride::Auto => TierOverride::Low,
            TierOverride::Low => TierOverride::Mid,
            TierOverride::Mid => TierOverride::High,
            TierOverride::High => TierOverride::Auto,
        }
    }
}

impl FromStr for TierOverride {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(TierOverride::Auto),
            other => other.parse::<GpuTier>().map(|t| match t {
                GpuTier::Low => TierOverride::Low,
                GpuTier::Mid => TierOverride::Mid,
                GpuTier::High => TierOverride::High,
            }),
        }
    }
}

/// `None` or anything at or below 1 is low, exactly 2 is mid, above is high.
pub fn map_detected_score_to_tier(raw_score: Option<u8>) -> GpuTier {
    match raw_score {
        None | Some(0..=1) => GpuTier::Low,
        Some(2) => GpuTier::Mid,
        Some(_) => GpuTier::High,
    }
}

pub fn resolve_effective_tier(tier_override: TierOverride, detected: GpuTier) -> GpuTier {
    match tier_override {
        TierOverride::Auto => detected,
        TierOverride::Low => GpuTier::Low,
        TierOverride::Mid => GpuTier::Mid,
        TierOverride::High => GpuTier::High,
    }
}

/// Whether the render loop must run every frame instead of idling between input.
pub fn should_always_animate(uv_mode: bool, tier: GpuTier, is_transitioning: bool) -> bool {
    is_transitioning || (uv_mode && tier != GpuTier::Low)
}

/// Raw capability score for an adapter. Software and unknown adapters score 1.
pub fn score_adapter(device_type: DeviceType, max_texture_dimension_2d: u32) -> Option<u8> {
    let score = match device_type {
        DeviceType::DiscreteGpu if max_texture_dimension_2d >= 8192 => 3,
        DeviceType::DiscreteGpu => 2,
        DeviceType::IntegratedGpu if max_texture_dimension_2d >= 4096 => 2,
        DeviceType::IntegratedGpu => 1,
        DeviceType::VirtualGpu | DeviceType::Cpu | DeviceType::Other => 1,
    };
    Some(score)
}

/// Where the detected tier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TierSource {
    #[default]
    Default,
    Cache,
    Detected,
}

#[derive(Resource, Debug, Default, Clone)]
pub struct GpuTierState {
    pub detected: GpuTier,
    pub tier_override: TierOverride,
    pub source: TierSource,
}

impl GpuTierState {
    pub fn effective(&self) -> GpuTier {
        resolve_effective_tier(self.tier_override, self.detected)
    }

    pub fn set_override(&mut self, tier_override: TierOverride, store: &mut PreferenceStore) {
        self.tier_override = tier_override;
        store.write(TIER_OVERRIDE_KEY, tier_override.as_str());
        info!("GPU_TIER override={} effective={}", tier_override.as_str(), self.effective());
    }
}

/// Cached tier, if present and well formed. Storage failures count as a miss.
pub fn read_cached_tier(store: &PreferenceStore) -> Option<GpuTier> {
    let raw = store.read(TIER_CACHE_KEY)?;
    match raw.parse::<GpuTier>() {
        Ok(t) => Some(t),
        Err(()) => {
            warn!("GPU_TIER cache_corrupt value={raw:?}");
            None
        }
    }
}

/// Cancellation flag shared between a detection task and its owner.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// In-flight detection. Dropping the resource cancels it.
#[derive(Resource)]
pub struct TierDetection {
    task: Option<Task<Option<u8>>>,
    pub token: CancelToken,
}

impl TierDetection {
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for TierDetection {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Completion handler. Returns false when the owner cancelled before the
/// result arrived; in that case nothing is written.
pub fn complete_detection(
    state: &mut GpuTierState,
    store: &mut PreferenceStore,
    token: &CancelToken,
    score: Option<u8>,
) -> bool {
    if token.is_cancelled() {
        debug!("GPU_TIER completion_ignored reason=cancelled");
        return false;
    }
    let Some(raw) = score else {
        warn!("GPU_TIER detection_failed fallback={}", state.detected);
        return true;
    };
    let tier = map_detected_score_to_tier(Some(raw));
    state.detected = tier;
    state.source = TierSource::Detected;
    store.write(TIER_CACHE_KEY, tier.as_str());
    info!("GPU_TIER detected={tier} score={raw} effective={}", state.effective());
    true
}

#[derive(Clone, Copy)]
struct AdapterSnapshot {
    device_type: DeviceType,
    max_texture_dimension_2d: u32,
}

pub struct GpuTierPlugin;
impl Plugin for GpuTierPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GpuTierState>()
            .add_systems(Startup, begin_tier_detection)
            .add_systems(Update, (poll_tier_detection, cancel_detection_on_exit));
    }
}

fn begin_tier_detection(
    mut commands: Commands,
    mut state: ResMut<GpuTierState>,
    store: Option<Res<PreferenceStore>>,
    config: Option<Res<ForgeConfig>>,
    adapter: Option<Res<RenderAdapterInfo>>,
    device: Option<Res<RenderDevice>>,
) {
    let persisted = store
        .as_ref()
        .and_then(|s| s.read(TIER_OVERRIDE_KEY))
        .and_then(|v| v.parse::<TierOverride>().ok());
    // Explicit configuration beats the stored preference.
    state.tier_override = match config.as_ref().map(|c| c.tier_override) {
        Some(o) if o != TierOverride::Auto => o,
        _ => persisted.unwrap_or_default(),
    };

    if let Some(cached) = store.as_ref().and_then(|s| read_cached_tier(s)) {
        state.detected = cached;
        state.source = TierSource::Cache;
        info!("GPU_TIER cached={cached} effective={}", state.effective());
        return;
    }

    let snapshot = adapter.map(|info| AdapterSnapshot {
        device_type: info.device_type,
        max_texture_dimension_2d: device.map(|d| d.limits().max_texture_dimension_2d).unwrap_or(0),
    });
    let task = AsyncComputeTaskPool::get().spawn(async move {
        snapshot.and_then(|s| score_adapter(s.device_type, s.max_texture_dimension_2d))
    });
    commands.insert_resource(TierDetection { task: Some(task), token: CancelToken::default() });
}

fn poll_tier_detection(
    mut commands: Commands,
    detection: Option<ResMut<TierDetection>>,
    mut state: ResMut<GpuTierState>,
    store: Option<ResMut<PreferenceStore>>,
) {
    let Some(mut detection) = detection else { return; };
    let Some(task) = detection.task.as_mut() else { return; };
    let Some(score) = block_on(poll_once(task)) else { return; };
    detection.task = None;
    match store {
        Some(mut store) => {
            complete_detection(&mut state, &mut store, &detection.token, score);
        }
        None => {
            let mut scratch = PreferenceStore::memory();
            complete_detection(&mut state, &mut scratch, &detection.token, score);
        }
    }
    commands.remove_resource::<TierDetection>();
}

fn cancel_detection_on_exit(mut ev_exit: EventReader<AppExit>, detection: Option<Res<TierDetection>>) {
    if ev_exit.read().next().is_none() { return; }
    if let Some(d) = detection {
        d.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::storage::UnavailableStore;

    #[test]
    fn score_buckets() {
        assert_eq!(map_detected_score_to_tier(None), GpuTier::Low);
        assert_eq!(map_detected_score_to_tier(Some(0)), GpuTier::Low);
        assert_eq!(map_detected_score_to_tier(Some(1)), GpuTier::Low);
        assert_eq!(map_detected_score_to_tier(Some(2)), GpuTier::Mid);
        assert_eq!(map_detected_score_to_tier(Some(3)), GpuTier::High);
        assert_eq!(map_detected_score_to_tier(Some(200)), GpuTier::High);
    }

    #[test]
    fn override_always_wins_unless_auto() {
        for o in TierOverride::ALL {
            for d in [GpuTier::Low, GpuTier::Mid, GpuTier::High] {
                let got = resolve_effective_tier(o, d);
                match o {
                    TierOverride::Auto => assert_eq!(got, d),
                    TierOverride::Low => assert_eq!(got, GpuTier::Low),
                    TierOverride::Mid => assert_eq!(got, GpuTier::Mid),
                    TierOverride::High => assert_eq!(got, GpuTier::High),
                }
            }
        }
    }

    #[test]
    fn always_animate_rules() {
        assert!(should_always_animate(false, GpuTier::Low, true));
        assert!(should_always_animate(true, GpuTier::Mid, false));
        assert!(should_always_animate(true, GpuTier::High, false));
        assert!(!should_always_animate(true, GpuTier::Low, false));
        assert!(!should_always_animate(false, GpuTier::High, false));
    }

    #[test]
    fn adapter_scores() {
        assert_eq!(score_adapter(DeviceType::DiscreteGpu, 16384), Some(3));
        assert_eq!(score_adapter(DeviceType::DiscreteGpu, 4096), Some(2));
        assert_eq!(score_adapter(DeviceType::IntegratedGpu, 8192), Some(2));
        assert_eq!(score_adapter(DeviceType::IntegratedGpu, 2048), Some(1));
        assert_eq!(score_adapter(DeviceType::Cpu, 16384), Some(1));
    }

    #[test]
    fn tier_strings_parse() {
        assert_eq!("mid".parse::<GpuTier>(), Ok(GpuTier::Mid));
        assert!("ultra".parse::<GpuTier>().is_err());
        assert_eq!("auto".parse::<TierOverride>(), Ok(TierOverride::Auto));
        assert_eq!("high".parse::<TierOverride>(), Ok(TierOverride::High));
        assert_eq!(TierOverride::High.next(), TierOverride::Auto);
    }

    #[test]
    fn corrupt_cache_is_a_miss() {
        let mut store = PreferenceStore::memory();
        store.write(TIER_CACHE_KEY, "turbo");
        assert_eq!(read_cached_tier(&store), None);
        store.write(TIER_CACHE_KEY, "high");
        assert_eq!(read_cached_tier(&store), Some(GpuTier::High));
    }

    #[test]
    fn unavailable_cache_is_a_miss() {
        let store = PreferenceStore(Box::new(UnavailableStore));
        assert_eq!(read_cached_tier(&store), None);
    }

    #[test]
    fn completion_writes_state_and_cache() {
        let mut state = GpuTierState::default();
        let mut store = PreferenceStore::memory();
        let token = CancelToken::default();
        assert!(complete_detection(&mut state, &mut store, &token, Some(2)));
        assert_eq!(state.detected, GpuTier::Mid);
        assert_eq!(state.source, TierSource::Detected);
        assert_eq!(store.read(TIER_CACHE_KEY).as_deref(), Some("mid"));
    }

    #[test]
    fn cancelled_completion_is_a_no_op() {
        let mut state = GpuTierState::default();
        let mut store = PreferenceStore::memory();
        let token = CancelToken::default();
        token.cancel();
        assert!(!complete_detection(&mut state, &mut store, &token, Some(3)));
        assert_eq!(state.detected, GpuTier::Low);
        assert_eq!(store.read(TIER_CACHE_KEY), None);
    }

    #[test]
    fn failed_probe_keeps_low_and_skips_cache() {
        let mut state = GpuTierState::default();
        let mut store = PreferenceStore::memory();
        complete_detection(&mut state, &mut store, &CancelToken::default(), None);
        assert_eq!(state.effective(), GpuTier::Low);
        assert_eq!(store.read(TIER_CACHE_KEY), None);
    }

    #[test]
    fn override_is_persisted() {
        let mut state = GpuTierState::default();
        let mut store = PreferenceStore::memory();
        state.set_override(TierOverride::High, &mut store);
        assert_eq!(state.effective(), GpuTier::High);
        assert_eq!(store.read(TIER_OVERRIDE_KEY).as_deref(), Some("high"));
    }
}
