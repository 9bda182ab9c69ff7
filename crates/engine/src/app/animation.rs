//! Animation clips, the per-clip action mixer and the single active animation record.

use std::fmt;

/// Every clip the avatar knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnimationKind {
    Walking,
    Running,
    TalkPassionately,
    Sleep,
    CasualWalk,
    MotivationalCheer,
    WaveOneHand,
}

impl AnimationKind {
    pub const ALL: [AnimationKind; 7] = [
        AnimationKind::Walking,
        AnimationKind::Running,
        AnimationKind::TalkPassionately,
        AnimationKind::Sleep,
        AnimationKind::CasualWalk,
        AnimationKind::MotivationalCheer,
        AnimationKind::WaveOneHand,
    ];

    pub const DEFAULT_TALK: AnimationKind = AnimationKind::TalkPassionately;
    pub const DEFAULT_MOVE: AnimationKind = AnimationKind::Walking;
    pub const DEFAULT_INTERACT: AnimationKind = AnimationKind::WaveOneHand;

    pub const fn name(self) -> &'static str {
        match self {
            AnimationKind::Walking => "walking",
            AnimationKind::Running => "running",
            AnimationKind::TalkPassionately => "talk_passionately",
            AnimationKind::Sleep => "sleep",
            AnimationKind::CasualWalk => "casual_walk",
            AnimationKind::MotivationalCheer => "motivational_cheer",
            AnimationKind::WaveOneHand => "wave_one_hand",
        }
    }

    pub fn from_name(name: &str) -> Option<AnimationKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub const fn is_movement(self) -> bool {
        matches!(
            self,
            AnimationKind::Walking | AnimationKind::Running | AnimationKind::CasualWalk
        )
    }

    pub const fn default_loop_policy(self) -> LoopPolicy {
        match self {
            AnimationKind::WaveOneHand | AnimationKind::MotivationalCheer => LoopPolicy::OnceClamp,
            _ => LoopPolicy::Repeat,
        }
    }

    /// Human label used for animation buttons, e.g. `talk passionately`.
    pub fn label(self) -> String {
        self.name().replace('_', " ")
    }
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPolicy {
    Repeat,
    /// Plays once and holds the final frame.
    OnceClamp,
}

impl LoopPolicy {
    pub fn from_name(value: &str) -> Option<LoopPolicy> {
        match value {
            "repeat" => Some(LoopPolicy::Repeat),
            "once" => Some(LoopPolicy::OnceClamp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipHandle(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct ClipEntry {
    pub kind: AnimationKind,
    pub handle: ClipHandle,
    pub source: String,
    pub duration_seconds: f32,
    pub loop_policy: LoopPolicy,
}

/// Insert-only map from animation kind to a playable clip.
#[derive(Debug, Clone, Default)]
pub struct ClipRegistry {
    entries: Vec<ClipEntry>,
}

impl ClipRegistry {
    /// Registers a clip and its mixer action. A kind that is already present keeps its
    /// original entry.
    pub fn register(
        &mut self,
        mixer: &mut AnimationMixer,
        kind: AnimationKind,
        source: impl Into<String>,
        duration_seconds: f32,
        loop_policy: LoopPolicy,
    ) -> ClipHandle {
        if let Some(existing) = self.get(kind) {
            return existing.handle;
        }
        let handle = mixer.add_action(duration_seconds, loop_policy);
        self.entries.push(ClipEntry {
            kind,
            handle,
            source: source.into(),
            duration_seconds,
            loop_policy,
        });
        handle
    }

    pub fn get(&self, kind: AnimationKind) -> Option<&ClipEntry> {
        self.entries.iter().find(|entry| entry.kind == kind)
    }

    pub fn contains(&self, kind: AnimationKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn kinds(&self) -> impl Iterator<Item = AnimationKind> + '_ {
        self.entries.iter().map(|entry| entry.kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveAnimation {
    pub kind: AnimationKind,
    pub handle: ClipHandle,
    pub loop_policy: LoopPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightRamp {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct ClipAction {
    duration: f32,
    loop_policy: LoopPolicy,
    time: f32,
    weight: f32,
    ramp: Option<WeightRamp>,
    enabled: bool,
    paused: bool,
    finished: bool,
}

impl ClipAction {
    fn new(duration: f32, loop_policy: LoopPolicy) -> Self {
        Self {
            duration: if duration.is_finite() && duration > 0.0 {
                duration
            } else {
                1.0
            },
            loop_policy,
            time: 0.0,
            weight: 0.0,
            ramp: None,
            enabled: false,
            paused: false,
            finished: false,
        }
    }

    fn advance(&mut self, dt: f32) {
        if !self.enabled {
            return;
        }

        if let Some(mut ramp) = self.ramp {
            ramp.elapsed += dt;
            let t = if ramp.duration <= 0.0 {
                1.0
            } else {
                (ramp.elapsed / ramp.duration).clamp(0.0, 1.0)
            };
            self.weight = ramp.from + (ramp.to - ramp.from) * t;
            if t >= 1.0 {
                self.ramp = None;
                if self.weight <= 0.0 {
                    self.weight = 0.0;
                    self.enabled = false;
                    return;
                }
            } else {
                self.ramp = Some(ramp);
            }
        }

        if self.paused {
            return;
        }

        self.time += dt;
        match self.loop_policy {
            LoopPolicy::Repeat => {
                self.time %= self.duration;
            }
            LoopPolicy::OnceClamp => {
                if self.time >= self.duration {
                    self.time = self.duration;
                    self.finished = true;
                    self.paused = true;
                }
            }
        }
    }
}

/// Blends clip actions over time. Actions are addressed by the handle returned when added.
#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    actions: Vec<ClipAction>,
}

impl AnimationMixer {
    fn add_action(&mut self, duration: f32, loop_policy: LoopPolicy) -> ClipHandle {
        self.actions.push(ClipAction::new(duration, loop_policy));
        ClipHandle(self.actions.len() - 1)
    }

    /// Rewinds the action and starts it with full target weight pending a fade.
    pub fn reset(&mut self, handle: ClipHandle) {
        if let Some(action) = self.actions.get_mut(handle.0) {
            action.time = 0.0;
            action.ramp = None;
            action.paused = false;
            action.finished = false;
            action.enabled = true;
        }
    }

    pub fn set_loop_policy(&mut self, handle: ClipHandle, loop_policy: LoopPolicy) {
        if let Some(action) = self.actions.get_mut(handle.0) {
            action.loop_policy = loop_policy;
        }
    }

    pub fn fade_in(&mut self, handle: ClipHandle, duration: f32) {
        if let Some(action) = self.actions.get_mut(handle.0) {
            action.enabled = true;
            action.weight = 0.0;
            action.ramp = Some(WeightRamp {
                from: 0.0,
                to: 1.0,
                elapsed: 0.0,
                duration,
            });
        }
    }

    pub fn fade_out(&mut self, handle: ClipHandle, duration: f32) {
        if let Some(action) = self.actions.get_mut(handle.0) {
            if !action.enabled {
                return;
            }
            action.ramp = Some(WeightRamp {
                from: action.weight,
                to: 0.0,
                elapsed: 0.0,
                duration,
            });
        }
    }

    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        for action in &mut self.actions {
            action.advance(dt);
        }
    }

    pub fn is_running(&self, handle: ClipHandle) -> bool {
        self.actions
            .get(handle.0)
            .map(|action| action.enabled && !action.paused)
            .unwrap_or(false)
    }

    pub fn is_finished(&self, handle: ClipHandle) -> bool {
        self.actions
            .get(handle.0)
            .map(|action| action.finished)
            .unwrap_or(false)
    }

    pub fn weight(&self, handle: ClipHandle) -> f32 {
        self.actions
            .get(handle.0)
            .map(|action| action.weight)
            .unwrap_or(0.0)
    }

    pub fn time(&self, handle: ClipHandle) -> f32 {
        self.actions
            .get(handle.0)
            .map(|action| action.time)
            .unwrap_or(0.0)
    }

    pub fn is_fading(&self, handle: ClipHandle) -> bool {
        self.actions
            .get(handle.0)
            .map(|action| action.ramp.is_some())
            .unwrap_or(false)
    }

    /// Actions currently contributing to the pose, with their weights.
    pub fn contributing(&self) -> impl Iterator<Item = (ClipHandle, f32)> + '_ {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, action)| action.enabled && action.weight > 0.0)
            .map(|(index, action)| (ClipHandle(index), action.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(kinds: &[AnimationKind]) -> (ClipRegistry, AnimationMixer) {
        let mut registry = ClipRegistry::default();
        let mut mixer = AnimationMixer::default();
        for kind in kinds {
            registry.register(
                &mut mixer,
                *kind,
                format!("{}.fbx", kind.name()),
                1.0,
                kind.default_loop_policy(),
            );
        }
        (registry, mixer)
    }

    fn step(mixer: &mut AnimationMixer, seconds: f32) {
        let ticks = (seconds * 60.0).round() as u32;
        for _ in 0..ticks {
            mixer.update(1.0 / 60.0);
        }
    }

    #[test]
    fn names_round_trip_through_from_name() {
        for kind in AnimationKind::ALL {
            assert_eq!(AnimationKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(AnimationKind::from_name("moonwalk"), None);
        assert_eq!(AnimationKind::from_name("Walking"), None);
    }

    #[test]
    fn only_wave_and_cheer_play_once_by_default() {
        let once: Vec<_> = AnimationKind::ALL
            .into_iter()
            .filter(|kind| kind.default_loop_policy() == LoopPolicy::OnceClamp)
            .collect();
        assert_eq!(
            once,
            vec![AnimationKind::MotivationalCheer, AnimationKind::WaveOneHand]
        );
    }

    #[test]
    fn movement_set_is_walk_run_casual() {
        let movement: Vec<_> = AnimationKind::ALL
            .into_iter()
            .filter(|kind| kind.is_movement())
            .collect();
        assert_eq!(
            movement,
            vec![
                AnimationKind::Walking,
                AnimationKind::Running,
                AnimationKind::CasualWalk
            ]
        );
    }

    #[test]
    fn registry_is_insert_only() {
        let (mut registry, mut mixer) = registry_with(&[AnimationKind::Sleep]);
        let first = registry.get(AnimationKind::Sleep).expect("sleep").handle;
        let again = registry.register(
            &mut mixer,
            AnimationKind::Sleep,
            "other.fbx",
            9.0,
            LoopPolicy::OnceClamp,
        );

        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
        let entry = registry.get(AnimationKind::Sleep).expect("sleep");
        assert_eq!(entry.source, "sleep.fbx");
        assert_eq!(entry.loop_policy, LoopPolicy::Repeat);
    }

    #[test]
    fn fade_in_reaches_full_weight_after_duration() {
        let (registry, mut mixer) = registry_with(&[AnimationKind::Walking]);
        let handle = registry.get(AnimationKind::Walking).expect("walking").handle;
        mixer.reset(handle);
        mixer.fade_in(handle, 0.3);

        step(&mut mixer, 0.15);
        let halfway = mixer.weight(handle);
        assert!(halfway > 0.3 && halfway < 0.7, "halfway weight {halfway}");

        step(&mut mixer, 0.2);
        assert!((mixer.weight(handle) - 1.0).abs() < 0.0001);
        assert!(!mixer.is_fading(handle));
    }

    #[test]
    fn fade_out_disables_action_once_weight_hits_zero() {
        let (registry, mut mixer) = registry_with(&[AnimationKind::Walking]);
        let handle = registry.get(AnimationKind::Walking).expect("walking").handle;
        mixer.reset(handle);
        mixer.fade_in(handle, 0.3);
        step(&mut mixer, 0.5);
        mixer.fade_out(handle, 0.3);
        step(&mut mixer, 0.5);

        assert_eq!(mixer.weight(handle), 0.0);
        assert!(!mixer.is_running(handle));
        assert_eq!(mixer.contributing().count(), 0);
    }

    #[test]
    fn repeating_clip_wraps_time() {
        let (registry, mut mixer) = registry_with(&[AnimationKind::Sleep]);
        let handle = registry.get(AnimationKind::Sleep).expect("sleep").handle;
        mixer.reset(handle);
        mixer.fade_in(handle, 0.3);
        step(&mut mixer, 2.5);

        assert!(mixer.is_running(handle));
        assert!(!mixer.is_finished(handle));
        assert!(mixer.time(handle) < 1.0);
    }

    #[test]
    fn once_clip_clamps_on_final_frame_and_never_loops() {
        let (registry, mut mixer) = registry_with(&[AnimationKind::WaveOneHand]);
        let handle = registry
            .get(AnimationKind::WaveOneHand)
            .expect("wave")
            .handle;
        mixer.reset(handle);
        mixer.fade_in(handle, 0.3);
        step(&mut mixer, 1.5);

        assert!(mixer.is_finished(handle));
        assert!(!mixer.is_running(handle));
        assert_eq!(mixer.time(handle), 1.0);
        assert!((mixer.weight(handle) - 1.0).abs() < 0.0001);

        step(&mut mixer, 5.0);
        assert_eq!(mixer.time(handle), 1.0);
        assert!(mixer.is_finished(handle));
    }

    #[test]
    fn reset_restarts_finished_once_clip() {
        let (registry, mut mixer) = registry_with(&[AnimationKind::MotivationalCheer]);
        let handle = registry
            .get(AnimationKind::MotivationalCheer)
            .expect("cheer")
            .handle;
        mixer.reset(handle);
        mixer.fade_in(handle, 0.3);
        step(&mut mixer, 2.0);
        assert!(mixer.is_finished(handle));

        mixer.reset(handle);
        assert!(mixer.is_running(handle));
        assert_eq!(mixer.time(handle), 0.0);
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let (registry, mut mixer) = registry_with(&[AnimationKind::Walking]);
        let handle = registry.get(AnimationKind::Walking).expect("walking").handle;
        mixer.reset(handle);
        mixer.fade_in(handle, 0.3);
        mixer.update(f32::NAN);
        mixer.update(-1.0);
        assert_eq!(mixer.time(handle), 0.0);
    }
}
