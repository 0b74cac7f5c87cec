//! Brightness/colour transition engine.
//!
//! [`TransitionEngine`] owns [`LightState`] and moves the rendered
//! brightness toward its target in bounded steps spaced at least
//! [`STEP_INTERVAL`] apart:
//!
//! ```text
//!   presence event ──▶ target ──┐
//!   config update ───▶ target ──┤   step(now): current += fade_step(delta, remaining)
//!                               ▼
//!                   current ──▶ compose_frame ──▶ RenderPort
//! ```
//!
//! A transition toward a new target is planned once, as
//! `max(MIN_TOTAL_STEPS, duration / STEP_INTERVAL)` steps, using the fade-in
//! or fade-out duration depending on direction.  Each applied step consumes
//! one planned step, so the last one lands exactly on the target and the
//! fade never overshoots.

pub mod color;

use embassy_time::{Duration, Instant};
use log::{debug, info};

use crate::app::ports::RenderPort;
use crate::config::{ConfigUpdate, LightConfig};
use crate::presence::PresenceEvent;

use self::color::{Frame, Rgbw, compose_frame};

/// Minimum spacing between two brightness steps.
pub const STEP_INTERVAL_MS: u16 = 20;
pub const STEP_INTERVAL: Duration = Duration::from_millis(STEP_INTERVAL_MS as u64);
/// Smallest brightness change applied by a step.
pub const MIN_STEP: i16 = 1;
/// Lower bound on the number of planned steps per transition.
pub const MIN_TOTAL_STEPS: u16 = 1;
/// `|target - current|` at or below which a transition is complete.
pub const CONVERGED_TOLERANCE: i16 = 1;
/// Target used while the beacon is present.
pub const FULL_BRIGHTNESS: u8 = 255;

/// Number of steps a transition of `duration_ms` is split into.
pub fn total_steps(duration_ms: u16) -> u16 {
    (duration_ms / STEP_INTERVAL_MS).max(MIN_TOTAL_STEPS)
}

/// Brightness change for one step: `delta / steps_remaining` truncated
/// toward zero, at least [`MIN_STEP`] in the direction of `delta`.
///
/// Never exceeds `|delta|` in magnitude.
pub fn fade_step(delta: i16, steps_remaining: u16) -> i16 {
    let steps = i32::from(steps_remaining.max(MIN_TOTAL_STEPS));
    let step = (i32::from(delta) / steps) as i16;
    if step == 0 { MIN_STEP * delta.signum() } else { step }
}

/// Light state.  Mutated only by [`TransitionEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    /// Brightness currently rendered.
    pub current: u8,
    /// Brightness being faded toward.
    pub target: u8,
    pub color: Rgbw,
    /// Kelvin.
    pub color_temperature: u16,
    /// Target while away.  A dimmed floor, not zero.
    pub away_brightness: u8,
    pub fade_in_ms: u16,
    pub fade_out_ms: u16,
    /// When false, `current` snaps to `target`.
    pub smoothing: bool,
    /// Last time `current` was advanced.
    pub last_step_at: Option<Instant>,
    /// Set by the first presence transition.
    pub lights_on: bool,
}

#[derive(Debug, Clone, Copy)]
struct FadePlan {
    target: u8,
    steps_remaining: u16,
}

/// Effect of one [`TransitionEngine::on_config_update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOutcome {
    /// Number of fields written.
    pub applied: u8,
    pub target_changed: bool,
    pub color_changed: bool,
    /// A frame was pushed to the render port.
    pub rendered: bool,
}

pub struct TransitionEngine {
    state: LightState,
    plan: Option<FadePlan>,
    render_pending: bool,
}

impl TransitionEngine {
    /// Fail-safe start: dark, fading up to the away floor.
    pub fn new(config: &LightConfig) -> Self {
        Self {
            state: LightState {
                current: 0,
                target: config.away_brightness,
                color: Rgbw::new(config.red, config.green, config.blue, config.white),
                color_temperature: config.color_temperature,
                away_brightness: config.away_brightness,
                fade_in_ms: config.fade_in_ms,
                fade_out_ms: config.fade_out_ms,
                smoothing: config.smoothing,
                last_step_at: None,
                lights_on: false,
            },
            plan: None,
            render_pending: false,
        }
    }

    /// Retarget on a presence transition.  Returns the new target.
    pub fn on_presence_event(&mut self, event: PresenceEvent) -> u8 {
        let s = &mut self.state;
        s.target = match event {
            PresenceEvent::Present => FULL_BRIGHTNESS,
            PresenceEvent::Away => s.away_brightness,
        };
        s.lights_on = true;
        info!("Light: {:?}, target brightness {}", event, s.target);

        if !s.smoothing {
            s.current = s.target;
            self.plan = None;
            self.render_pending = true;
        }
        s.target
    }

    /// Apply a partial configuration update.
    ///
    /// Colour changes re-render at the current brightness.  With smoothing
    /// off, a target change snaps and renders immediately.
    pub fn on_config_update<R: RenderPort>(
        &mut self,
        update: &ConfigUpdate,
        render: &mut R,
    ) -> ConfigOutcome {
        let mut out = ConfigOutcome::default();
        let s = &mut self.state;

        let color_before = (s.color, s.color_temperature);
        let target_before = s.target;

        set(&mut s.color.red, update.red, &mut out.applied);
        set(&mut s.color.green, update.green, &mut out.applied);
        set(&mut s.color.blue, update.blue, &mut out.applied);
        set(&mut s.color.white, update.white, &mut out.applied);
        set(&mut s.color_temperature, update.color_temperature, &mut out.applied);
        set(&mut s.target, update.target_brightness, &mut out.applied);
        set(&mut s.away_brightness, update.away_brightness, &mut out.applied);
        set(&mut s.fade_in_ms, update.fade_in_ms, &mut out.applied);
        set(&mut s.fade_out_ms, update.fade_out_ms, &mut out.applied);
        set(&mut s.smoothing, update.smoothing, &mut out.applied);

        out.color_changed = (s.color, s.color_temperature) != color_before;
        out.target_changed = s.target != target_before;

        if !s.smoothing && s.current != s.target {
            s.current = s.target;
            self.plan = None;
            out.rendered = true;
        }
        if out.color_changed || self.render_pending {
            out.rendered = true;
        }
        if out.rendered {
            self.render(render);
        }

        debug!(
            "Light: config update, {} field(s), target {}, rendered={}",
            out.applied, self.state.target, out.rendered
        );
        out
    }

    /// Advance `current` toward `target`.  Returns true when a frame was
    /// rendered.
    pub fn step<R: RenderPort>(&mut self, now: Instant, render: &mut R) -> bool {
        if !self.state.smoothing {
            if self.state.current == self.state.target && !self.render_pending {
                return false;
            }
            self.state.current = self.state.target;
            self.state.last_step_at = Some(now);
            self.plan = None;
            self.render(render);
            return true;
        }

        if let Some(last) = self.state.last_step_at {
            if now.saturating_duration_since(last) < STEP_INTERVAL {
                return false;
            }
        }

        let s = &mut self.state;
        let delta = i16::from(s.target) - i16::from(s.current);
        if delta.abs() <= CONVERGED_TOLERANCE {
            self.plan = None;
            if self.render_pending {
                self.render(render);
                return true;
            }
            return false;
        }

        let steps_remaining = match self.plan {
            Some(plan) if plan.target == s.target => plan.steps_remaining,
            _ => {
                let duration = if delta > 0 { s.fade_in_ms } else { s.fade_out_ms };
                let steps = total_steps(duration);
                debug!(
                    "Light: fading {} -> {} in {} step(s)",
                    s.current, s.target, steps
                );
                steps
            }
        };

        let step = fade_step(delta, steps_remaining);
        s.current = (i16::from(s.current) + step).clamp(0, i16::from(u8::MAX)) as u8;
        s.last_step_at = Some(now);
        self.plan = Some(FadePlan {
            target: s.target,
            steps_remaining: steps_remaining.saturating_sub(1).max(MIN_TOTAL_STEPS),
        });

        self.render(render);
        true
    }

    /// Push the current frame to the render port unconditionally.
    pub fn render<R: RenderPort>(&mut self, render: &mut R) {
        render.render(&self.frame());
        self.render_pending = false;
    }

    /// Frame for the current state.
    pub fn frame(&self) -> Frame {
        compose_frame(
            self.state.color,
            self.state.color_temperature,
            self.state.current,
        )
    }

    /// True while `current` is more than the tolerance away from `target`.
    pub fn is_fading(&self) -> bool {
        (i16::from(self.state.target) - i16::from(self.state.current)).abs() > CONVERGED_TOLERANCE
    }

    /// User-facing record; `target_brightness` reports the live target.
    pub fn config(&self) -> LightConfig {
        let s = &self.state;
        LightConfig {
            red: s.color.red,
            green: s.color.green,
            blue: s.color.blue,
            white: s.color.white,
            target_brightness: s.target,
            away_brightness: s.away_brightness,
            color_temperature: s.color_temperature,
            fade_in_ms: s.fade_in_ms,
            fade_out_ms: s.fade_out_ms,
            smoothing: s.smoothing,
        }
    }

    pub fn state(&self) -> &LightState {
        &self.state
    }
}

fn set<T: Copy>(field: &mut T, value: Option<T>, applied: &mut u8) {
    if let Some(v) = value {
        *field = v;
        *applied += 1;
    }
}
