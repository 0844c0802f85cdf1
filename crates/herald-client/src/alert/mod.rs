//! Alert dispatch: which events make noise and what the user sees.
//!
//! An [`AlertPolicy`] maps event types to [`AlertProfile`]s. The
//! [`AlertDispatcher`] plays the profile's [`Tone`] through a
//! [`SoundBackend`] and returns the visual [`Alert`]. Sound is best effort:
//! a failing backend is logged and the visual alert is still produced.

pub mod backend;
pub mod tone;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use herald_core::Event;
use herald_core::events::{CONTACT_CREATED, LEAD_CREATED, VERIFICATION_RECORDED};
use herald_settings::AlertSettings;
use serde::Serialize;
use tracing::{debug, warn};

pub use backend::{CommandBackend, SilentBackend, SoundBackend};
pub use tone::Tone;

/// How one event type is presented.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertProfile {
    /// Headline shown to the user.
    pub title: String,
    /// Tone played on arrival.
    pub tone: Tone,
}

/// Visual cue produced for an alerting event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alert {
    /// Headline from the profile.
    pub title: String,
    /// The event message, or its type when it has none.
    pub body: String,
    /// Type tag of the originating event.
    pub event_type: String,
}

/// Event type → profile table.
#[derive(Clone, Debug, Default)]
pub struct AlertPolicy {
    profiles: HashMap<String, AlertProfile>,
}

impl AlertPolicy {
    /// A policy that alerts on nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the profile for `event_type`.
    #[must_use]
    pub fn with(mut self, event_type: impl Into<String>, profile: AlertProfile) -> Self {
        let _ = self.profiles.insert(event_type.into(), profile);
        self
    }

    /// Lead, contact and verification events, all with `tone`.
    pub fn standard(tone: Tone) -> Self {
        Self::for_types([LEAD_CREATED, CONTACT_CREATED, VERIFICATION_RECORDED], tone)
    }

    /// One profile per type, sharing `tone`.
    pub fn for_types<I, S>(types: I, tone: Tone) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        types.into_iter().fold(Self::new(), |policy, event_type| {
            let event_type = event_type.as_ref();
            policy.with(
                event_type,
                AlertProfile {
                    title: default_title(event_type).to_owned(),
                    tone,
                },
            )
        })
    }

    /// Policy described by `settings`.
    pub fn from_settings(settings: &AlertSettings) -> Self {
        let tone = Tone {
            frequency_hz: settings.tone_frequency_hz,
            duration: Duration::from_millis(settings.tone_duration_ms),
            gain: settings.tone_gain,
        };
        Self::for_types(&settings.alert_types, tone)
    }

    /// Profile for `event_type`, if it alerts.
    pub fn profile(&self, event_type: &str) -> Option<&AlertProfile> {
        self.profiles.get(event_type)
    }

    /// Number of alerting types.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether nothing alerts.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn default_title(event_type: &str) -> &str {
    match event_type {
        LEAD_CREATED => "New lead",
        CONTACT_CREATED => "New contact message",
        VERIFICATION_RECORDED => "Verification recorded",
        other => other,
    }
}

/// Turns events into alerts.
pub struct AlertDispatcher {
    policy: AlertPolicy,
    sound: Arc<dyn SoundBackend>,
}

impl AlertDispatcher {
    /// Create a dispatcher.
    pub fn new(policy: AlertPolicy, sound: Arc<dyn SoundBackend>) -> Self {
        Self { policy, sound }
    }

    /// Dispatcher described by `settings`.
    ///
    /// Sound is silent when disabled or when the player command is unusable.
    pub fn from_settings(settings: &AlertSettings) -> Self {
        let sound: Arc<dyn SoundBackend> = if settings.sound_enabled {
            match CommandBackend::from_command(&settings.player_command) {
                Ok(backend) => Arc::new(backend),
                Err(e) => {
                    warn!(error = %e, "sound disabled");
                    Arc::new(SilentBackend)
                }
            }
        } else {
            Arc::new(SilentBackend)
        };
        Self::new(AlertPolicy::from_settings(settings), sound)
    }

    /// The active policy.
    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Alert for `event`, or `None` when its type does not alert.
    ///
    /// Plays the profile's tone first; a sound failure is only logged.
    pub fn dispatch(&self, event: &Event) -> Option<Alert> {
        let Some(profile) = self.policy.profile(&event.event_type) else {
            debug!(event_type = %event.event_type, "no alert for event type");
            return None;
        };

        if let Err(e) = self.sound.play(&profile.tone) {
            warn!(event_type = %event.event_type, error = %e, "alert sound failed");
        }

        Some(Alert {
            title: profile.title.clone(),
            body: event
                .message
                .clone()
                .unwrap_or_else(|| event.event_type.clone()),
            event_type: event.event_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::backend::MockSoundBackend;
    use super::*;
    use crate::errors::SoundError;

    fn dispatcher_with(mock: MockSoundBackend) -> AlertDispatcher {
        AlertDispatcher::new(AlertPolicy::standard(Tone::default()), Arc::new(mock))
    }

    #[test]
    fn standard_policy_covers_three_types() {
        let policy = AlertPolicy::standard(Tone::default());
        assert_eq!(policy.len(), 3);
        assert_eq!(policy.profile(LEAD_CREATED).unwrap().title, "New lead");
        assert!(policy.profile(CONTACT_CREATED).is_some());
        assert!(policy.profile(VERIFICATION_RECORDED).is_some());
        assert!(policy.profile("ping").is_none());
    }

    #[test]
    fn mapped_event_plays_tone_and_alerts() {
        let mut mock = MockSoundBackend::new();
        let _ = mock
            .expect_play()
            .withf(|tone| *tone == Tone::default())
            .times(1)
            .returning(|_| Ok(()));

        let event = Event::new(LEAD_CREATED).with_message("Jane Doe requested a quote");
        let alert = dispatcher_with(mock).dispatch(&event).unwrap();
        assert_eq!(alert.title, "New lead");
        assert_eq!(alert.body, "Jane Doe requested a quote");
        assert_eq!(alert.event_type, LEAD_CREATED);
    }

    #[test]
    fn body_falls_back_to_type() {
        let mut mock = MockSoundBackend::new();
        let _ = mock.expect_play().returning(|_| Ok(()));
        let alert = dispatcher_with(mock)
            .dispatch(&Event::new(VERIFICATION_RECORDED))
            .unwrap();
        assert_eq!(alert.body, VERIFICATION_RECORDED);
    }

    #[test]
    fn unmapped_event_is_silent() {
        let mut mock = MockSoundBackend::new();
        let _ = mock.expect_play().times(0);
        let dispatcher = dispatcher_with(mock);
        assert!(dispatcher.dispatch(&Event::new("ping")).is_none());
        assert!(dispatcher.dispatch(&Event::new("connection.established")).is_none());
    }

    #[test]
    fn sound_failure_still_alerts() {
        let mut mock = MockSoundBackend::new();
        let _ = mock
            .expect_play()
            .times(1)
            .returning(|_| Err(SoundError::Unavailable("no output device".into())));

        let alert = dispatcher_with(mock).dispatch(&Event::new(CONTACT_CREATED));
        assert_eq!(alert.unwrap().title, "New contact message");
    }

    #[test]
    fn custom_profile_overrides_standard() {
        let chirp = Tone {
            frequency_hz: 1_320.0,
            ..Tone::default()
        };
        let policy = AlertPolicy::standard(Tone::default()).with(
            LEAD_CREATED,
            AlertProfile {
                title: "Hot lead".into(),
                tone: chirp,
            },
        );
        let mut mock = MockSoundBackend::new();
        let _ = mock
            .expect_play()
            .withf(move |tone| *tone == chirp)
            .times(1)
            .returning(|_| Ok(()));

        let alert = AlertDispatcher::new(policy, Arc::new(mock))
            .dispatch(&Event::new(LEAD_CREATED))
            .unwrap();
        assert_eq!(alert.title, "Hot lead");
    }

    #[test]
    fn policy_from_settings() {
        let settings = AlertSettings {
            alert_types: vec![LEAD_CREATED.into(), "invoice.paid".into()],
            tone_frequency_hz: 440.0,
            tone_duration_ms: 250,
            ..AlertSettings::default()
        };
        let policy = AlertPolicy::from_settings(&settings);
        assert_eq!(policy.len(), 2);
        let custom = policy.profile("invoice.paid").unwrap();
        assert_eq!(custom.title, "invoice.paid");
        assert!((custom.tone.frequency_hz - 440.0).abs() < f32::EPSILON);
        assert_eq!(custom.tone.duration, Duration::from_millis(250));
        assert!(policy.profile(CONTACT_CREATED).is_none());
    }

    #[test]
    fn disabled_sound_uses_silent_backend() {
        let settings = AlertSettings {
            sound_enabled: false,
            ..AlertSettings::default()
        };
        let dispatcher = AlertDispatcher::from_settings(&settings);
        assert_eq!(dispatcher.policy().len(), 3);
        assert!(dispatcher.dispatch(&Event::new(LEAD_CREATED)).is_some());
    }

    #[test]
    fn empty_policy_never_alerts() {
        let dispatcher = AlertDispatcher::new(AlertPolicy::new(), Arc::new(SilentBackend));
        assert!(dispatcher.policy().is_empty());
        assert!(dispatcher.dispatch(&Event::new(LEAD_CREATED)).is_none());
    }
}
