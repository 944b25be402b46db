use std::sync::Arc;

use async_trait::async_trait;
use stats_domain::{EventType, PlayerCounter, RawEvent};

use crate::identity::IdentityResolver;
use crate::pipeline::side_effects::SideEffectHandler;
use crate::realtime::{AchievementTracker, MatchStateMachine};

/// Routes one event to the match state machine, achievement counters
/// and passive identity tracking.
pub struct EventEffects {
    matches: MatchStateMachine,
    achievements: Option<AchievementTracker>,
    identity: Option<Arc<IdentityResolver>>,
}

impl EventEffects {
    pub fn new(matches: MatchStateMachine) -> Self {
        Self {
            matches,
            achievements: None,
            identity: None,
        }
    }

    pub fn with_achievements(mut self, tracker: AchievementTracker) -> Self {
        self.achievements = Some(tracker);
        self
    }

    pub fn with_identity(mut self, resolver: Arc<IdentityResolver>) -> Self {
        self.identity = Some(resolver);
        self
    }
}

#[async_trait]
impl SideEffectHandler for EventEffects {
    fn handles(&self, event_type: &EventType) -> bool {
        MatchStateMachine::handles(event_type)
            || matches!(event_type, EventType::Kill | EventType::Headshot)
    }

    async fn apply(&self, event: &RawEvent) -> anyhow::Result<()> {
        if MatchStateMachine::handles(&event.event_type) {
            self.matches.apply(event).await?;
        }

        match &event.event_type {
            EventType::Kill => {
                if let Some(tracker) = &self.achievements {
                    tracker
                        .record(&event.attacker_guid, PlayerCounter::Kills)
                        .await?;
                }
            }
            EventType::Headshot => {
                if let Some(tracker) = &self.achievements {
                    let guid = if event.attacker_guid.is_empty() {
                        &event.player_guid
                    } else {
                        &event.attacker_guid
                    };
                    tracker.record(guid, PlayerCounter::Headshots).await?;
                }
            }
            t if t.is_connect() => {
                if let Some(identity) = &self.identity {
                    identity
                        .update_last_seen(&event.player_guid, &event.player_name)
                        .await?;
                    identity
                        .record_alias(&event.player_guid, &event.player_name)
                        .await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
