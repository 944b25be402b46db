use std::sync::Arc;

use stats_domain::ports::MatchStateStore;
use stats_domain::{EventType, LiveMatch, MatchProgress, RawEvent, Team};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::metrics::PipelineMetrics;
use crate::pipeline::queue::IngestQueue;

/// Live match lifecycle: absent -> live -> absent.
///
/// Match end back-fills per-player win/loss facts by re-injecting synthetic
/// `match_outcome` events through the ingestion queue. The live state is only
/// deleted once every outcome was queued.
pub struct MatchStateMachine {
    store: Arc<dyn MatchStateStore>,
    queue: IngestQueue,
    metrics: Arc<PipelineMetrics>,
}

impl MatchStateMachine {
    pub fn new(
        store: Arc<dyn MatchStateStore>,
        queue: IngestQueue,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            queue,
            metrics,
        }
    }

    pub fn handles(event_type: &EventType) -> bool {
        matches!(
            event_type,
            EventType::MatchStart
                | EventType::MatchEnd
                | EventType::TeamWin
                | EventType::TeamJoin
                | EventType::TeamChange
                | EventType::Spawn
                | EventType::PlayerSpawn
                | EventType::Heartbeat
                | EventType::Connect
                | EventType::ClientConnect
                | EventType::Disconnect
                | EventType::ClientDisconnect
        )
    }

    pub async fn apply(&self, event: &RawEvent) -> anyhow::Result<()> {
        let match_id = event.match_id.trim();
        if match_id.is_empty() {
            return Ok(());
        }

        match &event.event_type {
            EventType::MatchStart => self.start(match_id, event).await,
            EventType::MatchEnd => self.end(match_id, event).await.map(|_| ()),
            EventType::TeamWin => self.team_win(match_id, event).await,
            EventType::TeamJoin | EventType::TeamChange => {
                let team = if event.new_team.is_empty() {
                    &event.player_team
                } else {
                    &event.new_team
                };
                self.assign(match_id, &event.player_guid, team).await
            }
            EventType::Spawn | EventType::PlayerSpawn => {
                self.assign(match_id, &event.player_guid, &event.player_team)
                    .await
            }
            EventType::Heartbeat => self.heartbeat(match_id, event).await,
            t if t.is_connect() => self.connect(match_id, event).await,
            t if t.is_disconnect() => {
                if event.player_guid.is_empty() {
                    return Ok(());
                }
                self.store.remove_player(match_id, &event.player_guid).await
            }
            _ => Ok(()),
        }
    }

    async fn start(&self, match_id: &str, event: &RawEvent) -> anyhow::Result<()> {
        let started_at = if event.timestamp > 0.0 {
            event.timestamp as i64
        } else {
            OffsetDateTime::now_utc().unix_timestamp()
        };
        let live = LiveMatch {
            match_id: match_id.to_string(),
            server_id: event.server_id.clone(),
            map_name: event.map_name.clone(),
            gametype: event.gametype.clone(),
            started_at,
            round_number: 1,
            allies_score: 0,
            axis_score: 0,
            player_count: event.player_count.max(0),
        };
        self.store.start_match(&live).await?;
        info!(match_id, map = %live.map_name, gametype = %live.gametype, "match started");
        Ok(())
    }

    /// Returns the number of outcome events re-submitted.
    async fn end(&self, match_id: &str, event: &RawEvent) -> anyhow::Result<usize> {
        let winner = if event.winning_team.trim().is_empty() {
            self.store
                .recorded_winner(match_id)
                .await?
                .map(|team| Team::normalize(&team))
                .unwrap_or_default()
        } else {
            Team::normalize(&event.winning_team)
        };

        let live = self.store.live_match(match_id).await?;
        let gametype = if event.gametype.is_empty() {
            live.as_ref().map(|m| m.gametype.clone()).unwrap_or_default()
        } else {
            event.gametype.clone()
        };
        let map_name = if event.map_name.is_empty() {
            live.as_ref().map(|m| m.map_name.clone()).unwrap_or_default()
        } else {
            event.map_name.clone()
        };

        let assignments = self.store.team_assignments(match_id).await?;
        let mut submitted = 0usize;
        for assignment in &assignments {
            let won = !winner.is_empty() && Team::normalize(&assignment.team) == winner;
            let outcome = RawEvent {
                event_type: EventType::MatchOutcome,
                match_id: match_id.to_string(),
                server_id: event.server_id.clone(),
                map_name: map_name.clone(),
                timestamp: event.timestamp,
                player_guid: assignment.player_guid.clone(),
                player_team: assignment.team.clone(),
                count: i32::from(won),
                gametype: gametype.clone(),
                winning_team: winner.clone(),
                ..RawEvent::default()
            };
            if self.queue.enqueue_derived(outcome) {
                submitted += 1;
            } else {
                warn!(match_id, player = %assignment.player_guid, "match outcome shed");
            }
        }
        self.metrics.record_outcomes(submitted);

        if submitted < assignments.len() {
            warn!(
                match_id,
                players = assignments.len(),
                outcomes = submitted,
                "match outcomes shed, live state left to expire"
            );
            return Ok(submitted);
        }

        self.store.end_match(match_id).await?;
        info!(
            match_id,
            winner = %winner,
            players = assignments.len(),
            outcomes = submitted,
            "match ended"
        );
        Ok(submitted)
    }

    async fn team_win(&self, match_id: &str, event: &RawEvent) -> anyhow::Result<()> {
        let team = if event.winning_team.is_empty() {
            &event.player_team
        } else {
            &event.winning_team
        };
        let team = Team::normalize(team);
        if team.is_empty() {
            return Ok(());
        }
        self.store.record_winner(match_id, &team).await
    }

    async fn assign(&self, match_id: &str, player_guid: &str, team: &str) -> anyhow::Result<()> {
        let team = Team::normalize(team);
        if player_guid.is_empty() || team.is_empty() {
            return Ok(());
        }
        self.store.assign_team(match_id, player_guid, &team).await
    }

    async fn heartbeat(&self, match_id: &str, event: &RawEvent) -> anyhow::Result<()> {
        let progress = MatchProgress {
            round_number: event.round_number,
            allies_score: event.allies_score,
            axis_score: event.axis_score,
            player_count: event.player_count,
        };
        if !self.store.update_progress(match_id, &progress).await? {
            debug!(match_id, "heartbeat for a match that is not live");
        }
        Ok(())
    }

    async fn connect(&self, match_id: &str, event: &RawEvent) -> anyhow::Result<()> {
        if event.player_guid.is_empty() {
            return Ok(());
        }
        if !event.player_name.is_empty() {
            self.store
                .record_player_name(&event.player_guid, &event.player_name)
                .await?;
        }
        self.store.add_player(match_id, &event.player_guid).await
    }
}
