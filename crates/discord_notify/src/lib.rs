//! Discord adapter: tracks one target channel per joined guild and fans
//! reminder messages out to all of them.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serenity::all::{
    ChannelId, ChannelType, Context, EventHandler, Guild, GuildId, Http, Ready, UnavailableGuild,
};
use serenity::async_trait;
use tracing::{info, warn};

/// Messages go to the first channel with this name on each guild. Guilds
/// without one receive nothing.
pub const CHANNEL_NAME: &str = "tournaments";

/// Guild → target channel map. Written only by gateway event handlers, read
/// by [`Broadcaster::broadcast`] through a snapshot.
#[derive(Default)]
pub struct ChannelDirectory {
    targets: Mutex<HashMap<GuildId, ChannelId>>,
}

impl ChannelDirectory {
    pub fn insert(&self, guild: GuildId, channel: ChannelId) {
        self.targets.lock().unwrap().insert(guild, channel);
    }

    pub fn remove(&self, guild: GuildId) {
        self.targets.lock().unwrap().remove(&guild);
    }

    /// Copy of the current targets, so sends happen outside the lock.
    pub fn snapshot(&self) -> Vec<(GuildId, ChannelId)> {
        self.targets.lock().unwrap().iter().map(|(g, c)| (*g, *c)).collect()
    }

    pub fn len(&self) -> usize {
        self.targets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A guild channel reduced to what target selection needs.
#[derive(Debug, Clone)]
pub struct ChannelCandidate {
    pub id: ChannelId,
    pub name: String,
    pub position: u16,
}

/// Picks a guild's target: the text channel named [`CHANNEL_NAME`] that
/// sorts first by (position, id). Gateway payloads carry channels in map
/// order, so "first" needs a defined sort.
pub fn select_target(mut candidates: Vec<ChannelCandidate>) -> Option<ChannelId> {
    candidates.sort_by_key(|c| (c.position, c.id));
    candidates.into_iter().find(|c| c.name == CHANNEL_NAME).map(|c| c.id)
}

/// Gateway event handler keeping the channel directory current.
pub struct Bot {
    channels: Arc<ChannelDirectory>,
}

impl Bot {
    pub fn new(channels: Arc<ChannelDirectory>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl EventHandler for Bot {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("bot is ready as {:?}", ready.user.name);
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        let candidates = guild
            .channels
            .values()
            .filter(|channel| channel.kind == ChannelType::Text)
            .map(|channel| ChannelCandidate {
                id: channel.id,
                name: channel.name.clone(),
                position: channel.position,
            })
            .collect();

        match select_target(candidates) {
            Some(channel) => {
                info!("guild {:?} added, posting to #{CHANNEL_NAME} ({channel})", guild.name);
                self.channels.insert(guild.id, channel);
            }
            None => {
                info!("guild {:?} has no #{CHANNEL_NAME} channel, nothing to post to", guild.name);
            }
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, full: Option<Guild>) {
        let name = full.map(|g| g.name).unwrap_or_default();
        info!("guild {name:?} removed");
        self.channels.remove(incomplete.id);
    }
}

/// Sends reminder messages to every tracked target channel.
pub struct Broadcaster {
    http: Arc<Http>,
    channels: Arc<ChannelDirectory>,
}

impl Broadcaster {
    pub fn new(http: Arc<Http>, channels: Arc<ChannelDirectory>) -> Self {
        Self { http, channels }
    }

    /// Attempts delivery to every current target exactly once and returns
    /// how many sends succeeded. A failing channel is logged and skipped,
    /// never aborting the rest.
    pub async fn broadcast(&self, text: &str) -> usize {
        let targets = self.channels.snapshot();
        let http = self.http.clone();
        fan_out(targets, |channel| {
            let http = http.clone();
            let text = text.to_string();
            async move {
                channel.say(&http, text).await?;
                Ok(())
            }
        })
        .await
    }
}

async fn fan_out<S, Fut>(targets: Vec<(GuildId, ChannelId)>, mut send: S) -> usize
where
    S: FnMut(ChannelId) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut delivered = 0;
    for (guild, channel) in targets {
        match send(channel).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!("sending to channel {channel} on guild {guild} failed: {e:#}"),
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn candidate(id: u64, name: &str, position: u16) -> ChannelCandidate {
        ChannelCandidate {
            id: ChannelId::new(id),
            name: name.to_string(),
            position,
        }
    }

    #[test]
    fn target_is_channel_with_configured_name() {
        let picked = select_target(vec![
            candidate(10, "general", 0),
            candidate(11, "tournaments", 3),
            candidate(12, "random", 1),
        ]);
        assert_eq!(picked, Some(ChannelId::new(11)));
    }

    #[test]
    fn target_pick_is_stable_under_ties() {
        // Two matching channels: the lower (position, id) wins, no matter
        // the input order.
        let forward = select_target(vec![
            candidate(20, "tournaments", 2),
            candidate(21, "tournaments", 1),
        ]);
        let reversed = select_target(vec![
            candidate(21, "tournaments", 1),
            candidate(20, "tournaments", 2),
        ]);
        assert_eq!(forward, Some(ChannelId::new(21)));
        assert_eq!(forward, reversed);
    }

    #[test]
    fn no_target_without_matching_name() {
        assert_eq!(select_target(vec![candidate(30, "general", 0)]), None);
        assert_eq!(select_target(Vec::new()), None);
    }

    #[test]
    fn directory_tracks_guild_membership() {
        let dir = ChannelDirectory::default();
        assert!(dir.is_empty());

        dir.insert(GuildId::new(1), ChannelId::new(100));
        dir.insert(GuildId::new(2), ChannelId::new(200));
        assert_eq!(dir.len(), 2);

        dir.remove(GuildId::new(1));
        assert_eq!(dir.snapshot(), vec![(GuildId::new(2), ChannelId::new(200))]);

        // Re-joining a guild replaces its target.
        dir.insert(GuildId::new(2), ChannelId::new(201));
        assert_eq!(dir.snapshot(), vec![(GuildId::new(2), ChannelId::new(201))]);
    }

    #[tokio::test]
    async fn fan_out_attempts_every_target_despite_failures() {
        let targets = vec![
            (GuildId::new(1), ChannelId::new(100)),
            (GuildId::new(2), ChannelId::new(200)),
        ];
        let attempts = Cell::new(0usize);

        let delivered = fan_out(targets, |channel| {
            attempts.set(attempts.get() + 1);
            async move {
                if channel == ChannelId::new(200) {
                    Err(anyhow::anyhow!("missing permissions"))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(attempts.get(), 2);
        assert_eq!(delivered, 1);
    }
}
