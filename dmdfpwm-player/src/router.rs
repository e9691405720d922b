//! Channel → sink routing
//!
//! Maps each channel of a track onto the sinks that should play it. Named
//! channels are looked up in the configured table; anything the table does
//! not cover can fall back to positional assignment (channel `i` goes to the
//! `i`-th available sink) when auto-detect is on.

use crate::error::{Error, Result};
use crate::sink::SinkId;
use dmdfpwm_common::ChannelConfig;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// Routing table, passed explicitly to the router
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Channel name → sink ids, in preference order
    #[serde(default)]
    pub channels: BTreeMap<String, Vec<String>>,

    /// Positional fallback for channels the table does not cover
    #[serde(default = "default_auto_detect")]
    pub auto_detect: bool,
}

fn default_auto_detect() -> bool {
    true
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            channels: BTreeMap::new(),
            auto_detect: default_auto_detect(),
        }
    }
}

impl RoutingConfig {
    /// Add a table entry, replacing any previous one for `channel`
    pub fn route(mut self, channel: impl Into<String>, sinks: &[&str]) -> Self {
        self.channels
            .insert(channel.into(), sinks.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn auto_detect(mut self, enabled: bool) -> Self {
        self.auto_detect = enabled;
        self
    }
}

/// Resolved sinks per channel index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkAssignment {
    per_channel: Vec<Vec<SinkId>>,
}

impl SinkAssignment {
    pub fn from_channels(per_channel: Vec<Vec<SinkId>>) -> Self {
        Self { per_channel }
    }

    pub fn channel_count(&self) -> usize {
        self.per_channel.len()
    }

    /// Sinks for a channel; empty for an unrouted or unknown channel
    pub fn sinks_for(&self, channel: usize) -> &[SinkId] {
        self.per_channel
            .get(channel)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total (channel, sink) pairs
    pub fn total(&self) -> usize {
        self.per_channel.iter().map(Vec::len).sum()
    }

    /// Distinct sinks used by any channel, in first-use order
    pub fn all_sinks(&self) -> Vec<SinkId> {
        let mut seen = HashSet::new();
        self.per_channel
            .iter()
            .flatten()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// # Errors
    /// `Error::SinkUnavailable` when nothing would be heard
    pub fn require_audible(&self) -> Result<()> {
        if self.total() == 0 {
            return Err(Error::SinkUnavailable);
        }
        Ok(())
    }
}

/// Resolves channel configs against available sinks
#[derive(Debug, Clone, Default)]
pub struct SinkRouter {
    config: RoutingConfig,
}

impl SinkRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Assign sinks to every channel
    ///
    /// Channels without a config entry (or beyond the config array) use the
    /// positional fallback. The result never contains an id missing from
    /// `available`.
    pub fn resolve(
        &self,
        channel_configs: &[ChannelConfig],
        channel_count: usize,
        available: &[SinkId],
    ) -> SinkAssignment {
        let available_set: HashSet<&str> = available.iter().map(SinkId::as_str).collect();

        let per_channel: Vec<Vec<SinkId>> = (0..channel_count)
            .map(|i| {
                let name = channel_configs.get(i).and_then(|c| c.name.as_deref());
                let sinks = self.resolve_channel(i, name, available, &available_set);
                debug!(
                    channel = i,
                    name = name.unwrap_or("-"),
                    sinks = ?sinks,
                    "Resolved channel routing"
                );
                sinks
            })
            .collect();

        let assignment = SinkAssignment::from_channels(per_channel);
        info!(
            channels = channel_count,
            pairs = assignment.total(),
            "Sink routing resolved"
        );
        assignment
    }

    fn resolve_channel(
        &self,
        index: usize,
        name: Option<&str>,
        available: &[SinkId],
        available_set: &HashSet<&str>,
    ) -> Vec<SinkId> {
        let positional = || -> Vec<SinkId> {
            if self.config.auto_detect {
                available.get(index).cloned().into_iter().collect()
            } else {
                Vec::new()
            }
        };

        let configured = match name.and_then(|n| self.config.channels.get(n)) {
            Some(ids) => ids,
            None => return positional(),
        };

        let mut seen = HashSet::new();
        let usable: Vec<SinkId> = configured
            .iter()
            .filter(|id| available_set.contains(id.as_str()))
            .filter(|id| seen.insert(id.as_str()))
            .map(|id| SinkId::new(id.as_str()))
            .collect();

        if usable.is_empty() {
            positional()
        } else {
            usable
        }
    }
}
