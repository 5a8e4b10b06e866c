//! Per-session channel subscriptions and message selection.
//!
//! A session subscribes to metric channels by wire name, or to "all".
//! The functions here are pure: given a reading or a snapshot plus a
//! channel set, they produce exactly the messages that session should
//! receive.

use std::collections::HashSet;

use vitals_core::{Metric, Reading, SensorState};
use vitals_protocol::ServerMessage;

/// The wildcard channel name.
pub const ALL_CHANNELS: &str = "all";

/// A session's subscribed channel set.
#[derive(Debug, Clone, Default)]
pub struct ChannelSet {
    all: bool,
    channels: HashSet<String>,
}

impl ChannelSet {
    /// Subscribed to every channel.
    pub fn all() -> Self {
        Self {
            all: true,
            channels: HashSet::new(),
        }
    }

    /// Subscribed to nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from a list of channel names ("all" wins over the rest).
    pub fn from_channels<S: AsRef<str>>(channels: &[S]) -> Self {
        let mut set = Self::none();
        set.subscribe(channels);
        set
    }

    /// Add channels to the subscription.
    pub fn subscribe<S: AsRef<str>>(&mut self, channels: &[S]) {
        for channel in channels {
            if channel.as_ref() == ALL_CHANNELS {
                self.all = true;
            } else {
                self.channels.insert(channel.as_ref().to_string());
            }
        }
    }

    /// Remove channels; unsubscribing "all" clears everything.
    pub fn unsubscribe<S: AsRef<str>>(&mut self, channels: &[S]) {
        for channel in channels {
            if channel.as_ref() == ALL_CHANNELS {
                self.all = false;
                self.channels.clear();
            } else {
                self.channels.remove(channel.as_ref());
            }
        }
    }

    pub fn is_all(&self) -> bool {
        self.all
    }

    pub fn is_empty(&self) -> bool {
        !self.all && self.channels.is_empty()
    }

    /// Whether updates on this channel should be delivered.
    pub fn contains(&self, channel: &str) -> bool {
        self.all || self.channels.contains(channel)
    }
}

/// Messages a session with the given channel set receives for a reading.
///
/// "all" sessions get the combined `vitalsUpdate`; channel-scoped sessions
/// get one event per subscribed present metric. Whenever the reading
/// carries finger presence, the derived `fingerNotDetected` event is
/// published alongside.
pub fn update_messages(reading: &Reading, channels: &ChannelSet) -> Vec<ServerMessage> {
    let mut out = Vec::new();

    if channels.is_all() {
        out.push(ServerMessage::VitalsUpdate(reading.clone()));
        if let Some(detected) = reading.finger_detected {
            out.push(ServerMessage::FingerNotDetected(!detected));
        }
        return out;
    }

    if channels.contains(Metric::HeartRate.channel()) {
        if let Some(v) = reading.heart_rate {
            out.push(ServerMessage::HeartRate(Some(v)));
        }
    }
    if channels.contains(Metric::Spo2.channel()) {
        if let Some(v) = reading.spo2 {
            out.push(ServerMessage::Spo2(Some(v)));
        }
    }
    if channels.contains(Metric::TemperatureC.channel()) {
        if let Some(v) = reading.temperature_c {
            out.push(ServerMessage::Temperature(Some(v)));
        }
    }
    if channels.contains(Metric::TemperatureF.channel()) {
        if let Some(v) = reading.temperature_f {
            out.push(ServerMessage::TemperatureF(Some(v)));
        }
    }
    if channels.contains(Metric::Status.channel()) {
        if let Some(ref v) = reading.status {
            out.push(ServerMessage::Status(Some(v.clone())));
        }
    }
    if channels.contains(Metric::FingerDetected.channel()) {
        if let Some(detected) = reading.finger_detected {
            out.push(ServerMessage::FingerNotDetected(!detected));
        }
    }

    out
}

/// Late-join sync: current-value messages for every subscribed channel,
/// so a new session never sees a blank state until the next physical
/// reading. Never-reported slots are sent as null; finger presence is
/// reported as "not detected" until a reading says otherwise.
pub fn snapshot_messages(state: &SensorState, channels: &ChannelSet) -> Vec<ServerMessage> {
    let mut out = Vec::new();

    for metric in Metric::ALL {
        if !channels.contains(metric.channel()) {
            continue;
        }
        out.push(match metric {
            Metric::HeartRate => ServerMessage::HeartRate(state.heart_rate),
            Metric::Spo2 => ServerMessage::Spo2(state.spo2),
            Metric::TemperatureC => ServerMessage::Temperature(state.temperature_c),
            Metric::TemperatureF => ServerMessage::TemperatureF(state.temperature_f),
            Metric::Status => ServerMessage::Status(state.status.clone()),
            Metric::FingerDetected => {
                ServerMessage::FingerNotDetected(!matches!(state.finger_detected, Some(true)))
            }
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> Reading {
        Reading {
            heart_rate: Some(72),
            spo2: Some(98),
            finger_detected: Some(false),
            timestamp: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_channel_set_all() {
        let set = ChannelSet::from_channels(&["heartRate", "all"]);
        assert!(set.is_all());
        assert!(set.contains("spo2"));
    }

    #[test]
    fn test_channel_set_scoped() {
        let mut set = ChannelSet::from_channels(&["heartRate"]);
        assert!(set.contains("heartRate"));
        assert!(!set.contains("spo2"));

        set.unsubscribe(&["heartRate"]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_unsubscribe_all_clears_everything() {
        let mut set = ChannelSet::from_channels(&["heartRate", "spo2"]);
        set.unsubscribe(&["all"]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_update_messages_scoped_delivery() {
        let set = ChannelSet::from_channels(&["heartRate"]);
        let msgs = update_messages(&reading(), &set);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], ServerMessage::HeartRate(Some(72))));
    }

    #[test]
    fn test_update_messages_all_gets_combined() {
        let msgs = update_messages(&reading(), &ChannelSet::all());
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], ServerMessage::VitalsUpdate(_)));
        // finger_detected = false -> fingerNotDetected = true
        assert!(matches!(msgs[1], ServerMessage::FingerNotDetected(true)));
    }

    #[test]
    fn test_update_messages_none_for_unsubscribed() {
        let set = ChannelSet::from_channels(&["temperature"]);
        assert!(update_messages(&reading(), &set).is_empty());
    }

    #[test]
    fn test_finger_channel_gets_derived_event() {
        let set = ChannelSet::from_channels(&["fingerDetected"]);
        let msgs = update_messages(&reading(), &set);
        assert_eq!(msgs.len(), 1);
        assert!(matches!(msgs[0], ServerMessage::FingerNotDetected(true)));
    }

    #[test]
    fn test_snapshot_messages_cover_subscribed_channels() {
        let state = SensorState {
            heart_rate: Some(70),
            ..Default::default()
        };
        let set = ChannelSet::from_channels(&["heartRate", "spo2"]);
        let msgs = snapshot_messages(&state, &set);
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], ServerMessage::HeartRate(Some(70))));
        // Never-reported slot is sent as null, not omitted.
        assert!(matches!(msgs[1], ServerMessage::Spo2(None)));
    }

    #[test]
    fn test_snapshot_unknown_finger_reports_not_detected() {
        let msgs = snapshot_messages(&SensorState::default(), &ChannelSet::all());
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::FingerNotDetected(true))));
    }
}
