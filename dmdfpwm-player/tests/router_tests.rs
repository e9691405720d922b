//! Sink routing tests

use dmdfpwm_common::ChannelConfig;
use dmdfpwm_player::{RoutingConfig, SinkId, SinkRouter};

fn ids(names: &[&str]) -> Vec<SinkId> {
    names.iter().map(|n| SinkId::new(*n)).collect()
}

#[test]
fn test_configured_channel_gets_exactly_its_sinks() {
    let router = SinkRouter::new(RoutingConfig::default().route("FL", &["s1"]));
    let assignment = router.resolve(&[ChannelConfig::named("FL")], 1, &ids(&["s1", "s2"]));

    assert_eq!(assignment.sinks_for(0), ids(&["s1"]).as_slice());
    assert_eq!(assignment.total(), 1);
}

#[test]
fn test_unknown_name_falls_back_to_position() {
    let router = SinkRouter::new(RoutingConfig::default().route("FL", &["s1"]));
    let configs = [ChannelConfig::named("FL"), ChannelConfig::named("X")];
    let assignment = router.resolve(&configs, 2, &ids(&["s1", "s2"]));

    assert_eq!(assignment.sinks_for(1), ids(&["s2"]).as_slice());
}

#[test]
fn test_unavailable_configured_sinks_fall_back_when_auto_detect() {
    let router = SinkRouter::new(RoutingConfig::default().route("FR", &["gone"]));
    let configs = [ChannelConfig::named("FL"), ChannelConfig::named("FR")];

    let assignment = router.resolve(&configs, 2, &ids(&["s1", "s2"]));
    assert_eq!(assignment.sinks_for(1), ids(&["s2"]).as_slice());

    let strict = SinkRouter::new(
        RoutingConfig::default()
            .route("FR", &["gone"])
            .auto_detect(false),
    );
    let assignment = strict.resolve(&configs, 2, &ids(&["s1", "s2"]));
    assert!(assignment.sinks_for(0).is_empty());
    assert!(assignment.sinks_for(1).is_empty());
    assert!(assignment.require_audible().is_err());
}

#[test]
fn test_unnamed_channel_uses_position() {
    let router = SinkRouter::new(RoutingConfig::default().route("FL", &["s2"]));
    let configs = [ChannelConfig::default(), ChannelConfig::named("FL")];
    let assignment = router.resolve(&configs, 2, &ids(&["s1", "s2"]));

    assert_eq!(assignment.sinks_for(0), ids(&["s1"]).as_slice());
    assert_eq!(assignment.sinks_for(1), ids(&["s2"]).as_slice());
    assert_eq!(assignment.all_sinks(), ids(&["s1", "s2"]));
}

#[test]
fn test_resolution_is_deterministic() {
    let router = SinkRouter::new(
        RoutingConfig::default()
            .route("L", &["c", "a"])
            .route("R", &["b"]),
    );
    let configs = [
        ChannelConfig::named("L"),
        ChannelConfig::named("R"),
        ChannelConfig::named("C"),
    ];
    let available = ids(&["a", "b", "c"]);

    let first = router.resolve(&configs, 3, &available);
    let second = router.resolve(&configs, 3, &available);
    assert_eq!(first, second);
    assert_eq!(first.sinks_for(0), ids(&["c", "a"]).as_slice());
    assert_eq!(first.sinks_for(2), ids(&["c"]).as_slice());
}
