//! Boot-time configuration overlay: decoded tables through the builder and
//! into a running engine, with every failure path degrading to built-ins.

#![cfg(feature = "dynamic-config")]

use button_intercept::{
    apply_bindings, overlay, ChannelAliasConfig, ChannelAliases, InputSnapshot, InterceptEngine,
    PatternsConfig, ProgramBank, RecordingRelayDriver,
};

const TICK_MS: u32 = 10;

fn boot(channels_json: &str, patterns_json: &str) -> (ProgramBank, ChannelAliases, PatternsConfig) {
    let mut bank = ProgramBank::new();
    let mut aliases = ChannelAliases::new();
    if let Ok(config) = ChannelAliasConfig::from_json(channels_json) {
        aliases.apply(&config);
    }
    let patterns = PatternsConfig::from_json(patterns_json).unwrap();
    overlay(&mut bank, &aliases, &patterns).unwrap();
    (bank, aliases, patterns)
}

#[test]
fn dynamic_program_plays_through_the_engine() {
    let (bank, _aliases, patterns) = boot(
        r#"[[6, "Tail feather"]]"#,
        r#"{
            "sequences": { "double_tap": [[true, 100], [false, 100], [true, 100], [false, 100]] },
            "patterns": { "Greeting": [["Tail feather", 0, "double_tap"]] },
            "pattern_mappings": { "2": "Greeting" }
        }"#,
    );

    let mut engine = InterceptEngine::new(RecordingRelayDriver::new());
    apply_bindings(&bank, &patterns, &mut engine);
    assert_eq!(engine.controller(2).program().unwrap().name(), "Greeting");

    // Press button 2 and watch the aliased relay (output 6) double-tap.
    let press = InputSnapshot::default().with_channel(2, true);
    let mut transitions = Vec::new();
    let mut last = false;
    let mut now_ms = 0;
    while now_ms <= 1_000 {
        let outputs = engine.tick(press, now_ms);
        if outputs[6] != last {
            last = outputs[6];
            transitions.push((now_ms, last));
        }
        now_ms += TICK_MS;
    }

    // Debounce commits at 110, playback output flows from 120; the two taps
    // land 200ms apart.
    assert_eq!(
        transitions,
        vec![(120, true), (210, false), (310, true), (410, false)]
    );
    // Button 2's own output never fires: the explicit target overrides it.
    assert!(engine.driver().frames().iter().all(|frame| !frame[2]));
}

#[test]
fn unknown_names_degrade_to_builtins() {
    let (bank, _aliases, patterns) = boot(
        "[]",
        r#"{
            "patterns": { "Broken": [["No Such Relay", 0, "no_such_sequence"]] },
            "pattern_mappings": { "1": "Broken", "3": "Chase" }
        }"#,
    );

    let mut engine = InterceptEngine::new(RecordingRelayDriver::new());
    apply_bindings(&bank, &patterns, &mut engine);

    // "Broken" had no usable entries and was never built: channel 1 stays a
    // follower. The built-in binding still applies.
    assert!(engine.controller(1).program().is_none());
    assert_eq!(engine.controller(3).program().unwrap().name(), "Chase");
}

#[test]
fn dynamic_sequences_feed_builtin_named_patterns() {
    // A dynamic sequence shadows a built-in sequence name for pattern
    // building, while built-in programs keep shadowing dynamic programs.
    let (bank, _aliases, _patterns) = boot(
        "[]",
        r#"{
            "sequences": { "poof": [[true, 50], [false, 50]] },
            "patterns": {
                "Shortened": [["Channel 0", 0, "poof"]],
                "Poof": [["Channel 0", 0, "poof"]]
            }
        }"#,
    );

    // The pattern picked up the 100ms dynamic "poof", not the built-in one.
    let shortened = bank.program_by_name("Shortened").unwrap();
    assert_eq!(shortened.total_play_time_ms(), 100);

    // Looking up "Poof" still returns the 700ms built-in program.
    assert_eq!(bank.program_by_name("Poof").unwrap().total_play_time_ms(), 700);
}

#[test]
fn alias_table_defaults_survive_a_bad_channels_document() {
    let mut aliases = ChannelAliases::new();
    assert!(ChannelAliasConfig::from_json("not json").is_err());
    // Nothing applied: the defaults still resolve.
    assert_eq!(aliases.resolve("Channel 5"), Some(5));
    aliases.apply(&ChannelAliasConfig(vec![(5, "Beak".into())]));
    assert_eq!(aliases.resolve("Beak"), Some(5));
}
