mod common;

use std::time::Duration;

use common::{CHANNEL, Harness, Recorded};
use legionbot_core::model::{DOCTOR, DREDGE, GHOSTFACE, Health, LEGION, ModeState, PINHEAD, keys};
use legionbot_core::settings::{
    DoctorSettings, DredgeSettings, GhostFaceSettings, LegionSettings, PinheadSettings,
};

fn sure_legion() -> LegionSettings {
    LegionSettings {
        hit_chance: 1.0,
        react_chance: 1.0,
        min_delay_between_hits: Duration::ZERO,
        ..LegionSettings::default()
    }
}

// ============================================================================
// Legion
// ============================================================================

#[tokio::test]
async fn legion_fatal_hit_hooks_the_target() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            fatal_hit: 2,
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();

    h.chat(CHANNEL, "alice", "hello").await;
    assert_eq!(h.state(CHANNEL).health_of("alice"), Health::DeepWound);

    h.chat(CHANNEL, "alice", "still here").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.health_of("alice"), Health::Hooked);
    assert_eq!(state.participants["alice"].stats.get(keys::HOOKS), 1);
    assert_eq!(state.stats.get(keys::SUCCESS), 1);
    assert_eq!(
        h.gateway.timeouts(CHANNEL),
        vec![("alice".to_string(), Duration::from_secs(60))]
    );
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec![
            "start_legion",
            "on_frenzy_hit_prefinal USERNAME=alice",
            "on_frenzy_hit_dead USERNAME=alice",
        ]
    );
}

#[tokio::test]
async fn legion_miss_ends_the_round() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            hit_chance: 0.0,
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "hello").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::MISS), 1);
    assert_eq!(state.health_of("alice"), Health::Healthy);
    assert_eq!(
        h.gateway.messages(CHANNEL).last().map(String::as_str),
        Some("on_frenzy_miss USERNAME=alice")
    );
}

#[tokio::test]
async fn legion_ignores_exempt_senders() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| s.modes.legion = Some(sure_legion()));
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();

    h.chat(CHANNEL, CHANNEL, "my stream").await;
    h.chat(CHANNEL, "nightbot", "beep").await;
    h.chat(CHANNEL, "operator", "checking").await;

    let state = h.state(CHANNEL);
    assert_eq!(state.active_mode(), LEGION);
    assert_eq!(state.stats.get(keys::HITS), 0);
}

#[tokio::test(start_paused = true)]
async fn legion_deep_wound_bleeds_out_then_recovers() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            deep_wound_timeout: Duration::from_secs(1),
            bleed_out_ban_time: Duration::from_secs(2),
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "hello").await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.flush(CHANNEL).await;
    let state = h.state(CHANNEL);
    assert_eq!(state.health_of("alice"), Health::Dead);
    assert_eq!(state.participants["alice"].stats.get(keys::BLEED_OUTS), 1);
    assert_eq!(
        h.gateway.timeouts(CHANNEL),
        vec![("alice".to_string(), Duration::from_secs(2))]
    );
    assert!(h.gateway.messages(CHANNEL).contains(&"on_dead USERNAME=alice".to_string()));

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(h.state(CHANNEL).health_of("alice"), Health::Injured);
}

#[tokio::test]
async fn legion_mend_prevents_bleed_out() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| s.modes.legion = Some(sure_legion()));
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "hello").await;
    assert_eq!(h.services.timers.armed(CHANNEL), 2);

    h.chat(CHANNEL, "alice", "!mend").await;
    assert_eq!(h.state(CHANNEL).health_of("alice"), Health::Injured);
    assert_eq!(h.services.timers.armed(CHANNEL), 1);
}

#[tokio::test]
async fn legion_pallet_stun_ends_the_round() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            pallet_stun_chance: 1.0,
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "!pallet").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::STUNS), 1);
    assert_eq!(state.participants["alice"].stats.get(keys::STUNS), 1);
    assert_eq!(state.health_of("alice"), Health::Healthy);
    assert_eq!(h.services.timers.armed(CHANNEL), 0);
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec!["start_legion", "pallet_success USERNAME=alice"]
    );
}

#[tokio::test]
async fn legion_failed_pallet_takes_a_hit() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            pallet_stun_chance: 0.0,
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "!pallet").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert_eq!(state.active_mode(), LEGION);
    assert_eq!(state.health_of("alice"), Health::DeepWound);
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec![
            "start_legion",
            "pallet_failed USERNAME=alice",
            "on_frenzy_hit USERNAME=alice",
        ]
    );
}

#[tokio::test]
async fn legion_locker_stun_ends_the_round() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            locker_stun_chance: 1.0,
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "!locker").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::STUNS), 1);
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec!["start_legion", "locker_success USERNAME=alice"]
    );
}

#[tokio::test]
async fn legion_locker_grab_hooks_the_hider() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            locker_stun_chance: 0.0,
            locker_grab_chance: 1.0,
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "!locker").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::SUCCESS), 1);
    assert_eq!(state.health_of("alice"), Health::Hooked);
    assert_eq!(state.participants["alice"].stats.get(keys::HOOKS), 1);
    assert_eq!(
        h.gateway.timeouts(CHANNEL),
        vec![("alice".to_string(), Duration::from_secs(60))]
    );
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec![
            "start_legion",
            "locker_failed USERNAME=alice",
            "locker_grab USERNAME=alice",
        ]
    );
}

#[tokio::test]
async fn legion_tbag_always_gets_hit() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.legion = Some(LegionSettings {
            react_chance: 0.0,
            ..sure_legion()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, LEGION).await.unwrap();
    h.chat(CHANNEL, "alice", "!tbag").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert_eq!(state.active_mode(), LEGION);
    assert_eq!(state.health_of("alice"), Health::DeepWound);
    assert_eq!(state.participants["alice"].stats.get(keys::HITS), 1);
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec![
            "start_legion",
            "tbag_success USERNAME=alice",
            "on_frenzy_hit USERNAME=alice",
        ]
    );
}

// ============================================================================
// GhostFace
// ============================================================================

#[tokio::test(start_paused = true)]
async fn ghostface_marks_then_hooks_in_a_later_round() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.ghostface = Some(GhostFaceSettings {
            react_chance: 1.0,
            min_delay_between_hits: Duration::ZERO,
            timeout: Duration::from_secs(60),
            ..GhostFaceSettings::default()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, GHOSTFACE).await.unwrap();

    h.chat(CHANNEL, "bob", "hi").await;
    let state = h.state(CHANNEL);
    assert!(state.participants["bob"].marked);
    assert_eq!(state.health_of("bob"), Health::Healthy);

    // Nobody is stalked twice in the same round.
    h.chat(CHANNEL, "bob", "anyone there?").await;
    let state = h.state(CHANNEL);
    assert_eq!(state.active_mode(), GHOSTFACE);
    assert_eq!(state.health_of("bob"), Health::Healthy);

    tokio::time::sleep(Duration::from_secs(61)).await;
    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::FAIL), 1);
    assert!(state.participants["bob"].marked);

    h.orchestrator.start_specific_mode(CHANNEL, GHOSTFACE).await.unwrap();
    h.chat(CHANNEL, "bob", "back again").await;
    h.flush(CHANNEL).await;
    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.health_of("bob"), Health::Hooked);
    assert!(!state.participants["bob"].marked);
    assert_eq!(state.stats.get(keys::SUCCESS), 1);
    assert_eq!(
        h.gateway.timeouts(CHANNEL),
        vec![("bob".to_string(), Duration::from_secs(60))]
    );
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec![
            "start_gf",
            "gf_go_away COUNT=1",
            "start_gf",
            "gf_hit_dead USERNAME=bob",
            "gf_go_away COUNT=0",
        ]
    );
}

#[tokio::test]
async fn ghostface_reveal_chases_it_away() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.ghostface = Some(GhostFaceSettings {
            reveal_chance: 1.0,
            ..GhostFaceSettings::default()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, GHOSTFACE).await.unwrap();
    h.chat(CHANNEL, "carol", "!reveal").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::FAIL), 1);
    assert_eq!(state.participants["carol"].stats.get(keys::STUNS), 1);
    assert_eq!(state.health_of("carol"), Health::Healthy);
    assert!(h.gateway.timeouts(CHANNEL).is_empty());
}

#[tokio::test]
async fn ghostface_reveal_marks_the_revealer() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.ghostface = Some(GhostFaceSettings {
            reveal_chance: 1.0,
            ..GhostFaceSettings::default()
        });
    });
    h.services.store.update(CHANNEL, |state| {
        state.participant_mut("dave").marked = true;
    });
    h.orchestrator.start_specific_mode(CHANNEL, GHOSTFACE).await.unwrap();
    h.chat(CHANNEL, "carol", "!reveal").await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.participants["carol"].marked);
    assert!(!state.participants["dave"].marked);
    assert!(h.gateway.messages(CHANNEL).contains(&"gf_go_away COUNT=1".to_string()));
}

// ============================================================================
// Doctor
// ============================================================================

#[tokio::test(start_paused = true)]
async fn doctor_zero_timeout_ends_with_one_message() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.doctor = Some(DoctorSettings {
            timeout: Duration::ZERO,
            ..DoctorSettings::default()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, DOCTOR).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::FAIL), 1);
    assert_eq!(h.gateway.messages(CHANNEL), vec!["start_doctor", "doctor_go_away"]);
}

#[tokio::test]
async fn doctor_scrambles_and_deletes() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.doctor = Some(DoctorSettings {
            react_chance: 1.0,
            min_delay_between_hits: Duration::ZERO,
            ..DoctorSettings::default()
        });
    });
    h.orchestrator.start_specific_mode(CHANNEL, DOCTOR).await.unwrap();
    h.chat(CHANNEL, "alice", "hi everybody").await;
    h.flush(CHANNEL).await;

    let actions = h.gateway.actions(CHANNEL);
    assert!(actions.iter().any(|a| matches!(a, Recorded::Delete { .. })));
    let garbled = h.gateway.messages(CHANNEL).pop().unwrap();
    assert!(garbled.starts_with("alice: hi e"), "{garbled}");
    assert!(garbled.ends_with('y'));
}

#[tokio::test]
async fn doctor_leaves_hooked_and_dead_alone() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.doctor = Some(DoctorSettings {
            react_chance: 1.0,
            min_delay_between_hits: Duration::ZERO,
            ..DoctorSettings::default()
        });
    });
    h.services.store.update(CHANNEL, |state| {
        state.participant_mut("hooked").set_health(Health::Hooked);
        state.participant_mut("dead").set_health(Health::Dead);
    });
    h.orchestrator.start_specific_mode(CHANNEL, DOCTOR).await.unwrap();
    h.chat(CHANNEL, "hooked", "let me go").await;
    h.chat(CHANNEL, "dead", "boo").await;
    h.flush(CHANNEL).await;

    assert!(
        !h.gateway
            .actions(CHANNEL)
            .iter()
            .any(|a| matches!(a, Recorded::Delete { .. }))
    );
    assert_eq!(h.gateway.messages(CHANNEL), vec!["start_doctor"]);
}

// ============================================================================
// Pinhead
// ============================================================================

#[tokio::test]
async fn pinhead_questions_then_solve() {
    let h = Harness::new();
    h.completion.push("RESULT cities Paris");
    h.orchestrator.start_specific_mode(CHANNEL, PINHEAD).await.unwrap();

    let state = h.state(CHANNEL);
    match &state.mode_state {
        Some(ModeState::Pinhead(p)) => {
            assert_eq!(p.topic, "cities");
            assert_eq!(p.word, "paris");
        }
        other => panic!("expected pinhead, got {other:?}"),
    }

    h.completion.push("ANS YES");
    h.chat(CHANNEL, "alice", "!solve is it in Europe").await;
    h.chat(CHANNEL, "bob", "!solve @Paris").await;
    h.flush(CHANNEL).await;

    assert!(h.state(CHANNEL).is_idle());
    assert_eq!(h.state(CHANNEL).stats.get(keys::FAIL), 1);
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec![
            "start_pinhead TOPIC=cities",
            "pinhead_yes USERNAME=alice QUESTION=is it in europe",
            "pinhead_failure USERNAME=bob WORD=paris",
        ]
    );
    let prompts = h.completion.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[1].0, "pinhead_guess_prompt THE_WORD=paris");
}

#[tokio::test]
async fn pinhead_does_not_start_without_a_word() {
    let h = Harness::new();
    h.completion.push("I cannot do that");
    h.orchestrator.start_specific_mode(CHANNEL, PINHEAD).await.unwrap();
    h.flush(CHANNEL).await;

    assert!(h.state(CHANNEL).is_idle());
    assert!(h.gateway.messages(CHANNEL).is_empty());
}

#[tokio::test(start_paused = true)]
async fn pinhead_timeout_wounds_viewers() {
    let h = Harness::new();
    h.configure(CHANNEL, |s| {
        s.modes.pinhead = Some(PinheadSettings {
            timeout: Duration::from_secs(1),
            victim_count: 1,
            ..PinheadSettings::default()
        });
    });
    h.completion.push("RESULT food pizza");
    h.orchestrator.start_specific_mode(CHANNEL, PINHEAD).await.unwrap();
    h.chat(CHANNEL, "operator", "watching").await;
    h.chat(CHANNEL, "alice", "hmm").await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let messages = h.wait_for_messages(CHANNEL, 2).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.stats.get(keys::SUCCESS), 1);
    assert_eq!(state.health_of("alice"), Health::DeepWound);
    assert_eq!(state.health_of("operator"), Health::Healthy);
    assert_eq!(messages.last().map(String::as_str), Some("pinhead_success VICTIMS=alice"));
}

// ============================================================================
// Dredge
// ============================================================================

fn short_dredge(h: &Harness) {
    h.configure(CHANNEL, |s| {
        s.modes.dredge = Some(DredgeSettings {
            timeout: Duration::from_secs(1),
            ..DredgeSettings::default()
        });
    });
}

#[tokio::test(start_paused = true)]
async fn dredge_plurality_is_hooked() {
    let h = Harness::new();
    short_dredge(&h);
    h.orchestrator.start_specific_mode(CHANNEL, DREDGE).await.unwrap();

    h.orchestrator.handle_whisper("viewer1", "@Bob").await;
    h.orchestrator.handle_whisper("viewer2", "bob please").await;
    h.orchestrator.handle_whisper("viewer3", "carol").await;
    h.orchestrator.handle_whisper("operator", "carol").await;
    h.orchestrator.handle_whisper("somebot", "carol").await;
    h.orchestrator.handle_whisper("viewer4", "  @ ").await;

    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert!(state.is_idle());
    assert_eq!(state.health_of("bob"), Health::Hooked);
    assert_eq!(
        h.gateway.timeouts(CHANNEL),
        vec![("bob".to_string(), Duration::from_secs(60))]
    );
    let emote_only: Vec<bool> = h
        .gateway
        .actions(CHANNEL)
        .into_iter()
        .filter_map(|a| match a {
            Recorded::EmoteOnly { enabled, .. } => Some(enabled),
            _ => None,
        })
        .collect();
    assert_eq!(emote_only, vec![true, false]);
    assert_eq!(
        h.gateway.messages(CHANNEL),
        vec!["start_dredge", "dredge_hit_dead USERNAME=bob"]
    );
}

#[tokio::test(start_paused = true)]
async fn dredge_tie_sacrifices_nobody() {
    let h = Harness::new();
    short_dredge(&h);
    h.orchestrator.start_specific_mode(CHANNEL, DREDGE).await.unwrap();
    for (voter, nominee) in [("v1", "bob"), ("v2", "bob"), ("v3", "carol"), ("v4", "carol")] {
        h.orchestrator.handle_whisper(voter, nominee).await;
    }

    tokio::time::sleep(Duration::from_millis(1500)).await;
    h.flush(CHANNEL).await;

    let state = h.state(CHANNEL);
    assert_eq!(state.stats.get(keys::FAIL), 1);
    assert!(h.gateway.timeouts(CHANNEL).is_empty());
    assert_eq!(
        h.gateway.messages(CHANNEL).last().map(String::as_str),
        Some("dredge_go_away")
    );
}
