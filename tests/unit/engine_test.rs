//! Unit tests for the analysis engine over a scripted provider

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lexicheck::analyzer::{
    Availability, BackendError, CapabilityKind, Category, Origin, SessionOptions, Severity,
};
use lexicheck::Priority;

use crate::helpers::{engine_with, teh_response, test_config, ScriptedProvider};

fn proof_provider() -> ScriptedProvider {
    ScriptedProvider::new()
        .with_kind(CapabilityKind::Proof, Availability::Available)
        .responding(|input, _| Ok(teh_response(input)))
}

// ============================================================================
// Chunk Decision
// ============================================================================

#[test]
fn fifty_char_input_is_a_single_chunk() {
    let provider = Arc::new(proof_provider());
    let engine = engine_with(test_config(), &provider);

    let text = "Teh short note that fits well inside one call, ok.";
    assert_eq!(text.chars().count(), 50);
    let result = engine.analyze(text, "");

    assert_eq!(result.origin, Origin::Model);
    assert_eq!(result.chunk_count, 1);
    assert!(!result.was_chunked);
    assert_eq!(result.source_text_length, 50);
    assert_eq!(provider.calls(), 1);
    assert_eq!(provider.inputs()[0], text);
}

#[test]
fn long_input_is_chunked_and_merged_in_offset_order() {
    let provider = Arc::new(proof_provider());
    let mut config = test_config();
    config.engine.token_limit = 10;
    config.engine.overlap_tokens = 2;
    let engine = engine_with(config, &provider);

    let text = "Teh cat sat. ".repeat(10);
    let result = engine.analyze(&text, "");

    assert_eq!(result.origin, Origin::Model);
    assert!(result.was_chunked);
    assert!(result.chunk_count > 1);
    assert_eq!(provider.calls(), result.chunk_count);

    assert_eq!(result.suggestions.len(), 10);
    let offsets: Vec<usize> = result.suggestions.iter().map(|s| s.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(offsets, sorted);

    for s in &result.suggestions {
        let span: String = text.chars().skip(s.offset).take(s.length).collect();
        assert_eq!(span, "Teh");
        assert_eq!(s.category, Category::Spelling);
    }
}

#[test]
fn failed_chunk_is_skipped() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(|input, _| {
                if input.contains("BOOM") {
                    Err(BackendError::Call("model crashed".to_string()))
                } else {
                    Ok(teh_response(input))
                }
            }),
    );
    let mut config = test_config();
    config.engine.token_limit = 10;
    config.engine.overlap_tokens = 0;
    let engine = engine_with(config, &provider);

    let text = format!(
        "{}BOOM went it. {}",
        "Teh cat sat. ".repeat(3),
        "Teh cat sat. ".repeat(3)
    );
    let result = engine.analyze(&text, "");

    assert_eq!(result.origin, Origin::Model);
    assert!(!result.suggestions.is_empty());
    assert!(result.suggestions.len() < 6);
    assert_eq!(engine.get_stats().fallbacks, 0);
}

#[test]
fn overflowing_offset_in_later_chunk_is_dropped() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(|_, _| {
                Ok(r#"[{"type":"spelling","offset":18446744073709551615,"length":1}]"#.to_string())
            }),
    );
    let mut config = test_config();
    config.engine.token_limit = 10;
    let engine = engine_with(config, &provider);

    let text = "Teh cat sat. ".repeat(10);
    let result = engine.analyze(&text, "");

    assert_eq!(result.origin, Origin::Model);
    assert!(result.chunk_count > 1);
    assert!(result.suggestions.is_empty());
}

#[test]
fn spans_outside_the_chunk_are_dropped() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(|_, _| {
                Ok(r#"[
                    {"type":"spelling","offset":10000,"length":5},
                    {"type":"style","startIndex":4,"endIndex":50},
                    {"type":"spelling","startIndex":0,"endIndex":3,"original":"Teh","replacement":"The"}
                ]"#
                .to_string())
            }),
    );
    let engine = engine_with(test_config(), &provider);

    let result = engine.analyze("Teh end", "");

    assert_eq!(result.origin, Origin::Model);
    assert_eq!(result.source_text_length, 7);
    assert_eq!(result.suggestions.len(), 1);
    assert_eq!(result.suggestions[0].offset, 0);
    assert_eq!(result.suggestions[0].length, 3);
    assert!(result
        .suggestions
        .iter()
        .all(|s| s.offset + s.length <= result.source_text_length));
}

// ============================================================================
// Fallback Routing
// ============================================================================

#[test]
fn rejecting_factory_resolves_through_fallback() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .rejecting_create(),
    );
    let engine = engine_with(test_config(), &provider);

    let result = engine.analyze("Teh quick brown fox", "");

    assert_eq!(result.origin, Origin::Fallback);
    assert_eq!(result.suggestions.len(), 1);
    assert_eq!(result.suggestions[0].offset, 0);
    assert_eq!(result.suggestions[0].length, 3);
    assert_eq!(provider.created(), 0);
    assert_eq!(engine.get_stats().fallbacks, 1);
}

#[test]
fn all_chunks_failing_falls_back() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(|_, _| Err(BackendError::Call("down".to_string()))),
    );
    let engine = engine_with(test_config(), &provider);

    let result = engine.analyze("Teh end", "");

    assert_eq!(provider.calls(), 1);
    assert_eq!(result.origin, Origin::Fallback);
    assert_eq!(result.suggestions[0].original_text, "Teh");
}

#[test]
fn unparseable_response_falls_back() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(|_, _| Ok("Sorry, I cannot help with that.".to_string())),
    );
    let engine = engine_with(test_config(), &provider);

    let result = engine.analyze("Teh end", "");
    assert_eq!(result.origin, Origin::Fallback);
}

#[test]
fn downloadable_capability_is_not_used() {
    let provider = Arc::new(
        ScriptedProvider::new().with_kind(CapabilityKind::Proof, Availability::Downloadable),
    );
    let engine = engine_with(test_config(), &provider);

    let result = engine.analyze("Teh end", "");

    assert_eq!(result.origin, Origin::Fallback);
    assert_eq!(provider.created(), 0);
    assert!(engine.registry().is_available(CapabilityKind::Proof));
    assert!(!engine.registry().is_ready(CapabilityKind::Proof));
}

#[test]
fn exhausted_pool_falls_back() {
    let provider = Arc::new(proof_provider());
    let mut config = test_config();
    config.pool.max_sessions_per_kind = 1;
    config.pool.acquire_timeout_ms = 50;
    let engine = engine_with(config, &provider);

    let held = engine
        .pool()
        .acquire(CapabilityKind::Proof, &SessionOptions::default())
        .unwrap()
        .unwrap();

    let started = Instant::now();
    let result = engine.analyze("Teh end", "");
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(result.origin, Origin::Fallback);
    assert_eq!(provider.calls(), 0);

    drop(held);
    let result = engine.analyze("Teh end", "");
    assert_eq!(result.origin, Origin::Model);
    assert_eq!(provider.created(), 1);
}

// ============================================================================
// Feature Flags
// ============================================================================

#[test]
fn disabled_grammar_flag_skips_the_model() {
    let provider = Arc::new(proof_provider());
    let mut config = test_config();
    config.features.grammar = false;
    let engine = engine_with(config, &provider);

    let result = engine.analyze("Teh end", "");

    assert_eq!(result.origin, Origin::Fallback);
    assert_eq!(provider.create_attempts(), 0);
}

#[test]
fn master_flag_disables_every_surface() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .with_kind(CapabilityKind::Prompt, Availability::Available),
    );
    let mut config = test_config();
    config.features.enabled = false;
    let engine = engine_with(config, &provider);

    assert_eq!(engine.analyze("Teh end", "").origin, Origin::Fallback);
    assert_eq!(engine.analyze_error("Permission denied", "").origin, Origin::Fallback);
    assert_eq!(engine.analyze_tone("Thanks!", "").label, "neutral");
    assert_eq!(provider.calls(), 0);
}

// ============================================================================
// Capability Selection
// ============================================================================

#[test]
fn grammar_uses_prompt_when_proof_is_missing() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Prompt, Availability::Available)
            .responding(|_, _| {
                Ok(r#"{"suggestions":[{"category":"spelling","offset":0,"length":3,"original":"Teh","replacement":"The"}]}"#.to_string())
            }),
    );
    let engine = engine_with(test_config(), &provider);

    let result = engine.analyze("Teh end", "release notes");

    assert_eq!(result.origin, Origin::Model);
    assert_eq!(result.suggestions[0].offset, 0);
    assert_eq!(result.suggestions[0].replacement_text, "The");
    let prompt = &provider.inputs()[0];
    assert!(prompt.contains("<text>\nTeh end\n</text>"));
    assert!(prompt.contains("release notes"));
}

#[test]
fn error_analysis_uses_prompt_capability() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .with_kind(CapabilityKind::Prompt, Availability::Available)
            .responding(|_, _| {
                Ok("```json\n[{\"type\":\"error\",\"offset\":7,\"length\":9,\"message\":\"Timed out\",\"explanation\":\"Raise the timeout\"}]\n```".to_string())
            }),
    );
    let engine = engine_with(test_config(), &provider);

    let result = engine.analyze_error("fetch: timed out", "");

    assert_eq!(result.origin, Origin::Model);
    let s = &result.suggestions[0];
    assert_eq!(s.category, Category::Error);
    assert_eq!(s.severity, Severity::Error);
    assert_eq!(s.context_before, "fetch: ");
    assert_eq!(s.context_after, "");
    assert!(provider.inputs()[0].contains("<log>"));
}

#[test]
fn probe_failure_downgrades_only_that_kind() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Prompt, Availability::Available)
            .failing_probe(CapabilityKind::Proof),
    );
    let engine = engine_with(test_config(), &provider);

    let snapshot = engine.capabilities();
    assert!(snapshot.contains(&(CapabilityKind::Proof, Availability::Unavailable)));
    assert!(snapshot.contains(&(CapabilityKind::Prompt, Availability::Available)));
    assert_eq!(engine.analyze("fine", "").origin, Origin::Model);
}

#[test]
fn capabilities_are_probed_once() {
    let provider = Arc::new(ScriptedProvider::new());
    let engine = engine_with(test_config(), &provider);

    engine.capabilities();
    engine.capabilities();
    engine.analyze("fine", "");

    assert_eq!(provider.probes(), CapabilityKind::ALL.len());
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn model_results_are_cached() {
    let provider = Arc::new(proof_provider());
    let engine = engine_with(test_config(), &provider);

    let first = engine.analyze("Teh end", "");
    let second = engine.analyze("Teh end", "");

    assert!(!first.cached);
    assert!(second.cached);
    assert!(second.cached_at.is_some());
    assert_eq!(second.suggestions, first.suggestions);
    assert_eq!(provider.calls(), 1);

    let stats = engine.get_stats();
    assert_eq!(stats.checks_performed, 2);
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.issues_found, 2);
}

#[test]
fn cache_key_covers_context_and_mode() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .with_kind(CapabilityKind::Prompt, Availability::Available),
    );
    let engine = engine_with(test_config(), &provider);

    engine.analyze("same text", "email");
    engine.analyze("same text", "chat");
    engine.analyze_error("same text", "chat");

    assert_eq!(provider.calls(), 3);
    assert_eq!(engine.get_stats().cache_hits, 0);
}

#[test]
fn clear_cache_forces_a_new_call() {
    let provider = Arc::new(proof_provider());
    let engine = engine_with(test_config(), &provider);

    engine.analyze("Teh end", "");
    engine.clear_cache();
    let again = engine.analyze("Teh end", "");

    assert!(!again.cached);
    assert_eq!(provider.calls(), 2);
}

// ============================================================================
// Tone
// ============================================================================

#[test]
fn tone_report_from_model_is_clamped_and_lowercased() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Prompt, Availability::Available)
            .responding(|_, _| {
                Ok("Here you go:\n```json\n{\"empathyScore\": 140, \"tone\": \"Warm\", \"issues\": [], \"suggestions\": [\"Keep it\"]}\n```".to_string())
            }),
    );
    let engine = engine_with(test_config(), &provider);

    let report = engine.analyze_tone("Thanks so much for waiting!", "support reply");

    assert_eq!(report.origin, Origin::Model);
    assert_eq!(report.score, 100.0);
    assert_eq!(report.label, "warm");
    assert_eq!(report.suggestions, vec!["Keep it".to_string()]);
    assert!(provider.inputs()[0].contains("<message>"));
}

#[test]
fn unparseable_tone_is_neutral() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Prompt, Availability::Available)
            .responding(|_, _| Ok("it sounds fine".to_string())),
    );
    let engine = engine_with(test_config(), &provider);

    let report = engine.analyze_tone("ok", "");

    assert_eq!(report.origin, Origin::Fallback);
    assert_eq!(report.score, 50.0);
    assert_eq!(report.label, "neutral");
    assert_eq!(engine.get_stats().fallbacks, 1);
}

// ============================================================================
// Pool Pressure
// ============================================================================

#[test]
fn parallel_chunks_respect_pool_cap() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(|input, _| {
                thread::sleep(Duration::from_millis(5));
                Ok(teh_response(input))
            }),
    );
    let mut config = test_config();
    config.engine.token_limit = 10;
    config.engine.overlap_tokens = 0;
    config.pool.max_sessions_per_kind = 2;
    config.pool.acquire_timeout_ms = 2000;
    let engine = engine_with(config, &provider);

    let result = engine.analyze(&"Teh cat sat. ".repeat(30), "");

    assert_eq!(result.origin, Origin::Model);
    assert_eq!(result.suggestions.len(), 30);
    assert!(provider.max_live() <= 2);
}

#[test]
fn shutdown_destroys_every_session() {
    let provider = Arc::new(proof_provider());
    let engine = engine_with(test_config(), &provider);

    engine.analyze("Teh end", "");
    assert_eq!(provider.created(), 1);
    assert_eq!(provider.destroyed(), 0);

    engine.shutdown();
    assert_eq!(provider.destroyed(), 1);
    assert_eq!(engine.pool().stats(CapabilityKind::Proof).live, 0);
}

// ============================================================================
// Priority Queue
// ============================================================================

#[test]
fn queue_drains_by_priority() {
    let gate = Arc::new((Mutex::new(false), Condvar::new()));
    let responder_gate = Arc::clone(&gate);
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(move |input, _| {
                if input == "first" {
                    let (open, cvar) = &*responder_gate;
                    let mut open = open.lock().unwrap();
                    while !*open {
                        open = cvar.wait(open).unwrap();
                    }
                }
                Ok("[]".to_string())
            }),
    );
    let engine = Arc::new(engine_with(test_config(), &provider));

    let first = engine.queue_check("first", "", Priority::Normal);
    let deadline = Instant::now() + Duration::from_secs(5);
    while provider.calls() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    let low = engine.queue_check("low", "", Priority::Low);
    let normal = engine.queue_check("normal", "", Priority::Normal);
    let high = engine.queue_check("high", "", Priority::High);

    {
        let (open, cvar) = &*gate;
        *open.lock().unwrap() = true;
        cvar.notify_all();
    }

    for pending in [first, low, normal, high] {
        assert_eq!(pending.wait().unwrap().origin, Origin::Model);
    }
    assert_eq!(provider.inputs(), vec!["first", "high", "normal", "low"]);
}

#[test]
fn queue_keeps_draining_after_a_panicking_check() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .with_kind(CapabilityKind::Proof, Availability::Available)
            .responding(|input, _| {
                if input.contains("crash") {
                    panic!("session crashed");
                }
                Ok(teh_response(input))
            }),
    );
    let engine = Arc::new(engine_with(test_config(), &provider));

    let crashing = engine.queue_check("Teh crash", "", Priority::Normal);
    let fine = engine.queue_check("Teh fine", "", Priority::Normal);

    let timeout = Duration::from_secs(5);
    let crashed = crashing
        .wait_timeout(timeout)
        .ok()
        .flatten()
        .expect("panicking check should still be answered");
    assert_eq!(crashed.origin, Origin::Fallback);
    assert_eq!(crashed.suggestions[0].original_text, "Teh");

    let served = fine
        .wait_timeout(timeout)
        .ok()
        .flatten()
        .expect("later check should be served");
    assert_eq!(served.origin, Origin::Model);
    assert_eq!(served.suggestions.len(), 1);
    assert_eq!(engine.get_stats().fallbacks, 1);
}
