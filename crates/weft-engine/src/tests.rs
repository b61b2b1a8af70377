//! Unit tests for weft-engine.
//!
//! The engine is pure with respect to I/O: every externally visible action
//! is an instruction on the host stream, so every scenario can be tested
//! by scripting routines and replies and asserting on the stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use serde_json::json;

use crate::engine::{DispatchMode, Engine, EngineError, Signal, TERMINAL_MESSAGE};
use crate::instruction::Instruction;
use crate::routine::{RoutineRegistry, Step};
use crate::script::{jump_to, routine_fn, script};
use weft_graph::Machine;

// ============================================================================
// Test Helpers
// ============================================================================

fn linear_machine() -> Machine {
    Machine::from_dot("digraph { __start__ -> ask; ask -> done; done -> __end__; }")
        .expect("machine should parse")
}

/// Runs the engine to termination, answering `request_input` deliveries
/// from `replies` in order; returns every delivered instruction.
///
/// Panics if the engine delivers an engine-internal instruction (it
/// never does).
fn drain(engine: &mut Engine, replies: &[&str]) -> Vec<Instruction> {
    let mut delivered = Vec::new();
    let mut replies = replies.iter();
    loop {
        match engine.next().expect("engine protocol upheld") {
            Signal::Instruction(instruction) => {
                assert!(
                    instruction.is_host_directed(),
                    "engine delivered internal instruction: {instruction:?}"
                );
                let wants_reply = instruction.expects_reply();
                delivered.push(instruction);
                if wants_reply {
                    let value = replies.next().expect("scenario ran out of replies");
                    engine.reply(*value).expect("reply should be accepted");
                }
            }
            Signal::Terminated => return delivered,
        }
    }
}

fn terminal_notify() -> Instruction {
    Instruction::notify_level("info", TERMINAL_MESSAGE)
}

/// Registry for the linear machine: `__start__` and `done` just hop on.
fn linear_registry() -> RoutineRegistry {
    RoutineRegistry::new()
        .register("__start__", |_| Box::new(jump_to("ask")))
        .register("done", |_| Box::new(jump_to("__end__")))
}

// ============================================================================
// Linear flow with user input
// ============================================================================

#[test]
fn linear_flow_with_user_input() {
    let registry = linear_registry().register("ask", |_| {
        let mut step = 0;
        let mut name = String::new();
        Box::new(routine_fn(move |reply| {
            step += 1;
            Ok(match step {
                1 => Step::Yield(Instruction::request_input("name?")),
                2 => {
                    name = reply.unwrap_or_default();
                    Step::Yield(Instruction::notify_level("info", format!("Hello {name}")))
                }
                3 => Step::Yield(Instruction::transition("done")),
                _ => Step::Done,
            })
        }))
    });

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    let delivered = drain(&mut engine, &["Ada"]);

    assert_eq!(
        delivered,
        vec![
            Instruction::request_input("name?"),
            Instruction::notify_level("info", "Hello Ada"),
            terminal_notify(),
        ]
    );
    assert!(engine.is_terminated());
    assert_eq!(engine.depth(), 0);
}

// ============================================================================
// Self-loop on bad input
// ============================================================================

#[test]
fn self_loop_retries_with_fresh_routine() {
    let machine = Machine::from_dot(
        "digraph { __start__ -> ask; ask -> ask; ask -> done; done -> __end__; }",
    )
    .expect("machine should parse");

    let instantiations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&instantiations);

    let registry = linear_registry().register("ask", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        let mut step = 0;
        Box::new(routine_fn(move |reply| {
            step += 1;
            Ok(match (step, reply.as_deref()) {
                (1, _) => Step::Yield(Instruction::request_input("value?")),
                (2, Some("")) => Step::Yield(Instruction::warning("empty")),
                (2, Some(_)) => Step::Yield(Instruction::transition("done")),
                (3, _) => Step::Yield(Instruction::transition("ask")),
                _ => Step::Done,
            })
        }))
    });

    let mut engine = Engine::new(machine, registry).expect("engine should build");
    let delivered = drain(&mut engine, &["", "x"]);

    assert_eq!(
        delivered,
        vec![
            Instruction::request_input("value?"),
            Instruction::warning("empty"),
            Instruction::request_input("value?"),
            terminal_notify(),
        ]
    );

    // Re-entering `ask` created a fresh routine instance.
    assert_eq!(instantiations.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Sub-machine composition
// ============================================================================

#[test]
fn sub_machine_composition() {
    let inner = Machine::builder()
        .transition("__start__", "opt1")
        .transition("opt1", "__end__")
        .build()
        .expect("inner machine should build");

    let outer = Machine::builder()
        .transition("__start__", "options")
        .sub_machine("options", inner)
        .transition("options", "__end__")
        .build()
        .expect("outer machine should build");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(jump_to("options")))
        .register("options/__start__", |_| Box::new(jump_to("opt1")))
        .register("opt1", |_| {
            Box::new(script([Instruction::custom("opt1_done", json!({}))]))
        });

    let mut engine = Engine::new(outer, registry).expect("engine should build");

    let mut delivered = Vec::new();
    let mut max_depth = 0;
    loop {
        match engine.next().expect("engine protocol upheld") {
            Signal::Instruction(instruction) => {
                max_depth = max_depth.max(engine.depth());
                delivered.push(instruction);
            }
            Signal::Terminated => break,
        }
    }

    assert_eq!(
        delivered,
        vec![
            Instruction::custom("opt1_done", json!({})),
            terminal_notify(),
        ]
    );
    assert_eq!(max_depth, 2, "the sub-machine ran at depth 2");
    assert_eq!(engine.depth(), 0);
}

#[test]
fn sub_machine_start_receives_the_carry() {
    let inner = Machine::builder()
        .transition("__start__", "__end__")
        .build()
        .expect("inner machine should build");

    let outer = Machine::builder()
        .transition("__start__", "options")
        .sub_machine("options", inner)
        .transition("options", "__end__")
        .build()
        .expect("outer machine should build");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| {
            Box::new(script([Instruction::transition_with(
                "options",
                json!({"user": "Ada"}),
            )]))
        })
        .register("options/__start__", |input| {
            let carried = input.payload.clone();
            let mut emitted = false;
            Box::new(routine_fn(move |_| {
                if emitted {
                    return Ok(Step::Done);
                }
                emitted = true;
                Ok(Step::Yield(Instruction::custom(
                    "saw_payload",
                    carried.clone().unwrap_or(json!(null)),
                )))
            }))
        });

    let mut engine = Engine::new(outer, registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered[0], Instruction::custom("saw_payload", json!({"user": "Ada"})));
}

// ============================================================================
// Parent transition from child
// ============================================================================

#[test]
fn parent_transition_redirects_the_parent() {
    let inner = Machine::builder()
        .transition("__start__", "__end__")
        .build()
        .expect("inner machine should build");

    let outer = Machine::builder()
        .transition("__start__", "sub")
        .sub_machine("sub", inner)
        .transition("sub", "other")
        .transition("other", "__end__")
        .build()
        .expect("outer machine should build");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(jump_to("sub")))
        .register("sub/__start__", |_| {
            Box::new(script([
                Instruction::notify("inside child"),
                Instruction::parent_transition("other"),
                // Never delivered: the routine is discarded at the
                // parent transition.
                Instruction::notify("unreachable"),
            ]))
        })
        .register("other", |_| {
            Box::new(script([
                Instruction::notify("parent resumed"),
                Instruction::transition("__end__"),
            ]))
        });

    let mut engine = Engine::new(outer, registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(
        delivered,
        vec![
            Instruction::notify("inside child"),
            Instruction::notify("parent resumed"),
            terminal_notify(),
        ]
    );
}

#[test]
fn parent_transition_can_carry_a_payload() {
    let inner = Machine::builder()
        .transition("__start__", "__end__")
        .build()
        .expect("inner machine should build");

    let outer = Machine::builder()
        .transition("__start__", "sub")
        .sub_machine("sub", inner)
        .transition("sub", "other")
        .transition("other", "__end__")
        .build()
        .expect("outer machine should build");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(jump_to("sub")))
        .register("sub/__start__", |_| {
            Box::new(script([Instruction::parent_transition_with(
                "other",
                json!({"result": 42}),
            )]))
        })
        .register("other", |input| {
            assert_eq!(input.payload, Some(json!({"result": 42})));
            Box::new(script([Instruction::transition("__end__")]))
        });

    let mut engine = Engine::new(outer, registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);
    assert_eq!(delivered, vec![terminal_notify()]);
}

#[test]
fn top_level_parent_transition_halts_without_terminal_notify() {
    let machine = Machine::builder()
        .transition("__start__", "__end__")
        .build()
        .expect("machine should build");

    let registry = RoutineRegistry::new().register("__start__", |_| {
        Box::new(script([Instruction::parent_transition("anywhere")]))
    });

    let mut engine = Engine::new(machine, registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert!(delivered.is_empty());
    assert_eq!(engine.depth(), 0);
}

// ============================================================================
// Graph-driven dispatch
// ============================================================================

#[test]
fn graph_driven_ambiguity_is_an_error() {
    let machine = Machine::from_dot(
        r#"
        digraph {
            __start__ -> q;
            q -> a [label="Y"];
            q -> b [label="N"];
            a -> __end__;
            b -> __end__;
        }
        "#,
    )
    .expect("machine should parse");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(script([Instruction::unlabeled()])))
        .register("q", |_| Box::new(script([Instruction::unlabeled()])))
        .register("a", |_| Box::new(script([])))
        .register("b", |_| Box::new(script([])));

    let mut engine =
        Engine::with_mode(machine, registry, DispatchMode::GraphDriven).expect("engine builds");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered.len(), 1);
    match &delivered[0] {
        Instruction::Error { message, .. } => {
            assert!(message.contains("'q'"), "error should reference q: {message}");
        }
        other => panic!("expected error instruction, got {other:?}"),
    }
}

#[test]
fn graph_driven_label_takes_first_match() {
    let machine = Machine::from_dot(
        r#"
        digraph {
            __start__ -> q;
            q -> a [label="Y"];
            q -> b [label="Y"];
            a -> __end__;
            b -> __end__;
        }
        "#,
    )
    .expect("machine should parse");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(script([Instruction::unlabeled()])))
        .register("q", |_| Box::new(script([Instruction::labeled(" Y ")])))
        .register("a", |_| {
            Box::new(script([
                Instruction::notify("went a"),
                Instruction::labeled(""),
            ]))
        })
        .register("b", |_| {
            Box::new(script([
                Instruction::notify("went b"),
                Instruction::labeled(""),
            ]))
        });

    let mut engine =
        Engine::with_mode(machine, registry, DispatchMode::GraphDriven).expect("engine builds");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(
        delivered,
        vec![Instruction::notify("went a"), terminal_notify()]
    );
}

#[test]
fn graph_driven_unmatched_label_is_an_error() {
    let machine = Machine::from_dot(
        r#"digraph { __start__ -> q; q -> a [label="Y"]; a -> __end__; }"#,
    )
    .expect("machine should parse");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(script([Instruction::unlabeled()])))
        .register("q", |_| Box::new(script([Instruction::labeled("Z")])))
        .register("a", |_| Box::new(script([])));

    let mut engine =
        Engine::with_mode(machine, registry, DispatchMode::GraphDriven).expect("engine builds");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered.len(), 1);
    assert!(matches!(&delivered[0], Instruction::Error { message, .. }
        if message.contains("'q'") && message.contains('Z')));
}

#[test]
fn label_only_transition_outside_graph_mode_is_an_error() {
    let registry = linear_registry()
        .register("ask", |_| Box::new(script([Instruction::labeled("OK")])));

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered.len(), 1);
    assert!(matches!(&delivered[0], Instruction::Error { message, .. }
        if message.contains("without a target")));
}

// ============================================================================
// Routine failures
// ============================================================================

#[test]
fn routine_failure_reports_error_and_halts() {
    let machine = Machine::from_dot("digraph { __start__ -> boom; boom -> __end__; }")
        .expect("machine should parse");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(jump_to("boom")))
        .register("boom", |_| {
            let mut step = 0;
            Box::new(routine_fn(move |_| {
                step += 1;
                if step == 1 {
                    Ok(Step::Yield(Instruction::notify("about to fail")))
                } else {
                    Err(anyhow!("disk on fire"))
                }
            }))
        });

    let mut engine = Engine::new(machine, registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered.len(), 2, "notify then error, no terminal notify");
    assert_eq!(delivered[0], Instruction::notify("about to fail"));
    match &delivered[1] {
        Instruction::Error { message, payload } => {
            assert!(message.contains("'boom'"));
            assert!(message.contains("disk on fire"));
            assert_eq!(payload.as_ref().and_then(|p| p.get("state")), Some(&json!("boom")));
        }
        other => panic!("expected error instruction, got {other:?}"),
    }
    assert!(engine.is_terminated());
}

#[test]
fn child_failure_pops_only_the_child() {
    let inner = Machine::builder()
        .transition("__start__", "__end__")
        .build()
        .expect("inner machine should build");

    let outer = Machine::builder()
        .transition("__start__", "sub")
        .sub_machine("sub", inner)
        .transition("sub", "__end__")
        .build()
        .expect("outer machine should build");

    let registry = RoutineRegistry::new()
        .register("__start__", |_| Box::new(jump_to("sub")))
        .register("sub/__start__", |_| {
            Box::new(routine_fn(|_| Err(anyhow!("child exploded"))))
        });

    let mut engine = Engine::new(outer, registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    // The error pops the child; the parent's sub-machine state is then
    // complete and the parent runs to its own end, so the run still
    // finishes with the terminal notify.
    assert_eq!(delivered.len(), 2);
    assert!(matches!(&delivered[0], Instruction::Error { message, .. }
        if message.contains("child exploded")));
    assert_eq!(delivered[1], terminal_notify());
}

// ============================================================================
// Boundary behaviors
// ============================================================================

#[test]
fn returning_without_yield_is_transition_to_end() {
    let registry = linear_registry()
        .register("ask", |_| Box::new(script([])));

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered, vec![terminal_notify()]);
}

#[test]
fn carry_into_end_is_discarded() {
    let registry = linear_registry().register("ask", |_| {
        Box::new(script([Instruction::transition_with(
            "__end__",
            json!({"ignored": true}),
        )]))
    });

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered, vec![terminal_notify()]);
}

#[test]
fn carry_payload_reaches_the_target_routine() {
    let registry = RoutineRegistry::new()
        .register("__start__", |_| {
            Box::new(script([Instruction::transition_with(
                "ask",
                json!({"user": "Ada"}),
            )]))
        })
        .register("ask", |input| {
            assert_eq!(input.payload, Some(json!({"user": "Ada"})));
            Box::new(script([Instruction::transition("done")]))
        })
        .register("done", |input| {
            // The carry is cleared after one hop; `done` gets nothing.
            assert_eq!(input.payload, None);
            Box::new(script([Instruction::transition("__end__")]))
        });

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    drain(&mut engine, &[]);
}

#[test]
fn invalid_transition_target_is_reported_and_halts() {
    let registry = linear_registry()
        .register("ask", |_| Box::new(script([Instruction::transition("elsewhere")])));

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(delivered.len(), 1);
    assert!(matches!(&delivered[0], Instruction::Error { message, .. }
        if message.contains("'ask'") && message.contains("'elsewhere'")));
    assert_eq!(engine.depth(), 0);
}

#[test]
fn instructions_after_a_transition_are_never_delivered() {
    let registry = linear_registry().register("ask", |_| {
        Box::new(script([
            Instruction::notify("before"),
            Instruction::transition("done"),
            Instruction::notify("after"),
        ]))
    });

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    let delivered = drain(&mut engine, &[]);

    assert_eq!(
        delivered,
        vec![Instruction::notify("before"), terminal_notify()]
    );
}

// ============================================================================
// Protocol violations
// ============================================================================

#[test]
fn reply_without_request_is_a_protocol_violation() {
    let mut engine =
        Engine::new(linear_machine(), full_noop_registry()).expect("engine should build");
    assert!(matches!(
        engine.reply("hello"),
        Err(EngineError::UnsolicitedReply)
    ));
}

#[test]
fn next_with_unanswered_request_is_a_protocol_violation() {
    let registry = linear_registry().register("ask", |_| {
        Box::new(script([
            Instruction::request_input("value?"),
            Instruction::transition("done"),
        ]))
    });

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    let first = engine.next().expect("first advance succeeds");
    assert!(matches!(
        first,
        Signal::Instruction(Instruction::RequestInput { .. })
    ));

    assert!(matches!(engine.next(), Err(EngineError::PendingInput)));

    // The engine recovers once the reply arrives.
    engine.reply("ok").expect("reply accepted");
    let delivered = drain(&mut engine, &[]);
    assert_eq!(delivered, vec![terminal_notify()]);
}

#[test]
fn double_reply_is_a_protocol_violation() {
    let registry = linear_registry().register("ask", |_| {
        Box::new(script([
            Instruction::request_input("value?"),
            Instruction::transition("done"),
        ]))
    });

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    engine.next().expect("request delivered");
    engine.reply("one").expect("first reply accepted");
    assert!(matches!(
        engine.reply("two"),
        Err(EngineError::UnsolicitedReply)
    ));
}

#[test]
fn unregistered_routine_fails_at_construction() {
    let result = Engine::new(linear_machine(), linear_registry());
    match result {
        Err(EngineError::UnregisteredRoutine { state }) => assert_eq!(state, "ask"),
        other => panic!("expected construction failure, got {other:?}"),
    }
}

#[test]
fn unregistered_sub_machine_routine_names_its_path() {
    let inner = Machine::builder()
        .transition("__start__", "opt1")
        .transition("opt1", "__end__")
        .build()
        .expect("inner machine should build");

    let outer = Machine::builder()
        .transition("__start__", "options")
        .sub_machine("options", inner)
        .transition("options", "__end__")
        .build()
        .expect("outer machine should build");

    // `__start__` registered bare covers the child's `__start__` through
    // the fallback; only the child-local `opt1` is missing.
    let registry = RoutineRegistry::new().register("__start__", |_| Box::new(jump_to("options")));

    match Engine::new(outer, registry) {
        Err(EngineError::UnregisteredRoutine { state }) => {
            assert_eq!(state, "options/opt1");
        }
        other => panic!("expected construction failure, got {other:?}"),
    }
}

#[test]
fn termination_is_idempotent() {
    let registry = linear_registry().register("ask", |_| Box::new(jump_to("done")));

    let mut engine = Engine::new(linear_machine(), registry).expect("engine should build");
    drain(&mut engine, &[]);

    assert!(engine.is_terminated());
    assert!(matches!(engine.next(), Ok(Signal::Terminated)));
    assert!(matches!(engine.next(), Ok(Signal::Terminated)));
    assert!(matches!(
        engine.reply("late"),
        Err(EngineError::UnsolicitedReply)
    ));
}

// ============================================================================
// Instruction wire format
// ============================================================================

#[test]
fn instructions_serialize_with_the_wire_field_names() {
    let json = serde_json::to_value(Instruction::transition_with("done", json!({"n": 1})))
        .expect("serializes");
    assert_eq!(
        json,
        json!({"instruction": "transition", "next_state": "done", "payload": {"n": 1}})
    );

    let json = serde_json::to_value(Instruction::request_input("name?")).expect("serializes");
    assert_eq!(json, json!({"instruction": "request_input", "query": "name?"}));

    let json = serde_json::to_value(Instruction::parent_transition("other")).expect("serializes");
    assert_eq!(
        json,
        json!({"instruction": "parent_transition", "next_state_for_parent": "other"})
    );
}

#[test]
fn unknown_fields_are_tolerated_on_decode() {
    let decoded: Instruction = serde_json::from_value(json!({
        "instruction": "notify",
        "message": "hi",
        "level": "info",
        "added_in_a_future_version": true,
    }))
    .expect("unknown fields are ignored");
    assert_eq!(decoded, Instruction::notify_level("info", "hi"));
}

#[test]
fn instruction_classification_is_exhaustive() {
    assert!(Instruction::transition("x").is_engine_internal());
    assert!(Instruction::parent_transition("x").is_engine_internal());
    for instruction in [
        Instruction::request_input("q"),
        Instruction::notify("m"),
        Instruction::warning("m"),
        Instruction::error("m"),
        Instruction::debug("lvl", "m"),
        Instruction::custom("n", json!({})),
    ] {
        assert!(instruction.is_host_directed());
    }
    assert!(Instruction::request_input("q").expects_reply());
    assert!(!Instruction::notify("m").expects_reply());
}

// ============================================================================
// Helpers used by protocol tests
// ============================================================================

/// Registry covering all three routine states of the linear machine with
/// immediate hops.
fn full_noop_registry() -> RoutineRegistry {
    linear_registry().register("ask", |_| Box::new(jump_to("done")))
}
