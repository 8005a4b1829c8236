use std::collections::BTreeSet;

use corpus_noise::metrics::noise_type_distribution;
use corpus_noise::{
    DatasetDescriptor, EngineConfig, FieldValue, LabelMode, NoiseEngine, NoiseError,
    NoiseRequest, NoiseStrategy, NoiseType, Record, StrataKey, select_targets,
};

fn default_engine(descriptor: DatasetDescriptor) -> NoiseEngine {
    NoiseEngine::new(descriptor, EngineConfig::default()).unwrap()
}

#[test]
fn ten_records_in_one_stratum_select_exactly_two() {
    let records: Vec<Record> = (0..10)
        .map(|idx| Record::from_fields([("text", format!("sample number {idx}"))]))
        .collect();
    let first = select_targets(&records, 0.2, |_| String::new(), 42).unwrap();
    let second = select_targets(&records, 0.2, |_| String::new(), 42).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first.targets, second.targets);

    let descriptor = DatasetDescriptor::new(
        "plain",
        vec!["text".into()],
        Vec::new(),
        None,
        StrataKey::Single,
    )
    .unwrap();
    let request = NoiseRequest {
        noise_ratio: 0.2,
        seed: 42,
        ..NoiseRequest::default()
    };
    let run = default_engine(descriptor.clone())
        .run(&records, &request)
        .unwrap();
    let rerun = default_engine(descriptor).run(&records, &request).unwrap();
    assert_eq!(
        run.targeted_indices().into_iter().collect::<BTreeSet<_>>(),
        first.targets
    );
    assert_eq!(run.targeted_indices(), rerun.targeted_indices());
}

#[test]
fn flip_turns_positive_into_negative() {
    let records: Vec<Record> =
        vec![serde_json::from_str(r#"{"sentence": "ok", "label": 1}"#).unwrap()];
    let run = default_engine(DatasetDescriptor::sst2())
        .run(
            &records,
            &NoiseRequest {
                noise_ratio: 1.0,
                label_mode: LabelMode::Flip,
                ..NoiseRequest::default()
            },
        )
        .unwrap();
    assert_eq!(
        serde_json::to_string(&run.records[0]).unwrap(),
        r#"{"sentence":"ok","label":0}"#
    );
    assert_eq!(run.changes[0].noise_type_applied, NoiseType::LabelFlip);
    assert_eq!(
        run.changes[0].fields_changed,
        BTreeSet::from(["label".to_string()])
    );
}

#[test]
fn one_word_question_changes_while_answer_is_preserved() {
    let records: Vec<Record> =
        vec![serde_json::from_str(r#"{"question": "x", "answer": "42"}"#).unwrap()];
    let grammar_only = NoiseStrategy::new("grammar_only", [1.0, 0.0, 0.0]).unwrap();
    for seed in 0..20 {
        let run = default_engine(DatasetDescriptor::gsm8k())
            .run(
                &records,
                &NoiseRequest {
                    noise_ratio: 1.0,
                    strategy: Some(grammar_only.clone()),
                    label_mode: LabelMode::Preserve,
                    seed,
                },
            )
            .unwrap();
        let out = &run.records[0];
        assert_eq!(out.text("answer"), Some("42"));
        assert_ne!(out.text("question"), Some("x"));
        assert_eq!(run.metadata.escalated_count, 1);
    }
}

#[test]
fn empty_text_is_counted_as_unchangeable() {
    let records = vec![Record::from_fields([
        ("sentence", FieldValue::from("")),
        ("label", FieldValue::Integer(1)),
    ])];
    let run = default_engine(DatasetDescriptor::sst2())
        .run(
            &records,
            &NoiseRequest {
                noise_ratio: 1.0,
                ..NoiseRequest::default()
            },
        )
        .unwrap();
    let change = &run.changes[0];
    assert!(change.was_targeted);
    assert!(change.fields_changed.is_empty());
    assert_eq!(change.noise_type_applied, NoiseType::None);
    assert_eq!(run.metadata.unchangeable_count, 1);
    assert_eq!(run.metadata.escalated_count, 0);
    assert_eq!(run.records, records);
}

#[test]
fn grammar_heavy_distribution_tracks_weights() {
    let records: Vec<Record> = (0..1000)
        .map(|idx| {
            Record::from_fields([
                (
                    "instruction",
                    format!("Write a short note about topic {idx} for the team."),
                ),
                ("input", String::new()),
                (
                    "output",
                    format!("Topic {idx} is scheduled for review next week."),
                ),
            ])
        })
        .collect();
    let run = default_engine(DatasetDescriptor::alpaca())
        .run(
            &records,
            &NoiseRequest {
                noise_ratio: 1.0,
                strategy: Some(NoiseStrategy::grammar_heavy()),
                ..NoiseRequest::default()
            },
        )
        .unwrap();
    let distribution = noise_type_distribution(&run.metadata.noise_type_counts).unwrap();
    assert_eq!(distribution.total, 1000);
    // Four binomial standard deviations at n = 1000.
    for (noise_type, expected) in [
        (NoiseType::Grammar, 0.60),
        (NoiseType::Semantic, 0.25),
        (NoiseType::Quality, 0.15),
    ] {
        let realized = distribution.share_of(noise_type);
        assert!(
            (realized - expected).abs() < 0.065,
            "{noise_type}: realized {realized}, expected {expected}"
        );
    }
}

#[test]
fn configuration_errors_are_raised_up_front() {
    let records = vec![Record::from_fields([
        ("question", FieldValue::from("q")),
        ("answer", FieldValue::from("1")),
    ])];
    let engine = default_engine(DatasetDescriptor::gsm8k());

    let flip_unsupported = NoiseRequest {
        label_mode: LabelMode::Flip,
        ..NoiseRequest::default()
    };
    assert!(
        engine
            .run(&records, &flip_unsupported)
            .unwrap_err()
            .is_configuration()
    );

    let bad_ratio = NoiseRequest {
        noise_ratio: 0.0,
        ..NoiseRequest::default()
    };
    assert!(
        engine
            .run(&records, &bad_ratio)
            .unwrap_err()
            .is_configuration()
    );

    let bad_strategy = NoiseRequest {
        strategy: Some(NoiseStrategy {
            name: "lopsided".into(),
            grammar: 0.5,
            semantic: 0.5,
            quality: 0.5,
        }),
        ..NoiseRequest::default()
    };
    assert!(
        engine
            .run(&records, &bad_strategy)
            .unwrap_err()
            .is_configuration()
    );

    let zero_attempts = NoiseEngine::new(
        DatasetDescriptor::gsm8k(),
        EngineConfig {
            max_attempts: 0,
            parallel: false,
        },
    );
    assert!(matches!(zero_attempts, Err(NoiseError::Configuration(_))));
}
