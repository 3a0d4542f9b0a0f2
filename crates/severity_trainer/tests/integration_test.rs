//! Integration tests for the severity trainer
//!
//! Ensures identical models are produced across runs and that the written
//! artifact is what the evaluator and the service load back.

use anyhow::Result;
use disaster_severity_core::gbdt::hash_path;
use disaster_severity_core::Model;
use disaster_severity_trainer::{
    evaluate_file, train_model_from_json, Dataset, GbdtTrainer, TrainingParams,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Nested export with `n` records spread over the urgency and population range
fn create_synthetic_dataset(n: usize) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    let records: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"id":{i},"urgency":{},"affected_population":{},"location":"zone-{}",
                   "resource_availability":{{"donation_amount":{},"num_ngos":{},"num_volunteers":{}}}}}"#,
                i % 10 + 1,
                (i * 7919) % 20000,
                i % 4,
                (i * 131) % 5000,
                i % 7,
                (i * 17) % 150
            )
        })
        .collect();
    write!(file, "[{}]", records.join(","))?;
    file.flush()?;
    Ok(file)
}

fn quick_params() -> TrainingParams {
    TrainingParams {
        num_rounds: 40,
        learning_rate: 0.2,
        num_leaves: 8,
        min_data_in_leaf: 5,
        early_stopping_rounds: 10,
        ..TrainingParams::default()
    }
}

#[test]
fn test_deterministic_training() -> Result<()> {
    let file = create_synthetic_dataset(200)?;

    let (model1, report1) = train_model_from_json(file.path(), quick_params(), 0.2)?;
    let (model2, report2) = train_model_from_json(file.path(), quick_params(), 0.2)?;

    assert_eq!(model1.hash_hex()?, model2.hash_hex()?, "Model hashes should be identical");
    assert_eq!(report1.best_iteration, report2.best_iteration);
    assert_eq!(report1.eval_logloss, report2.eval_logloss);
    assert_eq!(report1.accuracy, report2.accuracy);

    Ok(())
}

#[test]
fn test_training_writes_model_artifact() -> Result<()> {
    let file = create_synthetic_dataset(150)?;
    let dir = tempfile::tempdir()?;
    let model_path = dir.path().join("disaster_model.json");

    // A stale artifact is overwritten
    std::fs::write(&model_path, "stale")?;

    let (model, report) = train_model_from_json(file.path(), quick_params(), 0.2)?;
    let hash = model.save(&model_path)?;

    assert!(model_path.exists());
    assert_eq!(std::fs::read_to_string(hash_path(&model_path))?, hash);
    assert!((0.0..=1.0).contains(&report.accuracy));
    assert!(report.best_iteration >= 1);

    let (loaded, file_hash) = Model::load_with_hash(&model_path)?;
    assert_eq!(loaded, model);
    assert_eq!(file_hash, hash);
    assert_eq!(loaded.hash_hex()?, hash);
    assert!(loaded.check_feature_order().is_ok());

    Ok(())
}

#[test]
fn test_early_stopping_truncates_to_best_iteration() -> Result<()> {
    let file = create_synthetic_dataset(150)?;
    let dataset = Dataset::from_json(file.path())?;
    let (train, test) = dataset.train_test_split(0.2, 42)?;

    let params = TrainingParams {
        num_rounds: 300,
        learning_rate: 0.5,
        min_data_in_leaf: 2,
        early_stopping_rounds: 3,
        ..TrainingParams::default()
    };
    let (model, report) = GbdtTrainer::new(params).train(&train, &test)?;

    assert_eq!(model.num_rounds(), report.best_iteration);
    assert_eq!(model.best_iteration, report.best_iteration);

    let best_loss = report.eval_logloss[report.best_iteration - 1];
    assert!(report.eval_logloss.iter().all(|&loss| loss >= best_loss));

    if report.stopped_early {
        assert_eq!(report.rounds_trained, report.best_iteration + 3);
    }

    Ok(())
}

#[test]
fn test_runs_every_round_when_early_stopping_never_triggers() -> Result<()> {
    let file = create_synthetic_dataset(200)?;
    let params = TrainingParams {
        num_rounds: 20,
        early_stopping_rounds: 1_000,
        ..quick_params()
    };

    let (model, report) = train_model_from_json(file.path(), params, 0.2)?;

    assert_eq!(report.rounds_trained, 20);
    assert!(!report.stopped_early);
    assert_eq!(report.eval_logloss.len(), 20);
    assert_eq!(model.num_rounds(), report.best_iteration);

    Ok(())
}

#[test]
fn test_small_dataset_trains_with_default_params() -> Result<()> {
    let file = create_synthetic_dataset(30)?;
    let dir = tempfile::tempdir()?;
    let model_path = dir.path().join("disaster_model.json");

    let (model, report) = train_model_from_json(file.path(), TrainingParams::default(), 0.2)?;
    let hash = model.save(&model_path)?;

    assert_eq!(model.num_rounds(), 1);
    assert!((0.0..=1.0).contains(&report.accuracy));

    let (loaded, file_hash) = Model::load_with_hash(&model_path)?;
    assert_eq!(loaded, model);
    assert_eq!(file_hash, hash);

    Ok(())
}

#[test]
fn test_evaluate_against_trained_model() -> Result<()> {
    let train_file = create_synthetic_dataset(200)?;
    let dir = tempfile::tempdir()?;
    let model_path = dir.path().join("disaster_model.json");

    let (model, _) = train_model_from_json(train_file.path(), quick_params(), 0.2)?;
    model.save(&model_path)?;

    // Evaluation data is stored flat
    let mut eval_file = NamedTempFile::new()?;
    let rows: Vec<String> = (0..60)
        .map(|i| {
            format!(
                r#"{{"urgency":{},"affected_population":{},"donation_amount":{},"num_ngos":{},"num_volunteers":{}}}"#,
                (i * 3) % 10 + 1,
                (i * 4513) % 20000,
                i * 10,
                i % 5,
                i * 2
            )
        })
        .collect();
    write!(eval_file, "[{}]", rows.join(","))?;
    eval_file.flush()?;

    let report = evaluate_file(eval_file.path(), &model_path)?;
    assert_eq!(report.samples, 60);
    assert!(report.correct <= report.samples);
    assert!((0.0..=100.0).contains(&report.accuracy_percent));

    Ok(())
}

#[test]
fn test_malformed_record_aborts_training() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"[{{"urgency":3,"affected_population":10,
             "resource_availability":{{"donation_amount":1,"num_ngos":1,"num_volunteers":1}}}},
            {{"urgency":"high","affected_population":10,
             "resource_availability":{{"donation_amount":1,"num_ngos":1,"num_volunteers":1}}}}]"#
    )?;
    file.flush()?;

    let err = train_model_from_json(file.path(), quick_params(), 0.2).unwrap_err();
    assert!(err.to_string().contains("record 1"));

    Ok(())
}
