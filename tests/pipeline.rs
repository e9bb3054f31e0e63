use std::fs;

use indexmap::IndexMap;

use dict_scorer::corpus::write_lines;
use dict_scorer::dictionary::Dictionary;
use dict_scorer::score::run_pipeline;
use dict_scorer::{PipelineConfig, ScoringMethod, VectorSpace};

/// Small two-category embedding space: one urgent direction, one calm
/// direction, with a few words in between. Inserted most-frequent first.
fn toy_space() -> VectorSpace {
    let mut space = VectorSpace::new(2);
    space.insert("sale", vec![0.7, 0.3]).unwrap();
    space.insert("motivated", vec![1.0, 0.05]).unwrap();
    space.insert("immediate", vec![0.95, 0.1]).unwrap();
    space.insert("leisurely", vec![0.05, 1.0]).unwrap();
    space.insert("patient", vec![0.1, 0.95]).unwrap();
    space
}

fn seeds() -> IndexMap<String, Vec<String>> {
    let mut seeds = IndexMap::new();
    seeds.insert(
        "Urgency".to_string(),
        vec!["motivated".to_string(), "immediate".to_string()],
    );
    seeds.insert("Patience".to_string(), vec!["patient".to_string()]);
    seeds
}

fn write_fixture(config: &PipelineConfig) {
    write_lines(
        &config.sentence_corpus,
        &[
            "motivated motivated sale",
            "immediate closing",
            "patient leisurely viewing",
        ],
    )
    .unwrap();
    write_lines(&config.sentence_ids, &["1_0", "1_1", "2_0"]).unwrap();
}

#[test]
fn pipeline_builds_all_artifacts_and_score_tables() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PipelineConfig::new(
        dir.path().join("sentences.txt"),
        dir.path().join("sentence_ids.txt"),
        dir.path().join("out"),
    );
    config.top_n_words = 3;
    config.seed_words = seeds();
    write_fixture(&config);

    let space = toy_space();
    run_pipeline(
        &config,
        &space,
        &[ScoringMethod::Tf, ScoringMethod::TfIdf],
    )
    .unwrap();

    // Dictionary artifact holds a valid partition.
    let dictionary = Dictionary::read_csv(&config.dict_csv_path()).unwrap();
    assert!(dictionary.is_partition());
    assert_eq!(dictionary.categories.len(), 2);

    // Sentences 1_0 and 1_1 merged into document 1.
    let doc_ids = fs::read_to_string(config.doc_ids_path()).unwrap();
    assert_eq!(doc_ids.lines().collect::<Vec<_>>(), vec!["1", "2"]);

    // TF score table: header plus one row per document, doc ids first.
    let tf_table = fs::read_to_string(config.scores_path("TF")).unwrap();
    let rows: Vec<&str> = tf_table.lines().collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], "doc_id,Urgency,Patience");
    assert!(rows[1].starts_with("1,"));
    assert!(rows[2].starts_with("2,"));

    // Document 1 contains "motivated" twice: Urgency TF >= 2.
    let urgency: f64 = rows[1].split(',').nth(1).unwrap().parse().unwrap();
    assert!(urgency >= 2.0);

    // IDF methods also emit a contribution table covering the dictionary.
    let contributions =
        fs::read_to_string(config.contributions_path("TFIDF")).unwrap();
    assert_eq!(
        contributions.lines().count(),
        dictionary.word_count() + 1
    );
    assert!(!config.contributions_path("TF").exists());
}

#[test]
fn rerunning_reuses_persisted_intermediates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = PipelineConfig::new(
        dir.path().join("sentences.txt"),
        dir.path().join("sentence_ids.txt"),
        dir.path().join("out"),
    );
    config.top_n_words = 3;
    config.seed_words = seeds();
    write_fixture(&config);

    let space = toy_space();
    run_pipeline(&config, &space, &[ScoringMethod::TfIdf]).unwrap();
    let dict_before = fs::read(config.dict_csv_path()).unwrap();
    let freq_before = fs::read(config.doc_freq_path()).unwrap();
    let scores_before = fs::read(config.scores_path("TFIDF")).unwrap();

    run_pipeline(&config, &space, &[ScoringMethod::TfIdf]).unwrap();
    assert_eq!(fs::read(config.dict_csv_path()).unwrap(), dict_before);
    assert_eq!(fs::read(config.doc_freq_path()).unwrap(), freq_before);
    assert_eq!(fs::read(config.scores_path("TFIDF")).unwrap(), scores_before);
}
