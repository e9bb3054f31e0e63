use std::env;
use std::process::ExitCode;

use dict_scorer::dictionary::read_seed_words;
use dict_scorer::score::run_pipeline;
use dict_scorer::{PipelineConfig, ScoringMethod, VectorSpace};

fn print_usage() {
    eprintln!("Usage: dict-scorer --corpus FILE --ids FILE --embedding FILE --seeds FILE --out DIR");
    eprintln!("                   [--methods TF,TFIDF,...] [--top-n N] [--restrict FRACTION]");
    eprintln!();
    eprintln!("  --corpus FILE      sentence-level corpus, one sentence per line");
    eprintln!("  --ids FILE         sentence ids aligned with the corpus (docID_sentenceIndex)");
    eprintln!("  --embedding FILE   trained embedding space (CBOR)");
    eprintln!("  --seeds FILE       seed words, one CSV row per category");
    eprintln!("  --out DIR          output directory for all artifacts");
    eprintln!("  --methods LIST     comma-separated; TF, TFIDF, WFIDF, TFIDF_SIMWEIGHT, WFIDF_SIMWEIGHT");
    eprintln!("  --top-n N          max words per category in the expanded dictionary (default 500)");
    eprintln!("  --restrict F       restrict expansion to the top F fraction of the vocabulary");
}

fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut corpus = None;
    let mut ids = None;
    let mut embedding = None;
    let mut seeds_path = None;
    let mut out_dir = None;
    let mut methods = vec![ScoringMethod::Tf];
    let mut top_n = 500usize;
    let mut restrict = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--corpus" => corpus = args.next(),
            "--ids" => ids = args.next(),
            "--embedding" => embedding = args.next(),
            "--seeds" => seeds_path = args.next(),
            "--out" => out_dir = args.next(),
            "--methods" => {
                let Some(list) = args.next() else {
                    eprintln!("[error] --methods requires a list");
                    return ExitCode::FAILURE;
                };
                match list
                    .split(',')
                    .map(str::parse)
                    .collect::<Result<Vec<ScoringMethod>, _>>()
                {
                    Ok(parsed) => methods = parsed,
                    Err(err) => {
                        eprintln!("[error] {}", err);
                        return ExitCode::FAILURE;
                    }
                }
            }
            "--top-n" => match args.next().and_then(|v| v.parse().ok()) {
                Some(n) => top_n = n,
                None => {
                    eprintln!("[error] --top-n requires a positive integer");
                    return ExitCode::FAILURE;
                }
            },
            "--restrict" => match args.next().and_then(|v| v.parse::<f64>().ok()) {
                Some(f) if f > 0.0 && f <= 1.0 => restrict = Some(f),
                _ => {
                    eprintln!("[error] --restrict requires a fraction in (0, 1]");
                    return ExitCode::FAILURE;
                }
            },
            "-h" | "--help" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("[error] unknown argument: {}", other);
                print_usage();
                return ExitCode::FAILURE;
            }
        }
    }

    let (Some(corpus), Some(ids), Some(embedding), Some(seeds_path), Some(out_dir)) =
        (corpus, ids, embedding, seeds_path, out_dir)
    else {
        print_usage();
        return ExitCode::FAILURE;
    };

    let seed_words = match read_seed_words(seeds_path.as_ref()) {
        Ok(seeds) => seeds,
        Err(err) => {
            eprintln!("[error] failed to read seed words: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let space = match VectorSpace::load(embedding.as_ref()) {
        Ok(space) => space,
        Err(err) => {
            eprintln!("[error] failed to load embedding space: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut config = PipelineConfig::new(corpus, ids, out_dir);
    config.top_n_words = top_n;
    config.restrict_vocab = restrict;
    config.seed_words = seed_words;

    if let Err(err) = run_pipeline(&config, &space, &methods) {
        eprintln!("[error] pipeline failed: {}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
