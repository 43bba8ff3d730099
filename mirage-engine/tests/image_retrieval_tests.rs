//! Image pipeline end-to-end tests on generated fixtures

mod helpers;

use helpers::{noise_image, pattern_image, recolor, test_config, write_image};
use mirage_engine::extractors::image_features::ImageFeatureExtractor;
use mirage_engine::types::FeatureExtractor;
use mirage_engine::{ImageScore, MediaKind, RetrievalConfig, RetrievalEngine, RetrievalError, ScoreKind};
use tempfile::TempDir;

fn distance_engine() -> RetrievalEngine {
    RetrievalEngine::new(RetrievalConfig {
        image_score: ImageScore::Distance,
        ..test_config()
    })
    .unwrap()
}

#[test]
fn test_recolored_duplicate_ranks_first() {
    let corpus = TempDir::new().unwrap();
    let queries = TempDir::new().unwrap();

    let original = pattern_image(64, 64, 1);
    write_image(corpus.path(), "a.png", &recolor(&original)).unwrap();
    write_image(corpus.path(), "b.png", &noise_image(64, 64, 1)).unwrap();
    write_image(corpus.path(), "c.jpg", &noise_image(48, 80, 2)).unwrap();
    let query = write_image(queries.path(), "query.png", &original).unwrap();

    let report = distance_engine()
        .retrieve(MediaKind::Image, &query, corpus.path(), 10)
        .unwrap();

    assert_eq!(report.score_kind, ScoreKind::Distance);
    assert_eq!(report.results[0].id, "a.png");
    assert_eq!(report.results.len(), 3);
    assert!(report
        .results
        .windows(2)
        .all(|w| w[0].score <= w[1].score));
}

#[test]
fn test_query_from_corpus_matches_itself() {
    let corpus = TempDir::new().unwrap();
    for variant in 0..4 {
        write_image(
            corpus.path(),
            &format!("cover_{}.png", variant),
            &pattern_image(40, 40, variant * 3),
        )
        .unwrap();
    }
    write_image(corpus.path(), "noise.png", &noise_image(40, 40, 9)).unwrap();

    let query = corpus.path().join("cover_2.png");
    let report = distance_engine()
        .retrieve(MediaKind::Image, &query, corpus.path(), 10)
        .unwrap();

    let best = report.best().unwrap();
    assert_eq!(best.id, "cover_2.png");
    assert!(best.score < 1e-6, "self distance {}", best.score);
}

#[test]
fn test_similarity_scores() {
    let corpus = TempDir::new().unwrap();
    for seed in 0..4 {
        write_image(
            corpus.path(),
            &format!("n{}.png", seed),
            &noise_image(32, 32, seed),
        )
        .unwrap();
    }
    let query = corpus.path().join("n1.png");

    let engine = RetrievalEngine::new(test_config()).unwrap();
    let report = engine
        .retrieve(MediaKind::Image, &query, corpus.path(), 10)
        .unwrap();

    assert_eq!(report.score_kind, ScoreKind::Similarity);
    assert_eq!(report.results[0].id, "n1.png");
    assert!((report.results[0].score - 1.0).abs() < 1e-9);
    // The farthest item maps to exactly 0
    assert_eq!(report.results.last().unwrap().score, 0.0);
    assert!(report
        .results
        .windows(2)
        .all(|w| w[0].score >= w[1].score));
    assert!(report
        .results
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.score)));
}

#[test]
fn test_result_count_respects_n() {
    let corpus = TempDir::new().unwrap();
    for seed in 0..3 {
        write_image(
            corpus.path(),
            &format!("img{}.png", seed),
            &noise_image(16, 16, seed),
        )
        .unwrap();
    }
    let query = corpus.path().join("img0.png");
    let engine = distance_engine();

    let one = engine
        .retrieve(MediaKind::Image, &query, corpus.path(), 1)
        .unwrap();
    assert_eq!(one.results.len(), 1);

    let many = engine
        .retrieve(MediaKind::Image, &query, corpus.path(), 50)
        .unwrap();
    assert_eq!(many.results.len(), 3);
    assert_eq!(many.corpus_size, 3);
}

#[test]
fn test_corrupt_item_is_skipped() {
    let corpus = TempDir::new().unwrap();
    write_image(corpus.path(), "good1.png", &noise_image(20, 20, 1)).unwrap();
    write_image(corpus.path(), "good2.png", &pattern_image(20, 20, 2)).unwrap();
    std::fs::write(corpus.path().join("broken.png"), b"not an image").unwrap();

    let query = corpus.path().join("good1.png");
    let report = distance_engine()
        .retrieve(MediaKind::Image, &query, corpus.path(), 10)
        .unwrap();

    assert_eq!(report.corpus_size, 3);
    assert_eq!(report.usable_items, 2);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].error_code, "IMAGE_DECODE_ERROR");
    assert!(report.skipped[0].path.ends_with("broken.png"));
}

#[test]
fn test_empty_corpus_fails() {
    let corpus = TempDir::new().unwrap();
    std::fs::write(corpus.path().join("readme.txt"), b"no images here").unwrap();
    let queries = TempDir::new().unwrap();
    let query = write_image(queries.path(), "q.png", &noise_image(8, 8, 1)).unwrap();

    let err = distance_engine()
        .retrieve(MediaKind::Image, &query, corpus.path(), 10)
        .unwrap_err();
    assert!(matches!(err, RetrievalError::EmptyCorpus(_)), "{:?}", err);
}

#[test]
fn test_all_items_unusable_fails() {
    let corpus = TempDir::new().unwrap();
    std::fs::write(corpus.path().join("a.png"), b"junk").unwrap();
    std::fs::write(corpus.path().join("b.jpeg"), b"junk").unwrap();
    let queries = TempDir::new().unwrap();
    let query = write_image(queries.path(), "q.png", &noise_image(8, 8, 1)).unwrap();

    let err = distance_engine()
        .retrieve(MediaKind::Image, &query, corpus.path(), 10)
        .unwrap_err();
    assert!(matches!(err, RetrievalError::EmptyCorpus(_)), "{:?}", err);
}

#[test]
fn test_unreadable_query_fails() {
    let corpus = TempDir::new().unwrap();
    write_image(corpus.path(), "a.png", &noise_image(8, 8, 1)).unwrap();
    let queries = TempDir::new().unwrap();
    let query = queries.path().join("query.png");
    std::fs::write(&query, b"\x89PNG truncated").unwrap();

    let err = distance_engine()
        .retrieve(MediaKind::Image, &query, corpus.path(), 10)
        .unwrap_err();
    assert!(matches!(err, RetrievalError::QueryDecode(_)), "{:?}", err);
    assert_eq!(err.code(), "QUERY_DECODE_ERROR");
}

#[test]
fn test_flattened_length_matches_target_size() {
    let dir = TempDir::new().unwrap();
    let extractor = ImageFeatureExtractor::new(300, 300);
    for (name, w, h) in [("tiny.png", 3, 5), ("wide.jpg", 400, 90), ("square.png", 300, 300)] {
        let path = write_image(dir.path(), name, &noise_image(w, h, 4)).unwrap();
        assert_eq!(extractor.extract(&path).unwrap().len(), 90_000);
    }
}
