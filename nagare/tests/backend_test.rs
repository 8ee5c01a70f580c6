use std::io::Write;

use nagare::{
    Backend, BackendConfig, Engine, GenerationRequest, SamplingParams,
    StepOutput,
    backends::{
        error::{BackendError, LoadError},
        markov::{EOS_TOKEN, MarkovBackend},
    },
};

fn corpus_file(content: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp corpus");
    file.write_all(content).expect("write corpus");
    file
}

#[test]
fn load_rejects_missing_model_path() {
    let config = BackendConfig::new("/nonexistent-nagare-model.txt");
    let error = MarkovBackend::load(&config)
        .expect_err("loading a missing model should fail");
    assert!(matches!(error, LoadError::ModelNotFound(_)));
}

#[test]
fn load_rejects_empty_corpus() {
    let corpus = corpus_file(b"");
    let error = MarkovBackend::load(&BackendConfig::new(corpus.path()))
        .expect_err("loading an empty corpus should fail");
    assert!(matches!(error, LoadError::InvalidFormat(_)));
}

#[test]
fn load_rejects_non_utf8_corpus() {
    let corpus = corpus_file(&[0xff, 0xfe, 0x00]);
    let error = MarkovBackend::load(&BackendConfig::new(corpus.path()))
        .expect_err("loading binary junk should fail");
    assert!(matches!(error, LoadError::InvalidFormat(_)));
}

#[test]
fn load_rejects_oversized_context() {
    let corpus = corpus_file(b"abc");
    let config =
        BackendConfig::new(corpus.path()).context_length(1 << 20);
    let error = MarkovBackend::load(&config)
        .expect_err("an oversized context should fail");
    assert!(matches!(error, LoadError::ContextLength { .. }));
}

#[test]
fn end_marker_is_a_queried_property() {
    let corpus = corpus_file(b"abc");
    let backend = MarkovBackend::load(&BackendConfig::new(corpus.path()))
        .expect("markov backend should load");
    assert_eq!(backend.eos_token(), EOS_TOKEN);
}

#[test]
fn step_reports_context_full() {
    let corpus = corpus_file(b"abcabc");
    let config = BackendConfig::new(corpus.path()).context_length(4);
    let backend =
        MarkovBackend::load(&config).expect("markov backend should load");
    let engine = Engine::new(backend).expect("engine should initialize");

    let error = engine
        .create_completion(
            &GenerationRequest::new("abcabc").temperature(0.0),
            |_| {},
        )
        .expect_err("feeding past the context window should fail");
    match &error.error {
        nagare::EngineError::Backend(BackendError::ContextFull) => {},
        other => panic!("expected ContextFull, got {:?}", other),
    }
}

#[test]
fn greedy_decode_follows_bigram_statistics() {
    let corpus = corpus_file(b"abab");
    let backend = MarkovBackend::load(&BackendConfig::new(corpus.path()))
        .expect("markov backend should load");
    let engine = Engine::new(backend).expect("engine should initialize");

    let result = engine
        .create_completion(
            &GenerationRequest::new("a")
                .num_predict(3)
                .temperature(0.0)
                .repeat_penalty(1.0),
            |_| {},
        )
        .expect("completion should succeed");
    assert_eq!(result.text(), "bab");
}

#[test]
fn step_rejects_tokens_outside_vocabulary() {
    let corpus = corpus_file(b"abc");
    let backend = MarkovBackend::load(&BackendConfig::new(corpus.path()))
        .expect("markov backend should load");
    let mut context = backend.new_context().expect("context");

    let error = backend
        .step(&mut context, 9999, &SamplingParams::default())
        .expect_err("out-of-vocabulary token should fail");
    assert!(matches!(error, BackendError::Step(_)));
}

#[test]
fn terminal_byte_leads_to_end_marker() {
    let corpus = corpus_file(b"xy");
    let backend = MarkovBackend::load(&BackendConfig::new(corpus.path()))
        .expect("markov backend should load");
    let mut context = backend.new_context().expect("context");

    // 'y' only appears at the end of the corpus
    let output = backend
        .step(&mut context, u32::from(b'y'), &SamplingParams::default())
        .expect("step should succeed");
    match output {
        StepOutput::Logits(logits) => {
            let best = logits
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(id, _)| id as u32)
                .unwrap();
            assert_eq!(best, EOS_TOKEN);
        },
        other => panic!("expected logits, got {:?}", other),
    }
}
