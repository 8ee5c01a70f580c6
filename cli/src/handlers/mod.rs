pub mod complete;
pub mod run;
pub mod tokenize;

use nagare::{BackendConfig, Engine, backends::markov::MarkovBackend};

pub fn load_engine(model_path: String) -> Engine<MarkovBackend> {
    let backend =
        match MarkovBackend::load(&BackendConfig::new(&model_path)) {
            Ok(backend) => backend,
            Err(error) => {
                eprintln!("Unable to load model: {}", error);
                std::process::exit(1);
            },
        };
    match Engine::new(backend) {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("Unable to initialize engine: {}", error);
            std::process::exit(1);
        },
    }
}
