mod handlers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nagare::GenerationRequest;

#[derive(Parser)]
#[command(
    name = "nagare_cli",
    about = "Streaming text generation over pluggable inference backends"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive generation loop
    Run {
        model_path: String,
        #[arg(long, default_value_t = 256)]
        tokens_limit: usize,
    },
    /// One-shot completion streamed to stdout
    Complete {
        model_path: String,
        prompt: String,
        #[arg(long, default_value_t = 256)]
        num_predict: usize,
        #[arg(long, default_value_t = 0.8)]
        temperature: f32,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        stop: Option<String>,
        #[arg(long)]
        load_session: Option<PathBuf>,
        #[arg(long)]
        save_session: Option<PathBuf>,
        /// Prime the decode context without generating
        #[arg(long, default_value_t = false)]
        feed_only: bool,
    },
    /// Print the token ids of a text
    Tokenize {
        model_path: String,
        text: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            model_path,
            tokens_limit,
        } => handlers::run::handle_run(model_path, tokens_limit),
        Command::Complete {
            model_path,
            prompt,
            num_predict,
            temperature,
            seed,
            stop,
            load_session,
            save_session,
            feed_only,
        } => {
            let mut request = GenerationRequest::new(prompt)
                .num_predict(num_predict)
                .temperature(temperature)
                .feed_only(feed_only);
            if let Some(seed) = seed {
                request = request.seed(seed);
            }
            if let Some(stop) = stop {
                request = request.stop_sequence(stop);
            }
            if let Some(path) = load_session {
                request = request.load_session(path);
            }
            if let Some(path) = save_session {
                request = request.save_session(path);
            }
            handlers::complete::handle_complete(model_path, request);
        },
        Command::Tokenize {
            model_path,
            text,
        } => handlers::tokenize::handle_tokenize(model_path, text),
    }
}
