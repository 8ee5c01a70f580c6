use std::io::{self, Write};

use console::Style;
use nagare::{GenerationRequest, StreamEvent};

use super::load_engine;

pub fn handle_complete(
    model_path: String,
    request: GenerationRequest,
) {
    let engine = load_engine(model_path);

    let outcome = engine.create_completion(&request, |event| {
        if let StreamEvent::Data {
            token, ..
        } = event
        {
            print!("{}", token);
            let _ = io::stdout().flush();
        }
    });

    match outcome {
        Ok(result) => {
            println!();
            eprintln!(
                "{}",
                Style::new().dim().apply_to(format!(
                    "{} prompt + {} generated tokens, {:.3}s",
                    result.stats.tokens_count_input,
                    result.stats.tokens_count_output,
                    result.stats.duration,
                )),
            );
        },
        Err(failure) => {
            println!();
            eprintln!("Error: {}", failure.error);
            std::process::exit(1);
        },
    }
}
