use std::sync::{Arc, Mutex};

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Text;
use nagare::{
    CancelController, GenerationRequest, GenerationResult, StreamEvent,
};

use super::load_engine;

fn format_stats(result: &GenerationResult) -> String {
    let stats = &result.stats;
    let style_stats = Style::new().bold();
    style_stats
        .apply_to(format!(
            "{:.3}s, {:.3}t/s",
            stats.duration, stats.tokens_per_second,
        ))
        .to_string()
}

pub fn handle_run(
    model_path: String,
    tokens_limit: usize,
) {
    let engine = load_engine(model_path);

    let active_call: Arc<Mutex<Option<CancelController>>> =
        Arc::new(Mutex::new(None));
    let active_call_for_ctrlc = active_call.clone();
    ctrlc::set_handler(move || {
        if let Some(controller) =
            active_call_for_ctrlc.lock().unwrap().as_ref()
        {
            controller.activate();
        }
    })
    .unwrap();

    loop {
        let input =
            match Text::new("").with_placeholder("Send a prompt").prompt() {
                Ok(input) => input,
                Err(_) => {
                    break;
                },
            };
        if input.is_empty() {
            continue;
        }

        let controller = CancelController::new();
        *active_call.lock().unwrap() = Some(controller.clone());

        let progress_bar_message_limit: usize = 1024;
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.enable_steady_tick(std::time::Duration::from_millis(100));
        progress_bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );

        let mut streamed = String::new();
        let request =
            GenerationRequest::new(input).num_predict(tokens_limit);
        let outcome = engine.create_completion_with_signal(
            &request,
            |event| {
                if let StreamEvent::Data {
                    token, ..
                } = event
                {
                    streamed.push_str(token);
                    let tail: String = streamed
                        .chars()
                        .rev()
                        .take(progress_bar_message_limit)
                        .collect::<Vec<_>>()
                        .into_iter()
                        .rev()
                        .collect();
                    progress_bar.set_message(tail);
                }
            },
            &controller.signal(),
        );

        *active_call.lock().unwrap() = None;
        progress_bar.finish_and_clear();

        match outcome {
            Ok(result) => {
                println!("{}\n\n{}", result.text(), format_stats(&result));
            },
            Err(failure) if failure.error.is_aborted() => {
                println!("{}", streamed);
                println!("{}", Style::new().dim().apply_to("(cancelled)"));
            },
            Err(failure) => {
                println!("{}", streamed);
                eprintln!(
                    "{}",
                    Style::new()
                        .red()
                        .apply_to(format!("Error: {}", failure.error)),
                );
            },
        }
    }
}
