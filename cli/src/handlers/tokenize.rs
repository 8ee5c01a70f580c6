use super::load_engine;

pub fn handle_tokenize(
    model_path: String,
    text: String,
) {
    let engine = load_engine(model_path);
    match engine.tokenize(&text) {
        Ok(tokens) => {
            let rendered: Vec<String> =
                tokens.iter().map(|token| token.to_string()).collect();
            println!("[{}]", rendered.join(", "));
        },
        Err(error) => {
            eprintln!("Error: {}", error);
            std::process::exit(1);
        },
    }
}
