//! Minimal chat host: reads questions from stdin, streams answers to stdout.

use std::io::{BufRead, Write};
use std::sync::Arc;

use sheetwise::agent::FunctionDispatcher;
use sheetwise::config::Config;
use sheetwise::currency::StaticRates;
use sheetwise::model::ChatMessage;
use sheetwise::{functions, model, workspace};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env();
    let model = model::factory(&config.backend, &config)?;
    let context = workspace::load(&config.data_dir, model, Arc::new(StaticRates)).await?;

    let dispatcher = FunctionDispatcher::new(Arc::new(functions::registry()), Arc::new(context));

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        history.push(ChatMessage::user(line));
        let mut stream = dispatcher.respond(history.clone());

        let mut answer = String::new();
        while let Some(chunk) = stream.recv().await {
            print!("{}", chunk);
            stdout.flush()?;
            answer.push_str(&chunk);
        }
        println!();
        history.push(ChatMessage::assistant(answer));
    }

    Ok(())
}
