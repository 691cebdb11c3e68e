use std::process::ExitCode;

use clap::Parser;
use seat_reservation::{
    client::{Client, ClientError, Command},
    config::ClientArgs,
};
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader},
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = match ClientArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.use_stderr() {
                true => ExitCode::FAILURE,
                false => ExitCode::SUCCESS,
            };
        }
    };

    let client = match Client::connect((args.address.as_str(), args.port)).await {
        Ok(client) => client,
        Err(reason) => {
            eprintln!("failed to connect to {}:{}: {}", args.address, args.port, reason);
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!("connected to {}:{}", args.address, args.port);

    let outcome = match &args.file {
        Some(path) => match File::open(path).await {
            Ok(file) => session(client, BufReader::new(file), false).await,
            Err(reason) => {
                eprintln!("failed to open {}: {}", path.display(), reason);
                return ExitCode::FAILURE;
            }
        },
        None => session(client, BufReader::new(tokio::io::stdin()), true).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(reason) => {
            // There is no reconnect, losing the server ends the process
            eprintln!("lost the connection to the server: {}", reason);
            ExitCode::FAILURE
        }
    }
}

async fn session<R: AsyncBufRead + Unpin>(
    mut client: Client,
    input: R,
    interactive: bool,
) -> Result<(), ClientError> {
    let mut lines = input.lines();

    loop {
        if interactive {
            prompt("> ").await?;
        }

        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break, // EOF
            },
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match console_command(line, interactive) {
            Some(Console::Leave) => break,
            Some(Console::Clear) => {
                prompt("\x1b[H\x1b[J").await?;
                continue;
            }
            None => {}
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(reason) => {
                println!("{reason}");
                continue;
            }
        };

        println!("{}", client.execute(command).await?);
    }

    if let Some(farewell) = client.terminate().await? {
        println!("{farewell}");
    }

    Ok(())
}

async fn prompt(text: &str) -> tokio::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await
}

#[derive(Debug, PartialEq, Eq)]
enum Console {
    Leave,
    Clear,
}

// Only the prompt understands these, a batch file is nothing but commands
fn console_command(line: &str, interactive: bool) -> Option<Console> {
    if !interactive {
        return None;
    }

    match line {
        "exit" | "quit" => Some(Console::Leave),
        "clear" => Some(Console::Clear),
        _ => None,
    }
}
