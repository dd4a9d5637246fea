//! DriftKV CLI Client
//!
//! Command-line interface for interacting with DriftKV.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use driftkv::protocol::{read_response, write_command, Command, Response, Status};
use driftkv::Result;

/// DriftKV CLI
#[derive(Parser, Debug)]
#[command(name = "driftkv-cli")]
#[command(about = "CLI for DriftKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get { bucket: String, key: String },

    /// Set a key-value pair
    Set {
        bucket: String,
        key: String,
        value: String,
    },

    /// Delete a key
    Del { bucket: String, key: String },

    /// Check whether a key is live
    Contains { bucket: String, key: String },

    /// Timestamp (epoch millis) of a key's value
    Timestamp { bucket: String, key: String },

    /// List keys as bucket/key, optionally for one bucket
    Keys { bucket: Option<String> },

    /// Total number of live keys
    Size,

    /// Compact one bucket, or all of them
    Compact { bucket: Option<String> },

    /// Flush staged writes
    Flush,

    /// Ping the server
    Ping,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Get { bucket, key } => Command::Get { bucket, key },
            Commands::Set { bucket, key, value } => Command::Put {
                bucket,
                key,
                value: value.into_bytes(),
            },
            Commands::Del { bucket, key } => Command::Delete { bucket, key },
            Commands::Contains { bucket, key } => Command::Contains { bucket, key },
            Commands::Timestamp { bucket, key } => Command::Timestamp { bucket, key },
            Commands::Keys { bucket } => Command::Keys { bucket },
            Commands::Size => Command::Size,
            Commands::Compact { bucket } => Command::Compact { bucket },
            Commands::Flush => Command::Flush,
            Commands::Ping => Command::Ping,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let command = Command::from(args.command);

    match send(&args.server, &command) {
        Ok(response) => print_response(&command, &response),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// One request/response exchange on a fresh connection
fn send(addr: &str, command: &Command) -> Result<Response> {
    let stream = TcpStream::connect(addr)?;
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);

    write_command(&mut writer, command)?;
    read_response(&mut reader)
}

fn print_response(command: &Command, response: &Response) -> ExitCode {
    let payload = response.payload.as_deref().unwrap_or(&[]);

    match response.status {
        Status::NotFound => {
            println!("(nil)");
            ExitCode::FAILURE
        }
        Status::Error => {
            eprintln!("error: {}", String::from_utf8_lossy(payload));
            ExitCode::FAILURE
        }
        Status::Ok => {
            match command {
                Command::Delete { .. } | Command::Contains { .. } => {
                    println!("{}", payload.first().is_some_and(|b| *b != 0));
                }
                Command::Timestamp { .. } | Command::Size => match <[u8; 8]>::try_from(payload) {
                    Ok(bytes) => println!("{}", i64::from_be_bytes(bytes)),
                    Err(_) => println!("{}", String::from_utf8_lossy(payload)),
                },
                _ if payload.is_empty() => println!("OK"),
                _ => println!("{}", String::from_utf8_lossy(payload)),
            }
            ExitCode::SUCCESS
        }
    }
}
