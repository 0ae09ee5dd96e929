use chord::config::Config;
use chord::message::api::{Delete, Get, Put};
use chord::message::Message;
use chord::network::Connection;
use std::io;
use std::io::prelude::*;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "client",
    version = "0.1",
    about = "Client to talk to the api of a chord node"
)]
struct Opt {
    /// Path to a custom config file
    #[structopt(short = "c", parse(from_os_str))]
    config: PathBuf,
}

fn main() {
    let opt = Opt::from_args();

    let config = Config::load_from_file(&opt.config).unwrap_or_else(|err| {
        eprintln!("Argument error: {}", err);
        process::exit(2);
    });

    println!("Client to talk to the api of a chord node");
    println!("-----------------------------------------\n");

    loop {
        let command = match read_line("Enter a command (put, get, delete, quit)") {
            Some(command) => command,
            None => break,
        };

        match command.trim() {
            "put" => handle_put(&config),
            "get" => handle_get(&config),
            "delete" => handle_delete(&config),
            "quit" => break,
            "" => {}
            other => println!("Unknown command: {}", other),
        }
    }
}

fn read_line(question: &str) -> Option<String> {
    print!("{}: ", question);
    io::stdout().flush().unwrap();

    let mut line = String::new();

    match io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            eprintln!("Error: {}", err);
            None
        }
    }
}

fn request(config: &Config, msg: &Message) -> Option<Message> {
    let timeout = config.lookup_timeout + Duration::from_secs(1);

    let reply = Connection::open(&config.api_address, timeout)
        .and_then(|mut con| con.request(msg));

    match reply {
        Ok(reply) => Some(reply),
        Err(err) => {
            eprintln!("Error talking to {}: {}", config.api_address, err);
            None
        }
    }
}

fn handle_put(config: &Config) {
    let key = read_line("Enter a key").unwrap().trim().to_string();
    let value = read_line("Enter a value").unwrap().trim().to_string();

    let put = Put {
        key: key.clone(),
        value,
    };

    match request(config, &Message::Put(put)) {
        Some(Message::Success(_)) => println!("Stored key {}", key),
        Some(Message::Failure(_)) => println!("Failed to store key {}", key),
        Some(msg) => eprintln!("Unexpected message of type {}", msg),
        None => {}
    }
}

fn handle_get(config: &Config) {
    let key = read_line("Enter a key").unwrap().trim().to_string();

    let get = Get { key: key.clone() };

    match request(config, &Message::Get(get)) {
        Some(Message::Success(success)) => {
            println!("Value for key {}:\n\n{}", success.key, success.value)
        }
        Some(Message::Failure(_)) => println!("No value found for key {}", key),
        Some(msg) => eprintln!("Unexpected message of type {}", msg),
        None => {}
    }
}

fn handle_delete(config: &Config) {
    let key = read_line("Enter a key").unwrap().trim().to_string();

    let delete = Delete { key: key.clone() };

    match request(config, &Message::Delete(delete)) {
        Some(Message::Success(_)) => println!("Deleted key {}", key),
        Some(Message::Failure(_)) => println!("Key {} was not present", key),
        Some(msg) => eprintln!("Unexpected message of type {}", msg),
        None => {}
    }
}
