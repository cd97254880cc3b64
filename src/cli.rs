// src/cli.rs
use std::{env, path::PathBuf};

use chrono::Local;

use crate::acquire::Acquirer;
use crate::config::consts::{ENV_PASSWORD, ENV_USERNAME};
use crate::config::options::AcquireOptions;
use crate::token::{self, TokenCodec};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Fetch,
    Predict,
    Label,
    Next,
    Clear,
}

pub struct Params {
    pub command: Command,
    pub username: Option<String>,
    pub password: Option<String>,
    pub helper_url: Option<String>,
    pub store_root: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

impl Params {
    pub fn new() -> Self {
        Self {
            command: Command::Fetch,
            username: env::var(ENV_USERNAME).ok(),
            password: env::var(ENV_PASSWORD).ok(),
            helper_url: None,
            store_root: None,
            out: None,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut params = Params::new();
    parse_cli(&mut params)?;
    execute(params)
}

pub fn execute(params: Params) -> Result<(), Box<dyn std::error::Error>> {
    let codec = TokenCodec::default();
    let now = Local::now();

    match params.command {
        Command::Predict => {
            use chrono::Timelike;
            let token = codec.encode(now.date_naive(), now.hour());
            println!("{}", token.render());
            return Ok(());
        }
        Command::Label => {
            use chrono::Timelike;
            println!("{}", token::block_label(now.hour()));
            return Ok(());
        }
        Command::Next => {
            println!("{}", token::minutes_until_rollover(now.time()));
            return Ok(());
        }
        Command::Clear | Command::Fetch => {}
    }

    let mut options = AcquireOptions::default();
    if let Some(root) = params.store_root {
        options.store_root = root;
    }
    options.helper_url = params.helper_url;

    let mut acquirer = Acquirer::new(options);

    if params.command == Command::Clear {
        acquirer.clear_all();
        println!("Cleared cache and sessions.");
        return Ok(());
    }

    if let (Some(user), Some(pass)) = (params.username, params.password) {
        acquirer.set_credentials(user, pass);
    } else {
        eprintln!("Note: no credentials ({ENV_USERNAME}/{ENV_PASSWORD} or --user/--pass); portal strategies disabled.");
    }

    let result = acquirer.fetch_qr();
    if !result.succeeded {
        return Err(format!("fetch failed: {}", result.reason()).into());
    }

    println!("source: {}", result.source.label());
    if let Some(tok) = &result.token {
        println!("token:  {tok}");
    }
    match (&result.graphic, &params.out) {
        (Some(svg), Some(path)) => {
            std::fs::write(path, svg)?;
            println!("graphic written to {}", path.display());
        }
        (Some(_), None) => println!("graphic: available (use -o FILE to save)"),
        (None, _) => {}
    }
    Ok(())
}

fn parse_cli(params: &mut Params) -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    while let Some(a) = args.next() {
        match a.as_str() {
            "--fetch" => params.command = Command::Fetch,
            "--predict" => params.command = Command::Predict,
            "--label" => params.command = Command::Label,
            "--next" => params.command = Command::Next,
            "--clear" => params.command = Command::Clear,
            "-u" | "--user" => {
                params.username = Some(args.next().ok_or("Missing value for --user")?);
            }
            "-p" | "--pass" => {
                params.password = Some(args.next().ok_or("Missing value for --pass")?);
            }
            "--helper" => {
                params.helper_url = Some(args.next().ok_or("Missing value for --helper")?);
            }
            "--store" => {
                params.store_root =
                    Some(PathBuf::from(args.next().ok_or("Missing value for --store")?));
            }
            "-o" | "--out" => {
                params.out = Some(PathBuf::from(args.next().ok_or("Missing output path")?));
            }
            "-h" | "--help" => {
                eprintln!("{}", include_str!("cli_help.txt"));
                std::process::exit(0);
            }
            other => return Err(format!("Unknown argument: {}", other).into()),
        }
    }
    Ok(())
}
