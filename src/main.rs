//! Command line interface for converting AMB metadata documents to Nostr
//! events and back. Supports flattening with optional Schnorr signing,
//! unflattening, and signature verification.

mod amb;
mod config;
mod error;
mod event;
mod flatten;
mod signer;
mod tags;
mod unflatten;

use std::{
    fs,
    io::{self, Read, Write},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::Settings;
use flatten::FlattenOptions;
use unflatten::UnflattenOptions;

/// Command line interface entry point.
#[derive(Parser)]
#[command(
    name = "ambr",
    author,
    version,
    about = "Convert AMB educational metadata between JSON-LD documents and Nostr events"
)]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Flatten an AMB document into a kind-30142 Nostr event.
    Flatten {
        /// Input file, `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
        /// Output file, `-` for stdout.
        #[arg(long, default_value = "-")]
        output: String,
        /// Author public key (64 hex characters).
        #[arg(long)]
        pubkey: Option<String>,
        /// Fixed created_at timestamp instead of the wall clock.
        #[arg(long)]
        timestamp: Option<u64>,
        /// Sign the event with this secret key (hex or nsec).
        #[arg(long)]
        sign: Option<String>,
        /// Skip signing even when a key is configured.
        #[arg(long)]
        unsigned: bool,
        /// Omit hasPart/isPartOf/isBasedOn tags.
        #[arg(long)]
        no_relationships: bool,
        /// Pin the default timestamp to zero for reproducible output.
        #[arg(long)]
        deterministic: bool,
        /// Relay hint emitted as an `r` tag; repeatable.
        #[arg(long)]
        relay: Vec<String>,
    },
    /// Rebuild an AMB document from a kind-30142 Nostr event.
    Unflatten {
        /// Input file, `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
        /// Output file, `-` for stdout.
        #[arg(long, default_value = "-")]
        output: String,
        /// Default language recorded in the JSON-LD context.
        #[arg(long)]
        language: Option<String>,
    },
    /// Check the id and Schnorr signature of a signed event.
    Verify {
        /// Input file, `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,
    },
}

/// Execute the selected CLI subcommand.
fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = Settings::from_env(&cli.env)?;
    match cli.command {
        Commands::Flatten {
            input,
            output,
            pubkey,
            timestamp,
            sign,
            unsigned,
            no_relationships,
            deterministic,
            relay,
        } => {
            let data = read_input(&input)?;
            let resource = amb::parse_resource(&data)?;
            let signing_key = if unsigned {
                None
            } else {
                sign.or_else(|| cfg.secret_key.clone())
            };
            let key_hex = match signing_key {
                Some(key) => Some(signer::parse_secret_key(&key)?),
                None => None,
            };
            let mut opts = FlattenOptions {
                pubkey: pubkey.or_else(|| cfg.pubkey.clone()),
                timestamp,
                include_relationships: !no_relationships,
                deterministic_ids: deterministic,
                relay_hints: if relay.is_empty() {
                    cfg.relays.clone()
                } else {
                    relay
                },
            };
            // A signing key determines the pubkey anyway, so derive it up
            // front and skip the default-pubkey warning.
            if opts.pubkey.is_none() {
                if let Some(key) = &key_hex {
                    opts.pubkey = Some(signer::derive_pubkey(key)?);
                }
            }
            let flattened = flatten::flatten(&resource, &opts)?;
            for warning in &flattened.warnings {
                eprintln!("warning: {warning}");
            }
            let event = match key_hex {
                Some(key) => signer::sign_event(&flattened.event, &key)?,
                None => flattened.event,
            };
            write_output(&output, &serde_json::to_string_pretty(&event)?)?;
        }
        Commands::Unflatten {
            input,
            output,
            language,
        } => {
            let data = read_input(&input)?;
            let event = event::parse_event(&data)?;
            let opts = match language.or_else(|| cfg.language.clone()) {
                Some(default_language) => UnflattenOptions { default_language },
                None => UnflattenOptions::default(),
            };
            let resource = unflatten::unflatten(&event, &opts)?;
            write_output(&output, &serde_json::to_string_pretty(&resource)?)?;
        }
        Commands::Verify { input } => {
            let data = read_input(&input)?;
            let event = event::parse_event(&data)?;
            let id = signer::verify_event(&event)?;
            println!("ok {id}");
        }
    }
    Ok(())
}

/// Read all of `path`, with `-` meaning stdin.
fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut data = String::new();
        io::stdin()
            .read_to_string(&mut data)
            .context("reading stdin")?;
        Ok(data)
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {path}"))
    }
}

/// Write `data` plus a trailing newline to `path`, with `-` meaning stdout.
fn write_output(path: &str, data: &str) -> anyhow::Result<()> {
    if path == "-" {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    } else {
        fs::write(path, format!("{data}\n")).with_context(|| format!("writing {path}"))
    }
}

#[cfg(not(test))]
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const SAMPLE: &str = r#"{
        "id": "https://example.org/course/1",
        "type": ["LearningResource", "Course"],
        "name": "Intro to Rust",
        "keywords": ["Systems", "Programming"],
        "inLanguage": ["en"]
    }"#;

    fn clear_vars() {
        for v in [
            "AMBR_PUBKEY",
            "AMBR_SECRET_KEY",
            "AMBR_RELAYS",
            "AMBR_LANGUAGE",
        ] {
            std::env::remove_var(v);
        }
    }

    fn flatten_cmd(input: String, output: String, env: String) -> Cli {
        Cli {
            env,
            command: Commands::Flatten {
                input,
                output,
                pubkey: None,
                timestamp: Some(1_700_000_000),
                sign: None,
                unsigned: false,
                no_relationships: false,
                deterministic: false,
                relay: vec![],
            },
        }
    }

    #[test]
    fn run_flatten_then_unflatten() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        let doc_path = dir.path().join("doc.json");
        let event_path = dir.path().join("event.json");
        let back_path = dir.path().join("back.json");
        fs::write(&doc_path, SAMPLE).unwrap();

        run(flatten_cmd(
            doc_path.to_string_lossy().into_owned(),
            event_path.to_string_lossy().into_owned(),
            env_file.to_string_lossy().into_owned(),
        ))
        .unwrap();

        let event_json = fs::read_to_string(&event_path).unwrap();
        let event = event::parse_event(&event_json).unwrap();
        assert_eq!(event.kind, event::AMB_EVENT_KIND);
        assert_eq!(event.created_at, 1_700_000_000);
        assert_eq!(event.pubkey, event::DEFAULT_PUBKEY);
        assert_eq!(event.content, "");

        run(Cli {
            env: env_file.to_string_lossy().into_owned(),
            command: Commands::Unflatten {
                input: event_path.to_string_lossy().into_owned(),
                output: back_path.to_string_lossy().into_owned(),
                language: Some("en".into()),
            },
        })
        .unwrap();

        let back = amb::parse_resource(&fs::read_to_string(&back_path).unwrap()).unwrap();
        assert_eq!(back.id, "https://example.org/course/1");
        assert_eq!(back.name, "Intro to Rust");
        assert_eq!(back.kind, vec!["LearningResource", "Course"]);
        assert_eq!(
            back.keywords,
            Some(vec!["systems".to_string(), "programming".to_string()])
        );
    }

    #[test]
    fn run_sign_and_verify_with_env_key() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(
            &env_file,
            "AMBR_SECRET_KEY=0000000000000000000000000000000000000000000000000000000000000001\n",
        )
        .unwrap();
        let doc_path = dir.path().join("doc.json");
        let event_path = dir.path().join("event.json");
        fs::write(&doc_path, SAMPLE).unwrap();

        run(flatten_cmd(
            doc_path.to_string_lossy().into_owned(),
            event_path.to_string_lossy().into_owned(),
            env_file.to_string_lossy().into_owned(),
        ))
        .unwrap();

        let event = event::parse_event(&fs::read_to_string(&event_path).unwrap()).unwrap();
        assert!(event.id.is_some());
        assert!(event.sig.is_some());
        assert_ne!(event.pubkey, event::DEFAULT_PUBKEY);

        run(Cli {
            env: env_file.to_string_lossy().into_owned(),
            command: Commands::Verify {
                input: event_path.to_string_lossy().into_owned(),
            },
        })
        .unwrap();
    }

    #[test]
    fn run_unsigned_overrides_env_key() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(
            &env_file,
            "AMBR_SECRET_KEY=0000000000000000000000000000000000000000000000000000000000000001\n",
        )
        .unwrap();
        let doc_path = dir.path().join("doc.json");
        let event_path = dir.path().join("event.json");
        fs::write(&doc_path, SAMPLE).unwrap();

        let mut cli = flatten_cmd(
            doc_path.to_string_lossy().into_owned(),
            event_path.to_string_lossy().into_owned(),
            env_file.to_string_lossy().into_owned(),
        );
        if let Commands::Flatten { unsigned, .. } = &mut cli.command {
            *unsigned = true;
        }
        run(cli).unwrap();

        let event = event::parse_event(&fs::read_to_string(&event_path).unwrap()).unwrap();
        assert_eq!(event.id, None);
        assert_eq!(event.sig, None);
        assert_eq!(event.pubkey, event::DEFAULT_PUBKEY);
    }

    #[test]
    fn run_flatten_fails_on_missing_name() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        let doc_path = dir.path().join("doc.json");
        fs::write(&doc_path, r#"{"id": "u", "type": ["LearningResource"]}"#).unwrap();

        let err = run(flatten_cmd(
            doc_path.to_string_lossy().into_owned(),
            "-".into(),
            env_file.to_string_lossy().into_owned(),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn run_unflatten_uses_env_language() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join(".env");
        fs::write(&env_file, "AMBR_LANGUAGE=fr\n").unwrap();
        let event_path = dir.path().join("event.json");
        let back_path = dir.path().join("back.json");
        fs::write(
            &event_path,
            r#"{
                "pubkey": "00",
                "kind": 30142,
                "created_at": 1,
                "tags": [["d", "u"], ["type", "LearningResource"], ["name", "n"]],
                "content": ""
            }"#,
        )
        .unwrap();

        run(Cli {
            env: env_file.to_string_lossy().into_owned(),
            command: Commands::Unflatten {
                input: event_path.to_string_lossy().into_owned(),
                output: back_path.to_string_lossy().into_owned(),
                language: None,
            },
        })
        .unwrap();

        let back = amb::parse_resource(&fs::read_to_string(&back_path).unwrap()).unwrap();
        let ctx = back.context.unwrap();
        assert_eq!(ctx[1]["@language"], "fr");
    }
}
