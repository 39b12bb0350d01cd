//! Podforge CLI: run the podcast pipeline once from the command line.

use anyhow::Result;
use podforge_core::{
    resolve_backend, BackendSettings, GeminiGenerator, Gender, OneOrMany, Pipeline,
    PodcastRequest,
};
use std::path::PathBuf;
use std::sync::Arc;

struct Args {
    topic: String,
    host: String,
    guests: Vec<String>,
    info: Option<String>,
    host_gender: Option<Gender>,
    guest_gender: Option<Gender>,
    audio_dir: PathBuf,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = parse_args(&std::env::args().collect::<Vec<_>>())?;

    let api_key = std::env::var("GEMINI_API_KEY")
        .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY is not set"))?;
    std::fs::create_dir_all(&args.audio_dir)?;

    let backend = resolve_backend(&BackendSettings::from_env());
    let pipeline = Pipeline::new(
        Arc::new(GeminiGenerator::new(api_key)),
        backend,
        &args.audio_dir,
    );

    let request = PodcastRequest {
        topic: args.topic,
        host: args.host,
        guestname: if args.guests.is_empty() {
            None
        } else {
            Some(OneOrMany::Many(args.guests))
        },
        info: args.info,
        host_gender: args.host_gender,
        guest_gender: args.guest_gender,
    };

    let response = pipeline.run(request).await?;
    println!("{}", serde_json::to_string_pretty(&response.script)?);

    let generated = args
        .audio_dir
        .join(response.audio.trim_start_matches("/audio/"));
    let final_path = match args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::rename(&generated, &path)?;
            path
        }
        None => generated,
    };
    eprintln!("Wrote podcast to {}", final_path.display());
    Ok(())
}

fn parse_gender(s: &str) -> Gender {
    match s.to_ascii_lowercase().as_str() {
        "male" => Gender::Male,
        "female" => Gender::Female,
        _ => Gender::Unspecified,
    }
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut topic = None;
    let mut host = None;
    let mut guests = Vec::new();
    let mut info = None;
    let mut host_gender = None;
    let mut guest_gender = None;
    let mut audio_dir = PathBuf::from("audio");
    let mut output = None;

    let mut i = 1;
    while i < args.len() {
        let take_value = |i: &mut usize| -> Result<String> {
            *i += 1;
            args.get(*i)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("missing value for {}", args[*i - 1]))
        };
        match args[i].as_str() {
            "--topic" | "-t" => topic = Some(take_value(&mut i)?),
            "--host" | "-H" => host = Some(take_value(&mut i)?),
            "--guest" | "-g" => guests.push(take_value(&mut i)?),
            "--info" => info = Some(take_value(&mut i)?),
            "--host-gender" => host_gender = Some(parse_gender(&take_value(&mut i)?)),
            "--guest-gender" => guest_gender = Some(parse_gender(&take_value(&mut i)?)),
            "--audio-dir" => audio_dir = PathBuf::from(take_value(&mut i)?),
            "--output" | "-o" => output = Some(PathBuf::from(take_value(&mut i)?)),
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    Ok(Args {
        topic: topic.ok_or_else(|| anyhow::anyhow!("--topic is required"))?,
        host: host.ok_or_else(|| anyhow::anyhow!("--host is required"))?,
        guests,
        info,
        host_gender,
        guest_gender,
        audio_dir,
        output,
    })
}

fn print_usage() {
    eprintln!(
        "Usage: podforge-cli --topic TOPIC --host NAME [options]\n\
         \n\
         Options:\n\
           -t, --topic TOPIC          podcast topic (required)\n\
           -H, --host NAME            host name (required)\n\
           -g, --guest NAME           guest name (repeatable)\n\
               --info TEXT            extra background for the script\n\
               --host-gender GENDER   male | female\n\
               --guest-gender GENDER  male | female\n\
               --audio-dir DIR        working directory for clips (default: audio)\n\
           -o, --output PATH          move the final MP3 here"
    );
}
