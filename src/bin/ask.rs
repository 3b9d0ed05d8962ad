//! Command-line client for the Gift Guru server.
//! Usage: cargo run --bin ask -- --target friend --budget 1500 --interests "hiking, tea"

use clap::Parser;
use gift_guru::models::{GiftRequest, Outcome, Relation, ResponseEnvelope, Suggestion};
use gift_guru::prompt::compose_gift_prompt;
use std::process;
use std::time::Duration;

const GENERIC_ERROR: &str = "The AI returned no usable suggestions, please try again";

#[derive(Parser, Debug)]
#[command(name = "ask", about = "Ask the Gift Guru for gift ideas")]
struct Args {
    /// Who the gift is for: Partner, Friend, Family, Colleague or Other
    #[arg(long, default_value = "Partner")]
    target: Relation,

    /// Anything else worth knowing about the relationship
    #[arg(long, default_value = "")]
    detail: String,

    /// Budget in TWD
    #[arg(long, default_value_t = 6000, value_parser = clap::value_parser!(u32).range(1..))]
    budget: u32,

    #[arg(long, default_value = "")]
    interests: String,

    /// Things to avoid
    #[arg(long, default_value = "None")]
    taboos: String,

    /// Base URL of the Gift Guru server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Print the prompt the server would send instead of calling it
    #[arg(long)]
    dry_run: bool,

    #[arg(long, default_value_t = 90)]
    timeout_secs: u64,
}

impl Args {
    fn gift_request(&self) -> GiftRequest {
        GiftRequest {
            target: self.target,
            relation_detail: self.detail.clone(),
            budget: self.budget,
            interests: self.interests.clone(),
            taboos: self.taboos.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let request = args.gift_request();

    if args.dry_run {
        println!("{}", compose_gift_prompt(&request));
        return;
    }

    match ask(&args, &request).await {
        Ok(text) => println!("{}", text),
        Err(message) => {
            eprintln!("Error: {}", message);
            process::exit(1);
        }
    }
}

async fn ask(args: &Args, request: &GiftRequest) -> Result<String, String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .map_err(|e| e.to_string())?;

    let url = format!("{}/api/chat", args.server.trim_end_matches('/'));

    eprintln!("Asking the Gift Guru...");

    let res = client
        .post(&url)
        .json(&request.to_chat_envelope())
        .send()
        .await
        .map_err(|e| format!("could not reach {}: {}", url, e))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| format!("could not read response from {}: {}", url, e))?;
    let envelope = match decode_envelope(&url, &body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(e),
        // Error pages without a JSON body fall back to the status message
        Err(_) => ResponseEnvelope::default(),
    };

    render(status.as_u16(), &envelope)
}

/// Parse the server's JSON body; anything else (e.g. an HTML proxy page) is an error.
fn decode_envelope(url: &str, body: &str) -> Result<ResponseEnvelope, String> {
    serde_json::from_str(body).map_err(|e| format!("invalid response from {}: {}", url, e))
}

/// Decide what to show for a server response.
fn render(status: u16, envelope: &ResponseEnvelope) -> Result<String, String> {
    if !(200..300).contains(&status) {
        return Err(envelope
            .error
            .clone()
            .unwrap_or_else(|| format!("server responded with status {}", status)));
    }

    match envelope.outcome() {
        Outcome::Suggestions(suggestions) => Ok(format_suggestions(&suggestions)),
        Outcome::Error(message) => Err(message),
        Outcome::Empty => Err(GENERIC_ERROR.to_string()),
    }
}

fn format_suggestions(suggestions: &[Suggestion]) -> String {
    suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{}. {} ({})\n   Why: {}\n   Where to buy: {}",
                i + 1,
                s.name,
                s.price,
                s.reason,
                s.shopping_tips
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
