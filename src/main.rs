use anyhow::{Context, bail};
use tire_search::config::loader::ConfigLoader;
use tire_search::observability::init_tracing;
use tire_search::services::{SearchSessionState, create_search_session};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config).context("invalid configuration")?;
    let _log_guard = init_tracing(&config.logging);

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        bail!("usage: tire-search <query words...>");
    }

    info!(base_url = %config.gateway.base_url, "Starting tire search");
    let session = create_search_session(&config)?;

    if let Err(e) = session.validate(&query) {
        bail!("{e}");
    }
    session.search(&query, None).await;

    print_state(&session.snapshot());
    Ok(())
}

fn print_state(state: &SearchSessionState) {
    if let Some(error) = &state.error {
        eprintln!("{error}");
        return;
    }

    if state.conversation.active {
        if let Some(message) = &state.message {
            println!("{message}");
        }
        for question in state.conversation.pending_questions() {
            println!("? {} [{}]", question.question, question.field);
            for option in &question.options {
                println!("    {} = {}", option.value, option.label);
            }
        }
        return;
    }

    println!("Найдено: {} (показано {})", state.total, state.results.len());
    for item in &state.results {
        let sizes: Vec<String> = item.stock_sizes().map(ToString::to_string).collect();
        println!("{:>8}  {}  {}", item.id, item.title(), sizes.join(", "));
    }
    if state.has_more {
        println!("…");
    }
    if !state.hints.is_empty() {
        println!("Подсказки: {}", state.hints.join("; "));
    }
}
