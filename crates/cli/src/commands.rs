// Subcommand implementations

use std::collections::HashSet;

use chronicle_core::event::{AgentEvent, SESSION_STARTED};
use chronicle_core::StreamName;
use chronicle_engine::Engine;
use chronicle_store::EventStore;

use crate::config::AppConfig;
use crate::output::{self, ShowFormat};

/// `chronicle start <message>`
pub async fn start(engine: &Engine, message: &str) -> anyhow::Result<()> {
    let thread_id = engine.start_session(message).await?;
    println!("started session {thread_id}");

    let state = engine.process_thread(&thread_id).await?;
    print_turn(engine, &thread_id).await?;
    println!("\n{}", output::render_session_state(&state));
    Ok(())
}

/// `chronicle message <thread-id> <text>`
pub async fn message(engine: &Engine, thread_id: &str, text: &str) -> anyhow::Result<()> {
    engine.add_user_message(thread_id, text).await?;
    let state = engine.process_thread(thread_id).await?;
    print_turn(engine, thread_id).await?;
    println!("\n{}", output::render_session_state(&state));
    Ok(())
}

/// `chronicle continue <thread-id>`
pub async fn resume(engine: &Engine, thread_id: &str) -> anyhow::Result<()> {
    let state = engine.process_thread(thread_id).await?;
    print_turn(engine, thread_id).await?;
    println!("\n{}", output::render_session_state(&state));
    Ok(())
}

/// `chronicle show <thread-id> [--format json|text] [--full]`
pub async fn show(
    store: &dyn EventStore,
    config: &AppConfig,
    thread_id: &str,
    format: ShowFormat,
    full: bool,
) -> anyhow::Result<()> {
    let stream = stream_name(config, thread_id)?;
    let events = store.read_all(&stream.to_string(), 0).await?;
    if events.is_empty() {
        anyhow::bail!("no events found for session '{thread_id}'");
    }
    println!("{}", output::render_events(&events, format, full));
    Ok(())
}

/// `chronicle list [--limit N]`
pub async fn list(store: &dyn EventStore, config: &AppConfig, limit: usize) -> anyhow::Result<()> {
    let category = format!("{}:{}", config.engine.category, config.engine.version);
    let events = store.read_category(&category, 0, 1000).await?;

    // Newest sessions first, one line per SessionStarted.
    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for event in events.iter().rev() {
        if event.kind != SESSION_STARTED {
            continue;
        }
        if let AgentEvent::SessionStarted(data) = event.payload() {
            if seen.insert(data.thread_id.clone()) {
                lines.push(format!(
                    "{}  {}",
                    event.time.format("%Y-%m-%d %H:%M:%S"),
                    data.thread_id
                ));
                if lines.len() >= limit {
                    break;
                }
            }
        }
    }

    if lines.is_empty() {
        println!("no sessions found");
    } else {
        println!("{}", lines.join("\n"));
    }
    Ok(())
}

async fn print_turn(engine: &Engine, thread_id: &str) -> anyhow::Result<()> {
    // Re-read to show the reply that processing just appended.
    let stream = StreamName::new(
        &engine.config().category,
        &engine.config().version,
        thread_id,
    )?;
    let events = engine_store_read(engine, &stream).await?;
    if let Some(reply) = output::final_response(&events) {
        println!("\n{reply}");
    }
    Ok(())
}

fn stream_name(config: &AppConfig, thread_id: &str) -> anyhow::Result<StreamName> {
    Ok(StreamName::new(
        &config.engine.category,
        &config.engine.version,
        thread_id,
    )?)
}

async fn engine_store_read(
    engine: &Engine,
    stream: &StreamName,
) -> anyhow::Result<Vec<chronicle_core::RecordedEvent>> {
    Ok(engine.store().read_all(&stream.to_string(), 0).await?)
}
