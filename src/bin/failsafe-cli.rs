//! failsafe-cli – interactive shell over one in-process failsafe queue.
//
//  $ failsafe-cli --config failsafe.toml
//  > put 7 chat hello
//  > peek
//  > take 1
use std::sync::Arc;

use clap::Parser;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use failsafe_queue::logging::init_logging_with;
use failsafe_queue::{
    Config, EntryPayload, IdGenerator, KeyQos, MsgUnit, Priority, QueueEntry, QueueManager,
    QueueMetrics, SizeListener, StorageId, StorageQueue, WatchSizeListener,
};

#[derive(Debug, Parser)]
#[command(name = "failsafe-cli", version, about = "Inspect failsafe queue behavior")]
struct Cli {
    /// Path to a TOML or YAML config (env FAILSAFE_CONFIG is used otherwise)
    #[arg(short, long)]
    config: Option<String>,

    /// Storage id of the queue, `relating:postfix`
    #[arg(short, long, default_value = "connection:cli")]
    storage: String,
}

const HELP: &str = "\
put [-p] <prio> <key> <content..> | sub <key> | unsub <key> | connect | disconnect
peek [n] [bytes] | same [n] [bytes] | take [n] [bytes] | lowest [n] [bytes] [leave]
remove-to <n> | clear | dump | stats | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;
    init_logging_with(&cfg.log_filter);

    let manager = QueueManager::new();
    let storage_id = StorageId::parse(&cli.storage)?;
    let queue = manager.get_or_create(&storage_id, cfg.queue.clone())?;

    let metrics = Arc::new(QueueMetrics::new());
    queue.add_size_listener(Arc::clone(&metrics) as Arc<dyn SizeListener>);

    let (watcher, mut rx) = WatchSizeListener::new(queue.size());
    queue.add_size_listener(Arc::new(watcher));
    let size_logger = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let size = *rx.borrow_and_update();
            debug!(entries = size.entries, bytes = size.bytes, "queue size changed");
        }
    });

    println!(
        "Queue {} ({} {}), max {} entries / {} bytes. Type `help` for commands.",
        storage_id,
        queue.queue_type(),
        queue.version(),
        cfg.queue.max_entries,
        cfg.queue.max_bytes
    );

    repl(queue.as_ref(), &metrics, cfg.queue.persistent)?;

    manager.shutdown_all();
    size_logger.abort();
    Ok(())
}

fn repl(queue: &dyn StorageQueue, metrics: &QueueMetrics, persistent: bool) -> anyhow::Result<()> {
    let mut rl: Editor<(), DefaultHistory> = DefaultEditor::new()?;
    let ids = IdGenerator::new();

    loop {
        let Ok(line) = rl.readline("> ") else { break };
        let _ = rl.add_history_entry(line.as_str());

        let words = line.split_whitespace().collect::<Vec<_>>();
        let result = match words.as_slice() {
            [] => Ok(()),
            ["help"] => {
                println!("{HELP}");
                Ok(())
            }
            ["exit" | "quit"] => break,

            ["put", "-p", prio, key, rest @ ..] => {
                put_publish(queue, &ids, prio, key, rest, persistent)
            }
            ["put", prio, key, rest @ ..] => put_publish(queue, &ids, prio, key, rest, false),
            ["sub", key] => put_payload(
                queue,
                &ids,
                EntryPayload::Subscribe(KeyQos::new(*key, "")),
                persistent,
            ),
            ["unsub", key] => put_payload(
                queue,
                &ids,
                EntryPayload::Unsubscribe(KeyQos::new(*key, "")),
                persistent,
            ),
            ["connect"] => put_payload(
                queue,
                &ids,
                EntryPayload::Connect { qos: String::new() },
                persistent,
            ),
            ["disconnect"] => put_payload(
                queue,
                &ids,
                EntryPayload::Disconnect { qos: String::new() },
                persistent,
            ),

            ["peek", rest @ ..] => limits(rest).map(|(n, bytes)| print_entries(&queue.peek_n(n, bytes))),
            ["same", rest @ ..] => {
                limits(rest).map(|(n, bytes)| print_entries(&queue.peek_same_priority(n, bytes)))
            }
            ["take", rest @ ..] => limits(rest)
                .and_then(|(n, bytes)| Ok(queue.take(n, bytes)?))
                .map(|taken| print_entries(&taken)),
            ["lowest", rest @ ..] => {
                let leave_one = rest.get(2).map(|s| *s == "leave").unwrap_or(false);
                limits(&rest[..rest.len().min(2)])
                    .and_then(|(n, bytes)| Ok(queue.take_lowest(n, bytes, None, leave_one)?))
                    .map(|taken| print_entries(&taken))
            }
            ["remove-to", n] => remove_to(queue, n),
            ["clear"] => {
                println!("removed {} entries", queue.clear());
                Ok(())
            }
            ["dump"] => {
                print!("{}", queue.debug_dump(""));
                Ok(())
            }
            ["stats"] => {
                print!("{}", metrics.snapshot(queue.storage_id().as_str()));
                Ok(())
            }

            _ => {
                println!("Unknown cmd. Type `help`.");
                Ok(())
            }
        };

        if let Err(e) = result {
            println!("error: {e}");
        }
    }
    Ok(())
}

fn put_publish(
    queue: &dyn StorageQueue,
    ids: &IdGenerator,
    prio: &str,
    key: &str,
    content: &[&str],
    persistent: bool,
) -> anyhow::Result<()> {
    let priority = Priority::new(prio.parse()?)?;
    let unit = MsgUnit::new(key, content.join(" "), "");
    let entry = Arc::new(QueueEntry::new(ids, priority, persistent, EntryPayload::Publish(unit)));
    queue.put(Arc::clone(&entry), false)?;
    println!("queued {entry} ({} bytes)", entry.size_in_bytes());
    Ok(())
}

fn put_payload(
    queue: &dyn StorageQueue,
    ids: &IdGenerator,
    payload: EntryPayload,
    persistent: bool,
) -> anyhow::Result<()> {
    let entry = Arc::new(QueueEntry::new(ids, Priority::default(), persistent, payload));
    queue.put(Arc::clone(&entry), false)?;
    println!("queued {entry}");
    Ok(())
}

/// Removes the first `n` entries in queue order.
fn remove_to(queue: &dyn StorageQueue, n: &str) -> anyhow::Result<()> {
    let n: i64 = n.parse()?;
    match queue.peek_n(n, -1).last() {
        Some(boundary) => println!("removed {} entries", queue.remove_up_to(boundary, true)),
        None => println!("queue is empty"),
    }
    Ok(())
}

/// `[n] [bytes]`, both unbounded (`-1`) when missing.
fn limits(args: &[&str]) -> anyhow::Result<(i64, i64)> {
    let n = args.first().map(|s| s.parse::<i64>()).transpose()?.unwrap_or(-1);
    let bytes = args.get(1).map(|s| s.parse::<i64>()).transpose()?.unwrap_or(-1);
    Ok((n, bytes))
}

fn print_entries(entries: &[Arc<QueueEntry>]) {
    if entries.is_empty() {
        println!("(none)");
    }
    for entry in entries {
        println!("{entry} ({} bytes)", entry.size_in_bytes());
    }
}
