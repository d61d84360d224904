//! Interactive line-based client for poking at a running server.
//!
//! ```text
//! RETRO_CLIENT_URL=ws://127.0.0.1:10000 RETRO_ROOM=demo RETRO_USER=alice \
//!     cargo run -p retro-server --example ws_client
//! ```

use std::env;
use std::error::Error;

use futures_util::{SinkExt, StreamExt};
use retro_core::{Category, Item, Operation, Position, ServerEvent};
use retro_protocol::{decode_output, encode_input, Handshake};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base = env::var("RETRO_CLIENT_URL").unwrap_or_else(|_| "ws://127.0.0.1:10000".to_string());
    let room = env::var("RETRO_ROOM").unwrap_or_else(|_| "demo".to_string());
    let user = env::var("RETRO_USER").unwrap_or_else(|_| "guest".to_string());

    let url = format!("{}/?{}", base, Handshake::new(room, user).to_query());
    println!("Connecting to {}...", url);
    let (ws, _) = connect_async(url).await?;
    println!("Connected.");
    println!("Commands:");
    println!("  add <category> <id> <text...>");
    println!("  rm <category> <id>");
    println!("  mv <id> <from-category> <from-index> <to-category> <to-index>");
    println!("  like <category> <id>");
    println!("  hide");
    println!("Categories: went_well, to_improve, action_items. Type 'quit' to leave.\n");

    let (mut sink, mut stream) = ws.split();

    // Print everything the server sends.
    let reader = tokio::spawn(async move {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => match decode_output(text.as_str()) {
                    Ok(event) => print_event(&event),
                    Err(e) => eprintln!("undecodable event: {e}"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    eprintln!("read error: {e}");
                    break;
                }
            }
        }
        println!("<< connection closed");
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            break;
        }

        match parse_command(trimmed) {
            Some(op) => sink.send(Message::text(encode_input(&op)?)).await?,
            None => eprintln!("Could not parse command."),
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    let _ = reader.await;
    Ok(())
}

fn parse_command(line: &str) -> Option<Operation> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;

    match command {
        "add" => {
            let category: Category = parts.next()?.parse().ok()?;
            let id = parts.next()?;
            let content = parts.collect::<Vec<_>>().join(" ");
            Some(Operation::AddItem {
                category,
                item: Item::new(id, content, ""),
            })
        }
        "rm" => Some(Operation::RemoveItem {
            category: parts.next()?.parse().ok()?,
            item_id: parts.next()?.to_string(),
        }),
        "mv" => {
            let item_id = parts.next()?.to_string();
            let source = Position::new(parts.next()?.parse().ok()?, parts.next()?.parse().ok()?);
            let destination = Position::new(parts.next()?.parse().ok()?, parts.next()?.parse().ok()?);
            Some(Operation::MoveItem {
                source,
                destination,
                item_id,
            })
        }
        "like" => Some(Operation::ToggleLike {
            category: parts.next()?.parse().ok()?,
            item_id: parts.next()?.to_string(),
        }),
        "hide" => Some(Operation::ToggleVisibility),
        _ => None,
    }
}

fn print_event(event: &ServerEvent) {
    match event {
        ServerEvent::InitialState(snapshot) => {
            println!(
                "<< initial-state owner={} hidden={} items={}",
                snapshot.is_owner,
                snapshot.is_hidden,
                snapshot.items.total()
            );
            for category in Category::ALL {
                for item in snapshot.items.items(category) {
                    println!("   [{}] {} {:?} by {}", category, item.id, item.content, item.author);
                }
            }
        }
        ServerEvent::ItemAdded { category, item } => {
            println!("<< item-added [{}] {} {:?} by {}", category, item.id, item.content, item.author)
        }
        ServerEvent::ItemMoved {
            source,
            destination,
            item,
        } => println!(
            "<< item-moved {} {}[{}] -> {}[{}]",
            item.id, source.category, source.index, destination.category, destination.index
        ),
        other => println!("<< {} {:?}", other.kind(), other),
    }
}
