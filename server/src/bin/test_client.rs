use futures_util::{SinkExt, StreamExt};
use shared::{ClientMessage, ServerMessage};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

// Scripted probe client: connects, sets a nickname, and once a match is
// found plays a single opening move so the relay path can be observed from
// two terminals.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let nickname = std::env::args().nth(1).unwrap_or_else(|| "Tester".to_string());
    let url = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "ws://127.0.0.1:6080".to_string());

    println!("Connecting to {}", url);
    let (websocket, _) = connect_async(url.as_str()).await?;
    let (mut sink, mut stream) = websocket.split();

    // Introduce ourselves and enter matchmaking
    let hello = serde_json::to_string(&ClientMessage::SetNickname {
        nickname: nickname.clone(),
    })?;
    println!("Setting nickname: {}", nickname);
    sink.send(Message::Text(hello)).await?;

    while let Some(frame) = stream.next().await {
        let frame = frame?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => {
                println!("Server closed the connection");
                break;
            }
            other => {
                println!("Ignoring non-text frame: {:?}", other);
                continue;
            }
        };

        match serde_json::from_str::<ServerMessage>(&text) {
            Ok(ServerMessage::WaitingForOpponent) => {
                println!("Waiting for an opponent...");
            }
            Ok(ServerMessage::MatchFound {
                opponent_nickname,
                color,
            }) => {
                println!("Match found vs {}, playing as {:?}", opponent_nickname, color);

                // Send one scripted opening move
                let opening: ClientMessage = serde_json::from_str(
                    r#"{"type":"move","unitPos":{"x":0,"z":1},"targetPos":{"x":0,"z":2}}"#,
                )?;
                sink.send(Message::Text(serde_json::to_string(&opening)?))
                    .await?;
                println!("Sent opening move");
            }
            Ok(ServerMessage::OpponentMove { action }) => {
                println!("Opponent action: {:?}", action);
            }
            Ok(ServerMessage::OpponentDisconnected { message }) => {
                println!("Opponent disconnected: {}", message);
                break;
            }
            Ok(ServerMessage::Error { message }) => {
                println!("Server error: {}", message);
            }
            Err(e) => {
                println!("Failed to parse server message {:?}: {}", text, e);
            }
        }
    }

    println!("Test client finished");
    Ok(())
}
