//! End-to-end tests: a real client session against a local WebSocket server.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use remo_chat::{client, server, transport, ChatClient, ChatError, HtmlRenderer, Role};

const SESSION_TIMEOUT: Duration = Duration::from_secs(10);

async fn start_echo_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve_on(listener, Duration::ZERO));
    addr
}

fn endpoint(addr: std::net::SocketAddr) -> String {
    format!("ws://{}/ws/events", addr)
}

async fn run_session(
    addr: std::net::SocketAddr,
    input: &'static [u8],
) -> (ChatClient<HtmlRenderer>, Result<(), ChatError>) {
    let ws = transport::connect(&endpoint(addr)).await.unwrap();
    let mut chat = ChatClient::new(HtmlRenderer::new());
    let result = tokio::time::timeout(SESSION_TIMEOUT, client::run(&mut chat, ws, input))
        .await
        .expect("session timed out");
    (chat, result)
}

// ---------------------------------------------------------------------------
// Echo server
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_echo_session_renders_streamed_reply() {
    let addr = start_echo_server().await;
    let (chat, result) = run_session(addr, b"hello streaming world\n").await;
    result.unwrap();

    let conv = chat.conversation();
    let user = conv.entries().iter().find(|e| e.role == Role::User).unwrap();
    assert_eq!(user.text, "hello streaming world");

    let bot = conv.get(Role::Bot, &user.query_id).unwrap();
    assert_eq!(bot.text, "hello streaming world");
    assert!(bot.complete);
    assert!(chat.renderer().document().contains("chat bot complete"));
}

#[tokio::test]
async fn test_echo_session_multiple_queries() {
    let addr = start_echo_server().await;
    let (chat, result) = run_session(addr, b"one\ntwo words\n").await;
    result.unwrap();

    let conv = chat.conversation();
    let users: Vec<_> = conv.entries().iter().filter(|e| e.role == Role::User).collect();
    assert_eq!(users.len(), 2);
    assert_ne!(users[0].query_id, users[1].query_id);
    for user in users {
        let bot = conv.get(Role::Bot, &user.query_id).unwrap();
        assert_eq!(bot.text, user.text);
        assert!(bot.complete);
    }
}

#[tokio::test]
async fn test_blank_lines_are_not_sent() {
    let addr = start_echo_server().await;
    let (chat, result) = run_session(addr, b"\n   \nhi\n").await;
    result.unwrap();
    let users = chat
        .conversation()
        .entries()
        .iter()
        .filter(|e| e.role == Role::User)
        .count();
    assert_eq!(users, 1);
}

#[tokio::test]
async fn test_invalid_utf8_line_does_not_end_session() {
    let addr = start_echo_server().await;
    let (chat, result) = run_session(addr, b"caf\xe9\nhello\n").await;
    result.unwrap();

    let conv = chat.conversation();
    let users: Vec<_> = conv.entries().iter().filter(|e| e.role == Role::User).collect();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].text, "caf\u{fffd}");
    assert_eq!(users[1].text, "hello");

    let bot = conv.get(Role::Bot, &users[1].query_id).unwrap();
    assert_eq!(bot.text, "hello");
    assert!(bot.complete);
}

#[tokio::test]
async fn test_crlf_lines_are_trimmed() {
    let addr = start_echo_server().await;
    let (chat, result) = run_session(addr, b"windows line\r\n").await;
    result.unwrap();
    let user = chat.conversation().entries().iter().find(|e| e.role == Role::User).unwrap();
    assert_eq!(user.text, "windows line");
}

#[tokio::test]
async fn test_empty_input_ends_session_cleanly() {
    let addr = start_echo_server().await;
    let (chat, result) = run_session(addr, b"").await;
    result.unwrap();
    assert!(chat.conversation().entries().is_empty());
}

#[tokio::test]
async fn test_connect_to_wrong_path_fails() {
    let addr = start_echo_server().await;
    let err = transport::connect(&format!("ws://{}/ws/other", addr))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::WebSocket(_)));
}

// ---------------------------------------------------------------------------
// Scripted servers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_server_close_ends_session_with_connection_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _ = ws.next().await;
        let _ = ws.close(None).await;
    });

    let (chat, result) = run_session(addr, b"anyone there?\n").await;
    assert!(matches!(result, Err(ChatError::ConnectionClosed)));
    assert!(chat.has_pending());
}

#[tokio::test]
async fn test_bad_frames_are_dropped_and_session_continues() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let Some(Ok(WsMessage::Text(text))) = ws.next().await else {
            return;
        };
        let sent: serde_json::Value = serde_json::from_str(&text).unwrap();
        let query_id = sent["queryId"].as_str().unwrap().to_string();

        let frames = [
            "not json".to_string(),
            "{}".to_string(),
            serde_json::json!({"message_type": "status", "busy": true}).to_string(),
            serde_json::json!({"message_type": "Response-Tokens", "queryId": query_id, "tokens": "still "}).to_string(),
            serde_json::json!({"message_type": "response-tokens", "queryUuid": query_id, "tokens": "here", "isComplete": true}).to_string(),
        ];
        for frame in frames {
            ws.send(WsMessage::Text(frame)).await.unwrap();
        }
        while ws.next().await.is_some() {}
    });

    let (chat, result) = run_session(addr, b"ping\n").await;
    result.unwrap();

    let conv = chat.conversation();
    let user = conv.entries().iter().find(|e| e.role == Role::User).unwrap();
    let bot = conv.get(Role::Bot, &user.query_id).unwrap();
    assert_eq!(bot.text, "still here");
    assert!(bot.complete);
}
