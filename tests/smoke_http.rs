use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

fn pick_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn start_knotchaind(p2p_port: u16, http_port: u16) -> Child {
    let bin = env!("CARGO_BIN_EXE_knotchaind");
    Command::new(bin)
        .env("KNOTCHAIN_P2P_PORT", p2p_port.to_string())
        .env("KNOTCHAIN_HTTP_PORT", http_port.to_string())
        .env("KNOTCHAIN_PEERS", "")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn knotchaind")
}

struct KillOnDrop(Child);
impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

async fn wait_for_http(http_port: u16, timeout: Duration) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if reqwest_get(http_port, "/").await.is_some() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("http server on {http_port} did not come up in time");
}

async fn reqwest_get(http_port: u16, path: &str) -> Option<Value> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let mut stream = TcpStream::connect(("127.0.0.1", http_port)).await.ok()?;
    let req = format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n");
    stream.write_all(req.as_bytes()).await.ok()?;

    let mut resp = Vec::new();
    stream.read_to_end(&mut resp).await.ok()?;
    let resp_str = String::from_utf8_lossy(&resp);
    let json_part = resp_str.split("\r\n\r\n").nth(1)?;
    serde_json::from_str(json_part).ok()
}

async fn http_post(http_port: u16, path: &str, body: &Value) -> Option<Value> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let body_bytes = serde_json::to_vec(body).ok()?;
    let mut stream = TcpStream::connect(("127.0.0.1", http_port)).await.ok()?;
    let req = format!(
        "POST {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body_bytes.len()
    );
    stream.write_all(req.as_bytes()).await.ok()?;
    stream.write_all(&body_bytes).await.ok()?;

    let mut resp = Vec::new();
    stream.read_to_end(&mut resp).await.ok()?;
    let resp_str = String::from_utf8_lossy(&resp);
    let json_part = resp_str.split("\r\n\r\n").nth(1)?;
    serde_json::from_str(json_part).ok()
}

#[tokio::test]
async fn node_mines_and_reports_balance() {
    let p2p_port = pick_free_port();
    let http_port = pick_free_port();

    let child = start_knotchaind(p2p_port, http_port);
    let _guard = KillOnDrop(child);

    wait_for_http(http_port, Duration::from_secs(20)).await;

    let chain_before = reqwest_get(http_port, "/blockchain").await.unwrap();
    assert_eq!(chain_before["blockchain"].as_array().unwrap().len(), 1);

    let mined = reqwest_get(http_port, "/mine").await.unwrap();
    assert!(mined["block"]["index"].as_u64().unwrap() >= 1);

    let chain_after = reqwest_get(http_port, "/blockchain").await.unwrap();
    assert_eq!(chain_after["blockchain"].as_array().unwrap().len(), 2);

    let balance = reqwest_get(http_port, "/balance").await.unwrap();
    assert_eq!(balance["balance"].as_u64().unwrap(), 50);
}

#[tokio::test]
async fn transact_lands_in_mempool_then_gets_mined() {
    let p2p_port = pick_free_port();
    let http_port = pick_free_port();

    let child = start_knotchaind(p2p_port, http_port);
    let _guard = KillOnDrop(child);

    wait_for_http(http_port, Duration::from_secs(20)).await;

    // Mine once so the node's own wallet has funds to send.
    reqwest_get(http_port, "/mine").await.unwrap();

    let recipient = uuid::Uuid::new_v4().simple().to_string();
    let posted = http_post(
        http_port,
        "/transact",
        &serde_json::json!({ "recipient": recipient, "amount": 5 }),
    )
    .await
    .unwrap();
    assert!(posted["transaction"]["uuid"].is_u64() || posted["transaction"]["uuid"].is_number());

    let pending = reqwest_get(http_port, "/transactions").await.unwrap();
    assert_eq!(pending["transactions"].as_array().unwrap().len(), 1);

    let mined = reqwest_get(http_port, "/mine").await.unwrap();
    assert!(mined["block"]["data"].as_array().unwrap().len() >= 2);

    let pending_after = reqwest_get(http_port, "/transactions").await.unwrap();
    assert!(pending_after["transactions"].as_array().unwrap().is_empty());
}
