//! Thin HTTP collaborator surface over the core library: liveness, chain
//! inspection, mining, and transacting. Not part of the gossip protocol —
//! a local operator's front door to their own node.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::blockchain::chain::Blockchain;
use crate::mempool::Mempool;
use crate::net::server::P2PServer;
use crate::transaction::Transaction;
use crate::wallet::Wallet;

pub struct HttpState {
    pub blockchain: Arc<Mutex<Blockchain>>,
    pub mempool: Arc<Mutex<Mempool>>,
    pub wallet: Arc<Wallet>,
    pub p2p: Arc<P2PServer>,
}

fn json_response(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("response builder never fails on well-formed input")
}

async fn handle(
    state: Arc<HttpState>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method().clone(), req.uri().path()) {
        (Method::GET, "/") => json_response(StatusCode::OK, json!("knotchain node is running")),
        (Method::GET, "/blockchain") => {
            let chain = state.blockchain.lock().await;
            json_response(StatusCode::OK, json!({ "blockchain": chain.chain }))
        }
        (Method::GET, "/mine") => match mine(&state).await {
            Ok(block) => json_response(StatusCode::OK, json!({ "block": block })),
            Err(err) => json_response(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": err })),
        },
        (Method::POST, "/transact") => {
            let body = match req.collect().await {
                Ok(b) => b.to_bytes(),
                Err(_) => {
                    return Ok(json_response(
                        StatusCode::BAD_REQUEST,
                        json!({ "error": "could not read request body" }),
                    ));
                }
            };
            match transact(&state, &body).await {
                Ok(transaction) => json_response(StatusCode::OK, json!({ "transaction": transaction })),
                Err(err) => json_response(StatusCode::BAD_REQUEST, json!({ "error": err })),
            }
        }
        (Method::GET, "/balance") => {
            let balance = state.wallet.balance(&*state.blockchain.lock().await);
            json_response(
                StatusCode::OK,
                json!({ "address": state.wallet.address, "balance": balance }),
            )
        }
        (Method::GET, "/addresses") => {
            let chain = state.blockchain.lock().await;
            let mut addresses: std::collections::HashSet<String> = std::collections::HashSet::new();
            for block in chain.chain.iter() {
                for transaction in block.data.iter() {
                    addresses.extend(transaction.output.keys().cloned());
                }
            }
            json_response(StatusCode::OK, json!({ "addresses": addresses }))
        }
        (Method::GET, "/transactions") => {
            let transactions = state.mempool.lock().await.data();
            json_response(StatusCode::OK, json!({ "transactions": transactions }))
        }
        _ => json_response(StatusCode::NOT_FOUND, json!({ "error": "not found" })),
    };
    Ok(response)
}

async fn mine(state: &HttpState) -> Result<crate::blockchain::block::Block, String> {
    let blockchain = state.blockchain.clone();
    let mempool = state.mempool.clone();
    let wallet = state.wallet.clone();

    // Mining is CPU-bound proof-of-work; running it inline on the async
    // reactor would stall every other request and the P2P event loop for
    // as long as mining takes.
    let block = tokio::task::spawn_blocking(move || {
        let mut chain_guard = blockchain.blocking_lock();
        let mut mempool_guard = mempool.blocking_lock();
        crate::miner::mine_pending(&mut chain_guard, &mut mempool_guard, &wallet)
    })
    .await
    .map_err(|e| e.to_string())?
    .map_err(|e| e.to_string())?;

    state.p2p.broadcast_chain().await.map_err(|e| e.to_string())?;
    Ok(block)
}

async fn transact(state: &HttpState, body: &[u8]) -> Result<Transaction, String> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    let recipient = payload
        .get("recipient")
        .and_then(Value::as_str)
        .ok_or("missing recipient")?
        .to_string();
    let amount = payload
        .get("amount")
        .and_then(Value::as_u64)
        .ok_or("missing amount")?;

    let balance = state.wallet.balance(&*state.blockchain.lock().await);
    let mut mempool = state.mempool.lock().await;

    let transaction = if let Some(existing) = mempool.get_by_sender_mut(&state.wallet.address) {
        existing
            .update(&state.wallet, &recipient, amount)
            .map_err(|e| e.to_string())?;
        existing.clone()
    } else {
        let tx = Transaction::create(&state.wallet, &recipient, amount, balance)
            .map_err(|e| e.to_string())?;
        mempool.add(tx.clone());
        tx
    };

    drop(mempool);
    state
        .p2p
        .broadcast_transaction(&transaction)
        .await
        .map_err(|e| e.to_string())?;
    Ok(transaction)
}

/// Serve the HTTP collaborator surface on `port` until the process exits.
pub async fn serve(state: Arc<HttpState>, port: u16) -> Result<(), std::io::Error> {
    let addr: SocketAddr = format!("127.0.0.1:{port}").parse().expect("valid bind address");
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "http server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { handle(state, req).await }
            });
            if let Err(err) = hyper::server::conn::http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                error!(%err, "http connection error");
            }
        });
    }
}
