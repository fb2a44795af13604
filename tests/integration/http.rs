//! End-to-end requests against a running server.

use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::oneshot;

use wager_ledger::api::{self, routes::ApiState};
use wager_ledger::engine::IngestionService;

use crate::common::{TestDb, IDENTITY};

struct Server {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Server {
    async fn start(db: &TestDb) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let state = Arc::new(ApiState {
            ingestion: IngestionService::new(db.pool.clone(), IDENTITY),
        });
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(api::serve(listener, state, async {
            let _ = rx.await;
        }));
        Self {
            base_url,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn submit(&self, state: &str, amount: &str, bet_id: &str, source: &str) -> StatusCode {
        reqwest::Client::new()
            .post(format!("{}/bet", self.base_url))
            .header("Source-Type", source)
            .json(&serde_json::json!({ "state": state, "amount": amount, "betId": bet_id }))
            .send()
            .await
            .unwrap()
            .status()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap().unwrap();
    }
}

struct Case {
    name: &'static str,
    state: &'static str,
    amount: &'static str,
    bet_id: &'static str,
    source: &'static str,
    expected: StatusCode,
}

#[tokio::test]
async fn request_table() {
    let db = TestDb::new().await;
    let server = Server::start(&db).await;

    let cases = [
        Case { name: "ok win", state: "win", amount: "15.5", bet_id: "1", source: "game", expected: StatusCode::OK },
        Case { name: "ok lost", state: "lost", amount: "15.5", bet_id: "2", source: "game", expected: StatusCode::OK },
        Case { name: "bad lost", state: "lost", amount: "15.5", bet_id: "3", source: "game", expected: StatusCode::BAD_REQUEST },
        Case { name: "ok source server", state: "win", amount: "15.5", bet_id: "4", source: "server", expected: StatusCode::OK },
        Case { name: "ok source payment", state: "win", amount: "15.5", bet_id: "5", source: "payment", expected: StatusCode::OK },
        Case { name: "bad source", state: "win", amount: "15.5", bet_id: "6", source: "asdf", expected: StatusCode::BAD_REQUEST },
        Case { name: "bad outcome", state: "draw", amount: "15.5", bet_id: "7", source: "game", expected: StatusCode::BAD_REQUEST },
        Case { name: "bad amount", state: "win", amount: "x", bet_id: "8", source: "game", expected: StatusCode::INTERNAL_SERVER_ERROR },
    ];

    for case in &cases {
        let status = server.submit(case.state, case.amount, case.bet_id, case.source).await;
        assert_eq!(status, case.expected, "case {:?}", case.name);
    }
    assert_eq!(db.balance().await, 31_000);

    // Resubmitting the first case succeeds without touching the balance.
    let first = &cases[0];
    let status = server.submit(first.state, first.amount, first.bet_id, first.source).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.balance().await, 31_000);
    assert_eq!(db.bet_count().await, 4);

    server.stop().await;
}
