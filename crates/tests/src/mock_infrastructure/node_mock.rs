//! Node Mock Builder for JSON-RPC Testing
//!
//! Wraps mockito to answer the handful of node methods the ingestion pipeline calls.

use super::test_helpers::ChainBlock;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Builder for mock chain node responses.
///
/// Every mock matches on the `method` field plus the parameter that identifies the
/// requested object, so mocks for different heights never shadow each other.
pub struct NodeMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl NodeMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    #[must_use]
    pub fn url(&self) -> String {
        self.server.url()
    }

    fn method_matcher(method: &str) -> Matcher {
        Matcher::Regex(format!(r#""method"\s*:\s*"{method}""#))
    }

    fn result_body(result: &Value) -> String {
        json!({ "result": result, "error": null, "id": "minestat" }).to_string()
    }

    fn push_result(&mut self, matcher: Matcher, result: &Value) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(matcher)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(Self::result_body(result))
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_block_count(&mut self, height: u64) -> &mut Self {
        self.push_result(Self::method_matcher("getblockcount"), &json!(height))
    }

    /// Answers `getblockcount` with a 500 and a non-JSON body.
    pub fn mock_block_count_unavailable(&mut self) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Self::method_matcher("getblockcount"))
            .with_status(500)
            .with_body("node is warming up")
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_network_hashps(&mut self, hashps: f64) -> &mut Self {
        self.push_result(Self::method_matcher("getnetworkhashps"), &json!(hashps))
    }

    pub fn mock_block_hash(&mut self, height: u64, hash: &str) -> &mut Self {
        let matcher = Matcher::AllOf(vec![
            Self::method_matcher("getblockhash"),
            Matcher::Regex(format!(r#""height"\s*:\s*{height}[,}}]"#)),
        ]);
        self.push_result(matcher, &json!(hash))
    }

    /// Answers `getblockhash` for `height` with a JSON-RPC error object.
    pub fn mock_block_hash_error(&mut self, height: u64, code: i64, message: &str) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Self::method_matcher("getblockhash"),
                Matcher::Regex(format!(r#""height"\s*:\s*{height}[,}}]"#)),
            ]))
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "result": null,
                    "error": { "code": code, "message": message },
                    "id": "minestat"
                })
                .to_string(),
            )
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_block(&mut self, hash: &str, time: i64, txids: &[&str]) -> &mut Self {
        let matcher = Matcher::AllOf(vec![
            Self::method_matcher("getblock"),
            Matcher::Regex(format!(r#""blockhash"\s*:\s*"{hash}""#)),
        ]);
        self.push_result(matcher, &json!({ "hash": hash, "time": time, "tx": txids }))
    }

    /// Answers `getblock` for `hash` with a result that lacks `time` and `tx`, `expected` times.
    pub fn mock_block_malformed(&mut self, hash: &str, expected: usize) -> &mut Self {
        let mock = self
            .server
            .mock("POST", "/")
            .match_body(Matcher::AllOf(vec![
                Self::method_matcher("getblock"),
                Matcher::Regex(format!(r#""blockhash"\s*:\s*"{hash}""#)),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(Self::result_body(&json!({ "hash": hash, "tx": "unavailable" })))
            .expect(expected)
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_raw_transaction(&mut self, txid: &str, transaction: &Value) -> &mut Self {
        let matcher = Matcher::AllOf(vec![
            Self::method_matcher("getrawtransaction"),
            Matcher::Regex(format!(r#""txid"\s*:\s*"{txid}""#)),
        ]);
        self.push_result(matcher, transaction)
    }

    /// Mocks the full hash, block and transaction lookup chain for every block.
    pub fn mock_chain(&mut self, blocks: &[ChainBlock]) -> &mut Self {
        for block in blocks {
            let hash = block.hash();
            let txid = block.txid();
            self.mock_block_hash(block.height, &hash);
            self.mock_block(&hash, block.time, &[txid.as_str()]);
            self.mock_raw_transaction(&txid, &block.transaction());
        }
        self
    }

    /// Asserts every registered mock was hit as often as it expects.
    pub fn assert(&self) {
        for mock in &self.mocks {
            mock.assert();
        }
    }
}

/// Builder for mock payout collaborator responses.
pub struct PayoutMockBuilder {
    server: ServerGuard,
    mocks: Vec<Mock>,
}

impl PayoutMockBuilder {
    pub async fn new() -> Self {
        Self { server: Server::new_async().await, mocks: Vec::new() }
    }

    /// Base URL the payout client appends the address to.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}/payouts/", self.server.url())
    }

    /// Answers `GET /payouts/{address}` with `(created_at, atoms)` pairs, `expected` times.
    pub fn mock_payouts(&mut self, address: &str, payouts: &[(i64, u64)], expected: usize) -> &mut Self {
        let recent: Vec<Value> = payouts
            .iter()
            .map(|(created_at, atoms)| json!({ "CreatedAt": created_at, "Atoms": atoms }))
            .collect();

        let mock = self
            .server
            .mock("GET", format!("/payouts/{address}").as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "combined": { "RecentPayouts": recent } }).to_string())
            .expect(expected)
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn mock_unavailable(&mut self, address: &str) -> &mut Self {
        let mock = self
            .server
            .mock("GET", format!("/payouts/{address}").as_str())
            .with_status(503)
            .create();

        self.mocks.push(mock);
        self
    }

    pub fn assert(&self) {
        for mock in &self.mocks {
            mock.assert();
        }
    }
}
