//! Minimal blocking JSON-RPC client for a local bitcoind.
//!
//! Only the three read calls the calculator needs: `getblockcount`,
//! `getblockhash`, `getblock`. No caching, no retries; any node failure
//! propagates and terminates the run.

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const USER_AGENT: &str = concat!("franchise-calc/", env!("CARGO_PKG_VERSION"));
const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Block record as returned by `getblock`. Fields the calculator does not
/// use (confirmations, tx list, ...) are ignored on deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub hash: String,
    pub height: u64,
    pub difficulty: f64,
    pub time: i64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<serde_json::Value>,
    error: Option<serde_json::Value>,
}

pub struct ChainClient {
    client: reqwest::blocking::Client,
    url: String,
    user: Option<String>,
    pass: Option<String>,
}

impl ChainClient {
    /// Connect to the node at `url`, probing it with `getblockcount` so an
    /// unreachable or misconfigured bitcoind fails here rather than
    /// mid-report.
    pub fn connect(url: &str, user: Option<&str>, pass: Option<&str>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(RPC_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        let chain = Self {
            client,
            url: url.to_string(),
            user: user.map(str::to_owned),
            pass: pass.map(str::to_owned),
        };
        chain.call("getblockcount", json!([]))?;
        debug!("connected to {}", chain.url);
        Ok(chain)
    }

    /// Current chain height.
    pub fn block_count(&self) -> Result<u64> {
        self.call("getblockcount", json!([]))?
            .as_u64()
            .ok_or_else(|| anyhow!("getblockcount: expected a non-negative integer"))
    }

    /// Hash of the block at `height`.
    pub fn block_hash(&self, height: i64) -> Result<String> {
        self.call("getblockhash", json!([height]))?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("getblockhash: expected a hash string"))
    }

    /// Full block record for `hash`.
    pub fn block_by_hash(&self, hash: &str) -> Result<Block> {
        let value = self.call("getblock", json!([hash]))?;
        serde_json::from_value(value).context("getblock: malformed block record")
    }

    /// Fetch the block at `height`, clamping requests above the chain tip
    /// to the latest known block. The clamp keeps the report meaningful
    /// when a period boundary lies past the tip instead of erroring.
    pub fn block_at_height(&self, height: i64, tip: u64, latest: &Block) -> Result<Block> {
        if height > tip as i64 {
            debug!("height {} is above tip {}, using latest block", height, tip);
            return Ok(latest.clone());
        }
        let hash = self.block_hash(height)?;
        self.block_by_hash(&hash)
    }

    fn call(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "franchise-calc",
            "method": method,
            "params": params,
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(user) = &self.user {
            request = request.basic_auth(user, self.pass.as_deref());
        }

        let response = request
            .send()
            .with_context(|| format!("{} request to {} failed", method, self.url))?;
        if !response.status().is_success() {
            bail!("node returned HTTP {} for {}", response.status(), method);
        }

        let rpc: RpcResponse = response
            .json()
            .with_context(|| format!("invalid JSON-RPC response for {}", method))?;
        if let Some(error) = rpc.error {
            if !error.is_null() {
                bail!("node error for {}: {}", method, error);
            }
        }
        rpc.result
            .filter(|v| !v.is_null())
            .ok_or_else(|| anyhow!("empty result for {}", method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client() -> ChainClient {
        ChainClient {
            client: reqwest::blocking::Client::new(),
            url: "http://127.0.0.1:8332".to_string(),
            user: None,
            pass: None,
        }
    }

    fn tip_block() -> Block {
        Block {
            hash: "00000000000000aa".to_string(),
            height: 300_000,
            difficulty: 1e12,
            time: 1_370_000_000,
        }
    }

    #[test]
    fn test_above_tip_clamps_to_latest() {
        // No network involved: the clamp short-circuits before any RPC.
        let chain = offline_client();
        let latest = tip_block();

        let got = chain.block_at_height(300_001, 300_000, &latest).unwrap();
        assert_eq!(got.hash, latest.hash);
        assert_eq!(got.height, latest.height);
        assert_eq!(got.time, latest.time);

        let far = chain.block_at_height(i64::MAX, 300_000, &latest).unwrap();
        assert_eq!(far.hash, latest.hash);
    }

    #[test]
    fn test_block_deserializes_from_getblock_json() {
        // Trimmed-down getblock output; extra fields must be ignored.
        let raw = r#"{
            "hash": "000000000000048b95347e83192f69cf0366076336c639f9b7228e9ba171342e",
            "confirmations": 12345,
            "size": 189925,
            "height": 227836,
            "version": 2,
            "merkleroot": "935aa0ed2e29a4b81e0c995c39e06995ecce7ddbebb26ed32d550a72e8200bf5",
            "time": 1363688772,
            "nonce": 3081746966,
            "bits": "1a02816e",
            "difficulty": 6695826.28234342,
            "tx": []
        }"#;

        let block: Block = serde_json::from_str(raw).unwrap();
        assert_eq!(block.height, 227_836);
        assert_eq!(block.time, 1_363_688_772);
        assert!((block.difficulty - 6_695_826.282_343_42).abs() < 1e-6);
        assert!(block.hash.starts_with("000000000000048b"));
    }

    #[test]
    fn test_rpc_error_member_detected() {
        let raw = r#"{"result": null, "error": {"code": -8, "message": "Block height out of range"}, "id": "franchise-calc"}"#;
        let rpc: RpcResponse = serde_json::from_str(raw).unwrap();
        assert!(rpc.error.is_some());
        assert!(rpc.result.is_none() || rpc.result.as_ref().unwrap().is_null());
    }
}
