use crate::blueprint::Blueprint;
use crate::error::{BlueprintError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Committed ledger entry, as far as resolution needs to know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub blueprint_id: String,
    /// Participant role that authored the transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<u32>,
    pub committed_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(id: impl Into<String>, blueprint_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            blueprint_id: blueprint_id.into(),
            sender: None,
            action_id: None,
            committed_at: Utc::now(),
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

static TX_ID_RE: OnceLock<Regex> = OnceLock::new();

fn tx_id_re() -> &'static Regex {
    TX_ID_RE.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{64}$").unwrap())
}

/// Transaction ids are 64 hex characters (a SHA-256 digest).
pub fn validate_tx_id(tx_id: &str) -> Result<()> {
    if !tx_id_re().is_match(tx_id) {
        return Err(BlueprintError::InvalidTransactionId(tx_id.to_string()));
    }
    Ok(())
}

/// Role and sender identities are matched against disclosure lists, so a
/// blank one is never accepted. `what` names the identity in the error.
pub fn validate_identity(what: &str, identity: &str) -> Result<()> {
    if identity.trim().is_empty() {
        return Err(BlueprintError::BlankIdentity(what.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Lookup contracts
// ---------------------------------------------------------------------------

/// Read access to committed transactions.
///
/// `Ok(None)` means the ledger answered and the id is unknown. `Err` is
/// reserved for the ledger itself being unreachable.
pub trait TransactionLookup: Send + Sync {
    fn get_transaction(&self, tx_id: &str) -> Result<Option<Transaction>>;
}

/// Read access to published blueprints.
pub trait BlueprintSource: Send + Sync {
    fn get_blueprint(&self, blueprint_id: &str) -> Result<Option<Arc<Blueprint>>>;
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// Process-local ledger view, used by the server binary and tests.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    transactions: RwLock<HashMap<String, Transaction>>,
    blueprints: RwLock<HashMap<String, Arc<Blueprint>>>,
}

fn poisoned<T>(_: T) -> BlueprintError {
    BlueprintError::Unavailable {
        service: "ledger".to_string(),
        message: "lock poisoned".to_string(),
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_transaction(&self, tx: Transaction) -> Result<()> {
        validate_tx_id(&tx.id)?;
        if let Some(sender) = &tx.sender {
            validate_identity("transaction sender", sender)?;
        }
        self.transactions
            .write()
            .map_err(poisoned)?
            .insert(tx.id.clone(), tx);
        Ok(())
    }

    pub fn publish_blueprint(&self, blueprint: Blueprint) -> Result<()> {
        blueprint.validate_identities()?;
        self.blueprints
            .write()
            .map_err(poisoned)?
            .insert(blueprint.id.clone(), Arc::new(blueprint));
        Ok(())
    }

    /// Publish every `.yaml`, `.yml` and `.json` blueprint in `dir`.
    /// Returns the number loaded.
    pub fn load_blueprints(&self, dir: &Path) -> Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e, "yaml" | "yml" | "json"))
            })
            .collect();
        paths.sort();

        for path in &paths {
            let blueprint = Blueprint::load(path)?;
            tracing::debug!(blueprint = %blueprint.id, path = %path.display(), "loaded blueprint");
            self.publish_blueprint(blueprint)?;
        }
        Ok(paths.len())
    }
}

impl TransactionLookup for MemoryLedger {
    fn get_transaction(&self, tx_id: &str) -> Result<Option<Transaction>> {
        Ok(self.transactions.read().map_err(poisoned)?.get(tx_id).cloned())
    }
}

impl BlueprintSource for MemoryLedger {
    fn get_blueprint(&self, blueprint_id: &str) -> Result<Option<Arc<Blueprint>>> {
        Ok(self.blueprints.read().map_err(poisoned)?.get(blueprint_id).cloned())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
