//! # Ledger
//!
//! Wires the services around one store, one clock and one folio gate.

use std::sync::Arc;
use tally_db::Database;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::documents::DocumentRecorder;
use crate::error::LedgerResult;
use crate::reconciliation::ReconciliationEngine;
use crate::sequence::SequenceAuthority;
use crate::store::LedgerStore;

/// The engine's services, sharing one [`SequenceAuthority`].
#[derive(Debug, Clone)]
pub struct Ledger {
    sequence: SequenceAuthority,
    documents: DocumentRecorder,
    reconciliation: ReconciliationEngine,
}

impl Ledger {
    /// Opens the configured SQLite database and runs migrations.
    pub async fn open(config: &LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;

        let db_config = config.db_config();
        if !db_config.is_in_memory() {
            if let Some(parent) = db_config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let db = Database::new(db_config).await?;
        info!(
            branch = config.terminal.branch,
            register = config.terminal.register,
            "Ledger opened"
        );
        Ok(Self::with_store(Arc::new(db), Arc::new(SystemClock), config))
    }

    /// Builds the services over any store and clock.
    pub fn with_store(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        config: &LedgerConfig,
    ) -> Self {
        let sequence = SequenceAuthority::new(
            store.clone(),
            clock.clone(),
            config.sequence.max_collision_retries,
        );
        let documents = DocumentRecorder::new(store.clone(), sequence.clone(), config.terminal);
        let reconciliation = ReconciliationEngine::new(
            store,
            clock,
            sequence.clone(),
            config.terminal.register,
            config.reconciliation.allow_late_movements,
        );

        Ledger {
            sequence,
            documents,
            reconciliation,
        }
    }

    pub fn sequence(&self) -> &SequenceAuthority {
        &self.sequence
    }

    pub fn documents(&self) -> &DocumentRecorder {
        &self.documents
    }

    pub fn reconciliation(&self) -> &ReconciliationEngine {
        &self.reconciliation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseSettings;
    use std::path::PathBuf;
    use tally_core::{FolioKind, Money};

    #[tokio::test]
    async fn test_open_in_memory() {
        let config = LedgerConfig {
            database: DatabaseSettings {
                path: Some(PathBuf::from(":memory:")),
                ..DatabaseSettings::default()
            },
            ..LedgerConfig::default()
        };
        let ledger = Ledger::open(&config).await.unwrap();

        let shift = ledger
            .reconciliation()
            .open_shift(1, Money::zero(), "cashier-01")
            .await
            .unwrap();
        assert_eq!(shift.folio.kind(), FolioKind::Close);
    }
}
