//! GOP Persistence Port
//!
//! Storage operations for requests and claim shells. Listing methods receive
//! a [`GopQuery`] that already carries the actor's scope, so adapters never
//! decide visibility on their own.
//!
//! # Usage
//!
//! ```rust,ignore
//! let query = GopQuery::for_actor(&actor, Visibility::Open, params)?;
//! let page = gops.list(&query).await?;
//! let counts = gops.count_by_status(&query.without_status()).await?;
//! ```

use std::collections::BTreeSet;

use async_trait::async_trait;

use core_kernel::{ClaimId, DiagnosisCodeId, DomainPort, GopId, HealthCheckable, PortError};

use crate::claim::{Claim, NewClaim};
use crate::gop::{GuaranteeOfPayment, NewGop};
use crate::query::{GopPage, GopQuery, StatusCounts};

/// Persistence operations for the GOP aggregate
#[async_trait]
pub trait GopPort: DomainPort + HealthCheckable {
    /// Stores a new request with status `pending`
    ///
    /// # Returns
    ///
    /// The stored request with its assigned id
    async fn insert(&self, gop: NewGop) -> Result<GuaranteeOfPayment, PortError>;

    /// Retrieves a request by ID, regardless of scope
    async fn get(&self, id: GopId) -> Result<GuaranteeOfPayment, PortError>;

    /// Overwrites a stored request (last write wins)
    async fn save(&self, gop: &GuaranteeOfPayment) -> Result<(), PortError>;

    /// Returns one page of requests matching the query
    async fn list(&self, query: &GopQuery) -> Result<GopPage, PortError>;

    /// Counts requests per status for the query's base (its status filter is ignored)
    async fn count_by_status(&self, query: &GopQuery) -> Result<StatusCounts, PortError>;

    /// Returns the subset of `ids` that exist as diagnosis codes
    async fn existing_diagnosis_codes(
        &self,
        ids: &BTreeSet<DiagnosisCodeId>,
    ) -> Result<BTreeSet<DiagnosisCodeId>, PortError>;

    async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, PortError>;

    async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError>;

    async fn save_claim(&self, claim: &Claim) -> Result<(), PortError>;
}

/// In-memory store for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;
    use domain_party::DirectoryPort;

    use crate::gop::GopStatus;

    /// In-memory implementation of GopPort
    ///
    /// Joins against the directory for admin filters and search, the way the
    /// SQL adapter joins provider, payer and member tables.
    pub struct InMemoryGopStore {
        directory: Arc<dyn DirectoryPort>,
        gops: RwLock<BTreeMap<GopId, GuaranteeOfPayment>>,
        claims: RwLock<BTreeMap<ClaimId, Claim>>,
        diagnosis_codes: RwLock<BTreeSet<DiagnosisCodeId>>,
        next_id: AtomicI64,
        saves_unavailable: AtomicBool,
    }

    impl InMemoryGopStore {
        pub fn new(directory: Arc<dyn DirectoryPort>) -> Self {
            Self {
                directory,
                gops: RwLock::new(BTreeMap::new()),
                claims: RwLock::new(BTreeMap::new()),
                diagnosis_codes: RwLock::new(BTreeSet::new()),
                next_id: AtomicI64::new(1),
                saves_unavailable: AtomicBool::new(false),
            }
        }

        /// Makes every following `save` fail with a connection error
        pub fn fail_saves(&self, fail: bool) {
            self.saves_unavailable.store(fail, Ordering::SeqCst);
        }

        /// Registers known diagnosis codes
        pub async fn with_diagnosis_codes(self, ids: impl IntoIterator<Item = i64>) -> Self {
            self.diagnosis_codes
                .write()
                .await
                .extend(ids.into_iter().map(DiagnosisCodeId::new));
            self
        }

        async fn matching(&self, query: &GopQuery) -> Result<Vec<GuaranteeOfPayment>, PortError> {
            let gops: Vec<GuaranteeOfPayment> = self.gops.read().await.values().cloned().collect();
            let mut hits = Vec::new();
            for gop in gops {
                let provider = self.directory.get_provider(gop.provider_id).await?;
                let payer = self.directory.get_payer(gop.payer_id).await?;
                let member = self.directory.get_member(gop.member_id).await?;
                if query.matches(&gop, &provider, &payer, &member) {
                    hits.push(gop);
                }
            }
            // newest first, like the SQL adapter
            hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(hits)
        }
    }

    impl DomainPort for InMemoryGopStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryGopStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-gop-store", 0)
        }
    }

    #[async_trait]
    impl GopPort for InMemoryGopStore {
        async fn insert(&self, gop: NewGop) -> Result<GuaranteeOfPayment, PortError> {
            let id = GopId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let stored = GuaranteeOfPayment::from_new(id, gop);
            self.gops.write().await.insert(id, stored.clone());
            Ok(stored)
        }

        async fn get(&self, id: GopId) -> Result<GuaranteeOfPayment, PortError> {
            self.gops
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("GuaranteeOfPayment", id))
        }

        async fn save(&self, gop: &GuaranteeOfPayment) -> Result<(), PortError> {
            if self.saves_unavailable.load(Ordering::SeqCst) {
                return Err(PortError::connection("in-memory store unavailable"));
            }
            let mut gops = self.gops.write().await;
            if !gops.contains_key(&gop.id) {
                return Err(PortError::not_found("GuaranteeOfPayment", gop.id));
            }
            gops.insert(gop.id, gop.clone());
            Ok(())
        }

        async fn list(&self, query: &GopQuery) -> Result<GopPage, PortError> {
            let hits = self.matching(query).await?;
            let total = hits.len() as u64;
            let items = hits
                .into_iter()
                .skip(query.page.offset() as usize)
                .take(query.page.limit() as usize)
                .collect();
            Ok(GopPage {
                items,
                page: query.page,
                total,
            })
        }

        async fn count_by_status(&self, query: &GopQuery) -> Result<StatusCounts, PortError> {
            let base = GopQuery {
                status: None,
                ..query.clone()
            };
            let hits = self.matching(&base).await?;
            let mut counts = StatusCounts::default();
            for status in GopStatus::ALL {
                counts.set(status, hits.iter().filter(|g| g.status == status).count() as u64);
            }
            Ok(counts)
        }

        async fn existing_diagnosis_codes(
            &self,
            ids: &BTreeSet<DiagnosisCodeId>,
        ) -> Result<BTreeSet<DiagnosisCodeId>, PortError> {
            let known = self.diagnosis_codes.read().await;
            Ok(ids.intersection(&known).copied().collect())
        }

        async fn insert_claim(&self, claim: NewClaim) -> Result<Claim, PortError> {
            let id = ClaimId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
            let stored = Claim {
                id,
                provider_id: claim.provider_id,
                member_id: claim.member_id,
                terminal_id: claim.terminal_id,
                amount: claim.amount,
                gop_id: None,
                created_at: claim.created_at,
            };
            self.claims.write().await.insert(id, stored.clone());
            Ok(stored)
        }

        async fn get_claim(&self, id: ClaimId) -> Result<Claim, PortError> {
            self.claims
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Claim", id))
        }

        async fn save_claim(&self, claim: &Claim) -> Result<(), PortError> {
            self.claims.write().await.insert(claim.id, claim.clone());
            Ok(())
        }
    }
}
