//! Directory Port
//!
//! Lookups of accounts, organisations, doctors and members needed by the GOP
//! core. Methods that depend on tenant ownership take the owning key as an
//! argument and report an out-of-tenant row as `PortError::NotFound`, so
//! scoping lives in one place instead of in relationship traversal.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_party::DirectoryPort;
//! use std::sync::Arc;
//!
//! pub struct GopService {
//!     directory: Arc<dyn DirectoryPort>,
//! }
//!
//! let payer = directory.find_provider_payer(provider_id, payer_id).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, HealthCheckable, MemberId, PayerId, PortError, ProviderId, DoctorId, UserId};

use crate::member::{Member, NewMember};
use crate::organization::{Doctor, Payer, Provider};
use crate::user::{NewUser, User};

/// Directory operations required by the GOP core
#[async_trait]
pub trait DirectoryPort: DomainPort + HealthCheckable {
    // ========================================================================
    // Accounts
    // ========================================================================

    /// Retrieves an account by ID
    async fn get_user(&self, id: UserId) -> Result<User, PortError>;

    /// Creates an account
    ///
    /// # Returns
    ///
    /// The stored account, or `PortError::Conflict` if the email is taken
    async fn create_user(&self, user: NewUser) -> Result<User, PortError>;

    /// Links a payer to its login account
    async fn link_payer_account(&self, payer: PayerId, user: UserId) -> Result<(), PortError>;

    // ========================================================================
    // Organisations
    // ========================================================================

    async fn get_provider(&self, id: ProviderId) -> Result<Provider, PortError>;

    async fn get_payer(&self, id: PayerId) -> Result<Payer, PortError>;

    /// Retrieves a payer only if the provider is contracted with it
    ///
    /// # Returns
    ///
    /// The payer, or `PortError::NotFound` when it does not exist or is not
    /// one of the provider's payers
    async fn find_provider_payer(&self, provider: ProviderId, payer: PayerId) -> Result<Payer, PortError>;

    /// Retrieves a doctor only if it belongs to the provider
    async fn find_provider_doctor(&self, provider: ProviderId, doctor: DoctorId) -> Result<Doctor, PortError>;

    // ========================================================================
    // Members
    // ========================================================================

    async fn get_member(&self, id: MemberId) -> Result<Member, PortError>;

    /// Finds the member with this national id, if any
    async fn find_member_by_national_id(&self, national_id: &str) -> Result<Option<Member>, PortError>;

    /// Finds the member bound to a terminal device, if any
    async fn find_member_by_device(&self, device_uid: &str) -> Result<Option<Member>, PortError>;

    async fn create_member(&self, member: NewMember) -> Result<Member, PortError>;

    async fn update_member(&self, member: &Member) -> Result<(), PortError>;
}

/// In-memory directory for tests
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use tokio::sync::RwLock;
    use core_kernel::HealthCheckResult;

    /// In-memory implementation of DirectoryPort
    #[derive(Debug, Default)]
    pub struct InMemoryDirectory {
        users: Arc<RwLock<HashMap<UserId, User>>>,
        providers: Arc<RwLock<HashMap<ProviderId, Provider>>>,
        payers: Arc<RwLock<HashMap<PayerId, Payer>>>,
        doctors: Arc<RwLock<HashMap<DoctorId, Doctor>>>,
        members: Arc<RwLock<HashMap<MemberId, Member>>>,
        next_id: AtomicI64,
    }

    impl InMemoryDirectory {
        /// Creates an empty directory; generated ids start at 1000
        pub fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1000),
                ..Self::default()
            }
        }

        fn allocate(&self) -> i64 {
            self.next_id.fetch_add(1, Ordering::SeqCst)
        }

        pub async fn insert_user(&self, user: User) {
            self.users.write().await.insert(user.id, user);
        }

        pub async fn insert_provider(&self, provider: Provider) {
            self.providers.write().await.insert(provider.id, provider);
        }

        pub async fn insert_payer(&self, payer: Payer) {
            self.payers.write().await.insert(payer.id, payer);
        }

        pub async fn insert_doctor(&self, doctor: Doctor) {
            self.doctors.write().await.insert(doctor.id, doctor);
        }

        pub async fn insert_member(&self, member: Member) {
            self.members.write().await.insert(member.id, member);
        }

        /// Number of stored members, for deduplication assertions
        pub async fn member_count(&self) -> usize {
            self.members.read().await.len()
        }

        /// All accounts, for provisioning assertions
        pub async fn users(&self) -> Vec<User> {
            self.users.read().await.values().cloned().collect()
        }
    }

    impl DomainPort for InMemoryDirectory {}

    #[async_trait]
    impl HealthCheckable for InMemoryDirectory {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult::healthy("in-memory-directory", 0)
        }
    }

    #[async_trait]
    impl DirectoryPort for InMemoryDirectory {
        async fn get_user(&self, id: UserId) -> Result<User, PortError> {
            self.users
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("User", id))
        }

        async fn create_user(&self, user: NewUser) -> Result<User, PortError> {
            let mut users = self.users.write().await;
            if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
                return Err(PortError::conflict(format!("email {} already registered", user.email)));
            }
            let stored = User {
                id: UserId::new(self.allocate()),
                name: user.name,
                email: user.email,
                role: user.role,
                affiliation: user.affiliation,
                premium: false,
            };
            users.insert(stored.id, stored.clone());
            Ok(stored)
        }

        async fn link_payer_account(&self, payer: PayerId, user: UserId) -> Result<(), PortError> {
            let mut payers = self.payers.write().await;
            let entry = payers
                .get_mut(&payer)
                .ok_or_else(|| PortError::not_found("Payer", payer))?;
            entry.user_id = Some(user);
            Ok(())
        }

        async fn get_provider(&self, id: ProviderId) -> Result<Provider, PortError> {
            self.providers
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Provider", id))
        }

        async fn get_payer(&self, id: PayerId) -> Result<Payer, PortError> {
            self.payers
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Payer", id))
        }

        async fn find_provider_payer(&self, provider: ProviderId, payer: PayerId) -> Result<Payer, PortError> {
            let contracted = self
                .providers
                .read()
                .await
                .get(&provider)
                .is_some_and(|p| p.works_with(payer));
            if !contracted {
                return Err(PortError::not_found("Payer", payer));
            }
            self.get_payer(payer).await
        }

        async fn find_provider_doctor(&self, provider: ProviderId, doctor: DoctorId) -> Result<Doctor, PortError> {
            self.doctors
                .read()
                .await
                .get(&doctor)
                .filter(|d| d.provider_id == provider)
                .cloned()
                .ok_or_else(|| PortError::not_found("Doctor", doctor))
        }

        async fn get_member(&self, id: MemberId) -> Result<Member, PortError> {
            self.members
                .read()
                .await
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Member", id))
        }

        async fn find_member_by_national_id(&self, national_id: &str) -> Result<Option<Member>, PortError> {
            Ok(self
                .members
                .read()
                .await
                .values()
                .find(|m| m.national_id.as_deref() == Some(national_id))
                .cloned())
        }

        async fn find_member_by_device(&self, device_uid: &str) -> Result<Option<Member>, PortError> {
            Ok(self
                .members
                .read()
                .await
                .values()
                .find(|m| m.device_uid.as_deref() == Some(device_uid))
                .cloned())
        }

        async fn create_member(&self, member: NewMember) -> Result<Member, PortError> {
            let stored = Member {
                id: MemberId::new(self.allocate()),
                name: member.name,
                dob: member.dob,
                gender: member.gender,
                national_id: member.national_id,
                tel: member.tel,
                email: member.email,
                address: member.address,
                photo: member.photo,
                policy_number: member.policy_number,
                device_uid: member.device_uid,
            };
            self.members.write().await.insert(stored.id, stored.clone());
            Ok(stored)
        }

        async fn update_member(&self, member: &Member) -> Result<(), PortError> {
            let mut members = self.members.write().await;
            if !members.contains_key(&member.id) {
                return Err(PortError::not_found("Member", member.id));
            }
            members.insert(member.id, member.clone());
            Ok(())
        }
    }
}
