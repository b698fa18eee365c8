//! PostgreSQL Directory Adapter
//!
//! Implements [`DirectoryPort`] with [`DirectoryRepository`]. Plain one-time
//! passwords handed in through [`NewUser`] are digested here and never
//! stored.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    DoctorId, DomainPort, HealthCheckResult, HealthCheckable, MemberId, PayerId, PortError, ProviderId, UserId,
};
use domain_party::{
    Affiliation, DirectoryPort, Doctor, Gender, Member, NewMember, NewUser, Payer, Provider, Role, User,
};

use crate::credentials::password_digest;
use crate::error::DatabaseError;
use crate::pool::ping;
use crate::repositories::directory::{
    DbUserRole, DbUserType, DirectoryRepository, DoctorRow, MemberRow, MemberWrite, PayerRow, ProviderRow, UserRow,
    UserWrite,
};

/// PostgreSQL-backed implementation of the DirectoryPort trait
#[derive(Debug, Clone)]
pub struct PostgresDirectoryAdapter {
    repository: DirectoryRepository,
    pool: PgPool,
}

impl PostgresDirectoryAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: DirectoryRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &DirectoryRepository {
        &self.repository
    }
}

impl DomainPort for PostgresDirectoryAdapter {}

#[async_trait]
impl HealthCheckable for PostgresDirectoryAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-directory-adapter").await
    }
}

#[async_trait]
impl DirectoryPort for PostgresDirectoryAdapter {
    #[instrument(skip(self), fields(user_id = %id))]
    async fn get_user(&self, id: UserId) -> Result<User, PortError> {
        let row = self.repository.get_user(id.value()).await?;
        Ok(user_from_row(row)?)
    }

    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create_user(&self, user: NewUser) -> Result<User, PortError> {
        let (user_type, provider_id, payer_id, member_id) = affiliation_columns(user.affiliation);
        let write = UserWrite {
            name: user.name,
            email: user.email,
            password_digest: password_digest(&user.password),
            role: role_to_db(user.role),
            user_type,
            provider_id,
            payer_id,
            member_id,
        };

        let row = self.repository.insert_user(&write).await?;
        debug!(user_id = row.id, "created account");
        Ok(user_from_row(row)?)
    }

    #[instrument(skip(self), fields(payer_id = %payer, user_id = %user))]
    async fn link_payer_account(&self, payer: PayerId, user: UserId) -> Result<(), PortError> {
        self.repository.link_payer_account(payer.value(), user.value()).await?;
        Ok(())
    }

    #[instrument(skip(self), fields(provider_id = %id))]
    async fn get_provider(&self, id: ProviderId) -> Result<Provider, PortError> {
        let row = self.repository.get_provider(id.value()).await?;
        Ok(provider_from_row(row))
    }

    #[instrument(skip(self), fields(payer_id = %id))]
    async fn get_payer(&self, id: PayerId) -> Result<Payer, PortError> {
        let row = self.repository.get_payer(id.value()).await?;
        Ok(payer_from_row(row))
    }

    #[instrument(skip(self), fields(provider_id = %provider, payer_id = %payer))]
    async fn find_provider_payer(&self, provider: ProviderId, payer: PayerId) -> Result<Payer, PortError> {
        let row = self
            .repository
            .find_provider_payer(provider.value(), payer.value())
            .await?;
        Ok(payer_from_row(row))
    }

    #[instrument(skip(self), fields(provider_id = %provider, doctor_id = %doctor))]
    async fn find_provider_doctor(&self, provider: ProviderId, doctor: DoctorId) -> Result<Doctor, PortError> {
        let row = self
            .repository
            .find_provider_doctor(provider.value(), doctor.value())
            .await?;
        Ok(doctor_from_row(row))
    }

    #[instrument(skip(self), fields(member_id = %id))]
    async fn get_member(&self, id: MemberId) -> Result<Member, PortError> {
        let row = self.repository.get_member(id.value()).await?;
        Ok(member_from_row(row)?)
    }

    #[instrument(skip(self, national_id))]
    async fn find_member_by_national_id(&self, national_id: &str) -> Result<Option<Member>, PortError> {
        let row = self.repository.find_member_by_national_id(national_id).await?;
        Ok(row.map(member_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_member_by_device(&self, device_uid: &str) -> Result<Option<Member>, PortError> {
        let row = self.repository.find_member_by_device(device_uid).await?;
        Ok(row.map(member_from_row).transpose()?)
    }

    #[instrument(skip(self, member))]
    async fn create_member(&self, member: NewMember) -> Result<Member, PortError> {
        let write = MemberWrite {
            name: member.name,
            dob: member.dob,
            gender: member.gender.map(|g| g.as_str().to_string()),
            national_id: member.national_id,
            tel: member.tel,
            email: member.email,
            address: member.address,
            photo: member.photo,
            policy_number: member.policy_number,
            device_uid: member.device_uid,
        };
        let row = self.repository.insert_member(&write).await?;
        Ok(member_from_row(row)?)
    }

    #[instrument(skip(self, member), fields(member_id = %member.id))]
    async fn update_member(&self, member: &Member) -> Result<(), PortError> {
        let write = MemberWrite {
            name: member.name.clone(),
            dob: member.dob,
            gender: member.gender.map(|g| g.as_str().to_string()),
            national_id: member.national_id.clone(),
            tel: member.tel.clone(),
            email: member.email.clone(),
            address: member.address.clone(),
            photo: member.photo.clone(),
            policy_number: member.policy_number.clone(),
            device_uid: member.device_uid.clone(),
        };
        self.repository.update_member(member.id.value(), &write).await?;
        Ok(())
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn role_to_db(role: Role) -> DbUserRole {
    match role {
        Role::Admin => DbUserRole::Admin,
        Role::UserAdmin => DbUserRole::UserAdmin,
        Role::User => DbUserRole::User,
    }
}

fn affiliation_columns(affiliation: Affiliation) -> (Option<DbUserType>, Option<i64>, Option<i64>, Option<i64>) {
    match affiliation {
        Affiliation::Provider(id) => (Some(DbUserType::Provider), Some(id.value()), None, None),
        Affiliation::Payer(id) => (Some(DbUserType::Payer), None, Some(id.value()), None),
        Affiliation::Member(id) => (Some(DbUserType::Member), None, None, Some(id.value())),
        Affiliation::Unaffiliated => (None, None, None, None),
    }
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    let role = match row.role {
        DbUserRole::Admin => Role::Admin,
        DbUserRole::UserAdmin => Role::UserAdmin,
        DbUserRole::User => Role::User,
    };
    let affiliation = match (row.user_type, row.provider_id, row.payer_id, row.member_id) {
        (Some(DbUserType::Provider), Some(id), _, _) => Affiliation::Provider(ProviderId::new(id)),
        (Some(DbUserType::Payer), _, Some(id), _) => Affiliation::Payer(PayerId::new(id)),
        (Some(DbUserType::Member), _, _, Some(id)) => Affiliation::Member(MemberId::new(id)),
        (None, _, _, _) => Affiliation::Unaffiliated,
        (Some(kind), _, _, _) => {
            return Err(DatabaseError::corrupt(format!(
                "user {} is a {kind:?} account without its organisation",
                row.id
            )))
        }
    };

    Ok(User {
        id: UserId::new(row.id),
        name: row.name,
        email: row.email,
        role,
        affiliation,
        premium: row.premium,
    })
}

fn provider_from_row(row: ProviderRow) -> Provider {
    Provider {
        id: ProviderId::new(row.id),
        company: row.company,
        provider_type: row.provider_type,
        pic: row.pic,
        pic_email: row.pic_email,
        tel: row.tel,
        country: row.country,
        user_id: row.user_id.map(UserId::new),
        payer_ids: row.payer_ids.into_iter().map(PayerId::new).collect(),
    }
}

fn payer_from_row(row: PayerRow) -> Payer {
    Payer {
        id: PayerId::new(row.id),
        company: row.company,
        payer_type: row.payer_type,
        pic: row.pic,
        pic_email: row.pic_email,
        pic_alt_email: row.pic_alt_email,
        tel: row.tel,
        country: row.country,
        user_id: row.user_id.map(UserId::new),
    }
}

fn doctor_from_row(row: DoctorRow) -> Doctor {
    Doctor {
        id: DoctorId::new(row.id),
        provider_id: ProviderId::new(row.provider_id),
        name: row.name,
        department: row.department,
    }
}

fn member_from_row(row: MemberRow) -> Result<Member, DatabaseError> {
    let gender = row
        .gender
        .as_deref()
        .map(str::parse::<Gender>)
        .transpose()
        .map_err(|e| DatabaseError::corrupt(format!("member {}: {e}", row.id)))?;

    Ok(Member {
        id: MemberId::new(row.id),
        name: row.name,
        dob: row.dob,
        gender,
        national_id: row.national_id,
        tel: row.tel,
        email: row.email,
        address: row.address,
        photo: row.photo,
        policy_number: row.policy_number,
        device_uid: row.device_uid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_row(user_type: Option<DbUserType>, payer_id: Option<i64>) -> UserRow {
        UserRow {
            id: 21,
            name: "Claims desk".into(),
            email: "gop@acme.test".into(),
            role: DbUserRole::User,
            user_type,
            provider_id: None,
            payer_id,
            member_id: None,
            premium: false,
        }
    }

    #[test]
    fn test_affiliation_round_trips_through_columns() {
        let user = user_from_row(user_row(Some(DbUserType::Payer), Some(1))).unwrap();
        assert_eq!(user.affiliation, Affiliation::Payer(PayerId::new(1)));
        assert_eq!(
            affiliation_columns(user.affiliation),
            (Some(DbUserType::Payer), None, Some(1), None)
        );
    }

    #[test]
    fn test_staff_account_is_unaffiliated() {
        let user = user_from_row(user_row(None, None)).unwrap();
        assert_eq!(user.affiliation, Affiliation::Unaffiliated);
    }

    #[test]
    fn test_payer_account_without_payer_is_corrupt() {
        let err = user_from_row(user_row(Some(DbUserType::Payer), None)).unwrap_err();
        assert!(matches!(err, DatabaseError::CorruptRow(_)));
    }

    #[test]
    fn test_unknown_gender_is_corrupt() {
        let row = MemberRow {
            id: 1,
            name: "Jane Doe".into(),
            dob: None,
            gender: Some("unknown".into()),
            national_id: None,
            tel: None,
            email: None,
            address: None,
            photo: None,
            policy_number: None,
            device_uid: None,
        };
        assert!(matches!(member_from_row(row), Err(DatabaseError::CorruptRow(_))));
    }
}
