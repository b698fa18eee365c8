//! Pre-built Test Fixtures
//!
//! Two provider/payer tenants, an admin and a member login, with stable ids so
//! tests can assert on them directly.
//!
//! | Tenant | Provider | Payer | Provider user | Payer user | Country |
//! |---|---|---|---|---|---|
//! | A | 1 Mercy Hospital | 1 Acme Assurance | 11 | 21 | Singapore |
//! | B | 2 Harbour Clinic | 2 Blue Shield | 12 | 22 | Malaysia |
//!
//! Payer 3 (Orchid Health) is contracted with provider A but has no login
//! account yet, for provisioning tests.

use std::collections::BTreeSet;

use core_kernel::{DoctorId, MemberId, PayerId, ProviderId, UserId};
use domain_party::{Actor, Affiliation, Doctor, InMemoryDirectory, Member, Payer, Provider, Role, User};

/// Known diagnosis code ids
pub const DIAGNOSIS_CODES: [i64; 5] = [1, 2, 3, 4, 5];

/// Stable ids for the seeded directory
pub struct Ids;

impl Ids {
    pub const PROVIDER_A: ProviderId = ProviderId::new(1);
    pub const PROVIDER_B: ProviderId = ProviderId::new(2);
    pub const PAYER_A: PayerId = PayerId::new(1);
    pub const PAYER_B: PayerId = PayerId::new(2);
    pub const PAYER_UNPROVISIONED: PayerId = PayerId::new(3);
    pub const DOCTOR_A: DoctorId = DoctorId::new(1);
    pub const DOCTOR_B: DoctorId = DoctorId::new(2);
    pub const ADMIN_USER: UserId = UserId::new(1);
    pub const PROVIDER_A_USER: UserId = UserId::new(11);
    pub const PROVIDER_B_USER: UserId = UserId::new(12);
    pub const PAYER_A_USER: UserId = UserId::new(21);
    pub const PAYER_B_USER: UserId = UserId::new(22);
    pub const MEMBER_USER: UserId = UserId::new(31);
    pub const MEMBER: MemberId = MemberId::new(1);
}

/// Fixture for organisations and people
pub struct PartyFixtures;

impl PartyFixtures {
    pub fn provider_a() -> Provider {
        Provider {
            id: Ids::PROVIDER_A,
            company: "Mercy Hospital".into(),
            provider_type: Some("hospital".into()),
            pic: Some("Dr. Tan".into()),
            pic_email: Some("admissions@mercy.test".into()),
            tel: None,
            country: Some("Singapore".into()),
            user_id: Some(Ids::PROVIDER_A_USER),
            payer_ids: BTreeSet::from([Ids::PAYER_A, Ids::PAYER_UNPROVISIONED]),
        }
    }

    pub fn provider_b() -> Provider {
        Provider {
            id: Ids::PROVIDER_B,
            company: "Harbour Clinic".into(),
            provider_type: Some("clinic".into()),
            pic: None,
            pic_email: Some("front@harbour.test".into()),
            tel: None,
            country: Some("Malaysia".into()),
            user_id: Some(Ids::PROVIDER_B_USER),
            payer_ids: BTreeSet::from([Ids::PAYER_B]),
        }
    }

    pub fn payer_a() -> Payer {
        Payer {
            id: Ids::PAYER_A,
            company: "Acme Assurance".into(),
            payer_type: Some("insurer".into()),
            pic: Some("Claims desk".into()),
            pic_email: Some("gop@acme.test".into()),
            pic_alt_email: Some("claims@acme.test".into()),
            tel: None,
            country: Some("Singapore".into()),
            user_id: Some(Ids::PAYER_A_USER),
        }
    }

    pub fn payer_b() -> Payer {
        Payer {
            id: Ids::PAYER_B,
            company: "Blue Shield".into(),
            payer_type: Some("tpa".into()),
            pic: None,
            pic_email: Some("gop@blueshield.test".into()),
            pic_alt_email: None,
            tel: None,
            country: Some("Malaysia".into()),
            user_id: Some(Ids::PAYER_B_USER),
        }
    }

    pub fn payer_unprovisioned() -> Payer {
        Payer {
            id: Ids::PAYER_UNPROVISIONED,
            company: "Orchid Health".into(),
            payer_type: Some("corporate".into()),
            pic: Some("Ms. Lim".into()),
            pic_email: None,
            pic_alt_email: Some("hr@orchid.test".into()),
            tel: None,
            country: Some("Singapore".into()),
            user_id: None,
        }
    }

    pub fn doctor_a() -> Doctor {
        Doctor {
            id: Ids::DOCTOR_A,
            provider_id: Ids::PROVIDER_A,
            name: "Dr. Wong".into(),
            department: Some("Cardiology".into()),
        }
    }

    pub fn doctor_b() -> Doctor {
        Doctor {
            id: Ids::DOCTOR_B,
            provider_id: Ids::PROVIDER_B,
            name: "Dr. Rahman".into(),
            department: None,
        }
    }

    /// A registered patient with national id `S1234567A`
    pub fn member() -> Member {
        Member {
            id: Ids::MEMBER,
            name: "Jane Doe".into(),
            dob: None,
            gender: None,
            national_id: Some("S1234567A".into()),
            tel: None,
            email: None,
            address: None,
            photo: None,
            policy_number: Some("POL-100".into()),
            device_uid: Some("device-jane".into()),
        }
    }
}

fn user(id: UserId, name: &str, email: &str, role: Role, affiliation: Affiliation) -> User {
    User {
        id,
        name: name.into(),
        email: email.into(),
        role,
        affiliation,
        premium: false,
    }
}

/// Fixture for login accounts and the actors built from them
pub struct UserFixtures;

impl UserFixtures {
    pub fn all() -> Vec<User> {
        vec![
            user(Ids::ADMIN_USER, "Platform admin", "admin@medipay.test", Role::Admin, Affiliation::Unaffiliated),
            user(
                Ids::PROVIDER_A_USER,
                "Mercy Hospital",
                "desk@mercy.test",
                Role::UserAdmin,
                Affiliation::Provider(Ids::PROVIDER_A),
            ),
            user(
                Ids::PROVIDER_B_USER,
                "Harbour Clinic",
                "desk@harbour.test",
                Role::User,
                Affiliation::Provider(Ids::PROVIDER_B),
            ),
            user(
                Ids::PAYER_A_USER,
                "Acme Assurance",
                "reviewer@acme.test",
                Role::User,
                Affiliation::Payer(Ids::PAYER_A),
            ),
            user(
                Ids::PAYER_B_USER,
                "Blue Shield",
                "reviewer@blueshield.test",
                Role::User,
                Affiliation::Payer(Ids::PAYER_B),
            ),
            user(Ids::MEMBER_USER, "Jane Doe", "jane@example.test", Role::User, Affiliation::Member(Ids::MEMBER)),
        ]
    }

    fn actor(id: UserId) -> Actor {
        Self::all()
            .into_iter()
            .find(|u| u.id == id)
            .map(|u| u.actor())
            .unwrap_or_else(|| panic!("no fixture user {id}"))
    }

    pub fn admin() -> Actor {
        Self::actor(Ids::ADMIN_USER)
    }

    pub fn provider_a() -> Actor {
        Self::actor(Ids::PROVIDER_A_USER)
    }

    pub fn provider_b() -> Actor {
        Self::actor(Ids::PROVIDER_B_USER)
    }

    pub fn payer_a() -> Actor {
        Self::actor(Ids::PAYER_A_USER)
    }

    pub fn payer_b() -> Actor {
        Self::actor(Ids::PAYER_B_USER)
    }

    pub fn member() -> Actor {
        Self::actor(Ids::MEMBER_USER)
    }
}

/// Loads every fixture into an in-memory directory
pub async fn seed_directory(directory: &InMemoryDirectory) {
    for provider in [PartyFixtures::provider_a(), PartyFixtures::provider_b()] {
        directory.insert_provider(provider).await;
    }
    for payer in [
        PartyFixtures::payer_a(),
        PartyFixtures::payer_b(),
        PartyFixtures::payer_unprovisioned(),
    ] {
        directory.insert_payer(payer).await;
    }
    for doctor in [PartyFixtures::doctor_a(), PartyFixtures::doctor_b()] {
        directory.insert_doctor(doctor).await;
    }
    directory.insert_member(PartyFixtures::member()).await;
    for user in UserFixtures::all() {
        directory.insert_user(user).await;
    }
}
