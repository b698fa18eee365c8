//! Tests for the directory port contract using the in-memory adapter

use std::collections::BTreeSet;

use core_kernel::{DoctorId, PayerId, ProviderId, UserId};
use domain_party::{
    Affiliation, DirectoryPort, Doctor, InMemoryDirectory, NewMember, NewUser, Payer, Provider, Role,
};

fn payer(id: i64) -> Payer {
    Payer {
        id: PayerId::new(id),
        company: format!("Payer {id}"),
        payer_type: Some("insurance".into()),
        pic: None,
        pic_email: Some(format!("pic{id}@payer.test")),
        pic_alt_email: None,
        tel: None,
        country: Some("Singapore".into()),
        user_id: None,
    }
}

fn provider(id: i64, payers: &[i64]) -> Provider {
    Provider {
        id: ProviderId::new(id),
        company: format!("Clinic {id}"),
        provider_type: None,
        pic: None,
        pic_email: None,
        tel: None,
        country: Some("Singapore".into()),
        user_id: None,
        payer_ids: payers.iter().copied().map(PayerId::new).collect::<BTreeSet<_>>(),
    }
}

async fn directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    directory.insert_payer(payer(1)).await;
    directory.insert_payer(payer(2)).await;
    directory.insert_provider(provider(10, &[1])).await;
    directory
        .insert_doctor(Doctor {
            id: DoctorId::new(5),
            provider_id: ProviderId::new(10),
            name: "Dr. Lim".into(),
            department: None,
        })
        .await;
    directory
}

#[tokio::test]
async fn test_uncontracted_payer_is_not_found() {
    let directory = directory().await;

    assert!(directory.find_provider_payer(ProviderId::new(10), PayerId::new(1)).await.is_ok());

    let err = directory
        .find_provider_payer(ProviderId::new(10), PayerId::new(2))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_doctor_of_other_provider_is_not_found() {
    let directory = directory().await;

    let err = directory
        .find_provider_doctor(ProviderId::new(11), DoctorId::new(5))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_member_lookup_by_national_id() {
    let directory = directory().await;
    let created = directory
        .create_member(NewMember {
            name: "Jane Tan".into(),
            national_id: Some("S1234567A".into()),
            ..NewMember::default()
        })
        .await
        .unwrap();

    let found = directory.find_member_by_national_id("S1234567A").await.unwrap();
    assert_eq!(found.map(|m| m.id), Some(created.id));
    assert!(directory.find_member_by_national_id("S0000000Z").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_user_rejects_duplicate_email() {
    let directory = directory().await;
    let new_user = || NewUser {
        name: "Payer 1".into(),
        email: "pic1@payer.test".into(),
        role: Role::User,
        affiliation: Affiliation::Payer(PayerId::new(1)),
        password: "ABCD1234".into(),
    };

    let user = directory.create_user(new_user()).await.unwrap();
    directory.link_payer_account(PayerId::new(1), user.id).await.unwrap();

    assert!(directory.create_user(new_user()).await.is_err());
    assert_eq!(directory.get_payer(PayerId::new(1)).await.unwrap().user_id, Some(user.id));
    assert!(directory.get_user(UserId::new(424242)).await.unwrap_err().is_not_found());
}

mod scope_properties {
    use super::*;
    use domain_party::{Actor, Scope};
    use proptest::prelude::*;

    fn affiliation() -> impl Strategy<Value = Affiliation> {
        prop_oneof![
            (1i64..1_000).prop_map(|id| Affiliation::Provider(ProviderId::new(id))),
            (1i64..1_000).prop_map(|id| Affiliation::Payer(PayerId::new(id))),
            (1i64..1_000).prop_map(|id| Affiliation::Member(core_kernel::MemberId::new(id))),
            Just(Affiliation::Unaffiliated),
        ]
    }

    fn role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::Admin), Just(Role::UserAdmin), Just(Role::User)]
    }

    proptest! {
        #[test]
        fn prop_non_admin_scope_covers_only_own_rows(
            affiliation in affiliation(),
            provider in 1i64..1_000,
            payer in 1i64..1_000,
        ) {
            let actor = Actor::new(UserId::new(1), "someone", Role::User, affiliation);
            let covered = actor.scope().covers(ProviderId::new(provider), PayerId::new(payer));
            let own = actor.provider_id() == Some(ProviderId::new(provider))
                || actor.payer_id() == Some(PayerId::new(payer));
            prop_assert_eq!(covered, own);
        }

        #[test]
        fn prop_admin_scope_is_all(affiliation in affiliation(), role in role()) {
            let actor = Actor::new(UserId::new(1), "someone", role, affiliation);
            prop_assert_eq!(actor.scope() == Scope::All, role == Role::Admin);
        }
    }
}
