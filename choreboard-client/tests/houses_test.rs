/// Integration tests for houses and membership

mod common;

use choreboard_client::error::ClientError;
use choreboard_client::services::houses::{MSG_ALREADY_IN_A_HOUSE, MSG_ALREADY_MEMBER_HERE, MSG_HOUSE_FULL};
use choreboard_shared::models::house::{CreateHouse, UpdateHouse};
use choreboard_shared::models::user::UserRole;
use choreboard_shared::remote::query::Table;
use common::TestContext;
use uuid::Uuid;

#[tokio::test]
async fn test_host_creates_house() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 4).await;

    assert_eq!(house.host_id, host.id());
    assert_eq!(house.max_tenants, 4);
    assert_eq!(house.name, "alice's house");

    let current = host.app.houses.get_current_user_house().await.unwrap().unwrap();
    assert_eq!(current.id, house.id);
    assert_eq!(host.app.houses.tenant_count(house.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_create_house_rules() {
    let ctx = TestContext::new();
    let tenant = ctx.user("bob", UserRole::Tenant).await;

    let err = tenant
        .app
        .houses
        .create_house(CreateHouse {
            name: "Bob's".to_string(),
            description: None,
            max_tenants: 2,
        })
        .await
        .unwrap_err();
    assert!(err.is_permission());
    assert_eq!(err.to_string(), "Only hosts can create houses");

    let (host, _house) = ctx.host_with_house("alice", 2).await;

    let err = host
        .app
        .houses
        .create_house(CreateHouse {
            name: "Second".to_string(),
            description: None,
            max_tenants: 2,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Conflict(_)));

    let err = host
        .app
        .houses
        .create_house(CreateHouse {
            name: "  ".to_string(),
            description: None,
            max_tenants: 0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert_eq!(ctx.backend.row_count(Table::Houses).await, 1);
}

#[tokio::test]
async fn test_join_until_full() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 2).await;

    let first = ctx.tenant_in(&house, "tenant_one").await;
    let second = ctx.tenant_in(&house, "tenant_two").await;
    assert_eq!(host.app.houses.tenant_count(house.id).await.unwrap(), 2);

    let third = ctx.user("tenant_three", UserRole::Tenant).await;
    let err = third.app.houses.join_house(house.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Conflict(_)));
    assert_eq!(err.to_string(), MSG_HOUSE_FULL);
    assert_eq!(host.app.houses.tenant_count(house.id).await.unwrap(), 2);

    let first_house = first.app.houses.get_current_user_house().await.unwrap().unwrap();
    assert_eq!(first_house.id, house.id);
    let second_house = second.app.houses.get_current_user_house().await.unwrap().unwrap();
    assert_eq!(second_house.id, house.id);
    assert!(third.app.houses.get_current_user_house().await.unwrap().is_none());
}

#[tokio::test]
async fn test_join_errors() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 3).await;
    let (_other_host, other_house) = ctx.host_with_house("zoe", 3).await;
    let tenant = ctx.tenant_in(&house, "bob").await;

    let err = tenant.app.houses.join_house(house.id).await.unwrap_err();
    assert_eq!(err.to_string(), MSG_ALREADY_MEMBER_HERE);

    let err = tenant.app.houses.join_house(other_house.id).await.unwrap_err();
    assert_eq!(err.to_string(), MSG_ALREADY_IN_A_HOUSE);

    let err = tenant.app.houses.join_house(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
    assert_eq!(err.to_string(), "House not found");

    let err = host.app.houses.join_house(other_house.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Only tenants can join houses");

    assert_eq!(ctx.backend.row_count(Table::HouseMembers).await, 1);
}

#[tokio::test]
async fn test_available_houses_details() {
    let ctx = TestContext::new();
    let (_alice, alice_house) = ctx.host_with_house("alice", 1).await;
    let (_zoe, zoe_house) = ctx.host_with_house("zoe", 3).await;
    ctx.tenant_in(&alice_house, "bob").await;

    let browser = ctx.user("carol", UserRole::Tenant).await;
    let houses = browser.app.houses.get_available_houses().await.unwrap();
    assert_eq!(houses.len(), 2);

    // Oldest first
    assert_eq!(houses[0].house.id, alice_house.id);
    assert_eq!(houses[0].current_tenant_count, 1);
    assert_eq!(houses[0].host_username.as_deref(), Some("alice"));
    assert!(houses[0].is_full());

    assert_eq!(houses[1].house.id, zoe_house.id);
    assert_eq!(houses[1].current_tenant_count, 0);
    assert!(!houses[1].is_full());
}

#[tokio::test]
async fn test_members_list_host_first() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 3).await;
    let bob = ctx.tenant_in(&house, "bob").await;
    let carol = ctx.tenant_in(&house, "carol").await;

    let tenants = host.app.houses.get_house_tenants(house.id).await.unwrap();
    let tenant_ids: Vec<Uuid> = tenants.iter().map(|u| u.id).collect();
    assert_eq!(tenant_ids, vec![bob.id(), carol.id()]);

    let members = bob.app.houses.get_house_members(&house).await.unwrap();
    let member_ids: Vec<Uuid> = members.iter().map(|u| u.id).collect();
    assert_eq!(member_ids, vec![host.id(), bob.id(), carol.id()]);
}

#[tokio::test]
async fn test_remove_tenant_host_only() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 3).await;
    let bob = ctx.tenant_in(&house, "bob").await;
    let carol = ctx.tenant_in(&house, "carol").await;

    let err = bob.app.houses.remove_tenant(house.id, carol.id()).await.unwrap_err();
    assert!(err.is_permission());
    assert_eq!(err.to_string(), "Only the host can remove tenants");

    host.app.houses.remove_tenant(house.id, carol.id()).await.unwrap();
    assert_eq!(host.app.houses.tenant_count(house.id).await.unwrap(), 1);
    assert!(carol.app.houses.get_current_user_house().await.unwrap().is_none());
}

#[tokio::test]
async fn test_leave_house() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 3).await;
    let bob = ctx.tenant_in(&house, "bob").await;
    let outsider = ctx.user("carol", UserRole::Tenant).await;

    let err = host.app.houses.leave_house(house.id).await.unwrap_err();
    assert!(err.is_permission());
    assert_eq!(
        err.to_string(),
        "Hosts cannot leave their own house. Delete the house instead."
    );

    let err = outsider.app.houses.leave_house(house.id).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));

    bob.app.houses.leave_house(house.id).await.unwrap();
    assert!(bob.app.houses.get_current_user_house().await.unwrap().is_none());

    // A tenant who left may join again
    bob.app.houses.join_house(house.id).await.unwrap();
    assert_eq!(host.app.houses.tenant_count(house.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_house() {
    let ctx = TestContext::new();
    let (host, house) = ctx.host_with_house("alice", 3).await;
    let bob = ctx.tenant_in(&house, "bob").await;
    ctx.tenant_in(&house, "carol").await;

    let err = bob
        .app
        .houses
        .update_house(
            house.id,
            UpdateHouse {
                name: Some("Taken over".to_string()),
                ..UpdateHouse::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Only the host can update the house");

    let err = host
        .app
        .houses
        .update_house(
            house.id,
            UpdateHouse {
                max_tenants: Some(1),
                ..UpdateHouse::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let updated = host
        .app
        .houses
        .update_house(
            house.id,
            UpdateHouse {
                name: Some("Maple Street".to_string()),
                description: Some("Corner house".to_string()),
                max_tenants: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Maple Street");
    assert_eq!(updated.description.as_deref(), Some("Corner house"));
    assert_eq!(updated.max_tenants, 2);
    assert!(updated.updated_at.is_some());

    let fetched = host.app.houses.get_house_by_id(house.id).await.unwrap().unwrap();
    assert_eq!(fetched.name, "Maple Street");
}
