use super::*;
use serde_json::json;

#[test]
fn seeding_is_deterministic() {
    let first = Collection::<Users>::seeded(12);
    let second = Collection::<Users>::seeded(12);
    let a: Vec<_> = first.iter().cloned().collect();
    let b: Vec<_> = second.iter().cloned().collect();
    assert_eq!(a, b);
    assert_eq!(first.len(), 12);
    assert_eq!(a[0].first_name, "Emily");
    assert_eq!(a[0].gender, "female");
    assert_eq!(a[1].gender, "male");
}

#[test]
fn page_respects_limit_and_skip() {
    let todos = Collection::<Todos>::seeded(25);

    let page = todos.page(10, 20);
    assert_eq!(page.total, 25);
    assert_eq!(page.skip, 20);
    assert_eq!(page.limit, 5);
    let ids: Vec<i64> = page.records.iter().map(|todo| todo.id.0).collect();
    assert_eq!(ids, (21..=25).collect::<Vec<_>>());

    assert_eq!(todos.page(0, 0).records.len(), 25);
    assert!(todos.page(10, 40).records.is_empty());
}

#[test]
fn cart_totals_are_computed_server_side() {
    let mut carts = Collection::<Carts>::seeded(0);
    let cart = carts.insert(&shared::domain::CartDraft {
        user_id: 3,
        products: vec![shared::domain::CartLine {
            product_id: 2,
            quantity: 3,
        }],
    });
    assert_eq!(cart.id, RecordId(1));
    assert!((cart.total - 3.0 * 74.99).abs() < 1e-9);
}

#[test]
fn update_merges_partial_body() {
    let mut posts = Collection::<Posts>::seeded(3);
    let before = posts.get(RecordId(2)).cloned().expect("post 2");

    let after = posts
        .update(RecordId(2), json!({ "title": "Renamed" }))
        .expect("update");

    assert_eq!(after.title, "Renamed");
    assert_eq!(after.body, before.body);
    assert_eq!(after.user_id, before.user_id);
    assert_eq!(posts.get(RecordId(2)), Some(&after));
}

#[test]
fn update_rejects_invalid_fields_and_unknown_ids() {
    let mut users = Collection::<Users>::seeded(2);

    let err = users
        .update(RecordId(1), json!({ "email": "not-an-email" }))
        .expect_err("invalid email");
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = users
        .update(RecordId(9), json!({ "firstName": "X" }))
        .expect_err("unknown id");
    assert_eq!(
        err,
        Rejection::NotFound(ApiError::new("User with id '9' not found"))
    );
}

#[tokio::test]
async fn add_assigns_next_id_and_persists() {
    let ctx = ApiContext::seeded(4);

    let todo = add_record::<Todos>(
        &ctx,
        json!({ "todo": "Walk the dog", "completed": false, "userId": 2 }),
    )
    .await
    .expect("add");

    assert_eq!(todo.id, RecordId(5));
    assert_eq!(ctx.todos().read().await.len(), 5);
}

#[tokio::test]
async fn add_rejects_drafts_that_fail_validation() {
    let ctx = ApiContext::seeded(1);
    let err = add_record::<Products>(&ctx, json!({ "title": "Free", "price": 0 }))
        .await
        .expect_err("zero price");
    assert_eq!(
        err.into_body().message,
        "price must be greater than zero"
    );
}

#[tokio::test]
async fn delete_flags_record_and_second_delete_is_not_found() {
    let ctx = ApiContext::seeded(3);

    let body = delete_record::<Comments>(&ctx, RecordId(2)).await.expect("delete");
    assert_eq!(body["id"], 2);
    assert_eq!(body["isDeleted"], true);
    assert!(body["deletedOn"].is_string());

    let err = delete_record::<Comments>(&ctx, RecordId(2))
        .await
        .expect_err("second delete");
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(err.into_body().message, "Comment with id '2' not found");
}

#[tokio::test]
async fn login_checks_seeded_accounts() {
    let ctx = ApiContext::seeded(3);

    let session = login(
        &ctx,
        &LoginRequest {
            username: "emily1".into(),
            password: "emily1pass".into(),
        },
    )
    .await
    .expect("login");
    assert_eq!(session.id, 1);
    assert_eq!(session.first_name.as_deref(), Some("Emily"));
    assert!(session.access_token.is_some());

    let err = login(
        &ctx,
        &LoginRequest {
            username: "emily1".into(),
            password: "wrong".into(),
        },
    )
    .await
    .expect_err("wrong password");
    assert_eq!(err, Rejection::BadRequest(ApiError::new("Invalid credentials")));
}
