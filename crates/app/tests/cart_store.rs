//! Integration tests for the cart store over file-backed persistence

use std::path::{Path, PathBuf};

use jiff::Timestamp;
use tempfile::TempDir;
use testresult::TestResult;

use trolley::{
    cart::CartError,
    items::LineItem,
    limits::{FREE_SHIPPING_THRESHOLD, SHIPPING_FLAT},
    products::ProductId,
};
use trolley_app::{
    auth::{AuthProvider, Identity},
    catalog::ProductCatalog,
    config::StoreConfig,
    context::AppContext,
    persistence::{JsonFileBackend, PersistenceBackend, ScopeKey},
    store::{CartContext, Mutation, Persistence, Phase},
};

const SHOPPER: &str = "shopper@example.com";

fn catalog_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/catalog.yaml")
}

fn config(data_dir: &Path, user: Option<&str>) -> StoreConfig {
    StoreConfig {
        data_dir: data_dir.to_path_buf(),
        catalog: catalog_path(),
        user: user.map(str::to_string),
    }
}

async fn open(data_dir: &Path, user: Option<&str>) -> TestResult<AppContext> {
    let context = AppContext::from_config(&config(data_dir, user))?;

    context.store.load_current().await;

    Ok(context)
}

fn cheery_red() -> ProductId {
    ProductId::new("bumable-brief-cheery-red")
}

fn tie_and_dye() -> ProductId {
    ProductId::new("tie-and-dye-brief")
}

fn local(data_dir: &Path) -> JsonFileBackend {
    JsonFileBackend::new(data_dir.join("local"))
}

fn remote(data_dir: &Path) -> JsonFileBackend {
    JsonFileBackend::new(data_dir.join("remote"))
}

async fn line(
    context: &AppContext,
    product_id: &ProductId,
    size: &str,
    quantity: u32,
) -> TestResult<LineItem> {
    let product = context
        .catalog
        .get_product(product_id)
        .await?
        .ok_or("product missing from fixture catalog")?;

    Ok(LineItem::from_product(
        &product,
        size,
        quantity,
        Timestamp::UNIX_EPOCH,
    ))
}

/// Guests cannot add items, so their carts are seeded straight into local storage.
async fn seed_guest_cart(data_dir: &Path, lines: &[(ProductId, &str, u32)]) -> TestResult {
    let context = AppContext::from_config(&config(data_dir, None))?;
    let mut items = Vec::with_capacity(lines.len());

    for (product_id, size, quantity) in lines {
        items.push(line(&context, product_id, size, *quantity).await?);
    }

    local(data_dir).write(&ScopeKey::Guest, &items).await?;

    Ok(())
}

#[tokio::test]
async fn guest_cart_survives_a_restart() -> TestResult {
    let dir = TempDir::new()?;

    seed_guest_cart(dir.path(), &[(cheery_red(), "M", 2), (tie_and_dye(), "L", 1)]).await?;

    let first = open(dir.path(), None).await?;
    let snapshot = first.store.snapshot();

    assert_eq!(snapshot.phase, Phase::Ready);
    assert_eq!(snapshot.context, CartContext::Guest);
    assert_eq!(snapshot.totals.item_count, 3);
    assert_eq!(snapshot.totals.subtotal, 2 * 199_00 + 249_00);

    let removed = first.store.remove_item(1).await?;
    assert_eq!(removed, Mutation::Applied(Persistence::Saved));

    let second = open(dir.path(), None).await?;

    assert_eq!(second.store.snapshot().items, first.store.snapshot().items);
    assert_eq!(second.store.snapshot().totals.item_count, 2);

    Ok(())
}

#[tokio::test]
async fn guest_cart_is_written_to_the_local_directory() -> TestResult {
    let dir = TempDir::new()?;

    seed_guest_cart(dir.path(), &[(cheery_red(), "S", 1)]).await?;

    let context = open(dir.path(), None).await?;
    let persistence = context.store.clear_cart().await?;

    assert_eq!(persistence, Persistence::Saved);
    assert_eq!(local(dir.path()).read(&ScopeKey::Guest).await?, Some(Vec::new()));
    assert!(!dir.path().join("remote").join("cart-guest.json").exists());

    Ok(())
}

#[tokio::test]
async fn signed_in_user_gets_their_own_cart() -> TestResult {
    let dir = TempDir::new()?;

    seed_guest_cart(dir.path(), &[(cheery_red(), "M", 1)]).await?;

    let user = open(dir.path(), Some(SHOPPER)).await?;

    // First sign-in shows the guest cart until the user changes something.
    assert_eq!(user.store.snapshot().items.len(), 1);

    let persistence = user.store.add_item(&tie_and_dye(), "S", 2).await?;
    assert_eq!(persistence, Persistence::Saved);

    let identity = Identity::from_email(SHOPPER);
    let stored = remote(dir.path())
        .read(&ScopeKey::User(identity.uuid))
        .await?
        .unwrap_or_default();

    assert_eq!(stored.len(), 2);

    let guest_again = open(dir.path(), None).await?;
    assert_eq!(guest_again.store.snapshot().items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn merge_moves_guest_lines_into_the_user_cart() -> TestResult {
    let dir = TempDir::new()?;

    let user = open(dir.path(), Some(SHOPPER)).await?;
    user.store.add_item(&cheery_red(), "M", 3).await?;

    seed_guest_cart(dir.path(), &[(cheery_red(), "M", 5), (tie_and_dye(), "L", 1)]).await?;

    let user = open(dir.path(), Some(SHOPPER)).await?;
    let outcome = user.store.merge_guest_cart().await?;

    assert_eq!(outcome.report.merged, 1);
    assert_eq!(outcome.report.appended, 1);
    assert_eq!(outcome.mutation, Mutation::Applied(Persistence::Saved));
    assert!(outcome.guest_cleared);

    let snapshot = user.store.snapshot();
    let quantities: Vec<_> = snapshot.items.iter().map(|item| item.quantity).collect();
    assert_eq!(quantities, vec![5, 1]);

    let guest_again = open(dir.path(), None).await?;
    assert!(guest_again.store.snapshot().is_empty());

    let second = user.store.merge_guest_cart().await?;
    assert_eq!(second.mutation, Mutation::Unchanged);
    assert_eq!(user.store.snapshot().items.len(), 2);

    Ok(())
}

#[tokio::test]
async fn signed_out_shopper_is_asked_to_log_in() -> TestResult {
    let dir = TempDir::new()?;

    let user = open(dir.path(), Some(SHOPPER)).await?;
    user.store.add_item(&tie_and_dye(), "M", 1).await?;

    user.auth.sign_out();

    let error = user.store.add_item(&cheery_red(), "M", 1).await;
    assert_eq!(error, Err(CartError::AuthRequired));
    assert_eq!(
        user.auth.login_prompts().await,
        vec!["add items to cart".to_string()]
    );

    assert!(user.auth.current_identity().is_none());

    Ok(())
}

#[tokio::test]
async fn catalog_rules_apply_to_fixture_products() -> TestResult {
    let dir = TempDir::new()?;
    let context = open(dir.path(), Some(SHOPPER)).await?;

    let sold_out = context
        .store
        .add_item(&ProductId::new("limited-print-brief"), "M", 1)
        .await;
    assert!(matches!(
        sold_out,
        Err(CartError::InsufficientStock { available: 0, .. })
    ));

    let too_many = context
        .store
        .add_item(&ProductId::new("bamboo-socks-pack"), "Free Size", 4)
        .await;
    assert!(matches!(
        too_many,
        Err(CartError::InsufficientStock { available: 3, .. })
    ));

    let wrong_size = context.store.add_item(&cheery_red(), "XS", 1).await;
    assert!(matches!(wrong_size, Err(CartError::Validation(_))));

    assert!(context.store.snapshot().is_empty());

    Ok(())
}

#[tokio::test]
async fn shipping_is_free_past_the_threshold() -> TestResult {
    let dir = TempDir::new()?;
    let context = open(dir.path(), Some(SHOPPER)).await?;

    context.store.add_item(&cheery_red(), "M", 2).await?;

    let below = context.store.snapshot().totals;
    assert_eq!(below.shipping, SHIPPING_FLAT);
    assert_eq!(below.amount_to_free_shipping(), FREE_SHIPPING_THRESHOLD - 398_00);

    context
        .store
        .add_item(&ProductId::new("classic-trunk-midnight"), "L", 1)
        .await?;

    let above = context.store.snapshot().totals;
    assert_eq!(above.subtotal, 398_00 + 649_00);
    assert!(above.ships_free());
    assert_eq!(above.tax, 188_00);
    assert_eq!(above.total, above.subtotal + above.tax);

    Ok(())
}

#[tokio::test]
async fn receipt_lists_the_cart() -> TestResult {
    let dir = TempDir::new()?;
    let context = open(dir.path(), Some(SHOPPER)).await?;

    context.store.add_item(&tie_and_dye(), "M", 2).await?;

    let mut out = Vec::new();
    context.store.snapshot().receipt().write_to(&mut out)?;
    let rendered = String::from_utf8(out)?;

    assert!(rendered.contains("Tie and Dye Brief"));
    assert!(rendered.contains("Tax (18%)"));
    assert!(rendered.contains("You save"));

    Ok(())
}

#[tokio::test]
async fn missing_catalog_fails_to_start() -> TestResult {
    let dir = TempDir::new()?;
    let mut config = config(dir.path(), None);
    config.catalog = dir.path().join("nope.yaml");

    assert!(AppContext::from_config(&config).is_err());

    Ok(())
}
