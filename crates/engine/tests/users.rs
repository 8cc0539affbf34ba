use sea_orm::Database;

use engine::{Engine, EngineError, ProfilePatch, RegisterUserCmd, Theme};
use migration::MigratorTrait;

async fn engine() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder()
        .database(db)
        .password_cost(4)
        .build()
        .await
        .unwrap()
}

fn alice() -> RegisterUserCmd {
    RegisterUserCmd {
        username: "alice".to_string(),
        email: "Alice@Example.com".to_string(),
        password: "secret123".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
    }
}

#[tokio::test]
async fn register_then_authenticate() {
    let engine = engine().await;
    let user = engine.register_user(alice()).await.unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.preferences.currency, "USD");
    assert_eq!(user.preferences.theme, Theme::Light);

    let logged = engine
        .authenticate("ALICE@example.com", "secret123")
        .await
        .unwrap();
    assert_eq!(logged.id, user.id);

    assert_eq!(
        engine.authenticate("alice@example.com", "wrong").await,
        Err(EngineError::InvalidCredentials)
    );
    assert_eq!(
        engine.authenticate("nobody@example.com", "secret123").await,
        Err(EngineError::InvalidCredentials)
    );
}

#[tokio::test]
async fn duplicate_email_or_username_conflicts() {
    let engine = engine().await;
    engine.register_user(alice()).await.unwrap();

    let mut same_email = alice();
    same_email.username = "alice2".to_string();
    assert!(matches!(
        engine.register_user(same_email).await,
        Err(EngineError::ExistingKey(_))
    ));

    let mut same_username = alice();
    same_username.email = "other@example.com".to_string();
    assert!(matches!(
        engine.register_user(same_username).await,
        Err(EngineError::ExistingKey(_))
    ));
}

#[tokio::test]
async fn registration_validates_fields() {
    let engine = engine().await;

    let mut short_name = alice();
    short_name.username = "al".to_string();
    assert!(matches!(
        engine.register_user(short_name).await,
        Err(EngineError::InvalidField(_))
    ));

    let mut short_password = alice();
    short_password.password = "12345".to_string();
    assert!(matches!(
        engine.register_user(short_password).await,
        Err(EngineError::InvalidField(_))
    ));
}

#[tokio::test]
async fn profile_update_changes_preferences() {
    let engine = engine().await;
    let user = engine.register_user(alice()).await.unwrap();

    let updated = engine
        .update_profile(
            &user.id,
            ProfilePatch {
                currency: Some("eur".to_string()),
                theme: Some(Theme::Dark),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.preferences.currency, "EUR");
    assert_eq!(updated.preferences.theme, Theme::Dark);
    assert_eq!(updated.first_name, "Alice");

    let unchanged = engine
        .update_profile(&user.id, ProfilePatch::default())
        .await
        .unwrap();
    assert_eq!(unchanged, updated);

    assert!(matches!(
        engine
            .update_profile("missing", ProfilePatch::default())
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
}
