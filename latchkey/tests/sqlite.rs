#![cfg(feature = "sqlite")]

use std::sync::Arc;

use latchkey::error::TokenError;
use latchkey::{
    AuthConfig, Error, JwtConfig, Latchkey, RecordingMailSender, RepositoryProvider,
    SqliteRepositoryProvider,
};

const TEST_SECRET: &[u8] = b"this_is_a_test_secret_key_for_hs256_jwt_tokens_not_for_prod";

async fn setup() -> (Latchkey<SqliteRepositoryProvider>, RecordingMailSender) {
    let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
    let repositories = SqliteRepositoryProvider::new(pool);
    repositories.migrate().await.unwrap();

    let mailer = RecordingMailSender::new();
    let latchkey = Latchkey::new(
        Arc::new(repositories),
        AuthConfig::new(JwtConfig::new(TEST_SECRET.to_vec())),
        Arc::new(mailer.clone()),
    )
    .unwrap();
    (latchkey, mailer)
}

#[tokio::test]
async fn test_sqlite_password_lifecycle() {
    let (latchkey, _) = setup().await;
    latchkey.health_check().await.unwrap();

    let user = latchkey.signup("u@test.com", "pw1").await.unwrap();
    let (logged_in, tokens) = latchkey.login("u@test.com", "pw1").await.unwrap();
    assert_eq!(logged_in.id, user.id);

    let refreshed = latchkey.refresh_token(&tokens.refresh_token).await.unwrap();
    assert_eq!(refreshed.refresh_token, tokens.refresh_token);

    latchkey.logout(&tokens.refresh_token).await.unwrap();
    latchkey.logout(&tokens.refresh_token).await.unwrap();
    let result = latchkey.refresh_token(&tokens.refresh_token).await;
    assert!(matches!(result, Err(Error::Token(TokenError::TokenRevoked))));
}

#[tokio::test]
async fn test_sqlite_magic_link_and_reset() {
    let (latchkey, mailer) = setup().await;

    latchkey.request_passwordless("new@test.com").await.unwrap();
    let body = mailer.last().await.unwrap().body;
    let token = body.split("token=").nth(1).unwrap().to_string();

    let (user, _) = latchkey.passwordless_login(&token).await.unwrap();
    assert!(user.email_verified);
    assert!(latchkey.passwordless_login(&token).await.is_err());

    latchkey.request_password_reset("new@test.com").await.unwrap();
    let body = mailer.last().await.unwrap().body;
    let token = body.split("token: ").nth(1).unwrap().to_string();

    latchkey.confirm_password_reset(&token, "pw2").await.unwrap();
    let replay = latchkey.confirm_password_reset(&token, "pw3").await;
    assert!(matches!(replay, Err(Error::Token(TokenError::TokenRevoked))));

    let (logged_in, _) = latchkey.login("new@test.com", "pw2").await.unwrap();
    assert_eq!(logged_in.id, user.id);
}

#[tokio::test]
async fn test_sqlite_delete_user_cascades_tokens() {
    let (latchkey, _) = setup().await;
    let user = latchkey.signup("u@test.com", "pw1").await.unwrap();
    let (_, tokens) = latchkey.login("u@test.com", "pw1").await.unwrap();

    latchkey.delete_user(&user.id).await.unwrap();

    let result = latchkey.refresh_token(&tokens.refresh_token).await;
    assert!(matches!(
        result,
        Err(Error::Token(TokenError::InvalidRefreshToken))
    ));
}
