use anyhow::Result;
use appdata_access::{AppDataAccessError, Level, TokenSigner, TokenVerifier};
use jsonwebtoken::Algorithm;
use pretty_assertions::assert_eq;
use serde_json::json;

const SECRET: &str = "correct horse battery staple";

#[test]
fn it_verifies_a_bearer_header() -> Result<()> {
    let signer = TokenSigner::new(SECRET);
    let verifier = TokenVerifier::new(SECRET);

    let identity = verifier.verify_header(Some(&signer.bearer("alice@example.com", "readwrite")?))?;

    assert_eq!(identity.email, "alice@example.com");
    assert_eq!(identity.level.as_deref(), Some("readwrite"));
    assert!(identity.is_authorized(Level::ReadWrite));
    assert!(!identity.is_authorized(Level::Admin));
    Ok(())
}

#[test]
fn it_rejects_headers_that_are_not_two_part_bearer() -> Result<()> {
    let signer = TokenSigner::new(SECRET);
    let verifier = TokenVerifier::new(SECRET);
    let token = signer.sign(&json!({ "email": "alice@example.com", "level": "admin" }))?;

    assert_eq!(
        verifier.verify_header(None),
        Err(AppDataAccessError::MissingCredential)
    );
    for header in [
        token.clone(),
        format!("Basic {token}"),
        format!("Bearer  {token}"),
        format!("Bearer {token} extra"),
        "Bearer ".to_string(),
    ] {
        assert_eq!(
            verifier.verify_header(Some(&header)),
            Err(AppDataAccessError::MalformedHeader),
            "header {header:?} should be rejected"
        );
    }
    Ok(())
}

#[test]
fn it_rejects_tokens_signed_with_another_secret() -> Result<()> {
    let token = TokenSigner::new("another secret").sign(&json!({ "email": "eve@example.com" }))?;

    assert_eq!(
        TokenVerifier::new(SECRET).verify(&token),
        Err(AppDataAccessError::InvalidSignature)
    );
    Ok(())
}

#[test]
fn it_rejects_tampered_claims() -> Result<()> {
    let signer = TokenSigner::new(SECRET);
    let token = signer.sign(&json!({ "email": "bob@example.com", "level": "readonly" }))?;
    let forged = signer.sign(&json!({ "email": "bob@example.com", "level": "admin" }))?;

    let mut parts: Vec<&str> = token.split('.').collect();
    let forged_claims = forged.split('.').nth(1).unwrap_or_default();
    parts[1] = forged_claims;

    assert_eq!(
        TokenVerifier::new(SECRET).verify(&parts.join(".")),
        Err(AppDataAccessError::InvalidSignature)
    );
    Ok(())
}

#[test]
fn it_rejects_other_algorithms() -> Result<()> {
    let token = TokenSigner::new(SECRET)
        .sign_with_algorithm(Algorithm::HS512, &json!({ "email": "alice@example.com" }))?;

    assert_eq!(
        TokenVerifier::new(SECRET).verify(&token),
        Err(AppDataAccessError::UnsupportedAlgorithm)
    );
    Ok(())
}

#[test]
fn it_enforces_expiry() -> Result<()> {
    let token = TokenSigner::new(SECRET).sign(&json!({
        "email": "alice@example.com",
        "level": "readonly",
        "exp": 1_000
    }))?;

    assert_eq!(
        TokenVerifier::new(SECRET).verify(&token),
        Err(AppDataAccessError::Expired)
    );
    Ok(())
}

#[test]
fn it_accepts_fractional_numeric_dates() -> Result<()> {
    let token = TokenSigner::new(SECRET).sign(&json!({
        "email": "alice@example.com",
        "level": "admin",
        "exp": 4_102_444_800.5_f64,
        "nbf": 1_000.25_f64
    }))?;

    let identity = TokenVerifier::new(SECRET).verify(&token)?;

    assert_eq!(identity.email, "alice@example.com");
    assert!(identity.is_authorized(Level::Admin));
    Ok(())
}

#[test]
fn it_rejects_tokens_that_are_not_valid_yet() -> Result<()> {
    let token = TokenSigner::new(SECRET).sign(&json!({
        "email": "alice@example.com",
        "level": "admin",
        "nbf": 4_102_444_800_u64
    }))?;

    assert_eq!(
        TokenVerifier::new(SECRET).verify(&token),
        Err(AppDataAccessError::NotYetValid)
    );
    Ok(())
}

#[test]
fn it_requires_an_email_claim() -> Result<()> {
    let verifier = TokenVerifier::new(SECRET);
    let signer = TokenSigner::new(SECRET);

    for claims in [json!({ "level": "admin" }), json!({ "email": "", "level": "admin" })] {
        assert_eq!(
            verifier.verify(&signer.sign(&claims)?),
            Err(AppDataAccessError::MissingEmail)
        );
    }
    Ok(())
}

#[test]
fn it_accepts_tokens_without_a_level_but_never_authorizes_them() -> Result<()> {
    let token = TokenSigner::new(SECRET).sign(&json!({ "email": "carol@example.com" }))?;

    let identity = TokenVerifier::new(SECRET).verify(&token)?;

    assert_eq!(identity.level, None);
    assert!(!identity.is_authorized(Level::ReadOnly));
    Ok(())
}

#[test]
fn it_rejects_garbage() {
    let verifier = TokenVerifier::new(SECRET);
    for token in ["", "a.b", "a.b.c.d", "!!.??.**"] {
        assert!(
            matches!(
                verifier.verify(token),
                Err(AppDataAccessError::MalformedToken(_))
            ),
            "token {token:?} should be malformed"
        );
    }
}
