/// Authentication primitives
///
/// # Modules
///
/// - [`jwt`]: Session token claims, signing and inspection
/// - [`password`]: Argon2id password hashing and verification
/// - [`session`]: Signed-in session type and its persistence in the key-value store
///
/// # Example
///
/// ```
/// use choreboard_shared::auth::jwt::{create_token, validate_token, SessionClaims};
/// use choreboard_shared::auth::password::{hash_password_with, verify_password, HashParams};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password_with("hunter22", &HashParams::light())?;
/// assert!(verify_password("hunter22", &hash)?);
///
/// let claims = SessionClaims::new(Uuid::new_v4(), "a@example.com", "choreboard");
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// let validated = validate_token(&token, "secret-key-at-least-32-bytes-long!!", "choreboard")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
pub mod session;
