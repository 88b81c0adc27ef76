// Print a signing secret for the auth tokens and check it round-trips
use chat_backend::config::{random_jwt_secret, DEFAULT_JWT_TTL_HOURS};
use chat_backend::handlers::auth::{generate_jwt_token, verify_jwt_token};
use chat_backend::models::auth::User;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let secret = random_jwt_secret();

    let check_user = User {
        id: 0,
        first_name: String::new(),
        last_name: String::new(),
        email: "secret-check@localhost".to_string(),
        password_hash: String::new(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    let token = generate_jwt_token(&check_user, &secret, DEFAULT_JWT_TTL_HOURS)?;
    let claims = verify_jwt_token(&token, &secret)?;

    println!("Generated JWT secret ({} bytes, base64):", chat_backend::config::JWT_SECRET_BYTES);
    println!();
    println!("JWT_SECRET={}", secret);
    println!();
    println!(
        "Signed and verified a test token (sub={}, valid {} h).",
        claims.sub, DEFAULT_JWT_TTL_HOURS
    );

    match std::env::var("JWT_SECRET") {
        Ok(current) if !current.trim().is_empty() => {
            println!("A JWT_SECRET is already configured; replacing it logs every user out.");
        }
        _ => println!("No JWT_SECRET configured yet; it is required when APP_ENV=production."),
    }

    Ok(())
}
